/*!

Bounded polling of cluster state.

Every wait in the provisioner goes through [`wait_for`]: the predicate is evaluated at a fixed
interval until it holds, the timeout runs out, or the optional fail-fast check reports a fatal
cluster event. The three outcomes are kept apart so that callers can tell a cluster that is still
converging from one that has already failed.

!*/

use crate::error::{self, Result, Stage};
use crate::fail_fast::FailFastCheck;
use log::{log, trace, warn, Level};
use olmsys_model::{ClusterEvent, ConfigSource};
use snafu::ResultExt;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// The result of a wait.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success,
    TimedOut,
    FailFast(ClusterEvent),
}

impl Outcome {
    /// Convert the outcome into a `Result`, naming the `stage` that waited on failure.
    pub fn into_result(self, stage: Stage, spec: &WaitSpec<'_>) -> Result<()> {
        match self {
            Outcome::Success => Ok(()),
            Outcome::TimedOut => error::TimedOutSnafu {
                stage,
                what: spec.description.clone(),
                timeout: spec.timeout,
            }
            .fail(),
            Outcome::FailFast(event) => error::FailFastAbortSnafu {
                stage,
                what: spec.description.clone(),
                event: Box::new(event),
            }
            .fail(),
        }
    }
}

/// The parameters of one wait. Built fresh for each wait call.
pub struct WaitSpec<'a> {
    pub description: String,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub log_level: Level,
    pub fail_fast: Option<&'a dyn FailFastCheck>,
}

impl<'a> WaitSpec<'a> {
    pub fn new<S: Into<String>>(description: S, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            description: description.into(),
            timeout,
            poll_interval,
            log_level: Level::Info,
            fail_fast: None,
        }
    }

    pub fn log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }

    pub fn fail_fast(mut self, guard: Option<&'a dyn FailFastCheck>) -> Self {
        self.fail_fast = guard;
        self
    }
}

/// Poll `predicate` until it returns `true`, the timeout elapses or the fail-fast check reports a
/// fatal event.
///
/// The predicate is always evaluated at least once. An error returned by the predicate is logged
/// and treated as "not yet", since the API server may be briefly unavailable while the cluster
/// reconciles. The last sleep is shortened so that a wait never outlives its timeout by more
/// than one poll interval.
pub async fn wait_for<F, Fut, E>(spec: &WaitSpec<'_>, mut predicate: F) -> Outcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<bool, E>>,
    E: Display,
{
    let start = Instant::now();
    log!(
        spec.log_level,
        "Waiting up to {:?} for {}",
        spec.timeout,
        spec.description
    );
    loop {
        match predicate().await {
            Ok(true) => {
                log!(
                    spec.log_level,
                    "Done waiting for {} after {:?}",
                    spec.description,
                    start.elapsed()
                );
                return Outcome::Success;
            }
            Ok(false) => trace!("{} is not there yet", spec.description),
            Err(e) => warn!("Error while checking {}: {}", spec.description, e),
        }

        if let Some(guard) = spec.fail_fast {
            if let Some(event) = guard.fatal_event().await {
                warn!(
                    "Giving up on {} after {:?}: {}",
                    spec.description,
                    start.elapsed(),
                    event
                );
                return Outcome::FailFast(event);
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= spec.timeout {
            warn!(
                "Timed out after {:?} waiting for {}",
                elapsed, spec.description
            );
            return Outcome::TimedOut;
        }
        sleep(spec.poll_interval.min(spec.timeout - elapsed)).await;
    }
}

/// Wait timings, resolved from configuration with per-product overrides.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub subscribe_timeout: Duration,
    pub deploy_timeout: Duration,
    pub scale_timeout: Duration,
    pub undeploy_timeout: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            subscribe_timeout: Duration::from_secs(300),
            deploy_timeout: Duration::from_secs(600),
            scale_timeout: Duration::from_secs(300),
            undeploy_timeout: Duration::from_secs(300),
        }
    }
}

impl WaitPolicy {
    /// Read `<product>.wait.<field>` and then `wait.<field>` for each timing.
    pub fn from_config(config: &dyn ConfigSource, product: &str) -> Result<Self> {
        let defaults = Self::default();
        let seconds = |field: &str, default: Duration| -> Result<Duration> {
            for key in [format!("{}.wait.{}", product, field), format!("wait.{}", field)] {
                if let Some(value) = config
                    .seconds(&key)
                    .context(error::ConfigurationValueSnafu)?
                {
                    return Ok(value);
                }
            }
            Ok(default)
        };
        let policy = Self {
            poll_interval: seconds("poll_interval_secs", defaults.poll_interval)?,
            subscribe_timeout: seconds("subscribe_timeout_secs", defaults.subscribe_timeout)?,
            deploy_timeout: seconds("deploy_timeout_secs", defaults.deploy_timeout)?,
            scale_timeout: seconds("scale_timeout_secs", defaults.scale_timeout)?,
            undeploy_timeout: seconds("undeploy_timeout_secs", defaults.undeploy_timeout)?,
        };
        if policy.poll_interval.is_zero() {
            return error::ConfigurationSnafu {
                message: "the poll interval must be at least one second",
            }
            .fail();
        }
        Ok(policy)
    }

    /// The timeout used for waits during `stage`.
    pub fn timeout(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Subscribe | Stage::Configure => self.subscribe_timeout,
            Stage::Deploy => self.deploy_timeout,
            Stage::Scale => self.scale_timeout,
            Stage::Undeploy | Stage::Unsubscribe => self.undeploy_timeout,
        }
    }

    /// A `WaitSpec` for `stage` using these timings.
    pub fn spec<'a, S: Into<String>>(
        &self,
        stage: Stage,
        description: S,
        fail_fast: Option<&'a dyn FailFastCheck>,
    ) -> WaitSpec<'a> {
        WaitSpec::new(description, self.timeout(stage), self.poll_interval).fail_fast(fail_fast)
    }
}
