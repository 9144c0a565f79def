/*!

Detects unrecoverable failures reported by the cluster while a wait is in progress.

Before the first mutating call of a provisioning attempt a [`FailFastBaseline`] is captured from
the namespace's event stream. A [`FailFastGuard`] built on that baseline reports the first event
that is fatal according to its [`FailFastPolicy`] and that happened at or after the baseline.

!*/

use crate::error::{self, Result};
use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, warn};
use olmsys_model::clients::PlatformClient;
use olmsys_model::{ClusterEvent, EventSeverity};
use snafu::ResultExt;
use std::collections::BTreeSet;

lazy_static::lazy_static! {
    // Event timestamps only carry whole seconds.
    static ref PROCESS_START: DateTime<Utc> = Utc::now().trunc_subsecs(0);
}

/// The time the provisioner was first used in this process, truncated to whole seconds. Used as
/// the baseline of a namespace that has no events yet.
pub fn process_start() -> DateTime<Utc> {
    *PROCESS_START
}

/// Event reasons that indicate a deployment cannot succeed without intervention.
pub const DEFAULT_FATAL_REASONS: &[&str] = &[
    "Failed",
    "ErrImagePull",
    "ImagePullBackOff",
    "InvalidImageName",
    "BackOff",
    "CrashLoopBackOff",
    "FailedScheduling",
    "FailedCreate",
    "FailedMount",
    "FailedAttachVolume",
    "InstallComponentFailed",
    "InstallCheckFailed",
];

/// Decides which events are fatal. Only `Warning` events are ever fatal.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FailFastPolicy {
    reasons: BTreeSet<String>,
    object_prefix: Option<String>,
}

impl Default for FailFastPolicy {
    fn default() -> Self {
        Self {
            reasons: DEFAULT_FATAL_REASONS.iter().map(|r| r.to_string()).collect(),
            object_prefix: None,
        }
    }
}

impl FailFastPolicy {
    /// Only consider events whose involved object name starts with `prefix`, e.g. the pods of
    /// one application.
    pub fn for_app<S: Into<String>>(mut self, prefix: S) -> Self {
        self.object_prefix = Some(prefix.into());
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reasons.insert(reason.into());
        self
    }

    pub fn without_reason(mut self, reason: &str) -> Self {
        self.reasons.remove(reason);
        self
    }

    pub fn is_fatal(&self, event: &ClusterEvent) -> bool {
        event.severity == EventSeverity::Warning
            && self.reasons.contains(&event.reason)
            && self
                .object_prefix
                .as_ref()
                .map(|prefix| event.involved_name.starts_with(prefix.as_str()))
                .unwrap_or(true)
    }
}

/// The point in a namespace's event history before which nothing counts as a new failure.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FailFastBaseline {
    pub namespace: String,
    pub reference_timestamp: DateTime<Utc>,
    /// Events that already existed when the baseline was captured.
    known_events: BTreeSet<String>,
}

impl FailFastBaseline {
    /// Build a baseline from the events present in `namespace` right now.
    pub fn from_events<S: Into<String>>(namespace: S, events: &[ClusterEvent]) -> Self {
        let reference_timestamp = events
            .iter()
            .map(|event| event.timestamp)
            .max()
            .unwrap_or_else(process_start);
        Self {
            namespace: namespace.into(),
            reference_timestamp,
            known_events: events.iter().map(|event| event.id.clone()).collect(),
        }
    }

    /// Whether `event` happened at or after the baseline. An event that already existed at
    /// capture time only counts once it has been updated past the reference timestamp.
    pub fn precedes(&self, event: &ClusterEvent) -> bool {
        if self.known_events.contains(&event.id) {
            event.timestamp > self.reference_timestamp
        } else {
            event.timestamp >= self.reference_timestamp
        }
    }
}

/// Capture the baseline for `namespace`. This must happen before any mutating call of the
/// attempt it guards.
pub async fn capture<P>(platform: &P, namespace: &str) -> Result<FailFastBaseline>
where
    P: PlatformClient,
{
    let events = platform
        .list_events(namespace)
        .await
        .context(error::ClientSnafu {
            action: format!("list events in '{}'", namespace),
        })?;
    let baseline = FailFastBaseline::from_events(namespace, &events);
    debug!(
        "captured fail-fast baseline for '{}' at {}",
        namespace,
        baseline.reference_timestamp.to_rfc3339()
    );
    Ok(baseline)
}

/// Something that can report a fatal cluster event while a wait is in progress.
#[async_trait::async_trait]
pub trait FailFastCheck: Send + Sync {
    /// Returns the fatal event that should abort the wait, if there is one.
    async fn fatal_event(&self) -> Option<ClusterEvent>;
}

/// Reports fatal events recorded in the baseline's namespace since the baseline.
pub struct FailFastGuard<'a, P>
where
    P: PlatformClient,
{
    platform: &'a P,
    baseline: FailFastBaseline,
    policy: FailFastPolicy,
}

impl<'a, P> FailFastGuard<'a, P>
where
    P: PlatformClient,
{
    pub fn new(platform: &'a P, baseline: FailFastBaseline, policy: FailFastPolicy) -> Self {
        Self {
            platform,
            baseline,
            policy,
        }
    }

    pub fn baseline(&self) -> &FailFastBaseline {
        &self.baseline
    }
}

#[async_trait::async_trait]
impl<'a, P> FailFastCheck for FailFastGuard<'a, P>
where
    P: PlatformClient,
{
    async fn fatal_event(&self) -> Option<ClusterEvent> {
        let events = match self.platform.list_events(&self.baseline.namespace).await {
            Ok(events) => events,
            Err(e) => {
                // The wait itself keeps going; a failed event query is not a fatal event.
                warn!(
                    "Unable to list events in '{}', ignoring: {}",
                    self.baseline.namespace, e
                );
                return None;
            }
        };
        events
            .into_iter()
            .filter(|event| self.policy.is_fatal(event) && self.baseline.precedes(event))
            .min_by_key(|event| event.timestamp)
    }
}
