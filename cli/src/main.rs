/*!

This is the command line interface for installing an operator through OLM and driving one of its
products through deploy, scale and teardown.

!*/

mod resolve;
mod run;
mod teardown;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use olmsys_model::clients::KubePlatform;
use olmsys_model::constants::ENV_PREFIX;
use olmsys_model::{EnvConfig, LayeredConfig, YamlConfig};
use std::path::{Path, PathBuf};

/// The command line interface for provisioning operators and their products through OLM.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to the kubeconfig file. Also can be passed with the KUBECONFIG environment variable.
    #[clap(long = "kubeconfig")]
    kubeconfig: Option<PathBuf>,
    /// Path to a YAML configuration file. Environment variables prefixed with `OLMSYS_` take
    /// precedence over its values.
    #[clap(long = "config")]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Print the OLM subscription parameters resolved for a product.
    Resolve(resolve::Resolve),
    /// Subscribe to a product's operator and deploy the product.
    Run(run::Run),
    /// Remove a product and its operator subscription left behind by an earlier run.
    Teardown(teardown::Teardown),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(args.log_level);
    if let Err(e) = run(args).await {
        eprintln!("{:?}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    match args.command {
        Command::Resolve(resolve) => resolve.run(&config),
        Command::Run(run) => {
            run.run(platform(args.kubeconfig.as_deref()).await?, &config)
                .await
        }
        Command::Teardown(teardown) => {
            teardown
                .run(platform(args.kubeconfig.as_deref()).await?, &config)
                .await
        }
    }
}

/// Environment variables are consulted first, then the configuration file if one was given.
fn load_config(path: Option<&Path>) -> Result<LayeredConfig> {
    let mut config = LayeredConfig::new().layer(EnvConfig::new(ENV_PREFIX));
    if let Some(path) = path {
        let file = YamlConfig::from_path(path)
            .with_context(|| format!("Unable to read configuration from '{}'", path.display()))?;
        config = config.layer(file);
    }
    Ok(config)
}

async fn platform(kubeconfig: Option<&Path>) -> Result<KubePlatform> {
    match kubeconfig {
        Some(path) => KubePlatform::new_from_kubeconfig_path(path)
            .await
            .context(format!(
                "Unable to create cluster client from path '{:?}'",
                path
            )),
        None => KubePlatform::new()
            .await
            .context("Unable to create default cluster client"),
    }
}

/// Initialize the logger with the value passed by `--log-level` (or its default) when the
/// `RUST_LOG` environment variable is not present. If present, the `RUST_LOG` environment variable
/// overrides `--log-level`/`level`.
fn init_logger(level: LevelFilter) {
    match std::env::var(env_logger::DEFAULT_FILTER_ENV).ok() {
        Some(_) => {
            // RUST_LOG exists; env_logger will use it.
            Builder::from_default_env().init();
        }
        None => {
            // RUST_LOG does not exist; use the default log level for our crates only.
            Builder::new()
                .filter(Some(env!("CARGO_CRATE_NAME")), level)
                .filter(Some("olm_provisioner"), level)
                .filter(Some("olmsys_model"), level)
                .init();
        }
    }
}
