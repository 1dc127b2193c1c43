use std::process::ExitCode;

use clap::Parser;
use color_eyre::config::Frame;
use eyre::Result;
use tracing::{Level, debug, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::filter::FromEnvError;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::Directive};

use node_decommission::{ApiResolver, Config, Shutdown, SshExecutor, decommission};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let config = Config::parse();

    init_tracing_subscriber()?;
    install_color_eyre()?;

    print_build_info();

    let shutdown = Shutdown::new();
    let api_resolver = ApiResolver::try_new(kube::Config::infer().await?)?;
    let remote = SshExecutor::new(config.ssh_options.clone());

    info!(node = %config.node, "Decommissioning node");
    let status = decommission(
        &api_resolver,
        &remote,
        &config.decommission_params(),
        &shutdown,
    )
    .await;

    info!(?status, code = status.code(), "Bye!");
    Ok(status.into())
}

fn selfish_frame_filter(frames: &mut Vec<&Frame>) {
    frames.retain(|frame| {
        matches!(frame.name.as_ref(),
            Some(name) if name == "node_decommission"
            || name.starts_with("node_decommission::"))
    });
}

fn init_tracing_subscriber() -> Result<()> {
    tracing_subscriber::registry()
        .with({
            let layer = Layer::default().with_writer(std::io::stderr);
            let filter = env_filter()?;
            layer.with_filter(filter)
        })
        .with({
            let layer = ErrorLayer::default();
            let filter = env_filter()?;
            layer.with_filter(filter)
        })
        .try_init()?;

    return Ok(());

    fn env_filter() -> Result<EnvFilter, FromEnvError> {
        EnvFilter::builder()
            .with_default_directive(Directive::from(Level::INFO))
            .from_env()
    }
}

fn install_color_eyre() -> Result<()> {
    color_eyre::config::HookBuilder::new()
        .capture_span_trace_by_default(true)
        .add_frame_filter(Box::new(selfish_frame_filter))
        .install()?;
    Ok(())
}

fn print_build_info() {
    const UNKNOWN: &str = "unknown";

    info!("tag: {}", option_env!("VERGEN_GIT_DESCRIBE").unwrap_or(UNKNOWN));
    debug!("branch: {}", option_env!("VERGEN_GIT_BRANCH").unwrap_or(UNKNOWN));
    debug!("commit: {}", option_env!("VERGEN_GIT_SHA").unwrap_or(UNKNOWN));
    debug!(
        "commit date: {}",
        option_env!("VERGEN_GIT_COMMIT_DATE").unwrap_or(UNKNOWN)
    );

    debug!("rustc: {}", option_env!("VERGEN_RUSTC_SEMVER").unwrap_or(UNKNOWN));
    debug!(
        "build date: {}",
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or(UNKNOWN)
    );
}
