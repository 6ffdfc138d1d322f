use anyhow::Result;
use clap::Parser;
use pegasus::cli::{self, live};
use pegasus::generator::events::EventSink;
use pegasus::{launch, launch_with_events};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = args.into_config()?;
    init_tracing(config.verbose);

    if args.is_live() {
        let (events, receiver) = EventSink::channel();
        let feed = tokio::spawn(live::render_feed(receiver));
        let result = launch_with_events(&config, events).await;
        // 流程结束后发送端已释放，等待剩余事件输出完毕
        if let Err(e) = feed.await {
            tracing::warn!(error = %e, "live feed task failed");
        }
        result.map(|_| ())
    } else {
        launch(&config).await.map(|_| ())
    }
}

/// 日志输出到stderr；RUST_LOG优先，否则按verbose决定级别
fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "pegasus=debug,warn" } else { "error" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
