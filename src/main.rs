//! Binary entry point, grounded on `ai-coach-cli/src/main.rs`: install
//! tracing, parse CLI flags, then hand off to a manually-built
//! multi-thread tokio runtime (kept for parity with the teacher's
//! runtime setup, even though the dispatch loop itself is single-threaded
//! cooperative per `spec.md` §5).

use clap::Parser;

use exercise_analyzer::analyzers::AnalyzerRegistry;
use exercise_analyzer::config::Cli;
use exercise_analyzer::worker::Worker;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.init_tracing();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("starting exercise analyzer worker, model root {:?}", cli.model_root);
    let registry = AnalyzerRegistry::new(cli.model_root);
    let mut worker = Worker::new(tokio::io::stdin(), tokio::io::stdout(), registry);
    worker.run(Box::pin(shutdown_signal())).await
}

/// Resolves on SIGINT or SIGTERM (`spec.md` §5 Cancellation).
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
