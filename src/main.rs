//! Batch Transfer Engine CLI
//!
//! Runs the per-feature schedulers against a store seeded from a JSON document
//! and prints the per-batch statistics report as CSV.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --once seed.json > report.csv
//! cargo run -- --feature funds-transfer --interval 30 seed.json
//! cargo run -- --gateway-url https://t24.example/api --max-concurrent 4 seed.json
//! ```
//!
//! With `--once` every selected feature ticks a single time. Otherwise the
//! schedulers run until Ctrl-C, then the report is written for whatever state
//! the batches reached.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (seed not readable, invalid gateway configuration, report failure, etc.)

use batch_transfer_engine::cli::{self, CliArgs};
use batch_transfer_engine::core::{InMemoryStore, SharedStore};
use batch_transfer_engine::gateway::{HttpGateway, TransactionGateway};
use batch_transfer_engine::io::{collect_report, load_seed, write_report_csv};
use batch_transfer_engine::logging::init_logging;
use batch_transfer_engine::scheduler::FeatureScheduler;
use batch_transfer_engine::EngineError;
use futures::future::join_all;
use std::process;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn main() {
    // Parse command-line arguments using clap
    let args = cli::parse_args();
    init_logging(args.json_logs);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: {}", EngineError::from(e));
            process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(run(args)) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: CliArgs) -> Result<(), EngineError> {
    let seed = load_seed(&args.seed_file).await?;
    let memory = Arc::new(seed.into_store());
    let store: SharedStore = Arc::clone(&memory) as SharedStore;

    let gateway: Arc<dyn TransactionGateway> = Arc::new(
        HttpGateway::new(args.to_gateway_config())
            .map_err(|e| EngineError::invalid_config("gateway", e.to_string()))?,
    );
    let config = args.to_engine_config();
    let cancel = CancellationToken::new();

    let schedulers: Vec<FeatureScheduler> = args
        .selected_features()
        .into_iter()
        .map(|kind| {
            FeatureScheduler::new(
                kind,
                Arc::clone(&store),
                Arc::clone(&gateway),
                config.clone(),
                cancel.clone(),
            )
        })
        .collect();

    if args.once {
        for scheduler in &schedulers {
            let outcome = scheduler.tick().await;
            info!(feature = %scheduler.kind(), ?outcome, "Tick finished");
        }
    } else {
        let watcher = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
            }
            watcher.cancel();
        });

        join_all(
            schedulers
                .iter()
                .map(|scheduler| scheduler.run(cancel.clone())),
        )
        .await;
    }

    write_report(&memory, &store).await
}

async fn write_report(memory: &InMemoryStore, store: &SharedStore) -> Result<(), EngineError> {
    let report = collect_report(store, &memory.all_batches()).await?;
    let mut output = std::io::stdout();
    write_report_csv(&report, &mut output)
}
