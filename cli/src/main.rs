use clap::{Parser, Subcommand};
use comfy_table::Table;
use common::{JobId, JobRecord, JobType, NewJob};
use std::path::PathBuf;
use taskq::config::Config;
use taskq::{DispatcherClient, FsExecutor, Worker};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (.yaml, .yml or .toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Dispatcher URL, e.g. http://127.0.0.1:8080
    #[arg(short, long, global = true)]
    server: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the dispatcher and execute jobs until interrupted
    Run {
        /// Pause between polls of an empty queue
        #[arg(long)]
        poll_interval_ms: Option<u64>,
    },
    /// Queue a new job
    Submit {
        /// count, create_file, create_dir, delete_file, delete_dir or execute
        #[arg(short = 't', long)]
        job_type: JobType,
        /// File path or shell command
        #[arg(short = 'a', long)]
        job_arg: String,
    },
    /// Show a job and its result
    Status {
        id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(server) = cli.server {
        config.server.url = server;
    }
    let client = DispatcherClient::new(&config.server.url, config.request_timeout())?;

    match cli.command {
        Commands::Run { poll_interval_ms } => {
            if let Some(ms) = poll_interval_ms {
                config.worker.poll_interval_ms = ms;
            }
            common::logging::setup_logging(&config.logging)?;
            log::info!("Starting taskq worker against {}", config.server.url);

            let executor = FsExecutor::new(config.worker.dump_dir.clone());
            let worker = Worker::new(client, executor, config.poll_interval());

            let shutdown = CancellationToken::new();
            let token = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => log::info!("Interrupt received, stopping after the current job"),
                    Err(e) => log::error!("Failed to listen for interrupt: {}", e),
                }
                token.cancel();
            });

            worker.run(shutdown).await;
        }
        Commands::Submit { job_type, job_arg } => {
            let echoed = client.create(&NewJob::new(job_type, job_arg)).await?;
            println!("Created: {}", echoed);
        }
        Commands::Status { id } => {
            let record = client.status(JobId(id)).await?;
            println!("{}", render(&record));
        }
    }

    Ok(())
}

fn timestamp(ts: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp(ts, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn render(record: &JobRecord) -> Table {
    let job = &record.job;
    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["ID".to_string(), job.id.to_string()]);
    table.add_row(vec!["Type".to_string(), job.job_type.to_string()]);
    table.add_row(vec!["Argument".to_string(), job.job_arg.clone()]);
    table.add_row(vec!["Status".to_string(), job.status.to_string()]);
    table.add_row(vec!["Created by".to_string(), job.client_host.clone()]);
    table.add_row(vec![
        "Claimed by".to_string(),
        job.worker_host.clone().unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Created".to_string(), timestamp(job.ctime)]);
    table.add_row(vec![
        "Started".to_string(),
        job.stime.map(timestamp).unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Modified".to_string(), timestamp(job.mtime)]);
    if let Some(result) = &record.result {
        table.add_row(vec!["Result".to_string(), result.result.to_string()]);
        table.add_row(vec!["Info".to_string(), result.result_info.clone()]);
        table.add_row(vec!["Run time".to_string(), format!("{:.3}s", result.run_time)]);
    }
    table
}
