use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "canary",
    about = "Scheduled website uptime monitor with rolling history and email alerts",
    version,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one monitoring pass over all configured websites
    Check {
        /// Path to the JSON configuration file
        #[arg(long, default_value = "config/websites.json")]
        config: PathBuf,

        /// Directory holding the rolling history cache
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },

    /// Render the HTML dashboard from the persisted history
    Dashboard {
        /// Directory holding the rolling history cache
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,

        /// Output file path
        #[arg(long, default_value = "dashboard.html")]
        output: PathBuf,
    },

    /// Print the most recent run results
    Status {
        /// Directory holding the rolling history cache
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config, cache_dir } => {
            tracing::info!(config = %config.display(), "Starting monitoring run");
            let record = canary::run_check(&config, &cache_dir).await?;

            println!("\n--- Summary ---");
            println!("Total sites checked: {}", record.summary.total_sites);
            println!("Successful: {}", record.summary.sites_up);
            println!("Failed: {}", record.summary.sites_down);

            for outcome in record.failed_outcomes() {
                let reason = outcome
                    .failure
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("  ✗ {} ({}): {}", outcome.name, outcome.url, reason);
            }

            let store = canary::history::HistoryStore::new(&cache_dir);
            let uptime = canary::report::uptime_stats(&store.load(), 24);
            if !uptime.is_empty() {
                println!("\n--- 24h Uptime ---");
                for (site, percent) in uptime {
                    println!("{}: {:.2}%", site, percent);
                }
            }

            // Sites being down is a completed run, not a crash: exit 0
            // either way so the scheduler can tell the two apart.
        }

        Commands::Dashboard { cache_dir, output } => {
            let store = canary::history::HistoryStore::new(&cache_dir);
            let log = store.load();
            canary::dashboard::write(&log, &output)?;
            println!(
                "Dashboard written to {} ({} run(s))",
                output.display(),
                log.len()
            );
        }

        Commands::Status { cache_dir } => {
            let store = canary::history::HistoryStore::new(&cache_dir);
            match store.load_current_status() {
                Ok(snapshot) => {
                    println!(
                        "Last check: {} (overall: {})",
                        snapshot.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                        snapshot.overall_status
                    );
                    println!(
                        "{:<20} | {:<6} | {:<10} | Details",
                        "Website", "Status", "Response"
                    );
                    println!("{:-<20}-|-{:-<6}-|-{:-<10}-|-{:-<40}", "", "", "", "");
                    for (name, site) in &snapshot.sites {
                        let details = match site.failure {
                            Some(reason) => reason.to_string(),
                            None => "OK".to_string(),
                        };
                        println!(
                            "{:<20} | {:<6} | {:<10} | {}",
                            name,
                            site.status.to_string(),
                            format!("{}ms", site.response_time_ms),
                            details
                        );
                    }
                }
                Err(_) => {
                    println!("No status recorded yet. Run 'canary check' first.");
                }
            }
        }
    }

    Ok(())
}
