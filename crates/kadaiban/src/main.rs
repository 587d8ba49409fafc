use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod deadline;
mod html;
mod plan;
mod scrape;
mod server;
mod types;
mod upstream;

#[derive(Parser, Debug)]
#[command(name = "kadaiban")]
#[command(about = "Rebuild the hw25 homework page into a single merged assignment view")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Homework page URL (overrides HW_PAGE_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Output directory for generated files
    #[arg(short, long, default_value = ".", global = true)]
    output: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the merged view and relay submissions (default)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Rework a saved page snapshot into static HTML (no server, no network)
    Build {
        /// Path to a saved copy of the homework page
        file: PathBuf,
    },

    /// Extract a saved page snapshot and log what was found
    Parse {
        /// Path to a saved copy of the homework page
        file: PathBuf,
    },
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level))
        .add_directive("hyper=warn".parse().unwrap())
        .add_directive("tower_http=warn".parse().unwrap());

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_max_level(Level::TRACE)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    match args.command {
        // Default to serve if no command specified
        None => {
            let settings = config::Settings::load(args.url)?;
            server::serve(8080, settings).await?;
        }
        Some(Commands::Serve { port }) => {
            let settings = config::Settings::load(args.url)?;
            server::serve(port, settings).await?;
        }
        Some(Commands::Build { file }) => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let reworked = html::modernize(&raw, chrono::Local::now().naive_local());
            let html_path = args.output.join("index.html");
            std::fs::write(&html_path, reworked)
                .with_context(|| format!("Failed to write {}", html_path.display()))?;
            info!(path = %html_path.display(), "HTML saved");
        }
        Some(Commands::Parse { file }) => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let data = scrape::extract(&raw)?;
            info!(
                count = data.assignments.len(),
                file = %file.display(),
                "Found assignments"
            );
            let plan = plan::build_plan(&data, chrono::Local::now().naive_local());
            for row in &plan.rows {
                info!(
                    id = %row.id,
                    deadline = %row.deadline,
                    submitted = row.submitted,
                    urgency = ?row.urgency,
                    "Assignment"
                );
            }
        }
    }

    Ok(())
}
