use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use job_tracker::config::AppConfig;
use job_tracker::database::{Database, JobRepository};
use job_tracker::scrape::JobScraper;
use job_tracker::start_web_server;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default directives cover both the binary and the library targets.
const DEFAULT_LOG_FILTER: &str = "jobtrack=info,job_tracker=info,rocket::server=off";

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Track job applications, scrape postings and generate documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the API server
    Serve,
    /// Create the database and run migrations
    InitDb,
    /// Scrape a job posting URL and print the extracted fields
    Scrape { url: String },
    /// Export all job applications to a CSV file
    Export {
        #[arg(long, default_value = "jobs.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load()?;

    match cli.command {
        Command::Serve => start_web_server(config).await,
        Command::InitDb => {
            config.ensure_directories().await?;
            Database::new(&config.database_path).await?;
            info!("Database ready: {}", config.database_path.display());
            Ok(())
        }
        Command::Scrape { url } => {
            let scraper = JobScraper::new(&config.scrape)?;
            let scraped = scraper.scrape(&url).await?;
            println!("Title:    {}", scraped.title);
            println!("Company:  {}", scraped.company);
            println!("Location: {}", scraped.office_location);
            println!("Country:  {}", scraped.country);
            println!();
            println!("{}", scraped.description);
            Ok(())
        }
        Command::Export { output } => {
            let db = Database::new(&config.database_path).await?;
            export_csv(&db, &output).await
        }
    }
}

async fn export_csv(db: &Database, output: &PathBuf) -> Result<()> {
    let jobs = JobRepository::new(db.pool()).list().await?;
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("Failed to create CSV file: {}", output.display()))?;

    writer.write_record([
        "id",
        "company",
        "title",
        "status",
        "job_mode",
        "url",
        "office_location",
        "country",
        "last_update",
    ])?;
    let count = jobs.len();
    for job in jobs {
        writer.write_record([
            job.id.to_string(),
            job.company,
            job.title,
            job.status,
            job.job_mode,
            job.url.unwrap_or_default(),
            job.office_location.unwrap_or_default(),
            job.country.unwrap_or_default(),
            job.last_update.to_rfc3339(),
        ])?;
    }
    writer.flush()?;

    info!("Exported {} applications to {}", count, output.display());
    Ok(())
}
