//! # sitescribe CLI
//!
//! - `serve`: run the HTTP API (`/site/crawl`, `/site/crawl_async`, `/health`)
//! - `crawl`: run the pipeline once per URL, in order, and print the records
//!
//! Both commands read their settings from the environment (and `.env`).

mod telemetry;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rig::completion::CompletionModel;
use sitescribe::api::{self, AppState};
use sitescribe::config::AppConfig;
use sitescribe::crawler::ChromiumBrowser;
use sitescribe::database::LibsqlRecordStore;
use sitescribe::model::{self, Provider};
use sitescribe::pipeline::{Pipeline, SiteCrawler};
use sitescribe::processor::Enricher;
use sitescribe::record::CrawlRequest;
use sitescribe::storage::HttpObjectStore;
use tracing::{info, instrument};

#[derive(Parser)]
#[command(author, version, about = "Crawl websites into enriched, multilingual site records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),

    /// Crawl one or more sites and print the records as JSON
    Crawl(CrawlArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// URLs to crawl
    #[arg(required = true)]
    urls: Vec<String>,

    /// Languages to translate into (comma-separated codes, default: all)
    #[arg(short, long, value_delimiter = ',')]
    languages: Vec<String>,

    /// Write the records to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _otel = telemetry::init_tracing_subscriber()?;

    match cli.command {
        Some(Commands::Serve(args)) => {
            serve_command(args).await?;
        }
        Some(Commands::Crawl(args)) => {
            crawl_command(args).await?;
        }
        None => {
            let _ = Cli::parse_from(["sitescribe", "--help"]);
        }
    }

    Ok(())
}

#[instrument]
async fn serve_command(args: ServeArgs) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let addr = args.bind.unwrap_or(config.bind_addr);
    let crawler = build_crawler(&config).await?;

    let state = Arc::new(AppState {
        crawler,
        auth_secret: config.auth_secret.clone(),
        http: reqwest::Client::new(),
    });

    api::serve(state, addr).await?;
    Ok(())
}

#[instrument]
async fn crawl_command(args: CrawlArgs) -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    let crawler = build_crawler(&config).await?;

    let progress_bar = ProgressBar::new(args.urls.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("invalid progress template")?
            .progress_chars("##-"),
    );

    let mut records = Vec::new();
    let mut failed = 0;
    for url in &args.urls {
        progress_bar.set_message(url.clone());
        let request = CrawlRequest::new(url, &args.languages);
        match crawler.crawl(&request).await {
            Ok(record) => records.push(record),
            Err(e) => {
                failed += 1;
                progress_bar.println(format!("Failed to crawl {}: {}", url, e));
            }
        }
        progress_bar.inc(1);
    }
    progress_bar.finish_with_message("done");

    let json = serde_json::to_string_pretty(&records)?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            println!("Saved {} records to {}", records.len(), path.display());
        }
        None => println!("{}", json),
    }

    info!("Crawled {} sites, {} failed", records.len(), failed);
    Ok(())
}

/// Wire the pipeline for the configured completion provider
async fn build_crawler(config: &AppConfig) -> anyhow::Result<Arc<dyn SiteCrawler>> {
    match config.llm.provider {
        Provider::OpenAi => assemble(model::openai_compatible_model(&config.llm), config).await,
        Provider::Gemini => assemble(model::gemini_model(&config.llm), config).await,
    }
}

async fn assemble<M>(model: M, config: &AppConfig) -> anyhow::Result<Arc<dyn SiteCrawler>>
where
    M: CompletionModel + 'static,
{
    let store = HttpObjectStore::new(config.storage.clone()).context("object storage setup")?;
    let records = LibsqlRecordStore::open(
        &config.database_url,
        config.database_auth_token.as_deref(),
    )
    .await
    .with_context(|| format!("opening database {}", config.database_url))?;

    let pipeline = Pipeline::new(
        Arc::new(ChromiumBrowser::new(config.crawler.clone())),
        Enricher::new(model, config.enrichment.clone()),
        Arc::new(store),
        Arc::new(records),
        config.crawler.clone(),
    );
    Ok(Arc::new(pipeline))
}
