//! Terminal front end for the artwork table

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use arrow::util::pretty::pretty_format_batches;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use at_core::events::events::ProgressChanged;
use at_core::{Notice, NoticeLevel, ViewMode};
use at_data::{CatalogConfig, MemoryCatalog};
use at_select::{CatalogSession, PageView, SelectError, Strategy, ValidationError};

#[derive(Parser)]
#[command(author, version, about = "Browse and bulk-select artworks from a public catalog", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve an in-memory catalog of this many artworks instead of the API
    #[arg(long, global = true)]
    synthetic: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print one catalog page
    Page { page: usize },
    /// Grow the selection to TARGET artworks and print it
    Select {
        target: String,

        /// Catalog page the selection starts from
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Selection pages to print afterwards
        #[arg(long, default_value_t = 1)]
        review_pages: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CatalogConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => CatalogConfig::default(),
    };
    config.validate().context("Invalid configuration")?;

    let session = match cli.synthetic {
        Some(total) => {
            info!("Using a synthetic catalog of {} artworks", total);
            CatalogSession::new(config, Arc::new(MemoryCatalog::new(total)))
        }
        None => CatalogSession::from_config(config).context("Failed to create catalog client")?,
    };
    print_notices(&session);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;
    runtime.block_on(run(&session, cli.command))
}

async fn run(session: &CatalogSession, command: Commands) -> Result<()> {
    match command {
        Commands::Page { page } => {
            let view = session.on_page_requested(page).await?;
            print_view(&view)?;
        }
        Commands::Select { target, page, review_pages } => {
            // The catalog total is only known once a page has been loaded
            let view = session.on_page_requested(page).await?;
            print_view(&view)?;

            let outcome = match session.on_bulk_select_requested(&target).await {
                Ok(outcome) => outcome,
                Err(SelectError::Validation(ValidationError::AlreadySatisfied { .. })) => return Ok(()),
                Err(e) => return Err(e).context("Bulk selection failed"),
            };
            info!(
                "{} strategy added {} artworks over {} pages",
                outcome.strategy,
                outcome.added,
                outcome.pages_requested.len()
            );

            let first = match (outcome.strategy, outcome.preview) {
                (Strategy::BulkId, Some(preview)) => session.controller().review_view(1, preview),
                _ if session.controller().mode() == ViewMode::ReviewingSelection => {
                    session.on_page_requested(1).await?
                }
                _ => session.on_view_mode_toggled().await?,
            };
            print_view(&first)?;

            for review_page in 2..=review_pages.min(first.total_pages()) {
                let view = session.on_page_requested(review_page).await?;
                print_view(&view)?;
            }
        }
    }
    Ok(())
}

fn print_view(view: &PageView) -> Result<()> {
    let label = match view.mode {
        ViewMode::Browsing => "Catalog",
        ViewMode::ReviewingSelection => "Selection",
    };
    println!(
        "{} page {}/{} ({} records)",
        label,
        view.page,
        view.total_pages(),
        view.total_records
    );
    if view.is_empty() {
        println!("(no rows)");
        return Ok(());
    }

    let batch = view.to_batch()?;
    println!("{}", pretty_format_batches(&[batch])?);
    Ok(())
}

fn print_notices(session: &CatalogSession) {
    session.events().subscribe_fn::<Notice, _>(|notice| match notice.level {
        NoticeLevel::Error => warn!("{}", notice.message),
        level => eprintln!("[{:?}] {}", level, notice.message),
    });
    session.events().subscribe_fn::<ProgressChanged, _>(|progress| {
        if progress.active {
            eprintln!("Selecting... {}%", progress.percent);
        }
    });
}
