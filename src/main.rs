//! labpubs - Lab publications pipeline
//!
//! Fetches works from OpenAlex for every roster author, deduplicates them
//! by title, applies the manual edit overlay, and serves or exports the
//! sorted collection.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! labpubs fetch --authors public/openalex-authors.jsonc --format csv
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! labpubs serve --port 3000
//! ```
//!
//! ### Thumbnail Maintenance
//! ```bash
//! UNSPLASH_ACCESS_KEY=... labpubs thumbs --thumbs-dir public/thumbs
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use labpubs::normalize::Publication;
use labpubs::openalex::WorksClient;
use labpubs::query::{group_by_year, PubFilter};
use labpubs::{config, pipeline, thumbs};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Lab publications pipeline - OpenAlex fetch, dedup and edit overlay
#[derive(Parser)]
#[command(name = "labpubs")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, deduplicate and export the publication list
    Fetch {
        /// Author roster file (JSONC)
        #[arg(long, default_value = "openalex-authors.jsonc")]
        authors: PathBuf,

        /// Edit directives file (JSONC, optional)
        #[arg(long, default_value = "edit-publications.jsonc")]
        edits: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Export format
        #[arg(long, default_value = "json", value_parser = ["json", "csv"])]
        format: String,

        // === Filters ===
        /// Free-text filter over title, abstract, topic, type and journal
        #[arg(long)]
        search: Option<String>,

        /// Keep only works listing this lab author id
        #[arg(long)]
        author: Option<String>,

        /// Keep only works with this type label (e.g. "Article")
        #[arg(long = "type")]
        type_label: Option<String>,

        /// Keep only works from this year onwards
        #[arg(long)]
        year_from: Option<i32>,

        /// Keep only works up to this year
        #[arg(long)]
        year_to: Option<i32>,

        /// Also export the year-grouped view
        #[arg(long)]
        grouped: bool,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Author roster file (JSONC)
        #[arg(long, default_value = "openalex-authors.jsonc")]
        authors: PathBuf,

        /// Edit directives file (JSONC, optional)
        #[arg(long, default_value = "edit-publications.jsonc")]
        edits: PathBuf,
    },

    /// Download stock thumbnails for publications that lack one
    Thumbs {
        /// Author roster file (JSONC)
        #[arg(long, default_value = "openalex-authors.jsonc")]
        authors: PathBuf,

        /// Directory the thumbnail files live in
        #[arg(long, default_value = "public/thumbs")]
        thumbs_dir: PathBuf,

        /// Stock photo search query
        #[arg(long, default_value = thumbs::DEFAULT_STOCK_QUERY)]
        query: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Fetch {
            authors,
            edits,
            output,
            format,
            search,
            author,
            type_label,
            year_from,
            year_to,
            grouped,
        } => {
            let pub_filter = PubFilter {
                search,
                author,
                type_label,
                year_from,
                year_to,
            };
            run_fetch(authors, edits, output, format, pub_filter, grouped).await
        }
        Commands::Serve {
            port,
            host,
            authors,
            edits,
        } => run_server(host, port, authors, edits).await,
        Commands::Thumbs {
            authors,
            thumbs_dir,
            query,
        } => run_thumbs(authors, thumbs_dir, query).await,
    }
}

// ============================================================================
// Fetch Pipeline
// ============================================================================

async fn run_fetch(
    authors_path: PathBuf,
    edits_path: PathBuf,
    output_dir: PathBuf,
    format: String,
    filter: PubFilter,
    grouped: bool,
) -> Result<()> {
    let roster = config::load_roster(&authors_path).context("Failed to load author roster")?;

    if roster.is_empty() {
        println!("Author roster is empty, nothing to fetch.");
        return Ok(());
    }

    let edits = config::load_edits(&edits_path);

    let client = WorksClient::new().context("Failed to build HTTP client")?;
    let publications = pipeline::load_publications(&client, &roster, &edits)
        .await
        .context("Publication load failed")?;

    let filtered = filter.apply(&publications);
    println!(
        "Showing {} filtered works (total {})",
        filtered.len(),
        publications.len()
    );

    // Timestamped output folder, one per run
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output_folder = output_dir.join(format!("publications_{}", timestamp));
    std::fs::create_dir_all(&output_folder).context("Failed to create output directory")?;

    match format.as_str() {
        "csv" => {
            let rows: Vec<CsvRow> = filtered.iter().map(|p| CsvRow::from(*p)).collect();
            let csv_path = output_folder.join("publications.csv");
            save_csv(&csv_path, &rows)?;
        }
        _ => {
            let json_path = output_folder.join("publications.json");
            let text = serde_json::to_string_pretty(&filtered)?;
            std::fs::write(&json_path, text).context("Failed to write JSON export")?;
            println!("Saved: {:?}", json_path);
        }
    }

    if grouped {
        let groups = group_by_year(&filtered);
        let grouped_path = output_folder.join("publications-by-year.json");
        let text = serde_json::to_string_pretty(&groups)?;
        std::fs::write(&grouped_path, text).context("Failed to write grouped export")?;
        println!("Saved: {:?}", grouped_path);
    }

    println!("\n✓ Done. Results in: {}", output_folder.display());
    Ok(())
}

/// Flat CSV row; list-valued fields are joined for the spreadsheet view.
#[derive(Serialize)]
struct CsvRow {
    title: String,
    authors_text: String,
    year: String,
    type_label: String,
    journal: String,
    doi: String,
    link: String,
    journal_url: String,
    lab_authors: String,
    topic: String,
    subfield: String,
    field: String,
    domain: String,
    abstract_text: String,
    thumbnail_url: String,
}

impl From<&Publication> for CsvRow {
    fn from(p: &Publication) -> Self {
        Self {
            title: p.title.clone(),
            authors_text: p.authors_text.clone(),
            year: p.year.map(|y| y.to_string()).unwrap_or_default(),
            type_label: p.type_label.clone(),
            journal: p.journal.clone(),
            doi: p.doi.clone(),
            link: p.link.clone(),
            journal_url: p.journal_url.clone(),
            lab_authors: p.lab_author_names.join("; "),
            topic: p.topic.clone(),
            subfield: p.subfield.clone(),
            field: p.field.clone(),
            domain: p.domain.clone(),
            abstract_text: p.abstract_text.clone(),
            thumbnail_url: p.thumbnail_url.clone(),
        }
    }
}

/// Save data to CSV file
fn save_csv<T: Serialize>(path: &std::path::Path, data: &[T]) -> Result<()> {
    if data.is_empty() {
        println!("No data to save to {:?}", path);
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    for item in data {
        wtr.serialize(item).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    println!("Saved: {:?}", path);
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, authors: PathBuf, edits: PathBuf) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let app_state = Arc::new(AppState {
        authors_path: authors,
        edits_path: edits,
    });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/publications", get(publications_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

struct AppState {
    authors_path: PathBuf,
    edits_path: PathBuf,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Query parameters for the publications endpoint
#[derive(Debug, Deserialize)]
struct PublicationsQuery {
    search: Option<String>,
    author: Option<String>,
    #[serde(rename = "type")]
    type_label: Option<String>,
    year_from: Option<i32>,
    year_to: Option<i32>,
    #[serde(default)]
    grouped: bool,
}

/// Publications endpoint handler.
///
/// Every request performs a fresh load; nothing is cached across loads.
async fn publications_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PublicationsQuery>,
) -> Json<serde_json::Value> {
    info!(?params, "Publications request");

    let publications = match load_for_request(&state).await {
        Ok(publications) => publications,
        Err(e) => {
            error!(error = %e, "Publication load failed");
            return Json(json!({
                "status": format!("error: {}", e),
                "total": 0,
                "count": 0,
                "results": [],
            }));
        }
    };

    let filter = PubFilter {
        search: params.search,
        author: params.author,
        type_label: params.type_label,
        year_from: params.year_from,
        year_to: params.year_to,
    };
    let filtered = filter.apply(&publications);

    if params.grouped {
        let groups = group_by_year(&filtered);
        Json(json!({
            "status": "success",
            "total": publications.len(),
            "count": filtered.len(),
            "groups": groups,
        }))
    } else {
        Json(json!({
            "status": "success",
            "total": publications.len(),
            "count": filtered.len(),
            "results": filtered,
        }))
    }
}

async fn load_for_request(state: &AppState) -> labpubs::Result<Vec<Publication>> {
    let roster = config::load_roster(&state.authors_path)?;
    let edits = config::load_edits(&state.edits_path);
    let client = WorksClient::new()?;
    pipeline::load_publications(&client, &roster, &edits).await
}

// ============================================================================
// Thumbnail Maintenance
// ============================================================================

async fn run_thumbs(authors_path: PathBuf, thumbs_dir: PathBuf, query: String) -> Result<()> {
    let access_key = std::env::var("UNSPLASH_ACCESS_KEY")
        .context("UNSPLASH_ACCESS_KEY env var not set")?;

    let roster = config::load_roster(&authors_path).context("Failed to load author roster")?;

    let client = WorksClient::new().context("Failed to build HTTP client")?;
    let works = client
        .works_for_roster(&roster)
        .await
        .context("Failed to fetch works")?;

    let dois = thumbs::distinct_dois(&works);
    println!("Found {} DOIs", dois.len());

    let stock = thumbs::StockClient::new(access_key, query)?;
    let report = thumbs::update_thumbnails(&dois, &thumbs_dir, &stock)
        .await
        .context("Thumbnail maintenance failed")?;

    println!(
        "\n✓ Thumbnails: {} existing, {} created, {} failed",
        report.existing, report.created, report.failed
    );
    Ok(())
}
