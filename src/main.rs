//! # Paper Sync CLI (`papers`)
//!
//! Browse and maintain a remote paper corpus from the command line.
//!
//! ## Usage
//!
//! ```bash
//! papers --config ./config/papers.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `papers list` | Show the grouped, paginated catalog |
//! | `papers search "<query>"` | Search the external source; `--select` adopts hits |
//! | `papers upload <file>` | Upload one document |
//! | `papers ingest <archive.zip>` | Upload every supported file in a zip |
//! | `papers remove <hash>` | Remove a paper (asks first unless `--yes`) |
//! | `papers refresh` | Ask the store to refresh its index |
//! | `papers dedupe` | Ask the store to drop duplicate chunks |
//! | `papers download "<query>"` | Search and adopt every hit server-side |
//! | `papers add` | Add a paper from raw text |
//! | `papers prefill <file.csv>` | Print clinical form values from a CSV |
//! | `papers health` | Probe the remote store |
//!
//! Notifications and progress go to stderr; data goes to stdout. The exit
//! status is 1 when the command's notification is an error.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use paper_sync::config;
use paper_sync::manager::{CatalogView, PaperManager};
use paper_sync::models::SearchQuery;
use paper_sync::notify::{Notification, NotifyMode};
use paper_sync::pagination::Navigation;
use paper_sync::prefill;
use paper_sync::progress::ProgressMode;
use paper_sync::store::http::HttpStore;

/// Paper Sync CLI: keep a remote research-paper corpus in shape.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. A missing file means built-in defaults.
#[derive(Parser)]
#[command(
    name = "papers",
    about = "Browse, search and bulk-ingest a remote paper corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/papers.toml")]
    config: PathBuf,

    /// Ingestion progress on stderr. Defaults to human when stderr is a TTY.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// Notification format on stderr.
    #[arg(long, global = true, value_enum, default_value = "human")]
    notify: NotifyMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the catalog, grouped by title, newest first.
    List {
        /// Case-insensitive title substring.
        #[arg(long)]
        filter: Option<String>,

        /// Group page (1-indexed).
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Groups per page: 6, 12 or 24.
        #[arg(long)]
        per_page: Option<usize>,

        /// Chunk page of one group, as `TITLE=PAGE`. Repeatable.
        #[arg(long = "expand", value_name = "TITLE=PAGE")]
        expand: Vec<String>,

        /// Print the view as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Keyword search over the external paper source.
    Search {
        query: String,

        /// Results per page: 5, 10 or 20.
        #[arg(long)]
        max_results: Option<usize>,

        /// Search page (1-indexed).
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Earliest publication date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Latest publication date (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,

        /// Hash of a result to add to the catalog. Repeatable.
        #[arg(long = "select", value_name = "HASH")]
        select: Vec<String>,
    },

    /// Upload one document (pdf, doc, docx, csv, txt).
    Upload {
        file: PathBuf,

        /// Title; defaults to the file name without extension.
        #[arg(long)]
        title: Option<String>,
    },

    /// Upload every supported document inside a zip archive.
    Ingest { archive: PathBuf },

    /// Remove the paper a chunk belongs to.
    Remove {
        hash: String,

        /// Do not ask for confirmation.
        #[arg(long)]
        yes: bool,
    },

    /// Ask the store to refresh its index.
    Refresh,

    /// Ask the store to remove duplicate chunks.
    Dedupe,

    /// Search and add every result in one server-side step.
    Download {
        query: String,

        #[arg(long)]
        max_results: Option<usize>,

        #[arg(long)]
        since: Option<String>,

        #[arg(long)]
        until: Option<String>,

        #[arg(long, default_value_t = 0)]
        start_index: usize,
    },

    /// Add a paper from raw text.
    Add {
        #[arg(long)]
        title: String,

        #[arg(long)]
        content: String,
    },

    /// Print clinical form values read from a CSV file.
    Prefill { csv: PathBuf },

    /// Check that the remote store is reachable.
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("paper_sync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let notifier = cli.notify.notifier();

    // Commands that don't require config
    if let Commands::Prefill { csv } = &cli.command {
        let text = std::fs::read_to_string(csv)
            .with_context(|| format!("Failed to read {}", csv.display()))?;
        let note = match prefill::prefill_from_csv(&text) {
            Ok(form) => {
                println!("{}", serde_json::to_string_pretty(&form)?);
                Notification::success(format!("Pre-filled {} fields", form.len()))
            }
            Err(e) => Notification::error(e.to_string()),
        };
        notifier.notify(&note);
        exit_for(&note);
        return Ok(());
    }

    let cfg = config::load_config_or_default(&cli.config)?;
    let store = HttpStore::new(&cfg.remote)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);
    let mut manager = PaperManager::new(store, cfg.clone(), notifier, progress.reporter())?;

    let note = match cli.command {
        Commands::List {
            filter,
            page,
            per_page,
            expand,
            json,
        } => {
            let note = manager.load_papers().await;
            if note.is_error() {
                note
            } else {
                if let Some(n) = per_page {
                    manager.set_papers_per_page(n)?;
                }
                if let Some(f) = filter {
                    manager.set_title_filter(&f);
                }
                if page != 1 && manager.go_to_page(page) == Navigation::Refused {
                    anyhow::bail!("page {} is out of range", page);
                }
                for entry in &expand {
                    let (title, chunk_page) = parse_expand(entry)?;
                    if !manager.go_to_chunk_page(title, chunk_page) {
                        anyhow::bail!("cannot show chunk page {} of '{}'", chunk_page, title);
                    }
                }
                let view = manager.view();
                if json {
                    println!("{}", serde_json::to_string_pretty(&view)?);
                } else {
                    print_view(&view);
                }
                note
            }
        }
        Commands::Search {
            query,
            max_results,
            page,
            since,
            until,
            select,
        } => match manager.sync_catalog().await {
            Err(note) => note,
            Ok(_) => {
                let mut request = manager.search_request(&query).page(page);
                if let Some(n) = max_results {
                    request.max_results = n;
                }
                request.start_date = since;
                request.end_date = until;

                let note = manager.search(&request).await;
                if note.is_error() {
                    note
                } else if select.is_empty() {
                    for hit in manager.search_results() {
                        let marker = if hit.exists_in_db { "*" } else { " " };
                        let similarity = hit
                            .chunk
                            .similarity
                            .map(|s| format!("{:.1}%", s))
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "{} {}  {:>6}  {}",
                            marker, hit.chunk.hash, similarity, hit.chunk.title
                        );
                    }
                    note
                } else {
                    for hash in &select {
                        manager.toggle_select(hash)?;
                    }
                    manager.add_selected().await
                }
            }
        },
        Commands::Upload { file, title } => manager.upload_file(&file, title.as_deref()).await,
        Commands::Ingest { archive } => {
            let (note, summary) = manager.ingest_file(&archive).await;
            if let Some(summary) = summary {
                println!(
                    "uploaded {} / {} files",
                    summary.succeeded, summary.total
                );
                for failed in &summary.failed {
                    println!("  failed: {}  {}", failed.name, failed.error);
                }
            }
            note
        }
        Commands::Remove { hash, yes } => match manager.sync_catalog().await {
            Err(note) => note,
            Ok(_) => {
                manager
                    .remove(&hash, |h| {
                        yes || confirm(&format!("Remove the paper containing chunk {}?", h))
                    })
                    .await
            }
        },
        Commands::Refresh => manager.refresh().await,
        Commands::Dedupe => manager.remove_duplicates().await,
        Commands::Download {
            query,
            max_results,
            since,
            until,
            start_index,
        } => {
            let options = SearchQuery {
                query,
                max_results: max_results.unwrap_or(cfg.search.max_results),
                start_index,
                start_date: since,
                end_date: until,
            };
            manager.download(&options).await
        }
        Commands::Add { title, content } => manager.add_custom(&title, &content).await,
        Commands::Health => manager.health().await,
        Commands::Prefill { .. } => return Ok(()),
    };

    exit_for(&note);
    Ok(())
}

fn exit_for(note: &Notification) {
    if note.is_error() {
        std::process::exit(1);
    }
}

fn parse_expand(entry: &str) -> anyhow::Result<(&str, usize)> {
    let (title, page) = entry
        .rsplit_once('=')
        .with_context(|| format!("--expand expects TITLE=PAGE, got '{}'", entry))?;
    let page = page
        .trim()
        .parse()
        .with_context(|| format!("invalid chunk page in '{}'", entry))?;
    Ok((title, page))
}

fn confirm(prompt: &str) -> bool {
    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "{} [y/N] ", prompt);
    let _ = stderr.flush();
    let mut answer = String::new();
    if std::io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn print_view(view: &CatalogView) {
    let c = &view.controls;
    if view.groups.is_empty() {
        println!("No papers found.");
        return;
    }
    println!(
        "Page {}/{} ({} papers per page){}",
        c.page,
        c.total_pages,
        view.papers_per_page,
        if view.title_filter.is_empty() {
            String::new()
        } else {
            format!(", filter '{}'", view.title_filter)
        }
    );
    for group in &view.groups {
        println!();
        println!("## {}  ({} chunks)", group.title, group.total_chunks);
        for chunk in &group.chunks {
            println!("  [{}] {}", chunk.hash, preview(&chunk.content, 100));
        }
        if let Some(cc) = &group.chunk_controls {
            println!("  chunks page {}/{}", cc.page, cc.total_pages);
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{}...", cut)
}
