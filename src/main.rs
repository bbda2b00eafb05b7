use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use quotebook::display::{RenderFormat, RenderSurface};
use quotebook::storage::settings::{load_settings, save_settings, AppSettings};
use quotebook::storage::{get_data_dir, transfer, FileKvStore, KeyValueStore, MemoryKvStore};
use quotebook::sync::{HttpRemote, SyncOutcome};
use quotebook::{
    CategoryFilter, ConflictResolver, QuoteStore, QuoteViewer, SharedQuoteStore, SyncReconciler,
    SyncTask,
};

#[derive(Parser)]
#[command(name = "quotebook")]
#[command(about = "Keep, show and sync a collection of quotes", long_about = None)]
struct Cli {
    /// Directory holding quotes and settings
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a random quote
    Show {
        /// Only pick from this category ("all" for every category)
        #[arg(long)]
        category: Option<String>,
        /// Print HTML markup instead of plain text
        #[arg(long)]
        html: bool,
    },
    /// Add a quote
    Add { text: String, category: String },
    /// List categories
    Categories,
    /// Print or change the remembered category filter
    Filter { category: Option<String> },
    /// Merge quotes from a JSON file
    Import { file: PathBuf },
    /// Write quotes.json into a directory
    Export { dir: Option<PathBuf> },
    /// Run one sync cycle
    Sync {
        /// Resolve conflicts right away
        #[arg(long, value_enum)]
        resolve: Option<Choice>,
    },
    /// Sync periodically; type `keep`, `accept`, `show` or `quit`
    Watch {
        /// Seconds between cycles (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Print the effective settings
    Config {
        /// Write the settings file if it does not exist yet
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Choice {
    KeepLocal,
    AcceptServer,
}

struct TerminalSurface {
    format: RenderFormat,
}

impl RenderSurface for TerminalSurface {
    fn set_content(&self, _region: &str, content: &str) {
        println!("{}", content);
    }

    fn format(&self) -> RenderFormat {
        self.format
    }
}

const TEXT: TerminalSurface = TerminalSurface {
    format: RenderFormat::Text,
};

struct App {
    data_dir: PathBuf,
    settings: AppSettings,
    prefs: Arc<dyn KeyValueStore>,
    store: SharedQuoteStore,
}

impl App {
    fn open(data_dir: PathBuf) -> Self {
        let settings = load_settings(&data_dir);
        let prefs: Arc<dyn KeyValueStore> = Arc::new(FileKvStore::new(data_dir.clone()));
        let store = QuoteStore::load(prefs.clone()).into_shared();
        Self {
            data_dir,
            settings,
            prefs,
            store,
        }
    }

    fn viewer(&self) -> QuoteViewer {
        QuoteViewer::new(
            self.store.clone(),
            self.prefs.clone(),
            Arc::new(MemoryKvStore::new()),
        )
    }

    fn reconciler(&self) -> Result<Arc<SyncReconciler>> {
        let remote = HttpRemote::new(&self.settings).context("Failed to build HTTP client")?;
        let resolver = ConflictResolver::new(self.store.clone());
        Ok(Arc::new(SyncReconciler::new(
            self.store.clone(),
            Arc::new(remote),
            resolver,
        )))
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => get_data_dir()?,
    };
    let app = App::open(data_dir);

    match cli.command {
        Commands::Show { category, html } => {
            let mut viewer = app.viewer();
            if let Some(category) = category {
                viewer.set_filter(CategoryFilter::from_selector(&category));
            }
            let surface = TerminalSurface {
                format: if html { RenderFormat::Html } else { RenderFormat::Text },
            };
            viewer.show_random(&surface).await;
        }
        Commands::Add { text, category } => {
            let added = app.store.lock().await.add(&text, &category)?;
            println!("Added {}", added);
        }
        Commands::Categories => {
            for category in app.store.lock().await.categories() {
                println!("{}", category);
            }
        }
        Commands::Filter { category } => {
            let mut viewer = app.viewer();
            if let Some(category) = category {
                viewer.set_filter(CategoryFilter::from_selector(&category));
            }
            println!("{}", viewer.filter().as_selector());
        }
        Commands::Import { file } => {
            let mut store = app.store.lock().await;
            let summary = transfer::import_from_file(&mut store, &file).await?;
            println!(
                "Imported {} new quotes (skipped {} duplicates).",
                summary.added, summary.skipped
            );
        }
        Commands::Export { dir } => {
            let dir = match dir {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let path = transfer::export_to_file(&*app.store.lock().await, &dir).await?;
            println!("Exported to {}", path.display());
        }
        Commands::Sync { resolve } => {
            let reconciler = app.reconciler()?;
            if let SyncOutcome::Completed(report) = reconciler.sync_now().await {
                if let Some(error) = &report.fetch_error {
                    println!("Sync failed: {}", error);
                } else {
                    println!(
                        "Synced: {} added, {} conflicts.",
                        report.added, report.conflicts
                    );
                }
            }

            let resolver = reconciler.resolver();
            for conflict in resolver.pending() {
                println!("Conflict: local {} / server {}", conflict.local, conflict.server);
            }
            let resolution = match resolve {
                Some(Choice::KeepLocal) => Some(resolver.keep_local()),
                Some(Choice::AcceptServer) => Some(resolver.accept_server().await),
                None => None,
            };
            if let Some(resolution) = resolution {
                println!("{}", resolution);
            }
        }
        Commands::Watch { interval } => {
            watch(&app, interval.unwrap_or(app.settings.sync_interval_secs)).await?;
        }
        Commands::Config { init } => {
            if init && !app.data_dir.join("settings.json").exists() {
                save_settings(&app.data_dir, &app.settings)?;
            }
            println!("{}", serde_json::to_string_pretty(&app.settings)?);
        }
    }

    Ok(())
}

async fn watch(app: &App, interval_secs: u64) -> Result<()> {
    let reconciler = app.reconciler()?;
    let resolver = reconciler.resolver().clone();
    let viewer = app.viewer();

    let mut notices = reconciler.subscribe();
    let mut pending = resolver.subscribe();
    let task = SyncTask::start(reconciler.clone(), Duration::from_secs(interval_secs.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    viewer.show_random(&TEXT).await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    println!("{}", notice);
                }
            }
            changed = pending.changed() => {
                if changed.is_err() {
                    break;
                }
                let conflicts = pending.borrow_and_update().clone();
                for conflict in &conflicts {
                    println!("Conflict: local {} / server {}", conflict.local, conflict.server);
                }
                if !conflicts.is_empty() {
                    println!("Type `keep` to keep local versions or `accept` to use the server's.");
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let resolution = match line.trim() {
                    "keep" => resolver.keep_local(),
                    "accept" => resolver.accept_server().await,
                    "show" => {
                        viewer.show_random(&TEXT).await;
                        continue;
                    }
                    "quit" | "exit" => break,
                    "" => continue,
                    other => {
                        println!("Unknown command: {}", other);
                        continue;
                    }
                };
                println!("{}", resolution);
            }
        }
    }

    task.stop().await;
    Ok(())
}
