use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mapchron::core::{load_document, save_document};
use mapchron::plugins::{builtin_plugins, legend};
use mapchron::{AppCore, BaseMap, Color, CoreConfig, RegionIndex};

#[derive(Parser)]
#[command(name = "mapchron")]
#[command(about = "Paint map regions across a timeline of scenario entries")]
struct Cli {
    /// Base map GeoJSON whose feature order defines region indices
    #[arg(long, value_name = "GEOJSON")]
    basemap: PathBuf,

    /// JSON config for new documents
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a document with the default timeline
    New {
        #[arg(value_name = "FILE")]
        out: PathBuf,
    },
    /// Print the timeline, color usage and legend of a document
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Paint (or erase) regions of one entry
    Paint {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        entry: usize,
        /// Color as #rrggbb
        #[arg(long, conflicts_with = "erase", required_unless_present = "erase")]
        color: Option<Color>,
        #[arg(long)]
        erase: bool,
        /// Region indices, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        regions: Vec<RegionIndex>,
    },
    /// Insert an entry seeded from the one before it
    AddEntry {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        at: usize,
    },
    /// Remove an entry
    DeleteEntry {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        at: usize,
    },
    /// Edit the date and event text of an entry
    SetEvent {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        entry: usize,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        event: Option<String>,
        /// Blank both fields first
        #[arg(long)]
        clear: bool,
    },
    /// Name a color in the legend
    Label {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        color: Color,
        #[arg(long)]
        label: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "mapchron=debug" } else { "mapchron=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn new_core(basemap: &BaseMap, config: Option<&Path>) -> anyhow::Result<AppCore> {
    let config = match config {
        Some(path) => CoreConfig::from_path(path)?,
        None => CoreConfig::default(),
    };
    Ok(AppCore::builder(basemap)
        .config(config)
        .plugins(builtin_plugins()?)
        .build())
}

async fn open(basemap: &BaseMap, config: Option<&Path>, file: &Path) -> anyhow::Result<AppCore> {
    let mut core = new_core(basemap, config)?;
    let document = load_document(file).await?;
    core.load_save(document.save)
        .with_context(|| format!("Failed to load {:?}", file))?;
    Ok(core)
}

fn print_info(core: &AppCore, basemap: &BaseMap) -> anyhow::Result<()> {
    println!("=== Timeline ({} entries, {} regions) ===", core.entries().len(), basemap.region_count());
    for (i, (entry, usage)) in core.entries().iter().zip(core.color_usage()).enumerate() {
        println!("\n[{}] {} - {}", i, display_or_dash(&entry.date), display_or_dash(&entry.event));
        if usage.is_empty() {
            println!("  (no painted regions)");
        }
        for (color, count) in usage.iter() {
            println!("  {}: {} regions", color, count);
        }
    }

    let labels = legend::legend(core)?;
    if !labels.labels.is_empty() {
        println!("\n=== Legend ===");
        for (color, label) in &labels.labels {
            println!("  {} {}", color, display_or_dash(label));
        }
    }
    Ok(())
}

fn display_or_dash(text: &str) -> &str {
    if text.is_empty() { "-" } else { text }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    let basemap_path = args.basemap;
    let basemap = BaseMap::from_path(&basemap_path)?;
    info!(path = ?basemap_path, regions = basemap.region_count(), "base map loaded");
    let config = args.config.as_deref();

    match args.command {
        Command::New { out } => {
            let core = new_core(&basemap, config)?;
            save_document(&out, &core.save()).await?;
            println!("Created {:?} with {} entries", out, core.entries().len());
        }
        Command::Info { file } => {
            let core = open(&basemap, config, &file).await?;
            print_info(&core, &basemap)?;
        }
        Command::Paint { file, entry, color, erase, regions } => {
            let mut core = open(&basemap, config, &file).await?;
            core.update_active_entry(entry)?;
            if let Some(color) = color {
                core.set_color_bar_color(color);
            }
            core.update_erasing(erase);
            core.assign_regions(&regions)?;
            save_document(&file, &core.save()).await?;
            println!("Updated {} regions of entry {}", regions.len(), entry);
        }
        Command::AddEntry { file, at } => {
            let mut core = open(&basemap, config, &file).await?;
            core.add_entry(at)?;
            save_document(&file, &core.save()).await?;
            println!("Inserted entry {} ({} entries)", at, core.entries().len());
        }
        Command::DeleteEntry { file, at } => {
            let mut core = open(&basemap, config, &file).await?;
            core.delete_entry(at)?;
            save_document(&file, &core.save()).await?;
            println!("Deleted entry {} ({} entries)", at, core.entries().len());
        }
        Command::SetEvent { file, entry, date, event, clear } => {
            let mut core = open(&basemap, config, &file).await?;
            core.update_active_entry(entry)?;
            if clear {
                core.clear_entry();
            }
            if let Some(date) = date {
                core.update_event_date(date)?;
            }
            if let Some(event) = event {
                core.update_event(event)?;
            }
            save_document(&file, &core.save()).await?;
            println!("Updated entry {}", entry);
        }
        Command::Label { file, color, label } => {
            let mut core = open(&basemap, config, &file).await?;
            legend::set_label(&mut core, color, label)?;
            save_document(&file, &core.save()).await?;
            println!("Labelled {}", color);
        }
    }

    Ok(())
}
