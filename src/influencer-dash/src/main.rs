//! Influencer Dash — campaign performance, ROAS and payout reporting over the
//! influencer CSV datasets.
//!
//! The binary is the host for the reporting pipeline: each invocation (or each
//! line in `session` mode) is one filter interaction and one full render.

mod view;

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use influencer_core::config::AppConfig;
use influencer_reporting::filter::{self, DateRange, FilterSelection, Selection};
use influencer_reporting::{export, render, DataCache};
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "influencer-dash")]
#[command(about = "Influencer campaign dashboard: ROAS, revenue and payout reporting")]
#[command(version)]
struct Cli {
    /// Directory containing the four dataset CSV files (overrides config)
    #[arg(long, env = "INFLUENCER_DASH__DATA_DIR")]
    data_dir: Option<String>,

    /// Leaderboard size (overrides config)
    #[arg(long, env = "INFLUENCER_DASH__VIEW__TOP_N")]
    top_n: Option<usize>,

    /// Human-readable logs instead of JSON
    #[arg(long, default_value_t = false)]
    plain_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the dashboard once for the given filters
    Render {
        #[command(flatten)]
        filters: FilterArgs,

        /// Print the view model as JSON instead of a text report
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Write roas_summary.csv, payouts.csv and campaign_summary.csv
    Export {
        #[command(flatten)]
        filters: FilterArgs,

        /// Output directory (overrides config)
        #[arg(short, long, env = "INFLUENCER_DASH__EXPORT_DIR")]
        out: Option<String>,
    },

    /// List the platforms, categories and date bounds available for filtering
    Options {
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Read one JSON filter selection per stdin line and emit one JSON view per line
    Session,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Keep only this platform (repeatable). Omit to keep all platforms.
    #[arg(long = "platform", value_name = "PLATFORM")]
    platforms: Vec<String>,

    /// Select no platform at all; nothing passes
    #[arg(long, default_value_t = false, conflicts_with = "platforms")]
    no_platforms: bool,

    /// Keep only this category (repeatable). Omit to keep all categories.
    #[arg(long = "category", value_name = "CATEGORY")]
    categories: Vec<String>,

    /// Select no category at all; nothing passes
    #[arg(long, default_value_t = false, conflicts_with = "categories")]
    no_categories: bool,

    /// First tracking date to include (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last tracking date to include (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl FilterArgs {
    fn selection(&self) -> FilterSelection {
        let pick = |values: &[String], cleared: bool| {
            if cleared {
                Selection::none()
            } else if values.is_empty() {
                Selection::All
            } else {
                Selection::only(values.iter().cloned())
            }
        };

        // Open ends are clamped to the observed dates by the filter engine.
        let date_range = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some(DateRange::new(
                from.unwrap_or(NaiveDate::MIN),
                to.unwrap_or(NaiveDate::MAX),
            )),
        };

        FilterSelection {
            platforms: pick(&self.platforms, self.no_platforms),
            categories: pick(&self.categories, self.no_categories),
            date_range,
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "influencer_dash=info,influencer_reporting=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load();
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    init_tracing(config.log_json && !cli.plain_logs);
    if let Err(e) = &loaded {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    // Apply CLI overrides
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(n) = cli.top_n {
        config.view.top_n = n;
    }

    info!(
        data_dir = %config.data_dir,
        top_n = config.view.top_n,
        "Configuration loaded"
    );

    let cache = DataCache::new(&config.data_dir);

    match cli.command {
        Commands::Render { filters, json } => {
            let data = load(&cache)?;
            let view = render(&data, &filters.selection(), &config.view);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                view::print_dashboard(&view);
            }
        }
        Commands::Export { filters, out } => {
            let out = out.unwrap_or_else(|| config.export_dir.clone());
            if same_dir(Path::new(&out), cache.dir()) {
                bail!("export directory {out} is the data directory; exporting would overwrite payouts.csv");
            }
            let data = load(&cache)?;
            let view = render(&data, &filters.selection(), &config.view);
            let report = export::export_all(&view, Path::new(&out))
                .with_context(|| format!("exporting to {out}"))?;
            view::print_export(&report);
        }
        Commands::Options { json } => {
            let data = load(&cache)?;
            let options = filter::filter_options(&data);
            if json {
                println!("{}", serde_json::to_string_pretty(&options)?);
            } else {
                view::print_options(&options);
            }
        }
        Commands::Session => run_session(&cache, &config)?,
    }

    Ok(())
}

fn load(cache: &DataCache) -> anyhow::Result<std::sync::Arc<influencer_reporting::DataContext>> {
    cache.get_or_load().with_context(|| {
        format!(
            "ensure influencers.csv, posts.csv, tracking_data.csv and payouts.csv are in {}",
            cache.dir().display()
        )
    })
}

/// One render per input line. The dataset is read once and reloaded only when
/// a source file changes on disk.
fn run_session(cache: &DataCache, config: &AppConfig) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let selection: FilterSelection = if line.trim().is_empty() {
            FilterSelection::all()
        } else {
            match serde_json::from_str(&line) {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed filter selection");
                    continue;
                }
            }
        };

        if cache.is_stale() {
            info!("Dataset changed on disk, reloading");
            cache.invalidate();
        }
        let data = load(cache)?;
        let view = render(&data, &selection, &config.view);
        println!("{}", serde_json::to_string(&view)?);
    }
    Ok(())
}
