use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use b3perf::aggregator::{run_universe, PerformanceTable};
use b3perf::cache::SnapshotCache;
use b3perf::config::Config;
use b3perf::dashboard::{render_comparison, render_table, SortKey};
use b3perf::pricing::fetcher::fetch_with_retry;
use b3perf::pricing::yahoo::YahooProvider;
use b3perf::pricing::QuoteProvider;
use b3perf::sectors::SectorMap;

#[derive(Parser)]
#[command(name = "b3perf", version, about = "Painel de desempenho de ações da B3")]
struct Cli {
    /// Optional TOML config file overriding the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the performance table (cached when fresh)
    Show {
        /// Only rows from this sector
        #[arg(long)]
        sector: Option<String>,

        /// Column to sort by
        #[arg(long, value_enum, default_value = "ticker")]
        sort: SortKey,

        /// Sort descending (biggest gainers first)
        #[arg(long)]
        desc: bool,

        /// Ignore the cache and fetch fresh data
        #[arg(long)]
        refresh: bool,
    },

    /// Invalidate the cache and re-fetch everything
    Refresh,

    /// List the tracked universe grouped by sector
    Sectors,

    /// Compare two tickers, both normalized to 100 at the first common date
    Compare { ticker_a: String, ticker_b: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let sectors = load_sectors(&config)?;

    match cli.command {
        Commands::Show {
            sector,
            sort,
            desc,
            refresh,
        } => {
            let cache = SnapshotCache::new(None, config.cache_max_age_hours)?;
            if refresh {
                cache.invalidate();
            }
            let table = load_or_fetch(&cache, &sectors, &config).await?;
            println!("{}", render_table(&table, sector.as_deref(), sort, desc));
            println!(
                "\nGerado em: {}",
                table
                    .generated_at
                    .with_timezone(&chrono::Local)
                    .format("%d/%m/%Y %H:%M")
            );
        }

        Commands::Refresh => {
            let cache = SnapshotCache::new(None, config.cache_max_age_hours)?;
            cache.invalidate();
            let table = load_or_fetch(&cache, &sectors, &config).await?;
            println!(
                "Atualizadas {} de {} ações",
                table.len(),
                sectors.len()
            );
        }

        Commands::Sectors => {
            for sector in sectors.sector_names() {
                println!("{}", sector);
                for ticker in sectors.tickers_in_sector(sector) {
                    println!("  {}", ticker);
                }
            }
        }

        Commands::Compare { ticker_a, ticker_b } => {
            let provider = YahooProvider::new()?;
            let series_a = fetch_with_retry(
                &provider,
                &ticker_a,
                config.lookback_days,
                config.max_retries,
            )
            .await?;
            let series_b = fetch_with_retry(
                &provider,
                &ticker_b,
                config.lookback_days,
                config.max_retries,
            )
            .await?;
            println!(
                "{}",
                render_comparison(&ticker_a, &series_a, &ticker_b, &series_b)
            );
        }
    }

    Ok(())
}

fn load_sectors(config: &Config) -> Result<SectorMap> {
    match &config.sector_file {
        Some(path) => SectorMap::from_csv_path(path),
        None => Ok(SectorMap::builtin()),
    }
}

/// Cache-first load: serve a fresh cached table, otherwise run the full
/// aggregation with a progress bar and persist the result.
async fn load_or_fetch(
    cache: &SnapshotCache,
    sectors: &SectorMap,
    config: &Config,
) -> Result<PerformanceTable> {
    if let Some(table) = cache.get() {
        return Ok(table);
    }

    info!("Cache miss, fetching {} tickers", sectors.len());
    let provider: Arc<dyn QuoteProvider> = Arc::new(YahooProvider::new()?);

    let bar = ProgressBar::new(sectors.len() as u64);
    bar.set_style(
        ProgressStyle::with_template("Carregando dados das ações {bar:30} {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let table = run_universe(provider, sectors, config, |completed, _total| {
        bar.set_position(completed as u64);
    })
    .await;
    bar.finish_and_clear();

    cache.save(&table);
    Ok(table)
}
