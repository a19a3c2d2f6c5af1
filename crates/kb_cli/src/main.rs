use anyhow::Context;
use chrono::{Local, NaiveTime};
use clap::Parser;
use kb_core::{Config, DatasetStore, InferenceModel};
use kb_scrapers::HelpCenterScraper;
use kb_sync::{GapSynthesizer, SyncEngine, SyncManager};
use std::sync::Arc;
use tracing::{error, info};

mod logging;
mod schedule;

use schedule::{parse_time_of_day, DailySchedule, HumanDuration};

#[derive(Parser, Debug)]
#[command(author, version, about = "Keeps a help-center catalog in sync and reports its content gaps", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    config: Config,
    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Less output (-q warnings, -qq errors only)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    quiet: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Scrape, enrich the changed articles and store the catalog once
    Sync,
    /// Build the gap report from the stored catalog
    Gaps,
    /// Sync now, then once a day at the given time
    Run {
        /// Local time of the daily run (HH:MM)
        #[arg(long, default_value = "08:00", value_parser = parse_time_of_day)]
        at: NaiveTime,
        /// How often to check whether the daily run is due (e.g. 30s, 1m, 1h)
        #[arg(long, default_value = "1m")]
        poll: HumanDuration,
        /// Also build the gap report after each sync
        #[arg(long)]
        gaps: bool,
    },
}

/// Everything a run needs, built once from the config.
struct App {
    manager: SyncManager,
    synthesizer: GapSynthesizer,
}

impl App {
    async fn new(config: &Config) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;

        let store: Arc<dyn DatasetStore> = kb_storage::create_storage(&config.storage).await?;
        info!("💾 Storage initialized (using {})", config.storage);

        let model: Arc<dyn InferenceModel> = kb_inference::create_model(config)?;
        info!("🧠 Inference model initialized (using {})", model.name());

        let scraper = HelpCenterScraper::from_config(config)?;
        info!("🦗 Scraper initialized for {}", config.base_url);

        let engine = SyncEngine::new(model.clone(), config.batch_size);
        Ok(Self {
            manager: SyncManager::new(Arc::new(scraper), store.clone(), engine, &config.data_path),
            synthesizer: GapSynthesizer::new(model, store, &config.data_path, &config.gaps_path),
        })
    }

    async fn sync(&self) -> kb_core::Result<()> {
        let report = self.manager.run().await?;
        info!(
            "Sync finished: {} added, {} modified, {} unchanged, {} retained, {} total",
            report.stats.added,
            report.stats.modified,
            report.stats.unchanged,
            report.stats.retained,
            report.total_records
        );
        Ok(())
    }

    async fn gaps(&self) {
        let report = self.synthesizer.run().await;
        info!(
            "Gap report finished: {} gap(s), {} deep dive(s)",
            report.gaps_written, report.deep_dives_written
        );
    }

    async fn cycle(&self, with_gaps: bool) -> kb_core::Result<()> {
        self.sync().await?;
        if with_gaps {
            self.gaps().await;
        }
        Ok(())
    }

    async fn run_daily(&self, mut schedule: DailySchedule, poll: HumanDuration, with_gaps: bool) {
        info!("Starting the first sync now");
        match self.cycle(with_gaps).await {
            Ok(()) => schedule.record_startup_run(Local::now().naive_local()),
            Err(e) => error!("Error during sync: {}", e),
        }

        info!(
            "Next sync at {}, checking every {}s",
            schedule.next_run(Local::now().naive_local()),
            poll.0.as_secs()
        );
        let mut ticker = tokio::time::interval(poll.0);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let now = Local::now().naive_local();
            if !schedule.is_due(now) {
                continue;
            }
            info!("Starting the daily sync scheduled at {}", schedule.at());
            match self.cycle(with_gaps).await {
                Ok(()) => {
                    schedule.mark_done(now);
                    info!("Next sync at {}", schedule.next_run(Local::now().naive_local()));
                }
                Err(e) => error!("Error during sync, retrying at the next poll: {}", e),
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::level_from_flags(cli.verbose, cli.quiet));
    tracing::debug!("{:?}", cli.config);

    let app = App::new(&cli.config).await?;

    match cli.command {
        Commands::Sync => app.sync().await?,
        Commands::Gaps => app.gaps().await,
        Commands::Run { at, poll, gaps } => {
            tokio::select! {
                _ = app.run_daily(DailySchedule::new(at), poll, gaps) => {}
                _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
            }
        }
    }

    Ok(())
}
