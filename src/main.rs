use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use iptv_manager::{
    config::Config,
    host::{
        ConsoleDialogs, ConsoleProgress, Host, JsonSettingsStore, LocalHost, ProgressReporter,
        SettingsStore,
    },
    ingestor::{Aggregator, BackgroundService, RefreshOutcome},
    services::{catchup::parse_duration_label, Program, RestartState},
    sources::{AddonSource, DocumentKind, Location, Source, SourceHandler},
    utils::{DateTimeParser, ProgramTime},
};

#[derive(Parser)]
#[command(name = "iptv-manager")]
#[command(version)]
#[command(about = "Aggregates channels and guide data from plugins, URLs and files into M3U and XMLTV")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all enabled sources and write the playlist and guide
    Refresh,
    /// Refresh periodically until interrupted
    Service,
    /// Manage sources
    #[command(subcommand)]
    Sources(SourcesCommand),
    /// Toggle IPTV support of plugin addons
    #[command(subcommand)]
    Addons(AddonsCommand),
    /// Play a programme through a source's catch-up template
    Play {
        /// Channel name as shown in the guide
        #[arg(long)]
        channel: String,
        /// Programme start time
        #[arg(long, value_parser = parse_start)]
        start: ProgramTime,
        /// Programme length as `S`, `M:S` or `H:M:S`
        #[arg(long)]
        duration: String,
    },
}

#[derive(Subcommand)]
enum SourcesCommand {
    /// List plugin and user-defined sources
    List,
    /// Create a new, disabled source
    Add { name: Option<String> },
    Rename { uuid: Uuid, name: String },
    Enable { uuid: Uuid },
    Disable { uuid: Uuid },
    Delete {
        uuid: Uuid,
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Set where the playlist of a source comes from
    SetPlaylist {
        uuid: Uuid,
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Set where the guide of a source comes from
    SetGuide {
        uuid: Uuid,
        #[command(flatten)]
        location: LocationArgs,
    },
}

#[derive(Subcommand)]
enum AddonsCommand {
    Enable { addon_id: String },
    Disable { addon_id: String },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct LocationArgs {
    #[arg(long)]
    url: Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
    /// Clear the location
    #[arg(long)]
    none: bool,
}

impl LocationArgs {
    fn into_location(self) -> Option<Location> {
        match (self.url, self.file) {
            (Some(url), _) => Some(Location::Url(url)),
            (None, Some(file)) => Some(Location::File(file)),
            (None, None) => None,
        }
    }
}

fn parse_start(value: &str) -> Result<ProgramTime, String> {
    DateTimeParser::parse_program_time(value).map_err(|e| e.to_string())
}

fn build_host(config: &Config) -> Host {
    let settings: Arc<dyn SettingsStore> =
        Arc::new(JsonSettingsStore::open(&config.storage.settings_path()));
    let local = Arc::new(LocalHost::new(&config.host, Arc::clone(&settings)));

    Host {
        actions: local.clone(),
        addons: local.clone(),
        settings,
        playback: local,
        dialogs: Arc::new(ConsoleDialogs::new(std::io::stdin().is_terminal())),
    }
}

async fn refresh(aggregator: &Aggregator) -> Result<()> {
    let progress = ConsoleProgress::new();
    progress.watch_ctrl_c();

    let reporter: &dyn ProgressReporter = progress.as_ref();
    let mut restart_state = RestartState::default();
    match aggregator.refresh(Some(reporter), &mut restart_state).await {
        RefreshOutcome::Completed(summary) => {
            info!(
                "Wrote {} channels ({} raw playlists) and {} programmes ({} raw guides) from {} sources",
                summary.channels,
                summary.raw_playlists,
                summary.programmes,
                summary.raw_guides,
                summary.sources
            );
            Ok(())
        }
        RefreshOutcome::Cancelled => {
            info!("Refresh cancelled");
            Ok(())
        }
        RefreshOutcome::Failed(message) => bail!(message),
    }
}

async fn sources(aggregator: &Aggregator, command: SourcesCommand) -> Result<()> {
    let catalog = aggregator.catalog();
    let store = &catalog.store;

    match command {
        SourcesCommand::List => {
            for source in catalog.detect_sources().await? {
                let state = if source.is_enabled() { "enabled" } else { "disabled" };
                match &source {
                    Source::Addon(addon) => println!(
                        "addon     {:<36}  {:<8}  {}",
                        addon.addon_id(),
                        state,
                        addon.display_name()
                    ),
                    Source::External(external) => {
                        let external = external.source();
                        let describe = |location: &Option<Location>| {
                            location
                                .as_ref()
                                .map(|l| l.to_string())
                                .unwrap_or_else(|| "-".to_string())
                        };
                        println!(
                            "external  {:<36}  {:<8}  {} (playlist: {}, guide: {})",
                            external.uuid,
                            state,
                            external.name,
                            describe(&external.playlist),
                            describe(&external.epg)
                        );
                    }
                }
            }
        }
        SourcesCommand::Add { name } => {
            let source = store.create(name)?;
            println!("{}", source.uuid);
        }
        SourcesCommand::Rename { uuid, name } => {
            store.rename(&uuid, &name)?;
        }
        SourcesCommand::Enable { uuid } => {
            store.set_enabled(&uuid, true)?;
        }
        SourcesCommand::Disable { uuid } => {
            store.set_enabled(&uuid, false)?;
        }
        SourcesCommand::Delete { uuid, yes } => {
            let source = store.get(&uuid)?;
            let confirmed = yes
                || catalog
                    .host
                    .dialogs
                    .yes_no("Delete source", &format!("Delete {}?", source.name))
                    .await;
            if !confirmed {
                info!("Keeping {}", source.name);
                return Ok(());
            }
            store.delete(&uuid)?;
        }
        SourcesCommand::SetPlaylist { uuid, location } => {
            store.set_location(&uuid, DocumentKind::Playlist, location.into_location())?;
        }
        SourcesCommand::SetGuide { uuid, location } => {
            store.set_location(&uuid, DocumentKind::Epg, location.into_location())?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("iptv_manager={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting IPTV Manager v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config.display());

    let host = build_host(&config);
    let aggregator = Aggregator::from_config(&config, host.clone())?;

    match cli.command {
        Command::Refresh => refresh(&aggregator).await?,
        Command::Service => {
            BackgroundService::new(aggregator, config.scheduler.clone())
                .run()
                .await
        }
        Command::Sources(command) => sources(&aggregator, command).await?,
        Command::Addons(AddonsCommand::Enable { addon_id }) => {
            AddonSource::set_enabled(host.addons.as_ref(), &addon_id, true).await?
        }
        Command::Addons(AddonsCommand::Disable { addon_id }) => {
            AddonSource::set_enabled(host.addons.as_ref(), &addon_id, false).await?
        }
        Command::Play {
            channel,
            start,
            duration,
        } => {
            let program = Program {
                channel,
                start,
                duration: parse_duration_label(&duration)?,
            };
            if aggregator.catchup().play_program(&program).await?.is_none() {
                info!("Nothing was played");
            }
        }
    }

    Ok(())
}
