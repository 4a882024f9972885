use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};

use fibramap::config::{ConfigError, MapConfig};
use fibramap::map::feature::FeatureId;
use fibramap::map::fetcher::FeatureFetcher;
use fibramap::map::session::{PredisposedSink, SessionClosed, SessionHandle, spawn_session};
use fibramap::map::sync::{FetchOutcome, SyncAction, ViewportSync};
use fibramap::map::viewport::{LatLng, Viewport};
use fibramap::net::types::{PredisposizioneCreate, TfoCreate};
use fibramap::net::{ApiClient, ApiError};
use fibramap::services::{self, ServiceError};

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Session(#[from] SessionClosed),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("stdin read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

#[derive(Parser, Debug)]
#[command(name = "fibramap", about = "Building fiber-readiness map client")]
struct Cli {
    #[arg(long, env = "FIBRAMAP_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, short, global = true, help = "Log at debug level")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the API is reachable.
    Ping,
    /// Load one viewport and print what the map would show.
    Bbox(ViewArgs),
    /// Run a live map session driven by commands on stdin.
    Watch(ViewArgs),
    Predisposizioni(PredisposizioniCommand),
    Tfo(TfoCommand),
}

#[derive(Args, Debug, Clone, Copy)]
struct ViewArgs {
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    lon: Option<f64>,

    #[arg(long)]
    zoom: Option<u8>,

    #[arg(long, default_value_t = 1280)]
    width: u32,

    #[arg(long, default_value_t = 800)]
    height: u32,
}

#[derive(Args, Debug)]
struct PredisposizioniCommand {
    #[command(subcommand)]
    command: PredisposizioniSubcommand,
}

#[derive(Subcommand, Debug)]
enum PredisposizioniSubcommand {
    List,
    Save {
        #[arg(long, help = "PredisposizioneCreate JSON object")]
        data: String,
    },
    Delete {
        id: i64,
    },
}

#[derive(Args, Debug)]
struct TfoCommand {
    #[command(subcommand)]
    command: TfoSubcommand,
}

#[derive(Subcommand, Debug)]
enum TfoSubcommand {
    List {
        building_id: i64,
    },
    Create {
        #[arg(long, help = "TfoCreate JSON object")]
        data: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let level = if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_max_level(level).init();

    let mut config = MapConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    let client = ApiClient::new(&config)?;

    match cli.command {
        Command::Ping => run_ping(&client).await,
        Command::Bbox(view) => run_bbox(&client, &config, view).await,
        Command::Watch(view) => run_watch(client, &config, view).await,
        Command::Predisposizioni(command) => run_predisposizioni(&client, command).await,
        Command::Tfo(command) => run_tfo(&client, command).await,
    }
}

fn initial_viewport(config: &MapConfig, view: ViewArgs) -> Viewport {
    let center = LatLng::new(
        view.lat.unwrap_or(config.default_center.lat),
        view.lon.unwrap_or(config.default_center.lon),
    );
    let zoom = view.zoom.unwrap_or(config.default_zoom).min(config.max_zoom);
    Viewport::from_center(center, zoom, view.width, view.height)
}

async fn run_ping(client: &ApiClient) -> Result<(), CliError> {
    let health = client.health().await?;
    println!("ok {}", health.message.unwrap_or_default());
    Ok(())
}

#[derive(Serialize)]
struct BboxSummary {
    zoom: u8,
    returned: Option<usize>,
    layers: usize,
    skipped: usize,
    truncated: bool,
    predisposed: BTreeSet<String>,
    advisory: Option<String>,
}

async fn run_bbox(client: &ApiClient, config: &MapConfig, view: ViewArgs) -> Result<(), CliError> {
    let viewport = initial_viewport(config, view);
    let mut sync = ViewportSync::new(config, viewport);

    let mut skipped = 0;
    let mut truncated = false;
    if let SyncAction::Fetch(ticket) = sync.sync(Instant::now()) {
        let result = client.fetch_features_in_bounds(&ticket.query).await;
        if let FetchOutcome::Applied { skipped: s, truncated: t, .. } =
            sync.complete(ticket.generation, result, Instant::now())
        {
            skipped = s;
            truncated = t;
        }
    }

    let summary = BboxSummary {
        zoom: viewport.zoom,
        returned: sync.last_loaded(),
        layers: sync.store().len(),
        skipped,
        truncated,
        predisposed: sync.store().predisposed().iter().map(|id| id.as_str().to_owned()).collect(),
        advisory: sync.advisory().map(|a| a.kind.message()),
    };
    print_json(&serde_json::to_value(summary)?)
}

async fn run_predisposizioni(client: &ApiClient, command: PredisposizioniCommand) -> Result<(), CliError> {
    match command.command {
        PredisposizioniSubcommand::List => {
            let rows = services::predisposizioni::list_predisposizioni(client).await?;
            print_json(&serde_json::to_value(rows)?)
        }
        PredisposizioniSubcommand::Save { data } => {
            let payload = serde_json::from_str::<PredisposizioneCreate>(&data)?;
            let saved = services::predisposizioni::save_predisposizione(client, &DetachedMap, &payload).await?;
            print_json(&serde_json::to_value(saved)?)
        }
        PredisposizioniSubcommand::Delete { id } => {
            let response = services::predisposizioni::delete_predisposizione(client, &DetachedMap, id).await?;
            print_json(&serde_json::to_value(response)?)
        }
    }
}

async fn run_tfo(client: &ApiClient, command: TfoCommand) -> Result<(), CliError> {
    match command.command {
        TfoSubcommand::List { building_id } => {
            let rows = services::tfo::list_tfos(client, building_id).await?;
            print_json(&serde_json::to_value(rows)?)
        }
        TfoSubcommand::Create { data } => {
            let payload = serde_json::from_str::<TfoCreate>(&data)?;
            let created = services::tfo::create_tfo(client, &payload).await?;
            print_json(&serde_json::to_value(created)?)
        }
        TfoSubcommand::Update { id, data } => {
            let payload = serde_json::from_str::<TfoCreate>(&data)?;
            let updated = services::tfo::update_tfo(client, id, &payload).await?;
            print_json(&serde_json::to_value(updated)?)
        }
        TfoSubcommand::Delete { id } => {
            let response = services::tfo::delete_tfo(client, id).await?;
            print_json(&serde_json::to_value(response)?)
        }
    }
}

/// Sink for one-shot commands that run without a live map.
struct DetachedMap;

#[async_trait]
impl PredisposedSink for DetachedMap {
    async fn mark_predisposed(&self, id: FeatureId) {
        info!(%id, "no live map; building will show as predisposed on next load");
    }

    async fn unmark_predisposed(&self, id: FeatureId) {
        info!(%id, "no live map; building will show as not predisposed on next load");
    }
}

// =============================================================================
// WATCH
// =============================================================================

#[derive(Debug, PartialEq)]
enum WatchCommand {
    View { lat: f64, lon: f64, zoom: u8 },
    Refresh,
    Mark(FeatureId),
    Unmark(FeatureId),
    Save(PredisposizioneCreate),
    Delete(i64),
    Status,
    Layers,
    Quit,
}

/// Parse one stdin line. Blank lines and `#` comments yield `None`.
fn parse_watch_command(line: &str) -> Result<Option<WatchCommand>, CliError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let invalid = || CliError::InvalidCommand(line.to_owned());
    let feature_id = || FeatureId::new(rest).ok_or_else(invalid);

    let command = match verb {
        "view" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            let [lat, lon, zoom] = parts.as_slice() else {
                return Err(invalid());
            };
            WatchCommand::View {
                lat: lat.parse().map_err(|_| invalid())?,
                lon: lon.parse().map_err(|_| invalid())?,
                zoom: zoom.parse().map_err(|_| invalid())?,
            }
        }
        "refresh" => WatchCommand::Refresh,
        "mark" => WatchCommand::Mark(feature_id()?),
        "unmark" => WatchCommand::Unmark(feature_id()?),
        "save" => WatchCommand::Save(serde_json::from_str(rest)?),
        "delete" => WatchCommand::Delete(rest.parse().map_err(|_| invalid())?),
        "status" => WatchCommand::Status,
        "layers" => WatchCommand::Layers,
        "quit" | "exit" => WatchCommand::Quit,
        _ => return Err(invalid()),
    };
    Ok(Some(command))
}

async fn run_watch(client: ApiClient, config: &MapConfig, view: ViewArgs) -> Result<(), CliError> {
    let client = Arc::new(client);
    let (handle, join) = spawn_session(client.clone(), config, initial_viewport(config, view));

    let mut updates = handle.subscribe();
    let printer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let status = updates.borrow_and_update().clone();
            match serde_json::to_string(&status) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "status encode failed"),
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_watch_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "ignoring input line");
                continue;
            }
        };
        if command == WatchCommand::Quit {
            break;
        }
        if let Err(e) = apply_watch_command(&handle, &client, config, view, command).await {
            if matches!(e, CliError::Session(_)) {
                return Err(e);
            }
            warn!(error = %e, "command failed");
        }
    }

    handle.shutdown().await?;
    if let Err(e) = join.await {
        warn!(error = %e, "map session task ended abnormally");
    }
    drop(handle);
    printer.abort();
    Ok(())
}

async fn apply_watch_command(
    handle: &SessionHandle,
    client: &ApiClient,
    config: &MapConfig,
    view: ViewArgs,
    command: WatchCommand,
) -> Result<(), CliError> {
    match command {
        WatchCommand::View { lat, lon, zoom } => {
            let view = ViewArgs { lat: Some(lat), lon: Some(lon), zoom: Some(zoom), ..view };
            handle.viewport_changed(initial_viewport(config, view)).await?;
        }
        WatchCommand::Refresh => handle.refresh().await?,
        WatchCommand::Mark(id) => {
            let restyled = handle.mark(id).await?;
            print_json(&serde_json::json!({ "restyled": restyled }))?;
        }
        WatchCommand::Unmark(id) => {
            let restyled = handle.unmark(id).await?;
            print_json(&serde_json::json!({ "restyled": restyled }))?;
        }
        WatchCommand::Save(payload) => {
            let saved = services::predisposizioni::save_predisposizione(client, handle, &payload).await?;
            print_json(&serde_json::to_value(saved)?)?;
        }
        WatchCommand::Delete(id) => {
            let response = services::predisposizioni::delete_predisposizione(client, handle, id).await?;
            print_json(&serde_json::to_value(response)?)?;
        }
        WatchCommand::Status => print_json(&serde_json::to_value(handle.status())?)?,
        WatchCommand::Layers => print_json(&serde_json::to_value(handle.layers().await?)?)?,
        WatchCommand::Quit => {}
    }
    Ok(())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
