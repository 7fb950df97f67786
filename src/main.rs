//! bracket-sync binary: follows one event's matches live and logs every change.
//!
//! Usage:
//! - `bracket-sync list` lists the events known to the service.
//! - `bracket-sync <event-id>` follows an event until Ctrl+C.
//! - `bracket-sync <event-id> winner <match-id> <gamertag>` records a winner.

use std::{env, sync::Arc};

use anyhow::{Context, bail};
use bracket_sync::{
    SyncError,
    channel::websocket::WebSocketChannel,
    config::SyncConfig,
    dao::event_store::{EventStore, http::HttpEventStore},
    services::synchronizer::{SessionEvent, Synchronizer},
    state::{EventId, MatchId, StoreChange},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EVENT_ID_ENV: &str = "BRACKET_SYNC_EVENT_ID";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SyncConfig::load();
    let events: Arc<dyn EventStore> = Arc::new(
        HttpEventStore::new(config.http_config()).context("building event service client")?,
    );

    let args: Vec<String> = env::args().skip(1).collect();
    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["list"] => list_events(events.as_ref()).await,
        [] => {
            let event_id = env::var(EVENT_ID_ENV)
                .context("no event id given and BRACKET_SYNC_EVENT_ID is unset")?;
            follow(&config, events, parse_event_id(&event_id)?).await
        }
        [event_id] => follow(&config, events, parse_event_id(event_id)?).await,
        [event_id, "winner", match_id, winner] => {
            let match_id = match_id
                .parse::<u64>()
                .map(MatchId)
                .with_context(|| format!("invalid match id `{match_id}`"))?;
            record_winner(&config, events, parse_event_id(event_id)?, match_id, winner).await
        }
        _ => bail!("usage: bracket-sync [list | <event-id> [winner <match-id> <gamertag>]]"),
    }
}

fn parse_event_id(raw: &str) -> anyhow::Result<EventId> {
    raw.trim()
        .parse::<u64>()
        .map(EventId)
        .with_context(|| format!("invalid event id `{raw}`"))
}

async fn list_events(events: &dyn EventStore) -> anyhow::Result<()> {
    let listed = events.list_events().await.context("listing events")?;
    for event in listed {
        info!(
            event_id = %event.id,
            title = %event.details.title,
            date = %event.details.date,
            matches = event.matches.len(),
            "event"
        );
    }
    Ok(())
}

fn build_synchronizer(
    config: &SyncConfig,
    events: Arc<dyn EventStore>,
    event_id: EventId,
) -> Synchronizer {
    let channel = Arc::new(WebSocketChannel::new(config.channel_config()));
    Synchronizer::new(event_id, events, channel, config.sync_options())
}

/// Subscribe and log store and session notifications until shutdown or a
/// lost connection.
async fn follow(
    config: &SyncConfig,
    events: Arc<dyn EventStore>,
    event_id: EventId,
) -> anyhow::Result<()> {
    let sync = build_synchronizer(config, events, event_id);
    let mut changes = sync.observe_matches();
    let mut session_events = sync.observe_session();

    sync.subscribe().await?;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(%event_id, "shutdown requested");
                break;
            }
            Some(change) = changes.recv() => log_change(&change),
            Some(event) = session_events.recv() => match event {
                SessionEvent::ConnectionLost { faults } => {
                    warn!(%event_id, faults, "live updates lost; stopping");
                    break;
                }
                SessionEvent::FetchFailed { message } => {
                    warn!(%event_id, %message, "could not load event");
                }
                other => info!(%event_id, ?other, "session"),
            },
        }
    }

    sync.unsubscribe().await?;
    Ok(())
}

async fn record_winner(
    config: &SyncConfig,
    events: Arc<dyn EventStore>,
    event_id: EventId,
    match_id: MatchId,
    winner: &str,
) -> anyhow::Result<()> {
    let sync = build_synchronizer(config, events, event_id);
    sync.subscribe().await?;
    let result: Result<_, SyncError> = async {
        sync.refresh().await?;
        sync.request_winner(match_id, winner).await
    }
    .await;
    sync.unsubscribe().await?;

    let confirmed = result?;
    info!(
        %event_id,
        match_id = %confirmed.id(),
        winner = confirmed.winner().unwrap_or_default(),
        "winner recorded"
    );
    Ok(())
}

fn log_change(change: &StoreChange) {
    match change {
        StoreChange::Replaced { revision, matches } => {
            info!(revision, matches = matches.len(), "bracket loaded");
        }
        StoreChange::MatchUpdated {
            revision,
            version,
            updated,
        } => {
            info!(
                revision,
                version,
                match_id = %updated.id(),
                round = updated.round(),
                winner = updated.winner().unwrap_or_default(),
                "match decided"
            );
        }
        StoreChange::Cleared { revision } => info!(revision, "bracket cleared"),
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,bracket_sync=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
