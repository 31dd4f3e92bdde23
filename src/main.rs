#![recursion_limit = "256"]
//! # Main Entry Point
//!
//! Wires the layers together:
//! - Domain: configuration, types and collaborator traits
//! - Infrastructure: Matrix notifier, X API client, feed and roster sources
//! - Application: credential rotation, monitors, assigner and orchestrator
//!

mod application;
mod domain;
mod infrastructure;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use matrix_sdk::{
    Client,
    config::SyncSettings,
    room::Room,
    ruma::events::room::{
        member::{MembershipState, StrippedRoomMemberEvent},
        message::{MessageType, SyncRoomMessageEvent},
    },
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::application::assigner::FairAssigner;
use crate::application::channel::ChannelFilter;
use crate::application::credentials::CredentialPool;
use crate::application::feed::FeedMonitor;
use crate::application::notify::Dispatcher;
use crate::application::official::OfficialAccountMonitor;
use crate::application::scheduler::Orchestrator;
use crate::application::social::SocialClient;
use crate::application::state::StateStore;
use crate::application::tracked::{TrackedAccountsMonitor, TrackedSettings};
use crate::domain::config::AppConfig;
use crate::domain::paths;
use crate::domain::traits::RosterSource;
use crate::infrastructure::feed::HttpFeedSource;
use crate::infrastructure::matrix::MatrixNotifier;
use crate::infrastructure::roster::{SheetRoster, StaticRoster};
use crate::infrastructure::social::XApiClient;
use crate::strings::logs;

#[derive(Parser, Debug)]
#[command(name = "lookout", about = "Watches social accounts and feeds and notifies a team")]
struct Args {
    /// Path to the YAML configuration
    #[arg(long, default_value = paths::CONFIG_FILE)]
    config: PathBuf,

    /// Path to the persistent state file (overrides `system.state_file`)
    #[arg(long)]
    state: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load Configuration
    let config = AppConfig::load(&args.config).context(logs::CONFIG_READ_ERROR)?;

    // 2. Logging Setup
    let _guard = init_logging()?;
    tracing::info!("{}", logs::STARTING);
    tracing::info!("{}", logs::config_loaded(&config.services.matrix.username));

    // 3. State and social stack
    let state_path = args
        .state
        .or_else(|| config.system.state_file.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(paths::STATE_FILE));
    let store = StateStore::open(state_path);

    let tokens = config.services.social.resolve_tokens();
    let credential_count = tokens.len();
    let pool = CredentialPool::new(tokens, store.clone());
    let api = XApiClient::new(
        &config.services.social.base_url,
        config.services.social.timeout_secs,
    )?;
    let social = Arc::new(
        SocialClient::new(pool, Arc::new(api), store.clone()).with_batch(
            config.system.identity_batch_size,
            Duration::from_millis(config.system.identity_batch_delay_ms),
        ),
    );

    let (official, tracked) = if social.has_credentials() {
        let official = OfficialAccountMonitor::new(
            &config.sources.official_handle,
            config.system.page_size,
            social.clone(),
            store.clone(),
        );
        let tracked = TrackedAccountsMonitor::new(
            TrackedSettings {
                official_handle: config.sources.official_handle.clone(),
                batch_cap: config.system.tracked_batch_cap,
                request_delay: Duration::from_millis(config.system.request_delay_ms),
                page_size: config.system.page_size,
            },
            social.clone(),
            build_roster(&config)?,
            store.clone(),
        );
        (Some(official), Some(tracked))
    } else {
        tracing::warn!("{}", logs::SOCIAL_DISABLED);
        (None, None)
    };

    let feed = match &config.sources.feed_url {
        Some(url) => {
            let source = HttpFeedSource::new(url, config.system.feed_timeout_secs)?;
            Some(FeedMonitor::new(
                Arc::new(source),
                store.clone(),
                config.system.feed_max_entries,
                config.system.summary_limit,
            ))
        }
        None => None,
    };

    if config.recipients.managers.is_empty() {
        tracing::warn!("{}", logs::NO_MANAGERS);
    }
    tracing::info!(
        "{}",
        logs::startup_summary(
            credential_count,
            config.recipients.team.len(),
            config.recipients.managers.len()
        )
    );

    // 4. Matrix Setup
    let client = Client::builder()
        .homeserver_url(&config.services.matrix.homeserver)
        .build()
        .await?;

    client
        .matrix_auth()
        .login_username(
            &config.services.matrix.username,
            &config.services.matrix.password,
        )
        .send()
        .await?;
    tracing::info!("{}", logs::LOGIN_SUCCESS);

    if let Some(name) = &config.services.matrix.display_name {
        tracing::info!("{}", logs::setting_display_name(name));
        if let Err(e) = client.account().set_display_name(Some(name.as_str())).await {
            tracing::warn!("{}", logs::set_display_name_fail(&e.to_string()));
        }
    }

    let orchestrator = Arc::new(Orchestrator {
        official,
        tracked,
        feed,
        assigner: FairAssigner::new(config.recipients.managers.clone(), store.clone()),
        dispatcher: Dispatcher::new(Arc::new(MatrixNotifier::new(client.clone()))),
        recipients: config.recipients.clone(),
        channel: config
            .sources
            .source_channel
            .as_deref()
            .map(|id| ChannelFilter::new(id, &config.sources.channel_prefix)),
        state: store,
    });

    // 5. Event Handlers
    let start_time = std::time::SystemTime::now();
    let loop_orchestrator = orchestrator.clone();
    client.add_event_handler(move |ev: SyncRoomMessageEvent, room: Room| {
        let orchestrator = loop_orchestrator.clone();
        async move {
            let Some(original) = ev.as_original() else {
                return;
            };
            if original.sender == room.own_user_id() {
                return;
            }
            // Ignore the backlog delivered by the first sync.
            let event_time =
                std::time::UNIX_EPOCH + Duration::from_millis(ev.origin_server_ts().get().into());
            if event_time < start_time {
                return;
            }

            let room_id = room.room_id().as_str();
            let (body, caption) = message_text(&original.content.msgtype);
            if orchestrator.channel.as_ref().is_some_and(|c| c.matches(room_id)) {
                tracing::info!("{}", logs::channel_post_received(room_id));
                orchestrator.handle_channel_post(room_id, body, caption).await;
            } else if let Some(body) = body {
                orchestrator.handle_command(room_id, body).await;
            }
        }
    });

    client.add_event_handler(|ev: StrippedRoomMemberEvent, room: Room| async move {
        if ev.content.membership == MembershipState::Invite {
            let _ = room.join().await;
        }
    });

    // 6. Start Loops
    orchestrator.reload_roster().await;

    let token = CancellationToken::new();
    let mut handles = orchestrator.spawn_jobs(&config.schedule, &token);

    let sync_client = client.clone();
    let sync_token = token.clone();
    handles.push(tokio::spawn(async move {
        tokio::select! {
            _ = sync_token.cancelled() => {}
            result = sync_client.sync(SyncSettings::default()) => {
                if let Err(e) = result {
                    tracing::error!("{}", logs::sync_loop_fail(&e.to_string()));
                }
            }
        }
    }));

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("{}", logs::shutdown_fail(&e.to_string()));
    }
    tracing::info!("{}", logs::SHUTDOWN);
    token.cancel();
    for handle in handles {
        let _ = handle.await;
    }

    Ok(())
}

/// File log (cleared each session) plus console output.
fn init_logging() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let data_dir = Path::new(paths::DATA_DIR);
    if !data_dir.exists() {
        fs::create_dir_all(data_dir).context("Failed to create data directory")?;
    }

    let log_path = data_dir.join(paths::SESSION_LOG);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(paths::DATA_DIR, paths::SESSION_LOG);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(
            "info,matrix_sdk=warn,matrix_sdk_base=warn,matrix_sdk_crypto=error,ruma=warn,hyper=warn",
        )
    });

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(guard)
}

fn build_roster(config: &AppConfig) -> Result<Arc<dyn RosterSource>> {
    Ok(match &config.sources.roster.url {
        Some(url) => Arc::new(SheetRoster::new(url, config.system.feed_timeout_secs)?),
        None => Arc::new(StaticRoster::new(config.sources.roster.accounts.clone())),
    })
}

/// Text body and media caption of a room message.
fn message_text(msgtype: &MessageType) -> (Option<&str>, Option<&str>) {
    // For media, `body` is a caption only when a separate filename is set.
    fn caption<'a>(body: &'a str, filename: Option<&str>) -> Option<&'a str> {
        filename.filter(|f| *f != body).map(|_| body)
    }

    match msgtype {
        MessageType::Text(c) => (Some(c.body.as_str()), None),
        MessageType::Notice(c) => (Some(c.body.as_str()), None),
        MessageType::Image(c) => (None, caption(&c.body, c.filename.as_deref())),
        MessageType::Video(c) => (None, caption(&c.body, c.filename.as_deref())),
        MessageType::File(c) => (None, caption(&c.body, c.filename.as_deref())),
        MessageType::Audio(c) => (None, caption(&c.body, c.filename.as_deref())),
        _ => (None, None),
    }
}
