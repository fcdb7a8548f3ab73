mod action;
mod app;
mod app_state;
mod component;
mod components;
mod connectivity;
mod notifier;
mod player;
mod poller;
mod theme;
mod view;
mod widgets;

use std::sync::Arc;
use std::time::Duration;

use dock_proto::config::Config;
use dock_proto::{platform, ApiClient, Connectivity, Notifier};
use tokio::sync::{broadcast, mpsc};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::app::{App, AppChannels};
use crate::connectivity::ConnectivityMonitor;
use crate::notifier::ChannelNotifier;
use crate::player::mpv::MpvPlayer;
use crate::player::{PlayerController, PlayerService, ResumePolicy};
use crate::poller::Poller;

/// Mirrors WARN and ERROR events into the log bar.
struct ForwardLayer {
    sender: broadcast::Sender<String>,
}

impl<S> tracing_subscriber::Layer<S> for ForwardLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let level = event.metadata().level();
        if !matches!(*level, tracing::Level::WARN | tracing::Level::ERROR) {
            return;
        }

        let mut line = format!("{} [{}] ", chrono::Local::now().format("%H:%M:%S"), level);
        event.record(&mut MessageVisitor(&mut line));

        // no receiver yet is fine
        let _ = self.sender.send(line);
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl tracing::field::Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        } else {
            self.0.push_str(&format!(" {}={:?}", field.name(), value));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (log_tx, log_rx) = broadcast::channel::<String>(100);

    let log_path = platform::log_path();
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(log_file).with_ansi(false))
        .with(ForwardLayer { sender: log_tx })
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("debug,hyper_util=warn,reqwest=warn,hyper=warn")
            }),
        )
        .init();

    eprintln!("logging to {}", log_path.display());
    info!("streamdock starting, log file {:?}", log_path);

    let config = Config::load()?;
    info!("config loaded from {:?}, server {}", Config::config_path(), config.server.base_url);

    let (notif_tx, notif_rx) = mpsc::channel(256);
    let notifier: Arc<dyn Notifier> = Arc::new(ChannelNotifier::new(notif_tx));

    let connectivity = Connectivity::new();
    let client = ApiClient::new(&config.server, Arc::clone(&notifier))?.with_connectivity(connectivity.clone());

    let (poll_tx, poll_rx) = mpsc::channel(64);
    let poller = Poller::new(
        Arc::new(client.clone()),
        Duration::from_secs(config.polling.interval_secs.max(1)),
        poll_tx,
        Arc::clone(&notifier),
    );

    let _monitor = ConnectivityMonitor::new(
        client.base_url(),
        &config.connectivity,
        connectivity,
        Arc::clone(&notifier),
    )?
    .spawn();

    let controller = PlayerController::new(
        MpvPlayer::new(config.player.mpv_extra_args.clone()),
        Arc::new(client.best_effort()),
        ResumePolicy {
            threshold: Duration::from_secs(config.player.resume_threshold_secs),
            prompt_timeout: Duration::from_secs(config.player.resume_prompt_secs),
        },
        Duration::from_secs(config.player.save_interval_secs.max(1)),
    );
    let (player_tx, player_rx, player_task) = PlayerService::spawn(controller, Arc::clone(&notifier));

    let app = App::new(&config, client, notifier, poller, player_tx);
    let result = app
        .run(AppChannels {
            notifications: notif_rx,
            poll_events: poll_rx,
            player_rx,
            logs: log_rx,
        })
        .await;

    // The app dropped its command sender, so the service saves and stops mpv.
    if tokio::time::timeout(Duration::from_secs(3), player_task).await.is_err() {
        tracing::warn!("player service did not stop in time");
    }
    result
}
