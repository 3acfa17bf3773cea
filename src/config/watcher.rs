//! Configuration file watcher: the discovery feed.
//!
//! File events are debounced, the file is reloaded and validated, and the
//! instance lists are forwarded only when they differ from the last ones
//! sent. Limiter and breaker policies are fixed at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;
use crate::load_balancer::ServiceInstance;

/// Quiet period after a file event before reloading.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(250);

/// Instance lists of every configured service, in config order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceUpdate {
    pub services: Vec<(String, Vec<ServiceInstance>)>,
}

impl InstanceUpdate {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            services: config
                .services
                .iter()
                .map(|s| (s.name.clone(), s.instances.clone()))
                .collect(),
        }
    }

    pub fn contains(&self, service: &str) -> bool {
        self.services.iter().any(|(name, _)| name == service)
    }
}

/// Watches the configuration file and emits [`InstanceUpdate`]s.
pub struct ConfigWatcher {
    path: PathBuf,
    current: InstanceUpdate,
    update_tx: mpsc::UnboundedSender<InstanceUpdate>,
}

impl ConfigWatcher {
    /// `current` is the config already applied; reloads identical to it are not sent.
    pub fn new(path: &Path, current: &GatewayConfig) -> (Self, mpsc::UnboundedReceiver<InstanceUpdate>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            current: InstanceUpdate::from_config(current),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Must be called inside a Tokio runtime.
    ///
    /// The returned handle must be kept alive for the watch to continue.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        tokio::spawn(reload_loop(self.path, self.current, event_rx, self.update_tx));
        Ok(watcher)
    }
}

async fn reload_loop(
    path: PathBuf,
    mut last: InstanceUpdate,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<InstanceUpdate>,
) {
    while events.recv().await.is_some() {
        // One save usually produces several events.
        tokio::time::sleep(RELOAD_DEBOUNCE).await;
        while events.try_recv().is_ok() {}

        let config = match load_config(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!(path = ?path, error = %e, "Failed to reload config, keeping current instance lists");
                continue;
            }
        };

        let update = InstanceUpdate::from_config(&config);
        if update == last {
            tracing::debug!(path = ?path, "Config changed, instance lists unchanged");
            continue;
        }

        tracing::info!(path = ?path, services = update.services.len(), "Instance lists changed, applying");
        if updates.send(update.clone()).is_err() {
            break;
        }
        last = update;
    }
}
