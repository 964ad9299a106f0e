//! Background polling that drives the menu.
//!
//! [`Poller`] performs one fetch-and-present cycle against the configured
//! site. [`Monitor`] runs it on a timer, applies commands coming from the
//! UI and publishes a fresh [`MenuState`] after every poll.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Local};
use nightscout_core::{Error, GlucoseSource, MenuView, NightscoutClient, Presenter};
use nightscout_types::GlucoseUnit;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{Config, ConfigStore};

/// Builds a source for the current configuration.
pub type SourceFactory =
    Box<dyn Fn(&Config) -> nightscout_core::Result<Arc<dyn GlucoseSource>> + Send + Sync>;

/// Commands the UI sends to the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorCommand {
    /// Poll now.
    Refresh,
    /// Store a new Nightscout host and poll.
    SetHost(String),
    /// Store a new display unit and poll.
    SetUnit(GlucoseUnit),
}

/// Everything the menu needs to redraw itself.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuState {
    /// Title and reading lines.
    pub view: MenuView,
    /// Unit in effect, for the settings check marks.
    pub unit: GlucoseUnit,
    /// Configured host, empty when unset.
    pub host: String,
    /// When the poll finished.
    pub updated_at: DateTime<Local>,
}

impl MenuState {
    /// State shown before the first poll.
    pub fn connecting(config: &Config) -> Self {
        Self {
            view: MenuView::connecting(),
            unit: config.unit(),
            host: config.nightscout_host.clone(),
            updated_at: Local::now(),
        }
    }

    /// `"Updated Mon 3:07 PM"`
    pub fn updated_label(&self) -> String {
        format!("Updated {}", self.updated_at.format("%a %-I:%M %p"))
    }

    /// Whether a host is configured.
    pub fn has_host(&self) -> bool {
        !self.host.is_empty()
    }
}

/// The default factory: a real HTTP client for the configured host.
pub fn http_source_factory() -> SourceFactory {
    Box::new(|config: &Config| {
        let client =
            NightscoutClient::with_options(&config.nightscout_host, config.client_options())?;
        Ok(Arc::new(client) as Arc<dyn GlucoseSource>)
    })
}

/// One fetch-and-present cycle over a config store.
pub struct Poller {
    store: ConfigStore,
    factory: SourceFactory,
    source: Option<Arc<dyn GlucoseSource>>,
}

impl Poller {
    /// Create a poller using real HTTP.
    pub fn new(store: ConfigStore) -> Self {
        Self::with_source_factory(store, http_source_factory())
    }

    /// Create a poller with a custom source factory.
    pub fn with_source_factory(store: ConfigStore, factory: SourceFactory) -> Self {
        Self {
            store,
            factory,
            source: None,
        }
    }

    /// The current configuration.
    pub fn config(&self) -> &Config {
        self.store.config()
    }

    /// Apply a settings change. The cached source is dropped when the host
    /// changes.
    pub fn apply(&mut self, command: &MonitorCommand) -> Result<()> {
        match command {
            MonitorCommand::Refresh => {}
            MonitorCommand::SetHost(host) => {
                // Rebuilt from whatever host the store ends up holding
                self.source = None;
                self.store.set_host(host)?;
                info!("Nightscout host set to {:?}", self.store.config().nightscout_host);
            }
            MonitorCommand::SetUnit(unit) => {
                self.store.set_unit(*unit)?;
                info!("Display unit set to {}", unit);
            }
        }
        Ok(())
    }

    /// Fetch and present once.
    pub async fn poll(&mut self) -> MenuState {
        let view = self.poll_view().await;
        let config = self.store.config();
        MenuState {
            view,
            unit: config.unit(),
            host: config.nightscout_host.clone(),
            updated_at: Local::now(),
        }
    }

    async fn poll_view(&mut self) -> MenuView {
        let config = self.store.config().clone();
        if !config.has_host() {
            return MenuView::need_settings();
        }

        let source = match self.source() {
            Ok(source) => source,
            Err(e) => {
                warn!("Cannot poll: {}", e);
                return MenuView::fetch_error(&e);
            }
        };

        let snapshot = match source.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(Error::NotConfigured) => return MenuView::need_settings(),
            Err(e) => {
                warn!("Poll of {} failed: {}", source.base_url(), e);
                return MenuView::fetch_error(&e);
            }
        };

        match Presenter::new(config.unit()).render(&snapshot, OffsetDateTime::now_utc()) {
            Ok(view) => {
                debug!("Presented {:?}", view.title);
                view
            }
            Err(e) => {
                let data = serde_json::to_string(&snapshot).unwrap_or_default();
                error!("Nightscout data: {}", data);
                error!("Could not present data: {:?}", e);
                MenuView::display_error(&e)
            }
        }
    }

    fn source(&mut self) -> nightscout_core::Result<Arc<dyn GlucoseSource>> {
        if let Some(source) = &self.source {
            return Ok(Arc::clone(source));
        }
        let source = (self.factory)(self.store.config())?;
        self.source = Some(Arc::clone(&source));
        Ok(source)
    }
}

/// Runs a [`Poller`] on a timer until cancelled.
pub struct Monitor {
    poller: Poller,
    command_rx: mpsc::Receiver<MonitorCommand>,
    state_tx: mpsc::Sender<MenuState>,
    cancel: CancellationToken,
}

impl Monitor {
    /// Create a monitor.
    pub fn new(
        poller: Poller,
        command_rx: mpsc::Receiver<MonitorCommand>,
        state_tx: mpsc::Sender<MenuState>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            poller,
            command_rx,
            state_tx,
            cancel,
        }
    }

    /// Poll immediately, then every poll interval and after every command.
    ///
    /// Returns when cancelled, when the command channel closes, or when the
    /// UI stops listening.
    pub async fn run(mut self) {
        let period = self.poller.config().poll_interval();
        info!("Polling every {:?}", period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!("Monitor cancelled");
                    break;
                }
                _ = ticker.tick() => {}
                command = self.command_rx.recv() => {
                    let Some(command) = command else {
                        debug!("Command channel closed");
                        break;
                    };
                    debug!("Monitor command: {:?}", command);
                    if let Err(e) = self.poller.apply(&command) {
                        error!("Failed to apply {:?}: {:#}", command, e);
                    }
                    ticker.reset();
                }
            }

            let state = self.poller.poll().await;
            if self.state_tx.send(state).await.is_err() {
                debug!("Menu closed, stopping monitor");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nightscout_core::{MockSource, Snapshot};
    use nightscout_core::presenter::{FETCH_ERROR_TITLE, NEED_SETTINGS_TITLE};
    use nightscout_types::{DeviceStatus, Entry, unix_millis};
    use std::time::Duration;
    use tempfile::TempDir;

    fn snapshot_now(mgdl: i32) -> Snapshot {
        let now = unix_millis(OffsetDateTime::now_utc());
        Snapshot {
            entries: vec![
                Entry {
                    sgv: Some(mgdl),
                    date: Some(now - 60_000),
                    direction: Some("Flat".into()),
                },
                Entry {
                    sgv: Some(mgdl - 3),
                    date: Some(now - 360_000),
                    direction: Some("Flat".into()),
                },
            ],
            device_status: vec![DeviceStatus {
                mills: Some(now - 30_000),
                ..Default::default()
            }],
        }
    }

    fn mock_factory(source: Arc<MockSource>) -> SourceFactory {
        Box::new(move |_config: &Config| Ok(Arc::clone(&source) as Arc<dyn GlucoseSource>))
    }

    fn store_with_host(dir: &TempDir, host: &str) -> ConfigStore {
        let mut store = ConfigStore::open(dir.path().join("config.toml"));
        store.set_host(host).unwrap();
        store
    }

    #[tokio::test]
    async fn test_poll_without_host_needs_settings() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new(snapshot_now(120)));
        let mut poller = Poller::with_source_factory(
            ConfigStore::open(dir.path().join("config.toml")),
            mock_factory(Arc::clone(&source)),
        );

        let state = poller.poll().await;
        assert_eq!(state.view.title, NEED_SETTINGS_TITLE);
        assert!(state.view.items.is_empty());
        assert!(!state.has_host());
        assert_eq!(source.call_count(), 0);
    }

    #[tokio::test]
    async fn test_poll_presents_snapshot() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new(snapshot_now(120)));
        let mut poller = Poller::with_source_factory(
            store_with_host(&dir, "https://cgm.example.test"),
            mock_factory(source),
        );

        let state = poller.poll().await;
        assert_eq!(state.view.title, "↻ 120→ +3 [1m]");
        assert_eq!(state.view.items, vec!["117→ ? [6m]"]);
        assert_eq!(state.unit, GlucoseUnit::MgDl);
        assert!(state.updated_label().starts_with("Updated "));
    }

    #[tokio::test]
    async fn test_poll_fetch_error() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new(snapshot_now(120)));
        source.fail_next(Error::Status(502)).await;
        let mut poller = Poller::with_source_factory(
            store_with_host(&dir, "https://cgm.example.test"),
            mock_factory(source),
        );

        let state = poller.poll().await;
        assert_eq!(state.view.title, FETCH_ERROR_TITLE);
        assert_eq!(state.view.items, vec!["Nightscout returned status 502"]);
    }

    #[tokio::test]
    async fn test_poll_display_error_on_empty_data() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new(Snapshot::default()));
        let mut poller = Poller::with_source_factory(
            store_with_host(&dir, "https://cgm.example.test"),
            mock_factory(source),
        );

        let state = poller.poll().await;
        assert_eq!(state.view.title, "<!>");
    }

    #[tokio::test]
    async fn test_poll_invalid_host_reports_error() {
        let dir = TempDir::new().unwrap();
        let mut poller = Poller::new(store_with_host(&dir, "cgm.example.test"));

        let state = poller.poll().await;
        assert_eq!(state.view.title, FETCH_ERROR_TITLE);
        assert!(state.view.items[0].starts_with("Invalid URL"));
    }

    #[tokio::test]
    async fn test_apply_set_unit_persists_and_changes_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let source = Arc::new(MockSource::new(snapshot_now(180)));
        let mut poller = Poller::with_source_factory(
            store_with_host(&dir, "https://cgm.example.test"),
            mock_factory(source),
        );

        poller
            .apply(&MonitorCommand::SetUnit(GlucoseUnit::MmolL))
            .unwrap();
        let state = poller.poll().await;

        assert!(state.view.title.contains("10.0→"));
        assert_eq!(state.unit, GlucoseUnit::MmolL);
        assert!(Config::load_from(&path).use_mmol);
    }

    #[tokio::test]
    async fn test_apply_set_host_rebuilds_source() {
        let dir = TempDir::new().unwrap();
        let built = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let built_clone = Arc::clone(&built);
        let source = Arc::new(MockSource::new(snapshot_now(120)));
        let factory: SourceFactory = Box::new(move |_config: &Config| {
            built_clone.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(Arc::clone(&source) as Arc<dyn GlucoseSource>)
        });
        let mut poller =
            Poller::with_source_factory(store_with_host(&dir, "https://a.test"), factory);

        poller.poll().await;
        poller.poll().await;
        assert_eq!(built.load(std::sync::atomic::Ordering::SeqCst), 1);

        poller
            .apply(&MonitorCommand::SetHost("https://b.test/".into()))
            .unwrap();
        let state = poller.poll().await;
        assert_eq!(state.host, "https://b.test");
        assert_eq!(built.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_apply_set_host_failure_keeps_old_host() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let built_for = Arc::new(std::sync::Mutex::new(Vec::<String>::new()));
        let built_for_clone = Arc::clone(&built_for);
        let source = Arc::new(MockSource::new(snapshot_now(120)));
        let factory: SourceFactory = Box::new(move |config: &Config| {
            built_for_clone
                .lock()
                .unwrap()
                .push(config.nightscout_host.clone());
            Ok(Arc::clone(&source) as Arc<dyn GlucoseSource>)
        });
        let mut poller =
            Poller::with_source_factory(store_with_host(&dir, "https://a.test"), factory);
        poller.poll().await;

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        assert!(
            poller
                .apply(&MonitorCommand::SetHost("https://b.test".into()))
                .is_err()
        );
        let state = poller.poll().await;

        assert_eq!(state.host, "https://a.test");
        assert!(state.view.title.contains("120"));
        assert_eq!(
            *built_for.lock().unwrap(),
            vec!["https://a.test".to_string(), "https://a.test".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_polls_on_start_and_on_command() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new(snapshot_now(120)));
        let poller = Poller::with_source_factory(
            store_with_host(&dir, "https://cgm.example.test"),
            mock_factory(Arc::clone(&source)),
        );

        let (command_tx, command_rx) = mpsc::channel(8);
        let (state_tx, mut state_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Monitor::new(poller, command_rx, state_tx, cancel.clone()).run());

        let first = state_rx.recv().await.unwrap();
        assert!(first.view.title.contains("120"));

        command_tx
            .send(MonitorCommand::SetUnit(GlucoseUnit::MmolL))
            .await
            .unwrap();
        let second = state_rx.recv().await.unwrap();
        assert_eq!(second.unit, GlucoseUnit::MmolL);
        assert!(second.view.title.contains("6.7"));

        cancel.cancel();
        handle.await.unwrap();
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_polls_on_interval() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(MockSource::new(snapshot_now(120)));
        let poller = Poller::with_source_factory(
            store_with_host(&dir, "https://cgm.example.test"),
            mock_factory(Arc::clone(&source)),
        );

        let (_command_tx, command_rx) = mpsc::channel(8);
        let (state_tx, mut state_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Monitor::new(poller, command_rx, state_tx, cancel.clone()).run());

        state_rx.recv().await.unwrap();
        tokio::time::advance(Duration::from_secs(21)).await;
        state_rx.recv().await.unwrap();
        assert_eq!(source.call_count(), 2);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_monitor_stops_when_commands_close() {
        let dir = TempDir::new().unwrap();
        let poller = Poller::with_source_factory(
            ConfigStore::open(dir.path().join("config.toml")),
            mock_factory(Arc::new(MockSource::new(Snapshot::default()))),
        );

        let (command_tx, command_rx) = mpsc::channel(8);
        let (state_tx, mut state_rx) = mpsc::channel(8);
        let handle = tokio::spawn(
            Monitor::new(poller, command_rx, state_tx, CancellationToken::new()).run(),
        );

        state_rx.recv().await.unwrap();
        drop(command_tx);
        handle.await.unwrap();
    }
}
