use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use droplite_core::{
    models::theme::{Gradient, ThemeConfig, DEFAULT_GRADIENT_FROM},
    ThemeMode,
};
use log::{debug, warn};
use tokio::task::{AbortHandle, JoinHandle};

use crate::api::ApiClient;

/// Quiet period after the last gradient edit before it is committed and saved.
pub const GRADIENT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemePhase {
    Loading,
    Ready,
}

struct ThemeState {
    phase: ThemePhase,
    config: ThemeConfig,
    pending: Option<Gradient>,
    // Bumped on every gradient edit; a timer only commits if it still matches.
    generation: u64,
    timer: Option<AbortHandle>,
    tasks: Vec<JoinHandle<()>>,
}

/// In-memory theme preferences, pushed to the backend on change.
///
/// Local state is authoritative: failed pushes are logged and never rolled back.
/// Mode and gradient toggles are pushed immediately, gradient colours are
/// debounced so that a burst of edits produces a single write.
///
/// Setters spawn tokio tasks and must be called from within a runtime.
pub struct ThemeStore {
    api: ApiClient,
    state: Arc<Mutex<ThemeState>>,
}

fn lock(state: &Mutex<ThemeState>) -> MutexGuard<'_, ThemeState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn save(api: &ApiClient, config: &ThemeConfig) {
    match api.save_theme(config).await {
        Ok(()) => debug!("Saved theme {:?}", config),
        Err(err) => warn!("Could not save theme: {}", err),
    }
}

impl ThemeStore {
    pub fn new(api: ApiClient) -> Self {
        ThemeStore {
            api,
            state: Arc::new(Mutex::new(ThemeState {
                phase: ThemePhase::Loading,
                config: ThemeConfig::default(),
                pending: None,
                generation: 0,
                timer: None,
                tasks: Vec::new(),
            })),
        }
    }

    /// Creates a store and fetches the persisted theme. Never fails: an
    /// unreachable backend leaves the built-in defaults in place.
    pub async fn load(api: ApiClient) -> Self {
        let store = Self::new(api);
        store.fetch().await;
        store
    }

    pub async fn fetch(&self) {
        let fetched = self.api.get_theme().await;
        let mut state = lock(&self.state);
        match fetched {
            Ok(config) => state.config = config,
            Err(err) => debug!("Using default theme: {}", err),
        }
        state.phase = ThemePhase::Ready;
    }

    pub fn phase(&self) -> ThemePhase {
        lock(&self.state).phase
    }

    pub fn config(&self) -> ThemeConfig {
        lock(&self.state).config.clone()
    }

    pub fn mode(&self) -> ThemeMode {
        lock(&self.state).config.theme
    }

    /// The committed gradient. Edits still inside the debounce window are not included.
    pub fn gradient(&self) -> Gradient {
        lock(&self.state).config.gradient()
    }

    pub fn pending_gradient(&self) -> Option<Gradient> {
        lock(&self.state).pending.clone()
    }

    pub fn gradient_enabled(&self) -> bool {
        lock(&self.state).config.gradient_on
    }

    /// CSS background for the current committed state.
    pub fn background(&self) -> String {
        let config = self.config();
        if config.gradient_on {
            format!(
                "linear-gradient(135deg, {} 0%, {} 100%)",
                config.gradient_from, config.gradient_to
            )
        } else {
            match config.theme {
                ThemeMode::Dark => DEFAULT_GRADIENT_FROM.to_string(),
                ThemeMode::Light => "#ffffff".to_string(),
            }
        }
    }

    pub fn set_mode(&self, mode: ThemeMode) {
        let mut state = lock(&self.state);
        state.config.theme = mode;
        let config = state.config.clone();
        self.push(&mut state, config);
    }

    pub fn set_gradient_enabled(&self, on: bool) {
        let mut state = lock(&self.state);
        state.config.gradient_on = on;
        let config = state.config.clone();
        self.push(&mut state, config);
    }

    /// Stages `gradient` and (re)arms the debounce timer. The value is committed
    /// and pushed once no further edit arrives within [`GRADIENT_DEBOUNCE`].
    pub fn set_gradient(&self, gradient: Gradient) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.pending = Some(gradient);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }

        let generation = state.generation;
        let shared = self.state.clone();
        let api = self.api.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(GRADIENT_DEBOUNCE).await;
            let config = {
                let mut state = lock(&shared);
                if state.generation != generation {
                    return;
                }
                let Some(gradient) = state.pending.take() else {
                    return;
                };
                state.timer = None;
                state.config.set_gradient(gradient);
                state.config.clone()
            };
            save(&api, &config).await;
        });
        state.timer = Some(handle.abort_handle());
        state.tasks.retain(|x| !x.is_finished());
        state.tasks.push(handle);
    }

    /// Waits for an armed gradient timer and every push already in flight.
    pub async fn settle(&self) {
        loop {
            let tasks = std::mem::take(&mut lock(&self.state).tasks);
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                // Superseded timers end as cancelled, which is expected.
                let _ = task.await;
            }
        }
    }

    fn push(&self, state: &mut ThemeState, config: ThemeConfig) {
        let api = self.api.clone();
        state.tasks.retain(|x| !x.is_finished());
        state
            .tasks
            .push(tokio::spawn(async move { save(&api, &config).await }));
    }
}

impl Drop for ThemeStore {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn mock_backend(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/theme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "theme": "light",
                "gradient_from": "#111111",
                "gradient_to": "#222222",
                "gradient_on": false
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/theme"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    async fn theme_writes(server: &MockServer) -> Vec<ThemeConfig> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|x| x.method.as_str() == "POST" && x.url.path() == "/theme")
            .map(|x| x.body_json::<ThemeConfig>().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_load_applies_backend_theme() {
        let server = mock_backend(204).await;
        let store = ThemeStore::new(ApiClient::new(server.uri()));
        assert_eq!(store.phase(), ThemePhase::Loading);

        store.fetch().await;

        assert_eq!(store.phase(), ThemePhase::Ready);
        assert_eq!(store.mode(), ThemeMode::Light);
        assert_eq!(store.gradient(), Gradient::new("#111111", "#222222"));
        assert!(!store.gradient_enabled());
        assert_eq!(store.background(), "#ffffff");
    }

    #[tokio::test]
    async fn test_failed_load_keeps_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/theme"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let store = ThemeStore::load(ApiClient::new(server.uri())).await;

        assert_eq!(store.phase(), ThemePhase::Ready);
        assert_eq!(store.config(), ThemeConfig::default());
        assert_eq!(
            store.background(),
            "linear-gradient(135deg, #23272a 0%, #a5b4fc 100%)"
        );
    }

    #[tokio::test]
    async fn test_set_mode_writes_once_without_delay() {
        let server = mock_backend(204).await;
        let store = ThemeStore::load(ApiClient::new(server.uri())).await;

        let started = Instant::now();
        store.set_mode(ThemeMode::Dark);
        assert_eq!(store.mode(), ThemeMode::Dark);
        store.settle().await;

        assert!(started.elapsed() < GRADIENT_DEBOUNCE);
        let writes = theme_writes(&server).await;
        assert_eq!(writes.len(), 1);
        assert_eq!(
            writes[0],
            ThemeConfig {
                theme: ThemeMode::Dark,
                gradient_from: "#111111".to_string(),
                gradient_to: "#222222".to_string(),
                gradient_on: false,
            }
        );
    }

    #[tokio::test]
    async fn test_set_gradient_enabled_writes_immediately() {
        let server = mock_backend(204).await;
        let store = ThemeStore::load(ApiClient::new(server.uri())).await;

        store.set_gradient_enabled(true);
        store.set_gradient_enabled(false);
        store.settle().await;

        let writes = theme_writes(&server).await;
        assert_eq!(writes.len(), 2);
        assert!(writes.iter().any(|x| x.gradient_on));
        assert!(!store.gradient_enabled());
    }

    #[tokio::test]
    async fn test_gradient_edits_are_coalesced() {
        let server = mock_backend(204).await;
        let store = ThemeStore::load(ApiClient::new(server.uri())).await;

        store.set_gradient(Gradient::new("#000001", "#222222"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.set_gradient(Gradient::new("#000002", "#222222"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        store.set_gradient(Gradient::new("#000003", "#333333"));

        // Nothing is committed while the window is open.
        assert_eq!(store.gradient(), Gradient::new("#111111", "#222222"));
        assert_eq!(
            store.pending_gradient(),
            Some(Gradient::new("#000003", "#333333"))
        );
        assert!(theme_writes(&server).await.is_empty());

        store.settle().await;

        let writes = theme_writes(&server).await;
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].gradient_from, "#000003");
        assert_eq!(writes[0].gradient_to, "#333333");
        assert_eq!(writes[0].theme, ThemeMode::Light);
        assert_eq!(store.gradient(), Gradient::new("#000003", "#333333"));
        assert_eq!(store.pending_gradient(), None);
    }

    #[tokio::test]
    async fn test_drop_cancels_pending_gradient() {
        let server = mock_backend(204).await;
        let store = ThemeStore::load(ApiClient::new(server.uri())).await;

        store.set_gradient(Gradient::new("#abcdef", "#fedcba"));
        drop(store);
        tokio::time::sleep(GRADIENT_DEBOUNCE + Duration::from_millis(200)).await;

        assert!(theme_writes(&server).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_push_keeps_local_state() {
        let server = mock_backend(500).await;
        let store = ThemeStore::load(ApiClient::new(server.uri())).await;

        store.set_mode(ThemeMode::Dark);
        store.set_gradient(Gradient::new("#000000", "#ffffff"));
        store.settle().await;

        assert_eq!(theme_writes(&server).await.len(), 2);
        assert_eq!(store.mode(), ThemeMode::Dark);
        assert_eq!(store.gradient(), Gradient::new("#000000", "#ffffff"));
    }
}
