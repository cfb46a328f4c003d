//! Reactive configuration store.
//!
//! [`ConfigurationStore`] is the single source of truth for a session. It
//! applies partial updates, tells subscribers about every change before
//! `set` returns, and mirrors the value to durable storage and the location
//! fragment after a short debounce. Persistence is best-effort: failures are
//! logged and never reach the caller.
//!
//! The store is a cheap handle around shared state; clone it to hand it to
//! another component instead of reaching for a global.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::fragment;
use crate::platform::{Platform, lock};
use crate::share;
use crate::state::{ProjectState, StatePatch};
use crate::theme::{self, ResolvedTheme};

/// Storage key holding the JSON snapshot.
pub const STORAGE_KEY: &str = "app-state";

/// Delay between the last `set` and the persistence write.
pub const DEFAULT_PERSIST_DELAY: Duration = Duration::from_millis(200);

type Listener = Arc<dyn Fn(&ProjectState) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub storage_key: String,
    pub persist_delay: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            persist_delay: DEFAULT_PERSIST_DELAY,
        }
    }
}

/// Where [`ConfigurationStore::restore`] found its snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Fragment,
    Storage,
    /// Nothing usable was found; the compiled-in default stays.
    Default,
}

struct Shared {
    state: Mutex<ProjectState>,
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    /// At most one pending persistence write.
    pending_persist: Mutex<Option<JoinHandle<()>>>,
    platform: Platform,
    options: StoreOptions,
}

impl Shared {
    fn persist(&self) {
        let state = lock(&self.state).clone();
        let json = match serde_json::to_string(&state) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "state_serialize_failed");
                return;
            }
        };

        if let Err(e) = self.platform.storage.set(&self.options.storage_key, &json) {
            warn!(key = %self.options.storage_key, error = %e, "storage_write_failed");
        }
        self.platform
            .location
            .replace_fragment(&fragment::encode_json(&json));
        debug!(bytes = json.len(), "state_persisted");
    }
}

#[derive(Clone)]
pub struct ConfigurationStore {
    shared: Arc<Shared>,
}

impl ConfigurationStore {
    /// Create a store seeded with the default configuration.
    pub fn new(platform: Platform, options: StoreOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(ProjectState::default()),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
                pending_persist: Mutex::new(None),
                platform,
                options,
            }),
        }
    }

    /// Current configuration.
    pub fn get(&self) -> ProjectState {
        lock(&self.shared.state).clone()
    }

    /// Apply a typed partial update.
    pub fn set(&self, patch: StatePatch) {
        self.update(|state| patch.apply_to(state));
    }

    /// Apply a raw JSON partial update.
    ///
    /// Anything other than an object is logged and ignored. Fields that do
    /// not fit are skipped; see [`ProjectState::merge_object`].
    pub fn set_json(&self, patch: Value) {
        match patch {
            Value::Object(map) => self.update(|state| state.merge_object(map)),
            other => warn!(kind = %json_kind(&other), "state_patch_not_object"),
        }
    }

    fn update(&self, mutate: impl FnOnce(&mut ProjectState)) {
        let snapshot = {
            let mut state = lock(&self.shared.state);
            mutate(&mut state);
            state.normalize();
            state.clone()
        };
        self.apply_theme(&snapshot);
        self.schedule_persist();
        self.notify(&snapshot);
    }

    /// Register a listener called with the new value after every change.
    pub fn subscribe(
        &self,
        listener: impl Fn(&ProjectState) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners).insert(id, Arc::new(listener));
        debug!(listener_id = id, "listener_subscribed");
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Load the snapshot from the fragment, else from storage.
    ///
    /// The snapshot is merged over the default so fields added since it was
    /// written keep their defaults. A snapshot that fails to decode is
    /// dropped and the current value kept. Call once, before user edits.
    pub fn restore(&self) -> RestoreSource {
        let (source, snapshot) = match self.load_snapshot() {
            Some((source, object)) => {
                let mut restored = ProjectState::default();
                restored.merge_object(object);
                restored.normalize();
                *lock(&self.shared.state) = restored.clone();
                (source, restored)
            }
            None => (RestoreSource::Default, self.get()),
        };
        info!(source = ?source, "state_restored");

        self.apply_theme(&snapshot);
        self.notify(&snapshot);
        source
    }

    fn load_snapshot(&self) -> Option<(RestoreSource, Map<String, Value>)> {
        let platform = &self.shared.platform;

        if let Some(fragment) = platform.location.fragment() {
            return match fragment::decode_object(&fragment) {
                Ok(object) => Some((RestoreSource::Fragment, object)),
                Err(e) => {
                    warn!(error = %e, "fragment_restore_failed");
                    None
                }
            };
        }

        let key = &self.shared.options.storage_key;
        match platform.storage.get(key) {
            Ok(Some(raw)) => match fragment::parse_object(&raw) {
                Ok(object) => Some((RestoreSource::Storage, object)),
                Err(e) => {
                    warn!(key = %key, error = %e, "storage_restore_failed");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "storage_read_failed");
                None
            }
        }
    }

    /// Write any pending change now instead of waiting for the debounce.
    pub fn flush(&self) {
        if let Some(handle) = lock(&self.shared.pending_persist).take() {
            handle.abort();
        }
        self.shared.persist();
    }

    /// Absolute share URL for the current value.
    pub fn share_url(&self) -> String {
        let base = self.shared.platform.location.base();
        match share::build_share_url(&base, &self.get()) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "share_url_failed");
                base
            }
        }
    }

    /// Resolve the theme and write it to the host's presentation sink.
    pub fn apply_theme(&self, state: &ProjectState) -> ResolvedTheme {
        let platform = &self.shared.platform;
        theme::apply(
            state.theme,
            platform.color_scheme.as_ref(),
            platform.theme_sink.as_ref(),
        )
    }

    fn schedule_persist(&self) {
        let mut pending = lock(&self.shared.pending_persist);
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let shared = Arc::clone(&self.shared);
                let delay = self.shared.options.persist_delay;
                *pending = Some(runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    shared.persist();
                }));
            }
            Err(_) => {
                // No timer available: write through.
                drop(pending);
                self.shared.persist();
            }
        }
    }

    fn notify(&self, state: &ProjectState) {
        let listeners: Vec<Listener> = lock(&self.shared.listeners).values().cloned().collect();
        for listener in listeners {
            listener(state);
        }
    }
}

/// Handle returned by [`ConfigurationStore::subscribe`].
///
/// Dropping it does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Remove this listener. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(shared) = self.shared.upgrade()
            && lock(&shared.listeners).remove(&self.id).is_some()
        {
            debug!(listener_id = self.id, "listener_unsubscribed");
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use crate::platform::{
        FixedColorScheme, KeyValueStorage, Location, MemoryStorage, SessionLocation,
        ThemeAttribute,
    };
    use crate::state::{Hosting, Packaging, ProjectType, RepoMode, Runtime, Theme};
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use url::Url;

    struct Harness {
        store: ConfigurationStore,
        storage: Arc<MemoryStorage>,
        location: Arc<SessionLocation>,
        theme: Arc<ThemeAttribute>,
    }

    fn harness_with(url: &str, dark: bool, delay: Duration) -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let location = Arc::new(SessionLocation::new(Url::parse(url).unwrap()));
        let theme = Arc::new(ThemeAttribute::new());
        let platform = Platform {
            storage: storage.clone(),
            location: location.clone(),
            color_scheme: Arc::new(FixedColorScheme { dark }),
            theme_sink: theme.clone(),
        };
        let store = ConfigurationStore::new(
            platform,
            StoreOptions {
                persist_delay: delay,
                ..StoreOptions::default()
            },
        );
        Harness {
            store,
            storage,
            location,
            theme,
        }
    }

    fn harness() -> Harness {
        harness_with("https://example.com/app/", false, DEFAULT_PERSIST_DELAY)
    }

    /// Storage that rejects every write.
    struct FullStorage;

    impl KeyValueStorage for FullStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Unavailable("disabled".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::QuotaExceeded)
        }
    }

    #[test]
    fn test_get_returns_default() {
        let h = harness();
        assert_eq!(h.store.get(), ProjectState::default());
    }

    #[test]
    fn test_set_notifies_synchronously() {
        let h = harness();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        h.store.subscribe(move |state| sink.lock().unwrap().push(state.runtime));

        h.store.set(StatePatch {
            runtime: Some(Runtime::Rust),
            ..StatePatch::default()
        });

        assert_eq!(*seen.lock().unwrap(), vec![Runtime::Rust]);
        assert_eq!(h.store.get().runtime, Runtime::Rust);
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let h = harness();
        let order = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let order = order.clone();
            h.store.subscribe(move |_| order.lock().unwrap().push(n));
        }
        h.store.set(StatePatch::default());
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_listener_can_read_store() {
        let h = harness();
        let store = h.store.clone();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        h.store
            .subscribe(move |_| *sink.lock().unwrap() = Some(store.get().hosting));

        h.store.set_json(json!({ "hosting": "netlify" }));
        let hosting = *seen.lock().unwrap();
        assert_eq!(hosting.map(|hosting| hosting.as_str()), Some("netlify"));
    }

    #[test]
    fn test_unsubscribe_is_idempotent_and_targeted() {
        let h = harness();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = first.clone();
        let subscription = h.store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = second.clone();
        h.store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.store.set(StatePatch::default());
        subscription.unsubscribe();
        subscription.unsubscribe();
        h.store.set(StatePatch::default());

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_json_ignores_non_object() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        h.store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.store.set_json(json!([1, 2, 3]));
        h.store.set_json(Value::Null);

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.get(), ProjectState::default());
    }

    #[test]
    fn test_set_json_keeps_unknown_fields() {
        let h = harness();
        h.store.set_json(json!({ "preset": "minimal" }));
        assert_eq!(h.store.get().extra.get("preset"), Some(&json!("minimal")));
    }

    #[test]
    fn test_set_enforces_single_repo_invariant() {
        let h = harness();
        h.store.set(StatePatch {
            repo_mode: Some(RepoMode::Monorepo),
            project_types: Some(vec![ProjectType::WebSpa, ProjectType::Cli]),
            ..StatePatch::default()
        });
        assert_eq!(h.store.get().project_types.len(), 2);

        h.store.set(StatePatch {
            repo_mode: Some(RepoMode::Single),
            ..StatePatch::default()
        });
        assert_eq!(h.store.get().project_types, vec![ProjectType::WebSpa]);
    }

    #[test]
    fn test_set_applies_theme_each_time() {
        let h = harness_with("https://example.com/", true, DEFAULT_PERSIST_DELAY);
        h.store.set(StatePatch::default());
        assert_eq!(h.theme.current(), Some(ResolvedTheme::Dark));

        h.store.set(StatePatch {
            theme: Some(Theme::Light),
            ..StatePatch::default()
        });
        assert_eq!(h.theme.current(), Some(ResolvedTheme::Light));
    }

    #[test]
    fn test_set_without_runtime_writes_through() {
        let h = harness();
        h.store.set(StatePatch {
            runtime: Some(Runtime::Go),
            ..StatePatch::default()
        });

        let stored = h.storage.get(STORAGE_KEY).unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Value>(&stored).unwrap()["runtime"], "go");
        let fragment = h.location.fragment().unwrap();
        assert_eq!(fragment::decode(&fragment).unwrap().runtime, Runtime::Go);
    }

    #[tokio::test]
    async fn test_persist_is_debounced() {
        let h = harness_with("https://example.com/", false, Duration::from_millis(40));

        h.store.set(StatePatch {
            runtime: Some(Runtime::Deno),
            ..StatePatch::default()
        });
        h.store.set(StatePatch {
            runtime: Some(Runtime::Bun),
            ..StatePatch::default()
        });
        assert!(h.storage.get(STORAGE_KEY).unwrap().is_none());
        assert!(h.location.fragment().is_none());

        tokio::time::sleep(Duration::from_millis(200)).await;

        let stored = h.storage.get(STORAGE_KEY).unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Value>(&stored).unwrap()["runtime"], "bun");
        assert!(h.location.fragment().is_some());
    }

    #[tokio::test]
    async fn test_flush_persists_immediately() {
        let h = harness_with("https://example.com/", false, Duration::from_secs(60));
        h.store.set(StatePatch {
            hosting: Some(crate::state::Hosting::GithubPages),
            ..StatePatch::default()
        });
        assert!(h.storage.get(STORAGE_KEY).unwrap().is_none());

        h.store.flush();
        let stored = h.storage.get(STORAGE_KEY).unwrap().unwrap();
        assert!(stored.contains("github-pages"));
    }

    #[test]
    fn test_storage_failure_is_silent() {
        let location = Arc::new(SessionLocation::new(
            Url::parse("https://example.com/").unwrap(),
        ));
        let store = ConfigurationStore::new(
            Platform {
                storage: Arc::new(FullStorage),
                location: location.clone(),
                color_scheme: Arc::new(FixedColorScheme { dark: false }),
                theme_sink: Arc::new(ThemeAttribute::new()),
            },
            StoreOptions::default(),
        );

        assert_eq!(store.restore(), RestoreSource::Default);
        store.set(StatePatch {
            runtime: Some(Runtime::Python),
            ..StatePatch::default()
        });

        assert_eq!(store.get().runtime, Runtime::Python);
        // The fragment sink still receives the write.
        assert!(location.fragment().is_some());
    }

    #[test]
    fn test_restore_prefers_fragment() {
        let shared = ProjectState {
            runtime: Runtime::Java,
            ..ProjectState::default()
        };
        let url = format!(
            "https://example.com/app/#{}",
            fragment::encode(&shared).unwrap()
        );
        let h = harness_with(&url, false, DEFAULT_PERSIST_DELAY);
        h.storage
            .set(STORAGE_KEY, &json!({ "runtime": "python" }).to_string())
            .unwrap();

        assert_eq!(h.store.restore(), RestoreSource::Fragment);
        assert_eq!(h.store.get().runtime, Runtime::Java);
    }

    #[test]
    fn test_restore_falls_back_to_storage() {
        let h = harness();
        h.storage
            .set(
                STORAGE_KEY,
                &json!({ "runtime": "python", "packaging": { "pypi": true } }).to_string(),
            )
            .unwrap();

        assert_eq!(h.store.restore(), RestoreSource::Storage);
        let state = h.store.get();
        assert_eq!(state.runtime, Runtime::Python);
        assert!(state.packaging.pypi);
        // Fields missing from the snapshot keep their defaults.
        assert_eq!(state.project_types, vec![ProjectType::WebSpa]);
    }

    #[test]
    fn test_restore_bad_fragment_keeps_default() {
        let h = harness_with("https://example.com/#%%%not-base64", false, DEFAULT_PERSIST_DELAY);
        h.storage
            .set(STORAGE_KEY, &json!({ "runtime": "python" }).to_string())
            .unwrap();

        assert_eq!(h.store.restore(), RestoreSource::Default);
        assert_eq!(h.store.get(), ProjectState::default());
    }

    #[test]
    fn test_restore_malformed_storage_keeps_default() {
        let h = harness();
        h.storage.set(STORAGE_KEY, "{not json").unwrap();
        assert_eq!(h.store.restore(), RestoreSource::Default);
        assert_eq!(h.store.get(), ProjectState::default());
    }

    #[test]
    fn test_restore_notifies_once_and_applies_theme() {
        let h = harness_with("https://example.com/", true, DEFAULT_PERSIST_DELAY);
        h.storage
            .set(STORAGE_KEY, &json!({ "theme": "system" }).to_string())
            .unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        h.store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        h.store.restore();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.theme.current(), Some(ResolvedTheme::Dark));
    }

    #[test]
    fn test_restore_does_not_persist() {
        let h = harness();
        h.store.restore();
        assert!(h.storage.get(STORAGE_KEY).unwrap().is_none());
    }

    #[test]
    fn test_share_url_reflects_current_state() {
        let h = harness();
        h.store.set(StatePatch {
            packaging: Some(Packaging {
                crates: true,
                ..Packaging::default()
            }),
            ..StatePatch::default()
        });

        let url = h.store.share_url();
        let (base, encoded) = url.split_once('#').unwrap();
        assert_eq!(base, "https://example.com/app/");
        assert!(fragment::decode(encoded).unwrap().packaging.crates);
    }

    #[test]
    fn test_share_url_agrees_with_state_after_extra_patch() {
        let h = harness();
        let mut extra = Map::new();
        extra.insert("runtime".to_string(), json!("go"));
        h.store.set(StatePatch {
            extra,
            ..StatePatch::default()
        });

        let state = h.store.get();
        assert_eq!(state.runtime, Runtime::Go);

        let url = h.store.share_url();
        let (_, encoded) = url.split_once('#').unwrap();
        assert_eq!(fragment::decode(encoded).unwrap(), state);

        h.store.set_json(json!({"hosting": "netlify"}));
        assert_eq!(h.store.get().hosting, Hosting::Netlify);
    }
}
