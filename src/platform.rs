//! Host primitives the store depends on.
//!
//! A browser would back these with `localStorage`, `location`/`history`,
//! `matchMedia` and a document attribute. The CLI backs them with files and
//! in-memory values. Tests use the in-memory implementations directly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use url::Url;

use crate::error::StorageError;
use crate::theme::ResolvedTheme;

/// Durable key-value storage.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value. A missing key is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// The addressable location of the running session.
pub trait Location: Send + Sync {
    /// Current fragment without the leading `#`, if any.
    fn fragment(&self) -> Option<String>;

    /// Replace the fragment in place, without creating a history entry.
    fn replace_fragment(&self, fragment: &str);

    /// Origin plus path, i.e. the location with no query or fragment.
    fn base(&self) -> String;
}

/// Ambient color-scheme preference of the host.
pub trait ColorSchemeSignal: Send + Sync {
    fn prefers_dark(&self) -> bool;
}

/// Receives the resolved theme as a single presentation attribute.
pub trait ThemeSink: Send + Sync {
    fn set_theme(&self, theme: ResolvedTheme);
}

/// Bundle of host primitives handed to the store at construction.
#[derive(Clone)]
pub struct Platform {
    pub storage: Arc<dyn KeyValueStorage>,
    pub location: Arc<dyn Location>,
    pub color_scheme: Arc<dyn ColorSchemeSignal>,
    pub theme_sink: Arc<dyn ThemeSink>,
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory storage, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// A location held in memory, seeded from a URL.
#[derive(Debug)]
pub struct SessionLocation {
    url: Mutex<Url>,
}

impl SessionLocation {
    pub fn new(url: Url) -> Self {
        Self {
            url: Mutex::new(url),
        }
    }

    /// Full URL including the current fragment.
    pub fn href(&self) -> String {
        lock(&self.url).to_string()
    }
}

impl Location for SessionLocation {
    fn fragment(&self) -> Option<String> {
        lock(&self.url)
            .fragment()
            .filter(|f| !f.is_empty())
            .map(str::to_string)
    }

    fn replace_fragment(&self, fragment: &str) {
        lock(&self.url).set_fragment(Some(fragment));
        debug!(len = fragment.len(), "fragment_replaced");
    }

    fn base(&self) -> String {
        let url = lock(&self.url);
        format!("{}{}", url.origin().ascii_serialization(), url.path())
    }
}

/// Fixed color-scheme answer, taken from host configuration.
#[derive(Debug, Clone, Copy)]
pub struct FixedColorScheme {
    pub dark: bool,
}

impl ColorSchemeSignal for FixedColorScheme {
    fn prefers_dark(&self) -> bool {
        self.dark
    }
}

/// Remembers the last theme written, like a `data-theme` attribute.
#[derive(Debug, Default)]
pub struct ThemeAttribute {
    current: Mutex<Option<ResolvedTheme>>,
}

impl ThemeAttribute {
    pub const NAME: &'static str = "data-theme";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<ResolvedTheme> {
        *lock(&self.current)
    }
}

impl ThemeSink for ThemeAttribute {
    fn set_theme(&self, theme: ResolvedTheme) {
        *lock(&self.current) = Some(theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_missing_key() {
        let storage = MemoryStorage::new();
        assert!(storage.get("app-state").unwrap().is_none());
        storage.set("app-state", "{}").unwrap();
        assert_eq!(storage.get("app-state").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_session_location_fragment() {
        let location = SessionLocation::new(Url::parse("https://example.com/app/#abc").unwrap());
        assert_eq!(location.fragment().as_deref(), Some("abc"));
        assert_eq!(location.base(), "https://example.com/app/");

        location.replace_fragment("xyz=");
        assert_eq!(location.fragment().as_deref(), Some("xyz="));
        assert_eq!(location.href(), "https://example.com/app/#xyz=");
    }

    #[test]
    fn test_session_location_empty_fragment() {
        let location = SessionLocation::new(Url::parse("https://example.com/app/#").unwrap());
        assert!(location.fragment().is_none());

        let location = SessionLocation::new(Url::parse("https://example.com/app/?q=1").unwrap());
        assert!(location.fragment().is_none());
        assert_eq!(location.base(), "https://example.com/app/");
    }

    #[test]
    fn test_theme_attribute_records_last_value() {
        let attribute = ThemeAttribute::new();
        assert!(attribute.current().is_none());
        attribute.set_theme(ResolvedTheme::Dark);
        attribute.set_theme(ResolvedTheme::Light);
        assert_eq!(attribute.current(), Some(ResolvedTheme::Light));
    }
}
