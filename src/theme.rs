//! Theme resolution.
//!
//! `system` is resolved against the host's color-scheme signal every time,
//! so a change in the ambient preference shows up on the next update.

use serde::Serialize;

use crate::platform::{ColorSchemeSignal, ThemeSink};
use crate::state::Theme;

/// A concrete theme, as written to the presentation attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    Light,
    Dark,
}

impl ResolvedTheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

pub fn resolve(theme: Theme, signal: &dyn ColorSchemeSignal) -> ResolvedTheme {
    match theme {
        Theme::Light => ResolvedTheme::Light,
        Theme::Dark => ResolvedTheme::Dark,
        Theme::System if signal.prefers_dark() => ResolvedTheme::Dark,
        Theme::System => ResolvedTheme::Light,
    }
}

/// Resolve and write the theme in one step.
pub fn apply(theme: Theme, signal: &dyn ColorSchemeSignal, sink: &dyn ThemeSink) -> ResolvedTheme {
    let resolved = resolve(theme, signal);
    sink.set_theme(resolved);
    resolved
}
