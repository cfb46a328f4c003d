//! Project-setup configurator core.
//!
//! A [`ConfigurationStore`] holds the user's choices for a new software
//! project, mirrors them to durable storage and a shareable URL fragment,
//! and drives the page theme. [`generate_prompt`] turns a configuration into
//! the ordered sections of a kickoff prompt for a coding assistant.
//!
//! Host primitives (storage, location, color scheme, theme attribute) are
//! injected through the traits in [`platform`].

pub mod config;
pub mod error;
pub mod fragment;
pub mod integrations;
pub mod logging;
pub mod platform;
pub mod prompt;
pub mod share;
pub mod state;
pub mod storage;
pub mod store;
pub mod theme;

pub use error::{SnapshotError, StorageError};
pub use prompt::{Priority, PromptSection, generate_prompt, render_prompt};
pub use state::{ProjectState, StatePatch};
pub use store::{ConfigurationStore, RestoreSource, StoreOptions, Subscription};
