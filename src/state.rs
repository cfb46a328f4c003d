//! Project configuration model.
//!
//! [`ProjectState`] is the single value the store holds and the composer reads.
//! Fields serialize in camelCase so snapshots written to storage and share
//! links stay readable across versions. Every field has a default, so any
//! partial or older snapshot can be merged over [`ProjectState::default`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Declares a closed option set with its wire label.
///
/// The label is both the serialized form and the text the composer prints.
macro_rules! labeled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Wire label, also used verbatim in generated prompts.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

labeled_enum! {
    /// Kind of project being kicked off.
    ProjectType {
        Cli => "cli",
        WebSpa => "web-spa",
        WebMpa => "web-mpa",
        ApiRest => "api-rest",
        ApiGraphql => "api-graphql",
        Library => "library",
        McpServer => "mcp-server",
        McpClient => "mcp-client",
        VscodeExtension => "vscode-extension",
        BrowserExtension => "browser-extension",
        Custom => "custom",
    }
}

labeled_enum! {
    /// Primary execution target.
    Runtime {
        Node => "node",
        Browser => "browser",
        Deno => "deno",
        Bun => "bun",
        Python => "python",
        Rust => "rust",
        Go => "go",
        Java => "java",
        Dotnet => "dotnet",
        Custom => "custom",
    }
}

labeled_enum! {
    /// UI color preference. Not part of the generated prompt.
    Theme {
        System => "system",
        Light => "light",
        Dark => "dark",
    }
}

labeled_enum! {
    RepoMode {
        Single => "single",
        Monorepo => "monorepo",
    }
}

labeled_enum! {
    DataStore {
        None => "none",
        LocalStorage => "localstorage",
        IndexedDb => "indexeddb",
        SqliteWasm => "sqlite-wasm",
        HostedDb => "hosted-db",
    }
}

labeled_enum! {
    Testing {
        None => "none",
        Unit => "unit",
        E2e => "e2e",
    }
}

labeled_enum! {
    Hosting {
        GithubPages => "github-pages",
        Vercel => "vercel",
        Netlify => "netlify",
        SelfHosted => "selfhosted",
    }
}

labeled_enum! {
    License {
        Mit => "MIT",
        Apache2 => "Apache-2.0",
        Gpl3 => "GPL-3.0",
        None => "none",
    }
}

labeled_enum! {
    CiPipeline {
        None => "none",
        GithubActions => "github-actions",
        GitlabCi => "gitlab-ci",
        CircleCi => "circleci",
    }
}

labeled_enum! {
    Secrets {
        None => "none",
        Env => "env",
        CiSecrets => "ci-secrets",
    }
}

/// Quality tooling choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Quality {
    pub linting: bool,
    pub testing: Testing,
    pub ci: bool,
    pub formatting: bool,
    pub conventional_commits: bool,
}

impl Default for Quality {
    fn default() -> Self {
        Self {
            linting: true,
            testing: Testing::Unit,
            ci: true,
            formatting: true,
            conventional_commits: true,
        }
    }
}

/// Package registries to publish to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Packaging {
    pub npm: bool,
    pub pypi: bool,
    pub crates: bool,
    pub docker: bool,
    pub homebrew: bool,
}

impl Packaging {
    /// Names of the enabled targets, in record order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("npm", self.npm),
            ("pypi", self.pypi),
            ("crates", self.crates),
            ("docker", self.docker),
            ("homebrew", self.homebrew),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }
}

/// Documentation and compliance files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Documentation {
    pub readme: bool,
    pub license: License,
    pub changelog: bool,
    pub contributing: bool,
    pub code_of_conduct: bool,
    pub agents_md: bool,
}

impl Default for Documentation {
    fn default() -> Self {
        Self {
            readme: true,
            license: License::Mit,
            changelog: false,
            contributing: false,
            code_of_conduct: false,
            agents_md: true,
        }
    }
}

/// Local tooling and pipeline choices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DevEnvironment {
    pub devcontainer: bool,
    pub docker_compose: bool,
    pub ci_pipeline: CiPipeline,
    pub cd_pipeline: bool,
}

impl Default for DevEnvironment {
    fn default() -> Self {
        Self {
            devcontainer: false,
            docker_compose: false,
            ci_pipeline: CiPipeline::GithubActions,
            cd_pipeline: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RepoSetup {
    pub issue_templates: bool,
    pub dir_structure: bool,
}

impl Default for RepoSetup {
    fn default() -> Self {
        Self {
            issue_templates: false,
            dir_structure: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Advanced {
    pub secrets: Secrets,
    pub security: bool,
}

impl Default for Advanced {
    fn default() -> Self {
        Self {
            secrets: Secrets::None,
            security: false,
        }
    }
}

/// The complete set of user-chosen project-setup options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectState {
    pub project_types: Vec<ProjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_project_type: Option<String>,
    pub runtime: Runtime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_runtime: Option<String>,
    pub theme: Theme,
    pub repo_mode: RepoMode,
    pub data_stores: Vec<DataStore>,
    pub quality: Quality,
    pub hosting: Hosting,
    pub packaging: Packaging,
    pub documentation: Documentation,
    pub dev_environment: DevEnvironment,
    pub repo_setup: RepoSetup,
    pub advanced: Advanced,
    /// Top-level fields this version does not know. Kept and written back
    /// so newer snapshots survive a round trip through an older build.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ProjectState {
    fn default() -> Self {
        Self {
            project_types: vec![ProjectType::WebSpa],
            custom_project_type: None,
            runtime: Runtime::Node,
            custom_runtime: None,
            theme: Theme::System,
            repo_mode: RepoMode::Single,
            data_stores: Vec::new(),
            quality: Quality::default(),
            hosting: Hosting::Vercel,
            packaging: Packaging::default(),
            documentation: Documentation::default(),
            dev_environment: DevEnvironment::default(),
            repo_setup: RepoSetup::default(),
            advanced: Advanced::default(),
            extra: Map::new(),
        }
    }
}

/// Single-valued project type field written by older versions.
const LEGACY_PROJECT_TYPE: &str = "projectType";
const PROJECT_TYPES: &str = "projectTypes";

/// Wire names of the typed top-level fields. These never live in `extra`.
const FIELD_NAMES: &[&str] = &[
    PROJECT_TYPES,
    "customProjectType",
    "runtime",
    "customRuntime",
    "theme",
    "repoMode",
    "dataStores",
    "quality",
    "hosting",
    "packaging",
    "documentation",
    "devEnvironment",
    "repoSetup",
    "advanced",
];

fn is_field_name(key: &str) -> bool {
    key == LEGACY_PROJECT_TYPE || FIELD_NAMES.contains(&key)
}

impl ProjectState {
    /// Project types as shown to the user, with the custom override applied.
    pub fn display_project_types(&self) -> Vec<&str> {
        self.project_types
            .iter()
            .map(|project_type| match project_type {
                ProjectType::Custom => non_empty(self.custom_project_type.as_deref())
                    .unwrap_or(ProjectType::Custom.as_str()),
                other => other.as_str(),
            })
            .collect()
    }

    /// Runtime as shown to the user, with the custom override applied.
    pub fn display_runtime(&self) -> &str {
        match self.runtime {
            Runtime::Custom => {
                non_empty(self.custom_runtime.as_deref()).unwrap_or(Runtime::Custom.as_str())
            }
            other => other.as_str(),
        }
    }

    /// Enforce the invariants the form controls rely on.
    ///
    /// Duplicate project types collapse to their first occurrence, and a
    /// single-package repo keeps only its first project type. `extra` keys
    /// naming a typed field are dropped so they cannot shadow it on the wire.
    pub fn normalize(&mut self) {
        self.drop_shadowing_extra();

        let mut seen = Vec::with_capacity(self.project_types.len());
        self.project_types.retain(|project_type| {
            if seen.contains(project_type) {
                false
            } else {
                seen.push(*project_type);
                true
            }
        });

        if self.repo_mode == RepoMode::Single && self.project_types.len() > 1 {
            debug!(
                dropped = self.project_types.len() - 1,
                "single_repo_project_types_truncated"
            );
            self.project_types.truncate(1);
        }
    }

    /// Shallow-merge a JSON object over this state.
    ///
    /// Each top-level key replaces the current field wholesale; nested
    /// records are not deep-merged, so nested fields missing from the patch
    /// take their defaults. A key whose value does not fit its field is
    /// skipped and the previous value kept. Unknown keys land in `extra`.
    pub fn merge_object(&mut self, patch: Map<String, Value>) {
        let patch = migrate_legacy_fields(patch);
        self.drop_shadowing_extra();

        let mut merged = match serde_json::to_value(&*self) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return,
            Err(e) => {
                warn!(error = %e, "state_serialize_failed");
                return;
            }
        };

        for (key, value) in patch {
            let probe = Map::from_iter([(key.clone(), value.clone())]);
            match serde_json::from_value::<ProjectState>(Value::Object(probe)) {
                Ok(_) => {
                    merged.insert(key, value);
                }
                Err(e) => warn!(field = %key, error = %e, "state_field_rejected"),
            }
        }

        match serde_json::from_value::<ProjectState>(Value::Object(merged)) {
            Ok(state) => *self = state,
            Err(e) => warn!(error = %e, "state_merge_failed"),
        }
    }
}

impl ProjectState {
    fn drop_shadowing_extra(&mut self) {
        self.extra.retain(|key, _| {
            let shadows = is_field_name(key);
            if shadows {
                warn!(field = %key, "extra_field_shadows_known_field");
            }
            !shadows
        });
    }
}

/// Rewrite fields from older snapshot shapes into the current layout.
fn migrate_legacy_fields(mut patch: Map<String, Value>) -> Map<String, Value> {
    if let Some(legacy) = patch.remove(LEGACY_PROJECT_TYPE)
        && !patch.contains_key(PROJECT_TYPES)
    {
        debug!("legacy_project_type_migrated");
        patch.insert(PROJECT_TYPES.to_string(), Value::Array(vec![legacy]));
    }
    patch
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// A typed partial update. `None` leaves the field as it is.
///
/// Nested records are replaced whole: to flip one flag, copy the current
/// record, change the flag, and pass the full record back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    pub project_types: Option<Vec<ProjectType>>,
    /// `Some(None)` clears the override.
    pub custom_project_type: Option<Option<String>>,
    pub runtime: Option<Runtime>,
    /// `Some(None)` clears the override.
    pub custom_runtime: Option<Option<String>>,
    pub theme: Option<Theme>,
    pub repo_mode: Option<RepoMode>,
    pub data_stores: Option<Vec<DataStore>>,
    pub quality: Option<Quality>,
    pub hosting: Option<Hosting>,
    pub packaging: Option<Packaging>,
    pub documentation: Option<Documentation>,
    pub dev_environment: Option<DevEnvironment>,
    pub repo_setup: Option<RepoSetup>,
    pub advanced: Option<Advanced>,
    /// Raw top-level fields, merged like a JSON patch.
    pub extra: Map<String, Value>,
}

impl StatePatch {
    /// Apply this patch to `state` with top-level replacement semantics.
    ///
    /// `extra` goes through [`ProjectState::merge_object`] first, so a key
    /// naming a typed field is parsed into that field. Typed fields win.
    pub fn apply_to(self, state: &mut ProjectState) {
        if !self.extra.is_empty() {
            state.merge_object(self.extra);
        }
        if let Some(v) = self.project_types {
            state.project_types = v;
        }
        if let Some(v) = self.custom_project_type {
            state.custom_project_type = v;
        }
        if let Some(v) = self.runtime {
            state.runtime = v;
        }
        if let Some(v) = self.custom_runtime {
            state.custom_runtime = v;
        }
        if let Some(v) = self.theme {
            state.theme = v;
        }
        if let Some(v) = self.repo_mode {
            state.repo_mode = v;
        }
        if let Some(v) = self.data_stores {
            state.data_stores = v;
        }
        if let Some(v) = self.quality {
            state.quality = v;
        }
        if let Some(v) = self.hosting {
            state.hosting = v;
        }
        if let Some(v) = self.packaging {
            state.packaging = v;
        }
        if let Some(v) = self.documentation {
            state.documentation = v;
        }
        if let Some(v) = self.dev_environment {
            state.dev_environment = v;
        }
        if let Some(v) = self.repo_setup {
            state.repo_setup = v;
        }
        if let Some(v) = self.advanced {
            state.advanced = v;
        }
    }
}
