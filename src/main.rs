use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use url::Url;

use kickoff::config::{self, Config};
use kickoff::integrations::Assistant;
use kickoff::logging;
use kickoff::platform::{
    FixedColorScheme, KeyValueStorage, MemoryStorage, Platform, SessionLocation, ThemeAttribute,
};
use kickoff::share;
use kickoff::storage::FileStorage;
use kickoff::{ConfigurationStore, StoreOptions, generate_prompt, render_prompt};

#[derive(Parser)]
#[command(name = "kickoff")]
#[command(version)]
#[command(about = "Configure a new project and compose its kickoff prompt", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Page URL to start from; its fragment wins over stored state
    #[arg(long, global = true)]
    url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the composed prompt
    Prompt {
        /// Print the sections as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Update fields and print the page URL with its new fragment
    Set {
        /// Top-level field assignments, e.g. runtime='"rust"' or packaging='{"crates":true}'
        #[arg(value_name = "FIELD=JSON", required = true)]
        assignments: Vec<String>,
    },
    /// Print the share link for the current configuration
    Share,
    /// Write the configuration as pretty JSON
    Export {
        /// Target directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// File stem (defaults to project-state)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print a deep link that opens the prompt in an assistant
    Link {
        #[arg(value_enum)]
        assistant: Assistant,
    },
    /// Print the resolved theme attribute
    Theme,
}

#[tokio::main]
async fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();

    let loaded_config = config::load_config();

    let (session_id, _guard) = match logging::init(&loaded_config.config.logging.level) {
        Ok(ctx) => {
            logging::cleanup_old_logs(&ctx.log_directory);
            (Some(ctx.session_id), Some(ctx._guard))
        }
        Err(e) => {
            eprintln!("Warning: Failed to initialize logging: {}", e);
            (None, None)
        }
    };

    debug!(
        config_path = %loaded_config.config_path.display(),
        status = ?loaded_config.status,
        "config_loaded"
    );

    let result = run(cli, &loaded_config.config);

    if let Some(sid) = session_id {
        info!(
            session_id = %sid,
            duration_secs = start_time.elapsed().as_secs_f64(),
            "session_end"
        );
    }

    result
}

fn run(cli: Cli, config: &Config) -> Result<()> {
    let url = cli.url.as_deref().unwrap_or(&config.share.base_url);
    let url = Url::parse(url).with_context(|| format!("invalid page URL: {url}"))?;

    let theme_attribute = Arc::new(ThemeAttribute::new());
    let location = Arc::new(SessionLocation::new(url));
    let platform = Platform {
        storage: open_storage(config),
        location: location.clone(),
        color_scheme: Arc::new(FixedColorScheme {
            dark: config.prefers_dark(),
        }),
        theme_sink: theme_attribute.clone(),
    };

    let store = ConfigurationStore::new(
        platform,
        StoreOptions {
            storage_key: config.storage.key.clone(),
            persist_delay: config.persist_delay(),
        },
    );
    let _subscription = store.subscribe(|state| {
        debug!(
            project_types = ?state.display_project_types(),
            runtime = %state.display_runtime(),
            "state_changed"
        );
    });

    store.restore();

    match cli.command {
        Commands::Prompt { json } => {
            let sections = generate_prompt(&store.get());
            if json {
                println!("{}", serde_json::to_string_pretty(&sections)?);
            } else {
                println!("{}", render_prompt(&sections));
            }
        }
        Commands::Set { assignments } => {
            store.set_json(Value::Object(parse_assignments(&assignments)?));
            store.flush();
            // flush() rewrote the fragment.
            println!("{}", location.href());
        }
        Commands::Share => {
            println!("{}", store.share_url());
        }
        Commands::Export { dir, name } => {
            let path = share::write_export(&store.get(), &dir, name.as_deref())
                .with_context(|| format!("failed to export into {}", dir.display()))?;
            println!("{}", path.display());
        }
        Commands::Link { assistant } => {
            let prompt = render_prompt(&generate_prompt(&store.get()));
            println!("{}", assistant.url(&prompt));
            if !assistant.carries_prompt() {
                eprintln!("{} links do not carry the prompt; paste it after opening.", assistant.label());
            }
        }
        Commands::Theme => {
            let theme = theme_attribute
                .current()
                .unwrap_or_else(|| store.apply_theme(&store.get()));
            println!("{}=\"{}\"", ThemeAttribute::NAME, theme.as_str());
        }
    }

    Ok(())
}

fn open_storage(config: &Config) -> Arc<dyn KeyValueStorage> {
    let storage = match config.storage_dir() {
        Some(dir) => Ok(FileStorage::new(dir)),
        None => FileStorage::in_platform_dir(),
    };
    match storage {
        Ok(storage) => {
            debug!(dir = %storage.dir().display(), "storage_opened");
            Arc::new(storage)
        }
        Err(e) => {
            warn!(error = %e, "storage_unavailable_using_memory");
            Arc::new(MemoryStorage::new())
        }
    }
}

/// Parse `FIELD=JSON` pairs into one patch object.
///
/// Values that are not valid JSON are taken as plain strings.
fn parse_assignments(assignments: &[String]) -> Result<Map<String, Value>> {
    let mut patch = Map::new();
    for assignment in assignments {
        let Some((field, raw)) = assignment.split_once('=') else {
            bail!("expected FIELD=JSON, got {assignment:?}");
        };
        let field = field.trim();
        if field.is_empty() {
            bail!("empty field name in {assignment:?}");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        patch.insert(field.to_string(), value);
    }
    Ok(patch)
}
