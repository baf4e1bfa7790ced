//! # azlaunch-cli
//!
//! Command-line interface for azlaunch.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use azlaunch_accounts::{AccountError, SessionLifecycle, SettingsStore};
use azlaunch_core::error::format_error_with_suggestion;
use azlaunch_core::{AuthError, Config, Error};
use azlaunch_store::{RecordStore, SqliteRecordStore};

mod commands;

/// Application context containing shared state.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub lifecycle: Arc<SessionLifecycle>,
    pub settings: SettingsStore,
}

impl AppContext {
    /// Open the record store in the configured data directory and make sure
    /// every settings singleton exists.
    pub async fn open(config: Config) -> anyhow::Result<Self> {
        tracing::debug!(data_dir = ?config.data_dir(), "Opening record store");
        let store: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(config.data_dir())?);
        let lifecycle = Arc::new(SessionLifecycle::new(store.clone()));
        let settings = SettingsStore::from_config(store.clone(), &config);
        settings.init_defaults().await?;

        Ok(Self {
            config,
            store,
            lifecycle,
            settings,
        })
    }
}

/// azlaunch - accounts and settings for the AZauth game launcher
#[derive(Parser)]
#[command(name = "azlaunch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the data directory holding records.db
    #[arg(long, value_name = "DIR", env = "AZLAUNCH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Account management
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },
    /// Revalidate every cached account against the AZauth server
    Reconcile,
    /// Launcher settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Show the options handed to the launch engine
    Launch,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
    /// Diagnose installation issues
    Doctor,
}

#[derive(Subcommand)]
enum AccountsAction {
    /// List cached accounts
    List,
    /// Show the selected account
    Current,
    /// Select an account
    Select {
        /// Account uuid
        uuid: String,
    },
    /// Remove an account
    Remove {
        /// Account uuid
        uuid: String,
    },
    /// Log in and add an account
    Login {
        /// Email or username
        identifier: String,
        /// Password
        #[arg(long, env = "AZLAUNCH_PASSWORD", hide_env_values = true)]
        password: String,
        /// Two-factor code
        #[arg(long)]
        code: Option<String>,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Show all settings
    Show,
    /// Set memory bounds in gigabytes
    Ram {
        min: String,
        max: String,
    },
    /// Set the window size (width "<auto>" lets the game decide)
    Screen {
        width: String,
        #[arg(default_value = "<auto>")]
        height: String,
    },
    /// What happens to the launcher when the game starts
    Close {
        /// close-launcher, close-all or open-launcher
        behavior: String,
    },
    /// Set a custom Java executable (omit to use the bundled runtime)
    JavaPath {
        path: Option<String>,
    },
    /// Set extra JVM arguments
    JavaArgs {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Validate the configuration
    Validate,
    /// Print the config file location
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Commands that must work with a broken config
    let command = match cli.command {
        Commands::Version => {
            println!("azlaunch {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Config { action } => return commands::config::handle(action),
        other => other,
    };

    let mut config = match Config::load_validated() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format_error_with_suggestion(&e));
            std::process::exit(1);
        }
    };
    if let Some(dir) = cli.data_dir {
        config.storage.path = Some(dir);
    }

    if let Err(e) = dispatch(command, config).await {
        eprintln!("{}", format_error_with_suggestion(&to_core_error(e)));
        std::process::exit(1);
    }

    Ok(())
}

async fn dispatch(command: Commands, config: Config) -> anyhow::Result<()> {
    if let Commands::Doctor = command {
        return commands::doctor::run(&config).await;
    }

    let ctx = Arc::new(AppContext::open(config).await?);

    match command {
        Commands::Accounts { action } => commands::accounts::handle(action, &ctx).await,
        Commands::Reconcile => commands::reconcile::run(&ctx).await,
        Commands::Settings { action } => commands::settings::handle(action, &ctx).await,
        Commands::Launch => commands::launch::run(&ctx).await,
        Commands::Doctor | Commands::Version | Commands::Config { .. } => Ok(()),
    }
}

/// Map library errors onto the error type that carries recovery suggestions.
fn to_core_error(err: anyhow::Error) -> Error {
    let err = match err.downcast::<AccountError>() {
        Ok(account) => {
            return match account {
                AccountError::UnknownAccount(uuid) => Error::NotFound(format!("account {}", uuid)),
                AccountError::Store(e) => Error::Store(e.to_string()),
                AccountError::InvalidSetting { field, message } => {
                    Error::Validation(format!("{}: {}", field, message))
                }
                other => Error::Account(other.to_string()),
            }
        }
        Err(err) => err,
    };
    let err = match err.downcast::<AuthError>() {
        Ok(auth) => return Error::Auth(auth),
        Err(err) => err,
    };
    match err.downcast::<azlaunch_store::StoreError>() {
        Ok(store) => Error::Store(store.to_string()),
        Err(err) => Error::Internal(format!("{:#}", err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_login() {
        let cli = Cli::try_parse_from([
            "azlaunch", "accounts", "login", "steve@example.com", "--password", "pw", "--code", "123456",
        ])
        .unwrap();
        match cli.command {
            Commands::Accounts {
                action: AccountsAction::Login { identifier, code, .. },
            } => {
                assert_eq!(identifier, "steve@example.com");
                assert_eq!(code.as_deref(), Some("123456"));
            }
            _ => panic!("expected login"),
        }
    }

    #[tokio::test]
    async fn test_context_initializes_store() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.storage.path = Some(dir.path().to_path_buf());

        let ctx = AppContext::open(config).await.unwrap();
        assert!(dir.path().join(SqliteRecordStore::DB_FILE).exists());
        assert_eq!(ctx.settings.ram().await.unwrap().max, "4");
        assert!(ctx.lifecycle.accounts().await.unwrap().is_empty());
    }

    #[test]
    fn test_unknown_account_maps_to_not_found() {
        let err = to_core_error(AccountError::UnknownAccount("u1".to_string()).into());
        assert!(matches!(err, Error::NotFound(_)));
        assert!(err.recovery_suggestion().is_some());
    }
}
