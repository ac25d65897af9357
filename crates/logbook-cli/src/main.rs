use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use logbook_core::config::{load_config, save_config, KeyStoreKind, LogbookConfig};
use logbook_core::creatures::{
    AddCreature, AddCreatureIntent, AddCreatureProcessor, AllCreatures, AllCreaturesIntent,
    AllCreaturesProcessor, CreatureRepository, JsonFileCreatureRepository,
};
use logbook_core::mvi::Store;
use logbook_core::paths::{config_path, creatures_path, data_dir, theme_prefs_path};
use logbook_core::theme::{Platform, ThemeOption, ThemeSettings};
use logbook_core::Journal;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "logbook")]
#[command(about = "Encrypted captain's log", long_about = None)]
struct Cli {
    /// Data directory (defaults to LOGBOOK_DATA_DIR or the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Where the master key is kept; overrides config.json
    #[arg(long, global = true, value_enum)]
    keystore: Option<KeystoreArg>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeystoreArg {
    Keyring,
    File,
}

impl From<KeystoreArg> for KeyStoreKind {
    fn from(arg: KeystoreArg) -> Self {
        match arg {
            KeystoreArg::Keyring => KeyStoreKind::Keyring,
            KeystoreArg::File => KeyStoreKind::File,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Write config.json, recording the keystore to use
    Init,

    /// Write an entry
    Put {
        stardate: String,

        /// Entry text; read from stdin when omitted
        #[arg(short, long)]
        body: Option<String>,

        /// Stardate the entry was previously saved under
        #[arg(long, default_value = "")]
        replace: String,
    },

    /// Decrypt and print an entry
    Get {
        stardate: String,

        /// Log key; prompted for when one is set and this is omitted
        #[arg(long)]
        log_key: Option<String>,
    },

    /// Delete an entry
    Delete { stardate: String },

    /// List stored stardates
    List,

    /// Manage the log key that guards reading entries
    LogKey {
        #[command(subcommand)]
        action: LogKeyCommand,
    },

    /// Show or change the theme
    Theme {
        /// Platform has no system-wide dark theme
        #[arg(long)]
        no_system_theme: bool,

        #[command(subcommand)]
        action: ThemeCommand,
    },

    /// Manage the creature roster
    Creatures {
        #[command(subcommand)]
        action: CreaturesCommand,
    },
}

#[derive(Subcommand)]
enum LogKeyCommand {
    /// Set or change the log key
    Set {
        #[arg(long)]
        current: Option<String>,
        #[arg(long)]
        new: String,
    },
    /// Remove the log key
    Clear {
        #[arg(long)]
        current: Option<String>,
    },
    Status,
}

#[derive(Subcommand)]
enum ThemeCommand {
    Show,
    Set {
        #[arg(value_enum)]
        option: ThemeArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
    System,
}

impl From<ThemeArg> for ThemeOption {
    fn from(arg: ThemeArg) -> Self {
        match arg {
            ThemeArg::Light => ThemeOption::Light,
            ThemeArg::Dark => ThemeOption::Dark,
            ThemeArg::System => ThemeOption::System,
        }
    }
}

#[derive(Subcommand)]
enum CreaturesCommand {
    List,
    /// Create a creature from picker indices (0 = unselected, 1-3 = low to high)
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "0")]
        avatar: u32,
        #[arg(long, default_value = "0")]
        intelligence: usize,
        #[arg(long, default_value = "0")]
        strength: usize,
        #[arg(long, default_value = "0")]
        endurance: usize,
    },
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data = match cli.data_dir {
        Some(dir) => dir,
        None => data_dir()?,
    };
    debug!(data_dir = %data.display(), "using data directory");

    match cli.command {
        Commands::Init => {
            let path = config_path(&data);
            if path.exists() {
                return Err(anyhow!("config already exists at {}", path.display()));
            }
            let mut config = LogbookConfig::default();
            if let Some(kind) = cli.keystore {
                config.keystore = kind.into();
            }
            save_config(&path, &config)?;
            println!("Config written: {} (keystore {:?})", path.display(), config.keystore);
            Ok(())
        }
        Commands::Put {
            stardate,
            body,
            replace,
        } => {
            let body = match body {
                Some(body) => body,
                None => {
                    let mut buf = String::new();
                    std::io::stdin()
                        .read_to_string(&mut buf)
                        .context("reading entry from stdin")?;
                    buf
                }
            };
            let journal = open_journal(&data, cli.keystore)?;
            let existed = journal.has_entry(&stardate);
            if journal.save_entry(&stardate, &body, &replace) {
                let verb = if existed { "replaced" } else { "saved" };
                println!("{verb} {stardate}");
            }
            finish(&journal)
        }
        Commands::Get { stardate, log_key } => {
            let journal = open_journal(&data, cli.keystore)?;
            let attempt = match log_key {
                Some(key) => Some(key),
                None if journal.log_key_set() => Some(rpassword::prompt_password("Log key: ")?),
                None => None,
            };
            if let Some(body) = journal.open_entry(&stardate, attempt.as_deref()) {
                finish(&journal)?;
                print!("{body}");
                return Ok(());
            }
            finish(&journal)
        }
        Commands::Delete { stardate } => {
            let journal = open_journal(&data, cli.keystore)?;
            journal.delete_entry(&stardate);
            finish(&journal)
        }
        Commands::List => {
            let journal = open_journal(&data, cli.keystore)?;
            for stardate in journal.stardates() {
                println!("{stardate}");
            }
            finish(&journal)
        }
        Commands::LogKey { action } => {
            let journal = open_journal(&data, cli.keystore)?;
            match action {
                LogKeyCommand::Set { current, new } => {
                    journal.change_log_key(current.as_deref(), Some(&new));
                }
                LogKeyCommand::Clear { current } => {
                    journal.change_log_key(current.as_deref(), None);
                }
                LogKeyCommand::Status => {
                    let status = if !journal.log_key_available() {
                        "unavailable"
                    } else if journal.log_key_set() {
                        "set"
                    } else {
                        "not set"
                    };
                    println!("log key {status}");
                }
            }
            finish(&journal)
        }
        Commands::Theme {
            no_system_theme,
            action,
        } => {
            let platform = Platform {
                follows_system_theme: !no_system_theme,
            };
            let mut settings = ThemeSettings::load(theme_prefs_path(&data))?;
            match action {
                ThemeCommand::Show => {
                    println!(
                        "{:?} ({:?})",
                        settings.selected_option(),
                        settings.night_mode(platform)
                    );
                }
                ThemeCommand::Set { option } => {
                    let night_mode = settings.switch_to(option.into(), platform)?;
                    println!("{:?} ({night_mode:?})", settings.selected_option());
                }
            }
            Ok(())
        }
        Commands::Creatures { action } => {
            let repository: Arc<dyn CreatureRepository> =
                Arc::new(JsonFileCreatureRepository::new(creatures_path(&data)));
            creatures_command(action, repository).await
        }
    }
}

fn open_journal(data: &std::path::Path, keystore: Option<KeystoreArg>) -> Result<Journal> {
    let mut config = load_config(&config_path(data))?;
    if let Some(kind) = keystore {
        config.keystore = kind.into();
    }
    let keys = config.build_keystore(data);
    Ok(Journal::open(data, &config, keys)?)
}

/// Show the pending notice. Failure notices end the command with an error.
fn finish(journal: &Journal) -> Result<()> {
    match journal.notices().acknowledge() {
        Some(posted) if posted.notice.is_failure() => Err(anyhow!("{}", posted.notice)),
        Some(posted) => {
            eprintln!("{}", posted.notice);
            Ok(())
        }
        None => Ok(()),
    }
}

async fn creatures_command(
    action: CreaturesCommand,
    repository: Arc<dyn CreatureRepository>,
) -> Result<()> {
    match action {
        CreaturesCommand::List => {
            let mut store =
                Store::<AllCreatures>::new(Arc::new(AllCreaturesProcessor::new(repository)));
            store.dispatch(AllCreaturesIntent::LoadAll).await;
            let state = store.state();
            if let Some(error) = &state.error {
                return Err(anyhow!("unable to load creatures: {error}"));
            }
            for creature in &state.creatures {
                println!("{}\t{} HP", creature.name, creature.hit_points);
            }
            Ok(())
        }
        CreaturesCommand::Add {
            name,
            avatar,
            intelligence,
            strength,
            endurance,
        } => {
            let mut store =
                Store::<AddCreature>::new(Arc::new(AddCreatureProcessor::new(repository)));
            store
                .dispatch(AddCreatureIntent::Save {
                    drawable: avatar,
                    name: name.clone(),
                    intelligence_index: intelligence,
                    strength_index: strength,
                    endurance_index: endurance,
                })
                .await;
            let state = store.state();
            if let Some(error) = &state.error {
                return Err(anyhow!("unable to save creature: {error}"));
            }
            println!("saved {name}");
            Ok(())
        }
        CreaturesCommand::Clear => {
            let mut store =
                Store::<AllCreatures>::new(Arc::new(AllCreaturesProcessor::new(repository)));
            store.dispatch(AllCreaturesIntent::ClearAll).await;
            if let Some(error) = &store.state().error {
                return Err(anyhow!("unable to clear creatures: {error}"));
            }
            println!("cleared");
            Ok(())
        }
    }
}
