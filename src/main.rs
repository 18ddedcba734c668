// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use kosge_cms::app_config::{self, Config, TranslationProvider};
use kosge_cms::providers::create_provider;
use kosge_cms::{ContentDocument, ContentManager, Metadata, MetadataValue};

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Ollama,
    #[value(name = "openai")]
    OpenAI,
    #[value(name = "lmstudio")]
    LMStudio,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::LMStudio => TranslationProvider::LMStudio,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

fn level_filter(level: &app_config::LogLevel) -> LevelFilter {
    match level {
        app_config::LogLevel::Error => LevelFilter::Error,
        app_config::LogLevel::Warn => LevelFilter::Warn,
        app_config::LogLevel::Info => LevelFilter::Info,
        app_config::LogLevel::Debug => LevelFilter::Debug,
        app_config::LogLevel::Trace => LevelFilter::Trace,
    }
}

/// Body given inline or read from a Markdown file
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct BodyArgs {
    /// Body text
    #[arg(short, long)]
    body: Option<String>,

    /// Read the body from a file
    #[arg(short = 'f', long, value_name = "FILE")]
    file: Option<PathBuf>,
}

impl BodyArgs {
    fn read(&self) -> Result<String> {
        match (&self.body, &self.file) {
            (Some(body), _) => Ok(body.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read body from {}", path.display())),
            (None, None) => Err(anyhow!("Either --body or --file is required")),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(flatten)]
    Content(ContentCommand),

    /// Generate shell completions for kosge-cms
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Commands that work on the configured content store
#[derive(Subcommand, Debug)]
enum ContentCommand {
    /// Create or replace the canonical document of a section
    Create {
        /// Section id
        section: String,
        /// Document title
        #[arg(short, long)]
        title: String,
        #[command(flatten)]
        body: BodyArgs,
        /// Extra metadata as key=value (repeatable)
        #[arg(short, long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },

    /// Replace a document body and merge metadata
    Update {
        /// Section id
        section: String,
        #[command(flatten)]
        body: BodyArgs,
        /// Language variant to update (default: canonical)
        #[arg(short, long)]
        language: Option<String>,
        /// Metadata to merge as key=value (repeatable)
        #[arg(short, long = "meta", value_name = "KEY=VALUE")]
        meta: Vec<String>,
    },

    /// Show a document
    Get {
        /// Section id
        section: String,
        /// Language (default: canonical)
        #[arg(short, long)]
        language: Option<String>,
        /// Print the full document as JSON, including its rendered HTML
        #[arg(long)]
        json: bool,
        /// Print the body rendered as HTML
        #[arg(long, conflicts_with = "json")]
        html: bool,
    },

    /// List the sections stored in a language
    List {
        /// Language (default: canonical)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Delete one language variant of a section
    Delete {
        /// Section id
        section: String,
        /// Language (default: canonical)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Translate a section into one language
    Translate {
        /// Section id
        section: String,
        /// Target language code
        target_language: String,
    },

    /// Translate a section into every non-canonical language
    TranslateAll {
        /// Section id
        section: String,
    },

    /// Show the supported languages
    Languages {
        /// Print the client-side language configuration as JSON
        #[arg(long)]
        site_config: bool,
    },

    /// Show document counts and translation memory statistics
    Stats,

    /// Check that the translation provider is reachable
    Check,
}

/// kosge-cms - multilingual content store with translation memory
#[derive(Parser, Debug)]
#[command(name = "kosge-cms")]
#[command(version)]
#[command(about = "Multilingual content store with machine translation memory")]
#[command(long_about = "kosge-cms stores one Markdown document per section and language, and translates
the canonical language into the others through an AI provider. Unchanged text is
never sent to the provider twice.

EXAMPLES:
    kosge-cms create news -t 'Aktuelles' -f news.md     # Create canonical content
    kosge-cms update news -b 'Neuer Text' -m draft=true # Update and merge metadata
    kosge-cms translate news en                         # Translate into English
    kosge-cms translate-all news                        # Translate into every language
    kosge-cms get news -l tr                            # Show the Turkish variant
    kosge-cms get news --html                           # Render the body as HTML
    kosge-cms check -p openai                           # Test the provider connection
    kosge-cms list                                      # List canonical sections
    kosge-cms completions bash > kosge-cms.bash         # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    ollama    - Local Ollama server (default: llama3.2:3b)
    openai    - OpenAI API (requires API key)
    lmstudio  - LM Studio local server (OpenAI-compatible on http://localhost:1234/v1)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

/// Global options layered over the configuration file
#[derive(Args, Debug)]
struct ConfigOverrides {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: String,

    /// Database file (overrides the configuration)
    #[arg(short, long, env = "KOSGE_CMS_DATABASE", global = true)]
    database: Option<PathBuf>,

    /// Translation provider to use
    #[arg(short, long, value_enum, global = true)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use for translation
    #[arg(short = 'M', long, global = true)]
    model: Option<String>,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji and ANSI colour for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, colour) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                emoji,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the effective level is set once the config is read
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    // Completions need no configuration, so none is created for them
    let command = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "kosge-cms", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Content(command) => command,
    };

    let config = load_config(&cli.overrides)?;
    log::set_max_level(level_filter(&config.log_level));

    let provider = create_provider(&config.translation)?;
    let manager = ContentManager::new(&config, provider)?;

    if let Err(e) = run_command(&manager, command).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(overrides: &ConfigOverrides) -> Result<Config> {
    let config_path = Path::new(&overrides.config_path);
    if !config_path.exists() {
        warn!(
            "Config file not found at '{}', creating default config.",
            config_path.display()
        );
    }
    let mut config = Config::load_or_create(config_path)?;

    // Override config with CLI options if provided
    if let Some(provider) = &overrides.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &overrides.model {
        let provider_str = config.translation.provider.to_lowercase_string();
        if let Some(provider_config) = config
            .translation
            .available_providers
            .iter_mut()
            .find(|p| p.provider_type == provider_str)
        {
            provider_config.model = model.clone();
        }
    }

    if let Some(database) = &overrides.database {
        config.content.database_path = database.to_string_lossy().into_owned();
    }

    if let Some(log_level) = &overrides.log_level {
        config.log_level = log_level.clone().into();
    }

    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

async fn run_command(manager: &ContentManager, command: ContentCommand) -> Result<()> {
    match command {
        ContentCommand::Create {
            section,
            title,
            body,
            meta,
        } => {
            let document = manager
                .create_content(&section, &title, &body.read()?, parse_metadata(&meta)?)
                .await?;
            info!("Created '{}' in {}", document.section, document.language);
        }

        ContentCommand::Update {
            section,
            body,
            language,
            meta,
        } => {
            let updated = manager
                .update_content(&section, &body.read()?, parse_metadata(&meta)?, language.as_deref())
                .await?;
            if !updated {
                return Err(anyhow!("Section '{}' does not exist", section));
            }
            info!("Updated '{}'", section);
        }

        ContentCommand::Get {
            section,
            language,
            json,
            html,
        } => {
            let rendered = manager
                .render_content(&section, language.as_deref())
                .await?
                .ok_or_else(|| anyhow!("Section '{}' not found", section))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&rendered)?);
            } else if html {
                println!("{}", rendered.html);
            } else {
                print_document(&rendered.document);
            }
        }

        ContentCommand::List { language } => {
            for summary in manager.list_sections(language.as_deref()).await? {
                let title = summary
                    .metadata
                    .get("title")
                    .map(|value| value.to_string())
                    .unwrap_or_default();
                println!("{:<32} {}", summary.section, title);
            }
        }

        ContentCommand::Delete { section, language } => {
            if manager.delete_content(&section, language.as_deref()).await? {
                info!("Deleted '{}'", section);
            } else {
                warn!("Nothing to delete for '{}'", section);
            }
        }

        ContentCommand::Translate {
            section,
            target_language,
        } => {
            let document = manager.translate_content(&section, &target_language).await?;
            info!("Stored '{}' in {}", document.section, document.language);
        }

        ContentCommand::TranslateAll { section } => {
            let outcomes = manager.translate_all(&section).await?;
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(_) => info!("✅ {}", outcome.language),
                    Err(e) => error!("{}: {}", outcome.language, e),
                }
            }
            if failed > 0 {
                return Err(anyhow!("{} of {} translations failed", failed, outcomes.len()));
            }
        }

        ContentCommand::Languages { site_config } => {
            if site_config {
                println!("{}", serde_json::to_string_pretty(&manager.language_config())?);
            } else {
                for language in manager.languages() {
                    println!(
                        "{} {:<4} {:<12} {}{}",
                        language.flag.as_deref().unwrap_or("  "),
                        language.code,
                        language.name,
                        language.native_name,
                        if language.canonical { " (canonical)" } else { "" }
                    );
                }
            }
        }

        ContentCommand::Stats => {
            println!("{}", serde_json::to_string_pretty(&manager.stats().await?)?);
        }

        ContentCommand::Check => {
            manager.check_provider().await?;
            println!("{} is reachable", manager.provider_name());
        }
    }
    Ok(())
}

fn print_document(document: &ContentDocument) {
    println!("# {}", document.title().unwrap_or(document.section.as_str()));
    for (key, value) in &document.metadata {
        println!("{}: {}", key, value);
    }
    println!();
    println!("{}", document.body);
}

/// Parse `key=value` pairs; booleans and RFC 3339 timestamps keep their kind
fn parse_metadata(pairs: &[String]) -> Result<Metadata> {
    let mut metadata = Metadata::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("Metadata must be KEY=VALUE, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow!("Metadata key must not be empty in '{}'", pair));
        }

        let value = match value {
            "true" => MetadataValue::Flag(true),
            "false" => MetadataValue::Flag(false),
            other => match DateTime::parse_from_rfc3339(other) {
                Ok(ts) => MetadataValue::Timestamp(ts.with_timezone(&Utc)),
                Err(_) => MetadataValue::Text(other.to_string()),
            },
        };
        metadata.insert(key.to_string(), value);
    }
    Ok(metadata)
}
