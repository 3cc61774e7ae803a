// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::PathBuf;

use cadtranslator::app_config::{self, Config, TranslationProvider};
use cadtranslator::app_controller::Controller;
use cadtranslator::converter::DrawingFormat;
use cadtranslator::translation::GlossaryIndex;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    Deepl,
    DeeplFree,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::Deepl => TranslationProvider::DeepL,
            CliTranslationProvider::DeeplFree => TranslationProvider::DeepLFree,
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate drawings (default command)
    Translate(TranslateArgs),

    /// List the text found in a drawing
    Extract {
        /// DWG or DXF drawing
        #[arg(value_name = "DRAWING")]
        input_path: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: PathBuf,
    },

    /// Check a glossary file for a language pair
    Glossary {
        /// Delimited glossary file with a language header row
        #[arg(value_name = "GLOSSARY")]
        path: PathBuf,

        /// Source language column (defaults to the config)
        #[arg(short, long)]
        source_language: Option<String>,

        /// Target language column (defaults to the config)
        #[arg(short, long)]
        target_language: Option<String>,

        /// Configuration file path
        #[arg(short, long, default_value = "conf.json")]
        config_path: PathBuf,
    },

    /// Generate shell completions for cadtranslator
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
struct TranslateArgs {
    /// Input drawing or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Source language code (e.g. 'en', 'it' or 'auto')
    #[arg(short, long)]
    source_language: Option<String>,

    /// Target language code (e.g. 'de', 'en-gb')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Glossary file (CSV with language code headers)
    #[arg(short, long)]
    glossary: Option<PathBuf>,

    /// Output directory (defaults to 'output' next to the input)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// DeepL API key
    #[arg(long, env = "DEEPL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Write DXF output instead of DWG
    #[arg(long)]
    dxf: bool,
}

/// cadtranslator - glossary-aware translation of CAD drawing text
#[derive(Parser, Debug)]
#[command(name = "cadtranslator")]
#[command(version)]
#[command(about = "Translate the text of DWG/DXF drawings with DeepL and a terminology glossary")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "cadtranslator converts drawings to DXF, translates every text, dimension,
table cell, multileader and block attribute, and converts the result back.

EXAMPLES:
    cadtranslator plan.dwg                           # Translate using default config
    cadtranslator -f plan.dwg                        # Force overwrite existing output
    cadtranslator -s it -t de -g terms.csv drawings/ # Translate a folder with a glossary
    cadtranslator --dxf -o out/ plan.dxf             # Write DXF output into out/
    cadtranslator extract --json plan.dwg            # List the text of a drawing
    cadtranslator glossary -s it -t de terms.csv     # Check a glossary file
    cadtranslator completions bash > cadtranslator.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. The API key can also be given in DEEPL_API_KEY.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    translate: TranslateArgs,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", color, now, tag, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info until the config or the command line says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "cadtranslator", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(args).await,
        Some(Commands::Extract {
            input_path,
            json,
            config_path,
        }) => run_extract(input_path, json, config_path).await,
        Some(Commands::Glossary {
            path,
            source_language,
            target_language,
            config_path,
        }) => run_glossary_check(path, source_language, target_language, config_path),
        None => run_translate(cli.translate).await,
    }
}

/// Load the config file and apply command line overrides
fn load_config(options: &TranslateArgs) -> Result<Config> {
    let mut config = Config::load_or_create(&options.config_path)?;

    if let Some(provider) = &options.provider {
        config.translation.provider = provider.clone().into();
    }
    if let Some(source_lang) = &options.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &options.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(glossary) = &options.glossary {
        config.glossary_path = Some(glossary.clone());
    }
    if let Some(output_dir) = &options.output_dir {
        config.output_dir = Some(output_dir.clone());
    }
    if let Some(api_key) = options.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        config.translation.api_key = api_key.clone();
    }
    if options.dxf {
        config.converter.output_format = DrawingFormat::Dxf;
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let input_path = options
        .input_path
        .clone()
        .ok_or_else(|| anyhow!("INPUT_PATH is required when no subcommand is specified"))?;

    let config = load_config(&options)?;
    log::set_max_level(config.log_level.to_level_filter());

    config.validate().context("Configuration validation failed")?;

    let controller = Controller::with_config(config)?;
    let summary = controller.run(&input_path, options.force_overwrite).await?;

    if !summary.is_success() {
        return Err(anyhow!("{} drawing(s) failed, see the issues log", summary.failed.len()));
    }
    Ok(())
}

async fn run_extract(input_path: PathBuf, json: bool, config_path: PathBuf) -> Result<()> {
    let config = Config::load_or_create(&config_path)?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(Config {
        glossary_path: None,
        ..config
    })?;
    let items = controller.extract(&input_path).await?;

    let mut stdout = std::io::stdout();
    if json {
        let output = serde_json::to_string_pretty(&items).context("Failed to serialize text items")?;
        writeln!(stdout, "{}", output)?;
    } else {
        for (index, item) in items.iter().enumerate() {
            writeln!(
                stdout,
                "{:>4}  {:<20} {:<12} {}",
                index + 1,
                item.origin(),
                item.handle.kind.to_string(),
                item.text.replace('\n', "\\n")
            )?;
        }
    }
    info!("{} text item(s) in {}", items.len(), input_path.display());
    Ok(())
}

fn run_glossary_check(
    path: PathBuf,
    source_language: Option<String>,
    target_language: Option<String>,
    config_path: PathBuf,
) -> Result<()> {
    let config = Config::load_or_create(&config_path)?;
    let source = source_language.unwrap_or(config.source_language);
    let target = target_language.unwrap_or(config.target_language);
    if cadtranslator::language_utils::is_auto_detect(&source) {
        return Err(anyhow!("Checking a glossary needs an explicit source language (-s)"));
    }

    let glossary = GlossaryIndex::from_csv_path(&path, &source, &target)
        .with_context(|| format!("Invalid glossary {:?}", path))?;

    let mut stdout = std::io::stdout();
    writeln!(
        stdout,
        "{}: {} term(s) for {} -> {}",
        path.display(),
        glossary.len(),
        source,
        target
    )?;
    for term in glossary.terms().iter().take(10) {
        writeln!(stdout, "  {} -> {}", term.entry.source_term, term.entry.target_term)?;
    }
    if glossary.len() > 10 {
        writeln!(stdout, "  ...")?;
    }
    Ok(())
}
