use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticketview::{
    Config, HttpAssetFetcher, RenderOptions, Transcript, ViewRequest, display_transcript,
    inline_assets, parse_document, view,
};

#[derive(Parser)]
#[command(name = "ticketview", version, about = "Render stored ticket transcripts to HTML")]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a transcript from storage and render it
    #[command(name = "view")]
    View {
        /// Viewer link or query string carrying `id` and optionally `key`
        link: Option<String>,
        /// Bin id (overrides the link)
        #[arg(long)]
        id: Option<String>,
        /// Access key (overrides the link and config)
        #[arg(long)]
        key: Option<String>,
        /// Write HTML here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Render a local transcript JSON file without touching the network
    #[command(name = "render")]
    Render {
        /// Bare transcript or `{"record": ...}` envelope
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Embed remote images as data URLs before storing a transcript
    #[command(name = "inline")]
    Inline {
        file: PathBuf,
        /// Write JSON here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// View or modify config (~/.ticketview/config.toml)
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current config
    Show,
    /// Set a config value
    Set {
        /// Key to set (storage_host, master_key, max_asset_bytes)
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset config to defaults
    Reset,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::View {
            link,
            id,
            key,
            out,
        } => {
            let config = load_config();
            let request = link
                .as_deref()
                .map(ViewRequest::from_link)
                .unwrap_or_default()
                .with_overrides(id, key);
            let outcome = view(&request, &config, &RenderOptions::local());
            write_output(out.as_deref(), &outcome.html)?;
            if let Some(err) = outcome.error {
                eprintln!("{}", err.notice());
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Render { file, out } => {
            let transcript = read_transcript(&file)?;
            let html = display_transcript(&transcript, &RenderOptions::local());
            write_output(out.as_deref(), &html)?;
        }
        Commands::Inline { file, out } => {
            let mut transcript = read_transcript(&file)?;
            let config = load_config();
            let fetcher = HttpAssetFetcher::from_config(&config);
            let report = inline_assets(&mut transcript, &fetcher);
            let json = serde_json::to_string_pretty(&transcript)?;
            write_output(out.as_deref(), &json)?;
            if report.failed > 0 {
                eprintln!("{} asset(s) could not be inlined and remain remote URLs", report.failed);
            }
        }
        Commands::Config { action } => {
            handle_config(action)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// File config (or defaults if unreadable) with environment overrides applied
fn load_config() -> Config {
    let mut config = Config::load().unwrap_or_else(|err| {
        tracing::warn!("{err:#}; using default config");
        Config::default()
    });
    config.apply_env();
    config
}

fn read_transcript(path: &Path) -> Result<Transcript> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn write_output(out: Option<&Path>, content: &str) -> Result<()> {
    match out {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
            }
            fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = content.len(), "wrote output");
        }
        None => println!("{content}"),
    }
    Ok(())
}

fn handle_config(action: Option<ConfigAction>) -> Result<()> {
    match action {
        None | Some(ConfigAction::Show) => {
            let config = Config::load().unwrap_or_default();
            println!("storage_host = \"{}\"", config.storage_host);
            match &config.master_key {
                Some(_) => println!("master_key = <set>"),
                None => println!("master_key = <unset>"),
            }
            println!("max_asset_bytes = {}", config.max_asset_bytes);
        }
        Some(ConfigAction::Set { key, value }) => {
            let mut config = Config::load().unwrap_or_default();
            config.set(&key, &value)?;
            let path = config.save()?;
            println!("saved to {}", path.display());
        }
        Some(ConfigAction::Reset) => {
            let config = Config::default();
            let path = config.save()?;
            println!("reset to defaults at {}", path.display());
        }
    }
    Ok(())
}
