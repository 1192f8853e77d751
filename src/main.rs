use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use torah_dl::config::{self, Config};
use torah_dl::{DownloadError, ExtractError, Extraction, HttpClient, Registry};
use tracing::debug;

// Exit statuses past the ones ErrorKind assigns
const DOWNLOAD_FAILED: u8 = 6;
const OTHER_FAILURE: u8 = 7;

#[derive(Parser)]
#[command(name = "torah-dl", version, about = "SoferAI's Torah Downloader")]
struct Cli {
    /// Config file to use instead of ~/.config/torah-dl/config.yml
    #[arg(global = true, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the download link and metadata for a lecture page
    Extract {
        url: String,
        /// Print only the download URL
        #[arg(long)]
        url_only: bool,
    },
    /// Download the media behind a lecture page
    Download {
        url: String,
        /// Defaults to the configured output directory
        output: Option<PathBuf>,
    },
    /// List supported sites
    Sites,
}

/// Initialize tracing according to RUST_LOG and TORAH_DL_LOG_FORMAT (or the
/// config file's `log_format`). Logs go to stderr so stdout stays pipeable.
fn init_tracing(config: &Config) {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    let builder = tracing_subscriber::registry().with(filter);

    let format = std::env::var("TORAH_DL_LOG_FORMAT").unwrap_or_else(|_| config.log_format.clone());
    if format == "json" {
        let _ = builder.with(fmt_layer.json().flatten_event(true)).try_init();
    } else {
        let _ = builder.with(fmt_layer.compact()).try_init();
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let result = match path {
        Some(path) => config::load_config_from(path),
        None => config::get_config(),
    };
    result.map_err(|e| anyhow!("Failed to load config: {}", e))
}

fn print_extraction(extraction: &Extraction, url_only: bool) {
    if url_only {
        println!("{}", extraction.download_url);
        return;
    }
    if let Some(title) = &extraction.title {
        println!("title: {}", title);
    }
    println!("download_url: {}", extraction.download_url);
    if let Some(file_format) = &extraction.file_format {
        println!("file_format: {}", file_format);
    }
}

fn default_output(config: &Config, extraction: &Extraction) -> PathBuf {
    let file_name = extraction
        .file_name
        .clone()
        .or_else(|| extraction.title.as_ref().map(|t| format!("{}.mp3", t)))
        .unwrap_or_else(|| "download.mp3".to_string());
    Path::new(&config.output_dir).join(file_name.replace(['/', '\\'], "_"))
}

async fn run(command: Commands, config: &Config) -> Result<()> {
    let client = HttpClient::from_config(config);
    let registry = Registry::new(client.clone());

    match command {
        Commands::Extract { url, url_only } => {
            let extraction = registry.resolve(&url).await?;
            print_extraction(&extraction, url_only);
        }
        Commands::Download { url, output } => {
            let extraction = registry.resolve(&url).await?;
            let output = output.unwrap_or_else(|| default_output(config, &extraction));
            debug!("Saving {} to {}", extraction.download_url, output.display());

            let written = torah_dl::download(&client, &extraction.download_url, &output)
                .await
                .with_context(|| format!("Failed to download {}", extraction.download_url))?;
            println!("Saved {} ({} bytes)", output.display(), written);
        }
        Commands::Sites => {
            for site in registry.supported_sites() {
                println!("{}\t{}", site.name, site.homepage);
            }
        }
    }

    Ok(())
}

fn exit_status(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<ExtractError>() {
        e.kind().exit_code()
    } else if err.downcast_ref::<DownloadError>().is_some() {
        DOWNLOAD_FAILED
    } else {
        OTHER_FAILURE
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(OTHER_FAILURE);
        }
    };
    init_tracing(&config);

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}
