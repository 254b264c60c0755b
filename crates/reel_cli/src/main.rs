use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use reel_client::artifact_name;
use reel_client::prelude::*;
use reel_core::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(name = "reel")]
#[command(about = "Run media jobs against a reel backend and follow their progress")]
#[command(version)]
struct Cli {
    /// Backend base URL, used when no backend_url is saved in the settings
    #[arg(short, long, global = true)]
    backend: Option<String>,

    /// Settings file (defaults to <config dir>/reel/settings.json)
    #[arg(long, global = true, env = "REEL_SETTINGS")]
    settings: Option<PathBuf>,

    /// Seconds without data before a job is given up, 0 to wait forever
    #[arg(long, global = true)]
    idle_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show title and available resolutions for a video
    Info {
        /// Video URL
        url: String,
    },

    /// Extract screenshots at a fixed interval
    Screenshots(JobArgs),

    /// Download the audio track
    Audio(JobArgs),

    /// Download the video
    Video(JobArgs),

    /// Fetch an artifact produced by a job
    Download {
        /// File name, path or URL from a finished job
        reference: String,

        /// Destination file (defaults to the artifact's name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check whether the backend is reachable
    Health,

    /// Inspect or change saved settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(clap::Args)]
struct JobArgs {
    /// Video URL (defaults to the last one used)
    url: Option<String>,

    /// Job parameter, e.g. `-s bitrate_label="192 kbps"`. Saved for later runs.
    #[arg(short = 's', long = "set", value_parser = parse_assignment)]
    params: Vec<(Field, String)>,

    /// Also download the finished artifact into this directory
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print every saved value
    List,
    /// Save a value
    Set { key: String, value: String },
    /// Forget a value
    Unset { key: String },
}

fn parse_assignment(s: &str) -> Result<(Field, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    Ok((key.trim().parse()?, value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let settings = match cli.settings.clone().or_else(SettingsStore::default_path) {
        Some(path) => SettingsStore::open(path).await,
        None => SettingsStore::in_memory(),
    };

    let command = match cli.command {
        Commands::Settings { action } => return settings_command(settings, action).await,
        command => command,
    };

    let mut config = ClientConfig::resolve(ConfigSources::gather(&settings, cli.backend.clone()))?;
    if let Some(secs) = cli.idle_timeout {
        config = config.with_idle_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    debug!(backend = config.backend_url(), source = ?config.source(), "Resolved backend");

    let session = Arc::new(Session::new(config, settings)?);

    match command {
        Commands::Info { url } => info_command(&session, &url).await,
        Commands::Screenshots(args) => job_command(session, JobKind::Screenshots, args).await,
        Commands::Audio(args) => job_command(session, JobKind::Audio, args).await,
        Commands::Video(args) => job_command(session, JobKind::Video, args).await,
        Commands::Download { reference, output } => {
            download(session.client(), &reference, output.as_deref()).await
        }
        Commands::Health => health_command(&session).await,
        Commands::Settings { .. } => Ok(()),
    }
}

async fn info_command(session: &Session, url: &str) -> Result<()> {
    session.fetch_video_info(url).await;
    let panel = session.info_panel();
    if let Some(error) = panel.error {
        bail!(error);
    }

    let info = panel.info.unwrap_or_default();
    println!("Title:     {}", info.title.as_deref().unwrap_or("-"));
    if let Some(thumbnail) = &info.thumbnail {
        println!("Thumbnail: {thumbnail}");
    }
    println!("Video:     {}", info.video_resolutions.join(", "));
    println!("Images:    {}", info.image_resolutions.join(", "));
    Ok(())
}

async fn job_command(session: Arc<Session>, kind: JobKind, args: JobArgs) -> Result<()> {
    if let Some(url) = args.url {
        session.set_field(Field::Url, FieldValue::text(url)).await;
    }
    for (field, value) in args.params {
        session.set_field(field, FieldValue::text(value)).await;
    }

    let printer = tokio::spawn(print_progress(session.subscribe(kind)));
    let mut job = tokio::spawn({
        let session = session.clone();
        async move { session.submit(kind).await }
    });

    let outcome = tokio::select! {
        finished = &mut job => finished?,
        _ = tokio::signal::ctrl_c() => {
            session.cancel(kind);
            job.await?
        }
    };
    printer.abort();

    match outcome? {
        JobOutcome::Succeeded { download_link } => {
            let panel = session.panel(kind);
            if let Some(source) = &panel.player_source {
                println!("Media:    {source}");
            }
            let Some(link) = download_link else {
                println!("Done");
                return Ok(());
            };
            println!("Download: {link}");

            if let Some(dir) = args.output {
                let name = artifact_name(&link).unwrap_or("download.bin");
                download(session.client(), &link, Some(&dir.join(name))).await?;
            }
            Ok(())
        }
        JobOutcome::Failed(reason) => Err(anyhow!(reason)),
        JobOutcome::Cancelled => {
            eprintln!("Cancelled");
            Ok(())
        }
    }
}

async fn print_progress(mut panel: tokio::sync::watch::Receiver<JobPanel>) {
    let mut status = None;
    let mut shown = 0;

    while panel.changed().await.is_ok() {
        let current = panel.borrow_and_update().clone();

        if current.status != status {
            if let Some(message) = &current.status {
                eprintln!("[{:>3.0}%] {message}", current.progress);
            }
            status = current.status;
        }

        for image in current.gallery.iter().skip(shown) {
            eprintln!("        + {image}");
        }
        shown = current.gallery.len();

        if current.phase.is_finished() {
            break;
        }
    }
}

async fn download(client: &ReelClient, reference: &str, output: Option<&Path>) -> Result<()> {
    let dest = match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(
            artifact_name(reference).ok_or_else(|| anyhow!("'{reference}' names no file"))?,
        ),
    };

    let written = client
        .download_to(reference, &dest)
        .await
        .with_context(|| format!("Failed to download {reference}"))?;
    println!("Saved {} ({written} bytes)", dest.display());
    Ok(())
}

async fn health_command(session: &Session) -> Result<()> {
    let health = session.client().health().await.with_context(|| {
        format!("Backend at {} is not reachable", session.client().base_url())
    })?;
    println!(
        "{} is {} ({})",
        session.client().base_url(),
        health.status,
        health.timestamp
    );
    Ok(())
}

async fn settings_command(mut settings: SettingsStore, action: SettingsAction) -> Result<()> {
    let Some(path) = settings.path().map(Path::to_path_buf) else {
        bail!("No settings location available, pass --settings");
    };

    match action {
        SettingsAction::List => {
            println!("# {}", path.display());
            for (key, value) in settings.entries() {
                println!("{key} = {value}");
            }
        }
        SettingsAction::Set { key, value } => {
            let value = match key.parse::<Field>() {
                Ok(field) => FieldValue::decode(field, &value).encode(),
                Err(_) if key == BACKEND_URL_KEY => {
                    ClientConfig::for_backend(&value)?;
                    value
                }
                Err(e) => bail!(e),
            };
            settings.set(&key, value).await;
        }
        SettingsAction::Unset { key } => settings.remove(&key).await,
    }
    Ok(())
}
