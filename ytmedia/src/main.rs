use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytmedia::{AudioQuality, Capabilities, DownloadRequest, Downloader, ResolutionTarget, Settings, progress};

#[derive(Parser)]
#[command(name = "ytmedia", version, about = "Download best-quality MP4/MP3 from video URLs")]
struct Cli {
    /// Show full yt-dlp output instead of the condensed progress line
    #[arg(long, global = true)]
    debug: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(flatten)]
    settings: Settings,

    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand)]
enum Command {
    /// Download a video as MP4
    Mp4 {
        url: String,
        #[arg(short, long, env = "YTMEDIA_OUTPUT_DIR", default_value = "downloads")]
        output: PathBuf,
        /// Maximum height such as 1080, or "best"
        #[arg(short, long, default_value = "best")]
        resolution: ResolutionTarget,
        /// Download the video stream only
        #[arg(long)]
        no_audio: bool,
        /// Follow the URL into its playlist
        #[arg(long)]
        playlist: bool
    },
    /// Download audio as MP3
    Mp3 {
        url: String,
        #[arg(short, long, env = "YTMEDIA_OUTPUT_DIR", default_value = "downloads")]
        output: PathBuf,
        /// Bitrate in kbps
        #[arg(short, long, default_value = "320")]
        quality: AudioQuality
    },
    /// Download every video of a playlist as MP4
    Playlist {
        url: String,
        #[arg(short, long, env = "YTMEDIA_OUTPUT_DIR", default_value = "downloads")]
        output: PathBuf,
        #[arg(short, long, default_value = "best")]
        resolution: ResolutionTarget
    },
    /// Show metadata without downloading
    Info { url: String },
    /// Check that yt-dlp, ffmpeg and a JS runtime are available
    Doctor
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        tracing_subscriber::EnvFilter::new("ytmedia=debug,yt_dlp=debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "ytmedia=info,yt_dlp=warn".into())
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nCancelled.");
            ExitCode::SUCCESS
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let capabilities = Capabilities::new(cli.settings.overrides());
    let (tx, rx) = mpsc::unbounded_channel();
    let renderer = progress::spawn_renderer(rx);
    let downloader = Downloader::new(cli.settings.client(), &capabilities).with_progress(tx);

    let outcome = execute(&downloader, cli.command, cli.debug, cli.json).await;
    drop(downloader);
    let _ = renderer.await;
    outcome
}

async fn execute(downloader: &Downloader<'_>, command: Command, debug: bool, json: bool) -> anyhow::Result<()> {
    match command {
        Command::Mp4 {
            url,
            output,
            resolution,
            no_audio,
            playlist
        } => {
            let request = DownloadRequest::new(url)
                .output_dir(output)
                .resolution(resolution)
                .include_audio(!no_audio)
                .allow_playlist(playlist)
                .debug(debug);
            let result = downloader.download_video(&request).await?;
            if json {
                return print_json(&result);
            }
            println!("Downloaded {result}");
            for advisory in &result.advisories {
                println!("  note: {advisory}");
            }
        }
        Command::Mp3 { url, output, quality } => {
            let result = downloader.download_audio(&url, &output, &quality, debug).await?;
            if json {
                return print_json(&result);
            }
            println!("Downloaded {result}");
        }
        Command::Playlist { url, output, resolution } => {
            let result = downloader.download_playlist(&url, &output, resolution, debug).await?;
            if json {
                return print_json(&result);
            }
            for download in &result.downloads {
                println!("  ok     {download}");
            }
            for marker in &result.failed {
                println!("  failed entry {marker}");
            }
            println!("{result}");
        }
        Command::Info { url } => {
            let record = downloader.get_metadata(&url).await?;
            if json {
                return print_json(&record);
            }
            println!("{record}");
        }
        Command::Doctor => return doctor(downloader, json).await
    }
    Ok(())
}

#[derive(Serialize)]
struct DoctorReport {
    ytdlp_version: Option<String>,
    ffmpeg: Option<PathBuf>,
    js_runtimes: Vec<ytmedia::JsRuntime>,
    missing: Vec<ytmedia::Dependency>
}

async fn doctor(downloader: &Downloader<'_>, json: bool) -> anyhow::Result<()> {
    let capabilities = downloader.capabilities();
    let ytdlp_version = match downloader.engine_version().await {
        Ok(version) => Some(version),
        Err(e) => {
            tracing::debug!("yt-dlp version check failed: {e}");
            None
        }
    };

    let report = DoctorReport {
        ytdlp_version,
        ffmpeg: capabilities.ffmpeg().map(PathBuf::from),
        js_runtimes: capabilities.js_runtimes().to_vec(),
        missing: capabilities.missing_dependencies()
    };

    if json {
        return print_json(&report);
    }

    match report.ytdlp_version {
        Some(ref version) => println!("yt-dlp     : {version}"),
        None => println!("yt-dlp     : not found")
    }
    match report.ffmpeg {
        Some(ref path) => println!("ffmpeg     : {}", path.display()),
        None => println!("ffmpeg     : not found (MP3 and merged HD downloads unavailable)")
    }
    if report.js_runtimes.is_empty() {
        println!("JS runtime : not found");
    }
    for runtime in &report.js_runtimes {
        println!("JS runtime : {} ({})", runtime.name, runtime.executable.display());
    }

    if report.missing.is_empty() {
        println!("\nAll dependencies are available.");
    } else {
        println!();
        for dependency in &report.missing {
            println!("{dependency} is missing. {}", dependency.install_hint());
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("failed to serialize result")?;
    println!("{text}");
    Ok(())
}
