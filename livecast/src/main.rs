mod controls;
mod publish;

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use livecast_core::{
    logging,
    sources::{annexb::read_annexb_file, AdtsStream},
    BroadcastSession, Config, SessionDelegate, SessionState, VideoFilter,
};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use controls::{button_label, press_connect, ConnectAction};
use publish::Media;

#[derive(Parser, Debug)]
#[command(name = "livecast")]
#[command(about = "Live broadcast publisher", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish an H.264 Annex-B file, optionally with ADTS AAC audio
    Publish(PublishArgs),
}

#[derive(clap::Args, Debug)]
struct PublishArgs {
    /// RTMP server url, e.g. rtmp://host/live
    #[arg(long, env = "LIVECAST_URL")]
    url: String,

    /// Stream key; when empty the last url segment is the stream name
    #[arg(long, env = "LIVECAST_STREAM_KEY", default_value = "")]
    key: String,

    /// H.264 Annex-B elementary stream
    #[arg(long)]
    video: PathBuf,

    /// AAC ADTS elementary stream
    #[arg(long)]
    audio: Option<PathBuf>,

    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Video bitrate in bits per second
    #[arg(long)]
    bitrate: Option<u32>,

    /// YAML or TOML configuration file
    #[arg(long, env = "LIVECAST_CONFIG")]
    config: Option<String>,

    /// Video filter name, e.g. sepia or com.videocore.filters.sepia
    #[arg(long)]
    filter: Option<VideoFilter>,

    /// Enable adaptive bitrate
    #[arg(long)]
    adaptive: bool,
}

impl PublishArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(fps) = self.fps {
            config.video.fps = fps;
        }
        if let Some(width) = self.width {
            config.video.width = width;
        }
        if let Some(height) = self.height {
            config.video.height = height;
        }
        if let Some(bitrate) = self.bitrate {
            config.video.bitrate = bitrate;
        }
        if let Some(filter) = self.filter {
            config.video.filter = filter;
        }
        if self.adaptive {
            config.adaptive.enabled = true;
        }
    }
}

/// Prints the connect button caption and forwards states to the main loop.
struct StatusPrinter {
    states: mpsc::UnboundedSender<SessionState>,
}

impl SessionDelegate for StatusPrinter {
    fn connection_status_changed(&self, state: SessionState) {
        println!(
            "{}",
            serde_json::json!({ "state": state, "button": button_label(state) })
        );
        let _ = self.states.send(state);
    }

    fn detected_throughput(&self, bytes_per_second: u64) {
        info!("detected throughput {bytes_per_second} B/s");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let Command::Publish(args) = Cli::parse().command;

    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    args.apply(&mut config);
    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            eprintln!("Config validation error: {problem}");
        }
        bail!("configuration validation failed with {} error(s)", problems.len());
    }

    let _log_guard = logging::init_logging(&config.logging)?;
    info!("livecast starting");

    let media = Media {
        video: read_annexb_file(&args.video)
            .await
            .with_context(|| format!("reading {}", args.video.display()))?,
        audio: match &args.audio {
            Some(path) => Some(
                AdtsStream::read_file(path)
                    .await
                    .with_context(|| format!("reading {}", path.display()))?,
            ),
            None => None,
        },
    };
    if media.video.is_empty() {
        bail!("{} holds no H.264 access units", args.video.display());
    }

    let session = BroadcastSession::from_config(&config);
    if let Some(audio) = &media.audio {
        session.set_audio_sample_rate(audio.sample_rate);
        session.set_audio_channel_count(audio.channels);
    }

    let (state_sender, mut states) = mpsc::unbounded_channel();
    let delegate = Arc::new(StatusPrinter {
        states: state_sender,
    });
    session.set_delegate(&delegate);

    if press_connect(&session, &args.url, &args.key).await? != ConnectAction::Start {
        bail!("session was already running");
    }

    let started = tokio::select! {
        () = shutdown_signal() => false,
        started = wait_for_start(&mut states) => started,
    };
    if !started {
        session.end_rtmp_session().await;
        bail!("rtmp session did not start");
    }

    let outcome = tokio::select! {
        () = shutdown_signal() => Ok(None),
        state = wait_for_stop(&mut states) => Ok(Some(state)),
        sent = publish::stream(&session, &media, config.video.fps) => sent.map(|sent| {
            info!("end of input after {sent} frames");
            None
        }),
    };

    if matches!(session.state(), SessionState::Starting | SessionState::Started) {
        session.end_rtmp_session().await;
    }

    match outcome {
        Ok(Some(SessionState::Error)) => bail!("rtmp session failed"),
        Ok(Some(state)) => {
            warn!("rtmp session stopped early: {state:?}");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(err) => {
            error!("publishing failed: {err}");
            Err(err.into())
        }
    }
}

/// `true` once the session is started, `false` if it fails first.
async fn wait_for_start(states: &mut mpsc::UnboundedReceiver<SessionState>) -> bool {
    while let Some(state) = states.recv().await {
        match state {
            SessionState::Started => return true,
            SessionState::Error | SessionState::Ended => return false,
            _ => {}
        }
    }
    false
}

async fn wait_for_stop(states: &mut mpsc::UnboundedReceiver<SessionState>) -> SessionState {
    while let Some(state) = states.recv().await {
        if matches!(state, SessionState::Error | SessionState::Ended) {
            return state;
        }
    }
    SessionState::Ended
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
