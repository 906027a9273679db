//! Jarvis application binary - composition root.
//!
//! Ties the Jarvis crates together into a single executable:
//! - `jarvis serve`: load configuration and credentials, build the TTS
//!   provider and run the relay HTTP server
//! - `jarvis chat`: run a terminal conversation against a relay, saving
//!   audio replies to a directory

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use jarvis_chat::{ConversationController, DirectorySink, HttpRelayClient};
use jarvis_core::config::{JarvisConfig, TtsCredentials};
use jarvis_core::events::{notice_channel, NoticeLevel};
use jarvis_core::types::RelayVariant;
use jarvis_relay::{start_server, AppState, ElevenLabsProvider};

use cli::{CliArgs, Command};

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

async fn serve(
    mut config: JarvisConfig,
    port: Option<u16>,
    variant: Option<RelayVariant>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.relay.port = cli::resolve_port(port, config.relay.port);
    if let Some(variant) = variant {
        config.relay.variant = variant;
    }

    let credentials = TtsCredentials::from_env();
    let provider = ElevenLabsProvider::new(config.tts.clone(), credentials)?;
    let state = AppState::new(config.relay.clone(), Arc::new(provider));

    if let Err(e) = start_server(&config.relay, state).await {
        tracing::error!(error = %e, "Relay server failed. Is another instance running?");
        tracing::error!("Try: {}={} jarvis serve", cli::PORT_ENV, config.relay.port.saturating_add(1));
        return Err(e.into());
    }
    Ok(())
}

async fn chat(
    mut config: JarvisConfig,
    relay_url: Option<String>,
    audio_dir: PathBuf,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    config.relay.base_url = cli::resolve_relay_url(relay_url, &config.relay.base_url);

    let client = HttpRelayClient::new(&config.relay)?;
    tracing::info!(url = %client.url(), audio_dir = %audio_dir.display(), "Chat client ready");

    let notices = notice_channel();
    let mut notice_rx = notices.subscribe();
    tokio::spawn(async move {
        while let Ok(notice) = notice_rx.recv().await {
            match notice.level {
                NoticeLevel::Error => eprintln!("! {}", notice),
                NoticeLevel::Info | NoticeLevel::Success => eprintln!("* {}", notice),
            }
        }
    });

    let controller = ConversationController::new(
        &config.conversation,
        Arc::new(client),
        Arc::new(DirectorySink::new(audio_dir)),
        notices,
    );

    for greeting in controller.transcript() {
        println!("Jarvis: {}", greeting.content);
    }

    if let Some(message) = message {
        turn(&controller, &message).await;
        wait_until_quiet(&controller).await;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                    break;
                }
                turn(&controller, line).await;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    wait_until_quiet(&controller).await;
    tracing::info!(messages = controller.transcript().len(), "Chat session ended");
    Ok(())
}

async fn turn(controller: &ConversationController, text: &str) {
    match controller.submit_text(text).await {
        Ok(Some(reply)) => println!("Jarvis: {}", reply.content),
        Ok(None) => {}
        // Already reported as a notice.
        Err(e) => tracing::debug!(error = %e, "Turn failed"),
    }
}

/// Let pending playback (audio files being written) finish before exiting.
async fn wait_until_quiet(controller: &ConversationController) {
    let mut speaking = controller.subscribe_speaking();
    if speaking.wait_for(|s| !*s).await.is_err() {
        tracing::debug!("Speaking indicator closed");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let config = JarvisConfig::load_or_default(&config_file);
    init_tracing(&args.resolve_log_level(&config.general.log_level));

    tracing::info!("Starting Jarvis v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    match args.command {
        Command::Serve { port, variant } => serve(config, port, variant).await,
        Command::Chat {
            relay_url,
            audio_dir,
            message,
        } => chat(config, relay_url, audio_dir, message).await,
    }
}
