use std::sync::Arc;

use tracing::{error, info, warn};
use vigil_core::config::TransportKind;
use vigil_core::transport::port::Transport;
use vigil_feed::ws::WsTransport;
use vigil_session::{ChannelHandler, Session};
use vigil_store::config::set_root_dir;
use vigil_store::journal::SqlitePacketJournal;

mod console;
mod logging;
mod settings;

/// # Summary
/// Application entry point, a plain composition root.
/// Builds the transport, wires a session to the console and renders updates until exit.
///
/// # Logic
/// 1. Loads configuration and initialises logging.
/// 2. Builds the configured transport (WebSocket or SQLite journal).
/// 3. Replays journal history when the journal is the transport.
/// 4. Subscribes and renders session events on this task.
/// 5. Disposes the session on Ctrl-C.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. configuration and logging
    let config = settings::load("vigil")?;
    let _log_guard = logging::init(&config.log)?;
    info!("Vigil starting...");

    // 2. transport
    let (handler, mut events) = ChannelHandler::new();
    let mut journal = None;
    let transport: Arc<dyn Transport> = match config.transport {
        TransportKind::Socket => Arc::new(WsTransport::new(&config.session, &config.feed)),
        TransportKind::Journal => {
            set_root_dir(config.store.data_dir.clone().into());
            let opened = Arc::new(SqlitePacketJournal::from_config(&config.session, &config.store).await?);
            journal = Some(opened.clone());
            opened
        }
    };

    let session = Session::new(config.session.clone(), transport, Arc::new(handler))?;
    info!("Session {} created", session.name());

    // 3. catch-up
    if let Some(journal) = &journal
        && let Err(e) = session.load_recent(journal.as_ref()).await
    {
        warn!("Catch-up load failed: {}", e);
    }

    // 4. run
    session.subscribe().await?;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for shutdown signal: {}", e);
                }
                info!("Shutdown signal received. Exiting...");
                break;
            }
            event = events.recv() => match event {
                Some(event) => {
                    if let Some(line) = console::render(&event) {
                        println!("{}", line);
                    }
                }
                None => break,
            },
        }
    }

    // 5. teardown
    session.dispose().await;
    Ok(())
}
