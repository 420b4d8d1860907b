pub mod commands;
pub mod error;
pub mod services;
pub mod state;

use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use commands::ConsoleCommand;
use services::{HostNotice, PanelSettings};
use state::AppState;

pub use error::{DmError, Result};
pub use services::DirectMessagesPanel;

/// Console entry point. The optional first argument is the settings file.
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .filter_module("reqwest", log::LevelFilter::Warn)
        .filter_module("hyper", log::LevelFilter::Warn)
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let settings = PanelSettings::load(config_path.as_deref())?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_console(settings))
}

async fn run_console(settings: PanelSettings) -> anyhow::Result<()> {
    let (state, notices) = AppState::new(settings)?;
    let printer = tokio::spawn(print_notices(notices));

    if let Some(outcome) = state.panel.start().await {
        log::info!("Admin provisioning: {:?}", outcome);
    }
    print_lines(&commands::execute(&state, ConsoleCommand::Peers(None)).await?);
    print_lines(&commands::conversation_lines(&state).await?);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match ConsoleCommand::parse(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };
        if command == ConsoleCommand::Quit {
            break;
        }
        match commands::execute(&state, command).await {
            Ok(output) => print_lines(&output),
            // Backend failures already reached the host as error notices.
            Err(e @ (DmError::NoActivePeer | DmError::Decode(_))) => eprintln!("{}", e),
            Err(e) => log::debug!("Command failed: {}", e),
        }
    }

    state.panel.teardown();
    printer.abort();
    log::info!("Direct messages closed");
    Ok(())
}

async fn print_notices(mut notices: mpsc::UnboundedReceiver<HostNotice>) {
    while let Some(notice) = notices.recv().await {
        match notice {
            HostNotice::Event(event) => match serde_json::to_string(&event) {
                Ok(json) => println!("[{}] {}", event.name(), json),
                Err(e) => log::warn!("Failed to encode {}: {}", event.name(), e),
            },
            HostNotice::Error(message) => eprintln!("error: {}", message),
            HostNotice::Scroll(anchor) => log::debug!("Scrolled to {}", anchor),
        }
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}
