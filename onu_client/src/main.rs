mod config;
mod socketio;
mod terminal;
mod transport;

use std::process::ExitCode;

use tracing::info;
use tracing_subscriber::EnvFilter;

use onu_core::{Client, ClientError, PromptError};

use crate::config::Config;
use crate::terminal::Terminal;
use crate::transport::SocketIo;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // 日志写到 stderr，默认只输出警告，避免打乱交互提示
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    let mut terminal = Terminal::new();
    terminal.welcome();
    let username = terminal.ask_line("What is your name?").await?;
    let lobby_code = terminal.ask_line("What lobby do you want to join?").await?;

    let remote = SocketIo::connect(&config.onu_url).await?;
    let mut client = Client::new(remote, Terminal::new(), username);

    if let Err(e) = client.join(&lobby_code).await {
        terminal.report_error(&e.to_string());
        return Ok(ExitCode::FAILURE);
    }
    info!("已加入大厅 {}", lobby_code);

    match client.run().await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(ClientError::Prompt(PromptError::Interrupted)) => Ok(ExitCode::from(130)),
        Err(e) => Err(e.into()),
    }
}
