//! Lobby terminal client.
//!
//! # Usage
//!
//! ```bash
//! LOBBY_TOKEN=... lobby --user-id 7 --username alice \
//!     --server ws://localhost:8080/ws/chat/websocket --api http://localhost:8080
//! ```
//!
//! Plain lines go to the open private chat, or the public room when none is
//! open. `/help` lists commands.

use std::sync::Arc;

use clap::Parser;
use lobby_cli::{
    Input,
    command::HELP,
    render::{event_lines, roster_lines, thread_lines, transcript_lines},
};
use lobby_client::{ChatSession, HttpHistory, SessionConfig, WebSocketTransport};
use lobby_core::{ConnectionState, StaticIdentity, User};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type Session = ChatSession<WebSocketTransport, HttpHistory, Arc<StaticIdentity>>;

/// Lobby chat client
#[derive(Parser, Debug)]
#[command(name = "lobby")]
#[command(about = "Terminal client for the Lobby chat broker")]
#[command(version)]
struct Args {
    /// WebSocket endpoint of the broker
    #[arg(short, long, default_value = "ws://localhost:8080/ws/chat/websocket")]
    server: String,

    /// Base URL of the REST API
    #[arg(short, long, default_value = "http://localhost:8080")]
    api: String,

    /// Bearer token
    #[arg(long, env = "LOBBY_TOKEN", hide_env_values = true)]
    token: String,

    /// Id of the signed-in user
    #[arg(long, env = "LOBBY_USER_ID")]
    user_id: i64,

    /// Name of the signed-in user
    #[arg(long, env = "LOBBY_USERNAME", default_value = "")]
    username: String,

    /// Messages loaded per history request
    #[arg(long, default_value = "20")]
    history: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let identity = Arc::new(StaticIdentity::new(
        User::new(args.user_id, args.username),
        SecretString::from(args.token),
    ));

    let config = SessionConfig { history_limit: args.history, ..SessionConfig::new(args.server) };
    let history = HttpHistory::new(args.api, identity.clone());
    let mut session: Session =
        ChatSession::new(config, WebSocketTransport::default(), history, identity);

    let mut out = tokio::io::stdout();

    tracing::info!(endpoint = %session.config().endpoint, "connecting");
    session.connect().await?;
    write_lines(&mut out, &["* connected, /help for commands".to_string()]).await?;
    write_lines(&mut out, &catch_up(&mut session).await).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let connected = session.state() == ConnectionState::Connected;
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_input(&mut session, &mut out, Input::parse(&line)).await? {
                    break;
                }
            },
            Some(event) = session.next_event(), if connected => {
                write_lines(&mut out, &event_lines(session.chat(), event)).await?;
            },
        }
    }

    session.disconnect();
    Ok(())
}

/// Apply one line of input. Returns `false` when the user quits.
async fn handle_input(
    session: &mut Session,
    out: &mut Stdout,
    input: Input,
) -> std::io::Result<bool> {
    let lines = match input {
        Input::Quit => return Ok(false),
        Input::Say(text) => {
            let sent = match session.chat().active_private() {
                Some(peer_id) => session.send_private(peer_id, &text),
                None => session.send_public(&text),
            };
            sent.err().map(|e| vec![format!("* {e}")]).unwrap_or_default()
        },
        Input::Pm { peer_id, text } => match session.send_private(peer_id, &text) {
            Ok(()) => Vec::new(),
            Err(e) => vec![format!("* {e}")],
        },
        Input::Open(peer_id) => {
            session.start_private_chat(peer_id);
            let _ = session.load_private_history(peer_id, None).await;
            transcript_lines(session.chat())
        },
        Input::Close => {
            session.close_private_chat();
            transcript_lines(session.chat())
        },
        Input::History(limit) => {
            let loaded = match session.chat().active_private() {
                Some(peer_id) => session.load_private_history(peer_id, limit).await,
                None => session.load_public_history(limit).await,
            };
            match loaded {
                Ok(_) => transcript_lines(session.chat()),
                Err(e) => vec![format!("* {e}")],
            }
        },
        Input::Who => {
            let _ = session.refresh_presence().await;
            roster_lines(session.chat())
        },
        Input::Online(user_id) => match session.check_online(user_id).await {
            Ok(true) => vec![format!("* user {user_id} is online")],
            Ok(false) => vec![format!("* user {user_id} is offline")],
            Err(e) => vec![format!("* {e}")],
        },
        Input::Connect => match session.connect().await {
            Ok(()) => catch_up(session).await,
            Err(e) => vec![format!("* {e}")],
        },
        Input::Chats => thread_lines(session.chat()),
        Input::Help => HELP.lines().map(str::to_string).collect(),
        Input::Invalid(usage) => vec![format!("* {usage}")],
    };

    write_lines(out, &lines).await?;
    Ok(true)
}

/// Load the public log and roster after connecting.
///
/// History failures are logged by the session; the live feed still works.
async fn catch_up(session: &mut Session) -> Vec<String> {
    let _ = session.load_public_history(None).await;
    let _ = session.refresh_presence().await;
    transcript_lines(session.chat())
}

async fn write_lines(out: &mut Stdout, lines: &[String]) -> std::io::Result<()> {
    for line in lines {
        out.write_all(line.as_bytes()).await?;
        out.write_all(b"\n").await?;
    }
    out.flush().await
}
