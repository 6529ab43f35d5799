//! Sokdo chat relay server.
//!
//! Persists chat messages and relays them to every connected WebSocket client,
//! with an HTTP fallback for sending and history retrieval.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin sokdo-server
//! cargo run --bin sokdo-server -- --host 127.0.0.1 --port 3000 --whitelist alice,bob
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use sokdo_server::{
    domain::{AccessPolicy, DEFAULT_RETENTION_LIMIT, MessageRepository},
    infrastructure::{
        message_pusher::WebSocketMessagePusher,
        repository::{InMemoryMessageRepository, JsonFileMessageRepository},
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, FetchMessagesUseCase,
        SendMessageUseCase, SweepMessagesUseCase,
    },
};
use sokdo_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "sokdo-server")]
#[command(about = "Real-time chat relay server with WebSocket broadcast", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "SOKDO_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Comma-separated list of allowed nicknames (unset: everyone is allowed)
    #[arg(long, env = "CHAT_WHITELIST")]
    whitelist: Option<String>,

    /// JSON file to persist messages in (unset: in-memory store)
    #[arg(long, env = "SOKDO_STORE_PATH")]
    store_path: Option<PathBuf>,

    /// Number of most recent messages kept in the store
    #[arg(long, env = "SOKDO_RETENTION_LIMIT", default_value_t = DEFAULT_RETENTION_LIMIT)]
    retention_limit: usize,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Access policy
    // 2. Repository
    // 3. MessagePusher
    // 4. UseCases
    // 5. Server

    // 1. Access policy (read-only after startup)
    let policy = Arc::new(AccessPolicy::from_csv(args.whitelist.as_deref()));
    match policy.allow_list_len() {
        Some(len) => tracing::info!("Allow-list enabled ({} nickname(s))", len),
        None => tracing::info!("Allow-list disabled, every nickname is accepted"),
    }

    // 2. Repository
    let clock = Arc::new(SystemClock);
    let repository: Arc<dyn MessageRepository> = match &args.store_path {
        Some(path) => match JsonFileMessageRepository::open(path, clock).await {
            Ok(repository) => Arc::new(repository),
            Err(e) => {
                tracing::error!("Failed to open message store: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::info!("Using in-memory message store");
            Arc::new(InMemoryMessageRepository::new(clock))
        }
    };

    // 3. MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 4. UseCases
    let sweeper = Arc::new(SweepMessagesUseCase::new(
        repository.clone(),
        args.retention_limit,
    ));
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        repository.clone(),
        message_pusher.clone(),
        policy.clone(),
    ));
    let disconnect_participant_usecase =
        Arc::new(DisconnectParticipantUseCase::new(message_pusher.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        repository.clone(),
        message_pusher.clone(),
        policy.clone(),
        sweeper,
    ));
    let fetch_messages_usecase = Arc::new(FetchMessagesUseCase::new(repository, policy));

    // 5. Create and run the server
    let server = Server::new(
        connect_participant_usecase,
        disconnect_participant_usecase,
        send_message_usecase,
        fetch_messages_usecase,
        message_pusher,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
