//! Terminal chat client for the Sokdo relay.
//!
//! Logs in with a nickname, prints the recent history and every new message,
//! and sends each line typed at the prompt. Reconnects every 2 seconds when the
//! connection drops; exits when the server rejects the nickname.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin sokdo-client -- --nickname alice
//! cargo run --bin sokdo-client -- -n bob -u https://chat.example.com
//! ```

use clap::Parser;
use sokdo_client::{
    config::{DEFAULT_SERVER_URL, ServerEndpoint},
    run_client,
};
use sokdo_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "sokdo-client")]
#[command(about = "Terminal client for the Sokdo chat relay", long_about = None)]
struct Args {
    /// Nickname to chat as
    #[arg(short = 'n', long)]
    nickname: String,

    /// Server base URL (http(s):// or ws(s)://)
    #[arg(short = 'u', long, env = "SOKDO_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let endpoint = match ServerEndpoint::parse(&args.server_url) {
        Ok(endpoint) => endpoint,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run_client(endpoint, args.nickname).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
