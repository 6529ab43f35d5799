//! Interactive terminal loop.

use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

use crate::{
    config::ServerEndpoint,
    error::ClientError,
    formatter::MessageFormatter,
    listener::ListenerEvent,
    session::{ChatClient, Delivery},
    timeline::Timeline,
    ui::redisplay_prompt,
};

/// Log in as `nickname` and relay stdin lines until Ctrl+C / Ctrl+D.
///
/// Returns an error when the server rejects the nickname.
pub async fn run_client(endpoint: ServerEndpoint, nickname: String) -> Result<(), ClientError> {
    let mut client = ChatClient::new(endpoint);
    let mut events = client.login(&nickname).await?;

    print!(
        "{}",
        MessageFormatter::format_welcome(&nickname, client.endpoint().http_base())
    );

    let mut input_rx = spawn_readline(nickname.clone());
    let mut timeline = Timeline::new();

    let result = loop {
        tokio::select! {
            line = input_rx.recv() => {
                let Some(line) = line else {
                    break Ok(());
                };
                match client.send(&line).await {
                    Ok(Delivery::Http) => {
                        print!("{}", MessageFormatter::format_notice("offline, sent over HTTP"));
                        redisplay_prompt(&nickname);
                    }
                    Ok(_) => {}
                    Err(e @ ClientError::ForbiddenNickname(_)) => break Err(e),
                    Err(e) => {
                        tracing::warn!("Failed to send message: {}", e);
                        print!("{}", MessageFormatter::format_error(&e.to_string()));
                        redisplay_prompt(&nickname);
                    }
                }
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break Ok(());
                };
                match render(event, &mut timeline, &nickname) {
                    Rendered::Print(text) => {
                        print!("{}", text);
                        redisplay_prompt(&nickname);
                    }
                    Rendered::Duplicate => {}
                    Rendered::Stop(text, error) => {
                        print!("{}", text);
                        break Err(error);
                    }
                }
            }
        }
    };

    client.logout().await;
    result
}

/// Outcome of rendering one listener event
#[derive(Debug, PartialEq, Eq)]
enum Rendered {
    /// Print the text and redisplay the prompt
    Print(String),
    /// A record that has already been shown
    Duplicate,
    /// Print the text and end the session
    Stop(String, ClientError),
}

fn render(event: ListenerEvent, timeline: &mut Timeline, nickname: &str) -> Rendered {
    let text = match event {
        ListenerEvent::Connected => MessageFormatter::format_notice("connected"),
        ListenerEvent::Message(message) => {
            if !timeline.admit(Some(&message.id)) {
                return Rendered::Duplicate;
            }
            MessageFormatter::format_chat_message(&message, nickname)
        }
        ListenerEvent::Error(error) => MessageFormatter::format_error(&error),
        ListenerEvent::Raw(text) => MessageFormatter::format_raw_message(&text),
        ListenerEvent::Disconnected(reason) => MessageFormatter::format_notice(&format!(
            "disconnected ({}), reconnecting",
            reason
        )),
        ListenerEvent::Rejected(error) => {
            return Rendered::Stop(MessageFormatter::format_error(&error.to_string()), error);
        }
    };
    Rendered::Print(text)
}

/// Read stdin on a blocking thread; the channel closes on Ctrl+C / Ctrl+D.
fn spawn_readline(nickname: String) -> mpsc::UnboundedReceiver<String> {
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();

    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                return;
            }
        };
        let prompt = format!("{}> ", nickname);

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str()).ok();
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    tracing::info!("Input closed");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    input_rx
}
