use std::sync::Arc;

use advisor_chat::ConversationStore;
use advisor_wire::{AdvisorTransport, WireClient};
use snafu::ResultExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use super::error::{AppResult, BuildClientSnafu, ReadInputSnafu, WriteOutputSnafu};
use super::render::{StreamEcho, profile_summary};
use super::settings::ClientSettings;

const PROMPT: &str = "> ";

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Empty,
    Quit,
    Profile,
    Suggest,
    Unknown(&'a str),
    Say(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "" => Self::Empty,
            "/quit" | "/exit" => Self::Quit,
            "/profile" => Self::Profile,
            "/suggest" => Self::Suggest,
            other if other.starts_with('/') => Self::Unknown(other),
            other => Self::Say(other),
        }
    }
}

pub async fn run(settings: ClientSettings) -> AppResult<()> {
    let client = Arc::new(
        WireClient::new(settings.to_wire_config()).context(BuildClientSnafu {
            stage: "build-wire-client",
        })?,
    );

    let store = ConversationStore::new(client.clone())
        .with_extra_context(settings.extra_context.clone());
    tracing::info!(
        session_id = %store.session_id(),
        base_url = %settings.base_url,
        authenticated = settings.api_key.is_some(),
        "advisor session started"
    );

    let mut stdout = tokio::io::stdout();
    drive(
        &store,
        client.as_ref(),
        BufReader::new(tokio::io::stdin()),
        &mut stdout,
    )
    .await
}

/// Reads one command or message per line until `/quit` or end of input.
pub async fn drive<R, W>(
    store: &ConversationStore,
    transport: &dyn AdvisorTransport,
    input: R,
    output: &mut W,
) -> AppResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    write(output, PROMPT).await?;

    while let Some(line) = lines.next_line().await.context(ReadInputSnafu {
        stage: "read-input-line",
    })? {
        match Command::parse(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Profile => {
                let summary = match store.profile().current() {
                    Some(profile) => profile_summary(&profile),
                    None => "profile: (none yet)".to_string(),
                };
                write(output, &format!("{summary}\n")).await?;
            }
            Command::Suggest => show_suggestions(transport, output).await?,
            Command::Unknown(command) => {
                write(
                    output,
                    &format!("unknown command {command}; try /suggest, /profile or /quit\n"),
                )
                .await?;
            }
            Command::Say(text) => run_turn(store, text, output).await?,
        }
        write(output, PROMPT).await?;
    }

    Ok(())
}

async fn show_suggestions<W>(transport: &dyn AdvisorTransport, output: &mut W) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    match transport.fetch_suggestions().await {
        Ok(suggestions) if suggestions.is_empty() => write(output, "no suggestions\n").await,
        Ok(suggestions) => {
            let mut listing = String::new();
            for suggestion in suggestions {
                if suggestion.category.is_empty() {
                    listing.push_str(&format!("- {}\n", suggestion.text));
                } else {
                    listing.push_str(&format!("- {} [{}]\n", suggestion.text, suggestion.category));
                }
            }
            write(output, &listing).await
        }
        Err(error) => {
            tracing::warn!(stage = error.stage(), error = %error, "failed to fetch suggestions");
            write(output, "suggestions are unavailable right now\n").await
        }
    }
}

async fn run_turn<W>(store: &ConversationStore, text: &str, output: &mut W) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut updates = store.subscribe();
    let profile_before = store.profile().current();

    let Some(turn) = store.append(text) else {
        return write(output, "a reply is still in progress\n").await;
    };

    let mut echo = StreamEcho::new();
    loop {
        let (chunk, running) = {
            let state = updates.borrow_and_update();
            let chunk = state
                .messages
                .last()
                .map(|message| echo.observe(message))
                .unwrap_or_default();
            (chunk, state.is_running)
        };
        write(output, &chunk).await?;

        if !running || updates.changed().await.is_err() {
            break;
        }
    }

    match turn.await {
        Ok(outcome) => tracing::debug!(outcome = ?outcome, "turn completed"),
        Err(error) => tracing::error!(error = %error, "turn task ended abnormally"),
    }
    write(output, "\n").await?;

    let profile_after = store.profile().current();
    let profile_changed = match (&profile_before, &profile_after) {
        (Some(before), Some(after)) => !Arc::ptr_eq(before, after),
        (None, None) => false,
        _ => true,
    };
    if let Some(profile) = profile_after.filter(|_| profile_changed) {
        write(output, &format!("{}\n", profile_summary(&profile))).await?;
    }

    Ok(())
}

async fn write<W>(output: &mut W, text: &str) -> AppResult<()>
where
    W: AsyncWrite + Unpin,
{
    if text.is_empty() {
        return Ok(());
    }
    output
        .write_all(text.as_bytes())
        .await
        .context(WriteOutputSnafu {
            stage: "write-output",
        })?;
    output.flush().await.context(WriteOutputSnafu {
        stage: "flush-output",
    })
}

#[cfg(test)]
mod tests {
    use advisor_wire::{
        BoxFuture, RecordStream, StreamRequest, Suggestion, SyncRequest, SyncResponse, WireError,
        WireResult,
    };
    use serde_json::json;

    use super::*;

    struct OfflineTransport;

    impl AdvisorTransport for OfflineTransport {
        fn open_stream<'a>(
            &'a self,
            _request: StreamRequest,
        ) -> BoxFuture<'a, WireResult<RecordStream>> {
            Box::pin(async {
                Err(WireError::UnexpectedStatus {
                    stage: "offline",
                    url: "http://advisor.test/api/chat/stream".to_string(),
                    status: 502,
                    body: String::new(),
                })
            })
        }

        fn send_sync<'a>(&'a self, _request: SyncRequest) -> BoxFuture<'a, WireResult<SyncResponse>> {
            Box::pin(async {
                Ok(SyncResponse {
                    response: "Index funds spread risk.".to_string(),
                    intent_profile: Some(json!({"risk_preference": "balanced"})),
                })
            })
        }

        fn fetch_suggestions<'a>(&'a self) -> BoxFuture<'a, WireResult<Vec<Suggestion>>> {
            Box::pin(async {
                Ok(vec![Suggestion {
                    id: "1".to_string(),
                    text: "How do I start saving?".to_string(),
                    category: "basics".to_string(),
                }])
            })
        }
    }

    #[test]
    fn commands_are_recognized() {
        assert_eq!(Command::parse("  "), Command::Empty);
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/suggest "), Command::Suggest);
        assert_eq!(Command::parse("/nope"), Command::Unknown("/nope"));
        assert_eq!(Command::parse(" Should I buy bonds? "), Command::Say("Should I buy bonds?"));
    }

    #[tokio::test]
    async fn session_answers_through_fallback() {
        let transport = Arc::new(OfflineTransport);
        let store = ConversationStore::new(transport.clone());
        let input = b"/suggest\nWhat is an index fund?\n/profile\n/quit\nnever sent\n";
        let mut output = Vec::new();

        drive(&store, transport.as_ref(), input.as_slice(), &mut output)
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("- How do I start saving? [basics]"));
        assert!(output.contains("Index funds spread risk."));
        assert!(output.contains("profile: risk: balanced"));
        assert_eq!(store.snapshot().messages.len(), 2);
        assert!(!store.is_running());
    }
}
