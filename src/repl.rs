//! Line-oriented chat loop between the operator and a [`Session`].

use std::future::Future;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::agent::{Session, SessionError};

/// Case-insensitive keyword that ends the conversation.
pub const EXIT_KEYWORD: &str = "exit";

pub const BANNER: &str = "\nFlight Search Assistant is ready! You can start asking about flights.\n\
Example: 'Find me flights from NYC to London next week'\n\
Type 'exit' to quit\n\n";

#[derive(Debug, Error)]
pub enum ReplError {
    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// What one operator line asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input<'a> {
    Exit,
    Blank,
    Message(&'a str),
}

pub fn classify(line: &str) -> Input<'_> {
    let trimmed = line.trim();
    if trimmed.eq_ignore_ascii_case(EXIT_KEYWORD) {
        Input::Exit
    } else if trimmed.is_empty() {
        Input::Blank
    } else {
        Input::Message(trimmed)
    }
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ExitCommand,
    EndOfInput,
    Interrupted,
}

/// Summary of a finished conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub turns: usize,
    pub termination: Termination,
}

/// Run the chat loop until `exit`, end of input or `shutdown` resolves, then
/// release the session. The release happens on error paths too.
pub async fn run<R, W, S>(
    mut session: Session,
    reader: R,
    mut writer: W,
    shutdown: S,
) -> Result<Outcome, ReplError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    let mut turns = 0;
    let result = tokio::select! {
        result = chat(&mut session, reader, &mut writer, &mut turns) => result,
        _ = &mut shutdown => {
            tracing::info!("Interrupted, shutting down");
            Ok(Termination::Interrupted)
        }
    };

    session.close().await;
    result.map(|termination| Outcome { turns, termination })
}

/// Converse until the operator leaves. `turns` counts answered messages and
/// stays accurate if this future is dropped mid-conversation.
async fn chat<R, W>(
    session: &mut Session,
    reader: R,
    writer: &mut W,
    turns: &mut usize,
) -> Result<Termination, ReplError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(BANNER.as_bytes()).await?;

    let mut lines = reader.lines();

    loop {
        writer.write_all(b"You: ").await?;
        writer.flush().await?;

        let Some(line) = lines.next_line().await? else {
            writer.write_all(b"\n").await?;
            writer.flush().await?;
            return Ok(Termination::EndOfInput);
        };

        let message = match classify(&line) {
            Input::Exit => return Ok(Termination::ExitCommand),
            Input::Blank => continue,
            Input::Message(message) => message,
        };

        let reply = session.respond(message).await?;
        *turns += 1;

        writer
            .write_all(format!("Assistant: {}\n", reply).as_bytes())
            .await?;
        writer.flush().await?;
    }
}
