//! Client relay between a terminal and one server connection.
//!
//! Two loops share the connection:
//! - server lines are printed as `Server: <line>` until the server closes
//! - input lines are forwarded, newline-terminated, until input ends or a
//!   write fails
//!
//! Neither loop stops the other. The printing loop runs as a detached task
//! and ends with the runtime.

use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Prefix for lines received from the server
const SERVER_PREFIX: &str = "Server: ";

/// Relay `input` to `stream` and print the server's lines to `output`.
///
/// Returns once `input` is exhausted, or with the first write error.
pub async fn relay<S, I, O>(stream: S, input: I, output: O) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
    I: AsyncRead + Unpin,
    O: AsyncWrite + Unpin + Send + 'static,
{
    let (read_half, mut write_half) = tokio::io::split(stream);
    tokio::spawn(print_replies(read_half, output));

    forward_input(input, &mut write_half).await
}

/// Print each server line until the connection closes
async fn print_replies<R, O>(conn: R, mut output: O)
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(conn).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let mut out = BytesMut::with_capacity(SERVER_PREFIX.len() + line.len() + 1);
                out.extend_from_slice(SERVER_PREFIX.as_bytes());
                out.extend_from_slice(line.as_bytes());
                out.extend_from_slice(b"\n");

                if let Err(e) = write_flushed(&mut output, &out).await {
                    debug!(error = %e, "Failed to print server line");
                    return;
                }
            }
            Ok(None) => {
                debug!("Server closed the connection");
                return;
            }
            Err(e) => {
                debug!(error = %e, "Failed to read from server");
                return;
            }
        }
    }
}

/// Forward input lines to the server, each terminated by `\n`.
///
/// Unreadable input ends the loop like end of input; only write failures
/// are errors.
pub async fn forward_input<I, W>(input: I, conn: &mut W) -> io::Result<()>
where
    I: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(input).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(()),
            Err(e) => {
                debug!(error = %e, "Failed to read input");
                return Ok(());
            }
        };

        let mut frame = BytesMut::with_capacity(line.len() + 1);
        frame.extend_from_slice(line.as_bytes());
        frame.extend_from_slice(b"\n");
        write_flushed(conn, &frame).await?;
    }
}

async fn write_flushed<W>(writer: &mut W, data: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(data).await?;
    writer.flush().await
}
