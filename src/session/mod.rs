//! Per-connection session.
//!
//! A session owns one client stream and runs until the client quits, goes
//! quiet for longer than the idle timeout, or the stream ends. Three event
//! sources feed a single dispatch loop:
//!
//! - a reader task framing lines off the stream (`Line`, `Closed`)
//! - the inactivity deadline (`Idle`)
//!
//! The loop handles one event at a time, so responses and activity-log
//! entries keep the order in which lines arrived.

mod reader;

use reader::LineReader;

use crate::activity::{self, ActivityLog};
use crate::protocol::{Command, Response};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace};

/// Lines buffered between the reader task and the dispatch loop
const EVENT_QUEUE_CAPACITY: usize = 32;

/// Deadline used when the idle timeout is too large to represent
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Client sent `bye` or `/quit`
    ClientQuit,
    /// No line arrived before the inactivity deadline
    InactivityTimeout,
    /// The stream reached end-of-input or failed
    StreamClosed,
}

/// Input to the dispatch loop
#[derive(Debug)]
enum Event {
    Line(String),
    Idle,
    Closed,
}

/// One client connection
pub struct Session {
    /// Remote address, also the activity log key
    peer: String,
    log: Arc<ActivityLog>,
    idle_timeout: Duration,
}

impl Session {
    /// Create a session for `peer`
    pub fn new(peer: impl Into<String>, log: Arc<ActivityLog>, idle_timeout: Duration) -> Self {
        Self {
            peer: peer.into(),
            log,
            idle_timeout,
        }
    }

    /// Remote identifier of this session
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Serve `stream` until a termination condition, then close it.
    pub async fn run<S>(self, stream: S) -> Termination
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, mut writer) = tokio::io::split(stream);
        let (tx, mut events) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let reader = tokio::spawn(read_lines(read_half, tx));

        info!(peer = %self.peer, at = %activity::timestamp(), "Client connected");
        self.log.record(&self.peer, "Connected").await;

        let mut deadline = idle_deadline(self.idle_timeout);
        let reason = loop {
            match next_event(&mut events, deadline).await {
                Event::Line(line) => {
                    if let Some(reason) = self.handle_line(&line, &mut writer).await {
                        break reason;
                    }
                    deadline = idle_deadline(self.idle_timeout);
                }
                Event::Idle => {
                    self.send(&mut writer, Response::inactivity()).await;
                    self.log.record(&self.peer, "Disconnected (timeout)").await;
                    break Termination::InactivityTimeout;
                }
                Event::Closed => {
                    self.log.record(&self.peer, "Disconnected").await;
                    break Termination::StreamClosed;
                }
            }
        };

        if let Err(e) = writer.shutdown().await {
            trace!(peer = %self.peer, error = %e, "Shutdown failed");
        }
        // Dropping the read half together with the writer closes the stream
        reader.abort();

        info!(peer = %self.peer, ?reason, at = %activity::timestamp(), "Client disconnected");
        reason
    }

    /// Log, answer, and decide whether the session should end.
    async fn handle_line<W>(&self, line: &str, writer: &mut W) -> Option<Termination>
    where
        W: AsyncWrite + Unpin,
    {
        let message = line.trim();

        // The log keeps the full message; only matching sees the truncated form
        self.log.record(&self.peer, message).await;

        let command = Command::parse(message);
        trace!(peer = %self.peer, ?command, "Processing command");

        let response = Response::for_command(&command, Utc::now());
        self.send(writer, &response).await;

        match command.farewell_reason() {
            Some(reason) => {
                let entry = format!("Disconnected ({reason})");
                self.log.record(&self.peer, &entry).await;
                Some(Termination::ClientQuit)
            }
            None => None,
        }
    }

    async fn send<W>(&self, writer: &mut W, data: &[u8])
    where
        W: AsyncWrite + Unpin,
    {
        if let Err(e) = writer.write_all(data).await {
            debug!(peer = %self.peer, error = %e, "Failed to write response");
        }
    }
}

/// Instant at which a session idle from now times out.
///
/// Timeouts too large to add to the clock are capped at a far-future
/// deadline.
fn idle_deadline(idle_timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(idle_timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

/// Wait for the next line, end of stream, or the deadline, whichever
/// comes first.
async fn next_event(events: &mut mpsc::Receiver<Event>, deadline: Instant) -> Event {
    match timeout_at(deadline, events.recv()).await {
        Ok(Some(event)) => event,
        Ok(None) => Event::Closed,
        Err(_) => Event::Idle,
    }
}

/// Reader task: frame lines off the stream until it ends.
async fn read_lines<R>(stream: R, events: mpsc::Sender<Event>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = LineReader::new(stream);

    loop {
        let event = match lines.next_line().await {
            Ok(Some(line)) => Event::Line(line),
            Ok(None) => {
                trace!("Connection closed by client");
                Event::Closed
            }
            Err(e) => {
                debug!(error = %e, "Read failed");
                Event::Closed
            }
        };

        let done = matches!(event, Event::Closed);
        if events.send(event).await.is_err() || done {
            return;
        }
    }
}
