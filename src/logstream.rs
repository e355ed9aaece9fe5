use anyhow::Result;
use futures::StreamExt;
use futures::stream::Stream;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::nav::ViewKey;
use crate::types::LogEntry;

/// Decode one log line into a structured entry. Lines are expected to be
/// JSON objects with no fixed schema; `serde_json`'s preserve_order
/// feature keeps the map in source key order, so the well-known fields
/// are extracted by walking the entries as they appeared in the line.
/// A line that fails to decode still produces an entry: the raw text is
/// never lost.
pub fn decode_line(line: &str) -> LogEntry {
    let mut entry = LogEntry {
        raw: line.to_string(),
        ..Default::default()
    };

    let Ok(fields) = serde_json::from_str::<Map<String, Value>>(line) else {
        return entry;
    };

    for (key, value) in fields {
        let text = match value {
            Value::String(s) => s,
            other => other.to_string(),
        };
        match key.as_str() {
            "level" => entry.level = text,
            "time" => entry.time = text,
            "msg" => entry.msg = text,
            _ => {}
        }
    }

    entry
}

/// A live follow-stream tied to one log view. Dropping the receiver or
/// firing `abort` tears down the reader task, which drops (and thereby
/// closes) the underlying stream.
#[derive(Debug)]
pub struct LogSession {
    pub view: ViewKey,
    rx: mpsc::Receiver<Result<LogEntry>>,
    pub abort: AbortHandle,
}

impl LogSession {
    /// Pull the next entry. `None` means the stream ended and no further
    /// entries will ever arrive; repeated calls keep returning `None`
    /// rather than hanging.
    pub async fn recv(&mut self) -> Option<Result<LogEntry>> {
        self.rx.recv().await
    }

    pub fn close(self) {
        self.abort.abort();
    }
}

/// Spawn a reader that decodes `lines` one entry at a time into a
/// capacity-1 channel. The loop reserves the send slot before reading the
/// next line, so consumption pace governs how far the reader advances:
/// with no pending demand it never reads past the single reserved slot,
/// and backpressure propagates to the underlying transport. Stream end
/// closes the channel; a read error delivers one final error and stops.
pub fn spawn_reader<S>(view: ViewKey, lines: S) -> LogSession
where
    S: Stream<Item = std::io::Result<String>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    let handle = tokio::spawn(async move {
        let mut lines = std::pin::pin!(lines);
        loop {
            let Ok(permit) = tx.reserve().await else {
                // Receiver dropped; stop pulling from the transport.
                return;
            };
            match lines.next().await {
                Some(Ok(line)) => permit.send(Ok(decode_line(&line))),
                Some(Err(err)) => {
                    permit.send(Err(anyhow::Error::new(err).context("read log line")));
                    return;
                }
                None => return,
            }
        }
    });

    LogSession {
        view,
        rx,
        abort: handle.abort_handle(),
    }
}

/// One-shot variant used by stdout mode: decode a full tail in order.
pub fn decode_tail(lines: &[String]) -> Vec<LogEntry> {
    lines.iter().map(|line| decode_line(line)).collect()
}
