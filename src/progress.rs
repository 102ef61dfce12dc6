//! Relay JSON-lines progress of the Docker engine
//!
//! Each line of a build, pull, or push response is a JSON record.
//! For build and push, only the textual field is written to the sink, and lines
//! which are not a valid record are dropped silently. Pull progress is relayed as is.

use serde::{de::DeserializeOwned, Deserialize};
use std::io::{self, BufRead, BufReader, Read, Write};

/// A record in the progress stream
pub trait LogEntry: DeserializeOwned {
    /// Text to be relayed
    fn text(&self) -> &str;
    /// Error reported by the engine in the stream, if any
    fn error(&self) -> Option<&str>;
}

/// A line of `POST /build` response, e.g. `{"stream":"Step 1/2 : FROM ubuntu"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildLog {
    #[serde(default)]
    pub stream: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl LogEntry for BuildLog {
    fn text(&self) -> &str {
        &self.stream
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// A line of pull or push response, e.g. `{"status":"Preparing","progressDetail":{},"id":"122be11ab4a2"}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusLog {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub error: Option<String>,
}

impl LogEntry for StatusLog {
    fn text(&self) -> &str {
        &self.status
    }
    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Decode a line, returns `None` if it is not a record of `E`
pub fn parse_line<E: LogEntry>(line: &[u8]) -> Option<E> {
    serde_json::from_slice(line).ok()
}

/// Relay records of `reader` into `sink` in arrival order, and returns the number of relayed records.
///
/// The relay is best-effort, and IO errors are not reported to the caller.
/// `reader` is read to its end or to its first error. After the first failed write,
/// the remaining records are still read and decoded but no longer written.
pub fn relay<E: LogEntry>(reader: impl Read, sink: &mut dyn Write) -> usize {
    forward(reader, sink, |line| {
        let entry = parse_line::<E>(line)?;
        if let Some(err) = entry.error() {
            log::error!("{}", err);
        }
        Some(entry.text().as_bytes().to_vec())
    })
}

/// Relay every line of `reader` into `sink` as is, and returns the number of relayed lines
///
/// Same as [relay] except that lines are not decoded.
pub fn relay_lines(reader: impl Read, sink: &mut dyn Write) -> usize {
    forward(reader, sink, |line| {
        let line = line.strip_suffix(b"\n").unwrap_or(line);
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        Some(line.to_vec())
    })
}

fn forward(
    reader: impl Read,
    sink: &mut dyn Write,
    mut render: impl FnMut(&[u8]) -> Option<Vec<u8>>,
) -> usize {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut count = 0;
    let mut writable = true;
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("Progress stream is closed by error: {}", e);
                break;
            }
        }
        let text = match render(&line) {
            Some(text) => text,
            None => continue,
        };
        if !writable {
            continue;
        }
        match write_line(sink, &text) {
            Ok(()) => count += 1,
            Err(e) => {
                log::warn!("Failed to write progress, discard the rest: {}", e);
                writable = false;
            }
        }
    }
    count
}

fn write_line(sink: &mut dyn Write, text: &[u8]) -> io::Result<()> {
    sink.write_all(text)?;
    sink.write_all(b"\n")?;
    sink.flush()
}
