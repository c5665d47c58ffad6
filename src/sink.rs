// src/sink.rs
// =============================================================================
// Where findings and errors go.
//
// The engine never writes files or owns a logger. It calls emit() on the
// sinks it was given, and the sink decides what to do:
// - LogSink: report through tracing (stderr)
// - JsonLinesSink: append one JSON object per event to a file, written by
//   a background task so emit() never waits on the disk
// - CollectingSink: keep everything in memory (summary output, tests)
//
// Sinks are shared by all workers, so they take &self and must be Sync.
// =============================================================================

use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{CrawlError, ErrorKind};
use crate::scan::Finding;

// A failure report for the error sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorEvent {
    pub url: String,
    pub kind: ErrorKind,
    pub detail: String,
}

impl ErrorEvent {
    pub fn new(url: impl Into<String>, error: &CrawlError) -> Self {
        Self {
            url: url.into(),
            kind: error.kind(),
            detail: error.to_string(),
        }
    }
}

pub trait FindingSink: Send + Sync {
    fn emit(&self, finding: &Finding);
}

pub trait ErrorSink: Send + Sync {
    fn report(&self, event: &ErrorEvent);
}

// Reports through the tracing subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl FindingSink for LogSink {
    fn emit(&self, finding: &Finding) {
        warn!(
            url = %finding.url,
            token = %finding.token,
            location = %finding.location,
            evidence = %finding.evidence,
            "[!] possible SQL injection indicator"
        );
    }
}

impl ErrorSink for LogSink {
    fn report(&self, event: &ErrorEvent) {
        error!(url = %event.url, kind = ?event.kind, "[-] {}", event.detail);
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum Record<'a> {
    Finding(&'a Finding),
    Error(&'a ErrorEvent),
}

// Appends JSON lines to a writer (usually the --logfile)
//
// emit() only serializes the event and queues the line. A task on tokio's
// blocking pool does the writing, and flushes once every handle to the
// sink has been dropped.
pub struct JsonLinesSink {
    lines: mpsc::UnboundedSender<String>,
}

impl JsonLinesSink {
    // Must be called from inside a tokio runtime. The returned handle
    // finishes after the last line has been written and flushed.
    pub fn spawn(writer: impl Write + Send + 'static) -> (Self, JoinHandle<()>) {
        let (lines, mut queued) = mpsc::unbounded_channel::<String>();
        let handle = tokio::task::spawn_blocking(move || {
            let mut writer = writer;
            while let Some(line) = queued.blocking_recv() {
                // A lost log line must not stop the crawl
                if let Err(e) = writeln!(writer, "{}", line) {
                    warn!("could not write event log line: {}", e);
                }
            }
            if let Err(e) = writer.flush() {
                warn!("could not flush event log: {}", e);
            }
        });
        (Self { lines }, handle)
    }

    // Opens the file in append mode, creating it if needed
    pub fn append_to(path: &Path) -> io::Result<(Self, JoinHandle<()>)> {
        let file: File = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::spawn(BufWriter::new(file)))
    }

    fn write_record(&self, record: &Record<'_>) {
        match serde_json::to_string(record) {
            Ok(line) => {
                if self.lines.send(line).is_err() {
                    debug!("event log writer has stopped, dropping line");
                }
            }
            Err(e) => warn!("could not serialize event log line: {}", e),
        }
    }
}

impl FindingSink for JsonLinesSink {
    fn emit(&self, finding: &Finding) {
        self.write_record(&Record::Finding(finding));
    }
}

impl ErrorSink for JsonLinesSink {
    fn report(&self, event: &ErrorEvent) {
        self.write_record(&Record::Error(event));
    }
}

// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    findings: Mutex<Vec<Finding>>,
    errors: Mutex<Vec<ErrorEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(&self) -> Vec<Finding> {
        self.findings.lock().clone()
    }

    pub fn errors(&self) -> Vec<ErrorEvent> {
        self.errors.lock().clone()
    }
}

impl FindingSink for CollectingSink {
    fn emit(&self, finding: &Finding) {
        self.findings.lock().push(finding.clone());
    }
}

impl ErrorSink for CollectingSink {
    fn report(&self, event: &ErrorEvent) {
        self.errors.lock().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    // A Write handle we can read back after the sink is done with it
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn finding() -> Finding {
        Finding {
            url: "http://site.test/".to_string(),
            evidence: "O'Brien".to_string(),
            token: "'".to_string(),
            location: "text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_json_lines_format() {
        let buffer = SharedBuffer::default();
        let (sink, writer) = JsonLinesSink::spawn(buffer.clone());

        sink.emit(&finding());
        sink.report(&ErrorEvent::new(
            "http://site.test/missing",
            &CrawlError::Http { status: 404 },
        ));
        drop(sink);
        writer.await.unwrap();

        let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "finding");
        assert_eq!(lines[0]["evidence"], "O'Brien");
        assert_eq!(lines[1]["event"], "error");
        assert_eq!(lines[1]["kind"], "http");
        assert_eq!(lines[1]["detail"], "HTTP 404");
    }

    // Stays blocked in write() until the test lets it through
    struct GatedWriter {
        gate: std::sync::mpsc::Receiver<()>,
        buffer: SharedBuffer,
    }

    impl Write for GatedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let _ = self.gate.recv();
            self.buffer.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_json_lines_emit_does_not_wait_for_the_writer() {
        let (open, gate) = std::sync::mpsc::channel();
        let buffer = SharedBuffer::default();
        let (sink, writer) = JsonLinesSink::spawn(GatedWriter {
            gate,
            buffer: buffer.clone(),
        });

        // The writer is stuck, yet every emit returns right away
        for _ in 0..3 {
            sink.emit(&finding());
        }
        assert!(buffer.0.lock().is_empty());

        drop(sink);
        drop(open);
        writer.await.unwrap();

        let output = String::from_utf8(buffer.0.lock().clone()).unwrap();
        assert_eq!(output.lines().count(), 3);
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(&finding());
        sink.report(&ErrorEvent::new(
            "not a url",
            &CrawlError::malformed("not a url", "relative URL without a base"),
        ));

        assert_eq!(sink.findings(), vec![finding()]);
        assert_eq!(sink.errors()[0].kind, ErrorKind::MalformedUrl);
    }
}
