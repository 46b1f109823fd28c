//! Upload progress tracking.

use std::io::{self, Write};

/// One progress notification, emitted per write into the upload stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Bytes accepted by this write.
    pub delta_bytes: u64,
    /// Bytes accepted so far, including this write.
    pub total_bytes_written: u64,
    /// Sum of the sizes of the file parts being uploaded.
    pub expected_total_bytes: u64,
}

impl ProgressEvent {
    /// Progress ratio in `0.0..=1.0`, or `None` when nothing is expected.
    ///
    /// Multipart framing makes the written total exceed the expected file
    /// bytes slightly, so the ratio is clamped.
    pub fn ratio(&self) -> Option<f64> {
        if self.expected_total_bytes == 0 {
            return None;
        }
        Some((self.total_bytes_written as f64 / self.expected_total_bytes as f64).min(1.0))
    }
}

/// Receives upload progress events.
pub trait ProgressSink {
    fn bytes_written(&mut self, event: ProgressEvent);
}

impl<F: FnMut(ProgressEvent)> ProgressSink for F {
    fn bytes_written(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Write-through wrapper reporting every write to a [`ProgressSink`].
///
/// Exactly one event is emitted per `write` call that the inner writer
/// accepts, carrying the number of bytes it accepted.
pub struct ProgressTrackingUploadStream<'a, W: Write> {
    inner: W,
    sink: &'a mut dyn ProgressSink,
    written: u64,
    expected: u64,
}

impl<'a, W: Write> ProgressTrackingUploadStream<'a, W> {
    pub fn new(inner: W, sink: &'a mut dyn ProgressSink, expected_total_bytes: u64) -> Self {
        Self {
            inner,
            sink,
            written: 0,
            expected: expected_total_bytes,
        }
    }

    /// Bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Expected total passed at construction.
    pub fn expected_bytes(&self) -> u64 {
        self.expected
    }

    /// Unwrap the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ProgressTrackingUploadStream<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let accepted = self.inner.write(buf)?;
        self.written += accepted as u64;
        self.sink.bytes_written(ProgressEvent {
            delta_bytes: accepted as u64,
            total_bytes_written: self.written,
            expected_total_bytes: self.expected,
        });
        Ok(accepted)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
