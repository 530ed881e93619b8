use std::io::Write;
use std::ops::ControlFlow;

use campus_llm::{PartialResultSink, PartialUpdate, StreamStatus};

/// Prints only the text each update adds to what is already on screen.
///
/// Stops the stream (returns `Break`) once the writer fails, e.g. on a
/// closed pipe.
#[derive(Debug)]
pub struct IncrementalPrinter<W> {
    writer: W,
    printed: usize,
}

impl<W: Write> IncrementalPrinter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, printed: 0 }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_update(&mut self, update: PartialUpdate<'_>) -> std::io::Result<()> {
        let fresh = update.text.get(self.printed..).unwrap_or_default();
        if !fresh.is_empty() {
            self.writer.write_all(fresh.as_bytes())?;
            self.printed = update.text.len();
        }
        if update.status == StreamStatus::Finished {
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }
}

impl<W: Write + Send> PartialResultSink for IncrementalPrinter<W> {
    fn push(&mut self, update: PartialUpdate<'_>) -> ControlFlow<()> {
        match self.write_update(update) {
            Ok(()) => ControlFlow::Continue(()),
            Err(error) => {
                tracing::debug!(%error, "output closed");
                ControlFlow::Break(())
            }
        }
    }
}
