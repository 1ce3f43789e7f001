//! Output channel: items released by components, handed to an
//! [`OutputHandler`].
//!
//! The kernel does not interpret items.  Each is a row of labels stamped with
//! the release time and the releasing component.
//!
//! # Backends
//!
//! | Type           | Behavior                                            |
//! |----------------|-----------------------------------------------------|
//! | `NoopOutput`   | discards everything (the default)                   |
//! | `MemoryOutput` | collects items into a shared `Vec`                  |
//! | `CsvOutput<W>` | one CSV line per item: `time,component,labels…`     |

use std::io::Write;
use std::sync::{Arc, Mutex};

use pk_core::{ComponentId, Label, Time};

use crate::OutputResult;

/// One released output row.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputItem {
    pub time:      Time,
    pub component: ComponentId,
    pub record:    Vec<Label>,
}

/// Receives released output.  `open` is called before components are
/// initialized, `close` after they are closed, also when the run aborts.
pub trait OutputHandler {
    fn open(&mut self) -> OutputResult<()> {
        Ok(())
    }

    fn handle(&mut self, item: OutputItem) -> OutputResult<()>;

    fn close(&mut self) -> OutputResult<()> {
        Ok(())
    }
}

/// An [`OutputHandler`] that drops every item.
pub struct NoopOutput;

impl OutputHandler for NoopOutput {
    fn handle(&mut self, _item: OutputItem) -> OutputResult<()> {
        Ok(())
    }
}

// ── MemoryOutput ──────────────────────────────────────────────────────────────

/// Collects items in memory.  Clone it before handing it to the builder and
/// read the items through the clone after the run.
#[derive(Clone, Default)]
pub struct MemoryOutput {
    items:  Arc<Mutex<Vec<OutputItem>>>,
    opened: Arc<Mutex<bool>>,
    closed: Arc<Mutex<bool>>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the items released so far.
    pub fn items(&self) -> Vec<OutputItem> {
        self.items.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn is_open(&self) -> bool {
        self.opened.lock().map(|o| *o).unwrap_or(false)
            && !self.closed.lock().map(|c| *c).unwrap_or(false)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }
}

impl OutputHandler for MemoryOutput {
    fn open(&mut self) -> OutputResult<()> {
        if let Ok(mut opened) = self.opened.lock() {
            *opened = true;
        }
        Ok(())
    }

    fn handle(&mut self, item: OutputItem) -> OutputResult<()> {
        if let Ok(mut items) = self.items.lock() {
            items.push(item);
        }
        Ok(())
    }

    fn close(&mut self) -> OutputResult<()> {
        if let Ok(mut closed) = self.closed.lock() {
            *closed = true;
        }
        Ok(())
    }
}

// ── CsvOutput ─────────────────────────────────────────────────────────────────

/// Writes each item as a CSV line.  Rows may have different lengths.
pub struct CsvOutput<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvOutput<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().flexible(true).from_writer(inner),
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> OutputResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }
}

impl CsvOutput<std::fs::File> {
    pub fn create(path: impl AsRef<std::path::Path>) -> OutputResult<Self> {
        Ok(Self::new(std::fs::File::create(path)?))
    }
}

impl<W: Write> OutputHandler for CsvOutput<W> {
    fn handle(&mut self, item: OutputItem) -> OutputResult<()> {
        let mut row = Vec::with_capacity(item.record.len() + 2);
        row.push(item.time.0.to_string());
        row.push(item.component.0.to_string());
        row.extend(item.record.iter().map(|label| match label {
            Label::Int(v) => v.to_string(),
            Label::Str(s) => s.clone(),
            Label::Bool(b) => b.to_string(),
            Label::Tag(t) => t.to_string(),
        }));
        self.writer.write_record(&row)?;
        Ok(())
    }

    fn close(&mut self) -> OutputResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}
