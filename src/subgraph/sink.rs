// src/subgraph/sink.rs
//! Output destinations for extracted edges.

use crate::model::Edge;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// An append-only destination for `(source, target)` rows.
///
/// Implementations may buffer; rows are only guaranteed durable after
/// [`EdgeSink::flush`] returns.
pub trait EdgeSink: Send {
    fn write_edge(&mut self, edge: &Edge) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Writes one `source<delim>target` line per edge.
pub struct DelimitedEdgeWriter<W: Write> {
    inner: BufWriter<W>,
    delimiter: char,
}

impl DelimitedEdgeWriter<File> {
    /// Creates (or truncates) a comma-delimited file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> DelimitedEdgeWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_delimiter(writer, ',')
    }

    pub fn with_delimiter(writer: W, delimiter: char) -> Self {
        Self {
            inner: BufWriter::new(writer),
            delimiter,
        }
    }

    /// Flushes and hands back the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.inner.into_inner().map_err(|e| e.into_error())
    }
}

impl<W: Write + Send> EdgeSink for DelimitedEdgeWriter<W> {
    fn write_edge(&mut self, edge: &Edge) -> io::Result<()> {
        writeln!(self.inner, "{}{}{}", edge.source, self.delimiter, edge.target)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EntityId;

    #[test]
    fn rows_are_delimited_lines() {
        let mut writer = DelimitedEdgeWriter::with_delimiter(Vec::new(), '\t');
        writer
            .write_edge(&Edge::new(EntityId::new(1), EntityId::new(2)))
            .unwrap();
        writer
            .write_edge(&Edge::new(EntityId::new(1), EntityId::new(3)))
            .unwrap();
        writer.flush().unwrap();

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert_eq!(text, "1\t2\n1\t3\n");
    }
}
