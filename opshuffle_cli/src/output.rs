// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Writing the reordered program.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use opshuffle::Sink;

/// Sink writing one line per operation to any writer.
#[derive(Debug)]
pub(crate) struct WriterSink<W: Write> {
    writer: W,
}

impl WriterSink<Box<dyn Write>> {
    /// Opens `path` for writing, or standard output when `None`.
    pub(crate) fn open(path: Option<&Path>) -> Result<Self> {
        let writer: Box<dyn Write> = match path {
            Some(path) => Box::new(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("failed to create {}", path.display()))?,
            )),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        };
        Ok(Self::new(writer))
    }
}

impl<W: Write> WriterSink<W> {
    pub(crate) fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriterSink<W> {
    type Error = io::Error;

    fn accept(&mut self, lines: &[String]) -> Result<(), Self::Error> {
        for line in lines {
            writeln!(self.writer, "{line}")?;
        }
        self.writer.flush()
    }
}
