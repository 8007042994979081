// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reading the program text.

use std::io::{self, BufRead, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;

/// Where the program comes from.
#[derive(Debug, Clone)]
pub(crate) enum Source {
    File(PathBuf),
    Stdin,
}

impl Source {
    /// Reads the whole program.
    ///
    /// Interactive standard input (console mode) ends at the first empty line;
    /// piped input is read to the end.
    pub(crate) fn read(&self) -> Result<String> {
        match self {
            Self::File(path) => {
                debug!(path = %path.display(), "reading program file");
                std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))
            }
            Self::Stdin => {
                let stdin = io::stdin();
                if stdin.is_terminal() {
                    eprintln!("Enter operations, one per line. Finish with an empty line.");
                    read_until_blank(stdin.lock()).context("failed to read standard input")
                } else {
                    let mut text = String::new();
                    stdin
                        .lock()
                        .read_to_string(&mut text)
                        .context("failed to read standard input")?;
                    Ok(text)
                }
            }
        }
    }
}

/// Collects lines until the first empty one (or end of input).
fn read_until_blank(reader: impl BufRead) -> io::Result<String> {
    let mut text = String::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}
