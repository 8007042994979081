// Copyright 2025 the Opshuffle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Destinations for a finished schedule.

use alloc::string::String;
use alloc::vec::Vec;
use core::convert::Infallible;

/// Receives the reordered program.
///
/// ```
/// use opshuffle::Sink;
///
/// let mut out: Vec<String> = Vec::new();
/// out.accept(&["a = f(x)".to_string()]).unwrap();
/// assert_eq!(out, ["a = f(x)"]);
/// ```
pub trait Sink {
    /// Error raised while writing.
    type Error;

    /// Accepts lines in emission order.
    ///
    /// # Errors
    ///
    /// Implementation defined.
    fn accept(&mut self, lines: &[String]) -> Result<(), Self::Error>;
}

impl Sink for Vec<String> {
    type Error = Infallible;

    fn accept(&mut self, lines: &[String]) -> Result<(), Self::Error> {
        self.extend_from_slice(lines);
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    type Error = S::Error;

    fn accept(&mut self, lines: &[String]) -> Result<(), Self::Error> {
        (**self).accept(lines)
    }
}
