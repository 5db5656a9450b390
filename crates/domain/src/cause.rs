//! Cause-chain traversal and external error flattening.

use crate::issue::Issue;
use std::error::Error;
use std::iter::FusedIterator;

/// Upper bound on links walked when rendering or flattening a chain.
pub const MAX_CAUSE_DEPTH: usize = 256;

/// Kind recorded for links flattened from a `std::error::Error`.
pub const STD_ERROR_KIND: &str = "std::error";

/// Iterator over an issue and its causes, newest first.
#[derive(Debug, Clone)]
pub struct Chain<'a> {
    next: Option<&'a Issue>,
}

impl<'a> Chain<'a> {
    pub(crate) const fn new(head: &'a Issue) -> Self {
        Self { next: Some(head) }
    }
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Issue;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

impl FusedIterator for Chain<'_> {}

/// Messages of an error and its `source()` chain, outermost first.
///
/// Stops after [`MAX_CAUSE_DEPTH`] entries.
pub fn error_chain_messages(error: &(dyn Error + 'static)) -> Vec<String> {
    let mut messages = Vec::new();
    let mut current = Some(error);
    while let Some(error) = current {
        if messages.len() == MAX_CAUSE_DEPTH {
            break;
        }
        messages.push(error.to_string());
        current = error.source();
    }
    messages
}
