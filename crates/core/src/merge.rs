//! Merging of styled text fragments into logical lines.
//!
//! Consecutive fragments that share font, font size and origin are treated
//! as one run. A line is emitted each time the style changes. Each fragment
//! is compared against the fragment that opened the current run, so the
//! accumulator keeps its original style while content is appended.
//!
//! By default the accumulator starts as an empty sentinel fragment that is
//! compared like any other, and the last open run is dropped at end of
//! input. Both behaviours are configurable.

use crate::types::TextFragment;

/// What to do with the open accumulator when the input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FinalFlush {
    /// Discard the last run.
    #[default]
    Drop,
    /// Emit the last run as a line.
    Emit,
}

/// How the initial accumulator is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SentinelMode {
    /// Start from an empty fragment and compare it like a real one.
    ///
    /// The first non-matching fragment flushes an empty line, and a first
    /// fragment with empty font at size 0 and origin (0, 0) merges into it.
    #[default]
    Compare,
    /// The first fragment opens the accumulator without emitting anything.
    Seed,
}

/// Merges fragments into lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunMerger {
    final_flush: FinalFlush,
    sentinel: SentinelMode,
}

impl RunMerger {
    /// Create a merger with the default drop-last and sentinel-compare behaviour.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the end-of-input behaviour.
    pub fn with_final_flush(mut self, final_flush: FinalFlush) -> Self {
        self.final_flush = final_flush;
        self
    }

    /// Set how the initial accumulator is treated.
    pub fn with_sentinel(mut self, sentinel: SentinelMode) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// The end-of-input behaviour.
    pub fn final_flush(&self) -> FinalFlush {
        self.final_flush
    }

    /// How the initial accumulator is treated.
    pub fn sentinel(&self) -> SentinelMode {
        self.sentinel
    }

    /// Merge an ordered sequence of fragments into lines.
    pub fn merge(&self, fragments: &[TextFragment]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = fragments.iter();

        let mut current = match self.sentinel {
            SentinelMode::Compare => TextFragment::default(),
            SentinelMode::Seed => match rest.next() {
                Some(first) => first.clone(),
                None => return lines,
            },
        };
        let mut consumed = self.sentinel == SentinelMode::Seed;

        for fragment in rest {
            consumed = true;
            if fragment.is_same_sentence(&current) {
                current.content.push_str(&fragment.content);
            } else {
                lines.push(std::mem::replace(&mut current, fragment.clone()).content);
            }
        }

        if self.final_flush == FinalFlush::Emit && consumed {
            lines.push(current.content);
        }

        lines
    }
}

/// Merge fragments with the default behaviour.
pub fn merge(fragments: &[TextFragment]) -> Vec<String> {
    RunMerger::new().merge(fragments)
}
