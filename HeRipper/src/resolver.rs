//! Heuristic resolution of encodings the data does not mark
//!
//! Two ambiguities exist: whether encoding 8/9 room images use lined or
//! unlined RLE, and whether two-colour costume components are lined RLE
//! or a bitstream. Each is settled by sampling the first few payloads of
//! the class and locking the majority.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::diagnostics::{DiagnosticKind, Diagnostics};

/// Payloads sampled before a decision locks.
pub const SAMPLE_BUDGET: u32 = 10;

/// A two-way ambiguity. `FIRST` wins ties.
pub trait Ambiguity: Copy + Eq + Debug {
    const FIRST: Self;
    const SECOND: Self;
    /// Name used in diagnostics.
    const CLASS: &'static str;
    /// Options that force the decision.
    const HINT: &'static str;
}

/// Row framing of encoding 8/9 run-length data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RleFraming {
    /// Each row starts with a little-endian byte count.
    Lined,
    /// One continuous run stream.
    Unlined,
}

impl Ambiguity for RleFraming {
    const FIRST: Self = RleFraming::Lined;
    const SECOND: Self = RleFraming::Unlined;
    const CLASS: &'static str = "RLE framing";
    const HINT: &'static str = "--force-lined-rle or --force-unlined-rle";
}

/// Encoding of two-colour costume components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwoColorMode {
    /// Lined RLE.
    Rle,
    /// Bitstream with 8-bit absolute colours.
    Bitmap,
}

impl Ambiguity for TwoColorMode {
    const FIRST: Self = TwoColorMode::Rle;
    const SECOND: Self = TwoColorMode::Bitmap;
    const CLASS: &'static str = "two-colour costume encoding";
    const HINT: &'static str = "--force-two-color-rle or --force-two-color-bitmap";
}

/// Sampling state for one ambiguity class.
#[derive(Debug, Clone)]
pub struct Resolver<T> {
    decision: Option<T>,
    first_votes: u32,
    second_votes: u32,
    budget: u32,
    forced: bool,
}

impl<T: Ambiguity> Default for Resolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ambiguity> Resolver<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            decision: None,
            first_votes: 0,
            second_votes: 0,
            budget: SAMPLE_BUDGET,
            forced: false,
        }
    }

    /// Resolver fixed to `choice`; it never samples.
    #[must_use]
    pub fn forced(choice: T) -> Self {
        Self {
            decision: Some(choice),
            forced: true,
            ..Self::new()
        }
    }

    pub fn from_override(choice: Option<T>) -> Self {
        choice.map_or_else(Self::new, Self::forced)
    }

    /// Current decision, if any payload has been sampled or it was forced.
    pub fn decision(&self) -> Option<T> {
        self.decision
    }

    /// The decision came from an override rather than sampling.
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    /// No further sampling will happen.
    pub fn is_locked(&self) -> bool {
        self.forced || self.budget == 0
    }

    pub fn remaining_samples(&self) -> u32 {
        if self.forced { 0 } else { self.budget }
    }

    /// Decide how to read the next ambiguous payload.
    ///
    /// While sampling, `first_fits` is evaluated once and its answer is
    /// counted as a vote. It is never evaluated once the resolver is locked.
    pub fn decide(&mut self, first_fits: impl FnOnce() -> bool, diag: &mut Diagnostics) -> T {
        if !self.is_locked() {
            if first_fits() {
                self.first_votes += 1;
            } else {
                self.second_votes += 1;
            }
            self.budget -= 1;

            let tentative = if self.first_votes >= self.second_votes {
                T::FIRST
            } else {
                T::SECOND
            };
            if self.decision.is_some_and(|previous| previous != tentative) {
                diag.warn(
                    DiagnosticKind::ResolverFlip,
                    None,
                    format!(
                        "changing {} to {tentative:?}; earlier images of this kind were probably decoded wrongly, try {}",
                        T::CLASS,
                        T::HINT
                    ),
                );
            }
            self.decision = Some(tentative);
            if self.budget == 0 {
                tracing::debug!(class = T::CLASS, decision = ?tentative, "resolver locked");
            }
        }
        self.decision.unwrap_or(T::FIRST)
    }
}

/// The two resolvers of one archive.
#[derive(Debug, Clone, Default)]
pub struct Resolvers {
    pub rle: Resolver<RleFraming>,
    pub two_color: Resolver<TwoColorMode>,
}

impl Resolvers {
    pub fn new(rle: Option<RleFraming>, two_color: Option<TwoColorMode>) -> Self {
        Self {
            rle: Resolver::from_override(rle),
            two_color: Resolver::from_override(two_color),
        }
    }
}
