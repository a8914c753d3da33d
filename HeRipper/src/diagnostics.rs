//! Run-scoped warning and error events
//!
//! Parsing never halts on a recoverable anomaly. Each one is recorded here,
//! forwarded to `tracing`, and counted; the counts are surfaced in
//! [`RipResults`](crate::rip::RipResults).

use std::fmt;

use serde::Serialize;

use crate::error::Error;

/// How serious a recorded event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Classification of recoverable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Header does not match the family expected at this position.
    StructuralMismatch,
    /// Tag outside the family's vocabulary, skipped by declared length.
    UnknownTag,
    /// Declared length or a read crosses the end of the buffer.
    TruncatedPayload,
    /// Sequence component dropped for its offset or index.
    OutOfRangeComponent,
    /// Encoding selector, colour count or opcode with no decoder.
    UnsupportedEncoding,
    /// Object image without a matching object header.
    MissingObjectHeader,
    /// Heuristic resolver changed its tentative decision mid-sampling.
    ResolverFlip,
    /// Sound chunk without the usual DIGI/TALK framing.
    MisheaderedSound,
}

impl DiagnosticKind {
    /// Map a parse error onto the event kind it is reported as.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::TruncatedPayload { .. } => DiagnosticKind::TruncatedPayload,
            Error::UnsupportedEncoding(_) | Error::InvalidColorCount(_) => {
                DiagnosticKind::UnsupportedEncoding
            }
            _ => DiagnosticKind::StructuralMismatch,
        }
    }
}

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    /// Absolute byte offset in the decoded archive, when known.
    pub offset: Option<usize>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "[{offset:#x}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Collector for every event raised while ripping one archive.
#[derive(Debug, Default)]
pub struct Diagnostics {
    events: Vec<Diagnostic>,
    warnings: usize,
    errors: usize,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning.
    pub fn warn(&mut self, kind: DiagnosticKind, offset: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(?kind, offset, "{message}");
        self.warnings += 1;
        self.events.push(Diagnostic {
            severity: Severity::Warning,
            kind,
            offset,
            message,
        });
    }

    /// Record an error. The walk still continues.
    pub fn error(&mut self, kind: DiagnosticKind, offset: Option<usize>, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(?kind, offset, "{message}");
        self.errors += 1;
        self.events.push(Diagnostic {
            severity: Severity::Error,
            kind,
            offset,
            message,
        });
    }

    /// Record a parse error raised by a sub-record.
    pub fn record(&mut self, err: &Error, offset: Option<usize>) {
        self.error(DiagnosticKind::for_error(err), offset, err.to_string());
    }

    pub fn warnings(&self) -> usize {
        self.warnings
    }

    pub fn errors(&self) -> usize {
        self.errors
    }

    pub fn events(&self) -> &[Diagnostic] {
        &self.events
    }

    /// Number of recorded events of one kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.events.iter().filter(|d| d.kind == kind).count()
    }
}
