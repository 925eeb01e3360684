//! Streaming session state.
//!
//! A streaming call moves through
//!
//! ```text
//! Selecting → Streaming(p) → [FallbackSelecting → Streaming(q)]? → Completing → Terminal
//! ```
//!
//! `FallbackSelecting` is only reachable while no token has been forwarded,
//! and nothing leaves `Terminal`.

use gateway_core::{GenerationResult, ProviderIdentity};
use parking_lot::Mutex;

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// `Done` was emitted
    Done,
    /// `Error` was emitted
    Error,
    /// The consumer dropped or cancelled the stream first
    Cancelled,
}

/// Phase of a streaming call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Choosing the first provider
    Selecting,
    /// Forwarding fragments from a provider
    Streaming(ProviderIdentity),
    /// Primary failed before any token; switching provider
    FallbackSelecting,
    /// Provider finished; guardrail running
    Completing,
    /// Ended
    Terminal(Terminal),
}

impl StreamPhase {
    /// Whether the stream has ended
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Whether moving to `next` is a legal transition given the number of
    /// tokens already forwarded
    #[must_use]
    pub fn can_advance(self, next: Self, tokens_delivered: usize) -> bool {
        match (self, next) {
            (Self::Terminal(_), _) => false,
            (_, Self::Terminal(_)) => true,
            (Self::Selecting | Self::FallbackSelecting, Self::Streaming(_)) => true,
            (Self::Streaming(_), Self::FallbackSelecting) => tokens_delivered == 0,
            (Self::Streaming(_), Self::Completing) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    phase: StreamPhase,
    tokens_delivered: usize,
    outcome: Option<GenerationResult>,
}

/// State shared between a stream's producer and its handle
#[derive(Debug)]
pub(crate) struct SessionTracker {
    state: Mutex<SessionState>,
}

impl SessionTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(SessionState {
                phase: StreamPhase::Selecting,
                tokens_delivered: 0,
                outcome: None,
            }),
        }
    }

    /// Move to `next`; illegal transitions leave the phase unchanged
    pub(crate) fn advance(&self, next: StreamPhase) -> bool {
        let mut state = self.state.lock();
        if state.phase.can_advance(next, state.tokens_delivered) {
            state.phase = next;
            true
        } else {
            tracing::error!(from = ?state.phase, to = ?next, "Illegal stream transition");
            false
        }
    }

    pub(crate) fn record_token(&self) -> usize {
        let mut state = self.state.lock();
        state.tokens_delivered += 1;
        state.tokens_delivered
    }

    pub(crate) fn complete(&self, result: GenerationResult) {
        let mut state = self.state.lock();
        state.outcome = Some(result);
    }

    /// Mark the stream cancelled unless it already ended.
    ///
    /// Returns the token count when this call performed the cancellation.
    pub(crate) fn cancel(&self) -> Option<usize> {
        let mut state = self.state.lock();
        if state.phase.is_terminal() {
            None
        } else {
            state.phase = StreamPhase::Terminal(Terminal::Cancelled);
            Some(state.tokens_delivered)
        }
    }

    pub(crate) fn phase(&self) -> StreamPhase {
        self.state.lock().phase
    }

    pub(crate) fn tokens_delivered(&self) -> usize {
        self.state.lock().tokens_delivered
    }

    pub(crate) fn outcome(&self) -> Option<GenerationResult> {
        self.state.lock().outcome.clone()
    }
}
