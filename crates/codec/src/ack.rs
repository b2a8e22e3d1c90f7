//! Acknowledgement tracking and the terminal completion protocol.
//!
//! Every message yielded by a [`crate::Reader`] carries an [`Ack`]. The
//! shared tracker counts outstanding acknowledgements, latches the first
//! error it observes, and fires the caller-supplied terminal callback
//! exactly once: when end-of-input has been seen and nothing remains
//! outstanding, or immediately when the reader is closed early.

use crate::CodecError;
use std::sync::{Arc, Mutex};

/// The single upstream completion signal. Invoked exactly once per reader
/// with `None` on success, the first acknowledgement error otherwise, or
/// [`CodecError::ServiceShuttingDown`] when the reader was closed before
/// its input was exhausted.
pub type TerminalCallback = Box<dyn FnOnce(Option<CodecError>) + Send>;

pub(crate) struct AckTracker {
    state: Mutex<State>,
}

struct State {
    outstanding: usize,
    end_seen: bool,
    shutdown: bool,
    latched: Option<CodecError>,
    terminal: Option<TerminalCallback>,
}

impl AckTracker {
    pub(crate) fn new(terminal: TerminalCallback) -> Arc<AckTracker> {
        Arc::new(AckTracker {
            state: Mutex::new(State {
                outstanding: 0,
                end_seen: false,
                shutdown: false,
                latched: None,
                terminal: Some(terminal),
            }),
        })
    }

    /// Registers one outstanding acknowledgement and returns its one-shot
    /// handle.
    pub(crate) fn register(self: &Arc<AckTracker>) -> Ack {
        let mut state = self.state.lock().unwrap();
        state.outstanding += 1;
        Ack {
            tracker: self.clone(),
        }
    }

    /// Records that the decoder reached end-of-input. If nothing is
    /// outstanding the terminal callback fires now; otherwise the final
    /// acknowledgement fires it.
    pub(crate) fn mark_end(&self) {
        let fire = {
            let mut state = self.state.lock().unwrap();
            if state.end_seen {
                return;
            }
            state.end_seen = true;
            if state.outstanding == 0 {
                state.take_terminal()
            } else {
                None
            }
        };
        dispatch(fire);
    }

    /// Sticky shutdown, run when the reader closes. Closing before
    /// end-of-input completes the stream with `ServiceShuttingDown` (or the
    /// first real error, if one was already latched); closing afterwards
    /// leaves completion to the outstanding acknowledgements.
    pub(crate) fn shutdown(&self) {
        let fire = {
            let mut state = self.state.lock().unwrap();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            if !state.end_seen {
                let outcome = state
                    .latched
                    .take()
                    .unwrap_or(CodecError::ServiceShuttingDown);
                state.terminal.take().map(|t| (t, Some(outcome)))
            } else {
                None
            }
        };
        dispatch(fire);
    }

    fn resolve(&self, err: Option<CodecError>) -> Result<(), CodecError> {
        let (fire, result) = {
            let mut state = self.state.lock().unwrap();
            state.outstanding = state.outstanding.saturating_sub(1);
            if state.latched.is_none() {
                state.latched = err;
            }
            let result = if state.shutdown && !state.end_seen {
                Err(CodecError::ServiceShuttingDown)
            } else {
                Ok(())
            };
            let fire = if state.end_seen && state.outstanding == 0 {
                state.take_terminal()
            } else {
                None
            };
            (fire, result)
        };
        dispatch(fire);
        result
    }
}

impl State {
    /// Takes the callback and its outcome. The callback is invoked outside
    /// the lock; taking it here is what makes the terminal fire-once.
    fn take_terminal(&mut self) -> Option<(TerminalCallback, Option<CodecError>)> {
        let outcome = self.latched.take();
        self.terminal.take().map(|t| (t, outcome))
    }
}

fn dispatch(fire: Option<(TerminalCallback, Option<CodecError>)>) {
    if let Some((terminal, outcome)) = fire {
        tracing::debug!(success = outcome.is_none(), "stream reached terminal state");
        terminal(outcome);
    }
}

/// One-shot acknowledgement for a single message.
///
/// Resolution consumes the handle, so acknowledging twice is impossible.
/// Handles may be resolved in any order, from any thread, before or after
/// the reader closes.
pub struct Ack {
    tracker: Arc<AckTracker>,
}

impl Ack {
    /// Acknowledges the message, negatively when `err` is given. The first
    /// non-`None` error across all acknowledgements becomes the terminal
    /// outcome. Returns `ServiceShuttingDown` if the reader was closed
    /// before its input was exhausted.
    pub fn resolve(self, err: Option<CodecError>) -> Result<(), CodecError> {
        self.tracker.resolve(err)
    }

    /// Positive acknowledgement.
    pub fn ok(self) -> Result<(), CodecError> {
        self.resolve(None)
    }
}
