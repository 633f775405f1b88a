//! Process-wide operating-state machine.
//!
//! The `StateMachine` holds the single authoritative [`OperatingState`] and
//! enforces the permitted-edge table atomically: a transition is a single
//! compare-exchange, so concurrent callers can never observe an illegal
//! edge or race one another into it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use cape_common::error::CapeError;
use cape_common::state::OperatingState;
use parking_lot::Mutex;
use tracing::{debug, info};

/// State-change listener invoked after every successful transition.
pub type StateListener = Arc<dyn Fn(OperatingState, OperatingState) + Send + Sync>;

/// The single process-wide operating-state machine.
///
/// Reads are lock-free atomic loads. Transitions validate the edge and
/// commit in one compare-exchange; on success the registered listener (at
/// most one) is invoked with the old and new state.
pub struct StateMachine {
    /// Current state, stored as the enum's `u8` discriminant.
    state: AtomicU8,
    /// At most one registered state-change listener.
    listener: Mutex<Option<StateListener>>,
}

impl StateMachine {
    /// Create a state machine in `Uninitialized`.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(OperatingState::Uninitialized as u8),
            listener: Mutex::new(None),
        }
    }

    /// Current operating state. Pure read, always succeeds.
    #[inline]
    pub fn state(&self) -> OperatingState {
        // The atomic only ever holds values stored from a valid enum.
        OperatingState::from_u8(self.state.load(Ordering::SeqCst))
            .unwrap_or(OperatingState::Exiting)
    }

    /// Attempt a transition to `target`.
    ///
    /// Succeeds only for permitted edges; fails with
    /// `CapeError::InvalidTransition` otherwise, leaving the state
    /// unchanged. The check and the commit are a single compare-exchange,
    /// retried if another thread transitions concurrently.
    pub fn set_state(&self, target: OperatingState) -> Result<(), CapeError> {
        let mut current = self.state();
        loop {
            if !current.can_transition_to(target) {
                return Err(CapeError::InvalidTransition {
                    from: current,
                    to: target,
                });
            }
            match self.state.compare_exchange(
                current as u8,
                target as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    info!("State transition: {current} -> {target}");
                    self.notify(current, target);
                    return Ok(());
                }
                Err(observed) => {
                    // Lost the race; re-evaluate the edge from the new state.
                    current = OperatingState::from_u8(observed)
                        .unwrap_or(OperatingState::Exiting);
                    debug!("State transition retry from {current}");
                }
            }
        }
    }

    /// Register the state-change listener, replacing any previous one.
    ///
    /// Used by the lifecycle manager to observe entry into `Exiting`.
    pub fn set_listener(&self, listener: StateListener) {
        *self.listener.lock() = Some(listener);
    }

    /// Fail with `NotRunning` unless read-only peripheral access is permitted.
    #[inline]
    pub fn check_read_allowed(&self) -> Result<(), CapeError> {
        let state = self.state();
        if state.permits_read() {
            Ok(())
        } else {
            Err(CapeError::NotRunning { state })
        }
    }

    /// Fail with `NotRunning` unless actuation is permitted.
    #[inline]
    pub fn check_actuation_allowed(&self) -> Result<(), CapeError> {
        let state = self.state();
        if state.permits_actuation() {
            Ok(())
        } else {
            Err(CapeError::NotRunning { state })
        }
    }

    /// Invoke the listener outside the lock so it may call back into the
    /// state machine without deadlocking.
    fn notify(&self, from: OperatingState, to: OperatingState) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(from, to);
        }
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
