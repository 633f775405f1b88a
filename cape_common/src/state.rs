//! Operating-state enum and the permitted-edge table.
//!
//! `OperatingState` uses `#[repr(u8)]` for compact layout and stable
//! numeric codes across the language-binding boundary. There is exactly
//! one operating state per process; the runtime crate owns the single
//! `StateMachine` instance that holds it.

use serde::{Deserialize, Serialize};

/// Global operating state of the cape runtime.
///
/// Only one `OperatingState` is active at any time. Transitions are
/// restricted to the edges listed in [`OperatingState::can_transition_to`];
/// `Exiting` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OperatingState {
    /// Initial state before the board has been initialized.
    Uninitialized = 0,
    /// Board initialized, peripherals may be actuated.
    Running = 1,
    /// Temporarily halted — read-only peripheral access remains permitted.
    Paused = 2,
    /// Shutdown in progress or complete. Terminal.
    Exiting = 3,
}

impl OperatingState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Uninitialized),
            1 => Some(Self::Running),
            2 => Some(Self::Paused),
            3 => Some(Self::Exiting),
            _ => None,
        }
    }

    /// Returns true if the edge `self → target` is a permitted transition.
    ///
    /// Permitted edges:
    /// - `Uninitialized → Running` (successful init)
    /// - `Running ↔ Paused` (pause toggle or explicit request)
    /// - `Running → Exiting`, `Paused → Exiting` (shutdown request)
    ///
    /// Everything else, including self-edges and any edge out of
    /// `Exiting`, is rejected.
    #[inline]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (*self, target),
            (Self::Uninitialized, Self::Running)
                | (Self::Running, Self::Paused)
                | (Self::Paused, Self::Running)
                | (Self::Running, Self::Exiting)
                | (Self::Paused, Self::Exiting)
        )
    }

    /// Returns true if read-only peripheral queries are permitted.
    #[inline]
    pub const fn permits_read(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Returns true if peripheral actuation (writes) is permitted.
    #[inline]
    pub const fn permits_actuation(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl Default for OperatingState {
    fn default() -> Self {
        Self::Uninitialized
    }
}

impl std::fmt::Display for OperatingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Exiting => "EXITING",
        };
        write!(f, "{name}")
    }
}
