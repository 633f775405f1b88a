//! # Cape Runtime Library
//!
//! Runtime core for a robotics single-board-computer extension board:
//! a single process-wide operating-state machine, a peripheral registry
//! built on it, and a lifecycle contract guaranteeing hardware is released
//! exactly once regardless of how the process exits.
//!
//! # Module Structure
//!
//! - [`state_machine`] - The authoritative operating state and its edges
//! - [`registry`] - Peripheral claim tracking and gated hardware access
//! - [`lifecycle`] - Shutdown wiring and the at-most-once registry drain
//! - [`core`] - `CapeCore` facade assembling the process singletons
//! - [`driver_registry`] - Board driver factory registration
//! - [`drivers`] - Board driver implementations
//!
//! # Architecture
//!
//! ```text
//! application ──► CapeCore ──► StateMachine (gate) ──► PeripheralRegistry ──► BoardDriver
//!                    │                 ▲                        │
//!                    └──── Drop ───────┴──── LifecycleManager ──┘
//!                          (signals, exit, explicit shutdown → drain once)
//! ```

#![deny(warnings)]
#![deny(missing_docs)]

pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod lifecycle;
pub mod registry;
pub mod state_machine;

// Re-export key types for convenience
pub use crate::core::CapeCore;
pub use crate::driver_registry::DriverRegistry;
pub use crate::lifecycle::LifecycleManager;
pub use crate::registry::{Handle, PeripheralRegistry};
pub use crate::state_machine::StateMachine;
