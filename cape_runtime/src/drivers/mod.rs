//! Board driver implementations.
//!
//! This module contains all board driver implementations:
//!
//! - [`simulation`] - Software simulation driver for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `BoardDriver` trait from `cape_common::driver`
//! 3. Register the driver in [`register_all_drivers`]

pub mod simulation;

use cape_common::error::CapeError;

use crate::driver_registry::DriverRegistry;

/// Register all built-in drivers into the given catalog.
///
/// # Errors
/// `DriverAlreadyRegistered` if a name collides, which for the built-in
/// set would be a programming error caught at startup.
pub fn register_all_drivers(registry: &mut DriverRegistry) -> Result<(), CapeError> {
    registry.register("simulation", simulation::create_driver)?;

    // A memory-mapped hardware driver for the physical cape registers here
    // once board bring-up is done:
    // registry.register("mmio", mmio::create_driver)?;

    Ok(())
}
