//! Board driver catalog.
//!
//! Maps driver names to factories. The catalog is built once at startup —
//! `drivers::register_all_drivers` fills it with every compiled-in
//! factory — and consulted a single time to instantiate the driver the
//! peripheral registry will own. Plain data passed by the caller; no
//! global state, no lazy initialization.

use std::collections::HashMap;

use cape_common::driver::{BoardDriver, DriverFactory};
use cape_common::error::CapeError;

/// Name-to-factory table of the compiled-in board drivers.
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Empty catalog.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Add a factory under `name`.
    ///
    /// Names are unique: a second registration under the same name fails
    /// with `DriverAlreadyRegistered` and leaves the first factory in
    /// place.
    pub fn register(
        &mut self,
        name: &'static str,
        factory: DriverFactory,
    ) -> Result<(), CapeError> {
        if self.factories.contains_key(name) {
            return Err(CapeError::DriverAlreadyRegistered(name.to_string()));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Instantiate the named driver.
    ///
    /// # Errors
    /// `DriverNotFound` if no factory was registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn BoardDriver>, CapeError> {
        match self.factories.get(name) {
            Some(factory) => Ok(factory()),
            None => Err(CapeError::DriverNotFound(name.to_string())),
        }
    }

    /// Registered names, sorted for stable log output.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
