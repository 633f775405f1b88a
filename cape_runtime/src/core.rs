//! Cape runtime facade and process-wide singleton assembly.
//!
//! `CapeCore` is the single entry point language bindings wrap: it owns
//! the state machine, the peripheral registry, and the lifecycle manager,
//! and guarantees at most one instance per process. Dropping it runs the
//! shutdown sequence, so hardware is released on normal exit without any
//! exit-hook mechanism; the signal path reaches the same idempotent
//! sequence through the lifecycle manager.

use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cape_common::config::PeripheralConfig;
use cape_common::driver::BoardDriver;
use cape_common::error::CapeError;
use cape_common::peripheral::{PeripheralId, Value};
use cape_common::state::OperatingState;
use tracing::info;

use crate::lifecycle::LifecycleManager;
use crate::registry::{Handle, PeripheralRegistry};
use crate::state_machine::StateMachine;

/// Set by the first successful `CapeCore::init` and never cleared while an
/// instance lives; a second init in the same process is rejected.
static CAPE_TAKEN: AtomicBool = AtomicBool::new(false);

/// The assembled cape runtime.
///
/// All peripheral access flows through this facade; there is no bypass
/// channel to the state machine or the registry.
pub struct CapeCore {
    state: Arc<StateMachine>,
    registry: Arc<PeripheralRegistry>,
    lifecycle: Arc<LifecycleManager>,
}

impl CapeCore {
    /// Initialize the cape runtime with the given board driver.
    ///
    /// Brings up the driver, assembles the singletons, and transitions
    /// `Uninitialized → Running`. Fails with `InitFailed` if another
    /// instance already exists in this process; in that case, or if the
    /// driver fails to come up, no hardware is left enabled.
    pub fn init(mut driver: Box<dyn BoardDriver>) -> Result<Self, CapeError> {
        if CAPE_TAKEN.swap(true, Ordering::SeqCst) {
            return Err(CapeError::InitFailed(
                "cape runtime already initialized in this process".to_string(),
            ));
        }

        info!("Initializing cape runtime with driver '{}'", driver.name());
        if let Err(e) = driver.init() {
            // Nothing was claimed; allow a retry with a different driver.
            CAPE_TAKEN.store(false, Ordering::SeqCst);
            return Err(e);
        }
        info!("Driver up: {} v{}", driver.name(), driver.version());

        let state = Arc::new(StateMachine::new());
        let registry = Arc::new(PeripheralRegistry::new(Arc::clone(&state), driver));
        let lifecycle = LifecycleManager::new(Arc::clone(&state), Arc::clone(&registry));

        state.set_state(OperatingState::Running)?;
        info!("Cape runtime initialized");

        Ok(Self {
            state,
            registry,
            lifecycle,
        })
    }

    /// Current operating state.
    pub fn state(&self) -> OperatingState {
        self.state.state()
    }

    /// Request a state transition (pause, resume, or begin shutdown).
    pub fn set_state(&self, target: OperatingState) -> Result<(), CapeError> {
        self.state.set_state(target)
    }

    /// Claim a peripheral by identity.
    pub fn claim(&self, id: PeripheralId) -> Result<Handle, CapeError> {
        self.registry.claim(id)
    }

    /// Read the current value of a claimed peripheral.
    pub fn read(&self, handle: &Handle) -> Result<Value, CapeError> {
        self.registry.read(handle)
    }

    /// Write a value to a claimed peripheral.
    pub fn write(&self, handle: &Handle, value: Value) -> Result<(), CapeError> {
        self.registry.write(handle, value)
    }

    /// Blink an LED at `hz` for `duration`, leaving it off afterwards.
    ///
    /// Blocking convenience over [`write`](Self::write): each toggle goes
    /// through the actuation gate, so a pause or shutdown mid-pattern
    /// surfaces as `NotRunning` and stops the blinking immediately.
    pub fn blink(
        &self,
        handle: &Handle,
        hz: NonZeroU32,
        duration: Duration,
    ) -> Result<(), CapeError> {
        let half_period = Duration::from_secs_f64(0.5 / hz.get() as f64);
        let toggles = (duration.as_secs_f64() * hz.get() as f64 * 2.0).round() as u64;

        let mut level = false;
        for _ in 0..toggles {
            level = !level;
            self.registry.write(handle, Value::Level(level))?;
            std::thread::sleep(half_period);
        }
        self.registry.write(handle, Value::Level(false))
    }

    /// Release a claimed peripheral. Idempotent.
    pub fn release(&self, handle: &Handle) {
        self.registry.release(handle)
    }

    /// Apply a validated configuration to a claimed peripheral.
    pub fn apply_config(&self, handle: &Handle, config: PeripheralConfig) -> Result<(), CapeError> {
        self.registry.apply_config(handle, config)
    }

    /// Clear a peripheral's configuration so a new one may be applied.
    pub fn reset(&self, handle: &Handle) -> Result<(), CapeError> {
        self.registry.reset(handle)
    }

    /// Last-known cached value for a claimed peripheral.
    pub fn cached_value(&self, handle: &Handle) -> Result<Option<Value>, CapeError> {
        self.registry.cached_value(handle)
    }

    /// The lifecycle manager, for signal-handler installation.
    pub fn lifecycle(&self) -> Arc<LifecycleManager> {
        Arc::clone(&self.lifecycle)
    }

    /// Run the shutdown sequence. Idempotent with every other trigger.
    pub fn shutdown(&self) {
        self.lifecycle.on_shutdown()
    }
}

impl Drop for CapeCore {
    fn drop(&mut self) {
        // Normal-exit path of the release-on-exit guarantee.
        self.lifecycle.on_shutdown();
    }
}
