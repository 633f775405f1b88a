//! Peripheral registry — claim tracking and gated hardware access.
//!
//! The registry owns the board driver and the claim map. Every hardware
//! access goes: state gate → handle/claim check → driver call, all under
//! one lock acquisition, so there is no suspension point between the gate
//! check and the hardware access it authorizes.

use std::collections::HashMap;
use std::sync::Arc;

use cape_common::config::PeripheralConfig;
use cape_common::driver::BoardDriver;
use cape_common::error::CapeError;
use cape_common::peripheral::{PeripheralId, Value};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::state_machine::StateMachine;

/// Claim token handed to application code.
///
/// A handle never grants direct hardware access; it is presented back to
/// the registry, which verifies the claim is still live via the generation
/// counter. Handles outlive releases harmlessly — a stale handle fails
/// with `NotClaimed` on use and is a no-op on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    id: PeripheralId,
    generation: u64,
}

impl Handle {
    /// Identity this handle was claimed for.
    #[inline]
    pub fn id(&self) -> PeripheralId {
        self.id
    }
}

/// Per-peripheral claim slot.
#[derive(Debug, Default)]
struct Slot {
    /// True while a live handle owns this peripheral.
    claimed: bool,
    /// Bumped on every successful claim; stale handles carry old values.
    generation: u64,
    /// True once a configuration has been applied (stateful peripherals).
    initialized: bool,
    /// Last value read from or written to the peripheral.
    last_value: Option<Value>,
}

/// Everything that must be mutated atomically: the driver and the claim map.
struct Inner {
    driver: Box<dyn BoardDriver>,
    slots: HashMap<PeripheralId, Slot>,
}

/// Process-wide peripheral registry.
///
/// Claim, read, write, and release on the same identity are serialized by
/// the inner lock, so concurrent claim attempts resolve to exactly one
/// winner. The operating state is consulted through the shared
/// [`StateMachine`] on every mutating operation.
pub struct PeripheralRegistry {
    state: Arc<StateMachine>,
    inner: Mutex<Inner>,
}

impl PeripheralRegistry {
    /// Create a registry over an already-initialized board driver.
    pub fn new(state: Arc<StateMachine>, driver: Box<dyn BoardDriver>) -> Self {
        Self {
            state,
            inner: Mutex::new(Inner {
                driver,
                slots: HashMap::new(),
            }),
        }
    }

    /// Claim a peripheral by identity.
    ///
    /// Fails with `AlreadyClaimed` if a live handle owns it, and with
    /// `NotRunning` outside the RUNNING/PAUSED states (claims mark
    /// ownership of hardware, so they are barred once shutdown begins).
    pub fn claim(&self, id: PeripheralId) -> Result<Handle, CapeError> {
        let mut inner = self.inner.lock();
        self.state.check_read_allowed()?;

        let slot = inner.slots.entry(id).or_default();
        if slot.claimed {
            return Err(CapeError::AlreadyClaimed { id });
        }
        slot.claimed = true;
        slot.generation += 1;
        debug!("Claimed {id} (generation {})", slot.generation);
        Ok(Handle {
            id,
            generation: slot.generation,
        })
    }

    /// Read the current value of a claimed peripheral.
    ///
    /// Permitted while RUNNING or PAUSED. Button and LED readings are
    /// cached as the last-known value.
    pub fn read(&self, handle: &Handle) -> Result<Value, CapeError> {
        let mut inner = self.inner.lock();
        // Gate and hardware access under the same lock acquisition: a
        // shutdown that wins the lock first is observed here, and one that
        // loses it waits until this read has completed.
        self.state.check_read_allowed()?;
        inner.check_live(handle)?;
        // Stateful sensors are unreadable until a configuration has been
        // applied; the driver never sees the attempt.
        if handle.id.requires_config()
            && !inner.slots.get(&handle.id).is_some_and(|s| s.initialized)
        {
            return Err(CapeError::NotInitialized { id: handle.id });
        }

        let value = inner.driver.read(handle.id)?;
        inner.cache(handle.id, value);
        Ok(value)
    }

    /// Write a value to a claimed peripheral.
    ///
    /// Permitted only while RUNNING, and only for identities with actuation
    /// support.
    pub fn write(&self, handle: &Handle, value: Value) -> Result<(), CapeError> {
        let mut inner = self.inner.lock();
        self.state.check_actuation_allowed()?;
        inner.check_live(handle)?;
        if !handle.id.supports_actuation() {
            return Err(CapeError::NotActuator { id: handle.id });
        }

        inner.driver.write(handle.id, &value)?;
        inner.cache(handle.id, value);
        Ok(())
    }

    /// Apply a validated configuration to a claimed peripheral.
    ///
    /// Initialization of a stateful peripheral is `claim` followed by this.
    /// A second application without [`reset`](Self::reset) fails with
    /// `AlreadyInitialized`.
    pub fn apply_config(
        &self,
        handle: &Handle,
        config: PeripheralConfig,
    ) -> Result<(), CapeError> {
        let mut inner = self.inner.lock();
        self.state.check_actuation_allowed()?;
        inner.check_live(handle)?;
        let applies = match config {
            PeripheralConfig::Barometer(_) => handle.id == PeripheralId::Barometer,
        };
        if !applies {
            return Err(CapeError::ConfigNotApplicable { id: handle.id });
        }

        if inner
            .slots
            .get(&handle.id)
            .is_some_and(|s| s.initialized)
        {
            return Err(CapeError::AlreadyInitialized { id: handle.id });
        }
        inner.driver.configure(handle.id, &config)?;
        // Mark initialized only after the hardware accepted the config.
        if let Some(slot) = inner.slots.get_mut(&handle.id) {
            slot.initialized = true;
        }
        info!("Configured {id}", id = handle.id);
        Ok(())
    }

    /// Clear the initialized flag so a new configuration may be applied.
    pub fn reset(&self, handle: &Handle) -> Result<(), CapeError> {
        let mut inner = self.inner.lock();
        inner.check_live(handle)?;
        if let Some(slot) = inner.slots.get_mut(&handle.id) {
            slot.initialized = false;
        }
        Ok(())
    }

    /// Release a claimed peripheral.
    ///
    /// Idempotent and total: releasing a stale or already-released handle
    /// is a no-op, never an error. Drain relies on this to release
    /// unconditionally without knowing prior release history.
    pub fn release(&self, handle: &Handle) {
        let mut inner = self.inner.lock();
        let live = inner
            .slots
            .get(&handle.id)
            .is_some_and(|s| s.claimed && s.generation == handle.generation);
        if !live {
            return;
        }
        if let Err(e) = inner.driver.release(handle.id) {
            warn!("Driver release failed for {id}: {e}", id = handle.id);
        }
        if let Some(slot) = inner.slots.get_mut(&handle.id) {
            slot.claimed = false;
            slot.initialized = false;
            slot.last_value = None;
        }
        debug!("Released {id}", id = handle.id);
    }

    /// Last value read from or written to the peripheral, if any.
    pub fn cached_value(&self, handle: &Handle) -> Result<Option<Value>, CapeError> {
        let inner = self.inner.lock();
        inner.check_live(handle)?;
        Ok(inner.slots.get(&handle.id).and_then(|s| s.last_value))
    }

    /// Number of currently claimed peripherals.
    pub fn claimed_count(&self) -> usize {
        self.inner.lock().slots.values().filter(|s| s.claimed).count()
    }

    /// Release every claimed peripheral and shut the driver down.
    ///
    /// Best-effort per slot: a driver failure is logged and the remaining
    /// releases proceed. Called exactly once, by the lifecycle manager,
    /// after the state machine has entered EXITING. Returns the number of
    /// slots released.
    pub(crate) fn drain(&self) -> usize {
        let mut inner = self.inner.lock();
        let claimed: Vec<PeripheralId> = inner
            .slots
            .iter()
            .filter(|(_, s)| s.claimed)
            .map(|(id, _)| *id)
            .collect();

        for id in &claimed {
            if let Err(e) = inner.driver.release(*id) {
                warn!("Drain: release failed for {id}: {e}");
            }
            if let Some(slot) = inner.slots.get_mut(id) {
                slot.claimed = false;
                slot.initialized = false;
                slot.last_value = None;
            }
        }

        if let Err(e) = inner.driver.shutdown() {
            warn!("Driver shutdown failed: {e}");
        }
        info!("Registry drained: {} peripheral(s) released", claimed.len());
        claimed.len()
    }
}

impl Inner {
    /// Verify the handle refers to a live claim.
    fn check_live(&self, handle: &Handle) -> Result<(), CapeError> {
        let live = self
            .slots
            .get(&handle.id)
            .is_some_and(|s| s.claimed && s.generation == handle.generation);
        if live {
            Ok(())
        } else {
            Err(CapeError::NotClaimed { id: handle.id })
        }
    }

    /// Record the last-known value for cacheable peripherals.
    fn cache(&mut self, id: PeripheralId, value: Value) {
        if let Some(slot) = self.slots.get_mut(&id) {
            match value {
                Value::Level(_) | Value::Button(_) => slot.last_value = Some(value),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulationDriver;
    use cape_common::config::BarometerConfig;
    use cape_common::peripheral::{ButtonId, LedColor};
    use cape_common::state::OperatingState;

    fn running_registry() -> PeripheralRegistry {
        let state = Arc::new(StateMachine::new());
        state.set_state(OperatingState::Running).unwrap();
        let mut driver = SimulationDriver::new();
        driver.init().unwrap();
        PeripheralRegistry::new(state, Box::new(driver))
    }

    const GREEN: PeripheralId = PeripheralId::Led(LedColor::Green);

    #[test]
    fn claim_then_double_claim_fails() {
        let registry = running_registry();
        let handle = registry.claim(GREEN).unwrap();
        assert_eq!(handle.id(), GREEN);
        assert_eq!(
            registry.claim(GREEN).unwrap_err(),
            CapeError::AlreadyClaimed { id: GREEN }
        );
    }

    #[test]
    fn claim_requires_initialized_state() {
        let state = Arc::new(StateMachine::new());
        let mut driver = SimulationDriver::new();
        driver.init().unwrap();
        let registry = PeripheralRegistry::new(state, Box::new(driver));
        assert!(matches!(
            registry.claim(GREEN),
            Err(CapeError::NotRunning { .. })
        ));
    }

    #[test]
    fn write_led_while_running_then_blocked_after_exiting() {
        let registry = running_registry();
        let handle = registry.claim(GREEN).unwrap();
        registry.write(&handle, Value::Level(true)).unwrap();
        assert_eq!(
            registry.cached_value(&handle).unwrap(),
            Some(Value::Level(true))
        );

        registry.state.set_state(OperatingState::Exiting).unwrap();
        assert_eq!(
            registry.write(&handle, Value::Level(false)).unwrap_err(),
            CapeError::NotRunning {
                state: OperatingState::Exiting
            }
        );
    }

    #[test]
    fn read_allowed_while_paused_write_is_not() {
        let registry = running_registry();
        let led = registry.claim(GREEN).unwrap();
        let button = registry.claim(PeripheralId::Button(ButtonId::Pause)).unwrap();

        registry.state.set_state(OperatingState::Paused).unwrap();
        registry.read(&button).unwrap();
        assert!(matches!(
            registry.write(&led, Value::Level(true)),
            Err(CapeError::NotRunning { .. })
        ));
    }

    #[test]
    fn write_to_button_is_rejected() {
        let registry = running_registry();
        let button = registry.claim(PeripheralId::Button(ButtonId::Mode)).unwrap();
        assert_eq!(
            registry.write(&button, Value::Level(true)).unwrap_err(),
            CapeError::NotActuator {
                id: PeripheralId::Button(ButtonId::Mode)
            }
        );
    }

    #[test]
    fn release_is_idempotent() {
        let registry = running_registry();
        let handle = registry.claim(GREEN).unwrap();
        assert_eq!(registry.claimed_count(), 1);

        registry.release(&handle);
        assert_eq!(registry.claimed_count(), 0);
        // Second release of the same handle: no-op, same registry state.
        registry.release(&handle);
        assert_eq!(registry.claimed_count(), 0);
    }

    #[test]
    fn stale_handle_is_dead_after_reclaim() {
        let registry = running_registry();
        let old = registry.claim(GREEN).unwrap();
        registry.release(&old);

        let new = registry.claim(GREEN).unwrap();
        assert!(matches!(
            registry.read(&old),
            Err(CapeError::NotClaimed { .. })
        ));
        registry.read(&new).unwrap();
        // Releasing the stale handle must not disturb the live claim.
        registry.release(&old);
        assert_eq!(registry.claimed_count(), 1);
    }

    #[test]
    fn barometer_requires_config_and_rejects_reinit() {
        let registry = running_registry();
        let baro = registry.claim(PeripheralId::Barometer).unwrap();

        // Unconfigured sensor reads are rejected before reaching the driver.
        assert_eq!(
            registry.read(&baro).unwrap_err(),
            CapeError::NotInitialized {
                id: PeripheralId::Barometer
            }
        );

        let config = PeripheralConfig::Barometer(BarometerConfig::from_codes(4, 4).unwrap());
        registry.apply_config(&baro, config).unwrap();
        assert!(matches!(registry.read(&baro), Ok(Value::Pressure(_))));

        assert_eq!(
            registry.apply_config(&baro, config).unwrap_err(),
            CapeError::AlreadyInitialized {
                id: PeripheralId::Barometer
            }
        );

        // Explicit reset clears the configuration until a new one lands.
        registry.reset(&baro).unwrap();
        assert!(matches!(
            registry.read(&baro),
            Err(CapeError::NotInitialized { .. })
        ));
        registry.apply_config(&baro, config).unwrap();
        assert!(matches!(registry.read(&baro), Ok(Value::Pressure(_))));
    }

    #[test]
    fn config_does_not_apply_to_leds() {
        let registry = running_registry();
        let led = registry.claim(GREEN).unwrap();
        let config = PeripheralConfig::Barometer(BarometerConfig::from_codes(4, 4).unwrap());
        assert_eq!(
            registry.apply_config(&led, config).unwrap_err(),
            CapeError::ConfigNotApplicable { id: GREEN }
        );
    }

    #[test]
    fn concurrent_claims_exactly_one_wins() {
        let registry = Arc::new(running_registry());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(std::thread::spawn(move || {
                registry.claim(PeripheralId::Barometer).is_ok()
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
        assert_eq!(registry.claimed_count(), 1);
    }

    #[test]
    fn drain_releases_everything() {
        let registry = running_registry();
        let _led = registry.claim(GREEN).unwrap();
        let _button = registry.claim(PeripheralId::Button(ButtonId::Pause)).unwrap();
        let _baro = registry.claim(PeripheralId::Barometer).unwrap();

        assert_eq!(registry.drain(), 3);
        assert_eq!(registry.claimed_count(), 0);
        // Nothing left to release.
        assert_eq!(registry.drain(), 0);
    }
}
