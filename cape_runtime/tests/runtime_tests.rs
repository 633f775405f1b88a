//! End-to-end test of the assembled cape runtime.
//!
//! `CapeCore` is a process-wide singleton, so the whole journey lives in
//! one test function; component-level behavior is covered by the unit
//! tests in each module.

use cape_common::config::{BarometerConfig, PeripheralConfig};
use cape_common::error::CapeError;
use cape_common::peripheral::{ButtonId, LedColor, PeripheralId, Value};
use cape_common::state::OperatingState;
use cape_runtime::drivers::simulation;
use cape_runtime::CapeCore;

#[test]
fn full_runtime_journey() {
    let cape = CapeCore::init(simulation::create_driver()).expect("init");
    assert_eq!(cape.state(), OperatingState::Running);

    // Claim the board surface.
    let green = cape.claim(PeripheralId::Led(LedColor::Green)).unwrap();
    let pause = cape.claim(PeripheralId::Button(ButtonId::Pause)).unwrap();
    let baro = cape.claim(PeripheralId::Barometer).unwrap();

    // Double claim is rejected while the handle is live.
    assert!(matches!(
        cape.claim(PeripheralId::Led(LedColor::Green)),
        Err(CapeError::AlreadyClaimed { .. })
    ));

    // Actuation while RUNNING.
    cape.write(&green, Value::Level(true)).unwrap();
    assert_eq!(cape.cached_value(&green).unwrap(), Some(Value::Level(true)));

    // Pause: reads stay legal, actuation does not.
    cape.set_state(OperatingState::Paused).unwrap();
    assert!(matches!(cape.read(&pause), Ok(Value::Button(_))));
    assert!(matches!(
        cape.write(&green, Value::Level(false)),
        Err(CapeError::NotRunning {
            state: OperatingState::Paused
        })
    ));
    cape.set_state(OperatingState::Running).unwrap();

    // Barometer: configure once, then read; reinit requires reset.
    let config = PeripheralConfig::Barometer(BarometerConfig::from_codes(4, 2).unwrap());
    cape.apply_config(&baro, config).unwrap();
    assert!(matches!(cape.read(&baro), Ok(Value::Pressure(_))));
    assert!(matches!(
        cape.apply_config(&baro, config),
        Err(CapeError::AlreadyInitialized { .. })
    ));
    cape.reset(&baro).unwrap();
    cape.apply_config(&baro, config).unwrap();

    // Explicit release is idempotent and frees the identity.
    cape.release(&green);
    cape.release(&green);
    let green2 = cape.claim(PeripheralId::Led(LedColor::Green)).unwrap();
    assert!(matches!(
        cape.read(&green),
        Err(CapeError::NotClaimed { .. })
    ));

    // Bounded blink runs to completion and leaves the LED off.
    cape.blink(
        &green2,
        std::num::NonZeroU32::new(50).unwrap(),
        std::time::Duration::from_millis(40),
    )
    .unwrap();
    assert_eq!(
        cape.cached_value(&green2).unwrap(),
        Some(Value::Level(false))
    );
    // Blinking an input-only peripheral is rejected like any other write.
    assert!(matches!(
        cape.blink(
            &pause,
            std::num::NonZeroU32::new(50).unwrap(),
            std::time::Duration::from_millis(10),
        ),
        Err(CapeError::NotActuator { .. })
    ));

    // A second runtime in the same process is rejected.
    assert!(matches!(
        CapeCore::init(simulation::create_driver()),
        Err(CapeError::InitFailed(_))
    ));

    // Shutdown: everything drains, operations observe NotRunning.
    cape.shutdown();
    assert_eq!(cape.state(), OperatingState::Exiting);
    assert!(matches!(
        cape.write(&green2, Value::Level(false)),
        Err(CapeError::NotRunning {
            state: OperatingState::Exiting
        })
    ));
    assert!(matches!(
        cape.read(&baro),
        Err(CapeError::NotClaimed { .. }) | Err(CapeError::NotRunning { .. })
    ));

    // Second shutdown is a no-op; Drop at the end of scope is another.
    cape.shutdown();
}
