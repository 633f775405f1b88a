//! Peripheral identity table, value types, and button events.
//!
//! Identities are a fixed compiled-in table — nothing here is runtime
//! configurable. The registry keys its claim map on [`PeripheralId`];
//! application code only ever refers to peripherals by identity.

use serde::{Deserialize, Serialize};

// ─── Identities ─────────────────────────────────────────────────────

/// On-board user LED channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum LedColor {
    /// Green LED — conventionally lit while RUNNING.
    Green = 0,
    /// Red LED — conventionally lit while PAUSED.
    Red = 1,
}

/// On-board user buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ButtonId {
    /// Pause button — toggles RUNNING ↔ PAUSED.
    Pause = 0,
    /// Mode button — application defined.
    Mode = 1,
}

/// Quadrature encoder channels (1-4 on the cape header).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EncoderChannel {
    /// Encoder channel 1.
    Ch1 = 1,
    /// Encoder channel 2.
    Ch2 = 2,
    /// Encoder channel 3.
    Ch3 = 3,
    /// Encoder channel 4.
    Ch4 = 4,
}

/// Voltage rails exposed as read-only peripherals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PowerRail {
    /// 2-cell LiPo battery voltage.
    Battery = 0,
    /// DC barrel-jack input voltage.
    DcJack = 1,
}

/// Identity of a discrete hardware unit on the cape.
///
/// The full table is [`PeripheralId::ALL`]. Identities are the only way
/// application code refers to hardware; claim slots are keyed on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeripheralId {
    /// User LED channel.
    Led(LedColor),
    /// User button input.
    Button(ButtonId),
    /// On-board barometric pressure sensor.
    Barometer,
    /// Quadrature encoder counter.
    Encoder(EncoderChannel),
    /// Read-only voltage rail.
    Rail(PowerRail),
}

impl PeripheralId {
    /// The complete compiled-in peripheral table.
    pub const ALL: [PeripheralId; 11] = [
        Self::Led(LedColor::Green),
        Self::Led(LedColor::Red),
        Self::Button(ButtonId::Pause),
        Self::Button(ButtonId::Mode),
        Self::Barometer,
        Self::Encoder(EncoderChannel::Ch1),
        Self::Encoder(EncoderChannel::Ch2),
        Self::Encoder(EncoderChannel::Ch3),
        Self::Encoder(EncoderChannel::Ch4),
        Self::Rail(PowerRail::Battery),
        Self::Rail(PowerRail::DcJack),
    ];

    /// Returns true if this identity supports actuation (writes).
    ///
    /// LEDs can be driven and encoder counters can be preset; buttons,
    /// the barometer, and the voltage rails are input-only.
    #[inline]
    pub const fn supports_actuation(&self) -> bool {
        matches!(self, Self::Led(_) | Self::Encoder(_))
    }

    /// Returns true if this identity requires a validated configuration
    /// before it can be read (stateful sensors).
    #[inline]
    pub const fn requires_config(&self) -> bool {
        matches!(self, Self::Barometer)
    }
}

impl std::fmt::Display for PeripheralId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Led(LedColor::Green) => write!(f, "led:green"),
            Self::Led(LedColor::Red) => write!(f, "led:red"),
            Self::Button(ButtonId::Pause) => write!(f, "button:pause"),
            Self::Button(ButtonId::Mode) => write!(f, "button:mode"),
            Self::Barometer => write!(f, "barometer"),
            Self::Encoder(ch) => write!(f, "encoder:{}", *ch as u8),
            Self::Rail(PowerRail::Battery) => write!(f, "rail:battery"),
            Self::Rail(PowerRail::DcJack) => write!(f, "rail:dc_jack"),
        }
    }
}

// ─── Values ─────────────────────────────────────────────────────────

/// Transient button reading — produced on read, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Which button was sampled.
    pub button: ButtonId,
    /// True if the button is currently pressed.
    pub pressed: bool,
}

/// One barometer sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometerReading {
    /// Ambient temperature in degrees Celsius.
    pub temperature_c: f64,
    /// Barometric pressure in Pascals.
    pub pressure_pa: f64,
}

/// Value read from or written to a peripheral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// Digital level — LED on/off.
    Level(bool),
    /// Button sample.
    Button(ButtonEvent),
    /// Barometer sample.
    Pressure(BarometerReading),
    /// Encoder count (read: current position, write: preset position).
    Count(i64),
    /// Rail voltage in volts.
    Volts(f64),
}
