//! Bus access layer: channel multiplexer control and fault recovery.
//!
//! The multiplexer register protocol (select/verify) and the retry and
//! recovery policy live here. The time-of-flight sensor's own register map
//! does not; it sits behind [`RangingSensor`], implemented by a concrete
//! driver that shares the same I2C bus.

mod mux;

pub use mux::{BUS_FAILURE_LIMIT, MUX_CHANNELS, READ_RETRIES, SensorMux};

/// Range readings at or above this value are the sensor's "nothing in range"
/// sentinel; the caller treats them as a disconnected sensor, not a distance.
pub const OUT_OF_RANGE_MM: u16 = 8190;

/// Faults reported by the register-level sensor driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFault {
    /// The sensor did not produce a reading within its timeout window.
    Timeout,
    /// The bus transaction itself failed.
    Bus,
}

/// Register-level distance sensor driver, addressed through whichever
/// multiplexer channel is currently selected.
pub trait RangingSensor {
    /// Check whether a sensor answers at its address on the selected channel.
    fn probe(&mut self) -> bool;

    /// Configure the sensor on the selected channel for continuous ranging.
    fn start_continuous(&mut self) -> Result<(), SensorFault>;

    /// Read the most recent range in millimeters.
    fn read_range_mm(&mut self) -> Result<u16, SensorFault>;
}

/// Manual clock-line control used to unstick a hung bus.
///
/// A device latched mid-transaction can hold the data line low forever; no
/// software-only reset clears that. The implementor releases the bus, toggles
/// SCL the requested number of cycles, and re-acquires the bus.
pub trait SclBitBang {
    fn pulse_clock(&mut self, cycles: u8);
}

/// Faults raised by the bus access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Channel index outside the multiplexer's range.
    InvalidChannel,
    /// The enable-register readback disagreed with what was written.
    ChannelSelect { expected: u8, got: u8 },
    /// An I2C transaction failed outright.
    Transfer,
    /// The sensor timed out while ranging.
    ReadTimeout,
}
