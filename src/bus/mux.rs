//! TCA9548A-style channel multiplexer with verified selection and bounded
//! retries.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::{BusError, RangingSensor, SclBitBang, SensorFault};

/// Number of downstream channels on the multiplexer.
pub const MUX_CHANNELS: usize = 8;

/// Attempts per distance read before it counts as a failure.
pub const READ_RETRIES: u8 = 3;

/// Consecutive failed reads across the whole multiplexer before the bus is
/// considered stuck and a recovery pass runs.
pub const BUS_FAILURE_LIMIT: u8 = 5;

const DISABLE_ALL: u8 = 0x00;
/// Settle time after rewriting the enable register.
const SWITCH_SETTLE_US: u32 = 1_000;
/// Settle time before ranging on a freshly selected channel.
const RANGE_SETTLE_US: u32 = 10_000;
/// Backoff between read attempts.
const RETRY_BACKOFF_US: u32 = 5_000;
/// Standard SCL cycle count to release a device holding SDA low.
const UNSTICK_PULSES: u8 = 9;

#[derive(Debug, Clone, Copy, Default)]
struct ChannelRecord {
    present: bool,
    initialized: bool,
}

/// Channel multiplexer plus the sensors behind it.
///
/// Owns the I2C handle used for the multiplexer's enable register and the
/// [`RangingSensor`] driver that talks to whichever sensor the selected
/// channel exposes. Only the sensing task touches this.
pub struct SensorMux<I2C, D, S> {
    i2c: I2C,
    delay: D,
    sensor: S,
    address: u8,
    channels: [ChannelRecord; MUX_CHANNELS],
    bus_failures: u8,
}

impl<I2C, D, S> SensorMux<I2C, D, S>
where
    I2C: I2c,
    D: DelayNs,
    S: RangingSensor,
{
    pub fn new(i2c: I2C, delay: D, sensor: S, address: u8) -> Self {
        Self {
            i2c,
            delay,
            sensor,
            address,
            channels: [ChannelRecord::default(); MUX_CHANNELS],
            bus_failures: 0,
        }
    }

    /// Enable exactly one channel and verify the selection.
    ///
    /// The multiplexer has no side channel to confirm its state; without the
    /// readback a silent mis-selection would cross-talk between segments.
    pub fn select_channel(&mut self, channel: u8) -> Result<(), BusError> {
        if usize::from(channel) >= MUX_CHANNELS {
            return Err(BusError::InvalidChannel);
        }

        self.i2c
            .write(self.address, &[DISABLE_ALL])
            .map_err(|_| BusError::Transfer)?;
        self.delay.delay_us(SWITCH_SETTLE_US);

        let mask = 1u8 << channel;
        self.i2c
            .write(self.address, &[mask])
            .map_err(|_| BusError::Transfer)?;
        self.delay.delay_us(SWITCH_SETTLE_US);

        let mut readback = [0u8; 1];
        self.i2c
            .read(self.address, &mut readback)
            .map_err(|_| BusError::Transfer)?;
        if readback[0] != mask {
            return Err(BusError::ChannelSelect {
                expected: mask,
                got: readback[0],
            });
        }

        Ok(())
    }

    /// Probe every channel and (re)configure continuous ranging where a
    /// sensor answers. Returns per-channel presence.
    pub fn scan(&mut self) -> [bool; MUX_CHANNELS] {
        let mut present = [false; MUX_CHANNELS];
        for channel in 0..MUX_CHANNELS {
            #[allow(clippy::cast_possible_truncation)]
            let selected = self.select_channel(channel as u8).is_ok();
            if !selected {
                self.channels[channel] = ChannelRecord::default();
                continue;
            }
            if !self.sensor.probe() {
                self.channels[channel] = ChannelRecord::default();
                continue;
            }
            present[channel] = true;
            self.channels[channel].present = true;
            if !self.channels[channel].initialized {
                self.channels[channel].initialized = self.sensor.start_continuous().is_ok();
            }
        }
        present
    }

    /// Whether a channel has a present, configured sensor.
    pub fn is_ready(&self, channel: u8) -> bool {
        self.channels
            .get(usize::from(channel))
            .is_some_and(|record| record.present && record.initialized)
    }

    /// Forget a channel's sensor until the next scan re-discovers it.
    pub fn drop_channel(&mut self, channel: u8) {
        if let Some(record) = self.channels.get_mut(usize::from(channel)) {
            *record = ChannelRecord::default();
        }
    }

    /// Read a distance with bounded retries and a short backoff.
    ///
    /// A success resets the bus-wide failure streak; exhausting the retries
    /// counts exactly one failure toward it.
    pub fn read_distance(&mut self, channel: u8) -> Result<u16, BusError> {
        let mut last = BusError::ReadTimeout;
        for attempt in 0..READ_RETRIES {
            match self.try_read(channel) {
                Ok(distance_mm) => {
                    self.bus_failures = 0;
                    return Ok(distance_mm);
                }
                Err(error) => {
                    last = error;
                    if attempt + 1 < READ_RETRIES {
                        self.delay.delay_us(RETRY_BACKOFF_US);
                    }
                }
            }
        }
        self.bus_failures = self.bus_failures.saturating_add(1);
        Err(last)
    }

    fn try_read(&mut self, channel: u8) -> Result<u16, BusError> {
        self.select_channel(channel)?;
        self.delay.delay_us(RANGE_SETTLE_US);
        self.sensor.read_range_mm().map_err(|fault| match fault {
            SensorFault::Timeout => BusError::ReadTimeout,
            SensorFault::Bus => BusError::Transfer,
        })
    }

    /// Whether the failure streak has escalated past the bus-wide limit.
    pub fn needs_recovery(&self) -> bool {
        self.bus_failures >= BUS_FAILURE_LIMIT
    }

    /// Last-resort recovery: clock the bus free, then rediscover everything.
    ///
    /// One remedial pass per escalation. Every previously configured channel
    /// is re-initialized by the scan; channels that stay silent are left
    /// disconnected and the system continues degraded.
    pub fn recover_bus<U: SclBitBang>(&mut self, unstick: &mut U) -> [bool; MUX_CHANNELS] {
        unstick.pulse_clock(UNSTICK_PULSES);
        self.bus_failures = 0;
        for record in &mut self.channels {
            record.initialized = false;
        }
        self.scan()
    }
}
