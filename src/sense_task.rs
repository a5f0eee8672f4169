//! Sensing task: periodic distance polling, connectivity reconciliation and
//! bus fault escalation.
//!
//! Bus I/O happens outside the shared lock; only the resulting observations
//! are applied under it. Faults never leave this task: a channel that keeps
//! failing is marked disconnected and goes dark, a failure burst across the
//! whole multiplexer escalates to one bus recovery pass, and the system
//! keeps serving whatever sensors still answer.

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::bus::{MUX_CHANNELS, RangingSensor, SclBitBang, SensorMux};
use crate::diag::{DiagEvent, DiagSender};
use crate::installation::{Observation, SharedInstallation};
use crate::pacing;

/// Default polling period.
pub const DEFAULT_SENSE_PERIOD: Duration = Duration::from_millis(20);

/// Default interval between full presence re-scans.
pub const DEFAULT_RESCAN_INTERVAL: Duration = Duration::from_secs(5);

/// Consecutive failed reads on one channel before its segment is declared
/// disconnected.
pub const CHANNEL_FAIL_LIMIT: u8 = 3;

/// Result of one sensing pass.
#[derive(Debug, Clone, Copy)]
pub struct PollResult {
    /// The deadline for the next pass.
    pub next_deadline: Instant,
    /// How long to wait until the next pass (zero if behind schedule).
    pub sleep_duration: Duration,
    /// Whether this pass ran a bus recovery.
    pub recovered: bool,
}

/// Periodic sensing driver over the multiplexer and the shared installation.
pub struct SensorTask<'a, I2C, D, S, U, const LEDS: usize, const SEGMENTS: usize> {
    mux: SensorMux<I2C, D, S>,
    unstick: U,
    shared: &'a SharedInstallation<LEDS, SEGMENTS>,
    diag: DiagSender<'a>,
    period: Duration,
    rescan_interval: Duration,
    next_poll: Instant,
    next_rescan: Instant,
    fail_streaks: [u8; SEGMENTS],
}

impl<'a, I2C, D, S, U, const LEDS: usize, const SEGMENTS: usize>
    SensorTask<'a, I2C, D, S, U, LEDS, SEGMENTS>
where
    I2C: I2c,
    D: DelayNs,
    S: RangingSensor,
    U: SclBitBang,
{
    /// Create a sensing task at the default cadence.
    ///
    /// The first poll always performs a full presence scan.
    pub fn new(
        mux: SensorMux<I2C, D, S>,
        unstick: U,
        shared: &'a SharedInstallation<LEDS, SEGMENTS>,
        diag: DiagSender<'a>,
    ) -> Self {
        Self {
            mux,
            unstick,
            shared,
            diag,
            period: DEFAULT_SENSE_PERIOD,
            rescan_interval: DEFAULT_RESCAN_INTERVAL,
            next_poll: Instant::from_ticks(0),
            next_rescan: Instant::from_ticks(0),
            fail_streaks: [0; SEGMENTS],
        }
    }

    /// Override the polling and re-scan cadence.
    #[must_use]
    pub fn with_periods(mut self, period: Duration, rescan_interval: Duration) -> Self {
        self.period = period;
        self.rescan_interval = rescan_interval;
        self
    }

    /// Run one sensing pass and return timing information.
    ///
    /// The caller waits until `next_deadline` before calling `poll` again.
    pub fn poll(&mut self, now: Instant) -> PollResult {
        let mut recovered = false;

        if self.mux.needs_recovery() {
            // One remedial pass per escalation, and a full re-scan before
            // any further trigger is processed.
            let present = self.mux.recover_bus(&mut self.unstick);
            let channels = present.iter().filter(|p| **p).count();
            #[allow(clippy::cast_possible_truncation)]
            self.diag.publish(DiagEvent::BusRecovered {
                channels: channels as u8,
            });
            self.reconcile();
            self.next_rescan = now + self.rescan_interval;
            recovered = true;
        } else if now >= self.next_rescan {
            self.mux.scan();
            self.reconcile();
            self.next_rescan = now + self.rescan_interval;
        }

        for id in 0..SEGMENTS.min(MUX_CHANNELS) {
            if self.mux.needs_recovery() {
                // Stop the pass; the next one opens with recovery.
                break;
            }
            #[allow(clippy::cast_possible_truncation)]
            let channel = id as u8;
            if !self.mux.is_ready(channel) {
                continue;
            }
            match self.mux.read_distance(channel) {
                Ok(distance_mm) => {
                    self.fail_streaks[id] = 0;
                    self.apply_reading(id, distance_mm, now);
                }
                Err(_) => {
                    self.fail_streaks[id] = self.fail_streaks[id].saturating_add(1);
                    if self.fail_streaks[id] >= CHANNEL_FAIL_LIMIT {
                        self.fail_streaks[id] = 0;
                        self.disconnect(id);
                    }
                }
            }
        }

        self.pace(now, recovered)
    }

    fn apply_reading(&mut self, id: usize, distance_mm: u16, now: Instant) {
        #[allow(clippy::cast_possible_truncation)]
        let segment = id as u8;
        match self.shared.observe_distance(id, distance_mm, now) {
            Observation::Triggered {
                fresh: true,
                mode_advanced,
            } => {
                self.diag.publish(DiagEvent::Triggered {
                    segment,
                    distance_mm,
                });
                if mode_advanced {
                    self.diag.publish(DiagEvent::ModeChanged {
                        mode: self.shared.mode(),
                    });
                }
            }
            Observation::OutOfRange => {
                // Sentinel reading; the sensor is gone until a re-scan
                // finds it again.
                self.mux.drop_channel(segment);
                self.diag.publish(DiagEvent::Disconnected { segment });
            }
            Observation::Triggered { fresh: false, .. }
            | Observation::Clear
            | Observation::Ignored => {}
        }
    }

    fn disconnect(&mut self, id: usize) {
        #[allow(clippy::cast_possible_truncation)]
        let segment = id as u8;
        self.mux.drop_channel(segment);
        if self.shared.mark_connectivity(id, false) {
            self.diag.publish(DiagEvent::Disconnected { segment });
        }
    }

    /// Reconcile segment connectivity with the multiplexer's channel state.
    fn reconcile(&mut self) {
        for id in 0..SEGMENTS.min(MUX_CHANNELS) {
            #[allow(clippy::cast_possible_truncation)]
            let segment = id as u8;
            if self.mux.is_ready(segment) {
                let changed = self.shared.mark_connectivity(id, true);
                self.shared.mark_initialized(id);
                if changed {
                    self.diag.publish(DiagEvent::Connected { segment });
                }
            } else if self.shared.mark_connectivity(id, false) {
                self.diag.publish(DiagEvent::Disconnected { segment });
            }
        }
    }

    fn pace(&mut self, now: Instant, recovered: bool) -> PollResult {
        let (next_deadline, sleep_duration) =
            pacing::advance_deadline(&mut self.next_poll, self.period, now);

        PollResult {
            next_deadline,
            sleep_duration,
            recovered,
        }
    }
}
