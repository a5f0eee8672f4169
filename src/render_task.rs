//! Rendering task: drift-corrected frame pacing without async/await.
//!
//! The caller is responsible for sleeping between ticks; each tick renders
//! every segment, writes the frame to the output driver and flushes, all
//! inside one exclusive region so the sensing task never observes (or is
//! observed at) a half-rendered frame.

use embassy_time::{Duration, Instant};

use crate::OutputDriver;
use crate::installation::SharedInstallation;
use crate::pacing;

/// Default target frame rate (90 FPS).
pub const DEFAULT_FPS: u32 = 90;

/// Default frame duration based on target FPS.
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(1000 / DEFAULT_FPS as u64);

/// Result of a frame tick operation.
#[derive(Debug, Clone, Copy)]
pub struct FrameResult {
    /// The deadline for the next frame.
    pub next_deadline: Instant,
    /// How long to wait until the next frame (may be zero if behind schedule).
    pub sleep_duration: Duration,
}

/// Periodic rendering driver over the shared installation.
pub struct RenderTask<'a, O: OutputDriver, const LEDS: usize, const SEGMENTS: usize> {
    output: O,
    shared: &'a SharedInstallation<LEDS, SEGMENTS>,
    next_frame: Instant,
    frame_duration: Duration,
}

impl<'a, O: OutputDriver, const LEDS: usize, const SEGMENTS: usize>
    RenderTask<'a, O, LEDS, SEGMENTS>
{
    /// Create a rendering task at the default cadence.
    pub fn new(shared: &'a SharedInstallation<LEDS, SEGMENTS>, output: O) -> Self {
        Self::with_frame_duration(shared, output, DEFAULT_FRAME_DURATION)
    }

    /// Create a rendering task with a custom frame duration.
    pub fn with_frame_duration(
        shared: &'a SharedInstallation<LEDS, SEGMENTS>,
        output: O,
        frame_duration: Duration,
    ) -> Self {
        Self {
            output,
            shared,
            next_frame: Instant::from_ticks(0),
            frame_duration,
        }
    }

    /// Process one frame and return timing information.
    ///
    /// The caller waits until `next_deadline` before calling `tick` again.
    pub fn tick(&mut self, now: Instant) -> FrameResult {
        // Tick the animation engine, write the buffer and flush as one
        // atomic unit from this task's perspective.
        let output = &mut self.output;
        self.shared.with(|installation| {
            installation.render(now);
            output.write(installation.frame());
        });

        let (next_deadline, sleep_duration) =
            pacing::advance_deadline(&mut self.next_frame, self.frame_duration, now);

        FrameResult {
            next_deadline,
            sleep_duration,
        }
    }
}
