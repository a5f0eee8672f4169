#![no_std]

pub mod bus;
pub mod color;
pub mod diag;
pub mod gamma;
pub mod installation;
pub mod math8;
pub mod mode;
mod pacing;
pub mod render_task;
pub mod rng;
pub mod segment;
pub mod sense_task;

pub use bus::{BusError, OUT_OF_RANGE_MM, RangingSensor, SclBitBang, SensorFault, SensorMux};
pub use diag::{DiagChannel, DiagEvent, DiagReceiver, DiagSender};
pub use installation::{
    EngineConfig, Installation, MODE_SELECT_SEGMENT, Observation, SharedInstallation,
};
pub use mode::ModeId;
pub use render_task::{FrameResult, RenderTask};
pub use segment::{Segment, SegmentStore};
pub use sense_task::{PollResult, SensorTask};

pub use color::{Hsv, Rgb};
pub use math8::fade_level;
pub use embassy_time::{Duration, Instant};

/// Abstract LED driver trait
///
/// Implement this trait to push a finished frame to the physical strip.
/// Writes are fire-and-forget; the transmission protocol lives behind it.
pub trait OutputDriver {
    /// Write colors to the LED strip
    fn write(&mut self, colors: &[Rgb]);
}
