//! Diagnostic event stream.
//!
//! A bounded, thread-safe queue of engine events built on `critical-section`
//! and `heapless::Deque`. Delivery is best-effort: publishing never blocks
//! and the oldest event is dropped when the queue is full. A host console or
//! debug UART drains it at its leisure.

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Deque;

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::mode::ModeId;

/// Number of events the queue holds before dropping the oldest.
pub const DIAG_CAPACITY: usize = 16;

/// Engine events worth surfacing: triggers, connectivity changes, mode
/// changes, and bus recovery actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagEvent {
    Triggered { segment: u8, distance_mm: u16 },
    ModeChanged { mode: ModeId },
    Connected { segment: u8 },
    Disconnected { segment: u8 },
    BusRecovered { channels: u8 },
}

/// Bounded diagnostic channel shared between the tasks and a consumer.
pub struct DiagChannel {
    inner: Mutex<RefCell<Deque<DiagEvent, DIAG_CAPACITY>>>,
}

impl DiagChannel {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Deque::new())),
        }
    }

    /// Get a publisher handle for this channel.
    pub const fn sender(&self) -> DiagSender<'_> {
        DiagSender { channel: self }
    }

    /// Get a consumer handle for this channel.
    pub const fn receiver(&self) -> DiagReceiver<'_> {
        DiagReceiver { channel: self }
    }

    fn publish(&self, event: DiagEvent) {
        #[cfg(feature = "esp32-log")]
        println!("stairlight: {:?}", event);

        critical_section::with(|cs| {
            let mut queue = self.inner.borrow(cs).borrow_mut();
            if queue.is_full() {
                queue.pop_front();
            }
            let _ = queue.push_back(event);
        });
    }

    fn take(&self) -> Option<DiagEvent> {
        critical_section::with(|cs| self.inner.borrow(cs).borrow_mut().pop_front())
    }
}

impl Default for DiagChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Publisher handle; lightweight, copyable.
#[derive(Clone, Copy)]
pub struct DiagSender<'a> {
    channel: &'a DiagChannel,
}

impl DiagSender<'_> {
    /// Publish an event, dropping the oldest one if the queue is full.
    pub fn publish(&self, event: DiagEvent) {
        self.channel.publish(event);
    }
}

/// Consumer handle; lightweight, copyable.
#[derive(Clone, Copy)]
pub struct DiagReceiver<'a> {
    channel: &'a DiagChannel,
}

impl DiagReceiver<'_> {
    /// Take the next pending event, if any.
    pub fn take(&self) -> Option<DiagEvent> {
        self.channel.take()
    }
}
