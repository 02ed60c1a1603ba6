use std::time::Duration;

/// Heuristic that estimates how long the device needs before a response is ready.
///
/// The protocol carries no acknowledgement, so the client waits
/// `length / delay_factor + base_delay` milliseconds after sending a read command
/// before it starts receiving.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Timing {
    /// Fixed part of the delay, in milliseconds.
    pub base_delay: u64,
    /// Number of requested bytes that add one millisecond to the delay.
    /// Zero disables the length dependent part.
    pub delay_factor: u64,
}

impl Timing {
    pub const DEFAULT_BASE_DELAY: u64 = 64;
    pub const DEFAULT_DELAY_FACTOR: u64 = 256;

    pub fn new(base_delay: u64, delay_factor: u64) -> Timing {
        Timing {
            base_delay,
            delay_factor,
        }
    }

    /// The delay for a response carrying `length` bytes.
    pub fn delay(&self, length: usize) -> Duration {
        let scaled = (length as u64).checked_div(self.delay_factor).unwrap_or(0);
        Duration::from_millis(scaled.saturating_add(self.base_delay))
    }
}

impl Default for Timing {
    fn default() -> Self {
        Timing::new(Self::DEFAULT_BASE_DELAY, Self::DEFAULT_DELAY_FACTOR)
    }
}

#[test]
fn delay_without_payload_is_base_delay() {
    let timing = Timing::default();
    assert_eq!(timing.delay(0), Duration::from_millis(64));
}

#[test]
fn delay_grows_once_per_factor() {
    let timing = Timing::default();
    assert_eq!(timing.delay(255), Duration::from_millis(64));
    assert_eq!(timing.delay(256), Duration::from_millis(65));
    assert_eq!(timing.delay(0x1C0), Duration::from_millis(65));
    assert_eq!(timing.delay(1024), Duration::from_millis(68));
}

#[test]
fn zero_delay_factor_keeps_base_delay() {
    let timing = Timing::new(10, 0);
    assert_eq!(timing.delay(100_000), Duration::from_millis(10));
}
