//! The step between sending a read command and receiving its response.
use sysbot_protocol::timing::Timing;

/// Waits until the device is expected to have a response ready.
///
/// Called exactly once per read command, after the command was sent and
/// before the first byte of the response is received.
pub trait Synchronizer {
    fn synchronize(&mut self, length: usize);
}

/// Blocks the calling thread for [`Timing::delay`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepSynchronizer {
    timing: Timing,
}

impl SleepSynchronizer {
    pub fn new(timing: Timing) -> SleepSynchronizer {
        SleepSynchronizer { timing }
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }
}

impl Synchronizer for SleepSynchronizer {
    fn synchronize(&mut self, length: usize) {
        let delay = self.timing.delay(length);
        log::trace!("Waiting {:?} for a {} byte response", delay, length);
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::*;

    #[test]
    fn sleeps_for_configured_delay() {
        let mut sync = SleepSynchronizer::new(Timing::new(5, 0));
        assert_eq!(sync.timing().delay(1 << 20), Duration::from_millis(5));

        let start = Instant::now();
        sync.synchronize(1 << 20);
        assert!(start.elapsed() >= Duration::from_millis(5));
    }
}
