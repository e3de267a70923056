//! Wait schedule for publish job status requests.

use std::time::Duration;

/// How long to wait between job status requests, and how many to make.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Wait before the first status request.
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Growth of the wait after each report that still has pending drafts.
    pub multiplier: f64,
    /// Status requests before the job is left to settle on its own.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_attempts: 20,
        }
    }
}

impl PollConfig {
    /// The waits before each status request, one per attempt.
    pub fn schedule(&self) -> PollSchedule<'_> {
        PollSchedule {
            config: self,
            next: self.initial_delay.min(self.max_delay),
            remaining: self.max_attempts,
        }
    }
}

/// Iterator over the waits of one polling run. Finite: yields
/// `max_attempts` items.
#[derive(Debug, Clone)]
pub struct PollSchedule<'a> {
    config: &'a PollConfig,
    next: Duration,
    remaining: u32,
}

impl Iterator for PollSchedule<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let wait = self.next;
        let grown = (wait.as_millis() as f64 * self.config.multiplier) as u64;
        self.next = Duration::from_millis(grown).min(self.config.max_delay);
        Some(wait)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for PollSchedule<'_> {}
