//! Exponential backoff with optional cap and jitter.

use std::time::Duration;
use rand::Rng;

/// Delay schedule for successive retry pauses.
///
/// Starts at `initial` and doubles after every pause. With no cap and no
/// jitter the sequence is exactly `initial, 2*initial, 4*initial, ...`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Option<Duration>,
    jitter: bool,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self {
            next: initial,
            max: None,
            jitter: false,
        }
    }

    /// Cap every delay at `max`.
    pub fn with_max(mut self, max: Option<Duration>) -> Self {
        self.max = max;
        self
    }

    /// Add up to 10% random jitter on top of each delay.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Return the current delay and double the one after it.
    pub fn next_delay(&mut self) -> Duration {
        let base = match self.max {
            Some(max) => self.next.min(max),
            None => self.next,
        };
        self.next = self.next.saturating_mul(2);

        if self.jitter {
            base + jitter_for(base)
        } else {
            base
        }
    }
}

fn jitter_for(delay: Duration) -> Duration {
    let jitter_range = delay.as_millis() as u64 / 10;
    if jitter_range == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..jitter_range))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let mut b = Backoff::new(Duration::from_millis(100));
        assert_eq!(b.next_delay(), Duration::from_millis(100));
        assert_eq!(b.next_delay(), Duration::from_millis(200));
        assert_eq!(b.next_delay(), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_cap() {
        let mut b = Backoff::new(Duration::from_millis(100)).with_max(Some(Duration::from_millis(250)));
        assert_eq!(b.next_delay(), Duration::from_millis(100));
        assert_eq!(b.next_delay(), Duration::from_millis(200));
        assert_eq!(b.next_delay(), Duration::from_millis(250));
        assert_eq!(b.next_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let mut b = Backoff::new(Duration::from_millis(1000)).with_jitter(true);
        let d = b.next_delay();
        assert!(d >= Duration::from_millis(1000));
        assert!(d < Duration::from_millis(1100));
    }
}
