pub const WEATHER_INTERVAL_MS: u64 = 10 * 60 * 1000;

/// Fetch pacing: due once the deadline is reached, and after any attempt
/// the deadline moves one full interval past the time of advancement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    interval_ms: u64,
    next_deadline_ms: u64,
}

impl Cadence {
    /// Due immediately at `now_ms`.
    pub fn starting_at(now_ms: u64, interval_ms: u64) -> Self {
        Self {
            interval_ms,
            next_deadline_ms: now_ms,
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_deadline_ms
    }

    pub fn advance(&mut self, now_ms: u64) -> u64 {
        self.next_deadline_ms = now_ms + self.interval_ms;
        self.next_deadline_ms
    }

    pub fn next_deadline_ms(&self) -> u64 {
        self.next_deadline_ms
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_immediately_after_start() {
        let cadence = Cadence::starting_at(5_000, WEATHER_INTERVAL_MS);
        assert!(cadence.is_due(5_000));
        assert!(!cadence.is_due(4_999));
    }

    #[test]
    fn advance_is_exactly_one_interval_ahead() {
        let mut cadence = Cadence::starting_at(0, WEATHER_INTERVAL_MS);
        for now in [0, 1, 599_999, 600_000, 3_600_123] {
            let deadline = cadence.advance(now);
            assert_eq!(deadline, now + WEATHER_INTERVAL_MS);
            assert!(!cadence.is_due(now));
            assert!(!cadence.is_due(deadline - 1));
            assert!(cadence.is_due(deadline));
        }
    }

    #[test]
    fn overdue_fetch_is_due_once_per_advance() {
        let mut cadence = Cadence::starting_at(0, 1_000);
        cadence.advance(0);
        assert!(cadence.is_due(5_000));
        cadence.advance(5_000);
        assert!(!cadence.is_due(5_999));
        assert_eq!(cadence.next_deadline_ms(), 6_000);
    }
}
