use chrono::Timelike;

/// Source of the wall-clock hour used by time-of-day gates.
pub trait Clock: Send + Sync {
    /// Current hour (0-23) in the evaluating process's local time zone.
    fn local_hour(&self) -> u32;
}

/// Reads the system clock in local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn local_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Always reports the same hour. Used for replay and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn local_hour(&self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_clock_hour_in_range() {
        assert!(LocalClock.local_hour() < 24);
    }

    #[test]
    fn fixed_clock_reports_its_hour() {
        assert_eq!(FixedClock(8).local_hour(), 8);
    }
}
