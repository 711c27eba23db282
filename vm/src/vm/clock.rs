//! Wall clock with an override for tests.

use chrono::{DateTime, Utc};

/// Unix-seconds clock. Time-locks and coin selection read it; tests pin it
/// with [`Clock::set`].
#[derive(Debug, Clone, Default)]
pub struct Clock {
    faked: Option<DateTime<Utc>>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.faked.unwrap_or_else(Utc::now)
    }

    pub fn unix(&self) -> u64 {
        self.now().timestamp().max(0) as u64
    }

    pub fn set(&mut self, time: DateTime<Utc>) {
        self.faked = Some(time);
    }

    pub fn sync(&mut self) {
        self.faked = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn faked_time_sticks_until_sync() {
        let mut clock = Clock::new();
        let pinned = Utc.timestamp_opt(1_000, 0).unwrap();
        clock.set(pinned);
        assert_eq!(clock.unix(), 1_000);
        clock.sync();
        assert!(clock.unix() > 1_000);
    }
}
