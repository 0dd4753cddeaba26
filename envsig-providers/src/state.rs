//! Private per-adapter state
//!
//! - [`Cooldown`]: minimum spacing between upstream calls
//! - [`LastGood`]: the most recent successful record set
//!
//! Both are behind their own lock so one adapter can serve overlapping
//! aggregation cycles.

use envsig_core::RawSignal;
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Explicit cooldown window checked before each upstream call
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    state: Mutex<CooldownState>,
}

#[derive(Debug, Default)]
struct CooldownState {
    last_call: Option<Instant>,
    blocked_until: Option<Instant>,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: Mutex::new(CooldownState::default()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Claim the right to call upstream now, or get the time left to wait
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut state = self.state.lock();

        if let Some(remaining) = remaining_at(&state, self.window, now) {
            return Err(remaining);
        }

        state.last_call = Some(now);
        state.blocked_until = None;
        Ok(())
    }

    /// Block further calls for at least `by`, e.g. after a 429
    pub fn extend(&self, by: Duration) {
        let until = Instant::now() + by;
        let mut state = self.state.lock();
        state.blocked_until = Some(match state.blocked_until {
            Some(existing) if existing > until => existing,
            _ => until,
        });
    }

    /// Time left before the next call is allowed
    pub fn remaining(&self) -> Option<Duration> {
        let state = self.state.lock();
        remaining_at(&state, self.window, Instant::now())
    }
}

fn remaining_at(state: &CooldownState, window: Duration, now: Instant) -> Option<Duration> {
    let from_window = state
        .last_call
        .map(|last| (last + window).saturating_duration_since(now));
    let from_block = state
        .blocked_until
        .map(|until| until.saturating_duration_since(now));

    from_window
        .into_iter()
        .chain(from_block)
        .max()
        .filter(|d| !d.is_zero())
}

/// Most recent successful fetch, served as a degraded fallback
#[derive(Debug, Default)]
pub struct LastGood {
    records: Mutex<Vec<RawSignal>>,
}

impl LastGood {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored set; empty results keep the previous one
    pub fn store(&self, records: &[RawSignal]) {
        if records.is_empty() {
            return;
        }
        *self.records.lock() = records.to_vec();
    }

    pub fn snapshot(&self) -> Vec<RawSignal> {
        self.records.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envsig_core::ThermalReading;

    #[test]
    fn test_cooldown_blocks_second_call() {
        let cooldown = Cooldown::new(Duration::from_secs(60));
        assert!(cooldown.try_acquire().is_ok());

        let remaining = cooldown.try_acquire().unwrap_err();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(58));
    }

    #[test]
    fn test_zero_window_never_blocks() {
        let cooldown = Cooldown::new(Duration::ZERO);
        assert!(cooldown.try_acquire().is_ok());
        assert!(cooldown.try_acquire().is_ok());
        assert_eq!(cooldown.remaining(), None);
    }

    #[test]
    fn test_extend_blocks_even_without_window() {
        let cooldown = Cooldown::new(Duration::ZERO);
        cooldown.extend(Duration::from_secs(30));
        assert!(cooldown.try_acquire().is_err());
        assert!(cooldown.remaining().unwrap() > Duration::from_secs(29));

        // A shorter extension never shortens an existing block
        cooldown.extend(Duration::from_secs(1));
        assert!(cooldown.remaining().unwrap() > Duration::from_secs(29));
    }

    #[test]
    fn test_cooldown_expires() {
        let cooldown = Cooldown::new(Duration::from_millis(20));
        assert!(cooldown.try_acquire().is_ok());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cooldown.try_acquire().is_ok());
    }

    #[test]
    fn test_last_good_keeps_previous_on_empty() {
        let last_good = LastGood::new();
        assert!(last_good.is_empty());

        let reading = RawSignal::Thermal(ThermalReading {
            station_id: "dhaka".to_string(),
            station: "Dhaka".to_string(),
            latitude: 23.81,
            longitude: 90.41,
            temperature_c: 35.0,
            humidity: None,
            observed_at: None,
        });

        last_good.store(&[reading.clone()]);
        last_good.store(&[]);
        assert_eq!(last_good.snapshot(), vec![reading]);
    }
}
