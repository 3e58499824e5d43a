use crate::error::{ConfigError, Result};
use crate::rhythm::Rhythm;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Two times closer than this are the same instant
pub const SYNC_EPSILON: f64 = 1e-9;

/// Where a time falls on a clock's beat grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyncPoint {
    /// Last beat at or before the time
    pub beat: i64,
    /// Time elapsed since that beat
    pub residual: f64,
}

/// Best destination-clock synchronisation found for a cross-clock throw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestSync {
    pub flt_beats: i32,
    pub dest_beats: i32,
    pub residual: f64,
}

/// Maps beat indices of one or more rows onto base time
///
/// A clock ticks `period` beats per cycle of length `cycle_time`; the beat
/// lengths inside a cycle follow its rhythm. Beat-to-time queries use a
/// prefix table built once from a sandbox copy of the rhythm, so they never
/// disturb the live position used while performing.
#[derive(Debug, Clone)]
pub struct Clock {
    period: usize,
    cycle_time: f64,
    unit: f64,
    rhythm: Rhythm,
    prefix: Vec<f64>,
    beat: i64,
    elapsed: f64,
}

impl Clock {
    pub fn new(period: usize, cycle_time: f64, rhythm: Rhythm) -> std::result::Result<Self, ConfigError> {
        if period == 0 {
            return Err(ConfigError::InvalidClock("period must be at least one beat".into()));
        }
        if !(cycle_time.is_finite() && cycle_time > 0.0) {
            return Err(ConfigError::InvalidClock(format!(
                "cycle time {cycle_time} must be positive"
            )));
        }
        if period % rhythm.period() != 0 {
            return Err(ConfigError::InvalidClock(format!(
                "rhythm of {} beats does not tile a period of {period}",
                rhythm.period()
            )));
        }

        let multipliers = rhythm.multipliers();
        let total: f64 = (0..period).map(|i| multipliers[i % multipliers.len()]).sum();
        let unit = cycle_time / total;

        let mut prefix = Vec::with_capacity(period + 1);
        let mut acc = 0.0;
        prefix.push(0.0);
        for i in 0..period {
            acc += multipliers[i % multipliers.len()] * unit;
            prefix.push(acc);
        }
        prefix[period] = cycle_time;

        let mut rhythm = rhythm;
        rhythm.restart();
        Ok(Clock {
            period,
            cycle_time,
            unit,
            rhythm,
            prefix,
            beat: 0,
            elapsed: 0.0,
        })
    }

    /// Clock whose beats all last `cycle_time / period`
    pub fn even(period: usize, cycle_time: f64) -> std::result::Result<Self, ConfigError> {
        Clock::new(period, cycle_time, Rhythm::even())
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn cycle_time(&self) -> f64 {
        self.cycle_time
    }

    /// Base-time length of a beat with multiplier 1
    pub fn unit(&self) -> f64 {
        self.unit
    }

    pub fn rhythm(&self) -> &Rhythm {
        &self.rhythm
    }

    /// Average beat length
    pub fn mean_beat(&self) -> f64 {
        self.cycle_time / self.period as f64
    }

    /// Same beat grid (period, cycle and beat lengths)
    pub fn same_grid(&self, other: &Clock) -> bool {
        self.period == other.period
            && (self.cycle_time - other.cycle_time).abs() <= SYNC_EPSILON
            && self
                .prefix
                .iter()
                .zip(&other.prefix)
                .all(|(a, b)| (a - b).abs() <= SYNC_EPSILON)
    }

    /// Base time at which `beat` starts; beats before zero extend backwards
    pub fn time_of(&self, beat: i64) -> f64 {
        let p = self.period as i64;
        let cycles = beat.div_euclid(p);
        let rem = beat.rem_euclid(p) as usize;
        cycles as f64 * self.cycle_time + self.prefix[rem]
    }

    /// Length of `beat`
    pub fn beat_duration(&self, beat: i64) -> f64 {
        self.time_of(beat + 1) - self.time_of(beat)
    }

    /// Elapsed base time from beat `from` to beat `to`
    pub fn get_interval(&self, from: i64, to: i64) -> f64 {
        self.time_of(to) - self.time_of(from)
    }

    /// Last beat at or before `time`, snapping within [`SYNC_EPSILON`]
    pub fn find_sync(&self, time: f64) -> SyncPoint {
        let cycles = (time / self.cycle_time).floor();
        let local = time - cycles * self.cycle_time;
        let idx = self
            .prefix
            .partition_point(|&t| t <= local + SYNC_EPSILON)
            .saturating_sub(1);
        let beat = cycles as i64 * self.period as i64 + idx as i64;
        let residual = if idx >= self.period {
            0.0
        } else {
            (local - self.prefix[idx]).max(0.0)
        };
        SyncPoint { beat, residual }
    }

    /// First beat starting at or after `time`
    pub fn first_beat_at_or_after(&self, time: f64) -> i64 {
        let sync = self.find_sync(time);
        if sync.residual <= SYNC_EPSILON {
            sync.beat
        } else {
            sync.beat + 1
        }
    }

    /// Choose flight and destination beats for a throw from `source` at
    /// `throw_beat` that should land on this clock at `landing_beat`.
    ///
    /// Destination-beat corrections are tried in the order 0, 1, -1, 2, -2 ...
    /// up to `max_correction`. A correction `d` is accepted when some source
    /// beat starts inside destination beat `landing_beat - d`; the throw then
    /// travels to that source beat and the remaining `d` beats on this clock.
    pub fn find_best_sync(
        &self,
        source: &Clock,
        throw_beat: i64,
        landing_beat: i64,
        max_correction: i32,
    ) -> Option<BestSync> {
        let throw_time = source.time_of(throw_beat);
        if self.time_of(landing_beat) + SYNC_EPSILON < throw_time {
            return None;
        }

        for delta in correction_order(max_correction) {
            let sync_beat = landing_beat - delta as i64;
            let window_start = self.time_of(sync_beat);
            let window_end = self.time_of(sync_beat + 1);
            let k = source.first_beat_at_or_after(window_start);
            let t = source.time_of(k);
            if t >= window_end - SYNC_EPSILON || k < throw_beat {
                continue;
            }
            let travel = k - throw_beat;
            trace!(delta, travel, "synchronised cross-clock throw");
            return Some(BestSync {
                flt_beats: (travel + delta as i64) as i32,
                dest_beats: delta,
                residual: (t - window_start).max(0.0),
            });
        }
        None
    }

    /// Current live beat index
    pub fn beat(&self) -> i64 {
        self.beat
    }

    /// Base time at which the live beat starts
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance the live position by one beat, returning its length
    pub fn tick(&mut self) -> Result<f64> {
        let duration = self.rhythm.next_beat()? * self.unit;
        self.beat += 1;
        self.elapsed += duration;
        Ok(duration)
    }

    /// Move the live position back by whole cycles, keeping `elapsed`
    /// equal to `time_of(beat)`
    pub fn wrap(&mut self, cycles: i64) {
        self.beat -= cycles * self.period as i64;
        self.elapsed -= cycles as f64 * self.cycle_time;
    }

    /// Jump the live position to the start of `beat`
    pub fn seek(&mut self, beat: i64) -> Result<()> {
        self.rhythm.restart();
        let skip = beat.rem_euclid(self.rhythm.period() as i64);
        for _ in 0..skip {
            self.rhythm.next_beat()?;
        }
        self.beat = beat;
        self.elapsed = self.time_of(beat);
        Ok(())
    }
}

/// 0, 1, -1, 2, -2, ... up to `max` in magnitude
fn correction_order(max: i32) -> impl Iterator<Item = i32> {
    std::iter::once(0).chain((1..=max.max(0)).flat_map(|d| [d, -d]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_clock_times() {
        let clock = Clock::even(3, 6.0).unwrap();
        assert_eq!(clock.time_of(0), 0.0);
        assert_eq!(clock.time_of(1), 2.0);
        assert_eq!(clock.time_of(3), 6.0);
        assert_eq!(clock.time_of(-1), -2.0);
        assert_eq!(clock.get_interval(1, 5), 8.0);
    }

    #[test]
    fn test_swing_clock_times() {
        let clock = Clock::new(2, 2.0, Rhythm::new(vec![1.5, 0.5]).unwrap()).unwrap();
        assert_eq!(clock.time_of(1), 1.5);
        assert_eq!(clock.time_of(2), 2.0);
        assert_eq!(clock.time_of(3), 3.5);
        assert_eq!(clock.beat_duration(0), 1.5);
        assert_eq!(clock.beat_duration(1), 0.5);
    }

    #[test]
    fn test_rhythm_must_tile_period() {
        let rhythm = Rhythm::new(vec![1.0, 2.0]).unwrap();
        assert!(Clock::new(3, 3.0, rhythm).is_err());
        assert!(Clock::even(0, 1.0).is_err());
        assert!(Clock::even(2, 0.0).is_err());
    }

    #[test]
    fn test_find_sync() {
        let clock = Clock::even(2, 6.0).unwrap();
        assert_eq!(clock.find_sync(4.0), SyncPoint { beat: 1, residual: 1.0 });
        assert_eq!(clock.find_sync(6.0), SyncPoint { beat: 2, residual: 0.0 });
        let near = clock.find_sync(6.0 - 1e-12);
        assert_eq!(near.beat, 2);
        assert_eq!(near.residual, 0.0);
        assert_eq!(clock.find_sync(-1.0).beat, -1);
    }

    #[test]
    fn test_wraparound_interval() {
        let clock = Clock::even(4, 4.0).unwrap();
        assert_eq!(clock.get_interval(3, 5), 2.0);
        assert_eq!(clock.find_sync(9.5), SyncPoint { beat: 9, residual: 0.5 });
    }

    #[test]
    fn test_find_best_sync_exact() {
        let three = Clock::even(3, 6.0).unwrap();
        let two = Clock::even(2, 6.0).unwrap();
        // From beat 0 of the 3-clock to beat 2 of the 2-clock: both at t = 6.
        let sync = two.find_best_sync(&three, 0, 2, 4).unwrap();
        assert_eq!(sync.flt_beats, 3);
        assert_eq!(sync.dest_beats, 0);
        assert_eq!(sync.residual, 0.0);
    }

    #[test]
    fn test_find_best_sync_with_residual() {
        let three = Clock::even(3, 6.0).unwrap();
        let two = Clock::even(2, 6.0).unwrap();
        // 2-clock beat 1 covers [3, 6); the 3-clock beat 2 starts inside it at 4.
        let sync = two.find_best_sync(&three, 0, 1, 4).unwrap();
        assert_eq!(sync.dest_beats, 0);
        assert_eq!(sync.flt_beats, 2);
        assert_eq!(sync.residual, 1.0);
    }

    #[test]
    fn test_find_best_sync_rejects_backwards() {
        let three = Clock::even(3, 6.0).unwrap();
        let two = Clock::even(2, 6.0).unwrap();
        assert!(two.find_best_sync(&three, 5, 1, 4).is_none());
    }

    #[test]
    fn test_live_ticks() {
        let mut clock = Clock::new(2, 2.0, Rhythm::new(vec![1.5, 0.5]).unwrap()).unwrap();
        assert_eq!(clock.tick().unwrap(), 1.5);
        assert_eq!(clock.tick().unwrap(), 0.5);
        assert_eq!(clock.beat(), 2);
        assert_eq!(clock.elapsed(), 2.0);
        clock.wrap(1);
        assert_eq!(clock.beat(), 0);
        assert_eq!(clock.elapsed(), 0.0);
        clock.seek(3).unwrap();
        assert_eq!(clock.elapsed(), 3.5);
        assert_eq!(clock.tick().unwrap(), 0.5);
    }

    #[test]
    fn test_correction_order() {
        let order: Vec<i32> = correction_order(2).collect();
        assert_eq!(order, vec![0, 1, -1, 2, -2]);
    }
}
