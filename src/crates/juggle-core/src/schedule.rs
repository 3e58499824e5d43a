//! Beat-by-beat throw event stream.
//!
//! [`Pattern::advance_beat`] is the only operation that moves a pattern's
//! live clocks. Everything that wants to see the future works on a clone.

use crate::clock::SYNC_EPSILON;
use crate::error::{InvariantViolation, Result};
use crate::pattern::Pattern;
use crate::throw::ThrowLoc;
use crate::throw_sequence::ClockId;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Clock cycles played before live timestamps are shifted back towards zero
pub const WRAP_CYCLES: i64 = 64;

/// A prop leaving a row, with everything needed to place it in flight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowEvent {
    pub loc: ThrowLoc,
    /// Live beat of the throwing row
    pub beat: i64,
    /// Base time at which the throwing beat starts
    pub time: f64,
    /// Base time at which the prop leaves the hand
    pub release_time: f64,
    pub dest_row: usize,
    /// Live beat of the catching row on which the prop is thrown again
    pub land_beat: i64,
    /// Base time at which the catching beat starts
    pub land_time: f64,
    /// Base time at which the prop is caught
    pub catch_time: f64,
    /// Base time spent in the air
    pub flight_time: f64,
    pub bounces: u32,
    pub force_throw: bool,
    pub early_catch: bool,
}

impl ThrowEvent {
    /// Move every timestamp `dt` later
    pub fn offset(&mut self, dt: f64) {
        self.time += dt;
        self.release_time += dt;
        self.land_time += dt;
        self.catch_time += dt;
    }
}

/// What one call to [`Pattern::advance_beat`] played
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatReport {
    /// Base time of the beat that fired
    pub time: f64,
    /// Rows whose clock fired on this beat
    pub rows: Vec<usize>,
    pub events: Vec<ThrowEvent>,
    /// Base time subtracted from every live clock after the beat, zero
    /// unless the clocks wrapped
    pub shift: f64,
}

impl Pattern {
    /// Clocks due to fire at the current live time
    fn due_clocks(&self) -> Vec<ClockId> {
        let now = self.now();
        (0..self.clocks.len())
            .filter(|&id| self.clocks[id].elapsed() - now <= SYNC_EPSILON)
            .collect()
    }

    /// Play the next beat: every clock due now fires once, each of its rows
    /// takes the next column from its cursor, and every prop thrown from
    /// those columns is reported.
    pub fn advance_beat(&mut self) -> Result<BeatReport> {
        let time = self.now();
        let due = self.due_clocks();
        let rows: Vec<usize> = self
            .rows
            .iter()
            .filter(|seq| due.contains(&seq.clock()))
            .map(|seq| seq.row())
            .collect();

        let mut events = Vec::new();
        for &r in &rows {
            let column = self.cursors[r]
                .next_item()?
                .ok_or(InvariantViolation::SequenceExhausted)?;
            let seq = &self.rows[r];
            let src = &self.clocks[seq.clock()];
            let beat = src.beat();
            let col = beat.rem_euclid(seq.period() as i64) as usize;

            for (slot, throw) in column.iter().enumerate().filter(|(_, t)| t.is_prop()) {
                let landing = self.land(r, beat, throw);
                let dst = &self.clocks[self.rows[landing.row].clock()];
                let start = src.time_of(beat);
                let release_time = start + throw.pre_dwell * src.beat_duration(beat);
                let catch_time = landing.time - throw.post_dwell * dst.beat_duration(landing.beat - 1);
                events.push(ThrowEvent {
                    loc: ThrowLoc::new(r, col, slot),
                    beat,
                    time: start,
                    release_time,
                    dest_row: landing.row,
                    land_beat: landing.beat,
                    land_time: landing.time,
                    catch_time,
                    flight_time: (catch_time - release_time).max(0.0),
                    bounces: throw.bounces,
                    force_throw: throw.force_throw,
                    early_catch: throw.early_catch,
                });
            }
        }

        for id in due {
            self.clocks[id].tick()?;
        }
        let shift = self.wrap_if_due();
        trace!(time, rows = rows.len(), events = events.len(), "beat");
        Ok(BeatReport {
            time,
            rows,
            events,
            shift,
        })
    }

    /// Shift every clock back by [`WRAP_CYCLES`] cycles once all of them
    /// have passed that many
    fn wrap_if_due(&mut self) -> f64 {
        let due = self
            .clocks
            .iter()
            .all(|c| c.beat() >= WRAP_CYCLES * c.period() as i64);
        if !due {
            return 0.0;
        }
        for clock in &mut self.clocks {
            clock.wrap(WRAP_CYCLES);
        }
        WRAP_CYCLES as f64 * self.horizon
    }

    /// Events of the next `beats` beats, played on a sandbox copy.
    ///
    /// Timestamps continue past any wrap so they increase monotonically from
    /// the live time.
    pub fn lookahead(&self, beats: usize) -> Result<Vec<ThrowEvent>> {
        let mut sandbox = self.clone();
        let mut offset = 0.0;
        let mut events = Vec::new();
        for _ in 0..beats {
            let report = sandbox.advance_beat()?;
            for mut event in report.events {
                event.offset(offset);
                events.push(event);
            }
            offset += report.shift;
        }
        Ok(events)
    }

    /// Move every clock back to beat zero
    pub fn rewind(&mut self) -> Result<()> {
        for clock in &mut self.clocks {
            clock.seek(0)?;
        }
        self.rebuild_cursors()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mhn::Mhn;

    fn pattern(json: &str) -> Pattern {
        let mhn: Mhn = serde_json::from_str(json).unwrap();
        Pattern::from_mhn(&mhn).unwrap()
    }

    #[test]
    fn test_cascade_events() {
        let mut p = pattern("3");
        let report = p.advance_beat().unwrap();
        assert_eq!(report.time, 0.0);
        assert_eq!(report.events.len(), 1);
        let event = &report.events[0];
        assert_eq!(event.land_beat, 3);
        assert_eq!(event.land_time, 3.0);
        assert_eq!(event.catch_time, 2.5);
        assert_eq!(event.flight_time, 2.5);
        assert_eq!(p.advance_beat().unwrap().time, 1.0);
    }

    #[test]
    fn test_placeholders_are_silent() {
        let mut p = pattern("[5,0,1]");
        let counts: Vec<usize> = (0..3).map(|_| p.advance_beat().unwrap().events.len()).collect();
        assert_eq!(counts, vec![1, 0, 1]);
    }

    #[test]
    fn test_two_clocks_interleave() {
        let mut p = pattern("[[[1,3],[0,0],[0,0]],[[0,2],[1,0]]]");
        let reports: Vec<BeatReport> = (0..5).map(|_| p.advance_beat().unwrap()).collect();
        let times: Vec<f64> = reports.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 3.0, 4.0, 6.0]);
        let counts: Vec<usize> = reports.iter().map(|r| r.events.len()).collect();
        assert_eq!(counts, vec![2, 0, 0, 0, 2]);
        assert_eq!(reports[0].rows, vec![0, 1]);
        assert_eq!(reports[1].rows, vec![0]);
        assert_eq!(reports[2].rows, vec![1]);
    }

    #[test]
    fn test_wraparound() {
        let mut p = pattern("3");
        let mut last = None;
        for _ in 0..WRAP_CYCLES {
            last = Some(p.advance_beat().unwrap());
        }
        assert_eq!(last.unwrap().shift, WRAP_CYCLES as f64);
        let next = p.advance_beat().unwrap();
        assert_eq!(next.time, 0.0);
        assert_eq!(next.events[0].land_time, 3.0);
    }

    #[test]
    fn test_lookahead_leaves_live_state() {
        let p = pattern("[5,3,1]");
        let events = p.lookahead(6).unwrap();
        assert_eq!(events.len(), 6);
        let heights: Vec<i64> = events.iter().map(|e| e.land_beat - e.beat).collect();
        assert_eq!(heights, vec![5, 3, 1, 5, 3, 1]);
        assert_eq!(p.now(), 0.0);
        assert_eq!(p.clocks()[0].beat(), 0);
    }

    #[test]
    fn test_lookahead_is_monotonic_across_wrap() {
        let p = pattern("3");
        let events = p.lookahead(WRAP_CYCLES as usize + 4).unwrap();
        assert!(events.windows(2).all(|w| w[1].time > w[0].time));
        assert_eq!(events.last().unwrap().time, (WRAP_CYCLES + 3) as f64);
    }

    #[test]
    fn test_edit_keeps_live_position() {
        let mut p = pattern("[5,3,1]");
        p.advance_beat().unwrap();
        p.rotate_throws(None, 1).unwrap();
        let event = &p.advance_beat().unwrap().events[0];
        assert_eq!(event.beat, 1);
        // After rotation column 1 holds the former column 0
        assert_eq!(event.land_beat - event.beat, 5);
        p.rewind().unwrap();
        assert_eq!(p.now(), 0.0);
    }
}
