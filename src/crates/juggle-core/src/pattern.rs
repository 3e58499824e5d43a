use crate::clock::Clock;
use crate::error::{ConfigError, InvariantViolation, Result};
use crate::mhn::{normalize, Mhn, RowThrows};
use crate::rhythm::Rhythm;
use crate::seq::Sequence;
use crate::throw::{Throw, ThrowLoc};
use crate::throw_sequence::{ClockId, ThrowSequence};
use juggle_physics::{Physics, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Most throws a single column may hold
pub const MAX_MULTIPLEX: usize = 4;

/// Most rows a pattern may hold
pub const MAX_ROWS: usize = 16;

/// Longest row period
pub const MAX_PERIOD: usize = 64;

/// Tallest throw, and largest destination-beat offset, in beats
pub const MAX_HEIGHT: usize = 64;

/// Tolerance when checking that the prop count is an integer
pub const PROP_EPSILON: f64 = 1e-6;

/// Largest destination-beat correction tried when re-synchronising a throw
pub const MAX_DEST_BEATS: i32 = 8;

/// Size limits applied to every construction and edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub max_rows: usize,
    pub max_period: usize,
    pub max_multiplex: usize,
    pub max_height: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_rows: MAX_ROWS,
            max_period: MAX_PERIOD,
            max_multiplex: MAX_MULTIPLEX,
            max_height: MAX_HEIGHT,
        }
    }
}

/// Where and when a throw comes down
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landing {
    pub row: usize,
    pub beat: i64,
    pub time: f64,
    pub residual: f64,
}

/// A column whose arrivals do not match its departures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collision {
    pub row: usize,
    pub col: usize,
    pub arriving: usize,
    pub departing: usize,
}

/// A complete MHN+ pattern: rows of throws, the clocks they run on, and the
/// number of props in play
///
/// Every edit runs on a scratch copy; the copy replaces `self` only when the
/// recomputed prop count equals the declared one, so a failed edit leaves
/// the pattern exactly as it was.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub(crate) rows: Vec<ThrowSequence>,
    pub(crate) clocks: Vec<Clock>,
    pub(crate) props: i64,
    pub(crate) horizon: f64,
    pub(crate) limits: Limits,
    pub(crate) selected: BTreeSet<ThrowLoc>,
    pub(crate) cursors: Vec<Sequence<Vec<Throw>>>,
}

pub(crate) fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

pub(crate) fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        0
    } else {
        a / gcd(a, b) * b
    }
}

impl Pattern {
    /// Build a pattern from nested-array notation
    pub fn from_mhn(mhn: &Mhn) -> Result<Self> {
        Pattern::with_limits(mhn, Limits::default())
    }

    pub fn with_limits(mhn: &Mhn, limits: Limits) -> Result<Self> {
        Pattern::from_throws(normalize(mhn)?, limits)
    }

    /// Build from explicit rows of columns of throws. Rows with equal
    /// periods share an even clock; every clock spans the least common
    /// multiple of the row periods.
    pub fn from_throws(rows: Vec<RowThrows>, limits: Limits) -> Result<Self> {
        check_shape(&rows, &limits)?;
        let horizon = rows.iter().map(Vec::len).fold(1, lcm) as f64;

        let mut clocks = Vec::new();
        let mut by_period: BTreeMap<usize, ClockId> = BTreeMap::new();
        let mut sequences = Vec::with_capacity(rows.len());
        for (r, columns) in rows.into_iter().enumerate() {
            let period = columns.len();
            let clock = match by_period.get(&period) {
                Some(&id) => id,
                None => {
                    clocks.push(Clock::even(period, horizon)?);
                    by_period.insert(period, clocks.len() - 1);
                    clocks.len() - 1
                }
            };
            sequences.push(ThrowSequence::new(r, clock, columns));
        }

        let mut pattern = Pattern {
            rows: sequences,
            clocks,
            props: 0,
            horizon,
            limits,
            selected: BTreeSet::new(),
            cursors: Vec::new(),
        };
        pattern.resync()?;
        pattern.props = pattern.calc_props()?;
        pattern.rebuild_cursors()?;
        debug!(
            rows = pattern.rows.len(),
            clocks = pattern.clocks.len(),
            props = pattern.props,
            "pattern built"
        );
        Ok(pattern)
    }

    pub fn rows(&self) -> &[ThrowSequence] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, row: usize) -> std::result::Result<&ThrowSequence, ConfigError> {
        self.rows.get(row).ok_or(ConfigError::UnknownRow {
            row,
            rows: self.rows.len(),
        })
    }

    pub fn clocks(&self) -> &[Clock] {
        &self.clocks
    }

    /// Clock driving `row`
    pub fn clock_of(&self, row: usize) -> std::result::Result<&Clock, ConfigError> {
        Ok(&self.clocks[self.row(row)?.clock()])
    }

    pub fn is_multi_clock(&self) -> bool {
        self.clocks.len() > 1
    }

    /// Number of props in play
    pub fn props(&self) -> usize {
        self.props.max(0) as usize
    }

    /// Base-time length of one clock cycle
    pub fn horizon(&self) -> f64 {
        self.horizon
    }

    /// Least common multiple of the row periods
    pub fn period(&self) -> usize {
        self.rows.iter().map(ThrowSequence::period).fold(1, lcm)
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn throw(&self, loc: ThrowLoc) -> Option<&Throw> {
        self.rows.get(loc.row).and_then(|r| r.throw(loc.col, loc.slot))
    }

    pub(crate) fn check_loc(&self, loc: ThrowLoc) -> std::result::Result<(), ConfigError> {
        match self.throw(loc) {
            Some(_) => Ok(()),
            None => Err(ConfigError::UnknownThrow(loc)),
        }
    }

    /// Every throw location in row, column, slot order
    pub fn locations(&self) -> Vec<ThrowLoc> {
        self.rows
            .iter()
            .flat_map(|r| r.throws().map(|(loc, _)| loc))
            .collect()
    }

    /// Where a throw made at `beat` from `row` comes down
    pub fn land(&self, row: usize, beat: i64, throw: &Throw) -> Landing {
        let src_id = self.rows[row].clock();
        let dst_id = self.rows[throw.dest_row].clock();
        let src = &self.clocks[src_id];
        let dst = &self.clocks[dst_id];

        if src_id == dst_id {
            let beat = beat + throw.flt_beats as i64;
            return Landing {
                row: throw.dest_row,
                beat,
                time: src.time_of(beat),
                residual: 0.0,
            };
        }

        let target = src.time_of(beat + (throw.flt_beats - throw.dest_beats) as i64);
        let sync = dst.find_sync(target);
        let beat = sync.beat + throw.dest_beats as i64;
        Landing {
            row: throw.dest_row,
            beat,
            time: dst.time_of(beat),
            residual: sync.residual,
        }
    }

    /// Landing of the throw at `loc`, thrown during the first cycle
    pub fn landing(&self, loc: ThrowLoc) -> std::result::Result<Landing, ConfigError> {
        let throw = self.throw(loc).ok_or(ConfigError::UnknownThrow(loc))?;
        Ok(self.land(loc.row, loc.col as i64, throw))
    }

    /// Base time between release beat and landing beat of the throw at `loc`
    pub fn flight_span(&self, loc: ThrowLoc) -> std::result::Result<f64, ConfigError> {
        let landing = self.landing(loc)?;
        Ok(landing.time - self.clocks[self.rows[loc.row].clock()].time_of(loc.col as i64))
    }

    /// Longest base-time span of any throw
    pub fn max_flight_span(&self) -> f64 {
        self.locations()
            .into_iter()
            .filter_map(|loc| self.flight_span(loc).ok())
            .fold(0.0, f64::max)
    }

    /// Re-derive synchronisation residuals and reject throws that land in
    /// the past. Throws between rows sharing a clock never carry
    /// destination beats.
    pub(crate) fn resync(&mut self) -> std::result::Result<(), ConfigError> {
        let rows = self.rows.len();
        let mut updates = Vec::new();
        for seq in &self.rows {
            for (loc, throw) in seq.throws() {
                if throw.dest_row >= rows {
                    return Err(ConfigError::UnknownRow {
                        row: throw.dest_row,
                        rows,
                    });
                }
                if throw.flt_beats < 0 {
                    return Err(ConfigError::NegativeHeight {
                        loc,
                        height: throw.flt_beats as i64,
                    });
                }
                let shared = seq.clock() == self.rows[throw.dest_row].clock();
                let mut probe = throw.clone();
                if shared {
                    probe.dest_beats = 0;
                }
                let travel = (probe.flt_beats - probe.dest_beats) as i64;
                if travel < 0 {
                    return Err(ConfigError::NegativeHeight { loc, height: travel });
                }
                let landing = self.land(loc.row, loc.col as i64, &probe);
                let start = self.clocks[seq.clock()].time_of(loc.col as i64);
                if landing.time + crate::clock::SYNC_EPSILON < start {
                    return Err(ConfigError::NegativeHeight {
                        loc,
                        height: landing.beat - loc.col as i64,
                    });
                }
                updates.push((loc, probe.dest_beats, landing.residual));
            }
        }
        for (loc, dest_beats, residual) in updates {
            if let Some(throw) = self.rows[loc.row].throw_mut(loc.col, loc.slot) {
                throw.dest_beats = dest_beats;
                throw.sync = residual;
            }
        }
        Ok(())
    }

    /// Prop count implied by the throws, before the integer check
    ///
    /// Each throw contributes the fraction of a cycle it spends in the air:
    /// source beats over the source period, minus the synchronisation
    /// residual, plus destination beats over the destination period.
    pub fn raw_props(&self) -> f64 {
        let mut total = 0.0;
        for seq in &self.rows {
            let period = seq.period() as f64;
            let clock = &self.clocks[seq.clock()];
            for (_, throw) in seq.throws() {
                let dest = &self.rows[throw.dest_row];
                if dest.clock() == seq.clock() {
                    total += throw.flt_beats as f64 / period;
                } else {
                    let residual_beats = throw.sync / clock.mean_beat();
                    total += (throw.flt_beats - throw.dest_beats) as f64 / period
                        - residual_beats / period
                        + throw.dest_beats as f64 / dest.period() as f64;
                }
            }
        }
        total
    }

    /// Prop count, which must come out as an integer
    pub fn calc_props(&self) -> std::result::Result<i64, InvariantViolation> {
        let raw = self.raw_props();
        let rounded = raw.round();
        if (raw - rounded).abs() > PROP_EPSILON || rounded < 0.0 {
            return Err(InvariantViolation::NonIntegralProps { value: raw });
        }
        Ok(rounded as i64)
    }

    pub(crate) fn check_limits(&self) -> std::result::Result<(), ConfigError> {
        let rows: Vec<RowThrows> = self.rows.iter().map(|r| r.columns().to_vec()).collect();
        check_shape(&rows, &self.limits)
    }

    /// Validate `scratch` and install it in place of `self`
    pub(crate) fn commit(&mut self, mut scratch: Pattern, delta: i64, operation: &'static str) -> Result<()> {
        scratch.check_limits()?;
        scratch.resync()?;
        let computed = scratch.calc_props()?;
        let declared = self.props + delta;
        if computed != declared {
            return Err(InvariantViolation::PropMismatch {
                operation,
                declared,
                computed,
            }
            .into());
        }
        scratch.props = declared;
        scratch.prune_selection();
        scratch.invalidate_flights();
        scratch.rebuild_cursors()?;
        debug!(operation, props = declared, "pattern edited");
        *self = scratch;
        Ok(())
    }

    fn invalidate_flights(&mut self) {
        for seq in &mut self.rows {
            seq.throws_mut().for_each(Throw::invalidate);
        }
    }

    /// Re-create the column cursors at each clock's live beat
    pub(crate) fn rebuild_cursors(&mut self) -> Result<()> {
        let mut cursors = Vec::with_capacity(self.rows.len());
        for seq in &self.rows {
            let mut cursor = seq.cursor();
            let beat = self.clocks[seq.clock()].beat();
            let skip = beat.rem_euclid(seq.period() as i64) as usize;
            for _ in 0..skip {
                cursor.next_item()?;
            }
            cursors.push(cursor);
        }
        self.cursors = cursors;
        Ok(())
    }

    /// Live time at which the next beat of any clock is due
    pub fn now(&self) -> f64 {
        self.clocks
            .iter()
            .map(Clock::elapsed)
            .fold(f64::INFINITY, f64::min)
    }

    /// New even clock for `period` beats, aligned with the live position
    fn spawn_clock(&self, period: usize, rhythm: Rhythm) -> Result<Clock> {
        let mut clock = Clock::new(period, self.horizon, rhythm)?;
        let now = self.now();
        if now.is_finite() {
            clock.seek(clock.first_beat_at_or_after(now))?;
        }
        Ok(clock)
    }

    /// Give `row` a clock matching its period: share one with another row of
    /// the same period if possible, otherwise create a new even clock.
    pub(crate) fn assign_clock(&mut self, row: usize) -> Result<()> {
        let period = self.rows[row].period();
        let current = self.rows[row].clock();
        let sole_user = self
            .rows
            .iter()
            .enumerate()
            .all(|(i, r)| i == row || r.clock() != current);
        if self.clocks[current].period() == period && sole_user {
            return Ok(());
        }

        let peer = self
            .rows
            .iter()
            .enumerate()
            .find(|(i, r)| *i != row && r.period() == period && self.clocks[r.clock()].period() == period)
            .map(|(_, r)| r.clock());

        let id = match peer {
            Some(id) => id,
            None if self.clocks[current].period() == period => current,
            None => {
                let clock = self.spawn_clock(period, Rhythm::even())?;
                self.clocks.push(clock);
                self.clocks.len() - 1
            }
        };
        trace!(row, clock = id, period, "assigned clock");
        self.rows[row].set_clock(id);
        self.collect_clocks();
        Ok(())
    }

    /// Rebuild every clock from scratch with a new cycle length
    pub(crate) fn reset_clocks(&mut self) -> Result<()> {
        self.horizon = self.period() as f64;
        let now = self.now();
        let mut clocks: Vec<Clock> = Vec::new();
        let mut by_period: BTreeMap<usize, ClockId> = BTreeMap::new();
        for seq in &mut self.rows {
            let period = seq.period();
            let id = match by_period.get(&period) {
                Some(&id) => id,
                None => {
                    let mut clock = Clock::even(period, self.horizon)?;
                    if now.is_finite() {
                        clock.seek(clock.first_beat_at_or_after(now))?;
                    }
                    clocks.push(clock);
                    by_period.insert(period, clocks.len() - 1);
                    clocks.len() - 1
                }
            };
            seq.set_clock(id);
        }
        self.clocks = clocks;
        Ok(())
    }

    /// Drop clocks no row uses
    fn collect_clocks(&mut self) {
        let mut remap: BTreeMap<ClockId, ClockId> = BTreeMap::new();
        let mut kept = Vec::new();
        for seq in &self.rows {
            let old = seq.clock();
            if !remap.contains_key(&old) {
                remap.insert(old, kept.len());
                kept.push(self.clocks[old].clone());
            }
        }
        for seq in &mut self.rows {
            let new = remap[&seq.clock()];
            seq.set_clock(new);
        }
        self.clocks = kept;
    }

    /// Re-derive `row`'s clock from its period, merging with a row of equal
    /// period when one exists
    pub fn set_clock(&mut self, row: usize) -> Result<()> {
        self.row(row)?;
        let mut scratch = self.clone();
        scratch.assign_clock(row)?;
        self.commit(scratch, 0, "set_clock")
    }

    /// Drive every row sharing `row`'s clock with `rhythm`
    pub fn set_rhythm(&mut self, row: usize, rhythm: Rhythm) -> Result<()> {
        let id = self.row(row)?.clock();
        let mut scratch = self.clone();
        let period = scratch.clocks[id].period();
        let mut clock = Clock::new(period, scratch.horizon, rhythm)?;
        clock.seek(scratch.clocks[id].beat())?;
        scratch.clocks[id] = clock;
        self.commit(scratch, 0, "set_rhythm")
    }

    /// Apply release and catch dwell fractions to every throw
    pub fn set_dwell(&mut self, pre_dwell: f64, post_dwell: f64) -> Result<()> {
        for dwell in [pre_dwell, post_dwell] {
            if !(0.0..=1.0).contains(&dwell) {
                return Err(ConfigError::InvalidDwell(dwell).into());
            }
        }
        for seq in &mut self.rows {
            for throw in seq.throws_mut() {
                throw.pre_dwell = pre_dwell;
                throw.post_dwell = post_dwell;
                throw.invalidate();
            }
        }
        self.rebuild_cursors()
    }

    /// Configure floor bounces for one throw
    pub fn set_bounces(
        &mut self,
        loc: ThrowLoc,
        bounces: u32,
        force_throw: bool,
        early_catch: bool,
    ) -> Result<()> {
        self.check_loc(loc)?;
        if let Some(throw) = self.rows[loc.row].throw_mut(loc.col, loc.slot) {
            throw.bounces = bounces;
            throw.force_throw = force_throw;
            throw.early_catch = early_catch;
            throw.invalidate();
        }
        self.rebuild_cursors()
    }

    /// Solve the launch of the throw at `loc`, caching the flight on the throw
    pub fn solve_throw(
        &mut self,
        loc: ThrowLoc,
        origin: Vec3,
        dest: Vec3,
        duration: f64,
        physics: &Physics,
    ) -> Result<crate::throw::Flight> {
        self.check_loc(loc)?;
        let throw = self.rows[loc.row]
            .throw_mut(loc.col, loc.slot)
            .ok_or(ConfigError::UnknownThrow(loc))?;
        let flight = *throw.solve(origin, dest, duration, physics)?;
        Ok(flight)
    }

    /// Columns whose arrivals differ from their departures
    pub fn collisions(&self) -> Vec<Collision> {
        let mut arrivals: Vec<Vec<usize>> =
            self.rows.iter().map(|r| vec![0; r.period()]).collect();
        for seq in &self.rows {
            for (loc, throw) in seq.throws() {
                if !throw.is_prop() {
                    continue;
                }
                let landing = self.land(loc.row, loc.col as i64, throw);
                let period = self.rows[landing.row].period() as i64;
                arrivals[landing.row][landing.beat.rem_euclid(period) as usize] += 1;
            }
        }

        let mut collisions = Vec::new();
        for seq in &self.rows {
            for (col, column) in seq.columns().iter().enumerate() {
                let departing = column.iter().filter(|t| t.is_prop()).count();
                let arriving = arrivals[seq.row()][col];
                if arriving != departing {
                    collisions.push(Collision {
                        row: seq.row(),
                        col,
                        arriving,
                        departing,
                    });
                }
            }
        }
        collisions
    }

    /// Every prop that lands is thrown again, and nothing is thrown from an
    /// empty hand
    pub fn is_valid(&self) -> bool {
        self.collisions().is_empty()
    }

    /// Canonical nested-array notation: always rows, columns, slots, tuples
    ///
    /// The export is lossy: tuples carry destination, height, destination
    /// beats and bounces only. `force_throw`, `early_catch`, dwell and rhythm
    /// come back as defaults when the result is read with [`Pattern::from_mhn`].
    pub fn get_mhn(&self) -> Mhn {
        Mhn::List(self.rows.iter().map(ThrowSequence::to_mhn).collect())
    }

    pub fn selected(&self) -> &BTreeSet<ThrowLoc> {
        &self.selected
    }

    pub fn select(&mut self, loc: ThrowLoc) -> Result<()> {
        self.check_loc(loc)?;
        self.selected.insert(loc);
        Ok(())
    }

    pub fn deselect(&mut self, loc: ThrowLoc) -> bool {
        self.selected.remove(&loc)
    }

    /// Select every throw of `row`
    pub fn select_row(&mut self, row: usize) -> Result<()> {
        let locs: Vec<ThrowLoc> = self.row(row)?.throws().map(|(loc, _)| loc).collect();
        self.selected.extend(locs);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    fn prune_selection(&mut self) {
        let valid: BTreeSet<ThrowLoc> = self
            .selected
            .iter()
            .copied()
            .filter(|loc| self.throw(*loc).is_some())
            .collect();
        self.selected = valid;
    }
}

impl TryFrom<&Mhn> for Pattern {
    type Error = crate::error::Error;

    fn try_from(mhn: &Mhn) -> Result<Self> {
        Pattern::from_mhn(mhn)
    }
}

fn check_shape(rows: &[RowThrows], limits: &Limits) -> std::result::Result<(), ConfigError> {
    if rows.is_empty() {
        return Err(ConfigError::MalformedNotation("pattern has no rows".into()));
    }
    if rows.len() > limits.max_rows {
        return Err(ConfigError::TooManyRows {
            rows: rows.len(),
            limit: limits.max_rows,
        });
    }
    for row in rows {
        if row.is_empty() || row.len() > limits.max_period {
            return Err(ConfigError::PeriodLimit {
                period: row.len(),
                limit: limits.max_period,
            });
        }
        if let Some(slots) = row.iter().map(Vec::len).find(|&n| n > limits.max_multiplex) {
            return Err(ConfigError::MultiplexLimit {
                slots,
                limit: limits.max_multiplex,
            });
        }
        for throw in row.iter().flatten() {
            let height = throw.flt_beats.unsigned_abs().max(throw.dest_beats.unsigned_abs());
            if height as usize > limits.max_height {
                return Err(ConfigError::HeightLimit {
                    height: height as i64,
                    limit: limits.max_height,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn pattern(json: &str) -> Pattern {
        let mhn: Mhn = serde_json::from_str(json).unwrap();
        Pattern::from_mhn(&mhn).unwrap()
    }

    #[test]
    fn test_vanilla_props() {
        assert_eq!(pattern("3").props(), 3);
        assert_eq!(pattern("[5,3,1]").props(), 3);
        assert_eq!(pattern("[4,4,1]").props(), 3);
        assert_eq!(pattern("[[4,3],1,4]").props(), 4);
    }

    #[test]
    fn test_non_integral_props_rejected() {
        let mhn: Mhn = serde_json::from_str("[5,3,2]").unwrap();
        let err = Pattern::from_mhn(&mhn).unwrap_err();
        assert!(matches!(
            err,
            Error::Invariant(InvariantViolation::NonIntegralProps { .. })
        ));
    }

    #[test]
    fn test_three_row_scenario() {
        // Three rows on one clock, each passing a two-beat throw to the next.
        let p = pattern("[[[1,2]],[[2,2]],[[0,2]]]");
        assert_eq!(p.num_rows(), 3);
        assert_eq!(p.props(), 6);
        assert!(!p.is_multi_clock());
        assert!(p.is_valid());
    }

    #[test]
    fn test_shared_clock_by_period() {
        let p = pattern("[[[0,3],[0,3]],[[1,3],[1,3]]]");
        assert_eq!(p.clocks().len(), 1);
        assert_eq!(p.horizon(), 2.0);
    }

    #[test]
    fn test_cross_clock_pattern() {
        let p = pattern("[[[1,3],[0,0],[0,0]],[[0,2],[1,0]]]");
        assert_eq!(p.clocks().len(), 2);
        assert_eq!(p.horizon(), 6.0);
        assert_eq!(p.props(), 2);
        let landing = p.landing(ThrowLoc::new(0, 0, 0)).unwrap();
        assert_eq!(landing.row, 1);
        assert_eq!(landing.beat, 2);
        assert_eq!(landing.time, 6.0);
        assert!(p.is_valid());
    }

    #[test]
    fn test_cross_clock_residual() {
        // Row 0 (3 beats of 2) throws from t=2 to row 1 (2 beats of 3), arriving
        // on the beat starting at 3, one unit before the source beat at 4.
        let p = pattern("[[[0,0],[1,1],[0,0]],[[1,0],[0,2]]]");
        let throw = p.throw(ThrowLoc::new(0, 1, 0)).unwrap();
        assert_eq!(throw.sync(), 1.0);
        assert_eq!(p.landing(ThrowLoc::new(0, 1, 0)).unwrap().time, 3.0);
    }

    #[test]
    fn test_same_clock_dest_beats_forced_zero() {
        let p = pattern("[[[1,3,1]],[[0,3]]]");
        assert_eq!(p.throw(ThrowLoc::new(0, 0, 0)).unwrap().dest_beats, 0);
    }

    #[test]
    fn test_limits() {
        let mhn: Mhn = serde_json::from_str("[[5,5,5,5,5],0,0,0,0]").unwrap();
        let err = Pattern::from_mhn(&mhn).unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MultiplexLimit { slots: 5, limit: 4 })
        ));
        let limits = Limits {
            max_period: 2,
            ..Limits::default()
        };
        let mhn: Mhn = serde_json::from_str("[5,3,1]").unwrap();
        assert!(Pattern::with_limits(&mhn, limits).is_err());
    }

    #[test]
    fn test_height_limit() {
        assert_eq!(pattern("[64]").props(), 64);
        let mhn: Mhn = serde_json::from_str("[65]").unwrap();
        assert!(matches!(
            Pattern::from_mhn(&mhn).unwrap_err(),
            Error::Config(ConfigError::HeightLimit { height: 65, limit: MAX_HEIGHT })
        ));

        let limits = Limits {
            max_height: 4,
            ..Limits::default()
        };
        let mhn: Mhn = serde_json::from_str("[5,3,1]").unwrap();
        assert!(matches!(
            Pattern::with_limits(&mhn, limits).unwrap_err(),
            Error::Config(ConfigError::HeightLimit { height: 5, limit: 4 })
        ));
    }

    #[test]
    fn test_dest_beats_cannot_land_before_throw() {
        // Row 1 beats are twice as long as row 0 beats.
        let mhn: Mhn = serde_json::from_str("[[[1,1,-5],[0,2]],[[0,2]]]").unwrap();
        assert!(matches!(
            Pattern::from_mhn(&mhn).unwrap_err(),
            Error::Config(ConfigError::NegativeHeight { .. })
        ));
        let mhn: Mhn = serde_json::from_str("[[[1,1,3],[0,2]],[[0,2]]]").unwrap();
        assert!(matches!(
            Pattern::from_mhn(&mhn).unwrap_err(),
            Error::Config(ConfigError::NegativeHeight { .. })
        ));
        let mhn: Mhn = serde_json::from_str("[[[[0,1,-100]]]]").unwrap();
        assert!(matches!(
            Pattern::from_mhn(&mhn).unwrap_err(),
            Error::Config(ConfigError::HeightLimit { height: 100, .. })
        ));
    }

    #[test]
    fn test_get_mhn_is_four_level() {
        let p = pattern("[[4,3],1,4]");
        let json = serde_json::to_string(&p.get_mhn()).unwrap();
        assert_eq!(json, "[[[[0,4],[0,3]],[[0,1]],[[0,4]]]]");
        let again = Pattern::from_mhn(&p.get_mhn()).unwrap();
        assert_eq!(again.get_mhn(), p.get_mhn());
    }

    #[test]
    fn test_get_mhn_keeps_bounces_only() {
        let mut p = pattern("[5,3,1]");
        let loc = ThrowLoc::new(0, 0, 0);
        p.set_bounces(loc, 2, true, true).unwrap();
        p.set_dwell(0.2, 0.3).unwrap();

        let again = Pattern::from_mhn(&p.get_mhn()).unwrap();
        let throw = again.throw(loc).unwrap();
        assert_eq!(throw.bounces, 2);
        assert!(!throw.force_throw);
        assert!(!throw.early_catch);
        assert_eq!(throw.pre_dwell, 0.0);
        assert_eq!(throw.post_dwell, Throw::new(0, 5).post_dwell);
        assert_ne!(again.throw(loc), p.throw(loc));
    }

    #[test]
    fn test_collisions() {
        let p = pattern("[5,4,3]");
        assert_eq!(p.props(), 4);
        assert!(!p.is_valid());
        assert!(pattern("[5,3,1]").is_valid());
    }

    #[test]
    fn test_selection() {
        let mut p = pattern("[5,3,1]");
        p.select(ThrowLoc::new(0, 1, 0)).unwrap();
        assert!(p.select(ThrowLoc::new(0, 5, 0)).is_err());
        p.select_row(0).unwrap();
        assert_eq!(p.selected().len(), 3);
        assert!(p.deselect(ThrowLoc::new(0, 0, 0)));
        p.clear_selection();
        assert!(p.selected().is_empty());
    }

    #[test]
    fn test_max_flight_span() {
        assert_eq!(pattern("[5,3,1]").max_flight_span(), 5.0);
    }

    #[test]
    fn test_set_dwell() {
        let mut p = pattern("3");
        p.set_dwell(0.1, 0.4).unwrap();
        assert_eq!(p.throw(ThrowLoc::new(0, 0, 0)).unwrap().post_dwell, 0.4);
        assert!(p.set_dwell(1.5, 0.0).is_err());
    }
}
