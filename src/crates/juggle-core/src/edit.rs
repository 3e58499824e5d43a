//! Structural edits on a [`Pattern`].
//!
//! Each edit works on a clone, declares how many props it adds or removes,
//! and goes through [`Pattern::commit`], which recomputes the prop count and
//! refuses to install a copy whose count disagrees with the declaration.

use crate::clock::SYNC_EPSILON;
use crate::error::{ConfigError, Result};
use crate::pattern::{Limits, Pattern, MAX_DEST_BEATS};
use crate::throw::{Throw, ThrowLoc};
use crate::throw_sequence::ThrowSequence;
use std::collections::BTreeSet;
use tracing::debug;

/// How one row's beat grid changes when its period grows or shrinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Remap {
    /// Append a column: beat `qP + m` moves to `q(P+1) + m`
    Insert { period: usize },
    /// Drop `column`: beat `qP + m` moves to `q(P-1) + m'`
    Remove { period: usize, column: usize },
}

impl Remap {
    fn beat(&self, u: i64) -> Option<i64> {
        match *self {
            Remap::Insert { period } => Some(u + u.div_euclid(period as i64)),
            Remap::Remove { period, column } => {
                let p = period as i64;
                let (q, m) = (u.div_euclid(p), u.rem_euclid(p));
                let column = column as i64;
                if m == column {
                    return None;
                }
                Some(q * (p - 1) + m - i64::from(m > column))
            }
        }
    }
}

fn negative(loc: ThrowLoc, height: i64) -> ConfigError {
    ConfigError::NegativeHeight { loc, height }
}

/// A non-negative computed height, checked against `limits` before narrowing
fn beats(height: i64, limits: &Limits) -> std::result::Result<i32, ConfigError> {
    match i32::try_from(height) {
        Ok(h) if height as u64 <= limits.max_height as u64 => Ok(h),
        _ => Err(ConfigError::HeightLimit {
            height,
            limit: limits.max_height,
        }),
    }
}

impl Pattern {
    fn row_index(&self, row: usize) -> std::result::Result<usize, ConfigError> {
        self.row(row).map(ThrowSequence::row)
    }

    /// Prop-carrying throws of `rows` whose destination runs on another clock
    fn cross_clock_locs(&self, rows: &[usize]) -> Vec<ThrowLoc> {
        rows.iter()
            .flat_map(|&r| {
                let seq = &self.rows[r];
                seq.throws()
                    .filter(|(_, t)| t.is_prop() && self.rows[t.dest_row].clock() != seq.clock())
                    .map(|(loc, _)| loc)
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Reject an edit that moves a cross-clock throw off its synchronisation point
    fn keep_sync(&self, scratch: &mut Pattern, locs: &[ThrowLoc]) -> std::result::Result<(), ConfigError> {
        scratch.resync()?;
        for &loc in locs {
            let (Some(before), Some(after)) = (self.throw(loc), scratch.throw(loc)) else {
                continue;
            };
            if (before.sync() - after.sync()).abs() > SYNC_EPSILON {
                return Err(ConfigError::Unsynchronizable {
                    loc,
                    dest_row: after.dest_row,
                });
            }
        }
        Ok(())
    }

    fn shift_row(scratch: &mut Pattern, row: usize, offset: i64) -> std::result::Result<i64, ConfigError> {
        let limits = scratch.limits;
        if offset.unsigned_abs() > limits.max_height as u64 {
            return Err(ConfigError::HeightLimit {
                height: offset,
                limit: limits.max_height,
            });
        }
        let seq = &mut scratch.rows[row];
        let slots = seq.slot_count() as i64;
        let period = seq.period() as i64;
        if (offset * slots) % period != 0 {
            return Err(ConfigError::NonIntegralTranslation { row, offset });
        }
        for (col, column) in seq.columns_mut().iter_mut().enumerate() {
            for (slot, throw) in column.iter_mut().enumerate() {
                let height = throw.flt_beats as i64 + offset;
                if height < 0 {
                    return Err(negative(ThrowLoc::new(row, col, slot), height));
                }
                throw.flt_beats = beats(height, &limits)?;
            }
        }
        Ok(offset * slots / period)
    }

    /// Add `offset` beats to every throw of `row`
    pub fn translate_row(&mut self, row: usize, offset: i64) -> Result<()> {
        let row = self.row_index(row)?;
        let mut scratch = self.clone();
        let delta = Pattern::shift_row(&mut scratch, row, offset)?;
        self.keep_sync(&mut scratch, &self.cross_clock_locs(&[row]))?;
        self.commit(scratch, delta, "translate_row")
    }

    /// Add `offset` beats to every throw of every row
    pub fn translate_all(&mut self, offset: i64) -> Result<()> {
        let mut scratch = self.clone();
        let mut delta = 0;
        for row in 0..self.rows.len() {
            delta += Pattern::shift_row(&mut scratch, row, offset)?;
        }
        let rows: Vec<usize> = (0..self.rows.len()).collect();
        self.keep_sync(&mut scratch, &self.cross_clock_locs(&rows))?;
        self.commit(scratch, delta, "translate_all")
    }

    fn shift_throw(scratch: &mut Pattern, loc: ThrowLoc, mult: i64) -> std::result::Result<(), ConfigError> {
        let period = scratch.row(loc.row)?.period() as i64;
        let limits = scratch.limits;
        let throw = scratch.rows[loc.row]
            .throw_mut(loc.col, loc.slot)
            .ok_or(ConfigError::UnknownThrow(loc))?;
        let height = throw.flt_beats as i64 + mult.saturating_mul(period);
        if height < 0 {
            return Err(negative(loc, height));
        }
        throw.flt_beats = beats(height, &limits)?;
        Ok(())
    }

    /// Lengthen one throw by `mult` whole periods of its row, adding `mult` props
    pub fn translate_throw(&mut self, loc: ThrowLoc, mult: i64) -> Result<()> {
        self.check_loc(loc)?;
        let mut scratch = self.clone();
        Pattern::shift_throw(&mut scratch, loc, mult)?;
        self.commit(scratch, mult, "translate_throw")
    }

    /// [`Pattern::translate_throw`] on every selected throw
    pub fn translate_throws_selected(&mut self, mult: i64) -> Result<()> {
        let selected: Vec<ThrowLoc> = self.selected.iter().copied().collect();
        if selected.is_empty() {
            return Ok(());
        }
        let mut scratch = self.clone();
        for &loc in &selected {
            Pattern::shift_throw(&mut scratch, loc, mult)?;
        }
        self.commit(scratch, mult * selected.len() as i64, "translate_throws_selected")
    }

    /// Add a self-throw of height `offset` to every column of `row`
    pub fn multiplex_translate(&mut self, row: usize, offset: i64) -> Result<()> {
        let row = self.row_index(row)?;
        let seq = &self.rows[row];
        if offset < 0 {
            return Err(negative(ThrowLoc::new(row, 0, seq.max_multiplex()), offset).into());
        }
        let slots = seq.max_multiplex() + 1;
        if slots > self.limits.max_multiplex {
            return Err(ConfigError::MultiplexLimit {
                slots,
                limit: self.limits.max_multiplex,
            }
            .into());
        }
        let height = beats(offset, &self.limits)?;
        let mut scratch = self.clone();
        for column in scratch.rows[row].columns_mut() {
            column.push(Throw::new(row, height));
        }
        self.commit(scratch, offset, "multiplex_translate")
    }

    /// Rotate the columns of `row` (or every row) forward by `x` beats.
    ///
    /// On patterns with several clocks the cross-clock throws are
    /// re-synchronised, as in [`Pattern::rotate_throws_sf`].
    pub fn rotate_throws(&mut self, row: Option<usize>, x: i64) -> Result<()> {
        let resync = self.is_multi_clock();
        self.rotate(row, x, resync, "rotate_throws")
    }

    /// Rotate and re-derive destination beats of throws crossing clocks
    pub fn rotate_throws_sf(&mut self, row: Option<usize>, x: i64) -> Result<()> {
        self.rotate(row, x, true, "rotate_throws_sf")
    }

    fn rotate(&mut self, row: Option<usize>, x: i64, resync: bool, operation: &'static str) -> Result<()> {
        let rows: Vec<usize> = match row {
            Some(r) => vec![self.row_index(r)?],
            None => (0..self.rows.len()).collect(),
        };
        let rotated: BTreeSet<usize> = rows.iter().copied().collect();

        let mut targets = Vec::new();
        if resync {
            for loc in self.cross_clock_locs(&rows) {
                let throw = &self.rows[loc.row].columns()[loc.col][loc.slot];
                let landing = self.land(loc.row, loc.col as i64, throw);
                let period = self.rows[loc.row].period() as i64;
                let new_col = (loc.col as i64 + x).rem_euclid(period);
                let land_beat = if rotated.contains(&landing.row) {
                    landing.beat + x
                } else {
                    let src = &self.clocks[self.rows[loc.row].clock()];
                    let dst = &self.clocks[self.rows[landing.row].clock()];
                    let span = landing.time - src.time_of(loc.col as i64);
                    let arrival = dst.find_sync(src.time_of(new_col) + span);
                    if arrival.residual > SYNC_EPSILON {
                        return Err(ConfigError::Unsynchronizable {
                            loc,
                            dest_row: landing.row,
                        }
                        .into());
                    }
                    arrival.beat
                };
                targets.push((ThrowLoc::new(loc.row, new_col as usize, loc.slot), landing.row, land_beat));
            }
        }

        let mut scratch = self.clone();
        for &r in &rows {
            let columns = scratch.rows[r].columns_mut();
            let shift = x.rem_euclid(columns.len() as i64) as usize;
            columns.rotate_right(shift);
        }
        for (loc, dest_row, land_beat) in targets {
            let (flt, dest_beats) = scratch.resolve(loc, dest_row, land_beat)?;
            if let Some(throw) = scratch.rows[loc.row].throw_mut(loc.col, loc.slot) {
                throw.flt_beats = flt;
                throw.dest_beats = dest_beats;
            }
        }
        self.commit(scratch, 0, operation)
    }

    /// Flight and destination beats for a throw from `loc` that must land on
    /// beat `land_beat` of `dest_row`
    fn resolve(&self, loc: ThrowLoc, dest_row: usize, land_beat: i64) -> std::result::Result<(i32, i32), ConfigError> {
        let src_id = self.rows[loc.row].clock();
        let dst_id = self.rows[dest_row].clock();
        let beat = loc.col as i64;
        if src_id == dst_id {
            let flt = land_beat - beat;
            if flt < 0 {
                return Err(negative(loc, flt));
            }
            return Ok((beats(flt, &self.limits)?, 0));
        }
        self.clocks[dst_id]
            .find_best_sync(&self.clocks[src_id], beat, land_beat, MAX_DEST_BEATS)
            .map(|best| (best.flt_beats, best.dest_beats))
            .ok_or(ConfigError::Unsynchronizable { loc, dest_row })
    }

    /// Exchange the landing sites of two throws
    pub fn swap(&mut self, a: ThrowLoc, b: ThrowLoc) -> Result<()> {
        let landing_a = self.landing(a)?;
        let landing_b = self.landing(b)?;
        if a == b {
            return Ok(());
        }

        let mut scratch = self.clone();
        let (flt_a, beats_a) = scratch.resolve(a, landing_b.row, landing_b.beat)?;
        let (flt_b, beats_b) = scratch.resolve(b, landing_a.row, landing_a.beat)?;
        for (loc, dest_row, flt, dest_beats) in [
            (a, landing_b.row, flt_a, beats_a),
            (b, landing_a.row, flt_b, beats_b),
        ] {
            if let Some(throw) = scratch.rows[loc.row].throw_mut(loc.col, loc.slot) {
                throw.dest_row = dest_row;
                throw.flt_beats = flt;
                throw.dest_beats = dest_beats;
            }
        }
        self.commit(scratch, 0, "swap")
    }

    /// Append an empty beat to `row` (or to every row) without changing
    /// where any prop comes down relative to the beats around it
    pub fn extend_period(&mut self, row: Option<usize>) -> Result<()> {
        let rows = self.scope(row)?;
        let remaps = (0..self.rows.len())
            .map(|r| {
                rows.contains(&r).then(|| Remap::Insert {
                    period: self.rows[r].period(),
                })
            })
            .collect();
        self.remap(remaps, "extend_period")
    }

    /// Remove the last empty beat of `row` (or of every row)
    pub fn dec_period(&mut self, row: Option<usize>) -> Result<()> {
        let rows = self.scope(row)?;
        let arrivals = self.arrival_counts();
        let mut remaps = vec![None; self.rows.len()];
        for &r in &rows {
            let seq = &self.rows[r];
            let column = (0..seq.period())
                .rev()
                .find(|&c| seq.period() > 1 && seq.is_empty_column(c) && arrivals[r][c] == 0)
                .ok_or_else(|| ConfigError::NoRemovableColumn(format!("row {r}")))?;
            remaps[r] = Some(Remap::Remove {
                period: seq.period(),
                column,
            });
        }
        self.remap(remaps, "dec_period")
    }

    fn scope(&self, row: Option<usize>) -> std::result::Result<Vec<usize>, ConfigError> {
        match row {
            Some(r) => Ok(vec![self.row_index(r)?]),
            None => Ok((0..self.rows.len()).collect()),
        }
    }

    fn arrival_counts(&self) -> Vec<Vec<usize>> {
        let mut arrivals: Vec<Vec<usize>> = self.rows.iter().map(|r| vec![0; r.period()]).collect();
        for seq in &self.rows {
            for (loc, throw) in seq.throws().filter(|(_, t)| t.is_prop()) {
                let landing = self.land(loc.row, loc.col as i64, throw);
                let period = self.rows[landing.row].period() as i64;
                arrivals[landing.row][landing.beat.rem_euclid(period) as usize] += 1;
            }
        }
        arrivals
    }

    fn remap(&mut self, remaps: Vec<Option<Remap>>, operation: &'static str) -> Result<()> {
        let mut moves = Vec::new();
        for seq in &self.rows {
            let r = seq.row();
            for (loc, throw) in seq.throws().filter(|(_, t)| t.is_prop()) {
                let landing = self.land(r, loc.col as i64, throw);
                if remaps[r].is_none() && remaps[landing.row].is_none() {
                    continue;
                }
                let col = match remaps[r] {
                    Some(m) => m
                        .beat(loc.col as i64)
                        .ok_or_else(|| ConfigError::NoRemovableColumn(format!("row {r}")))?,
                    None => loc.col as i64,
                };
                let land = match remaps[landing.row] {
                    Some(m) => m.beat(landing.beat).ok_or_else(|| {
                        ConfigError::NoRemovableColumn(format!("row {}", landing.row))
                    })?,
                    None => landing.beat,
                };
                moves.push((ThrowLoc::new(r, col as usize, loc.slot), landing.row, land));
            }
        }

        let mut scratch = self.clone();
        for (r, remap) in remaps.iter().enumerate() {
            match remap {
                Some(Remap::Insert { .. }) => {
                    scratch.rows[r].columns_mut().push(vec![Throw::placeholder(r)]);
                }
                Some(Remap::Remove { column, .. }) => {
                    scratch.rows[r].columns_mut().remove(*column);
                }
                None => {}
            }
        }

        if remaps.iter().all(Option::is_some) {
            scratch.reset_clocks()?;
        } else {
            for (r, remap) in remaps.iter().enumerate() {
                if remap.is_some() {
                    scratch.assign_clock(r)?;
                }
            }
        }

        for (loc, dest_row, land) in moves {
            let (flt, dest_beats) = scratch.resolve(loc, dest_row, land)?;
            if let Some(throw) = scratch.rows[loc.row].throw_mut(loc.col, loc.slot) {
                throw.flt_beats = flt;
                throw.dest_beats = dest_beats;
            }
        }
        debug!(operation, period = scratch.period(), "remapped beat grid");
        self.commit(scratch, 0, operation)
    }

    /// Add a row on `match_row`'s clock whose every beat is a self-throw of
    /// `height`
    pub fn extend_rows(&mut self, match_row: usize, height: i64) -> Result<()> {
        let template = self.row(match_row)?;
        let new_row = self.rows.len();
        if height < 0 {
            return Err(negative(ThrowLoc::new(new_row, 0, 0), height).into());
        }
        if new_row + 1 > self.limits.max_rows {
            return Err(ConfigError::TooManyRows {
                rows: new_row + 1,
                limit: self.limits.max_rows,
            }
            .into());
        }
        let columns = vec![vec![Throw::new(new_row, beats(height, &self.limits)?)]; template.period()];
        let seq = ThrowSequence::new(new_row, template.clock(), columns);
        let mut scratch = self.clone();
        scratch.rows.push(seq);
        self.commit(scratch, height, "extend_rows")
    }

    /// Exchange two rows, redirecting every throw aimed at either
    pub fn swap_rows(&mut self, a: usize, b: usize) -> Result<()> {
        self.row(a)?;
        self.row(b)?;
        let mut perm: Vec<usize> = (0..self.rows.len()).collect();
        perm.swap(a, b);
        self.permute_rows(&perm)
    }

    /// Move row `i` to position `perm[i]`
    pub fn permute_rows(&mut self, perm: &[usize]) -> Result<()> {
        let n = self.rows.len();
        let mut seen = vec![false; n];
        for &p in perm {
            if p >= n || std::mem::replace(&mut seen[p], true) {
                return Err(ConfigError::NotPermutation(format!("{perm:?}")).into());
            }
        }
        if perm.len() != n {
            return Err(ConfigError::NotPermutation(format!("{perm:?}")).into());
        }

        let mut scratch = self.clone();
        let mut rows: Vec<Option<ThrowSequence>> = vec![None; n];
        for (old, mut seq) in scratch.rows.drain(..).enumerate() {
            seq.set_row(perm[old]);
            for throw in seq.throws_mut() {
                throw.dest_row = perm[throw.dest_row];
            }
            rows[perm[old]] = Some(seq);
        }
        scratch.rows = rows.into_iter().flatten().collect();
        scratch.selected = self
            .selected
            .iter()
            .map(|loc| ThrowLoc::new(perm[loc.row], loc.col, loc.slot))
            .collect();
        self.commit(scratch, 0, "permute_rows")
    }

    /// Drop placeholder throws from multiplexed columns
    pub fn clean(&mut self) -> Result<()> {
        let mut scratch = self.clone();
        for seq in &mut scratch.rows {
            seq.clean();
        }
        self.commit(scratch, 0, "clean")
    }
}
