//! Juggling states and transition synthesis.
//!
//! A state counts, for every row, how many props are due to land on each
//! upcoming beat. Two patterns with the same rows and prop count can be
//! joined by a short run of throws that turns the state of one into the
//! state of the other.

use crate::error::{ConfigError, InvariantViolation, Result};
use crate::mhn::Mhn;
use crate::pattern::Pattern;
use crate::throw::Throw;
use crate::throw_sequence::ThrowSequence;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Most beats of history replayed when deriving a state
pub const LOOKBACK_LIMIT: usize = 4096;

/// Props due to land per row and upcoming beat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternState {
    rows: Vec<Vec<u32>>,
}

impl PatternState {
    pub fn new(rows: Vec<Vec<u32>>) -> Self {
        PatternState { rows }
    }

    /// State of `pattern` just before the first beat of its period.
    ///
    /// Replays enough whole cycles that every throw able to cross "now"
    /// has been made, then counts the props still in the air.
    pub fn from_pattern(pattern: &Pattern) -> Result<Self> {
        let horizon = pattern.horizon();
        let cycles = (pattern.max_flight_span() / horizon).ceil() as usize + 1;
        let now: Vec<i64> = pattern
            .rows()
            .iter()
            .map(|seq| (cycles * seq.period()) as i64)
            .collect();

        let mut rows = vec![Vec::new(); pattern.num_rows()];
        for seq in pattern.rows() {
            let r = seq.row();
            if now[r] as usize > LOOKBACK_LIMIT {
                return Err(InvariantViolation::LookbackExceeded {
                    row: r,
                    limit: LOOKBACK_LIMIT,
                }
                .into());
            }
            for beat in (0..now[r]).rev() {
                for throw in seq.column_at(beat).iter().filter(|t| t.is_prop()) {
                    let landing = pattern.land(r, beat, throw);
                    let ahead = landing.beat - now[landing.row];
                    if ahead < 0 {
                        continue;
                    }
                    let slots: &mut Vec<u32> = &mut rows[landing.row];
                    let idx = ahead as usize;
                    if slots.len() <= idx {
                        slots.resize(idx + 1, 0);
                    }
                    slots[idx] += 1;
                }
            }
        }

        let state = PatternState { rows };
        let found = state.props() as i64;
        let declared = pattern.props() as i64;
        if found != declared {
            return Err(InvariantViolation::StateMismatch { found, declared }.into());
        }
        Ok(state)
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Props landing on `row` `beat` beats from now
    pub fn get(&self, row: usize, beat: usize) -> u32 {
        self.rows
            .get(row)
            .and_then(|r| r.get(beat))
            .copied()
            .unwrap_or(0)
    }

    pub fn props(&self) -> u32 {
        self.rows.iter().flatten().sum()
    }

    /// Beats until the last prop lands
    pub fn height(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.iter().rposition(|&n| n > 0).map_or(0, |i| i + 1))
            .max()
            .unwrap_or(0)
    }

    /// Throw every prop landing now according to `columns` (one per row)
    /// and move on to the next beat
    pub fn advance(&mut self, columns: &[&[Throw]]) -> Result<()> {
        if columns.len() != self.rows.len() {
            return Err(ConfigError::Incompatible(format!(
                "{} columns for {} rows",
                columns.len(),
                self.rows.len()
            ))
            .into());
        }
        for (row, column) in columns.iter().enumerate() {
            let thrown = column.iter().filter(|t| t.is_prop()).count() as u32;
            let held = self.get(row, 0);
            if thrown > held {
                return Err(InvariantViolation::EmptyHand { row }.into());
            }
            if thrown < held {
                return Err(InvariantViolation::UnthrownProps { row }.into());
            }
        }

        for row in &mut self.rows {
            if !row.is_empty() {
                row.remove(0);
            }
        }
        for column in columns {
            for throw in column.iter().filter(|t| t.is_prop()) {
                let row = self.rows.get_mut(throw.dest_row).ok_or(ConfigError::UnknownRow {
                    row: throw.dest_row,
                    rows: columns.len(),
                })?;
                let idx = throw.flt_beats as usize - 1;
                if row.len() <= idx {
                    row.resize(idx + 1, 0);
                }
                row[idx] += 1;
            }
        }
        Ok(())
    }

    /// Play a transition through from this state
    pub fn apply(&mut self, transition: &Transition) -> Result<()> {
        for beat in 0..transition.len() {
            let columns: Vec<&[Throw]> = transition
                .rows
                .iter()
                .map(|seq| seq.columns()[beat].as_slice())
                .collect();
            self.advance(&columns)?;
        }
        Ok(())
    }

    /// Can `target` follow after `delay` beats without catching anything
    /// it does not expect?
    fn reaches(&self, target: &PatternState, delay: usize) -> bool {
        self.rows.iter().enumerate().all(|(r, slots)| {
            slots
                .iter()
                .enumerate()
                .skip(delay)
                .all(|(i, &n)| n <= target.get(r, i - delay))
        })
    }

    /// Shortest run of throws from this state to `target`
    pub fn get_transition(&self, target: &PatternState) -> Result<Transition> {
        if self.rows.len() != target.rows.len() {
            return Err(ConfigError::Incompatible(format!(
                "{} rows against {}",
                self.rows.len(),
                target.rows.len()
            ))
            .into());
        }
        if self.props() != target.props() {
            return Err(ConfigError::Incompatible(format!(
                "{} props against {}",
                self.props(),
                target.props()
            ))
            .into());
        }

        let mut delay = self.height().saturating_sub(target.height());
        while !self.reaches(target, delay) {
            delay += 1;
        }

        // Props in hand during the transition, earliest beat first
        let mut sources: Vec<(usize, usize)> = Vec::new();
        for beat in 0..delay {
            for row in 0..self.rows.len() {
                for _ in 0..self.get(row, beat) {
                    sources.push((beat, row));
                }
            }
        }
        let mut sources = sources.into_iter();

        let mut columns: Vec<Vec<Vec<Throw>>> = vec![vec![Vec::new(); delay]; self.rows.len()];
        for slot in 0..target.height() {
            for row in 0..self.rows.len() {
                let wanted = target.get(row, slot);
                let arriving = self.get(row, slot + delay);
                for _ in arriving..wanted {
                    let (beat, from) = sources
                        .next()
                        .ok_or(InvariantViolation::NoAvailableThrow { row, beat: slot })?;
                    let height = delay + slot - beat;
                    columns[from][beat].push(Throw::new(row, height as i32));
                }
            }
        }
        let leftover = sources.count() as u32;
        if leftover > 0 {
            return Err(InvariantViolation::LeftoverProps(leftover).into());
        }

        debug!(beats = delay, "transition found");
        Ok(Transition {
            rows: columns
                .into_iter()
                .enumerate()
                .map(|(row, cols)| ThrowSequence::once(row, 0, cols))
                .collect(),
        })
    }
}

impl PartialEq for PatternState {
    fn eq(&self, other: &Self) -> bool {
        let rows = self.rows.len().max(other.rows.len());
        let len = self.height().max(other.height());
        (0..rows).all(|r| (0..len).all(|i| self.get(r, i) == other.get(r, i)))
    }
}

impl fmt::Display for PatternState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let height = self.height();
        for (r, _) in self.rows.iter().enumerate() {
            if r > 0 {
                write!(f, " | ")?;
            }
            for i in 0..height {
                write!(f, "{}", self.get(r, i))?;
            }
        }
        Ok(())
    }
}

/// Finite run of throws joining two patterns; each row is played once
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    rows: Vec<ThrowSequence>,
}

impl Transition {
    pub fn rows(&self) -> &[ThrowSequence] {
        &self.rows
    }

    /// Beats the transition lasts
    pub fn len(&self) -> usize {
        self.rows.first().map_or(0, ThrowSequence::period)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_mhn(&self) -> Mhn {
        Mhn::List(self.rows.iter().map(ThrowSequence::to_mhn).collect())
    }
}

impl Pattern {
    pub fn state(&self) -> Result<PatternState> {
        PatternState::from_pattern(self)
    }

    /// Throws leading from this pattern's state into `other`'s
    pub fn get_transition(&self, other: &Pattern) -> Result<Transition> {
        if self.is_multi_clock() || other.is_multi_clock() {
            return Err(ConfigError::MultiClockTransition.into());
        }
        if self.num_rows() != other.num_rows() || self.props() != other.props() {
            return Err(ConfigError::Incompatible(format!(
                "{} rows with {} props against {} rows with {} props",
                self.num_rows(),
                self.props(),
                other.num_rows(),
                other.props()
            ))
            .into());
        }
        self.state()?.get_transition(&other.state()?)
    }
}
