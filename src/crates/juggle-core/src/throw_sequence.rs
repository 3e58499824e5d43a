use crate::mhn::Mhn;
use crate::seq::{Iterations, Sequence};
use crate::throw::{Throw, ThrowLoc};

/// Index of a clock in a pattern's clock arena
pub type ClockId = usize;

/// The repeating list of throw columns performed by one row
///
/// Every column holds at least one throw; an empty hand is a placeholder
/// (height zero, back to the same row).
#[derive(Debug, Clone, PartialEq)]
pub struct ThrowSequence {
    row: usize,
    clock: ClockId,
    columns: Vec<Vec<Throw>>,
    iterations: Iterations,
}

impl ThrowSequence {
    /// Endlessly repeating row
    pub fn new(row: usize, clock: ClockId, columns: Vec<Vec<Throw>>) -> Self {
        let mut seq = ThrowSequence {
            row,
            clock,
            columns,
            iterations: Iterations::Infinite,
        };
        seq.fill_empty();
        seq
    }

    /// Row played exactly once, as in a transition
    pub fn once(row: usize, clock: ClockId, columns: Vec<Vec<Throw>>) -> Self {
        let mut seq = ThrowSequence::new(row, clock, columns);
        seq.iterations = Iterations::Finite(1);
        seq
    }

    fn fill_empty(&mut self) {
        let row = self.row;
        for column in &mut self.columns {
            if column.is_empty() {
                column.push(Throw::placeholder(row));
            }
        }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn clock(&self) -> ClockId {
        self.clock
    }

    pub fn iterations(&self) -> Iterations {
        self.iterations
    }

    /// Columns per repetition
    pub fn period(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Vec<Throw>] {
        &self.columns
    }

    pub fn column(&self, col: usize) -> Option<&[Throw]> {
        self.columns.get(col).map(Vec::as_slice)
    }

    /// Column played at `beat`, wrapping around the period
    pub fn column_at(&self, beat: i64) -> &[Throw] {
        &self.columns[beat.rem_euclid(self.period() as i64) as usize]
    }

    pub fn throw(&self, col: usize, slot: usize) -> Option<&Throw> {
        self.columns.get(col).and_then(|c| c.get(slot))
    }

    /// Every throw with its location
    pub fn throws(&self) -> impl Iterator<Item = (ThrowLoc, &Throw)> + '_ {
        let row = self.row;
        self.columns.iter().enumerate().flat_map(move |(col, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(slot, throw)| (ThrowLoc::new(row, col, slot), throw))
        })
    }

    /// Total throw slots over one period
    pub fn slot_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn max_multiplex(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// True when the column holds nothing but placeholders
    pub fn is_empty_column(&self, col: usize) -> bool {
        self.columns
            .get(col)
            .map(|c| c.iter().all(|t| t.is_placeholder_for(self.row)))
            .unwrap_or(false)
    }

    /// Column cursor replaying this row
    pub fn cursor(&self) -> Sequence<Vec<Throw>> {
        Sequence::repeat(self.columns.clone(), self.iterations)
    }

    pub fn to_mhn(&self) -> Mhn {
        Mhn::List(
            self.columns
                .iter()
                .map(|column| Mhn::List(column.iter().map(Throw::to_mhn).collect()))
                .collect(),
        )
    }

    pub(crate) fn set_row(&mut self, row: usize) {
        self.row = row;
    }

    pub(crate) fn set_clock(&mut self, clock: ClockId) {
        self.clock = clock;
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<Vec<Throw>> {
        &mut self.columns
    }

    pub(crate) fn throw_mut(&mut self, col: usize, slot: usize) -> Option<&mut Throw> {
        self.columns.get_mut(col).and_then(|c| c.get_mut(slot))
    }

    pub(crate) fn throws_mut(&mut self) -> impl Iterator<Item = &mut Throw> {
        self.columns.iter_mut().flatten()
    }

    /// Drop placeholders from multiplexed columns, keeping one per empty column
    pub(crate) fn clean(&mut self) {
        let row = self.row;
        for column in &mut self.columns {
            if column.len() > 1 {
                column.retain(|t| !t.is_placeholder_for(row));
            }
        }
        self.fill_empty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ThrowSequence {
        ThrowSequence::new(
            0,
            0,
            vec![
                vec![Throw::new(0, 5), Throw::new(0, 3)],
                vec![],
                vec![Throw::new(0, 1)],
            ],
        )
    }

    #[test]
    fn test_empty_columns_become_placeholders() {
        let seq = row();
        assert_eq!(seq.period(), 3);
        assert!(seq.is_empty_column(1));
        assert!(!seq.is_empty_column(0));
        assert_eq!(seq.slot_count(), 4);
        assert_eq!(seq.max_multiplex(), 2);
    }

    #[test]
    fn test_column_at_wraps() {
        let seq = row();
        assert_eq!(seq.column_at(3)[0].flt_beats, 5);
        assert_eq!(seq.column_at(-1)[0].flt_beats, 1);
    }

    #[test]
    fn test_cursor_repeats() {
        let mut cursor = row().cursor();
        let heights: Vec<i32> = (0..4)
            .map(|_| cursor.next_item().unwrap().unwrap()[0].flt_beats)
            .collect();
        assert_eq!(heights, vec![5, 0, 1, 5]);

        let mut once = ThrowSequence::once(0, 0, vec![vec![Throw::new(0, 2)]]).cursor();
        assert!(once.next_item().unwrap().is_some());
        assert!(once.next_item().unwrap().is_none());
    }

    #[test]
    fn test_clean() {
        let mut seq = ThrowSequence::new(
            0,
            0,
            vec![vec![Throw::new(0, 3), Throw::placeholder(0)], vec![Throw::placeholder(0)]],
        );
        seq.clean();
        assert_eq!(seq.columns()[0].len(), 1);
        assert_eq!(seq.columns()[1].len(), 1);
    }

    #[test]
    fn test_throws_iter() {
        let seq = row();
        let locs: Vec<ThrowLoc> = seq.throws().map(|(loc, _)| loc).collect();
        assert_eq!(locs[1], ThrowLoc::new(0, 0, 1));
        assert_eq!(locs.len(), 4);
    }
}
