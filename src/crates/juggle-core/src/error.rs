//! Error taxonomy for pattern construction, editing and synthesis.
//!
//! Three families are kept apart so callers can react differently:
//! [`ConfigError`] rejects a request and leaves the pattern untouched,
//! [`InvariantViolation`] reports internal inconsistency, and
//! [`SolverError`] reports numerical non-convergence from the physics layer.

use crate::throw::ThrowLoc;
pub use juggle_physics::SolverError;

/// Rejected edit or construction request. The target is left unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed notation: {0}")]
    MalformedNotation(String),

    #[error("Row {row} does not exist (pattern has {rows} rows)")]
    UnknownRow { row: usize, rows: usize },

    #[error("Throw location {0} does not exist")]
    UnknownThrow(ThrowLoc),

    #[error("Pattern would have {rows} rows, limit is {limit}")]
    TooManyRows { rows: usize, limit: usize },

    #[error("Row period {period} outside 1..={limit}")]
    PeriodLimit { period: usize, limit: usize },

    #[error("Column would hold {slots} throws, multiplex limit is {limit}")]
    MultiplexLimit { slots: usize, limit: usize },

    #[error("Throw height {height} exceeds limit {limit}")]
    HeightLimit { height: i64, limit: usize },

    #[error("Throw at {loc} would have negative height {height}")]
    NegativeHeight { loc: ThrowLoc, height: i64 },

    #[error("Invalid rhythm: {0}")]
    InvalidRhythm(String),

    #[error("Dwell fraction {0} outside [0, 1]")]
    InvalidDwell(f64),

    #[error("Invalid clock: {0}")]
    InvalidClock(String),

    #[error("{0} is not a permutation of the pattern rows")]
    NotPermutation(String),

    #[error("Translating row {row} by {offset} would change props by a non-integer amount")]
    NonIntegralTranslation { row: usize, offset: i64 },

    #[error("No removable column in {0}")]
    NoRemovableColumn(String),

    #[error("Throw at {loc} cannot be synchronised onto row {dest_row}")]
    Unsynchronizable { loc: ThrowLoc, dest_row: usize },

    #[error("Transitions between patterns on several clocks are not supported")]
    MultiClockTransition,

    #[error("Patterns differ: {0}")]
    Incompatible(String),
}

/// Internal inconsistency detected while computing or mutating a pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("Prop count {value} is not an integer")]
    NonIntegralProps { value: f64 },

    #[error("Declared prop count {declared} differs from computed {computed} after {operation}")]
    PropMismatch {
        operation: &'static str,
        declared: i64,
        computed: i64,
    },

    #[error("State holds {found} props, pattern declares {declared}")]
    StateMismatch { found: i64, declared: i64 },

    #[error("State lookback exceeded {limit} beats on row {row}")]
    LookbackExceeded { row: usize, limit: usize },

    #[error("No throw available to fill row {row} at beat {beat}")]
    NoAvailableThrow { row: usize, beat: usize },

    #[error("Row {row} has nothing at beat 0 to throw")]
    EmptyHand { row: usize },

    #[error("Cannot advance: row {row} still holds props at beat 0")]
    UnthrownProps { row: usize },

    #[error("Sequence ended unexpectedly")]
    SequenceExhausted,

    #[error("Transition would leave {0} props unassigned")]
    LeftoverProps(u32),
}

/// Sequence engine failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SequenceError {
    #[error("Sequence nesting depth {depth} exceeds limit {limit}")]
    RecursionLimit { depth: usize, limit: usize },

    #[error("Invalid sequence: {0}")]
    Config(String),
}

/// Any error raised by this crate
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

impl Error {
    /// A recoverable error means the request was refused and nothing changed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Sequence(SequenceError::Config(_)))
    }

    pub fn is_invariant(&self) -> bool {
        matches!(self, Error::Invariant(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        let config: Error = ConfigError::MultiClockTransition.into();
        assert!(config.is_recoverable());

        let invariant: Error = InvariantViolation::SequenceExhausted.into();
        assert!(!invariant.is_recoverable());
        assert!(invariant.is_invariant());

        let solver: Error = SolverError::NoConvergence {
            method: "newton",
            iterations: 100,
        }
        .into();
        assert!(!solver.is_recoverable());
        assert!(matches!(solver, Error::Solver(_)));
    }

    #[test]
    fn test_display() {
        let err = ConfigError::MultiplexLimit { slots: 5, limit: 4 };
        assert_eq!(
            err.to_string(),
            "Column would hold 5 throws, multiplex limit is 4"
        );
    }
}
