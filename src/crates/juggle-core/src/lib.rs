//! Core model for MHN+ juggling patterns
//!
//! This crate turns multi-row, multi-rate, multiplexed throw notation into a
//! time-synchronised stream of throws. It holds the pattern model and its
//! structural edits, the clocks that place every row's beats on a shared
//! time axis, the lazy sequence engine that drives rows and routines, and
//! the state machinery that joins two patterns with a transition.
//!
//! # Examples
//!
//! ```
//! use juggle_core::{Mhn, Pattern};
//!
//! let pattern = Pattern::from_mhn(&Mhn::siteswap(&[5, 3, 1])).unwrap();
//! assert_eq!(pattern.props(), 3);
//!
//! let shower = Pattern::from_mhn(&Mhn::siteswap(&[5, 1])).unwrap();
//! let transition = pattern.get_transition(&shower).unwrap();
//! assert_eq!(transition.len(), 1);
//! ```
//!
//! # Main Components
//!
//! - **Pattern**: rows of throws, their clocks and the prop count
//! - **Clock / Rhythm**: beat-to-time mapping and cross-clock synchronisation
//! - **Sequence**: lazy, nested, repeatable sequences with lookahead
//! - **PatternState**: landing schedule used for transitions
//! - **Routines**: named patterns composed into longer performances

pub mod clock;
pub mod control;
pub mod edit;
pub mod error;
pub mod mhn;
pub mod pattern;
pub mod rhythm;
pub mod routine;
pub mod schedule;
pub mod seq;
pub mod state;
pub mod throw;
pub mod throw_sequence;

pub use clock::{BestSync, Clock, SyncPoint, SYNC_EPSILON};
pub use control::{ControlPoint, PropId};
pub use error::{ConfigError, Error, InvariantViolation, Result, SequenceError, SolverError};
pub use mhn::{normalize, Mhn, RowThrows};
pub use pattern::{Collision, Landing, Limits, Pattern, MAX_HEIGHT, MAX_MULTIPLEX, MAX_PERIOD, MAX_ROWS};
pub use rhythm::Rhythm;
pub use routine::{RoutineDef, Routines, Segment, Step};
pub use schedule::{BeatReport, ThrowEvent, WRAP_CYCLES};
pub use seq::{Batch, HierRepeatSeq, Iterations, RepeatSeq, Seq, Sequence, Splice, MAX_DEPTH};
pub use state::{PatternState, Transition};
pub use throw::{Flight, Throw, ThrowLoc};
pub use throw_sequence::{ClockId, ThrowSequence};

pub use juggle_physics::{Physics, Vec3};
