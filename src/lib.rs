//! Command-line front end for the juggling pattern compiler
//!
//! Ties the pattern model, the notation front end and the throw solver
//! together: configuration loading, tracing setup, routine libraries, and a
//! performer that plays a pattern against a set of control points.

pub mod config;
pub mod fixture;
pub mod library;
pub mod logging;
pub mod performer;

pub use config::{ConfigFileError, JuggleConfig, LimitsConfig, PhysicsConfig, TimingConfig};
pub use fixture::Fixture;
pub use library::{LibraryError, RoutineLibrary};
pub use logging::init_tracing;
pub use performer::{Airborne, PerformError, PerformedThrow, Performer, StepReport};
