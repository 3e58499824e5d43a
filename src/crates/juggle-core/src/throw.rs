use crate::mhn::Mhn;
use juggle_physics::{calc_init_vel, BounceParams, Physics, SolverError, Trajectory, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default fraction of the catching beat spent holding the prop before the catch
pub const DEFAULT_POST_DWELL: f64 = 0.5;

/// Address of a single throw: row, column within the row period, multiplex slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThrowLoc {
    pub row: usize,
    pub col: usize,
    pub slot: usize,
}

impl ThrowLoc {
    pub fn new(row: usize, col: usize, slot: usize) -> Self {
        ThrowLoc { row, col, slot }
    }
}

impl fmt::Display for ThrowLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.row, self.col, self.slot)
    }
}

/// Solved flight of a throw between two world positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Flight {
    pub origin: Vec3,
    pub dest: Vec3,
    /// Seconds in the air
    pub duration: f64,
    pub velocity: Vec3,
    pub trajectory: Trajectory,
}

impl Flight {
    pub fn position(&self, t: f64) -> Vec3 {
        self.trajectory.position(t)
    }

    pub fn velocity_at(&self, t: f64) -> Vec3 {
        self.trajectory.velocity_at(t)
    }

    fn matches(&self, origin: Vec3, dest: Vec3, duration: f64) -> bool {
        self.origin == origin && self.dest == dest && self.duration == duration
    }
}

/// One throw of the pattern
///
/// `flt_beats` counts beats of the throwing row until the landing point is
/// synchronised onto the destination clock; `dest_beats` further beats are
/// then counted on the destination row. Rows that share a clock always have
/// `dest_beats == 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Throw {
    pub dest_row: usize,
    pub flt_beats: i32,
    #[serde(default)]
    pub dest_beats: i32,
    /// Base time between the synchronised source beat and the landing beat
    #[serde(skip)]
    pub(crate) sync: f64,
    /// Fraction of the throwing beat spent before release
    #[serde(default)]
    pub pre_dwell: f64,
    /// Fraction of the catching beat spent after the catch
    #[serde(default = "default_post_dwell")]
    pub post_dwell: f64,
    #[serde(default)]
    pub bounces: u32,
    #[serde(default)]
    pub force_throw: bool,
    #[serde(default)]
    pub early_catch: bool,
    #[serde(skip)]
    flight: Option<Flight>,
}

fn default_post_dwell() -> f64 {
    DEFAULT_POST_DWELL
}

impl PartialEq for Throw {
    fn eq(&self, other: &Self) -> bool {
        self.dest_row == other.dest_row
            && self.flt_beats == other.flt_beats
            && self.dest_beats == other.dest_beats
            && self.pre_dwell == other.pre_dwell
            && self.post_dwell == other.post_dwell
            && self.bounces == other.bounces
            && self.force_throw == other.force_throw
            && self.early_catch == other.early_catch
    }
}

impl Throw {
    pub fn new(dest_row: usize, flt_beats: i32) -> Self {
        Throw {
            dest_row,
            flt_beats,
            dest_beats: 0,
            sync: 0.0,
            pre_dwell: 0.0,
            post_dwell: DEFAULT_POST_DWELL,
            bounces: 0,
            force_throw: false,
            early_catch: false,
            flight: None,
        }
    }

    /// Empty hand: a zero throw back to its own row
    pub fn placeholder(row: usize) -> Self {
        Throw::new(row, 0)
    }

    /// Carries a prop
    pub fn is_prop(&self) -> bool {
        self.flt_beats > 0
    }

    pub fn is_placeholder_for(&self, row: usize) -> bool {
        self.dest_row == row && self.flt_beats == 0 && self.dest_beats == 0
    }

    /// Synchronisation residual in base time
    pub fn sync(&self) -> f64 {
        self.sync
    }

    pub fn flight(&self) -> Option<&Flight> {
        self.flight.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.flight = None;
    }

    pub fn bounce_params(&self) -> BounceParams {
        BounceParams::new(self.bounces)
            .force_throw(self.force_throw)
            .early_catch(self.early_catch)
    }

    /// Solve (or reuse) the launch for a flight of `duration` seconds
    pub fn solve(
        &mut self,
        origin: Vec3,
        dest: Vec3,
        duration: f64,
        physics: &Physics,
    ) -> Result<&Flight, SolverError> {
        let cached = matches!(&self.flight, Some(f) if f.matches(origin, dest, duration));
        if !cached {
            let velocity = calc_init_vel(duration, origin, dest, physics, &self.bounce_params())?;
            self.flight = Some(Flight {
                origin,
                dest,
                duration,
                velocity,
                trajectory: Trajectory::new(origin, velocity, physics, self.bounces),
            });
        }
        self.flight
            .as_ref()
            .ok_or_else(|| SolverError::no_solution("flight cache empty after solve"))
    }

    /// `[dest, height]` with destination beats and bounces appended when set.
    /// Solver flags and dwell have no place in the tuple and are not written.
    pub fn to_mhn(&self) -> Mhn {
        let mut items = vec![
            Mhn::from(self.dest_row as i64),
            Mhn::from(self.flt_beats as i64),
        ];
        if self.dest_beats != 0 || self.bounces > 0 {
            items.push(Mhn::from(self.dest_beats as i64));
        }
        if self.bounces > 0 {
            items.push(Mhn::from(self.bounces as i64));
        }
        Mhn::List(items)
    }
}
