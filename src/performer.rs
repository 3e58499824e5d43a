//! Plays a pattern against a set of control points.
//!
//! The performer owns the live [`Pattern`]: each step advances it by one beat,
//! lands every prop whose catch time has passed, then throws the props the
//! beat calls for, solving each flight between the two control points.

use crate::config::JuggleConfig;
use juggle_core::{ControlPoint, Flight, Pattern, Physics, PropId, ThrowEvent, Vec3};
use serde::Serialize;
use tracing::{debug, warn};

/// Slack when deciding whether a catch is due
const CATCH_EPSILON: f64 = 1e-9;

#[derive(Debug, thiserror::Error)]
pub enum PerformError {
    #[error("Pattern has {rows} rows but {hands} control points were given")]
    HandCount { rows: usize, hands: usize },

    #[error(transparent)]
    Pattern(#[from] juggle_core::Error),
}

/// A prop in the air
#[derive(Debug, Clone, Serialize)]
pub struct Airborne {
    pub prop: PropId,
    pub dest_row: usize,
    /// Seconds at which the prop left the hand
    pub release: f64,
    /// Live pattern time at which the prop is caught
    catch_time: f64,
    pub flight: Flight,
}

/// One solved throw
#[derive(Debug, Clone, Serialize)]
pub struct PerformedThrow {
    pub prop: PropId,
    pub row: usize,
    pub dest_row: usize,
    pub release: f64,
    pub catch: f64,
    pub velocity: Vec3,
    pub bounces: u32,
}

/// Everything that happened on one beat, times in seconds
#[derive(Debug, Clone, Default, Serialize)]
pub struct StepReport {
    pub time: f64,
    pub caught: Vec<PropId>,
    pub thrown: Vec<PerformedThrow>,
    pub dropped: Vec<PropId>,
}

enum Outcome {
    Thrown(PerformedThrow),
    Dropped(PropId),
    Skipped,
}

pub struct Performer<C: ControlPoint> {
    pattern: Pattern,
    hands: Vec<C>,
    physics: Physics,
    beat_duration: f64,
    airborne: Vec<Airborne>,
    dropped: Vec<PropId>,
    /// Pattern time removed from the live clocks by wraps
    epoch: f64,
    beats: usize,
}

impl<C: ControlPoint> Performer<C> {
    /// Rewind `pattern`, apply the configured dwell and hand out its props:
    /// every row starts holding the props due to land on it.
    pub fn new(mut pattern: Pattern, mut hands: Vec<C>, config: &JuggleConfig) -> Result<Self, PerformError> {
        if hands.len() != pattern.num_rows() {
            return Err(PerformError::HandCount {
                rows: pattern.num_rows(),
                hands: hands.len(),
            });
        }
        pattern.rewind()?;
        pattern.set_dwell(config.timing.pre_dwell, config.timing.post_dwell)?;

        let state = pattern.state()?;
        let mut next: PropId = 0;
        for (hand, due) in hands.iter_mut().zip(state.rows()) {
            for _ in 0..due.iter().sum::<u32>() {
                hand.catch_prop(next, 0.0);
                next += 1;
            }
        }
        debug!(props = next, rows = hands.len(), %state, "props distributed");

        Ok(Performer {
            pattern,
            hands,
            physics: config.physics(),
            beat_duration: config.timing.beat_duration,
            airborne: Vec::new(),
            dropped: Vec::new(),
            epoch: 0.0,
            beats: 0,
        })
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn hands(&self) -> &[C] {
        &self.hands
    }

    pub fn airborne(&self) -> &[Airborne] {
        &self.airborne
    }

    pub fn dropped(&self) -> &[PropId] {
        &self.dropped
    }

    /// Beats played so far
    pub fn beats(&self) -> usize {
        self.beats
    }

    /// Props held or in the air
    pub fn props_in_play(&self) -> usize {
        self.hands.iter().map(ControlPoint::nprops).sum::<usize>() + self.airborne.len()
    }

    /// World positions of airborne props at `time` seconds
    pub fn positions(&self, time: f64) -> Vec<(PropId, Vec3)> {
        self.airborne
            .iter()
            .map(|a| (a.prop, a.flight.position((time - a.release).max(0.0))))
            .collect()
    }

    fn seconds(&self, time: f64) -> f64 {
        (time + self.epoch) * self.beat_duration
    }

    /// Play one beat
    pub fn step(&mut self) -> Result<StepReport, PerformError> {
        let beat = self.pattern.advance_beat()?;
        let mut report = StepReport {
            time: self.seconds(beat.time),
            ..StepReport::default()
        };

        let (mut landed, flying): (Vec<Airborne>, Vec<Airborne>) = std::mem::take(&mut self.airborne)
            .into_iter()
            .partition(|a| a.catch_time <= beat.time + CATCH_EPSILON);
        self.airborne = flying;
        landed.sort_by(|a, b| a.catch_time.total_cmp(&b.catch_time));
        for prop in landed {
            let at = self.seconds(prop.catch_time);
            self.hands[prop.dest_row].catch_prop(prop.prop, at);
            report.caught.push(prop.prop);
        }

        for event in &beat.events {
            match self.throw(event)? {
                Outcome::Thrown(thrown) => report.thrown.push(thrown),
                Outcome::Dropped(prop) => report.dropped.push(prop),
                Outcome::Skipped => {}
            }
        }

        if beat.shift > 0.0 {
            for prop in &mut self.airborne {
                prop.catch_time -= beat.shift;
            }
            self.epoch += beat.shift;
        }
        self.beats += 1;
        Ok(report)
    }

    /// Release one prop and solve its flight; a prop whose flight has no
    /// solution is dropped
    fn throw(&mut self, event: &ThrowEvent) -> Result<Outcome, PerformError> {
        let row = event.loc.row;
        let release = self.seconds(event.release_time);
        let Some(prop) = self.hands[row].throw_prop(release) else {
            warn!(loc = %event.loc, beat = event.beat, "empty hand, throw skipped");
            return Ok(Outcome::Skipped);
        };

        let catch = self.seconds(event.catch_time);
        let origin = self.hands[row].position(release);
        let dest = self.hands[event.dest_row].position(catch);
        match self
            .pattern
            .solve_throw(event.loc, origin, dest, catch - release, &self.physics)
        {
            Ok(flight) => {
                self.airborne.push(Airborne {
                    prop,
                    dest_row: event.dest_row,
                    release,
                    catch_time: event.catch_time,
                    flight,
                });
                Ok(Outcome::Thrown(PerformedThrow {
                    prop,
                    row,
                    dest_row: event.dest_row,
                    release,
                    catch,
                    velocity: flight.velocity,
                    bounces: event.bounces,
                }))
            }
            Err(juggle_core::Error::Solver(err)) => {
                warn!(loc = %event.loc, prop, %err, "no flight found, prop dropped");
                self.dropped.push(prop);
                Ok(Outcome::Dropped(prop))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Play `beats` beats
    pub fn run(&mut self, beats: usize) -> Result<Vec<StepReport>, PerformError> {
        (0..beats).map(|_| self.step()).collect()
    }

    /// End the performance: every hand lets go of what it holds and props
    /// still in the air fall. Returns the props dropped by this call.
    pub fn stop(&mut self) -> Vec<PropId> {
        let mut fallen: Vec<PropId> = self.airborne.drain(..).map(|a| a.prop).collect();
        for hand in &mut self.hands {
            while let Some(prop) = hand.drop_prop() {
                fallen.push(prop);
            }
        }
        debug!(props = fallen.len(), beats = self.beats, "performance stopped");
        self.dropped.extend_from_slice(&fallen);
        fallen
    }
}
