use crate::{Physics, Vec3};
use serde::{Deserialize, Serialize};

const CONTACT_EPSILON: f64 = 1e-12;

/// Analytic flight path of a prop, including floor bounces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub origin: Vec3,
    pub velocity: Vec3,
    pub gravity: Vec3,
    pub floor: f64,
    pub restitution: f64,
    pub bounces: u32,
}

/// Ballistic state at the start of a bounce segment
#[derive(Debug, Clone, Copy)]
struct Segment {
    start: f64,
    position: Vec3,
    velocity: Vec3,
}

impl Trajectory {
    pub fn new(origin: Vec3, velocity: Vec3, physics: &Physics, bounces: u32) -> Self {
        Trajectory {
            origin,
            velocity,
            gravity: physics.gravity,
            floor: physics.floor,
            restitution: physics.restitution,
            bounces,
        }
    }

    /// Position `t` seconds after release
    pub fn position(&self, t: f64) -> Vec3 {
        let seg = self.segment_at(t);
        let dt = t - seg.start;
        seg.position + seg.velocity * dt + self.gravity * (dt * dt / 2.0)
    }

    /// Velocity `t` seconds after release
    pub fn velocity_at(&self, t: f64) -> Vec3 {
        let seg = self.segment_at(t);
        seg.velocity + self.gravity * (t - seg.start)
    }

    /// Times of the floor contacts, in order
    pub fn bounce_times(&self) -> Vec<f64> {
        let mut times = Vec::new();
        let mut seg = self.initial();
        for _ in 0..self.bounces {
            match self.time_to_floor(&seg) {
                Some(dt) => {
                    seg = self.bounce(&seg, dt);
                    times.push(seg.start);
                }
                None => break,
            }
        }
        times
    }

    fn initial(&self) -> Segment {
        Segment {
            start: 0.0,
            position: self.origin,
            velocity: self.velocity,
        }
    }

    fn segment_at(&self, t: f64) -> Segment {
        let mut seg = self.initial();
        for _ in 0..self.bounces {
            match self.time_to_floor(&seg) {
                Some(dt) if seg.start + dt <= t => seg = self.bounce(&seg, dt),
                _ => break,
            }
        }
        seg
    }

    /// Time until the segment next reaches the floor plane moving down
    fn time_to_floor(&self, seg: &Segment) -> Option<f64> {
        let a = self.gravity.y / 2.0;
        let b = seg.velocity.y;
        let c = seg.position.y - self.floor;

        if a.abs() < CONTACT_EPSILON {
            return (b < 0.0).then(|| -c / b).filter(|dt| *dt > CONTACT_EPSILON);
        }

        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return None;
        }
        let root = disc.sqrt();
        [(-b - root) / (2.0 * a), (-b + root) / (2.0 * a)]
            .into_iter()
            .filter(|dt| *dt > CONTACT_EPSILON)
            .fold(None, |best: Option<f64>, dt| {
                Some(best.map_or(dt, |m| m.min(dt)))
            })
    }

    fn bounce(&self, seg: &Segment, dt: f64) -> Segment {
        let position = seg.position + seg.velocity * dt + self.gravity * (dt * dt / 2.0);
        let mut velocity = seg.velocity + self.gravity * dt;
        velocity.y = -self.restitution * velocity.y;
        Segment {
            start: seg.start + dt,
            position: position.with_y(self.floor),
            velocity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{calc_init_vel_multi_bounce, BounceParams};

    #[test]
    fn test_plain_parabola() {
        let physics = Physics::default();
        let traj = Trajectory::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(1.0, 4.905, 0.0), &physics, 0);
        let end = traj.position(1.0);
        assert!((end.x - 1.0).abs() < 1e-12);
        assert!((end.y - 1.0).abs() < 1e-12);
        assert!(traj.bounce_times().is_empty());
    }

    #[test]
    fn test_bounce_reflects_velocity() {
        let physics = Physics {
            restitution: 0.5,
            ..Physics::default()
        };
        let traj = Trajectory::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 9.81, 0.0), &physics, 1);
        let times = traj.bounce_times();
        assert_eq!(times.len(), 1);
        assert!((times[0] - 2.0).abs() < 1e-9);
        let after = traj.velocity_at(2.0 + 1e-9);
        assert!((after.y - 9.81 * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_one_bounce_from_floor_returns_to_floor() {
        let e = 0.7;
        let tf = 1.5;
        let physics = Physics {
            restitution: e,
            ..Physics::default()
        };
        let v0 = calc_init_vel_multi_bounce(tf, 0.0, 0.0, physics.g(), e, &BounceParams::new(1)).unwrap();
        let traj = Trajectory::new(Vec3::ZERO, Vec3::new(0.0, v0, 0.0), &physics, 1);
        assert!(traj.position(tf).y.abs() < 1e-4);
    }
}
