use crate::{Physics, Result, SolverError, Vec3};
use tracing::{debug, trace};

/// Iteration cap for the cubic root finder
pub const HALLEY_MAX_ITER: usize = 100;

/// Iteration cap for the multi-bounce root finder
pub const NEWTON_MAX_ITER: usize = 100;

/// Relative step size at which a cubic root is accepted
pub const ROOT_TOLERANCE: f64 = 1e-12;

/// Flight-time residual (seconds) at which a multi-bounce solution is accepted
pub const TIME_TOLERANCE: f64 = 1e-10;

const BRACKET_MAX_STEPS: usize = 60;
const TIME_EPSILON: f64 = 1e-12;

/// How a bounced throw should be shaped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BounceParams {
    /// Number of floor contacts before the catch
    pub bounces: u32,
    /// The prop must leave the hand moving downward
    pub force_throw: bool,
    /// Catch the prop while it is still rising after the last bounce
    pub early_catch: bool,
}

impl BounceParams {
    pub fn new(bounces: u32) -> Self {
        Self {
            bounces,
            ..Self::default()
        }
    }

    pub fn force_throw(mut self, force_throw: bool) -> Self {
        self.force_throw = force_throw;
        self
    }

    pub fn early_catch(mut self, early_catch: bool) -> Self {
        self.early_catch = early_catch;
        self
    }
}

/// Vertical launch speed of a single-bounce throw
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BounceSolution {
    pub v0: f64,
    /// Time from release to the floor contact
    pub bounce_time: f64,
    /// The prop is still moving upward at the catch
    pub rising_catch: bool,
}

/// Launch velocity for a flight of `time` seconds from `origin` to `dest`.
///
/// Without bounces each axis is solved independently under the full gravity
/// vector. With bounces the vertical component is found by the bounce solvers
/// (measured from `physics.floor`) and the horizontal components travel at
/// constant speed.
pub fn calc_init_vel(
    time: f64,
    origin: Vec3,
    dest: Vec3,
    physics: &Physics,
    params: &BounceParams,
) -> Result<Vec3> {
    if !(time.is_finite() && time > 0.0) {
        return Err(SolverError::invalid(format!(
            "flight time {time} must be positive"
        )));
    }
    if !origin.is_finite() || !dest.is_finite() {
        return Err(SolverError::invalid("endpoints must be finite"));
    }

    if params.bounces == 0 {
        return Ok((dest - origin) / time - physics.gravity * (time / 2.0));
    }

    physics.validate()?;
    let g = physics.g();
    let y0 = origin.y - physics.floor;
    let y1 = dest.y - physics.floor;

    let vy = if params.bounces == 1 {
        calc_init_vel_with_bounces(time, y0, y1, g, physics.restitution, params)?.v0
    } else {
        calc_init_vel_multi_bounce(time, y0, y1, g, physics.restitution, params)?
    };

    Ok(Vec3::new(
        (dest.x - origin.x) / time,
        vy,
        (dest.z - origin.z) / time,
    ))
}

fn check_vertical(time: f64, y0: f64, y1: f64, g: f64, restitution: f64) -> Result<()> {
    if !(time.is_finite() && time > 0.0) {
        return Err(SolverError::invalid(format!(
            "flight time {time} must be positive"
        )));
    }
    if !(g.is_finite() && g > 0.0) {
        return Err(SolverError::invalid("bounced throws need downward gravity"));
    }
    if !(restitution > 0.0 && restitution <= 1.0) {
        return Err(SolverError::invalid(format!(
            "restitution {restitution} outside (0, 1]"
        )));
    }
    if !(y0.is_finite() && y1.is_finite()) || y0 < -TIME_EPSILON || y1 < -TIME_EPSILON {
        return Err(SolverError::invalid("endpoints must not be below the floor"));
    }
    Ok(())
}

/// Single-bounce vertical launch speed.
///
/// The bounce time `t1` satisfies the cubic
/// `-(g/2)(1+e) t1^3 + (gT/2)(e+2) t1^2 - (e*y0 + gT^2/2 + y1) t1 + e*y0*T = 0`,
/// whose admissible roots lie in `(0, T]`. Among them `force_throw` keeps only
/// downward launches, and `early_catch` prefers a catch on the way up.
pub fn calc_init_vel_with_bounces(
    time: f64,
    y0: f64,
    y1: f64,
    g: f64,
    restitution: f64,
    params: &BounceParams,
) -> Result<BounceSolution> {
    check_vertical(time, y0, y1, g, restitution)?;
    let (y0, y1, e) = (y0.max(0.0), y1.max(0.0), restitution);

    let a = -(g / 2.0) * (1.0 + e);
    let b = (g * time / 2.0) * (e + 2.0);
    let c = -(e * y0 + g * time * time / 2.0 + y1);
    let d = e * y0 * time;

    let mut candidates: Vec<BounceSolution> = solve_cubic(a, b, c, d)?
        .into_iter()
        .filter(|&t1| t1 > TIME_EPSILON && t1 <= time + TIME_EPSILON)
        .map(|t1| {
            let t1 = t1.min(time);
            let v0 = (g * t1 * t1 / 2.0 - y0) / t1;
            let impact = g * t1 / 2.0 + y0 / t1;
            let after = time - t1;
            BounceSolution {
                v0,
                bounce_time: t1,
                rising_catch: e * impact - g * after > 0.0,
            }
        })
        .filter(|s| s.v0.is_finite())
        .collect();

    trace!(?candidates, "single-bounce candidates");

    if params.force_throw {
        candidates.retain(|s| s.v0 < 0.0);
    } else if candidates.iter().any(|s| s.v0 >= 0.0) {
        candidates.retain(|s| s.v0 >= 0.0);
    }
    if candidates.is_empty() {
        return Err(SolverError::no_solution(format!(
            "no single-bounce flight of {time}s from {y0} to {y1}"
        )));
    }

    let matching: Vec<BounceSolution> = candidates
        .iter()
        .copied()
        .filter(|s| s.rising_catch == params.early_catch)
        .collect();
    let pool = if matching.is_empty() {
        candidates
    } else {
        matching
    };

    let chosen = if params.early_catch {
        pool.into_iter()
            .max_by(|a, b| a.bounce_time.total_cmp(&b.bounce_time))
    } else {
        pool.into_iter()
            .min_by(|a, b| a.bounce_time.total_cmp(&b.bounce_time))
    };
    chosen.ok_or_else(|| SolverError::no_solution("no admissible bounce time"))
}

/// Multi-bounce vertical launch speed.
///
/// Flight time as a function of the launch speed `v` is
/// `(v + s)/g + sum_{k=1}^{n-1} 2 e^k s/g + (u -/+ sqrt(u^2 - 2 g y1))/g`
/// with `s = sqrt(v^2 + 2 g y0)` the first impact speed and `u = e^n s` the
/// speed leaving the last bounce. The root is bracketed outward from the
/// minimum launch speed able to reach `y1`, then refined by Newton steps that
/// fall back to bisection whenever a step leaves the bracket.
pub fn calc_init_vel_multi_bounce(
    time: f64,
    y0: f64,
    y1: f64,
    g: f64,
    restitution: f64,
    params: &BounceParams,
) -> Result<f64> {
    check_vertical(time, y0, y1, g, restitution)?;
    if params.bounces == 0 {
        return Ok((y1 - y0) / time + g * time / 2.0);
    }

    let flight = FlightTime::new(y0.max(0.0), y1.max(0.0), g, restitution, params);
    let sides: &[f64] = if params.force_throw {
        &[-1.0]
    } else {
        &[1.0, -1.0]
    };

    for &side in sides {
        match flight.bracket(side, time) {
            Some((lo, hi)) => return flight.refine(side, time, lo, hi),
            None => trace!(side, "no bracket on this side"),
        }
    }

    Err(SolverError::no_solution(format!(
        "no {}-bounce flight of {time}s from {y0} to {y1}",
        params.bounces
    )))
}

struct FlightTime {
    y0: f64,
    y1: f64,
    g: f64,
    /// e^n
    decay: f64,
    /// sum of e^k for k in 1..n
    middle: f64,
    early_catch: bool,
    /// Smallest launch speed magnitude that can still reach y1
    v_min: f64,
}

impl FlightTime {
    fn new(y0: f64, y1: f64, g: f64, e: f64, params: &BounceParams) -> Self {
        let n = params.bounces as i32;
        let decay = e.powi(n);
        let middle: f64 = (1..n).map(|k| e.powi(k)).sum();
        let reach = 2.0 * g * y1 / (decay * decay) - 2.0 * g * y0;
        FlightTime {
            y0,
            y1,
            g,
            decay,
            middle,
            early_catch: params.early_catch,
            v_min: reach.max(0.0).sqrt(),
        }
    }

    /// Flight time and its derivative at launch speed `v`
    fn eval(&self, v: f64) -> (f64, f64) {
        let g = self.g;
        let s = (v * v + 2.0 * g * self.y0).sqrt();
        let ds = if s > 0.0 { v / s } else { v.signum() };
        let u = self.decay * s;
        let du = self.decay * ds;
        let r = (u * u - 2.0 * g * self.y1).max(0.0).sqrt();
        let dr = if r > 0.0 { u * du / r } else { f64::INFINITY };

        let first = (v + s) / g;
        let middle = 2.0 * self.middle * s / g;
        let (last, dlast) = if self.early_catch {
            ((u - r) / g, (du - dr) / g)
        } else {
            ((u + r) / g, (du + dr) / g)
        };

        let dfirst = (1.0 + ds) / g;
        let dmiddle = 2.0 * self.middle * ds / g;
        (first + middle + last, dfirst + dmiddle + dlast)
    }

    fn speed(&self, side: f64, x: f64) -> f64 {
        side * (self.v_min + x)
    }

    fn residual(&self, side: f64, time: f64, x: f64) -> (f64, f64) {
        let (f, df) = self.eval(self.speed(side, x));
        (f - time, side * df)
    }

    /// Expand outward from the minimum speed until the residual changes sign
    fn bracket(&self, side: f64, time: f64) -> Option<(f64, f64)> {
        let (h0, _) = self.residual(side, time, 0.0);
        if h0 == 0.0 {
            return Some((0.0, 0.0));
        }
        let mut x = self.v_min.max(1.0);
        for _ in 0..BRACKET_MAX_STEPS {
            let (h, _) = self.residual(side, time, x);
            if h.is_finite() && h.signum() != h0.signum() {
                return Some((0.0, x));
            }
            x *= 2.0;
        }
        None
    }

    fn refine(&self, side: f64, time: f64, lo: f64, hi: f64) -> Result<f64> {
        if lo == hi {
            return Ok(self.speed(side, lo));
        }
        let (h_lo, _) = self.residual(side, time, lo);
        let (mut neg, mut pos) = if h_lo < 0.0 { (lo, hi) } else { (hi, lo) };

        let mut x = 0.5 * (lo + hi);
        let mut step_old = (hi - lo).abs();
        let mut step = step_old;

        for iteration in 0..NEWTON_MAX_ITER {
            let (h, dh) = self.residual(side, time, x);
            if h.abs() < TIME_TOLERANCE {
                debug!(iteration, v0 = self.speed(side, x), "multi-bounce solved");
                return Ok(self.speed(side, x));
            }
            if h < 0.0 {
                neg = x;
            } else {
                pos = x;
            }

            let newton = x - h / dh;
            let (low, high) = (neg.min(pos), neg.max(pos));
            let wild = !newton.is_finite()
                || newton <= low
                || newton >= high
                || (2.0 * h).abs() > (step_old * dh).abs();

            step_old = step;
            if wild {
                trace!(iteration, x, "newton step rejected, bisecting");
                step = 0.5 * (pos - neg);
                x = neg + step;
            } else {
                step = h / dh;
                x = newton;
            }

            if (pos - neg).abs() <= ROOT_TOLERANCE * (1.0 + x.abs()) {
                return Ok(self.speed(side, x));
            }
        }

        Err(SolverError::NoConvergence {
            method: "newton",
            iterations: NEWTON_MAX_ITER,
        })
    }
}

/// Real roots of `a x^3 + b x^2 + c x + d`, ascending.
///
/// One root is found by Halley iteration started from the Cauchy bound and
/// kept inside a sign-change bracket; the remaining two come from the
/// deflated quadratic.
pub fn solve_cubic(a: f64, b: f64, c: f64, d: f64) -> Result<Vec<f64>> {
    if ![a, b, c, d].iter().all(|v| v.is_finite()) {
        return Err(SolverError::invalid("cubic coefficients must be finite"));
    }
    let scale = a.abs().max(b.abs()).max(c.abs()).max(d.abs());
    if scale == 0.0 {
        return Err(SolverError::invalid("all cubic coefficients are zero"));
    }
    if a.abs() <= 1e-14 * scale {
        return Ok(solve_quadratic(b, c, d));
    }

    let (b, c, d) = (b / a, c / a, d / a);
    let p = |x: f64| ((x + b) * x + c) * x + d;
    let dp = |x: f64| (3.0 * x + 2.0 * b) * x + c;
    let ddp = |x: f64| 6.0 * x + 2.0 * b;

    let bound = 1.0 + b.abs().max(c.abs()).max(d.abs());
    let (mut lo, mut hi) = (-bound, bound);
    let mut x = hi;
    let mut root = None;

    for _ in 0..HALLEY_MAX_ITER {
        let f = p(x);
        if f == 0.0 {
            root = Some(x);
            break;
        }
        if f < 0.0 {
            lo = x;
        } else {
            hi = x;
        }

        let df = dp(x);
        let denom = 2.0 * df * df - f * ddp(x);
        let mut next = x - 2.0 * f * df / denom;
        if !next.is_finite() || next <= lo || next >= hi {
            next = 0.5 * (lo + hi);
        }
        if (next - x).abs() <= ROOT_TOLERANCE * (1.0 + x.abs()) {
            root = Some(next);
            break;
        }
        x = next;
    }

    let r = root.ok_or(SolverError::NoConvergence {
        method: "halley",
        iterations: HALLEY_MAX_ITER,
    })?;

    // x^3 + b x^2 + c x + d = (x - r)(x^2 + q1 x + q0)
    let q1 = b + r;
    let q0 = c + r * q1;
    let mut roots = solve_quadratic(1.0, q1, q0);
    roots.push(r);
    roots.sort_by(|x, y| x.total_cmp(y));
    roots.dedup_by(|x, y| (*x - *y).abs() <= 1e-9 * (1.0 + y.abs()));
    Ok(roots)
}

fn solve_quadratic(a: f64, b: f64, c: f64) -> Vec<f64> {
    let scale = a.abs().max(b.abs()).max(c.abs());
    if scale == 0.0 {
        return Vec::new();
    }
    if a.abs() <= 1e-14 * scale {
        if b == 0.0 {
            return Vec::new();
        }
        return vec![-c / b];
    }

    let disc = b * b - 4.0 * a * c;
    if disc < -1e-12 * (b * b + (4.0 * a * c).abs()) {
        return Vec::new();
    }
    if disc <= 0.0 {
        return vec![-b / (2.0 * a)];
    }

    let q = -0.5 * (b + b.signum() * disc.sqrt());
    let mut roots = vec![q / a];
    if q != 0.0 {
        roots.push(c / q);
    }
    roots.sort_by(|x, y| x.total_cmp(y));
    roots
}
