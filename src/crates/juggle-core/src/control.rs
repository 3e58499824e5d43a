//! Contract between the pattern model and whatever throws and catches props.

use juggle_physics::Vec3;

/// Identifier of a physical prop
pub type PropId = usize;

/// Something that holds, throws and catches props: a hand, a partner or a
/// fixed fixture. Both ends of a throw are driven through the same calls.
pub trait ControlPoint {
    /// World position at base time `time`
    fn position(&self, time: f64) -> Vec3;

    /// Release one held prop, if any
    fn throw_prop(&mut self, time: f64) -> Option<PropId>;

    fn catch_prop(&mut self, prop: PropId, time: f64);

    /// Let go of a held prop without throwing it
    fn drop_prop(&mut self) -> Option<PropId>;

    /// Props currently held
    fn nprops(&self) -> usize;
}
