use juggle_core::{ControlPoint, PropId, Vec3};
use std::collections::VecDeque;
use tracing::trace;

/// A hand that never moves: props queue up in the order they were caught
#[derive(Debug, Clone, PartialEq)]
pub struct Fixture {
    position: Vec3,
    held: VecDeque<PropId>,
}

impl Fixture {
    pub fn new(position: Vec3) -> Self {
        Fixture {
            position,
            held: VecDeque::new(),
        }
    }

    /// `count` fixtures spaced `spacing` metres apart along x at height `y`
    pub fn row(count: usize, spacing: f64, y: f64) -> Vec<Fixture> {
        let width = spacing * count.saturating_sub(1) as f64;
        (0..count)
            .map(|i| Fixture::new(Vec3::new(i as f64 * spacing - width / 2.0, y, 0.0)))
            .collect()
    }

    pub fn held(&self) -> impl Iterator<Item = PropId> + '_ {
        self.held.iter().copied()
    }
}

impl ControlPoint for Fixture {
    fn position(&self, _time: f64) -> Vec3 {
        self.position
    }

    fn throw_prop(&mut self, time: f64) -> Option<PropId> {
        let prop = self.held.pop_front();
        trace!(?prop, time, "throw");
        prop
    }

    fn catch_prop(&mut self, prop: PropId, time: f64) {
        trace!(prop, time, "catch");
        self.held.push_back(prop);
    }

    fn drop_prop(&mut self) -> Option<PropId> {
        self.held.pop_back()
    }

    fn nprops(&self) -> usize {
        self.held.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_caught_first_thrown() {
        let mut hand = Fixture::new(Vec3::ZERO);
        hand.catch_prop(3, 0.0);
        hand.catch_prop(7, 0.1);
        assert_eq!(hand.nprops(), 2);
        assert_eq!(hand.throw_prop(0.2), Some(3));
        assert_eq!(hand.drop_prop(), Some(7));
        assert_eq!(hand.throw_prop(0.3), None);
    }

    #[test]
    fn test_row_is_centred() {
        let hands = Fixture::row(3, 0.5, 1.0);
        let xs: Vec<f64> = hands.iter().map(|h| h.position(0.0).x).collect();
        assert_eq!(xs, vec![-0.5, 0.0, 0.5]);
        assert!(hands.iter().all(|h| h.position(5.0).y == 1.0));
    }
}
