use juggle_core::{ConfigError, Error, Iterations, Mhn, Pattern, Sequence, ThrowLoc, MAX_HEIGHT};
use proptest::prelude::*;

const THREE_PROP_SITESWAPS: &[&[i64]] = &[
    &[3],
    &[4, 4, 1],
    &[5, 3, 1],
    &[5, 1],
    &[4, 2, 3],
    &[6, 3, 0],
    &[7, 1, 1],
    &[5, 2, 2],
    &[4, 4, 1, 3],
];

fn siteswap(heights: &[i64]) -> Pattern {
    Pattern::from_mhn(&Mhn::siteswap(heights)).unwrap()
}

#[derive(Debug, Clone)]
enum Edit {
    TranslateAll(i64),
    TranslateThrow(usize, i64),
    Multiplex(i64),
    ExtendPeriod,
    Rotate(i64),
    Swap(usize, usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0i64..3).prop_map(Edit::TranslateAll),
        (0usize..8, 0i64..2).prop_map(|(i, m)| Edit::TranslateThrow(i, m)),
        (0i64..4).prop_map(Edit::Multiplex),
        Just(Edit::ExtendPeriod),
        (-3i64..3).prop_map(Edit::Rotate),
        (0usize..8, 0usize..8).prop_map(|(a, b)| Edit::Swap(a, b)),
    ]
}

/// Apply `edit`, returning the prop delta it declares when it succeeds
fn apply(p: &mut Pattern, edit: &Edit) -> Option<i64> {
    let locs = p.locations();
    let pick = |i: usize| locs[i % locs.len()];
    match *edit {
        Edit::TranslateAll(k) => {
            let seq = &p.rows()[0];
            let delta = k * seq.slot_count() as i64 / seq.period() as i64;
            p.translate_all(k).ok().map(|_| delta)
        }
        Edit::TranslateThrow(i, m) => p.translate_throw(pick(i), m).ok().map(|_| m),
        Edit::Multiplex(h) => p.multiplex_translate(0, h).ok().map(|_| h),
        Edit::ExtendPeriod => p.extend_period(None).ok().map(|_| 0),
        Edit::Rotate(x) => p.rotate_throws(None, x).ok().map(|_| 0),
        Edit::Swap(a, b) => p.swap(pick(a), pick(b)).ok().map(|_| 0),
    }
}

proptest! {
    #[test]
    fn lookahead_matches_consumption(
        leaves in prop::collection::vec(prop::collection::vec(0i32..100, 1..4), 1..4),
        reps in prop::collection::vec(1usize..3, 4),
        idx in 0usize..=50,
    ) {
        let children: Vec<Sequence<i32>> = leaves
            .into_iter()
            .zip(&reps)
            .map(|(items, &n)| Sequence::repeat(items, Iterations::Finite(n)))
            .collect();
        let mut seq = Sequence::hier(children, Iterations::Infinite);
        let peeked = seq.get_item(idx).unwrap();
        let mut last = None;
        for _ in 0..=idx {
            last = seq.next_item().unwrap();
        }
        prop_assert_eq!(peeked, last);
    }

    #[test]
    fn edits_conserve_props(
        start in 0usize..THREE_PROP_SITESWAPS.len(),
        edits in prop::collection::vec(edit(), 1..6),
    ) {
        let mut p = siteswap(THREE_PROP_SITESWAPS[start]);
        for edit in &edits {
            let before = p.props() as i64;
            let mhn = p.get_mhn();
            match apply(&mut p, edit) {
                Some(delta) => prop_assert_eq!(p.props() as i64, before + delta),
                None => prop_assert_eq!(p.get_mhn(), mhn),
            }
            let raw = p.raw_props();
            prop_assert!((raw - raw.round()).abs() < 1e-6);
        }
    }

    #[test]
    fn get_mhn_round_trips(
        start in 0usize..THREE_PROP_SITESWAPS.len(),
        edits in prop::collection::vec(edit(), 0..4),
    ) {
        let mut p = siteswap(THREE_PROP_SITESWAPS[start]);
        for edit in &edits {
            apply(&mut p, edit);
        }
        p.clean().unwrap();
        let again = Pattern::from_mhn(&p.get_mhn()).unwrap();
        prop_assert_eq!(again.get_mhn(), p.get_mhn());
        prop_assert_eq!(again.props(), p.props());
    }

    #[test]
    fn oversized_heights_rejected(
        height in (MAX_HEIGHT as i64 + 1)..(1i64 << 40),
        rest in prop::collection::vec(0i64..8, 0..3),
    ) {
        let mut heights = vec![height];
        heights.extend(rest);
        let err = Pattern::from_mhn(&Mhn::siteswap(&heights)).unwrap_err();
        prop_assert!(matches!(
            err,
            Error::Config(ConfigError::HeightLimit { .. } | ConfigError::MalformedNotation(_))
        ), "unexpected error: {:?}", err);
    }

    #[test]
    fn fractional_bounces_rejected(whole in 0u32..4, frac in 0.01f64..0.99) {
        let tuple = Mhn::from(vec![0.0, 3.0, 0.0, whole as f64 + frac]);
        let mhn = Mhn::List(vec![Mhn::List(vec![tuple])]);
        prop_assert!(matches!(
            Pattern::from_mhn(&mhn),
            Err(Error::Config(ConfigError::MalformedNotation(_)))
        ));
    }

    #[test]
    fn swap_is_an_involution(
        start in 0usize..THREE_PROP_SITESWAPS.len(),
        a in 0usize..4,
        b in 0usize..4,
    ) {
        let mut p = siteswap(THREE_PROP_SITESWAPS[start]);
        let period = p.period();
        let (a, b) = (ThrowLoc::new(0, a % period, 0), ThrowLoc::new(0, b % period, 0));
        let original = p.get_mhn();
        if p.swap(a, b).is_ok() {
            p.swap(a, b).unwrap();
            prop_assert_eq!(p.get_mhn(), original);
        }
    }
}

#[test]
fn transitions_between_three_prop_siteswaps() {
    for from in THREE_PROP_SITESWAPS {
        for to in THREE_PROP_SITESWAPS {
            let (a, b) = (siteswap(from), siteswap(to));
            let transition = a.get_transition(&b).unwrap();
            let mut state = a.state().unwrap();
            state.apply(&transition).unwrap();
            assert_eq!(state, b.state().unwrap(), "{from:?} -> {to:?}");
        }
    }
}

#[test]
fn concrete_three_row_scenario() {
    let mhn: Mhn = serde_json::from_str("[[[1,2]],[[2,2]],[[0,2]]]").unwrap();
    let mut p = Pattern::from_mhn(&mhn).unwrap();
    assert_eq!(p.props(), 6);
    assert!(p.is_valid());
    p.multiplex_translate(0, 2).unwrap();
    assert_eq!(p.props(), 8);
}
