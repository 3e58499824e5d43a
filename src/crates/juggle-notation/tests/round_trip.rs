use juggle_notation::{format, format_compact, parse_pattern};
use proptest::prelude::*;

fn siteswap_text() -> impl Strategy<Value = String> {
    prop::collection::vec(0u32..12, 1..6).prop_map(|heights| {
        heights
            .into_iter()
            .filter_map(|h| std::char::from_digit(h, 36))
            .collect()
    })
}

proptest! {
    #[test]
    fn compact_text_survives_a_round_trip(text in siteswap_text()) {
        let pattern = parse_pattern(&text);
        prop_assume!(pattern.is_ok());
        let pattern = pattern.unwrap();
        prop_assert_eq!(format_compact(&pattern), Some(text));
    }

    #[test]
    fn array_text_rebuilds_the_same_pattern(text in siteswap_text()) {
        let pattern = parse_pattern(&text);
        prop_assume!(pattern.is_ok());
        let pattern = pattern.unwrap();
        let array = format(&pattern.get_mhn());
        let again = parse_pattern(&array).unwrap();
        prop_assert_eq!(again.get_mhn(), pattern.get_mhn());
        prop_assert_eq!(again.props(), pattern.props());
    }
}
