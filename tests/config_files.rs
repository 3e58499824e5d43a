use juggle_lib::{ConfigFileError, Fixture, JuggleConfig, Performer, RoutineLibrary};
use juggle_notation::parse_pattern;
use proptest::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn config_file_overrides_defaults() {
    let file = write_temp(
        r#"{
            "timing": { "beat_duration": 0.2, "post_dwell": 0.25 },
            "limits": { "max_period": 8 },
            "lookahead_beats": 10
        }"#,
    );
    let config = JuggleConfig::load(file.path()).unwrap();
    assert_eq!(config.timing.beat_duration, 0.2);
    assert_eq!(config.timing.post_dwell, 0.25);
    assert_eq!(config.timing.pre_dwell, 0.0);
    assert_eq!(config.limits().max_period, 8);
    assert_eq!(config.limits().max_multiplex, 4);
    assert_eq!(config.lookahead_beats, 10);
}

#[test]
fn config_errors_are_reported() {
    let missing = JuggleConfig::load("/nonexistent/juggle.json");
    assert!(matches!(missing, Err(ConfigFileError::Io { .. })));

    let file = write_temp("{ not json");
    assert!(matches!(
        JuggleConfig::load(file.path()),
        Err(ConfigFileError::Parse { .. })
    ));

    let file = write_temp(r#"{ "timing": { "pre_dwell": 2.0 } }"#);
    assert!(matches!(
        JuggleConfig::load(file.path()),
        Err(ConfigFileError::Invalid(_))
    ));
}

#[test]
fn routine_library_from_file() {
    let file = write_temp(
        r#"{
            "patterns": { "cascade": "3", "passing": "[[[1,3]],[[0,3]]]", "shower": "51" },
            "routines": {
                "show": {
                    "steps": [
                        { "play": { "pattern": "cascade", "cycles": 3 } },
                        { "call": { "routine": "finale" } }
                    ]
                },
                "finale": { "steps": [ { "play": { "pattern": "shower", "cycles": 2 } } ] }
            }
        }"#,
    );
    let library = RoutineLibrary::load(file.path()).unwrap();
    let routines = library.build(JuggleConfig::default().limits()).unwrap();
    assert!(routines.pattern("passing").is_some());
    let plan = routines.plan("show", 5).unwrap();
    assert_eq!(plan.len(), 6);
}

#[test]
fn performing_with_a_loaded_config() {
    let file = write_temp(r#"{ "timing": { "beat_duration": 0.2 } }"#);
    let config = JuggleConfig::load(file.path()).unwrap();
    let pattern = parse_pattern("441").unwrap();
    let mut performer = Performer::new(pattern, vec![Fixture::new(Default::default())], &config).unwrap();
    let reports = performer.run(9).unwrap();
    assert!((reports[5].time - 1.0).abs() < 1e-9);
    assert!(performer.dropped().is_empty());
    assert_eq!(performer.props_in_play(), 3);
}

const SITESWAPS: &[&str] = &["3", "441", "531", "51", "423", "630", "711", "522", "4413"];

proptest! {
    #[test]
    fn performance_conserves_props(index in 0..SITESWAPS.len(), beats in 1usize..40) {
        let config = JuggleConfig::default();
        let pattern = parse_pattern(SITESWAPS[index]).unwrap();
        let props = pattern.props();
        let mut performer = Performer::new(pattern, Fixture::row(1, 0.0, 1.0), &config).unwrap();
        performer.run(beats).unwrap();
        prop_assert!(performer.dropped().is_empty());
        prop_assert_eq!(performer.props_in_play(), props);
    }
}
