//! Routines: named patterns strung together into longer performances.
//!
//! A routine is a list of steps, each playing a pattern for some cycles or
//! calling another routine. Routines compile to a hierarchical
//! [`Sequence`] of pattern names; planning a run inserts a synthesized
//! transition wherever consecutive patterns differ.

use crate::error::{Result, SequenceError};
use crate::pattern::Pattern;
use crate::seq::{Iterations, Sequence, MAX_DEPTH};
use crate::state::Transition;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

fn one() -> usize {
    1
}

/// One entry of a routine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Play a named pattern for whole cycles
    Play {
        pattern: String,
        #[serde(default = "one")]
        cycles: usize,
    },
    /// Play another routine in place
    Call { routine: String },
}

impl Step {
    pub fn play(pattern: impl Into<String>, cycles: usize) -> Self {
        Step::Play {
            pattern: pattern.into(),
            cycles,
        }
    }

    pub fn call(routine: impl Into<String>) -> Self {
        Step::Call {
            routine: routine.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutineDef {
    pub steps: Vec<Step>,
    /// Passes over the steps; `None` repeats forever
    #[serde(default = "default_repeat")]
    pub repeat: Option<usize>,
    /// Pattern played in place of the first cycle
    #[serde(default)]
    pub entry: Option<String>,
    /// Pattern played in place of the last cycle
    #[serde(default)]
    pub exit: Option<String>,
}

fn default_repeat() -> Option<usize> {
    Some(1)
}

impl RoutineDef {
    pub fn new(steps: Vec<Step>) -> Self {
        RoutineDef {
            steps,
            repeat: Some(1),
            entry: None,
            exit: None,
        }
    }

    pub fn repeat(mut self, repeat: Option<usize>) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn entry(mut self, pattern: impl Into<String>) -> Self {
        self.entry = Some(pattern.into());
        self
    }

    pub fn exit(mut self, pattern: impl Into<String>) -> Self {
        self.exit = Some(pattern.into());
        self
    }
}

/// A planned piece of a performance
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// One cycle of a named pattern
    Play(String),
    Transition {
        from: String,
        to: String,
        transition: Transition,
    },
}

/// Library of named patterns and routines
#[derive(Debug, Clone, Default)]
pub struct Routines {
    patterns: BTreeMap<String, Pattern>,
    routines: BTreeMap<String, RoutineDef>,
}

impl Routines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pattern(&mut self, name: impl Into<String>, pattern: Pattern) {
        self.patterns.insert(name.into(), pattern);
    }

    pub fn define(&mut self, name: impl Into<String>, routine: RoutineDef) {
        self.routines.insert(name.into(), routine);
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    pub fn routine(&self, name: &str) -> Option<&RoutineDef> {
        self.routines.get(name)
    }

    fn known_pattern(&self, name: &str) -> std::result::Result<(), SequenceError> {
        if self.patterns.contains_key(name) {
            Ok(())
        } else {
            Err(SequenceError::Config(format!("unknown pattern '{name}'")))
        }
    }

    /// Sequence of pattern names, one per cycle
    pub fn compile(&self, name: &str) -> Result<Sequence<String>> {
        self.build(name, 0).map_err(Into::into)
    }

    fn build(&self, name: &str, depth: usize) -> std::result::Result<Sequence<String>, SequenceError> {
        if depth > MAX_DEPTH {
            warn!(routine = name, depth, "routine nesting too deep");
            return Err(SequenceError::RecursionLimit {
                depth,
                limit: MAX_DEPTH,
            });
        }
        let def = self
            .routines
            .get(name)
            .ok_or_else(|| SequenceError::Config(format!("unknown routine '{name}'")))?;

        let mut children = Vec::with_capacity(def.steps.len());
        for step in &def.steps {
            match step {
                Step::Play { pattern, cycles } => {
                    self.known_pattern(pattern)?;
                    children.push(Sequence::repeat(vec![pattern.clone()], Iterations::Finite(*cycles)));
                }
                Step::Call { routine } => children.push(self.build(routine, depth + 1)?),
            }
        }

        let iterations = match def.repeat {
            Some(n) => Iterations::Finite(n),
            None => Iterations::Infinite,
        };
        let seq = Sequence::hier(children, iterations);
        if def.entry.is_none() && def.exit.is_none() {
            return Ok(seq);
        }
        for framing in def.entry.iter().chain(&def.exit) {
            self.known_pattern(framing)?;
        }
        seq.with_splice(
            1,
            def.entry.clone().map(|p| vec![p]),
            def.exit.clone().map(|p| vec![p]),
        )
    }

    /// First `cycles` cycles of a routine, with transitions between
    /// differing patterns
    pub fn plan(&self, name: &str, cycles: usize) -> Result<Vec<Segment>> {
        let mut seq = self.compile(name)?;
        let batch = seq.get_items(cycles)?;

        let mut plan = Vec::with_capacity(batch.items.len());
        let mut previous: Option<&str> = None;
        for item in &batch.items {
            if let Some(prev) = previous.filter(|p| *p != item.as_str()) {
                let from = self.lookup(prev)?;
                let to = self.lookup(item)?;
                let transition = from.get_transition(to)?;
                if !transition.is_empty() {
                    plan.push(Segment::Transition {
                        from: prev.to_string(),
                        to: item.clone(),
                        transition,
                    });
                }
            }
            plan.push(Segment::Play(item.clone()));
            previous = Some(item.as_str());
        }
        debug!(routine = name, segments = plan.len(), "routine planned");
        Ok(plan)
    }

    fn lookup(&self, name: &str) -> std::result::Result<&Pattern, SequenceError> {
        self.patterns
            .get(name)
            .ok_or_else(|| SequenceError::Config(format!("unknown pattern '{name}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::mhn::Mhn;

    fn pattern(json: &str) -> Pattern {
        let mhn: Mhn = serde_json::from_str(json).unwrap();
        Pattern::from_mhn(&mhn).unwrap()
    }

    fn library() -> Routines {
        let mut lib = Routines::new();
        lib.add_pattern("cascade", pattern("3"));
        lib.add_pattern("shower", pattern("[5,1]"));
        lib.add_pattern("box", pattern("[4,4,1]"));
        lib
    }

    fn names(seq: &mut Sequence<String>, n: usize) -> Vec<String> {
        seq.get_items(n).unwrap().items
    }

    #[test]
    fn test_compile_repeats() {
        let mut lib = library();
        lib.define(
            "main",
            RoutineDef::new(vec![Step::play("cascade", 2), Step::play("shower", 1)]).repeat(Some(2)),
        );
        let batch = lib.compile("main").unwrap().get_items(7).unwrap();
        assert_eq!(
            batch.items,
            vec!["cascade", "cascade", "shower", "cascade", "cascade", "shower"]
        );
        assert_eq!(batch.remaining, 1);
        assert!(batch.exhausted);
    }

    #[test]
    fn test_nested_calls() {
        let mut lib = library();
        lib.define("inner", RoutineDef::new(vec![Step::play("shower", 1)]).repeat(Some(2)));
        lib.define(
            "outer",
            RoutineDef::new(vec![Step::play("cascade", 1), Step::call("inner")]),
        );
        let mut seq = lib.compile("outer").unwrap();
        assert_eq!(names(&mut seq, 3), vec!["cascade", "shower", "shower"]);
    }

    #[test]
    fn test_entry_and_exit() {
        let mut lib = library();
        lib.define(
            "framed",
            RoutineDef::new(vec![Step::play("cascade", 3)])
                .entry("shower")
                .exit("box"),
        );
        let mut seq = lib.compile("framed").unwrap();
        assert_eq!(names(&mut seq, 3), vec!["shower", "cascade", "box"]);
    }

    #[test]
    fn test_self_reference_hits_limit() {
        let mut lib = library();
        lib.define("loop", RoutineDef::new(vec![Step::call("loop")]));
        let err = lib.compile("loop").unwrap_err();
        assert!(matches!(
            err,
            Error::Sequence(SequenceError::RecursionLimit { limit: MAX_DEPTH, .. })
        ));
    }

    #[test]
    fn test_unknown_names() {
        let mut lib = library();
        lib.define("bad", RoutineDef::new(vec![Step::play("nope", 1)]));
        assert!(lib.compile("bad").unwrap_err().is_recoverable());
        assert!(lib.compile("missing").unwrap_err().is_recoverable());
    }

    #[test]
    fn test_plan_inserts_transitions() {
        let mut lib = library();
        lib.define(
            "main",
            RoutineDef::new(vec![Step::play("cascade", 1), Step::play("shower", 1)]).repeat(None),
        );
        let plan = lib.plan("main", 3).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(plan[0], Segment::Play("cascade".into()));
        match &plan[1] {
            Segment::Transition { from, to, transition } => {
                assert_eq!((from.as_str(), to.as_str()), ("cascade", "shower"));
                assert_eq!(transition.len(), 1);
            }
            other => panic!("expected a transition, got {other:?}"),
        }
        assert!(matches!(&plan[3], Segment::Transition { .. }));
        assert_eq!(plan[4], Segment::Play("cascade".into()));
    }

    #[test]
    fn test_plan_skips_empty_transitions() {
        let mut lib = library();
        // cascade and box share the state 111
        lib.define(
            "main",
            RoutineDef::new(vec![Step::play("cascade", 1), Step::play("box", 1)]),
        );
        let plan = lib.plan("main", 2).unwrap();
        assert_eq!(
            plan,
            vec![Segment::Play("cascade".into()), Segment::Play("box".into())]
        );
    }

    #[test]
    fn test_routine_from_json() {
        let def: RoutineDef = serde_json::from_str(
            r#"{"steps":[{"play":{"pattern":"cascade","cycles":2}},{"call":{"routine":"x"}}]}"#,
        )
        .unwrap();
        assert_eq!(def.repeat, Some(1));
        assert_eq!(def.steps[0], Step::play("cascade", 2));
        assert_eq!(def.steps[1], Step::call("x"));
    }
}
