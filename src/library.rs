use crate::config::{read_json, ConfigFileError};
use juggle_core::{Limits, RoutineDef, Routines};
use juggle_notation::{evaluate_with_limits, parse, ParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error("Pattern '{name}': {source}")]
    Pattern { name: String, source: ParseError },
}

/// Named patterns, written in notation, and the routines built from them
///
/// ```json
/// {
///   "patterns": { "cascade": "3", "shower": "51" },
///   "routines": {
///     "warmup": { "steps": [ { "play": { "pattern": "cascade", "cycles": 4 } },
///                            { "play": { "pattern": "shower" } } ] }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutineLibrary {
    pub patterns: BTreeMap<String, String>,
    pub routines: BTreeMap<String, RoutineDef>,
}

impl RoutineLibrary {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LibraryError> {
        Ok(read_json(path.as_ref())?)
    }

    /// Parse every pattern and register it with the routines
    pub fn build(&self, limits: Limits) -> Result<Routines, LibraryError> {
        let mut routines = Routines::new();
        for (name, source) in &self.patterns {
            let pattern = parse(source)
                .and_then(|ast| evaluate_with_limits(&ast, limits))
                .map_err(|source| LibraryError::Pattern {
                    name: name.clone(),
                    source,
                })?;
            routines.add_pattern(name.clone(), pattern);
        }
        for (name, def) in &self.routines {
            routines.define(name.clone(), def.clone());
        }
        debug!(
            patterns = self.patterns.len(),
            routines = self.routines.len(),
            "routine library built"
        );
        Ok(routines)
    }
}
