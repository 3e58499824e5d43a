use crate::error::{ConfigError, InvariantViolation, Result};
use crate::seq::{Iterations, Sequence};
use serde::{Deserialize, Serialize};

/// Repeating list of beat-length multipliers driving a clock
///
/// An even rhythm is `[1.0]`; a swing feel might be `[1.5, 0.5]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Rhythm {
    beats: Sequence<f64>,
    pass: Vec<f64>,
}

impl Rhythm {
    /// Every beat has the same length
    pub fn even() -> Self {
        Rhythm {
            beats: Sequence::repeat(vec![1.0], Iterations::Infinite),
            pass: vec![1.0],
        }
    }

    /// Rhythm cycling through `multipliers` forever
    pub fn new(multipliers: Vec<f64>) -> std::result::Result<Self, ConfigError> {
        if multipliers.is_empty() {
            return Err(ConfigError::InvalidRhythm("no beats".into()));
        }
        if let Some(bad) = multipliers.iter().find(|m| !(m.is_finite() && **m > 0.0)) {
            return Err(ConfigError::InvalidRhythm(format!(
                "beat multiplier {bad} must be positive"
            )));
        }
        Ok(Rhythm {
            beats: Sequence::repeat(multipliers.clone(), Iterations::Infinite),
            pass: multipliers,
        })
    }

    /// Concatenate rhythms, each repeated `count` times, and cycle the result
    pub fn nested(parts: Vec<(Rhythm, usize)>) -> std::result::Result<Self, ConfigError> {
        if parts.is_empty() || parts.iter().any(|(_, count)| *count == 0) {
            return Err(ConfigError::InvalidRhythm(
                "nested rhythm needs parts repeated at least once".into(),
            ));
        }
        let pass: Vec<f64> = parts
            .iter()
            .flat_map(|(part, count)| {
                std::iter::repeat(part.pass.iter().copied())
                    .take(*count)
                    .flatten()
            })
            .collect();
        let children = parts
            .into_iter()
            .map(|(part, count)| Sequence::repeat(part.pass, Iterations::Finite(count)))
            .collect();
        Ok(Rhythm {
            beats: Sequence::hier(children, Iterations::Infinite),
            pass,
        })
    }

    /// Number of multipliers before the rhythm repeats
    pub fn period(&self) -> usize {
        self.pass.len()
    }

    /// Multipliers of one repetition
    pub fn multipliers(&self) -> &[f64] {
        &self.pass
    }

    pub fn is_even(&self) -> bool {
        self.pass.windows(2).all(|w| w[0] == w[1])
    }

    /// Consume the next multiplier
    pub fn next_beat(&mut self) -> Result<f64> {
        Ok(self
            .beats
            .next_item()?
            .ok_or(InvariantViolation::SequenceExhausted)?)
    }

    /// Multiplier `ahead` beats in the future, without consuming
    pub fn peek(&mut self, ahead: usize) -> Result<f64> {
        Ok(self
            .beats
            .get_item(ahead)?
            .ok_or(InvariantViolation::SequenceExhausted)?)
    }

    /// Start again from the first multiplier
    pub fn restart(&mut self) {
        self.beats.rewind();
    }
}

impl PartialEq for Rhythm {
    fn eq(&self, other: &Self) -> bool {
        self.pass == other.pass
    }
}

impl TryFrom<Vec<f64>> for Rhythm {
    type Error = ConfigError;

    fn try_from(multipliers: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        Rhythm::new(multipliers)
    }
}

impl From<Rhythm> for Vec<f64> {
    fn from(rhythm: Rhythm) -> Self {
        rhythm.pass
    }
}

impl Default for Rhythm {
    fn default() -> Self {
        Rhythm::even()
    }
}
