use crate::error::ConfigError;
use crate::throw::Throw;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

/// Nested-array MHN+ notation value
///
/// The shape decides the meaning:
///
/// | depth | example               | meaning                                    |
/// |-------|-----------------------|--------------------------------------------|
/// | 0     | `3`                   | one-row, period-one pattern                |
/// | 1     | `[5,3,1]`             | one row, one throw per beat                |
/// | 2     | `[[5,3],1]`           | one row, multiplexed beats                 |
/// | 3     | `[[[1,3]],[[0,3]]]`   | rows of `[dest, height, dest_beats?]`      |
/// | 4     | `[[[[1,3],[0,2]]]]`   | rows of multiplexed tuple lists            |
///
/// A tuple may carry a fourth entry giving the number of floor bounces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Mhn {
    Num(f64),
    List(Vec<Mhn>),
}

impl Mhn {
    /// Nesting depth; a scalar is 0
    pub fn depth(&self) -> usize {
        match self {
            Mhn::Num(_) => 0,
            Mhn::List(items) => 1 + items.iter().map(Mhn::depth).max().unwrap_or(0),
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            Mhn::Num(n) => Some(*n),
            Mhn::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Mhn]> {
        match self {
            Mhn::Num(_) => None,
            Mhn::List(items) => Some(items),
        }
    }

    /// One-row vanilla siteswap
    pub fn siteswap(heights: &[i64]) -> Mhn {
        Mhn::List(heights.iter().map(|&h| Mhn::from(h)).collect())
    }

    /// `[dest, height]`, or `[dest, height, dest_beats]` when that is non-zero
    pub fn tuple(dest_row: usize, flt_beats: i64, dest_beats: i64) -> Mhn {
        let mut items = vec![Mhn::from(dest_row as i64), Mhn::from(flt_beats)];
        if dest_beats != 0 {
            items.push(Mhn::from(dest_beats));
        }
        Mhn::List(items)
    }

    /// True for a flat list of numbers
    fn is_tuple(&self) -> bool {
        matches!(self, Mhn::List(items) if !items.is_empty() && items.iter().all(|i| i.as_num().is_some()))
    }
}

/// Integral values are written without a fractional part
impl Serialize for Mhn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Mhn::Num(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serializer.serialize_i64(*n as i64)
            }
            Mhn::Num(n) => serializer.serialize_f64(*n),
            Mhn::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<i64> for Mhn {
    fn from(n: i64) -> Self {
        Mhn::Num(n as f64)
    }
}

impl From<f64> for Mhn {
    fn from(n: f64) -> Self {
        Mhn::Num(n)
    }
}

impl<T: Into<Mhn>> From<Vec<T>> for Mhn {
    fn from(items: Vec<T>) -> Self {
        Mhn::List(items.into_iter().map(Into::into).collect())
    }
}

/// Throws of one row, grouped by column
pub type RowThrows = Vec<Vec<Throw>>;

fn malformed(msg: impl Into<String>) -> ConfigError {
    ConfigError::MalformedNotation(msg.into())
}

fn integer(value: f64, what: &str) -> Result<i64, ConfigError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(malformed(format!("{what} {value} is not an integer")));
    }
    Ok(value as i64)
}

fn list<'a>(value: &'a Mhn, what: &str) -> Result<&'a [Mhn], ConfigError> {
    match value {
        Mhn::List(items) if !items.is_empty() => Ok(items),
        Mhn::List(_) => Err(malformed(format!("empty {what}"))),
        Mhn::Num(n) => Err(malformed(format!("expected {what}, found number {n}"))),
    }
}

fn beats(value: i64, what: &str) -> Result<i32, ConfigError> {
    i32::try_from(value).map_err(|_| malformed(format!("{what} {value} out of range")))
}

fn height_throw(row: usize, value: &Mhn) -> Result<Throw, ConfigError> {
    let n = value
        .as_num()
        .ok_or_else(|| malformed("expected a throw height"))?;
    let height = integer(n, "height")?;
    if height < 0 {
        return Err(malformed(format!("height {height} is negative")));
    }
    Ok(Throw::new(row, beats(height, "height")?))
}

fn tuple_throw(value: &Mhn) -> Result<Throw, ConfigError> {
    let items = list(value, "throw tuple")?;
    if !(2..=4).contains(&items.len()) {
        return Err(malformed(format!(
            "throw tuple has {} entries, expected 2 to 4",
            items.len()
        )));
    }
    let nums = items
        .iter()
        .map(|i| i.as_num().ok_or_else(|| malformed("throw tuple entries must be numbers")))
        .collect::<Result<Vec<f64>, _>>()?;

    let dest = integer(nums[0], "destination row")?;
    let height = integer(nums[1], "height")?;
    let dest_beats = nums.get(2).map(|&d| integer(d, "destination beats")).transpose()?;
    let bounces = nums.get(3).map(|&b| integer(b, "bounces")).transpose()?;

    if dest < 0 {
        return Err(malformed(format!("destination row {dest} is negative")));
    }
    if height < 0 {
        return Err(malformed(format!("height {height} is negative")));
    }
    let dest = usize::try_from(dest)
        .map_err(|_| malformed(format!("destination row {dest} out of range")))?;
    let mut throw = Throw::new(dest, beats(height, "height")?);
    if let Some(d) = dest_beats {
        throw.dest_beats = beats(d, "destination beats")?;
    }
    if let Some(b) = bounces {
        if b < 0 {
            return Err(malformed(format!("bounce count {b} is negative")));
        }
        throw.bounces =
            u32::try_from(b).map_err(|_| malformed(format!("bounce count {b} out of range")))?;
    }
    Ok(throw)
}

/// Expand notation into rows of columns of throws
pub fn normalize(mhn: &Mhn) -> Result<Vec<RowThrows>, ConfigError> {
    let rows: Vec<RowThrows> = match mhn.depth() {
        0 => vec![vec![vec![height_throw(0, mhn)?]]],
        1 => {
            let columns = list(mhn, "pattern")?
                .iter()
                .map(|h| Ok(vec![height_throw(0, h)?]))
                .collect::<Result<_, ConfigError>>()?;
            vec![columns]
        }
        2 => {
            let columns = list(mhn, "pattern")?
                .iter()
                .map(|column| match column {
                    Mhn::Num(_) => Ok(vec![height_throw(0, column)?]),
                    Mhn::List(_) => list(column, "multiplex")?
                        .iter()
                        .map(|h| height_throw(0, h))
                        .collect(),
                })
                .collect::<Result<_, ConfigError>>()?;
            vec![columns]
        }
        3 | 4 => list(mhn, "pattern")?
            .iter()
            .map(|row| {
                list(row, "row")?
                    .iter()
                    .map(|column| {
                        if column.is_tuple() {
                            Ok(vec![tuple_throw(column)?])
                        } else {
                            list(column, "column")?.iter().map(tuple_throw).collect()
                        }
                    })
                    .collect::<Result<RowThrows, ConfigError>>()
            })
            .collect::<Result<_, ConfigError>>()?,
        depth => return Err(malformed(format!("nesting depth {depth} exceeds 4"))),
    };

    let count = rows.len();
    for throw in rows.iter().flatten().flatten() {
        if throw.dest_row >= count {
            return Err(ConfigError::UnknownRow {
                row: throw.dest_row,
                rows: count,
            });
        }
    }
    Ok(rows)
}
