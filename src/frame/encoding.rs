//! # Categorical Encoding
//!
//! Frequency ("count") encoding of categorical features.

use super::{DataFrame, FrameError, Value};
use std::collections::HashMap;

/// Hashable projection of a [`Value`] used as a group key.
/// Floats are keyed by bit pattern so `NaN` groups with itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
}

impl From<&Value> for GroupKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => GroupKey::Null,
            Value::Bool(b) => GroupKey::Bool(*b),
            Value::Int(i) => GroupKey::Int(*i),
            Value::Float(f) => GroupKey::Float(f.to_bits()),
            Value::Text(s) => GroupKey::Text(s.clone()),
        }
    }
}

/// Name of the encoded column for a set of input columns, e.g. `city_ce`
/// or `city_segment_ce`.
pub fn encoded_column_name(input_cols: &[&str]) -> String {
    format!("{}_ce", input_cols.join("_"))
}

/// Encodes categorical features by frequency.
///
/// Groups the rows of `frame` by the values of `input_cols` and returns one row
/// per distinct combination: the key columns followed by `<cols>_ce`, holding the
/// group's share of all rows when `normalized` is true, or its raw count otherwise.
/// Groups are listed in order of first appearance; nulls form their own group.
///
/// ```
/// use dsutils::frame::{encode_categorical_features_by_frequency, DataFrame, Value};
///
/// let frame = DataFrame::from_rows(
///     ["city"],
///     vec![vec!["bogota".into()], vec!["cali".into()], vec!["bogota".into()], vec!["bogota".into()]],
/// ).unwrap();
/// let encoded = encode_categorical_features_by_frequency(&frame, &["city"], true).unwrap();
/// assert_eq!(encoded.columns(), &["city", "city_ce"]);
/// assert_eq!(encoded.rows()[0], vec![Value::from("bogota"), Value::Float(0.75)]);
/// ```
pub fn encode_categorical_features_by_frequency(
    frame: &DataFrame,
    input_cols: &[&str],
    normalized: bool,
) -> Result<DataFrame, FrameError> {
    if input_cols.is_empty() {
        return Err(FrameError::EmptySelection);
    }
    let indices = input_cols
        .iter()
        .map(|name| frame.column_index(name))
        .collect::<Result<Vec<_>, _>>()?;

    // Keys in first-seen order, counts indexed alongside.
    let mut positions: HashMap<Vec<GroupKey>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, u64)> = Vec::new();
    for row in frame.rows() {
        let key: Vec<GroupKey> = indices.iter().map(|&i| GroupKey::from(&row[i])).collect();
        match positions.get(&key) {
            Some(&pos) => groups[pos].1 += 1,
            None => {
                positions.insert(key, groups.len());
                groups.push((indices.iter().map(|&i| row[i].clone()).collect(), 1));
            }
        }
    }

    let total = if normalized { frame.height() as f64 } else { 1.0 };
    let mut columns: Vec<String> = input_cols.iter().map(|c| c.to_string()).collect();
    columns.push(encoded_column_name(input_cols));

    let mut encoded = DataFrame::new(columns)?;
    for (mut values, count) in groups {
        values.push(Value::Float(count as f64 / total));
        encoded.push_row(values)?;
    }
    Ok(encoded)
}
