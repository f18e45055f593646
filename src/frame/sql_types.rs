//! # SQL Type Inference
//!
//! Maps frame columns to SQL column types for table creation.

use super::{DataFrame, DataType};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Integer,
    Real,
    Text,
    Boolean,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl From<DataType> for SqlType {
    fn from(dtype: DataType) -> Self {
        match dtype {
            DataType::Bool => SqlType::Boolean,
            DataType::Int => SqlType::Integer,
            DataType::Float => SqlType::Real,
            DataType::Text => SqlType::Text,
        }
    }
}

/// Infers one SQL type per column, in column order.
/// A column holding only nulls is stored as `TEXT`.
pub fn infer_sql_types(frame: &DataFrame) -> Vec<(String, SqlType)> {
    frame
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let dtype = frame.rows().iter().find_map(|row| row[idx].dtype());
            (name.clone(), dtype.map_or(SqlType::Text, SqlType::from))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Value;

    #[test]
    fn infers_from_first_non_null_value() {
        let frame = DataFrame::from_rows(
            ["id", "score", "name", "active", "empty"],
            vec![
                vec![Value::Int(1), Value::Null, "a".into(), true.into(), Value::Null],
                vec![Value::Int(2), Value::Float(0.5), "b".into(), false.into(), Value::Null],
            ],
        )
        .unwrap();

        let types = infer_sql_types(&frame);
        let kinds: Vec<SqlType> = types.iter().map(|(_, t)| *t).collect();
        assert_eq!(
            kinds,
            vec![
                SqlType::Integer,
                SqlType::Real,
                SqlType::Text,
                SqlType::Boolean,
                SqlType::Text
            ]
        );
        assert_eq!(types[1].0, "score");
    }
}
