use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the input table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a spreadsheet export yields.
/// Grouping levels live in `BTreeMap` / `BTreeSet`, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => Ok(()),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Sample – one row of the table
// ---------------------------------------------------------------------------

/// A single soil sample (one row of the source table).
#[derive(Debug, Clone, Default)]
pub struct Sample {
    /// column_name → value.
    pub cells: BTreeMap<String, CellValue>,
}

impl Sample {
    pub fn get(&self, column: &str) -> &CellValue {
        self.cells.get(column).unwrap_or(&CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed table with pre-computed column indices.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// All samples (rows), in file order.
    pub samples: Vec<Sample>,
    /// Column names in header order.
    pub column_names: Vec<String>,
    /// For each column the sorted set of unique values.
    pub unique_values: BTreeMap<String, BTreeSet<CellValue>>,
}

impl Dataset {
    /// Build column indices from the loaded samples.
    pub fn from_samples(column_names: Vec<String>, samples: Vec<Sample>) -> Self {
        let mut unique_values: BTreeMap<String, BTreeSet<CellValue>> = BTreeMap::new();

        for sample in &samples {
            for (col, val) in &sample.cells {
                unique_values
                    .entry(col.clone())
                    .or_default()
                    .insert(val.clone());
            }
        }
        Dataset {
            samples,
            column_names,
            unique_values,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct non-null values of `column`, ascending.
    pub fn levels(&self, column: &str) -> Vec<&CellValue> {
        self.unique_values
            .get(column)
            .map(|set| set.iter().filter(|v| !v.is_null()).collect())
            .unwrap_or_default()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Fail on the first column that the table does not provide.
    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        match columns.iter().find(|c| !self.has_column(c)) {
            Some(missing) => Err(AnalysisError::MissingColumn {
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Non-missing numeric values of `column` in row order.
    pub fn numeric_values(&self, column: &str) -> Result<Vec<f64>> {
        if !self.has_column(column) {
            return Err(AnalysisError::MissingColumn {
                column: column.to_string(),
            });
        }
        let mut out = Vec::with_capacity(self.samples.len());
        for (row, sample) in self.samples.iter().enumerate() {
            let cell = sample.get(column);
            if cell.is_null() {
                continue;
            }
            out.push(numeric_cell(cell, row, column)?);
        }
        Ok(out)
    }
}

/// Numeric value of a non-null cell, or a `NonNumeric` error pointing at
/// it. `index` is the sample's 0-based position.
pub(crate) fn numeric_cell(cell: &CellValue, index: usize, column: &str) -> Result<f64> {
    cell.as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AnalysisError::NonNumeric {
            row: index + 1,
            column: column.to_string(),
            value: cell.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(pairs: &[(&str, CellValue)]) -> Sample {
        Sample {
            cells: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn ordering_groups_integers_numerically() {
        let mut values = vec![
            CellValue::Integer(10),
            CellValue::Integer(2),
            CellValue::Null,
            CellValue::String("P1".into()),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                CellValue::Null,
                CellValue::Integer(2),
                CellValue::Integer(10),
                CellValue::String("P1".into()),
            ]
        );
    }

    #[test]
    fn numeric_values_skip_nulls_and_reject_text() {
        let ds = Dataset::from_samples(
            vec!["PH".into()],
            vec![
                sample(&[("PH", CellValue::Float(5.1))]),
                sample(&[("PH", CellValue::Null)]),
                sample(&[("PH", CellValue::Integer(6))]),
            ],
        );
        assert_eq!(ds.numeric_values("PH").unwrap(), vec![5.1, 6.0]);

        let bad = Dataset::from_samples(
            vec!["PH".into()],
            vec![sample(&[("PH", CellValue::String("n/d".into()))])],
        );
        let err = bad.numeric_values("PH").unwrap_err();
        assert!(matches!(err, AnalysisError::NonNumeric { row: 1, .. }));
        assert!(err.to_string().starts_with("Data row 1 (header not counted), column 'PH'"));
    }

    #[test]
    fn levels_skip_nulls() {
        let ds = Dataset::from_samples(
            vec!["P".into()],
            vec![
                sample(&[("P", CellValue::String("P2".into()))]),
                sample(&[("P", CellValue::Null)]),
                sample(&[("P", CellValue::String("P1".into()))]),
                sample(&[("P", CellValue::String("P2".into()))]),
            ],
        );
        let levels: Vec<String> = ds.levels("P").iter().map(|v| v.to_string()).collect();
        assert_eq!(levels, vec!["P1", "P2"]);
        assert!(ds.levels("Q").is_empty());
    }

    #[test]
    fn require_columns_names_the_missing_one() {
        let ds = Dataset::from_samples(vec!["A".into()], vec![]);
        let err = ds.require_columns(&["A", "B"]).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingColumn { ref column } if column == "B"));
    }
}
