use std::collections::BTreeMap;

use super::model::{numeric_cell, CellValue, Dataset};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Grouping: split one variable by the levels of one factor
// ---------------------------------------------------------------------------

/// Observations of one variable at one factor level.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub level: CellValue,
    pub values: Vec<f64>,
}

impl Group {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn label(&self) -> String {
        self.level.to_string()
    }
}

/// Split `var` by the levels of `factor`, levels in ascending order.
///
/// A sample contributes to a group when:
/// * its factor cell is not null, and
/// * its variable cell is not null.
///
/// A non-null variable cell that is not numeric is an error.
pub fn group_values(dataset: &Dataset, var: &str, factor: &str) -> Result<Vec<Group>> {
    dataset.require_columns(&[var, factor])?;

    let mut by_level: BTreeMap<CellValue, Vec<f64>> = BTreeMap::new();
    for (row, sample) in dataset.samples.iter().enumerate() {
        let level = sample.get(factor);
        let cell = sample.get(var);
        if level.is_null() || cell.is_null() {
            continue;
        }
        let value = numeric_cell(cell, row, var)?;
        by_level.entry(level.clone()).or_default().push(value);
    }

    Ok(by_level
        .into_iter()
        .map(|(level, values)| Group { level, values })
        .collect())
}
