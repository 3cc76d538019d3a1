// src/columns.rs
use crate::dataset::Dataset;
use crate::error::{AuditError, Result};

/// Find the first column (in declaration order) whose lowercased name
/// contains `hint`. Headers get renamed across exports, so exact matching
/// is not used here.
pub fn resolve_column(dataset: &Dataset, hint: &str) -> Result<String> {
    let needle = hint.to_lowercase();
    dataset
        .columns()
        .find(|name| name.to_lowercase().contains(&needle))
        .map(str::to_string)
        .ok_or_else(|| AuditError::ColumnNotFound {
            hint: hint.to_string(),
            available: dataset.column_names(),
        })
}
