//! Vendor mapping file
//!
//! Describes how the delimited records of one vendor land in its usage table:
//!
//! ```yaml
//! vendorID: 7
//! vendorName: acme
//! sqlBase: "INSERT INTO acme_usage (account, quantity, usage_date, created_by) VALUES "
//! sqlValues: "(?, ?::bigint, ?::date, ?)"
//! columnMappers:
//!   account: { tableIndex: 0, csvIndex: 2 }
//!   quantity: { tableIndex: 1, csvIndex: 5 }
//!   usage_date: { tableIndex: 2, csvIndex: 0 }
//! ```
//!
//! The last placeholder of `sqlValues` always receives the importing user.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::db::repository::count_placeholders;
use crate::steps::{StepError, StepResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapper {
    #[serde(rename = "tableIndex")]
    pub table_index: usize,
    #[serde(rename = "csvIndex")]
    pub csv_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorMapper {
    #[serde(rename = "vendorID")]
    pub vendor_id: i64,
    #[serde(rename = "vendorName")]
    pub vendor_name: String,
    #[serde(rename = "sqlBase")]
    pub sql_base: String,
    #[serde(rename = "sqlValues")]
    pub sql_values: String,
    #[serde(rename = "columnMappers")]
    pub column_mappers: BTreeMap<String, ColumnMapper>,
}

impl VendorMapper {
    /// Read and validate a mapping file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read vendor mapping {}: {}", path.display(), e)
        })?;
        let mapper = Self::from_yaml(&content)?;

        tracing::info!(
            vendor_id = mapper.vendor_id,
            vendor_name = %mapper.vendor_name,
            columns = mapper.column_mappers.len(),
            path = %path.display(),
            "Vendor mapping loaded"
        );

        Ok(mapper)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let mapper: VendorMapper = serde_yaml::from_str(content)?;
        mapper.validate()?;
        Ok(mapper)
    }

    pub fn validate(&self) -> StepResult<()> {
        if self.sql_base.trim().is_empty() || self.sql_values.trim().is_empty() {
            return Err(StepError::Validation(
                "sqlBase and sqlValues must not be empty".to_string(),
            ));
        }
        if self.column_mappers.is_empty() {
            return Err(StepError::Validation(
                "at least one column mapper is required".to_string(),
            ));
        }

        let width = self.column_mappers.len();
        let table_indices: BTreeSet<usize> =
            self.column_mappers.values().map(|m| m.table_index).collect();
        if table_indices.len() != width || table_indices.iter().copied().ne(0..width) {
            return Err(StepError::Validation(format!(
                "tableIndex values must be exactly 0..{}, got {:?}",
                width, table_indices
            )));
        }

        let placeholders = count_placeholders(&self.sql_values);
        if placeholders != width + 1 {
            return Err(StepError::Validation(format!(
                "sqlValues has {} placeholders, expected {} mapped columns plus the user",
                placeholders, width
            )));
        }

        Ok(())
    }

    /// Number of values in every mapped row
    pub fn row_width(&self) -> usize {
        self.column_mappers.len() + 1
    }

    /// Place the mapped columns of `record` at their table index and append `user`
    pub fn map_record<'a, I>(&self, record: I, record_number: u64, user: &str) -> StepResult<Vec<String>>
    where
        I: Fn(usize) -> Option<&'a str>,
    {
        let mut row = vec![String::new(); self.row_width()];
        for mapper in self.column_mappers.values() {
            let value = record(mapper.csv_index).ok_or(StepError::MissingColumn {
                record: record_number,
                index: mapper.csv_index,
            })?;
            row[mapper.table_index] = value.to_string();
        }
        if let Some(last) = row.last_mut() {
            *last = user.to_string();
        }
        Ok(row)
    }
}
