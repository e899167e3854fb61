use crate::error::SchemaError;
use crate::table::Table;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Required columns of the monthly dashboard
pub const MONTHLY_COLUMNS: [&str; 5] = ["year", "month", "provider", "status", "count"];

/// Required columns of the country dashboard
pub const COUNTRY_COLUMNS: [&str; 6] = ["year", "month", "provider", "country", "status", "count"];

/// Which of the two dashboards a table is fed into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    /// Month/status variations for one provider and year
    #[default]
    Monthly,
    /// Month/status shares plus a per-country breakdown
    Country,
}

impl PipelineKind {
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            PipelineKind::Monthly => &MONTHLY_COLUMNS,
            PipelineKind::Country => &COUNTRY_COLUMNS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::Monthly => "monthly",
            PipelineKind::Country => "country",
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "1" => Ok(PipelineKind::Monthly),
            "country" | "2" => Ok(PipelineKind::Country),
            other => Err(format!("unknown pipeline '{}'", other)),
        }
    }
}

/// Check that `table` carries every column in `required`
///
/// Membership is exact: no trimming, no case folding, no inspection of the
/// values. On failure the error carries the full required set for display.
pub fn validate<'a>(table: &'a Table, required: &[&str]) -> Result<&'a Table, SchemaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|column| !table.has_column(column))
        .map(|column| column.to_string())
        .collect();

    if missing.is_empty() {
        return Ok(table);
    }

    warn!(
        "sheet '{}' is missing required columns {:?}",
        table.name, missing
    );
    Err(SchemaError {
        sheet: table.name.clone(),
        required: required.iter().map(|c| c.to_string()).collect(),
        missing,
    })
}

/// [`validate`] against the required set of a pipeline
pub fn validate_for(table: &Table, kind: PipelineKind) -> Result<&Table, SchemaError> {
    validate(table, kind.required_columns())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(columns: &[&str]) -> Table {
        Table::new(
            "Sheet1",
            columns.iter().map(|c| c.to_string()).collect(),
            Vec::new(),
        )
    }

    #[test]
    fn succeeds_iff_required_is_subset() {
        let full = table_with(&["year", "month", "provider", "status", "count", "extra"]);
        assert!(validate(&full, &MONTHLY_COLUMNS).is_ok());
        assert!(validate(&full, &COUNTRY_COLUMNS).is_err());
        assert!(validate(&full, &[]).is_ok());

        let none = table_with(&[]);
        assert!(validate(&none, &[]).is_ok());
        assert!(validate(&none, &["year"]).is_err());
    }

    #[test]
    fn failure_names_full_required_set() {
        let table = table_with(&["year", "month", "provider", "count"]);
        let err = validate(&table, &MONTHLY_COLUMNS).unwrap_err();

        assert_eq!(err.missing, vec!["status".to_string()]);
        assert_eq!(err.required.len(), 5);
        assert_eq!(
            err.to_string(),
            "The selected sheet does not have the required columns: {year, month, provider, status, count}"
        );
    }

    #[test]
    fn membership_is_exact() {
        let table = table_with(&["Year", "month ", "provider", "status", "count"]);
        let err = validate(&table, &MONTHLY_COLUMNS).unwrap_err();
        assert_eq!(err.missing, vec!["year".to_string(), "month".to_string()]);
    }

    #[test]
    fn pipeline_kind_parses_names() {
        assert_eq!("Monthly".parse::<PipelineKind>(), Ok(PipelineKind::Monthly));
        assert_eq!("country".parse::<PipelineKind>(), Ok(PipelineKind::Country));
        assert!("weekly".parse::<PipelineKind>().is_err());
    }
}
