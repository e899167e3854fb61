use crate::country::{resolve_country, CountryRegistry};
use crate::month::Month;
use crate::table::{CellValue, Table};
use crate::validate::PipelineKind;
use log::warn;
use serde::Serialize;

/// One typed input row
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Record {
    pub year: i32,
    pub month: Month,
    pub provider: String,
    pub status: String,
    pub count: u64,
    /// Display name of the country; only populated by the country dashboard
    pub country: Option<String>,
}

/// A data row that was dropped because a field could not be typed
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RejectedRow {
    /// 1-based spreadsheet row, as shown in the spreadsheet application
    pub row: usize,
    pub column: String,
    pub value: String,
    pub reason: String,
}

/// Outcome of typing a validated table
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Coerced {
    pub records: Vec<Record>,
    pub rejected: Vec<RejectedRow>,
}

struct Columns {
    year: usize,
    month: usize,
    provider: usize,
    status: usize,
    count: usize,
    country: Option<usize>,
}

impl Columns {
    fn locate(table: &Table, kind: PipelineKind) -> Option<Self> {
        Some(Columns {
            year: table.column_index("year")?,
            month: table.column_index("month")?,
            provider: table.column_index("provider")?,
            status: table.column_index("status")?,
            count: table.column_index("count")?,
            country: match kind {
                PipelineKind::Monthly => None,
                PipelineKind::Country => Some(table.column_index("country")?),
            },
        })
    }
}

impl Table {
    /// Type the rows of a validated table
    ///
    /// Blank rows are skipped. Rows with a field that cannot be coerced are
    /// reported in [`Coerced::rejected`] and left out of the records. Country
    /// codes are resolved to display names through `registry`.
    pub fn records(&self, kind: PipelineKind, registry: &dyn CountryRegistry) -> Coerced {
        let mut out = Coerced::default();

        let Some(columns) = Columns::locate(self, kind) else {
            return out;
        };

        for (idx, row) in self.rows.iter().enumerate() {
            if row.iter().all(CellValue::is_empty) {
                continue;
            }

            let line = self.sheet_row(idx);
            match coerce_row(row, &columns, registry) {
                Ok(record) => out.records.push(record),
                Err((column, reason)) => {
                    let col_idx = self.column_index(column).unwrap_or_default();
                    let value = row.get(col_idx).map(|c| c.to_string()).unwrap_or_default();
                    warn!(
                        "sheet '{}' row {}: rejected {} '{}' ({})",
                        self.name, line, column, value, reason
                    );
                    out.rejected.push(RejectedRow {
                        row: line,
                        column: column.to_string(),
                        value,
                        reason,
                    });
                }
            }
        }

        out
    }
}

type FieldError = (&'static str, String);

static EMPTY_CELL: CellValue = CellValue::Empty;

fn coerce_row(
    row: &[CellValue],
    columns: &Columns,
    registry: &dyn CountryRegistry,
) -> Result<Record, FieldError> {
    let cell = |idx: usize| row.get(idx).unwrap_or(&EMPTY_CELL);

    let year = cell(columns.year)
        .as_i64()
        .and_then(|y| i32::try_from(y).ok())
        .ok_or(("year", "not an integer year".to_string()))?;

    let month = match cell(columns.month) {
        CellValue::Int(n) => Month::from_number(*n),
        other => other.as_text().and_then(|s| s.parse::<Month>().ok()),
    }
    .ok_or(("month", "not a month name or number".to_string()))?;

    let provider = cell(columns.provider)
        .as_text()
        .ok_or(("provider", "empty provider".to_string()))?;

    let status = cell(columns.status)
        .as_text()
        .ok_or(("status", "empty status".to_string()))?;

    let count = cell(columns.count)
        .as_i64()
        .and_then(|c| u64::try_from(c).ok())
        .ok_or(("count", "not a non-negative integer".to_string()))?;

    let country = match columns.country {
        Some(idx) => {
            let code = cell(idx)
                .as_text()
                .ok_or(("country", "empty country code".to_string()))?;
            Some(resolve_country(registry, &code))
        }
        None => None,
    };

    Ok(Record {
        year,
        month,
        provider,
        status,
        count,
        country,
    })
}
