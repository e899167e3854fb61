use thiserror::Error;

/// The upload could not be read as a spreadsheet
///
/// Terminal for that upload: the user has to upload a different file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read workbook: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("could not read sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook contains no sheets")]
    NoSheets,

    #[error("uploaded file is empty")]
    EmptyUpload,
}

/// A table is missing one or more required columns
///
/// The message always names the full required set, not just the difference.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("The selected sheet does not have the required columns: {}", format_column_set(.required))]
pub struct SchemaError {
    pub sheet: String,
    pub required: Vec<String>,
    pub missing: Vec<String>,
}

/// Render a column set the way the dashboard reports it: `{year, month, ...}`
pub fn format_column_set(columns: &[String]) -> String {
    format!("{{{}}}", columns.join(", "))
}

/// Summed counts of one group do not fit in a `u64`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("count total for {group} exceeds {}", u64::MAX)]
pub struct CountOverflow {
    pub group: String,
}

/// Every failure a single pipeline run can end in
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Overflow(#[from] CountOverflow),

    #[error("no workbook has been uploaded")]
    NoWorkbook,

    #[error("sheet '{0}' not found in the uploaded workbook")]
    UnknownSheet(String),
}
