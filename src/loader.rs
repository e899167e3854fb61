use crate::error::ParseError;
use crate::table::{CellValue, Table, Workbook};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use log::{debug, info};
use std::error::Error;
use std::io::Cursor;
use std::path::Path;

/// Parse an uploaded spreadsheet into a Workbook
///
/// Every sheet becomes a Table whose first row is taken as the header. No
/// column schema is checked here; that is the job of [`crate::validate`].
///
/// # Arguments
/// * `bytes` - Raw bytes of an `.xlsx`, `.xls`, `.xlsb` or `.ods` file
///
/// # Returns
/// * `Result<Workbook, ParseError>` - The parsed workbook or why it could not be read
///
/// # Examples
/// ```no_run
/// use provider_dashboard::loader::parse_workbook;
///
/// let bytes = std::fs::read("report.xlsx").unwrap();
/// match parse_workbook(&bytes) {
///     Ok(workbook) => println!("Sheets: {:?}", workbook.sheet_names()),
///     Err(e) => eprintln!("Error reading upload: {}", e),
/// }
/// ```
pub fn parse_workbook(bytes: &[u8]) -> Result<Workbook, ParseError> {
    if bytes.is_empty() {
        return Err(ParseError::EmptyUpload);
    }

    let mut sheets = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let names = sheets.sheet_names();

    if names.is_empty() {
        return Err(ParseError::NoSheets);
    }

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let range = sheets
            .worksheet_range(&name)
            .map_err(|source| ParseError::Sheet {
                sheet: name.clone(),
                source,
            })?;
        let table = range_to_table(&name, &range);
        debug!(
            "sheet '{}': {} columns, {} rows",
            table.name,
            table.columns.len(),
            table.len()
        );
        tables.push(table);
    }

    info!("parsed workbook with {} sheet(s)", tables.len());
    Ok(Workbook::new(tables))
}

/// Load a workbook from disk
///
/// This function examines the file extension before handing the bytes to
/// [`parse_workbook`].
///
/// # Arguments
/// * `filepath` - Path to the spreadsheet to load
///
/// # Returns
/// * `Result<Workbook, Box<dyn Error>>` - The loaded workbook or an error
pub fn load_workbook(filepath: impl AsRef<Path>) -> Result<Workbook, Box<dyn Error>> {
    let path = filepath.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
            let bytes = std::fs::read(path)?;
            Ok(parse_workbook(&bytes)?)
        }
        Some(ext) => Err(format!("Unsupported file extension: {}", ext).into()),
        None => Err("File has no extension".into()),
    }
}

// First row is the header, taken verbatim; only empty header cells get
// pandas-style placeholders
fn range_to_table(name: &str, range: &Range<Data>) -> Table {
    let mut rows = range.rows();

    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(idx, cell)| match convert_cell(cell) {
                CellValue::Empty => format!("Unnamed: {}", idx),
                CellValue::Text(s) if s.is_empty() => format!("Unnamed: {}", idx),
                other => other.to_string(),
            })
            .collect(),
        None => Vec::new(),
    };

    let data = rows
        .map(|row| {
            let mut cells: Vec<CellValue> = row.iter().map(convert_cell).collect();
            cells.resize(columns.len(), CellValue::Empty);
            cells
        })
        .collect();

    // calamine ranges begin at the first used cell, not at A1
    let header_row = range.start().map_or(1, |(row, _)| row as usize + 1);
    Table::new(name, columns, data).with_header_row(header_row)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        // Error cells carry no usable value
        Data::Error(_) => CellValue::Empty,
        other => CellValue::Text(other.to_string()),
    }
}
