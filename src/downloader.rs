use crate::presentation::LabeledTable;
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::error::Error;

/// Convert a summary table to CSV format
///
/// The first line holds the column labels. Fields containing commas, quotes
/// or newlines are quoted, with embedded quotes doubled.
///
/// # Arguments
/// * `table` - Reference to the table to convert
///
/// # Returns
/// * `Result<String, Box<dyn Error>>` - CSV content as a string or an error
///
/// # Examples
/// ```
/// use provider_dashboard::downloader::to_csv;
/// use provider_dashboard::presentation::LabeledTable;
///
/// let table = LabeledTable {
///     title: "Counts".to_string(),
///     columns: vec!["Status".to_string(), "Count".to_string()],
///     rows: vec![vec!["pass".to_string(), "8".to_string()]],
/// };
/// assert_eq!(to_csv(&table).unwrap(), "Status,Count\npass,8\n");
/// ```
pub fn to_csv(table: &LabeledTable) -> Result<String, Box<dyn Error>> {
    let mut csv_content = String::new();

    push_csv_line(&mut csv_content, &table.columns);
    for row in &table.rows {
        if row.len() != table.columns.len() {
            return Err(format!(
                "row has {} fields but table '{}' has {} columns",
                row.len(),
                table.title,
                table.columns.len()
            )
            .into());
        }
        push_csv_line(&mut csv_content, row);
    }

    Ok(csv_content)
}

fn push_csv_line(out: &mut String, fields: &[String]) {
    for (idx, value) in fields.iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        if value.contains(',') || value.contains('"') || value.contains('\n') {
            let escaped = value.replace('"', "\"\"");
            out.push_str(&format!("\"{}\"", escaped));
        } else {
            out.push_str(value);
        }
    }
    out.push('\n');
}

/// Convert summary tables to XLSX format, one worksheet per table
///
/// Numeric fields are written as numbers so they stay usable in Excel;
/// everything else is written as text under a bold header row.
///
/// # Arguments
/// * `tables` - Tables to export
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
pub fn to_xlsx(tables: &[LabeledTable]) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for (idx, table) in tables.iter().enumerate() {
        let mut worksheet = Worksheet::new();
        worksheet.set_name(sheet_name(&table.title, idx))?;

        for (c, label) in table.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, c as u16, label.as_str(), &header)?;
        }

        for (r, row) in table.rows.iter().enumerate() {
            let excel_row = (r + 1) as u32;
            for (c, value) in row.iter().enumerate() {
                match value.parse::<f64>() {
                    Ok(number) if number.is_finite() => {
                        worksheet.write_number(excel_row, c as u16, number)?;
                    }
                    _ => {
                        worksheet.write_string(excel_row, c as u16, value.as_str())?;
                    }
                }
            }
        }

        worksheet.autofit();
        workbook.push_worksheet(worksheet);
    }

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

// Excel sheet names: at most 31 chars, none of []:*?/\
fn sheet_name(title: &str, idx: usize) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect();
    let cleaned = cleaned.trim().to_string();

    if cleaned.is_empty() {
        format!("Table {}", idx + 1)
    } else {
        cleaned
    }
}
