#![allow(dead_code)]

use rust_xlsxwriter::Workbook;

/// A fixture cell
#[derive(Clone, Debug)]
pub enum Cell {
    Text(&'static str),
    Number(f64),
    Blank,
}

pub use Cell::{Blank, Number as N, Text as T};

pub const MONTHLY_HEADER: [&str; 5] = ["year", "month", "provider", "status", "count"];
pub const COUNTRY_HEADER: [&str; 6] = ["year", "month", "provider", "country", "status", "count"];

/// One worksheet of a fixture workbook
pub struct Sheet {
    pub name: &'static str,
    pub header: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
    /// Blank rows written above the header
    pub offset: u32,
}

pub fn sheet(name: &'static str, header: &[&'static str], rows: Vec<Vec<Cell>>) -> Sheet {
    Sheet {
        name,
        header: header.to_vec(),
        rows,
        offset: 0,
    }
}

impl Sheet {
    pub fn below_blank_rows(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }
}

/// Build an in-memory `.xlsx` with one worksheet per [`Sheet`]
pub fn workbook_bytes(sheets: &[Sheet]) -> Vec<u8> {
    let mut workbook = Workbook::new();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name).unwrap();

        for (c, label) in sheet.header.iter().enumerate() {
            worksheet.write_string(sheet.offset, c as u16, *label).unwrap();
        }

        for (r, row) in sheet.rows.iter().enumerate() {
            let excel_row = sheet.offset + (r + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(s) => {
                        worksheet.write_string(excel_row, c as u16, *s).unwrap();
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(excel_row, c as u16, *n).unwrap();
                    }
                    Cell::Blank => {}
                }
            }
        }
    }

    workbook.save_to_buffer().unwrap()
}

/// Monthly rows for providers A and B over 2023 and 2024, months out of order
pub fn monthly_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![N(2024.0), T("Mar"), T("A"), T("pass"), N(5.0)],
        vec![N(2024.0), T("Jan"), T("A"), T("pass"), N(8.0)],
        vec![N(2024.0), T("Jan"), T("A"), T("fail"), N(2.0)],
        vec![N(2024.0), T("Jan"), T("A"), T("pass"), N(1.0)],
        vec![N(2024.0), T("Feb"), T("A"), T("fail"), N(4.0)],
        vec![N(2024.0), T("Dec"), T("A"), T("pass"), N(7.0)],
        vec![N(2023.0), T("Jan"), T("A"), T("pass"), N(100.0)],
        vec![N(2024.0), T("Jan"), T("B"), T("pass"), N(50.0)],
    ]
}

/// Country rows for provider A in 2024
pub fn country_rows() -> Vec<Vec<Cell>> {
    vec![
        vec![N(2024.0), T("Jan"), T("A"), T("FR"), T("pass"), N(6.0)],
        vec![N(2024.0), T("Jan"), T("A"), T("DE"), T("pass"), N(2.0)],
        vec![N(2024.0), T("Jan"), T("A"), T("FR"), T("fail"), N(2.0)],
        vec![N(2024.0), T("Feb"), T("A"), T("QQ"), T("fail"), N(3.0)],
        vec![N(2024.0), T("Feb"), T("A"), T("DE"), T("pass"), N(1.0)],
        vec![N(2023.0), T("Feb"), T("A"), T("FR"), T("pass"), N(9.0)],
        vec![N(2024.0), T("Feb"), T("B"), T("FR"), T("pass"), N(9.0)],
    ]
}
