//! Excel export of the COA data table.

use clearcoa_models::CoaTableRow;
use rust_xlsxwriter::{Color, Format, Workbook};

use crate::error::CoaResult;

pub const EXPORT_SHEET_NAME: &str = "COA Data";
pub const EXPORT_FILE_NAME: &str = "coa_data.xlsx";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const EXPORT_HEADERS: [&str; 10] = [
    "Product",
    "Test",
    "Result",
    "Specs",
    "Value",
    "Comments",
    "Confidence",
    "Date",
    "Supplier",
    "Document",
];

fn export_cells(row: &CoaTableRow) -> [String; 10] {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    [
        text(&row.product_name),
        text(&row.test_name),
        row.test_result.to_string(),
        text(&row.test_specs),
        text(&row.test_value),
        text(&row.test_comments),
        row.confidence.to_string(),
        text(&row.coa_date),
        text(&row.supplier_name),
        row.attachment_file_name
            .clone()
            .or_else(|| row.attachment_url.clone())
            .unwrap_or_default(),
    ]
}

/// Render rows into an in-memory `.xlsx` workbook with one sheet.
pub fn rows_to_xlsx<'a, I>(rows: I) -> CoaResult<Vec<u8>>
where
    I: IntoIterator<Item = &'a CoaTableRow>,
{
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0x2563EB))
        .set_font_color(Color::RGB(0xFFFFFF));

    let mut widths: Vec<usize> = EXPORT_HEADERS.iter().map(|header| header.len()).collect();
    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (index, row) in rows.into_iter().enumerate() {
        let row_number = (index + 1) as u32;
        for (col, value) in export_cells(row).iter().enumerate() {
            widths[col] = widths[col].max(value.chars().count());
            if !value.is_empty() {
                worksheet.write_string(row_number, col as u16, value)?;
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, (*width).clamp(8, 60) as f64 + 2.0)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clearcoa_models::{Confidence, TestOutcome};
    use uuid::Uuid;

    fn row() -> CoaTableRow {
        CoaTableRow {
            id: Uuid::new_v4(),
            attachment_surrogate_key: Some(Uuid::new_v4()),
            supplier_name: Some("Acme".to_string()),
            product_name: Some("Resin".to_string()),
            test_name: Some("pH".to_string()),
            test_result: TestOutcome::Fail,
            test_specs: Some("6.5-7.5".to_string()),
            test_value: Some("8.1".to_string()),
            test_comments: None,
            confidence: Confidence::High,
            coa_date: Some("2024-01-15".to_string()),
            created_at: None,
            attachment_file_name: None,
            attachment_url: Some("http://localhost/coa-bucket/t/1-acme.pdf".to_string()),
        }
    }

    #[test]
    fn test_export_cells_follow_headers() {
        let cells = export_cells(&row());
        assert_eq!(cells[0], "Resin");
        assert_eq!(cells[2], "fail");
        assert_eq!(cells[6], "high");
        assert_eq!(cells[5], "");
        // Falls back to the URL when the file name is unknown
        assert_eq!(cells[9], "http://localhost/coa-bucket/t/1-acme.pdf");
    }

    #[test]
    fn test_rows_to_xlsx_produces_zip_container() {
        let rows = vec![row(), row()];
        let bytes = rows_to_xlsx(&rows).unwrap();

        // xlsx files are zip archives
        assert!(bytes.len() > 4);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_rows_to_xlsx_handles_empty_table() {
        let bytes = rows_to_xlsx(std::iter::empty()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
