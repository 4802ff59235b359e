use std::path::Path;

use rust_xlsxwriter::{Color, Format, FormatBorder, FormatPattern, Workbook};

use crate::models::AttendanceRecord;

use super::ExportError;

pub const HEADERS: [&str; 7] = [
    "Name",
    "Identifier",
    "Course",
    "Date",
    "Time",
    "Has-Photo",
    "Record-Id",
];

const SHEET_NAME: &str = "Attendance Records";

pub fn record_to_row(record: &AttendanceRecord) -> [String; 7] {
    [
        record.full_name.clone(),
        record.registration.clone(),
        record.course.clone(),
        record.date.clone(),
        record.time.clone(),
        record.has_photo_display().to_string(),
        record.id.clone(),
    ]
}

pub(crate) fn write_csv(records: &[AttendanceRecord], path: &Path) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(HEADERS)?;
    for record in records {
        wtr.write_record(record_to_row(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Bold header row, frozen, columns sized to their widest value.
pub(crate) fn write_xlsx(records: &[AttendanceRecord], path: &Path) -> Result<(), ExportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::RGB(0xFFFFFF))
        .set_background_color(Color::RGB(0x2F75B5))
        .set_pattern(FormatPattern::Solid)
        .set_border(FormatBorder::Thin);

    let mut col_widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();

    for (col, header) in HEADERS.iter().enumerate() {
        worksheet.write_with_format(0, col as u16, *header, &header_format)?;
    }
    worksheet.set_freeze_panes(1, 0)?;

    for (index, record) in records.iter().enumerate() {
        let row = (index + 1) as u32;
        for (col, value) in record_to_row(record).iter().enumerate() {
            // Registrations stay text so leading zeros survive
            worksheet.write_string(row, col as u16, value)?;
            col_widths[col] = col_widths[col].max(value.chars().count());
        }
    }

    for (col, width) in col_widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, (*width).min(60) as f64 + 2.0)?;
    }

    workbook.save(path)?;
    Ok(())
}
