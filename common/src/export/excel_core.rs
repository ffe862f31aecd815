//! XLSX generation for the session sheet

use rust_xlsxwriter::*;

use super::{build_rows, ExportRow, COLUMNS, SHEET_NAME};
use crate::error::{Error, Result};
use crate::types::PriceRecord;

const EAN_COL: u16 = 9;

fn xlsx_err(context: &str) -> impl Fn(XlsxError) -> Error + '_ {
    move |e| Error::Export(format!("{}: {}", context, e))
}

/// Build the workbook bytes for `records` (one row each, header first)
pub fn generate_excel_buffer(records: &[PriceRecord]) -> Result<Vec<u8>> {
    let rows = build_rows(records);
    let mut workbook = Workbook::new();

    let header_format = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xF5F5F5))
        .set_border(FormatBorder::Thin);
    let price_format = Format::new().set_num_format("0.00");
    // "@" keeps long digit strings out of scientific notation
    let text_format = Format::new().set_num_format("@");

    let worksheet = workbook.add_worksheet();
    worksheet
        .set_name(SHEET_NAME)
        .map_err(xlsx_err("nome foglio"))?;

    for (col, (header, width)) in COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, *header, &header_format)
            .map_err(xlsx_err("intestazione"))?;
        worksheet
            .set_column_width(col, *width)
            .map_err(xlsx_err("larghezza colonna"))?;
    }
    worksheet
        .set_column_format(EAN_COL, &text_format)
        .map_err(xlsx_err("formato EAN"))?;

    for (idx, row) in rows.iter().enumerate() {
        write_row(worksheet, idx as u32 + 1, row, &price_format, &text_format)?;
    }

    workbook.save_to_buffer().map_err(xlsx_err("salvataggio Excel"))
}

fn write_row(
    worksheet: &mut Worksheet,
    row_idx: u32,
    row: &ExportRow,
    price_format: &Format,
    text_format: &Format,
) -> Result<()> {
    let text_cells: [(u16, &str); 5] = [
        (0, &row.date),
        (1, &row.store_chain),
        (2, &row.store_name),
        (3, &row.product_type),
        (4, &row.item_name),
    ];
    for (col, value) in text_cells {
        worksheet
            .write_string(row_idx, col, value)
            .map_err(xlsx_err("scrittura cella"))?;
    }

    if let Some(stems) = row.stems_count {
        worksheet
            .write_number(row_idx, 5, stems)
            .map_err(xlsx_err("scrittura steli"))?;
    }
    if let Some(vase) = row.vase_diameter {
        worksheet
            .write_number(row_idx, 6, vase)
            .map_err(xlsx_err("scrittura vaso"))?;
    }
    worksheet
        .write_number_with_format(row_idx, 7, row.price, price_format)
        .map_err(xlsx_err("scrittura prezzo"))?;
    worksheet
        .write_string(row_idx, 8, &row.supplier)
        .map_err(xlsx_err("scrittura fornitore"))?;
    if !row.ean_code.is_empty() {
        worksheet
            .write_string_with_format(row_idx, EAN_COL, &row.ean_code, text_format)
            .map_err(xlsx_err("scrittura EAN"))?;
    }
    worksheet
        .write_string(row_idx, 10, &row.notes)
        .map_err(xlsx_err("scrittura note"))?;

    Ok(())
}
