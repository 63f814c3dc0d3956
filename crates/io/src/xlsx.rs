// Excel template load (xlsx, xls) and working-paper write (xlsx only)
//
// Load: cell values and formulas come from calamine; styles, row heights,
//       hidden rows/columns, merges and conditional rules come from the
//       package XML (see xlsx_styles).
// Write: every sheet is rebuilt from the engine model with rust_xlsxwriter.

use std::path::Path;

use auditpaper_engine::address::CellAddress;
use auditpaper_engine::cell::{CellValue, Scalar};
use auditpaper_engine::cond_format::{ConditionalRule, Predicate};
use auditpaper_engine::sheet::{Worksheet, DEFAULT_ROW_HEIGHT};
use auditpaper_engine::style::{BorderStyle, HorizontalAlignment, Rgba, Style, VerticalAlignment};
use auditpaper_engine::workbook::Workbook;
use auditpaper_records::dates::{from_excel_serial, parse_date_str};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::Datelike;
use rust_xlsxwriter::{
    Color, ConditionalFormatCell, ConditionalFormatCellRule, ConditionalFormatFormula, ExcelDateTime,
    Format, FormatAlign, FormatBorder, FormatUnderline, Workbook as XlsxWorkbook,
    Worksheet as XlsxWorksheet,
};

use crate::xlsx_styles;

/// Number format applied to date cells that carry none of their own.
const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd";

// ============================================================================
// Load
// ============================================================================

/// Counters from loading a template
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    pub sheets_loaded: usize,
    pub cells_loaded: usize,
    pub formulas_loaded: usize,
    /// Cells that received a non-default style
    pub styled_cells: usize,
    pub merges_loaded: usize,
    /// Merged regions dropped because they overlapped an earlier one
    pub merges_dropped: usize,
    pub conditional_rules: usize,
    /// Formatting features approximated or ignored
    pub unsupported_features: Vec<String>,
}

impl LoadSummary {
    /// One-line description for logs
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{} sheet{}", self.sheets_loaded, if self.sheets_loaded == 1 { "" } else { "s" }),
            format!("{} cells", self.cells_loaded),
        ];
        if self.formulas_loaded > 0 {
            parts.push(format!("{} formulas", self.formulas_loaded));
        }
        if self.styled_cells > 0 {
            parts.push(format!("{} styled cells", self.styled_cells));
        }
        if self.merges_loaded > 0 {
            if self.merges_dropped > 0 {
                parts.push(format!("{} merged regions ({} dropped)", self.merges_loaded, self.merges_dropped));
            } else {
                parts.push(format!("{} merged regions", self.merges_loaded));
            }
        }
        if self.conditional_rules > 0 {
            parts.push(format!("{} conditional rules", self.conditional_rules));
        }
        parts.join(" · ")
    }
}

/// Load a template workbook: values, formulas, styles and layout.
pub fn load_template(path: &Path) -> Result<(Workbook, LoadSummary), String> {
    let mut calamine_wb: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open template '{}': {}", path.display(), e))?;

    let sheet_names: Vec<String> = calamine_wb.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(format!("Template '{}' contains no sheets", path.display()));
    }

    let mut summary = LoadSummary::default();
    let mut workbook = Workbook::new();

    for sheet_name in &sheet_names {
        let mut sheet = Worksheet::new(sheet_name.as_str());

        let range = calamine_wb
            .worksheet_range(sheet_name)
            .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;
        let (start_row, start_col) = range.start().unwrap_or((0, 0));

        for (row_idx, row) in range.rows().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                let Some(addr) = to_address(start_row as usize + row_idx, start_col as usize + col_idx) else {
                    continue;
                };
                if let Some(value) = data_to_value(cell) {
                    sheet.set_value(addr, value);
                    summary.cells_loaded += 1;
                }
            }
        }

        // Formulas override the cached values read above
        if let Ok(formula_range) = calamine_wb.worksheet_formula(sheet_name) {
            let (f_row, f_col) = formula_range.start().unwrap_or((0, 0));
            for (row_idx, row) in formula_range.rows().enumerate() {
                for (col_idx, formula) in row.iter().enumerate() {
                    if formula.is_empty() {
                        continue;
                    }
                    let Some(addr) = to_address(f_row as usize + row_idx, f_col as usize + col_idx) else {
                        continue;
                    };
                    sheet.set_value(addr, CellValue::formula(formula.as_str()));
                    summary.formulas_loaded += 1;
                }
            }
        }

        workbook
            .add_sheet(sheet)
            .map_err(|e| format!("Template '{}': {}", path.display(), e))?;
        summary.sheets_loaded += 1;
    }

    // Formatting lives in the package XML; xls files have none to offer.
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xlsm"));
    if is_xlsx {
        match xlsx_styles::parse_xlsx_layout(path, &sheet_names) {
            Ok((styles, layouts, unsupported)) => {
                for (idx, layout) in layouts.iter().enumerate() {
                    if let Some(sheet) = workbook.sheet_mut(idx) {
                        apply_sheet_layout(sheet, layout, &styles, &mut summary);
                    }
                }
                summary.unsupported_features = unsupported;
            }
            Err(e) => log::warn!("{}: formatting not loaded: {}", path.display(), e),
        }
    }

    log::debug!("loaded template {}: {}", path.display(), summary.summary());
    Ok((workbook, summary))
}

fn to_address(row0: usize, col0: usize) -> Option<CellAddress> {
    let row = u32::try_from(row0 + 1).ok()?;
    let col = u16::try_from(col0 + 1).ok()?;
    Some(CellAddress::new(row, col))
}

fn data_to_value(cell: &Data) -> Option<CellValue> {
    let value = match cell {
        Data::Empty => return None,
        Data::String(s) if s.is_empty() => return None,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Float(n) => CellValue::from(*n),
        Data::Int(n) => CellValue::from(*n as f64),
        Data::Bool(b) => CellValue::from(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => CellValue::from(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match from_excel_serial(serial) {
                Some(date) => CellValue::from(date),
                None => CellValue::from(serial),
            }
        }
        Data::DateTimeIso(s) => match parse_date_str(s) {
            Some(date) => CellValue::from(date),
            None => CellValue::from(s.as_str()),
        },
        Data::DurationIso(s) => CellValue::from(s.as_str()),
    };
    Some(value)
}

fn apply_sheet_layout(
    sheet: &mut Worksheet,
    layout: &xlsx_styles::SheetLayout,
    styles: &xlsx_styles::StyleTable,
    summary: &mut LoadSummary,
) {
    for (addr, style_id) in &layout.cell_styles {
        if let Some(style) = styles.get(*style_id) {
            if !style.is_default() {
                *sheet.style_mut(*addr) = style.clone();
                summary.styled_cells += 1;
            }
        }
    }

    if let Some(height) = layout.default_row_height {
        sheet.set_default_row_height(height);
    }
    for (row, height) in &layout.row_heights {
        sheet.set_row_height(*row, Some(*height));
    }
    for row in &layout.hidden_rows {
        sheet.set_row_hidden(*row, true);
    }
    for (col, width) in &layout.col_widths {
        sheet.set_col_width(*col, character_width(*width));
    }
    for col in &layout.hidden_cols {
        sheet.set_col_hidden(*col, true);
    }

    for region in &layout.merged_regions {
        match sheet.add_merge(*region) {
            Ok(()) => summary.merges_loaded += 1,
            Err(e) => {
                log::warn!("sheet '{}': dropping merge {}: {}", sheet.name(), region, e);
                summary.merges_dropped += 1;
            }
        }
    }

    for rule in layout.resolved_rules(styles) {
        sheet.add_conditional_rule(rule);
        summary.conditional_rules += 1;
    }
}

/// Convert a stored `<col width>` (padding included, Calibri 11 metrics)
/// back to the character width `set_column_width` expects.
fn character_width(raw: f64) -> f64 {
    let pixels = (raw * 7.0).round();
    if pixels < 12.0 {
        pixels / 12.0
    } else {
        (pixels - 5.0) / 7.0
    }
}

// ============================================================================
// Write
// ============================================================================

/// Counters from writing a workbook
#[derive(Debug, Clone, Default)]
pub struct WriteSummary {
    pub sheets_written: usize,
    pub cells_written: usize,
    pub formulas_written: usize,
    pub merges_written: usize,
    pub conditional_formats_written: usize,
}

/// Write the workbook to `path` as xlsx.
pub fn write_workbook(workbook: &Workbook, path: &Path) -> Result<WriteSummary, String> {
    let mut summary = WriteSummary::default();
    let mut xlsx_workbook = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(sheet.name())
            .map_err(|e| format!("Failed to create sheet '{}': {}", sheet.name(), e))?;

        apply_layout(worksheet, sheet)?;

        // merge_range() writes blanks over the whole region; the anchor value
        // is written afterwards by write_cells().
        for merge in sheet.merges() {
            if merge.min_row == merge.max_row && merge.min_col == merge.max_col {
                continue;
            }
            let anchor_format = sheet
                .style(merge.anchor())
                .map(build_excel_format)
                .unwrap_or_else(Format::new);
            worksheet
                .merge_range(
                    merge.min_row - 1,
                    merge.min_col - 1,
                    merge.max_row - 1,
                    merge.max_col - 1,
                    "",
                    &anchor_format,
                )
                .map_err(|e| format!("Failed to write merge {} on '{}': {}", merge, sheet.name(), e))?;
            summary.merges_written += 1;
        }

        write_cells(worksheet, sheet, &mut summary)?;

        for rule in sheet.conditional_rules() {
            write_conditional_rule(worksheet, rule)
                .map_err(|e| format!("Failed to write conditional format on '{}': {}", sheet.name(), e))?;
            summary.conditional_formats_written += 1;
        }

        summary.sheets_written += 1;
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file '{}': {}", path.display(), e))?;

    log::debug!(
        "wrote {}: {} sheets, {} cells, {} formulas",
        path.display(),
        summary.sheets_written,
        summary.cells_written,
        summary.formulas_written
    );
    Ok(summary)
}

fn write_cells(worksheet: &mut XlsxWorksheet, sheet: &Worksheet, summary: &mut WriteSummary) -> Result<(), String> {
    for (addr, cell) in sheet.cells() {
        let (row, col) = (addr.row - 1, addr.col - 1);
        let mut format = build_excel_format(&cell.style);
        let err = |e: rust_xlsxwriter::XlsxError| format!("Failed to write {}!{}: {}", sheet.name(), addr, e);

        match &cell.value {
            CellValue::Empty => {
                if !cell.style.is_default() {
                    worksheet.write_blank(row, col, &format).map_err(err)?;
                }
                continue;
            }
            CellValue::Literal(Scalar::Text(s)) => {
                worksheet.write_string_with_format(row, col, s, &format).map_err(err)?;
            }
            CellValue::Literal(Scalar::Number(n)) => {
                worksheet.write_number_with_format(row, col, *n, &format).map_err(err)?;
            }
            CellValue::Literal(Scalar::Date(d)) => {
                if !cell.style.has_number_format() {
                    format = format.set_num_format(DEFAULT_DATE_FORMAT);
                }
                let year = u16::try_from(d.year()).map_err(|_| format!("{}!{}: date {} out of range", sheet.name(), addr, d))?;
                let date = ExcelDateTime::from_ymd(year, d.month() as u8, d.day() as u8).map_err(err)?;
                worksheet.write_datetime_with_format(row, col, date, &format).map_err(err)?;
            }
            CellValue::Formula(f) => {
                let body = f.strip_prefix('=').unwrap_or(f);
                worksheet.write_formula_with_format(row, col, body, &format).map_err(err)?;
                summary.formulas_written += 1;
            }
        }
        summary.cells_written += 1;
    }
    Ok(())
}

fn apply_layout(worksheet: &mut XlsxWorksheet, sheet: &Worksheet) -> Result<(), String> {
    if (sheet.default_row_height() - DEFAULT_ROW_HEIGHT).abs() > f64::EPSILON {
        worksheet.set_default_row_height(sheet.default_row_height());
    }

    for (col, width) in sheet.col_widths() {
        worksheet
            .set_column_width(col - 1, *width)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }
    for col in sheet.hidden_cols() {
        worksheet
            .set_column_hidden(col - 1)
            .map_err(|e| format!("Failed to hide column {}: {}", col, e))?;
    }

    for (row, height) in sheet.row_heights() {
        worksheet
            .set_row_height(row - 1, *height)
            .map_err(|e| format!("Failed to set row {} height: {}", row, e))?;
    }
    for row in sheet.hidden_rows() {
        worksheet
            .set_row_hidden(row - 1)
            .map_err(|e| format!("Failed to hide row {}: {}", row, e))?;
    }

    Ok(())
}

fn write_conditional_rule(worksheet: &mut XlsxWorksheet, rule: &ConditionalRule) -> Result<(), rust_xlsxwriter::XlsxError> {
    let mut format = Format::new();
    if let Some(color) = rule.fill.background {
        format = format.set_background_color(to_color(color));
    }
    let r = &rule.range;
    let (r1, c1, r2, c2) = (r.min_row - 1, r.min_col - 1, r.max_row - 1, r.max_col - 1);

    match &rule.predicate {
        Predicate::Expression(expr) => {
            let expr = if expr.starts_with('=') { expr.clone() } else { format!("={expr}") };
            let cf = ConditionalFormatFormula::new()
                .set_rule(expr.as_str())
                .set_format(format)
                .set_stop_if_true(rule.stop_if_true);
            worksheet.add_conditional_format(r1, c1, r2, c2, &cf)?;
        }
        predicate => {
            // IsEmpty and Equals always carry an operand
            let operand = predicate.operand().unwrap_or_default();
            let cf = ConditionalFormatCell::new()
                .set_rule(ConditionalFormatCellRule::EqualTo(operand.as_str()))
                .set_format(format)
                .set_stop_if_true(rule.stop_if_true);
            worksheet.add_conditional_format(r1, c1, r2, c2, &cf)?;
        }
    }
    Ok(())
}

fn to_color([r, g, b, _]: Rgba) -> Color {
    Color::RGB(((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
}

fn build_excel_format(style: &Style) -> Format {
    let mut format = Format::new();

    // Font styling
    let font = &style.font;
    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if font.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if font.strikethrough {
        format = format.set_font_strikethrough();
    }
    if let Some(size) = font.size {
        format = format.set_font_size(size);
    }
    if let Some(color) = font.color {
        format = format.set_font_color(to_color(color));
    }
    if let Some(ref family) = font.family {
        format = format.set_font_name(family);
    }

    // Horizontal alignment
    format = match style.alignment.horizontal {
        HorizontalAlignment::General => format, // Excel default: numbers right, text left
        HorizontalAlignment::Left => format.set_align(FormatAlign::Left),
        HorizontalAlignment::Center => format.set_align(FormatAlign::Center),
        HorizontalAlignment::Right => format.set_align(FormatAlign::Right),
        HorizontalAlignment::Justify => format.set_align(FormatAlign::Justify),
    };

    // Vertical alignment
    format = match style.alignment.vertical {
        VerticalAlignment::Top => format.set_align(FormatAlign::Top),
        VerticalAlignment::Center => format.set_align(FormatAlign::VerticalCenter),
        VerticalAlignment::Bottom => format,
    };

    if style.alignment.wrap_text {
        format = format.set_text_wrap();
    }

    if let Some(color) = style.fill.background {
        format = format.set_background_color(to_color(color));
    }

    // Cell borders
    let border = &style.border;
    if border.top.is_set() {
        format = format.set_border_top(border_style_to_xlsx(border.top.style));
        if let Some(c) = border.top.color {
            format = format.set_border_top_color(to_color(c));
        }
    }
    if border.right.is_set() {
        format = format.set_border_right(border_style_to_xlsx(border.right.style));
        if let Some(c) = border.right.color {
            format = format.set_border_right_color(to_color(c));
        }
    }
    if border.bottom.is_set() {
        format = format.set_border_bottom(border_style_to_xlsx(border.bottom.style));
        if let Some(c) = border.bottom.color {
            format = format.set_border_bottom_color(to_color(c));
        }
    }
    if border.left.is_set() {
        format = format.set_border_left(border_style_to_xlsx(border.left.style));
        if let Some(c) = border.left.color {
            format = format.set_border_left_color(to_color(c));
        }
    }

    if style.has_number_format() {
        format = format.set_num_format(&style.number_format);
    }

    if !style.protection.locked {
        format = format.set_unlocked();
    }
    if style.protection.hidden {
        format = format.set_hidden();
    }

    format
}

/// Convert engine BorderStyle to rust_xlsxwriter FormatBorder
fn border_style_to_xlsx(style: BorderStyle) -> FormatBorder {
    match style {
        BorderStyle::None => FormatBorder::None,
        BorderStyle::Thin => FormatBorder::Thin,
        BorderStyle::Medium => FormatBorder::Medium,
        BorderStyle::Thick => FormatBorder::Thick,
    }
}
