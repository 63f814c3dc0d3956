//! XLSX style and layout parser: resolves styles.xml into engine styles and
//! reads the per-sheet layout calamine does not expose (cell style IDs, row
//! heights, hidden rows and columns, merges, conditional formatting).

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use auditpaper_engine::address::{CellAddress, CellRange};
use auditpaper_engine::cell::Scalar;
use auditpaper_engine::cond_format::{ConditionalRule, Predicate};
use auditpaper_engine::sheet::MergedRegion;
use auditpaper_engine::style::{
    BorderStyle, CellBorder, Fill, Font, HorizontalAlignment, Rgba, Style, VerticalAlignment,
};
use zip::ZipArchive;

// =============================================================================
// Public types
// =============================================================================

/// Parsed style table from styles.xml: cellXfs index → Style, plus the
/// differential formats referenced by conditional rules.
#[derive(Debug, Default)]
pub struct StyleTable {
    pub styles: Vec<Style>,
    pub dxf_fills: Vec<Fill>,
}

impl StyleTable {
    pub fn get(&self, id: usize) -> Option<&Style> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

/// A conditional rule as stored in the sheet, before its dxf is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConditionalRule {
    pub range: CellRange,
    pub predicate: Predicate,
    pub dxf_id: Option<usize>,
    pub stop_if_true: bool,
}

/// Layout extracted from one worksheet XML. Rows and columns are 1-based.
#[derive(Debug, Default)]
pub struct SheetLayout {
    /// (address, style_id) pairs
    pub cell_styles: Vec<(CellAddress, usize)>,
    /// Column widths in raw Excel character-width units
    pub col_widths: HashMap<u16, f64>,
    pub hidden_cols: Vec<u16>,
    /// Row heights in points, only for rows with `customHeight`
    pub row_heights: HashMap<u32, f64>,
    pub hidden_rows: Vec<u32>,
    pub default_row_height: Option<f64>,
    pub merged_regions: Vec<MergedRegion>,
    pub conditional_rules: Vec<RawConditionalRule>,
}

impl SheetLayout {
    /// Resolve dxf references into fills; rules without a fill are dropped.
    pub fn resolved_rules(&self, styles: &StyleTable) -> Vec<ConditionalRule> {
        self.conditional_rules
            .iter()
            .filter_map(|raw| {
                let fill = raw.dxf_id.and_then(|id| styles.dxf_fills.get(id)).copied()?;
                Some(ConditionalRule {
                    range: raw.range,
                    predicate: raw.predicate.clone(),
                    fill,
                    stop_if_true: raw.stop_if_true,
                })
            })
            .collect()
    }
}

// =============================================================================
// XML entity unescaping
// =============================================================================

/// Unescape the 5 predefined XML entities: &amp; &lt; &gt; &quot; &apos;
fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Append an entity reference (`&quot;`, `&#34;`) read between text events.
fn push_entity(reference: &BytesRef<'_>, out: &mut String) {
    if let Ok(Some(ch)) = reference.resolve_char_ref() {
        out.push(ch);
        return;
    }
    let Ok(name) = reference.decode() else { return };
    match resolve_predefined_entity(&name) {
        Some(text) => out.push_str(text),
        None => {
            log::debug!("unknown entity '&{name};' in conditional formula");
            out.push('&');
            out.push_str(&name);
            out.push(';');
        }
    }
}

// =============================================================================
// Built-in number format codes
// =============================================================================

fn builtin_number_format(id: u16) -> &'static str {
    match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        14 => "yyyy-mm-dd",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "yyyy-mm-dd h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        49 => "@",
        _ => "",
    }
}

// =============================================================================
// Indexed color palette (standard 64 Excel colors)
// =============================================================================

fn indexed_color(idx: u8) -> Option<Rgba> {
    let rgb: [u8; 3] = match idx {
        0 | 8 => [0, 0, 0],
        1 | 9 => [255, 255, 255],
        2 | 10 => [255, 0, 0],
        3 | 11 => [0, 255, 0],
        4 | 12 => [0, 0, 255],
        5 | 13 => [255, 255, 0],
        6 | 14 => [255, 0, 255],
        7 | 15 => [0, 255, 255],
        16 => [128, 0, 0],
        17 => [0, 128, 0],
        18 => [0, 0, 128],
        19 => [128, 128, 0],
        20 => [128, 0, 128],
        21 => [0, 128, 128],
        22 => [192, 192, 192],
        23 => [128, 128, 128],
        24 => [153, 153, 255],
        25 => [153, 51, 102],
        26 => [255, 255, 204],
        27 => [204, 255, 255],
        28 => [102, 0, 102],
        29 => [255, 128, 128],
        30 => [0, 102, 204],
        31 => [204, 204, 255],
        32 => [0, 0, 128],
        33 => [255, 0, 255],
        34 => [255, 255, 0],
        35 => [0, 255, 255],
        36 => [128, 0, 128],
        37 => [128, 0, 0],
        38 => [0, 128, 128],
        39 => [0, 0, 255],
        40 => [0, 204, 255],
        41 => [204, 255, 255],
        42 => [204, 255, 204],
        43 => [255, 255, 153],
        44 => [153, 204, 255],
        45 => [255, 153, 204],
        46 => [204, 153, 255],
        47 => [255, 204, 153],
        48 => [51, 102, 255],
        49 => [51, 204, 204],
        50 => [153, 204, 0],
        51 => [255, 204, 0],
        52 => [255, 153, 0],
        53 => [255, 102, 0],
        54 => [102, 102, 153],
        55 => [150, 150, 150],
        56 => [0, 51, 102],
        57 => [51, 153, 102],
        58 => [0, 51, 0],
        59 => [51, 51, 0],
        60 => [153, 51, 0],
        61 => [153, 51, 51],
        62 => [51, 51, 153],
        63 => [51, 51, 51],
        64 => [0, 0, 0],
        65 => [255, 255, 255],
        _ => return None,
    };
    Some([rgb[0], rgb[1], rgb[2], 255])
}

/// Flat theme color defaults (no tint math).
fn theme_color_default(idx: u8) -> Option<Rgba> {
    let rgb: [u8; 3] = match idx {
        0 => [255, 255, 255],
        1 => [0, 0, 0],
        2 => [238, 236, 225],
        3 => [31, 73, 125],
        4 => [79, 129, 189],
        5 => [192, 80, 77],
        6 => [155, 187, 89],
        7 => [128, 100, 162],
        8 => [75, 172, 198],
        9 => [247, 150, 70],
        _ => return None,
    };
    Some([rgb[0], rgb[1], rgb[2], 255])
}

// =============================================================================
// Color parsing
// =============================================================================

/// Parse a color from XML attributes (rgb, indexed, or theme).
fn parse_color_attrs(attrs: &[(Vec<u8>, Vec<u8>)], unsupported: &mut Vec<String>) -> Option<Rgba> {
    let mut rgb_val: Option<&[u8]> = None;
    let mut indexed_val: Option<u8> = None;
    let mut theme_val: Option<u8> = None;

    for (key, value) in attrs {
        match key.as_slice() {
            b"rgb" => rgb_val = Some(value),
            b"indexed" => indexed_val = parse_attr_num(value),
            b"theme" => theme_val = parse_attr_num(value),
            _ => {}
        }
    }

    // Prefer rgb > indexed > theme
    if let Some(hex) = rgb_val {
        return parse_argb_hex(hex);
    }
    if let Some(idx) = indexed_val {
        return indexed_color(idx);
    }
    if let Some(idx) = theme_val {
        let color = theme_color_default(idx);
        if color.is_some() && !unsupported.iter().any(|s| s.starts_with("theme tints")) {
            unsupported.push("theme tints approximated".to_string());
        }
        return color;
    }
    None
}

/// Parse AARRGGBB or RRGGBB hex to RGBA.
fn parse_argb_hex(hex: &[u8]) -> Option<Rgba> {
    let s = std::str::from_utf8(hex).ok()?;
    let s = s.trim_start_matches('#');
    let byte = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();

    match s.len() {
        8 => Some([byte(2)?, byte(4)?, byte(6)?, byte(0)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 255]),
        _ => None,
    }
}

fn parse_attr_num<T: std::str::FromStr>(value: &[u8]) -> Option<T> {
    std::str::from_utf8(value).ok().and_then(|s| s.trim().parse().ok())
}

fn attr_flag(value: &[u8]) -> bool {
    value == b"1" || value == b"true"
}

// =============================================================================
// Internal parsed components
// =============================================================================

#[derive(Debug, Clone, Default)]
struct ParsedBorder {
    top: CellBorder,
    right: CellBorder,
    bottom: CellBorder,
    left: CellBorder,
}

// =============================================================================
// styles.xml parser
// =============================================================================

/// Parse styles.xml content into a StyleTable. The second value lists
/// features that were approximated or ignored.
pub fn parse_styles_xml(xml: &str) -> (StyleTable, Vec<String>) {
    let mut unsupported: Vec<String> = Vec::new();

    let custom_num_fmts = parse_num_fmts(xml);
    let fonts = parse_fonts(xml, &mut unsupported);
    let fills = parse_fills(xml, b"fills", &mut unsupported);
    let borders = parse_borders(xml, &mut unsupported);
    let styles = parse_cell_xfs(xml, &custom_num_fmts, &fonts, &fills, &borders);
    let dxf_fills = parse_dxf_fills(xml, &mut unsupported);

    (StyleTable { styles, dxf_fills }, unsupported)
}

/// Parse <numFmts> section → formatId → formatCode
fn parse_num_fmts(xml: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_num_fmts = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"numFmts" => in_num_fmts = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"numFmts" => break,
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if in_num_fmts && e.name().as_ref() == b"numFmt" =>
            {
                let mut id: Option<u16> = None;
                let mut code: Option<String> = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"numFmtId" => id = parse_attr_num(&attr.value),
                        b"formatCode" => {
                            // &quot; inside codes such as "R"#,##0.00
                            code = Some(unescape_xml(&String::from_utf8_lossy(&attr.value)));
                        }
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    map.insert(id, code);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    map
}

/// Parse <fonts> into engine fonts.
fn parse_fonts(xml: &str, unsupported: &mut Vec<String>) -> Vec<Font> {
    let mut fonts = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fonts>, 2 = inside <font>
    let mut current = Font::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fonts" if depth == 0 => depth = 1,
                b"font" if depth == 1 => {
                    depth = 2;
                    current = Font::default();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match e.name().as_ref() {
                b"b" => current.bold = !has_false_val(e),
                b"i" => current.italic = !has_false_val(e),
                b"u" => current.underline = true,
                b"strike" => current.strikethrough = !has_false_val(e),
                b"sz" => current.size = attr_value(e, b"val").and_then(|v| v.parse().ok()),
                b"color" => current.color = parse_color_attrs(&collect_attrs(e), unsupported),
                b"name" | b"rFont" => current.family = attr_value(e, b"val"),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 1 && e.name().as_ref() == b"font" => {
                fonts.push(Font::default());
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"font" if depth == 2 => {
                    fonts.push(std::mem::take(&mut current));
                    depth = 1;
                }
                b"fonts" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fonts
}

/// `<b val="0"/>` switches a flag off.
fn has_false_val(e: &BytesStart) -> bool {
    matches!(attr_value(e, b"val").as_deref(), Some("0") | Some("false"))
}

/// Parse a fill list (`<fills>` or the fill of each `<dxf>`).
fn parse_fills(xml: &str, section: &[u8], unsupported: &mut Vec<String>) -> Vec<Fill> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside section, 2 = inside <fill>
    let mut solid = false;
    let mut fg: Option<Rgba> = None;
    let mut bg: Option<Rgba> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                name if name == section && depth == 0 => depth = 1,
                b"fill" if depth == 1 => {
                    depth = 2;
                    solid = false;
                    fg = None;
                    bg = None;
                }
                b"patternFill" if depth == 2 => {
                    solid = attr_value(e, b"patternType").as_deref() == Some("solid");
                }
                b"gradientFill" if depth == 2 => {
                    if !unsupported.iter().any(|s| s.starts_with("gradient fills")) {
                        unsupported.push("gradient fills".to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match e.name().as_ref() {
                b"fgColor" => fg = parse_color_attrs(&collect_attrs(e), unsupported),
                b"bgColor" => bg = parse_color_attrs(&collect_attrs(e), unsupported),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"fill" if depth == 2 => {
                    // Solid cell fills paint with fgColor; pattern-less dxf fills use bgColor.
                    let background = if solid { fg.or(bg) } else { bg.or(fg) };
                    fills.push(Fill { background });
                    depth = 1;
                }
                name if name == section && depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    fills
}

/// One fill per `<dxf>` in `<dxfs>`; a dxf without a fill yields an empty one.
fn parse_dxf_fills(xml: &str, unsupported: &mut Vec<String>) -> Vec<Fill> {
    let Some(start) = xml.find("<dxfs") else {
        return Vec::new();
    };
    let end = xml[start..].find("</dxfs>").map(|i| start + i + 7).unwrap_or(xml.len());
    let section = &xml[start..end];

    let mut out = Vec::new();
    let mut rest = section;
    while let Some(open) = rest.find("<dxf>").or_else(|| rest.find("<dxf ")) {
        let after = &rest[open..];
        let close = after.find("</dxf>").map(|i| i + 6);
        let (body, next) = match close {
            Some(c) => (&after[..c], &after[c..]),
            None => (after, ""),
        };
        let wrapped = format!("<fills>{}</fills>", extract_fill(body));
        let fill = parse_fills(&wrapped, b"fills", unsupported).into_iter().next().unwrap_or_default();
        out.push(fill);
        rest = next;
    }
    out
}

fn extract_fill(dxf: &str) -> &str {
    match (dxf.find("<fill>"), dxf.find("</fill>")) {
        (Some(s), Some(e)) if e > s => &dxf[s..e + 7],
        _ => "",
    }
}

/// Parse <borders> section.
fn parse_borders(xml: &str, unsupported: &mut Vec<String>) -> Vec<ParsedBorder> {
    let mut borders = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <borders>, 2 = inside <border>
    let mut current_side: Option<&'static str> = None;
    let mut current = ParsedBorder::default();
    let mut side = CellBorder::default();

    let assign = |border: &mut ParsedBorder, name: &str, value: CellBorder| match name {
        "left" => border.left = value,
        "right" => border.right = value,
        "top" => border.top = value,
        "bottom" => border.bottom = value,
        _ => {}
    };

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"borders" if depth == 0 => depth = 1,
                b"border" if depth == 1 => {
                    depth = 2;
                    current = ParsedBorder::default();
                }
                name @ (b"left" | b"right" | b"top" | b"bottom") if depth == 2 => {
                    current_side = side_name(name);
                    side = CellBorder {
                        style: attr_value(e, b"style")
                            .map(|s| parse_border_style(&s))
                            .unwrap_or_default(),
                        color: None,
                    };
                }
                b"color" if current_side.is_some() => {
                    side.color = parse_color_attrs(&collect_attrs(e), unsupported);
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                name @ (b"left" | b"right" | b"top" | b"bottom") if depth == 2 => {
                    let style = attr_value(e, b"style")
                        .map(|s| parse_border_style(&s))
                        .unwrap_or_default();
                    if let Some(n) = side_name(name) {
                        assign(&mut current, n, CellBorder { style, color: None });
                    }
                }
                b"color" if current_side.is_some() => {
                    side.color = parse_color_attrs(&collect_attrs(e), unsupported);
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"left" | b"right" | b"top" | b"bottom" if depth == 2 => {
                    if let Some(n) = current_side.take() {
                        assign(&mut current, n, side);
                    }
                    side = CellBorder::default();
                }
                b"border" if depth == 2 => {
                    borders.push(std::mem::take(&mut current));
                    depth = 1;
                }
                b"borders" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    borders
}

fn side_name(name: &[u8]) -> Option<&'static str> {
    match name {
        b"left" => Some("left"),
        b"right" => Some("right"),
        b"top" => Some("top"),
        b"bottom" => Some("bottom"),
        _ => None,
    }
}

fn parse_border_style(s: &str) -> BorderStyle {
    match s {
        "thin" | "hair" | "dotted" | "dashed" => BorderStyle::Thin,
        "medium" | "mediumDashed" | "mediumDashDot" | "mediumDashDotDot" => BorderStyle::Medium,
        "thick" | "double" => BorderStyle::Thick,
        _ => BorderStyle::None,
    }
}

#[derive(Debug, Default)]
struct XfEntry {
    num_fmt_id: Option<u16>,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    border_id: Option<usize>,
    h_align: Option<String>,
    v_align: Option<String>,
    wrap_text: bool,
    locked: Option<bool>,
    hidden: bool,
}

impl XfEntry {
    fn from_attrs(e: &BytesStart) -> Self {
        let mut xf = XfEntry::default();
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"numFmtId" => xf.num_fmt_id = parse_attr_num(&attr.value),
                b"fontId" => xf.font_id = parse_attr_num(&attr.value),
                b"fillId" => xf.fill_id = parse_attr_num(&attr.value),
                b"borderId" => xf.border_id = parse_attr_num(&attr.value),
                _ => {}
            }
        }
        xf
    }

    fn read_alignment(&mut self, e: &BytesStart) {
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"horizontal" => self.h_align = Some(String::from_utf8_lossy(&attr.value).to_string()),
                b"vertical" => self.v_align = Some(String::from_utf8_lossy(&attr.value).to_string()),
                b"wrapText" => self.wrap_text = attr_flag(&attr.value),
                _ => {}
            }
        }
    }

    fn read_protection(&mut self, e: &BytesStart) {
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"locked" => self.locked = Some(attr_flag(&attr.value)),
                b"hidden" => self.hidden = attr_flag(&attr.value),
                _ => {}
            }
        }
    }
}

/// Parse <cellXfs> and resolve each <xf> into a Style.
fn parse_cell_xfs(
    xml: &str,
    custom_num_fmts: &HashMap<u16, String>,
    fonts: &[Font],
    fills: &[Fill],
    borders: &[ParsedBorder],
) -> Vec<Style> {
    let mut styles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    let mut current: Option<XfEntry> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => current = Some(XfEntry::from_attrs(e)),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"xf" if in_cell_xfs => {
                    let xf = XfEntry::from_attrs(e);
                    styles.push(resolve_xf(&xf, custom_num_fmts, fonts, fills, borders));
                }
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        xf.read_alignment(e);
                    }
                }
                b"protection" => {
                    if let Some(xf) = current.as_mut() {
                        xf.read_protection(e);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"xf" => {
                    if let Some(xf) = current.take() {
                        styles.push(resolve_xf(&xf, custom_num_fmts, fonts, fills, borders));
                    }
                }
                b"cellXfs" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    styles
}

/// Resolve an XfEntry into a Style using the parsed component tables.
fn resolve_xf(
    xf: &XfEntry,
    custom_num_fmts: &HashMap<u16, String>,
    fonts: &[Font],
    fills: &[Fill],
    borders: &[ParsedBorder],
) -> Style {
    let mut style = Style::default();

    if let Some(font) = xf.font_id.and_then(|id| fonts.get(id)) {
        style.font = font.clone();
    }
    if let Some(fill) = xf.fill_id.and_then(|id| fills.get(id)) {
        style.fill = *fill;
    }
    if let Some(border) = xf.border_id.and_then(|id| borders.get(id)) {
        style.border.top = border.top;
        style.border.right = border.right;
        style.border.bottom = border.bottom;
        style.border.left = border.left;
    }
    if let Some(id) = xf.num_fmt_id {
        style.number_format = match custom_num_fmts.get(&id) {
            Some(code) => code.clone(),
            None => builtin_number_format(id).to_string(),
        };
    }

    if let Some(ref h) = xf.h_align {
        style.alignment.horizontal = match h.as_str() {
            "left" => HorizontalAlignment::Left,
            "center" | "centerContinuous" => HorizontalAlignment::Center,
            "right" => HorizontalAlignment::Right,
            "justify" | "distributed" => HorizontalAlignment::Justify,
            _ => HorizontalAlignment::General,
        };
    }
    if let Some(ref v) = xf.v_align {
        style.alignment.vertical = match v.as_str() {
            "top" => VerticalAlignment::Top,
            "center" => VerticalAlignment::Center,
            _ => VerticalAlignment::Bottom,
        };
    }
    style.alignment.wrap_text = xf.wrap_text;
    if let Some(locked) = xf.locked {
        style.protection.locked = locked;
    }
    style.protection.hidden = xf.hidden;

    style
}

// =============================================================================
// Worksheet XML parser: per-cell style IDs + layout
// =============================================================================

/// Parse a worksheet XML into its layout.
pub fn parse_sheet_layout(xml: &str) -> SheetLayout {
    let mut layout = SheetLayout::default();

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut cf_ranges: Vec<CellRange> = Vec::new();
    let mut pending_rule: Option<(String, Option<String>, Option<usize>, bool)> = None;
    let mut in_formula = false;
    let mut formula_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"sheetFormatPr" => {
                    layout.default_row_height =
                        attr_value(e, b"defaultRowHeight").and_then(|v| v.parse().ok());
                }
                b"row" => read_row(e, &mut layout),
                b"c" => {
                    let style_id: Option<usize> = attr_value(e, b"s").and_then(|v| v.parse().ok());
                    let addr = attr_value(e, b"r").and_then(|r| CellAddress::parse(&r));
                    if let (Some(style_id), Some(addr)) = (style_id, addr) {
                        // style 0 is the default
                        if style_id > 0 {
                            layout.cell_styles.push((addr, style_id));
                        }
                    }
                }
                b"col" => read_col(e, &mut layout),
                b"mergeCell" => {
                    if let Some(region) = attr_value(e, b"ref").and_then(|r| MergedRegion::parse(&r)) {
                        layout.merged_regions.push(region);
                    }
                }
                b"conditionalFormatting" => {
                    cf_ranges = attr_value(e, b"sqref")
                        .map(|s| s.split_whitespace().filter_map(CellRange::parse).collect())
                        .unwrap_or_default();
                }
                b"cfRule" => {
                    let kind = attr_value(e, b"type").unwrap_or_default();
                    let operator = attr_value(e, b"operator");
                    let dxf_id = attr_value(e, b"dxfId").and_then(|v| v.parse().ok());
                    let stop = attr_value(e, b"stopIfTrue").is_some_and(|v| v == "1" || v == "true");
                    pending_rule = Some((kind, operator, dxf_id, stop));
                    formula_text.clear();
                }
                b"formula" => {
                    in_formula = true;
                }
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_formula => {
                if let Ok(text) = t.decode() {
                    formula_text.push_str(&text);
                }
            }
            Ok(Event::GeneralRef(ref r)) if in_formula => push_entity(r, &mut formula_text),
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"formula" => in_formula = false,
                b"cfRule" => {
                    if let Some((kind, operator, dxf_id, stop)) = pending_rule.take() {
                        match cf_predicate(&kind, operator.as_deref(), &formula_text) {
                            Some(predicate) => {
                                for range in &cf_ranges {
                                    layout.conditional_rules.push(RawConditionalRule {
                                        range: *range,
                                        predicate: predicate.clone(),
                                        dxf_id,
                                        stop_if_true: stop,
                                    });
                                }
                            }
                            None => log::debug!(
                                "skipping unsupported conditional rule type='{kind}' operator={operator:?}"
                            ),
                        }
                    }
                }
                b"conditionalFormatting" => cf_ranges.clear(),
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    layout
}

fn read_row(e: &BytesStart, layout: &mut SheetLayout) {
    let mut row: Option<u32> = None;
    let mut custom_height = false;
    let mut hidden = false;
    let mut ht: Option<f64> = None;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"r" => row = parse_attr_num(&attr.value),
            b"ht" => ht = parse_attr_num(&attr.value),
            b"customHeight" => custom_height = attr_flag(&attr.value),
            b"hidden" => hidden = attr_flag(&attr.value),
            _ => {}
        }
    }

    let Some(row) = row else { return };
    if custom_height {
        if let Some(height) = ht {
            layout.row_heights.insert(row, height);
        }
    }
    if hidden {
        layout.hidden_rows.push(row);
    }
}

fn read_col(e: &BytesStart, layout: &mut SheetLayout) {
    let mut min: Option<u16> = None;
    let mut max: Option<u16> = None;
    let mut width: Option<f64> = None;
    let mut custom_width = false;
    let mut hidden = false;

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"min" => min = parse_attr_num(&attr.value),
            b"max" => max = parse_attr_num(&attr.value),
            b"width" => width = parse_attr_num(&attr.value),
            b"customWidth" => custom_width = attr_flag(&attr.value),
            b"hidden" => hidden = attr_flag(&attr.value),
            _ => {}
        }
    }

    let (Some(min), Some(max)) = (min, max) else { return };
    for col in min..=max.min(auditpaper_engine::address::MAX_COL) {
        if let Some(w) = width.filter(|w| custom_width && *w > 0.0) {
            layout.col_widths.insert(col, w);
        }
        if hidden {
            layout.hidden_cols.push(col);
        }
    }
}

/// Map a `cfRule` onto the predicates the engine understands.
fn cf_predicate(kind: &str, operator: Option<&str>, formula: &str) -> Option<Predicate> {
    let formula = formula.trim();
    match (kind, operator) {
        ("cellIs", Some("equal")) => Some(parse_operand(formula)),
        ("containsBlanks", _) => Some(Predicate::IsEmpty),
        ("expression", _) if !formula.is_empty() => Some(Predicate::Expression(formula.to_string())),
        _ => None,
    }
}

/// Inverse of `Predicate::operand`.
fn parse_operand(operand: &str) -> Predicate {
    if operand.len() >= 2 && operand.starts_with('"') && operand.ends_with('"') {
        let inner = operand[1..operand.len() - 1].replace("\"\"", "\"");
        if inner.is_empty() {
            return Predicate::IsEmpty;
        }
        return Predicate::Equals(Scalar::Text(inner));
    }
    match operand.parse::<f64>() {
        Ok(n) => Predicate::Equals(Scalar::Number(n)),
        Err(_) => Predicate::Expression(operand.to_string()),
    }
}

// =============================================================================
// Top-level entry point
// =============================================================================

/// Parse all formatting data from an XLSX file. `sheet_names` must match
/// the workbook's sheet order; the returned layouts follow it.
pub fn parse_xlsx_layout(
    path: &Path,
    sheet_names: &[String],
) -> Result<(StyleTable, Vec<SheetLayout>, Vec<String>), String> {
    let file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open XLSX file for styles: {}", e))?;
    let mut archive = ZipArchive::new(file)
        .map_err(|e| format!("Failed to read XLSX as ZIP for styles: {}", e))?;

    let (style_table, unsupported) = match read_zip_file(&mut archive, "xl/styles.xml") {
        Ok(xml) => parse_styles_xml(&xml),
        Err(_) => (StyleTable::default(), Vec::new()),
    };

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let worksheet_paths = resolve_worksheet_paths_for_sheets(&workbook_xml, &rels_xml, sheet_names);

    let layouts = worksheet_paths
        .iter()
        .map(|ws_path| match read_zip_file(&mut archive, ws_path) {
            Ok(xml) => parse_sheet_layout(&xml),
            Err(e) => {
                log::warn!("{e}");
                SheetLayout::default()
            }
        })
        .collect();

    Ok((style_table, layouts, unsupported))
}

// =============================================================================
// Helpers
// =============================================================================

fn collect_attrs(e: &BytesStart) -> Vec<(Vec<u8>, Vec<u8>)> {
    e.attributes()
        .flatten()
        .map(|a| (a.key.as_ref().to_vec(), a.value.to_vec()))
        .collect()
}

fn attr_value(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| unescape_xml(&String::from_utf8_lossy(&a.value)))
}

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("File '{}' not found in XLSX: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Resolve worksheet XML paths for sheet names, in order.
fn resolve_worksheet_paths_for_sheets(
    workbook_xml: &str,
    rels_xml: &str,
    sheet_names: &[String],
) -> Vec<String> {
    let mut name_to_rid: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rid)) = (attr_value(e, b"name"), attr_value(e, b"r:id")) {
                    name_to_rid.insert(name, rid);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let mut rid_to_target: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr_value(e, b"Id"), attr_value(e, b"Target")) {
                    rid_to_target.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    sheet_names
        .iter()
        .map(|name| {
            name_to_rid
                .get(name)
                .and_then(|rid| rid_to_target.get(rid))
                .map(|target| match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                })
                .unwrap_or_default()
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
