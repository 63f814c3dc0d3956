//! Cell style bundle.
//!
//! A `Style` is a plain value: cloning it produces an independent copy, so
//! stamping a style onto many cells never aliases formatting between them.
//! Colors are RGBA byte quadruples as read from `styles.xml`.

use serde::{Deserialize, Serialize};

pub type Rgba = [u8; 4];

/// Build an opaque color from a `0xRRGGBB` literal.
pub const fn rgb(hex: u32) -> Rgba {
    [(hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 0xFF]
}

/// Parse `"FFCCCC"` or `"FFFFCCCC"` (ARGB) hex into RGBA.
pub fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let hex = hex.trim().trim_start_matches('#');
    let digits = match hex.len() {
        6 => hex,
        8 => &hex[2..],
        _ => return None,
    };
    let n = u32::from_str_radix(digits, 16).ok()?;
    Some(rgb(n))
}

/// Render RGBA as `RRGGBB`.
pub fn to_hex(color: Rgba) -> String {
    format!("{:02X}{:02X}{:02X}", color[0], color[1], color[2])
}

/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub size: Option<f64>,
    pub color: Option<Rgba>,
    pub family: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fill {
    pub background: Option<Rgba>,
}

impl Fill {
    pub fn solid(color: Rgba) -> Self {
        Self { background: Some(color) }
    }
}

/// Border line weight
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellBorder {
    pub style: BorderStyle,
    pub color: Option<Rgba>,
}

impl CellBorder {
    pub fn is_set(&self) -> bool {
        self.style != BorderStyle::None
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Border {
    pub top: CellBorder,
    pub right: CellBorder,
    pub bottom: CellBorder,
    pub left: CellBorder,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Protection {
    pub locked: bool,
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self { locked: true, hidden: false }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Style {
    pub font: Font,
    pub border: Border,
    pub fill: Fill,
    pub alignment: Alignment,
    /// Excel number format code; empty means General.
    pub number_format: String,
    pub protection: Protection,
}

impl Style {
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }

    pub fn has_number_format(&self) -> bool {
        !self.number_format.is_empty() && self.number_format != "General"
    }
}
