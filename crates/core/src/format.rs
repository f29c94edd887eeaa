//! Caret formatting values shared by the editor surface and the toolbar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Family the "fixed width" toggle switches to.
pub const MONOSPACE_FAMILY: &str = "Monospace";
pub const DEFAULT_FAMILY: &str = "Sans";
pub const DEFAULT_FONT_SIZE: u32 = 10;
/// Smallest size reachable through the decrement command.
pub const MIN_FONT_SIZE: u32 = 4;
pub const FONT_SIZE_STEP: u32 = 2;

/// 24-bit color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color '{0}', expected #rrggbb")]
pub struct ColorParseError(String);

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let hex = value
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError(value.to_string()))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ColorParseError(value.to_string()));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ColorParseError(value.to_string()))
        };
        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    Left,
    Center,
    Right,
    Fill,
}

/// Boolean character modifiers that toggle independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Bold,
    Italic,
    Underline,
    NoWrap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorTarget {
    Foreground,
    Background,
}

/// Formatting active at the caret at one point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSnapshot {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub nowrap: bool,
    pub bullet_list: bool,
    pub justify: Justify,
    pub family: String,
    pub size: u32,
    pub fg_color: Option<Rgb>,
    pub bg_color: Option<Rgb>,
}

impl Default for FormatSnapshot {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            underline: false,
            nowrap: false,
            bullet_list: false,
            justify: Justify::Left,
            family: DEFAULT_FAMILY.to_string(),
            size: DEFAULT_FONT_SIZE,
            fg_color: None,
            bg_color: None,
        }
    }
}

impl FormatSnapshot {
    pub fn modifier(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Bold => self.bold,
            Modifier::Italic => self.italic,
            Modifier::Underline => self.underline,
            Modifier::NoWrap => self.nowrap,
        }
    }

    pub fn set_modifier(&mut self, modifier: Modifier, value: bool) {
        match modifier {
            Modifier::Bold => self.bold = value,
            Modifier::Italic => self.italic = value,
            Modifier::Underline => self.underline = value,
            Modifier::NoWrap => self.nowrap = value,
        }
    }

    pub fn is_monospace(&self) -> bool {
        self.family == MONOSPACE_FAMILY
    }

    pub fn color(&self, target: ColorTarget) -> Option<Rgb> {
        match target {
            ColorTarget::Foreground => self.fg_color,
            ColorTarget::Background => self.bg_color,
        }
    }
}

pub fn increased_font_size(size: u32) -> u32 {
    size.saturating_add(FONT_SIZE_STEP)
}

/// Steps down by two while above the minimum; never goes below it.
pub fn decreased_font_size(size: u32) -> u32 {
    if size > MIN_FONT_SIZE {
        size.saturating_sub(FONT_SIZE_STEP).max(MIN_FONT_SIZE)
    } else {
        size
    }
}
