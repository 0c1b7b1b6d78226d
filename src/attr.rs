// (C) 2025 - Enzo Lombardi

//! Cell color and style attributes.
//!
//! [`Color`] models the three depths a terminal can be asked to render
//! (indexed-16, indexed-256, truecolor) plus a `Default` that defers to the
//! terminal's own foreground/background. [`Attr`] pairs a foreground and
//! background `Color` with a bitset of SGR style attributes and packs into a
//! single `u64`, in the packed layout `ScreenCell::attr` stores.

use std::fmt;

/// A terminal color at one of the three depths the core understands, or the
/// terminal's own default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Default,
    Indexed16(u8),  // 0..=15, ANSI + bright
    Indexed256(u8), // 0..=255
    Rgb24(u8, u8, u8),
}

impl Default for Color {
    fn default() -> Self {
        Color::Default
    }
}

impl Color {
    /// Standard ANSI 16-color names, for readable construction.
    pub const BLACK: Color = Color::Indexed16(0);
    pub const RED: Color = Color::Indexed16(1);
    pub const GREEN: Color = Color::Indexed16(2);
    pub const YELLOW: Color = Color::Indexed16(3);
    pub const BLUE: Color = Color::Indexed16(4);
    pub const MAGENTA: Color = Color::Indexed16(5);
    pub const CYAN: Color = Color::Indexed16(6);
    pub const WHITE: Color = Color::Indexed16(7);
    pub const BRIGHT_BLACK: Color = Color::Indexed16(8);
    pub const BRIGHT_RED: Color = Color::Indexed16(9);
    pub const BRIGHT_GREEN: Color = Color::Indexed16(10);
    pub const BRIGHT_YELLOW: Color = Color::Indexed16(11);
    pub const BRIGHT_BLUE: Color = Color::Indexed16(12);
    pub const BRIGHT_MAGENTA: Color = Color::Indexed16(13);
    pub const BRIGHT_CYAN: Color = Color::Indexed16(14);
    pub const BRIGHT_WHITE: Color = Color::Indexed16(15);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb24(r, g, b)
    }

    pub const fn indexed(n: u8) -> Self {
        Color::Indexed256(n)
    }

    /// Downgrade to the given depth, in descending order of fidelity.
    /// Used by [`crate::recovery::ErrorRecovery`] when a backend reports
    /// `CapabilityMissing` for the color depth currently in use.
    pub fn downgrade_to(self, depth: ColorDepth) -> Color {
        match (self, depth) {
            (Color::Default, _) => Color::Default,
            (c, ColorDepth::Rgb24) => c,
            (Color::Rgb24(r, g, b), ColorDepth::Indexed256) => Color::Indexed256(rgb_to_256(r, g, b)),
            (Color::Rgb24(r, g, b), ColorDepth::Indexed16) => Color::Indexed16(rgb_to_16(r, g, b)),
            (Color::Rgb24(r, g, b), ColorDepth::Mono) => {
                Color::Indexed16(if luminance(r, g, b) > 127 { 15 } else { 0 })
            }
            (Color::Indexed256(n), ColorDepth::Indexed256) => Color::Indexed256(n),
            (Color::Indexed256(n), ColorDepth::Indexed16 | ColorDepth::Mono) => {
                Color::Indexed16(index256_to_16(n))
            }
            (Color::Indexed16(n), _) => Color::Indexed16(n),
        }
    }

    /// Write the SGR parameters selecting this color as foreground (or
    /// background) at the given color depth:
    /// `30-37`/`90-97` for 16, `38;5;n`/`48;5;n` for 256, `38;2;r;g;b` for rgb24.
    fn write_sgr(self, out: &mut String, foreground: bool, depth: ColorDepth) {
        let base = if foreground { 30 } else { 40 };
        let bright_base = if foreground { 90 } else { 100 };
        let extended = if foreground { 38 } else { 48 };
        let default_code = if foreground { 39 } else { 49 };

        match self {
            Color::Default => {
                out.push_str(&default_code.to_string());
            }
            Color::Indexed16(n) => {
                let n = n.min(15);
                if n < 8 {
                    out.push_str(&(base + n as u16).to_string());
                } else {
                    out.push_str(&(bright_base + (n - 8) as u16).to_string());
                }
            }
            Color::Indexed256(n) => match depth {
                ColorDepth::Mono | ColorDepth::Indexed16 => {
                    Color::Indexed16(index256_to_16(n)).write_sgr(out, foreground, depth)
                }
                _ => out.push_str(&format!("{extended};5;{n}")),
            },
            Color::Rgb24(r, g, b) => match depth {
                ColorDepth::Rgb24 => out.push_str(&format!("{extended};2;{r};{g};{b}")),
                ColorDepth::Indexed256 => {
                    Color::Indexed256(rgb_to_256(r, g, b)).write_sgr(out, foreground, depth)
                }
                ColorDepth::Indexed16 | ColorDepth::Mono => {
                    self.downgrade_to(depth).write_sgr(out, foreground, depth)
                }
            },
        }
    }
}

fn luminance(r: u8, g: u8, b: u8) -> u16 {
    (r as u16 * 299 + g as u16 * 587 + b as u16 * 114) / 1000
}

/// 6x6x6 color cube + 24-step grayscale ramp, the standard xterm-256 layout.
fn rgb_to_256(r: u8, g: u8, b: u8) -> u8 {
    if r == g && g == b {
        if r < 8 {
            return 16;
        }
        if r > 248 {
            return 231;
        }
        return 232 + (((r as u16 - 8) * 24) / 247) as u8;
    }
    let q = |c: u8| -> u16 { ((c as u16) * 5 + 127) / 255 };
    (16 + 36 * q(r) + 6 * q(g) + q(b)) as u8
}

/// Nearest ANSI-16 color for an RGB triple, by minimizing squared distance.
fn rgb_to_16(r: u8, g: u8, b: u8) -> u8 {
    const PALETTE: [(u8, u8, u8); 16] = [
        (0, 0, 0),
        (170, 0, 0),
        (0, 170, 0),
        (170, 85, 0),
        (0, 0, 170),
        (170, 0, 170),
        (0, 170, 170),
        (170, 170, 170),
        (85, 85, 85),
        (255, 85, 85),
        (85, 255, 85),
        (255, 255, 85),
        (85, 85, 255),
        (255, 85, 255),
        (85, 255, 255),
        (255, 255, 255),
    ];
    let dist = |c: (u8, u8, u8)| -> i32 {
        let dr = r as i32 - c.0 as i32;
        let dg = g as i32 - c.1 as i32;
        let db = b as i32 - c.2 as i32;
        dr * dr + dg * dg + db * db
    };
    PALETTE
        .iter()
        .enumerate()
        .min_by_key(|(_, c)| dist(**c))
        .map(|(i, _)| i as u8)
        .unwrap_or(7)
}

fn index256_to_16(n: u8) -> u8 {
    if n < 16 {
        return n;
    }
    if n >= 232 {
        let level = 8 + ((n - 232) * 247 / 23);
        return rgb_to_16(level, level, level);
    }
    let n = n - 16;
    let r = (n / 36) * 51;
    let g = ((n / 6) % 6) * 51;
    let b = (n % 6) * 51;
    rgb_to_16(r, g, b)
}

/// Color depth a backend (and thus the output reconciliation path) may
/// negotiate down to. Ordered from richest to poorest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColorDepth {
    Mono,
    Indexed16,
    Indexed256,
    Rgb24,
}

/// SGR style bits: `{bold, underline,
/// reverse, italic, strikethrough}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Style(u8);

impl Style {
    pub const BOLD: Style = Style(1 << 0);
    pub const UNDERLINE: Style = Style(1 << 1);
    pub const REVERSE: Style = Style(1 << 2);
    pub const ITALIC: Style = Style(1 << 3);
    pub const STRIKETHROUGH: Style = Style(1 << 4);

    pub const fn empty() -> Self {
        Style(0)
    }

    pub const fn contains(self, other: Style) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn union(self, other: Style) -> Style {
        Style(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn from_bits(bits: u8) -> Self {
        Style(bits & 0b0001_1111)
    }
}

impl std::ops::BitOr for Style {
    type Output = Style;
    fn bitor(self, rhs: Style) -> Style {
        self.union(rhs)
    }
}

/// Foreground + background color plus style bits for one cell.
///
/// Packs into 64 bits: `[fg_kind:2][fg:24][bg_kind:2][bg:24][style:5]`,
/// as `{fg_kind, fg_value, bg_kind, bg_value, style_bits}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attr {
    pub fg: Color,
    pub bg: Color,
    pub style: Style,
}

impl Default for Attr {
    fn default() -> Self {
        Self {
            fg: Color::Default,
            bg: Color::Default,
            style: Style::empty(),
        }
    }
}

impl Attr {
    pub const fn new(fg: Color, bg: Color) -> Self {
        Self {
            fg,
            bg,
            style: Style::empty(),
        }
    }

    pub const fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    fn kind_tag(c: Color) -> u64 {
        match c {
            Color::Default => 0,
            Color::Indexed16(_) => 1,
            Color::Indexed256(_) => 2,
            Color::Rgb24(..) => 3,
        }
    }

    fn value_bits(c: Color) -> u64 {
        match c {
            Color::Default => 0,
            Color::Indexed16(n) | Color::Indexed256(n) => n as u64,
            Color::Rgb24(r, g, b) => ((r as u64) << 16) | ((g as u64) << 8) | (b as u64),
        }
    }

    fn color_from_bits(kind: u64, value: u64) -> Color {
        match kind {
            1 => Color::Indexed16(value as u8),
            2 => Color::Indexed256(value as u8),
            3 => Color::Rgb24(
                ((value >> 16) & 0xFF) as u8,
                ((value >> 8) & 0xFF) as u8,
                (value & 0xFF) as u8,
            ),
            _ => Color::Default,
        }
    }

    /// Pack into the 64-bit layout described above.
    pub fn to_u64(self) -> u64 {
        let fg_kind = Self::kind_tag(self.fg);
        let fg_val = Self::value_bits(self.fg);
        let bg_kind = Self::kind_tag(self.bg);
        let bg_val = Self::value_bits(self.bg);
        let style = self.style.bits() as u64;

        (fg_kind << 62)
            | ((fg_val & 0xFF_FFFF) << 38)
            | (bg_kind << 36)
            | ((bg_val & 0xFF_FFFF) << 12)
            | (style & 0x1F)
    }

    pub fn from_u64(bits: u64) -> Self {
        let fg_kind = (bits >> 62) & 0x3;
        let fg_val = (bits >> 38) & 0xFF_FFFF;
        let bg_kind = (bits >> 36) & 0x3;
        let bg_val = (bits >> 12) & 0xFF_FFFF;
        let style = (bits & 0x1F) as u8;

        Self {
            fg: Self::color_from_bits(fg_kind, fg_val),
            bg: Self::color_from_bits(bg_kind, bg_val),
            style: Style::from_bits(style),
        }
    }

    /// Encode as an SGR parameter string (no `CSI`/`m` wrapper), e.g.
    /// `"0;1;38;2;255;128;0"`. Always starts with a reset (`0`) so consecutive
    /// emissions never inherit stale state; the reconciliation loop in
    /// [`crate::backend`] only emits this when `last_attr` differs.
    pub fn to_sgr(self, depth: ColorDepth) -> String {
        let mut out = String::from("0");
        if self.style.contains(Style::BOLD) {
            out.push_str(";1");
        }
        if self.style.contains(Style::UNDERLINE) {
            out.push_str(";4");
        }
        if self.style.contains(Style::REVERSE) {
            out.push_str(";7");
        }
        if self.style.contains(Style::ITALIC) {
            out.push_str(";3");
        }
        if self.style.contains(Style::STRIKETHROUGH) {
            out.push_str(";9");
        }
        out.push(';');
        self.fg.write_sgr(&mut out, true, depth);
        out.push(';');
        self.bg.write_sgr(&mut out, false, depth);
        out
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Attr(fg={:?}, bg={:?}, style={:?})", self.fg, self.bg, self.style)
    }
}
