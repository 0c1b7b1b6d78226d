// (C) 2025 - Enzo Lombardi

//! `ScreenCell`: one grid position in a [`crate::buffer::DisplayBuffer`].

use crate::attr::Attr;
use unicode_width::UnicodeWidthStr;

/// Maximum byte length of a cell's text cluster (≤15 bytes UTF-8).
pub const MAX_CLUSTER_BYTES: usize = 15;

/// One character position on the terminal grid.
///
/// Holds one grapheme cluster (a user-perceived character, possibly spanning
/// several Unicode code points) of display width 1 or 2, plus the attribute
/// it's drawn with and a transient dirty flag used during flush bookkeeping.
///
/// A cell that is the trailing half of a wide character written to the
/// preceding column has `width == 0` and empty `text`; it never stands alone
/// (see [`crate::buffer::DisplayBuffer::put_char`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenCell {
    text: ClusterBuf,
    width: u8,
    pub attr: Attr,
    pub dirty: bool,
}

/// Small inline buffer for a grapheme cluster, avoiding a heap allocation per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClusterBuf {
    bytes: [u8; MAX_CLUSTER_BYTES],
    len: u8,
}

impl ClusterBuf {
    const EMPTY: ClusterBuf = ClusterBuf {
        bytes: [0; MAX_CLUSTER_BYTES],
        len: 0,
    };

    fn from_str(s: &str) -> Self {
        let bytes = s.as_bytes();
        let len = bytes.len().min(MAX_CLUSTER_BYTES);
        let mut buf = [0u8; MAX_CLUSTER_BYTES];
        buf[..len].copy_from_slice(&bytes[..len]);
        ClusterBuf {
            bytes: buf,
            len: len as u8,
        }
    }

    fn as_str(&self) -> &str {
        // SAFETY-free: constructed only from valid UTF-8 slices in `from_str`,
        // and truncation only ever happens at a pre-checked boundary.
        std::str::from_utf8(&self.bytes[..self.len as usize]).unwrap_or("")
    }
}

impl ScreenCell {
    /// The empty cell: a single space, default attribute, width 1.
    pub const fn blank() -> Self {
        Self {
            text: ClusterBuf::EMPTY,
            width: 1,
            attr: Attr {
                fg: crate::attr::Color::Default,
                bg: crate::attr::Color::Default,
                style: crate::attr::Style::empty(),
            },
            dirty: false,
        }
    }

    /// Build a cell from a grapheme cluster and attribute. Clusters over
    /// [`MAX_CLUSTER_BYTES`] are truncated at a `char` boundary; width is
    /// derived from the (possibly truncated) cluster via `unicode-width` and
    /// clamped to `{0, 1, 2}`.
    pub fn new(cluster: &str, attr: Attr) -> Self {
        let truncated = truncate_to_boundary(cluster, MAX_CLUSTER_BYTES);
        let width = if truncated.is_empty() {
            1
        } else {
            UnicodeWidthStr::width(truncated).clamp(0, 2) as u8
        };
        Self {
            text: if truncated.is_empty() {
                ClusterBuf::EMPTY
            } else {
                ClusterBuf::from_str(truncated)
            },
            width: width.max(1).min(2),
            attr,
            dirty: false,
        }
    }

    /// The distinguished trailing-half marker for a wide character: empty
    /// text, width 0, same attribute as the leading half.
    pub fn trailing_marker(attr: Attr) -> Self {
        Self {
            text: ClusterBuf::EMPTY,
            width: 0,
            attr,
            dirty: false,
        }
    }

    pub fn text(&self) -> &str {
        let s = self.text.as_str();
        if s.is_empty() {
            " "
        } else {
            s
        }
    }

    /// Display width: 1 for narrow, 2 for wide, 0 for a trailing-half marker.
    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn is_trailing_marker(&self) -> bool {
        self.width == 0
    }
}

impl Default for ScreenCell {
    fn default() -> Self {
        Self::blank()
    }
}

fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Color;

    #[test]
    fn blank_is_space_width_1() {
        let c = ScreenCell::blank();
        assert_eq!(c.text(), " ");
        assert_eq!(c.width(), 1);
    }

    #[test]
    fn ascii_char_is_narrow() {
        let c = ScreenCell::new("x", Attr::default());
        assert_eq!(c.text(), "x");
        assert_eq!(c.width(), 1);
    }

    #[test]
    fn wide_char_reports_width_2() {
        let c = ScreenCell::new("\u{6f22}", Attr::default()); // 漢
        assert_eq!(c.width(), 2);
    }

    #[test]
    fn combining_mark_cluster_preserved() {
        let c = ScreenCell::new("e\u{0301}", Attr::default()); // e + combining acute
        assert_eq!(c.text(), "e\u{0301}");
    }

    #[test]
    fn trailing_marker_has_width_0_and_empty_text() {
        let t = ScreenCell::trailing_marker(Attr::new(Color::RED, Color::Default));
        assert!(t.is_trailing_marker());
        assert_eq!(t.text(), " ");
    }

    #[test]
    fn oversize_cluster_is_truncated_not_panicking() {
        let long = "a".repeat(64);
        let c = ScreenCell::new(&long, Attr::default());
        assert!(c.text().len() <= MAX_CLUSTER_BYTES);
    }
}
