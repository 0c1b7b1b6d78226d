// (C) 2025 - Enzo Lombardi

//! `DisplayBuffer`: the cell grid a [`crate::backend::DisplayBackend`] reconciles against the terminal.
//!
//! Holds two grids — `front` (what the terminal is believed to show after the
//! last successful flush) and `back` (the pending next frame) — plus one
//! [`DamageRegion`] per row and an [`FpsLimiter`] gating how often a backend
//! may flush. All mutation goes through `back`; a backend's flush copies
//! reconciled runs from `back` into `front` as it writes them (see
//! [`crate::backend::ansi::AnsiBackend::flush`]).

use crate::attr::Attr;
use crate::cell::ScreenCell;
use crate::damage::DamageRegion;
use crate::fps::FpsLimiter;
use crate::geometry::Rect;

/// 2-D grid of [`ScreenCell`] with damage tracking and frame pacing.
///
/// Owns no file descriptor and performs no I/O; every operation here is a
/// pure bound-checking mutation, which is why none of them return a
/// `Result` — a `DisplayBuffer` operation never fails from I/O.
pub struct DisplayBuffer {
    width: u16,
    height: u16,
    front: Vec<Vec<ScreenCell>>,
    back: Vec<Vec<ScreenCell>>,
    damage: Vec<DamageRegion>,
    fps: FpsLimiter,
    frame_depth: u32,
}

impl DisplayBuffer {
    pub fn new(width: u16, height: u16) -> Self {
        let w = width.max(1);
        let h = height.max(1);
        Self {
            width: w,
            height: h,
            front: vec![vec![ScreenCell::blank(); w as usize]; h as usize],
            back: vec![vec![ScreenCell::blank(); w as usize]; h as usize],
            damage: vec![DamageRegion::empty(); h as usize],
            fps: FpsLimiter::default(),
            frame_depth: 0,
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn fps_limiter(&self) -> &FpsLimiter {
        &self.fps
    }

    pub fn fps_limiter_mut(&mut self) -> &mut FpsLimiter {
        &mut self.fps
    }

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u16) < self.width && (y as u16) < self.height
    }

    fn damage(&mut self, y: u16, x: u16, len: u16) {
        self.damage[y as usize].expand(x, len, self.width);
    }

    /// Places `cluster` at `(x,y)`. If the cluster is wide (`width == 2`) and
    /// `x+1 < W`, also writes the trailing marker at `x+1`; if `x+1 == W`, a
    /// space is substituted so no wide character is split by the row edge.
    /// Enforces the wide-character pairing invariant: a write that would
    /// split an existing pair replaces the opposite half with a space and
    /// damages it too.
    pub fn put_char(&mut self, x: i32, y: i32, cluster: &str, attr: Attr) {
        if !self.in_bounds(x, y) {
            return;
        }
        let (x, y) = (x as u16, y as u16);
        self.unpair_at(x, y);

        let cell = ScreenCell::new(cluster, attr);
        let width = cell.width();

        if width == 2 {
            if x + 1 < self.width {
                self.unpair_at(x + 1, y);
                self.back[y as usize][x as usize] = cell;
                self.back[y as usize][(x + 1) as usize] = ScreenCell::trailing_marker(attr);
                self.damage(y, x, 2);
            } else {
                // Would split at the row edge: substitute a space.
                self.back[y as usize][x as usize] = ScreenCell::new(" ", attr);
                self.damage(y, x, 1);
            }
        } else {
            self.back[y as usize][x as usize] = cell;
            self.damage(y, x, 1);
        }
    }

    /// If `(x,y)` is part of a wide-character pair, replace both halves with
    /// spaces and damage both. No-op if `(x,y)` is already a standalone cell.
    fn unpair_at(&mut self, x: u16, y: u16) {
        let row = &self.back[y as usize];
        let cell = row[x as usize];
        if cell.width() == 2 {
            // x is the leading half; x+1 holds the trailing marker.
            self.back[y as usize][x as usize] = ScreenCell::new(" ", cell.attr);
            if (x + 1) < self.width {
                self.back[y as usize][(x + 1) as usize] = ScreenCell::new(" ", cell.attr);
                self.damage(y, x, 2);
            } else {
                self.damage(y, x, 1);
            }
        } else if cell.is_trailing_marker() && x > 0 {
            let lead = self.back[y as usize][(x - 1) as usize];
            self.back[y as usize][(x - 1) as usize] = ScreenCell::new(" ", lead.attr);
            self.back[y as usize][x as usize] = ScreenCell::new(" ", lead.attr);
            self.damage(y, x - 1, 2);
        }
    }

    /// Segments `text` into grapheme clusters and writes them left-to-right
    /// from `(x,y)`, advancing by each cluster's display width. Clusters that
    /// would overflow the row are dropped, not wrapped.
    pub fn put_text(&mut self, x: i32, y: i32, text: &str, attr: Attr) {
        use unicode_segmentation::UnicodeSegmentation;
        let mut cx = x;
        for cluster in text.graphemes(true) {
            if cx < 0 || cx as u16 >= self.width {
                break;
            }
            self.put_char(cx, y, cluster, attr);
            let w = ScreenCell::new(cluster, attr).width().max(1);
            cx += w as i32;
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, cluster: &str, attr: Attr) {
        for row in y..(y + h) {
            for col in x..(x + w) {
                self.put_char(col, row, cluster, attr);
            }
        }
    }

    pub fn clear_rect(&mut self, x: i32, y: i32, w: i32, h: i32, attr: Attr) {
        self.fill_rect(x, y, w, h, " ", attr);
    }

    pub fn clear(&mut self, attr: Attr) {
        self.clear_rect(0, 0, self.width as i32, self.height as i32, attr);
    }

    /// Swaps `fg`/`bg` on every cell and damages the whole grid. Used by
    /// [`crate::terminal::Terminal::flash`] to invert the screen briefly.
    pub fn invert_all(&mut self) {
        for row in &mut self.back {
            for cell in row {
                std::mem::swap(&mut cell.attr.fg, &mut cell.attr.bg);
            }
        }
        for region in &mut self.damage {
            region.expand_full(self.width);
        }
    }

    /// Copies rows within `rect` vertically by `dy` (negative scrolls up),
    /// filling the exposed band with spaces at the current default attribute.
    /// Damages the full `rect`.
    pub fn scroll(&mut self, rect: Rect, dy: i32, fill_attr: Attr) {
        let x0 = rect.a.x.max(0) as usize;
        let x1 = (rect.b.x.max(0) as usize).min(self.width as usize);
        let y0 = rect.a.y.max(0) as i32;
        let y1 = (rect.b.y.max(0)).min(self.height as i16) as i32;
        if x0 >= x1 || y0 >= y1 || dy == 0 {
            return;
        }

        if dy > 0 {
            // Content moves down; iterate bottom-up to avoid overwriting source rows.
            let mut y = y1 - 1;
            while y >= y0 {
                let src = y - dy;
                if src >= y0 {
                    for x in x0..x1 {
                        self.back[y as usize][x] = self.back[src as usize][x];
                    }
                } else {
                    for x in x0..x1 {
                        self.back[y as usize][x] = ScreenCell::new(" ", fill_attr);
                    }
                }
                y -= 1;
            }
        } else {
            let shift = -dy;
            let mut y = y0;
            while y < y1 {
                let src = y + shift;
                if src < y1 {
                    for x in x0..x1 {
                        self.back[y as usize][x] = self.back[src as usize][x];
                    }
                } else {
                    for x in x0..x1 {
                        self.back[y as usize][x] = ScreenCell::new(" ", fill_attr);
                    }
                }
                y += 1;
            }
        }

        for y in y0..y1 {
            self.damage[y as usize].expand(x0 as u16, (x1 - x0) as u16, self.width);
        }
    }

    /// Reallocates both grids, preserving the top-left overlap. Damages
    /// everything on grow; on a pure shrink the preserved region is left
    /// undamaged since `front` already matches it.
    pub fn resize(&mut self, new_width: u16, new_height: u16) {
        let w = new_width.max(1);
        let h = new_height.max(1);
        let grew = w > self.width || h > self.height;

        let mut new_front = vec![vec![ScreenCell::blank(); w as usize]; h as usize];
        let mut new_back = vec![vec![ScreenCell::blank(); w as usize]; h as usize];
        let mut new_damage = vec![DamageRegion::empty(); h as usize];

        let copy_w = self.width.min(w) as usize;
        let copy_h = self.height.min(h) as usize;
        for y in 0..copy_h {
            new_front[y][..copy_w].copy_from_slice(&self.front[y][..copy_w]);
            new_back[y][..copy_w].copy_from_slice(&self.back[y][..copy_w]);
        }

        self.front = new_front;
        self.back = new_back;
        self.damage = std::mem::take(&mut new_damage);
        self.width = w;
        self.height = h;

        if grew {
            for d in &mut self.damage {
                d.expand_full(self.width);
            }
        }
    }

    /// Begin deferring damage aggregation across multiple `put_*` calls.
    /// Nested calls are reference-counted; damage is still recorded
    /// immediately (it's cheap to coalesce), this only documents the
    /// transaction boundary for callers that want one.
    pub fn begin_frame(&mut self) {
        self.frame_depth += 1;
    }

    pub fn end_frame(&mut self) {
        self.frame_depth = self.frame_depth.saturating_sub(1);
    }

    pub fn in_frame(&self) -> bool {
        self.frame_depth > 0
    }

    /// Returns each row's `[start,end)` damage and clears it.
    pub fn damage_snapshot(&mut self) -> Vec<(u16, u16)> {
        self.damage
            .iter_mut()
            .map(|d| {
                let r = d.range();
                d.reset();
                r
            })
            .collect()
    }

    /// Peek at damage without clearing it (used by property tests).
    pub fn damage_peek(&self) -> Vec<(u16, u16)> {
        self.damage.iter().map(DamageRegion::range).collect()
    }

    pub fn back_row(&self, y: u16) -> &[ScreenCell] {
        &self.back[y as usize]
    }

    pub fn front_row(&self, y: u16) -> &[ScreenCell] {
        &self.front[y as usize]
    }

    pub fn back_cell(&self, x: u16, y: u16) -> ScreenCell {
        self.back[y as usize][x as usize]
    }

    pub fn front_cell(&self, x: u16, y: u16) -> ScreenCell {
        self.front[y as usize][x as usize]
    }

    /// Called by a backend as it writes a reconciled run, so `front` mirrors
    /// what the terminal now shows.
    pub fn commit_run(&mut self, y: u16, start: u16, end: u16) {
        for x in start..end {
            self.front[y as usize][x as usize] = self.back[y as usize][x as usize];
        }
    }

    /// Dump the live back buffer to a replayable ANSI text stream; see
    /// [`crate::ansi_dump`].
    pub fn dump_to<W: std::io::Write>(&self, w: &mut W) -> std::io::Result<()> {
        crate::ansi_dump::dump_buffer(w, &self.back, self.width as usize, self.height as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Color;

    #[test]
    fn put_char_damages_single_cell() {
        let mut buf = DisplayBuffer::new(10, 5);
        buf.put_char(4, 0, "x", Attr::default());
        let snap = buf.damage_snapshot();
        assert_eq!(snap[0], (4, 5));
    }

    #[test]
    fn put_text_advances_by_width() {
        let mut buf = DisplayBuffer::new(10, 5);
        buf.put_text(0, 0, "Hi", Attr::default());
        assert_eq!(buf.back_cell(0, 0).text(), "H");
        assert_eq!(buf.back_cell(1, 0).text(), "i");
    }

    #[test]
    fn wide_char_occupies_two_cells() {
        let mut buf = DisplayBuffer::new(10, 5);
        buf.put_text(0, 0, "\u{6f22}", Attr::default()); // 漢
        assert_eq!(buf.back_cell(0, 0).width(), 2);
        assert!(buf.back_cell(1, 0).is_trailing_marker());
    }

    #[test]
    fn invert_all_swaps_every_cell_and_damages_the_grid() {
        let mut buf = DisplayBuffer::new(4, 2);
        let attr = Attr::new(Color::RED, Color::BLUE);
        buf.put_char(0, 0, "x", attr);
        buf.damage_snapshot();

        buf.invert_all();

        assert_eq!(buf.back_cell(0, 0).attr.fg, Color::BLUE);
        assert_eq!(buf.back_cell(0, 0).attr.bg, Color::RED);
        // A cell never explicitly written also gets its (default) colors
        // swapped, since the whole grid inverts, not just the dirty cells.
        assert_eq!(buf.back_cell(2, 1).attr.fg, Color::Default);
        let snap = buf.damage_snapshot();
        assert!(snap.iter().all(|&(s, e)| (s, e) == (0, 4)));
    }

    #[test]
    fn overwriting_trailing_half_blanks_the_pair() {
        let mut buf = DisplayBuffer::new(10, 5);
        buf.put_char(0, 0, "\u{6f22}", Attr::default());
        buf.damage_snapshot();
        buf.put_char(1, 0, "x", Attr::default());
        assert_eq!(buf.back_cell(0, 0).text(), " ");
        assert_eq!(buf.back_cell(1, 0).text(), "x");
        let snap = buf.damage_snapshot();
        assert_eq!(snap[0], (0, 2));
    }

    #[test]
    fn wide_char_at_last_column_becomes_space() {
        let mut buf = DisplayBuffer::new(3, 1);
        buf.put_char(2, 0, "\u{6f22}", Attr::default());
        assert_eq!(buf.back_cell(2, 0).text(), " ");
        assert_eq!(buf.back_cell(2, 0).width(), 1);
    }

    #[test]
    fn clear_rect_fills_with_spaces() {
        let mut buf = DisplayBuffer::new(5, 5);
        buf.put_char(1, 1, "x", Attr::default());
        buf.clear_rect(0, 0, 5, 5, Attr::default());
        assert_eq!(buf.back_cell(1, 1).text(), " ");
    }

    #[test]
    fn scroll_up_shifts_rows_and_fills_exposed_band() {
        let mut buf = DisplayBuffer::new(3, 3);
        buf.put_char(0, 0, "a", Attr::default());
        buf.put_char(0, 1, "b", Attr::default());
        buf.put_char(0, 2, "c", Attr::default());
        buf.scroll(Rect::new(0, 0, 3, 3), -1, Attr::default());
        assert_eq!(buf.back_cell(0, 0).text(), "b");
        assert_eq!(buf.back_cell(0, 1).text(), "c");
        assert_eq!(buf.back_cell(0, 2).text(), " ");
    }

    #[test]
    fn resize_grow_damages_everything() {
        let mut buf = DisplayBuffer::new(3, 3);
        buf.damage_snapshot();
        buf.resize(5, 5);
        let snap = buf.damage_snapshot();
        assert!(snap.iter().all(|(s, e)| *e > *s));
    }

    #[test]
    fn resize_preserves_top_left_overlap() {
        let mut buf = DisplayBuffer::new(5, 5);
        buf.put_char(0, 0, "Z", Attr::new(Color::RED, Color::Default));
        buf.commit_run(0, 0, 1);
        buf.resize(3, 3);
        assert_eq!(buf.back_cell(0, 0).text(), "Z");
    }

    #[test]
    fn damage_is_superset_of_front_back_diff() {
        let mut buf = DisplayBuffer::new(8, 1);
        buf.put_char(2, 0, "q", Attr::default());
        buf.put_char(5, 0, "r", Attr::default());
        let (s, e) = buf.damage_peek()[0];
        for x in 0..buf.width() {
            if buf.front_cell(x, 0) != buf.back_cell(x, 0) {
                assert!(x >= s && x < e);
            }
        }
    }
}
