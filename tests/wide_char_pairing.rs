//! Wide-character cells always come in a lead/trailing pair: a trailing
//! marker never appears without a width-2 lead immediately to its left, and
//! vice versa, no matter what sequence of writes produced the buffer.

use proptest::prelude::*;
use termio_core::attr::Attr;
use termio_core::buffer::DisplayBuffer;

const NARROW: [&str; 3] = ["a", "x", " "];
const WIDE: [&str; 3] = ["\u{6f22}", "\u{4e2d}", "\u{56fd}"];

fn assert_pairing_holds(buf: &DisplayBuffer) {
    for y in 0..buf.height() {
        let row = buf.back_row(y);
        for x in 0..row.len() {
            let cell = row[x];
            if cell.width() == 2 {
                assert!(x + 1 < row.len(), "wide lead at row edge without a trailing slot");
                assert!(row[x + 1].is_trailing_marker(), "wide lead at {x} not followed by a trailing marker");
            }
            if cell.is_trailing_marker() {
                assert!(x > 0, "trailing marker at column 0");
                assert_eq!(row[x - 1].width(), 2, "trailing marker at {x} has no wide lead to its left");
            }
        }
    }
}

proptest! {
    #[test]
    fn random_overlapping_writes_never_split_a_wide_pair(
        ops in prop::collection::vec((0i32..12, 0i32..4, 0usize..6), 1..60)
    ) {
        let mut buf = DisplayBuffer::new(12, 4);
        for (x, y, choice) in ops {
            let cluster = if choice < 3 { NARROW[choice] } else { WIDE[choice - 3] };
            buf.put_char(x, y, cluster, Attr::default());
        }
        assert_pairing_holds(&buf);
    }
}

#[test]
fn put_text_mixing_wide_and_narrow_keeps_pairing() {
    let mut buf = DisplayBuffer::new(20, 1);
    buf.put_text(0, 0, "a\u{6f22}b\u{4e2d}c", Attr::default());
    assert_pairing_holds(&buf);
    assert_eq!(buf.back_cell(0, 0).text(), "a");
    assert_eq!(buf.back_cell(1, 0).width(), 2);
    assert!(buf.back_cell(2, 0).is_trailing_marker());
    assert_eq!(buf.back_cell(3, 0).text(), "b");
}
