//! `EscapeParser` round-trip and robustness, beyond the fixed-sequence unit
//! tests living next to the parser itself: every byte string the parser can
//! ever see, however malformed, must resolve without panicking, and a table
//! of canonical wire encodings must always decode to the same event.

use proptest::prelude::*;
use std::time::{Duration, Instant};
use termio_core::event::{Event, KeyCode, Modifiers, MouseButton, MouseKind};
use termio_core::parser::EscapeParser;

fn feed_all(parser: &mut EscapeParser, bytes: &[u8]) -> Vec<Event> {
    let now = Instant::now();
    bytes.iter().flat_map(|&b| parser.feed(b, now)).collect()
}

fn canonical_encodings() -> Vec<(&'static [u8], Event)> {
    vec![
        (&[0x1B, b'[', b'A'], Event::key(KeyCode::Up, Modifiers::empty())),
        (&[0x1B, b'[', b'B'], Event::key(KeyCode::Down, Modifiers::empty())),
        (&[0x1B, b'[', b'C'], Event::key(KeyCode::Right, Modifiers::empty())),
        (&[0x1B, b'[', b'D'], Event::key(KeyCode::Left, Modifiers::empty())),
        (b"\x1bOP", Event::key(KeyCode::F(1), Modifiers::empty())),
        (b"\x1b[3~", Event::key(KeyCode::Delete, Modifiers::empty())),
        (
            &[0x1B, b'[', b'<', b'0', b';', b'1', b'0', b';', b'5', b'M'],
            Event::Mouse { x: 9, y: 4, button: MouseButton::Left, kind: MouseKind::Press, modifiers: Modifiers::empty() },
        ),
        (
            &[0x1B, b'[', b'<', b'0', b';', b'1', b'0', b';', b'5', b'm'],
            Event::Mouse { x: 9, y: 4, button: MouseButton::Left, kind: MouseKind::Release, modifiers: Modifiers::empty() },
        ),
    ]
}

#[test]
fn canonical_wire_sequences_round_trip_to_their_event() {
    for (bytes, expected) in canonical_encodings() {
        let mut p = EscapeParser::new(Duration::from_millis(50));
        let events = feed_all(&mut p, bytes);
        assert_eq!(events, vec![expected], "decoding {bytes:02x?}");
        assert!(p.is_ground());
    }
}

#[test]
fn feeding_one_sequence_right_after_another_does_not_cross_contaminate() {
    let mut p = EscapeParser::new(Duration::from_millis(50));
    for (bytes, expected) in canonical_encodings() {
        let events = feed_all(&mut p, bytes);
        assert_eq!(events, vec![expected]);
    }
}

proptest! {
    /// No byte sequence of any length, fed one byte at a time, panics or
    /// leaves the parser permanently stuck off `Ground` once plain ASCII
    /// resumes.
    #[test]
    fn arbitrary_bytes_never_panic_and_recover_to_ground(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut p = EscapeParser::new(Duration::from_millis(50));
        let now = Instant::now();
        for b in bytes {
            let _ = p.feed(b, now);
        }
        let _ = feed_all(&mut p, b"reset");
        prop_assert!(p.is_ground());
    }

    /// SGR mouse reports are well-formed for any in-range button/coordinate
    /// triple: the decoded coordinates are always the encoded ones minus one.
    #[test]
    fn sgr_mouse_coordinates_decode_as_zero_indexed(cb in 0u8..3, cx in 1u16..200, cy in 1u16..200) {
        let mut p = EscapeParser::new(Duration::from_millis(50));
        let seq = format!("\x1b[<{cb};{cx};{cy}M");
        let events = feed_all(&mut p, seq.as_bytes());
        prop_assert_eq!(events.len(), 1);
        match &events[0] {
            Event::Mouse { x, y, .. } => {
                prop_assert_eq!(*x, cx - 1);
                prop_assert_eq!(*y, cy - 1);
            }
            other => prop_assert!(false, "expected Mouse, got {other:?}"),
        }
    }
}
