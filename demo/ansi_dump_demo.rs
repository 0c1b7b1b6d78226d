// (C) 2025 - Enzo Lombardi
// Demo: draws a short message into a DisplayBuffer and dumps it as an
// ANSI-art file, without touching a real terminal.
use termio_core::attr::{Attr, Color, Style};
use termio_core::buffer::DisplayBuffer;

fn main() -> std::io::Result<()> {
    let mut buffer = DisplayBuffer::new(40, 3);
    let title_attr = Attr::new(Color::rgb(255, 200, 0), Color::Default).with_style(Style::BOLD);
    buffer.put_text(2, 1, "termio-core ansi dump demo", title_attr);

    let path = "ansi_dump_demo.ans";
    buffer.dump_to(&mut std::fs::File::create(path)?)?;
    println!("wrote {path} -- view it with `cat {path}`");
    Ok(())
}
