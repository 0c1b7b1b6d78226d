// (C) 2025 - Enzo Lombardi
// Debug tool: prints every parsed event as it arrives.
use std::time::Duration;
use termio_core::event::{Event, KeyCode, Modifiers};
use termio_core::terminal::Terminal;

fn main() -> termio_core::error::Result<()> {
    if let Ok(log_file) = std::fs::File::create("key_debug.log") {
        let _ = simplelog::WriteLogger::init(simplelog::LevelFilter::Debug, simplelog::Config::default(), log_file);
    }

    let mut terminal = Terminal::init()?;

    println!("Key Debug - press keys/mouse to see parsed events, Ctrl+C to exit");

    loop {
        if let Some(event) = terminal.poll_event(Duration::from_millis(50))? {
            println!("{event:?}");
            if let Event::Key { code: KeyCode::Control('C'), modifiers, .. } = event {
                if modifiers.contains(Modifiers::CTRL) {
                    break;
                }
            }
        }
    }

    terminal.shutdown()?;
    Ok(())
}
