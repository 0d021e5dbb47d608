use std::io::{self, Write};
use crossterm::cursor::MoveTo;
use crossterm::event::{read, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType};
use crate::error::{LearnError, Result};

pub fn reset_screen(message: &str) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, Clear(ClearType::All), MoveTo(0, 0))?;
    println!("----------------------------------------------------------------------");
    println!("{}", message);
    println!("----------------------------------------------------------------------");
    stdout.flush()?;
    Ok(())
}

pub fn end_of_run() -> Result<()> {
    println!("\nPress Enter to go back to the menu...");
    io::stdin().read_line(&mut String::new())?;
    Ok(())
}

/// Raw mode only while waiting for the key, so the menu itself prints normally.
fn read_key() -> Result<KeyCode> {
    enable_raw_mode()?;
    let event = read();
    disable_raw_mode()?;
    match event? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(key.code),
        _ => Ok(KeyCode::Null),
    }
}

/// Highlight after `key`, wrapping at both ends. `len` must be non-zero.
fn move_selection(selected_index: usize, len: usize, key: KeyCode) -> usize {
    match key {
        KeyCode::Up if selected_index == 0 => len - 1,
        KeyCode::Up => selected_index - 1,
        KeyCode::Down => (selected_index + 1) % len,
        _ => selected_index,
    }
}

/// Arrow-key menu; Enter or Esc returns the highlighted index.
pub fn user_choice(options: &[&str], message: &str) -> Result<usize> {
    if options.is_empty() {
        return Err(LearnError::ConfigMismatch("a menu needs at least one option".into()));
    }
    let mut selected_index = 0;
    loop {
        reset_screen(&format!("Use Arrow Keys to Navigate, Enter to Select: \n{message}"))?;
        for (i, option) in options.iter().enumerate() {
            if i == selected_index {
                println!("> {}", option);
            } else {
                println!("  {}", option);
            }
        }

        match read_key()? {
            KeyCode::Enter | KeyCode::Esc => return Ok(selected_index),
            key => selected_index = move_selection(selected_index, options.len(), key),
        }
    }
}
