//! The input driver: a thread that blocks on terminal events and pushes
//! normalized [`UiEvent`]s into the main channel.
//!
//! Translation is a pure function so it can be tested without a terminal.
//! Key releases and pointer motion without a held button are dropped here;
//! everything else maps one-to-one onto the abstract event model.

use core_events::{EventSender, Key, KeyPress, Mods, MouseButton, MouseDir, MouseInput, UiEvent};
use crossterm::event::{
    Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use tracing::{debug, warn};

/// Spawn the input thread. It exits when the terminal event stream fails or
/// the receiving side hangs up.
pub fn spawn_input_thread(tx: EventSender) -> std::thread::JoinHandle<()> {
    std::thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            debug!(target: "input.thread", "input thread started");
            loop {
                match crossterm::event::read() {
                    Ok(ev) => {
                        if let Some(e) = translate(ev)
                            && tx.send(e).is_err()
                        {
                            debug!(target: "input.thread", "event channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(target: "input.thread", ?e, "event read failed");
                        let _ = tx.send(UiEvent::Quit);
                        break;
                    }
                }
            }
        })
        .expect("spawning the input thread")
}

/// Normalize one terminal event, or drop it.
pub fn translate(ev: CEvent) -> Option<UiEvent> {
    match ev {
        CEvent::Key(k) => translate_key(k).map(UiEvent::Key),
        CEvent::Mouse(m) => translate_mouse(m).map(UiEvent::Mouse),
        CEvent::Resize(w, h) => Some(UiEvent::Resize(w, h)),
        _ => None,
    }
}

fn translate_key(k: KeyEvent) -> Option<KeyPress> {
    if k.kind == KeyEventKind::Release {
        return None;
    }
    let key = match k.code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Tab => Key::Char('\t'),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Delete => Key::Delete,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        _ => return None,
    };
    let mut mods = Mods::empty();
    if k.modifiers.contains(KeyModifiers::CONTROL) {
        mods |= Mods::CTRL;
    }
    if k.modifiers.contains(KeyModifiers::ALT) {
        mods |= Mods::ALT;
    }
    Some(KeyPress { key, mods })
}

fn translate_mouse(m: MouseEvent) -> Option<MouseInput> {
    let (dir, button) = match m.kind {
        MouseEventKind::Down(b) => (MouseDir::Press, translate_button(b)?),
        MouseEventKind::Up(b) => (MouseDir::Release, translate_button(b)?),
        MouseEventKind::Drag(b) => (MouseDir::Move, translate_button(b)?),
        MouseEventKind::ScrollUp => (MouseDir::Step, MouseButton::WheelUp),
        MouseEventKind::ScrollDown => (MouseDir::Step, MouseButton::WheelDown),
        // Plain motion and horizontal scroll carry no editing meaning.
        _ => return None,
    };
    Some(MouseInput {
        dir,
        button,
        x: m.column,
        y: m.row,
    })
}

fn translate_button(b: crossterm::event::MouseButton) -> Option<MouseButton> {
    match b {
        crossterm::event::MouseButton::Left => Some(MouseButton::Left),
        crossterm::event::MouseButton::Middle => Some(MouseButton::Middle),
        crossterm::event::MouseButton::Right => Some(MouseButton::Right),
    }
}
