//! seam entrypoint: argument parsing, logging, terminal ownership, and the
//! main event loop.

mod clipboard;

use std::io::{BufWriter, Stdout, stdout};
use std::path::PathBuf;
use std::sync::Once;

use anyhow::Result;
use clap::Parser as ClapParser;
use core_actions::install_default_bindings;
use core_events::{EventReceiver, UiEvent};
use core_keymap::Parser;
use core_model::{Editor, EditorOptions, EditorRequest, Mode};
use core_render::Renderer;
use core_terminal::{CrosstermBackend, TerminalBackend};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

/// CLI arguments.
#[derive(ClapParser, Debug)]
#[command(name = "seam", version, about = "A tiling modeless text editor")]
struct Args {
    /// Files to open, one window each. Missing files open empty and
    /// remember their name for Put.
    pub files: Vec<PathBuf>,
    /// Configuration file path (overrides discovery of `seam.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let _log_guard = configure_logging();
    install_panic_hook();
    info!(target: "runtime", "startup");

    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;
    let options = EditorOptions {
        scroll_step: config.file.scroll.step,
        double_click_ms: config.file.input.double_click_ms,
        backup_suffix: config.file.editor.backup_suffix.clone(),
    };

    let mut editor = Editor::new(options);
    match clipboard::SystemClipboard::new() {
        Some(c) => editor.set_clipboard(Box::new(c)),
        None => info!(target: "runtime", "using in-process clipboard"),
    }

    let col = editor.new_column();
    if args.files.is_empty() {
        editor.new_window(col);
    } else {
        for path in &args.files {
            if let Err(e) = editor.open_file(path) {
                editor.append_error(&format!("{}: {:#}", path.display(), e));
            }
        }
        if editor.window_count() == 0 {
            editor.new_window(col);
        }
    }

    let mut parser = Parser::new();
    install_default_bindings(&mut parser);

    let mut backend = CrosstermBackend::new();
    backend.set_title("seam")?;
    let size = backend.size()?;
    let guard = backend.enter_guard()?;

    let (tx, rx) = core_events::channel();
    let input = core_input::spawn_input_thread(tx);

    let result = run(&mut editor, &mut parser, &rx, size);

    drop(guard);
    drop(rx);
    let _ = input.join();
    info!(target: "runtime", "shutdown");
    result
}

/// The main loop: repaint, block for an event, then drain the burst before
/// repainting again so mouse drags coalesce into one frame.
fn run(
    ed: &mut Editor,
    parser: &mut Parser,
    rx: &EventReceiver,
    size: (u16, u16),
) -> Result<()> {
    let mut renderer: Renderer<BufWriter<Stdout>> = Renderer::new(BufWriter::new(stdout()));
    let (mut w, mut h) = size;
    loop {
        ed.refresh(w as usize, h as usize);
        renderer.draw(ed)?;

        let Ok(ev) = rx.recv() else {
            break;
        };
        handle_event(ed, parser, ev, &mut w, &mut h);
        while !ed.should_quit {
            match rx.try_recv() {
                Ok(ev) => handle_event(ed, parser, ev, &mut w, &mut h),
                Err(_) => break,
            }
        }
        if ed.should_quit {
            break;
        }
    }
    Ok(())
}

/// Dispatch one event against the model.
fn handle_event(ed: &mut Editor, parser: &mut Parser, ev: UiEvent, w: &mut u16, h: &mut u16) {
    match ev {
        UiEvent::Resize(nw, nh) => {
            *w = nw;
            *h = nh;
        }
        UiEvent::Quit => ed.should_quit = true,
        UiEvent::Mouse(m) => match ed.route_mouse(m) {
            EditorRequest::None => {}
            EditorRequest::Execute { ctx, cmd } => core_actions::execute(ed, ctx, &cmd),
            EditorRequest::Plumb { ctx, text } => ed.plumb(ctx, &text),
        },
        UiEvent::Key(k) => {
            if ed.handle_clipboard_key(k) {
                return;
            }
            match ed.mode {
                Mode::Insert => ed.handle_insert_key(k),
                Mode::Normal => {
                    for cmd in parser.feed(k) {
                        core_actions::apply(ed, cmd);
                    }
                }
            }
        }
    }
}

fn configure_logging() -> Option<WorkerGuard> {
    let log_path = std::path::Path::new("seam.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(log_path);
    }
    let appender = tracing_appender::rolling::never(".", "seam.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(writer)
        .try_init()
    {
        Ok(()) => Some(guard),
        // A subscriber is already installed (tests); drop the writer.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            error!(target: "runtime.panic", %info, "panic");
            default_hook(info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::{Key, KeyPress};
    use pretty_assertions::assert_eq;

    fn editor() -> (Editor, Parser) {
        let mut ed = Editor::new(EditorOptions::default());
        let col = ed.new_column();
        ed.new_window(col);
        ed.refresh(80, 24);
        let mut p = Parser::new();
        install_default_bindings(&mut p);
        (ed, p)
    }

    fn key(ed: &mut Editor, p: &mut Parser, k: KeyPress) {
        let (mut w, mut h) = (80u16, 24u16);
        handle_event(ed, p, UiEvent::Key(k), &mut w, &mut h);
    }

    #[test]
    fn typing_flow_through_modes() {
        let (mut ed, mut p) = editor();
        assert_eq!(ed.mode, Mode::Normal);
        key(&mut ed, &mut p, KeyPress::plain('i'));
        assert_eq!(ed.mode, Mode::Insert);
        for c in "hi there".chars() {
            key(&mut ed, &mut p, KeyPress::plain(c));
        }
        key(&mut ed, &mut p, KeyPress::special(Key::Escape));
        assert_eq!(ed.mode, Mode::Normal);
        let id = ed.active_window_id().unwrap();
        assert_eq!(ed.window_mut(id).unwrap().body.content(), "hi there");
    }

    #[test]
    fn normal_mode_commands_dispatch() {
        let (mut ed, mut p) = editor();
        key(&mut ed, &mut p, KeyPress::plain('i'));
        for c in "abc".chars() {
            key(&mut ed, &mut p, KeyPress::plain(c));
        }
        key(&mut ed, &mut p, KeyPress::special(Key::Escape));
        // gg then x: go to the start, delete one rune.
        key(&mut ed, &mut p, KeyPress::plain('g'));
        key(&mut ed, &mut p, KeyPress::plain('g'));
        key(&mut ed, &mut p, KeyPress::plain('x'));
        let id = ed.active_window_id().unwrap();
        assert_eq!(ed.window_mut(id).unwrap().body.content(), "bc");
        // u undoes it.
        key(&mut ed, &mut p, KeyPress::plain('u'));
        assert_eq!(ed.window_mut(id).unwrap().body.content(), "abc");
    }

    #[test]
    fn quit_keys_set_the_flag() {
        let (mut ed, mut p) = editor();
        key(&mut ed, &mut p, KeyPress::plain('q'));
        assert!(ed.should_quit);
    }

    #[test]
    fn resize_updates_dimensions() {
        let (mut ed, mut p) = editor();
        let (mut w, mut h) = (80u16, 24u16);
        handle_event(&mut ed, &mut p, UiEvent::Resize(120, 40), &mut w, &mut h);
        assert_eq!((w, h), (120, 40));
    }

    #[test]
    fn args_accept_multiple_files() {
        let args = Args::try_parse_from(["seam", "a.txt", "b.txt"]).unwrap();
        assert_eq!(args.files.len(), 2);
        let args = Args::try_parse_from(["seam", "--config", "c.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("c.toml")));
        assert!(args.files.is_empty());
    }
}
