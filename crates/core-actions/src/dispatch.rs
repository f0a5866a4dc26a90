//! Applying commands to the editor model.
//!
//! `execute` runs a tag command string in its context: the built-in names
//! act on the editor tree, anything else is a shell pipeline. `apply` maps
//! parsed normal-mode commands onto the focused pane.

use core_frame::WantCol;
use core_keymap::{NormalAction, NormalMotion, ParsedCommand};
use core_model::{Editor, ExecCtx, Mode};
use tracing::{debug, info};

use crate::pipeline;

/// Run a tag command. Built-ins are case-sensitive; anything else goes to
/// the shell.
pub fn execute(ed: &mut Editor, ctx: ExecCtx, command: &str) {
    let command = command.trim();
    if command.is_empty() {
        return;
    }
    debug!(target: "actions.exec", command, ?ctx, "execute");
    match command {
        "Exit" => ed.should_quit = true,
        "Newcol" => {
            ed.new_column();
        }
        "Delcol" => {
            if let Some(ci) = ctx_column(ed, ctx) {
                ed.delete_column(ci);
            }
        }
        "New" => {
            if let Some(ci) = ctx_column(ed, ctx) {
                ed.new_window(ci);
            }
        }
        "Del" => {
            if let Some(id) = ctx_window(ctx) {
                ed.delete_window(id);
            }
        }
        "Put" => {
            if let Some(id) = ctx_window(ctx) {
                save_window(ed, id);
            }
        }
        "Undo" => {
            if let Some(id) = ctx_window(ctx)
                && let Some(win) = ed.window_mut(id)
            {
                win.undo();
            }
        }
        "Redo" => {
            if let Some(id) = ctx_window(ctx)
                && let Some(win) = ed.window_mut(id)
            {
                win.redo();
            }
        }
        _ => shell(ed, ctx, command),
    }
}

fn ctx_window(ctx: ExecCtx) -> Option<core_model::WindowId> {
    match ctx {
        ExecCtx::Window(id) => Some(id),
        _ => None,
    }
}

fn ctx_column(ed: &Editor, ctx: ExecCtx) -> Option<usize> {
    match ctx {
        ExecCtx::Column(ci) => Some(ci),
        ExecCtx::Window(id) => ed.locate(id).map(|(ci, _)| ci),
        ExecCtx::Editor => None,
    }
}

fn save_window(ed: &mut Editor, id: core_model::WindowId) {
    let suffix = ed.options().backup_suffix.clone();
    let result = match ed.window_mut(id) {
        Some(win) => win.save_file(&suffix),
        None => return,
    };
    if let Err(e) = result {
        ed.append_error(&format!("Put: {:#}", e));
    }
}

/// Run `command` as a shell pipeline wired to the context window's
/// selection.
fn shell(ed: &mut Editor, ctx: ExecCtx, command: &str) {
    let p = match pipeline::parse(command) {
        Ok(p) => p,
        Err(e) => {
            ed.append_error(&format!("{}: {}", command, e));
            return;
        }
    };

    let win_id = ctx_window(ctx).or_else(|| ed.active_window_id());
    let input = if p.pipe_input {
        let Some(id) = win_id else {
            ed.append_error("no current window");
            return;
        };
        let Some(win) = ed.window_mut(id) else {
            return;
        };
        let (q0, q1) = win.body.selection();
        Some(win.body.read_range(q0, q1).into_bytes())
    } else {
        None
    };

    match pipeline::exec(&p, input) {
        Err(e) => ed.append_error(&e.to_string()),
        Ok(out) => {
            if p.pipe_output {
                let Some(id) = win_id else {
                    ed.append_error("no current window");
                    return;
                };
                if let Some(win) = ed.window_mut(id) {
                    let text = String::from_utf8_lossy(&out.stdout).into_owned();
                    // One atomic action: replace the selection, keep it on
                    // the inserted text.
                    win.body.buffer_mut().commit_changes();
                    let (q0, _) = win.body.selection();
                    win.body.insert(&text);
                    win.body.select(q0, q0 + text.chars().count());
                    win.body.buffer_mut().commit_changes();
                }
            } else if !out.stdout.is_empty() {
                ed.append_error(String::from_utf8_lossy(&out.stdout).trim_end());
            }
            if !out.stderr.is_empty() {
                ed.append_error(out.stderr.trim_end());
            }
        }
    }
}

/// Apply a parsed normal-mode command to the focused pane.
pub fn apply(ed: &mut Editor, cmd: ParsedCommand) {
    match cmd {
        ParsedCommand::Unknown { keys } => {
            let seq: String = keys.iter().map(|k| k.to_string()).collect();
            ed.append_error(&format!("unknown command: {}", seq));
        }
        ParsedCommand::Action { action, count } => apply_action(ed, action, count),
        ParsedCommand::Motion { motion, count, op } => {
            apply_motion(ed, motion, count);
            if let Some((action, n)) = op {
                apply_action(ed, action, n);
            }
        }
    }
}

fn apply_action(ed: &mut Editor, action: NormalAction, count: usize) {
    let n = count.max(1);
    match action {
        NormalAction::Quit => {
            info!(target: "actions.exec", "quit");
            ed.should_quit = true;
        }
        NormalAction::SaveAndQuit => {
            if let Some(id) = ed.active_window_id() {
                save_window(ed, id);
            }
            ed.should_quit = true;
        }
        NormalAction::EnterInsert => ed.mode = Mode::Insert,
        NormalAction::DeleteSel => {
            if let Some(pane) = ed.active_pane_mut() {
                pane.delete_sel();
                pane.buffer_mut().commit_changes();
            }
        }
        NormalAction::DeleteRune => {
            if let Some(pane) = ed.active_pane_mut() {
                for _ in 0..n {
                    let (q0, q1) = pane.selection();
                    if q0 == q1 {
                        pane.select(q0, q0 + 1);
                    }
                    pane.delete_sel();
                }
                pane.buffer_mut().commit_changes();
            }
        }
        NormalAction::Undo => {
            if let Some(pane) = ed.active_pane_mut() {
                for _ in 0..n {
                    pane.undo();
                }
            }
        }
        NormalAction::Redo => {
            if let Some(pane) = ed.active_pane_mut() {
                for _ in 0..n {
                    pane.redo();
                }
            }
        }
        NormalAction::PageUp => {
            if let Some(pane) = ed.active_pane_mut() {
                for _ in 0..n {
                    pane.page_up();
                }
            }
        }
        NormalAction::PageDown => {
            if let Some(pane) = ed.active_pane_mut() {
                for _ in 0..n {
                    pane.page_down();
                }
            }
        }
        // Aliases expand inside the parser and never reach dispatch.
        NormalAction::Alias(_) => {}
    }
}

fn apply_motion(ed: &mut Editor, motion: NormalMotion, count: usize) {
    let Some(pane) = ed.active_pane_mut() else {
        return;
    };
    let n = count.max(1);
    match motion {
        NormalMotion::Left => {
            for _ in 0..n {
                pane.move_left();
            }
        }
        NormalMotion::Right => {
            for _ in 0..n {
                pane.move_right();
            }
        }
        NormalMotion::Up => {
            for _ in 0..n {
                pane.move_up();
                // Vertical motion reads the frame's selection line, so a
                // counted step must see the line it just landed on.
                pane.load_text();
            }
        }
        NormalMotion::Down => {
            for _ in 0..n {
                pane.move_down();
                pane.load_text();
            }
        }
        NormalMotion::GotoLine => {
            // `G` without a count goes to the end of the buffer.
            let q = if count == 0 {
                pane.buffer_mut().end()
            } else {
                line_start(pane, count)
            };
            pane.set_want_col(WantCol::AtQ0);
            pane.select(q, q);
        }
        NormalMotion::GotoColumn => {
            let (q0, _) = pane.selection();
            // Scan from one past the cursor: a cursor already at column 0
            // must not land on the previous line.
            let start = pane.prev_new_line(q0 + 1, 1);
            let mut q = start;
            // Columns are 1-based; a missing count means column 1.
            for _ in 1..count.max(1) {
                match pane.buffer_mut().rune_at(q) {
                    Some(c) if c != '\n' => q += 1,
                    _ => break,
                }
            }
            pane.set_want_col(WantCol::AtQ0);
            pane.select(q, q);
        }
        NormalMotion::LineEnd => {
            let (_, q1) = pane.selection();
            let mut q = q1;
            while let Some(c) = pane.buffer_mut().rune_at(q) {
                if c == '\n' {
                    break;
                }
                q += 1;
            }
            pane.set_want_col(WantCol::AtQ1);
            pane.select(q, q);
        }
    }
}

/// Rune position of the start of 1-based line `line`.
fn line_start(pane: &mut core_model::TextPane, line: usize) -> usize {
    let mut q = 0;
    let mut remaining = line.saturating_sub(1);
    while remaining > 0 {
        match pane.buffer_mut().rune_at(q) {
            Some('\n') => {
                remaining -= 1;
                q += 1;
            }
            Some(_) => q += 1,
            None => break,
        }
    }
    q
}
