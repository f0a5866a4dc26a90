//! A visible text pane: a rune buffer, a selection `[q0, q1)`, a viewport
//! origin, and the frame rendered from them.
//!
//! The origin always sits at a rune boundary and, after visibility checks,
//! at or before `q0`. Selection changes that push `q1` off-screen advance
//! the origin by a few lines and retry; if the buffer simply ends, the
//! selection is pulled back in instead.

use std::time::{Duration, Instant};

use core_events::{Key, KeyPress, MouseButton, MouseDir, MouseInput};
use core_frame::{Frame, WantCol};
use core_text::util::{is_indent_rune, is_path_rune, is_word_rune};
use core_text::{Content, RuneView};
use tracing::warn;

/// Lines scrolled by a wheel step and by visibility re-centering.
const SCROLL_LINES: usize = 3;
/// Backward line scans give up after this many runes; a longer line counts
/// as wrapped for motion purposes.
const LONG_LINE_RUNES: usize = 128;
/// Default double-click window; the editor overrides it from config.
const DOUBLE_CLICK: Duration = Duration::from_millis(300);

/// What a pane needs its owner to do after handling an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneRequest {
    None,
    /// Middle click: run this text as a command.
    Execute(String),
    /// Right click: open this as a file or find it in the body.
    Plumb(String),
}

pub struct TextPane {
    buf: RuneView,
    frame: Frame,
    origin: usize,
    q0: usize,
    q1: usize,
    width: usize,
    height: usize,
    /// Pinned end of a mouse drag; the free end follows the pointer.
    drag_anchor: Option<usize>,
    last_press: Option<Instant>,
    double_click: Duration,
    wheel_lines: usize,
}

impl TextPane {
    pub fn new(buf: RuneView) -> Self {
        TextPane {
            buf,
            frame: Frame::new(),
            origin: 0,
            q0: 0,
            q1: 0,
            width: 0,
            height: 0,
            drag_anchor: None,
            last_press: None,
            double_click: DOUBLE_CLICK,
            wheel_lines: SCROLL_LINES,
        }
    }

    pub fn from_content(content: Content) -> Self {
        Self::new(RuneView::from_content(content))
    }

    pub fn buffer(&self) -> &RuneView {
        &self.buf
    }

    pub fn buffer_mut(&mut self) -> &mut RuneView {
        &mut self.buf
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn set_want_col(&mut self, w: WantCol) {
        self.frame.set_want_col(w);
    }

    pub fn set_size(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
    }

    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn set_double_click(&mut self, window: Duration) {
        self.double_click = window;
    }

    pub fn set_wheel_lines(&mut self, lines: usize) {
        self.wheel_lines = lines.max(1);
    }

    pub fn origin(&self) -> usize {
        self.origin
    }

    pub fn set_origin(&mut self, origin: usize) {
        self.origin = origin;
    }

    pub fn selection(&self) -> (usize, usize) {
        (self.q0, self.q1)
    }

    /// Rebuild the frame for the current size, origin, and selection.
    pub fn load_text(&mut self) {
        let TextPane {
            buf,
            frame,
            origin,
            q0,
            q1,
            width,
            height,
            ..
        } = self;
        frame.rebuild(*width, *height, *origin, *q0, *q1, |p| buf.rune_at(p));
    }

    /// Set the selection, clamped to the buffer, scrolling so `q1` stays
    /// visible.
    pub fn select(&mut self, q0: usize, q1: usize) {
        if q1 < q0 {
            return;
        }
        let end = self.buf.end();
        self.q0 = q0.min(end);
        self.q1 = q1.min(end);
        if self.q1 > self.origin + self.frame.nchars() {
            let old_origin = self.origin;
            self.origin += self.frame.chars_until_xy(0, SCROLL_LINES);
            self.load_text();
            if self.q1 > self.origin + self.frame.nchars() {
                // No more content below; pull the selection back instead.
                self.origin = old_origin;
                self.q1 = self.q1.saturating_sub(1);
                if self.q0 > self.q1 {
                    self.q0 = self.q1;
                }
                self.load_text();
            }
        }
        self.check_visibility();
    }

    /// Replace the selection with `s` and collapse the cursor after it.
    pub fn insert(&mut self, s: &str) {
        if self.q0 != self.q1
            && let Err(e) = self.buf.delete(self.q0, self.q1)
        {
            warn!(target: "model.pane", ?e, "selection delete failed");
        }
        if let Err(e) = self.buf.insert(self.q0, s) {
            warn!(target: "model.pane", ?e, "insert failed");
            return;
        }
        let q = self.q0 + s.chars().count();
        self.q0 = q;
        self.q1 = q;
        self.frame.set_want_col(WantCol::AtQ1);
        self.check_visibility();
    }

    /// Delete the selection and collapse onto its start.
    pub fn delete_sel(&mut self) {
        if let Err(e) = self.buf.delete(self.q0, self.q1) {
            warn!(target: "model.pane", ?e, "delete failed");
        }
        self.q1 = self.q0;
        self.check_visibility();
    }

    fn check_visibility(&mut self) {
        if self.q0 < self.origin || self.q0 > self.origin + self.frame.nchars() + 1 {
            self.origin = self.prev_new_line(self.q0, SCROLL_LINES);
        }
    }

    /// Scan backwards from `p` over `n` line starts. A run of
    /// `LONG_LINE_RUNES` runes without a newline counts as a line.
    pub fn prev_new_line(&mut self, mut p: usize, n: usize) -> usize {
        for _ in 0..n {
            let mut i = 0;
            while i < LONG_LINE_RUNES && p > 0 {
                p -= 1;
                if p == 0 {
                    return 0;
                }
                if self.buf.rune_at(p - 1) == Some('\n') {
                    break;
                }
                i += 1;
            }
        }
        p
    }

    pub fn scroll_up(&mut self, nlines: usize) {
        self.origin = self.prev_new_line(self.origin, nlines);
    }

    pub fn scroll_down(&mut self, nlines: usize) {
        self.origin += self.frame.chars_until_xy(0, nlines);
    }

    pub fn page_up(&mut self) {
        self.scroll_up(self.height.max(1));
    }

    pub fn page_down(&mut self) {
        self.scroll_down(self.height.max(1));
    }

    // -----------------------------------------------------------------
    // cursor motion
    // -----------------------------------------------------------------

    pub fn move_left(&mut self) {
        let (q0, _) = self.selection();
        if let Some(q) = q0.checked_sub(1) {
            self.select(q, q);
        }
        self.frame.set_want_col(WantCol::AtQ0);
    }

    pub fn move_right(&mut self) {
        let (_, q1) = self.selection();
        self.select(q1 + 1, q1 + 1);
        self.frame.set_want_col(WantCol::AtQ1);
    }

    pub fn move_up(&mut self) {
        let (_, line1) = self.frame.selection_lines();
        let q = self.find_q(line1 as isize - 1);
        self.select(q, q);
    }

    pub fn move_down(&mut self) {
        let (_, line1) = self.frame.selection_lines();
        let q = self.find_q(line1 as isize + 1);
        self.select(q, q);
    }

    /// Rune position at the remembered column of the given frame line,
    /// scrolling the origin when the line lies outside the frame.
    fn find_q(&mut self, line: isize) -> usize {
        let mut line = line;
        if line < 0 {
            self.origin = self.prev_new_line(self.origin, (-line) as usize);
            self.load_text();
            line = 0;
        } else if line as usize > self.frame.line_count() - 1 {
            if self.frame.line_count() == self.height {
                let extra = line as usize - self.frame.line_count() + 1;
                let old_origin = self.origin;
                let old_lines = self.frame.line_count();
                self.origin = old_origin + self.frame.chars_until_xy(0, extra);
                self.load_text();
                if self.frame.line_count() < old_lines {
                    self.origin = old_origin;
                    self.load_text();
                }
            }
            line = self.frame.line_count() as isize - 1;
        }
        let col = self.frame.want_col().col();
        self.origin + self.frame.chars_until_xy(col, line as usize)
    }

    // -----------------------------------------------------------------
    // keyboard
    // -----------------------------------------------------------------

    /// Insert-mode key handling: text entry plus local editing keys.
    pub fn handle_key(&mut self, k: KeyPress) {
        match k.key {
            Key::Enter => self.insert_newline_indented(),
            Key::Backspace => {
                let (q0, q1) = self.selection();
                if q0 == q1
                    && let Some(q) = q0.checked_sub(1)
                {
                    self.select(q, q1);
                }
                self.delete_sel();
            }
            Key::Delete => {
                let (q0, q1) = self.selection();
                if q0 == q1 {
                    self.select(q0, q1 + 1);
                }
                self.delete_sel();
            }
            Key::Left => self.move_left(),
            Key::Right => self.move_right(),
            Key::Up => self.move_up(),
            Key::Down => self.move_down(),
            Key::PageUp => self.page_up(),
            Key::PageDown => self.page_down(),
            Key::Char(c) => self.insert(&c.to_string()),
            Key::Escape | Key::Home | Key::End => {}
        }
    }

    /// Enter: insert a newline plus a copy of the current line's leading
    /// whitespace, as one coalesced edit.
    fn insert_newline_indented(&mut self) {
        let (q0, _) = self.selection();
        let mut p = self.prev_new_line(q0, 1);
        let mut s = String::from("\n");
        while let Some(c) = self.buf.rune_at(p) {
            if !is_indent_rune(c) {
                break;
            }
            s.push(c);
            p += 1;
        }
        self.insert(&s);
    }

    // -----------------------------------------------------------------
    // mouse
    // -----------------------------------------------------------------

    /// Handle a mouse event at frame-relative rune position `p`.
    pub fn handle_mouse(&mut self, p: usize, m: MouseInput) -> PaneRequest {
        let q = self.origin + p;
        match m.dir {
            MouseDir::Press => match m.button {
                MouseButton::Left => {
                    let double = self
                        .last_press
                        .is_some_and(|t| t.elapsed() < self.double_click);
                    if double {
                        self.select_word(q);
                        self.drag_anchor = None;
                        self.last_press = None;
                    } else {
                        self.start_sel(q);
                        self.last_press = Some(Instant::now());
                    }
                    PaneRequest::None
                }
                MouseButton::Middle => PaneRequest::Execute(self.token_at(q)),
                MouseButton::Right => PaneRequest::Plumb(self.token_at(q)),
                _ => PaneRequest::None,
            },
            MouseDir::Release => {
                self.stop_sel();
                PaneRequest::None
            }
            MouseDir::Move => {
                self.move_sel(q);
                PaneRequest::None
            }
            MouseDir::Step => {
                match m.button {
                    MouseButton::WheelUp => self.scroll_up(self.wheel_lines),
                    MouseButton::WheelDown => self.scroll_down(self.wheel_lines),
                    _ => {}
                }
                PaneRequest::None
            }
        }
    }

    /// Begin a drag selection: both ends at `q`, `q` pinned as the anchor.
    pub fn start_sel(&mut self, q: usize) {
        self.select(q, q);
        self.drag_anchor = Some(self.q0);
        self.frame.set_want_col(WantCol::AtQ0);
    }

    /// Update the free end of a drag; crossing the anchor swaps the ends.
    pub fn move_sel(&mut self, q: usize) {
        let Some(anchor) = self.drag_anchor else {
            return;
        };
        if q < anchor {
            self.select(q, anchor);
        } else {
            self.select(anchor, q);
        }
    }

    pub fn stop_sel(&mut self) {
        self.drag_anchor = None;
    }

    /// Expand `q` to the surrounding run of word runes and select it.
    pub fn select_word(&mut self, q: usize) {
        let (q0, q1) = self.expand(q, is_word_rune);
        self.select(q0, q1);
    }

    /// The text a middle or right click acts on: the selection when it
    /// contains `q`, otherwise the surrounding non-whitespace run.
    fn token_at(&mut self, q: usize) -> String {
        let (q0, q1) = if self.q0 != self.q1 && self.q0 <= q && q <= self.q1 {
            (self.q0, self.q1)
        } else {
            self.expand(q, is_path_rune)
        };
        self.read_range(q0, q1)
    }

    fn expand(&mut self, q: usize, pred: fn(char) -> bool) -> (usize, usize) {
        let mut q0 = q;
        let mut q1 = q;
        while q0 > 0 {
            match self.buf.rune_at(q0 - 1) {
                Some(c) if pred(c) => q0 -= 1,
                _ => break,
            }
        }
        loop {
            match self.buf.rune_at(q1) {
                Some(c) if pred(c) => q1 += 1,
                _ => break,
            }
        }
        (q0, q1)
    }

    /// The runes in `[q0, q1)` as a string.
    pub fn read_range(&mut self, q0: usize, q1: usize) -> String {
        let mut s = String::new();
        for q in q0..q1 {
            match self.buf.rune_at(q) {
                Some(c) => s.push(c),
                None => break,
            }
        }
        s
    }

    /// Whole buffer content. Search and tests.
    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.buf.buffer().to_vec()).into_owned()
    }

    /// Undo the last action and select the affected range.
    pub fn undo(&mut self) {
        if let Some((q0, q1)) = self.buf.undo() {
            self.frame.set_want_col(WantCol::AtQ1);
            self.select(q0, q1);
        }
    }

    /// Redo the last undone action and select the affected range.
    pub fn redo(&mut self) {
        if let Some((q0, q1)) = self.buf.redo() {
            self.frame.set_want_col(WantCol::AtQ1);
            self.select(q0, q1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pane(text: &str, w: usize, h: usize) -> TextPane {
        let mut p = TextPane::from_content(Content::from(text));
        p.set_size(w, h);
        p.load_text();
        p
    }

    #[test]
    fn insert_replaces_selection_and_advances() {
        let mut p = pane("hello world", 40, 10);
        p.select(0, 5);
        p.insert("goodbye");
        assert_eq!(p.content(), "goodbye world");
        assert_eq!(p.selection(), (7, 7));
    }

    #[test]
    fn delete_sel_collapses() {
        let mut p = pane("hello world", 40, 10);
        p.select(5, 11);
        p.delete_sel();
        assert_eq!(p.content(), "hello");
        assert_eq!(p.selection(), (5, 5));
    }

    #[test]
    fn select_clamps_to_buffer_end() {
        let mut p = pane("short", 40, 10);
        p.select(2, 400);
        assert_eq!(p.selection(), (2, 5));
    }

    #[test]
    fn backspace_with_empty_selection_extends_left() {
        let mut p = pane("abc", 40, 10);
        p.select(2, 2);
        p.handle_key(KeyPress::special(Key::Backspace));
        assert_eq!(p.content(), "ac");
        assert_eq!(p.selection(), (1, 1));
        // At offset 0 backspace is a no-op.
        p.select(0, 0);
        p.handle_key(KeyPress::special(Key::Backspace));
        assert_eq!(p.content(), "ac");
    }

    #[test]
    fn delete_key_with_empty_selection_extends_right() {
        let mut p = pane("abc", 40, 10);
        p.select(1, 1);
        p.handle_key(KeyPress::special(Key::Delete));
        assert_eq!(p.content(), "ac");
        // At the end nothing happens.
        p.select(2, 2);
        p.handle_key(KeyPress::special(Key::Delete));
        assert_eq!(p.content(), "ac");
    }

    #[test]
    fn enter_copies_indentation() {
        let mut p = pane("\tfoo bar", 40, 10);
        p.select(5, 5);
        p.handle_key(KeyPress::special(Key::Enter));
        assert_eq!(p.content(), "\tfoo \n\tbar");
        assert_eq!(p.selection(), (7, 7));
    }

    #[test]
    fn typed_burst_undoes_atomically() {
        let mut p = pane("", 40, 10);
        for c in "abc".chars() {
            p.handle_key(KeyPress::plain(c));
        }
        assert_eq!(p.content(), "abc");
        p.buffer_mut().commit_changes();
        for c in "def".chars() {
            p.handle_key(KeyPress::plain(c));
        }
        assert_eq!(p.content(), "abcdef");
        p.undo();
        assert_eq!(p.content(), "abc");
        p.undo();
        assert_eq!(p.content(), "");
        p.redo();
        assert_eq!(p.content(), "abc");
    }

    #[test]
    fn word_expansion_is_unicode_aware() {
        let mut p = pane("voilà déjà-vu fin", 40, 10);
        p.select_word(8);
        let (q0, q1) = p.selection();
        assert_eq!(p.read_range(q0, q1), "déjà");
    }

    #[test]
    fn drag_selection_swaps_on_crossover() {
        let mut p = pane("abcdefgh", 40, 10);
        p.start_sel(4);
        p.move_sel(6);
        assert_eq!(p.selection(), (4, 6));
        p.move_sel(1);
        assert_eq!(p.selection(), (1, 4));
        p.move_sel(5);
        assert_eq!(p.selection(), (4, 5));
        p.stop_sel();
        p.move_sel(7);
        assert_eq!(p.selection(), (4, 5));
    }

    #[test]
    fn token_at_prefers_containing_selection() {
        let mut p = pane("make src/main.rs", 40, 10);
        p.select(0, 4);
        assert_eq!(p.token_at(2), "make");
        // Outside the selection, expand by non-whitespace.
        assert_eq!(p.token_at(8), "src/main.rs");
    }

    #[test]
    fn vertical_motion_keeps_column() {
        let mut p = pane("long first line\nsh\nthird line", 40, 10);
        // Click at column 10 so the wanted column is captured there.
        p.start_sel(10);
        p.stop_sel();
        p.load_text();
        p.move_down();
        p.load_text();
        // Line 1 is "sh" (2 runes): the cursor clamps to its end.
        assert_eq!(p.selection(), (18, 18));
        p.move_down();
        p.load_text();
        // The wanted column is remembered: back out to column 10 on line 2.
        assert_eq!(p.selection().0, 19 + 10);
    }

    #[test]
    fn prev_new_line_counts_lines() {
        let mut p = pane("one\ntwo\nthree\nfour", 40, 10);
        assert_eq!(p.prev_new_line(16, 1), 14);
        assert_eq!(p.prev_new_line(16, 2), 8);
        assert_eq!(p.prev_new_line(16, 100), 0);
    }

    #[test]
    fn prev_new_line_bounds_long_lines() {
        let long = "x".repeat(300);
        let mut p = pane(&long, 40, 10);
        // One step back from 300 stops after 128 runes.
        assert_eq!(p.prev_new_line(300, 1), 172);
    }

    #[test]
    fn scrolling_moves_origin_by_lines() {
        let text: String = (0..20).map(|i| format!("line {}\n", i)).collect();
        let mut p = pane(&text, 40, 5);
        p.scroll_down(2);
        p.load_text();
        assert_eq!(p.origin(), 14); // "line 0\nline 1\n"
        p.scroll_up(1);
        assert_eq!(p.origin(), 7);
    }

    #[test]
    fn selection_past_frame_scrolls_origin() {
        let text: String = (0..50).map(|i| format!("l{}\n", i)).collect();
        let mut p = pane(&text, 10, 5);
        let far = text.chars().count() - 1;
        p.select(far, far);
        // The origin re-centers a few lines above the cursor.
        assert!(p.origin() > 0);
        assert!(p.origin() <= far);
        p.load_text();
        let (q0, _) = p.selection();
        assert!(q0 >= p.origin());
        assert!(q0 <= p.origin() + p.frame().nchars() + 1);
    }

    #[test]
    fn undo_selects_restored_range() {
        let mut p = pane("hello world", 40, 10);
        p.select(5, 11);
        p.delete_sel();
        p.buffer_mut().commit_changes();
        assert_eq!(p.content(), "hello");
        p.undo();
        assert_eq!(p.content(), "hello world");
        assert_eq!(p.selection(), (5, 11));
    }
}
