//! The editor: an ordered list of columns, the top tag, the filename
//! registry, and the focus/mode state the event loop drives.
//!
//! Layout is computed top-down on every refresh: the editor tag takes row
//! 0, each column gets its tag row and stacks its windows below it. Every
//! window has a one-cell gutter (the drag handle, doubling as the dirty
//! marker), a tag whose height follows its content, and a body filling the
//! rest of the band. The computed rectangles are kept for mouse routing and
//! for the renderer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use core_events::{Key, KeyPress, MouseButton, MouseDir, MouseInput};
use core_text::Content;
use tracing::{debug, info, warn};

use crate::clipboard::{Clipboard, LocalClipboard};
use crate::column::Column;
use crate::pane::{PaneRequest, TextPane};
use crate::window::{Window, WindowId};

pub const DEFAULT_EDITOR_TAG: &str = "Newcol Exit ";
/// Name of the shared error window.
pub const ERRORS_NAME: &str = "+Errors";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
}

/// Which pane receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Active {
    EditorTag,
    ColumnTag(usize),
    WindowTag(WindowId),
    WindowBody(WindowId),
}

/// Context a command executes in: the innermost tag it was invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecCtx {
    Editor,
    Column(usize),
    Window(WindowId),
}

/// A request the model cannot satisfy on its own, bubbled to the
/// dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorRequest {
    None,
    Execute { ctx: ExecCtx, cmd: String },
    Plumb { ctx: ExecCtx, text: String },
}

#[derive(Debug, Clone)]
pub struct EditorOptions {
    /// Lines per wheel notch.
    pub scroll_step: usize,
    pub double_click_ms: u64,
    /// Suffix of the staging file used by save.
    pub backup_suffix: String,
}

impl Default for EditorOptions {
    fn default() -> Self {
        EditorOptions {
            scroll_step: 3,
            double_click_ms: 300,
            backup_suffix: "~".into(),
        }
    }
}

/// Screen rectangle of one window, in cells.
#[derive(Debug, Clone, Copy)]
pub struct WinRect {
    pub id: WindowId,
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub tag_rows: usize,
    pub y1: usize,
}

#[derive(Debug, Clone)]
pub struct ColRect {
    pub x0: usize,
    pub x1: usize,
    pub wins: Vec<WinRect>,
}

#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub width: usize,
    pub height: usize,
    pub cols: Vec<ColRect>,
}

/// Rows reserved above the columns: the editor tag.
const EDITOR_TAG_ROWS: usize = 1;
const COLUMN_TAG_ROWS: usize = 1;

pub struct Editor {
    pub tag: TextPane,
    pub columns: Vec<Column>,
    pub mode: Mode,
    pub should_quit: bool,
    active: Active,
    registry: HashMap<PathBuf, WindowId>,
    next_id: u64,
    grabbed: Option<WindowId>,
    layout: Layout,
    options: EditorOptions,
    clipboard: Box<dyn Clipboard>,
}

impl Editor {
    pub fn new(options: EditorOptions) -> Self {
        let mut tag = TextPane::from_content(Content::from(DEFAULT_EDITOR_TAG));
        tag.set_double_click(Duration::from_millis(options.double_click_ms));
        Editor {
            tag,
            columns: Vec::new(),
            mode: Mode::Normal,
            should_quit: false,
            active: Active::EditorTag,
            registry: HashMap::new(),
            next_id: 1,
            grabbed: None,
            layout: Layout::default(),
            options,
            clipboard: Box::new(LocalClipboard::default()),
        }
    }

    pub fn set_clipboard(&mut self, clipboard: Box<dyn Clipboard>) {
        self.clipboard = clipboard;
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn active(&self) -> Active {
        self.active
    }

    pub fn set_active(&mut self, active: Active) {
        self.active = active;
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn alloc_id(&mut self) -> WindowId {
        let id = WindowId(self.next_id);
        self.next_id += 1;
        id
    }

    fn pane_options(&self) -> (Duration, usize) {
        (
            Duration::from_millis(self.options.double_click_ms),
            self.options.scroll_step,
        )
    }

    // -----------------------------------------------------------------
    // columns and windows
    // -----------------------------------------------------------------

    /// Create a column in the right half of the remaining space.
    pub fn new_column(&mut self) -> usize {
        let x = match self.columns.last() {
            None => 0.0,
            Some(c) => c.x() + (1.0 - c.x()) / 2.0,
        };
        let mut col = Column::new(x);
        col.tag
            .set_double_click(Duration::from_millis(self.options.double_click_ms));
        self.columns.push(col);
        self.columns.len() - 1
    }

    /// Delete a column and every window in it.
    pub fn delete_column(&mut self, idx: usize) {
        if idx >= self.columns.len() {
            return;
        }
        let col = self.columns.remove(idx);
        for win in &col.windows {
            self.registry.retain(|_, id| *id != win.id);
        }
        if let Some(first) = self.columns.first_mut() {
            first.set_x(0.0);
        }
        self.fix_active();
        self.quit_if_empty();
    }

    /// Create an empty window in the given column and focus its body.
    pub fn new_window(&mut self, col: usize) -> Option<WindowId> {
        let id = self.alloc_id();
        let (double_click, wheel) = self.pane_options();
        let column = self.columns.get_mut(col)?;
        let win = column.new_window(id);
        style_window(win, double_click, wheel);
        self.active = Active::WindowBody(id);
        Some(id)
    }

    /// Delete a window wherever it lives; quits when the last window goes.
    pub fn delete_window(&mut self, id: WindowId) -> Option<Window> {
        let col = self.locate(id)?.0;
        let win = self.columns[col].delete_window(id)?;
        self.registry.retain(|_, wid| *wid != id);
        self.fix_active();
        self.quit_if_empty();
        Some(win)
    }

    pub fn locate(&self, id: WindowId) -> Option<(usize, usize)> {
        for (ci, col) in self.columns.iter().enumerate() {
            if let Some(wi) = col.windows.iter().position(|w| w.id == id) {
                return Some((ci, wi));
            }
        }
        None
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.locate(id)
            .map(|(ci, wi)| &self.columns[ci].windows[wi])
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        let (ci, wi) = self.locate(id)?;
        Some(&mut self.columns[ci].windows[wi])
    }

    pub fn window_count(&self) -> usize {
        self.columns.iter().map(|c| c.windows.len()).sum()
    }

    fn quit_if_empty(&mut self) {
        if self.window_count() == 0 {
            info!(target: "model.editor", "last window closed");
            self.should_quit = true;
        }
    }

    fn fix_active(&mut self) {
        let valid = match self.active {
            Active::EditorTag => true,
            Active::ColumnTag(i) => i < self.columns.len(),
            Active::WindowTag(id) | Active::WindowBody(id) => self.locate(id).is_some(),
        };
        if !valid {
            self.active = self
                .columns
                .iter()
                .flat_map(|c| c.windows.first())
                .next()
                .map(|w| Active::WindowBody(w.id))
                .unwrap_or(Active::EditorTag);
        }
    }

    /// Open `path`, reusing an existing window when the file is already
    /// open.
    pub fn open_file(&mut self, path: &Path) -> anyhow::Result<WindowId> {
        if let Some(&id) = self.registry.get(path)
            && self.locate(id).is_some()
        {
            self.active = Active::WindowBody(id);
            return Ok(id);
        }
        if self.columns.is_empty() {
            self.new_column();
        }
        let id = self.alloc_id();
        let (double_click, wheel) = self.pane_options();
        let col = self.columns.len() - 1;
        let win = self.columns[col].new_window_file(id, path)?;
        style_window(win, double_click, wheel);
        self.registry.insert(path.to_path_buf(), id);
        self.active = Active::WindowBody(id);
        info!(target: "model.editor", file = %path.display(), "opened");
        Ok(id)
    }

    /// The shared `+Errors` window, created on first use in the last
    /// column.
    pub fn errors_window(&mut self) -> WindowId {
        let key = PathBuf::from(ERRORS_NAME);
        if let Some(&id) = self.registry.get(&key)
            && self.locate(id).is_some()
        {
            return id;
        }
        if self.columns.is_empty() {
            self.new_column();
        }
        // Error output must not steal focus.
        let prev_active = self.active;
        let col = self.columns.len() - 1;
        let id = self.new_window(col).expect("column index is in range");
        if let Some(win) = self.window_mut(id) {
            win.set_filename(Path::new(ERRORS_NAME));
        }
        self.registry.insert(key, id);
        self.active = prev_active;
        self.fix_active();
        id
    }

    /// Append a line to `+Errors`.
    pub fn append_error(&mut self, text: &str) {
        warn!(target: "model.editor", text, "error");
        let id = self.errors_window();
        if let Some(win) = self.window_mut(id) {
            let end = win.body.buffer_mut().end();
            win.body.select(end, end);
            win.body.insert(text);
            if !text.ends_with('\n') {
                win.body.insert("\n");
            }
            win.body.buffer_mut().commit_changes();
        }
    }

    // -----------------------------------------------------------------
    // layout
    // -----------------------------------------------------------------

    /// Recompute pane sizes for a `width x height` cell grid and rebuild
    /// every frame.
    pub fn refresh(&mut self, width: usize, height: usize) {
        self.tag.set_size(width, EDITOR_TAG_ROWS);
        self.tag.load_text();

        let mut cols = Vec::with_capacity(self.columns.len());
        let body_top = EDITOR_TAG_ROWS;
        let region_h = height.saturating_sub(body_top + COLUMN_TAG_ROWS);
        let ncols = self.columns.len();
        for ci in 0..ncols {
            let x0 = (self.columns[ci].x() * width as f64) as usize;
            let x1 = if ci + 1 < ncols {
                (self.columns[ci + 1].x() * width as f64) as usize
            } else {
                width
            };
            let x1 = x1.max(x0 + 1).min(width.max(x0 + 1));
            let cw = x1 - x0;

            let col = &mut self.columns[ci];
            col.tag.set_size(cw, COLUMN_TAG_ROWS);
            col.tag.load_text();

            let win_top = body_top + COLUMN_TAG_ROWS;
            let mut wins = Vec::with_capacity(col.windows.len());
            let nwins = col.windows.len();
            for wi in 0..nwins {
                let y0 = win_top + (col.windows[wi].y * region_h as f64) as usize;
                let y1 = if wi + 1 < nwins {
                    win_top + (col.windows[wi + 1].y * region_h as f64) as usize
                } else {
                    height
                };
                let y1 = y1.max(y0 + 1).min(height.max(y0 + 1));
                let band = y1 - y0;

                let win = &mut col.windows[wi];
                let inner_w = cw.saturating_sub(1).max(1);
                win.tag.set_size(inner_w, band.saturating_sub(1).max(1));
                win.tag.load_text();
                let tag_rows = win.tag.frame().line_count().min(band);
                win.body.set_size(inner_w, band - tag_rows.min(band));
                win.body.load_text();

                wins.push(WinRect {
                    id: win.id,
                    x0,
                    x1,
                    y0,
                    tag_rows,
                    y1,
                });
            }
            cols.push(ColRect { x0, x1, wins });
        }
        self.layout = Layout {
            width,
            height,
            cols,
        };
    }

    // -----------------------------------------------------------------
    // input routing
    // -----------------------------------------------------------------

    /// Route a mouse event to the pane under it. Returns whatever the pane
    /// asks for, tagged with its execution context.
    pub fn route_mouse(&mut self, m: MouseInput) -> EditorRequest {
        let (x, y) = (m.x as usize, m.y as usize);

        if let Some(id) = self.grabbed {
            if m.dir == MouseDir::Release {
                self.grabbed = None;
                self.drop_grabbed(id, x, y);
            }
            return EditorRequest::None;
        }

        if y < EDITOR_TAG_ROWS {
            if m.dir == MouseDir::Press {
                self.active = Active::EditorTag;
            }
            let p = self.tag.frame().chars_until_xy(x, y);
            let req = self.tag.handle_mouse(p, m);
            return self.wrap_request(ExecCtx::Editor, req);
        }

        let Some(ci) = self.column_at(x) else {
            return EditorRequest::None;
        };

        if y < EDITOR_TAG_ROWS + COLUMN_TAG_ROWS {
            let rel_x = x - self.layout.cols[ci].x0;
            // The layout can be one event older than the column list
            // within a burst.
            let Some(col) = self.columns.get_mut(ci) else {
                return EditorRequest::None;
            };
            if m.dir == MouseDir::Press {
                self.active = Active::ColumnTag(ci);
            }
            let p = col.tag.frame().chars_until_xy(rel_x, 0);
            let req = col.tag.handle_mouse(p, m);
            return self.wrap_request(ExecCtx::Column(ci), req);
        }

        let Some(rect) = self
            .layout
            .cols
            .get(ci)
            .and_then(|c| c.wins.iter().find(|r| y >= r.y0 && y < r.y1).copied())
        else {
            return EditorRequest::None;
        };

        // The gutter column grabs the window for a move.
        if x == rect.x0 {
            if m.dir == MouseDir::Press && m.button == MouseButton::Left {
                debug!(target: "model.editor", id = rect.id.0, "grab");
                self.grabbed = Some(rect.id);
            }
            return EditorRequest::None;
        }

        let rel_x = x - (rect.x0 + 1);
        let id = rect.id;
        let in_tag = y < rect.y0 + rect.tag_rows;
        let Some(win) = self.window_mut(id) else {
            return EditorRequest::None;
        };
        let req = if in_tag {
            let p = win.tag.frame().chars_until_xy(rel_x, y - rect.y0);
            win.tag.handle_mouse(p, m)
        } else {
            let p = win
                .body
                .frame()
                .chars_until_xy(rel_x, y - (rect.y0 + rect.tag_rows));
            win.body.handle_mouse(p, m)
        };
        if m.dir == MouseDir::Press {
            self.active = if in_tag {
                Active::WindowTag(id)
            } else {
                Active::WindowBody(id)
            };
        }
        self.wrap_request(ExecCtx::Window(id), req)
    }

    fn wrap_request(&mut self, ctx: ExecCtx, req: PaneRequest) -> EditorRequest {
        match req {
            PaneRequest::None => EditorRequest::None,
            PaneRequest::Execute(cmd) => EditorRequest::Execute { ctx, cmd },
            PaneRequest::Plumb(text) => EditorRequest::Plumb { ctx, text },
        }
    }

    fn column_at(&self, x: usize) -> Option<usize> {
        self.layout
            .cols
            .iter()
            .position(|c| x >= c.x0 && x < c.x1)
    }

    /// Drop a grabbed window at screen position `(x, y)`, possibly moving
    /// it to another column.
    fn drop_grabbed(&mut self, id: WindowId, x: usize, y: usize) {
        let Some(target_col) = self.column_at(x) else {
            return;
        };
        let Some((source_col, _)) = self.locate(id) else {
            return;
        };
        let region_h = self
            .layout
            .height
            .saturating_sub(EDITOR_TAG_ROWS + COLUMN_TAG_ROWS)
            .max(1);
        let rel = y.saturating_sub(EDITOR_TAG_ROWS + COLUMN_TAG_ROWS) as f64 / region_h as f64;
        let rel = rel.clamp(0.0, 0.999);
        if target_col == source_col {
            self.columns[source_col].move_window(id, rel);
        } else if let Some(win) = self.columns[source_col].delete_window(id) {
            debug!(target: "model.editor", id = id.0, from = source_col, to = target_col, "move window across columns");
            self.columns[target_col].attach_window(win, rel);
        }
    }

    // -----------------------------------------------------------------
    // keyboard and clipboard
    // -----------------------------------------------------------------

    pub fn active_window_id(&self) -> Option<WindowId> {
        match self.active {
            Active::WindowTag(id) | Active::WindowBody(id) => Some(id),
            _ => None,
        }
    }

    pub fn active_pane_mut(&mut self) -> Option<&mut TextPane> {
        match self.active {
            Active::EditorTag => Some(&mut self.tag),
            Active::ColumnTag(i) => self.columns.get_mut(i).map(|c| &mut c.tag),
            Active::WindowTag(id) => self.window_mut(id).map(|w| &mut w.tag),
            Active::WindowBody(id) => self.window_mut(id).map(|w| &mut w.body),
        }
    }

    /// Insert-mode keys: clipboard chords, Escape back to normal mode, and
    /// plain editing on the focused pane.
    pub fn handle_insert_key(&mut self, k: KeyPress) {
        if k.key == Key::Escape {
            if let Some(pane) = self.active_pane_mut() {
                pane.buffer_mut().commit_changes();
            }
            self.mode = Mode::Normal;
            return;
        }
        if self.handle_clipboard_key(k) {
            return;
        }
        if let Some(pane) = self.active_pane_mut() {
            pane.handle_key(k);
        }
    }

    /// Ctrl-C / Ctrl-X / Ctrl-V in any mode. Returns whether the key was
    /// consumed.
    pub fn handle_clipboard_key(&mut self, k: KeyPress) -> bool {
        if !k.is_ctrl() {
            return false;
        }
        let op = match k.key {
            Key::Char('c') => ClipOp::Copy,
            Key::Char('x') => ClipOp::Cut,
            Key::Char('v') => ClipOp::Paste,
            _ => return false,
        };
        let active = self.active;
        let Editor {
            tag,
            columns,
            clipboard,
            ..
        } = self;
        let Some(pane) = pane_in(tag, columns, active) else {
            return true;
        };
        match op {
            ClipOp::Copy => {
                let (q0, q1) = pane.selection();
                let s = pane.read_range(q0, q1);
                if !s.is_empty() {
                    clipboard.set(s);
                }
            }
            ClipOp::Cut => {
                let (q0, q1) = pane.selection();
                let s = pane.read_range(q0, q1);
                if !s.is_empty() {
                    clipboard.set(s);
                    pane.delete_sel();
                    pane.buffer_mut().commit_changes();
                }
            }
            ClipOp::Paste => {
                if let Some(s) = clipboard.get() {
                    pane.insert(&s);
                    pane.buffer_mut().commit_changes();
                }
            }
        }
        true
    }

    // -----------------------------------------------------------------
    // plumbing
    // -----------------------------------------------------------------

    /// Right-click resolution: an existing path opens (once); otherwise the
    /// text is searched for in the window it was plumbed from.
    pub fn plumb(&mut self, ctx: ExecCtx, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if fs::metadata(text).is_ok() {
            if let Err(e) = self.open_file(Path::new(text)) {
                self.append_error(&format!("{}: {:#}", text, e));
            }
            return;
        }
        if let ExecCtx::Window(id) = ctx
            && let Some(win) = self.window_mut(id)
        {
            win.find_next_exact_match(text);
        }
    }
}

enum ClipOp {
    Copy,
    Cut,
    Paste,
}

fn style_window(win: &mut Window, double_click: Duration, wheel: usize) {
    win.tag.set_double_click(double_click);
    win.body.set_double_click(double_click);
    win.tag.set_wheel_lines(wheel);
    win.body.set_wheel_lines(wheel);
}

fn pane_in<'a>(
    tag: &'a mut TextPane,
    columns: &'a mut [Column],
    active: Active,
) -> Option<&'a mut TextPane> {
    match active {
        Active::EditorTag => Some(tag),
        Active::ColumnTag(i) => columns.get_mut(i).map(|c| &mut c.tag),
        Active::WindowTag(id) => columns
            .iter_mut()
            .find_map(|c| c.window_mut(id))
            .map(|w| &mut w.tag),
        Active::WindowBody(id) => columns
            .iter_mut()
            .find_map(|c| c.window_mut(id))
            .map(|w| &mut w.body),
    }
}
