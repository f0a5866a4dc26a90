//! A column: an ordered stack of windows with relative vertical positions.
//!
//! Window positions live in `[0, 1)` along the column; the first window is
//! pinned to 0 and each window's band extends to the next window's position
//! (or the bottom). Removing a window re-pins the new first one.

use std::fs;
use std::io;
use std::path::Path;

use core_text::Content;
use tracing::debug;

use crate::pane::TextPane;
use crate::window::{Window, WindowId};

pub const DEFAULT_COLUMN_TAG: &str = "New Delcol ";

pub struct Column {
    pub tag: TextPane,
    pub windows: Vec<Window>,
    /// Relative horizontal position in `[0, 1)` along the editor.
    x: f64,
}

impl Column {
    pub fn new(x: f64) -> Self {
        Column {
            tag: TextPane::from_content(Content::from(DEFAULT_COLUMN_TAG)),
            windows: Vec::new(),
            x,
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn set_x(&mut self, x: f64) {
        self.x = x;
    }

    /// Create an empty window. A new window takes the lower half of the
    /// last window's band.
    pub fn new_window(&mut self, id: WindowId) -> &mut Window {
        let y = match self.windows.last() {
            None => 0.0,
            Some(last) => last.y + (1.0 - last.y) / 2.0,
        };
        let mut win = Window::new(id, Content::Empty);
        win.y = y;
        self.windows.push(win);
        self.windows.last_mut().expect("window was just pushed")
    }

    /// Open `path` in a new window. A missing file yields an empty window
    /// that remembers the name for a later save; other I/O errors are
    /// returned.
    pub fn new_window_file(&mut self, id: WindowId, path: &Path) -> io::Result<&mut Window> {
        let content = match fs::File::open(path) {
            Ok(f) => Content::map_file(&f)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(target: "model.column", file = %path.display(), "new file");
                Content::Empty
            }
            Err(e) => return Err(e),
        };
        let y = match self.windows.last() {
            None => 0.0,
            Some(last) => last.y + (1.0 - last.y) / 2.0,
        };
        let mut win = Window::new(id, content);
        win.y = y;
        win.set_filename(path);
        self.windows.push(win);
        Ok(self.windows.last_mut().expect("window was just pushed"))
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    fn index_of(&self, id: WindowId) -> Option<usize> {
        self.windows.iter().position(|w| w.id == id)
    }

    /// Remove a window, re-pinning the new first window to position 0.
    pub fn delete_window(&mut self, id: WindowId) -> Option<Window> {
        let idx = self.index_of(id)?;
        let win = self.windows.remove(idx);
        if let Some(first) = self.windows.first_mut() {
            first.y = 0.0;
        }
        Some(win)
    }

    /// Index of the window whose band contains `y`.
    fn band_index(&self, y: f64) -> Option<usize> {
        for i in 0..self.windows.len() {
            let top = self.windows[i].y;
            let bottom = self
                .windows
                .get(i + 1)
                .map(|w| w.y)
                .unwrap_or(1.0);
            if y >= top && y < bottom {
                return Some(i);
            }
        }
        None
    }

    /// Move a window to vertical position `y`. When the window already
    /// borders the target band only its position changes; otherwise it is
    /// re-spliced after the target window. Dropping a window exactly onto
    /// another's top edge is refused, as is displacing the pinned first
    /// window. Returns whether anything moved.
    pub fn move_window(&mut self, id: WindowId, y: f64) -> bool {
        if self.windows.len() < 2 {
            return false;
        }
        let Some(from) = self.index_of(id) else {
            return false;
        };
        let Some(target) = self.band_index(y) else {
            return false;
        };
        if y == self.windows[target].y {
            // A zero-height band would hide the target window.
            return false;
        }
        if from == target || from == target + 1 {
            if from == 0 {
                return false;
            }
            self.windows[from].y = y;
            return true;
        }
        let mut win = self.windows.remove(from);
        win.y = y;
        let insert_at = if from < target { target } else { target + 1 };
        self.windows.insert(insert_at, win);
        if let Some(first) = self.windows.first_mut() {
            first.y = 0.0;
        }
        true
    }

    /// Splice a window from another column into the band containing `y`.
    pub fn attach_window(&mut self, mut win: Window, y: f64) {
        let Some(target) = self.band_index(y) else {
            win.y = 0.0;
            self.windows.push(win);
            return;
        };
        let top = self.windows[target].y;
        let bottom = self
            .windows
            .get(target + 1)
            .map(|w| w.y)
            .unwrap_or(1.0);
        // Land strictly inside the band so neither window vanishes.
        win.y = if y > top { y } else { top + (bottom - top) / 2.0 };
        self.windows.insert(target + 1, win);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn column_with(n: usize) -> Column {
        let mut c = Column::new(0.0);
        for i in 0..n {
            c.new_window(WindowId(i as u64));
        }
        c
    }

    fn ys(c: &Column) -> Vec<f64> {
        c.windows.iter().map(|w| w.y).collect()
    }

    fn ids(c: &Column) -> Vec<u64> {
        c.windows.iter().map(|w| w.id.0).collect()
    }

    #[test]
    fn windows_split_the_remaining_space() {
        let c = column_with(3);
        assert_eq!(ys(&c), vec![0.0, 0.5, 0.75]);
    }

    #[test]
    fn deleting_repins_the_first_window() {
        let mut c = column_with(3);
        let removed = c.delete_window(WindowId(0)).unwrap();
        assert_eq!(removed.id, WindowId(0));
        assert_eq!(ids(&c), vec![1, 2]);
        assert_eq!(c.windows[0].y, 0.0);
    }

    #[test]
    fn move_into_adjacent_band_adjusts_y_only() {
        let mut c = column_with(3);
        // Window 2 dropped inside window 1's band: still after window 1, so
        // only its position changes.
        assert!(c.move_window(WindowId(2), 0.6));
        assert_eq!(ids(&c), vec![0, 1, 2]);
        assert_eq!(ys(&c), vec![0.0, 0.5, 0.6]);
    }

    #[test]
    fn move_splices_after_target_band() {
        let mut c = column_with(3);
        // Window 0's band is [0, 0.5); dropping window 2 there splices it
        // after window 0.
        assert!(c.move_window(WindowId(2), 0.25));
        assert_eq!(ids(&c), vec![0, 2, 1]);
        assert_eq!(ys(&c), vec![0.0, 0.25, 0.5]);
    }

    #[test]
    fn move_onto_a_window_top_is_refused() {
        let mut c = column_with(3);
        assert!(!c.move_window(WindowId(2), 0.5));
        assert_eq!(ids(&c), vec![0, 1, 2]);
    }

    #[test]
    fn first_window_stays_pinned() {
        let mut c = column_with(2);
        // Window 0 dropped within its own band: refused, it is pinned.
        assert!(!c.move_window(WindowId(0), 0.2));
        assert_eq!(ys(&c), vec![0.0, 0.5]);
        // Moving window 1 to the very top splices nothing (it is already
        // the successor) and cannot displace the pinned window.
        assert!(c.move_window(WindowId(1), 0.3));
        assert_eq!(ys(&c), vec![0.0, 0.3]);
    }

    #[test]
    fn single_window_cannot_move() {
        let mut c = column_with(1);
        assert!(!c.move_window(WindowId(0), 0.5));
    }

    #[test]
    fn attach_lands_inside_the_band() {
        let mut c = column_with(2); // bands [0,0.5) and [0.5,1)
        let w = Window::new(WindowId(9), Content::Empty);
        c.attach_window(w, 0.7);
        assert_eq!(ids(&c), vec![0, 1, 9]);
        assert_eq!(ys(&c), vec![0.0, 0.5, 0.7]);
    }

    #[test]
    fn attach_into_empty_column() {
        let mut c = Column::new(0.0);
        let w = Window::new(WindowId(9), Content::Empty);
        c.attach_window(w, 0.7);
        assert_eq!(ys(&c), vec![0.0]);
    }

    #[test]
    fn missing_file_opens_empty_with_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.txt");
        let mut c = Column::new(0.0);
        let w = c.new_window_file(WindowId(1), &path).unwrap();
        assert_eq!(w.filename(), Some(path.as_path()));
        assert_eq!(w.body.content(), "");
    }

    #[test]
    fn existing_file_is_mapped_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("real.txt");
        fs::write(&path, "file body\n").unwrap();
        let mut c = Column::new(0.0);
        let w = c.new_window_file(WindowId(1), &path).unwrap();
        assert_eq!(w.body.content(), "file body\n");
        assert_eq!(w.read_filename(), Some(path.display().to_string()));
    }
}
