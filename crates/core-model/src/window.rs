//! A window: a tag strip and a body, plus the file they stand for.
//!
//! The tag buffer holds `"<filename>\x00<commands>"`; the NUL separates the
//! file name from the editable command area. Saving streams the body buffer
//! into `<name><suffix>` and renames over the target, so an interrupted
//! save never corrupts the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use core_text::Content;
use regex::Regex;
use tracing::{debug, info};

use crate::pane::TextPane;

pub const DEFAULT_WINDOW_TAG: &str = "\0Del Put Undo Redo ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

pub struct Window {
    pub id: WindowId,
    pub tag: TextPane,
    pub body: TextPane,
    filename: Option<PathBuf>,
    /// Relative vertical position in `[0, 1)` along the column.
    pub y: f64,
}

impl Window {
    pub fn new(id: WindowId, content: Content) -> Self {
        Window {
            id,
            tag: TextPane::from_content(Content::from(DEFAULT_WINDOW_TAG)),
            body: TextPane::from_content(content),
            filename: None,
            y: 0.0,
        }
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    /// Name the window: the name goes into the tag ahead of the NUL and the
    /// tag cursor moves past it.
    pub fn set_filename(&mut self, name: &Path) {
        let text = name.display().to_string();
        if let Err(e) = self.tag.buffer_mut().insert(0, &text) {
            debug!(target: "model.window", ?e, "tag insert failed");
        }
        self.tag.buffer_mut().commit_changes();
        let q = text.chars().count();
        self.tag.select(q, q);
        self.filename = Some(name.to_path_buf());
    }

    /// The file name as written in the tag: everything before the NUL.
    pub fn read_filename(&mut self) -> Option<String> {
        let mut name = String::new();
        let mut p = 0;
        loop {
            match self.tag.buffer_mut().rune_at(p) {
                Some('\0') | None => break,
                Some(c) => {
                    name.push(c);
                    p += 1;
                }
            }
        }
        if name.is_empty() { None } else { Some(name) }
    }

    pub fn dirty(&self) -> bool {
        self.body.buffer().dirty()
    }

    /// Write the body to disk: stream into `<name><suffix>`, then rename
    /// onto the target. Clears the dirty state on success.
    pub fn save_file(&mut self, backup_suffix: &str) -> Result<()> {
        let name = match &self.filename {
            Some(n) => n.clone(),
            None => {
                let n = self
                    .read_filename()
                    .ok_or_else(|| anyhow!("window has no file name"))?;
                let path = PathBuf::from(n);
                self.filename = Some(path.clone());
                path
            }
        };
        let staging = PathBuf::from(format!("{}{}", name.display(), backup_suffix));
        {
            let mut f = fs::File::create(&staging)
                .with_context(|| format!("create {}", staging.display()))?;
            let mut reader = self.body.buffer().buffer().reader_at(0);
            std::io::copy(&mut reader, &mut f)
                .with_context(|| format!("write {}", staging.display()))?;
            f.sync_all().ok();
        }
        fs::rename(&staging, &name)
            .with_context(|| format!("rename {} to {}", staging.display(), name.display()))?;
        self.body.buffer_mut().mark_saved();
        info!(target: "model.window", file = %name.display(), "saved");
        Ok(())
    }

    /// Select the next literal occurrence of `s` in the body, scanning from
    /// the end of the current selection and wrapping to the start. Returns
    /// whether a match was found.
    pub fn find_next_exact_match(&mut self, s: &str) -> bool {
        if s.is_empty() {
            return false;
        }
        let text = self.body.content();
        let Ok(re) = Regex::new(&regex::escape(s)) else {
            return false;
        };
        let (_, q1) = self.body.selection();
        let from_byte = byte_of_rune(&text, q1);
        let m = re
            .find_at(&text, from_byte)
            .or_else(|| re.find(&text))
            .map(|m| (m.start(), m.end()));
        let Some((b0, b1)) = m else {
            return false;
        };
        let q0 = rune_of_byte(&text, b0);
        let q1 = rune_of_byte(&text, b1);
        self.body.select(q0, q1);
        debug!(target: "model.window", q0, q1, "match");
        true
    }

    pub fn undo(&mut self) {
        self.body.undo();
    }

    pub fn redo(&mut self) {
        self.body.redo();
    }
}

fn byte_of_rune(s: &str, q: usize) -> usize {
    s.char_indices().nth(q).map(|(b, _)| b).unwrap_or(s.len())
}

fn rune_of_byte(s: &str, b: usize) -> usize {
    s[..b.min(s.len())].chars().count()
}
