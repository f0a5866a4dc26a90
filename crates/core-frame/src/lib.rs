//! The rendered grid of a text pane.
//!
//! A [`Frame`] is rebuilt on every repaint by streaming runes from the pane's
//! origin: lines wrap at the pane width and break on `\n`, tabs expand to the
//! next 8-column stop, and layout stops after `height` lines. While laying
//! out, the frame records the grid coordinates of the selection endpoints and
//! resolves a pending [`WantCol`] request, which is how vertical motion
//! remembers its column across ragged lines.
//!
//! Lines store the runes they were built from, including a terminating `\n`
//! where one exists, so [`Frame::chars_until_xy`] can invert the layout: it
//! returns the rune count from the origin to a grid position, and composing
//! it with the recorded selection coordinates is the identity for in-frame
//! positions.

pub const TAB_STOP: usize = 8;

/// Width of a tab starting at `col`, always in `1..=TAB_STOP`.
pub fn tab_width_for_col(col: usize) -> usize {
    TAB_STOP - col % TAB_STOP
}

/// Remembered column for vertical motion. The `AtQ0`/`AtQ1` states ask the
/// next layout to capture the column where the respective selection endpoint
/// lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WantCol {
    AtQ0,
    AtQ1,
    Col(usize),
}

impl WantCol {
    /// The resolved column; an unresolved request reads as column 0.
    pub fn col(self) -> usize {
        match self {
            WantCol::Col(c) => c,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Push {
    /// The rune was laid out and there is room for more.
    Fitted,
    /// The grid is full; stop feeding runes.
    Full,
}

#[derive(Debug)]
pub struct Frame {
    lines: Vec<Vec<char>>,
    line0: usize,
    col0: usize,
    line1: usize,
    col1: usize,
    want_col: WantCol,
    nchars: usize,

    width: usize,
    height: usize,
    sel0: Option<usize>,
    sel1: Option<usize>,
    x: usize,
    y: usize,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            lines: vec![Vec::new()],
            line0: 0,
            col0: 0,
            line1: 0,
            col1: 0,
            want_col: WantCol::Col(0),
            nchars: 0,
            width: 0,
            height: 0,
            sel0: None,
            sel1: None,
            x: 0,
            y: 0,
        }
    }

    /// Start a new layout. `sel0`/`sel1` are the selection endpoints
    /// relative to the origin, or `None` when an endpoint lies before it.
    /// The pending `want_col` request survives across layouts until
    /// resolved.
    pub fn begin(&mut self, width: usize, height: usize, sel0: Option<usize>, sel1: Option<usize>) {
        self.lines.clear();
        self.lines.push(Vec::new());
        self.line0 = 0;
        self.col0 = 0;
        self.line1 = 0;
        self.col1 = 0;
        self.nchars = 0;
        self.width = width;
        self.height = height;
        self.sel0 = sel0;
        self.sel1 = sel1;
        self.x = 0;
        self.y = 0;
        self.check_selection();
    }

    fn check_selection(&mut self) {
        if self.sel0 == Some(self.nchars) {
            self.line0 = self.y;
            self.col0 = self.x;
            if self.want_col == WantCol::AtQ0 {
                self.want_col = WantCol::Col(self.x);
            }
        }
        if self.sel1 == Some(self.nchars) {
            self.line1 = self.y;
            self.col1 = self.x;
            if self.want_col == WantCol::AtQ1 {
                self.want_col = WantCol::Col(self.x);
            }
        }
    }

    /// Lay out one rune. Returns [`Push::Full`] once the grid has no room
    /// left; the rune that filled the last cell is still part of the frame.
    pub fn push_rune(&mut self, r: char) -> Push {
        if self.y >= self.height {
            return Push::Full;
        }
        self.lines[self.y].push(r);
        if r == '\t' {
            self.x += tab_width_for_col(self.x);
        } else {
            self.x += 1;
        }
        self.nchars += 1;
        if self.x >= self.width || r == '\n' {
            self.y += 1;
            self.x = 0;
            if self.y == self.height {
                return Push::Full;
            }
            self.lines.push(Vec::new());
        }
        self.check_selection();
        Push::Fitted
    }

    /// Rebuild the frame by streaming runes from `origin` until the grid is
    /// full or `read` runs out. `read` is called with absolute rune
    /// positions.
    pub fn rebuild(
        &mut self,
        width: usize,
        height: usize,
        origin: usize,
        q0: usize,
        q1: usize,
        mut read: impl FnMut(usize) -> Option<char>,
    ) {
        self.begin(width, height, q0.checked_sub(origin), q1.checked_sub(origin));
        let mut p = origin;
        while let Some(r) = read(p) {
            if self.push_rune(r) == Push::Full {
                break;
            }
            p += 1;
        }
    }

    /// Number of runes laid out in the frame.
    pub fn nchars(&self) -> usize {
        self.nchars
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn rows(&self) -> &[Vec<char>] {
        &self.lines
    }

    /// Grid lines of the selection endpoints as of the last layout.
    pub fn selection_lines(&self) -> (usize, usize) {
        (self.line0, self.line1)
    }

    /// Grid coordinates `(line, col)` of the q0 endpoint.
    pub fn q0_cell(&self) -> (usize, usize) {
        (self.line0, self.col0)
    }

    pub fn want_col(&self) -> WantCol {
        self.want_col
    }

    pub fn set_want_col(&mut self, w: WantCol) {
        self.want_col = w;
    }

    /// Runes from the origin to the grid position `(x, y)`. Positions below
    /// the laid-out lines map to `nchars`.
    pub fn chars_until_xy(&self, x: usize, y: usize) -> usize {
        if y >= self.lines.len() {
            return self.nchars;
        }
        let mut p = 0;
        for (n, l) in self.lines.iter().enumerate() {
            if n == y {
                return p + chars_until_x(l, x);
            }
            p += l.len();
        }
        self.nchars
    }
}

/// Runes of line `s` that lie strictly left of column `x`. A trailing
/// newline is never counted, so clicking past the end of a line lands before
/// its break.
fn chars_until_x(s: &[char], x: usize) -> usize {
    if s.is_empty() {
        return 0;
    }
    let mut w = 0;
    for (i, &r) in s.iter().enumerate() {
        if r == '\t' {
            w += tab_width_for_col(w);
        } else {
            w += 1;
        }
        if w > x {
            return i;
        }
    }
    if s[s.len() - 1] == '\n' {
        s.len() - 1
    } else {
        s.len()
    }
}
