//! Full-repaint terminal renderer.
//!
//! Every frame paints the complete cell grid from the model: the editor tag
//! row, then each column's tag and windows. A window is a one-cell gutter
//! (doubling as the dirty marker), a tag, and a body; panes blit their
//! frames with per-cell selection styling, so the renderer itself holds no
//! state beyond the output handle. Color changes are coalesced to keep the
//! write stream small.
//!
//! The palette is the classic Acme paper scheme: pale yellow bodies with
//! olive selections, pale blue tags with cyan selections.

use std::io::Write;

use anyhow::Result;
use core_frame::tab_width_for_col;
use core_model::{Editor, TextPane, WinRect};
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Colors, Print, SetColors},
    terminal::{BeginSynchronizedUpdate, EndSynchronizedUpdate},
};
use tracing::trace;

const FG: Color = Color::Rgb { r: 0, g: 0, b: 0 };
const BODY_BG: Color = Color::Rgb {
    r: 0xff,
    g: 0xff,
    b: 0xea,
};
const BODY_SEL: Color = Color::Rgb {
    r: 0xe0,
    g: 0xe0,
    b: 0x90,
};
const TAG_BG: Color = Color::Rgb {
    r: 0xea,
    g: 0xff,
    b: 0xff,
};
const TAG_SEL: Color = Color::Rgb {
    r: 0x90,
    g: 0xe0,
    b: 0xe0,
};
const DIRTY_MARK: Color = Color::Rgb {
    r: 0,
    g: 0,
    b: 0x99,
};

#[derive(Clone, Copy)]
struct Palette {
    bg: Color,
    sel: Color,
}

const TAG: Palette = Palette {
    bg: TAG_BG,
    sel: TAG_SEL,
};
const BODY: Palette = Palette {
    bg: BODY_BG,
    sel: BODY_SEL,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum CellStyle {
    Plain,
    Selected,
    Cursor,
}

pub struct Renderer<W: Write> {
    out: W,
    last_colors: Option<Colors>,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Renderer {
            out,
            last_colors: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Paint the whole editor. Assumes `editor.refresh()` ran since the
    /// last model change.
    pub fn draw(&mut self, ed: &Editor) -> Result<()> {
        let layout = ed.layout().clone();
        trace!(target: "render", w = layout.width, h = layout.height, "draw");
        queue!(self.out, BeginSynchronizedUpdate)?;
        self.last_colors = None;

        self.draw_pane(&ed.tag, 0, 0, layout.width, 1, TAG)?;

        if layout.cols.is_empty() {
            for y in 1..layout.height {
                self.fill_row(0, y, layout.width, BODY.bg)?;
            }
        }
        for (ci, colrect) in layout.cols.iter().enumerate() {
            let Some(col) = ed.columns.get(ci) else {
                continue;
            };
            let cw = colrect.x1 - colrect.x0;
            self.draw_pane(&col.tag, colrect.x0, 1, cw, 1, TAG)?;
            for rect in &colrect.wins {
                if let Some(win) = ed.window(rect.id) {
                    self.draw_window(win, rect)?;
                }
            }
            // Unused space below the column's windows.
            let bottom = colrect.wins.last().map(|r| r.y1).unwrap_or(2);
            for y in bottom..layout.height {
                self.fill_row(colrect.x0, y, cw, BODY.bg)?;
            }
        }

        queue!(self.out, EndSynchronizedUpdate)?;
        self.out.flush()?;
        Ok(())
    }

    fn draw_window(&mut self, win: &core_model::Window, rect: &WinRect) -> Result<()> {
        let w = rect.x1 - rect.x0;
        // Gutter: the drag handle; its top cell shows the dirty state.
        for y in rect.y0..rect.y1 {
            let bg = if y == rect.y0 && win.dirty() {
                DIRTY_MARK
            } else if y < rect.y0 + rect.tag_rows {
                TAG.bg
            } else {
                BODY.bg
            };
            self.fill_row(rect.x0, y, 1, bg)?;
        }
        let inner_w = w.saturating_sub(1);
        self.draw_pane(&win.tag, rect.x0 + 1, rect.y0, inner_w, rect.tag_rows, TAG)?;
        let body_h = rect.y1 - rect.y0 - rect.tag_rows;
        self.draw_pane(
            &win.body,
            rect.x0 + 1,
            rect.y0 + rect.tag_rows,
            inner_w,
            body_h,
            BODY,
        )?;
        Ok(())
    }

    /// Blit one pane's frame. Selection endpoints are styled per cell; the
    /// collapsed selection renders as a reverse-video cursor block that
    /// covers exactly one cell.
    fn draw_pane(
        &mut self,
        pane: &TextPane,
        x: usize,
        y: usize,
        w: usize,
        h: usize,
        pal: Palette,
    ) -> Result<()> {
        let frame = pane.frame();
        let origin = pane.origin() as isize;
        let (q0, q1) = pane.selection();
        let p0 = q0 as isize - origin;
        let p1 = q1 as isize - origin;

        let style_at = |p: isize| {
            if p == p0 && p0 == p1 {
                CellStyle::Cursor
            } else if p >= p0 && p < p1 {
                CellStyle::Selected
            } else {
                CellStyle::Plain
            }
        };

        let mut p: isize = 0;
        for row in 0..h {
            queue!(self.out, MoveTo((x) as u16, (y + row) as u16))?;
            let mut cx = 0usize;
            let mut style = CellStyle::Plain;
            if let Some(line) = frame.rows().get(row) {
                let mut broke_on_newline = false;
                for &r in line {
                    style = style_at(p);
                    p += 1;
                    if r == '\n' {
                        // The newline's style (selection or cursor) spills
                        // into the rest of the row.
                        broke_on_newline = true;
                        break;
                    }
                    let (ch, cells) = match r {
                        '\t' => (' ', tab_width_for_col(cx)),
                        '\0' => (' ', 1),
                        _ => (r, 1),
                    };
                    for _ in 0..cells {
                        if cx >= w {
                            break;
                        }
                        self.put(ch, style, pal)?;
                        cx += 1;
                        if style == CellStyle::Cursor {
                            style = CellStyle::Plain;
                        }
                    }
                }
                if !broke_on_newline {
                    // The position just past the line: where a cursor at
                    // end-of-line sits.
                    style = style_at(p);
                }
            }
            while cx < w {
                self.put(' ', style, pal)?;
                cx += 1;
                if style == CellStyle::Cursor {
                    style = CellStyle::Plain;
                }
            }
        }
        Ok(())
    }

    fn put(&mut self, ch: char, style: CellStyle, pal: Palette) -> Result<()> {
        let colors = match style {
            CellStyle::Plain => Colors::new(FG, pal.bg),
            CellStyle::Selected => Colors::new(FG, pal.sel),
            CellStyle::Cursor => Colors::new(pal.bg, FG),
        };
        self.set_colors(colors)?;
        queue!(self.out, Print(ch))?;
        Ok(())
    }

    fn fill_row(&mut self, x: usize, y: usize, w: usize, bg: Color) -> Result<()> {
        queue!(self.out, MoveTo(x as u16, y as u16))?;
        self.set_colors(Colors::new(FG, bg))?;
        for _ in 0..w {
            queue!(self.out, Print(' '))?;
        }
        Ok(())
    }

    fn set_colors(&mut self, colors: Colors) -> Result<()> {
        if self.last_colors != Some(colors) {
            queue!(self.out, SetColors(colors))?;
            self.last_colors = Some(colors);
        }
        Ok(())
    }
}
