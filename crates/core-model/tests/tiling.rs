//! Layout and mouse-routing behavior across the whole editor tree.

use core_events::{MouseButton, MouseDir, MouseInput};
use core_model::{Active, Editor, EditorOptions, EditorRequest, ExecCtx};
use pretty_assertions::assert_eq;

fn mouse(dir: MouseDir, button: MouseButton, x: usize, y: usize) -> MouseInput {
    MouseInput {
        dir,
        button,
        x: x as u16,
        y: y as u16,
    }
}

fn build(cols: &[usize]) -> Editor {
    let mut ed = Editor::new(EditorOptions::default());
    for &wins in cols {
        let c = ed.new_column();
        for _ in 0..wins {
            ed.new_window(c);
        }
    }
    ed.refresh(100, 40);
    ed
}

#[test]
fn layout_tiles_the_screen_without_gaps() {
    for shape in [&[1usize][..], &[2, 1], &[1, 3, 2]] {
        let ed = build(shape);
        let layout = ed.layout();
        // Columns partition the width.
        assert_eq!(layout.cols.first().unwrap().x0, 0);
        assert_eq!(layout.cols.last().unwrap().x1, layout.width);
        for pair in layout.cols.windows(2) {
            assert_eq!(pair[0].x1, pair[1].x0, "columns must abut");
        }
        for col in &layout.cols {
            // Windows partition the column below its tag row.
            assert_eq!(col.wins.first().unwrap().y0, 2);
            assert_eq!(col.wins.last().unwrap().y1, layout.height);
            for pair in col.wins.windows(2) {
                assert_eq!(pair[0].y1, pair[1].y0, "windows must abut");
            }
            for rect in &col.wins {
                assert!(rect.tag_rows >= 1);
                assert!(rect.y0 + rect.tag_rows <= rect.y1);
            }
        }
    }
}

#[test]
fn click_routes_set_focus_per_region() {
    let mut ed = build(&[2]);
    let rect0 = ed.layout().cols[0].wins[0];

    ed.route_mouse(mouse(MouseDir::Press, MouseButton::Left, 5, 0));
    assert_eq!(ed.active(), Active::EditorTag);
    ed.route_mouse(mouse(MouseDir::Press, MouseButton::Left, 5, 1));
    assert_eq!(ed.active(), Active::ColumnTag(0));
    ed.route_mouse(mouse(MouseDir::Press, MouseButton::Left, rect0.x0 + 3, rect0.y0));
    assert_eq!(ed.active(), Active::WindowTag(rect0.id));
    ed.route_mouse(mouse(
        MouseDir::Press,
        MouseButton::Left,
        rect0.x0 + 3,
        rect0.y0 + rect0.tag_rows,
    ));
    assert_eq!(ed.active(), Active::WindowBody(rect0.id));
}

#[test]
fn drag_selects_and_release_stops() {
    let mut ed = build(&[1]);
    let rect = ed.layout().cols[0].wins[0];
    let id = ed.active_window_id().unwrap();
    {
        let win = ed.window_mut(id).unwrap();
        win.body.select(0, 0);
        win.body.insert("abcdefghij");
        win.body.select(0, 0);
    }
    ed.refresh(100, 40);

    let row = rect.y0 + rect.tag_rows;
    ed.route_mouse(mouse(MouseDir::Press, MouseButton::Left, rect.x0 + 1 + 2, row));
    ed.route_mouse(mouse(MouseDir::Move, MouseButton::Left, rect.x0 + 1 + 7, row));
    let win = ed.window_mut(id).unwrap();
    assert_eq!(win.body.selection(), (2, 7));
    // Crossing the anchor swaps the ends.
    ed.route_mouse(mouse(MouseDir::Move, MouseButton::Left, rect.x0 + 1, row));
    let win = ed.window_mut(id).unwrap();
    assert_eq!(win.body.selection(), (0, 2));
    ed.route_mouse(mouse(MouseDir::Release, MouseButton::Left, rect.x0 + 1, row));
    // Motion after release no longer drags.
    ed.route_mouse(mouse(MouseDir::Move, MouseButton::Left, rect.x0 + 1 + 9, row));
    let win = ed.window_mut(id).unwrap();
    assert_eq!(win.body.selection(), (0, 2));
}

#[test]
fn wheel_scrolls_the_pane_under_the_pointer() {
    let mut ed = build(&[1]);
    let rect = ed.layout().cols[0].wins[0];
    let id = ed.active_window_id().unwrap();
    {
        let win = ed.window_mut(id).unwrap();
        win.body.select(0, 0);
        let text: String = (0..100).map(|i| format!("line {}\n", i)).collect();
        win.body.insert(&text);
        win.body.select(0, 0);
        win.body.set_origin(0);
    }
    ed.refresh(100, 40);

    let row = rect.y0 + rect.tag_rows + 1;
    ed.route_mouse(mouse(MouseDir::Step, MouseButton::WheelDown, rect.x0 + 2, row));
    let win = ed.window_mut(id).unwrap();
    // Three lines of "line N\n" (7 runes each).
    assert_eq!(win.body.origin(), 21);
    ed.route_mouse(mouse(MouseDir::Step, MouseButton::WheelUp, rect.x0 + 2, row));
    // The frame still starts at the old origin, so one wheel-up step walks
    // back three line starts from it.
    let win = ed.window_mut(id).unwrap();
    assert_eq!(win.body.origin(), 0);
}

#[test]
fn within_column_gutter_drag_reorders() {
    let mut ed = build(&[3]);
    let rects: Vec<_> = ed.layout().cols[0].wins.clone();
    let moving = rects[2];
    // Grab the bottom window's gutter and drop it inside the first band.
    ed.route_mouse(mouse(MouseDir::Press, MouseButton::Left, moving.x0, moving.y0));
    let drop_y = rects[0].y0 + (rects[0].y1 - rects[0].y0) / 2;
    ed.route_mouse(mouse(MouseDir::Release, MouseButton::Left, moving.x0 + 4, drop_y));
    let order: Vec<_> = ed.columns[0].windows.iter().map(|w| w.id).collect();
    assert_eq!(order, vec![rects[0].id, moving.id, rects[1].id]);
}

#[test]
fn middle_click_on_selection_executes_it() {
    let mut ed = build(&[1]);
    let rect = ed.layout().cols[0].wins[0];
    let id = ed.active_window_id().unwrap();
    {
        let win = ed.window_mut(id).unwrap();
        win.body.select(0, 0);
        win.body.insert("run this now");
        win.body.select(0, 8);
    }
    ed.refresh(100, 40);
    let row = rect.y0 + rect.tag_rows;
    let req = ed.route_mouse(mouse(MouseDir::Press, MouseButton::Middle, rect.x0 + 1 + 2, row));
    assert_eq!(
        req,
        EditorRequest::Execute {
            ctx: ExecCtx::Window(id),
            cmd: "run this".into()
        }
    );
}

#[test]
fn right_click_requests_plumbing() {
    let mut ed = build(&[1]);
    let rect = ed.layout().cols[0].wins[0];
    let id = ed.active_window_id().unwrap();
    {
        let win = ed.window_mut(id).unwrap();
        win.body.select(0, 0);
        win.body.insert("see notes.txt for details");
        win.body.select(0, 0);
    }
    ed.refresh(100, 40);
    let row = rect.y0 + rect.tag_rows;
    // Click in the middle of "notes.txt" (display column 6).
    let req = ed.route_mouse(mouse(MouseDir::Press, MouseButton::Right, rect.x0 + 1 + 6, row));
    assert_eq!(
        req,
        EditorRequest::Plumb {
            ctx: ExecCtx::Window(id),
            text: "notes.txt".into()
        }
    );
}

#[test]
fn resize_relayouts_proportionally() {
    let mut ed = build(&[1, 1]);
    ed.refresh(100, 40);
    assert_eq!(ed.layout().cols[1].x0, 50);
    ed.refresh(60, 20);
    assert_eq!(ed.layout().cols[1].x0, 30);
    assert_eq!(ed.layout().cols[1].x1, 60);
    assert_eq!(ed.layout().height, 20);
}
