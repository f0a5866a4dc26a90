//! The editing model: text panes, windows, columns, and the editor that
//! tiles them.
//!
//! Ownership runs strictly downward: the [`Editor`] owns its [`Column`]s,
//! a column owns its [`Window`]s, and a window owns two [`TextPane`]s (tag
//! and body), each of which owns its buffer. There are no back-pointers;
//! operations that need wider context (executing a tag command, plumbing a
//! path) bubble a [`PaneRequest`] up to the editor, which resolves it with
//! full mutable access. This keeps every event dispatch a single
//! borrow-checked pass down the tree.

pub mod clipboard;
mod column;
mod editor;
mod pane;
mod window;

pub use clipboard::{Clipboard, LocalClipboard};
pub use column::{Column, DEFAULT_COLUMN_TAG};
pub use editor::{
    Active, ColRect, DEFAULT_EDITOR_TAG, ERRORS_NAME, Editor, EditorOptions, EditorRequest,
    ExecCtx, Layout, Mode, WinRect,
};
pub use pane::{PaneRequest, TextPane};
pub use window::{DEFAULT_WINDOW_TAG, Window, WindowId};
