//! Command execution: built-in tag commands, shell pipelines wired to the
//! window selection, and the application of parsed normal-mode commands
//! onto the editor model.

mod bindings;
mod dispatch;
pub mod pipeline;

pub use bindings::install_default_bindings;
pub use dispatch::{apply, execute};
