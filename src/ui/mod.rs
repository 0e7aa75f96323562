pub mod grid;
pub mod help;
pub mod theme;

pub use grid::{render_beats, render_transport, GridState, PlayheadView};
pub use help::render_help;
pub use theme::Theme;
