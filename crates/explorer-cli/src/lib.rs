//! Command-line front end for the pipeline explorer

pub mod prompt;
pub mod render;

pub use prompt::{LinePrompter, StdinPrompter};
pub use render::render_outline;
