//! Renderers (spec §6.2): AST -> JSON and AST -> HTML.

pub mod html;
pub mod json;
pub mod options;

pub use options::{ParseLevel, ParseOptions, RenderOptions, Whitespace};
