pub mod cache;
pub mod error;
pub mod pipeline;
pub mod runner;

pub use error::{DiagnosticError, RenderError};
pub use pipeline::{RenderContext, check_document, render_document};
