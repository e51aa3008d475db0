use std::fmt;
use std::ops::Range;

#[derive(Debug)]
pub enum RenderError {
    UnknownLanguage { tag: String, known: Vec<String> },
    Io(String),
    Spawn { command: String, message: String },
    Custom(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnknownLanguage { tag, known } => {
                write!(
                    f,
                    "unrecognized language tag '{}' (known tags: {})",
                    tag,
                    if known.is_empty() {
                        "none".to_string()
                    } else {
                        known.join(", ")
                    }
                )
            }
            RenderError::Io(msg) => write!(f, "I/O error: {}", msg),
            RenderError::Spawn { command, message } => {
                write!(f, "cannot launch '{}': {}", command, message)
            }
            RenderError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(error: std::io::Error) -> Self {
        RenderError::Io(error.to_string())
    }
}

/// A render error or warning enriched with source location information.
#[derive(Debug)]
pub struct DiagnosticError {
    pub error: RenderError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
    pub is_warning: bool,
}

impl DiagnosticError {
    /// Create a warning diagnostic with a source span.
    pub fn warning(message: String, span: Range<usize>, source_id: usize) -> Self {
        DiagnosticError {
            error: RenderError::Custom(message),
            span: Some(span),
            source_id,
            is_warning: true,
        }
    }
}

impl From<RenderError> for DiagnosticError {
    fn from(error: RenderError) -> Self {
        DiagnosticError {
            error,
            span: None,
            source_id: 0,
            is_warning: false,
        }
    }
}

impl From<std::io::Error> for DiagnosticError {
    fn from(error: std::io::Error) -> Self {
        DiagnosticError::from(RenderError::from(error))
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for DiagnosticError {}
