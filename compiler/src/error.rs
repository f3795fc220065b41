use brine_helium_schema::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HeliumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Lex(CompileError),

    #[error("{0}")]
    Parse(CompileError),

    #[error("{0}")]
    Resolve(CompileError),

    #[error("{0}")]
    Validation(CompileError),

    /// A construct the code generator does not implement yet. This is not a
    /// mistake in the schema.
    #[error("{0}")]
    Unsupported(CompileError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HeliumError {
    /// The positioned error behind this one, if any.
    pub fn compile_error(&self) -> Option<&CompileError> {
        match self {
            HeliumError::Lex(err)
            | HeliumError::Parse(err)
            | HeliumError::Resolve(err)
            | HeliumError::Validation(err)
            | HeliumError::Unsupported(err) => Some(err),
            _ => None,
        }
    }
}

/// An error tied to a position in a schema file. Displays as
/// `<file>:<line>:<column> - error <message>`, followed by
/// `\nCaused By: <cause>` when another error is chained.
#[derive(Debug, Error)]
#[error("{file}:{line}:{column} - error {message}{}", caused_by(.cause))]
pub struct CompileError {
    pub file:    String,
    pub line:    usize,
    pub column:  usize,
    pub message: String,

    #[source]
    pub cause:   Option<Box<HeliumError>>,
}

impl CompileError {
    pub fn new(file: &str, line: usize, column: usize, message: impl Into<String>) -> CompileError {
        CompileError {
            file: file.to_owned(),
            line,
            column,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: HeliumError) -> CompileError {
        self.cause = Some(Box::new(cause));
        self
    }
}

fn caused_by(cause: &Option<Box<HeliumError>>) -> String {
    match cause {
        Some(cause) => format!("\nCaused By: {}", cause),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_format() {
        let err = CompileError::new("a.he", 3, 7, "Field number 1 is already used");
        assert_eq!(err.to_string(), "a.he:3:7 - error Field number 1 is already used");
    }

    #[test]
    fn compile_error_cause() {
        let inner = CompileError::new("b.he", 1, 10, "Foo is not exported");
        let outer = CompileError::new("a.he", 1, 1, "Failed to resolve import")
            .with_cause(HeliumError::Validation(inner));
        assert_eq!(
            HeliumError::Validation(outer).to_string(),
            "a.he:1:1 - error Failed to resolve import\nCaused By: b.he:1:10 - error Foo is not exported"
        );
    }
}
