use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ScriptError {
    pub code: String,
    pub message: String,
    /// Zero-based script line the error is attributed to, when known.
    pub line: Option<usize>,
}

impl ScriptError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            line: None,
        }
    }

    pub fn with_line(code: impl Into<String>, message: impl Into<String>, line: usize) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            line: Some(line),
        }
    }
}

/// Raised by the external parser for a malformed script. `line` is zero-based;
/// the rendered message uses the one-based number users see in the editor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}: '{text}' (Line #{})", .line + 1)]
pub struct ParseError {
    pub message: String,
    pub text: String,
    pub line: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, text: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            text: text.into(),
            line,
        }
    }
}

/// Runtime failure raised by a step provider. The failing line is read from the
/// script handle's cursor, not carried here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StepError {
    pub message: String,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ParseError> for ScriptError {
    fn from(error: ParseError) -> Self {
        let line = error.line;
        ScriptError::with_line("ENGINE_PARSE", error.to_string(), line)
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn parse_error_renders_one_based_line() {
        let error = ParseError::new("Unterminated string", "say 'hi", 3);
        assert_eq!(error.to_string(), "Unterminated string: 'say 'hi' (Line #4)");
    }

    #[test]
    fn parse_error_converts_into_script_error_keeping_zero_based_line() {
        let error: ScriptError = ParseError::new("Bad", "x", 0).into();
        assert_eq!(error.code, "ENGINE_PARSE");
        assert_eq!(error.line, Some(0));
        assert_eq!(error.to_string(), "ENGINE_PARSE: Bad: 'x' (Line #1)");
    }

    #[test]
    fn script_error_constructors_set_line() {
        assert_eq!(ScriptError::new("A", "b").line, None);
        assert_eq!(ScriptError::with_line("A", "b", 7).line, Some(7));
        assert_eq!(StepError::new("boom").to_string(), "boom");
    }
}
