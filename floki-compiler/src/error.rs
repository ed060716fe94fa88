use std::path::PathBuf;

use fuf_contract::ContractError;
use thiserror::Error;

/// Shared error type for every compilation stage.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Bad sensor manifest: duplicate, empty or unencodable names, too many entries.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Syntax error on line {line}: {message}\n    {content}")]
    Syntax {
        line: usize,
        content: String,
        message: String,
    },

    /// An identifier range or the identifier space ran out.
    #[error("Capacity error on line {line}: {message}\n    {content}")]
    Capacity {
        line: usize,
        content: String,
        message: String,
    },

    /// Backpatching fell outside the buffer. Indicates a compiler bug.
    #[error("Assembly error: {0}")]
    Assembly(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{count} warning(s) denied")]
    WarningsDenied { count: usize },
}

impl CompileError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    /// Source line the error points at, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            CompileError::Syntax { line, .. } | CompileError::Capacity { line, .. } => Some(*line),
            _ => None,
        }
    }
}

impl From<ContractError> for CompileError {
    fn from(error: ContractError) -> Self {
        CompileError::Assembly(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_names_line_and_content() {
        let err = CompileError::Syntax {
            line: 4,
            content: "stat idle".to_string(),
            message: "unrecognized declaration".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("line 4"));
        assert!(text.contains("stat idle"));
        assert_eq!(err.line(), Some(4));
    }

    #[test]
    fn contract_errors_become_assembly_errors() {
        let err: CompileError = ContractError::OffsetOutOfBounds { offset: 30, len: 24 }.into();
        assert!(matches!(err, CompileError::Assembly(_)));
        assert_eq!(err.line(), None);
    }
}
