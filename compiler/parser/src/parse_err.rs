use thiserror::Error;

use lexer::{Token, TokenType};

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected {expected}, but found {found}")]
    Syntax {
        line: usize,
        expected: String,
        found: String,
    },
    #[error("line {line}: {kind}")]
    Semantic { line: usize, kind: SemanticError },
}

impl ParseError {
    pub fn unexpected<S: Into<String>>(expected: S, found: &Token) -> Self {
        ParseError::Syntax {
            line: found.line,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    pub fn expected_kind(expected: TokenType, found: &Token) -> Self {
        Self::unexpected(expected.to_string(), found)
    }

    pub fn semantic(line: usize, kind: SemanticError) -> Self {
        ParseError::Semantic { line, kind }
    }

    /// The semantic rule that was violated, if any
    pub fn semantic_kind(&self) -> Option<&SemanticError> {
        match self {
            ParseError::Semantic { kind, .. } => Some(kind),
            ParseError::Syntax { .. } => None,
        }
    }
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum SemanticError {
    #[error("function '{0}' is already declared")]
    PrototypeRedeclared(String),
    #[error("function '{name}' was declared with {expected} parameter(s), but is given {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("function '{0}' is already defined")]
    FunctionRedefined(String),
    #[error("call to undefined function '{0}'")]
    UndefinedFunction(String),
    #[error("function '{name}' expects {expected} argument(s), but {found} were passed")]
    CallArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate parameter '{param}' in function '{func}'")]
    DuplicateParameter { func: String, param: String },
    #[error("conflicting declarations for variable '{0}'")]
    DuplicateVariable(String),
    #[error("function '{0}' does not end with a return statement")]
    MissingReturn(String),
    #[error("use of undeclared variable '{0}'")]
    UndeclaredVariable(String),
    #[error("left side of an assignment must be a variable, found '{0}'")]
    InvalidAssignmentTarget(String),
    #[error("only functions can be called, found '{0}'")]
    InvalidCallee(String),
    #[error("integer constant '{0}' does not fit in an int")]
    IntegerOutOfRange(String),
}

pub type ParseResult<T> = Result<T, ParseError>;
