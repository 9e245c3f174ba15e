use thiserror::Error;

/// Failure to read a bracketed string as a literal.
///
/// Never escapes [`crate::literal::coerce`]; it is only visible through
/// [`crate::literal::parse_literal`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("Literal is not enclosed in matching brackets")]
    NotBracketed,

    #[error("Literal syntax error at byte {offset}")]
    Syntax { offset: usize },

    #[error("Unexpected trailing input at byte {offset}")]
    TrailingInput { offset: usize },
}

impl LiteralError {
    pub fn offset(&self) -> Option<usize> {
        match self {
            LiteralError::NotBracketed => None,
            LiteralError::Syntax { offset } | LiteralError::TrailingInput { offset } => {
                Some(*offset)
            }
        }
    }
}
