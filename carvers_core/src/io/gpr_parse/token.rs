//! Tokens of a gene rule
use std::fmt::{Display, Formatter};

#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub enum Token {
    /// A gene id
    Identifier(String),
    And,
    Or,
    LeftParen,
    RightParen,
    /// End of the rule, always the last token
    Eof,
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Identifier(id) => write!(f, "{}", id),
            Token::And => write!(f, "and"),
            Token::Or => write!(f, "or"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::Eof => write!(f, "end of rule"),
        }
    }
}
