//! Lex a GPR string into a series of tokens for later parsing

use thiserror::Error;

use crate::io::gpr_parse::token::Token;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Convert the source into tokens, always terminated by [`Token::Eof`]
    pub fn lex(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens.push(Token::Eof);
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c: char = self.advance();
        match c {
            // Single Character Tokens
            '(' => self.add_token(Token::LeftParen),
            ')' => self.add_token(Token::RightParen),
            // Whitespace
            ' ' | '\r' | '\n' | '\t' => {}
            // Identifiers and Operators
            c if Lexer::is_identifier_char(c) => self.read_identifier(),
            _ => {
                return Err(LexerError::InvalidToken {
                    character: c,
                    position: self.start,
                })
            }
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn read_identifier(&mut self) {
        while !self.is_at_end() && Lexer::is_identifier_char(self.peek()) {
            self.advance();
        }

        let text: String = self.source[self.start..self.current].iter().collect();

        match text.as_str() {
            "and" | "And" | "AND" => self.add_token(Token::And),
            "or" | "Or" | "OR" => self.add_token(Token::Or),
            gene => self.add_token(Token::Identifier(gene.to_string())),
        }
    }

    /// Gene ids in reference databases contain locus tags, version suffixes and taxon
    /// prefixes (`b0001`, `G_1234.1`, `511145.b0001`, `PA14-0010`)
    fn is_identifier_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')
    }

    fn peek(&self) -> char {
        self.source[self.current]
    }

    fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

/// Errors produced while lexing a GPR string
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LexerError {
    #[error("Invalid character `{character}` at position {position}")]
    InvalidToken { character: char, position: usize },
}
