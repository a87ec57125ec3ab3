//! # SQL Lexer
//!
//! Single-pass tokenizer for the statement surface. String and identifier
//! tokens are borrowed slices pointing into the input; nothing is copied
//! except the uppercase scratch used for keyword lookup.
//!
//! Keywords are matched case-insensitively through a compile-time perfect
//! hash map, so `select`, `SELECT` and `Select` all resolve to the same
//! token while `"select"` stays an ordinary string literal.

use eyre::{bail, Result, WrapErr};
use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Select,
    From,
    Where,
    And,
    Count,
    Load,
    Create,
    Index,
    On,
    With,
    Key,
    Value,
}

static KEYWORDS: phf::Map<&'static str, Keyword> = phf_map! {
    "SELECT" => Keyword::Select,
    "FROM" => Keyword::From,
    "WHERE" => Keyword::Where,
    "AND" => Keyword::And,
    "COUNT" => Keyword::Count,
    "LOAD" => Keyword::Load,
    "CREATE" => Keyword::Create,
    "INDEX" => Keyword::Index,
    "ON" => Keyword::On,
    "WITH" => Keyword::With,
    "KEY" => Keyword::Key,
    "VALUE" => Keyword::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Keyword(Keyword),
    Ident(&'a str),
    Int(i32),
    Str(&'a str),
    Star,
    Comma,
    LParen,
    RParen,
    Semicolon,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Eof,
}

pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    pub fn next_token(&mut self) -> Result<Token<'a>> {
        self.skip_whitespace();

        let Some(byte) = self.peek() else {
            return Ok(Token::Eof);
        };

        match byte {
            b'*' => self.single(Token::Star),
            b',' => self.single(Token::Comma),
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b';' => self.single(Token::Semicolon),
            b'=' => self.single(Token::Eq),
            b'<' => {
                self.pos += 1;
                match self.peek() {
                    Some(b'>') => self.single(Token::Ne),
                    Some(b'=') => self.single(Token::Le),
                    _ => Ok(Token::Lt),
                }
            }
            b'>' => {
                self.pos += 1;
                match self.peek() {
                    Some(b'=') => self.single(Token::Ge),
                    _ => Ok(Token::Gt),
                }
            }
            b'!' => {
                self.pos += 1;
                match self.peek() {
                    Some(b'=') => self.single(Token::Ne),
                    _ => bail!("unexpected character '!' at offset {}", self.pos - 1),
                }
            }
            b'\'' | b'"' => self.string(byte),
            b'-' | b'0'..=b'9' => self.integer(),
            b'A'..=b'Z' | b'a'..=b'z' | b'_' => Ok(self.word()),
            other => bail!(
                "unexpected character '{}' at offset {}",
                other as char,
                self.pos
            ),
        }
    }

    fn single(&mut self, token: Token<'a>) -> Result<Token<'a>> {
        self.pos += 1;
        Ok(token)
    }

    fn string(&mut self, quote: u8) -> Result<Token<'a>> {
        let start = self.pos + 1;
        let mut end = start;
        while let Some(b) = self.bytes().get(end) {
            if *b == quote {
                self.pos = end + 1;
                return Ok(Token::Str(&self.input[start..end]));
            }
            end += 1;
        }
        bail!("unterminated string literal starting at offset {}", start - 1)
    }

    fn integer(&mut self) -> Result<Token<'a>> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            bail!("expected digits after '-' at offset {}", start);
        }

        let text = &self.input[start..self.pos];
        let value = text
            .parse::<i32>()
            .wrap_err_with(|| format!("integer literal '{}' out of range", text))?;
        Ok(Token::Int(value))
    }

    fn word(&mut self) -> Token<'a> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        let word = &self.input[start..self.pos];

        match KEYWORDS.get(word.to_ascii_uppercase().as_str()) {
            Some(&keyword) => Token::Keyword(keyword),
            None => Token::Ident(word),
        }
    }
}
