// src/parser.rs
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{0}")]
    InvalidSyntax(String),
}

/// Character cursor shared by the pointer and operator-identifier grammars.
pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    /// `[A-Za-z0-9_-]+`. `$` is never part of an identifier.
    pub fn parse_identifier(&mut self) -> Result<&'a str, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c == '_' || c == '-' || c.is_ascii_alphanumeric() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("identifier expected".into()));
        }
        Ok(&self.s[start..self.i])
    }

    /// Parses `$name` or `ext$name`, returning `(extension, name)`.
    pub fn parse_operator(&mut self) -> Result<(Option<&'a str>, &'a str), ParseError> {
        let extension = if self.peek_char() == Some('$') {
            None
        } else {
            Some(
                self.parse_identifier()
                    .map_err(|_| ParseError::InvalidSyntax("extension id expected before `$`".into()))?,
            )
        };
        self.expect('$')?;
        let name = self
            .parse_identifier()
            .map_err(|_| ParseError::InvalidSyntax("operator name expected after `$`".into()))?;
        if !self.eof() {
            return Err(ParseError::InvalidSyntax(format!(
                "unexpected `{}` in operator",
                self.rest()
            )));
        }
        Ok((extension, name))
    }

    /// Splits an RFC 6901 pointer into unescaped reference tokens.
    pub fn parse_pointer_tokens(&mut self) -> Result<Vec<String>, ParseError> {
        let mut tokens = Vec::new();
        if self.eof() {
            return Ok(tokens);
        }
        if !self.consume_char('/') {
            return Err(ParseError::InvalidSyntax(
                "pointer must be empty or start with `/`".into(),
            ));
        }
        let mut current = String::new();
        while let Some(c) = self.peek_char() {
            self.advance(c);
            match c {
                '/' => tokens.push(std::mem::take(&mut current)),
                '~' => match self.peek_char() {
                    Some('0') => {
                        self.i += 1;
                        current.push('~');
                    }
                    Some('1') => {
                        self.i += 1;
                        current.push('/');
                    }
                    _ => {
                        return Err(ParseError::InvalidSyntax(
                            "`~` must be followed by `0` or `1`".into(),
                        ))
                    }
                },
                _ => current.push(c),
            }
        }
        tokens.push(current);
        Ok(tokens)
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(ParseError::InvalidSyntax(format!("expected '{}'", c)))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.advance(c);
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn rest(&self) -> &'a str {
        &self.s[self.i..]
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }

    fn advance(&mut self, c: char) {
        self.i += c.len_utf8();
    }
}
