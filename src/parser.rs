// src/parser.rs
//! Byte-offset scanner shared by the template renderer and the dot-path parser.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidSyntax(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidSyntax(msg) => f.write_str(msg),
        }
    }
}

pub struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    pub fn position(&self) -> usize {
        self.i
    }

    pub fn parse_index(&mut self) -> Result<usize, ParseError> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("expected array index".into()));
        }
        self.s[start..self.i]
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidSyntax("bad array index".into()))
    }

    /// Consume characters up to (not including) any char in `stops`, or to the end.
    pub fn take_until_any(&mut self, stops: &[char]) -> &'a str {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if stops.contains(&c) {
                break;
            }
            self.i += c.len_utf8();
        }
        &self.s[start..self.i]
    }

    /// Consume everything before the next occurrence of `lit`, or the rest of
    /// the input when `lit` never appears.
    pub fn take_until_str(&mut self, lit: &str) -> &'a str {
        let start = self.i;
        match self.s[self.i..].find(lit) {
            Some(off) => self.i += off,
            None => self.i = self.s.len(),
        }
        &self.s[start..self.i]
    }

    pub fn capture_until_str(&mut self, end: &str) -> Result<&'a str, ParseError> {
        let start = self.i;
        match self.s[self.i..].find(end) {
            Some(off) => {
                self.i += off;
                Ok(&self.s[start..self.i])
            }
            None => Err(ParseError::InvalidSyntax(format!("expected '{end}'"))),
        }
    }

    pub fn parse_quoted_string(&mut self) -> Result<String, ParseError> {
        let quote = self
            .peek_char()
            .ok_or_else(|| ParseError::InvalidSyntax("string".into()))?;
        if quote != '\'' && quote != '"' {
            return Err(ParseError::InvalidSyntax("expected quoted string".into()));
        }
        self.i += 1;
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            if c == quote {
                return Ok(out);
            }
            if c == '\\' {
                if let Some(nc) = self.peek_char() {
                    self.i += nc.len_utf8();
                    out.push(nc);
                } else {
                    break;
                }
            } else {
                out.push(c);
            }
        }
        Err(ParseError::InvalidSyntax("unterminated string".into()))
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
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    pub fn consume_str(&mut self, lit: &str) -> bool {
        if self.peek_str(lit) {
            self.i += lit.len();
            true
        } else {
            false
        }
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}
