//! CFI Parser
//!
//! Grammar (the subset reading positions use):
//! ```text
//! cfi       = "epubcfi(" path ")" | path
//! path      = step+ [offset]
//! step      = "/" number [assertion] | "!" [assertion]
//! assertion = "[" text "]"
//! offset    = ":" number [assertion] | "@" number ":" number
//! ```
//!
//! Bare paths are accepted so that partial CFIs (content document steps
//! only, with or without a leading `!`) parse the same way as full ones.

use super::types::*;
use thiserror::Error;

/// CFI parsing errors
#[derive(Debug, Error)]
pub enum CfiParseError {
    #[error("Empty CFI string")]
    Empty,

    #[error("CFI must end with ')'")]
    MissingClosingParen,

    #[error("Expected '/' or '!' at position {0}")]
    ExpectedStep(usize),

    #[error("Expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("Unclosed bracket at position {0}")]
    UnclosedBracket(usize),

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), CfiParseError> {
        if self.skip_if(expected) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> CfiParseError {
        CfiParseError::UnexpectedChar(self.peek().unwrap_or('\0'), self.pos)
    }

    fn skip_str(&mut self, s: &str) -> bool {
        if self.input[self.pos..].starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn take_while(&mut self, accept: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().map(&accept).unwrap_or(false) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn parse_number(&mut self) -> Result<u32, CfiParseError> {
        let start = self.pos;
        self.take_while(|ch| ch.is_ascii_digit())
            .parse()
            .map_err(|_| CfiParseError::ExpectedNumber(start))
    }

    fn parse_float(&mut self) -> Result<f64, CfiParseError> {
        let start = self.pos;
        self.skip_if('-');
        self.take_while(|ch| ch.is_ascii_digit() || ch == '.');
        self.input[start..self.pos]
            .parse()
            .map_err(|_| CfiParseError::ExpectedNumber(start))
    }

    /// Text up to the closing bracket, with `^` escapes resolved
    fn parse_bracket_content(&mut self) -> Result<String, CfiParseError> {
        let start = self.pos;
        let mut result = String::new();
        while let Some(ch) = self.advance() {
            match ch {
                '^' => {
                    if let Some(escaped) = self.advance() {
                        result.push(escaped);
                    }
                }
                ']' => return Ok(result),
                '[' => return Err(CfiParseError::UnexpectedChar('[', self.pos - 1)),
                _ => result.push(ch),
            }
        }
        Err(CfiParseError::UnclosedBracket(start))
    }

    /// `[id]` or `[prefix,suffix;key=value]`
    fn parse_assertion(&mut self) -> Result<(Option<String>, Option<TextAssertion>), CfiParseError> {
        if !self.skip_if('[') {
            return Ok((None, None));
        }
        let content = self.parse_bracket_content()?;

        let Some((prefix, rest)) = content.split_once(',') else {
            return Ok((Some(content), None));
        };
        let (suffix, parameters) = match rest.split_once(';') {
            Some((suffix, params)) => (suffix, parse_parameters(params)),
            None => (rest, Vec::new()),
        };
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Ok((
            None,
            Some(TextAssertion {
                prefix: non_empty(prefix),
                suffix: non_empty(suffix),
                parameters,
            }),
        ))
    }

    fn parse_step(&mut self) -> Result<CfiStep, CfiParseError> {
        let step_type = if self.skip_if('/') {
            StepType::Element(self.parse_number()?)
        } else if self.skip_if('!') {
            StepType::Indirection
        } else {
            return Err(CfiParseError::ExpectedStep(self.pos));
        };
        let (id_assertion, text_assertion) = self.parse_assertion()?;
        Ok(CfiStep {
            step_type,
            id_assertion,
            text_assertion,
        })
    }

    fn parse_path(&mut self) -> Result<CfiPath, CfiParseError> {
        let mut steps = Vec::new();
        while matches!(self.peek(), Some('/') | Some('!')) {
            steps.push(self.parse_step()?);
        }
        if steps.is_empty() {
            return Err(CfiParseError::ExpectedStep(self.pos));
        }

        let mut path = CfiPath::with_steps(steps);
        if self.skip_if(':') {
            let offset = self.parse_number()?;
            let (_, assertion) = self.parse_assertion()?;
            path.character_offset = Some(CharacterOffset { offset, assertion });
        } else if self.skip_if('@') {
            let x = self.parse_float()?;
            self.expect(':')?;
            let y = self.parse_float()?;
            path.spatial_offset = Some(SpatialOffset { x, y });
        }
        Ok(path)
    }

    fn parse_cfi(&mut self) -> Result<Cfi, CfiParseError> {
        let wrapped = self.skip_str("epubcfi(");
        let path = self.parse_path()?;
        if wrapped && !self.skip_if(')') {
            return Err(CfiParseError::MissingClosingParen);
        }
        if !self.at_end() {
            return Err(self.unexpected());
        }
        Ok(Cfi { path })
    }
}

/// Parse parameters from a string like "key1=value1;key2=value2"
fn parse_parameters(s: &str) -> Vec<(String, String)> {
    s.split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Parse a wrapped (`epubcfi(...)`) or bare CFI
pub fn parse(input: &str) -> Result<Cfi, CfiParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CfiParseError::Empty);
    }
    Parser::new(input).parse_cfi()
}

/// Parse a CFI, returning `None` on failure
pub fn try_parse(input: &str) -> Option<Cfi> {
    parse(input).ok()
}
