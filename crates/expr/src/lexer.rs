// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lexer for resource expressions.

use crate::token::{Span, Token, TokenKind};

pub use crate::error::LexerError;

pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, chars: input.char_indices().peekable() }
    }

    /// Tokenize the entire input.
    pub fn tokenize(input: &str) -> Result<Vec<Token>, LexerError> {
        let mut lexer = Lexer::new(input);
        let mut tokens = Vec::with_capacity(input.len() / 4 + 1);
        while let Some(token) = lexer.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    #[inline]
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn current_position(&mut self) -> usize {
        self.chars.peek().map(|(pos, _)| *pos).unwrap_or(self.input.len())
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexerError> {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.chars.next();
        }
        let Some((start, ch)) = self.chars.next() else {
            return Ok(None);
        };

        let single = |kind: TokenKind| -> Result<Option<Token>, LexerError> {
            Ok(Some(Token::new(kind, Span::new(start, start + 1))))
        };
        match ch {
            '(' => single(TokenKind::LParen),
            ')' => single(TokenKind::RParen),
            '[' => single(TokenKind::LBracket),
            ']' => single(TokenKind::RBracket),
            ',' => single(TokenKind::Comma),
            '.' if !self.peek_char().is_some_and(|c| c.is_ascii_digit()) => single(TokenKind::Dot),
            '=' | '!' | '<' | '>' => self.lex_operator(start, ch).map(Some),
            '\'' | '"' => self.lex_string(start, ch).map(Some),
            c if c.is_ascii_digit() || c == '.' || c == '-' => self.lex_number(start).map(Some),
            c if c.is_alphabetic() || c == '_' => Ok(Some(self.lex_name(start))),
            ch => Err(LexerError::UnexpectedChar { ch, span: Span::new(start, start + ch.len_utf8()) }),
        }
    }

    fn lex_operator(&mut self, start: usize, ch: char) -> Result<Token, LexerError> {
        let followed_by_eq = self.peek_char() == Some('=');
        if followed_by_eq {
            self.chars.next();
        }
        let kind = match (ch, followed_by_eq) {
            ('=', true) => TokenKind::EqEq,
            ('!', true) => TokenKind::NotEq,
            ('<', true) => TokenKind::Le,
            ('>', true) => TokenKind::Ge,
            ('<', false) => TokenKind::Lt,
            ('>', false) => TokenKind::Gt,
            (ch, _) => return Err(LexerError::UnexpectedChar { ch, span: Span::new(start, start + 1) }),
        };
        let len = if followed_by_eq { 2 } else { 1 };
        Ok(Token::new(kind, Span::new(start, start + len)))
    }

    fn lex_string(&mut self, start: usize, quote: char) -> Result<Token, LexerError> {
        let mut value = String::new();
        loop {
            match self.chars.next() {
                Some((pos, c)) if c == quote => {
                    return Ok(Token::new(TokenKind::Str(value), Span::new(start, pos + 1)));
                }
                Some((_, '\\')) => match self.chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, c)) => value.push(c),
                    None => break,
                },
                Some((_, c)) => value.push(c),
                None => break,
            }
        }
        Err(LexerError::UnterminatedString { span: Span::new(start, self.input.len()) })
    }

    /// The first character (digit, `.` or `-`) is already consumed.
    fn lex_number(&mut self, start: usize) -> Result<Token, LexerError> {
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
        {
            self.chars.next();
        }
        let end = self.current_position();
        let text = &self.input[start..end];
        let span = Span::new(start, end);
        let invalid = || LexerError::InvalidNumber { text: text.to_string(), span };

        if let Ok(value) = text.parse::<i64>() {
            return Ok(Token::new(TokenKind::Int(value), span));
        }
        if let Some(hex) = text.strip_prefix("0x") {
            let value = i64::from_str_radix(hex, 16).map_err(|_| invalid())?;
            return Ok(Token::new(TokenKind::Int(value), span));
        }
        text.parse::<f64>().map_err(|_| invalid())?;
        Ok(Token::new(TokenKind::Float(text.to_string()), span))
    }

    /// The first character is already consumed.
    fn lex_name(&mut self, start: usize) -> Token {
        while self.peek_char().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.chars.next();
        }
        let end = self.current_position();
        let kind = match &self.input[start..end] {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            "None" => TokenKind::None,
            name => TokenKind::Name(name.to_string()),
        };
        Token::new(kind, Span::new(start, end))
    }
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
