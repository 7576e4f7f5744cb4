//! Byte stream → classified token stream, with leading whitespace attached
//! to the following real token so output can be reprinted faithfully.
//!
//! Ported from `token_next()`/`token_spaces()`/`token_quoted()`/`comments()`
//! in the reference implementation. Operates on bytes rather than `char`s,
//! matching the reference's `char *pos` walk; this preprocessor's input is
//! assumed ASCII source per spec.md's non-goals (no trigraphs, no UCNs).

use crate::engine::Engine;
use crate::error::PrepError;
use crate::keyword::{is_keyword, match_punctuator};
use crate::token::{TokenId, TokenKind};

impl Engine {
    fn buf(&self) -> std::rc::Rc<str> {
        self.current_env().buffer.clone()
    }

    fn cursor(&self) -> usize {
        self.current_env().cursor
    }

    fn set_cursor(&mut self, pos: usize) {
        self.current_env_mut().cursor = pos;
    }

    fn skip_comments_and_count(&mut self) {
        let buf = self.buf();
        let bytes = buf.as_bytes();
        let mut pos = self.cursor();
        loop {
            if bytes[pos..].starts_with(b"//") {
                pos += 2;
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
            } else if bytes[pos..].starts_with(b"/*") {
                pos += 2;
                while pos < bytes.len() && !bytes[pos..].starts_with(b"*/") {
                    pos += 1;
                }
                pos = (pos + 2).min(bytes.len());
            } else {
                break;
            }
        }
        self.set_cursor(pos);
    }

    /// Consumes a run of spaces, tabs and backslash-newline pairs, if any,
    /// and returns the whitespace token for it.
    fn lex_whitespace(&mut self) -> Option<TokenId> {
        let buf = self.buf();
        let bytes = buf.as_bytes();
        let start = self.cursor();
        let mut pos = start;
        while pos < bytes.len() {
            if bytes[pos] == b' ' || bytes[pos] == b'\t' {
                pos += 1;
            } else if bytes[pos..].starts_with(b"\\\n") {
                pos += 2;
            } else {
                break;
            }
        }
        if pos == start {
            return None;
        }
        let env = self.current_env_id();
        let text = buf[start..pos].to_string();
        self.set_cursor(pos);
        Some(self.new_token(TokenKind::Whitespace, env, start, &text))
    }

    fn lex_quoted(&mut self, delim: u8, kind: TokenKind) -> Result<TokenId, PrepError> {
        let buf = self.buf();
        let bytes = buf.as_bytes();
        let env = self.current_env_id();
        let outer_start = self.cursor() - 1; // includes opening quote
        let start = self.cursor();
        let mut pos = start;
        let mut escaped = false;
        loop {
            if pos >= bytes.len() {
                let text = buf[start..pos].to_string();
                let tok = self.new_token(kind, env, start, &text);
                self.set_cursor(pos);
                return Err(PrepError::lex("No closing quote", Some(tok)));
            }
            if bytes[pos] == delim && !escaped {
                break;
            }
            escaped = bytes[pos] == b'\\' && !escaped;
            pos += 1;
        }
        let text = buf[start..pos].to_string();
        let id = self.new_token(kind, env, outer_start, &text);
        self.set_cursor(pos + 1);
        Ok(id)
    }

    /// Produces the next classified token, advancing the environment's
    /// cursor, and attaches any preceding whitespace as its `leading`.
    pub fn lex_next(&mut self) -> Result<TokenId, PrepError> {
        let env = self.current_env_id();
        let mut leading: Option<TokenId> = None;

        loop {
            self.skip_comments_and_count();
            if let Some(ws) = self.lex_whitespace() {
                leading = Some(ws);
                continue;
            }
            break;
        }

        let buf = self.buf();
        let bytes = buf.as_bytes();
        let start = self.cursor();

        if start >= bytes.len() {
            let id = self.new_token(TokenKind::End, env, start, "");
            self.tok_mut(id).leading = leading;
            self.at_line_start = false;
            return Ok(id);
        }

        let c = bytes[start];
        let id = if c == b'#' && self.at_line_start {
            self.set_cursor(start + 1);
            self.new_token(TokenKind::DirectiveIntro, env, start, "#")
        } else if c == b'\n' {
            self.set_cursor(start + 1);
            let id = self.new_token(TokenKind::Newline, env, start, "\n");
            self.tok_mut(id).leading = leading;
            self.at_line_start = true;
            return Ok(id);
        } else if c == b'"' {
            self.set_cursor(start + 1);
            self.lex_quoted(b'"', TokenKind::StringLiteral)?
        } else if c == b'\'' {
            self.set_cursor(start + 1);
            self.lex_quoted(b'\'', TokenKind::CharLiteral)?
        } else if c.is_ascii_digit() {
            let mut pos = start;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos < bytes.len() && (bytes[pos] == b'L' || bytes[pos] == b'F') {
                pos += 1;
            }
            let text = buf[start..pos].to_string();
            self.set_cursor(pos);
            self.new_token(TokenKind::Number, env, start, &text)
        } else if c.is_ascii_alphabetic() || c == b'_' {
            let mut pos = start;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let text = &buf[start..pos];
            let kind = if is_keyword(text) { TokenKind::Reserved } else { TokenKind::Ident };
            let text = text.to_string();
            self.set_cursor(pos);
            self.new_token(kind, env, start, &text)
        } else if let Some(len) = match_punctuator(&buf[start..]) {
            let text = buf[start..start + len].to_string();
            self.set_cursor(start + len);
            self.new_token(TokenKind::Reserved, env, start, &text)
        } else {
            let text = buf[start..start + 1].to_string();
            self.set_cursor(start + 1);
            self.new_token(TokenKind::Reserved, env, start, &text)
        };

        self.tok_mut(id).leading = leading;
        self.at_line_start = false;
        Ok(id)
    }

    /// Advances `self.cur` to the next token, returning the one just
    /// consumed. If the current token already has a `next` link (it sits
    /// inside a spliced macro-expansion chain being rescanned), that link
    /// is followed instead of pulling a fresh token from the lexer —
    /// mirroring `consume_any()`'s `cur = cur->next ? cur->next :
    /// token_next()`.
    pub fn consume_any(&mut self) -> Result<TokenId, PrepError> {
        let t = self.cur;
        self.cur = match self.tok(t).next {
            Some(n) => n,
            None => self.lex_next()?,
        };
        Ok(t)
    }

    pub fn cur_is(&self, s: &str) -> bool {
        self.tok(self.cur).is(s)
    }

    pub fn cur_kind(&self) -> TokenKind {
        self.tok(self.cur).kind
    }

    /// Consumes and returns `self.cur` if it is the identifier/reserved
    /// token `s`, else leaves it in place and returns `None`.
    pub fn consume(&mut self, s: &str) -> Result<Option<TokenId>, PrepError> {
        if self.cur_is(s) {
            Ok(Some(self.consume_any()?))
        } else {
            Ok(None)
        }
    }

    pub fn consume_kind(&mut self, kind: TokenKind) -> Result<Option<TokenId>, PrepError> {
        if self.cur_kind() == kind {
            Ok(Some(self.consume_any()?))
        } else {
            Ok(None)
        }
    }

    pub fn expect(&mut self, s: &str) -> Result<TokenId, PrepError> {
        let at = self.cur;
        self.consume(s)?
            .ok_or_else(|| PrepError::directive(format!("Expected token: {}", s), Some(at)))
    }

    pub fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<TokenId, PrepError> {
        let at = self.cur;
        self.consume_kind(kind)?
            .ok_or_else(|| PrepError::directive(format!("Expected {}", what), Some(at)))
    }
}
