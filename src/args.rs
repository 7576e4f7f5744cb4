//! Token utilities: capturing directive lines and call argument lists,
//! normalizing empty-argument slots, and locating a parameter's matched
//! argument range. Ported from `token_norm_args`, `consume_func_args`,
//! `consume_to_lnend`, `token_next_arg_delim` and `token_matched_arg` in
//! the reference implementation.

use crate::engine::Engine;
use crate::error::PrepError;
use crate::token::{TokenId, TokenKind};

impl Engine {
    /// Inserts a zero-length synthetic `IDENT` wherever `(`, `,` or `,` is
    /// immediately followed by `,`, `,` or `)` at paren-depth 1, so every
    /// parameter/argument slot has exactly one token boundary even when
    /// empty. Applied to both macro-definition parameter/replacement
    /// chains and call-site captured argument lists.
    pub fn normalize_args(&mut self, head: Option<TokenId>) -> Option<TokenId> {
        let mut depth = 0i32;
        let mut t = head;
        while let Some(tid) = t {
            if self.tok(tid).is("(") {
                depth += 1;
            }
            if self.tok(tid).is(")") {
                depth -= 1;
            }
            if depth == 1 {
                if let Some(nid) = self.tok(tid).next {
                    let trigger = (self.tok(tid).is("(") && self.tok(nid).is(","))
                        || (self.tok(tid).is(",") && self.tok(nid).is(")"))
                        || (self.tok(tid).is(",") && self.tok(nid).is(","));
                    if trigger {
                        let env = self.tok(nid).env;
                        let offset = self.tok(nid).offset;
                        let filler = self.new_token(TokenKind::Ident, env, offset, "");
                        self.set_next(filler, Some(nid));
                        self.set_next(tid, Some(filler));
                    }
                }
            }
            t = self.tok(tid).next;
        }
        head
    }

    /// Consumes tokens starting at (and including) the current `(` through
    /// its matching `)`, tracking paren depth, and returns the normalized
    /// chain. Used both for a function-like macro's parameter list at
    /// `#define` time and for a call's argument list at expansion time.
    pub fn consume_func_args(&mut self) -> Result<TokenId, PrepError> {
        let head = self.consume_any()?;
        let mut prev = head;
        let mut depth = 1i32; // head is always "("
        loop {
            if self.cur_kind() == TokenKind::End {
                return Err(PrepError::directive("Unterminated argument list", Some(self.cur)));
            }
            let t = self.consume_any()?;
            self.set_next(prev, Some(t));
            prev = t;
            if self.tok(t).is("(") {
                depth += 1;
            }
            if self.tok(t).is(")") {
                depth -= 1;
            }
            if depth == 0 && self.tok(t).is(")") {
                break;
            }
        }
        Ok(self.normalize_args(Some(head)).unwrap())
    }

    /// Consumes tokens up to (and including) the next `NEWLINE`, returning
    /// the chain before it (may be empty).
    pub fn consume_to_lnend(&mut self) -> Result<Option<TokenId>, PrepError> {
        let mut head: Option<TokenId> = None;
        let mut prev: Option<TokenId> = None;
        loop {
            if self.consume_kind(TokenKind::Newline)?.is_some() {
                break;
            }
            if self.cur_kind() == TokenKind::End {
                break;
            }
            let t = self.consume_any()?;
            match prev {
                None => head = Some(t),
                Some(p) => self.set_next(p, Some(t)),
            }
            prev = Some(t);
        }
        Ok(head)
    }

    /// Walks from `t` to the next top-level (depth-0) `,` or the `)` that
    /// closes the enclosing argument list (depth goes negative).
    pub fn next_arg_delim(&self, mut t: Option<TokenId>) -> Option<TokenId> {
        let mut depth = 0i32;
        while let Some(tid) = t {
            if self.tok(tid).is("(") {
                depth += 1;
            }
            if self.tok(tid).is(")") {
                depth -= 1;
            }
            if (depth == 0 && self.tok(tid).is(",")) || (depth < 0 && self.tok(tid).is(")")) {
                return Some(tid);
            }
            t = self.tok(tid).next;
        }
        t
    }

    /// Given the call's macro-name token `saddr` (whose `.next` is `(`),
    /// returns the token right after the matching `)` — the point where
    /// scanning resumes after the whole call.
    pub fn skip_after_func(&self, saddr: TokenId) -> Option<TokenId> {
        let mut t = self.next_of(saddr)?; // "("
        while !self.tok(t).is(")") {
            t = self.next_arg_delim(self.next_of(t))?;
        }
        self.next_of(t)
    }

    /// Given the captured call `call_name` (whose `.next` is `(` and whose
    /// argument list follows), locates the argument range `[start, delim)`
    /// matched to the parameter named `param_name`, or `None` if no such
    /// parameter exists.
    pub fn matched_arg(
        &self,
        param_name: &str,
        params: &[String],
        call_name: TokenId,
    ) -> Option<(TokenId, Option<TokenId>)> {
        let idx = params.iter().position(|p| p == param_name)?;
        let open_paren = self.next_of(call_name)?;
        let mut start = self.next_of(open_paren)?;
        let mut delim = self.next_arg_delim(Some(start));
        for _ in 0..idx {
            start = self.next_of(delim?)?;
            delim = self.next_arg_delim(Some(start));
        }
        Some((start, delim))
    }
}
