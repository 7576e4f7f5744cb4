//! The directive executor and top-level driver: dispatches `#`-introduced
//! directives, gates inactive conditional branches ("skip mode"), resolves
//! `#include`/`#include_next`, and threads every surviving token (directive
//! output and macro-expanded identifiers alike) onto the engine's shared
//! output chain.
//!
//! Ported from `stmt`/`stmt_off`/`cntlflow`/`drc_define`/`drc_include` in
//! the reference implementation. `stmt`'s single global `ocur` becomes
//! `Engine::append_output`/`append_output_chain`; its global `macro_org`
//! becomes `Engine::macro_org`, set before every top-level identifier is
//! routed through expansion, exactly as the reference sets it once per
//! loop iteration regardless of whether that identifier turns out to name
//! a macro.

use std::path::PathBuf;

use crate::engine::Engine;
use crate::error::{ErrorKind, PrepError};
use crate::token::{TokenId, TokenKind};

impl Engine {
    /// Consumes `#define NAME [(params)] replacement`. The parameter list
    /// is only captured when `(` immediately follows the name with zero
    /// intervening whitespace — checked via the `(` token's own `leading`
    /// field, matching the reference's `!cur->leadings` test.
    fn drc_define(&mut self) -> Result<(), PrepError> {
        let key = self.expect_kind(TokenKind::Ident, "macro name")?;
        let name = self.tok(key).text.to_string();

        let params = if self.cur_is("(") && self.tok(self.cur).leading.is_none() {
            let chain = self.consume_func_args()?;
            Some(self.extract_param_names(chain)?)
        } else {
            None
        };

        let replacement = self.consume_to_lnend()?;
        self.macro_add(name, params, replacement);
        Ok(())
    }

    /// Extracts parameter names from a normalized `(` ... `)` chain,
    /// erroring on an empty name exactly as `macro_add`'s loop does in the
    /// reference implementation (`exit_if(!(*t)->len, ..., "Expected param
    /// name")`).
    fn extract_param_names(&self, head: TokenId) -> Result<Vec<String>, PrepError> {
        let mut names = Vec::new();
        let mut t = self.next_of(head); // skip the leading '('
        loop {
            let tid = match t {
                Some(tid) => tid,
                None => break,
            };
            if self.tok(tid).is(")") {
                break;
            }
            if self.tok(tid).is(",") {
                t = self.next_of(tid);
                continue;
            }
            if self.tok(tid).text.is_empty() {
                return Err(PrepError::directive("Expected param name", Some(tid)));
            }
            names.push(self.tok(tid).text.to_string());
            t = self.next_of(tid);
        }
        Ok(names)
    }

    /// `defined(NAME)`-equivalent lookup used by `#ifdef`/`#ifndef`: the
    /// object-like/function-like disambiguation still applies against
    /// whatever token follows the name on the directive line (possibly
    /// nothing), matching `macro_get(t, t->next)` in the reference.
    fn macro_test(&self, head: TokenId) -> bool {
        let name = self.tok(head).text.clone();
        let following_open = self.next_of(head).map_or(false, |n| self.tok(n).is("("));
        self.macro_lookup(&name, following_open).is_some()
    }

    /// Reconstructs the raw source text spanned by a captured token chain
    /// (used for `#warning`/`#error` messages), by slicing the owning
    /// environment's buffer from the first token's start to the last
    /// token's end rather than re-joining token text pieces.
    fn chain_text(&self, head: Option<TokenId>) -> String {
        let head = match head {
            Some(h) => h,
            None => return String::new(),
        };
        let env = self.tok(head).env;
        let start = self.tok(head).offset;
        let mut last = head;
        let mut t = self.next_of(head);
        while let Some(tid) = t {
            last = tid;
            t = self.next_of(tid);
        }
        let end = self.tok(last).offset.saturating_add(self.tok(last).text.len()).max(start);
        let buf = &self.envs[env.0 as usize].buffer;
        let end = end.min(buf.len());
        if start >= buf.len() || start > end {
            return String::new();
        }
        buf[start..end].trim().to_string()
    }

    /// Resolves and pushes the file named by an `#include`/`#include_next`
    /// directive, recurses into it, and pops back. `skip` is the
    /// system-directory index the search starts at (0 for `#include`, the
    /// including environment's `skip_index + 1` for `#include_next`).
    fn drc_include(&mut self, skip: usize) -> Result<(), PrepError> {
        let (path_text, is_local, anchor) = if let Some(lt) = self.consume("<")? {
            let env = self.tok(lt).env;
            let start = self.tok(lt).offset + 1;
            loop {
                if self.cur_kind() == TokenKind::End {
                    return Err(PrepError::directive("Unterminated include path", Some(self.cur)));
                }
                if self.cur_is(">") {
                    break;
                }
                self.consume_any()?;
            }
            let end = self.tok(self.cur).offset;
            let gt = self.expect(">")?;
            let buf = self.envs[env.0 as usize].buffer.clone();
            (buf[start..end].to_string(), false, gt)
        } else {
            let t = self.expect_kind(TokenKind::StringLiteral, "include path")?;
            (self.tok(t).text.to_string(), true, t)
        };

        let resolved = if path_text.starts_with('/') {
            Some((PathBuf::from(&path_text), 0))
        } else {
            self.find_include(&path_text, skip, is_local)
        };

        match resolved {
            Some((path, found_skip)) => self.push_file(path, found_skip),
            None => Err(PrepError::new(
                ErrorKind::Io,
                format!("Cannot find include file: {}", path_text),
                Some(anchor),
            )),
        }
    }

    fn push_file(&mut self, path: PathBuf, skip_index: usize) -> Result<(), PrepError> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            PrepError::new(ErrorKind::Io, format!("Cannot open file \"{}\": {}", path.display(), e), None)
        })?;
        self.push_env(path, content, skip_index);
        let result = self.stmt(false);
        self.pop_env();
        result
    }

    /// Runs the selected branch, then every `#elif`/`#else` branch in turn,
    /// consuming the closing `#endif`.
    ///
    /// Mirrors the reference's `on = !on && expr();` verbatim, including
    /// its short-circuit: once a prior branch has matched (`on` already
    /// true), later `#elif` conditions are never parsed as expressions at
    /// all — `stmt_off` simply treats the unparsed condition tokens as
    /// ordinary content to skip over, which works because skip mode
    /// doesn't care what non-directive tokens it consumes.
    fn cntlflow(&mut self, mut on: bool) -> Result<(), PrepError> {
        if on {
            self.stmt(false)?;
        } else {
            self.stmt_off()?;
        }
        while self.consume("elif")?.is_some() {
            on = if on { false } else { self.expr()? != 0 };
            if on {
                self.stmt(false)?;
            } else {
                self.stmt_off()?;
            }
        }
        if self.consume("else")?.is_some() {
            if !on {
                self.stmt(false)?;
            } else {
                self.stmt_off()?;
            }
        }
        self.expect("endif")?;
        Ok(())
    }

    /// Consumes tokens without expansion inside an unselected conditional
    /// branch, tracking nested `if`/`ifdef`/`ifndef` so only the matching
    /// `elif`/`else`/`endif` at the same nesting depth stops the skip.
    fn stmt_off(&mut self) -> Result<(), PrepError> {
        while self.cur_kind() != TokenKind::End {
            if self.consume_kind(TokenKind::DirectiveIntro)?.is_some() {
                if self.consume("if")?.is_some() || self.consume("ifdef")?.is_some() || self.consume("ifndef")?.is_some() {
                    self.consume_to_lnend()?;
                    self.stmt_off()?;
                    while self.consume("elif")?.is_some() {
                        self.consume_to_lnend()?;
                        self.stmt_off()?;
                    }
                    if self.consume("else")?.is_some() {
                        self.stmt_off()?;
                    }
                    self.expect("endif")?;
                    continue;
                } else if self.cur_is("elif") || self.cur_is("else") || self.cur_is("endif") {
                    return Ok(());
                }
                continue;
            }
            self.consume_any()?;
        }
        Ok(())
    }

    /// The main directive-dispatch / token-routing loop. `is_top` is false
    /// for every recursive call (an include's body, or a conditional
    /// branch's body) — only the outermost call treats a stray
    /// `elif`/`else`/`endif` as a fatal error instead of a signal to
    /// return control to an enclosing `cntlflow`/`stmt_off`.
    pub fn stmt(&mut self, is_top: bool) -> Result<(), PrepError> {
        while self.cur_kind() != TokenKind::End {
            if self.consume_kind(TokenKind::DirectiveIntro)?.is_some() {
                if self.consume("define")?.is_some() {
                    self.drc_define()?;
                } else if self.consume("undef")?.is_some() {
                    let t = self.expect_kind(TokenKind::Ident, "macro name")?;
                    let name = self.tok(t).text.to_string();
                    self.macro_remove(&name);
                } else if self.consume("warning")?.is_some() {
                    let at = self.cur;
                    let chain = self.consume_to_lnend()?;
                    let anchor = chain.or(Some(at));
                    let msg = self.chain_text(chain);
                    crate::error::print_warning(self, anchor, &msg);
                } else if self.consume("error")?.is_some() {
                    let at = self.cur;
                    let chain = self.consume_to_lnend()?;
                    let anchor = chain.or(Some(at));
                    let msg = self.chain_text(chain);
                    return Err(PrepError::user(msg, anchor));
                } else if self.consume("include_next")?.is_some() {
                    let skip = self.current_env().skip_index + 1;
                    self.drc_include(skip)?;
                } else if self.consume("include")?.is_some() {
                    self.drc_include(0)?;
                } else if self.consume("if")?.is_some() {
                    let on = self.ifcond()?;
                    self.cntlflow(on)?;
                } else if self.consume("ifdef")?.is_some() {
                    let at = self.cur;
                    let head = self
                        .consume_to_lnend()?
                        .ok_or_else(|| PrepError::directive("Expected identifier after ifdef", Some(at)))?;
                    let on = self.macro_test(head);
                    self.cntlflow(on)?;
                } else if self.consume("ifndef")?.is_some() {
                    let at = self.cur;
                    let head = self
                        .consume_to_lnend()?
                        .ok_or_else(|| PrepError::directive("Expected identifier after ifndef", Some(at)))?;
                    let on = !self.macro_test(head);
                    self.cntlflow(on)?;
                } else if self.cur_is("endif") || self.cur_is("elif") || self.cur_is("else") {
                    if is_top {
                        return Err(PrepError::directive("No matching #if for this directive", Some(self.cur)));
                    }
                    return Ok(());
                } else {
                    let text = self.tok(self.cur).text.to_string();
                    return Err(PrepError::directive(format!("Invalid directive: {}", text), Some(self.cur)));
                }
                continue;
            }

            if self.cur_kind() == TokenKind::Ident {
                let t = self.consume_any()?;
                self.macro_org = Some(t);
                match self.expand_ident(t)? {
                    Some((head, tail)) => self.append_output_chain(head, tail),
                    None => self.append_output(t),
                }
            } else {
                let t = self.consume_any()?;
                self.append_output(t);
            }
        }
        // Flush the EOF token's own leading whitespace, mirroring the
        // reference's unconditional `ocur = token_stitch(cur, ocur)` once
        // the loop exits via real end-of-input (not a stray terminator).
        self.append_output(self.cur);
        Ok(())
    }
}
