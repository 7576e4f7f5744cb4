//! The expansion engine: recursive macro expansion with hygiene, argument
//! pre-expansion, and the `#`/`##`/`__VA_ARGS__` substitution pass.
//!
//! Ported from `expand_macro`/`expand_recursive`/`expand_obj`/`expand_func`/
//! `expand_def`/`expand_recursive_list` in the reference implementation.
//! The reference walks a `Token **` (pointer-to-link-slot) to splice
//! expansion results in place; here every such slot is either `head`
//! (a local variable holding the chain's first id) or `prev`'s `.next`
//! field, updated explicitly via `set_next`.

use crate::engine::{Engine, MacroId};
use crate::error::PrepError;
use crate::token::{add_used_set, TokenId, UsedSet};

impl Engine {
    /// Duplicates a macro's replacement body, tagging every copied token
    /// with `used ∪ {mid}` so hygiene can later recognize a self-reference.
    fn expand_def(&mut self, mid: MacroId, used: UsedSet) -> TokenId {
        let merged = add_used_set(&used, mid);
        let replacement = self.definition(mid).replacement;
        let mut head: Option<TokenId> = None;
        let mut prev: Option<TokenId> = None;
        let mut t = Some(replacement);
        while let Some(tid) = t {
            let dup = self.dup_token(tid);
            self.tok_mut(dup).used = merged.clone();
            match prev {
                None => head = Some(dup),
                Some(p) => self.set_next(p, Some(dup)),
            }
            prev = Some(dup);
            t = self.next_of(tid);
        }
        head.expect("a macro's replacement body is never an empty chain")
    }

    /// Recursively expands every token in the self-contained chain starting
    /// at `head`, splicing each expansion's result in place. Returns
    /// `(new_head, new_tail)`.
    fn expand_recursive_list(&mut self, head: TokenId) -> Result<(TokenId, TokenId), PrepError> {
        let mut out_head: Option<TokenId> = None;
        let mut out_prev: Option<TokenId> = None;
        let mut t = head;
        loop {
            let (exp_head, resume) = self.expand_recursive(t)?;
            match out_prev {
                None => out_head = Some(exp_head),
                Some(p) => self.set_next(p, Some(exp_head)),
            }
            out_prev = Some(resume);
            match self.next_of(resume) {
                Some(n) => t = n,
                None => break,
            }
        }
        Ok((out_head.unwrap(), out_prev.unwrap()))
    }

    /// Expands the object-like macro invocation `t`, splicing the
    /// recursively-expanded body in place of `t`. Returns `(head, tail)` of
    /// the spliced-in chain; `tail.next` already points past the original
    /// invocation token.
    fn expand_obj(&mut self, t: TokenId, mid: MacroId) -> Result<(TokenId, TokenId), PrepError> {
        let used = self.tok(t).used.clone();
        let dup_head = self.expand_def(mid, used);
        let (exp_head, exp_tail) = self.expand_recursive_list(dup_head)?;
        let after = self.next_of(t);
        self.set_next(exp_tail, after);
        Ok((exp_head, exp_tail))
    }

    /// Expands the function-like macro invocation `saddr(args...)`:
    /// pre-expands each argument, substitutes `#`/`##`/`__VA_ARGS__`/bare
    /// parameters into a duplicated copy of the body, then rescans the
    /// result. Returns `(head, tail)`; `tail.next` points past the call's
    /// closing `)`.
    fn expand_func(&mut self, saddr: TokenId, mid: MacroId) -> Result<(TokenId, TokenId), PrepError> {
        let open_paren = self.next_of(saddr).expect("function-like call has '(' next");
        let te = self.skip_after_func(saddr);

        let mut prev_arg = open_paren;
        let mut t = self.next_of(open_paren);
        while let Some(tid) = t {
            if Some(tid) == te {
                break;
            }
            let (exp_head, resume) = self.expand_recursive(tid)?;
            self.set_next(prev_arg, Some(exp_head));
            prev_arg = resume;
            t = self.next_of(resume);
        }

        let used = self.tok(saddr).used.clone();
        let mut head = self.expand_def(mid, used);
        let call_leading = self.tok(saddr).leading;
        self.tok_mut(head).leading = call_leading;

        let params = self.definition(mid).params.clone().unwrap_or_default();

        let mut prev: Option<TokenId> = None;
        let mut cur = Some(head);
        while let Some(taddr) = cur {
            if self.tok(taddr).is("#") {
                let name_tok = self
                    .next_of(taddr)
                    .ok_or_else(|| PrepError::expansion("Bad use of '#'", Some(taddr)))?;
                let name = self.tok(name_tok).text.clone();
                let matched = self.matched_arg(&name, &params, saddr);
                let (ts, tdelim) = matched
                    .ok_or_else(|| PrepError::expansion("No following parameter to '#'", Some(name_tok)))?;
                self.stringify(name_tok, ts, tdelim);
                match prev {
                    None => head = name_tok,
                    Some(p) => self.set_next(p, Some(name_tok)),
                }
                prev = Some(name_tok);
                cur = self.next_of(name_tok);
            } else if self.tok(taddr).is("##") {
                let prev_id = prev.ok_or_else(|| PrepError::expansion("Bad use of '##'", Some(taddr)))?;
                let rhs = self
                    .next_of(taddr)
                    .ok_or_else(|| PrepError::expansion("Bad use of '##'", Some(taddr)))?;
                self.set_next(prev_id, Some(rhs));
                self.tok_mut(rhs).leading = None;

                let name = self.tok(rhs).text.clone();
                let mut splice_tail = rhs;
                if let Some((ts, tdelim)) = self.matched_arg(&name, &params, saddr) {
                    let (rhead, rtail) = self.replace_arg(rhs, ts, tdelim);
                    self.set_next(prev_id, Some(rhead));
                    splice_tail = rtail;
                }
                let after = self.next_of(splice_tail);
                self.concat_chain(prev_id, after);

                prev = Some(prev_id);
                cur = self.next_of(prev_id);
            } else if self.tok(taddr).is("__VA_ARGS__") {
                let (ts, tdelim) = self
                    .matched_arg("...", &params, saddr)
                    .ok_or_else(|| {
                        PrepError::expansion("No matched func param(...) for __VA_ARGS__", Some(taddr))
                    })?;
                let mut td = tdelim.expect("the argument list is terminated by ')'");
                while !self.tok(td).is(")") {
                    td = self.next_of(td).expect("the argument list is terminated by ')'");
                }
                let (rhead, rtail) = self.replace_arg(taddr, ts, Some(td));
                match prev {
                    None => head = rhead,
                    Some(p) => self.set_next(p, Some(rhead)),
                }
                prev = Some(rtail);
                cur = self.next_of(rtail);
            } else {
                let name = self.tok(taddr).text.clone();
                match self.matched_arg(&name, &params, saddr) {
                    Some((ts, tdelim)) => {
                        let (rhead, rtail) = self.replace_arg(taddr, ts, tdelim);
                        match prev {
                            None => head = rhead,
                            Some(p) => self.set_next(p, Some(rhead)),
                        }
                        prev = Some(rtail);
                        cur = self.next_of(rtail);
                    }
                    None => {
                        prev = Some(taddr);
                        cur = self.next_of(taddr);
                    }
                }
            }
        }

        let (exp_head, exp_tail) = self.expand_recursive_list(head)?;
        let after_call = self.skip_after_func(saddr);
        self.set_next(exp_tail, after_call);
        Ok((exp_head, exp_tail))
    }

    /// The recursive expansion step used inside replacement bodies and for
    /// argument pre-expansion: if `t` names a macro usable in this context
    /// and hasn't already been used in its own derivation, expands it and
    /// splices the result in place; otherwise returns `t` unchanged.
    /// Returns `(expansion_head, resume_point)`.
    pub fn expand_recursive(&mut self, t: TokenId) -> Result<(TokenId, TokenId), PrepError> {
        if self.tok(t).is("__LINE__") || self.tok(t).is("__FILE__") {
            self.tok_mut(t).macro_org = self.macro_org;
            return Ok((t, t));
        }

        let next = self.next_of(t);
        let following_open_paren = next.map_or(false, |n| self.tok(n).is("("));
        let name = self.tok(t).text.clone();
        let mid = match self.macro_lookup(&name, following_open_paren) {
            Some(m) => m,
            None => return Ok((t, t)),
        };
        if self.tok(t).used.contains(&mid) {
            return Ok((t, t));
        }

        let def_is_func = self.definition(mid).params.is_some();
        if def_is_func && following_open_paren {
            self.expand_func(t, mid)
        } else {
            self.expand_obj(t, mid)
        }
    }

    /// Entry point used by both the directive executor's output loop and
    /// the constant-expression evaluator: `name` has just been consumed
    /// from the live token stream, with `self.cur` already holding the
    /// following lookahead. If `name` names an active macro, captures a
    /// following argument list from the live stream when function-like,
    /// fully expands it (recursing through rescans), and returns
    /// `Some((head, tail))` of the expansion. Returns `None` if `name` is
    /// not a macro invocation, in which case the caller treats `name` as
    /// an ordinary token.
    pub fn expand_ident(&mut self, name: TokenId) -> Result<Option<(TokenId, TokenId)>, PrepError> {
        // __LINE__/__FILE__ bypass the macro table entirely (and so stay
        // immune to #undef), so this check must run before macro_lookup,
        // not rely on falling into expand_recursive's own check below.
        if self.tok(name).is("__LINE__") || self.tok(name).is("__FILE__") {
            let leading = self.tok(name).leading;
            let (head, tail) = self.expand_recursive(name)?;
            self.tok_mut(head).leading = leading;
            return Ok(Some((head, tail)));
        }

        let following_open_paren = self.cur_is("(");
        let text = self.tok(name).text.clone();
        let mid = match self.macro_lookup(&text, following_open_paren) {
            Some(m) => m,
            None => return Ok(None),
        };

        if self.definition(mid).params.is_some() && following_open_paren {
            let args = self.consume_func_args()?;
            self.set_next(name, Some(args));
        }

        let leading = self.tok(name).leading;
        let (head, tail) = self.expand_recursive(name)?;
        self.tok_mut(head).leading = leading;
        Ok(Some((head, tail)))
    }
}
