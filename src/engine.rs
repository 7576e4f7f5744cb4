//! The process-wide context: token arena, environment stack, macro table.
//!
//! The reference implementation keeps all of this in C globals (`env`,
//! `macro`, `cur`, `macro_org`). Per spec.md's design notes this is
//! re-architected as a single `Engine` context threaded by reference, with
//! tokens, environments and macros addressed by arena index instead of raw
//! pointers.

use std::path::PathBuf;
use std::rc::Rc;

use crate::error::PrepError;
use crate::token::{empty_used_set, TokenData, TokenId, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnvId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MacroId(pub u32);

pub struct EnvRecord {
    pub path: PathBuf,
    pub buffer: Rc<str>,
    pub cursor: usize,
    /// Index in `Engine::include_dirs` where this file was found; used to
    /// resume the search for `#include_next`.
    pub skip_index: usize,
    /// The lookahead token of the *outer* frame, saved across a push so it
    /// can be restored on pop. `None` while this frame is the active one.
    pub saved_lookahead: Option<TokenId>,
}

#[derive(Debug, Clone)]
pub struct Definition {
    pub name: String,
    /// `None` for object-like macros. `Some(vec![])` is still function-like
    /// (zero-parameter call).
    pub params: Option<Vec<String>>,
    pub replacement: TokenId,
}

pub struct Engine {
    pub tokens: Vec<TokenData>,
    pub envs: Vec<EnvRecord>,
    pub env_stack: Vec<EnvId>,
    pub macros: Vec<Definition>,
    pub macro_by_name: std::collections::HashMap<String, MacroId>,
    /// The current lookahead token ("cur" in the reference implementation).
    pub cur: TokenId,
    /// The call-site token whose line/file should be reported by a nested
    /// `__LINE__`/`__FILE__`.
    pub macro_org: Option<TokenId>,
    pub include_dirs: Vec<PathBuf>,
    /// Head/tail of the accumulated output chain, built by the directive
    /// executor across the whole transitive include graph. A single chain
    /// shared globally, exactly as `ocur` is a single global in the
    /// reference implementation: an included file's content is spliced
    /// into the same stream as its includer's, not a separate one.
    pub output_head: Option<TokenId>,
    pub output_tail: Option<TokenId>,
    /// Whether the last non-whitespace token lexed (anywhere, across every
    /// environment) was a newline or start-of-file — the condition under
    /// which a `#` is a directive intro. This is deliberately a single
    /// flag never saved or restored across `push_env`/`pop_env`: a `#` on
    /// the first line of an included file is a directive intro only if the
    /// *including* file's last token before the push was itself a newline,
    /// matching the reference implementation's single global `preid`.
    pub at_line_start: bool,
}

impl Engine {
    pub fn new(include_dirs: Vec<PathBuf>) -> Self {
        let mut engine = Engine {
            tokens: Vec::new(),
            envs: Vec::new(),
            env_stack: Vec::new(),
            macros: Vec::new(),
            macro_by_name: std::collections::HashMap::new(),
            cur: TokenId(0),
            macro_org: None,
            include_dirs,
            output_head: None,
            output_tail: None,
            at_line_start: true,
        };
        // Synthetic environment backing instant/zero-position tokens.
        engine.envs.push(EnvRecord {
            path: PathBuf::from("<internal>"),
            buffer: Rc::from(""),
            cursor: 0,
            skip_index: 0,
            saved_lookahead: None,
        });
        let placeholder = engine.new_token(TokenKind::End, EnvId(0), usize::MAX, "");
        engine.cur = placeholder;
        engine
    }

    pub fn tok(&self, id: TokenId) -> &TokenData {
        &self.tokens[id.0 as usize]
    }

    pub fn tok_mut(&mut self, id: TokenId) -> &mut TokenData {
        &mut self.tokens[id.0 as usize]
    }

    pub fn new_token(&mut self, kind: TokenKind, env: EnvId, offset: usize, text: &str) -> TokenId {
        let id = TokenId(self.tokens.len() as u32);
        self.tokens.push(TokenData {
            kind,
            text: Rc::from(text),
            env,
            offset,
            leading: None,
            used: empty_used_set(),
            macro_org: None,
            next: None,
        });
        id
    }

    /// A token with no source position, for compiler-synthesized text
    /// (stringize/concat results, argument-normalization fillers, the
    /// predefined-macro seed values).
    pub fn token_instant(&mut self, kind: TokenKind, text: &str) -> TokenId {
        let env = self.current_env_id();
        self.new_token(kind, env, usize::MAX, text)
    }

    pub fn dup_token(&mut self, id: TokenId) -> TokenId {
        let mut data = self.tokens[id.0 as usize].clone();
        data.next = None;
        let new_id = TokenId(self.tokens.len() as u32);
        self.tokens.push(data);
        new_id
    }

    pub fn set_next(&mut self, id: TokenId, next: Option<TokenId>) {
        self.tok_mut(id).next = next;
    }

    pub fn next_of(&self, id: TokenId) -> Option<TokenId> {
        self.tok(id).next
    }

    /// Concatenates `dest`'s text with every token from `dest.next` through
    /// (excluding) `delim` into `dest`, then links `dest` directly to
    /// `delim`. Mirrors `token_concat` in the reference implementation.
    pub fn concat_chain(&mut self, dest: TokenId, delim: Option<TokenId>) {
        let mut buf = String::from(&*self.tok(dest).text);
        let mut cursor = self.tok(dest).next;
        while let Some(c) = cursor {
            if Some(c) == delim {
                break;
            }
            buf.push_str(&self.tok(c).text);
            cursor = self.tok(c).next;
        }
        self.tok_mut(dest).text = Rc::from(buf.as_str());
        self.tok_mut(dest).next = delim;
    }

    /// Replaces a parameter token's argument range in the chain. Returns
    /// the (head, tail) of the duplicated, used-set-merged range. The
    /// caller is responsible for linking whatever preceded the original
    /// parameter token to `head`; `tail.next` is already wired to whatever
    /// followed the parameter token.
    pub fn replace_arg(&mut self, target: TokenId, start: TokenId, delim: Option<TokenId>) -> (TokenId, TokenId) {
        let used = self.tok(target).used.clone();
        let leading = self.tok(target).leading;
        let after = self.tok(target).next;

        let mut head: Option<TokenId> = None;
        let mut tail: Option<TokenId> = None;
        let mut t = Some(start);
        while let Some(tid) = t {
            if Some(tid) == delim {
                break;
            }
            let dup = self.dup_token(tid);
            let merged = crate::token::union_used_set(&self.tok(dup).used, &used);
            self.tok_mut(dup).used = merged;
            match head {
                None => {
                    head = Some(dup);
                    self.tok_mut(dup).leading = leading;
                }
                Some(_) => self.set_next(tail.unwrap(), Some(dup)),
            }
            tail = Some(dup);
            let next = self.tok(tid).next;
            if next == delim {
                t = None;
            } else {
                t = next;
            }
        }
        let head = head.expect("argument normalization guarantees a non-empty range");
        let tail = tail.unwrap();
        self.set_next(tail, after);
        (head, tail)
    }

    /// Converts `ts`'s token range (through `delim`, exclusive) into a
    /// single string-literal token written over `dest`.
    pub fn stringify(&mut self, dest: TokenId, ts: TokenId, delim: Option<TokenId>) {
        self.concat_chain(ts, delim);
        let text = self.tok(ts).text.clone();
        let leading = self.token_instant(TokenKind::Whitespace, " ");
        let d = self.tok_mut(dest);
        d.text = text;
        d.kind = TokenKind::StringLiteral;
        d.leading = Some(leading);
    }

    pub fn current_env_id(&self) -> EnvId {
        *self.env_stack.last().unwrap_or(&EnvId(0))
    }

    pub fn current_env(&self) -> &EnvRecord {
        &self.envs[self.current_env_id().0 as usize]
    }

    pub fn current_env_mut(&mut self) -> &mut EnvRecord {
        let id = self.current_env_id();
        &mut self.envs[id.0 as usize]
    }

    pub fn push_env(&mut self, path: PathBuf, buffer: String, skip_index: usize) {
        if let Some(&top) = self.env_stack.last() {
            self.envs[top.0 as usize].saved_lookahead = Some(self.cur);
        }
        let env_id = EnvId(self.envs.len() as u32);
        self.envs.push(EnvRecord {
            path,
            buffer: Rc::from(buffer.as_str()),
            cursor: 0,
            skip_index,
            saved_lookahead: None,
        });
        self.env_stack.push(env_id);
        let empty = self.token_instant(TokenKind::Whitespace, "");
        self.cur = empty;
    }

    pub fn pop_env(&mut self) {
        self.env_stack.pop();
        if let Some(&top) = self.env_stack.last() {
            let rec = &mut self.envs[top.0 as usize];
            self.cur = rec.saved_lookahead.take().expect("env was pushed, so a lookahead was saved");
        }
    }

    /// Adds a macro definition. `replacement` of `None` stores the empty
    /// sentinel whitespace token (an empty macro body); otherwise the chain
    /// is run through argument normalization first, matching the reference
    /// implementation's unconditional `token_norm_args(to)` in `macro_add`
    /// (applied regardless of whether `params` is a function-like list,
    /// since an object-like body may still contain a call to another
    /// function-like macro with empty argument slots).
    pub fn macro_add(&mut self, name: String, params: Option<Vec<String>>, replacement: Option<TokenId>) -> MacroId {
        let replacement = match replacement {
            Some(r) => self.normalize_args(Some(r)).unwrap(),
            None => self.token_instant(TokenKind::Whitespace, ""),
        };
        let id = MacroId(self.macros.len() as u32);
        self.macros.push(Definition { name: name.clone(), params, replacement });
        self.macro_by_name.insert(name, id);
        id
    }

    pub fn macro_remove(&mut self, name: &str) {
        self.macro_by_name.remove(name);
    }

    pub fn macro_defined(&self, name: &str) -> bool {
        self.macro_by_name.contains_key(name)
    }

    /// Looks up a macro by name, applying the object-like/function-like
    /// parenthesis disambiguation: object-like macros only match when the
    /// following token is *not* `(`; function-like macros only match when
    /// it is.
    pub fn macro_lookup(&self, name: &str, following_is_open_paren: bool) -> Option<MacroId> {
        let id = *self.macro_by_name.get(name)?;
        let def = &self.macros[id.0 as usize];
        if def.params.is_some() == following_is_open_paren {
            Some(id)
        } else {
            None
        }
    }

    pub fn definition(&self, id: MacroId) -> &Definition {
        &self.macros[id.0 as usize]
    }

    /// Computes `(path, line, column, source_line)` for a token, for
    /// diagnostics. 1-based line and column, per spec.md §7.
    pub fn position_of(&self, id: TokenId) -> (String, usize, usize, String) {
        let tok = self.tok(id);
        let env = &self.envs[tok.env.0 as usize];
        let offset = if tok.offset == usize::MAX { 0 } else { tok.offset };

        let mut line = 1usize;
        let mut line_start = 0usize;
        for (i, b) in env.buffer.as_bytes().iter().enumerate() {
            if i >= offset {
                break;
            }
            if *b == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        let col = offset - line_start + 1;
        let line_end = env.buffer[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or_else(|| env.buffer.len());
        let source_line = env.buffer[line_start..line_end].to_string();

        (env.path.to_string_lossy().to_string(), line, col, source_line)
    }

    pub fn error_at(&self, kind: crate::error::ErrorKind, msg: impl Into<String>, at: TokenId) -> PrepError {
        PrepError::new(kind, msg, Some(at))
    }

    /// Appends a single token to the output chain. Mirrors
    /// `ocur = token_stitch(t, ocur)`.
    pub fn append_output(&mut self, id: TokenId) {
        match self.output_tail {
            None => self.output_head = Some(id),
            Some(tail) => self.set_next(tail, Some(id)),
        }
        self.output_tail = Some(id);
    }

    /// Appends a whole `[head, tail]` chain to the output, advancing the
    /// output cursor to `tail`. Mirrors `ocur->next = expand_macro(&t); ocur
    /// = t;`.
    pub fn append_output_chain(&mut self, head: TokenId, tail: TokenId) {
        match self.output_tail {
            None => self.output_head = Some(head),
            Some(t) => self.set_next(t, Some(head)),
        }
        self.output_tail = Some(tail);
    }
}
