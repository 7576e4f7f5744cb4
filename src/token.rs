//! The atomic unit the rest of the engine works on: a classified slice of
//! source text plus the bookkeeping needed to reprint it faithfully and to
//! stop a macro from re-entering its own expansion.

use std::collections::BTreeSet;
use std::rc::Rc;

use crate::engine::{EnvId, MacroId};

/// Index into `Engine::tokens`. Cheap to copy, cheap to compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    Newline,
    DirectiveIntro,
    Ident,
    Number,
    Reserved,
    CharLiteral,
    StringLiteral,
    UserIncludePath,
    SystemIncludePath,
    End,
}

/// The set of macros already consumed in a token's derivation chain.
///
/// Shared and unioned by reference rather than walking a linked list, but
/// observably the same set: membership is by macro identity (`MacroId`),
/// union is idempotent, and it is only ever grown, never shrunk.
pub type UsedSet = Rc<BTreeSet<MacroId>>;

pub fn empty_used_set() -> UsedSet {
    thread_local! {
        static EMPTY: UsedSet = Rc::new(BTreeSet::new());
    }
    EMPTY.with(|e| e.clone())
}

pub fn union_used_set(a: &UsedSet, b: &UsedSet) -> UsedSet {
    if Rc::ptr_eq(a, b) || b.is_empty() {
        return a.clone();
    }
    if a.is_empty() {
        return b.clone();
    }
    let mut merged = (**a).clone();
    merged.extend(b.iter().copied());
    Rc::new(merged)
}

pub fn add_used_set(set: &UsedSet, m: MacroId) -> UsedSet {
    if set.contains(&m) {
        return set.clone();
    }
    let mut merged = (**set).clone();
    merged.insert(m);
    Rc::new(merged)
}

#[derive(Debug, Clone)]
pub struct TokenData {
    pub kind: TokenKind,
    /// Owned for synthetic tokens, but always just text to reprint.
    pub text: Rc<str>,
    pub env: EnvId,
    /// Byte offset of `text` in the owning environment's buffer, used for
    /// line/column reconstruction in diagnostics. `usize::MAX` for
    /// synthetic tokens with no source position.
    pub offset: usize,
    pub leading: Option<TokenId>,
    pub used: UsedSet,
    /// Set only for `__LINE__`/`__FILE__`: the call-site token whose
    /// environment and position should be reported instead of the
    /// definition site.
    pub macro_org: Option<TokenId>,
    pub next: Option<TokenId>,
}

impl TokenData {
    pub fn is(&self, s: &str) -> bool {
        matches!(self.kind, TokenKind::Ident | TokenKind::Reserved) && &*self.text == s
    }
}
