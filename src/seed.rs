//! The fixed predefined-macro seed list and default system include
//! directories. Ported from `predefined[]`/`macro_predefine()` and the
//! `incdir` initializer in the reference implementation; values per
//! spec.md §6.

use std::path::PathBuf;

use crate::engine::Engine;
use crate::token::TokenKind;

/// `(name, value)` pairs seeded as object-like `NUMBER` macros at startup.
/// `__FILE__`/`__LINE__` are registered here too (with an unused empty
/// value) purely so `defined(__FILE__)`/`defined(__LINE__)` report true —
/// their actual expansion never consults this entry, since
/// `Engine::expand_recursive` short-circuits both names before any
/// macro-table lookup.
const PREDEFINED: &[(&str, &str)] = &[
    ("__FILE__", ""),
    ("__LINE__", ""),
    ("__x86_64", "1"),
    ("__x86_64__", "1"),
    ("__VERSION__", "0.1"),
    ("__STDC_VERSION__", "201112L"),
    ("__STDC__", "1"),
    ("__STDC_HOSTED__", "1"),
    ("__GNUC__", "13"),
    ("__GNUC_MINOR__", "3"),
];

pub fn seed_predefined(engine: &mut Engine) {
    for (name, value) in PREDEFINED {
        let tok = engine.token_instant(TokenKind::Number, value);
        engine.macro_add((*name).to_string(), None, Some(tok));
    }
}

/// The built-in system include search path, searched after any `-I`
/// directories (which are spliced in front by the caller).
pub fn default_include_dirs() -> Vec<PathBuf> {
    [
        "/usr/include/",
        "/usr/include/x86_64-linux-gnu/",
        "/usr/local/include/",
        "/usr/lib/gcc/x86_64-linux-gnu/13/include/",
    ]
    .iter()
    .map(PathBuf::from)
    .collect()
}
