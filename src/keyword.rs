//! Recognizes the fixed set of directive names and multi-character
//! punctuators the lexer needs to special-case. Ported from the keyword
//! list `keywords_init()` builds in the reference implementation.

const KEYWORDS: &[&str] = &[
    "include_next", "include", "define", "undef", "defined", "warning",
    "error", "ifdef", "ifndef", "if", "else", "elif", "endif",
    ">>", "<<", "==", "!=", "<=", ">=", "--", "++", "&&", "||",
    "+=", "-=", "%=", "/=", "*=", "##", "...",
];

pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

/// Tries a 3-char then 2-char punctuator match at the start of `s`.
/// Returns the matched length if any.
pub fn match_punctuator(s: &str) -> Option<usize> {
    if s.len() >= 3 && is_keyword(&s[..3]) {
        return Some(3);
    }
    if s.len() >= 2 && is_keyword(&s[..2]) {
        return Some(2);
    }
    None
}
