//! Top-level entry point: seeds the predefined macros, drives the
//! directive executor over the root file, and reprints the resulting
//! output chain to a string.
//!
//! Ported from the setup/teardown `main()` does in the reference
//! implementation around `macro_predefine`/`env_push`/`stmt(1)`/
//! `print_tokens`.

use std::path::{Path, PathBuf};

use crate::engine::Engine;
use crate::error::{format_diagnostic, PrepError};
use crate::token::{TokenId, TokenKind};

/// Preprocesses the file at `path`. `include_dirs` is searched, in the
/// order given, before the fixed system include list from [`crate::seed`].
///
/// On success, returns the fully expanded, directive-free source text. On
/// failure, the error's message already has the offending line/column
/// rendered into it (via [`format_diagnostic`]), so callers only need
/// `Display` on the result — the `Engine` the position was computed
/// against does not outlive this call.
pub fn preprocess_file(path: &Path, include_dirs: &[PathBuf]) -> Result<String, PrepError> {
    let mut dirs = include_dirs.to_vec();
    dirs.extend(crate::seed::default_include_dirs());

    let mut engine = Engine::new(dirs);
    crate::seed::seed_predefined(&mut engine);

    let content = std::fs::read_to_string(path)
        .map_err(|e| PrepError::io(format!("Cannot open file \"{}\": {}", path.display(), e)))?;
    engine.push_env(path.to_path_buf(), content, 0);

    let result = engine.stmt(true);
    engine.pop_env();

    match result {
        Ok(()) => Ok(print_chain(&engine)),
        Err(e) => {
            let message = format_diagnostic(&engine, e.at, &e.message);
            Err(PrepError::new(e.kind, message, None))
        }
    }
}

/// Reprints the accumulated output chain: each token's leading whitespace
/// followed by its own text, with `__LINE__`/`__FILE__` resolved against
/// whichever call site stamped their `macro_org`.
fn print_chain(engine: &Engine) -> String {
    let mut out = String::new();
    let mut t = engine.output_head;
    while let Some(tid) = t {
        if let Some(lead) = engine.tok(tid).leading {
            out.push_str(&engine.tok(lead).text);
        }
        append_token_text(engine, &mut out, tid);
        t = engine.next_of(tid);
    }
    out
}

fn append_token_text(engine: &Engine, out: &mut String, tid: TokenId) {
    let data = engine.tok(tid);
    match data.kind {
        TokenKind::End => {}
        TokenKind::StringLiteral => {
            out.push('"');
            out.push_str(&data.text);
            out.push('"');
        }
        TokenKind::CharLiteral => {
            out.push('\'');
            out.push_str(&data.text);
            out.push('\'');
        }
        _ if data.is("__LINE__") => {
            let anchor = data.macro_org.unwrap_or(tid);
            let (_, line, _, _) = engine.position_of(anchor);
            out.push_str(&line.to_string());
        }
        _ if data.is("__FILE__") => {
            let anchor = data.macro_org.unwrap_or(tid);
            let (path, _, _, _) = engine.position_of(anchor);
            out.push('"');
            out.push_str(&path);
            out.push('"');
        }
        _ => out.push_str(&data.text),
    }
}
