//! `#include`/`#include_next` path resolution. Ported from `inc_path_find`
//! in the reference implementation.

use std::path::PathBuf;

use crate::engine::Engine;

impl Engine {
    /// Resolves an include path to a file, starting the system-directory
    /// search at `skip`. `is_local` is true for a `"..."` include, false
    /// for a `<...>` include or `#include_next` (which never tries the
    /// including file's own directory).
    ///
    /// On success, returns the resolved path together with the index into
    /// `include_dirs` at which it was found — the new environment's
    /// `skip_index`, so a later `#include_next` inside that file resumes
    /// the search one directory further along.
    pub fn find_include(&self, fname: &str, skip: usize, is_local: bool) -> Option<(PathBuf, usize)> {
        if is_local && skip == 0 {
            if let Some(dir) = self.current_env().path.parent() {
                let candidate = dir.join(fname);
                if candidate.is_file() {
                    return Some((candidate, 0));
                }
            }
        }
        for (i, dir) in self.include_dirs.iter().enumerate() {
            if i < skip {
                continue;
            }
            let candidate = dir.join(fname);
            if candidate.is_file() {
                return Some((candidate, i));
            }
        }
        None
    }
}
