use std::path::PathBuf;

mod copy;
mod state;

/// Returns absolute paths under `/tmp` for the given file names.
pub fn tmp_paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|name| PathBuf::from("/tmp").join(name)).collect()
}
