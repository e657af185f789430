//! Turning user-supplied paths into canonical absolute paths.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur when resolving paths.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("No files were specified")]
    NoFiles,

    #[error("Couldn't resolve {path:?}")]
    Unresolved {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0:?} is not a directory")]
    NotADirectory(PathBuf),
}

/// Resolves a single path, following symbolic links.
pub fn resolve_path(path: &Path) -> Result<PathBuf, Error> {
    fs::canonicalize(path).map_err(|source| Error::Unresolved {
        path: path.to_owned(),
        source,
    })
}

/// Resolves every path, stopping at the first one that can't be resolved.
///
/// The order of the paths is preserved. An empty list is an error.
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipfiles;
/// # use x11_clipfiles::resolve::Error;
/// # fn foo() -> Result<(), Error> {
/// use x11_clipfiles::resolve::resolve_paths;
///
/// let paths = resolve_paths(["Cargo.toml", "src"])?;
/// assert!(paths.iter().all(|path| path.is_absolute()));
/// # Ok(())
/// # }
/// ```
pub fn resolve_paths<I, P>(paths: I) -> Result<Vec<PathBuf>, Error>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let resolved = paths
        .into_iter()
        .map(|path| resolve_path(path.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;

    if resolved.is_empty() {
        return Err(Error::NoFiles);
    }

    Ok(resolved)
}

/// Resolves a path that must be a directory.
pub fn resolve_directory(path: &Path) -> Result<PathBuf, Error> {
    let resolved = resolve_path(path)?;
    if !resolved.is_dir() {
        return Err(Error::NotADirectory(resolved));
    }
    Ok(resolved)
}
