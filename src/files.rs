//! Moving and copying the pasted files.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::Verb;

/// Errors that can occur when moving or copying files.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("The destination {0:?} is not a directory")]
    NotADirectory(PathBuf),

    #[error("Couldn't access {path:?}")]
    MissingSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("The source {0:?} has no file name")]
    NoFileName(PathBuf),

    #[error("Can't paste {path:?} into itself")]
    IntoItself { path: PathBuf },

    #[error("{0:?} is already in the destination directory")]
    SameFile(PathBuf),

    #[error("More than one file would be pasted as {0:?}")]
    DuplicateName(PathBuf),

    #[error("Couldn't move {from:?} to {to:?}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't copy {from:?} to {to:?}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't read the directory tree")]
    Walk(#[source] walkdir::Error),

    #[error("Couldn't remove {path:?} after copying it")]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Moves or recursively copies every source into the destination directory.
///
/// Every source ends up as `destination/<file name>`. All sources are checked before anything is
/// touched; a failure midway leaves the already processed sources in place.
pub fn execute(verb: Verb, sources: &[PathBuf], destination: &Path) -> Result<(), Error> {
    let targets = check(sources, destination)?;

    for (source, target) in sources.iter().zip(&targets) {
        match verb {
            Verb::Move => move_path(source, target)?,
            Verb::Copy => copy_recursive(source, target)?,
        }
        info!("{} {:?} to {:?}", verb.wire_name(), source, target);
    }

    Ok(())
}

// Returns the target path of every source.
fn check(sources: &[PathBuf], destination: &Path) -> Result<Vec<PathBuf>, Error> {
    if !destination.is_dir() {
        return Err(Error::NotADirectory(destination.to_owned()));
    }

    let mut seen = HashSet::new();
    sources
        .iter()
        .map(|source| {
            fs::symlink_metadata(source).map_err(|source_err| Error::MissingSource {
                path: source.clone(),
                source: source_err,
            })?;

            if destination.starts_with(source) {
                return Err(Error::IntoItself {
                    path: source.clone(),
                });
            }

            let name = source
                .file_name()
                .ok_or_else(|| Error::NoFileName(source.clone()))?;
            let target = destination.join(name);
            if &target == source {
                return Err(Error::SameFile(source.clone()));
            }

            // A later source would overwrite an earlier one.
            if !seen.insert(target.clone()) {
                return Err(Error::DuplicateName(target));
            }

            Ok(target)
        })
        .collect()
}

fn move_path(source: &Path, target: &Path) -> Result<(), Error> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        // Renaming doesn't work across file systems.
        Err(err) if err.raw_os_error() == Some(libc::EXDEV) => {
            debug!("{:?} is on another file system, copying instead", source);
            copy_recursive(source, target)?;
            remove(source)
        }
        Err(err) => Err(Error::Rename {
            from: source.to_owned(),
            to: target.to_owned(),
            source: err,
        }),
    }
}

fn remove(path: &Path) -> Result<(), Error> {
    let result = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(err) => Err(err),
    };

    result.map_err(|err| Error::Remove {
        path: path.to_owned(),
        source: err,
    })
}

/// Copies `source` to `target`, descending into directories.
///
/// Symbolic links are recreated rather than followed. Existing files are overwritten.
pub fn copy_recursive(source: &Path, target: &Path) -> Result<(), Error> {
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(Error::Walk)?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let to = if relative.as_os_str().is_empty() {
            target.to_owned()
        } else {
            target.join(relative)
        };

        let file_type = entry.file_type();
        let result = if file_type.is_dir() {
            fs::create_dir_all(&to)
        } else if file_type.is_symlink() {
            fs::read_link(entry.path()).and_then(|link| symlink(link, &to))
        } else {
            fs::copy(entry.path(), &to).map(drop)
        };

        result.map_err(|err| Error::Copy {
            from: entry.path().to_owned(),
            to,
            source: err,
        })?;
    }

    Ok(())
}
