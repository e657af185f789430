//! A safe Rust crate for copying, cutting and pasting files through the X11 clipboard.
//!
//! This crate is intended to be used by terminal applications and file management utilities which
//! don't own any visible windows. A copy or cut claims an X11 selection (`CLIPBOARD` by default)
//! and serves the file list to any client that asks for it; a paste asks the current owner for
//! the file list and performs the corresponding move or recursive copy into a directory.
//!
//! The file list is offered under several targets so that file managers and text editors alike
//! can paste it:
//!
//! - `x-special/gnome-copied-files`: the operation (`copy` or `cut`) followed by `file://` URIs,
//! - `text/uri-list`: the `file://` URIs alone,
//! - `UTF8_STRING`, `text/plain;charset=utf-8`: newline-separated paths,
//! - `STRING`, `TEXT`, `text/plain`: space-separated paths.
//!
//! For an example application using these features, see `x11-clipfiles-tools`, which implements a
//! command line utility on top of this crate.
//!
//! The code of the crate itself is 100% safe Rust. This doesn't include the dependencies.
//!
//! # Examples
//!
//! Copying two files to the regular clipboard:
//! ```no_run
//! # extern crate x11_clipfiles;
//! # fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! use x11_clipfiles::copy::Options;
//! use x11_clipfiles::resolve::resolve_paths;
//! use x11_clipfiles::{SelectionOperation, Verb};
//!
//! let files = resolve_paths(["notes.txt", "photos"])?;
//! let operation = SelectionOperation::new(Verb::Copy, files);
//!
//! // Blocks until some other client takes over the clipboard.
//! Options::new().copy(operation)?;
//! # Ok(())
//! # }
//! ```
//!
//! Pasting into the current directory:
//! ```no_run
//! # extern crate x11_clipfiles;
//! # fn foo() -> Result<(), Box<dyn std::error::Error>> {
//! use x11_clipfiles::paste::{paste, Error, Options};
//!
//! match paste(&Options::new(), ".".as_ref()) {
//!     Ok(operation) => println!("Pasted {} files", operation.sources.len()),
//!
//!     Err(Error::ClipboardEmpty) | Err(Error::NoFileList) => {
//!         // Nothing to paste.
//!     }
//!
//!     Err(err) => Err(err)?,
//! }
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/x11-clipfiles/0.1.0")]
#![deny(unsafe_code)]

use std::path::PathBuf;

#[cfg(test)]
mod tests;

pub mod codec;
pub mod copy;
pub mod files;
pub mod paste;
pub mod resolve;
pub mod target;
pub mod transport;
pub mod x11;

/// The clipboard to operate on.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum ClipboardType {
    /// The regular clipboard (the `CLIPBOARD` selection).
    #[default]
    Regular,
    /// The "primary" clipboard (the `PRIMARY` selection).
    Primary,
}

impl ClipboardType {
    /// Returns the name of the X11 selection backing this clipboard.
    #[inline]
    pub fn selection_name(self) -> &'static str {
        match self {
            ClipboardType::Regular => "CLIPBOARD",
            ClipboardType::Primary => "PRIMARY",
        }
    }
}

/// What should happen to the files when they are pasted.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Verb {
    /// The files are recursively copied into the destination.
    Copy,
    /// The files are moved into the destination.
    Move,
}

impl Verb {
    /// Returns the name of this verb on the wire.
    ///
    /// # Examples
    ///
    /// ```
    /// use x11_clipfiles::Verb;
    ///
    /// assert_eq!(Verb::Copy.wire_name(), "copy");
    /// assert_eq!(Verb::Move.wire_name(), "cut");
    /// ```
    #[inline]
    pub fn wire_name(self) -> &'static str {
        match self {
            Verb::Copy => "copy",
            Verb::Move => "cut",
        }
    }

    /// Parses a wire verb name. The match is exact and case-sensitive.
    pub fn from_wire_name(name: &[u8]) -> Option<Self> {
        match name {
            b"copy" => Some(Verb::Copy),
            b"cut" => Some(Verb::Move),
            _ => None,
        }
    }
}

/// A set of files captured for copying or cutting.
///
/// This is what a clipboard owner serves for its whole lifetime; it never changes after
/// creation.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct SelectionOperation {
    verb: Verb,
    files: Vec<PathBuf>,
}

impl SelectionOperation {
    /// Creates a new operation over absolute file paths.
    ///
    /// Use [`resolve::resolve_paths`] to turn user-supplied paths into absolute ones.
    #[inline]
    pub fn new(verb: Verb, files: Vec<PathBuf>) -> Self {
        Self { verb, files }
    }

    #[inline]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    #[inline]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}
