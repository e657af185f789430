//! Encoding file lists into the clipboard wire formats and decoding them back.
//!
//! Every function here is pure. Paths are treated as raw bytes, so non-UTF-8 paths survive the
//! trip unchanged.
//!
//! Each encoder first measures its output (the `*_len()` functions are that measuring pass),
//! allocates a buffer of exactly that capacity and fills it in one go. The returned buffer's
//! length always equals the measured length, which is what ends up advertised to the peer.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use crate::{SelectionOperation, Verb};

/// The URI scheme prefixed to every entry of a file list.
pub const FILE_SCHEME: &str = "file://";

/// Separator used by the plain text encodings.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum Delimiter {
    Space,
    Newline,
}

impl Delimiter {
    #[inline]
    pub fn byte(self) -> u8 {
        match self {
            Delimiter::Space => b' ',
            Delimiter::Newline => b'\n',
        }
    }
}

/// How a [`SelectionOperation`] is serialized for a request.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub enum WireEncoding {
    /// The verb on the first line, then the `file://` list. The only encoding carrying the verb.
    CopiedFiles,
    /// The `file://` list alone.
    UriList,
    /// Bare paths joined with the delimiter.
    PlainText(Delimiter),
}

/// Errors that can occur when decoding a file list.
#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum Error {
    #[error("The file list is empty")]
    Empty,

    #[error("Unknown operation {verb:?}, expected \"copy\" or \"cut\"")]
    UnknownVerb { verb: String },

    #[error("File list entry {segment:?} is not a file:// URI")]
    MissingScheme { segment: String },
}

#[inline]
fn path_bytes(path: &Path) -> &[u8] {
    path.as_os_str().as_bytes()
}

/// Returns the exact length of [`encode_file_list()`] output for `paths`.
pub fn file_list_len(paths: &[PathBuf]) -> usize {
    let entries: usize = paths
        .iter()
        .map(|path| FILE_SCHEME.len() + path_bytes(path).len())
        .sum();
    entries + paths.len().saturating_sub(1)
}

/// Returns the exact length of [`encode_verb_file_list()`] output.
pub fn verb_file_list_len(verb: Verb, paths: &[PathBuf]) -> usize {
    let entries: usize = paths
        .iter()
        .map(|path| 1 + FILE_SCHEME.len() + path_bytes(path).len())
        .sum();
    verb.wire_name().len() + entries
}

/// Returns the exact length of [`encode_plain_text()`] output.
pub fn plain_text_len(paths: &[PathBuf]) -> usize {
    let entries: usize = paths.iter().map(|path| path_bytes(path).len()).sum();
    entries + paths.len().saturating_sub(1)
}

/// Returns the exact length of [`encode()`] output.
pub fn encoded_len(encoding: WireEncoding, operation: &SelectionOperation) -> usize {
    match encoding {
        WireEncoding::CopiedFiles => verb_file_list_len(operation.verb(), operation.files()),
        WireEncoding::UriList => file_list_len(operation.files()),
        WireEncoding::PlainText(_) => plain_text_len(operation.files()),
    }
}

/// Encodes paths as `file://` URIs separated by newlines, without a trailing newline.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use x11_clipfiles::codec::encode_file_list;
///
/// let paths = ["/tmp/a.txt", "/tmp/b.txt"].map(PathBuf::from);
/// assert_eq!(encode_file_list(&paths), b"file:///tmp/a.txt\nfile:///tmp/b.txt");
/// ```
pub fn encode_file_list(paths: &[PathBuf]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(file_list_len(paths));
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            buf.push(b'\n');
        }
        buf.extend_from_slice(FILE_SCHEME.as_bytes());
        buf.extend_from_slice(path_bytes(path));
    }
    debug_assert_eq!(buf.len(), file_list_len(paths));
    buf
}

/// Encodes the verb followed by the `file://` URIs, one per line.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use x11_clipfiles::codec::encode_verb_file_list;
/// use x11_clipfiles::Verb;
///
/// let paths = [PathBuf::from("/tmp/a.txt")];
/// assert_eq!(encode_verb_file_list(Verb::Move, &paths), b"cut\nfile:///tmp/a.txt");
/// ```
pub fn encode_verb_file_list(verb: Verb, paths: &[PathBuf]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(verb_file_list_len(verb, paths));
    buf.extend_from_slice(verb.wire_name().as_bytes());
    for path in paths {
        buf.push(b'\n');
        buf.extend_from_slice(FILE_SCHEME.as_bytes());
        buf.extend_from_slice(path_bytes(path));
    }
    debug_assert_eq!(buf.len(), verb_file_list_len(verb, paths));
    buf
}

/// Joins bare paths with the delimiter.
///
/// Paths containing the delimiter are not escaped, so such a list can't be split back
/// unambiguously. Peers expect this format as is.
pub fn encode_plain_text(paths: &[PathBuf], delimiter: Delimiter) -> Vec<u8> {
    let mut buf = Vec::with_capacity(plain_text_len(paths));
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            buf.push(delimiter.byte());
        }
        buf.extend_from_slice(path_bytes(path));
    }
    debug_assert_eq!(buf.len(), plain_text_len(paths));
    buf
}

/// Encodes the operation in the given encoding.
pub fn encode(encoding: WireEncoding, operation: &SelectionOperation) -> Vec<u8> {
    match encoding {
        WireEncoding::CopiedFiles => encode_verb_file_list(operation.verb(), operation.files()),
        WireEncoding::UriList => encode_file_list(operation.files()),
        WireEncoding::PlainText(delimiter) => encode_plain_text(operation.files(), delimiter),
    }
}

/// Decodes newline-separated `file://` URIs into paths.
///
/// Empty lines are skipped. Any other line without the `file://` prefix fails the whole decode.
pub fn decode_file_list(bytes: &[u8]) -> Result<Vec<PathBuf>, Error> {
    bytes
        .split(|&b| b == b'\n')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            segment
                .strip_prefix(FILE_SCHEME.as_bytes())
                .map(|path| PathBuf::from(OsStr::from_bytes(path)))
                .ok_or_else(|| Error::MissingScheme {
                    segment: String::from_utf8_lossy(segment).into_owned(),
                })
        })
        .collect()
}

/// Decodes a verb line followed by newline-separated `file://` URIs.
///
/// # Examples
///
/// ```
/// use x11_clipfiles::codec::decode_verb_file_list;
/// use x11_clipfiles::Verb;
///
/// let (verb, paths) = decode_verb_file_list(b"copy\nfile:///tmp/a.txt").unwrap();
/// assert_eq!(verb, Verb::Copy);
/// assert_eq!(paths, ["/tmp/a.txt"].map(std::path::PathBuf::from));
/// ```
pub fn decode_verb_file_list(bytes: &[u8]) -> Result<(Verb, Vec<PathBuf>), Error> {
    if bytes.is_empty() {
        return Err(Error::Empty);
    }

    let (verb, rest) = match bytes.iter().position(|&b| b == b'\n') {
        Some(newline) => (&bytes[..newline], &bytes[newline + 1..]),
        None => (bytes, &[][..]),
    };

    let verb = Verb::from_wire_name(verb).ok_or_else(|| Error::UnknownVerb {
        verb: String::from_utf8_lossy(verb).into_owned(),
    })?;

    Ok((verb, decode_file_list(rest)?))
}
