//! The selection targets offered by a clipboard owner.

use crate::codec::{Delimiter, WireEncoding};

/// Target listing all other targets.
pub const TARGETS: &str = "TARGETS";

/// Target returning the time the selection was claimed.
pub const TIMESTAMP: &str = "TIMESTAMP";

/// Target carrying the operation together with the file list. This is what pasting requests.
pub const COPIED_FILES: &str = "x-special/gnome-copied-files";

/// Target carrying the file list as `file://` URIs.
pub const URI_LIST: &str = "text/uri-list";

/// What a selection target name means to the owner.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum Target {
    /// The list of supported targets.
    Targets,
    /// The claim timestamp.
    Timestamp,
    /// The operation in some encoding.
    Data(WireEncoding),
}

/// Every supported target in the order they are advertised.
///
/// The table doesn't depend on the copied files.
pub const SUPPORTED: &[(&str, Target)] = &[
    (TARGETS, Target::Targets),
    (TIMESTAMP, Target::Timestamp),
    (COPIED_FILES, Target::Data(WireEncoding::CopiedFiles)),
    (URI_LIST, Target::Data(WireEncoding::UriList)),
    (
        "UTF8_STRING",
        Target::Data(WireEncoding::PlainText(Delimiter::Newline)),
    ),
    (
        "text/plain;charset=utf-8",
        Target::Data(WireEncoding::PlainText(Delimiter::Newline)),
    ),
    (
        "STRING",
        Target::Data(WireEncoding::PlainText(Delimiter::Space)),
    ),
    ("TEXT", Target::Data(WireEncoding::PlainText(Delimiter::Space))),
    (
        "text/plain",
        Target::Data(WireEncoding::PlainText(Delimiter::Space)),
    ),
];

/// Looks up a target by name.
///
/// # Examples
///
/// ```
/// use x11_clipfiles::codec::WireEncoding;
/// use x11_clipfiles::target::{lookup, Target};
///
/// assert_eq!(lookup("text/uri-list"), Some(Target::Data(WireEncoding::UriList)));
/// assert_eq!(lookup("image/png"), None);
/// ```
pub fn lookup(name: &str) -> Option<Target> {
    SUPPORTED
        .iter()
        .find(|(target_name, _)| *target_name == name)
        .map(|&(_, target)| target)
}

/// Returns every distinct encoding that some target maps to.
pub fn encodings() -> impl Iterator<Item = WireEncoding> {
    let mut seen = Vec::new();
    SUPPORTED.iter().filter_map(move |&(_, target)| match target {
        Target::Data(encoding) if !seen.contains(&encoding) => {
            seen.push(encoding);
            Some(encoding)
        }
        _ => None,
    })
}
