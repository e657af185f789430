//! Pasting files from the clipboard.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, warn};

use crate::codec::{self, decode_verb_file_list};
use crate::files;
use crate::target::COPIED_FILES;
use crate::transport::{self, Response, Transport};
use crate::x11::X11Transport;
use crate::{ClipboardType, Verb};

/// How long to wait for the clipboard owner by default.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Options and flags that are used to customize the pasting.
#[derive(Clone, Eq, PartialEq, Debug, Hash, PartialOrd, Ord)]
pub struct Options {
    /// The clipboard to work with.
    clipboard: ClipboardType,

    /// The X display to connect to.
    ///
    /// If `None`, the `DISPLAY` environment variable is used.
    display: Option<String>,

    /// How long to wait for the clipboard owner to reply.
    timeout: Duration,
}

impl Default for Options {
    #[inline]
    fn default() -> Self {
        Self {
            clipboard: ClipboardType::default(),
            display: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Files to paste, decoded from the clipboard.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PasteOperation {
    /// Whether to move or copy the files.
    pub verb: Verb,
    /// Absolute paths of the files.
    pub sources: Vec<PathBuf>,
    /// The directory to paste into.
    pub destination: PathBuf,
}

/// Errors that can occur for pasting.
///
/// You may want to ignore some of these errors (rather than show an error message), like
/// `ClipboardEmpty` or `NoFileList` as they are essentially equivalent to an empty clipboard.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("The clipboard is empty")]
    ClipboardEmpty,

    #[error("The clipboard doesn't contain files")]
    NoFileList,

    #[error("The clipboard contains a malformed file list")]
    Malformed(#[source] codec::Error),

    #[error("The file list in the clipboard is empty")]
    NoFiles,

    #[error("The clipboard contains a relative path {0:?}")]
    RelativePath(PathBuf),

    #[error("X server communication error")]
    Transport(#[source] transport::Error),

    #[error("Couldn't paste the files")]
    Execute(#[source] files::Error),
}

impl From<transport::Error> for Error {
    fn from(x: transport::Error) -> Self {
        Error::Transport(x)
    }
}

impl Options {
    /// Creates a blank new set of options ready for configuration.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clipboard to work with.
    #[inline]
    pub fn clipboard(&mut self, clipboard: ClipboardType) -> &mut Self {
        self.clipboard = clipboard;
        self
    }

    /// Sets the X display to connect to.
    ///
    /// If `None`, the `DISPLAY` environment variable is used.
    #[inline]
    pub fn display(&mut self, display: Option<String>) -> &mut Self {
        self.display = display;
        self
    }

    /// Sets how long to wait for the clipboard owner to reply.
    ///
    /// Not getting a reply in time counts as an empty clipboard.
    #[inline]
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.timeout = timeout;
        self
    }
}

impl PasteOperation {
    /// Moves or copies the files into the destination.
    #[inline]
    pub fn execute(&self) -> Result<(), files::Error> {
        files::execute(self.verb, &self.sources, &self.destination)
    }
}

/// Retrieves the files in the clipboard without touching them.
///
/// `destination` is not checked here, it is only recorded in the returned operation.
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipfiles;
/// # use x11_clipfiles::paste::Error;
/// # fn foo() -> Result<(), Error> {
/// use x11_clipfiles::paste::{get_operation, Options};
///
/// let operation = get_operation(&Options::new(), "/tmp".as_ref())?;
/// for source in &operation.sources {
///     println!("{:?} {}", operation.verb, source.display());
/// }
/// # Ok(())
/// # }
/// ```
pub fn get_operation(options: &Options, destination: &Path) -> Result<PasteOperation, Error> {
    let mut transport = X11Transport::connect(options.display.as_deref(), options.clipboard)?;
    get_operation_internal(&mut transport, options.timeout, destination)
}

// The internal function accepts the transport, used for tests.
pub(crate) fn get_operation_internal<T: Transport>(
    transport: &mut T,
    timeout: Duration,
    destination: &Path,
) -> Result<PasteOperation, Error> {
    if !transport.has_owner()? {
        return Err(Error::ClipboardEmpty);
    }

    let time = transport.timestamp()?;
    transport.request(COPIED_FILES, time)?;

    let payload = match transport.wait_for_response(timeout)? {
        Response::Data(payload) => payload,
        Response::Refused => return Err(Error::NoFileList),
        Response::TimedOut => {
            warn!("The clipboard owner didn't reply within {:?}", timeout);
            return Err(Error::ClipboardEmpty);
        }
    };

    let (verb, sources) = decode_verb_file_list(&payload).map_err(Error::Malformed)?;
    if sources.is_empty() {
        return Err(Error::NoFiles);
    }

    // Either every file is pasted or none is.
    if let Some(path) = sources.iter().find(|path| !path.is_absolute()) {
        return Err(Error::RelativePath(path.clone()));
    }

    debug!("Got {:?} of {} files", verb, sources.len());

    Ok(PasteOperation {
        verb,
        sources,
        destination: destination.to_owned(),
    })
}

/// Pastes the files in the clipboard into `destination`.
///
/// Returns the executed operation.
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipfiles;
/// # use x11_clipfiles::paste::Error;
/// # fn foo() -> Result<(), Error> {
/// use x11_clipfiles::paste::{paste, Options};
///
/// let operation = paste(&Options::new(), "/tmp".as_ref())?;
/// println!("Pasted {} files", operation.sources.len());
/// # Ok(())
/// # }
/// ```
pub fn paste(options: &Options, destination: &Path) -> Result<PasteOperation, Error> {
    let operation = get_operation(options, destination)?;
    operation.execute().map_err(Error::Execute)?;
    Ok(operation)
}
