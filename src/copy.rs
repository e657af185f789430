//! Copying and cutting files to the clipboard.

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::codec::{self, WireEncoding};
use crate::target::{self, Target};
use crate::transport::{self, OwnerEvent, Reply, Request, Timestamp, Transport, CURRENT_TIME};
use crate::x11::X11Transport;
use crate::{ClipboardType, SelectionOperation};

/// Options and flags that are used to customize the copying.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, PartialOrd, Ord)]
pub struct Options {
    /// The clipboard to work with.
    clipboard: ClipboardType,

    /// The X display to connect to.
    ///
    /// If `None`, the `DISPLAY` environment variable is used.
    display: Option<String>,
}

/// Where a clipboard owner is in its lifetime.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub enum OwnerState {
    /// The selection hasn't been claimed yet.
    Unclaimed,
    /// The selection is ours since the given time.
    Owned { since: Timestamp },
    /// Some other client took over the selection.
    Superseded,
    /// Some other client won the race for the selection before we got it.
    Released,
}

/// A copy operation ready to start serving requests.
///
/// The selection is already claimed at this point.
pub struct PreparedCopy<T = X11Transport> {
    transport: T,
    state: OwnerState,
    // Every encoding is computed once, up front, so that every request for the same target gets
    // the same bytes.
    payloads: HashMap<WireEncoding, Vec<u8>>,
}

/// Errors that can occur for copying.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("There are no files to copy")]
    NoFiles,

    #[error("Couldn't claim the clipboard, another client owns it")]
    ClaimFailed,

    #[error("X server communication error")]
    Transport(#[source] transport::Error),
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

    /// Invokes the copy operation. See `copy()`.
    #[inline]
    pub fn copy(self, operation: SelectionOperation) -> Result<(), Error> {
        copy(self, operation)
    }

    /// Invokes the prepare_copy operation. See `prepare_copy()`.
    #[inline]
    pub fn prepare_copy(self, operation: SelectionOperation) -> Result<PreparedCopy, Error> {
        prepare_copy(self, operation)
    }
}

impl<T: Transport> PreparedCopy<T> {
    /// Returns the current owner state.
    #[inline]
    pub fn state(&self) -> OwnerState {
        self.state
    }

    /// Starts serving copy requests.
    ///
    /// This function **blocks** until the clipboard is taken over by some other application.
    pub fn serve(mut self) -> Result<(), Error> {
        while let OwnerState::Owned { since } = self.state {
            match self.transport.next_event()? {
                OwnerEvent::Cleared => {
                    debug!("The selection was taken over by another client");
                    self.state = OwnerState::Superseded;
                }
                OwnerEvent::Request(request) => {
                    let reply = answer(since, &self.payloads, &request);
                    self.transport.reply(&request, reply)?;
                }
            }
        }

        Ok(())
    }
}

/// Computes the reply to a request while owning the selection since `since`.
pub(crate) fn answer<'a>(
    since: Timestamp,
    payloads: &'a HashMap<WireEncoding, Vec<u8>>,
    request: &Request,
) -> Reply<'a> {
    trace!(
        "Request from {:#x} for {:?} at {}",
        request.requestor,
        request.target,
        request.time
    );

    // Requests made before we got the selection were meant for the previous owner.
    if request.time != CURRENT_TIME && is_before(request.time, since) {
        warn!(
            "Refusing a stale request made at {}, the selection is ours since {}",
            request.time, since
        );
        return Reply::Refuse;
    }

    match request.target {
        Some(Target::Targets) => Reply::Targets,
        Some(Target::Timestamp) => Reply::Timestamp(since),
        Some(Target::Data(encoding)) => match payloads.get(&encoding) {
            Some(payload) => Reply::Data(payload),
            None => Reply::Refuse,
        },
        None => {
            debug!("Refusing unsupported target {}", request.raw_target);
            Reply::Refuse
        }
    }
}

/// Checks whether `time` comes before `than` on the server clock.
///
/// The clock wraps around about every 49.7 days, so times are compared within half of its range.
pub(crate) fn is_before(time: Timestamp, than: Timestamp) -> bool {
    (than.wrapping_sub(time) as i32) > 0
}

/// Prepares a copy of the files to the clipboard.
///
/// This connects to the X server and claims the selection, but doesn't serve any requests yet.
///
/// This function can be used instead of `copy()` when it's desirable to separately prepare the
/// copy operation, handle any errors that this may produce, and then start the serving loop,
/// potentially past a fork (which is how `x11-clipfiles` uses it).
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipfiles;
/// # use x11_clipfiles::copy::Error;
/// # fn foo() -> Result<(), Error> {
/// use std::path::PathBuf;
/// use x11_clipfiles::copy::Options;
/// use x11_clipfiles::{SelectionOperation, Verb};
///
/// let operation = SelectionOperation::new(Verb::Move, vec![PathBuf::from("/tmp/a.txt")]);
/// let prepared_copy = Options::new().prepare_copy(operation)?;
/// prepared_copy.serve()?;
/// # Ok(())
/// # }
/// ```
#[inline]
pub fn prepare_copy(options: Options, operation: SelectionOperation) -> Result<PreparedCopy, Error> {
    let Options { clipboard, display } = options;
    let transport = X11Transport::connect(display.as_deref(), clipboard)?;
    prepare_copy_internal(transport, operation)
}

// The internal function accepts the transport, used for tests.
pub(crate) fn prepare_copy_internal<T: Transport>(
    transport: T,
    operation: SelectionOperation,
) -> Result<PreparedCopy<T>, Error> {
    if operation.files().is_empty() {
        return Err(Error::NoFiles);
    }

    let payloads = target::encodings()
        .map(|encoding| (encoding, codec::encode(encoding, &operation)))
        .collect();

    let mut prepared = PreparedCopy {
        transport,
        state: OwnerState::Unclaimed,
        payloads,
    };

    let time = prepared.transport.timestamp()?;
    if !prepared.transport.claim(time)? {
        debug!("Lost the race for the selection at {}", time);
        prepared.state = OwnerState::Released;
        return Err(Error::ClaimFailed);
    }

    debug!("Claimed the selection at {}", time);
    prepared.state = OwnerState::Owned { since: time };

    Ok(prepared)
}

/// Copies the files to the clipboard.
///
/// This function **blocks** until the clipboard is taken over by some other application.
///
/// # Examples
///
/// ```no_run
/// # extern crate x11_clipfiles;
/// # use x11_clipfiles::copy::Error;
/// # fn foo() -> Result<(), Error> {
/// use std::path::PathBuf;
/// use x11_clipfiles::copy::{copy, Options};
/// use x11_clipfiles::{SelectionOperation, Verb};
///
/// let operation = SelectionOperation::new(Verb::Copy, vec![PathBuf::from("/tmp/a.txt")]);
/// copy(Options::new(), operation)?;
/// # Ok(())
/// # }
/// ```
#[inline]
pub fn copy(options: Options, operation: SelectionOperation) -> Result<(), Error> {
    prepare_copy(options, operation)?.serve()
}
