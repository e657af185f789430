//! Abstraction over the windowing system's selection mechanism.
//!
//! The clipboard owner and the paste negotiator only talk to the windowing system through the
//! [`Transport`] trait. [`X11Transport`](crate::x11::X11Transport) is the real implementation.

use std::io;
use std::time::Duration;

use x11rb::errors::{ConnectError, ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::x11_utils::X11Error;

use crate::target::Target;

/// A server timestamp, in milliseconds.
pub type Timestamp = u32;

/// The special timestamp meaning "now".
pub const CURRENT_TIME: Timestamp = x11rb::CURRENT_TIME;

/// Errors that can occur when talking to the windowing system.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Couldn't connect to the X server")]
    Connect(#[source] ConnectError),

    #[error("X server communication error")]
    Communication(#[source] ReplyOrIdError),

    #[error("The X server reported an error: {0:?}")]
    Protocol(X11Error),

    #[error("Couldn't wait for events from the X server")]
    Poll(#[source] io::Error),

    #[error("The selection owner started an incremental transfer, which is not supported")]
    IncrementalTransfer,
}

impl From<ConnectionError> for Error {
    fn from(x: ConnectionError) -> Self {
        Error::Communication(x.into())
    }
}

impl From<ReplyError> for Error {
    fn from(x: ReplyError) -> Self {
        match x {
            ReplyError::X11Error(err) => Error::Protocol(err),
            ReplyError::ConnectionError(err) => err.into(),
        }
    }
}

impl From<ReplyOrIdError> for Error {
    fn from(x: ReplyOrIdError) -> Self {
        match x {
            ReplyOrIdError::X11Error(err) => Error::Protocol(err),
            x => Error::Communication(x),
        }
    }
}

/// A request for the selection contents from some other client.
///
/// Exactly one reply is sent for every request.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Request {
    /// The window of the requesting client.
    pub requestor: u32,
    /// The property of `requestor` to put the reply into.
    pub property: u32,
    /// The requested target, or `None` if it isn't supported.
    pub target: Option<Target>,
    /// The requested target as the windowing system identifies it.
    pub raw_target: u32,
    /// The time of the request, or [`CURRENT_TIME`].
    pub time: Timestamp,
}

/// Events a selection owner reacts to.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum OwnerEvent {
    /// Some other client took over the selection.
    Cleared,
    /// Some client requested the selection contents.
    Request(Request),
}

/// The owner's answer to a [`Request`].
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Reply<'a> {
    /// No data: the request was stale or asked for an unsupported target.
    Refuse,
    /// The list of all supported targets.
    Targets,
    /// The time the selection was claimed.
    Timestamp(Timestamp),
    /// The encoded selection contents.
    Data(&'a [u8]),
}

/// What a requesting client receives back.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Response {
    /// The selection contents.
    Data(Vec<u8>),
    /// The owner has no data for the requested target.
    Refused,
    /// No reply arrived in time.
    TimedOut,
}

/// A connection to the windowing system with a window to coordinate selection transfers through.
///
/// One transport is either used as a selection owner (`claim()`, then `next_event()` and
/// `reply()`) or as a requestor (`has_owner()`, `request()`, `wait_for_response()`).
pub trait Transport {
    /// Obtains the current server time.
    fn timestamp(&mut self) -> Result<Timestamp, Error>;

    /// Tries to become the selection owner as of `time`.
    ///
    /// Returns `true` if the ownership was confirmed, `false` if some other client owns the
    /// selection.
    fn claim(&mut self, time: Timestamp) -> Result<bool, Error>;

    /// Blocks until the next event relevant to the selection owner.
    fn next_event(&mut self) -> Result<OwnerEvent, Error>;

    /// Sends the reply to a request.
    ///
    /// This doesn't wait for the requestor in any way: if it went away, the reply is lost.
    fn reply(&mut self, request: &Request, reply: Reply<'_>) -> Result<(), Error>;

    /// Checks whether anyone owns the selection.
    fn has_owner(&mut self) -> Result<bool, Error>;

    /// Asks the selection owner to convert the selection to the named target.
    fn request(&mut self, target: &str, time: Timestamp) -> Result<(), Error>;

    /// Waits for the answer to the last `request()`, but no longer than `timeout`.
    fn wait_for_response(&mut self, timeout: Duration) -> Result<Response, Error>;
}
