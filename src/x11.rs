//! The X11 implementation of [`Transport`].

use std::time::{Duration, Instant};

use log::{trace, warn};
use rustix::event::{poll, PollFd, PollFlags};
use rustix::io::Errno;
use x11rb::connection::{Connection, RequestConnection as _};
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ConnectionExt as _, CreateWindowAux, EventMask, GetPropertyReply, PropMode,
    SelectionNotifyEvent, Window, WindowClass, SELECTION_NOTIFY_EVENT,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::{COPY_DEPTH_FROM_PARENT, NONE};

use crate::target::{self, Target};
use crate::transport::{Error, OwnerEvent, Reply, Request, Response, Timestamp, Transport};
use crate::ClipboardType;

/// Size of the `ChangeProperty` request without the data, with the BIG-REQUESTS length field.
const CHANGE_PROPERTY_HEADER: usize = 28;

/// Largest property read in one go, in 32-bit units.
const MAX_PROPERTY_LENGTH: u32 = u32::MAX / 4;

/// A connection to an X server with an invisible window for selection transfers.
///
/// The window is destroyed when the transport is dropped.
pub struct X11Transport {
    conn: RustConnection,
    window: Window,
    selection: Atom,
    /// The property of `window` that requested data is converted into.
    property: Atom,
    incr: Atom,
    /// Interned atoms of `target::SUPPORTED`, in the same order.
    targets: Vec<Atom>,
}

/// Returns the property of the requestor that the reply goes into.
pub(crate) fn reply_property(request: &Request) -> Atom {
    // Obsolete clients don't specify a property and expect the target to be used instead.
    if request.property == NONE {
        request.raw_target
    } else {
        request.property
    }
}

/// Checks whether a `ChangeProperty` request with `len` bytes of data fits into a single request.
pub(crate) fn fits_in_request(len: usize, maximum_request_bytes: usize) -> bool {
    // The data is padded to a multiple of 4 bytes.
    len.checked_next_multiple_of(4)
        .and_then(|len| len.checked_add(CHANGE_PROPERTY_HEADER))
        .is_some_and(|len| len <= maximum_request_bytes)
}

/// Turns the converted property into the response to a request for `target`.
pub(crate) fn property_response(
    reply: GetPropertyReply,
    target: Atom,
    incr: Atom,
) -> Result<Response, Error> {
    if reply.type_ == incr {
        return Err(Error::IncrementalTransfer);
    }

    if reply.type_ != target {
        trace!(
            "Reply type {} doesn't match the requested target {}",
            reply.type_,
            target
        );
        return Ok(Response::Refused);
    }

    if reply.bytes_after > 0 {
        warn!("Truncated reply, {} bytes left unread", reply.bytes_after);
    }

    Ok(Response::Data(reply.value))
}

fn intern_atoms(conn: &RustConnection, names: &[&str]) -> Result<Vec<Atom>, Error> {
    // Send all requests first so that there's only one roundtrip.
    let cookies = names
        .iter()
        .map(|name| conn.intern_atom(false, name.as_bytes()))
        .collect::<Result<Vec<_>, _>>()?;

    cookies
        .into_iter()
        .map(|cookie| -> Result<Atom, Error> { Ok(cookie.reply()?.atom) })
        .collect()
}

impl X11Transport {
    /// Connects to the X server and sets up the coordination window.
    ///
    /// If `display` is `None`, the `DISPLAY` environment variable is used.
    pub fn connect(display: Option<&str>, clipboard: ClipboardType) -> Result<Self, Error> {
        let (conn, screen_num) = x11rb::connect(display).map_err(Error::Connect)?;

        let screen = &conn.setup().roots[screen_num];
        let (root, visual) = (screen.root, screen.root_visual);

        let window = conn.generate_id()?;
        conn.create_window(
            COPY_DEPTH_FROM_PARENT,
            window,
            root,
            0,
            0,
            1,
            1,
            0,
            WindowClass::INPUT_OUTPUT,
            visual,
            &CreateWindowAux::new().event_mask(EventMask::PROPERTY_CHANGE),
        )?;

        let mut names = vec![clipboard.selection_name(), "XSEL_DATA", "INCR"];
        names.extend(target::SUPPORTED.iter().map(|&(name, _)| name));
        let mut atoms = intern_atoms(&conn, &names)?;
        let targets = atoms.split_off(3);

        trace!(
            "Connected to screen {}, coordination window {:#x}",
            screen_num,
            window
        );

        Ok(Self {
            conn,
            window,
            selection: atoms[0],
            property: atoms[1],
            incr: atoms[2],
            targets,
        })
    }

    fn lookup_target(&self, atom: Atom) -> Option<Target> {
        self.targets
            .iter()
            .position(|&x| x == atom)
            .map(|i| target::SUPPORTED[i].1)
    }

    fn target_atom(&self, name: &str) -> Result<Atom, Error> {
        match target::SUPPORTED.iter().position(|&(x, _)| x == name) {
            Some(i) => Ok(self.targets[i]),
            None => Ok(self
                .conn
                .intern_atom(false, name.as_bytes())?
                .reply()?
                .atom),
        }
    }

    fn read_response(&mut self, event: SelectionNotifyEvent) -> Result<Response, Error> {
        if event.property == NONE {
            return Ok(Response::Refused);
        }

        let reply = self
            .conn
            .get_property(
                true,
                self.window,
                event.property,
                AtomEnum::ANY,
                0,
                MAX_PROPERTY_LENGTH,
            )?
            .reply()?;

        property_response(reply, event.target, self.incr)
    }
}

impl Transport for X11Transport {
    fn timestamp(&mut self) -> Result<Timestamp, Error> {
        // Appending nothing to a property still generates a PropertyNotify carrying the time.
        self.conn.change_property8(
            PropMode::APPEND,
            self.window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            &[],
        )?;
        self.conn.flush()?;

        loop {
            match self.conn.wait_for_event()? {
                Event::PropertyNotify(event) if event.window == self.window => {
                    return Ok(event.time)
                }
                Event::Error(err) => return Err(Error::Protocol(err)),
                _ => (),
            }
        }
    }

    fn claim(&mut self, time: Timestamp) -> Result<bool, Error> {
        self.conn
            .set_selection_owner(self.window, self.selection, time)?;
        let owner = self
            .conn
            .get_selection_owner(self.selection)?
            .reply()?
            .owner;
        Ok(owner == self.window)
    }

    fn next_event(&mut self) -> Result<OwnerEvent, Error> {
        loop {
            self.conn.flush()?;

            match self.conn.wait_for_event()? {
                Event::SelectionClear(event) if event.selection == self.selection => {
                    return Ok(OwnerEvent::Cleared)
                }
                Event::SelectionRequest(event) if event.selection == self.selection => {
                    return Ok(OwnerEvent::Request(Request {
                        requestor: event.requestor,
                        property: event.property,
                        target: self.lookup_target(event.target),
                        raw_target: event.target,
                        time: event.time,
                    }));
                }
                Event::Error(err) => return Err(Error::Protocol(err)),
                event => trace!("Ignoring {:?}", event),
            }
        }
    }

    fn reply(&mut self, request: &Request, reply: Reply<'_>) -> Result<(), Error> {
        let property = reply_property(request);

        // Errors on the requestor's window only mean that it went away, so they are ignored.
        let property = match reply {
            Reply::Refuse => NONE,
            Reply::Targets => {
                self.conn
                    .change_property32(
                        PropMode::REPLACE,
                        request.requestor,
                        property,
                        AtomEnum::ATOM,
                        &self.targets,
                    )?
                    .ignore_error();
                property
            }
            Reply::Timestamp(time) => {
                self.conn
                    .change_property32(
                        PropMode::REPLACE,
                        request.requestor,
                        property,
                        AtomEnum::INTEGER,
                        &[time],
                    )?
                    .ignore_error();
                property
            }
            Reply::Data(data)
                if !fits_in_request(data.len(), self.conn.maximum_request_bytes()) =>
            {
                warn!(
                    "Refusing to send {} bytes, more than fits in a single request",
                    data.len()
                );
                NONE
            }
            Reply::Data(data) => {
                self.conn
                    .change_property8(
                        PropMode::REPLACE,
                        request.requestor,
                        property,
                        request.raw_target,
                        data,
                    )?
                    .ignore_error();
                property
            }
        };

        let event = SelectionNotifyEvent {
            response_type: SELECTION_NOTIFY_EVENT,
            sequence: 0,
            time: request.time,
            requestor: request.requestor,
            selection: self.selection,
            target: request.raw_target,
            property,
        };
        self.conn
            .send_event(false, request.requestor, EventMask::NO_EVENT, event)?
            .ignore_error();
        self.conn.flush()?;

        Ok(())
    }

    fn has_owner(&mut self) -> Result<bool, Error> {
        let owner = self
            .conn
            .get_selection_owner(self.selection)?
            .reply()?
            .owner;
        Ok(owner != NONE)
    }

    fn request(&mut self, target: &str, time: Timestamp) -> Result<(), Error> {
        let target = self.target_atom(target)?;
        self.conn
            .convert_selection(self.window, self.selection, target, self.property, time)?;
        self.conn.flush()?;
        Ok(())
    }

    fn wait_for_response(&mut self, timeout: Duration) -> Result<Response, Error> {
        let deadline = Instant::now() + timeout;

        loop {
            while let Some(event) = self.conn.poll_for_event()? {
                match event {
                    Event::SelectionNotify(event)
                        if event.selection == self.selection && event.requestor == self.window =>
                    {
                        return self.read_response(event);
                    }
                    Event::Error(err) => return Err(Error::Protocol(err)),
                    event => trace!("Ignoring {:?}", event),
                }
            }

            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Ok(Response::TimedOut);
            }

            // Round up so that we don't spin on sub-millisecond leftovers.
            let millis = left.as_millis().saturating_add(1);
            let millis = i32::try_from(millis).unwrap_or(i32::MAX);

            let mut fds = [PollFd::new(self.conn.stream(), PollFlags::IN)];
            match poll(&mut fds, millis) {
                Ok(_) | Err(Errno::INTR) => (),
                Err(err) => return Err(Error::Poll(err.into())),
            }
        }
    }
}

impl Drop for X11Transport {
    fn drop(&mut self) {
        if self.conn.destroy_window(self.window).is_ok() {
            let _ = self.conn.flush();
        }
    }
}
