//! Test selection server implementation.
//!
//! This module contains a minimal in-process stand-in for the X server's selection handling. Every
//! [`TestClient`] connected to a [`TestServer`] implements [`Transport`], so the clipboard owner and
//! the paste negotiator can be run against each other, possibly on different threads. The server
//! keeps a clock, the current selection owner and every reply sent by an owner.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::target::{self, Target};
use crate::transport::{
    Error, OwnerEvent, Reply, Request, Response, Timestamp, Transport, CURRENT_TIME,
};

/// A reply as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedReply {
    pub owner: u32,
    pub requestor: u32,
    pub target: Option<Target>,
    pub time: Timestamp,
    pub response: Response,
}

enum Message {
    Owner(OwnerEvent),
    Response(Response),
}

#[derive(Default)]
struct State {
    time: Timestamp,
    owner: Option<u32>,
    owner_since: Timestamp,
    refuse_claims: bool,
    next_id: u32,
    clients: Vec<(u32, Sender<Message>)>,
    atoms: Vec<String>,
    replies: Vec<RecordedReply>,
}

impl State {
    fn send(&self, client: u32, message: Message) {
        if let Some((_, sender)) = self.clients.iter().find(|(id, _)| *id == client) {
            // The client may have gone away, just like a real requestor.
            let _ = sender.send(message);
        }
    }

    fn intern(&mut self, name: &str) -> u32 {
        let index = match self.atoms.iter().position(|x| x == name) {
            Some(index) => index,
            None => {
                self.atoms.push(name.to_owned());
                self.atoms.len() - 1
            }
        };
        index as u32 + 1
    }
}

#[derive(Clone, Default)]
pub struct TestServer {
    state: Arc<Mutex<State>>,
}

impl TestServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects a new client.
    pub fn client(&self) -> TestClient {
        let (sender, receiver) = channel();

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.clients.push((id, sender));

        TestClient {
            id,
            state: self.state.clone(),
            receiver,
        }
    }

    /// Sets the clock. The next timestamp handed out is `time + 1`.
    pub fn set_time(&self, time: Timestamp) {
        self.state.lock().unwrap().time = time;
    }

    /// Makes every following claim lose to some other client.
    pub fn refuse_claims(&self) {
        self.state.lock().unwrap().refuse_claims = true;
    }

    pub fn owner(&self) -> Option<u32> {
        self.state.lock().unwrap().owner
    }

    pub fn replies(&self) -> Vec<RecordedReply> {
        self.state.lock().unwrap().replies.clone()
    }
}

pub struct TestClient {
    pub id: u32,
    state: Arc<Mutex<State>>,
    receiver: Receiver<Message>,
}

impl Transport for TestClient {
    fn timestamp(&mut self) -> Result<Timestamp, Error> {
        let mut state = self.state.lock().unwrap();
        state.time += 1;
        Ok(state.time)
    }

    fn claim(&mut self, time: Timestamp) -> Result<bool, Error> {
        let mut state = self.state.lock().unwrap();

        if state.refuse_claims {
            let id = state.next_id + 1000;
            state.owner = Some(id);
            return Ok(false);
        }

        // The server ignores claims older than the current ownership.
        if time != CURRENT_TIME && time < state.owner_since {
            return Ok(state.owner == Some(self.id));
        }

        if let Some(previous) = state.owner {
            if previous != self.id {
                state.send(previous, Message::Owner(OwnerEvent::Cleared));
            }
        }

        state.owner = Some(self.id);
        state.owner_since = if time == CURRENT_TIME { state.time } else { time };
        Ok(true)
    }

    fn next_event(&mut self) -> Result<OwnerEvent, Error> {
        loop {
            match self.receiver.recv().unwrap() {
                Message::Owner(event) => return Ok(event),
                Message::Response(_) => (),
            }
        }
    }

    fn reply(&mut self, request: &Request, reply: Reply<'_>) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();

        let response = match reply {
            Reply::Refuse => Response::Refused,
            Reply::Targets => {
                let names: Vec<&str> = target::SUPPORTED.iter().map(|&(name, _)| name).collect();
                Response::Data(names.join("\n").into_bytes())
            }
            Reply::Timestamp(time) => Response::Data(time.to_ne_bytes().to_vec()),
            Reply::Data(data) => Response::Data(data.to_vec()),
        };

        state.replies.push(RecordedReply {
            owner: self.id,
            requestor: request.requestor,
            target: request.target,
            time: request.time,
            response: response.clone(),
        });
        state.send(request.requestor, Message::Response(response));

        Ok(())
    }

    fn has_owner(&mut self) -> Result<bool, Error> {
        Ok(self.state.lock().unwrap().owner.is_some())
    }

    fn request(&mut self, name: &str, time: Timestamp) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        let raw_target = state.intern(name);

        match state.owner {
            Some(owner) => {
                let request = Request {
                    requestor: self.id,
                    property: 1,
                    target: target::lookup(name),
                    raw_target,
                    time,
                };
                state.send(owner, Message::Owner(OwnerEvent::Request(request)));
            }
            // Without an owner the server itself refuses the conversion.
            None => state.send(self.id, Message::Response(Response::Refused)),
        }

        Ok(())
    }

    fn wait_for_response(&mut self, timeout: Duration) -> Result<Response, Error> {
        let deadline = Instant::now() + timeout;

        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.receiver.recv_timeout(left) {
                Ok(Message::Response(response)) => return Ok(response),
                Ok(Message::Owner(_)) => (),
                Err(RecvTimeoutError::Timeout) => return Ok(Response::TimedOut),
                Err(RecvTimeoutError::Disconnected) => panic!("the test server went away"),
            }
        }
    }
}

impl Drop for TestClient {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.clients.retain(|(id, _)| *id != self.id);
        if state.owner == Some(self.id) {
            state.owner = None;
        }
    }
}
