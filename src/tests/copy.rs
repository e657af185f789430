use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use crate::codec::{self, Delimiter, WireEncoding};
use crate::copy::*;
use crate::target::{self, Target, COPIED_FILES, TARGETS, TIMESTAMP, URI_LIST};
use crate::tests::state::*;
use crate::tests::tmp_paths;
use crate::transport::{Reply, Request, Response, Transport, CURRENT_TIME};
use crate::{SelectionOperation, Verb};

const TIMEOUT: Duration = Duration::from_secs(5);

fn payloads(operation: &SelectionOperation) -> HashMap<WireEncoding, Vec<u8>> {
    target::encodings()
        .map(|encoding| (encoding, codec::encode(encoding, operation)))
        .collect()
}

fn request(name: &str, time: u32) -> Request {
    Request {
        requestor: 1,
        property: 1,
        target: target::lookup(name),
        raw_target: 1,
        time,
    }
}

#[test]
fn answer_targets() {
    let payloads = payloads(&SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"])));
    assert_eq!(answer(10, &payloads, &request(TARGETS, 20)), Reply::Targets);
}

#[test]
fn answer_timestamp() {
    let payloads = payloads(&SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"])));
    assert_eq!(
        answer(10, &payloads, &request(TIMESTAMP, CURRENT_TIME)),
        Reply::Timestamp(10)
    );
}

#[test]
fn answer_data() {
    let operation = SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt", "b.txt"]));
    let payloads = payloads(&operation);

    assert_eq!(
        answer(10, &payloads, &request(COPIED_FILES, 10)),
        Reply::Data(b"copy\nfile:///tmp/a.txt\nfile:///tmp/b.txt")
    );
    assert_eq!(
        answer(10, &payloads, &request(URI_LIST, 11)),
        Reply::Data(b"file:///tmp/a.txt\nfile:///tmp/b.txt")
    );
    assert_eq!(
        answer(10, &payloads, &request("STRING", 11)),
        Reply::Data(b"/tmp/a.txt /tmp/b.txt")
    );
    assert_eq!(
        answer(10, &payloads, &request("UTF8_STRING", CURRENT_TIME)),
        Reply::Data(b"/tmp/a.txt\n/tmp/b.txt")
    );
}

#[test]
fn answer_stale() {
    let payloads = payloads(&SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"])));
    assert_eq!(answer(10, &payloads, &request(COPIED_FILES, 9)), Reply::Refuse);
    assert_eq!(answer(10, &payloads, &request(TARGETS, 9)), Reply::Refuse);
}

#[test]
fn answer_unsupported() {
    let payloads = payloads(&SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"])));
    assert_eq!(answer(10, &payloads, &request("image/png", 20)), Reply::Refuse);
}

#[test]
fn every_target_is_served() {
    let payloads = payloads(&SelectionOperation::new(Verb::Move, tmp_paths(&["a.txt"])));
    for &(name, target) in target::SUPPORTED {
        let reply = answer(10, &payloads, &request(name, 10));
        match target {
            Target::Targets => assert_eq!(reply, Reply::Targets),
            Target::Timestamp => assert_eq!(reply, Reply::Timestamp(10)),
            Target::Data(encoding) => assert_eq!(reply, Reply::Data(&payloads[&encoding])),
        }
    }
}

#[test]
fn targets_are_distinct() {
    let encodings: Vec<_> = target::encodings().collect();
    assert_eq!(
        encodings,
        [
            WireEncoding::CopiedFiles,
            WireEncoding::UriList,
            WireEncoding::PlainText(Delimiter::Newline),
            WireEncoding::PlainText(Delimiter::Space),
        ]
    );
}

#[test]
fn prepare_copy_claims() {
    let server = TestServer::new();
    server.set_time(41);
    let owner = server.client();
    let id = owner.id;

    let operation = SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"]));
    let prepared = prepare_copy_internal(owner, operation).unwrap();

    assert_eq!(prepared.state(), OwnerState::Owned { since: 42 });
    assert_eq!(server.owner(), Some(id));
}

#[test]
fn prepare_copy_no_files() {
    let server = TestServer::new();
    let owner = server.client();

    let operation = SelectionOperation::new(Verb::Copy, vec![]);
    let result = prepare_copy_internal(owner, operation);

    assert!(matches!(result, Err(Error::NoFiles)));
    assert_eq!(server.owner(), None);
}

#[test]
fn prepare_copy_claim_lost() {
    let server = TestServer::new();
    server.refuse_claims();
    let owner = server.client();
    let id = owner.id;

    let operation = SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"]));
    let result = prepare_copy_internal(owner, operation);

    assert!(matches!(result, Err(Error::ClaimFailed)));
    assert_ne!(server.owner(), Some(id));
    assert!(server.replies().is_empty());
}

#[test]
fn serve_until_superseded() {
    let server = TestServer::new();
    let owner = server.client();

    let operation = SelectionOperation::new(Verb::Move, tmp_paths(&["a.txt"]));
    let prepared = prepare_copy_internal(owner, operation).unwrap();
    let child = thread::spawn(move || prepared.serve());

    let mut requestor = server.client();
    let time = requestor.timestamp().unwrap();
    requestor.request(COPIED_FILES, time).unwrap();
    assert_eq!(
        requestor.wait_for_response(TIMEOUT).unwrap(),
        Response::Data(b"cut\nfile:///tmp/a.txt".to_vec())
    );

    // Some other client copies something, which ends the serving.
    let mut other = server.client();
    let time = other.timestamp().unwrap();
    assert!(other.claim(time).unwrap());

    child.join().unwrap().unwrap();
    assert_eq!(server.owner(), Some(other.id));
}

#[test]
fn serve_unsupported_target() {
    let server = TestServer::new();
    let owner = server.client();

    let operation = SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"]));
    let prepared = prepare_copy_internal(owner, operation).unwrap();
    let child = thread::spawn(move || prepared.serve());

    let mut requestor = server.client();
    let time = requestor.timestamp().unwrap();

    requestor.request("image/png", time).unwrap();
    assert_eq!(requestor.wait_for_response(TIMEOUT).unwrap(), Response::Refused);

    // The owner keeps serving after a refusal.
    requestor.request(URI_LIST, time).unwrap();
    assert_eq!(
        requestor.wait_for_response(TIMEOUT).unwrap(),
        Response::Data(b"file:///tmp/a.txt".to_vec())
    );

    let mut other = server.client();
    let time = other.timestamp().unwrap();
    other.claim(time).unwrap();
    child.join().unwrap().unwrap();

    let replies = server.replies();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].target, None);
    assert_eq!(replies[0].response, Response::Refused);
    assert_eq!(replies[1].target, Some(Target::Data(WireEncoding::UriList)));
}

#[test]
fn serve_stale_request() {
    let server = TestServer::new();
    server.set_time(99);
    let owner = server.client();

    let operation = SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"]));
    let prepared = prepare_copy_internal(owner, operation).unwrap();
    assert_eq!(prepared.state(), OwnerState::Owned { since: 100 });
    let child = thread::spawn(move || prepared.serve());

    let mut requestor = server.client();
    requestor.request(COPIED_FILES, 50).unwrap();
    assert_eq!(requestor.wait_for_response(TIMEOUT).unwrap(), Response::Refused);

    requestor.request(COPIED_FILES, CURRENT_TIME).unwrap();
    assert_eq!(
        requestor.wait_for_response(TIMEOUT).unwrap(),
        Response::Data(b"copy\nfile:///tmp/a.txt".to_vec())
    );

    let mut other = server.client();
    let time = other.timestamp().unwrap();
    other.claim(time).unwrap();
    child.join().unwrap().unwrap();
}

#[test]
fn serve_timestamp() {
    let server = TestServer::new();
    server.set_time(6);
    let owner = server.client();

    let operation = SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"]));
    let prepared = prepare_copy_internal(owner, operation).unwrap();
    let child = thread::spawn(move || prepared.serve());

    let mut requestor = server.client();
    requestor.request(TIMESTAMP, CURRENT_TIME).unwrap();
    assert_eq!(
        requestor.wait_for_response(TIMEOUT).unwrap(),
        Response::Data(7u32.to_ne_bytes().to_vec())
    );

    let mut other = server.client();
    let time = other.timestamp().unwrap();
    other.claim(time).unwrap();
    child.join().unwrap().unwrap();
}

#[test]
fn answer_across_clock_wrap() {
    let payloads = payloads(&SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"])));
    let since = u32::MAX - 5;

    // Made after the server clock wrapped around.
    assert_eq!(
        answer(since, &payloads, &request(TIMESTAMP, 10)),
        Reply::Timestamp(since)
    );

    // Made before the claim, with the claim after the wrap.
    assert_eq!(answer(10, &payloads, &request(TIMESTAMP, since)), Reply::Refuse);
}

#[test]
fn is_before_test() {
    assert!(is_before(1, 2));
    assert!(!is_before(2, 2));
    assert!(!is_before(3, 2));
    assert!(is_before(u32::MAX, 0));
    assert!(!is_before(0, u32::MAX));
}

#[test]
fn serve_requestor_gone() {
    let server = TestServer::new();
    let owner = server.client();

    let operation = SelectionOperation::new(Verb::Copy, tmp_paths(&["a.txt"]));
    let prepared = prepare_copy_internal(owner, operation).unwrap();

    // The request is queued before the owner starts serving, so the requestor is gone by the time
    // the reply is sent.
    let mut gone = server.client();
    let gone_id = gone.id;
    gone.request(COPIED_FILES, CURRENT_TIME).unwrap();
    drop(gone);

    let child = thread::spawn(move || prepared.serve());

    let mut requestor = server.client();
    requestor.request(COPIED_FILES, CURRENT_TIME).unwrap();
    assert_eq!(
        requestor.wait_for_response(TIMEOUT).unwrap(),
        Response::Data(b"copy\nfile:///tmp/a.txt".to_vec())
    );

    let mut other = server.client();
    let time = other.timestamp().unwrap();
    assert!(other.claim(time).unwrap());
    child.join().unwrap().unwrap();

    let replies = server.replies();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].requestor, gone_id);
    assert_eq!(replies[1].requestor, requestor.id);
}
