//! Behavioural tests for the REST command API.

use std::cell::RefCell;

use axum::http::Method;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;

use crate::rest::{Reply, RestError, Routing};

use super::support::{RestWorld, rest_world};

#[given("the root contains \"{path}\"")]
fn given_root_file(rest_world: &RefCell<RestWorld>, path: String) {
    rest_world.borrow().write_file(&path, "contents");
}

#[given("the server exposes the filesystem root on Windows")]
fn given_windows_root(rest_world: &RefCell<RestWorld>) {
    rest_world.borrow_mut().use_windows_root_marker();
}

#[when("the client reads \"{path}\"")]
fn when_client_reads(rest_world: &RefCell<RestWorld>, path: String) {
    rest_world.borrow_mut().send(Method::GET, &path, None);
}

#[when("the client copies \"{name}\" from \"{from}\" to \"{to}\"")]
fn when_client_copies(rest_world: &RefCell<RestWorld>, name: String, from: String, to: String) {
    let body = json!({ "from": from, "to": to, "names": [name] }).to_string();
    rest_world
        .borrow_mut()
        .send(Method::PUT, "/api/v1/cp", Some(body));
}

#[when("the client moves from \"{from}\" without a destination")]
fn when_client_moves_nowhere(rest_world: &RefCell<RestWorld>, from: String) {
    let body = json!({ "from": from }).to_string();
    rest_world
        .borrow_mut()
        .send(Method::PUT, "/api/v1/mv", Some(body));
}

#[when("the client moves from \"{from}\" to \"{to}\"")]
fn when_client_moves(rest_world: &RefCell<RestWorld>, from: String, to: String) {
    let body = json!({ "from": from, "to": to }).to_string();
    rest_world
        .borrow_mut()
        .send(Method::PUT, "/api/v1/mv", Some(body));
}

#[when("the client packs \"{from}\"")]
fn when_client_packs(rest_world: &RefCell<RestWorld>, from: String) {
    let body = json!({ "from": from }).to_string();
    rest_world
        .borrow_mut()
        .send(Method::PUT, "/api/v1/pack", Some(body));
    let world = rest_world.borrow();
    assert!(
        matches!(world.routing(), Routing::Handled(Ok(Reply::Envelope(_)))),
        "pack failed: {:?}",
        world.routing()
    );
}

#[when("the client extracts \"{from}\"")]
fn when_client_extracts(rest_world: &RefCell<RestWorld>, from: String) {
    let body = json!({ "from": from }).to_string();
    rest_world
        .borrow_mut()
        .send(Method::PUT, "/api/v1/extract", Some(body));
}

#[then("the reply is the \"{name}\" document")]
fn then_document(rest_world: &RefCell<RestWorld>, name: String) {
    let world = rest_world.borrow();
    match world.reply() {
        Reply::Document { name: actual, body } => {
            assert_eq!(*actual, name.as_str());
            assert_eq!(body, r#"{"info":"Cloud Commander API v1"}"#);
        }
        other => panic!("expected a document, got {other:?}"),
    }
}

#[then("the request is passed to the next handler")]
fn then_next(rest_world: &RefCell<RestWorld>) {
    assert!(matches!(rest_world.borrow().routing(), Routing::Next));
}

#[then("the request fails as not found")]
fn then_not_found(rest_world: &RefCell<RestWorld>) {
    assert!(matches!(rest_world.borrow().error(), RestError::NotFound));
}

#[then("the reply envelope has message \"{message}\"")]
fn then_envelope_message(rest_world: &RefCell<RestWorld>, message: String) {
    let world = rest_world.borrow();
    match world.reply() {
        Reply::Envelope(envelope) => assert_eq!(envelope.message, message),
        other => panic!("expected an envelope, got {other:?}"),
    }
}

#[then("the root contains a file at \"{path}\"")]
fn then_file_exists(rest_world: &RefCell<RestWorld>, path: String) {
    let world = rest_world.borrow();
    assert!(world.root().join(&path).is_file(), "{path} is missing");
}

#[then("the raw request body is echoed back")]
fn then_body_echoed(rest_world: &RefCell<RestWorld>) {
    let world = rest_world.borrow();
    match world.error() {
        RestError::MissingFields { body } => {
            assert_eq!(Some(body.as_str()), world.last_body());
        }
        other => panic!("expected missing fields, got {other:?}"),
    }
}

#[then("the request is refused by the root guard")]
fn then_root_guard(rest_world: &RefCell<RestWorld>) {
    assert!(matches!(rest_world.borrow().error(), RestError::RootGuard));
}

#[scenario(path = "tests/features/rest_api.feature")]
fn rest_api(rest_world: RefCell<RestWorld>) {
    let _ = rest_world;
}
