//! End-to-end exercises against the public `Router`/`Session`/`Transport`
//! surface, standing in for a real transport with an in-memory mock that
//! just records what it was asked to send.

use std::sync::{Arc, Mutex};

use wampcore::{
    CallOptions, ClientRoles, ErrorDetails, ErrorType, HelloDetails, Message, PublishOptions,
    Reason, RegisterOptions, Router, SubscribeOptions, Transport, WampResult, YieldOptions, URI,
};

#[derive(Debug, Clone, PartialEq)]
enum Recorded {
    Welcome(u64),
    Abort(String, String),
    Subscribed(u64, u64),
    Published(u64, u64),
    Event(u64, u64, Option<String>),
    Registered(u64, u64),
    Unregistered(u64),
    Invocation(u64, u64, Option<String>),
    Result(u64),
    Error(&'static str, u64, String),
}

fn error_type_name(t: &ErrorType) -> &'static str {
    match t {
        ErrorType::Subscribe => "subscribe",
        ErrorType::Unsubscribe => "unsubscribe",
        ErrorType::Publish => "publish",
        ErrorType::Register => "register",
        ErrorType::Unregister => "unregister",
        ErrorType::Invocation => "invocation",
        ErrorType::Call => "call",
    }
}

struct MockTransport {
    sent: Arc<Mutex<Vec<Recorded>>>,
    closed: Arc<Mutex<bool>>,
    realms: Vec<String>,
}

impl Transport for MockTransport {
    fn send(&mut self, message: &Message) -> WampResult<()> {
        let recorded = match message {
            Message::Welcome(id, _) => Recorded::Welcome(*id),
            Message::Abort(details, reason) => {
                Recorded::Abort(reason.to_string(), details.message_for_test().unwrap_or_default())
            }
            Message::Subscribed(request_id, subscription_id) => {
                Recorded::Subscribed(*request_id, *subscription_id)
            }
            Message::Published(request_id, publication_id) => {
                Recorded::Published(*request_id, *publication_id)
            }
            Message::Event(subscription_id, publication_id, details, ..) => Recorded::Event(
                *subscription_id,
                *publication_id,
                details.topic.as_ref().map(|u| u.uri.clone()),
            ),
            Message::Registered(request_id, registration_id) => {
                Recorded::Registered(*request_id, *registration_id)
            }
            Message::Unregistered(request_id) => Recorded::Unregistered(*request_id),
            Message::Invocation(id, registration_id, details, ..) => Recorded::Invocation(
                *id,
                *registration_id,
                details.procedure.as_ref().map(|u| u.uri.clone()),
            ),
            Message::Result(id, ..) => Recorded::Result(*id),
            Message::Error(e_type, id, _, reason, ..) => {
                Recorded::Error(error_type_name(e_type), *id, reason.to_string())
            }
            _ => return Ok(()),
        };
        self.sent.lock().unwrap().push(recorded);
        Ok(())
    }

    fn realm_allowed(&self, realm: &str) -> bool {
        self.realms.iter().any(|r| r == realm)
    }

    fn close_session(&mut self) {
        *self.closed.lock().unwrap() = true;
    }
}

// `ErrorDetails.message` is private; read it back through Debug formatting
// so the mock doesn't need a field accessor that only tests would use.
trait ErrorDetailsTestExt {
    fn message_for_test(&self) -> Option<String>;
}
impl ErrorDetailsTestExt for ErrorDetails {
    fn message_for_test(&self) -> Option<String> {
        let debug = format!("{:?}", self);
        if debug.contains("message: None") {
            None
        } else {
            Some(debug)
        }
    }
}

struct Client {
    sent: Arc<Mutex<Vec<Recorded>>>,
    closed: Arc<Mutex<bool>>,
    session: wampcore::Session,
}

fn connect(router: &Router, realms: &[&str]) -> Client {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(Mutex::new(false));
    let transport = MockTransport {
        sent: Arc::clone(&sent),
        closed: Arc::clone(&closed),
        realms: realms.iter().map(|r| r.to_string()).collect(),
    };
    Client {
        sent,
        closed,
        session: router.new_connection(Box::new(transport)),
    }
}

impl Client {
    fn drain(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }

    fn hello(&mut self, realm: &str) -> u64 {
        self.session.receive(Message::Hello(
            URI::new(realm),
            HelloDetails::new(ClientRoles::new()),
        ));
        match self.drain().pop() {
            Some(Recorded::Welcome(id)) => id,
            other => panic!("expected Welcome, got {:?}", other),
        }
    }
}

#[test]
fn hello_on_known_realm_gets_welcomed() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut client = connect(&router, &["realm.a"]);

    client.hello("realm.a");
    assert!(!client.is_closed());
}

#[test]
fn hello_on_unknown_realm_aborts_and_closes() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut client = connect(&router, &[]);

    client
        .session
        .receive(Message::Hello(
            URI::new("realm.a"),
            HelloDetails::new(ClientRoles::new()),
        ));

    let sent = client.drain();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Recorded::Abort(reason, message) => {
            assert_eq!(reason, &Reason::NoSuchRealm.to_string());
            assert!(message.contains("Handshake rejected"));
        }
        other => panic!("expected Abort, got {:?}", other),
    }
    assert!(client.is_closed());
}

#[test]
fn hello_on_an_allowed_but_never_declared_realm_creates_it_lazily() {
    let mut router = Router::new();
    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = Arc::clone(&events);
    router.on_realm_event(move |event, realm| {
        events_clone.lock().unwrap().push((event, realm.to_string()));
    });
    let mut client = connect(&router, &["realm.never-added"]);

    client.hello("realm.never-added");
    assert!(!client.is_closed());

    assert_eq!(
        *events.lock().unwrap(),
        vec![(wampcore::RealmEvent::Create, "realm.never-added".to_string())]
    );
}

#[test]
fn command_before_hello_is_a_protocol_violation() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut client = connect(&router, &["realm.a"]);

    client.session.receive(Message::Subscribe(
        1,
        SubscribeOptions::new(),
        URI::new("com.example.topic"),
    ));

    let sent = client.drain();
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        Recorded::Abort(reason, _) => assert_eq!(reason, &Reason::ProtocolViolation.to_string()),
        other => panic!("expected Abort, got {:?}", other),
    }
    assert!(client.is_closed());
}

#[test]
fn publish_fans_out_to_all_subscribers_including_the_publisher() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut alice = connect(&router, &["realm.a"]);
    let mut bob = connect(&router, &["realm.a"]);
    alice.hello("realm.a");
    bob.hello("realm.a");

    alice.session.receive(Message::Subscribe(
        1,
        SubscribeOptions::new(),
        URI::new("com.example.topic"),
    ));
    let alice_subscription = match alice.drain().pop() {
        Some(Recorded::Subscribed(_, sub_id)) => sub_id,
        other => panic!("expected Subscribed, got {:?}", other),
    };
    bob.session.receive(Message::Subscribe(
        1,
        SubscribeOptions::new(),
        URI::new("com.example.topic"),
    ));
    bob.drain();

    bob.session.receive(Message::Publish(
        2,
        PublishOptions::new(true),
        URI::new("com.example.topic"),
        None,
        None,
    ));

    let bob_sent = bob.drain();
    assert!(bob_sent
        .iter()
        .any(|m| matches!(m, Recorded::Published(2, _))));
    assert!(bob_sent.iter().any(|m| matches!(
        m,
        Recorded::Event(_, _, Some(topic)) if topic == "com.example.topic"
    )));

    let alice_sent = alice.drain();
    assert_eq!(
        alice_sent,
        vec![Recorded::Event(
            alice_subscription,
            alice_sent
                .iter()
                .find_map(|m| match m {
                    Recorded::Event(_, pub_id, _) => Some(*pub_id),
                    _ => None,
                })
                .unwrap(),
            Some("com.example.topic".to_string())
        )]
    );
}

#[test]
fn realms_are_isolated_from_each_other() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    router.add_realm("realm.b");
    let mut alice = connect(&router, &["realm.a"]);
    let mut bob = connect(&router, &["realm.b"]);
    alice.hello("realm.a");
    bob.hello("realm.b");

    alice.session.receive(Message::Subscribe(
        1,
        SubscribeOptions::new(),
        URI::new("com.example.topic"),
    ));
    alice.drain();

    bob.session.receive(Message::Publish(
        2,
        PublishOptions::new(false),
        URI::new("com.example.topic"),
        None,
        None,
    ));

    assert!(alice.drain().is_empty());
}

#[test]
fn call_is_dispatched_to_registrant_and_yield_returns_a_result() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut caller = connect(&router, &["realm.a"]);
    let mut callee = connect(&router, &["realm.a"]);
    caller.hello("realm.a");
    callee.hello("realm.a");

    callee.session.receive(Message::Register(
        1,
        RegisterOptions::new(),
        URI::new("com.example.add"),
    ));
    callee.drain();

    caller.session.receive(Message::Call(
        42,
        CallOptions::new(),
        URI::new("com.example.add"),
        None,
        None,
    ));

    let callee_sent = callee.drain();
    let invocation_id = match callee_sent.as_slice() {
        [Recorded::Invocation(id, _, Some(procedure))] => {
            assert_eq!(procedure, "com.example.add");
            *id
        }
        other => panic!("expected a single Invocation, got {:?}", other),
    };

    callee.session.receive(Message::Yield(
        invocation_id,
        YieldOptions::new(),
        None,
        None,
    ));

    assert_eq!(caller.drain(), vec![Recorded::Result(42)]);
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut callee = connect(&router, &["realm.a"]);
    callee.hello("realm.a");

    callee.session.receive(Message::Register(
        1,
        RegisterOptions::new(),
        URI::new("com.example.add"),
    ));
    callee.drain();

    callee.session.receive(Message::Register(
        2,
        RegisterOptions::new(),
        URI::new("com.example.add"),
    ));

    assert_eq!(
        callee.drain(),
        vec![Recorded::Error(
            "register",
            2,
            Reason::ProcedureAlreadyExists.to_string()
        )]
    );
}

#[test]
fn unregistering_an_unknown_id_is_a_domain_error() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut callee = connect(&router, &["realm.a"]);
    callee.hello("realm.a");

    callee
        .session
        .receive(Message::Unregister(1, 999));

    assert_eq!(
        callee.drain(),
        vec![Recorded::Error(
            "unregister",
            1,
            Reason::NoSuchRegistration.to_string()
        )]
    );
}

#[test]
fn losing_the_callee_mid_call_fails_the_pending_call() {
    let mut router = Router::new();
    router.add_realm("realm.a");
    let mut caller = connect(&router, &["realm.a"]);
    let mut callee = connect(&router, &["realm.a"]);
    caller.hello("realm.a");
    callee.hello("realm.a");

    callee.session.receive(Message::Register(
        1,
        RegisterOptions::new(),
        URI::new("com.example.add"),
    ));
    callee.drain();

    caller.session.receive(Message::Call(
        42,
        CallOptions::new(),
        URI::new("com.example.add"),
        None,
        None,
    ));
    callee.drain();
    caller.drain();

    callee
        .session
        .receive(Message::Goodbye(ErrorDetails::new(), Reason::GoodbyeAndOut));

    assert_eq!(
        caller.drain(),
        vec![Recorded::Error(
            "call",
            42,
            Reason::CalleeLost.to_string()
        )]
    );
}
