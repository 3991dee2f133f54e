//! # Message Routing in WAMP[](#message-routing-in-wamp "Permalink to this headline")
//!
//! - [Loosely coupled](#loosely-coupled)
//! - [Component based](#component-based)
//! - [Real-time](#real-time)
//! - [Language independent](#language-independent)
//! - [Network spanning](#network-spanning)
//!
//!
//! ---
//!
//! WAMP provides [Unified Application Routing](#unified-application-routing) in an open [WebSocket protocol](#websocket-protocol)
//! that works with [different](#different) languages.
//!
//! Using WAMP you can build distributed systems out of application components which are **loosely coupled**
//! and communicate in (soft) **real-time**.
//!
//! At its core, WAMP offers two communication patterns for application components to talk to each other:
//!
//! - [Publish & Subscribe](https://wamp-proto.org/faq.html#pubsub) (PubSub)
//! - [Remote Procedure Calls](https://wamp-proto.org/faq.html#rpc) (RPC)
//!
//! We think applications often have a natural [need for both forms of communication](https://wamp-proto.org/faq.html#why_rpc_and_pubsub)
//! and shouldn’t be required to use different protocols/means for those. Which is why WAMP provides both.
//!
//! WAMP is easy to use, simple to implement and based on modern Web standards: WebSocket, JSON and URIs.
//!
//! While WAMP isn’t exactly rocket science, we believe it’s good engineering and a major step forward in practice
//! that allows developers to create more powerful applications with less complexity and in less time.
//!
//! ## [Loosely coupled](#id6)[](#loosely-coupled "Permalink to this headline")
//!
//! WAMP provides what we call **unified Application Routing** for application communication:
//!
//! - routing of events in the Publish & Subscriber pattern and
//! - routing of calls in the Remote Procedure Call pattern
//!
//! between applications components in *one* protocol.
//!
//! Unified routing is probably best explained by contrasting it with legacy approaches.
//!
//! Lets take the old “client-server” world. In the client-server model, a remote procedure call goes
//! directly from the *Caller* to the *Callee*:
//!
//! Remote procedure calls in the **Client-Server** model[](#id1 "Permalink to this image")
//!
//! In the client-server model, a *Caller* needs to have knowledge about where the *Callee* resides and how to reach it.
//! This introduces a strong coupling between *Caller* and *Callee*. Which is bad, because applications can quickly
//! become complex and unmaintainable. We explain how WAMP fixes that in a minute.
//!
//! The problems coming from strong coupling between application components were long recognized and this (besides other requirements)
//! lead to the publish-subscribe model.
//!
//! In the publish-subscribe model a *Publisher* submits information to an abstract “topic”, and *Subscribers* only receive
//! information indirectly by announcing their interest on a respective “topic”. Both do not know about each other.
//! They are decoupled via the “topic” and via an intermediary usually called *Broker*:
//!
//! A Broker decouples *Publishers* and *Subscribers*[](#id2 "Permalink to this image")
//!
//! A *Broker* keeps a book of subscriptions: who is currently subscribed on which topic. When a *Publisher* publishes
//! some information (“event”) to a topic, the *Broker* will look up who is currently subscribed on that topic:
//! determine the set of *Subscribers* on the topic published to. And then forward the information (“event”) to all those *Subscribers*.
//!
//! The act of determining receivers of information (independently of the information submitted) and forwarding
//! the information to receivers is called *routing*.
//!
//! Now, WAMP translates the benefits of loose coupling to RPC. Different from the client-server model, WAMP also
//! decouples *Callers* and *Callees* by introducing an intermediary - the *Dealer*:
//!
//! Remote procedure calls in the **Dealer** model[](#id3 "Permalink to this image")
//!
//! Similar to a *Broker’s* role with PubSub, the *Dealer* is responsible for routing a call originating
//! from the *Caller* to the *Callee* and route back results or errors vice-versa. Both do not know about each other:
//! where the peer resides and how to reach it. This knowledge is encapsulated in the *Dealer*
//!
//! With WAMP, a *Callee* registers a procedure at a *Dealer* under an abstract name: a URI identifying the procedure.
//! When a *Caller* wants to call a remote procedure, it talks to the *Dealer* and only provides the URI of the procedure
//! to be called plus any call arguments. The *Dealer* will look up the procedure to be invoked in his book of registered procedures.
//! The information from the book includes *where* the *Callee* implementing the procedure resides, and how to reach it.
//!
//! In effect, *Callers* and *Callees* are decoupled, and applications can use RPC and still benefit from loose coupling.
//!
//! ## [Component based](#id7)[](#component-based "Permalink to this headline")
//!
//! **Brokers, Dealers and Routers**
//!
//! What if you combine a Broker (for Publish & Subscribe) and a Dealer (for routed Remote Procedure Calls)?
//!
//! When you combine a *Broker* and a *Dealer* you get what WAMP calls a *Router*:
//!
//! A **Router** combines a Broker and a Dealer[](#id4 "Permalink to this image")
//!
//! A *Router* is capable of routing both calls and events, and hence can support flexible, decoupled architectures
//! that use both RPC and PubSub.
//!
//! This module implements that Router: the session state machine, the per-realm broker/dealer, and
//! the realm table that owns them. It does not speak any particular wire format or own any socket;
//! callers supply a [`Transport`] per connection and feed decoded [`Message`](crate::Message)s into
//! a [`ConnectionHandler`].

use std::{
    collections::HashMap,
    marker::Sync,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use log::{debug, info, trace};
use rand::{thread_rng, Rng};

use crate::messages::{ErrorDetails, ErrorType, Message, Reason};

use super::{Dict, ID};

mod handshake;

mod messaging;
use self::messaging::send_message;

pub mod pattern_validator;

mod pubsub;
use self::pubsub::SubscriptionPatternNode;

mod rpc;
use self::rpc::RegistrationPatternNode;

mod transport;
pub use self::transport::Transport;

struct SubscriptionManager {
    subscriptions: SubscriptionPatternNode<Arc<Mutex<ConnectionInfo>>>,
    subscription_ids_to_uris: HashMap<u64, (String, bool)>,
}

struct RegistrationManager {
    registrations: RegistrationPatternNode<Arc<Mutex<ConnectionInfo>>>,
    registration_ids_to_uris: HashMap<u64, (String, bool)>,
    /// invocation_id -> (call_id, caller, callee). Kept as a single map, keyed the
    /// way the dealer's bookkeeping is keyed everywhere else, so both a caller's
    /// loss and a callee's loss can be resolved by one scan over the same table.
    active_calls: HashMap<ID, (ID, Arc<Mutex<ConnectionInfo>>, Arc<Mutex<ConnectionInfo>>)>,
}

struct Realm {
    name: String,
    subscription_manager: SubscriptionManager,
    registration_manager: RegistrationManager,
    connections: Vec<Arc<Mutex<ConnectionInfo>>>,
}

/// Lifecycle events fired by the realm table as realms come and go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealmEvent {
    /// A realm was just created (on `add_realm`, or lazily had its first session join).
    Create,
    /// A realm's last session left and it has been discarded.
    Discard,
}

type RealmCallback = Box<dyn Fn(RealmEvent, &str) + Send>;

/// Declarative router setup: the set of realms a host process wants to exist,
/// so a caller doesn't have to call `add_realm` in a loop.
#[derive(Default)]
pub struct RouterConfig {
    realms: Vec<String>,
}

impl RouterConfig {
    #[inline]
    pub fn new() -> RouterConfig {
        RouterConfig { realms: Vec::new() }
    }

    /// Declare a realm that should exist as soon as the router starts.
    pub fn realm(mut self, name: &str) -> RouterConfig {
        self.realms.push(name.to_string());
        self
    }
}

/// Represents WAMP Router
pub struct Router {
    info: Arc<RouterInfo>,
}

struct RouterInfo {
    realms: Mutex<HashMap<String, Arc<Mutex<Realm>>>>,
    callbacks: Mutex<Vec<RealmCallback>>,
}

impl RouterInfo {
    fn fire_realm_event(&self, event: RealmEvent, realm: &str) {
        for callback in self.callbacks.lock().unwrap().iter() {
            callback(event, realm);
        }
    }

    /// Look up a realm by name, creating it on first access. Firing
    /// `RealmEvent::Create` happens here rather than only from
    /// `Router::add_realm`, so a HELLO to a never-registered (but
    /// transport-allowed) realm name observes the same lifecycle event an
    /// eagerly declared realm would.
    fn get_or_create_realm(&self, name: &str) -> Arc<Mutex<Realm>> {
        let mut realms = self.realms.lock().unwrap();
        if let Some(realm) = realms.get(name) {
            return Arc::clone(realm);
        }
        let realm = Arc::new(Mutex::new(Realm {
            name: name.to_string(),
            connections: Vec::new(),
            subscription_manager: SubscriptionManager {
                subscriptions: SubscriptionPatternNode::new(),
                subscription_ids_to_uris: HashMap::new(),
            },
            registration_manager: RegistrationManager {
                registrations: RegistrationPatternNode::new(),
                registration_ids_to_uris: HashMap::new(),
                active_calls: HashMap::new(),
            },
        }));
        realms.insert(name.to_string(), Arc::clone(&realm));
        drop(realms);
        debug!("Added realm {}", name);
        self.fire_realm_event(RealmEvent::Create, name);
        realm
    }
}

struct ConnectionHandler {
    info: Arc<Mutex<ConnectionInfo>>,
    router: Arc<RouterInfo>,
    realm: Option<Arc<Mutex<Realm>>>,
    subscribed_topics: Vec<ID>,
    registered_procedures: Vec<ID>,
}

/// Represents WAMP Router connection information
pub struct ConnectionInfo {
    state: ConnectionState,
    transport: Box<dyn Transport>,
    id: u64,
    last_id: ID,
}

impl ConnectionInfo {
    /// Draws the next id from this session's local counter, used for
    /// invocation request ids the router sends to this session as callee.
    fn generate_id(&mut self) -> ID {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Clone, PartialEq)]
enum ConnectionState {
    Initializing,
    Connected,
    ShuttingDown,
    Disconnected,
}

fn random_id() -> u64 {
    let mut rng = thread_rng();
    // TODO make this a constant
    rng.gen_range(1..1u64.rotate_left(53))
}

unsafe impl Sync for Router {}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create the new default router
    #[inline]
    pub fn new() -> Router {
        Router {
            info: Arc::new(RouterInfo {
                realms: Mutex::new(HashMap::new()),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Create a router with a declarative set of realms already present.
    pub fn with_config(config: RouterConfig) -> Router {
        let mut router = Router::new();
        for realm in &config.realms {
            router.add_realm(realm);
        }
        router
    }

    /// Register a callback invoked whenever a realm is created or discarded.
    /// Callbacks may be added from within another callback's invocation.
    pub fn on_realm_event<F>(&self, callback: F)
    where
        F: Fn(RealmEvent, &str) + Send + 'static,
    {
        self.info.callbacks.lock().unwrap().push(Box::new(callback));
    }

    /// Bind a connection's decoded frames to this router's realms, via `transport`.
    pub fn new_connection(&self, transport: Box<dyn Transport>) -> Session {
        Session {
            handler: ConnectionHandler {
                info: Arc::new(Mutex::new(ConnectionInfo {
                    state: ConnectionState::Initializing,
                    transport,
                    id: random_id(),
                    last_id: 0,
                })),
                subscribed_topics: Vec::new(),
                registered_procedures: Vec::new(),
                realm: None,
                router: Arc::clone(&self.info),
            },
        }
    }

    /// Declare a realm up front so it exists before any session joins it.
    pub fn add_realm(&mut self, realm: &str) {
        self.info.get_or_create_realm(realm);
    }

    /// Shut down the router gracefully
    pub fn shutdown(&self) {
        for realm in self.info.realms.lock().unwrap().values() {
            for connection in &realm.lock().unwrap().connections {
                send_message(
                    connection,
                    &Message::Goodbye(ErrorDetails::new(), Reason::SystemShutdown),
                )
                .ok();
                let mut connection = connection.lock().unwrap();
                connection.state = ConnectionState::ShuttingDown;
            }
        }
        info!("Goodbye messages sent.  Waiting 5 seconds for response");
        thread::sleep(Duration::from_secs(5));
        for realm in self.info.realms.lock().unwrap().values() {
            for connection in &realm.lock().unwrap().connections {
                let mut connection = connection.lock().unwrap();
                connection.transport.close_session();
                connection.state = ConnectionState::Disconnected;
            }
        }
    }
}

/// A single connection's session state, bound to one [`Transport`].
///
/// Hosts decode inbound bytes into a [`Message`] and hand it to [`Session::receive`];
/// the session validates it against its current state and dispatches into the realm.
pub struct Session {
    handler: ConnectionHandler,
}

impl Session {
    /// Feed one decoded inbound message into the session.
    pub fn receive(&mut self, message: Message) {
        if let Err(e) = self.handler.handle_message(message) {
            self.handler.on_message_error(e);
        }
    }
}

impl ConnectionHandler {
    fn remove(&mut self) {
        if let Some(ref realm) = self.realm {
            let my_id = self.info.lock().unwrap().id;
            let mut realm = realm.lock().unwrap();
            {
                trace!("Removing subscriptions for client {}", my_id);
                let manager = &mut realm.subscription_manager;
                for subscription_id in &self.subscribed_topics {
                    trace!("Looking for subscription {}", subscription_id);
                    if let Some(&(ref topic_uri, is_prefix)) =
                        manager.subscription_ids_to_uris.get(subscription_id)
                    {
                        trace!("Removing subscription to {:?}", topic_uri);
                        manager
                            .subscriptions
                            .unsubscribe_with(topic_uri, &self.info, is_prefix)
                            .ok();
                        trace!("Subscription tree: {:?}", manager.subscriptions);
                    }
                }
            }
            {
                let manager = &mut realm.registration_manager;
                for registration_id in &self.registered_procedures {
                    if let Some(&(ref topic_uri, is_prefix)) =
                        manager.registration_ids_to_uris.get(registration_id)
                    {
                        manager
                            .registrations
                            .unregister_with(topic_uri, &self.info, is_prefix)
                            .ok();
                    }
                }
            }
            {
                let manager = &mut realm.registration_manager;
                // Snapshot before mutating so resolving one invocation can't
                // perturb the iteration over the rest.
                let lost_as_callee: Vec<(ID, ID, Arc<Mutex<ConnectionInfo>>)> = manager
                    .active_calls
                    .iter()
                    .filter(|(_, (_, _, callee))| callee.lock().unwrap().id == my_id)
                    .map(|(&invocation_id, (call_id, caller, _))| {
                        (invocation_id, *call_id, Arc::clone(caller))
                    })
                    .collect();
                for (invocation_id, call_id, caller) in lost_as_callee {
                    manager.active_calls.remove(&invocation_id);
                    info!(
                        "Callee for invocation {} was lost; failing call {}",
                        invocation_id, call_id
                    );
                    let error_message = Message::Error(
                        ErrorType::Call,
                        call_id,
                        Dict::new(),
                        Reason::CalleeLost,
                        None,
                        None,
                    );
                    send_message(&caller, &error_message).ok();
                }
                manager
                    .active_calls
                    .retain(|_, (_, caller, _)| caller.lock().unwrap().id != my_id);
            }
            realm
                .connections
                .retain(|connection| connection.lock().unwrap().id != my_id);

            if realm.connections.is_empty() {
                let name = realm.name.clone();
                self.router.realms.lock().unwrap().remove(&name);
                info!("Realm {} has no sessions left, discarding", name);
                self.router.fire_realm_event(RealmEvent::Discard, &name);
            }
        }
    }

    fn terminate_connection(&mut self) {
        self.remove();
        let mut info = self.info.lock().unwrap();
        info.transport.close_session();
        info.state = ConnectionState::Disconnected;
    }
}
