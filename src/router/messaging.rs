use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use log::{debug, error};
use rmp_serde::Deserializer as RMPDeserializer;
use serde::Deserialize;

use crate::messages::{ErrorDetails, ErrorType, Message, Reason};
use crate::{Dict, Error, ErrorKind, List, WampResult, ID};

use super::{ConnectionHandler, ConnectionInfo, ConnectionState, Session};

pub fn send_message(info: &Arc<Mutex<ConnectionInfo>>, message: &Message) -> WampResult<()> {
    let mut info = info.lock().unwrap();
    debug!("Sending message {:?}", message);
    info.transport.send(message)
}

/// Decode a JSON text frame into a [`Message`], the way a transport that
/// speaks the `wamp.2.json` subprotocol would before handing it to a session.
pub fn decode_json(payload: &str) -> WampResult<Message> {
    serde_json::from_str(payload).map_err(|e| Error::new(ErrorKind::JSONError(e)))
}

/// Decode a MessagePack binary frame into a [`Message`], the way a transport
/// that speaks `wamp.2.msgpack` would before handing it to a session.
pub fn decode_msgpack(payload: &[u8]) -> WampResult<Message> {
    let mut de = RMPDeserializer::new(Cursor::new(payload));
    Deserialize::deserialize(&mut de).map_err(|e| Error::new(ErrorKind::MsgPackDecodeError(e)))
}

impl Session {
    /// Decode a JSON frame and feed it into the session, as a convenience for
    /// hosts that don't want to carry the codec themselves.
    pub fn receive_json(&mut self, payload: &str) {
        match decode_json(payload) {
            Ok(message) => self.receive(message),
            Err(e) => self.handler.on_message_error(e),
        }
    }

    /// Decode a MessagePack frame and feed it into the session.
    pub fn receive_msgpack(&mut self, payload: &[u8]) {
        match decode_msgpack(payload) {
            Ok(message) => self.receive(message),
            Err(e) => self.handler.on_message_error(e),
        }
    }
}

impl ConnectionHandler {
    /// Whether `message` is allowed to be dispatched while the connection is
    /// in its current state. HELLO is the only command a freshly opened
    /// connection accepts; everything else requires the handshake to have
    /// already completed.
    fn state_allows(&self, message: &Message) -> bool {
        let state = self.info.lock().unwrap().state.clone();
        match (&state, message) {
            (ConnectionState::Initializing, Message::Hello(..)) => true,
            (ConnectionState::Initializing, _) => false,
            (ConnectionState::Connected, Message::Hello(..)) => false,
            (ConnectionState::Connected, _) => true,
            (ConnectionState::ShuttingDown, Message::Goodbye(..)) => true,
            (ConnectionState::ShuttingDown, _) => false,
            (ConnectionState::Disconnected, _) => false,
        }
    }

    pub(super) fn handle_message(&mut self, message: Message) -> WampResult<()> {
        debug!("Received message {:?}", message);

        if !self.state_allows(&message) {
            return Err(Error::new(ErrorKind::InvalidState(
                "Tried to execute command in wrong state",
            )));
        }

        match message {
            Message::Hello(realm, details) => self.handle_hello(realm, details),
            Message::Subscribe(request_id, options, topic) => {
                self.handle_subscribe(request_id, options, topic)
            }
            Message::Publish(request_id, options, topic, args, kwargs) => {
                self.handle_publish(request_id, options, topic, args, kwargs)
            }
            Message::Unsubscribe(request_id, topic_id) => {
                self.handle_unsubscribe(request_id, topic_id)
            }
            Message::Goodbye(details, reason) => self.handle_goodbye(details, reason),
            Message::Register(request_id, options, procedure) => {
                self.handle_register(request_id, options, procedure)
            }
            Message::Unregister(request_id, procedure_id) => {
                self.handle_unregister(request_id, procedure_id)
            }
            Message::Call(request_id, options, procedure, args, kwargs) => {
                self.handle_call(request_id, options, procedure, args, kwargs)
            }
            Message::Yield(invocation_id, options, args, kwargs) => {
                self.handle_yield(invocation_id, options, args, kwargs)
            }
            Message::Error(e_type, request_id, details, reason, args, kwargs) => {
                self.handle_error(e_type, request_id, details, reason, args, kwargs)
            }
            t => Err(Error::new(ErrorKind::InvalidMessageType(t))),
        }
    }

    fn handle_error(
        &mut self,
        e_type: ErrorType,
        request_id: ID,
        details: Dict,
        reason: Reason,
        args: Option<List>,
        kwargs: Option<Dict>,
    ) -> WampResult<()> {
        if e_type != ErrorType::Invocation {
            return Err(Error::new(ErrorKind::InvalidState(
                "Got an error message that was not for a call message",
            )));
        }
        debug!(
            "Responding to error message for invocation (id: {})",
            request_id
        );
        let realm = self.realm.as_ref().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState(
                "Received a message while not attached to a realm",
            ))
        })?;
        let mut realm = realm.lock().unwrap();
        let manager = &mut realm.registration_manager;
        match manager.active_calls.remove(&request_id) {
            Some((call_id, caller, _callee)) => {
                let error_message =
                    Message::Error(ErrorType::Call, call_id, details, reason, args, kwargs);
                send_message(&caller, &error_message)
            }
            None => {
                debug!(
                    "Ignoring error for invocation {} with no pending call",
                    request_id
                );
                Ok(())
            }
        }
    }

    fn send_error(&self, err_type: ErrorType, request_id: ID, reason: Reason) {
        send_message(
            &self.info,
            &Message::Error(err_type, request_id, HashMap::new(), reason, None, None),
        )
        .ok();
    }

    fn send_abort(&self, reason: Reason, message: &str) {
        send_message(
            &self.info,
            &Message::Abort(ErrorDetails::new_with_message(message), reason),
        )
        .ok();
    }

    /// Respond to a failure surfaced anywhere in dispatch. Every path here but
    /// `ErrorReason` is terminal: the four ways a command can be rejected
    /// before or during a handler running all close the session with an
    /// ABORT(`wamp.error.protocol_violation`), differing only in the message
    /// that explains which of the four checks failed.
    pub(super) fn on_message_error(&mut self, error: Error) {
        match error.get_kind() {
            ErrorKind::Transport(msg) => {
                error!("Transport error: {}", msg);
                self.terminate_connection();
            }
            ErrorKind::HandshakeError(r) => {
                error!("Handshake error: {}", r);
                self.send_abort(r, "Handshake rejected");
                self.terminate_connection();
            }
            ErrorKind::UnexpectedMessage(msg) => {
                error!("Unexpected message: {}", msg);
                self.send_abort(Reason::ProtocolViolation, msg);
                self.terminate_connection();
            }
            ErrorKind::JSONError(e) => {
                error!("Could not parse JSON: {}", e);
                self.send_abort(
                    Reason::ProtocolViolation,
                    "Command syntax does not match any allowed syntaxes",
                );
                self.terminate_connection();
            }
            ErrorKind::MsgPackDecodeError(e) => {
                error!("Could not parse MsgPack: {}", e);
                self.send_abort(
                    Reason::ProtocolViolation,
                    "Command syntax does not match any allowed syntaxes",
                );
                self.terminate_connection();
            }
            ErrorKind::MsgPackEncodeError(e) => {
                error!("Could not encode MsgPack: {}", e);
                self.terminate_connection();
            }
            ErrorKind::MalformedData => {
                self.send_abort(
                    Reason::ProtocolViolation,
                    "Command syntax does not match any allowed syntaxes",
                );
                self.terminate_connection();
            }
            ErrorKind::InvalidMessageType(msg) => {
                error!("Router unable to handle message {:?}", msg);
                self.send_abort(Reason::ProtocolViolation, "Failed to execute command");
                self.terminate_connection();
            }
            ErrorKind::InvalidState(s) => {
                error!("Invalid state: {}", s);
                self.send_abort(Reason::ProtocolViolation, s);
                self.terminate_connection();
            }
            ErrorKind::ErrorReason(err_type, id, reason) => self.send_error(err_type, id, reason),
        }
    }
}
