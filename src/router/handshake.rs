use std::sync::Arc;

use log::{debug, info, warn};

use crate::messages::{
    ErrorDetails, HelloDetails, Message, Reason, RouterRoles, WelcomeDetails, URI,
};
use crate::router::messaging::send_message;
use crate::{Error, ErrorKind, WampResult};

use super::{ConnectionHandler, ConnectionState};

impl ConnectionHandler {
    pub fn handle_hello(&mut self, realm: URI, _details: HelloDetails) -> WampResult<()> {
        debug!("Responding to hello message (realm: {:?})", realm);

        let allowed = self.info.lock().unwrap().transport.realm_allowed(&realm.uri);
        if !allowed {
            return Err(Error::new(ErrorKind::HandshakeError(Reason::NoSuchRealm)));
        }

        let id = {
            let mut info = self.info.lock().unwrap();
            info.state = ConnectionState::Connected;
            info.id
        };

        self.set_realm(realm.uri)?;
        send_message(
            &self.info,
            &Message::Welcome(id, WelcomeDetails::new(RouterRoles::new())),
        )
    }

    pub fn handle_goodbye(&mut self, _details: ErrorDetails, reason: Reason) -> WampResult<()> {
        let state = self.info.lock().unwrap().state.clone();
        match state {
            ConnectionState::Initializing => Err(Error::new(ErrorKind::InvalidState(
                "Received a goodbye message before handshake complete",
            ))),
            ConnectionState::Connected => {
                info!("Received goodbye message with reason: {:?}", reason);
                self.remove();
                send_message(
                    &self.info,
                    &Message::Goodbye(ErrorDetails::new(), Reason::GoodbyeAndOut),
                )
                .ok();
                let mut info = self.info.lock().unwrap();
                info.state = ConnectionState::Disconnected;
                info.transport.close_session();
                Ok(())
            }
            ConnectionState::ShuttingDown => {
                info!(
                    "Received goodbye message in response to our goodbye message with reason: {:?}",
                    reason
                );
                let mut info = self.info.lock().unwrap();
                info.state = ConnectionState::Disconnected;
                info.transport.close_session();
                Ok(())
            }
            ConnectionState::Disconnected => {
                warn!("Received goodbye message after closing connection");
                Ok(())
            }
        }
    }

    fn set_realm(&mut self, realm: String) -> WampResult<()> {
        debug!("Setting realm to {}", realm);
        let realm = self.router.get_or_create_realm(&realm);
        realm.lock().unwrap().connections.push(Arc::clone(&self.info));
        self.realm = Some(realm);
        Ok(())
    }
}
