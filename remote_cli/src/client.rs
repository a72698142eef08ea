//! # Remote Control Client

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, SocketOptions},
    remote::{RemoteCmd, RemoteResponse},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Client sending operator commands to the drive executable.
pub struct RemoteClient {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RemoteClientError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),

    #[error("The drive executable is not connected")]
    NotConnected,

    #[error("Could not send the command: {0}")]
    SendError(zmq::Error),

    #[error("Could not receive the response: {0}")]
    RecvError(zmq::Error),

    #[error("No response from the drive executable")]
    NoResponse,

    #[error("Could not serialize the command: {0}")]
    SerializationError(serde_json::Error),

    #[error("Could not parse the response: {0}")]
    DeserializeError(serde_json::Error),

    #[error("The drive executable sent a response which was not valid UTF-8")]
    NonUtf8Response,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RemoteClient {
    /// Connect to the drive executable's remote control server.
    ///
    /// This function will not block until the server connects.
    pub fn new(ctx: &zmq::Context, endpoint: &str) -> Result<Self, RemoteClientError> {
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 2000,
            send_timeout: 500,
            // A lost response must not wedge the REQ socket
            req_correlate: true,
            req_relaxed: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::REQ, socket_options, endpoint)?;

        Ok(Self { socket })
    }

    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Send a command and wait for its response.
    pub fn execute(&self, cmd: &RemoteCmd) -> Result<RemoteResponse, RemoteClientError> {
        if !self.socket.connected() {
            return Err(RemoteClientError::NotConnected);
        }

        let cmd_str = serde_json::to_string(cmd).map_err(RemoteClientError::SerializationError)?;

        self.socket
            .send(&cmd_str, 0)
            .map_err(RemoteClientError::SendError)?;

        let response_str = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => return Err(RemoteClientError::NonUtf8Response),
            Err(zmq::Error::EAGAIN) => return Err(RemoteClientError::NoResponse),
            Err(e) => return Err(RemoteClientError::RecvError(e)),
        };

        serde_json::from_str(&response_str).map_err(RemoteClientError::DeserializeError)
    }
}
