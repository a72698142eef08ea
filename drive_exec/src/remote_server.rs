//! # Remote control server
//!
//! Serves [`RemoteCmd`]s from the operator on a REP socket in a background thread. Commands act
//! on the shared [`RoverState`], which the drive loop reads at the start of each cycle.
//!
//! A REP socket which fails to receive or reply is left mid request, so after any socket fault
//! the server drops the socket and binds a new one.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    remote::{RemoteCmd, RemoteResponse},
};
use log::{debug, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::state::RoverState;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Wait after a socket fault before binding again.
const SOCKET_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Sent if a response cannot be serialised, so the REP socket still replies.
const FALLBACK_RESPONSE: &str = r#"{"Invalid":"Could not serialise the response"}"#;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Remote control server
pub struct RemoteServer {
    bg_run: Arc<AtomicBool>,

    bg_jh: Option<JoinHandle<()>>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RemoteServerError {
    #[error("Socket error: {0}")]
    SocketError(#[from] MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RemoteServer {
    /// Bind the server socket and start serving in the background.
    pub fn start(
        ctx: &zmq::Context,
        params: &NetParams,
        state: Arc<RoverState>,
    ) -> Result<Self, RemoteServerError> {
        let socket = open_socket(ctx, &params.remote_endpoint)?;

        let bg_run = Arc::new(AtomicBool::new(true));

        let bg_jh = {
            let bg_run = bg_run.clone();
            let ctx = ctx.clone();
            let endpoint = params.remote_endpoint.clone();
            thread::spawn(move || bg_thread(ctx, endpoint, socket, bg_run, state))
        };

        info!("Remote control server listening on {}", params.remote_endpoint);

        Ok(Self {
            bg_run,
            bg_jh: Some(bg_jh),
        })
    }

    /// Stop serving and wait for the background thread to exit.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            jh.join().ok();
        }
    }
}

impl Drop for RemoteServer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Execute a command against the rover state.
pub fn handle_cmd(state: &RoverState, cmd: RemoteCmd) -> RemoteResponse {
    match cmd {
        RemoteCmd::GetStatus => RemoteResponse::Status(state.status()),
        RemoteCmd::ListPilots => RemoteResponse::Pilots(state.pilot_names().to_vec()),
        RemoteCmd::SelectPilot { index } => match state.select_pilot(index) {
            Ok(()) => RemoteResponse::Ok,
            Err(e) => RemoteResponse::Invalid(e.to_string()),
        },
        RemoteCmd::SelectPilotByName { name } => match state.select_pilot_by_name(&name) {
            Ok(_) => RemoteResponse::Ok,
            Err(e) => RemoteResponse::Invalid(e.to_string()),
        },
        RemoteCmd::ToggleRecord => {
            state.toggle_recording();
            RemoteResponse::Ok
        }
        RemoteCmd::SetRecord { enabled } => {
            state.set_recording(enabled);
            RemoteResponse::Ok
        }
        RemoteCmd::Stop => {
            info!("Stop requested by the operator");
            state.request_stop();
            RemoteResponse::Ok
        }
    }
}

fn open_socket(ctx: &zmq::Context, endpoint: &str) -> Result<MonitoredSocket, RemoteServerError> {
    let socket_options = SocketOptions {
        bind: true,
        linger: 1,
        recv_timeout: 100,
        send_timeout: 100,
        ..Default::default()
    };

    Ok(MonitoredSocket::new(
        ctx,
        zmq::REP,
        socket_options,
        endpoint,
    )?)
}

fn bg_thread(
    ctx: zmq::Context,
    endpoint: String,
    socket: MonitoredSocket,
    bg_run: Arc<AtomicBool>,
    state: Arc<RoverState>,
) {
    let mut socket = Some(socket);

    while bg_run.load(Ordering::Relaxed) {
        if socket.is_none() {
            match open_socket(&ctx, &endpoint) {
                Ok(s) => {
                    info!("Remote control socket bound again on {}", endpoint);
                    socket = Some(s);
                }
                Err(e) => {
                    warn!("Could not bind the remote control socket: {}", e);
                    thread::sleep(SOCKET_RETRY_DELAY);
                    continue;
                }
            }
        }

        let fault = match socket {
            Some(ref s) => serve_next(s, &state).err(),
            None => None,
        };

        if let Some(e) = fault {
            warn!("Remote control socket fault, recreating it: {}", e);
            socket = None;
            thread::sleep(SOCKET_RETRY_DELAY);
        }
    }
}

/// Wait for one command and reply to it.
///
/// A receive timeout is not a fault, any other socket error is returned.
fn serve_next(socket: &zmq::Socket, state: &RoverState) -> Result<(), zmq::Error> {
    let response = match socket.recv_string(0) {
        Ok(Ok(s)) => match RemoteCmd::from_json(&s) {
            Ok(cmd) => {
                debug!("Remote command: {:?}", cmd);
                handle_cmd(state, cmd)
            }
            Err(e) => RemoteResponse::Invalid(format!("Could not parse the command: {}", e)),
        },
        Ok(Err(_)) => RemoteResponse::Invalid("The command was not valid UTF-8".into()),
        Err(zmq::Error::EAGAIN) => return Ok(()),
        Err(e) => return Err(e),
    };

    let response_str = serde_json::to_string(&response).unwrap_or_else(|e| {
        warn!("Could not serialise the remote response: {}", e);
        FALLBACK_RESPONSE.into()
    });

    socket.send(&response_str, 0)
}

#[cfg(test)]
mod test {
    use super::*;

    fn state() -> RoverState {
        RoverState::new(vec!["Gamepad".into(), "Mixed Gamepad".into(), "Autonomous".into()])
            .unwrap()
    }

    #[test]
    fn test_select_and_record_commands() {
        let state = state();

        assert_eq!(
            handle_cmd(&state, RemoteCmd::SelectPilot { index: 2 }),
            RemoteResponse::Ok
        );
        assert_eq!(state.selected_pilot(), 2);

        assert!(matches!(
            handle_cmd(&state, RemoteCmd::SelectPilot { index: 7 }),
            RemoteResponse::Invalid(_)
        ));
        assert_eq!(state.selected_pilot(), 2);

        assert_eq!(
            handle_cmd(
                &state,
                RemoteCmd::SelectPilotByName {
                    name: "Mixed Gamepad".into()
                }
            ),
            RemoteResponse::Ok
        );
        assert_eq!(state.selected_pilot(), 1);

        handle_cmd(&state, RemoteCmd::ToggleRecord);
        assert!(state.recording());
        handle_cmd(&state, RemoteCmd::SetRecord { enabled: false });
        assert!(!state.recording());
    }

    #[test]
    fn test_socket_fault_reported() {
        let ctx = zmq::Context::new();
        let state = state();

        let rep = ctx.socket(zmq::REP).unwrap();
        rep.set_rcvtimeo(100).unwrap();
        rep.bind("inproc://remote_server_fault").unwrap();
        let req = ctx.socket(zmq::REQ).unwrap();
        req.set_rcvtimeo(1000).unwrap();
        req.connect("inproc://remote_server_fault").unwrap();

        // Nothing pending is only a timeout
        assert!(serve_next(&rep, &state).is_ok());

        // A served request gets its response
        req.send(r#""ListPilots""#, 0).unwrap();
        serve_next(&rep, &state).unwrap();
        let reply = req.recv_string(0).unwrap().unwrap();
        assert_eq!(
            serde_json::from_str::<RemoteResponse>(&reply).unwrap(),
            RemoteResponse::Pilots(state.pilot_names().to_vec())
        );

        // A request taken without a reply leaves the socket unable to receive
        req.send(r#""GetStatus""#, 0).unwrap();
        rep.recv_string(0).unwrap().unwrap();
        assert_eq!(serve_next(&rep, &state), Err(zmq::Error::EFSM));
    }

    #[test]
    fn test_server_recovers_from_socket_fault() {
        let ctx = zmq::Context::new();
        let state = Arc::new(state());
        let endpoint = "tcp://127.0.0.1:45731".to_string();

        let socket = open_socket(&ctx, &endpoint).unwrap();

        let stuck_req = ctx.socket(zmq::REQ).unwrap();
        stuck_req.set_linger(0).unwrap();
        stuck_req.connect(&endpoint).unwrap();
        stuck_req.send(r#""GetStatus""#, 0).unwrap();

        // Take the request without replying, waiting out the TCP connection
        let mut taken = false;
        for _ in 0..50 {
            if socket.recv_string(0).is_ok() {
                taken = true;
                break;
            }
        }
        assert!(taken);

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_jh = {
            let (ctx, endpoint, bg_run, state) =
                (ctx.clone(), endpoint.clone(), bg_run.clone(), state.clone());
            thread::spawn(move || bg_thread(ctx, endpoint, socket, bg_run, state))
        };

        // Let the faulted socket close before a new client connects
        thread::sleep(Duration::from_millis(200));

        let req = ctx.socket(zmq::REQ).unwrap();
        req.set_linger(0).unwrap();
        req.set_rcvtimeo(5000).unwrap();
        req.connect(&endpoint).unwrap();
        req.send(r#""Stop""#, 0).unwrap();

        assert_eq!(
            serde_json::from_str::<RemoteResponse>(&req.recv_string(0).unwrap().unwrap())
                .unwrap(),
            RemoteResponse::Ok
        );
        assert!(state.stop_requested());

        bg_run.store(false, Ordering::Relaxed);
        bg_jh.join().unwrap();
    }

    #[test]
    fn test_query_commands() {
        let state = state();

        assert_eq!(
            handle_cmd(&state, RemoteCmd::ListPilots),
            RemoteResponse::Pilots(state.pilot_names().to_vec())
        );
        assert_eq!(
            handle_cmd(&state, RemoteCmd::GetStatus),
            RemoteResponse::Status(state.status())
        );

        handle_cmd(&state, RemoteCmd::Stop);
        assert!(state.stop_requested());
    }
}
