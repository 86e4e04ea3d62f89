//! HTTP + WebSocket adapter.
//!
//! Routes:
//!
//! | Route          | Method  | Handler                                  |
//! |----------------|---------|------------------------------------------|
//! | `/wificonfig`  | GET     | [`settings_api::handle_get`]             |
//! | `/wifisetup`   | POST    | [`settings_api::handle_post`]            |
//! | `/wifisetup`   | OPTIONS | CORS preflight                           |
//! | `/ws`          | WS      | push [`BridgeEvent`]s onto the queue     |
//!
//! The WebSocket callback runs on the HTTP server task and never touches
//! the serial link.  It only enqueues events; the main loop owns the
//! bridge and its [`WsListeners`].  A new session's detached sender is
//! parked in the [`SenderHandoff`] until the main loop handles the
//! matching connect event, so no lock is ever held across a send.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{info, warn};

use crate::app::ports::{ListenerError, ListenerPort};
use crate::events::{BridgeEvent, ClientId, MAX_MESSAGE_LEN};

#[cfg(target_os = "espidf")]
use esp_idf_svc::{
    http::{
        Method,
        server::{
            Configuration, EspHttpConnection, EspHttpServer, Request,
            ws::{EspHttpWsConnection, EspHttpWsDetachedSender},
        },
    },
    io::{Read, Write},
    sys::{ESP_ERR_INVALID_SIZE, EspError, esp_err_t},
    ws::FrameType,
};

#[cfg(target_os = "espidf")]
use crate::{
    adapters::eeprom::EepromAdapter,
    app::settings::SettingsManager,
    app::settings_api::{self, ApiResponse, MAX_SETTINGS_BODY},
    events::EventQueue,
};

/// Settings manager shared between the main task and HTTP handlers.
#[cfg(target_os = "espidf")]
pub type SharedSettings = Arc<Mutex<SettingsManager<EepromAdapter>>>;

/// Lock, recovering the data if another task panicked while holding it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ───────────────────────────────────────────────────────────────
// Listener set
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub type Sender = EspHttpWsDetachedSender;

/// Frame captured by a simulated listener.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimFrame {
    Binary(Vec<u8>),
    Text(String),
}

/// Simulated detached sender that records what it is given.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct Sender {
    frames: Vec<SimFrame>,
    refuse: bool,
}

struct Listener {
    client: ClientId,
    sender: Sender,
    /// A send failed; dropped on the next [`WsListeners::cleanup`].
    broken: bool,
}

/// Senders created on the HTTP task, waiting to be adopted by the main loop.
#[derive(Clone, Default)]
pub struct SenderHandoff(Arc<Mutex<Vec<(ClientId, Sender)>>>);

impl SenderHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park the sender for a freshly opened session.
    pub fn offer(&self, client: ClientId, sender: Sender) {
        let mut pending = lock(&self.0);
        pending.retain(|(c, _)| *c != client);
        pending.push((client, sender));
    }

    fn take(&self, client: ClientId) -> Option<Sender> {
        let mut pending = lock(&self.0);
        let idx = pending.iter().position(|(c, _)| *c == client)?;
        Some(pending.swap_remove(idx).1)
    }

    /// Discard a sender nobody adopted.  Returns whether one was parked.
    pub fn withdraw(&self, client: ClientId) -> bool {
        self.take(client).is_some()
    }

    /// Senders still waiting for their connect event.
    pub fn pending(&self) -> usize {
        lock(&self.0).len()
    }
}

/// Simulation hooks for host tests.
#[cfg(not(target_os = "espidf"))]
impl SenderHandoff {
    /// Park a simulated sender, as the WS handler does on open.
    pub fn offer_simulated(&self, client: ClientId) {
        self.offer(client, Sender::default());
    }
}

/// Connected WebSocket clients.  Owned by the main loop.
#[derive(Default)]
pub struct WsListeners {
    listeners: Vec<Listener>,
    handoff: SenderHandoff,
}

impl WsListeners {
    pub fn new(handoff: SenderHandoff) -> Self {
        Self {
            listeners: Vec::new(),
            handoff,
        }
    }

    /// Register a simulated client that records every frame it receives.
    #[cfg(not(target_os = "espidf"))]
    pub fn add_simulated(&mut self, client: ClientId) {
        self.insert(client, Sender::default());
    }

    fn insert(&mut self, client: ClientId, sender: Sender) {
        self.listeners.retain(|l| l.client != client);
        self.listeners.push(Listener {
            client,
            sender,
            broken: false,
        });
    }

    pub fn remove(&mut self, client: ClientId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.client != client);
        self.listeners.len() != before
    }

    /// Drop listeners whose last send failed.  Returns how many went.
    pub fn cleanup(&mut self) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|l| {
            if l.broken {
                info!("WS: dropping dead client #{}", l.client);
            }
            !l.broken
        });
        before - self.listeners.len()
    }

    pub fn clients(&self) -> impl Iterator<Item = ClientId> + '_ {
        self.listeners.iter().map(|l| l.client)
    }

    fn find(&mut self, client: ClientId) -> Option<&mut Listener> {
        self.listeners.iter_mut().find(|l| l.client == client)
    }
}

/// Simulation hooks for host tests.
#[cfg(not(target_os = "espidf"))]
impl WsListeners {
    /// Frames received by `client`, oldest first.
    pub fn sim_frames(&self, client: ClientId) -> Option<&[SimFrame]> {
        self.listeners
            .iter()
            .find(|l| l.client == client)
            .map(|l| l.sender.frames.as_slice())
    }

    /// Make every later send to `client` fail, as if its socket died.
    pub fn sim_break(&mut self, client: ClientId) {
        if let Some(l) = self.find(client) {
            l.sender.refuse = true;
        }
    }
}

#[cfg(target_os = "espidf")]
fn send_binary(sender: &mut Sender, frame: &[u8]) -> bool {
    sender.send(FrameType::Binary(false), frame).is_ok()
}

#[cfg(not(target_os = "espidf"))]
fn send_binary(sender: &mut Sender, frame: &[u8]) -> bool {
    if sender.refuse {
        return false;
    }
    sender.frames.push(SimFrame::Binary(frame.to_vec()));
    true
}

#[cfg(target_os = "espidf")]
fn send_text(sender: &mut Sender, text: &str) -> bool {
    sender.send(FrameType::Text(false), text.as_bytes()).is_ok()
}

#[cfg(not(target_os = "espidf"))]
fn send_text(sender: &mut Sender, text: &str) -> bool {
    if sender.refuse {
        return false;
    }
    sender.frames.push(SimFrame::Text(text.to_string()));
    true
}

impl ListenerPort for WsListeners {
    fn attach(&mut self, client: ClientId) -> bool {
        match self.handoff.take(client) {
            Some(sender) => {
                self.insert(client, sender);
                true
            }
            None => {
                warn!("WS: no sender parked for client #{}", client);
                false
            }
        }
    }

    fn detach(&mut self, client: ClientId) {
        self.handoff.withdraw(client);
        self.remove(client);
    }

    fn broadcast_binary(&mut self, frame: &[u8]) -> usize {
        let mut delivered = 0;
        for l in self.listeners.iter_mut().filter(|l| !l.broken) {
            if send_binary(&mut l.sender, frame) {
                delivered += 1;
            } else {
                warn!("WS: send to client #{} failed", l.client);
                l.broken = true;
            }
        }
        delivered
    }

    fn send_text(&mut self, client: ClientId, text: &str) -> Result<(), ListenerError> {
        let l = self.find(client).ok_or(ListenerError::UnknownClient)?;
        if l.broken {
            return Err(ListenerError::SendFailed);
        }
        if !send_text(&mut l.sender, text) {
            l.broken = true;
            return Err(ListenerError::SendFailed);
        }
        Ok(())
    }

    fn listener_count(&self) -> usize {
        self.listeners.iter().filter(|l| !l.broken).count()
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound frames
// ───────────────────────────────────────────────────────────────

/// What to do with an inbound frame of a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    Read,
    /// Too large to buffer: close the session without reading it.
    Close,
}

pub fn frame_action(len: usize) -> FrameAction {
    if len > MAX_MESSAGE_LEN {
        FrameAction::Close
    } else {
        FrameAction::Read
    }
}

/// Turn a received frame into a message event.  Text frames arrive
/// NUL-terminated; trailing NULs are stripped.
pub fn message_from_frame(client: ClientId, raw: &[u8]) -> Option<BridgeEvent> {
    let mut data = raw;
    while let [rest @ .., 0] = data {
        data = rest;
    }
    BridgeEvent::message(client, data)
}

// ───────────────────────────────────────────────────────────────
// HTTP server (device only)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
fn write_response(req: Request<&mut EspHttpConnection>, resp: &ApiResponse) -> anyhow::Result<()> {
    let content_length = resp.body.len().to_string();
    let mut response = req.into_response(
        resp.status,
        None,
        &[
            ("Content-Type", resp.content_type),
            ("Content-Length", &content_length),
            ("Access-Control-Allow-Origin", "*"),
        ],
    )?;
    response.write_all(resp.body.as_bytes())?;
    Ok(())
}

/// Read the request body into `buf`.  `None` if it does not fit.
#[cfg(target_os = "espidf")]
fn read_body(req: &mut Request<&mut EspHttpConnection>, buf: &mut [u8]) -> anyhow::Result<Option<usize>> {
    let mut total = 0;
    loop {
        if total == buf.len() {
            // Full buffer: only acceptable if the body ended exactly here.
            let mut extra = [0u8; 1];
            return Ok((req.read(&mut extra)? == 0).then_some(total));
        }
        let n = req.read(&mut buf[total..])?;
        if n == 0 {
            return Ok(Some(total));
        }
        total += n;
    }
}

/// Register every route and start listening on port 80.
#[cfg(target_os = "espidf")]
pub fn start_server(
    settings: SharedSettings,
    handoff: SenderHandoff,
    events: &'static EventQueue,
) -> anyhow::Result<EspHttpServer<'static>> {
    let config = Configuration {
        stack_size: 10240,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&config)?;

    let get_settings = settings.clone();
    server.fn_handler::<anyhow::Error, _>("/wificonfig", Method::Get, move |req| {
        let resp = settings_api::handle_get(&mut lock(&get_settings));
        write_response(req, &resp)
    })?;

    server.fn_handler::<anyhow::Error, _>("/wifisetup", Method::Post, move |mut req| {
        let mut body = [0u8; MAX_SETTINGS_BODY];
        let resp = match read_body(&mut req, &mut body)? {
            Some(len) => settings_api::handle_post(&mut lock(&settings), &body[..len]),
            None => {
                warn!("Web: settings body over {} bytes", MAX_SETTINGS_BODY);
                ApiResponse {
                    status: 413,
                    content_type: "text/plain",
                    body: "Payload too large".into(),
                }
            }
        };
        write_response(req, &resp)
    })?;

    server.fn_handler::<anyhow::Error, _>("/wifisetup", Method::Options, |req| {
        req.into_response(
            204,
            None,
            &[
                ("Access-Control-Allow-Origin", "*"),
                ("Access-Control-Allow-Methods", "GET, POST, OPTIONS"),
                ("Access-Control-Allow-Headers", "Content-Type"),
            ],
        )?;
        Ok(())
    })?;

    server.ws_handler("/ws", move |ws: &mut EspHttpWsConnection| -> Result<(), EspError> {
        let client = ws.session();

        if ws.is_new() {
            handoff.offer(client, ws.create_detached_sender()?);
            events.push(BridgeEvent::Connected { client });
            return Ok(());
        }
        if ws.is_closed() {
            events.push(BridgeEvent::Disconnected { client });
            return Ok(());
        }

        let (_frame_type, len) = ws.recv(&mut [])?;
        if frame_action(len) == FrameAction::Close {
            warn!("WS: {} byte message from #{}, closing session", len, client);
            // An error return makes httpd drop the session unread.
            return Err(EspError::from_infallible::<{ ESP_ERR_INVALID_SIZE as esp_err_t }>());
        }
        let mut buf = [0u8; MAX_MESSAGE_LEN];
        ws.recv(&mut buf[..len])?;

        if let Some(event) = message_from_frame(client, &buf[..len]) {
            events.push(event);
        }
        Ok(())
    })?;

    info!("Web: HTTP server up (/wificonfig, /wifisetup, /ws)");
    Ok(server)
}
