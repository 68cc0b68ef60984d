//! Scripted transport for exercising the client without sockets.
//!
//! Each connect attempt pops the next [`Attempt`] from the script (default
//! [`Attempt::Accept`]). Everything the client does is recorded as an
//! [`Event`], and live handles are counted so tests can check that no two
//! ever coexist.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::{Instant, sleep};

use crate::error::{Error, Result, saturating_millis};
use crate::params::ConnectionParams;
use crate::transport::{
    CloseOptions, HandshakeRequest, Message, SocketOptions, Transport, TransportHandle,
};

/// Outcome of one connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Attempt {
    Accept,
    RefuseConnect,
    RejectHandshake,
}

/// What a handle's next read yields.
#[derive(Debug)]
pub(crate) enum Incoming {
    Message(Message),
    Closed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Connect {
        id: u32,
        host: String,
        port: u16,
        options: SocketOptions,
    },
    Handshake {
        id: u32,
        path: String,
        host: Option<String>,
        timeout: Duration,
    },
    Write(u32, Message),
    Pong(u32, Vec<u8>),
    Done(u32, Message),
    Close(u32, CloseOptions),
    Release(u32),
}

#[derive(Debug, Default)]
struct Script {
    attempts: VecDeque<Attempt>,
    incoming: VecDeque<Incoming>,
    fail_close: bool,
    events: Vec<Event>,
    attempt_times: Vec<Instant>,
    next_id: u32,
    live: u32,
    peak_live: u32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_attempts(attempts: impl IntoIterator<Item = Attempt>) -> Self {
        let transport = Self::new();
        transport.push_attempts(attempts);
        transport
    }

    pub(crate) fn push_attempts(&self, attempts: impl IntoIterator<Item = Attempt>) {
        self.script.lock().attempts.extend(attempts);
    }

    pub(crate) fn push_incoming(&self, incoming: Incoming) {
        self.script.lock().incoming.push_back(incoming);
    }

    pub(crate) fn fail_close(&self) {
        self.script.lock().fail_close = true;
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.script.lock().events.clone()
    }

    pub(crate) fn attempt_count(&self) -> usize {
        self.script.lock().attempt_times.len()
    }

    pub(crate) fn attempt_times(&self) -> Vec<Instant> {
        self.script.lock().attempt_times.clone()
    }

    pub(crate) fn live(&self) -> u32 {
        self.script.lock().live
    }

    pub(crate) fn peak_live(&self) -> u32 {
        self.script.lock().peak_live
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedSocket {
    id: u32,
    attempt: Attempt,
}

#[derive(Debug)]
pub(crate) struct ScriptedHandle {
    id: u32,
    script: Arc<Mutex<Script>>,
    read_timeout: Option<Duration>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Socket = ScriptedSocket;
    type Handle = ScriptedHandle;

    async fn connect(
        &self,
        params: &ConnectionParams,
        options: &SocketOptions,
    ) -> Result<ScriptedSocket> {
        let mut script = self.script.lock();
        script.next_id += 1;
        let id = script.next_id;
        script.attempt_times.push(Instant::now());
        script.events.push(Event::Connect {
            id,
            host: params.host.clone(),
            port: params.port,
            options: *options,
        });

        let attempt = script.attempts.pop_front().unwrap_or(Attempt::Accept);
        if attempt == Attempt::RefuseConnect {
            return Err(Error::transport("connection refused"));
        }

        Ok(ScriptedSocket { id, attempt })
    }

    async fn handshake(
        &self,
        socket: ScriptedSocket,
        request: &HandshakeRequest,
    ) -> Result<ScriptedHandle> {
        let mut script = self.script.lock();
        script.events.push(Event::Handshake {
            id: socket.id,
            path: request.path.clone(),
            host: request.header("Host").map(str::to_owned),
            timeout: request.timeout,
        });

        if socket.attempt == Attempt::RejectHandshake {
            return Err(Error::handshake("HTTP error: 403 Forbidden"));
        }

        script.live += 1;
        script.peak_live = script.peak_live.max(script.live);

        Ok(ScriptedHandle {
            id: socket.id,
            script: Arc::clone(&self.script),
            read_timeout: None,
        })
    }
}

#[async_trait]
impl TransportHandle for ScriptedHandle {
    async fn write(&mut self, message: Message) -> Result<()> {
        self.script.lock().events.push(Event::Write(self.id, message));
        Ok(())
    }

    async fn write_pong(&mut self, payload: Vec<u8>) -> Result<()> {
        self.script.lock().events.push(Event::Pong(self.id, payload));
        Ok(())
    }

    async fn read(&mut self) -> Result<Option<Message>> {
        let next = self.script.lock().incoming.pop_front();
        match next {
            Some(Incoming::Message(message)) => Ok(Some(message)),
            Some(Incoming::Closed) => Ok(None),
            Some(Incoming::Reset) => Err(Error::transport("connection reset by peer")),
            None => match self.read_timeout {
                Some(limit) => {
                    sleep(limit).await;
                    Err(Error::read_timeout(saturating_millis(limit)))
                }
                None => Ok(None),
            },
        }
    }

    fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.read_timeout = timeout;
        Ok(())
    }

    fn done(&mut self, message: Message) {
        self.script.lock().events.push(Event::Done(self.id, message));
    }

    async fn close(&mut self, options: CloseOptions) -> Result<()> {
        let mut script = self.script.lock();
        script.events.push(Event::Close(self.id, options));
        if script.fail_close {
            return Err(Error::transport("broken pipe"));
        }
        Ok(())
    }
}

impl Drop for ScriptedHandle {
    fn drop(&mut self) {
        let mut script = self.script.lock();
        script.events.push(Event::Release(self.id));
        script.live -= 1;
    }
}
