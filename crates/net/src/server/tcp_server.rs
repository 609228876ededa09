//! Event driven TCP server.
//!
//! The server owns a multi-threaded tokio runtime with the configured number of
//! workers. One task accepts connections and spawns a driver task per connection.
//! The driver keeps at most one read or write in flight: it performs the operation
//! chosen by the last handler, fires the matching event, and repeats until a handler
//! picks [`Operation::Close`], the peer disconnects or an I/O error occurs.
//!
//! ```no_run
//! use micro_net::server::{DataReceived, DataSent, Operation, ServerConfig, TcpServer};
//!
//! let mut server = TcpServer::new(ServerConfig::default());
//! // echo every read back to the peer
//! server.register(|e: &mut DataReceived| e.set_next_operation(Operation::Write)).unwrap();
//! server.register(|e: &mut DataSent| e.set_next_operation(Operation::Read)).unwrap();
//! server.start().unwrap();
//! ```

use std::mem;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::{Handle, Runtime};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::ensure;
use crate::event::{Event, EventRegistry};
use crate::server::events::ContextEvent;
use crate::server::{ConnectionAccepted, ConnectionContext, DataReceived, DataSent, Operation, ServerConfig, ServerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Running,
    Stopped,
}

#[derive(Debug)]
pub struct TcpServer {
    config: ServerConfig,
    registry: EventRegistry,
    state: State,
    runtime: Option<Runtime>,
    shutdown: CancellationToken,
    local_addr: Option<SocketAddr>,
}

impl TcpServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: EventRegistry::new(),
            state: State::Init,
            runtime: None,
            shutdown: CancellationToken::new(),
            local_addr: None,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Installs the handler for `E`, replacing the previous one.
    ///
    /// Handlers run on the worker threads and must not block.
    ///
    /// # Errors
    ///
    /// [`ServerError::AlreadyStarted`] once [`start`](Self::start) has been called.
    pub fn register<E, F>(&mut self, handler: F) -> Result<&mut Self, ServerError>
    where
        E: Event,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        ensure!(self.state == State::Init, ServerError::AlreadyStarted);
        self.registry.set(handler);
        Ok(self)
    }

    /// Builder form of [`register`](Self::register) for a server that has not started yet.
    pub fn with_handler<E, F>(mut self, handler: F) -> Self
    where
        E: Event,
        F: Fn(&mut E) + Send + Sync + 'static,
    {
        self.registry.set(handler);
        self
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// The address actually bound, available once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Builds the worker runtime, binds the listener and starts accepting.
    ///
    /// Returns the bound address, which differs from the configured one when port 0 was asked for.
    pub fn start(&mut self) -> Result<SocketAddr, ServerError> {
        ensure!(self.state == State::Init, ServerError::AlreadyStarted);
        self.config.validate()?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_threads())
            .thread_name("micro-net-worker")
            .enable_all()
            .build()
            .map_err(ServerError::runtime)?;

        let addr = self.config.listen_addr();
        let std_listener = std::net::TcpListener::bind(addr).map_err(|e| ServerError::bind(addr, e))?;
        std_listener.set_nonblocking(true).map_err(|e| ServerError::bind(addr, e))?;
        let local_addr = std_listener.local_addr().map_err(|e| ServerError::bind(addr, e))?;

        let listener = {
            let _guard = runtime.enter();
            TcpListener::from_std(std_listener).map_err(|e| ServerError::bind(addr, e))?
        };

        let registry = Arc::new(self.take_registry());
        runtime.spawn(accept_loop(listener, registry, self.config.buffer_size(), self.shutdown.clone()));

        info!(addr = %local_addr, workers = self.config.worker_threads(), "server started");
        self.runtime = Some(runtime);
        self.local_addr = Some(local_addr);
        self.state = State::Running;
        Ok(local_addr)
    }

    /// Stops accepting, cancels every connection and waits up to the configured
    /// shutdown timeout for the workers to finish.
    ///
    /// Called from inside an async context the workers are released in the
    /// background instead, since blocking there is not allowed.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        ensure!(self.state == State::Running, ServerError::NotRunning);

        self.shutdown.cancel();
        if let Some(runtime) = self.runtime.take() {
            if Handle::try_current().is_ok() {
                debug!("stopping from an async context, workers shut down in the background");
                runtime.shutdown_background();
            } else {
                runtime.shutdown_timeout(self.config.shutdown_timeout());
            }
        }
        self.state = State::Stopped;
        info!(addr = ?self.local_addr, "server stopped");
        Ok(())
    }

    /// The registry the running server dispatches from, with a default handler
    /// for every connection event that was left unregistered.
    fn take_registry(&mut self) -> EventRegistry {
        let mut registry = mem::take(&mut self.registry);
        if !registry.has::<ConnectionAccepted>() {
            registry.set(|e: &mut ConnectionAccepted| {
                e.reset_buffer();
                e.set_next_operation(Operation::Read);
            });
        }
        if !registry.has::<DataReceived>() {
            registry.set(|e: &mut DataReceived| e.set_next_operation(Operation::Close));
        }
        if !registry.has::<DataSent>() {
            registry.set(|e: &mut DataSent| e.set_next_operation(Operation::Close));
        }
        registry
    }
}

impl Drop for TcpServer {
    fn drop(&mut self) {
        if self.state == State::Running {
            let _ = self.stop();
        }
    }
}

async fn accept_loop(listener: TcpListener, registry: Arc<EventRegistry>, buffer_size: usize, shutdown: CancellationToken) {
    let mut next_id: u64 = 0;
    loop {
        let (stream, peer_addr) = tokio::select! {
            () = shutdown.cancelled() => {
                debug!("stop accepting connections");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            },
        };

        next_id += 1;
        let ctx = ConnectionContext::new(next_id, peer_addr, buffer_size);
        let registry = Arc::clone(&registry);
        let shutdown = shutdown.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = shutdown.cancelled() => debug!(id = next_id, "connection cancelled by shutdown"),
                () = drive(stream, ctx, registry) => {}
            }
        });
    }
}

/// Runs one connection until it closes.
async fn drive(mut stream: TcpStream, ctx: ConnectionContext, registry: Arc<EventRegistry>) {
    let id = ctx.id();
    debug!(id, peer = %ctx.peer_addr(), "connection accepted");

    let Some(mut ctx) = dispatch::<ConnectionAccepted>(ctx, &registry) else {
        return;
    };

    loop {
        match ctx.next_operation() {
            Operation::Read => {
                if !ctx.begin_io() {
                    error!(id, "read requested while another operation is in flight");
                    break;
                }
                let result = match ctx.read_slot() {
                    Some(slot) => stream.read(slot).await,
                    None => {
                        ctx.end_io();
                        warn!(id, capacity = ctx.capacity(), "extended buffer is full, closing connection");
                        break;
                    }
                };
                ctx.end_io();

                match result {
                    Ok(0) => {
                        debug!(id, "peer closed connection");
                        break;
                    }
                    Ok(n) => {
                        ctx.commit_read(n);
                        trace!(id, bytes = n, "data received");
                        ctx = match dispatch::<DataReceived>(ctx, &registry) {
                            Some(ctx) => ctx,
                            None => break,
                        };
                    }
                    Err(e) => {
                        warn!(id, cause = %e, "read failed");
                        break;
                    }
                }
            }

            Operation::Write => {
                let len = ctx.content_size();
                if len == 0 {
                    debug!(id, "nothing to write, closing connection");
                    break;
                }
                if !ctx.begin_io() {
                    error!(id, "write requested while another operation is in flight");
                    break;
                }
                let result = stream.write_all(ctx.content()).await;
                ctx.end_io();

                if let Err(e) = result {
                    warn!(id, cause = %e, "write failed");
                    break;
                }
                ctx.commit_write(len);
                trace!(id, bytes = len, "data sent");
                ctx = match dispatch::<DataSent>(ctx, &registry) {
                    Some(ctx) => ctx,
                    None => break,
                };
            }

            Operation::Close => break,
        }
    }

    if let Err(e) = stream.shutdown().await {
        trace!(id, cause = %e, "shutdown after close failed");
    }
    debug!(id, "connection closed");
}

/// Fires `E` for `ctx` and hands the context back, or `None` when the event could not be dispatched.
fn dispatch<E: ContextEvent>(ctx: ConnectionContext, registry: &Arc<EventRegistry>) -> Option<ConnectionContext> {
    let id = ctx.id();
    let mut event = E::wrap(ctx, Arc::clone(registry));
    match registry.call(&mut event) {
        Ok(()) => Some(event.into_context()),
        Err(e) => {
            error!(id, cause = %e, "failed to dispatch connection event");
            None
        }
    }
}
