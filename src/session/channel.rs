use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use interprocess::local_socket::traits::{Listener as _, Stream as _};
use interprocess::local_socket::{GenericNamespaced, Listener, ListenerOptions, Stream, ToNsName};

use super::message::{WakeMessage, WakeReason};
use super::SignalError;

/// Lifecycle of a session signal. Dropping the owner destroys it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    Unset,
    Set,
}

/// Owner side of a named, system-wide session signal.
///
/// Holding the value keeps the name bound; any process can set the signal
/// with [`signal`] until it is dropped. Connections are accepted on a
/// background thread and each one is read on its own thread, so a peer that
/// connects and never writes cannot hold up other wakes or the deadline.
pub struct SessionSignal {
    name: String,
    state: SignalState,
    wakes: mpsc::Receiver<WakeMessage>,
    acceptor: Option<Acceptor>,
}

impl std::fmt::Debug for SessionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSignal")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SessionSignal {
    /// Create the named signal, initially unset.
    ///
    /// Fails if the name cannot be bound, including when another session
    /// already holds it.
    pub fn begin(name: &str) -> Result<Self, SignalError> {
        let creation_failed = |source: io::Error| SignalError::ResourceCreationFailed {
            name: name.to_string(),
            source,
        };

        let ns_name = name
            .to_ns_name::<GenericNamespaced>()
            .map_err(creation_failed)?;
        let listener = ListenerOptions::new()
            .name(ns_name)
            .create_sync()
            .map_err(creation_failed)?;

        let (sender, wakes) = mpsc::channel();
        let acceptor = Acceptor::spawn(name, listener, sender).map_err(creation_failed)?;

        tracing::info!(name, "session signal created");
        Ok(Self {
            name: name.to_string(),
            state: SignalState::Unset,
            wakes,
            acceptor: Some(acceptor),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SignalState {
        self.state
    }

    /// Block until the signal is set.
    ///
    /// With a deadline the signal sets itself once it elapses; a timeout
    /// and an external `end` both return `Ok(())`. Once set, further calls
    /// return immediately.
    pub fn wait(&mut self, deadline: Option<Duration>) -> Result<(), SignalError> {
        if self.state == SignalState::Set {
            return Ok(());
        }

        let message = match deadline {
            None => self.wakes.recv().map_err(|_| listener_stopped())?,
            Some(after) => match self.wakes.recv_timeout(after) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => {
                    tracing::info!(name = %self.name, ?after, "session deadline elapsed");
                    WakeMessage::end(WakeReason::Deadline)
                }
                Err(RecvTimeoutError::Disconnected) => return Err(listener_stopped()),
            },
        };

        self.state = SignalState::Set;
        tracing::info!(
            name = %self.name,
            reason = ?message.reason,
            sender_pid = message.sender_pid,
            "session signal set"
        );
        Ok(())
    }
}

impl Drop for SessionSignal {
    fn drop(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.shutdown(&self.name);
        }
    }
}

fn listener_stopped() -> SignalError {
    SignalError::WaitFailed(io::Error::other("session listener stopped"))
}

/// Thread that owns the listener and forwards every valid wake message.
struct Acceptor {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl Acceptor {
    fn spawn(name: &str, listener: Listener, wakes: mpsc::Sender<WakeMessage>) -> io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let name = name.to_string();
        let thread = thread::Builder::new()
            .name("wakeguard-session".to_string())
            .spawn(move || accept_loop(&name, &listener, &wakes, &flag))?;
        Ok(Self { stop, thread })
    }

    /// Stop accepting and release the name.
    fn shutdown(self, name: &str) {
        self.stop.store(true, Ordering::SeqCst);
        // Unblock the pending accept; the listener is dropped when the thread returns.
        if let Ok(ns_name) = name.to_ns_name::<GenericNamespaced>() {
            drop(Stream::connect(ns_name));
        }
        if self.thread.join().is_err() {
            tracing::warn!(name, "session listener thread panicked");
        }
    }
}

fn accept_loop(name: &str, listener: &Listener, wakes: &mpsc::Sender<WakeMessage>, stop: &AtomicBool) {
    loop {
        let conn = match listener.accept() {
            Ok(conn) => conn,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!(name, %err, "session listener failed");
                return;
            }
        };
        if stop.load(Ordering::SeqCst) {
            return;
        }

        let wakes = wakes.clone();
        let reader_name = name.to_string();
        let spawned = thread::Builder::new()
            .name("wakeguard-wake-reader".to_string())
            .spawn(move || match WakeMessage::read_from(conn) {
                Ok(Some(message)) => {
                    // The owner may already be gone.
                    let _ = wakes.send(message);
                }
                Ok(None) => tracing::debug!(name = %reader_name, "ignoring connection without a wake message"),
                Err(err) => tracing::debug!(name = %reader_name, %err, "ignoring unreadable connection"),
            });
        if let Err(err) = spawned {
            tracing::warn!(name, %err, "dropping connection, no reader thread");
        }
    }
}

/// Set the named signal owned by another process.
///
/// Fire-and-forget: returns once the message is delivered, without waiting
/// for the owner to react.
pub fn signal(name: &str) -> Result<(), SignalError> {
    send_wake(name, WakeReason::External)
}

pub(crate) fn send_wake(name: &str, reason: WakeReason) -> Result<(), SignalError> {
    let ns_name = name
        .to_ns_name::<GenericNamespaced>()
        .map_err(|source| SignalError::SendFailed {
            name: name.to_string(),
            source,
        })?;
    let conn = Stream::connect(ns_name).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::ConnectionRefused => SignalError::SignalNotFound {
            name: name.to_string(),
        },
        _ => SignalError::SendFailed {
            name: name.to_string(),
            source,
        },
    })?;
    WakeMessage::end(reason)
        .write_to(conn)
        .map_err(|source| SignalError::SendFailed {
            name: name.to_string(),
            source,
        })?;
    tracing::debug!(name, ?reason, "wake message sent");
    Ok(())
}
