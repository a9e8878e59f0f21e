//! Gesture dispatch and the momentary-gesture auto-reset.
//!
//! Each observed gesture is looked up in the [`CommandTable`] and its command
//! written to the [`Transport`]. Momentary gestures additionally arm a
//! one-shot reset that writes the neutral command after [`RESET_DELAY`].
//!
//! At most one reset is pending at a time. Arming a new one replaces the old:
//! the old task is aborted and its token invalidated, so a timer that already
//! woke up finds a stale token and does nothing. The transport and the pending
//! reset share one lock, which orders every write, so a neutral command can
//! never land after a newer momentary command. Writes themselves run on the
//! blocking pool while that lock is held; a slow controller delays the next
//! write, never the runtime.

use crate::table::CommandTable;
use crate::transport::{Transport, TransportError};
use crate::types::{Command, GestureLabel};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Delay between a momentary gesture and the automatic return to neutral.
pub const RESET_DELAY: Duration = Duration::from_secs(2);

/// What a single frame's gesture calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing detected, or nothing mapped.
    Skip,
    Send { command: Command, momentary: bool },
}

/// Pure per-frame decision: which command (if any) to send, and whether it
/// arms a reset.
pub fn decide(table: &CommandTable, label: Option<GestureLabel>) -> Decision {
    match label.and_then(|l| table.lookup(l)) {
        Some(binding) => Decision::Send {
            command: binding.command,
            momentary: binding.is_momentary(),
        },
        None => Decision::Skip,
    }
}

/// Result of dispatching one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    NoGesture,
    Unmapped(GestureLabel),
    Sent {
        label: GestureLabel,
        reset_armed: bool,
    },
    SendFailed(GestureLabel),
}

struct PendingReset {
    token: u64,
    deadline: Instant,
    task: JoinHandle<()>,
}

/// Transport plus reset state; everything that writes goes through here.
struct Session<T> {
    transport: Arc<StdMutex<T>>,
    pending: Option<PendingReset>,
    next_token: u64,
}

impl<T> Session<T> {
    fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                pending.task.abort();
                true
            }
            None => false,
        }
    }
}

/// Owns the transport and drives the reset state machine.
pub struct Dispatcher<T> {
    table: CommandTable,
    session: Arc<Mutex<Session<T>>>,
    reset_delay: Duration,
}

impl<T: Transport + 'static> Dispatcher<T> {
    pub fn new(table: CommandTable, transport: T) -> Self {
        Self {
            table,
            session: Arc::new(Mutex::new(Session {
                transport: Arc::new(StdMutex::new(transport)),
                pending: None,
                next_token: 0,
            })),
            reset_delay: RESET_DELAY,
        }
    }

    /// Handle one frame's top gesture (`None` when nothing was detected).
    ///
    /// Must be called from within a tokio runtime: arming a reset spawns a task.
    pub async fn on_gesture(&self, label: Option<GestureLabel>) -> Outcome {
        let Some(label) = label else {
            return Outcome::NoGesture;
        };
        tracing::debug!(gesture = %label, "detected gesture");

        let Decision::Send { command, momentary } = decide(&self.table, Some(label)) else {
            return Outcome::Unmapped(label);
        };

        let mut session = self.session.lock().await;
        if let Err(err) = send_blocking(&session.transport, command).await {
            tracing::warn!(gesture = %label, error = %err, "failed to send gesture command");
            return Outcome::SendFailed(label);
        }
        tracing::info!(gesture = %label, command = %command, "command sent");

        if momentary {
            self.arm(&mut session);
        }

        Outcome::Sent {
            label,
            reset_armed: momentary,
        }
    }

    /// Replace any pending reset with a fresh one `reset_delay` from now.
    fn arm(&self, session: &mut Session<T>) {
        if let Some(old) = session.pending.as_ref() {
            tracing::debug!(token = old.token, "replacing pending reset");
        }
        session.cancel_pending();

        let token = session.next_token;
        session.next_token += 1;
        let deadline = Instant::now() + self.reset_delay;

        let task = tokio::spawn(fire_reset(
            Arc::clone(&self.session),
            token,
            deadline,
            self.table.neutral(),
        ));

        session.pending = Some(PendingReset {
            token,
            deadline,
            task,
        });
    }

    /// Deadline of the armed reset, if one is pending.
    pub async fn pending_deadline(&self) -> Option<Instant> {
        self.session.lock().await.pending.as_ref().map(|p| p.deadline)
    }

    /// Cancel any pending reset without sending the neutral command.
    pub async fn shutdown(&self) {
        if self.session.lock().await.cancel_pending() {
            tracing::info!("pending reset cancelled");
        }
    }

    /// Dispatch observations until the sender closes, then cancel any
    /// pending reset.
    pub async fn run(&self, mut observations: mpsc::Receiver<Option<GestureLabel>>) {
        while let Some(label) = observations.recv().await {
            self.on_gesture(label).await;
        }
        tracing::info!("observation stream closed");
        self.shutdown().await;
    }
}

impl<T> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        if let Ok(mut session) = self.session.try_lock() {
            session.cancel_pending();
        }
    }
}

async fn fire_reset<T: Transport + 'static>(
    session: Arc<Mutex<Session<T>>>,
    token: u64,
    deadline: Instant,
    neutral: Command,
) {
    tokio::time::sleep_until(deadline).await;

    let mut session = session.lock().await;
    if session.pending.as_ref().map(|p| p.token) != Some(token) {
        tracing::debug!(token, "stale reset ignored");
        return;
    }
    // Leave the handle un-aborted: this task is the one running.
    session.pending = None;

    match send_blocking(&session.transport, neutral).await {
        Ok(()) => tracing::info!(command = %neutral, "neutral command sent"),
        Err(err) => tracing::warn!(error = %err, "failed to send neutral command"),
    }
}

/// Run one blocking `send` on the blocking pool.
///
/// Callers hold the session lock across the await, which keeps writes in
/// order even though each one happens off the runtime threads.
async fn send_blocking<T: Transport + 'static>(
    transport: &Arc<StdMutex<T>>,
    command: Command,
) -> Result<(), TransportError> {
    let transport = Arc::clone(transport);
    tokio::task::spawn_blocking(move || {
        let mut transport = transport.lock().unwrap_or_else(PoisonError::into_inner);
        transport.send(&command)
    })
    .await?
}
