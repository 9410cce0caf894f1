//! Dedicated dispatch thread
//!
//! Inbound events are funneled through a bounded channel into one OS thread
//! that runs [`Dispatcher::handle`] for each in arrival order. A dispatch
//! always runs to completion before the next begins; callers get the outcome
//! back through a oneshot.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::WorkerConfig;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::message::InboundEvent;
use crate::{PushError, Result};

type Reply = oneshot::Sender<Result<DispatchOutcome>>;

enum Job {
    Dispatch { event: InboundEvent, reply: Reply },
    Shutdown,
}

// ----------------------------------------------------------------------------
// Dispatch Handle
// ----------------------------------------------------------------------------

/// Cloneable submission side of a [`DispatchWorker`]
#[derive(Clone)]
pub struct DispatchHandle {
    sender: mpsc::Sender<Job>,
}

impl DispatchHandle {
    /// Queue an event and wait for its dispatch outcome
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .send(Job::Dispatch { event, reply })
            .await
            .map_err(|_| PushError::channel_error("dispatch worker stopped"))?;
        outcome
            .await
            .map_err(|_| PushError::channel_error("dispatch worker dropped reply"))?
    }

    /// Blocking variant for callers outside an async runtime
    pub fn blocking_dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome> {
        let (reply, outcome) = oneshot::channel();
        self.sender
            .blocking_send(Job::Dispatch { event, reply })
            .map_err(|_| PushError::channel_error("dispatch worker stopped"))?;
        outcome
            .blocking_recv()
            .map_err(|_| PushError::channel_error("dispatch worker dropped reply"))?
    }
}

// ----------------------------------------------------------------------------
// Dispatch Worker
// ----------------------------------------------------------------------------

/// Owns the dispatch thread
pub struct DispatchWorker {
    handle: DispatchHandle,
    thread: Option<JoinHandle<()>>,
}

impl DispatchWorker {
    /// Start the dispatch thread
    pub fn spawn(dispatcher: Arc<Dispatcher>, config: &WorkerConfig) -> Result<Self> {
        if config.queue_capacity == 0 {
            return Err(PushError::config_error(
                "worker queue_capacity must be greater than zero",
            ));
        }

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let thread = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run(dispatcher, receiver))
            .map_err(|e| PushError::channel_error(format!("failed to spawn dispatch thread: {}", e)))?;

        Ok(Self {
            handle: DispatchHandle { sender },
            thread: Some(thread),
        })
    }

    /// Submission handle; may be cloned freely
    pub fn handle(&self) -> DispatchHandle {
        self.handle.clone()
    }

    /// Queue an event and wait for its dispatch outcome
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome> {
        self.handle.dispatch(event).await
    }

    /// Finish already-queued events, then stop the thread
    pub async fn shutdown(mut self) -> Result<()> {
        self.handle
            .sender
            .send(Job::Shutdown)
            .await
            .map_err(|_| PushError::channel_error("dispatch worker already stopped"))?;

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .map_err(|e| PushError::channel_error(format!("join task failed: {}", e)))?
                .map_err(|_| PushError::channel_error("dispatch thread panicked"))?;
        }
        Ok(())
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        if self.thread.is_some() && self.handle.sender.try_send(Job::Shutdown).is_err() {
            warn!("Dispatch worker dropped with a full queue; thread exits when handles close");
        }
    }
}

fn run(dispatcher: Arc<Dispatcher>, mut receiver: mpsc::Receiver<Job>) {
    info!("Dispatch worker starting");

    while let Some(job) = receiver.blocking_recv() {
        match job {
            Job::Dispatch { event, reply } => {
                let result = dispatcher.handle(&event);
                if let Err(e) = &result {
                    warn!(error = %e, "Dispatch failed");
                }
                if reply.send(result).is_err() {
                    debug!("Dispatch caller went away before the outcome was ready");
                }
            }
            Job::Shutdown => break,
        }
    }

    info!("Dispatch worker stopped");
}
