//! Bounded outbound queue
//!
//! A per-session mpsc channel with an explicit close signal. Any holder of
//! the sending side can close the queue; the writer then drains what is
//! already buffered and sees the end of the stream.

use crate::protocol::Envelope;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Reasons an envelope could not be queued
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("outbound queue is full")]
    Full(Envelope),

    #[error("outbound queue is closed")]
    Closed(Envelope),
}

impl EnqueueError {
    /// Recover the envelope that was not queued
    pub fn into_inner(self) -> Envelope {
        match self {
            Self::Full(envelope) | Self::Closed(envelope) => envelope,
        }
    }
}

/// Create a queue holding at most `capacity` envelopes
pub fn outbound_queue(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let closed = CancellationToken::new();
    (
        OutboundSender {
            tx,
            closed: closed.clone(),
        },
        OutboundReceiver { rx, closed },
    )
}

/// Sending side of an outbound queue
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::Sender<Envelope>,
    closed: CancellationToken,
}

impl OutboundSender {
    /// Queue an envelope, waiting for capacity
    ///
    /// Resolves with `Closed` as soon as the queue is closed, even while
    /// waiting for room.
    pub async fn send(&self, envelope: Envelope) -> Result<(), EnqueueError> {
        if self.closed.is_cancelled() {
            return Err(EnqueueError::Closed(envelope));
        }

        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(EnqueueError::Closed(envelope)),
            permit = self.tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(envelope);
                    Ok(())
                }
                Err(_) => Err(EnqueueError::Closed(envelope)),
            },
        }
    }

    /// Queue an envelope without waiting
    pub fn try_send(&self, envelope: Envelope) -> Result<(), EnqueueError> {
        if self.closed.is_cancelled() {
            return Err(EnqueueError::Closed(envelope));
        }

        self.tx.try_send(envelope).map_err(|e| match e {
            mpsc::error::TrySendError::Full(envelope) => EnqueueError::Full(envelope),
            mpsc::error::TrySendError::Closed(envelope) => EnqueueError::Closed(envelope),
        })
    }

    /// Close the queue; idempotent
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }

    /// Envelopes currently buffered
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiving side of an outbound queue
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::Receiver<Envelope>,
    closed: CancellationToken,
}

impl OutboundReceiver {
    /// Next envelope, or `None` once the queue is closed and drained
    pub async fn recv(&mut self) -> Option<Envelope> {
        if !self.closed.is_cancelled() {
            tokio::select! {
                biased;
                envelope = self.rx.recv() => return envelope,
                () = self.closed.cancelled() => {}
            }
        }

        self.rx.close();
        self.rx.try_recv().ok()
    }

    /// Close the queue from the receiving side
    pub fn close(&mut self) {
        self.closed.cancel();
        self.rx.close();
    }
}
