use core::ops::{Deref, DerefMut};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use types::primitives::Slot;

use crate::{error::Error, Handoff};

/// Head update side of the gate.
pub struct HeadUpdateReceiver<T> {
    handoff_rx: mpsc::Receiver<Handoff<T>>,
}

impl<T> HeadUpdateReceiver<T> {
    pub(crate) const fn new(handoff_rx: mpsc::Receiver<Handoff<T>>) -> Self {
        Self { handoff_rx }
    }

    /// Waits for the next signal and completes the rendezvous.
    ///
    /// Returns `None` once the block processing side has been dropped. Cancel safe.
    pub async fn accept(&mut self) -> Option<HeadUpdateTurn<T>> {
        let Handoff {
            slot,
            value,
            accepted_tx,
            return_tx,
        } = self.handoff_rx.recv().await?;

        if accepted_tx.send(()).is_err() {
            debug!("signal after slot {slot} accepted after block processing stopped waiting");
        }

        Some(HeadUpdateTurn {
            slot,
            value,
            return_tx,
        })
    }
}

/// Exclusive access to the value between accepting a signal and completing the head update.
pub struct HeadUpdateTurn<T> {
    slot: Slot,
    value: T,
    return_tx: oneshot::Sender<T>,
}

impl<T> HeadUpdateTurn<T> {
    /// Slot whose processing triggered the signal.
    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.slot
    }

    /// Gives the value back to the block processing side.
    pub fn complete(self) -> Result<(), Error> {
        self.return_tx.send(self.value).map_err(|_| Error::Closed)
    }
}

impl<T> Deref for HeadUpdateTurn<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T> DerefMut for HeadUpdateTurn<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}
