use core::time::Duration;

use strum::{AsRefStr, Display};
use tokio::sync::{
    mpsc,
    oneshot::{self, error::TryRecvError},
};
use tracing::debug;
use types::primitives::Slot;

use crate::{error::Error, Handoff};

#[derive(Clone, Copy, PartialEq, Eq, Debug, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum GateState {
    AwaitingBlock,
    BlockInFlight,
    ReadyForHeadUpdate,
}

/// Block processing side of the gate.
pub struct HeadSyncGate<T> {
    state: GateState,
    value: Option<T>,
    pending_return: Option<oneshot::Receiver<T>>,
    handoff_tx: mpsc::Sender<Handoff<T>>,
    deadlock_timeout: Option<Duration>,
}

impl<T> HeadSyncGate<T> {
    pub(crate) const fn new(
        value: T,
        handoff_tx: mpsc::Sender<Handoff<T>>,
        deadlock_timeout: Option<Duration>,
    ) -> Self {
        Self {
            state: GateState::AwaitingBlock,
            value: Some(value),
            pending_return: None,
            handoff_tx,
            deadlock_timeout,
        }
    }

    pub fn state(&mut self) -> GateState {
        self.poll_return();
        self.state
    }

    /// Value currently held by the block processing side, if it has not been handed over.
    pub fn get(&mut self) -> Option<&T> {
        self.poll_return();
        self.value.as_ref()
    }

    #[must_use]
    pub const fn deadlock_timeout(&self) -> Option<Duration> {
        self.deadlock_timeout
    }

    /// Takes exclusive access to the value for processing one block.
    ///
    /// Waits for the head update side to complete its turn if the value is still handed over.
    /// Cancel safe: dropping the returned future keeps the pending handoff intact.
    pub async fn begin_block(&mut self) -> Result<&mut T, Error> {
        if self.state == GateState::ReadyForHeadUpdate {
            let return_rx = self.pending_return.as_mut().ok_or(Error::Closed)?;
            let value = return_rx.await.map_err(|_| Error::Closed)?;

            self.pending_return = None;
            self.value = Some(value);
            self.state = GateState::AwaitingBlock;
        }

        if self.state != GateState::AwaitingBlock {
            return Err(Error::UnexpectedState {
                expected: GateState::AwaitingBlock,
                actual: self.state,
            });
        }

        let value = self.value.as_mut().ok_or(Error::Closed)?;

        self.state = GateState::BlockInFlight;

        Ok(value)
    }

    /// Hands the value over to the head update side and waits until it has been accepted.
    ///
    /// Must be called exactly once after every successful [`HeadSyncGate::begin_block`].
    /// Returns [`Error::Deadlock`] if the configured timeout elapses first. The handoff stays
    /// queued in that case, so a late [`HeadUpdateReceiver::accept`] still returns the value.
    ///
    /// [`HeadUpdateReceiver::accept`]: crate::HeadUpdateReceiver::accept
    pub async fn signal(&mut self, slot: Slot) -> Result<(), Error> {
        if self.state != GateState::BlockInFlight {
            return Err(Error::UnexpectedState {
                expected: GateState::BlockInFlight,
                actual: self.state,
            });
        }

        let value = self.value.take().ok_or(Error::Closed)?;
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let (return_tx, return_rx) = oneshot::channel();

        self.state = GateState::ReadyForHeadUpdate;
        self.pending_return = Some(return_rx);

        let handoff = Handoff {
            slot,
            value,
            accepted_tx,
            return_tx,
        };

        let handoff_tx = &self.handoff_tx;

        let rendezvous = async move {
            handoff_tx
                .send(handoff)
                .await
                .map_err(|_| Error::Closed)?;

            accepted_rx.await.map_err(|_| Error::Closed)
        };

        debug!("handing chain state over to head update after slot {slot}");

        match self.deadlock_timeout {
            Some(timeout) => tokio::time::timeout(timeout, rendezvous)
                .await
                .map_err(|_| Error::Deadlock { slot, timeout })?,
            None => rendezvous.await,
        }
    }

    fn poll_return(&mut self) {
        let Some(return_rx) = self.pending_return.as_mut() else {
            return;
        };

        match return_rx.try_recv() {
            Ok(value) => {
                self.pending_return = None;
                self.value = Some(value);
                self.state = GateState::AwaitingBlock;
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use futures::FutureExt as _;
    use tokio::time::Instant;

    use crate::channel;

    use super::*;

    #[tokio::test]
    async fn state_alternates_between_block_and_head_update() -> Result<()> {
        let (mut gate, mut receiver) = channel(0_u64, None);

        assert_eq!(gate.state(), GateState::AwaitingBlock);

        *gate.begin_block().await? += 1;

        assert_eq!(gate.state(), GateState::BlockInFlight);

        let head_update = tokio::spawn(async move {
            let mut turn = receiver.accept().await?;
            *turn += 10;
            turn.complete().ok()?;
            Some(receiver)
        });

        gate.signal(1).await?;

        assert!(head_update.await?.is_some());

        let value = gate.begin_block().await?;

        assert_eq!(*value, 11);
        assert_eq!(gate.state(), GateState::BlockInFlight);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn signal_blocks_until_accepted() -> Result<()> {
        let (mut gate, mut receiver) = channel((), None);
        let accept_delay = Duration::from_secs(10);

        gate.begin_block().await?;

        tokio::spawn(async move {
            tokio::time::sleep(accept_delay).await;

            if let Some(turn) = receiver.accept().await {
                turn.complete().ok();
            }
        });

        let started_at = Instant::now();

        gate.signal(3).await?;

        assert!(started_at.elapsed() >= accept_delay);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn unaccepted_signal_is_reported_as_deadlock() -> Result<()> {
        let timeout = Duration::from_secs(24);
        let (mut gate, mut receiver) = channel(vec![1_u8], Some(timeout));

        gate.begin_block().await?;

        assert_eq!(gate.signal(7).await, Err(Error::Deadlock { slot: 7, timeout }));
        assert_eq!(gate.state(), GateState::ReadyForHeadUpdate);

        // The handoff was not dropped. A late head update still gets the value and returns it.
        let mut turn = receiver
            .accept()
            .await
            .ok_or_else(|| anyhow::anyhow!("handoff should still be queued"))?;

        assert_eq!(turn.slot(), 7);

        turn.push(2);
        turn.complete()?;

        assert_eq!(gate.state(), GateState::AwaitingBlock);
        assert_eq!(*gate.begin_block().await?, [1, 2]);

        Ok(())
    }

    #[tokio::test]
    async fn signal_fails_when_head_update_side_is_gone() -> Result<()> {
        let (mut gate, receiver) = channel((), None);

        drop(receiver);

        gate.begin_block().await?;

        assert_eq!(gate.signal(1).await, Err(Error::Closed));

        Ok(())
    }

    #[tokio::test]
    async fn signal_without_block_in_flight_is_rejected() {
        let (mut gate, _receiver) = channel((), None);

        assert_eq!(
            gate.signal(1).await,
            Err(Error::UnexpectedState {
                expected: GateState::BlockInFlight,
                actual: GateState::AwaitingBlock,
            }),
        );
    }

    #[tokio::test]
    async fn begin_block_twice_is_rejected() -> Result<()> {
        let (mut gate, _receiver) = channel((), None);

        gate.begin_block().await?;

        assert_eq!(
            gate.begin_block().await.err(),
            Some(Error::UnexpectedState {
                expected: GateState::AwaitingBlock,
                actual: GateState::BlockInFlight,
            }),
        );

        Ok(())
    }

    #[tokio::test]
    async fn begin_block_waits_for_head_update_to_complete() -> Result<()> {
        let (mut gate, mut receiver) = channel(String::new(), None);
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel::<()>();

        gate.begin_block().await?.push_str("block");

        let head_update = tokio::spawn(async move {
            let mut turn = receiver.accept().await?;
            accepted_tx.send(()).ok()?;
            release_rx.await.ok()?;
            turn.push_str("+head");
            turn.complete().ok()
        });

        gate.signal(1).await?;
        accepted_rx.await?;

        // The head update still holds the value, so the block side cannot proceed.
        assert!(gate.begin_block().now_or_never().is_none());
        assert_eq!(gate.state(), GateState::ReadyForHeadUpdate);

        release_tx
            .send(())
            .map_err(|()| anyhow::anyhow!("head update task stopped early"))?;

        assert_eq!(gate.begin_block().await?, "block+head");
        assert_eq!(head_update.await?, Some(()));

        Ok(())
    }
}
