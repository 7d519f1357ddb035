//! Rendezvous that hands chain state back and forth between block processing and head updates.
//!
//! The proposal pipeline owns the state through [`HeadSyncGate`] while it processes a slot.
//! [`HeadSyncGate::signal`] moves the state to the head update process and waits until that
//! process has accepted it with [`HeadUpdateReceiver::accept`]. The head update process mutates the
//! state through the returned [`HeadUpdateTurn`] and gives it back with
//! [`HeadUpdateTurn::complete`]. The next [`HeadSyncGate::begin_block`] waits for that.
//!
//! ```text
//! AwaitingBlock --begin_block--> BlockInFlight --signal--> ReadyForHeadUpdate
//!       ^                                                          |
//!       +---------------------- turn completed --------------------+
//! ```
//!
//! There is no lock. The state value is moved, so neither side can observe it while the other
//! one holds it.

use core::time::Duration;

use tokio::sync::{mpsc, oneshot};
use types::primitives::Slot;

pub use crate::{
    error::Error,
    gate::{GateState, HeadSyncGate},
    receiver::{HeadUpdateReceiver, HeadUpdateTurn},
};

mod error;
mod gate;
mod receiver;

/// Creates both sides of a gate, with `value` initially owned by the block processing side.
///
/// If `deadlock_timeout` is set, [`HeadSyncGate::signal`] fails with [`Error::Deadlock`] when the
/// head update side does not accept a signal in time.
#[must_use]
pub fn channel<T>(
    value: T,
    deadlock_timeout: Option<Duration>,
) -> (HeadSyncGate<T>, HeadUpdateReceiver<T>) {
    // Capacity 1 is enough because a new handoff is only sent after the previous one has come back.
    let (handoff_tx, handoff_rx) = mpsc::channel(1);

    let gate = HeadSyncGate::new(value, handoff_tx, deadlock_timeout);
    let receiver = HeadUpdateReceiver::new(handoff_rx);

    (gate, receiver)
}

struct Handoff<T> {
    slot: Slot,
    value: T,
    accepted_tx: oneshot::Sender<()>,
    return_tx: oneshot::Sender<T>,
}
