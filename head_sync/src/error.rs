use core::time::Duration;

use thiserror::Error;
use types::primitives::Slot;

use crate::gate::GateState;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error(
        "head update side did not accept chain state handed over after slot {slot} \
         within {timeout:?}"
    )]
    Deadlock { slot: Slot, timeout: Duration },
    #[error("other side of head sync gate has been dropped")]
    Closed,
    #[error("head sync gate is in state {actual}, expected {expected}")]
    UnexpectedState {
        expected: GateState,
        actual: GateState,
    },
}
