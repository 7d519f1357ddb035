use core::{num::NonZeroU64, time::Duration};

use anyhow::Result;
use thiserror::Error;
use types::{
    consts::GENESIS_SLOT,
    primitives::{Slot, UnixSeconds},
};

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub enum ClockError {
    #[error("slot {slot} starts too far in the future")]
    SlotStartOverflow { slot: Slot },
}

/// Maps wall clock time to slots of a chain with a fixed slot duration.
#[derive(Clone, Copy, Debug)]
pub struct SlotClock {
    genesis_time: UnixSeconds,
    seconds_per_slot: NonZeroU64,
}

impl SlotClock {
    #[must_use]
    pub const fn new(genesis_time: UnixSeconds, seconds_per_slot: NonZeroU64) -> Self {
        Self {
            genesis_time,
            seconds_per_slot,
        }
    }

    #[must_use]
    pub const fn slot_duration(self) -> Duration {
        Duration::from_secs(self.seconds_per_slot.get())
    }

    /// Slot in progress at `duration_since_unix_epoch`. Times before genesis map to slot 0.
    pub fn slot_at(self, duration_since_unix_epoch: Duration) -> Result<Slot> {
        // `Duration` does not implement `Div<Duration>`, so we have to do arithmetic on nanoseconds.
        let nanos_since_genesis = duration_since_unix_epoch
            .saturating_sub(Duration::from_secs(self.genesis_time))
            .as_nanos();

        let slots_since_genesis = nanos_since_genesis / self.slot_duration().as_nanos();

        Ok(GENESIS_SLOT + Slot::try_from(slots_since_genesis)?)
    }

    /// First slot that starts at or after `duration_since_unix_epoch`, and the time until it does.
    pub fn next_slot_start(self, duration_since_unix_epoch: Duration) -> Result<(Slot, Duration)> {
        let genesis = Duration::from_secs(self.genesis_time);

        if duration_since_unix_epoch <= genesis {
            return Ok((GENESIS_SLOT, genesis - duration_since_unix_epoch));
        }

        let current_slot = self.slot_at(duration_since_unix_epoch)?;
        let current_slot_start = self.slot_start(current_slot)?;

        if current_slot_start == duration_since_unix_epoch {
            return Ok((current_slot, Duration::ZERO));
        }

        let next_slot = current_slot + 1;
        let next_slot_start = self.slot_start(next_slot)?;

        Ok((next_slot, next_slot_start - duration_since_unix_epoch))
    }

    fn slot_start(self, slot: Slot) -> Result<Duration> {
        let start = self
            .seconds_per_slot
            .get()
            .checked_mul(slot - GENESIS_SLOT)
            .and_then(|seconds| seconds.checked_add(self.genesis_time))
            .ok_or(ClockError::SlotStartOverflow { slot })?;

        Ok(Duration::from_secs(start))
    }
}
