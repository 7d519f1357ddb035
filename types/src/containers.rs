//! JSON representations of the Beacon Node API containers the scorer reads.
//!
//! Only the fields needed for scoring are modeled. Unknown fields are ignored so that the same
//! structures decode blocks from every fork.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::{
    bitlist::AttestationBitlist,
    phase::Phase,
    primitives::{CommitteeIndex, Slot, ValidatorIndex, H256, H64},
};

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Checkpoint {
    #[serde_as(as = "DisplayFromStr")]
    pub epoch: u64,
    pub root: H256,
}

#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct AttestationData {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "DisplayFromStr")]
    pub index: CommitteeIndex,
    pub beacon_block_root: H256,
    pub source: Checkpoint,
    pub target: Checkpoint,
}

#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct Attestation {
    pub aggregation_bits: AttestationBitlist,
    pub data: AttestationData,
    /// Present from Electra onwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committee_bits: Option<H64>,
}

#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize, Serialize)]
pub struct BeaconBlockBody {
    #[serde(default)]
    pub attestations: Vec<Attestation>,
}

#[serde_as]
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BeaconBlock {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
    #[serde_as(as = "DisplayFromStr")]
    pub proposer_index: ValidatorIndex,
    pub parent_root: H256,
    pub state_root: H256,
    pub body: BeaconBlockBody,
}

/// Unsigned block produced by a beacon node for a requested slot.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Proposal {
    pub phase: Phase,
    pub block: BeaconBlock,
}

impl Proposal {
    #[must_use]
    pub const fn slot(&self) -> Slot {
        self.block.slot
    }

    #[must_use]
    pub fn attestations(&self) -> &[Attestation] {
        &self.block.body.attestations
    }
}
