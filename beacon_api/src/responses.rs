use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr};
use types::{
    containers::{Attestation, BeaconBlock},
    phase::Phase,
    primitives::{Slot, UnixSeconds, H256},
};

#[derive(Deserialize)]
pub struct DataResponse<T> {
    pub data: T,
}

#[derive(Deserialize)]
pub struct VersionedResponse<T> {
    pub version: Phase,
    pub data: T,
}

/// Deneb and later forks wrap the block together with blobs and proofs.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ProducedBlock {
    Contents { block: BeaconBlock },
    Block(BeaconBlock),
}

impl ProducedBlock {
    pub fn into_block(self) -> BeaconBlock {
        match self {
            Self::Contents { block } | Self::Block(block) => block,
        }
    }
}

#[serde_as]
#[derive(Deserialize)]
pub struct Genesis {
    #[serde_as(as = "DisplayFromStr")]
    pub genesis_time: UnixSeconds,
}

#[derive(Deserialize)]
pub struct HeaderData {
    pub root: H256,
    pub header: SignedHeader,
}

#[derive(Deserialize)]
pub struct SignedHeader {
    pub message: HeaderMessage,
}

#[serde_as]
#[derive(Deserialize)]
pub struct HeaderMessage {
    #[serde_as(as = "DisplayFromStr")]
    pub slot: Slot,
}

#[derive(Deserialize)]
pub struct RootData {
    pub root: H256,
}

pub type BlockAttestations = Vec<Attestation>;
