use anyhow::Result;
use async_trait::async_trait;
use types::{
    containers::{Attestation, Proposal},
    primitives::{Slot, H256},
};

/// Source of block proposals for the proposal pipeline.
#[async_trait]
pub trait ChainDataClient: Send + Sync {
    /// Name of the endpoint, used to attribute errors and metrics.
    fn label(&self) -> &str;

    async fn fetch_proposal(&self, slot: Slot) -> Result<Proposal>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ChainHead {
    pub slot: Slot,
    pub root: H256,
}

/// Block occupying a slot of the canonical chain.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CanonicalBlock {
    pub root: H256,
    pub attestations: Vec<Attestation>,
}

/// Source of canonical chain data for the head update process.
#[async_trait]
pub trait HeadDataSource: Send + Sync {
    fn label(&self) -> &str;

    async fn head(&self) -> Result<ChainHead>;

    /// Returns `None` if no block was proposed in `slot`.
    async fn canonical_block(&self, slot: Slot) -> Result<Option<CanonicalBlock>>;
}
