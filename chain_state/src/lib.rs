pub use crate::{
    snapshot::WindowSnapshot,
    store::{AttestationHistory, BlockRootHistory, ChainStateStore},
};

mod snapshot;
mod store;
