pub use ethereum_types::{H256, H64};

pub type Slot = u64;
pub type CommitteeIndex = u64;
pub type ValidatorIndex = u64;
pub type UnixSeconds = u64;
