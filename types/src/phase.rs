use serde_with::{DeserializeFromStr, SerializeDisplay};
use strum::{Display, EnumString};

/// Fork that a block belongs to, as reported in the `version` field of Beacon Node API responses.
///
/// Versions of forks not listed here parse as [`Phase::Unknown`].
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    Display,
    EnumString,
    DeserializeFromStr,
    SerializeDisplay,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Phase {
    Phase0,
    Altair,
    Bellatrix,
    Capella,
    Deneb,
    Electra,
    Fulu,
    Gloas,
    #[strum(default)]
    Unknown(String),
}

impl Phase {
    /// Whether attestations aggregate within a single committee, as they did up to Deneb.
    #[must_use]
    pub const fn has_single_committee_attestations(&self) -> bool {
        matches!(
            self,
            Self::Phase0 | Self::Altair | Self::Bellatrix | Self::Capella | Self::Deneb,
        )
    }
}
