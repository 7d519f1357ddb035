use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use bitvec::{order::Lsb0, vec::BitVec};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BitlistError {
    #[error("bitlist is empty")]
    Empty,
    #[error("bitlist is missing the length delimiter bit")]
    MissingDelimiter,
    #[error("bitlist is missing the 0x prefix: {string:?}")]
    MissingPrefix { string: String },
    #[error(transparent)]
    Hex(#[from] hex::FromHexError),
}

/// Aggregation bits of an attestation, one bit per committee member.
///
/// Serialized as an SSZ `Bitlist` in `0x`-prefixed hex: bits are stored least significant bit
/// first and the list is terminated by a single delimiter bit that encodes its length.
#[derive(Clone, PartialEq, Eq, Default, Debug, DeserializeFromStr, SerializeDisplay)]
pub struct AttestationBitlist {
    bits: BitVec<u8, Lsb0>,
}

impl AttestationBitlist {
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self {
            bits: BitVec::repeat(false, len),
        }
    }

    #[must_use]
    pub fn from_bools(bools: impl IntoIterator<Item = bool>) -> Self {
        Self {
            bits: bools.into_iter().collect(),
        }
    }

    pub fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, BitlistError> {
        let last_byte = *bytes.last().ok_or(BitlistError::Empty)?;

        if last_byte == 0 {
            return Err(BitlistError::MissingDelimiter);
        }

        let mut bits = BitVec::<u8, Lsb0>::from_slice(bytes);
        let delimiter = bits.last_one().ok_or(BitlistError::MissingDelimiter)?;

        bits.truncate(delimiter);

        Ok(Self { bits })
    }

    #[must_use]
    pub fn to_ssz_bytes(&self) -> Vec<u8> {
        let mut bits = self.bits.clone();
        bits.push(true);
        bits.set_uninitialized(false);
        bits.into_vec()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).is_some_and(|bit| *bit)
    }

    /// Sets the bit at `index`, growing the list if needed.
    pub fn set(&mut self, index: usize) {
        if index >= self.bits.len() {
            self.bits.resize(index + 1, false);
        }

        self.bits.set(index, true);
    }

    #[must_use]
    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter_ones()
    }

    /// Sets every bit that is set in `other`. The result is as long as the longer operand.
    pub fn union_with(&mut self, other: &Self) {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), false);
        }

        for index in other.bits.iter_ones() {
            self.bits.set(index, true);
        }
    }
}

impl Display for AttestationBitlist {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        write!(formatter, "0x{}", hex::encode(self.to_ssz_bytes()))
    }
}

impl FromStr for AttestationBitlist {
    type Err = BitlistError;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let digits = string
            .strip_prefix("0x")
            .ok_or_else(|| BitlistError::MissingPrefix {
                string: string.to_owned(),
            })?;

        Self::from_ssz_bytes(&hex::decode(digits)?)
    }
}
