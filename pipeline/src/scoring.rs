use core::time::Duration;
use std::collections::HashMap;

use anyhow::{ensure, Error as AnyhowError, Result};
use chain_state::WindowSnapshot;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use types::{
    bitlist::AttestationBitlist,
    consts::ATTESTATION_WINDOW,
    containers::Proposal,
    phase::Phase,
    primitives::{CommitteeIndex, Slot, ValidatorIndex},
};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("{phase} blocks have no scoring rule")]
    Unsupported { phase: Phase },
    #[error(transparent)]
    Failed(#[from] AnyhowError),
}

/// Computes a score for a proposal from the chain state window it is proposed on top of.
pub trait Scorer: Send + Sync {
    fn score(
        &self,
        proposal: &Proposal,
        window: &WindowSnapshot<'_>,
    ) -> Result<BlockScore, ScoringError>;
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Deserialize, Serialize)]
pub struct BlockScore {
    pub attestation_count: u64,
    pub new_votes: u64,
    pub duplicate_votes: u64,
    pub correct_head_votes: u64,
    pub out_of_window_attestations: u64,
    pub score: u64,
}

/// Everything recorded about one scored proposal.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize, Serialize)]
pub struct BlockMetrics {
    pub label: String,
    pub slot: Slot,
    pub phase: Phase,
    pub proposer_index: ValidatorIndex,
    #[serde(with = "duration_millis")]
    pub proposal_time: Duration,
    #[serde(flatten)]
    pub score: BlockScore,
}

/// Rewards attestation votes that are not on chain yet, doubling those that vote for the correct
/// head.
#[derive(Clone, Copy, Default, Debug)]
pub struct AttestationScorer;

impl Scorer for AttestationScorer {
    fn score(
        &self,
        proposal: &Proposal,
        window: &WindowSnapshot<'_>,
    ) -> Result<BlockScore, ScoringError> {
        if !proposal.phase.has_single_committee_attestations() {
            return Err(ScoringError::Unsupported {
                phase: proposal.phase.clone(),
            });
        }

        Ok(count_votes(proposal, window)?)
    }
}

fn count_votes(proposal: &Proposal, window: &WindowSnapshot<'_>) -> Result<BlockScore> {
    let slot = window.current_slot();
    let earliest_slot = slot.saturating_sub(ATTESTATION_WINDOW - 1);

    let mut score = BlockScore::default();

    // Aggregates in the same block may overlap. Votes counted once are duplicates afterwards.
    let mut included = HashMap::<(Slot, CommitteeIndex), AttestationBitlist>::new();

    for attestation in proposal.attestations() {
        let data = attestation.data;
        let bits = &attestation.aggregation_bits;

        score.attestation_count += 1;

        if !(earliest_slot..=slot).contains(&data.slot) {
            score.out_of_window_attestations += 1;
            continue;
        }

        let on_chain = window.attestation_bits(data.slot, data.index);

        if let Some(on_chain) = on_chain {
            ensure!(
                on_chain.len() == bits.len(),
                "aggregation bits for slot {} committee {} have length {} \
                 but {} bits were recorded on chain",
                data.slot,
                data.index,
                bits.len(),
                on_chain.len(),
            );
        }

        let seen = included
            .entry((data.slot, data.index))
            .or_insert_with(|| AttestationBitlist::with_len(bits.len()));

        let is_correct_head = window.canonical_root_at(data.slot) == Some(data.beacon_block_root);

        for index in bits.iter_ones() {
            if seen.get(index) || on_chain.is_some_and(|on_chain| on_chain.get(index)) {
                score.duplicate_votes += 1;
                continue;
            }

            seen.set(index);
            score.new_votes += 1;

            if is_correct_head {
                score.correct_head_votes += 1;
            }
        }
    }

    score.score = 2 * score.correct_head_votes + (score.new_votes - score.correct_head_votes);

    Ok(score)
}

mod duration_millis {
    use core::time::Duration;

    use serde::{Deserialize as _, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use chain_state::ChainStateStore;
    use serde_json::json;
    use test_case::test_case;
    use types::primitives::H256;

    use crate::test_utils::{attestation, proposal};

    use super::*;

    fn store_with_history() -> ChainStateStore {
        let mut store = ChainStateStore::new();

        store.record_block_root(98, H256::repeat_byte(98));
        store.record_block_root(99, H256::repeat_byte(99));
        store.record_attestation(99, 0, &AttestationBitlist::from_bools([true, false, false, false]));

        store
    }

    #[test]
    fn counts_new_duplicate_and_head_votes() -> Result<(), ScoringError> {
        let store = store_with_history();

        let proposal = proposal(
            100,
            Phase::Deneb,
            vec![
                // One vote already on chain, two new ones for the correct head.
                attestation(99, 0, [true, true, true, false], H256::repeat_byte(99)),
                // A new vote for a stale head.
                attestation(99, 1, [false, false, true, false], H256::repeat_byte(1)),
                // Overlaps with the first aggregate.
                attestation(99, 0, [false, true, false, true], H256::repeat_byte(99)),
            ],
        );

        let score = AttestationScorer.score(&proposal, &store.snapshot_window(100))?;

        assert_eq!(
            score,
            BlockScore {
                attestation_count: 3,
                new_votes: 4,
                duplicate_votes: 2,
                correct_head_votes: 3,
                out_of_window_attestations: 0,
                score: 7,
            },
        );

        Ok(())
    }

    #[test]
    fn empty_slot_votes_for_previous_block() -> Result<(), ScoringError> {
        let store = store_with_history();

        let proposal = proposal(
            101,
            Phase::Capella,
            vec![attestation(100, 0, [true, true], H256::repeat_byte(99))],
        );

        let score = AttestationScorer.score(&proposal, &store.snapshot_window(101))?;

        assert_eq!(score.correct_head_votes, 2);
        assert_eq!(score.score, 4);

        Ok(())
    }

    #[test_case(67; "before window")]
    #[test_case(101; "after proposal slot")]
    fn attestations_outside_window_are_not_scored(attested_slot: Slot) -> Result<(), ScoringError> {
        let store = store_with_history();

        let proposal = proposal(
            100,
            Phase::Bellatrix,
            vec![attestation(attested_slot, 0, [true], H256::zero())],
        );

        let score = AttestationScorer.score(&proposal, &store.snapshot_window(100))?;

        assert_eq!(score.out_of_window_attestations, 1);
        assert_eq!(score.new_votes, 0);

        Ok(())
    }

    #[test_case(Phase::Electra)]
    #[test_case(Phase::Fulu)]
    #[test_case(Phase::Gloas)]
    #[test_case(Phase::Unknown("heze".to_owned()); "unknown fork")]
    fn phases_after_deneb_are_unsupported(phase: Phase) {
        let store = ChainStateStore::new();
        let proposal = proposal(100, phase.clone(), vec![]);

        assert!(matches!(
            AttestationScorer.score(&proposal, &store.snapshot_window(100)),
            Err(ScoringError::Unsupported { phase: unsupported }) if unsupported == phase,
        ));
    }

    #[test]
    fn bitlist_length_mismatch_fails() {
        let store = store_with_history();

        let proposal = proposal(
            100,
            Phase::Deneb,
            vec![attestation(99, 0, [true, true], H256::repeat_byte(99))],
        );

        assert!(matches!(
            AttestationScorer.score(&proposal, &store.snapshot_window(100)),
            Err(ScoringError::Failed(_)),
        ));
    }

    #[test]
    fn block_metrics_serialize_flat() -> Result<(), serde_json::Error> {
        let metrics = BlockMetrics {
            label: "lh".to_owned(),
            slot: 100,
            phase: Phase::Deneb,
            proposer_index: 7,
            proposal_time: Duration::from_millis(1250),
            score: BlockScore {
                attestation_count: 1,
                new_votes: 2,
                duplicate_votes: 0,
                correct_head_votes: 2,
                out_of_window_attestations: 0,
                score: 4,
            },
        };

        let value = serde_json::to_value(&metrics)?;

        assert_eq!(
            value,
            json!({
                "label": "lh",
                "slot": 100,
                "phase": "deneb",
                "proposer_index": 7,
                "proposal_time": 1250,
                "attestation_count": 1,
                "new_votes": 2,
                "duplicate_votes": 0,
                "correct_head_votes": 2,
                "out_of_window_attestations": 0,
                "score": 4,
            }),
        );

        assert_eq!(serde_json::from_value::<BlockMetrics>(value)?, metrics);

        Ok(())
    }
}
