//! Shared contribution logic.
//!
//! Used by `attest_contribution`, `flag_contribution`, `clear_flag`,
//! `finalize_contribution` and `resolve_dispute`: key and digest derivation,
//! proof binding, confirmation bookkeeping, finalization gating and the
//! payout split.

use crate::errors::AttestationError;
use crate::instructions::constants::{
    BUILDING_SHARE_PERCENT, CONTRIBUTION_KEY_DOMAIN, MAINTAINER_SHARE_PERCENT, PERCENT_BASE,
    PROOF_DIGEST_DOMAIN, PROOF_MESSAGE_DOMAIN, WORKER_SHARE_PERCENT,
};
use crate::state::{ContributionRecord, ContributionStatus, MAX_CONFIRMERS};
use crate::utils::ed25519::SIGNATURE_LEN;
use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

/// Evidence a worker signs for one captured contribution.
///
/// Distinct validators may bring distinct captures of the same logical
/// claim; each capture is verified and consumed on its own.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContributionProof {
    pub building_id: [u8; 32],
    pub worker: Pubkey,
    pub amount: u64,
    /// Hash of the off-chain evidence bundle
    pub evidence_hash: [u8; 32],
    /// Unix time the evidence was captured
    pub captured_at: i64,
    /// Distinguishes captures with otherwise identical fields
    pub nonce: u64,
}

impl ContributionProof {
    /// Exact bytes the worker signs. Binding the program id keeps a signature
    /// from being replayed against another deployment.
    pub fn message(&self, program_id: &Pubkey) -> Vec<u8> {
        let mut message = Vec::with_capacity(PROOF_MESSAGE_DOMAIN.len() + 32 * 4 + 8 * 3);
        message.extend_from_slice(PROOF_MESSAGE_DOMAIN);
        message.extend_from_slice(program_id.as_ref());
        message.extend_from_slice(&self.building_id);
        message.extend_from_slice(self.worker.as_ref());
        message.extend_from_slice(&self.amount.to_le_bytes());
        message.extend_from_slice(&self.evidence_hash);
        message.extend_from_slice(&self.captured_at.to_le_bytes());
        message.extend_from_slice(&self.nonce.to_le_bytes());
        message
    }
}

/// Record key: sha256(domain, building_id, worker, amount_le)
pub fn contribution_key(building_id: &[u8; 32], worker: &Pubkey, amount: u64) -> [u8; 32] {
    hashv(&[
        CONTRIBUTION_KEY_DOMAIN,
        building_id.as_ref(),
        worker.as_ref(),
        amount.to_le_bytes().as_ref(),
    ])
    .to_bytes()
}

/// Replay digest: sha256(domain, signed message, signature)
pub fn proof_digest(message: &[u8], signature: &[u8; SIGNATURE_LEN]) -> [u8; 32] {
    hashv(&[PROOF_DIGEST_DOMAIN, message, signature.as_ref()]).to_bytes()
}

/// The proof must describe exactly the contribution being attested.
pub fn validate_proof_binding(
    proof: &ContributionProof,
    building_id: &[u8; 32],
    worker: &Pubkey,
    amount: u64,
    now: i64,
) -> Result<()> {
    require!(
        proof.building_id == *building_id && proof.worker == *worker && proof.amount == amount,
        AttestationError::ProofFieldMismatch
    );
    require!(
        proof.evidence_hash != [0u8; 32],
        AttestationError::InvalidEvidenceHash
    );
    require!(proof.captured_at <= now, AttestationError::ProofFromFuture);
    Ok(())
}

/// Populate a freshly created record. The building wallet is snapshotted here
/// and never changes afterwards.
#[allow(clippy::too_many_arguments)]
pub fn initialize_record(
    record: &mut ContributionRecord,
    key: [u8; 32],
    building_id: [u8; 32],
    worker: Pubkey,
    building_wallet: Pubkey,
    amount: u64,
    now: i64,
    bump: u8,
) {
    record.contribution_key = key;
    record.building_id = building_id;
    record.worker = worker;
    record.building_wallet = building_wallet;
    record.amount = amount;
    record.status = ContributionStatus::Proposed;
    record.proposed_at = now;
    record.bump = bump;
}

/// Add a distinct confirming validator. Returns the new confirmation count.
pub fn add_confirmation(record: &mut ContributionRecord, validator: Pubkey) -> Result<u8> {
    require!(
        !record.is_terminal(),
        AttestationError::ContributionAlreadySettled
    );
    require!(
        !record.is_confirmed_by(&validator),
        AttestationError::AlreadyConfirmed
    );
    let index = record.confirmation_count as usize;
    require!(
        index < MAX_CONFIRMERS,
        AttestationError::ConfirmationLimitReached
    );

    record.confirming_validators[index] = validator;
    record.confirmation_count += 1;
    Ok(record.confirmation_count)
}

/// Finalization gate, checked in this order: state, delay, quorum, disputes.
pub fn check_finalizable(
    record: &ContributionRecord,
    now: i64,
    min_confirmations: u8,
    finalization_delay: i64,
) -> Result<()> {
    require!(
        !record.is_terminal(),
        AttestationError::ContributionAlreadySettled
    );

    let elapsed = now
        .checked_sub(record.proposed_at)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    require!(
        elapsed >= finalization_delay,
        AttestationError::FinalizationDelayNotElapsed
    );

    require!(
        record.confirmation_count >= min_confirmations,
        AttestationError::InsufficientConfirmations
    );

    require!(!record.flagged, AttestationError::ContributionFlagged);
    require!(
        !record.has_unresolved_dispute(),
        AttestationError::ContributionDisputed
    );
    Ok(())
}

fn transition(record: &mut ContributionRecord, to: ContributionStatus, now: i64) -> Result<()> {
    require!(
        record.status.can_transition_to(to),
        AttestationError::ContributionAlreadySettled
    );
    record.status = to;
    record.settled_at = now;
    Ok(())
}

pub fn mark_finalized(record: &mut ContributionRecord, now: i64) -> Result<()> {
    transition(record, ContributionStatus::Finalized, now)
}

/// Terminal without payout.
pub fn mark_cancelled(record: &mut ContributionRecord, now: i64) -> Result<()> {
    transition(record, ContributionStatus::Cancelled, now)
}

/// Advisory flag; blocks finalize until cleared or superseded by a ruling.
pub fn apply_flag(record: &mut ContributionRecord, validator: Pubkey) -> Result<()> {
    require!(
        !record.is_terminal(),
        AttestationError::ContributionAlreadySettled
    );
    require!(
        !record.dispute_upheld,
        AttestationError::DisputeAlreadyResolved
    );
    require!(!record.flagged, AttestationError::AlreadyFlagged);
    record.flagged = true;
    record.flagged_by = validator;
    Ok(())
}

pub fn remove_flag(record: &mut ContributionRecord) -> Result<()> {
    require!(
        !record.is_terminal(),
        AttestationError::ContributionAlreadySettled
    );
    require!(record.flagged, AttestationError::NotFlagged);
    record.flagged = false;
    record.flagged_by = Pubkey::default();
    Ok(())
}

/// Four-way payout of a finalized contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSplit {
    pub worker: u64,
    pub building: u64,
    pub maintainer: u64,
    /// Nominal share plus every rounding remainder
    pub treasury: u64,
}

impl PayoutSplit {
    pub fn total(&self) -> Option<u64> {
        self.worker
            .checked_add(self.building)?
            .checked_add(self.maintainer)?
            .checked_add(self.treasury)
    }
}

fn percent_of(amount: u64, percent: u64) -> Result<u64> {
    let share = (amount as u128) * (percent as u128) / (PERCENT_BASE as u128);
    u64::try_from(share).map_err(|_| error!(AttestationError::ArithmeticOverflow))
}

/// 70 / 10 / 10 / 10 with the remainder to the treasury, so the four shares
/// always sum to `amount`.
pub fn calculate_payout_split(amount: u64) -> Result<PayoutSplit> {
    require!(amount > 0, AttestationError::InvalidAmount);

    let worker = percent_of(amount, WORKER_SHARE_PERCENT)?;
    let building = percent_of(amount, BUILDING_SHARE_PERCENT)?;
    let maintainer = percent_of(amount, MAINTAINER_SHARE_PERCENT)?;
    let treasury = amount
        .checked_sub(worker)
        .and_then(|rest| rest.checked_sub(building))
        .and_then(|rest| rest.checked_sub(maintainer))
        .ok_or(AttestationError::ArithmeticOverflow)?;

    Ok(PayoutSplit {
        worker,
        building,
        maintainer,
        treasury,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::assert_error;

    const DAY: i64 = 24 * 60 * 60;

    fn proposed(amount: u64, now: i64) -> ContributionRecord {
        let building_id = [7u8; 32];
        let worker = Pubkey::new_unique();
        let mut record = ContributionRecord::default();
        initialize_record(
            &mut record,
            contribution_key(&building_id, &worker, amount),
            building_id,
            worker,
            Pubkey::new_unique(),
            amount,
            now,
            255,
        );
        record
    }

    fn proof_for(record: &ContributionRecord) -> ContributionProof {
        ContributionProof {
            building_id: record.building_id,
            worker: record.worker,
            amount: record.amount,
            evidence_hash: [9u8; 32],
            captured_at: 1_000,
            nonce: 1,
        }
    }

    #[test]
    fn test_keys_are_sha256_of_concatenated_fields() {
        // FIPS 180-2 "abc" vector
        assert_eq!(
            hashv(&[b"a".as_ref(), b"bc".as_ref()]).to_bytes(),
            [
                0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d,
                0xae, 0x22, 0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10,
                0xff, 0x61, 0xf2, 0x00, 0x15, 0xad,
            ]
        );

        let building_id = [4u8; 32];
        let worker = Pubkey::new_unique();
        let mut preimage = CONTRIBUTION_KEY_DOMAIN.to_vec();
        preimage.extend_from_slice(&building_id);
        preimage.extend_from_slice(worker.as_ref());
        preimage.extend_from_slice(&500u64.to_le_bytes());
        assert_eq!(
            contribution_key(&building_id, &worker, 500),
            hashv(&[preimage.as_slice()]).to_bytes()
        );
        assert_ne!(
            contribution_key(&building_id, &worker, 500),
            contribution_key(&building_id, &worker, 501)
        );
    }

    mod payout_split_tests {
        use super::*;

        #[test]
        fn test_example_split() {
            let split = calculate_payout_split(1_000).unwrap();
            assert_eq!(
                split,
                PayoutSplit {
                    worker: 700,
                    building: 100,
                    maintainer: 100,
                    treasury: 100,
                }
            );
        }

        #[test]
        fn test_remainder_goes_to_treasury() {
            let split = calculate_payout_split(999).unwrap();
            assert_eq!(split.worker, 699);
            assert_eq!(split.building, 99);
            assert_eq!(split.maintainer, 99);
            assert_eq!(split.treasury, 102);
            assert_eq!(split.total(), Some(999));
        }

        #[test]
        fn test_tiny_amounts() {
            let one = calculate_payout_split(1).unwrap();
            assert_eq!((one.worker, one.building, one.maintainer, one.treasury), (0, 0, 0, 1));
            let nine = calculate_payout_split(9).unwrap();
            assert_eq!(nine.worker, 6);
            assert_eq!(nine.total(), Some(9));
        }

        #[test]
        fn test_max_amount_does_not_overflow() {
            let split = calculate_payout_split(u64::MAX).unwrap();
            assert_eq!(split.total(), Some(u64::MAX));
            assert_eq!(split.worker, ((u64::MAX as u128) * 70 / 100) as u64);
        }

        #[test]
        fn test_zero_amount_rejected() {
            assert_error(calculate_payout_split(0), AttestationError::InvalidAmount);
        }
    }

    #[test]
    fn test_contribution_key_binds_all_fields() {
        let building = [1u8; 32];
        let worker = Pubkey::new_unique();
        let base = contribution_key(&building, &worker, 1_000);
        assert_eq!(base, contribution_key(&building, &worker, 1_000));
        assert_ne!(base, contribution_key(&[2u8; 32], &worker, 1_000));
        assert_ne!(base, contribution_key(&building, &Pubkey::new_unique(), 1_000));
        assert_ne!(base, contribution_key(&building, &worker, 1_001));
    }

    #[test]
    fn test_message_is_domain_bound() {
        let record = proposed(1_000, 0);
        let proof = proof_for(&record);
        let program_a = Pubkey::new_unique();
        let program_b = Pubkey::new_unique();
        let message = proof.message(&program_a);
        assert!(message.starts_with(PROOF_MESSAGE_DOMAIN));
        assert_ne!(message, proof.message(&program_b));

        let mut other = proof;
        other.nonce = 2;
        assert_ne!(message, other.message(&program_a));
    }

    #[test]
    fn test_digest_covers_signature() {
        let message = b"payload".to_vec();
        let sig_a = [1u8; SIGNATURE_LEN];
        let sig_b = [2u8; SIGNATURE_LEN];
        assert_ne!(proof_digest(&message, &sig_a), proof_digest(&message, &sig_b));
        assert_eq!(proof_digest(&message, &sig_a), proof_digest(&message, &sig_a));
    }

    #[test]
    fn test_proof_binding() {
        let record = proposed(1_000, 0);
        let proof = proof_for(&record);
        let check = |p: &ContributionProof, now: i64| {
            validate_proof_binding(p, &record.building_id, &record.worker, record.amount, now)
        };

        assert!(check(&proof, 1_000).is_ok());
        assert_error(
            check(&ContributionProof { amount: 1, ..proof }, 1_000),
            AttestationError::ProofFieldMismatch,
        );
        assert_error(
            check(
                &ContributionProof {
                    worker: Pubkey::new_unique(),
                    ..proof
                },
                1_000,
            ),
            AttestationError::ProofFieldMismatch,
        );
        assert_error(
            check(
                &ContributionProof {
                    evidence_hash: [0u8; 32],
                    ..proof
                },
                1_000,
            ),
            AttestationError::InvalidEvidenceHash,
        );
        assert_error(check(&proof, 999), AttestationError::ProofFromFuture);
    }

    #[test]
    fn test_confirmations_are_distinct() {
        let mut record = proposed(1_000, 0);
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        assert_eq!(add_confirmation(&mut record, a).unwrap(), 1);
        assert_error(
            add_confirmation(&mut record, a),
            AttestationError::AlreadyConfirmed,
        );
        assert_eq!(add_confirmation(&mut record, b).unwrap(), 2);
        assert_eq!(record.confirmers(), &[a, b]);
    }

    #[test]
    fn test_confirmation_capacity() {
        let mut record = proposed(1_000, 0);
        for _ in 0..MAX_CONFIRMERS {
            add_confirmation(&mut record, Pubkey::new_unique()).unwrap();
        }
        assert_error(
            add_confirmation(&mut record, Pubkey::new_unique()),
            AttestationError::ConfirmationLimitReached,
        );
    }

    #[test]
    fn test_finalize_gating_order() {
        let mut record = proposed(1_000, 0);
        add_confirmation(&mut record, Pubkey::new_unique()).unwrap();

        assert_error(
            check_finalizable(&record, DAY - 1, 2, DAY),
            AttestationError::FinalizationDelayNotElapsed,
        );
        assert_error(
            check_finalizable(&record, DAY, 2, DAY),
            AttestationError::InsufficientConfirmations,
        );

        add_confirmation(&mut record, Pubkey::new_unique()).unwrap();
        assert!(check_finalizable(&record, DAY, 2, DAY).is_ok());

        record.flagged = true;
        assert_error(
            check_finalizable(&record, DAY, 2, DAY),
            AttestationError::ContributionFlagged,
        );
        record.flagged = false;
        record.dispute_open = true;
        assert_error(
            check_finalizable(&record, DAY, 2, DAY),
            AttestationError::ContributionDisputed,
        );
        record.dispute_open = false;

        mark_finalized(&mut record, DAY).unwrap();
        assert_error(
            check_finalizable(&record, 2 * DAY, 2, DAY),
            AttestationError::ContributionAlreadySettled,
        );
    }

    #[test]
    fn test_terminal_records_reject_mutation() {
        let mut record = proposed(1_000, 0);
        mark_cancelled(&mut record, 10).unwrap();
        assert_eq!(record.status, ContributionStatus::Cancelled);
        assert_eq!(record.settled_at, 10);

        assert_error(
            mark_finalized(&mut record, 11),
            AttestationError::ContributionAlreadySettled,
        );
        assert_error(
            mark_cancelled(&mut record, 11),
            AttestationError::ContributionAlreadySettled,
        );
        assert_error(
            add_confirmation(&mut record, Pubkey::new_unique()),
            AttestationError::ContributionAlreadySettled,
        );
        assert_error(
            apply_flag(&mut record, Pubkey::new_unique()),
            AttestationError::ContributionAlreadySettled,
        );
        assert_eq!(record.settled_at, 10);
    }

    #[test]
    fn test_flag_lifecycle() {
        let mut record = proposed(1_000, 0);
        let validator = Pubkey::new_unique();
        assert_error(remove_flag(&mut record), AttestationError::NotFlagged);

        apply_flag(&mut record, validator).unwrap();
        assert!(record.flagged);
        assert_eq!(record.flagged_by, validator);
        assert_error(
            apply_flag(&mut record, validator),
            AttestationError::AlreadyFlagged,
        );

        remove_flag(&mut record).unwrap();
        assert!(!record.flagged);

        record.dispute_upheld = true;
        assert_error(
            apply_flag(&mut record, validator),
            AttestationError::DisputeAlreadyResolved,
        );
    }
}
