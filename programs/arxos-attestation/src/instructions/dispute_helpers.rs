//! Shared dispute logic: opening, sealed votes, reveals and tallying.

use crate::errors::AttestationError;
use crate::events::dispute_outcome;
use crate::instructions::constants::{REASON_HASH_DOMAIN, VOTE_COMMIT_DOMAIN};
use crate::state::{ContributionRecord, Dispute, DisputeStatus, Ruling, VoteCommitment};
use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;

/// sha256(domain, contribution_key, voter, vote, salt)
///
/// Binding the voter means one validator's commitment cannot be copied and
/// revealed by another.
pub fn vote_commitment(
    contribution_key: &[u8; 32],
    voter: &Pubkey,
    vote_valid: bool,
    salt: &[u8; 32],
) -> [u8; 32] {
    hashv(&[
        VOTE_COMMIT_DOMAIN,
        contribution_key.as_ref(),
        voter.as_ref(),
        &[vote_valid as u8],
        salt.as_ref(),
    ])
    .to_bytes()
}

pub fn reason_hash(reason: &str) -> [u8; 32] {
    hashv(&[REASON_HASH_DOMAIN, reason.as_bytes()]).to_bytes()
}

/// Inputs for [`open_dispute`]
pub struct DisputeOpening {
    pub contribution: Pubkey,
    pub challenger: Pubkey,
    pub challenger_token_account: Pubkey,
    pub bond_amount: u64,
    pub reason_hash: [u8; 32],
    pub commit_period: i64,
    pub reveal_period: i64,
    pub bump: u8,
}

/// Open the single bonded dispute a record can have and mark the record.
pub fn open_dispute(
    dispute: &mut Dispute,
    record: &mut ContributionRecord,
    opening: DisputeOpening,
    now: i64,
) -> Result<()> {
    require!(
        !record.is_terminal(),
        AttestationError::ContributionAlreadySettled
    );
    if dispute.opened_at != 0 {
        return if dispute.status == DisputeStatus::Open {
            Err(error!(AttestationError::DisputeAlreadyOpen))
        } else {
            Err(error!(AttestationError::DisputeAlreadyResolved))
        };
    }
    require!(
        !record.dispute_upheld,
        AttestationError::DisputeAlreadyResolved
    );

    let commit_deadline = now
        .checked_add(opening.commit_period)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    let reveal_deadline = commit_deadline
        .checked_add(opening.reveal_period)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    dispute.contribution = opening.contribution;
    dispute.contribution_key = record.contribution_key;
    dispute.challenger = opening.challenger;
    dispute.challenger_token_account = opening.challenger_token_account;
    dispute.bond_amount = opening.bond_amount;
    dispute.reason_hash = opening.reason_hash;
    dispute.status = DisputeStatus::Open;
    dispute.ruling = Ruling::Unresolved;
    dispute.opened_at = now;
    dispute.commit_deadline = commit_deadline;
    dispute.reveal_deadline = reveal_deadline;
    dispute.bump = opening.bump;

    record.dispute_open = true;
    Ok(())
}

/// Store a sealed vote. The challenger and the record's confirmers are
/// excluded from voting.
#[allow(clippy::too_many_arguments)]
pub fn record_commit(
    dispute: &mut Dispute,
    vote: &mut VoteCommitment,
    record: &ContributionRecord,
    dispute_key: Pubkey,
    voter: Pubkey,
    commitment: [u8; 32],
    now: i64,
    bump: u8,
) -> Result<()> {
    require!(dispute.is_open(), AttestationError::DisputeAlreadyResolved);
    require!(
        voter != dispute.challenger && !record.is_confirmed_by(&voter),
        AttestationError::VoterIsParticipant
    );
    require!(vote.committed_at == 0, AttestationError::AlreadyCommitted);
    require!(
        now < dispute.commit_deadline,
        AttestationError::CommitWindowClosed
    );
    require!(
        commitment != [0u8; 32],
        AttestationError::InvalidCommitment
    );

    dispute.commit_count = dispute
        .commit_count
        .checked_add(1)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    vote.dispute = dispute_key;
    vote.voter = voter;
    vote.commitment = commitment;
    vote.committed_at = now;
    vote.bump = bump;
    Ok(())
}

/// Open a sealed vote and add it to the tally.
///
/// Participation is checked again: a voter who confirmed the record after
/// committing has become a participant.
pub fn record_reveal(
    dispute: &mut Dispute,
    vote: &mut VoteCommitment,
    record: &ContributionRecord,
    vote_valid: bool,
    salt: &[u8; 32],
    now: i64,
) -> Result<()> {
    require!(dispute.is_open(), AttestationError::DisputeAlreadyResolved);
    require!(
        !record.is_confirmed_by(&vote.voter),
        AttestationError::VoterIsParticipant
    );
    require!(!vote.revealed, AttestationError::AlreadyRevealed);
    require!(
        now >= dispute.commit_deadline,
        AttestationError::RevealWindowNotOpen
    );
    require!(
        now < dispute.reveal_deadline,
        AttestationError::RevealWindowClosed
    );
    require!(
        vote_commitment(&dispute.contribution_key, &vote.voter, vote_valid, salt)
            == vote.commitment,
        AttestationError::CommitmentMismatch
    );

    let tally = if vote_valid {
        &mut dispute.valid_votes
    } else {
        &mut dispute.invalid_votes
    };
    *tally = tally
        .checked_add(1)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    dispute.reveal_count = dispute
        .reveal_count
        .checked_add(1)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    vote.revealed = true;
    vote.vote_valid = vote_valid;
    vote.revealed_at = now;
    Ok(())
}

/// Ruling and outcome code from revealed votes.
///
/// Only a strict Invalid majority overturns. Ties and zero reveals leave the
/// attestation standing.
pub fn tally_ruling(valid_votes: u16, invalid_votes: u16) -> (Ruling, u8) {
    if valid_votes == 0 && invalid_votes == 0 {
        (Ruling::Upheld, dispute_outcome::NO_REVEAL_DEFAULT)
    } else if invalid_votes > valid_votes {
        (Ruling::Overturned, dispute_outcome::OVERTURNED)
    } else if valid_votes > invalid_votes {
        (Ruling::Upheld, dispute_outcome::UPHELD)
    } else {
        (Ruling::Upheld, dispute_outcome::TIE_DEFAULT)
    }
}

/// Resolution is permitted once both windows have elapsed.
pub fn check_resolvable(dispute: &Dispute, now: i64) -> Result<()> {
    require!(dispute.is_open(), AttestationError::DisputeAlreadyResolved);
    require!(
        now >= dispute.reveal_deadline,
        AttestationError::DisputeWindowOpen
    );
    Ok(())
}

/// Seal the dispute and release the record back to the oracle. A ruling
/// supersedes any advisory flag.
pub fn close_dispute(
    dispute: &mut Dispute,
    record: &mut ContributionRecord,
    ruling: Ruling,
    now: i64,
) {
    dispute.status = DisputeStatus::Resolved;
    dispute.ruling = ruling;
    dispute.resolved_at = now;

    record.dispute_open = false;
    record.flagged = false;
    record.flagged_by = Pubkey::default();
    record.dispute_upheld = ruling == Ruling::Upheld;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::assert_error;

    const HOUR: i64 = 60 * 60;
    const T0: i64 = 1_700_000_000;

    fn open_fixture(now: i64) -> (Dispute, ContributionRecord) {
        let mut record = ContributionRecord {
            contribution_key: [3u8; 32],
            amount: 1_000,
            proposed_at: 1,
            ..ContributionRecord::default()
        };
        record.confirming_validators[0] = Pubkey::new_unique();
        record.confirmation_count = 1;

        let mut dispute = Dispute::default();
        open_dispute(
            &mut dispute,
            &mut record,
            DisputeOpening {
                contribution: Pubkey::new_unique(),
                challenger: Pubkey::new_unique(),
                challenger_token_account: Pubkey::new_unique(),
                bond_amount: 100,
                reason_hash: reason_hash("wrong floor"),
                commit_period: 24 * HOUR,
                reveal_period: 25 * HOUR,
                bump: 1,
            },
            now,
        )
        .unwrap();
        (dispute, record)
    }

    fn commit(
        dispute: &mut Dispute,
        record: &ContributionRecord,
        voter: Pubkey,
        vote_valid: bool,
        salt: [u8; 32],
        now: i64,
    ) -> Result<VoteCommitment> {
        let mut vote = VoteCommitment::default();
        let commitment = vote_commitment(&dispute.contribution_key, &voter, vote_valid, &salt);
        record_commit(
            dispute,
            &mut vote,
            record,
            Pubkey::new_unique(),
            voter,
            commitment,
            now,
            0,
        )?;
        Ok(vote)
    }

    #[test]
    fn test_open_sets_windows_and_marks_record() {
        let (dispute, record) = open_fixture(T0);
        assert!(dispute.is_open());
        assert_eq!(dispute.commit_deadline, T0 + 24 * HOUR);
        assert_eq!(dispute.reveal_deadline, T0 + 49 * HOUR);
        assert_eq!(dispute.contribution_key, record.contribution_key);
        assert!(record.has_unresolved_dispute());
    }

    #[test]
    fn test_second_dispute_rejected() {
        let (mut dispute, mut record) = open_fixture(T0);
        let opening = DisputeOpening {
            contribution: dispute.contribution,
            challenger: Pubkey::new_unique(),
            challenger_token_account: Pubkey::new_unique(),
            bond_amount: 100,
            reason_hash: [0u8; 32],
            commit_period: HOUR,
            reveal_period: HOUR,
            bump: 1,
        };
        assert_error(
            open_dispute(&mut dispute, &mut record, opening, T0 + 2_000),
            AttestationError::DisputeAlreadyOpen,
        );
    }

    #[test]
    fn test_dispute_on_settled_record_rejected() {
        let mut record = ContributionRecord {
            status: crate::state::ContributionStatus::Finalized,
            ..ContributionRecord::default()
        };
        let opening = DisputeOpening {
            contribution: Pubkey::new_unique(),
            challenger: Pubkey::new_unique(),
            challenger_token_account: Pubkey::new_unique(),
            bond_amount: 100,
            reason_hash: [0u8; 32],
            commit_period: HOUR,
            reveal_period: HOUR,
            bump: 1,
        };
        assert_error(
            open_dispute(&mut Dispute::default(), &mut record, opening, 5),
            AttestationError::ContributionAlreadySettled,
        );
    }

    #[test]
    fn test_commit_window_and_participants() {
        let (mut dispute, record) = open_fixture(T0);
        let voter = Pubkey::new_unique();

        assert!(commit(&mut dispute, &record, voter, true, [1u8; 32], T0 + 24 * HOUR - 1).is_ok());
        assert_eq!(dispute.commit_count, 1);

        assert_error(
            commit(&mut dispute, &record, Pubkey::new_unique(), true, [1u8; 32], T0 + 24 * HOUR),
            AttestationError::CommitWindowClosed,
        );
        let challenger = dispute.challenger;
        assert_error(
            commit(&mut dispute, &record, challenger, false, [1u8; 32], T0 + 10),
            AttestationError::VoterIsParticipant,
        );
        assert_error(
            commit(&mut dispute, &record, record.confirming_validators[0], true, [1u8; 32], T0 + 10),
            AttestationError::VoterIsParticipant,
        );
    }

    #[test]
    fn test_double_commit_rejected() {
        let (mut dispute, record) = open_fixture(T0);
        let voter = Pubkey::new_unique();
        let mut vote = commit(&mut dispute, &record, voter, true, [1u8; 32], T0 + 5).unwrap();
        assert_error(
            record_commit(
                &mut dispute,
                &mut vote,
                &record,
                Pubkey::new_unique(),
                voter,
                [9u8; 32],
                T0 + 6,
                0,
            ),
            AttestationError::AlreadyCommitted,
        );
    }

    #[test]
    fn test_reveal_integrity_and_windows() {
        let (mut dispute, record) = open_fixture(T0);
        let voter = Pubkey::new_unique();
        let salt = [42u8; 32];
        let mut vote = commit(&mut dispute, &record, voter, false, salt, T0 + 5).unwrap();

        assert_error(
            record_reveal(&mut dispute, &mut vote, &record, false, &salt, T0 + 24 * HOUR - 1),
            AttestationError::RevealWindowNotOpen,
        );
        assert_error(
            record_reveal(&mut dispute, &mut vote, &record, true, &salt, T0 + 24 * HOUR),
            AttestationError::CommitmentMismatch,
        );
        assert_error(
            record_reveal(&mut dispute, &mut vote, &record, false, &[43u8; 32], T0 + 24 * HOUR),
            AttestationError::CommitmentMismatch,
        );
        assert_error(
            record_reveal(&mut dispute, &mut vote, &record, false, &salt, T0 + 49 * HOUR),
            AttestationError::RevealWindowClosed,
        );

        record_reveal(&mut dispute, &mut vote, &record, false, &salt, T0 + 30 * HOUR).unwrap();
        assert_eq!(dispute.invalid_votes, 1);
        assert_eq!(dispute.reveal_count, 1);
        assert!(vote.revealed);

        assert_error(
            record_reveal(&mut dispute, &mut vote, &record, false, &salt, T0 + 31 * HOUR),
            AttestationError::AlreadyRevealed,
        );
    }

    #[test]
    fn test_voter_who_later_confirms_cannot_reveal() {
        let (mut dispute, mut record) = open_fixture(T0);
        let voter = Pubkey::new_unique();
        let salt = [7u8; 32];
        let mut vote = commit(&mut dispute, &record, voter, true, salt, T0 + 5).unwrap();

        record.confirming_validators[1] = voter;
        record.confirmation_count = 2;

        assert_error(
            record_reveal(&mut dispute, &mut vote, &record, true, &salt, T0 + 30 * HOUR),
            AttestationError::VoterIsParticipant,
        );
        assert_eq!(dispute.reveal_count, 0);
        assert!(!vote.revealed);
    }

    #[test]
    fn test_commitment_is_bound_to_voter() {
        let key = [5u8; 32];
        let salt = [6u8; 32];
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        assert_ne!(
            vote_commitment(&key, &a, true, &salt),
            vote_commitment(&key, &b, true, &salt)
        );
        assert_ne!(
            vote_commitment(&key, &a, true, &salt),
            vote_commitment(&key, &a, false, &salt)
        );
    }

    #[test]
    fn test_tally_rules() {
        assert_eq!(tally_ruling(3, 1), (Ruling::Upheld, dispute_outcome::UPHELD));
        assert_eq!(
            tally_ruling(1, 2),
            (Ruling::Overturned, dispute_outcome::OVERTURNED)
        );
        assert_eq!(
            tally_ruling(2, 2),
            (Ruling::Upheld, dispute_outcome::TIE_DEFAULT)
        );
        assert_eq!(
            tally_ruling(0, 0),
            (Ruling::Upheld, dispute_outcome::NO_REVEAL_DEFAULT)
        );
        assert_eq!(
            tally_ruling(0, 1),
            (Ruling::Overturned, dispute_outcome::OVERTURNED)
        );
    }

    #[test]
    fn test_resolution_timing_and_finality() {
        let (mut dispute, mut record) = open_fixture(T0);
        record.flagged = true;
        assert_error(
            check_resolvable(&dispute, T0 + 49 * HOUR - 1),
            AttestationError::DisputeWindowOpen,
        );
        assert!(check_resolvable(&dispute, T0 + 49 * HOUR).is_ok());

        close_dispute(&mut dispute, &mut record, Ruling::Upheld, T0 + 49 * HOUR);
        assert_eq!(dispute.status, DisputeStatus::Resolved);
        assert!(!record.has_unresolved_dispute());
        assert!(!record.flagged);
        assert!(record.dispute_upheld);

        assert_error(
            check_resolvable(&dispute, T0 + 50 * HOUR),
            AttestationError::DisputeAlreadyResolved,
        );
        let mut vote = VoteCommitment::default();
        assert_error(
            record_reveal(&mut dispute, &mut vote, &record, true, &[0u8; 32], T0 + 48 * HOUR),
            AttestationError::DisputeAlreadyResolved,
        );
    }
}
