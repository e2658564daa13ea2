//! Protocol invariant checking for fuzz testing
//!
//! The `check_*` functions test one property each on plain values.
//! [`check_state_transition`] runs all of them across a committed
//! simulated operation.

use std::collections::HashSet;

use anchor_lang::prelude::Pubkey;
use arxos_attestation::instructions::contribution_helpers::PayoutSplit;
use arxos_attestation::state::{
    ContributionRecord, ContributionStatus, Dispute, DisputeStatus, MAX_CONFIRMERS,
};

use crate::scenarios::ProtocolState;

/// Payout invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayoutInvariantResult {
    Valid,
    SharesDoNotSum { amount: u64, total: Option<u64> },
    /// A share is not the floor of its percentage
    ShareMismatch { share: &'static str, expected: u64, actual: u64 },
    /// Treasury kept more than its share plus the rounding slack
    RemainderTooLarge { remainder: u64 },
    MintedMismatch { minted: u64, finalized_value: u64 },
}

/// Contribution record invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordInvariantResult {
    Valid,
    InvalidStateTransition { from: u8, to: u8 },
    TerminalRecordModified { status: u8 },
    DuplicateConfirmer,
    ConfirmationsExceedMax { count: u8 },
    ConfirmationsDecreased { before: u8, after: u8 },
    SettledWithOpenDispute,
}

/// Replay protection invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayInvariantResult {
    Valid,
    ConsumedProofRemoved,
    ConsumedProofRewritten,
    /// Every confirmation is backed by exactly one consumed proof
    ConfirmationProofMismatch { confirmations: usize, consumed: usize },
}

/// Stake and bond custody invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustodyInvariantResult {
    Valid,
    StakeNotConserved { deposited: u64, accounted: u128 },
    StakeVaultMismatch { vault: u64, bonded: u128 },
    TotalStakedMismatch { total_staked: u64, bonded: u128 },
    BondNotConserved { posted: u64, accounted: u128 },
    BondVaultMismatch { vault: u64, open_bonds: u128 },
}

/// Dispute invariant results
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisputeInvariantResult {
    Valid,
    ResolvedDisputeModified,
    RevealsExceedCommits { commits: u16, reveals: u16 },
    TallyMismatch { reveals: u16, valid: u16, invalid: u16 },
    OpenFlagMismatch,
}

macro_rules! impl_is_valid {
    ($($ty:ty),*) => {
        $(impl $ty {
            pub fn is_valid(&self) -> bool {
                matches!(self, Self::Valid)
            }
        })*
    };
}

impl_is_valid!(
    PayoutInvariantResult,
    RecordInvariantResult,
    ReplayInvariantResult,
    CustodyInvariantResult,
    DisputeInvariantResult
);

// ============================================================================
// Payout invariants
// ============================================================================

/// The four shares sum to the amount; the worker, building and maintainer
/// shares are each the floor of their percentage; the treasury keeps at
/// most its floor plus three units of rounding.
pub fn check_payout_split(amount: u64, split: &PayoutSplit) -> PayoutInvariantResult {
    let total = split.total();
    if total != Some(amount) {
        return PayoutInvariantResult::SharesDoNotSum { amount, total };
    }

    let floor = |percent: u128| ((amount as u128) * percent / 100) as u64;
    for (share, actual, percent) in [
        ("worker", split.worker, 70),
        ("building", split.building, 10),
        ("maintainer", split.maintainer, 10),
    ] {
        if actual != floor(percent) {
            return PayoutInvariantResult::ShareMismatch {
                share,
                expected: floor(percent),
                actual,
            };
        }
    }

    let remainder = split.treasury.saturating_sub(floor(10));
    if split.treasury < floor(10) || remainder > 3 {
        return PayoutInvariantResult::RemainderTooLarge { remainder };
    }
    PayoutInvariantResult::Valid
}

/// Everything minted is the value of finalized records.
pub fn check_minted_value<'a>(
    minted: u64,
    records: impl Iterator<Item = &'a ContributionRecord>,
) -> PayoutInvariantResult {
    let finalized_value: u128 = records
        .filter(|r| r.status == ContributionStatus::Finalized)
        .map(|r| r.amount as u128)
        .sum();
    if finalized_value != minted as u128 {
        return PayoutInvariantResult::MintedMismatch {
            minted,
            finalized_value: finalized_value as u64,
        };
    }
    PayoutInvariantResult::Valid
}

// ============================================================================
// Record invariants
// ============================================================================

fn confirmers_distinct(record: &ContributionRecord) -> bool {
    let confirmers = record.confirmers();
    let unique: HashSet<&Pubkey> = confirmers.iter().collect();
    unique.len() == confirmers.len()
}

/// Shape of a single record
pub fn check_record(record: &ContributionRecord) -> RecordInvariantResult {
    if record.confirmation_count as usize > MAX_CONFIRMERS {
        return RecordInvariantResult::ConfirmationsExceedMax {
            count: record.confirmation_count,
        };
    }
    if !confirmers_distinct(record) {
        return RecordInvariantResult::DuplicateConfirmer;
    }
    if record.is_terminal() && record.dispute_open {
        return RecordInvariantResult::SettledWithOpenDispute;
    }
    RecordInvariantResult::Valid
}

type RecordFingerprint = (u8, u64, Pubkey, Pubkey, i64, bool, bool, bool, Vec<Pubkey>);

fn record_fingerprint(record: &ContributionRecord) -> RecordFingerprint {
    (
        record.status as u8,
        record.amount,
        record.worker,
        record.building_wallet,
        record.settled_at,
        record.flagged,
        record.dispute_open,
        record.dispute_upheld,
        record.confirmers().to_vec(),
    )
}

/// A record across one operation
pub fn check_record_transition(
    before: &ContributionRecord,
    after: &ContributionRecord,
) -> RecordInvariantResult {
    if before.is_terminal() {
        if record_fingerprint(before) != record_fingerprint(after) {
            return RecordInvariantResult::TerminalRecordModified {
                status: before.status as u8,
            };
        }
        return RecordInvariantResult::Valid;
    }
    if before.status != after.status && !before.status.can_transition_to(after.status) {
        return RecordInvariantResult::InvalidStateTransition {
            from: before.status as u8,
            to: after.status as u8,
        };
    }
    if after.confirmation_count < before.confirmation_count {
        return RecordInvariantResult::ConfirmationsDecreased {
            before: before.confirmation_count,
            after: after.confirmation_count,
        };
    }
    check_record(after)
}

// ============================================================================
// Custody invariants
// ============================================================================

/// deposited = active + pending + withdrawn + slashed, and the vault holds
/// exactly the bonded stake.
pub fn check_stake_custody(state: &ProtocolState) -> CustodyInvariantResult {
    let bonded: u128 = state
        .stakes
        .values()
        .map(|s| s.active_stake as u128 + s.pending_withdrawal as u128)
        .sum();
    let ledger = &state.ledger;

    let accounted = bonded + ledger.withdrawn as u128 + ledger.slashed as u128;
    if accounted != ledger.deposited as u128 {
        return CustodyInvariantResult::StakeNotConserved {
            deposited: ledger.deposited,
            accounted,
        };
    }
    if bonded != ledger.stake_vault as u128 {
        return CustodyInvariantResult::StakeVaultMismatch {
            vault: ledger.stake_vault,
            bonded,
        };
    }
    if bonded != state.config.total_staked as u128 {
        return CustodyInvariantResult::TotalStakedMismatch {
            total_staked: state.config.total_staked,
            bonded,
        };
    }
    CustodyInvariantResult::Valid
}

/// posted = held + returned + forfeited, and the vault holds exactly the
/// bonds of open disputes.
pub fn check_bond_custody(state: &ProtocolState) -> CustodyInvariantResult {
    let ledger = &state.ledger;
    let accounted =
        ledger.bond_vault as u128 + ledger.bonds_returned as u128 + ledger.bonds_forfeited as u128;
    if accounted != ledger.bonds_posted as u128 {
        return CustodyInvariantResult::BondNotConserved {
            posted: ledger.bonds_posted,
            accounted,
        };
    }

    let open_bonds: u128 = state
        .disputes
        .values()
        .filter(|d| d.is_open())
        .map(|d| d.bond_amount as u128)
        .sum();
    if open_bonds != ledger.bond_vault as u128 {
        return CustodyInvariantResult::BondVaultMismatch {
            vault: ledger.bond_vault,
            open_bonds,
        };
    }
    CustodyInvariantResult::Valid
}

// ============================================================================
// Dispute invariants
// ============================================================================

fn dispute_fingerprint(dispute: &Dispute) -> (u8, u8, i64, u64, u16, u16, u16, u16) {
    (
        dispute.status as u8,
        dispute.ruling as u8,
        dispute.resolved_at,
        dispute.bond_amount,
        dispute.commit_count,
        dispute.reveal_count,
        dispute.valid_votes,
        dispute.invalid_votes,
    )
}

pub fn check_dispute(dispute: &Dispute, record: Option<&ContributionRecord>) -> DisputeInvariantResult {
    if dispute.reveal_count > dispute.commit_count {
        return DisputeInvariantResult::RevealsExceedCommits {
            commits: dispute.commit_count,
            reveals: dispute.reveal_count,
        };
    }
    if dispute.valid_votes as u32 + dispute.invalid_votes as u32 != dispute.reveal_count as u32 {
        return DisputeInvariantResult::TallyMismatch {
            reveals: dispute.reveal_count,
            valid: dispute.valid_votes,
            invalid: dispute.invalid_votes,
        };
    }
    if let Some(record) = record {
        if record.dispute_open != dispute.is_open() {
            return DisputeInvariantResult::OpenFlagMismatch;
        }
    }
    DisputeInvariantResult::Valid
}

pub fn check_dispute_transition(before: &Dispute, after: &Dispute) -> DisputeInvariantResult {
    if before.status == DisputeStatus::Resolved
        && dispute_fingerprint(before) != dispute_fingerprint(after)
    {
        return DisputeInvariantResult::ResolvedDisputeModified;
    }
    DisputeInvariantResult::Valid
}

// ============================================================================
// Replay invariants
// ============================================================================

pub fn check_replay(before: &ProtocolState, after: &ProtocolState) -> ReplayInvariantResult {
    for (digest, proof) in &before.consumed {
        match after.consumed.get(digest) {
            None => return ReplayInvariantResult::ConsumedProofRemoved,
            Some(current)
                if current.consumed_at != proof.consumed_at
                    || current.validator != proof.validator =>
            {
                return ReplayInvariantResult::ConsumedProofRewritten
            }
            Some(_) => {}
        }
    }

    let confirmations: usize = after
        .records
        .values()
        .map(|r| r.confirmation_count as usize)
        .sum();
    if confirmations != after.consumed.len() {
        return ReplayInvariantResult::ConfirmationProofMismatch {
            confirmations,
            consumed: after.consumed.len(),
        };
    }
    ReplayInvariantResult::Valid
}

// ============================================================================
// Whole-state check
// ============================================================================

/// Every invariant across one committed operation.
pub fn check_state_transition(
    before: &ProtocolState,
    after: &ProtocolState,
) -> std::result::Result<(), String> {
    for (key, record) in &after.records {
        let result = match before.records.get(key) {
            Some(previous) => check_record_transition(previous, record),
            None => check_record(record),
        };
        if !result.is_valid() {
            return Err(format!("record: {:?}", result));
        }
    }
    if before.records.keys().any(|key| !after.records.contains_key(key)) {
        return Err("record removed".to_string());
    }

    for (key, dispute) in &after.disputes {
        let result = check_dispute(dispute, after.records.get(key));
        if !result.is_valid() {
            return Err(format!("dispute: {:?}", result));
        }
        if let Some(previous) = before.disputes.get(key) {
            let result = check_dispute_transition(previous, dispute);
            if !result.is_valid() {
                return Err(format!("dispute: {:?}", result));
            }
        }
    }

    let replay = check_replay(before, after);
    if !replay.is_valid() {
        return Err(format!("replay: {:?}", replay));
    }

    for custody in [check_stake_custody(after), check_bond_custody(after)] {
        if !custody.is_valid() {
            return Err(format!("custody: {:?}", custody));
        }
    }

    let minted = check_minted_value(after.ledger.minted, after.records.values());
    if !minted.is_valid() {
        return Err(format!("payout: {:?}", minted));
    }
    if after.config.total_value_distributed != after.ledger.minted {
        return Err(format!(
            "payout: distributed {} != minted {}",
            after.config.total_value_distributed, after.ledger.minted
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arxos_attestation::instructions::contribution_helpers::calculate_payout_split;

    #[test]
    fn test_payout_split_worked_example() {
        let split = calculate_payout_split(1000).unwrap();
        assert_eq!(split.worker, 700);
        assert_eq!(split.building, 100);
        assert_eq!(split.maintainer, 100);
        assert_eq!(split.treasury, 100);
        assert!(check_payout_split(1000, &split).is_valid());
    }

    #[test]
    fn test_payout_split_rounding_goes_to_treasury() {
        let split = calculate_payout_split(7).unwrap();
        assert_eq!(split.worker, 4);
        assert_eq!(split.building, 0);
        assert_eq!(split.maintainer, 0);
        assert_eq!(split.treasury, 3);
        assert!(check_payout_split(7, &split).is_valid());
    }

    #[test]
    fn test_payout_split_detects_short_sum() {
        let split = PayoutSplit {
            worker: 700,
            building: 100,
            maintainer: 100,
            treasury: 99,
        };
        assert_eq!(
            check_payout_split(1000, &split),
            PayoutInvariantResult::SharesDoNotSum {
                amount: 1000,
                total: Some(999)
            }
        );
    }

    #[test]
    fn test_duplicate_confirmer_detected() {
        let validator = Pubkey::new_from_array([7; 32]);
        let mut record = ContributionRecord {
            confirmation_count: 2,
            ..Default::default()
        };
        record.confirming_validators[0] = validator;
        record.confirming_validators[1] = validator;
        assert_eq!(check_record(&record), RecordInvariantResult::DuplicateConfirmer);
    }

    #[test]
    fn test_terminal_record_modification_detected() {
        let before = ContributionRecord {
            status: ContributionStatus::Finalized,
            amount: 1000,
            ..Default::default()
        };
        let mut after = before.clone();
        after.flagged = true;
        assert_eq!(
            check_record_transition(&before, &after),
            RecordInvariantResult::TerminalRecordModified { status: 1 }
        );
    }

    #[test]
    fn test_cancelled_to_finalized_rejected() {
        let before = ContributionRecord {
            status: ContributionStatus::Cancelled,
            ..Default::default()
        };
        let after = ContributionRecord {
            status: ContributionStatus::Finalized,
            ..Default::default()
        };
        assert!(!check_record_transition(&before, &after).is_valid());
    }
}
