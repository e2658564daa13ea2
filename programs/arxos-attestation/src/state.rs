//! Account state structures for the ArxOS attestation protocol

use anchor_lang::prelude::*;

use crate::errors::AttestationError;

// ============================================================================
// Size Constants
// ============================================================================

/// Size of cryptographic hashes and IDs (SHA256, building ids)
pub const HASH_SIZE: usize = 32;

/// Maximum distinct validators that can confirm one contribution
pub const MAX_CONFIRMERS: usize = 16;

/// Current protocol version
pub const CURRENT_PROTOCOL_VERSION: u8 = 1;

/// Minimum protocol version still readable by this program
pub const MIN_SUPPORTED_VERSION: u8 = 1;

/// Lifecycle of a contribution record.
///
/// Valid transitions:
/// - Proposed → Finalized (finalize, or an Upheld ruling)
/// - Proposed → Cancelled (an Overturned ruling)
///
/// Finalized and Cancelled are terminal.
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace, Debug,
)]
#[repr(u8)]
pub enum ContributionStatus {
    #[default]
    Proposed = 0,
    Finalized = 1,
    Cancelled = 2,
}

impl ContributionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ContributionStatus::Proposed)
    }

    pub fn can_transition_to(&self, new_status: ContributionStatus) -> bool {
        matches!(
            (self, new_status),
            (ContributionStatus::Proposed, ContributionStatus::Finalized)
                | (ContributionStatus::Proposed, ContributionStatus::Cancelled)
        )
    }
}

/// Dispute lifecycle
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace, Debug,
)]
#[repr(u8)]
pub enum DisputeStatus {
    #[default]
    Open = 0,
    Resolved = 1,
}

/// Ruling of a bonded dispute
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace, Debug,
)]
#[repr(u8)]
pub enum Ruling {
    #[default]
    Unresolved = 0,
    /// The attestation stands; the bond is forfeited
    Upheld = 1,
    /// The attestation is void; the bond is returned
    Overturned = 2,
}

/// Reason codes for administrative slashing
#[derive(
    AnchorSerialize, AnchorDeserialize, Clone, Copy, PartialEq, Eq, Default, InitSpace, Debug,
)]
#[repr(u8)]
pub enum SlashReason {
    #[default]
    Misconduct = 0,
    FalseAttestation = 1,
    Collusion = 2,
    Inactivity = 3,
    /// Confirmed a contribution later overturned by a dispute ruling
    OverturnedAttestation = 4,
}

impl TryFrom<u8> for SlashReason {
    type Error = AttestationError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(SlashReason::Misconduct),
            1 => Ok(SlashReason::FalseAttestation),
            2 => Ok(SlashReason::Collusion),
            3 => Ok(SlashReason::Inactivity),
            4 => Ok(SlashReason::OverturnedAttestation),
            _ => Err(AttestationError::InvalidSlashReason),
        }
    }
}

// ============================================================================
// Protocol configuration
// ============================================================================

/// Tunable protocol parameters, supplied at initialization and replaced as a
/// whole by `update_protocol_params`.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolParams {
    /// Minimum active stake for a validator to be qualified
    pub min_stake: u64,
    /// Distinct confirmations required before finalization
    pub min_confirmations: u8,
    /// Seconds between first attestation and earliest finalization
    pub finalization_delay: i64,
    /// Seconds a withdrawal request stays locked
    pub withdrawal_delay: i64,
    /// Length of the vote commit window (seconds)
    pub commit_period: i64,
    /// Length of the vote reveal window (seconds)
    pub reveal_period: i64,
    /// Bond a challenger posts to open a dispute
    pub dispute_bond: u64,
    /// Stake slashed from each confirmer of an overturned record (0 = off)
    pub overturn_slash_bps: u16,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            min_stake: ProtocolConfig::DEFAULT_MIN_STAKE,
            min_confirmations: ProtocolConfig::DEFAULT_MIN_CONFIRMATIONS,
            finalization_delay: ProtocolConfig::DEFAULT_FINALIZATION_DELAY,
            withdrawal_delay: ProtocolConfig::DEFAULT_WITHDRAWAL_DELAY,
            commit_period: ProtocolConfig::DEFAULT_COMMIT_PERIOD,
            reveal_period: ProtocolConfig::DEFAULT_REVEAL_PERIOD,
            dispute_bond: ProtocolConfig::DEFAULT_DISPUTE_BOND,
            overturn_slash_bps: 0,
        }
    }
}

impl ProtocolParams {
    pub fn validate(&self) -> Result<()> {
        require!(self.min_stake > 0, AttestationError::InvalidProtocolParams);
        require!(
            self.min_confirmations >= 1 && self.min_confirmations as usize <= MAX_CONFIRMERS,
            AttestationError::InvalidProtocolParams
        );
        for period in [
            self.finalization_delay,
            self.withdrawal_delay,
            self.commit_period,
            self.reveal_period,
        ] {
            require!(
                period > 0 && period <= ProtocolConfig::MAX_PERIOD,
                AttestationError::InvalidProtocolParams
            );
        }
        require!(self.dispute_bond > 0, AttestationError::InvalidProtocolParams);
        require!(
            self.overturn_slash_bps <= ProtocolConfig::MAX_OVERTURN_SLASH_BPS,
            AttestationError::InvalidProtocolParams
        );
        Ok(())
    }
}

/// Protocol configuration account
/// PDA seeds: ["protocol"]
///
/// The config PDA is the mint authority of the value token and the owner of
/// the stake and bond vaults.
#[account]
#[derive(InitSpace)]
pub struct ProtocolConfig {
    /// Protocol authority (one of the multisig owners)
    pub authority: Pubkey,
    /// Key allowed to write worker and building registrations
    pub registrar: Pubkey,
    /// Value token mint
    pub mint: Pubkey,
    /// Treasury token account (10% share, remainders, forfeited bonds, slashes)
    pub treasury: Pubkey,
    /// Maintainer pool token account (10% share)
    pub maintainer_pool: Pubkey,
    /// Token account holding active and pending stake
    pub stake_vault: Pubkey,
    /// Token account holding open dispute bonds
    pub bond_vault: Pubkey,
    pub min_stake: u64,
    pub min_confirmations: u8,
    pub finalization_delay: i64,
    pub withdrawal_delay: i64,
    pub commit_period: i64,
    pub reveal_period: i64,
    pub dispute_bond: u64,
    pub overturn_slash_bps: u16,
    // === Statistics ===
    pub total_staked: u64,
    pub total_slashed: u64,
    pub total_contributions: u64,
    pub finalized_contributions: u64,
    pub cancelled_contributions: u64,
    pub total_value_distributed: u64,
    pub total_disputes: u64,
    // === Versioning fields ===
    pub protocol_version: u8,
    pub min_supported_version: u8,
    /// Bump seeds for the config and its vaults
    pub bump: u8,
    pub stake_vault_bump: u8,
    pub bond_vault_bump: u8,
    pub multisig_threshold: u8,
    pub multisig_owners_len: u8,
    /// Reserved for backwards-compatible additions
    pub _reserved: [u8; 16],
    /// Only the first `multisig_owners_len` entries are valid; remaining slots
    /// are always `Pubkey::default()`.
    pub multisig_owners: [Pubkey; ProtocolConfig::MAX_MULTISIG_OWNERS],
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        let params = ProtocolParams::default();
        Self {
            authority: Pubkey::default(),
            registrar: Pubkey::default(),
            mint: Pubkey::default(),
            treasury: Pubkey::default(),
            maintainer_pool: Pubkey::default(),
            stake_vault: Pubkey::default(),
            bond_vault: Pubkey::default(),
            min_stake: params.min_stake,
            min_confirmations: params.min_confirmations,
            finalization_delay: params.finalization_delay,
            withdrawal_delay: params.withdrawal_delay,
            commit_period: params.commit_period,
            reveal_period: params.reveal_period,
            dispute_bond: params.dispute_bond,
            overturn_slash_bps: params.overturn_slash_bps,
            total_staked: 0,
            total_slashed: 0,
            total_contributions: 0,
            finalized_contributions: 0,
            cancelled_contributions: 0,
            total_value_distributed: 0,
            total_disputes: 0,
            protocol_version: CURRENT_PROTOCOL_VERSION,
            min_supported_version: MIN_SUPPORTED_VERSION,
            bump: 0,
            stake_vault_bump: 0,
            bond_vault_bump: 0,
            multisig_threshold: 0,
            multisig_owners_len: 0,
            _reserved: [0u8; 16],
            multisig_owners: [Pubkey::default(); ProtocolConfig::MAX_MULTISIG_OWNERS],
        }
    }
}

impl ProtocolConfig {
    pub const MAX_MULTISIG_OWNERS: usize = 5;
    pub const DEFAULT_MIN_STAKE: u64 = 1_000;
    pub const DEFAULT_MIN_CONFIRMATIONS: u8 = 2;
    pub const DEFAULT_FINALIZATION_DELAY: i64 = 24 * 60 * 60; // 24 hours
    pub const DEFAULT_WITHDRAWAL_DELAY: i64 = 7 * 24 * 60 * 60; // 7 days
    pub const DEFAULT_COMMIT_PERIOD: i64 = 24 * 60 * 60; // 24 hours
    pub const DEFAULT_REVEAL_PERIOD: i64 = 25 * 60 * 60; // 25 hours
    pub const DEFAULT_DISPUTE_BOND: u64 = 100;
    /// Upper bound for any configured period
    pub const MAX_PERIOD: i64 = 365 * 24 * 60 * 60;
    pub const MAX_OVERTURN_SLASH_BPS: u16 = 5_000;

    pub const SIZE: usize = 8 + // discriminator
        32 + // authority
        32 + // registrar
        32 + // mint
        32 + // treasury
        32 + // maintainer_pool
        32 + // stake_vault
        32 + // bond_vault
        8 +  // min_stake
        1 +  // min_confirmations
        8 +  // finalization_delay
        8 +  // withdrawal_delay
        8 +  // commit_period
        8 +  // reveal_period
        8 +  // dispute_bond
        2 +  // overturn_slash_bps
        8 +  // total_staked
        8 +  // total_slashed
        8 +  // total_contributions
        8 +  // finalized_contributions
        8 +  // cancelled_contributions
        8 +  // total_value_distributed
        8 +  // total_disputes
        1 +  // protocol_version
        1 +  // min_supported_version
        1 +  // bump
        1 +  // stake_vault_bump
        1 +  // bond_vault_bump
        1 +  // multisig_threshold
        1 +  // multisig_owners_len
        16 + // reserved
        (32 * Self::MAX_MULTISIG_OWNERS); // multisig owners

    pub fn params(&self) -> ProtocolParams {
        ProtocolParams {
            min_stake: self.min_stake,
            min_confirmations: self.min_confirmations,
            finalization_delay: self.finalization_delay,
            withdrawal_delay: self.withdrawal_delay,
            commit_period: self.commit_period,
            reveal_period: self.reveal_period,
            dispute_bond: self.dispute_bond,
            overturn_slash_bps: self.overturn_slash_bps,
        }
    }

    /// Overwrite every tunable parameter. Callers validate first.
    pub fn apply_params(&mut self, params: &ProtocolParams) {
        self.min_stake = params.min_stake;
        self.min_confirmations = params.min_confirmations;
        self.finalization_delay = params.finalization_delay;
        self.withdrawal_delay = params.withdrawal_delay;
        self.commit_period = params.commit_period;
        self.reveal_period = params.reveal_period;
        self.dispute_bond = params.dispute_bond;
        self.overturn_slash_bps = params.overturn_slash_bps;
    }
}

// ============================================================================
// Registry boundary
// ============================================================================

/// Worker registration written by the registrar
/// PDA seeds: ["worker", worker]
#[account]
#[derive(InitSpace, Default)]
pub struct WorkerRegistration {
    pub worker: Pubkey,
    /// Only active workers may be attested for
    pub active: bool,
    pub registered_at: i64,
    pub updated_at: i64,
    pub bump: u8,
}

impl WorkerRegistration {
    pub const SIZE: usize = 8 + // discriminator
        32 + // worker
        1 +  // active
        8 +  // registered_at
        8 +  // updated_at
        1; // bump
}

/// Building registration written by the registrar
/// PDA seeds: ["building", building_id]
#[account]
#[derive(InitSpace, Default)]
pub struct BuildingRegistration {
    pub building_id: [u8; 32],
    /// Current payout wallet; contribution records snapshot it on creation
    pub wallet: Pubkey,
    pub registered_at: i64,
    pub updated_at: i64,
    pub bump: u8,
}

impl BuildingRegistration {
    pub const SIZE: usize = 8 + // discriminator
        32 + // building_id
        32 + // wallet
        8 +  // registered_at
        8 +  // updated_at
        1; // bump
}

// ============================================================================
// Stake registry
// ============================================================================

/// Bonded validator stake
/// PDA seeds: ["stake", validator]
#[account]
#[derive(InitSpace, Default)]
pub struct StakeAccount {
    pub validator: Pubkey,
    /// Stake counted towards qualification
    pub active_stake: u64,
    /// Stake waiting out the withdrawal delay
    pub pending_withdrawal: u64,
    /// Earliest time `pending_withdrawal` can be released
    pub withdrawal_unlock_time: i64,
    /// Lifetime slashed total
    pub total_slashed: u64,
    pub created_at: i64,
    pub bump: u8,
}

impl StakeAccount {
    pub const SIZE: usize = 8 + // discriminator
        32 + // validator
        8 +  // active_stake
        8 +  // pending_withdrawal
        8 +  // withdrawal_unlock_time
        8 +  // total_slashed
        8 +  // created_at
        1; // bump
}

// ============================================================================
// Contribution oracle
// ============================================================================

/// Attested contribution
/// PDA seeds: ["contribution", contribution_key]
/// where contribution_key = sha256(domain, building_id, worker, amount)
#[account]
#[derive(InitSpace, Default)]
pub struct ContributionRecord {
    pub contribution_key: [u8; 32],
    pub building_id: [u8; 32],
    pub worker: Pubkey,
    /// Building wallet at creation time; payouts always go here
    pub building_wallet: Pubkey,
    pub amount: u64,
    pub status: ContributionStatus,
    /// Timestamp of the first attestation
    pub proposed_at: i64,
    pub settled_at: i64,
    /// Advisory flag raised by a validator
    pub flagged: bool,
    pub flagged_by: Pubkey,
    /// A bonded dispute is open against this record
    pub dispute_open: bool,
    /// A bonded dispute was resolved Upheld; no further dispute or flag
    pub dispute_upheld: bool,
    pub confirmation_count: u8,
    /// Only the first `confirmation_count` entries are valid
    pub confirming_validators: [Pubkey; MAX_CONFIRMERS],
    pub bump: u8,
}

impl ContributionRecord {
    pub const SIZE: usize = 8 + // discriminator
        32 + // contribution_key
        32 + // building_id
        32 + // worker
        32 + // building_wallet
        8 +  // amount
        1 +  // status
        8 +  // proposed_at
        8 +  // settled_at
        1 +  // flagged
        32 + // flagged_by
        1 +  // dispute_open
        1 +  // dispute_upheld
        1 +  // confirmation_count
        (32 * MAX_CONFIRMERS) + // confirming_validators
        1; // bump

    pub fn confirmers(&self) -> &[Pubkey] {
        let count = (self.confirmation_count as usize).min(MAX_CONFIRMERS);
        &self.confirming_validators[..count]
    }

    pub fn is_confirmed_by(&self, validator: &Pubkey) -> bool {
        self.confirmers().contains(validator)
    }

    pub fn confirmer_index(&self, validator: &Pubkey) -> Option<usize> {
        self.confirmers().iter().position(|v| v == validator)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Read-only query the oracle makes of the resolver before paying out
    pub fn has_unresolved_dispute(&self) -> bool {
        self.dispute_open
    }
}

/// Marker for a consumed (proof, signature) pair
/// PDA seeds: ["proof", proof_digest]
#[account]
#[derive(InitSpace, Default)]
pub struct ConsumedProof {
    pub digest: [u8; 32],
    /// Record the proof was attached to
    pub contribution: Pubkey,
    pub validator: Pubkey,
    /// Zero until consumed
    pub consumed_at: i64,
    pub bump: u8,
}

impl ConsumedProof {
    pub const SIZE: usize = 8 + // discriminator
        32 + // digest
        32 + // contribution
        32 + // validator
        8 +  // consumed_at
        1; // bump

    pub fn is_consumed(&self) -> bool {
        self.consumed_at != 0
    }
}

// ============================================================================
// Dispute resolver
// ============================================================================

/// Bonded dispute against a contribution record
/// PDA seeds: ["dispute", contribution]
#[account]
#[derive(InitSpace, Default)]
pub struct Dispute {
    pub contribution: Pubkey,
    pub contribution_key: [u8; 32],
    pub challenger: Pubkey,
    /// Token account the bond came from. Refunds may go to any account of
    /// the challenger.
    pub challenger_token_account: Pubkey,
    pub bond_amount: u64,
    pub reason_hash: [u8; 32],
    pub status: DisputeStatus,
    pub ruling: Ruling,
    pub opened_at: i64,
    /// Commits accepted while now < commit_deadline
    pub commit_deadline: i64,
    /// Reveals accepted while commit_deadline <= now < reveal_deadline
    pub reveal_deadline: i64,
    pub resolved_at: i64,
    pub commit_count: u16,
    pub reveal_count: u16,
    pub valid_votes: u16,
    pub invalid_votes: u16,
    pub bump: u8,
}

impl Dispute {
    pub const SIZE: usize = 8 + // discriminator
        32 + // contribution
        32 + // contribution_key
        32 + // challenger
        32 + // challenger_token_account
        8 +  // bond_amount
        32 + // reason_hash
        1 +  // status
        1 +  // ruling
        8 +  // opened_at
        8 +  // commit_deadline
        8 +  // reveal_deadline
        8 +  // resolved_at
        2 +  // commit_count
        2 +  // reveal_count
        2 +  // valid_votes
        2 +  // invalid_votes
        1; // bump

    pub fn is_open(&self) -> bool {
        self.opened_at != 0 && self.status == DisputeStatus::Open
    }
}

/// One validator's sealed vote on a dispute
/// PDA seeds: ["vote", dispute, validator]
#[account]
#[derive(InitSpace, Default)]
pub struct VoteCommitment {
    pub dispute: Pubkey,
    pub voter: Pubkey,
    /// sha256(domain, contribution_key, voter, vote, salt)
    pub commitment: [u8; 32],
    pub committed_at: i64,
    pub revealed: bool,
    /// true = the contribution is valid
    pub vote_valid: bool,
    pub revealed_at: i64,
    pub bump: u8,
}

impl VoteCommitment {
    pub const SIZE: usize = 8 + // discriminator
        32 + // dispute
        32 + // voter
        32 + // commitment
        8 +  // committed_at
        1 +  // revealed
        1 +  // vote_valid
        8 +  // revealed_at
        1; // bump
}

/// Marker for an overturn slash applied to one confirmer of a cancelled
/// record. Keeps the record and the dispute untouched after settlement.
/// PDA seeds: ["overturn_slash", dispute, validator]
#[account]
#[derive(InitSpace, Default)]
pub struct OverturnSlash {
    pub dispute: Pubkey,
    pub validator: Pubkey,
    pub amount: u64,
    /// Zero until applied
    pub applied_at: i64,
    pub bump: u8,
}

impl OverturnSlash {
    pub const SIZE: usize = 8 + // discriminator
        32 + // dispute
        32 + // validator
        8 +  // amount
        8 +  // applied_at
        1; // bump

    pub fn is_applied(&self) -> bool {
        self.applied_at != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SIZE should equal INIT_SPACE (borsh serialized) + 8-byte discriminator.
    macro_rules! test_size_constant {
        ($struct:ty) => {
            assert_eq!(
                <$struct>::SIZE,
                <$struct as anchor_lang::Space>::INIT_SPACE + 8,
                concat!(stringify!($struct), "::SIZE mismatch with INIT_SPACE")
            );
        };
    }

    #[test]
    fn test_account_sizes() {
        test_size_constant!(ProtocolConfig);
        test_size_constant!(WorkerRegistration);
        test_size_constant!(BuildingRegistration);
        test_size_constant!(StakeAccount);
        test_size_constant!(ContributionRecord);
        test_size_constant!(ConsumedProof);
        test_size_constant!(Dispute);
        test_size_constant!(VoteCommitment);
        test_size_constant!(OverturnSlash);
    }

    #[test]
    fn test_contribution_status_transitions() {
        use ContributionStatus::*;
        assert!(Proposed.can_transition_to(Finalized));
        assert!(Proposed.can_transition_to(Cancelled));
        assert!(!Proposed.can_transition_to(Proposed));
        for terminal in [Finalized, Cancelled] {
            assert!(terminal.is_terminal());
            for target in [Proposed, Finalized, Cancelled] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn test_default_params_are_valid() {
        let params = ProtocolParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.min_confirmations, 2);
        assert_eq!(params.commit_period + params.reveal_period, 49 * 60 * 60);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let base = ProtocolParams::default();
        let cases = [
            ProtocolParams { min_stake: 0, ..base },
            ProtocolParams { min_confirmations: 0, ..base },
            ProtocolParams { min_confirmations: (MAX_CONFIRMERS + 1) as u8, ..base },
            ProtocolParams { finalization_delay: 0, ..base },
            ProtocolParams { withdrawal_delay: -1, ..base },
            ProtocolParams { reveal_period: ProtocolConfig::MAX_PERIOD + 1, ..base },
            ProtocolParams { dispute_bond: 0, ..base },
            ProtocolParams { overturn_slash_bps: 5_001, ..base },
        ];
        for params in cases {
            assert!(params.validate().is_err(), "{:?} should be rejected", params);
        }
    }

    #[test]
    fn test_config_params_round_trip() {
        let mut config = ProtocolConfig::default();
        let params = ProtocolParams {
            min_stake: 5_000,
            min_confirmations: 3,
            overturn_slash_bps: 1_000,
            ..ProtocolParams::default()
        };
        config.apply_params(&params);
        assert_eq!(config.params(), params);
    }

    #[test]
    fn test_confirmers_view_is_bounded_by_count() {
        let mut record = ContributionRecord::default();
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        record.confirming_validators[0] = a;
        record.confirming_validators[1] = b;
        record.confirmation_count = 1;

        assert_eq!(record.confirmers(), &[a]);
        assert!(record.is_confirmed_by(&a));
        assert!(!record.is_confirmed_by(&b));
        assert_eq!(record.confirmer_index(&a), Some(0));
        assert_eq!(record.confirmer_index(&b), None);
    }

    #[test]
    fn test_slash_reason_from_u8() {
        assert!(matches!(
            SlashReason::try_from(1u8),
            Ok(SlashReason::FalseAttestation)
        ));
        assert!(matches!(
            SlashReason::try_from(4u8),
            Ok(SlashReason::OverturnedAttestation)
        ));
        assert!(SlashReason::try_from(5u8).is_err());
    }
}
