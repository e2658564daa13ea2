//! Fuzz testing scenarios that simulate instruction execution
//!
//! [`SimulatedProtocol`] drives the program's own bookkeeping helpers over an
//! in-memory account set, so the instruction logic can be exercised without
//! the Solana runtime. Each operation runs against a scratch copy of the
//! state and is committed only when it succeeds, the way a failed
//! transaction leaves no trace. Token accounts are reduced to balances in a
//! [`Ledger`].

use std::collections::HashMap;

use anchor_lang::prelude::*;
use solana_sha256_hasher::hashv;
use arxos_attestation::errors::AttestationError;
use arxos_attestation::instructions::contribution_helpers::{
    add_confirmation, apply_flag, calculate_payout_split, check_finalizable, contribution_key,
    initialize_record, mark_cancelled, mark_finalized, proof_digest, remove_flag,
    validate_proof_binding, ContributionProof, PayoutSplit,
};
use arxos_attestation::instructions::dispute_helpers::{
    check_resolvable, close_dispute, open_dispute, reason_hash, record_commit, record_reveal,
    tally_ruling, vote_commitment, DisputeOpening,
};
use arxos_attestation::instructions::stake_helpers::{
    apply_bonded_bps_slash, apply_deposit, apply_slash, apply_withdrawal_completion,
    apply_withdrawal_request, calculate_bps_slash, initialize_stake, require_qualified,
    validate_slash_window,
};
use arxos_attestation::state::{
    BuildingRegistration, ConsumedProof, ContributionRecord, Dispute, OverturnSlash,
    ProtocolConfig, ProtocolParams, Ruling, SlashReason, StakeAccount, VoteCommitment,
    WorkerRegistration, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION,
};
use arxos_attestation::utils::ed25519::{build_ed25519_data, verify_ed25519_data, SIGNATURE_LEN};
use arxos_attestation::utils::multisig::check_approvals;
use arxos_attestation::utils::validation::validate_reason;

use crate::arbitrary::*;
use crate::invariants::{check_payout_split, check_state_transition};

/// Start of simulated time
pub const GENESIS: i64 = 1_700_000_000;

/// Result of a simulated instruction execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationResult {
    Success,
    Error(String),
    InvariantViolation(String),
}

impl SimulationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, SimulationResult::Success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SimulationResult::Error(_))
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, SimulationResult::InvariantViolation(_))
    }

    /// True when the operation failed with the named error.
    pub fn is_error_named(&self, name: &str) -> bool {
        matches!(self, SimulationResult::Error(e) if e == name)
    }
}

/// Name an anchor error the way it appears in program logs.
pub fn error_name(err: &Error) -> String {
    match err {
        Error::AnchorError(e) => e.error_name.clone(),
        Error::ProgramError(e) => e.program_error.to_string(),
    }
}

/// Name of the error account loading raises for an absent PDA.
pub const NOT_FOUND: &str = "AccountNotInitialized";

fn not_found() -> Error {
    error!(anchor_lang::error::ErrorCode::AccountNotInitialized)
}

fn already_exists() -> Error {
    ProgramError::AccountAlreadyInitialized.into()
}

/// Stand-in address for a PDA. Only uniqueness matters here.
pub fn pda(seeds: &[&[u8]]) -> Pubkey {
    Pubkey::new_from_array(hashv(seeds).to_bytes())
}

pub fn contribution_address(key: &[u8; 32]) -> Pubkey {
    pda(&[b"contribution", key])
}

pub fn dispute_address(key: &[u8; 32]) -> Pubkey {
    pda(&[b"dispute", key])
}

/// Deterministic test identity
pub fn actor(tag: &str, index: u8) -> Pubkey {
    pda(&[b"actor", tag.as_bytes(), &[index]])
}

/// Stand-in for the Ed25519 precompile: a signature is valid exactly when it
/// equals this value for the signer and message.
pub fn simulated_signature(signer: &Pubkey, message: &[u8]) -> [u8; SIGNATURE_LEN] {
    let r = hashv(&[b"sim-ed25519-r", signer.as_ref(), message]).to_bytes();
    let s = hashv(&[b"sim-ed25519-s", signer.as_ref(), message]).to_bytes();
    let mut signature = [0u8; SIGNATURE_LEN];
    signature[..32].copy_from_slice(&r);
    signature[32..].copy_from_slice(&s);
    signature
}

/// The precompile instruction placed before `attest_contribution`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInstruction {
    pub signer: Pubkey,
    pub message: Vec<u8>,
    pub signature: [u8; SIGNATURE_LEN],
}

/// Arguments of one `attest_contribution` transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub building_id: [u8; 32],
    pub worker: Pubkey,
    pub amount: u64,
    pub contribution_key: [u8; 32],
    pub proof_digest: [u8; 32],
    pub proof: ContributionProof,
    pub signature: [u8; SIGNATURE_LEN],
    pub precompile: Option<SignatureInstruction>,
}

impl Attestation {
    /// A well-formed attestation of `proof`, signed by its worker.
    pub fn signed(proof: ContributionProof) -> Self {
        let message = proof.message(&arxos_attestation::ID);
        let signature = simulated_signature(&proof.worker, &message);
        Self {
            building_id: proof.building_id,
            worker: proof.worker,
            amount: proof.amount,
            contribution_key: contribution_key(&proof.building_id, &proof.worker, proof.amount),
            proof_digest: proof_digest(&message, &signature),
            proof,
            signature,
            precompile: Some(SignatureInstruction {
                signer: proof.worker,
                message,
                signature,
            }),
        }
    }

    /// Replace the signature everywhere, keeping the digest consistent.
    pub fn with_signature(mut self, signature: [u8; SIGNATURE_LEN]) -> Self {
        let message = self.proof.message(&arxos_attestation::ID);
        self.signature = signature;
        self.proof_digest = proof_digest(&message, &signature);
        if let Some(ix) = self.precompile.as_mut() {
            ix.signature = signature;
        }
        self
    }
}

/// Token balances the protocol moves
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    /// Wallet token accounts keyed by owner
    pub balances: HashMap<Pubkey, u64>,
    pub stake_vault: u64,
    pub bond_vault: u64,
    pub treasury: u64,
    pub maintainer_pool: u64,
    /// Value minted by payouts
    pub minted: u64,
    pub deposited: u64,
    pub withdrawn: u64,
    pub slashed: u64,
    pub bonds_posted: u64,
    pub bonds_returned: u64,
    pub bonds_forfeited: u64,
}

fn add(total: &mut u64, amount: u64) -> Result<()> {
    *total = total
        .checked_add(amount)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    Ok(())
}

fn take(total: &mut u64, amount: u64) -> Result<()> {
    *total = total
        .checked_sub(amount)
        .ok_or(AttestationError::TokenTransferFailed)?;
    Ok(())
}

impl Ledger {
    pub fn balance(&self, owner: &Pubkey) -> u64 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    fn debit(&mut self, owner: Pubkey, amount: u64) -> Result<()> {
        take(self.balances.entry(owner).or_default(), amount)
    }

    fn credit(&mut self, owner: Pubkey, amount: u64) -> Result<()> {
        add(self.balances.entry(owner).or_default(), amount)
    }
}

/// Every account the protocol owns, keyed by PDA seed
#[derive(Clone)]
pub struct ProtocolState {
    pub config: ProtocolConfig,
    pub workers: HashMap<Pubkey, WorkerRegistration>,
    pub buildings: HashMap<[u8; 32], BuildingRegistration>,
    pub stakes: HashMap<Pubkey, StakeAccount>,
    pub records: HashMap<[u8; 32], ContributionRecord>,
    pub consumed: HashMap<[u8; 32], ConsumedProof>,
    pub disputes: HashMap<[u8; 32], Dispute>,
    pub votes: HashMap<([u8; 32], Pubkey), VoteCommitment>,
    pub overturn_slashes: HashMap<([u8; 32], Pubkey), OverturnSlash>,
    pub ledger: Ledger,
    pub now: i64,
}

fn pay_out(s: &mut ProtocolState, key: &[u8; 32]) -> Result<PayoutSplit> {
    let now = s.now;
    let record = s.records.get_mut(key).ok_or_else(not_found)?;
    let split = calculate_payout_split(record.amount)?;
    mark_finalized(record, now)?;

    let (worker, wallet, amount) = (record.worker, record.building_wallet, record.amount);
    s.ledger.credit(worker, split.worker)?;
    s.ledger.credit(wallet, split.building)?;
    add(&mut s.ledger.maintainer_pool, split.maintainer)?;
    add(&mut s.ledger.treasury, split.treasury)?;
    add(&mut s.ledger.minted, amount)?;

    add(&mut s.config.finalized_contributions, 1)?;
    add(&mut s.config.total_value_distributed, amount)?;
    Ok(split)
}

/// Remove stake from the vault and send it to the treasury.
fn forfeit_stake(s: &mut ProtocolState, slashed: u64) -> Result<()> {
    s.config.total_staked = s
        .config
        .total_staked
        .checked_sub(slashed)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    add(&mut s.config.total_slashed, slashed)?;
    take(&mut s.ledger.stake_vault, slashed)?;
    add(&mut s.ledger.treasury, slashed)?;
    add(&mut s.ledger.slashed, slashed)
}

/// In-memory protocol with a single multisig owner and a registrar
#[derive(Clone)]
pub struct SimulatedProtocol {
    pub state: ProtocolState,
    pub admin: Pubkey,
    pub registrar: Pubkey,
}

impl SimulatedProtocol {
    pub fn new(params: ProtocolParams) -> Self {
        let admin = actor("admin", 0);
        let registrar = actor("registrar", 0);

        let mut config = ProtocolConfig::default();
        config.apply_params(&params);
        config.authority = admin;
        config.registrar = registrar;
        config.protocol_version = CURRENT_PROTOCOL_VERSION;
        config.min_supported_version = MIN_SUPPORTED_VERSION;
        config.multisig_threshold = 1;
        config.multisig_owners_len = 1;
        config.multisig_owners[0] = admin;

        Self {
            state: ProtocolState {
                config,
                workers: HashMap::new(),
                buildings: HashMap::new(),
                stakes: HashMap::new(),
                records: HashMap::new(),
                consumed: HashMap::new(),
                disputes: HashMap::new(),
                votes: HashMap::new(),
                overturn_slashes: HashMap::new(),
                ledger: Ledger::default(),
                now: GENESIS,
            },
            admin,
            registrar,
        }
    }

    pub fn now(&self) -> i64 {
        self.state.now
    }

    pub fn advance(&mut self, seconds: i64) {
        self.state.now = self.state.now.saturating_add(seconds);
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.state.config
    }

    pub fn record(&self, key: &[u8; 32]) -> Option<&ContributionRecord> {
        self.state.records.get(key)
    }

    pub fn dispute(&self, key: &[u8; 32]) -> Option<&Dispute> {
        self.state.disputes.get(key)
    }

    pub fn stake(&self, validator: &Pubkey) -> Option<&StakeAccount> {
        self.state.stakes.get(validator)
    }

    pub fn balance(&self, owner: &Pubkey) -> u64 {
        self.state.ledger.balance(owner)
    }

    /// Tokens arriving from outside the protocol.
    pub fn fund(&mut self, owner: Pubkey, amount: u64) {
        let balance = self.state.ledger.balances.entry(owner).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Tokens leaving for outside the protocol, e.g. an account drained and
    /// closed by its owner.
    pub fn drain(&mut self, owner: &Pubkey) {
        self.state.ledger.balances.remove(owner);
    }

    /// Run `op` on a scratch copy; commit it only if it succeeds and every
    /// invariant holds across the transition.
    pub fn execute<F>(&mut self, op: F) -> SimulationResult
    where
        F: FnOnce(&mut ProtocolState) -> Result<()>,
    {
        let mut scratch = self.state.clone();
        match op(&mut scratch) {
            Ok(()) => match check_state_transition(&self.state, &scratch) {
                Ok(()) => {
                    self.state = scratch;
                    SimulationResult::Success
                }
                Err(violation) => SimulationResult::InvariantViolation(violation),
            },
            Err(err) => SimulationResult::Error(error_name(&err)),
        }
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    pub fn update_params(&mut self, params: ProtocolParams, approvals: &[Pubkey]) -> SimulationResult {
        let approvals = approvals.to_vec();
        self.execute(move |s| {
            params.validate()?;
            check_approvals(&s.config, &approvals)?;
            s.config.apply_params(&params);
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Registry boundary
    // ------------------------------------------------------------------

    pub fn register_worker(&mut self, worker: Pubkey) -> SimulationResult {
        self.execute(move |s| {
            if s.workers.contains_key(&worker) {
                return Err(already_exists());
            }
            s.workers.insert(
                worker,
                WorkerRegistration {
                    worker,
                    active: true,
                    registered_at: s.now,
                    updated_at: s.now,
                    bump: 0,
                },
            );
            Ok(())
        })
    }

    pub fn set_worker_status(&mut self, worker: Pubkey, active: bool) -> SimulationResult {
        self.execute(move |s| {
            let registration = s.workers.get_mut(&worker).ok_or_else(not_found)?;
            registration.active = active;
            registration.updated_at = s.now;
            Ok(())
        })
    }

    pub fn register_building(&mut self, building_id: [u8; 32], wallet: Pubkey) -> SimulationResult {
        self.execute(move |s| {
            if s.buildings.contains_key(&building_id) {
                return Err(already_exists());
            }
            require!(
                wallet != Pubkey::default(),
                AttestationError::InvalidBuildingWallet
            );
            s.buildings.insert(
                building_id,
                BuildingRegistration {
                    building_id,
                    wallet,
                    registered_at: s.now,
                    updated_at: s.now,
                    bump: 0,
                },
            );
            Ok(())
        })
    }

    pub fn update_building_wallet(
        &mut self,
        building_id: [u8; 32],
        wallet: Pubkey,
    ) -> SimulationResult {
        self.execute(move |s| {
            let building = s.buildings.get_mut(&building_id).ok_or_else(not_found)?;
            require!(
                wallet != Pubkey::default(),
                AttestationError::InvalidBuildingWallet
            );
            building.wallet = wallet;
            building.updated_at = s.now;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Stake registry
    // ------------------------------------------------------------------

    pub fn deposit_stake(&mut self, validator: Pubkey, amount: u64) -> SimulationResult {
        self.execute(move |s| {
            let stake = s.stakes.entry(validator).or_default();
            initialize_stake(stake, validator, s.now, 0);
            apply_deposit(stake, amount)?;
            add(&mut s.config.total_staked, amount)?;

            s.ledger.debit(validator, amount)?;
            add(&mut s.ledger.stake_vault, amount)?;
            add(&mut s.ledger.deposited, amount)
        })
    }

    pub fn request_withdrawal(&mut self, validator: Pubkey, amount: u64) -> SimulationResult {
        self.execute(move |s| {
            let stake = s.stakes.get_mut(&validator).ok_or_else(not_found)?;
            require_keys_eq!(
                stake.validator,
                validator,
                AttestationError::UnauthorizedValidator
            );
            apply_withdrawal_request(stake, amount, s.now, s.config.withdrawal_delay)?;
            Ok(())
        })
    }

    pub fn complete_withdrawal(&mut self, validator: Pubkey) -> SimulationResult {
        self.execute(move |s| {
            let stake = s.stakes.get_mut(&validator).ok_or_else(not_found)?;
            let released = apply_withdrawal_completion(stake, s.now)?;
            s.config.total_staked = s
                .config
                .total_staked
                .checked_sub(released)
                .ok_or(AttestationError::ArithmeticOverflow)?;

            take(&mut s.ledger.stake_vault, released)?;
            s.ledger.credit(validator, released)?;
            add(&mut s.ledger.withdrawn, released)
        })
    }

    pub fn slash_validator(
        &mut self,
        validator: Pubkey,
        amount: u64,
        reason: u8,
        approvals: &[Pubkey],
    ) -> SimulationResult {
        let approvals = approvals.to_vec();
        self.execute(move |s| {
            let stake = s.stakes.get_mut(&validator).ok_or_else(not_found)?;
            SlashReason::try_from(reason)?;
            require!(amount > 0, AttestationError::InvalidAmount);
            check_approvals(&s.config, &approvals)?;
            let slashed = apply_slash(stake, amount)?;
            forfeit_stake(s, slashed)
        })
    }

    // ------------------------------------------------------------------
    // Contribution oracle
    // ------------------------------------------------------------------

    /// Submit `attestation` from `validator` with the precompile
    /// instruction (if any) directly before it.
    pub fn attest(&mut self, validator: Pubkey, attestation: &Attestation) -> SimulationResult {
        let a = attestation.clone();
        self.execute(move |s| {
            // The runtime rejects the whole transaction on a bad precompile
            // signature before the program runs.
            if let Some(ix) = &a.precompile {
                if simulated_signature(&ix.signer, &ix.message) != ix.signature {
                    return Err(ProgramError::InvalidArgument.into());
                }
            }

            let now = s.now;
            let stake = s.stakes.get(&validator).ok_or_else(not_found)?;
            let building_wallet = s.buildings.get(&a.building_id).ok_or_else(not_found)?.wallet;
            let worker_active = s.workers.get(&a.worker).ok_or_else(not_found)?.active;

            require_qualified(stake, &validator, s.config.min_stake)?;
            require!(a.amount > 0, AttestationError::InvalidAmount);
            require!(worker_active, AttestationError::WorkerNotActive);

            require!(
                contribution_key(&a.building_id, &a.worker, a.amount) == a.contribution_key,
                AttestationError::InvalidContributionKey
            );
            let message = a.proof.message(&arxos_attestation::ID);
            require!(
                proof_digest(&message, &a.signature) == a.proof_digest,
                AttestationError::InvalidProofDigest
            );
            require!(
                !s.consumed
                    .get(&a.proof_digest)
                    .is_some_and(|proof| proof.is_consumed()),
                AttestationError::ProofAlreadyConsumed
            );

            validate_proof_binding(&a.proof, &a.building_id, &a.worker, a.amount, now)?;
            let ix = a
                .precompile
                .as_ref()
                .ok_or(AttestationError::MissingSignatureInstruction)?;
            verify_ed25519_data(
                &build_ed25519_data(&ix.signer, &ix.message, &ix.signature),
                &a.worker,
                &message,
                &a.signature,
            )?;

            let record = s.records.entry(a.contribution_key).or_default();
            let created = record.proposed_at == 0;
            if created {
                initialize_record(
                    record,
                    a.contribution_key,
                    a.building_id,
                    a.worker,
                    building_wallet,
                    a.amount,
                    now,
                    0,
                );
            }
            add_confirmation(record, validator)?;

            s.consumed.insert(
                a.proof_digest,
                ConsumedProof {
                    digest: a.proof_digest,
                    contribution: contribution_address(&a.contribution_key),
                    validator,
                    consumed_at: now,
                    bump: 0,
                },
            );
            if created {
                add(&mut s.config.total_contributions, 1)?;
            }
            Ok(())
        })
    }

    pub fn flag(&mut self, validator: Pubkey, key: [u8; 32], reason: &str) -> SimulationResult {
        let reason = reason.to_string();
        self.execute(move |s| {
            let stake = s.stakes.get(&validator).ok_or_else(not_found)?;
            let record = s.records.get_mut(&key).ok_or_else(not_found)?;
            require_qualified(stake, &validator, s.config.min_stake)?;
            validate_reason(&reason)?;
            apply_flag(record, validator)
        })
    }

    pub fn clear_flag(&mut self, key: [u8; 32], approvals: &[Pubkey]) -> SimulationResult {
        let approvals = approvals.to_vec();
        self.execute(move |s| {
            let record = s.records.get_mut(&key).ok_or_else(not_found)?;
            check_approvals(&s.config, &approvals)?;
            remove_flag(record)
        })
    }

    pub fn finalize(&mut self, key: [u8; 32]) -> SimulationResult {
        self.execute(move |s| {
            let record = s.records.get(&key).ok_or_else(not_found)?;
            check_finalizable(
                record,
                s.now,
                s.config.min_confirmations,
                s.config.finalization_delay,
            )?;
            pay_out(s, &key).map(|_| ())
        })
    }

    // ------------------------------------------------------------------
    // Dispute resolver
    // ------------------------------------------------------------------

    pub fn raise_dispute(
        &mut self,
        challenger: Pubkey,
        key: [u8; 32],
        reason: &str,
    ) -> SimulationResult {
        let reason = reason.to_string();
        self.execute(move |s| {
            let record = s.records.get_mut(&key).ok_or_else(not_found)?;
            validate_reason(&reason)?;

            let bond_amount = s.config.dispute_bond;
            let opening = DisputeOpening {
                contribution: contribution_address(&key),
                challenger,
                challenger_token_account: challenger,
                bond_amount,
                reason_hash: reason_hash(&reason),
                commit_period: s.config.commit_period,
                reveal_period: s.config.reveal_period,
                bump: 0,
            };
            let dispute = s.disputes.entry(key).or_default();
            open_dispute(dispute, record, opening, s.now)?;
            add(&mut s.config.total_disputes, 1)?;

            s.ledger.debit(challenger, bond_amount)?;
            add(&mut s.ledger.bond_vault, bond_amount)?;
            add(&mut s.ledger.bonds_posted, bond_amount)
        })
    }

    pub fn commit_vote(
        &mut self,
        validator: Pubkey,
        key: [u8; 32],
        commitment: [u8; 32],
    ) -> SimulationResult {
        self.execute(move |s| {
            let stake = s.stakes.get(&validator).ok_or_else(not_found)?;
            let dispute = s.disputes.get_mut(&key).ok_or_else(not_found)?;
            let record = s.records.get(&key).ok_or_else(not_found)?;
            require_qualified(stake, &validator, s.config.min_stake)?;

            let vote = s.votes.entry((key, validator)).or_default();
            record_commit(
                dispute,
                vote,
                record,
                dispute_address(&key),
                validator,
                commitment,
                s.now,
                0,
            )
        })
    }

    /// Commit a sealed `vote_valid` vote with `salt`.
    pub fn commit_sealed(
        &mut self,
        validator: Pubkey,
        key: [u8; 32],
        vote_valid: bool,
        salt: [u8; 32],
    ) -> SimulationResult {
        let commitment = vote_commitment(&key, &validator, vote_valid, &salt);
        self.commit_vote(validator, key, commitment)
    }

    pub fn reveal_vote(
        &mut self,
        validator: Pubkey,
        key: [u8; 32],
        vote_valid: bool,
        salt: [u8; 32],
    ) -> SimulationResult {
        self.execute(move |s| {
            let dispute = s.disputes.get_mut(&key).ok_or_else(not_found)?;
            let record = s.records.get(&key).ok_or_else(not_found)?;
            let vote = s.votes.get_mut(&(key, validator)).ok_or_else(not_found)?;
            record_reveal(dispute, vote, record, vote_valid, &salt, s.now)
        })
    }

    pub fn resolve_dispute(&mut self, key: [u8; 32]) -> SimulationResult {
        self.execute(move |s| {
            let now = s.now;
            let dispute = s.disputes.get_mut(&key).ok_or_else(not_found)?;
            let record = s.records.get_mut(&key).ok_or_else(not_found)?;
            check_resolvable(dispute, now)?;

            let (ruling, _) = tally_ruling(dispute.valid_votes, dispute.invalid_votes);
            close_dispute(dispute, record, ruling, now);
            let bond_amount = dispute.bond_amount;
            let challenger = dispute.challenger;
            take(&mut s.ledger.bond_vault, bond_amount)?;

            if ruling == Ruling::Overturned {
                s.ledger.credit(challenger, bond_amount)?;
                add(&mut s.ledger.bonds_returned, bond_amount)?;
                mark_cancelled(record, now)?;
                add(&mut s.config.cancelled_contributions, 1)?;
                return Ok(());
            }

            add(&mut s.ledger.treasury, bond_amount)?;
            add(&mut s.ledger.bonds_forfeited, bond_amount)?;
            let finalizable = check_finalizable(
                record,
                now,
                s.config.min_confirmations,
                s.config.finalization_delay,
            )
            .is_ok();
            if finalizable {
                pay_out(s, &key)?;
            }
            Ok(())
        })
    }

    pub fn apply_overturn_slash(&mut self, key: [u8; 32], validator: Pubkey) -> SimulationResult {
        self.execute(move |s| {
            let now = s.now;
            let dispute = s.disputes.get(&key).ok_or_else(not_found)?;
            let record = s.records.get(&key).ok_or_else(not_found)?;
            let stake = s.stakes.get_mut(&validator).ok_or_else(not_found)?;
            let bps = s.config.overturn_slash_bps;

            require!(bps > 0, AttestationError::OverturnSlashDisabled);
            require!(
                dispute.ruling == Ruling::Overturned,
                AttestationError::RulingNotOverturned
            );
            validate_slash_window(dispute.resolved_at, now)?;
            require!(
                record.is_confirmed_by(&validator),
                AttestationError::ValidatorNotConfirmer
            );
            let marker = s.overturn_slashes.entry((key, validator)).or_default();
            require!(!marker.is_applied(), AttestationError::SlashAlreadyApplied);

            let slashed = apply_bonded_bps_slash(stake, bps)?;
            marker.dispute = dispute_address(&key);
            marker.validator = validator;
            marker.amount = slashed;
            marker.applied_at = now;

            forfeit_stake(s, slashed)
        })
    }
}

/// A protocol with one registered worker and building, bonded validators
/// and a funded challenger.
pub struct Fixture {
    pub protocol: SimulatedProtocol,
    pub worker: Pubkey,
    pub building_id: [u8; 32],
    pub building_wallet: Pubkey,
    pub validators: Vec<Pubkey>,
    pub challenger: Pubkey,
    nonce: u64,
}

impl Fixture {
    /// `validators` validators, each bonded with exactly `min_stake`.
    pub fn new(params: ProtocolParams, validators: u8) -> Self {
        let mut protocol = SimulatedProtocol::new(params);
        let worker = actor("worker", 0);
        let building_id = hashv(&[b"building", &[0]]).to_bytes();
        let building_wallet = actor("building-wallet", 0);

        protocol.register_worker(worker);
        protocol.register_building(building_id, building_wallet);

        let validators: Vec<Pubkey> = (0..validators).map(|i| actor("validator", i)).collect();
        for validator in &validators {
            protocol.fund(*validator, params.min_stake);
            protocol.deposit_stake(*validator, params.min_stake);
        }

        let challenger = actor("challenger", 0);
        protocol.fund(challenger, params.dispute_bond.saturating_mul(10));

        Self {
            protocol,
            worker,
            building_id,
            building_wallet,
            validators,
            challenger,
            nonce: 0,
        }
    }

    /// A fresh capture of the claim `(building, worker, amount)`.
    pub fn capture(&mut self, amount: u64) -> Attestation {
        self.nonce += 1;
        Attestation::signed(ContributionProof {
            building_id: self.building_id,
            worker: self.worker,
            amount,
            evidence_hash: hashv(&[b"evidence", &self.nonce.to_le_bytes()]).to_bytes(),
            captured_at: self.protocol.now(),
            nonce: self.nonce,
        })
    }

    /// Attest `amount` once from each of the first `confirmers` validators.
    /// Returns the contribution key.
    pub fn attest_by(&mut self, amount: u64, confirmers: usize) -> [u8; 32] {
        let key = contribution_key(&self.building_id, &self.worker, amount);
        for index in 0..confirmers {
            let attestation = self.capture(amount);
            let validator = self.validators[index];
            self.protocol.attest(validator, &attestation);
        }
        key
    }
}

// ============================================================================
// Scenario drivers
// ============================================================================
//
// Each driver runs one generated input end to end and returns `Success`
// when every step behaved as expected, or `InvariantViolation` naming the
// first step that did not.

/// Outcome of a scenario check: the first unexpected step, if any
pub type Verdict = std::result::Result<(), String>;

/// Expected outcome of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Success,
    Error(&'static str),
    /// Rejected, with an error the program does not name
    AnyError,
}

/// Compare a step's result to its expectation.
pub fn expect(step: &str, result: SimulationResult, expected: Expect) -> Verdict {
    let matched = match (&result, expected) {
        (SimulationResult::InvariantViolation(_), _) => false,
        (SimulationResult::Success, Expect::Success) => true,
        (SimulationResult::Error(_), Expect::AnyError) => true,
        (SimulationResult::Error(name), Expect::Error(wanted)) => name == wanted,
        _ => false,
    };
    if matched {
        Ok(())
    } else {
        Err(format!("{}: expected {:?}, got {:?}", step, expected, result))
    }
}

fn verdict(outcome: Verdict) -> SimulationResult {
    match outcome {
        Ok(()) => SimulationResult::Success,
        Err(violation) => SimulationResult::InvariantViolation(violation),
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Verdict {
    if condition {
        Ok(())
    } else {
        Err(message())
    }
}

/// Build the attestation described by `tamper` for `amount`.
fn tampered_attestation(fx: &mut Fixture, amount: u64, tamper: AttestTamper) -> Attestation {
    let honest = fx.capture(amount);
    match tamper {
        AttestTamper::None | AttestTamper::Replay => honest,
        AttestTamper::MissingPrecompile => Attestation {
            precompile: None,
            ..honest
        },
        AttestTamper::WrongSigner => {
            let impostor = actor("impostor", 0);
            let message = honest.proof.message(&arxos_attestation::ID);
            let signature = simulated_signature(&impostor, &message);
            let mut attestation = honest.with_signature(signature);
            if let Some(ix) = attestation.precompile.as_mut() {
                ix.signer = impostor;
            }
            attestation
        }
        AttestTamper::SignatureArgMismatch => {
            let message = honest.proof.message(&arxos_attestation::ID);
            let mut signature = simulated_signature(&fx.worker, &message);
            signature[0] ^= 0xFF;
            let precompile = honest.precompile.clone();
            Attestation {
                precompile,
                ..honest.with_signature(signature)
            }
        }
        AttestTamper::ForgedSignature => honest.with_signature([0x42; SIGNATURE_LEN]),
        AttestTamper::ProofAmountMismatch => {
            let proof = ContributionProof {
                amount: amount.wrapping_add(1),
                ..honest.proof
            };
            Attestation {
                amount,
                contribution_key: contribution_key(&fx.building_id, &fx.worker, amount),
                ..Attestation::signed(proof)
            }
        }
        AttestTamper::ZeroEvidence => Attestation::signed(ContributionProof {
            evidence_hash: [0u8; 32],
            ..honest.proof
        }),
        AttestTamper::CapturedInFuture => Attestation::signed(ContributionProof {
            captured_at: fx.protocol.now() + 1,
            ..honest.proof
        }),
        AttestTamper::WrongContributionKey => Attestation {
            contribution_key: [0xAB; 32],
            ..honest
        },
        AttestTamper::WrongProofDigest => Attestation {
            proof_digest: [0xCD; 32],
            ..honest
        },
    }
}

/// One attestation against a record that already holds
/// `prior_confirmations` honest confirmations.
pub fn simulate_attest_contribution(input: &AttestContributionInput) -> SimulationResult {
    let params = ProtocolParams::default();
    let mut fx = Fixture::new(params, input.prior_confirmations + 1);
    let amount = input.amount;
    let key = fx.attest_by(amount, input.prior_confirmations as usize);

    let attester = actor("attester", 0);
    fx.protocol.fund(attester, input.stake);
    if input.stake > 0 {
        fx.protocol.deposit_stake(attester, input.stake);
    }
    if !input.worker_active {
        fx.protocol.set_worker_status(fx.worker, false);
    }

    let attestation = tampered_attestation(&mut fx, amount, input.tamper);
    if input.tamper == AttestTamper::Replay {
        let first = fx.validators[input.prior_confirmations as usize];
        fx.protocol.attest(first, &attestation);
    }

    let confirmations_before = fx.protocol.record(&key).map_or(0, |r| r.confirmation_count);
    let consumed_before = fx.protocol.state.consumed.len();
    let result = fx.protocol.attest(attester, &attestation);

    let expected = if input.tamper == AttestTamper::ForgedSignature {
        Expect::AnyError
    } else if input.stake == 0 {
        Expect::Error(NOT_FOUND)
    } else if input.stake < params.min_stake {
        Expect::Error("ValidatorNotQualified")
    } else if amount == 0 {
        Expect::Error("InvalidAmount")
    } else if !input.worker_active {
        Expect::Error("WorkerNotActive")
    } else {
        match input.tamper {
            AttestTamper::None => Expect::Success,
            AttestTamper::WrongContributionKey => Expect::Error("InvalidContributionKey"),
            AttestTamper::WrongProofDigest => Expect::Error("InvalidProofDigest"),
            AttestTamper::Replay => Expect::Error("ProofAlreadyConsumed"),
            AttestTamper::ProofAmountMismatch => Expect::Error("ProofFieldMismatch"),
            AttestTamper::ZeroEvidence => Expect::Error("InvalidEvidenceHash"),
            AttestTamper::CapturedInFuture => Expect::Error("ProofFromFuture"),
            AttestTamper::MissingPrecompile => Expect::Error("MissingSignatureInstruction"),
            AttestTamper::WrongSigner | AttestTamper::SignatureArgMismatch => {
                Expect::Error("SignatureMismatch")
            }
            AttestTamper::ForgedSignature => Expect::AnyError,
        }
    };
    let succeeded = result.is_success();

    verdict((|| -> Verdict {
        expect("attest", result, expected)?;
        let confirmations = fx.protocol.record(&key).map_or(0, |r| r.confirmation_count);
        let consumed = fx.protocol.state.consumed.len();
        if succeeded {
            ensure(confirmations == confirmations_before + 1, || {
                format!("confirmations {} -> {}", confirmations_before, confirmations)
            })?;
            ensure(consumed == consumed_before + 1, || "proof not consumed".to_string())?;
            ensure(
                fx.protocol
                    .record(&key)
                    .is_some_and(|r| r.is_confirmed_by(&attester) && r.building_wallet == fx.building_wallet),
                || "attester or wallet snapshot missing".to_string(),
            )?;
        } else {
            ensure(
                confirmations == confirmations_before && consumed == consumed_before,
                || "rejected attestation left state behind".to_string(),
            )?;
        }
        Ok(())
    })())
}

/// Attest, optionally flag, wait and finalize.
pub fn simulate_finalize_contribution(input: &FinalizeContributionInput) -> SimulationResult {
    let params = ProtocolParams {
        min_confirmations: input.min_confirmations,
        ..ProtocolParams::default()
    };
    let mut fx = Fixture::new(params, 5);
    let amount = input.amount;
    let key = fx.attest_by(amount, input.confirmations as usize);
    let admin = fx.protocol.admin;

    let has_record = amount > 0 && input.confirmations > 0;
    if input.flagged {
        let flagged = fx.protocol.flag(fx.validators[4], key, "evidence photo is blurred");
        if has_record && !flagged.is_success() {
            return SimulationResult::InvariantViolation(format!("flag: {:?}", flagged));
        }
        if input.flag_cleared {
            fx.protocol.clear_flag(key, &[admin]);
        }
    }
    fx.protocol.advance(input.wait);

    let expected = if !has_record {
        Expect::Error(NOT_FOUND)
    } else if input.wait < params.finalization_delay {
        Expect::Error("FinalizationDelayNotElapsed")
    } else if input.confirmations < input.min_confirmations {
        Expect::Error("InsufficientConfirmations")
    } else if input.flagged && !input.flag_cleared {
        Expect::Error("ContributionFlagged")
    } else {
        Expect::Success
    };

    let result = fx.protocol.finalize(key);
    let succeeded = result.is_success();

    verdict((|| -> Verdict {
        expect("finalize", result, expected)?;
        if succeeded {
            let split = calculate_payout_split(amount).map_err(|e| error_name(&e))?;
            let payout = check_payout_split(amount, &split);
            ensure(payout.is_valid(), || format!("split: {:?}", payout))?;

            let ledger = &fx.protocol.state.ledger;
            ensure(
                ledger.balance(&fx.worker) == split.worker
                    && ledger.balance(&fx.building_wallet) == split.building
                    && ledger.maintainer_pool == split.maintainer
                    && ledger.treasury == split.treasury,
                || format!("payout credited wrongly for {:?}", split),
            )?;

            if input.finalize_twice {
                let again = fx.protocol.finalize(key);
                expect("second finalize", again, Expect::Error("ContributionAlreadySettled"))?;
            }
        }
        Ok(())
    })())
}

/// Drive three validators through deposits, withdrawals and slashes and
/// check each step against the stake account it started from.
pub fn simulate_stake_lifecycle(input: &StakeLifecycleInput) -> SimulationResult {
    let params = ProtocolParams::default();
    let mut protocol = SimulatedProtocol::new(params);
    let admin = protocol.admin;
    let validators: Vec<Pubkey> = (0..3).map(|i| actor("validator", i)).collect();
    for validator in &validators {
        protocol.fund(*validator, 1_000_000);
    }

    for (step, op) in input.ops.iter().enumerate() {
        let outcome = match op {
            StakeOp::Deposit { validator, amount } => {
                let validator = validators[*validator as usize % 3];
                let before = protocol.stake(&validator).map_or(0, |s| s.active_stake);
                let result = protocol.deposit_stake(validator, *amount);
                if *amount == 0 {
                    expect("deposit", result, Expect::Error("InvalidAmount"))
                } else {
                    expect("deposit", result, Expect::Success).and_then(|_| {
                        let after = protocol.stake(&validator).map_or(0, |s| s.active_stake);
                        ensure(after == before + amount, || format!("active {} -> {}", before, after))
                    })
                }
            }
            StakeOp::RequestWithdrawal { validator, amount } => {
                let validator = validators[*validator as usize % 3];
                let before = protocol.stake(&validator).cloned();
                let result = protocol.request_withdrawal(validator, *amount);
                let expected = match &before {
                    None => Expect::Error(NOT_FOUND),
                    Some(_) if *amount == 0 => Expect::Error("InvalidAmount"),
                    Some(stake) if *amount > stake.active_stake => Expect::Error("InsufficientStake"),
                    Some(_) => Expect::Success,
                };
                let now = protocol.now();
                expect("request withdrawal", result, expected).and_then(|_| {
                    match (expected, protocol.stake(&validator)) {
                        (Expect::Success, Some(stake)) => ensure(
                            stake.withdrawal_unlock_time == now + params.withdrawal_delay,
                            || "unlock time not restarted".to_string(),
                        ),
                        _ => Ok(()),
                    }
                })
            }
            StakeOp::CompleteWithdrawal { validator } => {
                let validator = validators[*validator as usize % 3];
                let before = protocol.stake(&validator).cloned();
                let balance_before = protocol.balance(&validator);
                let result = protocol.complete_withdrawal(validator);
                let expected = match &before {
                    None => Expect::Error(NOT_FOUND),
                    Some(stake) if stake.pending_withdrawal == 0 => Expect::Error("NothingToWithdraw"),
                    Some(stake) if protocol.now() < stake.withdrawal_unlock_time => {
                        Expect::Error("WithdrawalLocked")
                    }
                    Some(_) => Expect::Success,
                };
                expect("complete withdrawal", result, expected).and_then(|_| match (&before, expected) {
                    (Some(stake), Expect::Success) => ensure(
                        protocol.balance(&validator) == balance_before + stake.pending_withdrawal,
                        || "released amount not paid".to_string(),
                    ),
                    _ => Ok(()),
                })
            }
            StakeOp::Slash { validator, amount, reason } => {
                let validator = validators[*validator as usize % 3];
                let before = protocol.stake(&validator).cloned();
                let result = protocol.slash_validator(validator, *amount, *reason, &[admin]);
                let expected = match &before {
                    None => Expect::Error(NOT_FOUND),
                    Some(_) if *reason > 4 => Expect::Error("InvalidSlashReason"),
                    Some(_) if *amount == 0 => Expect::Error("InvalidAmount"),
                    Some(_) => Expect::Success,
                };
                expect("slash", result, expected).and_then(|_| match (&before, protocol.stake(&validator)) {
                    (Some(old), Some(new)) if expected == Expect::Success => ensure(
                        new.active_stake == old.active_stake - (*amount).min(old.active_stake)
                            && new.pending_withdrawal == old.pending_withdrawal,
                        || "slash touched the wrong balance".to_string(),
                    ),
                    _ => Ok(()),
                })
            }
            StakeOp::Advance { seconds } => {
                protocol.advance(*seconds);
                Ok(())
            }
        };
        if let Err(violation) = outcome {
            return SimulationResult::InvariantViolation(format!("step {}: {}", step, violation));
        }
    }
    SimulationResult::Success
}

/// Commit and reveal sealed votes at generated times.
pub fn simulate_commit_reveal(input: &CommitRevealInput) -> SimulationResult {
    let params = ProtocolParams::default();
    let voters = input.voters.len() as u8;
    let mut fx = Fixture::new(params, 2 + voters);
    let key = fx.attest_by(1_000, 2);
    let challenger = fx.challenger;

    verdict((|| -> Verdict {
        expect(
            "raise",
            fx.protocol.raise_dispute(challenger, key, "worker was not on site"),
            Expect::Success,
        )?;
        let commit_at = input.commit_at;
        let reveal_at = input.reveal_at.max(commit_at);
        fx.protocol.advance(commit_at);

        let commit_open = commit_at < params.commit_period;
        let commit_expect = if commit_open {
            Expect::Success
        } else {
            Expect::Error("CommitWindowClosed")
        };

        // Confirmers never vote on their own attestation
        let confirmer = fx.validators[0];
        expect(
            "confirmer commit",
            fx.protocol.commit_sealed(confirmer, key, true, [1; 32]),
            Expect::Error("VoterIsParticipant"),
        )?;

        for (i, voter) in input.voters.iter().enumerate() {
            let validator = fx.validators[2 + i];
            let result = fx.protocol.commit_sealed(validator, key, voter.vote_valid, voter.salt);
            expect("commit", result, commit_expect)?;
            if commit_open {
                let again = fx.protocol.commit_sealed(validator, key, voter.vote_valid, voter.salt);
                expect("recommit", again, Expect::Error("AlreadyCommitted"))?;
            }
        }

        fx.protocol.advance(reveal_at - commit_at);
        let reveal_deadline = params.commit_period + params.reveal_period;
        let mut valid = 0u16;
        let mut invalid = 0u16;

        for (i, voter) in input.voters.iter().enumerate() {
            if !voter.reveals {
                continue;
            }
            let validator = fx.validators[2 + i];
            let vote = voter.vote_valid ^ voter.reveal_flipped;
            let mut salt = voter.salt;
            if voter.reveal_wrong_salt {
                salt[0] ^= 0x01;
            }

            let expected = if !commit_open {
                Expect::Error(NOT_FOUND)
            } else if reveal_at < params.commit_period {
                Expect::Error("RevealWindowNotOpen")
            } else if reveal_at >= reveal_deadline {
                Expect::Error("RevealWindowClosed")
            } else if voter.reveal_flipped || voter.reveal_wrong_salt {
                Expect::Error("CommitmentMismatch")
            } else {
                Expect::Success
            };
            expect("reveal", fx.protocol.reveal_vote(validator, key, vote, salt), expected)?;

            if expected == Expect::Success {
                if vote {
                    valid += 1;
                } else {
                    invalid += 1;
                }
                let again = fx.protocol.reveal_vote(validator, key, vote, salt);
                expect("re-reveal", again, Expect::Error("AlreadyRevealed"))?;
            }
        }

        let dispute = fx
            .protocol
            .dispute(&key)
            .ok_or_else(|| "dispute missing".to_string())?;
        ensure(
            dispute.valid_votes == valid && dispute.invalid_votes == invalid,
            || {
                format!(
                    "tally {}/{} expected {}/{}",
                    dispute.valid_votes, dispute.invalid_votes, valid, invalid
                )
            },
        )
    })())
}

/// Full dispute: open, vote, resolve, then slash confirmers.
pub fn simulate_resolve_dispute(input: &ResolveDisputeInput) -> SimulationResult {
    let params = ProtocolParams {
        overturn_slash_bps: input.overturn_slash_bps,
        ..ProtocolParams::default()
    };
    let confirmers = input.confirmations as usize;
    let valid = input.valid_votes as usize;
    let invalid = input.invalid_votes as usize;
    let mut fx = Fixture::new(params, (confirmers + valid + invalid) as u8);
    let key = fx.attest_by(input.amount, confirmers);
    let challenger = fx.challenger;
    let bond = params.dispute_bond;

    verdict((|| -> Verdict {
        let raised = fx.protocol.raise_dispute(challenger, key, "duplicate of an earlier claim");
        if confirmers == 0 {
            return expect("raise without record", raised, Expect::Error(NOT_FOUND));
        }
        expect("raise", raised, Expect::Success)?;
        expect(
            "second raise",
            fx.protocol.raise_dispute(challenger, key, "again"),
            Expect::Error("DisputeAlreadyOpen"),
        )?;
        expect("finalize while disputed", fx.protocol.finalize(key), Expect::AnyError)?;

        let voters: Vec<(Pubkey, bool)> = fx.validators[confirmers..]
            .iter()
            .enumerate()
            .map(|(i, v)| (*v, i < valid))
            .collect();
        for (voter, vote) in &voters {
            let result = fx.protocol.commit_sealed(*voter, key, *vote, [9; 32]);
            expect("commit", result, Expect::Success)?;
        }
        fx.protocol.advance(params.commit_period);
        for (voter, vote) in &voters {
            let result = fx.protocol.reveal_vote(*voter, key, *vote, [9; 32]);
            expect("reveal", result, Expect::Success)?;
        }

        if input.resolve_early {
            expect(
                "early resolve",
                fx.protocol.resolve_dispute(key),
                Expect::Error("DisputeWindowOpen"),
            )?;
        }
        fx.protocol.advance(params.reveal_period);

        let treasury_before = fx.protocol.state.ledger.treasury;
        let challenger_before = fx.protocol.balance(&challenger);
        expect("resolve", fx.protocol.resolve_dispute(key), Expect::Success)?;
        expect(
            "second resolve",
            fx.protocol.resolve_dispute(key),
            Expect::Error("DisputeAlreadyResolved"),
        )?;

        let overturned = invalid > valid;
        let record = fx
            .protocol
            .record(&key)
            .cloned()
            .ok_or_else(|| "record missing".to_string())?;
        let ledger = &fx.protocol.state.ledger;

        if overturned {
            ensure(
                record.status == arxos_attestation::state::ContributionStatus::Cancelled,
                || "overturned record not cancelled".to_string(),
            )?;
            ensure(fx.protocol.balance(&challenger) == challenger_before + bond, || {
                "bond not returned".to_string()
            })?;
        } else {
            let paid = confirmers >= params.min_confirmations as usize;
            let split_treasury = if paid {
                calculate_payout_split(input.amount)
                    .map_err(|e| error_name(&e))?
                    .treasury
            } else {
                0
            };
            ensure(ledger.treasury == treasury_before + bond + split_treasury, || {
                "bond not forfeited to treasury".to_string()
            })?;
            ensure(record.dispute_upheld, || "upheld ruling not recorded".to_string())?;
            ensure(record.is_terminal() == paid, || {
                format!("paid_out={} but status {:?}", paid, record.status)
            })?;
            if !paid {
                expect(
                    "re-raise after upheld",
                    fx.protocol.raise_dispute(challenger, key, "again"),
                    Expect::Error("DisputeAlreadyResolved"),
                )?;
            }
        }

        fx.protocol.advance(input.slash_delay);
        for (index, validator) in fx.validators.clone().iter().enumerate() {
            let is_confirmer = index < confirmers;
            let stake_before = fx.protocol.stake(validator).map_or(0, |s| s.active_stake);
            let expected = if params.overturn_slash_bps == 0 {
                Expect::Error("OverturnSlashDisabled")
            } else if !overturned {
                Expect::Error("RulingNotOverturned")
            } else if input.slash_delay > arxos_attestation::instructions::constants::SLASH_WINDOW {
                Expect::Error("SlashWindowExpired")
            } else if !is_confirmer {
                Expect::Error("ValidatorNotConfirmer")
            } else {
                Expect::Success
            };
            expect(
                "overturn slash",
                fx.protocol.apply_overturn_slash(key, *validator),
                expected,
            )?;
            if expected == Expect::Success {
                let slashed = calculate_bps_slash(stake_before, params.overturn_slash_bps)
                    .map_err(|e| error_name(&e))?;
                let after = fx.protocol.stake(validator).map_or(0, |s| s.active_stake);
                ensure(after == stake_before - slashed, || "wrong slash amount".to_string())?;
                expect(
                    "repeat overturn slash",
                    fx.protocol.apply_overturn_slash(key, *validator),
                    Expect::Error("SlashAlreadyApplied"),
                )?;
            }
        }
        Ok(())
    })())
}

/// Random interleaving of every operation. Individual steps may fail; only
/// invariant violations count.
pub fn simulate_protocol_scenario(input: &ProtocolScenarioInput) -> SimulationResult {
    let params = ProtocolParams {
        overturn_slash_bps: input.overturn_slash_bps,
        ..ProtocolParams::default()
    };
    // Validator 3 starts unbonded
    let mut fx = Fixture::new(params, 3);
    let unbonded = actor("validator", 3);
    fx.validators.push(unbonded);
    for validator in &fx.validators {
        fx.protocol.fund(*validator, 100_000);
    }
    let admin = fx.protocol.admin;
    let challenger = fx.challenger;

    let keys: Vec<[u8; 32]> = input
        .claim_amounts
        .iter()
        .map(|amount| contribution_key(&fx.building_id, &fx.worker, *amount))
        .collect();
    let mut last_capture: Option<Attestation> = None;
    let mut sealed: HashMap<(u8, u8), bool> = HashMap::new();
    let salt = |validator: u8, claim: u8| hashv(&[b"salt", &[validator, claim]]).to_bytes();

    for (step, op) in input.ops.iter().enumerate() {
        let result = match *op {
            ProtocolOp::Deposit { validator, amount } => {
                fx.protocol.deposit_stake(fx.validators[validator as usize], amount)
            }
            ProtocolOp::RequestWithdrawal { validator, amount } => {
                fx.protocol.request_withdrawal(fx.validators[validator as usize], amount)
            }
            ProtocolOp::CompleteWithdrawal { validator } => {
                fx.protocol.complete_withdrawal(fx.validators[validator as usize])
            }
            ProtocolOp::Attest { validator, claim } => {
                let capture = fx.capture(input.claim_amounts[claim as usize]);
                let result = fx.protocol.attest(fx.validators[validator as usize], &capture);
                last_capture = Some(capture);
                result
            }
            ProtocolOp::Replay { validator } => match &last_capture {
                Some(capture) => {
                    let capture = capture.clone();
                    fx.protocol.attest(fx.validators[validator as usize], &capture)
                }
                None => SimulationResult::Success,
            },
            ProtocolOp::Flag { validator, claim } => fx.protocol.flag(
                fx.validators[validator as usize],
                keys[claim as usize],
                "meter reading does not match",
            ),
            ProtocolOp::ClearFlag { claim } => fx.protocol.clear_flag(keys[claim as usize], &[admin]),
            ProtocolOp::Finalize { claim } => fx.protocol.finalize(keys[claim as usize]),
            ProtocolOp::RaiseDispute { claim } => {
                fx.protocol
                    .raise_dispute(challenger, keys[claim as usize], "no evidence of work")
            }
            ProtocolOp::Commit {
                validator,
                claim,
                vote_valid,
            } => {
                let result = fx.protocol.commit_sealed(
                    fx.validators[validator as usize],
                    keys[claim as usize],
                    vote_valid,
                    salt(validator, claim),
                );
                if result.is_success() {
                    sealed.insert((validator, claim), vote_valid);
                }
                result
            }
            ProtocolOp::Reveal { validator, claim } => {
                let vote = sealed.get(&(validator, claim)).copied().unwrap_or(true);
                fx.protocol.reveal_vote(
                    fx.validators[validator as usize],
                    keys[claim as usize],
                    vote,
                    salt(validator, claim),
                )
            }
            ProtocolOp::Resolve { claim } => fx.protocol.resolve_dispute(keys[claim as usize]),
            ProtocolOp::OverturnSlash { validator, claim } => fx
                .protocol
                .apply_overturn_slash(keys[claim as usize], fx.validators[validator as usize]),
            ProtocolOp::Advance { seconds } => {
                fx.protocol.advance(seconds);
                SimulationResult::Success
            }
        };

        if let SimulationResult::InvariantViolation(violation) = result {
            return SimulationResult::InvariantViolation(format!(
                "step {} ({:?}): {}",
                step, op, violation
            ));
        }
    }
    SimulationResult::Success
}
