#![allow(unexpected_cfgs)]
//! ArxOS Contribution Attestation Protocol
//!
//! Attests that field work performed by a worker for a building actually
//! happened and pays out the value token on a fixed 70/10/10/10 split.
//! Stake-bonded validators confirm worker-signed, single-use proofs; a quorum
//! plus a finalization delay releases the payout; a bonded commit-reveal
//! dispute can uphold or overturn an attestation before it settles.

use anchor_lang::prelude::*;

declare_id!("G8ZMMqwXWndae5nQce7dm7z4stgEAfaeVaLLuLxNRDym");

pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;
pub mod utils;

use instructions::contribution_helpers::ContributionProof;
use instructions::*;
use state::ProtocolParams;

#[program]
pub mod arxos_attestation {
    use super::*;

    // ========================================================================
    // Protocol administration
    // ========================================================================

    /// Create the protocol config and its stake and bond vaults.
    ///
    /// # Arguments
    /// * `ctx` - Config, vaults, mint, treasury and maintainer pool accounts
    /// * `params` - Initial tunable parameters
    /// * `registrar` - Key allowed to write worker and building registrations
    /// * `multisig_threshold` - Approvals required for administrative actions
    /// * `multisig_owners` - Up to five distinct owners; must include the signer
    pub fn initialize_protocol(
        ctx: Context<InitializeProtocol>,
        params: ProtocolParams,
        registrar: Pubkey,
        multisig_threshold: u8,
        multisig_owners: Vec<Pubkey>,
    ) -> Result<()> {
        instructions::initialize_protocol::handler(
            ctx,
            params,
            registrar,
            multisig_threshold,
            multisig_owners,
        )
    }

    /// Replace every tunable parameter (multisig gated).
    pub fn update_protocol_params(
        ctx: Context<UpdateProtocolParams>,
        params: ProtocolParams,
    ) -> Result<()> {
        instructions::update_protocol_params::handler(ctx, params)
    }

    // ========================================================================
    // Registry boundary
    // ========================================================================

    pub fn register_worker(ctx: Context<RegisterWorker>, worker: Pubkey) -> Result<()> {
        instructions::register_worker::handler(ctx, worker)
    }

    pub fn set_worker_status(ctx: Context<SetWorkerStatus>, active: bool) -> Result<()> {
        instructions::set_worker_status::handler(ctx, active)
    }

    pub fn register_building(
        ctx: Context<RegisterBuilding>,
        building_id: [u8; 32],
        wallet: Pubkey,
    ) -> Result<()> {
        instructions::register_building::handler(ctx, building_id, wallet)
    }

    /// Point a building at a new payout wallet. Existing records keep their
    /// snapshot.
    pub fn update_building_wallet(
        ctx: Context<UpdateBuildingWallet>,
        wallet: Pubkey,
    ) -> Result<()> {
        instructions::update_building_wallet::handler(ctx, wallet)
    }

    // ========================================================================
    // Stake registry
    // ========================================================================

    /// Bond stake. Creates the stake account on first deposit.
    pub fn deposit_stake(ctx: Context<DepositStake>, amount: u64) -> Result<()> {
        instructions::deposit_stake::handler(ctx, amount)
    }

    /// Move active stake to pending; it unlocks after the withdrawal delay.
    pub fn request_withdrawal(ctx: Context<RequestWithdrawal>, amount: u64) -> Result<()> {
        instructions::request_withdrawal::handler(ctx, amount)
    }

    /// Release the full pending balance once unlocked.
    pub fn complete_withdrawal(ctx: Context<CompleteWithdrawal>) -> Result<()> {
        instructions::complete_withdrawal::handler(ctx)
    }

    /// Administrative slash (multisig gated).
    ///
    /// # Arguments
    /// * `amount` - Requested amount; clamped to the active stake
    /// * `reason` - `SlashReason` code
    pub fn slash_validator(ctx: Context<SlashValidator>, amount: u64, reason: u8) -> Result<()> {
        instructions::slash_validator::handler(ctx, amount, reason)
    }

    // ========================================================================
    // Contribution oracle
    // ========================================================================

    /// Attest a contribution. Must be preceded in the same transaction by an
    /// Ed25519 precompile instruction carrying the worker's signature over
    /// the proof message.
    ///
    /// # Arguments
    /// * `building_id` - Registered building
    /// * `worker` - Active worker who signed the proof
    /// * `amount` - Contribution value
    /// * `contribution_key` - Record PDA seed; recomputed on-chain
    /// * `proof_digest` - Replay marker PDA seed; recomputed on-chain
    /// * `proof` - Signed proof payload
    /// * `signature` - Worker's Ed25519 signature over the proof message
    #[allow(clippy::too_many_arguments)]
    pub fn attest_contribution(
        ctx: Context<AttestContribution>,
        building_id: [u8; 32],
        worker: Pubkey,
        amount: u64,
        contribution_key: [u8; 32],
        proof_digest: [u8; 32],
        proof: ContributionProof,
        signature: [u8; 64],
    ) -> Result<()> {
        instructions::attest_contribution::handler(
            ctx,
            building_id,
            worker,
            amount,
            contribution_key,
            proof_digest,
            proof,
            signature,
        )
    }

    /// Advisory flag that blocks finalization. No bond, no vote.
    pub fn flag_contribution(ctx: Context<FlagContribution>, reason: String) -> Result<()> {
        instructions::flag_contribution::handler(ctx, reason)
    }

    /// Clear an advisory flag (multisig gated).
    pub fn clear_flag(ctx: Context<ClearFlag>) -> Result<()> {
        instructions::clear_flag::handler(ctx)
    }

    /// Pay out a contribution that met quorum and outlived the finalization
    /// delay without an open flag or dispute. Permissionless.
    pub fn finalize_contribution(ctx: Context<FinalizeContribution>) -> Result<()> {
        instructions::finalize_contribution::handler(ctx)
    }

    // ========================================================================
    // Dispute resolver
    // ========================================================================

    /// Challenge a pending contribution by posting the dispute bond.
    pub fn raise_dispute(ctx: Context<RaiseDispute>, reason: String) -> Result<()> {
        instructions::raise_dispute::handler(ctx, reason)
    }

    /// Submit a sealed vote during the commit window.
    pub fn commit_vote(ctx: Context<CommitVote>, commitment: [u8; 32]) -> Result<()> {
        instructions::commit_vote::handler(ctx, commitment)
    }

    /// Reveal a sealed vote during the reveal window.
    pub fn reveal_vote(ctx: Context<RevealVote>, vote_valid: bool, salt: [u8; 32]) -> Result<()> {
        instructions::reveal_vote::handler(ctx, vote_valid, salt)
    }

    /// Tally reveals and settle the dispute and its record. Permissionless
    /// once the reveal window has closed.
    pub fn resolve_dispute(ctx: Context<ResolveDispute>) -> Result<()> {
        instructions::resolve_dispute::handler(ctx)
    }

    /// Slash a confirmer of an overturned contribution. Permissionless;
    /// disabled when `overturn_slash_bps` is zero.
    pub fn apply_overturn_slash(ctx: Context<ApplyOverturnSlash>) -> Result<()> {
        instructions::apply_overturn_slash::handler(ctx)
    }
}
