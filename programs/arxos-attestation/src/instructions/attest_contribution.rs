//! Attest a contribution with a worker-signed, single-use proof
//!
//! The first valid attestation for a (building, worker, amount) triple
//! creates the record; later attestations by other qualified validators add
//! confirmations. Each (proof, signature) pair is consumed exactly once
//! across the whole protocol.

use crate::errors::AttestationError;
use crate::events::{ContributionConfirmed, ContributionProposed};
use crate::instructions::contribution_helpers::{
    self, add_confirmation, initialize_record, validate_proof_binding, ContributionProof,
};
use crate::instructions::stake_helpers::require_qualified;
use crate::state::{
    BuildingRegistration, ConsumedProof, ContributionRecord, ProtocolConfig, StakeAccount,
    WorkerRegistration,
};
use crate::utils::ed25519::{verify_preceding_ed25519, SIGNATURE_LEN};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::sysvar::instructions as sysvar_instructions;

#[derive(Accounts)]
#[instruction(
    building_id: [u8; 32],
    worker: Pubkey,
    amount: u64,
    contribution_key: [u8; 32],
    proof_digest: [u8; 32]
)]
pub struct AttestContribution<'info> {
    /// Created by the first attestation for this key
    #[account(
        init_if_needed,
        payer = validator,
        space = ContributionRecord::SIZE,
        seeds = [b"contribution", contribution_key.as_ref()],
        bump
    )]
    pub contribution: Box<Account<'info, ContributionRecord>>,

    /// Replay marker for this (proof, signature) pair
    #[account(
        init_if_needed,
        payer = validator,
        space = ConsumedProof::SIZE,
        seeds = [b"proof", proof_digest.as_ref()],
        bump
    )]
    pub consumed_proof: Box<Account<'info, ConsumedProof>>,

    #[account(
        seeds = [b"stake", validator.key().as_ref()],
        bump = stake.bump
    )]
    pub stake: Account<'info, StakeAccount>,

    #[account(
        seeds = [b"building", building_id.as_ref()],
        bump = building.bump
    )]
    pub building: Account<'info, BuildingRegistration>,

    #[account(
        seeds = [b"worker", worker.as_ref()],
        bump = worker_registration.bump
    )]
    pub worker_registration: Account<'info, WorkerRegistration>,

    #[account(
        mut,
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    /// CHECK: Address constrained to the instructions sysvar
    #[account(address = sysvar_instructions::ID)]
    pub instructions_sysvar: UncheckedAccount<'info>,

    #[account(mut)]
    pub validator: Signer<'info>,

    pub system_program: Program<'info, System>,
}

#[allow(clippy::too_many_arguments)]
pub fn handler(
    ctx: Context<AttestContribution>,
    building_id: [u8; 32],
    worker: Pubkey,
    amount: u64,
    contribution_key: [u8; 32],
    proof_digest: [u8; 32],
    proof: ContributionProof,
    signature: [u8; SIGNATURE_LEN],
) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;

    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    let validator = ctx.accounts.validator.key();

    require_qualified(&ctx.accounts.stake, &validator, config.min_stake)?;
    require!(amount > 0, AttestationError::InvalidAmount);
    require!(
        ctx.accounts.worker_registration.active,
        AttestationError::WorkerNotActive
    );

    // PDA seeds come from the client; recompute both
    require!(
        contribution_helpers::contribution_key(&building_id, &worker, amount) == contribution_key,
        AttestationError::InvalidContributionKey
    );
    let message = proof.message(&crate::ID);
    require!(
        contribution_helpers::proof_digest(&message, &signature) == proof_digest,
        AttestationError::InvalidProofDigest
    );

    require!(
        !ctx.accounts.consumed_proof.is_consumed(),
        AttestationError::ProofAlreadyConsumed
    );

    validate_proof_binding(&proof, &building_id, &worker, amount, now)?;
    verify_preceding_ed25519(
        &ctx.accounts.instructions_sysvar.to_account_info(),
        &worker,
        &message,
        &signature,
    )?;

    let contribution_address = ctx.accounts.contribution.key();
    let record = &mut ctx.accounts.contribution;
    let created = record.proposed_at == 0;
    if created {
        initialize_record(
            record,
            contribution_key,
            building_id,
            worker,
            ctx.accounts.building.wallet,
            amount,
            now,
            ctx.bumps.contribution,
        );
    }
    let confirmations = add_confirmation(record, validator)?;

    let consumed = &mut ctx.accounts.consumed_proof;
    consumed.digest = proof_digest;
    consumed.contribution = contribution_address;
    consumed.validator = validator;
    consumed.consumed_at = now;
    consumed.bump = ctx.bumps.consumed_proof;

    if created {
        let config = &mut ctx.accounts.protocol_config;
        config.total_contributions = config
            .total_contributions
            .checked_add(1)
            .ok_or(AttestationError::ArithmeticOverflow)?;

        msg!(
            "Contribution proposed: worker={} amount={} by {}",
            worker,
            amount,
            validator
        );

        emit!(ContributionProposed {
            contribution_key,
            building_id,
            worker,
            building_wallet: record.building_wallet,
            amount,
            validator,
            proof_digest,
            timestamp: now,
        });
    } else {
        msg!(
            "Contribution confirmed by {} ({} confirmations)",
            validator,
            confirmations
        );

        emit!(ContributionConfirmed {
            contribution_key,
            validator,
            confirmations,
            proof_digest,
            timestamp: now,
        });
    }

    Ok(())
}
