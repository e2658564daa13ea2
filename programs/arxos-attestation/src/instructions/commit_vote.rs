//! Submit a sealed dispute vote

use crate::errors::AttestationError;
use crate::events::VoteCommitted;
use crate::instructions::dispute_helpers::record_commit;
use crate::instructions::stake_helpers::require_qualified;
use crate::state::{ContributionRecord, Dispute, ProtocolConfig, StakeAccount, VoteCommitment};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct CommitVote<'info> {
    #[account(
        mut,
        seeds = [b"dispute", contribution.key().as_ref()],
        bump = dispute.bump,
        has_one = contribution @ AttestationError::DisputeNotFound
    )]
    pub dispute: Box<Account<'info, Dispute>>,

    #[account(
        seeds = [b"contribution", contribution.contribution_key.as_ref()],
        bump = contribution.bump
    )]
    pub contribution: Box<Account<'info, ContributionRecord>>,

    #[account(
        init_if_needed,
        payer = validator,
        space = VoteCommitment::SIZE,
        seeds = [b"vote", dispute.key().as_ref(), validator.key().as_ref()],
        bump
    )]
    pub vote: Account<'info, VoteCommitment>,

    #[account(
        seeds = [b"stake", validator.key().as_ref()],
        bump = stake.bump
    )]
    pub stake: Account<'info, StakeAccount>,

    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(mut)]
    pub validator: Signer<'info>,

    pub system_program: Program<'info, System>,
}

/// `commitment` = sha256(domain, contribution_key, validator, vote, salt)
pub fn handler(ctx: Context<CommitVote>, commitment: [u8; 32]) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;

    let clock = Clock::get()?;
    let validator = ctx.accounts.validator.key();
    require_qualified(&ctx.accounts.stake, &validator, config.min_stake)?;

    let dispute_key = ctx.accounts.dispute.key();
    let dispute = &mut ctx.accounts.dispute;
    record_commit(
        dispute,
        &mut ctx.accounts.vote,
        &ctx.accounts.contribution,
        dispute_key,
        validator,
        commitment,
        clock.unix_timestamp,
        ctx.bumps.vote,
    )?;

    msg!(
        "Vote committed by {} ({} commitments)",
        validator,
        dispute.commit_count
    );

    emit!(VoteCommitted {
        contribution_key: dispute.contribution_key,
        voter: validator,
        commit_count: dispute.commit_count,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
