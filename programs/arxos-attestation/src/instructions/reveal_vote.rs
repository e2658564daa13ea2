//! Reveal a sealed dispute vote

use crate::errors::AttestationError;
use crate::events::VoteRevealed;
use crate::instructions::dispute_helpers::record_reveal;
use crate::state::{ContributionRecord, Dispute, ProtocolConfig, VoteCommitment};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct RevealVote<'info> {
    #[account(
        mut,
        seeds = [b"dispute", dispute.contribution.as_ref()],
        bump = dispute.bump
    )]
    pub dispute: Box<Account<'info, Dispute>>,

    #[account(address = dispute.contribution @ AttestationError::DisputeNotFound)]
    pub contribution: Box<Account<'info, ContributionRecord>>,

    /// Absent when the validator never committed
    #[account(
        mut,
        seeds = [b"vote", dispute.key().as_ref(), validator.key().as_ref()],
        bump = vote.bump,
        has_one = dispute @ AttestationError::DisputeNotFound
    )]
    pub vote: Account<'info, VoteCommitment>,

    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    pub validator: Signer<'info>,
}

pub fn handler(ctx: Context<RevealVote>, vote_valid: bool, salt: [u8; 32]) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let dispute = &mut ctx.accounts.dispute;
    let vote = &mut ctx.accounts.vote;
    record_reveal(
        dispute,
        vote,
        &ctx.accounts.contribution,
        vote_valid,
        &salt,
        clock.unix_timestamp,
    )?;

    msg!(
        "Vote revealed by {}: valid={} (valid={} invalid={})",
        vote.voter,
        vote_valid,
        dispute.valid_votes,
        dispute.invalid_votes
    );

    emit!(VoteRevealed {
        contribution_key: dispute.contribution_key,
        voter: vote.voter,
        vote_valid,
        valid_votes: dispute.valid_votes,
        invalid_votes: dispute.invalid_votes,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
