//! Raise an advisory flag on a pending contribution
//!
//! The flag carries no bond and no vote. It blocks finalization until the
//! multisig clears it or a bonded dispute ruling supersedes it.

use crate::errors::AttestationError;
use crate::events::ContributionFlagged;
use crate::instructions::contribution_helpers::apply_flag;
use crate::instructions::stake_helpers::require_qualified;
use crate::state::{ContributionRecord, ProtocolConfig, StakeAccount};
use crate::utils::validation::validate_reason;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct FlagContribution<'info> {
    #[account(
        mut,
        seeds = [b"contribution", contribution.contribution_key.as_ref()],
        bump = contribution.bump
    )]
    pub contribution: Box<Account<'info, ContributionRecord>>,

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

    pub validator: Signer<'info>,
}

pub fn handler(ctx: Context<FlagContribution>, reason: String) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;

    let validator = ctx.accounts.validator.key();
    require_qualified(&ctx.accounts.stake, &validator, config.min_stake)?;
    validate_reason(&reason)?;

    let record = &mut ctx.accounts.contribution;
    apply_flag(record, validator)?;

    msg!("Contribution flagged by {}: {}", validator, reason);

    emit!(ContributionFlagged {
        contribution_key: record.contribution_key,
        validator,
        reason,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
