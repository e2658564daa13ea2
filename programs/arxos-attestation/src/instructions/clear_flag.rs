//! Clear an advisory flag (multisig gated)

use crate::events::ContributionFlagCleared;
use crate::instructions::contribution_helpers::remove_flag;
use crate::state::{ContributionRecord, ProtocolConfig};
use crate::utils::multisig::require_multisig;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct ClearFlag<'info> {
    #[account(
        mut,
        seeds = [b"contribution", contribution.contribution_key.as_ref()],
        bump = contribution.bump
    )]
    pub contribution: Box<Account<'info, ContributionRecord>>,

    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,
}

pub fn handler(ctx: Context<ClearFlag>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    require_multisig(&ctx.accounts.protocol_config, ctx.remaining_accounts)?;

    let record = &mut ctx.accounts.contribution;
    let flagged_by = record.flagged_by;
    remove_flag(record)?;

    msg!("Contribution flag cleared (raised by {})", flagged_by);

    emit!(ContributionFlagCleared {
        contribution_key: record.contribution_key,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
