//! Move active stake into the pending withdrawal balance

use crate::errors::AttestationError;
use crate::events::WithdrawalRequested;
use crate::instructions::stake_helpers::apply_withdrawal_request;
use crate::state::{ProtocolConfig, StakeAccount};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct RequestWithdrawal<'info> {
    #[account(
        mut,
        seeds = [b"stake", validator.key().as_ref()],
        bump = stake.bump,
        has_one = validator @ AttestationError::UnauthorizedValidator
    )]
    pub stake: Account<'info, StakeAccount>,

    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    pub validator: Signer<'info>,
}

/// A second request adds to the pending balance and restarts its timer.
pub fn handler(ctx: Context<RequestWithdrawal>, amount: u64) -> Result<()> {
    let config = &ctx.accounts.protocol_config;
    check_version_compatible(config)?;

    let clock = Clock::get()?;
    let stake = &mut ctx.accounts.stake;
    let unlock_time =
        apply_withdrawal_request(stake, amount, clock.unix_timestamp, config.withdrawal_delay)?;

    msg!(
        "Withdrawal requested: validator={} amount={} unlock_time={}",
        stake.validator,
        amount,
        unlock_time
    );

    emit!(WithdrawalRequested {
        validator: stake.validator,
        amount,
        active_stake: stake.active_stake,
        pending_withdrawal: stake.pending_withdrawal,
        unlock_time,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
