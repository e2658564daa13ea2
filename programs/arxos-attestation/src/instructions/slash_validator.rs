//! Administrative slashing (multisig gated)

use crate::errors::AttestationError;
use crate::events::ValidatorSlashed;
use crate::instructions::stake_helpers::apply_slash;
use crate::instructions::token_helpers::transfer_from_vault;
use crate::state::{ProtocolConfig, SlashReason, StakeAccount};
use crate::utils::multisig::require_multisig;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct SlashValidator<'info> {
    #[account(
        mut,
        seeds = [b"stake", stake.validator.as_ref()],
        bump = stake.bump
    )]
    pub stake: Account<'info, StakeAccount>,

    #[account(
        mut,
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        mut,
        address = protocol_config.stake_vault @ AttestationError::InvalidTokenAccount
    )]
    pub stake_vault: Account<'info, TokenAccount>,

    #[account(
        mut,
        address = protocol_config.treasury @ AttestationError::InvalidTokenAccount
    )]
    pub treasury: Account<'info, TokenAccount>,

    pub token_program: Program<'info, Token>,
}

/// Reduces active stake by `amount`, clamped at zero. Pending withdrawals
/// are not touched. Slashed tokens go to the treasury.
pub fn handler(ctx: Context<SlashValidator>, amount: u64, reason: u8) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    let reason = SlashReason::try_from(reason)?;
    require!(amount > 0, AttestationError::InvalidAmount);
    require_multisig(&ctx.accounts.protocol_config, ctx.remaining_accounts)?;

    let clock = Clock::get()?;
    let stake = &mut ctx.accounts.stake;
    let slashed = apply_slash(stake, amount)?;

    let config_info = ctx.accounts.protocol_config.to_account_info();
    let config = &mut ctx.accounts.protocol_config;
    config.total_staked = config
        .total_staked
        .checked_sub(slashed)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    config.total_slashed = config
        .total_slashed
        .checked_add(slashed)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    transfer_from_vault(
        &ctx.accounts.stake_vault,
        &ctx.accounts.treasury.to_account_info(),
        &config_info,
        slashed,
        config.bump,
        &ctx.accounts.token_program,
    )?;

    msg!(
        "Validator slashed: {} requested={} slashed={} reason={:?}",
        stake.validator,
        amount,
        slashed,
        reason
    );

    emit!(ValidatorSlashed {
        validator: stake.validator,
        requested: amount,
        slashed,
        remaining_stake: stake.active_stake,
        reason: reason as u8,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
