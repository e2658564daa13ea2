//! Release unlocked stake back to the validator

use crate::errors::AttestationError;
use crate::events::WithdrawalCompleted;
use crate::instructions::stake_helpers::apply_withdrawal_completion;
use crate::instructions::token_helpers::transfer_from_vault;
use crate::state::{ProtocolConfig, StakeAccount};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct CompleteWithdrawal<'info> {
    #[account(
        mut,
        seeds = [b"stake", validator.key().as_ref()],
        bump = stake.bump,
        has_one = validator @ AttestationError::UnauthorizedValidator
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
        constraint = validator_token_account.owner == validator.key() @ AttestationError::InvalidTokenAccount,
        constraint = validator_token_account.mint == protocol_config.mint @ AttestationError::InvalidMint
    )]
    pub validator_token_account: Account<'info, TokenAccount>,

    pub validator: Signer<'info>,

    pub token_program: Program<'info, Token>,
}

pub fn handler(ctx: Context<CompleteWithdrawal>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let released = apply_withdrawal_completion(&mut ctx.accounts.stake, clock.unix_timestamp)?;

    let config_info = ctx.accounts.protocol_config.to_account_info();
    let config = &mut ctx.accounts.protocol_config;
    config.total_staked = config
        .total_staked
        .checked_sub(released)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    transfer_from_vault(
        &ctx.accounts.stake_vault,
        &ctx.accounts.validator_token_account.to_account_info(),
        &config_info,
        released,
        config.bump,
        &ctx.accounts.token_program,
    )?;

    msg!(
        "Withdrawal completed: validator={} amount={}",
        ctx.accounts.validator.key(),
        released
    );

    emit!(WithdrawalCompleted {
        validator: ctx.accounts.validator.key(),
        amount: released,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
