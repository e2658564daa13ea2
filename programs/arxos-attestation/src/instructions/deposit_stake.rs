//! Bond stake into the stake vault

use crate::errors::AttestationError;
use crate::events::StakeDeposited;
use crate::instructions::stake_helpers::{apply_deposit, initialize_stake};
use crate::instructions::token_helpers::transfer_into_vault;
use crate::state::{ProtocolConfig, StakeAccount};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct DepositStake<'info> {
    /// Created on first deposit
    #[account(
        init_if_needed,
        payer = validator,
        space = StakeAccount::SIZE,
        seeds = [b"stake", validator.key().as_ref()],
        bump
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

    #[account(mut)]
    pub validator: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<DepositStake>, amount: u64) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let validator = ctx.accounts.validator.key();

    let stake = &mut ctx.accounts.stake;
    initialize_stake(stake, validator, clock.unix_timestamp, ctx.bumps.stake);
    let active_stake = apply_deposit(stake, amount)?;

    let config = &mut ctx.accounts.protocol_config;
    config.total_staked = config
        .total_staked
        .checked_add(amount)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    transfer_into_vault(
        &ctx.accounts.validator_token_account,
        &ctx.accounts.stake_vault,
        &ctx.accounts.validator.to_account_info(),
        amount,
        &ctx.accounts.token_program,
    )?;

    msg!(
        "Stake deposited: validator={} amount={} active={}",
        validator,
        amount,
        active_stake
    );

    emit!(StakeDeposited {
        validator,
        amount,
        active_stake,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
