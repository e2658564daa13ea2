//! Slash a confirmer of a contribution whose dispute was Overturned
//!
//! Permissionless, opt-in through `overturn_slash_bps`, applied at most once
//! per (dispute, validator) and only within the slash window after the ruling.
//! The slash covers stake already queued for withdrawal.

use crate::errors::AttestationError;
use crate::events::OverturnSlashApplied;
use crate::instructions::stake_helpers::{apply_bonded_bps_slash, validate_slash_window};
use crate::instructions::token_helpers::transfer_from_vault;
use crate::state::{
    ContributionRecord, Dispute, OverturnSlash, ProtocolConfig, Ruling, StakeAccount,
};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct ApplyOverturnSlash<'info> {
    #[account(
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
        payer = payer,
        space = OverturnSlash::SIZE,
        seeds = [b"overturn_slash", dispute.key().as_ref(), stake.validator.as_ref()],
        bump
    )]
    pub overturn_slash: Account<'info, OverturnSlash>,

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

    #[account(mut)]
    pub payer: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<ApplyOverturnSlash>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    let bps = ctx.accounts.protocol_config.overturn_slash_bps;
    let dispute = &ctx.accounts.dispute;

    require!(bps > 0, AttestationError::OverturnSlashDisabled);
    require!(
        dispute.ruling == Ruling::Overturned,
        AttestationError::RulingNotOverturned
    );
    validate_slash_window(dispute.resolved_at, now)?;

    let validator = ctx.accounts.stake.validator;
    require!(
        ctx.accounts.contribution.is_confirmed_by(&validator),
        AttestationError::ValidatorNotConfirmer
    );
    require!(
        !ctx.accounts.overturn_slash.is_applied(),
        AttestationError::SlashAlreadyApplied
    );

    let stake = &mut ctx.accounts.stake;
    let slashed = apply_bonded_bps_slash(stake, bps)?;

    let marker = &mut ctx.accounts.overturn_slash;
    marker.dispute = dispute.key();
    marker.validator = validator;
    marker.amount = slashed;
    marker.applied_at = now;
    marker.bump = ctx.bumps.overturn_slash;

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
        "Overturn slash applied to {}: {} ({} bps)",
        validator,
        slashed,
        bps
    );

    emit!(OverturnSlashApplied {
        contribution_key: dispute.contribution_key,
        validator,
        slashed,
        timestamp: now,
    });

    Ok(())
}
