//! Pay out a contribution that met quorum and outlived the finalization delay

use crate::errors::AttestationError;
use crate::instructions::contribution_helpers::check_finalizable;
use crate::instructions::settlement_helpers::{pay_out_contribution, PayoutAccounts};
use crate::state::{ContributionRecord, ProtocolConfig};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct FinalizeContribution<'info> {
    #[account(
        mut,
        seeds = [b"contribution", contribution.contribution_key.as_ref()],
        bump = contribution.bump
    )]
    pub contribution: Box<Account<'info, ContributionRecord>>,

    #[account(
        mut,
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        mut,
        address = protocol_config.mint @ AttestationError::InvalidMint
    )]
    pub mint: Box<Account<'info, Mint>>,

    /// Owned by the record's worker
    #[account(mut)]
    pub worker_token_account: Box<Account<'info, TokenAccount>>,

    /// Owned by the building wallet snapshotted on the record
    #[account(mut)]
    pub building_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub maintainer_pool: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub treasury: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

/// Permissionless once every gate passes.
pub fn handler(ctx: Context<FinalizeContribution>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let config_info = ctx.accounts.protocol_config.to_account_info();
    let accounts = ctx.accounts;

    check_finalizable(
        &accounts.contribution,
        clock.unix_timestamp,
        accounts.protocol_config.min_confirmations,
        accounts.protocol_config.finalization_delay,
    )?;

    let payout = PayoutAccounts {
        mint: &accounts.mint,
        worker_token_account: &accounts.worker_token_account,
        building_token_account: &accounts.building_token_account,
        maintainer_pool: &accounts.maintainer_pool,
        treasury: &accounts.treasury,
        protocol_config: config_info,
        token_program: &accounts.token_program,
    };
    pay_out_contribution(
        &mut accounts.contribution,
        &mut accounts.protocol_config,
        &payout,
        clock.unix_timestamp,
    )?;

    Ok(())
}
