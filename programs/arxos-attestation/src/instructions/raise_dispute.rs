//! Open a bonded dispute against a pending contribution
//!
//! One bonded dispute per record. The bond moves into the bond vault and the
//! record is blocked from finalization until the dispute is resolved.

use crate::errors::AttestationError;
use crate::events::DisputeRaised;
use crate::instructions::dispute_helpers::{open_dispute, reason_hash, DisputeOpening};
use crate::instructions::token_helpers::transfer_into_vault;
use crate::state::{ContributionRecord, Dispute, ProtocolConfig};
use crate::utils::validation::validate_reason;
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Token, TokenAccount};

#[derive(Accounts)]
pub struct RaiseDispute<'info> {
    #[account(
        mut,
        seeds = [b"contribution", contribution.contribution_key.as_ref()],
        bump = contribution.bump
    )]
    pub contribution: Box<Account<'info, ContributionRecord>>,

    /// Reused on a second attempt so it fails with a typed error
    #[account(
        init_if_needed,
        payer = challenger,
        space = Dispute::SIZE,
        seeds = [b"dispute", contribution.key().as_ref()],
        bump
    )]
    pub dispute: Box<Account<'info, Dispute>>,

    #[account(
        mut,
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    #[account(
        mut,
        address = protocol_config.bond_vault @ AttestationError::InvalidTokenAccount
    )]
    pub bond_vault: Account<'info, TokenAccount>,

    /// Bond source; a ruling in the challenger's favour returns it here
    #[account(
        mut,
        constraint = challenger_token_account.owner == challenger.key() @ AttestationError::InvalidTokenAccount,
        constraint = challenger_token_account.mint == protocol_config.mint @ AttestationError::InvalidMint
    )]
    pub challenger_token_account: Account<'info, TokenAccount>,

    #[account(mut)]
    pub challenger: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<RaiseDispute>, reason: String) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    validate_reason(&reason)?;

    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    let challenger = ctx.accounts.challenger.key();
    let bond_amount = ctx.accounts.protocol_config.dispute_bond;

    let opening = DisputeOpening {
        contribution: ctx.accounts.contribution.key(),
        challenger,
        challenger_token_account: ctx.accounts.challenger_token_account.key(),
        bond_amount,
        reason_hash: reason_hash(&reason),
        commit_period: ctx.accounts.protocol_config.commit_period,
        reveal_period: ctx.accounts.protocol_config.reveal_period,
        bump: ctx.bumps.dispute,
    };
    let dispute = &mut ctx.accounts.dispute;
    open_dispute(dispute, &mut ctx.accounts.contribution, opening, now)?;

    let config = &mut ctx.accounts.protocol_config;
    config.total_disputes = config
        .total_disputes
        .checked_add(1)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    transfer_into_vault(
        &ctx.accounts.challenger_token_account,
        &ctx.accounts.bond_vault,
        &ctx.accounts.challenger.to_account_info(),
        bond_amount,
        &ctx.accounts.token_program,
    )?;

    msg!(
        "Dispute raised by {} with bond {}; reveals close at {}",
        challenger,
        bond_amount,
        dispute.reveal_deadline
    );

    emit!(DisputeRaised {
        contribution_key: dispute.contribution_key,
        challenger,
        bond_amount,
        reason,
        commit_deadline: dispute.commit_deadline,
        reveal_deadline: dispute.reveal_deadline,
        timestamp: now,
    });

    Ok(())
}
