//! Tally revealed votes and settle a bonded dispute
//!
//! Permissionless once the reveal window has closed.
//!
//! - Upheld (Valid majority, tie or no reveals): the bond goes to the
//!   treasury. The record is paid out now if it already meets quorum and the
//!   finalization delay, otherwise it returns to the ordinary finalize flow.
//! - Overturned (Invalid majority): the bond is returned to a token account
//!   of the challenger and the record is cancelled without payout.

use crate::errors::AttestationError;
use crate::events::DisputeResolved;
use crate::instructions::contribution_helpers::check_finalizable;
use crate::instructions::dispute_helpers::{check_resolvable, close_dispute, tally_ruling};
use crate::instructions::settlement_helpers::{
    cancel_contribution, pay_out_contribution, PayoutAccounts,
};
use crate::instructions::token_helpers::{transfer_from_vault, validate_refund_account};
use crate::state::{ContributionRecord, Dispute, ProtocolConfig, Ruling};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct ResolveDispute<'info> {
    #[account(
        mut,
        seeds = [b"dispute", contribution.key().as_ref()],
        bump = dispute.bump,
        has_one = contribution @ AttestationError::DisputeNotFound
    )]
    pub dispute: Box<Account<'info, Dispute>>,

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
        address = protocol_config.bond_vault @ AttestationError::InvalidTokenAccount
    )]
    pub bond_vault: Box<Account<'info, TokenAccount>>,

    /// Refund destination, needed only for an Overturned ruling. Any token
    /// account of the challenger on the protocol mint.
    #[account(mut)]
    pub challenger_token_account: Option<Box<Account<'info, TokenAccount>>>,

    #[account(
        mut,
        address = protocol_config.mint @ AttestationError::InvalidMint
    )]
    pub mint: Box<Account<'info, Mint>>,

    #[account(mut)]
    pub worker_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub building_token_account: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub maintainer_pool: Box<Account<'info, TokenAccount>>,

    #[account(
        mut,
        address = protocol_config.treasury @ AttestationError::InvalidTokenAccount
    )]
    pub treasury: Box<Account<'info, TokenAccount>>,

    pub token_program: Program<'info, Token>,
}

pub fn handler(ctx: Context<ResolveDispute>) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let now = clock.unix_timestamp;
    let config_info = ctx.accounts.protocol_config.to_account_info();
    let accounts = ctx.accounts;

    check_resolvable(&accounts.dispute, now)?;

    let (ruling, outcome) =
        tally_ruling(accounts.dispute.valid_votes, accounts.dispute.invalid_votes);
    close_dispute(&mut accounts.dispute, &mut accounts.contribution, ruling, now);

    let bond_amount = accounts.dispute.bond_amount;
    let config_bump = accounts.protocol_config.bump;
    let mut paid_out = false;

    if ruling == Ruling::Overturned {
        let refund_account = accounts.challenger_token_account.as_deref();
        validate_refund_account(
            refund_account.map(|account| &**account),
            &accounts.dispute.challenger,
            &accounts.protocol_config.mint,
        )?;
        let refund_info = refund_account
            .map(|account| account.to_account_info())
            .ok_or(AttestationError::InvalidTokenAccount)?;
        transfer_from_vault(
            &accounts.bond_vault,
            &refund_info,
            &config_info,
            bond_amount,
            config_bump,
            &accounts.token_program,
        )?;
        cancel_contribution(&mut accounts.contribution, &mut accounts.protocol_config, now)?;
    } else {
        transfer_from_vault(
            &accounts.bond_vault,
            &accounts.treasury.to_account_info(),
            &config_info,
            bond_amount,
            config_bump,
            &accounts.token_program,
        )?;

        let finalizable = check_finalizable(
            &accounts.contribution,
            now,
            accounts.protocol_config.min_confirmations,
            accounts.protocol_config.finalization_delay,
        )
        .is_ok();

        if finalizable {
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
                now,
            )?;
            paid_out = true;
        }
    }

    let dispute = &accounts.dispute;
    msg!(
        "Dispute resolved: ruling={:?} valid={} invalid={} paid_out={}",
        ruling,
        dispute.valid_votes,
        dispute.invalid_votes,
        paid_out
    );

    emit!(DisputeResolved {
        contribution_key: dispute.contribution_key,
        challenger: dispute.challenger,
        ruling: ruling as u8,
        outcome,
        valid_votes: dispute.valid_votes,
        invalid_votes: dispute.invalid_votes,
        bond_amount,
        paid_out,
        timestamp: now,
    });

    Ok(())
}
