//! Terminal transitions of a contribution record.
//!
//! Used by `finalize_contribution` (undisputed payout) and `resolve_dispute`
//! (Upheld payout or Overturned cancellation) so both paths settle the same
//! way.

use crate::errors::AttestationError;
use crate::events::{ContributionCancelled, ContributionFinalized};
use crate::instructions::contribution_helpers::{
    calculate_payout_split, mark_cancelled, mark_finalized, PayoutSplit,
};
use crate::instructions::token_helpers::{mint_from_protocol, validate_token_account};
use crate::state::{ContributionRecord, ProtocolConfig};
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

/// Token accounts a payout mints into.
pub struct PayoutAccounts<'a, 'info> {
    pub mint: &'a Account<'info, Mint>,
    pub worker_token_account: &'a Account<'info, TokenAccount>,
    pub building_token_account: &'a Account<'info, TokenAccount>,
    pub maintainer_pool: &'a Account<'info, TokenAccount>,
    pub treasury: &'a Account<'info, TokenAccount>,
    /// Config PDA as mint authority
    pub protocol_config: AccountInfo<'info>,
    pub token_program: &'a Program<'info, Token>,
}

impl<'a, 'info> PayoutAccounts<'a, 'info> {
    /// Worker and building accounts must belong to the record's worker and
    /// snapshotted wallet; pool accounts must be the configured ones.
    pub fn validate(&self, record: &ContributionRecord, config: &ProtocolConfig) -> Result<()> {
        require_keys_eq!(self.mint.key(), config.mint, AttestationError::InvalidMint);
        validate_token_account(self.worker_token_account, &config.mint, &record.worker)?;
        validate_token_account(
            self.building_token_account,
            &config.mint,
            &record.building_wallet,
        )?;
        require_keys_eq!(
            self.maintainer_pool.key(),
            config.maintainer_pool,
            AttestationError::InvalidTokenAccount
        );
        require_keys_eq!(
            self.treasury.key(),
            config.treasury,
            AttestationError::InvalidTokenAccount
        );
        Ok(())
    }

    fn mint_to(
        &self,
        destination: &Account<'info, TokenAccount>,
        amount: u64,
        bump: u8,
    ) -> Result<()> {
        mint_from_protocol(
            self.mint,
            &destination.to_account_info(),
            &self.protocol_config,
            amount,
            bump,
            self.token_program,
        )
    }
}

/// Mark the record Finalized and mint the 70/10/10/10 split.
pub fn pay_out_contribution(
    record: &mut ContributionRecord,
    config: &mut ProtocolConfig,
    accounts: &PayoutAccounts,
    now: i64,
) -> Result<PayoutSplit> {
    accounts.validate(record, config)?;

    let split = calculate_payout_split(record.amount)?;
    mark_finalized(record, now)?;

    accounts.mint_to(accounts.worker_token_account, split.worker, config.bump)?;
    accounts.mint_to(accounts.building_token_account, split.building, config.bump)?;
    accounts.mint_to(accounts.maintainer_pool, split.maintainer, config.bump)?;
    accounts.mint_to(accounts.treasury, split.treasury, config.bump)?;

    config.finalized_contributions = config
        .finalized_contributions
        .checked_add(1)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    config.total_value_distributed = config
        .total_value_distributed
        .checked_add(record.amount)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    msg!(
        "Contribution finalized: amount={} worker={} building={} maintainer={} treasury={}",
        record.amount,
        split.worker,
        split.building,
        split.maintainer,
        split.treasury
    );

    emit!(ContributionFinalized {
        contribution_key: record.contribution_key,
        worker: record.worker,
        building_wallet: record.building_wallet,
        amount: record.amount,
        worker_share: split.worker,
        building_share: split.building,
        maintainer_share: split.maintainer,
        treasury_share: split.treasury,
        timestamp: now,
    });

    Ok(split)
}

/// Mark the record Cancelled. Nothing is minted.
pub fn cancel_contribution(
    record: &mut ContributionRecord,
    config: &mut ProtocolConfig,
    now: i64,
) -> Result<()> {
    mark_cancelled(record, now)?;

    config.cancelled_contributions = config
        .cancelled_contributions
        .checked_add(1)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    msg!("Contribution cancelled: amount={}", record.amount);

    emit!(ContributionCancelled {
        contribution_key: record.contribution_key,
        amount: record.amount,
        timestamp: now,
    });

    Ok(())
}
