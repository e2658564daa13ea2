//! Update tunable protocol parameters (multisig gated)

use anchor_lang::prelude::*;

use crate::events::ProtocolParamsUpdated;
use crate::state::{ProtocolConfig, ProtocolParams};
use crate::utils::multisig::require_multisig;
use crate::utils::version::check_version_compatible;

#[derive(Accounts)]
pub struct UpdateProtocolParams<'info> {
    #[account(
        mut,
        seeds = [b"protocol"],
        bump = protocol_config.bump
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,
}

/// Open disputes keep the deadlines they were opened with.
pub fn handler(ctx: Context<UpdateProtocolParams>, params: ProtocolParams) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    params.validate()?;
    require_multisig(&ctx.accounts.protocol_config, ctx.remaining_accounts)?;

    let config = &mut ctx.accounts.protocol_config;
    config.apply_params(&params);

    msg!(
        "Protocol params updated: min_stake={} min_confirmations={} bond={} slash_bps={}",
        params.min_stake,
        params.min_confirmations,
        params.dispute_bond,
        params.overturn_slash_bps
    );

    emit!(ProtocolParamsUpdated {
        min_stake: params.min_stake,
        min_confirmations: params.min_confirmations,
        finalization_delay: params.finalization_delay,
        withdrawal_delay: params.withdrawal_delay,
        commit_period: params.commit_period,
        reveal_period: params.reveal_period,
        dispute_bond: params.dispute_bond,
        overturn_slash_bps: params.overturn_slash_bps,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
