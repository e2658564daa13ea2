//! Reassign a building's payout wallet (registrar only)
//!
//! In-flight contribution records keep the wallet they snapshotted.

use crate::errors::AttestationError;
use crate::events::BuildingWalletUpdated;
use crate::state::{BuildingRegistration, ProtocolConfig};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct UpdateBuildingWallet<'info> {
    #[account(
        mut,
        seeds = [b"building", building.building_id.as_ref()],
        bump = building.bump
    )]
    pub building: Account<'info, BuildingRegistration>,

    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump,
        has_one = registrar @ AttestationError::UnauthorizedRegistrar
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    pub registrar: Signer<'info>,
}

pub fn handler(ctx: Context<UpdateBuildingWallet>, wallet: Pubkey) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    require!(
        wallet != Pubkey::default(),
        AttestationError::InvalidBuildingWallet
    );

    let clock = Clock::get()?;
    let building = &mut ctx.accounts.building;
    let old_wallet = building.wallet;
    building.wallet = wallet;
    building.updated_at = clock.unix_timestamp;

    msg!("Building wallet updated: {} -> {}", old_wallet, wallet);

    emit!(BuildingWalletUpdated {
        building_id: building.building_id,
        old_wallet,
        new_wallet: wallet,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
