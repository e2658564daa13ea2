//! Register a building and its payout wallet (registrar only)

use crate::errors::AttestationError;
use crate::events::BuildingRegistered;
use crate::state::{BuildingRegistration, ProtocolConfig};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
#[instruction(building_id: [u8; 32])]
pub struct RegisterBuilding<'info> {
    #[account(
        init,
        payer = registrar,
        space = BuildingRegistration::SIZE,
        seeds = [b"building", building_id.as_ref()],
        bump
    )]
    pub building: Account<'info, BuildingRegistration>,

    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump,
        has_one = registrar @ AttestationError::UnauthorizedRegistrar
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    #[account(mut)]
    pub registrar: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<RegisterBuilding>, building_id: [u8; 32], wallet: Pubkey) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;
    require!(
        wallet != Pubkey::default(),
        AttestationError::InvalidBuildingWallet
    );

    let clock = Clock::get()?;
    let building = &mut ctx.accounts.building;
    building.building_id = building_id;
    building.wallet = wallet;
    building.registered_at = clock.unix_timestamp;
    building.updated_at = clock.unix_timestamp;
    building.bump = ctx.bumps.building;

    msg!("Building registered with wallet {}", wallet);

    emit!(BuildingRegistered {
        building_id,
        wallet,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
