//! Register a worker on the registry boundary (registrar only)

use crate::errors::AttestationError;
use crate::events::WorkerRegistered;
use crate::state::{ProtocolConfig, WorkerRegistration};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
#[instruction(worker: Pubkey)]
pub struct RegisterWorker<'info> {
    #[account(
        init,
        payer = registrar,
        space = WorkerRegistration::SIZE,
        seeds = [b"worker", worker.as_ref()],
        bump
    )]
    pub worker_registration: Account<'info, WorkerRegistration>,

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

pub fn handler(ctx: Context<RegisterWorker>, worker: Pubkey) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let registration = &mut ctx.accounts.worker_registration;
    registration.worker = worker;
    registration.active = true;
    registration.registered_at = clock.unix_timestamp;
    registration.updated_at = clock.unix_timestamp;
    registration.bump = ctx.bumps.worker_registration;

    msg!("Worker registered: {}", worker);

    emit!(WorkerRegistered {
        worker,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
