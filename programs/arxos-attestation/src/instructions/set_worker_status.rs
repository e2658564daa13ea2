//! Activate or deactivate a registered worker (registrar only)

use crate::errors::AttestationError;
use crate::events::WorkerStatusChanged;
use crate::state::{ProtocolConfig, WorkerRegistration};
use crate::utils::version::check_version_compatible;
use anchor_lang::prelude::*;

#[derive(Accounts)]
pub struct SetWorkerStatus<'info> {
    #[account(
        mut,
        seeds = [b"worker", worker_registration.worker.as_ref()],
        bump = worker_registration.bump
    )]
    pub worker_registration: Account<'info, WorkerRegistration>,

    #[account(
        seeds = [b"protocol"],
        bump = protocol_config.bump,
        has_one = registrar @ AttestationError::UnauthorizedRegistrar
    )]
    pub protocol_config: Account<'info, ProtocolConfig>,

    pub registrar: Signer<'info>,
}

pub fn handler(ctx: Context<SetWorkerStatus>, active: bool) -> Result<()> {
    check_version_compatible(&ctx.accounts.protocol_config)?;

    let clock = Clock::get()?;
    let registration = &mut ctx.accounts.worker_registration;
    registration.active = active;
    registration.updated_at = clock.unix_timestamp;

    msg!(
        "Worker {} status: active={}",
        registration.worker,
        active
    );

    emit!(WorkerStatusChanged {
        worker: registration.worker,
        active,
        timestamp: clock.unix_timestamp,
    });

    Ok(())
}
