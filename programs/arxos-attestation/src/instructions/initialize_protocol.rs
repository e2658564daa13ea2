//! Initialize protocol configuration and token vaults

use crate::errors::AttestationError;
use crate::events::ProtocolInitialized;
use crate::instructions::token_helpers::validate_value_mint;
use crate::state::{ProtocolConfig, ProtocolParams, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION};
use crate::utils::multisig::{require_multisig, validate_multisig_owners};
use anchor_lang::prelude::*;
use anchor_spl::token::{Mint, Token, TokenAccount};

#[derive(Accounts)]
pub struct InitializeProtocol<'info> {
    #[account(
        init,
        payer = authority,
        space = ProtocolConfig::SIZE,
        seeds = [b"protocol"],
        bump
    )]
    pub protocol_config: Box<Account<'info, ProtocolConfig>>,

    /// Value token mint; its mint authority must already be the config PDA and
    /// it must have no freeze authority
    pub mint: Box<Account<'info, Mint>>,

    #[account(
        init,
        payer = authority,
        seeds = [b"stake_vault"],
        bump,
        token::mint = mint,
        token::authority = protocol_config
    )]
    pub stake_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        init,
        payer = authority,
        seeds = [b"bond_vault"],
        bump,
        token::mint = mint,
        token::authority = protocol_config
    )]
    pub bond_vault: Box<Account<'info, TokenAccount>>,

    #[account(
        constraint = treasury.mint == mint.key() @ AttestationError::InvalidMint
    )]
    pub treasury: Box<Account<'info, TokenAccount>>,

    #[account(
        constraint = maintainer_pool.mint == mint.key() @ AttestationError::InvalidMint
    )]
    pub maintainer_pool: Box<Account<'info, TokenAccount>>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub token_program: Program<'info, Token>,
    pub system_program: Program<'info, System>,
}

pub fn handler(
    ctx: Context<InitializeProtocol>,
    params: ProtocolParams,
    registrar: Pubkey,
    multisig_threshold: u8,
    multisig_owners: Vec<Pubkey>,
) -> Result<()> {
    // Validate everything before writing config
    params.validate()?;
    validate_multisig_owners(&multisig_owners, multisig_threshold)?;
    require!(
        multisig_owners.contains(&ctx.accounts.authority.key()),
        AttestationError::MultisigInvalidSigners
    );
    require!(
        registrar != Pubkey::default(),
        AttestationError::UnauthorizedRegistrar
    );
    validate_value_mint(&ctx.accounts.mint, &ctx.accounts.protocol_config.key())?;

    let config = &mut ctx.accounts.protocol_config;
    config.authority = ctx.accounts.authority.key();
    config.registrar = registrar;
    config.mint = ctx.accounts.mint.key();
    config.treasury = ctx.accounts.treasury.key();
    config.maintainer_pool = ctx.accounts.maintainer_pool.key();
    config.stake_vault = ctx.accounts.stake_vault.key();
    config.bond_vault = ctx.accounts.bond_vault.key();
    config.apply_params(&params);
    config.protocol_version = CURRENT_PROTOCOL_VERSION;
    config.min_supported_version = MIN_SUPPORTED_VERSION;
    config.bump = ctx.bumps.protocol_config;
    config.stake_vault_bump = ctx.bumps.stake_vault;
    config.bond_vault_bump = ctx.bumps.bond_vault;
    config.multisig_threshold = multisig_threshold;
    config.multisig_owners_len = multisig_owners.len() as u8;
    config.multisig_owners = [Pubkey::default(); ProtocolConfig::MAX_MULTISIG_OWNERS];
    for (index, owner) in multisig_owners.iter().enumerate() {
        config.multisig_owners[index] = *owner;
    }

    // The owner set must be able to approve its own creation
    require_multisig(config, ctx.remaining_accounts)?;

    msg!(
        "Protocol initialized: min_stake={} min_confirmations={} threshold={}/{}",
        params.min_stake,
        params.min_confirmations,
        multisig_threshold,
        multisig_owners.len()
    );

    emit!(ProtocolInitialized {
        authority: config.authority,
        registrar,
        mint: config.mint,
        treasury: config.treasury,
        maintainer_pool: config.maintainer_pool,
        min_stake: params.min_stake,
        min_confirmations: params.min_confirmations,
        timestamp: Clock::get()?.unix_timestamp,
    });

    Ok(())
}
