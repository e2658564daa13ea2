//! SPL token helpers for stake custody, dispute bonds and payouts.
//!
//! The protocol config PDA (`["protocol"]`) is the owner of both vaults and
//! the mint authority of the value token, so every outbound movement is a
//! PDA-signed CPI.

use crate::errors::AttestationError;
use crate::instructions::constants::PROTOCOL_SEED;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::program_option::COption;
use anchor_spl::token::{self, Mint, MintTo, Token, TokenAccount, Transfer};

/// Transfer tokens out of a protocol vault using the config PDA as authority.
///
/// # Arguments
/// * `vault` - Stake or bond vault (source)
/// * `destination` - Recipient token account
/// * `protocol_config` - Config PDA that owns the vault
/// * `amount` - Number of tokens to transfer; zero is a no-op
/// * `config_bump` - Bump of the config PDA
/// * `token_program` - SPL Token program
pub fn transfer_from_vault<'info>(
    vault: &Account<'info, TokenAccount>,
    destination: &AccountInfo<'info>,
    protocol_config: &AccountInfo<'info>,
    amount: u64,
    config_bump: u8,
    token_program: &Program<'info, Token>,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }

    let bump = [config_bump];
    let seeds: &[&[u8]] = &[PROTOCOL_SEED, &bump];
    let signer_seeds: &[&[&[u8]]] = &[seeds];

    token::transfer(
        CpiContext::new_with_signer(
            token_program.to_account_info(),
            Transfer {
                from: vault.to_account_info(),
                to: destination.clone(),
                authority: protocol_config.clone(),
            },
            signer_seeds,
        ),
        amount,
    )
    .map_err(|_| AttestationError::TokenTransferFailed)?;

    Ok(())
}

/// Transfer tokens from a user-owned account into a protocol vault.
/// `owner` must have signed the outer instruction.
pub fn transfer_into_vault<'info>(
    source: &Account<'info, TokenAccount>,
    vault: &Account<'info, TokenAccount>,
    owner: &AccountInfo<'info>,
    amount: u64,
    token_program: &Program<'info, Token>,
) -> Result<()> {
    token::transfer(
        CpiContext::new(
            token_program.to_account_info(),
            Transfer {
                from: source.to_account_info(),
                to: vault.to_account_info(),
                authority: owner.clone(),
            },
        ),
        amount,
    )
    .map_err(|_| AttestationError::TokenTransferFailed)?;

    Ok(())
}

/// Mint value tokens to `destination`, signed by the config PDA.
pub fn mint_from_protocol<'info>(
    mint: &Account<'info, Mint>,
    destination: &AccountInfo<'info>,
    protocol_config: &AccountInfo<'info>,
    amount: u64,
    config_bump: u8,
    token_program: &Program<'info, Token>,
) -> Result<()> {
    if amount == 0 {
        return Ok(());
    }

    let bump = [config_bump];
    let seeds: &[&[u8]] = &[PROTOCOL_SEED, &bump];
    let signer_seeds: &[&[&[u8]]] = &[seeds];

    token::mint_to(
        CpiContext::new_with_signer(
            token_program.to_account_info(),
            MintTo {
                mint: mint.to_account_info(),
                to: destination.clone(),
                authority: protocol_config.clone(),
            },
            signer_seeds,
        ),
        amount,
    )
    .map_err(|_| AttestationError::TokenTransferFailed)?;

    Ok(())
}

/// Validate that a token account has the expected mint and owner.
pub fn validate_token_account(
    token_account: &TokenAccount,
    expected_mint: &Pubkey,
    expected_owner: &Pubkey,
) -> Result<()> {
    require_keys_eq!(
        token_account.mint,
        *expected_mint,
        AttestationError::InvalidMint
    );
    require_keys_eq!(
        token_account.owner,
        *expected_owner,
        AttestationError::InvalidTokenAccount
    );
    Ok(())
}

/// Bond refunds may go to any token account the challenger holds on the
/// protocol mint. The account that posted the bond may already be closed.
pub fn validate_refund_account(
    refund_account: Option<&TokenAccount>,
    challenger: &Pubkey,
    expected_mint: &Pubkey,
) -> Result<()> {
    let refund_account = refund_account.ok_or(AttestationError::InvalidTokenAccount)?;
    validate_token_account(refund_account, expected_mint, challenger)
}

/// The value mint must be minted only by the config PDA and must not be
/// freezable, otherwise a third party could freeze the vaults.
pub fn validate_value_mint(mint: &Mint, protocol_config: &Pubkey) -> Result<()> {
    require!(
        mint.mint_authority == COption::Some(*protocol_config),
        AttestationError::InvalidMint
    );
    require!(
        mint.freeze_authority.is_none(),
        AttestationError::InvalidMint
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::assert_error;
    use anchor_lang::solana_program::program_pack::Pack;
    use anchor_spl::token::spl_token::state::{
        Account as SplAccount, AccountState, Mint as SplMint,
    };

    fn token_account(mint: Pubkey, owner: Pubkey) -> TokenAccount {
        let mut data = [0u8; SplAccount::LEN];
        SplAccount::pack(
            SplAccount {
                mint,
                owner,
                state: AccountState::Initialized,
                ..SplAccount::default()
            },
            &mut data,
        )
        .unwrap();
        TokenAccount::try_deserialize(&mut &data[..]).unwrap()
    }

    fn mint(mint_authority: Option<Pubkey>, freeze_authority: Option<Pubkey>) -> Mint {
        let mut data = [0u8; SplMint::LEN];
        SplMint::pack(
            SplMint {
                mint_authority: mint_authority.into(),
                supply: 0,
                decimals: 6,
                is_initialized: true,
                freeze_authority: freeze_authority.into(),
            },
            &mut data,
        )
        .unwrap();
        Mint::try_deserialize(&mut &data[..]).unwrap()
    }

    #[test]
    fn test_refund_goes_to_any_challenger_account() {
        let value_mint = Pubkey::new_unique();
        let challenger = Pubkey::new_unique();

        // A fresh account stands in for the closed bond source
        let replacement = token_account(value_mint, challenger);
        assert!(validate_refund_account(Some(&replacement), &challenger, &value_mint).is_ok());

        assert_error(
            validate_refund_account(None, &challenger, &value_mint),
            AttestationError::InvalidTokenAccount,
        );
        let stranger = token_account(value_mint, Pubkey::new_unique());
        assert_error(
            validate_refund_account(Some(&stranger), &challenger, &value_mint),
            AttestationError::InvalidTokenAccount,
        );
        let other_mint = token_account(Pubkey::new_unique(), challenger);
        assert_error(
            validate_refund_account(Some(&other_mint), &challenger, &value_mint),
            AttestationError::InvalidMint,
        );
    }

    #[test]
    fn test_value_mint_must_be_protocol_owned_and_unfreezable() {
        let config = Pubkey::new_unique();

        assert!(validate_value_mint(&mint(Some(config), None), &config).is_ok());
        assert_error(
            validate_value_mint(&mint(Some(config), Some(Pubkey::new_unique())), &config),
            AttestationError::InvalidMint,
        );
        assert_error(
            validate_value_mint(&mint(Some(Pubkey::new_unique()), None), &config),
            AttestationError::InvalidMint,
        );
        assert_error(
            validate_value_mint(&mint(None, None), &config),
            AttestationError::InvalidMint,
        );
    }
}
