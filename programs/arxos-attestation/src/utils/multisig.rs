//! Multisig approval helpers for administrative instructions
//!
//! Approvals are signer accounts passed in `remaining_accounts`.

use anchor_lang::prelude::*;

use crate::errors::AttestationError;
use crate::state::ProtocolConfig;

/// Validate multisig owner pubkeys and threshold before config is written
pub fn validate_multisig_owners(owners: &[Pubkey], threshold: u8) -> Result<()> {
    require!(
        !owners.is_empty() && owners.len() <= ProtocolConfig::MAX_MULTISIG_OWNERS,
        AttestationError::MultisigInvalidSigners
    );
    require!(
        threshold > 0 && threshold as usize <= owners.len(),
        AttestationError::MultisigInvalidThreshold
    );
    for (index, owner) in owners.iter().enumerate() {
        require!(
            *owner != Pubkey::default(),
            AttestationError::MultisigDefaultSigner
        );
        for other in owners.iter().skip(index + 1) {
            require!(*owner != *other, AttestationError::MultisigDuplicateSigner);
        }
    }
    Ok(())
}

pub fn require_multisig(config: &ProtocolConfig, remaining_accounts: &[AccountInfo]) -> Result<()> {
    let signers: Vec<Pubkey> = remaining_accounts
        .iter()
        .filter(|account| account.is_signer)
        .map(|account| *account.key)
        .collect();
    check_approvals(config, &signers)
}

/// Count distinct owner approvals among `signers` and require the threshold.
pub fn check_approvals(config: &ProtocolConfig, signers: &[Pubkey]) -> Result<()> {
    let owners_len = config.multisig_owners_len as usize;
    let threshold = config.multisig_threshold as usize;

    if owners_len == 0 || owners_len > ProtocolConfig::MAX_MULTISIG_OWNERS {
        return Err(error!(AttestationError::MultisigInvalidSigners));
    }

    if threshold == 0 || threshold > owners_len {
        return Err(error!(AttestationError::MultisigInvalidThreshold));
    }

    let mut approvals = 0usize;
    let mut seen_owner = [false; ProtocolConfig::MAX_MULTISIG_OWNERS];

    for signer in signers {
        for (index, owner) in config.multisig_owners[..owners_len].iter().enumerate() {
            if owner == &Pubkey::default() {
                return Err(error!(AttestationError::MultisigDefaultSigner));
            }

            if signer == owner {
                if seen_owner[index] {
                    return Err(error!(AttestationError::MultisigDuplicateSigner));
                }
                seen_owner[index] = true;
                approvals += 1;
            }
        }
    }

    if approvals < threshold {
        return Err(error!(AttestationError::MultisigNotEnoughSigners));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(owners: &[Pubkey], threshold: u8) -> ProtocolConfig {
        let mut config = ProtocolConfig::default();
        config.multisig_owners[..owners.len()].copy_from_slice(owners);
        config.multisig_owners_len = owners.len() as u8;
        config.multisig_threshold = threshold;
        config
    }

    #[test]
    fn test_threshold_met() {
        let owners = [Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
        let config = config_with(&owners, 2);
        assert!(check_approvals(&config, &[owners[0], owners[2]]).is_ok());
    }

    #[test]
    fn test_threshold_not_met_ignores_strangers() {
        let owners = [Pubkey::new_unique(), Pubkey::new_unique()];
        let config = config_with(&owners, 2);
        let stranger = Pubkey::new_unique();
        assert!(check_approvals(&config, &[owners[0], stranger]).is_err());
    }

    #[test]
    fn test_same_owner_twice_rejected() {
        let owners = [Pubkey::new_unique(), Pubkey::new_unique()];
        let config = config_with(&owners, 2);
        assert!(check_approvals(&config, &[owners[0], owners[0]]).is_err());
    }

    #[test]
    fn test_unconfigured_multisig_rejected() {
        let config = ProtocolConfig::default();
        assert!(check_approvals(&config, &[Pubkey::new_unique()]).is_err());
    }

    #[test]
    fn test_owner_validation() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        assert!(validate_multisig_owners(&[a, b], 2).is_ok());
        assert!(validate_multisig_owners(&[a, b], 3).is_err());
        assert!(validate_multisig_owners(&[a, b], 0).is_err());
        assert!(validate_multisig_owners(&[a, a], 1).is_err());
        assert!(validate_multisig_owners(&[a, Pubkey::default()], 1).is_err());
        assert!(validate_multisig_owners(&[], 1).is_err());
        let six: Vec<Pubkey> = (0..6).map(|_| Pubkey::new_unique()).collect();
        assert!(validate_multisig_owners(&six, 1).is_err());
    }
}
