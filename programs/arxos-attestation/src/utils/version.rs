//! Version checking for the protocol config account

use crate::errors::AttestationError;
use crate::state::{ProtocolConfig, CURRENT_PROTOCOL_VERSION, MIN_SUPPORTED_VERSION};
use anchor_lang::prelude::*;

/// Every handler calls this before touching protocol state.
///
/// # Returns
/// * `Err(AttestationError::AccountVersionTooOld)` if the config needs migration
/// * `Err(AttestationError::AccountVersionTooNew)` if the program needs upgrade
/// * `Err(AttestationError::VersionMismatchProtocol)` if the config is inconsistent
pub fn check_version_compatible(config: &ProtocolConfig) -> Result<()> {
    if config.protocol_version < config.min_supported_version {
        msg!(
            "Config version {} is below its minimum supported {}",
            config.protocol_version,
            config.min_supported_version
        );
        return Err(AttestationError::AccountVersionTooOld.into());
    }

    if config.protocol_version > CURRENT_PROTOCOL_VERSION {
        msg!(
            "Config version {} is newer than program version {}",
            config.protocol_version,
            CURRENT_PROTOCOL_VERSION
        );
        return Err(AttestationError::AccountVersionTooNew.into());
    }

    if config.min_supported_version < MIN_SUPPORTED_VERSION
        || config.min_supported_version > CURRENT_PROTOCOL_VERSION
    {
        return Err(AttestationError::VersionMismatchProtocol.into());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_compatible() {
        assert!(check_version_compatible(&ProtocolConfig::default()).is_ok());
    }

    #[test]
    fn test_newer_config_rejected() {
        let config = ProtocolConfig {
            protocol_version: CURRENT_PROTOCOL_VERSION + 1,
            ..ProtocolConfig::default()
        };
        assert!(check_version_compatible(&config).is_err());
    }

    #[test]
    fn test_inconsistent_min_version_rejected() {
        let config = ProtocolConfig {
            protocol_version: CURRENT_PROTOCOL_VERSION,
            min_supported_version: 0,
            ..ProtocolConfig::default()
        };
        assert!(check_version_compatible(&config).is_err());
    }
}
