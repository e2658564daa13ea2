//! Shared constants for instruction handlers

/// Seed of the protocol config PDA, which also signs for vaults and the mint
pub const PROTOCOL_SEED: &[u8] = b"protocol";

/// Divisor for basis points calculations (100% = 10000 bps)
pub const BASIS_POINTS_DIVISOR: u64 = 10000;

/// Base for percentage calculations (100 = 100%)
pub const PERCENT_BASE: u64 = 100;

// ============================================================================
// Payout split (percent of contribution amount)
// ============================================================================

pub const WORKER_SHARE_PERCENT: u64 = 70;
pub const BUILDING_SHARE_PERCENT: u64 = 10;
pub const MAINTAINER_SHARE_PERCENT: u64 = 10;
/// Nominal treasury share; the treasury also absorbs rounding remainders
pub const TREASURY_SHARE_PERCENT: u64 = 10;

// ============================================================================
// Domain separation tags
// ============================================================================

pub const CONTRIBUTION_KEY_DOMAIN: &[u8] = b"ARXOS_CONTRIBUTION_KEY_V1";
pub const PROOF_MESSAGE_DOMAIN: &[u8] = b"ARXOS_CONTRIBUTION_PROOF_V1";
pub const PROOF_DIGEST_DOMAIN: &[u8] = b"ARXOS_CONSUMED_PROOF_V1";
pub const VOTE_COMMIT_DOMAIN: &[u8] = b"ARXOS_VOTE_COMMIT_V1";
pub const REASON_HASH_DOMAIN: &[u8] = b"ARXOS_DISPUTE_REASON_V1";

// ============================================================================
// Slashing
// ============================================================================

/// Window for applying an overturn slash after the ruling (7 days)
pub const SLASH_WINDOW: i64 = 7 * 24 * 60 * 60;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_percentages_cover_amount() {
        assert_eq!(
            WORKER_SHARE_PERCENT
                + BUILDING_SHARE_PERCENT
                + MAINTAINER_SHARE_PERCENT
                + TREASURY_SHARE_PERCENT,
            PERCENT_BASE
        );
    }
}
