//! Stake registry bookkeeping shared by the stake, attestation, voting and
//! slashing instructions.
//!
//! These functions only touch account data. Token movement between the
//! validator, the stake vault and the treasury is done by the callers.

use crate::errors::AttestationError;
use crate::instructions::constants::{BASIS_POINTS_DIVISOR, SLASH_WINDOW};
use crate::state::StakeAccount;
use anchor_lang::prelude::*;

pub fn is_qualified(stake: &StakeAccount, min_stake: u64) -> bool {
    stake.active_stake >= min_stake
}

/// Gate for every validator-only operation.
pub fn require_qualified(stake: &StakeAccount, validator: &Pubkey, min_stake: u64) -> Result<()> {
    require_keys_eq!(
        stake.validator,
        *validator,
        AttestationError::UnauthorizedValidator
    );
    require!(
        is_qualified(stake, min_stake),
        AttestationError::ValidatorNotQualified
    );
    Ok(())
}

/// Initialize on first use. No-op for an existing account.
pub fn initialize_stake(stake: &mut StakeAccount, validator: Pubkey, now: i64, bump: u8) {
    if stake.validator == Pubkey::default() {
        stake.validator = validator;
        stake.created_at = now;
        stake.bump = bump;
    }
}

/// Returns the new active stake.
pub fn apply_deposit(stake: &mut StakeAccount, amount: u64) -> Result<u64> {
    require!(amount > 0, AttestationError::InvalidAmount);
    stake.active_stake = stake
        .active_stake
        .checked_add(amount)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    Ok(stake.active_stake)
}

/// Move `amount` from active to pending and restart the unlock timer for the
/// whole pending balance. Returns the new unlock time.
pub fn apply_withdrawal_request(
    stake: &mut StakeAccount,
    amount: u64,
    now: i64,
    withdrawal_delay: i64,
) -> Result<i64> {
    require!(amount > 0, AttestationError::InvalidAmount);
    require!(
        amount <= stake.active_stake,
        AttestationError::InsufficientStake
    );

    let unlock_time = now
        .checked_add(withdrawal_delay)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    let pending = stake
        .pending_withdrawal
        .checked_add(amount)
        .ok_or(AttestationError::ArithmeticOverflow)?;

    stake.active_stake -= amount;
    stake.pending_withdrawal = pending;
    stake.withdrawal_unlock_time = unlock_time;
    Ok(unlock_time)
}

/// Release the full pending balance once unlocked. Returns the released amount.
pub fn apply_withdrawal_completion(stake: &mut StakeAccount, now: i64) -> Result<u64> {
    require!(
        stake.pending_withdrawal > 0,
        AttestationError::NothingToWithdraw
    );
    require!(
        now >= stake.withdrawal_unlock_time,
        AttestationError::WithdrawalLocked
    );

    let released = stake.pending_withdrawal;
    stake.pending_withdrawal = 0;
    stake.withdrawal_unlock_time = 0;
    Ok(released)
}

/// Reduce active stake by `amount`, clamped at zero. Pending withdrawals are
/// untouched. Returns the amount actually slashed.
pub fn apply_slash(stake: &mut StakeAccount, amount: u64) -> Result<u64> {
    let slashed = amount.min(stake.active_stake);
    stake.active_stake -= slashed;
    stake.total_slashed = stake
        .total_slashed
        .checked_add(slashed)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    Ok(slashed)
}

/// `active_stake * bps / 10000`, computed without intermediate overflow.
pub fn calculate_bps_slash(active_stake: u64, bps: u16) -> Result<u64> {
    let amount = (active_stake as u128)
        .checked_mul(bps as u128)
        .ok_or(AttestationError::ArithmeticOverflow)?
        / BASIS_POINTS_DIVISOR as u128;
    u64::try_from(amount).map_err(|_| error!(AttestationError::ArithmeticOverflow))
}

/// Slash `bps` of the validator's whole bonded balance, pending withdrawal
/// included, taking from pending first. Returns the amount slashed.
pub fn apply_bonded_bps_slash(stake: &mut StakeAccount, bps: u16) -> Result<u64> {
    let bonded = stake
        .active_stake
        .checked_add(stake.pending_withdrawal)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    let amount = calculate_bps_slash(bonded, bps)?;

    let from_pending = amount.min(stake.pending_withdrawal);
    stake.pending_withdrawal -= from_pending;
    if stake.pending_withdrawal == 0 {
        stake.withdrawal_unlock_time = 0;
    }
    let from_active = (amount - from_pending).min(stake.active_stake);
    stake.active_stake -= from_active;

    let slashed = from_pending + from_active;
    stake.total_slashed = stake
        .total_slashed
        .checked_add(slashed)
        .ok_or(AttestationError::ArithmeticOverflow)?;
    Ok(slashed)
}

/// Overturn slashes must be applied within [`SLASH_WINDOW`] of the ruling.
pub fn validate_slash_window(resolved_at: i64, now: i64) -> Result<()> {
    require!(
        now <= resolved_at.saturating_add(SLASH_WINDOW),
        AttestationError::SlashWindowExpired
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::assert_error;

    const DAY: i64 = 24 * 60 * 60;

    fn staked(active: u64) -> StakeAccount {
        StakeAccount {
            validator: Pubkey::new_unique(),
            active_stake: active,
            ..StakeAccount::default()
        }
    }

    #[test]
    fn test_qualification_threshold_is_inclusive() {
        let stake = staked(1_000);
        assert!(is_qualified(&stake, 1_000));
        assert!(!is_qualified(&stake, 1_001));
        assert!(require_qualified(&stake, &stake.validator, 1_000).is_ok());
        assert_error(
            require_qualified(&stake, &stake.validator, 1_001),
            AttestationError::ValidatorNotQualified,
        );
        assert_error(
            require_qualified(&stake, &Pubkey::new_unique(), 1),
            AttestationError::UnauthorizedValidator,
        );
    }

    #[test]
    fn test_initialize_only_once() {
        let mut stake = StakeAccount::default();
        let validator = Pubkey::new_unique();
        initialize_stake(&mut stake, validator, 100, 7);
        initialize_stake(&mut stake, Pubkey::new_unique(), 200, 9);
        assert_eq!(stake.validator, validator);
        assert_eq!(stake.created_at, 100);
        assert_eq!(stake.bump, 7);
    }

    #[test]
    fn test_deposit_accumulates() {
        let mut stake = staked(0);
        assert_eq!(apply_deposit(&mut stake, 600).unwrap(), 600);
        assert_eq!(apply_deposit(&mut stake, 400).unwrap(), 1_000);
        assert_error(apply_deposit(&mut stake, 0), AttestationError::InvalidAmount);
        stake.active_stake = u64::MAX;
        assert_error(
            apply_deposit(&mut stake, 1),
            AttestationError::ArithmeticOverflow,
        );
    }

    #[test]
    fn test_withdrawal_request_moves_stake() {
        let mut stake = staked(1_000);
        let unlock = apply_withdrawal_request(&mut stake, 300, 10, 7 * DAY).unwrap();
        assert_eq!(unlock, 10 + 7 * DAY);
        assert_eq!(stake.active_stake, 700);
        assert_eq!(stake.pending_withdrawal, 300);
        assert_eq!(stake.withdrawal_unlock_time, unlock);
    }

    #[test]
    fn test_withdrawal_request_over_active_fails() {
        let mut stake = staked(100);
        assert_error(
            apply_withdrawal_request(&mut stake, 101, 0, DAY),
            AttestationError::InsufficientStake,
        );
        assert_eq!(stake.active_stake, 100);
        assert_eq!(stake.pending_withdrawal, 0);
    }

    #[test]
    fn test_second_request_restarts_timer() {
        let mut stake = staked(1_000);
        apply_withdrawal_request(&mut stake, 100, 0, 7 * DAY).unwrap();
        apply_withdrawal_request(&mut stake, 200, 3 * DAY, 7 * DAY).unwrap();
        assert_eq!(stake.pending_withdrawal, 300);
        assert_eq!(stake.withdrawal_unlock_time, 10 * DAY);
    }

    #[test]
    fn test_withdrawal_completion_respects_unlock_time() {
        let mut stake = staked(1_000);
        let unlock = apply_withdrawal_request(&mut stake, 400, 0, 7 * DAY).unwrap();

        assert_error(
            apply_withdrawal_completion(&mut stake, unlock - 1),
            AttestationError::WithdrawalLocked,
        );
        assert_eq!(stake.pending_withdrawal, 400);

        assert_eq!(apply_withdrawal_completion(&mut stake, unlock).unwrap(), 400);
        assert_eq!(stake.pending_withdrawal, 0);
        assert_eq!(stake.active_stake, 600);

        assert_error(
            apply_withdrawal_completion(&mut stake, unlock + 1),
            AttestationError::NothingToWithdraw,
        );
    }

    #[test]
    fn test_slash_clamps_and_keeps_pending() {
        let mut stake = staked(1_000);
        apply_withdrawal_request(&mut stake, 400, 0, DAY).unwrap();

        assert_eq!(apply_slash(&mut stake, 250).unwrap(), 250);
        assert_eq!(stake.active_stake, 350);

        assert_eq!(apply_slash(&mut stake, 10_000).unwrap(), 350);
        assert_eq!(stake.active_stake, 0);
        assert_eq!(stake.pending_withdrawal, 400);
        assert_eq!(stake.total_slashed, 600);

        assert_eq!(apply_slash(&mut stake, 5).unwrap(), 0);
    }

    #[test]
    fn test_bps_slash() {
        assert_eq!(calculate_bps_slash(1_000, 1_000).unwrap(), 100);
        assert_eq!(calculate_bps_slash(999, 1).unwrap(), 0);
        assert_eq!(calculate_bps_slash(u64::MAX, 10_000).unwrap(), u64::MAX);
        assert_eq!(calculate_bps_slash(0, 5_000).unwrap(), 0);
    }

    #[test]
    fn test_bonded_slash_reaches_pending_withdrawal() {
        let mut stake = staked(1_000);
        apply_withdrawal_request(&mut stake, 1_000, 0, 7 * DAY).unwrap();
        assert_eq!(stake.active_stake, 0);

        assert_eq!(apply_bonded_bps_slash(&mut stake, 1_000).unwrap(), 100);
        assert_eq!(stake.pending_withdrawal, 900);
        assert_eq!(stake.withdrawal_unlock_time, 7 * DAY);
        assert_eq!(stake.total_slashed, 100);
    }

    #[test]
    fn test_bonded_slash_drains_pending_before_active() {
        let mut stake = staked(1_000);
        apply_withdrawal_request(&mut stake, 50, 0, DAY).unwrap();

        // 10% of 1000 bonded: all 50 pending, then 50 from active
        assert_eq!(apply_bonded_bps_slash(&mut stake, 1_000).unwrap(), 100);
        assert_eq!(stake.pending_withdrawal, 0);
        assert_eq!(stake.withdrawal_unlock_time, 0);
        assert_eq!(stake.active_stake, 900);

        let mut empty = staked(0);
        assert_eq!(apply_bonded_bps_slash(&mut empty, 5_000).unwrap(), 0);
    }

    #[test]
    fn test_slash_window() {
        assert!(validate_slash_window(100, 100 + SLASH_WINDOW).is_ok());
        assert_error(
            validate_slash_window(100, 101 + SLASH_WINDOW),
            AttestationError::SlashWindowExpired,
        );
    }
}
