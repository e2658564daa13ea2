//! Error codes for the ArxOS attestation protocol

use anchor_lang::error::{ErrorCode, ErrorOrigin};
use anchor_lang::prelude::*;

#[error_code]
pub enum AttestationError {
    // Authorization errors
    #[msg("Validator stake is below the minimum required")]
    ValidatorNotQualified,

    #[msg("Stake account does not belong to the signer")]
    UnauthorizedValidator,

    #[msg("Only the registrar can perform this action")]
    UnauthorizedRegistrar,

    #[msg("The challenger and confirming validators cannot vote on this dispute")]
    VoterIsParticipant,

    #[msg("Invalid multisig threshold")]
    MultisigInvalidThreshold,

    #[msg("Invalid multisig signer configuration")]
    MultisigInvalidSigners,

    #[msg("Not enough multisig signers")]
    MultisigNotEnoughSigners,

    #[msg("Duplicate multisig signer provided")]
    MultisigDuplicateSigner,

    #[msg("Multisig signer cannot be default pubkey")]
    MultisigDefaultSigner,

    // Not found errors
    #[msg("Validator did not confirm this contribution")]
    ValidatorNotConfirmer,

    #[msg("Dispute does not belong to this contribution")]
    DisputeNotFound,

    // Validation errors
    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    #[msg("Worker is not active")]
    WorkerNotActive,

    #[msg("Contribution key does not match building, worker and amount")]
    InvalidContributionKey,

    #[msg("Proof digest does not match proof and signature")]
    InvalidProofDigest,

    #[msg("Proof fields do not match the attested contribution")]
    ProofFieldMismatch,

    #[msg("Proof evidence hash cannot be zero")]
    InvalidEvidenceHash,

    #[msg("Proof capture time is in the future")]
    ProofFromFuture,

    #[msg("Ed25519 signature instruction must precede the attestation")]
    MissingSignatureInstruction,

    #[msg("Ed25519 signature instruction is malformed")]
    InvalidSignatureInstruction,

    #[msg("Signature does not match worker, proof or signature bytes")]
    SignatureMismatch,

    #[msg("Revealed vote and salt do not match the commitment")]
    CommitmentMismatch,

    #[msg("Vote commitment cannot be zero")]
    InvalidCommitment,

    #[msg("Reason must be printable and at most 256 bytes")]
    InvalidReason,

    #[msg("Protocol parameters out of range")]
    InvalidProtocolParams,

    #[msg("Unknown slash reason code")]
    InvalidSlashReason,

    #[msg("Withdrawal amount exceeds active stake")]
    InsufficientStake,

    #[msg("Token account owner or mint does not match")]
    InvalidTokenAccount,

    #[msg("Mint authority must be the protocol config")]
    InvalidMint,

    #[msg("Building wallet cannot be the default pubkey")]
    InvalidBuildingWallet,

    // Replay errors
    #[msg("Proof and signature pair has already been consumed")]
    ProofAlreadyConsumed,

    // Duplicate errors
    #[msg("Validator has already confirmed this contribution")]
    AlreadyConfirmed,

    #[msg("Contribution is already flagged")]
    AlreadyFlagged,

    #[msg("A dispute is already open for this contribution")]
    DisputeAlreadyOpen,

    #[msg("Validator has already committed a vote")]
    AlreadyCommitted,

    #[msg("Vote has already been revealed")]
    AlreadyRevealed,

    #[msg("Overturn slash already applied to this validator")]
    SlashAlreadyApplied,

    // State errors
    #[msg("Contribution is already finalized or cancelled")]
    ContributionAlreadySettled,

    #[msg("Contribution has reached the maximum number of confirmations")]
    ConfirmationLimitReached,

    #[msg("Dispute has already been resolved")]
    DisputeAlreadyResolved,

    #[msg("No pending withdrawal")]
    NothingToWithdraw,

    #[msg("Contribution is not flagged")]
    NotFlagged,

    #[msg("Dispute ruling is not Overturned")]
    RulingNotOverturned,

    #[msg("Overturn slashing is disabled")]
    OverturnSlashDisabled,

    #[msg("Account version is too old")]
    AccountVersionTooOld,

    #[msg("Account version is newer than this program")]
    AccountVersionTooNew,

    #[msg("Protocol config version fields are inconsistent")]
    VersionMismatchProtocol,

    // Timing errors
    #[msg("Finalization delay has not elapsed")]
    FinalizationDelayNotElapsed,

    #[msg("Withdrawal is still locked")]
    WithdrawalLocked,

    #[msg("Commit window has closed")]
    CommitWindowClosed,

    #[msg("Reveal window has not opened")]
    RevealWindowNotOpen,

    #[msg("Reveal window has closed")]
    RevealWindowClosed,

    #[msg("Dispute voting windows have not elapsed")]
    DisputeWindowOpen,

    #[msg("Overturn slash window has expired")]
    SlashWindowExpired,

    // Consensus errors
    #[msg("Not enough distinct validator confirmations")]
    InsufficientConfirmations,

    // Dispute blocking errors
    #[msg("Contribution carries an advisory flag")]
    ContributionFlagged,

    #[msg("Contribution has an unresolved dispute")]
    ContributionDisputed,

    // Ledger errors
    #[msg("Token transfer failed")]
    TokenTransferFailed,

    #[msg("Arithmetic overflow")]
    ArithmeticOverflow,
}

/// Caller-facing error taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authorization,
    NotFound,
    Validation,
    Replay,
    Duplicate,
    State,
    Timing,
    Consensus,
    Disputed,
    Ledger,
}

impl AttestationError {
    pub fn category(&self) -> ErrorCategory {
        use AttestationError::*;
        match self {
            ValidatorNotQualified
            | UnauthorizedValidator
            | UnauthorizedRegistrar
            | VoterIsParticipant
            | MultisigInvalidThreshold
            | MultisigInvalidSigners
            | MultisigNotEnoughSigners
            | MultisigDuplicateSigner
            | MultisigDefaultSigner => ErrorCategory::Authorization,

            ValidatorNotConfirmer | DisputeNotFound => ErrorCategory::NotFound,

            InvalidAmount
            | WorkerNotActive
            | InvalidContributionKey
            | InvalidProofDigest
            | ProofFieldMismatch
            | InvalidEvidenceHash
            | ProofFromFuture
            | MissingSignatureInstruction
            | InvalidSignatureInstruction
            | SignatureMismatch
            | CommitmentMismatch
            | InvalidCommitment
            | InvalidReason
            | InvalidProtocolParams
            | InvalidSlashReason
            | InsufficientStake
            | InvalidTokenAccount
            | InvalidMint
            | InvalidBuildingWallet => ErrorCategory::Validation,

            ProofAlreadyConsumed => ErrorCategory::Replay,

            AlreadyConfirmed
            | AlreadyFlagged
            | DisputeAlreadyOpen
            | AlreadyCommitted
            | AlreadyRevealed
            | SlashAlreadyApplied => ErrorCategory::Duplicate,

            ContributionAlreadySettled
            | ConfirmationLimitReached
            | DisputeAlreadyResolved
            | NothingToWithdraw
            | NotFlagged
            | RulingNotOverturned
            | OverturnSlashDisabled
            | AccountVersionTooOld
            | AccountVersionTooNew
            | VersionMismatchProtocol => ErrorCategory::State,

            FinalizationDelayNotElapsed
            | WithdrawalLocked
            | CommitWindowClosed
            | RevealWindowNotOpen
            | RevealWindowClosed
            | DisputeWindowOpen
            | SlashWindowExpired => ErrorCategory::Timing,

            InsufficientConfirmations => ErrorCategory::Consensus,

            ContributionFlagged | ContributionDisputed => ErrorCategory::Disputed,

            TokenTransferFailed | ArithmeticOverflow => ErrorCategory::Ledger,
        }
    }

    /// Resolve an on-chain error code back to a variant.
    pub fn from_code(code: u32) -> Option<Self> {
        use AttestationError::*;
        const ALL: [AttestationError; 59] = [
            ValidatorNotQualified,
            UnauthorizedValidator,
            UnauthorizedRegistrar,
            VoterIsParticipant,
            MultisigInvalidThreshold,
            MultisigInvalidSigners,
            MultisigNotEnoughSigners,
            MultisigDuplicateSigner,
            MultisigDefaultSigner,
            ValidatorNotConfirmer,
            DisputeNotFound,
            InvalidAmount,
            WorkerNotActive,
            InvalidContributionKey,
            InvalidProofDigest,
            ProofFieldMismatch,
            InvalidEvidenceHash,
            ProofFromFuture,
            MissingSignatureInstruction,
            InvalidSignatureInstruction,
            SignatureMismatch,
            CommitmentMismatch,
            InvalidCommitment,
            InvalidReason,
            InvalidProtocolParams,
            InvalidSlashReason,
            InsufficientStake,
            InvalidTokenAccount,
            InvalidMint,
            InvalidBuildingWallet,
            ProofAlreadyConsumed,
            AlreadyConfirmed,
            AlreadyFlagged,
            DisputeAlreadyOpen,
            AlreadyCommitted,
            AlreadyRevealed,
            SlashAlreadyApplied,
            ContributionAlreadySettled,
            ConfirmationLimitReached,
            DisputeAlreadyResolved,
            NothingToWithdraw,
            NotFlagged,
            RulingNotOverturned,
            OverturnSlashDisabled,
            AccountVersionTooOld,
            AccountVersionTooNew,
            VersionMismatchProtocol,
            FinalizationDelayNotElapsed,
            WithdrawalLocked,
            CommitWindowClosed,
            RevealWindowNotOpen,
            RevealWindowClosed,
            DisputeWindowOpen,
            SlashWindowExpired,
            InsufficientConfirmations,
            ContributionFlagged,
            ContributionDisputed,
            TokenTransferFailed,
            ArithmeticOverflow,
        ];
        ALL.iter().copied().find(|e| u32::from(*e) == code)
    }
}

/// Account every validator-only instruction loads for the caller's stake
const STAKE_ACCOUNT_NAME: &str = "stake";

/// Category of an error raised by this program or while loading its accounts.
///
/// A missing PDA fails in Anchor's account loading with
/// `AccountNotInitialized`: an unknown record, building or dispute is
/// NotFound, while a caller without a stake account is not a validator and
/// maps to Authorization.
pub fn error_category(err: &anchor_lang::error::Error) -> Option<ErrorCategory> {
    let anchor_lang::error::Error::AnchorError(e) = err else {
        return None;
    };
    if let Some(variant) = AttestationError::from_code(e.error_code_number) {
        return Some(variant.category());
    }
    if e.error_code_number != u32::from(ErrorCode::AccountNotInitialized) {
        return None;
    }
    let missing_stake = matches!(
        &e.error_origin,
        Some(ErrorOrigin::AccountName(name)) if name == STAKE_ACCOUNT_NAME
    );
    Some(if missing_stake {
        ErrorCategory::Authorization
    } else {
        ErrorCategory::NotFound
    })
}

/// Assert that `result` failed with `expected`.
#[cfg(test)]
pub(crate) fn assert_error<T>(result: Result<T>, expected: AttestationError) {
    match result {
        Err(anchor_lang::error::Error::AnchorError(e)) => assert_eq!(
            e.error_code_number,
            u32::from(expected),
            "expected {:?}, got {}",
            expected,
            e.error_name
        ),
        Err(anchor_lang::error::Error::ProgramError(e)) => {
            panic!("expected {:?}, got program error {:?}", expected, e)
        }
        Ok(_) => panic!("expected {:?}, got Ok", expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_start_at_anchor_offset() {
        assert_eq!(u32::from(AttestationError::ValidatorNotQualified), 6000);
        assert_eq!(
            AttestationError::from_code(6000).map(|e| e.category()),
            Some(ErrorCategory::Authorization)
        );
        assert!(AttestationError::from_code(5999).is_none());
    }

    #[test]
    fn test_every_code_round_trips() {
        let mut code = 6000u32;
        while let Some(variant) = AttestationError::from_code(code) {
            assert_eq!(u32::from(variant), code);
            code += 1;
        }
        assert_eq!(code, 6000 + 59);
    }

    #[test]
    fn test_taxonomy_mapping() {
        assert_eq!(
            AttestationError::ProofAlreadyConsumed.category(),
            ErrorCategory::Replay
        );
        assert_eq!(
            AttestationError::AlreadyConfirmed.category(),
            ErrorCategory::Duplicate
        );
        assert_eq!(
            AttestationError::FinalizationDelayNotElapsed.category(),
            ErrorCategory::Timing
        );
        assert_eq!(
            AttestationError::InsufficientConfirmations.category(),
            ErrorCategory::Consensus
        );
        assert_eq!(
            AttestationError::ContributionAlreadySettled.category(),
            ErrorCategory::State
        );
        assert_eq!(
            AttestationError::ContributionDisputed.category(),
            ErrorCategory::Disputed
        );
        assert_eq!(
            AttestationError::SignatureMismatch.category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_error_category_of_raised_error() {
        let err: anchor_lang::error::Error = error!(AttestationError::WithdrawalLocked);
        assert_eq!(error_category(&err), Some(ErrorCategory::Timing));
    }

    #[test]
    fn test_missing_accounts_are_categorized() {
        let missing = |account: &str| {
            anchor_lang::error::Error::from(ErrorCode::AccountNotInitialized)
                .with_account_name(account)
        };
        assert_eq!(
            error_category(&missing("stake")),
            Some(ErrorCategory::Authorization)
        );
        assert_eq!(
            error_category(&missing("contribution")),
            Some(ErrorCategory::NotFound)
        );
        assert_eq!(
            error_category(&error!(ErrorCode::ConstraintSeeds)),
            None
        );
    }
}
