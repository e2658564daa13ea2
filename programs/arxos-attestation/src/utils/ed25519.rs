//! Ed25519 signature checks through instruction introspection.
//!
//! The runtime's Ed25519 precompile verifies signatures carried in its own
//! instruction and aborts the transaction if any is invalid. This program
//! only has to confirm that the instruction right before it verified the
//! expected (public key, message, signature) triple.
//!
//! Precompile data layout:
//!
//! | bytes | field |
//! |-------|-------|
//! | 0 | number of signatures |
//! | 1 | padding |
//! | 2..16 | offsets for signature 0 (7 × u16 LE) |
//! | ... | public keys, signatures and messages |

use anchor_lang::prelude::*;
use anchor_lang::solana_program::instruction::Instruction;
use anchor_lang::solana_program::sysvar::instructions::{
    load_current_index_checked, load_instruction_at_checked,
};

use crate::errors::AttestationError;

/// Native Ed25519 signature verification program
pub const ED25519_PROGRAM_ID: Pubkey = pubkey!("Ed25519SigVerify111111111111111111111111111");

pub const SIGNATURE_LEN: usize = 64;
pub const PUBKEY_LEN: usize = 32;

const OFFSETS_START: usize = 2;
const OFFSETS_LEN: usize = 14;

/// Offsets marking data inside the current instruction
const CURRENT_INSTRUCTION: u16 = u16::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignatureOffsets {
    signature_offset: u16,
    signature_instruction_index: u16,
    public_key_offset: u16,
    public_key_instruction_index: u16,
    message_data_offset: u16,
    message_data_size: u16,
    message_instruction_index: u16,
}

impl SignatureOffsets {
    fn parse(data: &[u8]) -> Option<Self> {
        let raw = data.get(OFFSETS_START..OFFSETS_START + OFFSETS_LEN)?;
        let read = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        Some(Self {
            signature_offset: read(0),
            signature_instruction_index: read(2),
            public_key_offset: read(4),
            public_key_instruction_index: read(6),
            message_data_offset: read(8),
            message_data_size: read(10),
            message_instruction_index: read(12),
        })
    }

    fn is_self_contained(&self) -> bool {
        self.signature_instruction_index == CURRENT_INSTRUCTION
            && self.public_key_instruction_index == CURRENT_INSTRUCTION
            && self.message_instruction_index == CURRENT_INSTRUCTION
    }
}

fn slice(data: &[u8], offset: u16, len: usize) -> Result<&[u8]> {
    let start = offset as usize;
    let end = start
        .checked_add(len)
        .ok_or(AttestationError::InvalidSignatureInstruction)?;
    data.get(start..end)
        .ok_or_else(|| error!(AttestationError::InvalidSignatureInstruction))
}

/// Check that precompile instruction data carries exactly one signature by
/// `signer` over `message` with bytes equal to `signature`.
pub fn verify_ed25519_data(
    data: &[u8],
    signer: &Pubkey,
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<()> {
    require!(
        data.first() == Some(&1),
        AttestationError::InvalidSignatureInstruction
    );
    let offsets =
        SignatureOffsets::parse(data).ok_or(AttestationError::InvalidSignatureInstruction)?;
    require!(
        offsets.is_self_contained(),
        AttestationError::InvalidSignatureInstruction
    );

    let pubkey = slice(data, offsets.public_key_offset, PUBKEY_LEN)?;
    let sig = slice(data, offsets.signature_offset, SIGNATURE_LEN)?;
    let msg_bytes = slice(
        data,
        offsets.message_data_offset,
        offsets.message_data_size as usize,
    )?;

    require!(
        pubkey == signer.as_ref(),
        AttestationError::SignatureMismatch
    );
    require!(sig == signature.as_slice(), AttestationError::SignatureMismatch);
    require!(msg_bytes == message, AttestationError::SignatureMismatch);
    Ok(())
}

/// Same check against a full instruction, including its program id.
pub fn verify_ed25519_instruction(
    ix: &Instruction,
    signer: &Pubkey,
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<()> {
    require_keys_eq!(
        ix.program_id,
        ED25519_PROGRAM_ID,
        AttestationError::MissingSignatureInstruction
    );
    require!(
        ix.accounts.is_empty(),
        AttestationError::InvalidSignatureInstruction
    );
    verify_ed25519_data(&ix.data, signer, message, signature)
}

/// Load the instruction preceding the current one from the instructions
/// sysvar and verify it.
pub fn verify_preceding_ed25519(
    instructions_sysvar: &AccountInfo,
    signer: &Pubkey,
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<()> {
    let current = load_current_index_checked(instructions_sysvar)?;
    require!(current > 0, AttestationError::MissingSignatureInstruction);
    let ix = load_instruction_at_checked((current - 1) as usize, instructions_sysvar)?;
    verify_ed25519_instruction(&ix, signer, message, signature)
}

/// Build precompile instruction data for one signature, in the layout the
/// Solana SDK produces. Used by clients and tests.
pub fn build_ed25519_data(
    signer: &Pubkey,
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> Vec<u8> {
    let data_start = OFFSETS_START + OFFSETS_LEN;
    let public_key_offset = data_start;
    let signature_offset = public_key_offset + PUBKEY_LEN;
    let message_data_offset = signature_offset + SIGNATURE_LEN;

    let mut data = Vec::with_capacity(message_data_offset + message.len());
    data.push(1);
    data.push(0);
    for value in [
        signature_offset as u16,
        CURRENT_INSTRUCTION,
        public_key_offset as u16,
        CURRENT_INSTRUCTION,
        message_data_offset as u16,
        message.len() as u16,
        CURRENT_INSTRUCTION,
    ] {
        data.extend_from_slice(&value.to_le_bytes());
    }
    data.extend_from_slice(signer.as_ref());
    data.extend_from_slice(signature);
    data.extend_from_slice(message);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Pubkey, Vec<u8>, [u8; SIGNATURE_LEN]) {
        let signer = Pubkey::new_unique();
        let message = b"ARXOS_CONTRIBUTION_PROOF_V1 test payload".to_vec();
        let mut signature = [0u8; SIGNATURE_LEN];
        for (i, b) in signature.iter_mut().enumerate() {
            *b = i as u8;
        }
        (signer, message, signature)
    }

    fn precompile_ix(data: Vec<u8>) -> Instruction {
        Instruction {
            program_id: ED25519_PROGRAM_ID,
            accounts: vec![],
            data,
        }
    }

    #[test]
    fn test_matching_instruction_accepted() {
        let (signer, message, signature) = fixture();
        let ix = precompile_ix(build_ed25519_data(&signer, &message, &signature));
        assert!(verify_ed25519_instruction(&ix, &signer, &message, &signature).is_ok());
    }

    #[test]
    fn test_wrong_program_rejected() {
        let (signer, message, signature) = fixture();
        let mut ix = precompile_ix(build_ed25519_data(&signer, &message, &signature));
        ix.program_id = Pubkey::new_unique();
        assert!(verify_ed25519_instruction(&ix, &signer, &message, &signature).is_err());
    }

    #[test]
    fn test_other_signer_rejected() {
        let (signer, message, signature) = fixture();
        let data = build_ed25519_data(&signer, &message, &signature);
        let impostor = Pubkey::new_unique();
        assert!(verify_ed25519_data(&data, &impostor, &message, &signature).is_err());
    }

    #[test]
    fn test_other_message_rejected() {
        let (signer, message, signature) = fixture();
        let data = build_ed25519_data(&signer, &message, &signature);
        let mut altered = message.clone();
        altered[0] ^= 1;
        assert!(verify_ed25519_data(&data, &signer, &altered, &signature).is_err());
        assert!(verify_ed25519_data(&data, &signer, &message[1..], &signature).is_err());
    }

    #[test]
    fn test_other_signature_bytes_rejected() {
        let (signer, message, signature) = fixture();
        let data = build_ed25519_data(&signer, &message, &signature);
        let mut other = signature;
        other[63] ^= 0xff;
        assert!(verify_ed25519_data(&data, &signer, &message, &other).is_err());
    }

    #[test]
    fn test_multiple_signatures_rejected() {
        let (signer, message, signature) = fixture();
        let mut data = build_ed25519_data(&signer, &message, &signature);
        data[0] = 2;
        assert!(verify_ed25519_data(&data, &signer, &message, &signature).is_err());
    }

    #[test]
    fn test_cross_instruction_offsets_rejected() {
        let (signer, message, signature) = fixture();
        let mut data = build_ed25519_data(&signer, &message, &signature);
        // message_instruction_index points at instruction 0
        data[14] = 0;
        data[15] = 0;
        assert!(verify_ed25519_data(&data, &signer, &message, &signature).is_err());
    }

    #[test]
    fn test_truncated_data_rejected() {
        let (signer, message, signature) = fixture();
        let data = build_ed25519_data(&signer, &message, &signature);
        assert!(verify_ed25519_data(&data[..10], &signer, &message, &signature).is_err());
        assert!(
            verify_ed25519_data(&data[..data.len() - 1], &signer, &message, &signature).is_err()
        );
        assert!(verify_ed25519_data(&[], &signer, &message, &signature).is_err());
    }
}
