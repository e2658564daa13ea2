//! Instruction handlers for the ArxOS attestation protocol

pub mod constants;
pub mod contribution_helpers;
pub mod dispute_helpers;
pub mod settlement_helpers;
pub mod stake_helpers;
pub mod token_helpers;

pub mod apply_overturn_slash;
pub mod attest_contribution;
pub mod clear_flag;
pub mod commit_vote;
pub mod complete_withdrawal;
pub mod deposit_stake;
pub mod finalize_contribution;
pub mod flag_contribution;
pub mod initialize_protocol;
pub mod raise_dispute;
pub mod register_building;
pub mod register_worker;
pub mod request_withdrawal;
pub mod resolve_dispute;
pub mod reveal_vote;
pub mod set_worker_status;
pub mod slash_validator;
pub mod update_building_wallet;
pub mod update_protocol_params;

#[allow(ambiguous_glob_reexports)]
pub use apply_overturn_slash::*;
#[allow(ambiguous_glob_reexports)]
pub use attest_contribution::*;
#[allow(ambiguous_glob_reexports)]
pub use clear_flag::*;
#[allow(ambiguous_glob_reexports)]
pub use commit_vote::*;
#[allow(ambiguous_glob_reexports)]
pub use complete_withdrawal::*;
#[allow(ambiguous_glob_reexports)]
pub use deposit_stake::*;
#[allow(ambiguous_glob_reexports)]
pub use finalize_contribution::*;
#[allow(ambiguous_glob_reexports)]
pub use flag_contribution::*;
#[allow(ambiguous_glob_reexports)]
pub use initialize_protocol::*;
#[allow(ambiguous_glob_reexports)]
pub use raise_dispute::*;
#[allow(ambiguous_glob_reexports)]
pub use register_building::*;
#[allow(ambiguous_glob_reexports)]
pub use register_worker::*;
#[allow(ambiguous_glob_reexports)]
pub use request_withdrawal::*;
#[allow(ambiguous_glob_reexports)]
pub use resolve_dispute::*;
#[allow(ambiguous_glob_reexports)]
pub use reveal_vote::*;
#[allow(ambiguous_glob_reexports)]
pub use set_worker_status::*;
#[allow(ambiguous_glob_reexports)]
pub use slash_validator::*;
#[allow(ambiguous_glob_reexports)]
pub use update_building_wallet::*;
#[allow(ambiguous_glob_reexports)]
pub use update_protocol_params::*;
