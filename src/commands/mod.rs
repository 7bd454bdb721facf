//! Individual command implementations.
//!
//! Each module owns the request/response layout of one device command.
//! You probably want [`LedgerIota`](crate::api::LedgerIota) instead.

pub mod app_config;
pub mod gen_address;
pub mod pubkey;
pub mod reset;
pub mod set_account;
pub mod set_seed;
pub mod sign;
pub mod tx;
