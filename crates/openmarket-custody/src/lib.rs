//! # openmarket-custody
//!
//! Collaborator seams for the **OpenMarket** engine:
//!
//! - [`TokenLedger`]: fungible token custody (`balance_of`, `transfer`,
//!   `transfer_from`), with [`InMemoryLedger`] as the reference implementation
//! - [`Authorizer`]: capability checks for privileged operations, with
//!   [`RoleRegistry`] as the reference implementation

pub mod access;
pub mod ledger;

pub use access::{Authorizer, Capability, RoleRegistry};
pub use ledger::{InMemoryLedger, TokenLedger};
