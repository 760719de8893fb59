//! Static credential strategies
//!
//! Both strategies match opaque credentials against a fixed table built from
//! configuration. They differ only in how identities are bound:
//!
//! - [`KeyTableVerifier`] - each key carries its own identity
//! - [`AllowListVerifier`] - every listed token resolves to one shared identity

pub mod allow_list;
pub mod key_table;

pub use allow_list::AllowListVerifier;
pub use key_table::KeyTableVerifier;
