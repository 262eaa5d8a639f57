//! `cnpj-core`: identifier roots and the typed records they key.
//!
//! Pure crate: no IO. Everything that decides whether a registry row matches
//! a candidate lives here so both the ingestion and lookup stages agree on it.

pub mod cnpj;
pub mod record;
pub mod root;

pub use record::{CompanyRecord, Schema, DEFAULT_PROJECTION, DEFAULT_SCHEMA};
pub use root::{derive_root, normalize_identifier, RootSet, ROOT_LEN};
