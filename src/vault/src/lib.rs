//! # Warden Vault
//!
//! Long-lived "multipass" credentials revocable in O(1).
//!
//! ## Features
//!
//! - **Generation counters**: one stored counter per multipass decides which
//!   token is current; bumping it revokes every earlier token
//! - **Deterministic jti**: `hex(sha256("<generation> <salt>"))`
//! - **HS256 tokens** minted only after the new generation is persisted
//! - **Credential stores** in memory or on disk with sled
//!
//! ## Module Structure
//!
//! ```text
//! vault/
//! ├── multipass/     - Multipass model and jti derivation
//! ├── token/         - HS256 minting and decoding
//! ├── store/         - In-memory and sled credential stores
//! └── service/       - Issue, verify, revoke, delete
//! ```

pub mod error;
pub mod multipass;
pub mod service;
pub mod store;
pub mod token;

pub use error::{Result, VaultError};
pub use multipass::{GenerationNumber, Multipass, MultipassUuid, TokenJti};
pub use service::MultipassService;
pub use store::{CredentialStore, MemoryCredentialStore, SledCredentialStore};
pub use token::{JwtConfig, JwtIssuer, MultipassClaims};
