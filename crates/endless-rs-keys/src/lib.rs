//! Key resolution: text → seed → dimension id, curated easter-egg keys,
//! and the persistent registry of user-minted custom keys.

pub mod custom;
pub mod easter;
pub mod hash;
pub mod resolver;

pub use custom::{CustomKeyRegistry, KeyStoreError};
pub use resolver::{resolve, KeyKind, ResolvedKey};
