pub mod digest_composer;
pub mod digest_models;
pub mod digest_render;
pub mod digest_store;

pub use digest_composer::DigestComposer;
pub use digest_store::{DigestStore, PgDigestStore};
