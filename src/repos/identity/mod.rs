/*
 * Responsibility
 * - 認証コアが外部に求める identity lookup の契約 (IdentityStore)
 * - Postgres 実装と in-memory 実装
 */
mod memory;
mod pg;
mod store;

pub use memory::MemoryIdentityStore;
pub use pg::PgIdentityStore;
pub use store::{Identity, IdentityStore};
