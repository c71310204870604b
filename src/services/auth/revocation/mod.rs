pub mod memory;
pub mod registry;
pub mod valkey;

pub use memory::MemoryRevocationRegistry;
pub use registry::{RevocationError, RevocationRegistry, fingerprint};
pub use valkey::ValkeyRevocationRegistry;
