//! User registries the initializer can provision against.

pub mod memory;
pub mod mongo;

pub use memory::MemoryRegistry;
pub use mongo::{client_options, create_user_command, MongoRegistry};
