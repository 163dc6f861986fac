//! Provisions the application's MongoDB credential on first start.
//!
//! The binary resolves [`initdb_kernel::Settings`] from the environment and
//! hands the bootstrap part to [`bootstrap::run`] together with a
//! [`initdb_db::MongoRegistry`].

pub mod bootstrap;
