//! # Utilities Module
//!
//! Internal utility modules for the core-logic crate.

pub(crate) mod address_book;
pub(crate) mod clock;
pub(crate) mod endpoint_pool;
pub(crate) mod logger;
pub(crate) mod retry;
pub(crate) mod runner;
pub(crate) mod wallet_manager;

pub use logger::setup_logger;
pub use runner::WorkerRunner;
