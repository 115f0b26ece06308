pub mod common;
pub mod config;
pub mod history;
pub mod order;
pub mod packet;
pub mod result;
pub mod session;
pub mod store;
pub mod transport;

#[cfg(feature = "test-utils")]
pub mod test_utils;
