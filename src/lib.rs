pub mod catalog;
pub mod core;
pub mod provider;
pub mod stream;
pub mod transport;

pub use core::traits::ProviderAdapter;
pub use core::types::*;
pub use provider::CerebrasAdapter;
