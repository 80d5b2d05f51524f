//! External API integrations

pub mod extraction;
pub mod purchasing;

pub use extraction::ExtractionClient;
pub use purchasing::PurchasingClient;
