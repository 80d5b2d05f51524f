//! HTTP handlers for the Warehouse Management Platform

pub mod alerts;
pub mod bills;
pub mod drafts;
pub mod health;
pub mod products;
pub mod suppliers;

pub use alerts::*;
pub use bills::*;
pub use drafts::*;
pub use health::*;
pub use products::*;
pub use suppliers::*;
