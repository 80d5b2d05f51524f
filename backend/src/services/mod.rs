//! Business logic services for the Warehouse Management Platform

pub mod alerts;
pub mod catalog;
pub mod monitor;
pub mod planner;
pub mod reconciliation;

pub use alerts::AlertService;
pub use catalog::CatalogService;
pub use monitor::{MonitorService, ReplenishmentPolicy};
pub use planner::PlannerService;
pub use reconciliation::ReconciliationService;
