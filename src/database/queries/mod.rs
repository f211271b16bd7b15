//! Per-table query functions. Every statement is scoped by `tenant_id`.

pub mod clients;
pub mod export_schedules;
pub mod filter_presets;
pub mod reports;
pub mod roles;
pub mod settings;
pub mod tenants;
pub mod users;
