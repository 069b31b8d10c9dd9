//! Request handlers, one module per resource

pub mod auth;
pub mod tenant;
pub mod bill;
pub mod payment;
pub mod health;
