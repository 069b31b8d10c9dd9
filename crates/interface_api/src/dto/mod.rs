//! Request and response bodies that are not domain types

pub mod auth;
pub mod bill;
pub mod payment;
