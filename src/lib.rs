//! Commerce rule engine
//!
//! This crate evaluates administrator-configured commerce rules against a
//! runtime context: whether prices are shown, which rush surcharge applies,
//! and what off-hours collection costs. Rules are evaluated in
//! `(priority, id)` order and the first active match wins; when nothing
//! matches, an explicit system default applies.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod logging;
pub mod models;
pub mod store;
