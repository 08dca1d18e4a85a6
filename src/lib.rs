//! Logistics Dashboard backend
//!
//! Keeps shops, drivers, routes and per-driver targets in memory, serves them
//! over a JSON REST API, and suggests shorter stop orders for routes.
//!
//! # Domain Model
//!
//! - [`Shop`](domain::Shop): Delivery point with a position, category and status
//! - [`Driver`](domain::Driver): Person who drives routes
//! - [`Route`](domain::Route): A day's ordered list of shops, optionally assigned to a driver
//! - [`Target`](domain::Target): A driver's shop and delivery goals for a period
//!
//! # Request Flow
//!
//! - CRUD: payload → [`validation`] → [`store`] → JSON response
//! - Optimization: route lookup → shop resolution → [`optimizer`] on a
//!   blocking task under a timeout → result check → history → response

pub mod api;
pub mod config;
pub mod console;
pub mod demo_data;
pub mod domain;
pub mod error;
pub mod optimization;
pub mod optimizer;
pub mod stats;
pub mod store;
pub mod validation;
