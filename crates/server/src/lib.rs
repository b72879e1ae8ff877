//! Loyalty card HTTP service.
//!
//! Staff look up customers by card code and record drink orders, which
//! accrue tokens at one per nine units; tokens can be redeemed against the
//! customer's balance. Admins manage users, customers and the drink catalog
//! and can import or export the data as a spreadsheet.
//!
//! The binary in `main.rs` wires configuration, logging and the database
//! pool around [`routes::app`].

#![cfg_attr(not(test), forbid(unsafe_code))]
#![cfg_attr(test, allow(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
