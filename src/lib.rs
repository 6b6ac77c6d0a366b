//! airdnd: vacation-rental marketplace backend.
//!
//! Sled-backed document collections (users, homes, bookings, reviews),
//! per-entity services holding the domain rules, and an Axum REST layer.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod id;
pub mod models;
pub mod pricing;
// REST API module: Axum handlers under /api
pub mod rest;
pub mod services;
pub mod storage;
pub mod telemetry;
