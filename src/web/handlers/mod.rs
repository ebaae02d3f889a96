//! # Web Handlers

pub mod health;
