//! Channel Forward Bot Library
//!
//! A Telegram bot that copies every message of one channel into another.
//!
//! This crate provides the core functionality for:
//! - Persisting the source and target channel
//! - Handling `/setsource`, `/setforward`, `/status` and `/forward`
//! - Forwarding a channel's full history oldest first
//! - Serving a health check endpoint

pub mod commands;
pub mod config;
pub mod forwarder;
pub mod health;
pub mod telegram;
