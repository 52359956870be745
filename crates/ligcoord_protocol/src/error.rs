//! The coordinator's single cross-crate error type.
//!
//! Kept deliberately flat (one variant per error kind) so callers can match on it
//! without reaching into nested error trees.

use thiserror::Error;

/// Errors the coordination fabric distinguishes between.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Missing or invalid environment configuration. Fatal at startup.
    #[error("config error: {0}")]
    Config(String),

    /// Executor or object-store network failure / non-2xx response.
    #[error("transient remote error: {0}")]
    TransientRemote(String),

    /// Relational store failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Object-store "no such key" for a key other than the per-job weight (which is
    /// handled internally by the default-weight fallback).
    #[error("not found: {0}")]
    NotFound(String),

    /// Handler-side rendezvous timeout.
    #[error("timeout waiting for available worker")]
    Timeout,

    /// Malformed bus message payload.
    #[error("failed to decode message: {0}")]
    Decode(String),

    /// Tar archive pack/unpack failure.
    #[error("archive error: {0}")]
    Archive(String),
}

impl CoordinatorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transient_remote(msg: impl Into<String>) -> Self {
        Self::TransientRemote(msg.into())
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn archive(msg: impl Into<String>) -> Self {
        Self::Archive(msg.into())
    }
}
