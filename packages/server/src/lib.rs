// Classifieds Marketplace - Discovery Engine Core
//
// This crate provides the category-scoped attribute schema (EAV with
// inheritance), the typed validation/upsert pipeline for attribute values,
// the query-filter engine, the shared visibility policy, and the relevance
// ranking + discovery read surfaces.
//
// HTTP routing, auth/session issuance, images, messaging, and background
// jobs are external collaborators; this crate exposes the engine as a
// library over a PgPool.

pub mod common;
pub mod config;
pub mod domains;

pub use config::*;
