//! # icdd-core
//!
//! Versioned, graph-backed information containers in the shape of ISO 21597 (ICDD).
//!
//! ## Overview
//!
//! An information container bundles documents, typed links between fragments of those
//! documents, and party and version metadata. All of it is stored as statements in a
//! triple graph: an index graph describing the container, plus one sub-graph per linkset.
//! icdd-core keeps a typed object model in step with those graphs and checks the integrity
//! rules a plain triple store cannot enforce on its own.
//!
//! ### Key Features
//!
//! - **Live graph entities**: every document, linkset, link and party is a node; attribute
//!   reads and writes go straight to the graph
//! - **Closed type tables**: documents, links and identifiers dispatch on their type marker
//!   through explicit tables, unknown markers are reported and skipped
//! - **Lazy linksets**: link sub-graphs load on first use and stay in sync with their cache
//! - **Version chains**: container descriptions and documents form acyclic prior-version chains
//! - **Validation**: structural conformance reports plus consistency, bi-uniqueness and
//!   bi-totality checks over linksets
//!
//! ## Architecture
//!
//! - **[`graph`]**: triple store, `SharedGraph`, and the Turtle codec
//! - **[`entity`]**: identifiers and the graph-backed entity base
//! - **[`document`]**, **[`identifier`]**, **[`link`]**, **[`linkset`]**, **[`party`]**: the
//!   typed model
//! - **[`description`]**: the container description and its collections
//! - **[`container`]**: the workfolder, payload files and the container lifecycle
//! - **[`validation`]**: conformance state machine and relational checks
//! - **[`session`]**: export lock, reader registry, container cache and reader/writer types
//! - **[`services`]**: interfaces of query, shape-validation and conversion collaborators
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use icdd_core::{
//!     config::IcddConfig,
//!     container::InformationContainer,
//!     link::{LinkEnds, LinkKind},
//!     Entity,
//! };
//! use std::path::Path;
//!
//! fn main() -> Result<(), icdd_core::IcddError> {
//!     let config = IcddConfig::default();
//!     let mut container = InformationContainer::create("site", &config)?;
//!     let plan = container.create_internal_document(
//!         Path::new("plan.pdf"), "plan", "pdf", "application/pdf", None,
//!     )?;
//!     let model = container.create_external_document(
//!         "https://example.org/model.ifc", "model", "ifc", "application/x-step",
//!     )?;
//!
//!     let links = container.create_linkset("plan-model")?;
//!     if let Some(linkset) = container.linkset_mut(&links) {
//!         let a = linkset.create_link_element(plan.id(), None);
//!         let b = linkset.create_link_element(model.id(), None);
//!         linkset.create_link(LinkKind::BinaryLink, LinkEnds::Undirected(vec![a, b]))?;
//!     }
//!
//!     let report = container.validate();
//!     println!("{} criteria, {} failed", report.len(), report.failure_count());
//!     container.export(Path::new("site.icdd"))?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **default**: everything above
//! - **logging**: [`init_tracing`] installs an env-filter `tracing` subscriber for binaries

pub mod archive;
pub mod config;
pub mod container;
pub mod description;
pub mod document;
pub mod entity;
pub mod error;
pub mod fileutil;
pub mod graph;
pub mod identifier;
pub mod link;
pub mod linkset;
pub mod party;
pub mod services;
pub mod session;
#[cfg(test)]
mod tests;
pub mod validation;
pub mod vocab;

pub use entity::{Entity, EntityId};
pub use error::*;

/// Installs a formatting subscriber filtered by `RUST_LOG`. Does nothing if one is installed.
#[cfg(feature = "logging")]
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();
}
