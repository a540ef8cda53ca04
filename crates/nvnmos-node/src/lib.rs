//! NMOS control-plane node library.
//!
//! This crate implements a single NMOS Node: an IS-04/IS-05 resource model
//! (Node, Device, Source, Flow, Sender, Receiver), an SDP codec that derives
//! NMOS resources from `x-nvnmos-*`-tagged SDP and re-emits them, a staged/
//! active IS-05 connection-management engine, the IS-04/IS-05 HTTP surface,
//! a registry discovery/heartbeat agent, and a safe `extern "C"` embedding
//! shim for non-Rust hosts.
//!
//! Modules are layered bottom-up: [`idgen`] and [`sdp`] have no dependency
//! on the rest of the crate; [`model`] depends on both; [`connection`]
//! depends on `model`; [`api`] and [`discovery`] depend on `connection` and
//! `model`; [`facade`] composes everything into the public embedding API.

pub mod api;
pub mod config;
pub mod connection;
pub mod discovery;
pub mod error;
pub mod facade;
pub mod idgen;
pub mod model;
pub mod sdp;

pub use config::{NodeConfig, Settings};
pub use error::{NodeError, Result};
pub use facade::NmosNode;
