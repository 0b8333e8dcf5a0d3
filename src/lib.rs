//! Local host address resolution for UPnP gateway routers.
//!
//! The [`router::Router`] trait is the contract every gateway implementation
//! fulfils; [`router::UpnpRouter`] is the one backed by UPnP discovery.

pub mod config;
pub mod log;
pub mod router;

pub use router::{Router, RouterError, UpnpRouter};
