//! Router contract shared by all gateway implementations.
//!
//! A router knows where its gateway lives (`internal_host_name` and
//! `internal_port`) and how to drop its connection. Everything else,
//! including finding the local host's address, is built on those.

use std::fmt;

use tracing::warn;

pub mod address;
mod error;
mod gateway;

pub use address::{AddressProbe, SystemProbe, is_loopback};
pub use error::RouterError;
pub use gateway::{SearchConfig, UNKNOWN_HOST, UpnpRouter};

pub trait Router: Send + Sync {
    /// Display name, fixed at construction.
    fn name(&self) -> &str;

    /// Address of the gateway as known to this router. Implementations
    /// document what they return before the first connection.
    fn internal_host_name(&self) -> String;

    /// Control port of the gateway, or `None` when not connected.
    /// `Some(0)` is treated like `None`.
    fn internal_port(&self) -> Option<u16>;

    /// Release the gateway connection. Must succeed when already disconnected.
    fn disconnect(&self) -> Result<(), RouterError>;

    /// The local host's non-loopback address, as a string.
    fn local_host_address(&self) -> Result<String, RouterError> {
        address::resolve(self, &SystemProbe).map(|ip| ip.to_string())
    }

    /// Disconnect, logging instead of returning any failure.
    fn close(&self) {
        if let Err(e) = self.disconnect() {
            warn!("Failed to disconnect from {}: {}", self.name(), e);
        }
    }

    /// `"<name> (<internal host name>)"`, for logs and display.
    fn describe(&self) -> String {
        format!("{} ({})", self.name(), self.internal_host_name())
    }
}

impl fmt::Display for dyn Router + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRouter {
        name: String,
        disconnects: AtomicUsize,
        fail_disconnect: bool,
    }

    impl CountingRouter {
        fn new(name: &str, fail_disconnect: bool) -> Self {
            Self {
                name: name.to_string(),
                disconnects: AtomicUsize::new(0),
                fail_disconnect,
            }
        }
    }

    impl Router for CountingRouter {
        fn name(&self) -> &str {
            &self.name
        }

        fn internal_host_name(&self) -> String {
            "192.168.1.1".to_string()
        }

        fn internal_port(&self) -> Option<u16> {
            None
        }

        fn disconnect(&self) -> Result<(), RouterError> {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
            if self.fail_disconnect {
                Err(RouterError::new("gateway went away"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_close_disconnects_every_time() {
        let router = CountingRouter::new("Home", false);
        router.close();
        router.close();
        router.close();
        assert_eq!(router.disconnects.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_close_swallows_disconnect_errors() {
        let router = CountingRouter::new("Home", true);
        router.close();
        router.close();
        assert_eq!(router.disconnects.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_describe_and_display() {
        let router = CountingRouter::new("FRITZ!Box 7590", false);
        assert_eq!(router.describe(), "FRITZ!Box 7590 (192.168.1.1)");

        let dyn_router: &dyn Router = &router;
        assert_eq!(dyn_router.to_string(), "FRITZ!Box 7590 (192.168.1.1)");
    }

    #[test]
    fn test_name_is_stable() {
        let router = CountingRouter::new("Home", false);
        router.close();
        assert_eq!(router.name(), "Home");
    }
}
