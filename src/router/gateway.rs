//! UPnP Internet Gateway Device router.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use igd_next::Gateway;
use tracing::{debug, info};

use super::{Router, RouterError, SystemProbe, address};

/// Host name reported before the router has ever been connected.
pub const UNKNOWN_HOST: &str = "unknown";

/// How to search for the gateway.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// How long to wait for an SSDP answer
    pub timeout: Duration,
    /// Local address to search from. Resolved through the router when unset.
    pub bind_ip: Option<Ipv4Addr>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            bind_ip: None,
        }
    }
}

#[derive(Default)]
struct State {
    gateway: Option<Gateway>,
    /// Control endpoint while connected
    control: Option<SocketAddr>,
    /// Survives `disconnect` so the router can still be labelled
    last_host: Option<IpAddr>,
}

/// A [`Router`] for a gateway found through UPnP discovery.
///
/// Before the first [`connect`](UpnpRouter::connect) the internal host name
/// is [`UNKNOWN_HOST`]; after a disconnect it is the last gateway seen.
pub struct UpnpRouter {
    name: String,
    state: RwLock<State>,
}

impl UpnpRouter {
    pub fn new(name: impl Into<String>) -> Result<Self, RouterError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RouterError::new("router name must not be empty"));
        }
        Ok(Self {
            name,
            state: RwLock::new(State::default()),
        })
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Search for the gateway and keep it as the current connection.
    pub fn connect(&self, search: &SearchConfig) -> Result<(), RouterError> {
        let local_ip = match search.bind_ip {
            Some(ip) => IpAddr::V4(ip),
            None => address::resolve(self, &SystemProbe)?,
        };
        if !local_ip.is_ipv4() {
            return Err(RouterError::new(format!(
                "cannot search for a gateway from IPv6 address {}",
                local_ip
            )));
        }
        debug!("Searching for UPnP gateway from {}", local_ip);

        let gateway = igd_next::search_gateway(igd_next::SearchOptions {
            timeout: Some(search.timeout),
            bind_addr: SocketAddr::new(local_ip, 0),
            ..Default::default()
        })
        .map_err(|e| RouterError::with_source("failed to find gateway", e.to_string()))?;

        info!("Found gateway at {}", gateway.addr);
        self.set_session(gateway.addr, Some(gateway));
        Ok(())
    }

    /// Replace the current session, if any.
    fn set_session(&self, control: SocketAddr, gateway: Option<Gateway>) {
        let mut state = self.write();
        if let Some(previous) = state.control.replace(control) {
            debug!("Replacing session with {}", previous);
        }
        state.last_host = Some(control.ip());
        state.gateway = gateway;
    }

    pub fn is_connected(&self) -> bool {
        self.read().control.is_some()
    }

    /// The gateway's WAN address.
    pub fn external_ip(&self) -> Result<IpAddr, RouterError> {
        let state = self.read();
        let gateway = state
            .gateway
            .as_ref()
            .ok_or_else(|| RouterError::new(format!("not connected to {}", self.name)))?;
        gateway
            .get_external_ip()
            .map_err(|e| RouterError::with_source("failed to get external IP", e.to_string()))
    }

    #[cfg(test)]
    fn attach(&self, control: SocketAddr) {
        self.set_session(control, None);
    }
}

impl Router for UpnpRouter {
    fn name(&self) -> &str {
        &self.name
    }

    fn internal_host_name(&self) -> String {
        match self.read().last_host {
            Some(ip) => ip.to_string(),
            None => UNKNOWN_HOST.to_string(),
        }
    }

    fn internal_port(&self) -> Option<u16> {
        self.read().control.map(|addr| addr.port())
    }

    fn disconnect(&self) -> Result<(), RouterError> {
        let mut state = self.write();
        if state.control.take().is_some() {
            debug!("Disconnected from {}", self.name);
        }
        state.gateway = None;
        Ok(())
    }
}

impl std::fmt::Display for UpnpRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}
