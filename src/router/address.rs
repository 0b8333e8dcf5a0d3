//! Resolution of the local host's outward-facing address.
//!
//! No single "local IP" exists on a machine with several interfaces, so the
//! address is derived from the route the OS picks for a destination. When the
//! router is connected its gateway is that destination; otherwise the
//! hostname lookup and a connected UDP socket are used instead.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, TcpStream, ToSocketAddrs, UdpSocket};

use tracing::debug;

use super::{Router, RouterError};

/// Destination the UDP probe is connected to. Nothing is sent; connecting
/// only makes the OS pick the interface it would route through.
pub const PROBE_DESTINATION: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(8, 8, 8, 8), 80);

/// The OS primitives the resolver is built on.
pub trait AddressProbe {
    /// Open a TCP connection to `host:port` and return the local address the
    /// connection was bound to. The connection is closed before returning.
    fn socket_local_address(&self, host: &str, port: u16) -> io::Result<IpAddr>;

    /// Resolve this machine's own hostname. `Ok(None)` means the name
    /// resolved to nothing.
    fn local_host_address(&self) -> io::Result<Option<IpAddr>>;

    /// Connect a UDP socket to a fixed destination and return the local
    /// address it was bound to. The socket is closed before returning.
    fn datagram_local_address(&self) -> io::Result<IpAddr>;
}

/// [`AddressProbe`] backed by real sockets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl AddressProbe for SystemProbe {
    fn socket_local_address(&self, host: &str, port: u16) -> io::Result<IpAddr> {
        let addrs = prefer_ipv4((host, port).to_socket_addrs()?);
        if addrs.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for '{}'", host),
            ));
        }

        let stream = TcpStream::connect(&addrs[..])?;
        let local = stream.local_addr()?;
        Ok(local.ip())
    }

    fn local_host_address(&self) -> io::Result<Option<IpAddr>> {
        let name = hostname::get()?;
        let name = name.to_string_lossy();
        debug!("Resolving local hostname '{}'", name);

        let addrs = prefer_ipv4((name.as_ref(), 0).to_socket_addrs()?);
        Ok(addrs.first().map(SocketAddr::ip))
    }

    fn datagram_local_address(&self) -> io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(PROBE_DESTINATION)?;
        let local = socket.local_addr()?;
        Ok(local.ip())
    }
}

/// Order resolved addresses so IPv4 entries come first.
fn prefer_ipv4(addrs: impl Iterator<Item = SocketAddr>) -> Vec<SocketAddr> {
    let (mut v4, v6): (Vec<_>, Vec<_>) = addrs.partition(SocketAddr::is_ipv4);
    v4.extend(v6);
    v4
}

/// True for addresses in `127.0.0.0/8`, for `::1`, and for IPv4-mapped
/// loopback addresses.
pub fn is_loopback(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.to_ipv4_mapped().is_some_and(|v4| v4.is_loopback())
        }
    }
}

/// An IPv4 address outside `127.0.0.0/8`.
fn is_usable(addr: &IpAddr) -> bool {
    addr.is_ipv4() && !is_loopback(addr)
}

/// Find the local host's IPv4 address as seen from `router`'s network.
///
/// The result is never a loopback address. A failure of the TCP connection
/// to the gateway, or of the hostname lookup, is reported immediately; it
/// does not fall through to the UDP probe.
pub fn resolve<R, P>(router: &R, probe: &P) -> Result<IpAddr, RouterError>
where
    R: Router + ?Sized,
    P: AddressProbe + ?Sized,
{
    debug!("Get IP of localhost");

    if let Some(address) = address_from_socket(router, probe)? {
        if is_usable(&address) {
            return Ok(address);
        }
        debug!("Ignoring address {}", address);
    }

    let address = probe.datagram_local_address().map_err(|e| {
        RouterError::with_source(
            "socket failed when trying to get local IP address, should have been impossible",
            e,
        )
    })?;
    debug!("Got address {} from datagram socket", address);

    if is_loopback(&address) {
        return Err(RouterError::new(
            "only found an address that begins with '127.' when retrieving IP of localhost",
        ));
    }
    if !address.is_ipv4() {
        return Err(RouterError::new(format!(
            "datagram socket returned non-IPv4 address {}",
            address
        )));
    }
    Ok(address)
}

/// Use the gateway connection when the router has one, otherwise the
/// hostname lookup.
fn address_from_socket<R, P>(router: &R, probe: &P) -> Result<Option<IpAddr>, RouterError>
where
    R: Router + ?Sized,
    P: AddressProbe + ?Sized,
{
    match router.internal_port().filter(|&port| port > 0) {
        Some(port) => {
            let host = router.internal_host_name();
            debug!("Creating socket to router {}:{}", host, port);

            let address = probe.socket_local_address(&host, port).map_err(|e| {
                RouterError::with_source(format!("could not create socket to {}:{}", host, port), e)
            })?;
            debug!("Got address {} from socket", address);
            return Ok(Some(address));
        }
        None => debug!(
            "Not connected to router, can not use socket to determine the address of the localhost"
        ),
    }

    match probe.local_host_address() {
        Ok(Some(address)) => {
            debug!("Got address {} from local hostname", address);
            Ok(Some(address))
        }
        Ok(None) => {
            debug!("Local hostname did not resolve to any address");
            Ok(None)
        }
        Err(e) => Err(RouterError::with_source("could not get IP of localhost", e)),
    }
}
