//! LAN address discovery for the startup banner

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

/// Public address used only to pick a route; no packet is sent
const PROBE_ADDR: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// The address other machines on the LAN can reach us at.
///
/// "Connecting" a UDP socket makes the OS choose the outbound interface
/// without sending anything. Returns `None` when there is no route.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(PROBE_ADDR).ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

/// URL to open on the phone for a server listening on `addr`
pub fn phone_url(addr: SocketAddr) -> String {
    let host = if addr.ip().is_unspecified() {
        local_ip().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
    } else {
        addr.ip()
    };
    format!("http://{}", SocketAddr::new(host, addr.port()))
}
