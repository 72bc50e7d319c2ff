use std::net::IpAddr;

/// Returns local non-loopback IPv4 addresses, excluding link-local
/// (169.254.x.x). These are the candidates offered to the probing
/// collaborator during the handshake.
pub fn local_candidate_ips() -> Vec<IpAddr> {
    let mut ips = Vec::new();

    let Ok(interfaces) = if_addrs::get_if_addrs() else {
        return ips;
    };

    for iface in interfaces {
        if iface.is_loopback() {
            continue;
        }
        if let IpAddr::V4(ipv4) = iface.ip() {
            if ipv4.octets()[0] == 127 {
                continue;
            }
            // APIPA / link-local addresses are never reachable from a peer.
            if ipv4.octets()[0] == 169 && ipv4.octets()[1] == 254 {
                continue;
            }
            ips.push(IpAddr::V4(ipv4));
        }
    }

    ips
}
