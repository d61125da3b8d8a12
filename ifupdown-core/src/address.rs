use std::net::Ipv4Addr;

/// Return `true` if `s` is a dotted-quad IPv4 address: exactly four decimal
/// octets in `0..=255` with nothing before or after them.
pub fn validate_ipv4(s: &str) -> bool {
    parse_ipv4(s).is_some()
}

/// Return `true` if `candidate` lies in the network derived from
/// `address`/`netmask`.
///
/// Both sides are masked with `netmask` and compared. Any malformed input
/// yields `false`; the caller decides whether to report that as a syntax
/// problem or a range problem.
pub fn in_subnet(address: &str, netmask: &str, candidate: &str) -> bool {
    let (Some(addr), Some(mask), Some(cand)) = (
        parse_ipv4(address),
        parse_ipv4(netmask),
        parse_ipv4(candidate),
    ) else {
        return false;
    };
    let mask = u32::from(mask);
    (u32::from(addr) & mask) == (u32::from(cand) & mask)
}

/// Render the network derived from `address`/`netmask` as `a.b.c.d/N`.
///
/// The prefix length counts the set bits of the mask, so a non-contiguous
/// mask still renders (it is not rejected here).
pub fn network_cidr(address: &str, netmask: &str) -> Option<String> {
    let addr = u32::from(parse_ipv4(address)?);
    let mask = u32::from(parse_ipv4(netmask)?);
    let network = Ipv4Addr::from(addr & mask);
    Some(format!("{network}/{}", mask.count_ones()))
}

/// Convert a CIDR prefix length to a dotted netmask (`24` -> `255.255.255.0`).
///
/// Returns `None` for prefixes above 32.
pub fn prefix_to_netmask(prefix: u8) -> Option<String> {
    if prefix > 32 {
        return None;
    }
    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - prefix)
    };
    Some(Ipv4Addr::from(mask).to_string())
}

/// Strict dotted-quad parse: every octet is one to three ASCII digits.
fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    let octets: Vec<&str> = s.split('.').collect();
    if octets.len() != 4
        || octets
            .iter()
            .any(|o| o.is_empty() || o.len() > 3 || !o.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    s.parse().ok()
}
