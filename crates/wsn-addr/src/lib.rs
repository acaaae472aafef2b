//! IPv6 address and EUI-64 types (spec §3 "IPv6 address (Addr)").
//!
//! Deliberately not `std::net::Ipv6Addr`: the core needs to distinguish
//! address subtypes (multicast, link-local, solicited-node, …) at the byte
//! level the way the spec defines them, and round-trips through EUI-64
//! conversions that have nothing to do with socket APIs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 16-octet IPv6 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Addr(pub [u8; 16]);

impl Addr {
    pub const UNSPECIFIED: Addr = Addr([0u8; 16]);
    pub const LOOPBACK: Addr = Addr([
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    ]);
    pub const LINK_LOCAL_ALL_NODES: Addr = Addr([
        0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
    ]);
    pub const LINK_LOCAL_ALL_ROUTERS: Addr = Addr([
        0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2,
    ]);
    /// ff02::1a — all-RPL-nodes (RFC 6550 §20.18).
    pub const LINK_LOCAL_ALL_RPL_NODES: Addr = Addr([
        0xff, 0x02, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x1a,
    ]);

    pub fn is_unspecified(&self) -> bool {
        self.0 == [0u8; 16]
    }

    pub fn is_loopback(&self) -> bool {
        *self == Self::LOOPBACK
    }

    /// ff00::/8
    pub fn is_multicast(&self) -> bool {
        self.0[0] == 0xff
    }

    /// fe80::/10
    pub fn is_link_local(&self) -> bool {
        self.0[0] == 0xfe && (self.0[1] & 0xc0) == 0x80
    }

    /// ff02::1:ffXX:XXXX/104 (RFC 4291 §2.7.1)
    pub fn is_solicited_node_multicast(&self) -> bool {
        self.is_multicast()
            && self.0[1] == 0x02
            && self.0[11] == 0x01
            && self.0[12] == 0xff
    }

    /// ::ffff:a.b.c.d
    pub fn is_ipv4_mapped(&self) -> bool {
        self.0[0..10] == [0u8; 10] && self.0[10] == 0xff && self.0[11] == 0xff
    }

    /// The solicited-node multicast address for this unicast address
    /// (RFC 4291 §2.7.1): ff02::1:ffXX:XXXX using the low 24 bits.
    pub fn solicited_node_multicast(&self) -> Addr {
        let mut out = [0u8; 16];
        out[0] = 0xff;
        out[1] = 0x02;
        out[11] = 0x01;
        out[12] = 0xff;
        out[13] = self.0[13];
        out[14] = self.0[14];
        out[15] = self.0[15];
        Addr(out)
    }

    /// Build a link-local address fe80::<IID> from a 64-bit interface
    /// identifier (already in modified-EUI-64 form, bit 1 inverted).
    pub fn link_local_from_iid(iid: [u8; 8]) -> Addr {
        let mut out = [0u8; 16];
        out[0] = 0xfe;
        out[1] = 0x80;
        out[8..16].copy_from_slice(&iid);
        Addr(out)
    }

    pub fn iid(&self) -> [u8; 8] {
        let mut iid = [0u8; 8];
        iid.copy_from_slice(&self.0[8..16]);
        iid
    }

    /// Recover the EUI-64 that generated this address's IID, inverting the
    /// universal/local bit back (RFC 4291 §2.5.1 appendix A).
    pub fn eui64_from_iid(&self) -> Eui64 {
        let mut b = self.iid();
        b[0] ^= 0x02;
        Eui64(b)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Full (non-compressed) form is sufficient for logs/tests; the
        // core never needs the canonical "::" compression for correctness.
        let g = |i: usize| u16::from_be_bytes([self.0[i], self.0[i + 1]]);
        write!(
            f,
            "{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}:{:x}",
            g(0),
            g(2),
            g(4),
            g(6),
            g(8),
            g(10),
            g(12),
            g(14)
        )
    }
}

impl FromStr for Addr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Minimal parser: full groups, or "::" run-length expansion.
        if let Some((head, tail)) = s.split_once("::") {
            let head_groups = if head.is_empty() {
                Vec::new()
            } else {
                parse_groups(head)?
            };
            let tail_groups = if tail.is_empty() {
                Vec::new()
            } else {
                parse_groups(tail)?
            };
            if head_groups.len() + tail_groups.len() > 8 {
                return Err(AddrParseError);
            }
            let mut groups = head_groups;
            groups.resize(8 - tail_groups.len(), 0);
            groups.extend(tail_groups);
            Ok(Addr(groups_to_bytes(&groups)))
        } else {
            let groups = parse_groups(s)?;
            if groups.len() != 8 {
                return Err(AddrParseError);
            }
            Ok(Addr(groups_to_bytes(&groups)))
        }
    }
}

fn parse_groups(s: &str) -> Result<Vec<u16>, AddrParseError> {
    s.split(':')
        .map(|g| u16::from_str_radix(g, 16).map_err(|_| AddrParseError))
        .collect()
}

fn groups_to_bytes(groups: &[u16]) -> [u8; 16] {
    let mut out = [0u8; 16];
    for (i, g) in groups.iter().enumerate() {
        let b = g.to_be_bytes();
        out[i * 2] = b[0];
        out[i * 2 + 1] = b[1];
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddrParseError;

impl fmt::Display for AddrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid IPv6 address")
    }
}
impl std::error::Error for AddrParseError {}

/// A 64-bit IEEE EUI-64, the only link-layer addressing mode in Wi-SUN FAN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Eui64(pub [u8; 8]);

impl Eui64 {
    pub const ZERO: Eui64 = Eui64([0u8; 8]);

    /// Modified EUI-64 interface identifier (RFC 4291 §2.5.1): invert bit 1
    /// (the universal/local bit) of octet 0.
    pub fn to_iid(self) -> [u8; 8] {
        let mut b = self.0;
        b[0] ^= 0x02;
        b
    }

    pub fn from_iid(iid: [u8; 8]) -> Eui64 {
        let mut b = iid;
        b[0] ^= 0x02;
        Eui64(b)
    }

    pub fn link_local(self) -> Addr {
        Addr::link_local_from_iid(self.to_iid())
    }
}

impl fmt::Display for Eui64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5], self.0[6], self.0[7]
        )
    }
}

impl FromStr for Eui64 {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 8];
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 8 {
            return Err(AddrParseError);
        }
        for (i, p) in parts.iter().enumerate() {
            out[i] = u8::from_str_radix(p, 16).map_err(|_| AddrParseError)?;
        }
        Ok(Eui64(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eui64_iid_roundtrip() {
        let e = Eui64([0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
        let iid = e.to_iid();
        assert_eq!(iid[0], 0x00); // bit 1 inverted: 0x02 ^ 0x02 = 0x00
        assert_eq!(Eui64::from_iid(iid), e);
    }

    #[test]
    fn link_local_from_eui64() {
        let e = Eui64([0x02, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77]);
        let ll = e.link_local();
        assert!(ll.is_link_local());
        assert_eq!(ll.eui64_from_iid(), e);
    }

    #[test]
    fn solicited_node_multicast_matches_rfc_form() {
        let a: Addr = "fe80::0211:2233:4455:6677".parse().unwrap();
        let sn = a.solicited_node_multicast();
        assert!(sn.is_solicited_node_multicast());
        assert_eq!(sn.0[13..16], a.0[13..16]);
    }

    #[test]
    fn multicast_and_link_local_classification() {
        let mc: Addr = "ff02::1".parse().unwrap();
        assert!(mc.is_multicast());
        assert!(!mc.is_link_local());

        let ll: Addr = "fe80::1".parse().unwrap();
        assert!(ll.is_link_local());
        assert!(!ll.is_multicast());

        assert!(Addr::UNSPECIFIED.is_unspecified());
    }

    #[test]
    fn parse_roundtrips_through_display_semantically() {
        let a: Addr = "2001:db8::1".parse().unwrap();
        assert_eq!(a.0[0], 0x20);
        assert_eq!(a.0[1], 0x01);
        assert_eq!(a.0[2], 0x0d);
        assert_eq!(a.0[3], 0xb8);
        assert_eq!(a.0[15], 0x01);
    }
}
