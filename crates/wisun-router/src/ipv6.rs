//! IPv6 header parsing/building (spec §2: "decapsulated into a packet
//! buffer → IPv6 header parsed → if ICMPv6, dispatched by type"). This
//! is glue, not part of any core engine: the core crates only ever see
//! `PacketMeta` plus an ICMPv6 payload slice.

use wsn_addr::Addr;

pub const NEXT_HEADER_ICMPV6: u8 = 58;
const IPV6_HEADER_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Header {
    pub traffic_class: u8,
    pub payload_length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src: Addr,
    pub dst: Addr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ipv6Error {
    #[error("truncated IPv6 header")]
    Truncated,
    #[error("unsupported IP version")]
    BadVersion,
}

/// Parse a fixed 40-byte IPv6 header (no extension headers: the core
/// never emits or expects any). Returns the header plus the remaining
/// payload slice.
pub fn parse(bytes: &[u8]) -> Result<(Ipv6Header, &[u8]), Ipv6Error> {
    if bytes.len() < IPV6_HEADER_LEN {
        return Err(Ipv6Error::Truncated);
    }
    if bytes[0] >> 4 != 6 {
        return Err(Ipv6Error::BadVersion);
    }
    let traffic_class = (bytes[0] << 4) | (bytes[1] >> 4);
    let payload_length = u16::from_be_bytes([bytes[4], bytes[5]]);
    let next_header = bytes[6];
    let hop_limit = bytes[7];
    let mut src = [0u8; 16];
    src.copy_from_slice(&bytes[8..24]);
    let mut dst = [0u8; 16];
    dst.copy_from_slice(&bytes[24..40]);

    let header = Ipv6Header {
        traffic_class,
        payload_length,
        next_header,
        hop_limit,
        src: Addr(src),
        dst: Addr(dst),
    };
    Ok((header, &bytes[IPV6_HEADER_LEN..]))
}

/// Build a full IPv6 packet (header + payload) for transmission.
pub fn build(src: Addr, dst: Addr, hop_limit: u8, next_header: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; IPV6_HEADER_LEN];
    out[0] = 0x60;
    out[4..6].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    out[6] = next_header;
    out[7] = hop_limit;
    out[8..24].copy_from_slice(&src.0);
    out[24..40].copy_from_slice(&dst.0);
    out.extend_from_slice(payload);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_header_fields() {
        let src: Addr = "fe80::1".parse().unwrap();
        let dst: Addr = "fe80::2".parse().unwrap();
        let packet = build(src, dst, 255, NEXT_HEADER_ICMPV6, &[1, 2, 3, 4]);
        let (header, payload) = parse(&packet).unwrap();
        assert_eq!(header.src, src);
        assert_eq!(header.dst, dst);
        assert_eq!(header.hop_limit, 255);
        assert_eq!(header.next_header, NEXT_HEADER_ICMPV6);
        assert_eq!(payload, &[1, 2, 3, 4]);
    }

    #[test]
    fn rejects_truncated_header() {
        assert_eq!(parse(&[0x60; 10]), Err(Ipv6Error::Truncated));
    }

    #[test]
    fn rejects_non_v6_version() {
        let mut packet = vec![0u8; 40];
        packet[0] = 0x40;
        assert_eq!(parse(&packet), Err(Ipv6Error::BadVersion));
    }
}
