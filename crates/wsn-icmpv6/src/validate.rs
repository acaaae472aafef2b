use crate::checksum::verify_checksum;
use crate::error::Icmp6Error;
use wsn_packet::PacketMeta;

pub const ICMP_DEST_UNREACHABLE: u8 = 1;
pub const ICMP_PACKET_TOO_BIG: u8 = 2;
pub const ICMP_TIME_EXCEEDED: u8 = 3;
pub const ICMP_PARAMETER_PROBLEM: u8 = 4;
pub const ICMP_ROUTER_SOLICITATION: u8 = 133;
pub const ICMP_ROUTER_ADVERTISEMENT: u8 = 134;
pub const ICMP_NEIGHBOR_SOLICITATION: u8 = 135;
pub const ICMP_NEIGHBOR_ADVERTISEMENT: u8 = 136;
pub const ICMP_REDIRECT: u8 = 137;

fn requires_hop_limit_255(icmp_type: u8) -> bool {
    matches!(
        icmp_type,
        ICMP_ROUTER_SOLICITATION
            | ICMP_ROUTER_ADVERTISEMENT
            | ICMP_NEIGHBOR_SOLICITATION
            | ICMP_NEIGHBOR_ADVERTISEMENT
            | ICMP_REDIRECT
    )
}

/// Common inbound validation (spec §4.3.1): hop_limit, code, checksum.
/// Option-chain well-formedness is checked by each message handler once
/// it knows where its own fixed header ends.
pub fn validate_common(meta: &PacketMeta, message: &[u8]) -> Result<(), Icmp6Error> {
    if message.len() < 4 {
        return Err(Icmp6Error::MalformedPacket);
    }
    if requires_hop_limit_255(meta.icmp_type) && meta.hop_limit != 255 {
        return Err(Icmp6Error::MalformedPacket);
    }
    if meta.icmp_code != 0 {
        return Err(Icmp6Error::MalformedPacket);
    }
    if !verify_checksum(&meta.src_addr, &meta.dst_addr, message) {
        return Err(Icmp6Error::ChecksumMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::fill_checksum;
    use wsn_addr::Addr;

    #[test]
    fn rejects_wrong_hop_limit_for_ns() {
        let src: Addr = "fe80::1".parse().unwrap();
        let dst: Addr = "fe80::2".parse().unwrap();
        let mut msg = vec![135u8, 0, 0, 0, 0, 0, 0, 0];
        msg.extend_from_slice(&[0u8; 16]);
        fill_checksum(&src, &dst, &mut msg);

        let mut meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 64,
            icmp_type: 135,
            icmp_code: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_common(&meta, &msg),
            Err(Icmp6Error::MalformedPacket)
        );
        meta.hop_limit = 255;
        assert!(validate_common(&meta, &msg).is_ok());
    }

    #[test]
    fn rejects_bad_checksum() {
        let src: Addr = "fe80::1".parse().unwrap();
        let dst: Addr = "fe80::2".parse().unwrap();
        let mut msg = vec![135u8, 0, 0xde, 0xad, 0, 0, 0, 0];
        msg.extend_from_slice(&[0u8; 16]);
        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 135,
            icmp_code: 0,
            ..Default::default()
        };
        assert_eq!(
            validate_common(&meta, &msg),
            Err(Icmp6Error::ChecksumMismatch)
        );
    }
}
