use crate::error::Icmp6Error;
use crate::validate::validate_common;
use wsn_addr::Addr;
use wsn_packet::PacketMeta;

const REDIRECT_FIXED_LEN: usize = 8 + 16 + 16;

/// A minimal, RFC 4861 §8 inbound Redirect: enough to learn a better
/// next hop for a destination, without installing a full redirect cache
/// (out of scope for this core — see spec non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectInfo {
    pub destination: Addr,
    pub target: Addr,
}

/// Process an inbound Redirect (spec §4.3.4): standard RFC 4861 §8
/// processing, gated on link-local source and hop_limit 255.
pub fn handle_redirect(
    message: &[u8],
    meta: &PacketMeta,
) -> Result<Option<RedirectInfo>, Icmp6Error> {
    validate_common(meta, message)?;
    if !meta.src_addr.is_link_local() {
        return Err(Icmp6Error::MalformedPacket);
    }
    if message.len() < REDIRECT_FIXED_LEN {
        return Err(Icmp6Error::MalformedPacket);
    }

    let mut target = [0u8; 16];
    target.copy_from_slice(&message[8..24]);
    let mut destination = [0u8; 16];
    destination.copy_from_slice(&message[24..40]);

    Ok(Some(RedirectInfo {
        destination: Addr(destination),
        target: Addr(target),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::fill_checksum;

    #[test]
    fn rejects_non_link_local_source() {
        let src: Addr = "2001:db8::1".parse().unwrap();
        let dst: Addr = "fe80::1".parse().unwrap();
        let target: Addr = "fe80::2".parse().unwrap();
        let destination: Addr = "2001:db8::2".parse().unwrap();

        let mut msg = vec![137u8, 0, 0, 0, 0, 0, 0, 0];
        msg.extend_from_slice(&target.0);
        msg.extend_from_slice(&destination.0);
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 137,
            icmp_code: 0,
            ..Default::default()
        };
        assert!(matches!(
            handle_redirect(&msg, &meta),
            Err(Icmp6Error::MalformedPacket)
        ));
    }

    #[test]
    fn accepts_well_formed_redirect() {
        let src: Addr = "fe80::1".parse().unwrap();
        let dst: Addr = "fe80::9".parse().unwrap();
        let target: Addr = "fe80::2".parse().unwrap();
        let destination: Addr = "2001:db8::2".parse().unwrap();

        let mut msg = vec![137u8, 0, 0, 0, 0, 0, 0, 0];
        msg.extend_from_slice(&target.0);
        msg.extend_from_slice(&destination.0);
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 137,
            icmp_code: 0,
            ..Default::default()
        };
        let info = handle_redirect(&msg, &meta).unwrap().unwrap();
        assert_eq!(info.target, target);
        assert_eq!(info.destination, destination);
    }
}
