use crate::checksum::fill_checksum;
use crate::error::Icmp6Error;
use crate::options::{encode_sllao, parse_options, NdOption};
use crate::validate::validate_common;
use wsn_addr::{Addr, Eui64};
use wsn_ncache::NeighborCache;
use wsn_packet::PacketMeta;

const RS_FIXED_LEN: usize = 8;
const RA_FIXED_LEN: usize = 16;

const RA_FLAG_MANAGED: u8 = 0x80;
const RA_FLAG_OTHER_CONFIG: u8 = 0x40;

/// Parameters the interface context (spec §3) feeds into an outbound RA:
/// the three RFC 4861 fields this core actually tracks
/// (`cur_hop_limit`, `reachable_time_ms`, plus a fixed retrans timer),
/// and the router lifetime. Unlike a classic host-facing router this
/// core's default-route semantics come entirely from RPL (§4.4), so the
/// RA is a liveness/parameter beacon rather than a default-route signal
/// — router lifetime is always 0.
#[derive(Debug, Clone, Copy)]
pub struct RaParams {
    pub cur_hop_limit: u8,
    pub reachable_time_ms: u32,
    pub retrans_timer_ms: u32,
    pub managed: bool,
    pub other_config: bool,
}

/// Process an inbound Router Solicitation (spec §2 table, L3 row:
/// "parse/emit NS/NA/RS/RA"). RFC 4861 §6.1.1/§6.2.6: hop_limit 255,
/// code 0 (checked by `validate_common`); an SLLAO is only valid when
/// the source is not unspecified, and when present it updates the
/// neighbor cache the same way an unsolicited NA does.
pub fn handle_rs(
    message: &[u8],
    meta: &PacketMeta,
    ncache: &mut NeighborCache,
) -> Result<(), Icmp6Error> {
    validate_common(meta, message)?;
    if message.len() < RS_FIXED_LEN {
        return Err(Icmp6Error::MalformedPacket);
    }

    let options = parse_options(&message[RS_FIXED_LEN..])?;
    let sllao = options.iter().find_map(|o| match o {
        NdOption::Sllao(e) => Some(*e),
        _ => None,
    });

    if meta.src_addr.is_unspecified() {
        if sllao.is_some() {
            return Err(Icmp6Error::MalformedPacket);
        }
        return Ok(());
    }

    if let Some(ll_addr) = sllao {
        // Table-full is not this handler's concern to surface: the
        // neighbor is simply not installed and a later NS/DIO retries.
        let _ = ncache.update_unsolicited(meta.src_addr, ll_addr);
    }

    Ok(())
}

/// Build a Router Advertisement (spec §4.3.6-adjacent emission rule: NS
/// emission source-address rules generalize — an RA always comes from
/// the router's own link-local address). Router lifetime is always 0:
/// this core never asks a peer to install it as a default router: RPL
/// owns next-hop selection.
pub fn build_ra(
    src: Addr,
    dst: Addr,
    our_eui64: Eui64,
    params: RaParams,
) -> (PacketMeta, Vec<u8>) {
    let mut msg = vec![134u8, 0, 0, 0];
    msg.push(params.cur_hop_limit);
    let mut flags = 0u8;
    if params.managed {
        flags |= RA_FLAG_MANAGED;
    }
    if params.other_config {
        flags |= RA_FLAG_OTHER_CONFIG;
    }
    msg.push(flags);
    msg.extend_from_slice(&0u16.to_be_bytes()); // router lifetime: always 0
    msg.extend_from_slice(&params.reachable_time_ms.to_be_bytes());
    msg.extend_from_slice(&params.retrans_timer_ms.to_be_bytes());
    debug_assert_eq!(msg.len(), RA_FIXED_LEN);
    msg.extend(encode_sllao(our_eui64));
    fill_checksum(&src, &dst, &mut msg);

    let meta = PacketMeta {
        src_addr: src,
        dst_addr: dst,
        hop_limit: 255,
        icmp_type: 134,
        icmp_code: 0,
        ..Default::default()
    };
    (meta, msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> RaParams {
        RaParams {
            cur_hop_limit: 64,
            reachable_time_ms: 30_000,
            retrans_timer_ms: 1_000,
            managed: false,
            other_config: false,
        }
    }

    #[test]
    fn rs_from_unspecified_source_with_sllao_is_rejected() {
        let dst: Addr = "ff02::2".parse().unwrap();
        let eui = Eui64([1; 8]);
        let mut msg = vec![133u8, 0, 0, 0, 0, 0, 0, 0];
        msg.extend(encode_sllao(eui));
        fill_checksum(&Addr::UNSPECIFIED, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: Addr::UNSPECIFIED,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 133,
            icmp_code: 0,
            ..Default::default()
        };
        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        assert_eq!(
            handle_rs(&msg, &meta, &mut ncache),
            Err(Icmp6Error::MalformedPacket)
        );
    }

    #[test]
    fn rs_with_sllao_installs_stale_neighbor() {
        let src: Addr = "fe80::5".parse().unwrap();
        let dst: Addr = "ff02::2".parse().unwrap();
        let eui = Eui64([2; 8]);
        let mut msg = vec![133u8, 0, 0, 0, 0, 0, 0, 0];
        msg.extend(encode_sllao(eui));
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 133,
            icmp_code: 0,
            ..Default::default()
        };
        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        handle_rs(&msg, &meta, &mut ncache).unwrap();
        let handle = ncache.lookup(&src).expect("neighbor installed");
        assert_eq!(ncache.get(handle).unwrap().ll_addr, Some(eui));
    }

    #[test]
    fn build_ra_has_zero_router_lifetime_and_hop_limit_255() {
        let src: Addr = "fe80::1".parse().unwrap();
        let dst: Addr = "ff02::1".parse().unwrap();
        let (meta, bytes) = build_ra(src, dst, Eui64([7; 8]), params());
        assert_eq!(meta.hop_limit, 255);
        assert_eq!(meta.icmp_type, 134);
        // router lifetime occupies bytes [6..8]
        assert_eq!(&bytes[6..8], &0u16.to_be_bytes());
        assert_eq!(bytes[4], 64);
    }
}
