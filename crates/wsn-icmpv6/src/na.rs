use crate::error::Icmp6Error;
use crate::options::{parse_options, NdOption};
use crate::validate::validate_common;
use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_ncache::NeighborCache;
use wsn_packet::{AroStatus, PacketMeta};

const NA_FIXED_LEN: usize = 8 + 16;
const NA_FLAG_SOLICITED: u8 = 0x40;
const NA_FLAG_OVERRIDE: u8 = 0x20;

/// Raised to the RPL engine when a Wi-SUN shorthand EARO on an inbound NA
/// reports a non-SUCCESS status (spec §4.3.3): the EUI-64 should be
/// blacklisted at the MAC and treated as an ARO failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AroFailure {
    pub eui64: Eui64,
    pub status: AroStatus,
    pub lifetime: u16,
}

#[derive(Debug, Default)]
pub struct NaOutcome {
    pub aro_failure: Option<AroFailure>,
    /// The Wi-SUN shorthand EARO reported `status=SUCCESS` for this
    /// EUI-64 (spec §4.4.2): our registration with the preferred parent
    /// is confirmed, and the RPL engine should emit the DAO.
    pub registration_confirmed: Option<Eui64>,
    pub dad_collision: bool,
}

/// Process an inbound Neighbor Advertisement (spec §4.3.3).
pub fn handle_na(
    message: &[u8],
    meta: &PacketMeta,
    ncache: &mut NeighborCache,
    our_addrs: &[Addr],
    now_ms: MonoMs,
) -> Result<NaOutcome, Icmp6Error> {
    validate_common(meta, message)?;
    if message.len() < NA_FIXED_LEN {
        return Err(Icmp6Error::MalformedPacket);
    }

    let flags = message[4];
    let solicited = flags & NA_FLAG_SOLICITED != 0;
    let override_flag = flags & NA_FLAG_OVERRIDE != 0;

    let mut target = [0u8; 16];
    target.copy_from_slice(&message[8..24]);
    let target = Addr(target);

    if target.is_multicast() {
        return Err(Icmp6Error::MalformedPacket);
    }
    if meta.dst_addr.is_multicast() && solicited {
        return Err(Icmp6Error::MalformedPacket);
    }

    let mut outcome = NaOutcome::default();
    if our_addrs.contains(&target) {
        outcome.dad_collision = true;
        return Ok(outcome);
    }

    let options = parse_options(&message[24..])?;

    let tllao = options.iter().find_map(|o| match o {
        NdOption::Tllao(e) => Some(*e),
        _ => None,
    });

    for opt in &options {
        if let NdOption::Earo(e) = opt {
            // Wi-SUN shorthand: Length field == 2 (16 bytes total).
            if let Some(status) = AroStatus::from_u8(e.status) {
                if status == AroStatus::Success {
                    outcome.registration_confirmed = Some(e.eui64);
                } else {
                    outcome.aro_failure = Some(AroFailure {
                        eui64: e.eui64,
                        status,
                        lifetime: e.lifetime,
                    });
                }
            }
        }
    }

    if let Some(handle) = ncache.lookup(&meta.src_addr) {
        ncache.update_from_na(handle, solicited, override_flag, tllao, now_ms);
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::fill_checksum;
    use crate::options::encode_tllao;

    // S5 — NA on multicast with S flag set is dropped, cache unchanged.
    #[test]
    fn na_on_multicast_with_solicited_flag_is_dropped() {
        let src: Addr = "fe80::2".parse().unwrap();
        let dst: Addr = "ff02::1".parse().unwrap();
        let target: Addr = "fe80::2".parse().unwrap();

        let mut msg = vec![136u8, 0, 0, 0, NA_FLAG_SOLICITED, 0, 0, 0];
        msg.extend_from_slice(&target.0);
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 136,
            icmp_code: 0,
            ..Default::default()
        };
        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        let before = ncache.len();
        let result = handle_na(&msg, &meta, &mut ncache, &[], 0);
        assert!(matches!(result, Err(Icmp6Error::MalformedPacket)));
        assert_eq!(ncache.len(), before);
    }

    #[test]
    fn na_updates_matching_nce() {
        let src: Addr = "fe80::3".parse().unwrap();
        let dst: Addr = "fe80::1".parse().unwrap();
        let eui = Eui64([9; 8]);

        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        let handle = ncache.insert_incomplete(src).unwrap();

        let mut msg = vec![136u8, 0, 0, 0, NA_FLAG_SOLICITED | NA_FLAG_OVERRIDE, 0, 0, 0];
        msg.extend_from_slice(&src.0);
        msg.extend(encode_tllao(eui));
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 136,
            icmp_code: 0,
            ..Default::default()
        };
        handle_na(&msg, &meta, &mut ncache, &[], 0).unwrap();
        assert_eq!(ncache.get(handle).unwrap().ll_addr, Some(eui));
    }

    #[test]
    fn na_with_success_earo_confirms_registration() {
        use crate::options::{encode_earo, Earo};
        use wsn_packet::AroStatus;

        let src: Addr = "fe80::a".parse().unwrap();
        let dst: Addr = "fe80::1".parse().unwrap();
        let eui = Eui64([7; 8]);

        let mut msg = vec![136u8, 0, 0, 0, NA_FLAG_SOLICITED | NA_FLAG_OVERRIDE, 0, 0, 0];
        msg.extend_from_slice(&src.0);
        msg.extend(encode_earo(&Earo {
            status: AroStatus::Success.as_u8(),
            opaque: 0,
            flags: 0,
            tid: 0,
            lifetime: 3600,
            eui64: eui,
        }));
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 136,
            icmp_code: 0,
            ..Default::default()
        };
        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        let outcome = handle_na(&msg, &meta, &mut ncache, &[], 0).unwrap();
        assert_eq!(outcome.registration_confirmed, Some(eui));
        assert!(outcome.aro_failure.is_none());
    }

    #[test]
    fn na_target_equal_to_own_address_is_dad_collision() {
        let src: Addr = "fe80::4".parse().unwrap();
        let dst: Addr = "fe80::1".parse().unwrap();

        let mut msg = vec![136u8, 0, 0, 0, NA_FLAG_SOLICITED, 0, 0, 0];
        msg.extend_from_slice(&src.0);
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: 136,
            icmp_code: 0,
            ..Default::default()
        };
        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        let outcome = handle_na(&msg, &meta, &mut ncache, &[src], 0).unwrap();
        assert!(outcome.dad_collision);
    }
}
