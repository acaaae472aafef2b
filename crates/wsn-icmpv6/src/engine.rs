use crate::error::Icmp6Error;
use crate::error_responder::{maybe_generate_error, OffendingPacket, OutboundError};
use crate::na::{handle_na, NaOutcome};
use crate::ns::{handle_ns, OutboundIcmp6, RegistrationHandler};
use crate::redirect::{handle_redirect, RedirectInfo};
use crate::rs_ra::{build_ra, handle_rs, RaParams};
use crate::validate::{
    ICMP_NEIGHBOR_ADVERTISEMENT, ICMP_NEIGHBOR_SOLICITATION, ICMP_PARAMETER_PROBLEM, ICMP_REDIRECT,
    ICMP_ROUTER_SOLICITATION,
};
use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_ncache::NeighborCache;
use wsn_packet::PacketMeta;

/// The result of dispatching one inbound ICMPv6 message through the
/// engine (spec §4.3): at most one reply to send, plus any side-channel
/// events the caller (the router binary / RPL engine) needs to act on.
#[derive(Default)]
pub struct DispatchOutcome {
    pub reply: Option<OutboundIcmp6>,
    pub error_reply: Option<OutboundError>,
    pub na_outcome: Option<NaOutcome>,
    pub redirect: Option<RedirectInfo>,
    /// A Router Advertisement built in response to an inbound Router
    /// Solicitation (spec §2 table, L3 row).
    pub ra_reply: Option<OutboundIcmp6>,
}

/// Top-level ICMPv6 engine (spec §4.3): owns nothing itself (per spec §9,
/// the neighbor cache is owned by the core and threaded in explicitly);
/// this is a thin, stateless dispatcher plus the per-packet validation
/// and error-reply logic.
pub struct Icmpv6Engine {
    pub accepts_aro: bool,
    pub our_eui64: Eui64,
    pub ra_params: RaParams,
}

impl Icmpv6Engine {
    pub fn new(accepts_aro: bool, our_eui64: Eui64, ra_params: RaParams) -> Icmpv6Engine {
        Icmpv6Engine {
            accepts_aro,
            our_eui64,
            ra_params,
        }
    }

    /// Dispatch one inbound ICMPv6 message. `message` is the full ICMPv6
    /// octets (type, code, checksum, body); `meta` carries the IPv6-level
    /// context extracted by the caller (addresses, hop limit, link-layer
    /// reception flags).
    pub fn dispatch(
        &self,
        message: &[u8],
        meta: &PacketMeta,
        ncache: &mut NeighborCache,
        handler: &mut dyn RegistrationHandler,
        our_addrs: &[Addr],
        our_addr_for_errors: Addr,
        now_ms: MonoMs,
    ) -> DispatchOutcome {
        let result = match meta.icmp_type {
            ICMP_NEIGHBOR_SOLICITATION => handle_ns(
                message,
                meta,
                ncache,
                handler,
                our_addrs,
                self.accepts_aro,
                now_ms,
            )
            .map(|reply| DispatchOutcome {
                reply,
                ..Default::default()
            }),
            ICMP_NEIGHBOR_ADVERTISEMENT => {
                handle_na(message, meta, ncache, our_addrs, now_ms).map(|outcome| DispatchOutcome {
                    na_outcome: Some(outcome),
                    ..Default::default()
                })
            }
            ICMP_REDIRECT => handle_redirect(message, meta).map(|redirect| DispatchOutcome {
                redirect,
                ..Default::default()
            }),
            ICMP_ROUTER_SOLICITATION => {
                handle_rs(message, meta, ncache).map(|()| {
                    let our_ll = self.our_eui64.link_local();
                    let dst = if meta.src_addr.is_unspecified() {
                        "ff02::1".parse().unwrap()
                    } else {
                        meta.src_addr
                    };
                    let (ra_meta, bytes) = build_ra(our_ll, dst, self.our_eui64, self.ra_params);
                    DispatchOutcome {
                        ra_reply: Some(OutboundIcmp6 {
                            meta: ra_meta,
                            bytes,
                        }),
                        ..Default::default()
                    }
                })
            }
            _ => Ok(DispatchOutcome::default()),
        };

        match result {
            Ok(outcome) => outcome,
            Err(Icmp6Error::MalformedPacket) | Err(Icmp6Error::ChecksumMismatch) => {
                let offending = OffendingPacket {
                    src_addr: meta.src_addr,
                    dst_addr: meta.dst_addr,
                    is_icmp_error_or_redirect: false,
                    ll_multicast_rx: meta.ll_multicast_rx,
                    ll_broadcast_rx: meta.ll_broadcast_rx,
                    bytes: message,
                };
                let error_reply = maybe_generate_error(
                    ICMP_PARAMETER_PROBLEM,
                    0,
                    &offending,
                    our_addr_for_errors,
                    &mut ncache.token_bucket,
                    now_ms,
                )
                .ok()
                .flatten();
                DispatchOutcome {
                    error_reply,
                    ..Default::default()
                }
            }
            Err(_) => DispatchOutcome::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::fill_checksum;
    use wsn_packet::AroStatus;

    struct NoOpHandler;
    impl RegistrationHandler for NoOpHandler {
        fn decide(
            &mut self,
            _eui64: wsn_addr::Eui64,
            _tid: u8,
            _lifetime: u16,
            _now_ms: MonoMs,
        ) -> crate::ns::EaroDecision {
            crate::ns::EaroDecision::ReplyWithEaro(AroStatus::Success)
        }
    }

    #[test]
    fn malformed_ns_yields_parameter_problem() {
        let src: Addr = "fe80::1".parse().unwrap();
        let dst: Addr = "fe80::9".parse().unwrap();
        // Too short to contain a target address: triggers MalformedPacket.
        let mut msg = vec![135u8, 0, 0, 0, 0, 0, 0, 0];
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: ICMP_NEIGHBOR_SOLICITATION,
            icmp_code: 0,
            ..Default::default()
        };
        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        let engine = Icmpv6Engine::new(
            true,
            Eui64([1; 8]),
            RaParams {
                cur_hop_limit: 64,
                reachable_time_ms: 30_000,
                retrans_timer_ms: 1_000,
                managed: false,
                other_config: false,
            },
        );
        let outcome = engine.dispatch(
            &msg,
            &meta,
            &mut ncache,
            &mut NoOpHandler,
            &[],
            dst,
            0,
        );
        assert!(outcome.reply.is_none());
        assert!(outcome.error_reply.is_some());
        assert_eq!(
            outcome.error_reply.unwrap().meta.icmp_type,
            ICMP_PARAMETER_PROBLEM
        );
    }

    #[test]
    fn rs_dispatch_yields_ra_reply() {
        let src: Addr = "fe80::2".parse().unwrap();
        let dst: Addr = "ff02::2".parse().unwrap();
        let mut msg = vec![133u8, 0, 0, 0, 0, 0, 0, 0];
        fill_checksum(&src, &dst, &mut msg);

        let meta = PacketMeta {
            src_addr: src,
            dst_addr: dst,
            hop_limit: 255,
            icmp_type: ICMP_ROUTER_SOLICITATION,
            icmp_code: 0,
            ..Default::default()
        };
        let mut ncache = NeighborCache::new(32, 30_000, 1_000, 3, 0);
        let engine = Icmpv6Engine::new(
            true,
            Eui64([1; 8]),
            RaParams {
                cur_hop_limit: 64,
                reachable_time_ms: 30_000,
                retrans_timer_ms: 1_000,
                managed: false,
                other_config: false,
            },
        );
        let outcome = engine.dispatch(&msg, &meta, &mut ncache, &mut NoOpHandler, &[], dst, 0);
        let ra = outcome.ra_reply.expect("RA reply expected");
        assert_eq!(ra.meta.dst_addr, src);
        assert_eq!(ra.meta.hop_limit, 255);
    }
}
