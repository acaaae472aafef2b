//! `InterfaceContext` (spec §3): the single, owned, non-global interface
//! singleton that every engine is threaded through explicitly (spec §9
//! "avoid any truly global mutable state"). Everything `main` does after
//! startup is a method call on this struct plus a scheduler dispatch.

use crate::dbus::{InterfaceSnapshot, PrimaryParentChanged};
use crate::dhcp::NullAddressSource;
use crate::handler::DefaultRegistrationHandler;
use crate::ipv6::{self, NEXT_HEADER_ICMPV6};
use crate::linklayer::{InboundOrEvent, LinkLayer};
use crate::rcp::RcpBus;
use wsn_addr::{Addr, Eui64};
use wsn_common::stats::CoreStats;
use wsn_common::time::MonoMs;
use wsn_icmpv6::{Earo, Icmpv6Engine, RaParams};
use wsn_ncache::NeighborCache;
use wsn_rpl::{ParentSelection, RplEngine, RplTick};

/// One outbound message the caller must push down to the link layer.
pub struct Outbound {
    pub dst: Addr,
    pub bytes: Vec<u8>,
}

/// Everything one dispatch step produced, ready for the scheduler loop
/// to push onto the link layer and/or log (spec §4.5 step 3: "timer
/// callbacks MUST NOT block" — this type is how a tick hands its
/// side effects back instead of sending inline).
#[derive(Default)]
pub struct StepOutcome {
    pub outbound: Vec<Outbound>,
    pub parent_lost: bool,
}

pub struct InterfaceContext<B: RcpBus> {
    pub eui64: Eui64,
    pub ll_addr: Addr,
    pub global_addr: Option<Addr>,
    pub pan_id: u16,
    pub network_name: String,

    pub ncache: NeighborCache,
    pub rpl: RplEngine,
    pub icmpv6: Icmpv6Engine,
    pub link: LinkLayer<B>,
    pub addr_source: NullAddressSource,
    pub registration_handler: DefaultRegistrationHandler,
    pub stats: CoreStats,
    /// D-Bus `PrimaryParent` signal consumer (spec §6), invoked once per
    /// preferred-parent change. `None` until `main` installs one.
    pref_parent_listener: Option<PrimaryParentChanged>,
}

impl<B: RcpBus> InterfaceContext<B> {
    pub fn new(
        bus: B,
        eui64: Eui64,
        pan_id: u16,
        network_name: String,
        config: &wsn_common::CoreConfig,
        now_ms: MonoMs,
    ) -> InterfaceContext<B> {
        let default_config = wsn_rpl::ConfigOption {
            dio_interval_doublings: config.initial_dio_interval_doublings,
            dio_interval_min: config.initial_dio_interval_min,
            dio_redundancy: config.initial_dio_redundancy,
            max_rank_increase: u16::MAX,
            min_hop_rank_increase: 128,
            default_lifetime: 60,
            lifetime_unit: 60,
        };
        InterfaceContext {
            eui64,
            ll_addr: eui64.link_local(),
            global_addr: None,
            pan_id,
            network_name,
            ncache: NeighborCache::new(
                256,
                config.base_reachable_time_ms,
                config.retrans_timer_ms,
                config.max_multicast_solicit,
                now_ms,
            ),
            rpl: RplEngine::new(config.max_rpl_candidates, default_config),
            icmpv6: Icmpv6Engine::new(
                config.router_mode,
                eui64,
                RaParams {
                    cur_hop_limit: config.cur_hop_limit,
                    reachable_time_ms: config.base_reachable_time_ms as u32,
                    retrans_timer_ms: config.retrans_timer_ms as u32,
                    managed: false,
                    other_config: false,
                },
            ),
            link: LinkLayer::new(bus, eui64),
            addr_source: NullAddressSource::new(),
            registration_handler: DefaultRegistrationHandler,
            stats: CoreStats::default(),
            pref_parent_listener: None,
        }
    }

    /// Install the D-Bus `PrimaryParent` signal consumer (spec §6, §9
    /// "callback-driven asynchrony"): called once per preferred-parent
    /// change with the newly installed parent.
    pub fn set_pref_parent_listener(&mut self, cb: PrimaryParentChanged) {
        self.pref_parent_listener = Some(cb);
    }

    /// A `GetProperties`-equivalent snapshot of this interface's read-only
    /// D-Bus surface (spec §6). GAK installation is an event from the
    /// EAP-TLS authenticator, which is out of this core's scope (spec §1);
    /// the projection is empty until that collaborator is wired in.
    pub fn snapshot(&self) -> InterfaceSnapshot {
        InterfaceSnapshot {
            hw_address: self.eui64,
            pan_id: self.pan_id,
            gaks: Vec::new(),
        }
    }

    /// Our own addresses, for DAD-collision and source-selection checks
    /// (spec §4.3.2/§4.3.3).
    fn our_addrs(&self) -> Vec<Addr> {
        let mut addrs = vec![self.ll_addr];
        if let Some(g) = self.global_addr {
            addrs.push(g);
        }
        addrs
    }

    /// Drain and process every currently-available RCP indication (spec
    /// §2 "data flow on reception"). Returns outbound messages plus
    /// whatever stats/telemetry the caller wants to log.
    pub fn drain_inbound(&mut self, now_ms: MonoMs) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        while let Some(ev) = self.link.poll_inbound() {
            match ev {
                InboundOrEvent::Frame(frame) => {
                    self.handle_frame(frame.payload, now_ms, &mut outcome);
                }
                InboundOrEvent::TxCnf { .. } => {
                    // No ack_intent tracking wired to this reference main:
                    // the per-packet AckIntent (spec §9) is consumed by
                    // callers that attach one to a PacketMeta, which this
                    // straight-line glue does not yet do.
                }
                InboundOrEvent::Reset => {
                    tracing::warn!("RCP reset indicated; radio state must be re-armed");
                }
            }
        }
        outcome
    }

    fn handle_frame(&mut self, payload: Vec<u8>, now_ms: MonoMs, outcome: &mut StepOutcome) {
        let (header, body) = match ipv6::parse(&payload) {
            Ok(v) => v,
            Err(_) => {
                self.stats.malformed_packet += 1;
                return;
            }
        };
        if header.next_header != NEXT_HEADER_ICMPV6 || body.len() < 4 {
            self.stats.malformed_packet += 1;
            return;
        }

        let meta = wsn_packet::PacketMeta {
            src_addr: header.src,
            dst_addr: header.dst,
            hop_limit: header.hop_limit,
            traffic_class: header.traffic_class,
            icmp_type: body[0],
            icmp_code: body[1],
            ..Default::default()
        };

        if meta.icmp_type == wsn_rpl::message::ICMP_RPL_CONTROL {
            self.handle_rpl(body, &meta, now_ms, outcome);
            return;
        }

        let our_addrs = self.our_addrs();
        let our_addr_for_errors = self.global_addr.unwrap_or(self.ll_addr);
        let dispatch = self.icmpv6.dispatch(
            body,
            &meta,
            &mut self.ncache,
            &mut self.registration_handler,
            &our_addrs,
            our_addr_for_errors,
            now_ms,
        );

        if let Some(reply) = dispatch.reply {
            outcome.outbound.push(self.wrap(reply.meta, reply.bytes));
        }
        if let Some(err) = dispatch.error_reply {
            outcome.outbound.push(self.wrap(err.meta, err.bytes));
        }
        if let Some(ra) = dispatch.ra_reply {
            outcome.outbound.push(self.wrap(ra.meta, ra.bytes));
        }
        if let Some(redirect) = dispatch.redirect {
            tracing::debug!(?redirect, "redirect learned");
        }
        if let Some(na_outcome) = dispatch.na_outcome {
            if let Some(failure) = na_outcome.aro_failure {
                tracing::warn!(eui64 = %failure.eui64, status = ?failure.status, "ARO failure reported by NA");
                self.link.blacklist(failure.eui64);
                let tick = self.rpl.on_aro_failure(failure.eui64, now_ms);
                self.apply_rpl_tick(tick, outcome);
            }
            if let Some(eui64) = na_outcome.registration_confirmed {
                tracing::info!(%eui64, "registration confirmed by NA EARO");
                if let Some(dao) = self.rpl.on_registration_confirmed(now_ms) {
                    if let Some(handle) = self.rpl.table.preferred_parent {
                        if let Some(rn) = self.rpl.table.get(handle) {
                            outcome.outbound.push(Outbound {
                                dst: rn.link_local,
                                bytes: dao,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Translate an `RplTick`'s DIO/DIS/DAO side effects into outbound
    /// messages. Shared by `tick` (Trickle-driven) and `handle_frame`
    /// (ARO-failure-driven parent loss, spec §4.3.3).
    fn apply_rpl_tick(&mut self, tick: RplTick, outcome: &mut StepOutcome) {
        outcome.parent_lost |= tick.parent_lost;
        if let Some(dio) = tick.dio_broadcast {
            outcome.outbound.push(Outbound {
                dst: "ff02::1a".parse().unwrap(),
                bytes: dio,
            });
        }
        if let Some(dis) = tick.dis_broadcast {
            outcome.outbound.push(Outbound {
                dst: "ff02::1a".parse().unwrap(),
                bytes: dis,
            });
        }
        if let Some(dao) = tick.dao_retransmit {
            if let Some(handle) = self.rpl.table.preferred_parent {
                if let Some(rn) = self.rpl.table.get(handle) {
                    outcome.outbound.push(Outbound {
                        dst: rn.link_local,
                        bytes: dao,
                    });
                }
            }
        }
    }

    fn handle_rpl(
        &mut self,
        body: &[u8],
        meta: &wsn_packet::PacketMeta,
        now_ms: MonoMs,
        outcome: &mut StepOutcome,
    ) {
        use wsn_rpl::message::{RPL_CODE_DAO, RPL_CODE_DAO_ACK, RPL_CODE_DIO, RPL_CODE_DIS};
        match meta.icmp_code {
            RPL_CODE_DIO => {
                match self
                    .rpl
                    .on_dio(body, meta, &mut self.addr_source, now_ms)
                {
                    Ok(ParentSelection::Installed(change)) => {
                        tracing::info!(parent = %change.link_local, "preferred parent installed");
                        if let Some(cb) = self.pref_parent_listener.as_mut() {
                            cb(change);
                        }
                    }
                    Ok(_) => {}
                    Err(_) => self.stats.malformed_packet += 1,
                }
            }
            RPL_CODE_DAO_ACK => {
                if self.rpl.on_dao_ack(body, meta).is_err() {
                    self.stats.malformed_packet += 1;
                }
            }
            RPL_CODE_DAO => match self.rpl.on_dao(body, meta) {
                Ok(reply) => outcome.outbound.push(Outbound {
                    dst: meta.src_addr,
                    bytes: reply,
                }),
                Err(_) => self.stats.malformed_packet += 1,
            },
            RPL_CODE_DIS => match self.rpl.on_dis(body, meta, now_ms) {
                Ok(Some(reply)) => outcome.outbound.push(Outbound {
                    dst: meta.src_addr,
                    bytes: reply,
                }),
                Ok(None) => {}
                Err(_) => self.stats.malformed_packet += 1,
            },
            _ => self.stats.malformed_packet += 1,
        }
    }

    /// Drive all time-based state (spec §4.5: "Timers may be armed,
    /// rearmed..."). Called from the scheduler's periodic tick group.
    pub fn tick(&mut self, now_ms: MonoMs) -> StepOutcome {
        self.ncache.tick(now_ms);

        let rpl_tick: RplTick = self.rpl.tick(now_ms);
        let mut outcome = StepOutcome::default();
        self.apply_rpl_tick(rpl_tick, &mut outcome);

        // A global address arrived since the last tick: advance the
        // attach state machine past the `usleep(100ms)` workaround the
        // spec explicitly disclaims (spec §9 Open Question) by reacting
        // to the confirmed assignment instead of guessing a delay. Once
        // in hand, register it with the preferred parent (spec §4.4.2's
        // "register it with the new parent by sending NS+EARO with
        // SUCCESS status").
        if self.global_addr.is_none() {
            if let Some(addr) = self.rpl.attach.global_addr() {
                self.global_addr = Some(addr);
                if let Some(ns) = self.build_registration_ns(addr) {
                    outcome.outbound.push(self.wrap(ns.meta, ns.bytes));
                }
            }
        }

        outcome
    }

    /// Build the NS+EARO registering `addr` with the preferred parent
    /// (spec §4.4.2), with lifetime `default_lifetime * lifetime_unit`
    /// from the active RPL configuration option, capped to `u16::MAX`.
    /// `None` if we have no preferred parent to register with yet.
    fn build_registration_ns(&self, addr: Addr) -> Option<wsn_icmpv6::OutboundIcmp6> {
        let handle = self.rpl.table.preferred_parent?;
        let rn = self.rpl.table.get(handle)?;
        let cfg = &self.rpl.table.active_config;
        let lifetime_secs = cfg.default_lifetime as u32 * cfg.lifetime_unit as u32;
        let lifetime = lifetime_secs.min(u16::MAX as u32) as u16;
        let earo = Earo {
            status: wsn_packet::AroStatus::Success.as_u8(),
            opaque: 0,
            flags: 0,
            tid: 0,
            lifetime,
            eui64: self.eui64,
        };
        Some(wsn_icmpv6::build_ns(
            addr,
            self.eui64,
            Some(earo),
            false,
            None,
            self.ll_addr,
            &self.our_addrs(),
            Some(rn.link_local),
        ))
    }

    fn wrap(&self, meta: wsn_packet::PacketMeta, bytes: Vec<u8>) -> Outbound {
        let packet = ipv6::build(meta.src_addr, meta.dst_addr, meta.hop_limit, NEXT_HEADER_ICMPV6, &bytes);
        Outbound {
            dst: meta.dst_addr,
            bytes: packet,
        }
    }

    /// Push every outbound message of a `StepOutcome` to the link layer.
    pub fn transmit_all(&mut self, outcome: StepOutcome) {
        for out in outcome.outbound {
            self.link.send_unicast(out.dst, &out.bytes);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rcp::{NullRcpBus, RcpIndication};

    fn ctx() -> InterfaceContext<NullRcpBus> {
        let config = wsn_common::CoreConfig::default();
        InterfaceContext::new(
            NullRcpBus::new(),
            Eui64([0x02, 1, 2, 3, 4, 5, 6, 7]),
            0xabcd,
            "wisun-test".to_string(),
            &config,
            0,
        )
    }

    #[test]
    fn malformed_frame_is_dropped_and_counted() {
        let mut ctx = ctx();
        ctx.link.bus_mut().push_indication(RcpIndication::RxInd {
            src_eui64: Eui64([9; 8]),
            payload: vec![0u8; 4], // far too short for an IPv6 header
        });
        let outcome = ctx.drain_inbound(0);
        assert!(outcome.outbound.is_empty());
        assert_eq!(ctx.stats.malformed_packet, 1);
    }

    /// Drive a DIO from `parent` through the RPL engine so it becomes
    /// the preferred parent, mirroring `wsn-rpl`'s own `on_dio` tests.
    fn install_preferred_parent(ctx: &mut InterfaceContext<NullRcpBus>, parent: Addr) {
        use wsn_rpl::message::{build_dio, ICMP_RPL_CONTROL, RPL_CODE_DIO};
        use wsn_rpl::options::encode_configuration;
        use wsn_rpl::DioInfo;

        let info = DioInfo {
            instance_id: 0x1e,
            version: 1,
            rank: 256,
            grounded: true,
            dodag_id: "2001:db8::1".parse().unwrap(),
            config: None,
        };
        let mut body = vec![ICMP_RPL_CONTROL, RPL_CODE_DIO, 0, 0];
        body.extend(build_dio(&info, &encode_configuration(&ctx.rpl.table.active_config)));
        let meta = wsn_packet::PacketMeta {
            src_addr: parent,
            dst_addr: "ff02::1a".parse().unwrap(),
            hop_limit: 255,
            icmp_type: ICMP_RPL_CONTROL,
            icmp_code: RPL_CODE_DIO,
            ..Default::default()
        };
        let mut addr_source = crate::dhcp::NullAddressSource::new();
        ctx.rpl.on_dio(&body, &meta, &mut addr_source, 0).unwrap();
    }

    #[test]
    fn aro_failure_na_blacklists_eui64_and_reports_parent_loss() {
        let mut ctx = ctx();
        let parent: Addr = "fe80::a".parse().unwrap();
        install_preferred_parent(&mut ctx, parent);
        let parent_eui64 = parent.eui64_from_iid();

        let src = parent;
        let dst: Addr = ctx.ll_addr;
        let target: Addr = "fe80::b".parse().unwrap();
        let mut msg = vec![136u8, 0, 0, 0, 0x60, 0, 0, 0]; // solicited | override
        msg.extend_from_slice(&target.0);
        msg.extend(wsn_icmpv6::options::encode_earo(&wsn_icmpv6::Earo {
            status: wsn_packet::AroStatus::Duplicate.as_u8(),
            opaque: 0,
            flags: 0,
            tid: 0,
            lifetime: 0,
            eui64: parent_eui64,
        }));
        wsn_icmpv6::checksum::fill_checksum(&src, &dst, &mut msg);
        let frame = ipv6::build(src, dst, 255, NEXT_HEADER_ICMPV6, &msg);

        ctx.link.bus_mut().push_indication(RcpIndication::RxInd {
            src_eui64: parent_eui64,
            payload: frame,
        });
        let outcome = ctx.drain_inbound(0);
        assert!(ctx.link.is_blacklisted(parent_eui64));
        assert!(outcome.parent_lost);
        assert!(ctx.rpl.table.preferred_parent.is_none());
    }

    #[test]
    fn registration_confirmed_na_emits_dao_to_preferred_parent() {
        let mut ctx = ctx();
        let parent: Addr = "fe80::a".parse().unwrap();
        install_preferred_parent(&mut ctx, parent);
        let parent_eui64 = parent.eui64_from_iid();
        ctx.rpl.on_address_assigned("2001:db8::42".parse().unwrap());

        let src = parent;
        let dst: Addr = ctx.ll_addr;
        let target: Addr = "2001:db8::42".parse().unwrap();
        let mut msg = vec![136u8, 0, 0, 0, 0x60, 0, 0, 0];
        msg.extend_from_slice(&target.0);
        msg.extend(wsn_icmpv6::options::encode_earo(&wsn_icmpv6::Earo {
            status: wsn_packet::AroStatus::Success.as_u8(),
            opaque: 0,
            flags: 0,
            tid: 0,
            lifetime: 3600,
            eui64: parent_eui64,
        }));
        wsn_icmpv6::checksum::fill_checksum(&src, &dst, &mut msg);
        let frame = ipv6::build(src, dst, 255, NEXT_HEADER_ICMPV6, &msg);

        ctx.link.bus_mut().push_indication(RcpIndication::RxInd {
            src_eui64: parent_eui64,
            payload: frame,
        });
        let outcome = ctx.drain_inbound(0);
        assert_eq!(outcome.outbound.len(), 1);
        assert_eq!(outcome.outbound[0].dst, parent);
    }

    #[test]
    fn tick_sends_registration_ns_once_global_address_assigned() {
        let mut ctx = ctx();
        let parent: Addr = "fe80::a".parse().unwrap();
        install_preferred_parent(&mut ctx, parent);
        ctx.rpl.on_address_assigned("2001:db8::42".parse().unwrap());

        let outcome = ctx.tick(0);
        assert_eq!(ctx.global_addr, Some("2001:db8::42".parse().unwrap()));
        assert_eq!(outcome.outbound.len(), 1);
        assert_eq!(outcome.outbound[0].dst, parent);
    }

    #[test]
    fn rs_inbound_yields_ra_outbound() {
        let mut ctx = ctx();
        let src: Addr = Eui64([9; 8]).link_local();
        let dst: Addr = "ff02::2".parse().unwrap();
        let mut msg = vec![133u8, 0, 0, 0, 0, 0, 0, 0];
        wsn_icmpv6::checksum::fill_checksum(&src, &dst, &mut msg);
        let frame = ipv6::build(src, dst, 255, NEXT_HEADER_ICMPV6, &msg);

        ctx.link.bus_mut().push_indication(RcpIndication::RxInd {
            src_eui64: Eui64([9; 8]),
            payload: frame,
        });
        let outcome = ctx.drain_inbound(0);
        assert_eq!(outcome.outbound.len(), 1);
    }
}
