//! Top-level RPL engine (spec §4.4): wires the neighbor table, Trickle
//! timer, DAO session, and attach state machine into the single
//! `tick`/`on_*` surface the scheduler drives.

use crate::attach::{AddressSource, AttachMachine, AttachState};
use crate::dao::{DaoOutcome, DaoSession, OwnedPrefix};
use crate::dio::handle_dio;
use crate::error::RplError;
use crate::message::{
    build_dao_ack, build_dio, build_dis, parse_dao, parse_dao_ack, parse_dis, ICMP_RPL_CONTROL,
    RPL_CODE_DAO, RPL_CODE_DAO_ACK, RPL_CODE_DIO, RPL_CODE_DIS,
};
use crate::options::{encode_configuration, ConfigOption};
use crate::table::{DioInfo, ParentSelection, RplTable};
use crate::trickle::Trickle;
use wsn_addr::{Addr, Eui64};
use wsn_common::time::MonoMs;
use wsn_packet::PacketMeta;

/// Everything the engine wants the caller to do after one `tick` or one
/// inbound message (spec §4.5: timer callbacks must not block, so every
/// outbound message is handed back as bytes for the caller to transmit).
#[derive(Debug, Default)]
pub struct RplTick {
    /// A DIO due to Trickle firing, to multicast to `ff02::1a`.
    pub dio_broadcast: Option<Vec<u8>>,
    /// A DIS to multicast to `ff02::1a` (cold start / post-poisoning).
    pub dis_broadcast: Option<Vec<u8>>,
    /// A DAO retransmission, to unicast to the preferred parent.
    pub dao_retransmit: Option<Vec<u8>>,
    /// The preferred parent was just declared lost (spec §4.4.5).
    pub parent_lost: bool,
}

/// Owns the RPL neighbor table, Trickle timer, one outstanding DAO
/// session, and the attach state machine for this node (spec §3, §4.4,
/// §9). One instance per interface.
pub struct RplEngine {
    pub table: RplTable,
    pub trickle: Trickle,
    pub dao: DaoSession,
    pub attach: AttachMachine,
    pub prefixes: Vec<OwnedPrefix>,
    /// Set after parent-loss poisoning; no new parent is selected before
    /// this deadline elapses (spec §4.4.5: "wait at least I_min").
    quiet_until: Option<MonoMs>,
    dis_cooldown_until: Option<MonoMs>,
}

impl RplEngine {
    pub fn new(capacity: usize, default_config: ConfigOption) -> RplEngine {
        let trickle = Trickle::new(
            default_config.dio_interval_min,
            default_config.dio_interval_doublings,
            default_config.dio_redundancy,
            0,
        );
        RplEngine {
            table: RplTable::new(capacity, default_config),
            trickle,
            dao: DaoSession::new(),
            attach: AttachMachine::new(),
            prefixes: Vec::new(),
            quiet_until: None,
            dis_cooldown_until: None,
        }
    }

    /// Process an inbound DIO (spec §4.4.1). On a preferred-parent
    /// change, kicks off the `AttachState` transition that ends in a
    /// DHCPv6 address request.
    pub fn on_dio(
        &mut self,
        message: &[u8],
        meta: &PacketMeta,
        addr_source: &mut dyn AddressSource,
        now_ms: MonoMs,
    ) -> Result<ParentSelection, RplError> {
        self.attach.start();
        if let Some(deadline) = self.quiet_until {
            if now_ms < deadline {
                return Ok(ParentSelection::Unchanged);
            }
        }
        let change = handle_dio(message, meta, &mut self.table, &mut self.trickle, now_ms)?;
        if let ParentSelection::Installed(_) = change {
            self.quiet_until = None;
            self.attach.on_pref_parent_change(addr_source);
        }
        Ok(change)
    }

    /// A DHCPv6-acquired global address arrived (spec §9): advance the
    /// attach state machine and register it with the preferred parent.
    /// Returns the NS+EARO this core should send (built by the caller,
    /// which owns the ICMPv6 engine) is out of scope here — the RPL
    /// engine only tracks the address and DAO state.
    pub fn on_address_assigned(&mut self, addr: Addr) {
        self.attach.on_address_assigned(addr);
    }

    /// The preferred parent confirmed our registration (NA with
    /// EARO{status=SUCCESS}): emit the DAO advertising our prefixes
    /// (spec §4.4.2's last step).
    pub fn on_registration_confirmed(&mut self, now_ms: MonoMs) -> Option<Vec<u8>> {
        if self.attach.state() != AttachState::Registering {
            return None;
        }
        self.attach.on_registration_confirmed();
        let handle = self.table.preferred_parent?;
        let rn = self.table.get(handle)?;
        let dodag_id = self.table.current_dodag_id;
        let instance_id = self.table.current_instance_id;
        let parent = rn.link_local;
        Some(
            self.dao
                .build(instance_id, dodag_id, parent, &self.prefixes, now_ms),
        )
    }

    /// An inbound NA's Wi-SUN shorthand EARO reported a non-SUCCESS status
    /// for `failed_eui64` (spec §4.3.3's "raise an ARO-failure event to
    /// the RPL engine"). If that EUI-64 is our preferred parent, this is
    /// treated as a parent-loss trigger (spec §4.4.5); otherwise it is a
    /// no-op here (the link layer still blacklists the EUI-64).
    pub fn on_aro_failure(&mut self, failed_eui64: Eui64, now_ms: MonoMs) -> RplTick {
        let is_preferred = self
            .table
            .preferred_parent
            .and_then(|handle| self.table.get(handle))
            .map(|rn| rn.eui64 == failed_eui64)
            .unwrap_or(false);
        if is_preferred {
            self.trigger_parent_loss(now_ms)
        } else {
            RplTick::default()
        }
    }

    /// A DAO-ACK arrived for our outstanding DAO.
    pub fn on_dao_ack(&mut self, message: &[u8], meta: &PacketMeta) -> Result<(), RplError> {
        if meta.icmp_type != ICMP_RPL_CONTROL || meta.icmp_code != RPL_CODE_DAO_ACK {
            return Err(RplError::MalformedPacket);
        }
        if message.len() < 4 {
            return Err(RplError::MalformedPacket);
        }
        let info = parse_dao_ack(&message[4..])?;
        self.dao.on_ack(info.sequence);
        Ok(())
    }

    /// A DAO arrived from a descendant naming us as its Transit parent
    /// (this node acting as a DAO parent to others): record it for loop
    /// detection and build the DAO-ACK.
    pub fn on_dao(&mut self, message: &[u8], meta: &PacketMeta) -> Result<Vec<u8>, RplError> {
        if meta.icmp_type != ICMP_RPL_CONTROL || meta.icmp_code != RPL_CODE_DAO {
            return Err(RplError::MalformedPacket);
        }
        if message.len() < 4 {
            return Err(RplError::MalformedPacket);
        }
        let (info, _opts) = parse_dao(&message[4..])?;
        let child = meta.src_addr.eui64_from_iid();
        self.table.record_child_dao(child);
        Ok(build_dao_ack(info.instance_id, info.sequence, 0))
    }

    /// A DIS arrived: treated as a perceived inconsistency (RFC 6206),
    /// resetting Trickle so a DIO is sent promptly, plus an immediate
    /// unicast reply carrying our current rank.
    pub fn on_dis(
        &mut self,
        message: &[u8],
        meta: &PacketMeta,
        now_ms: MonoMs,
    ) -> Result<Option<Vec<u8>>, RplError> {
        if meta.icmp_type != ICMP_RPL_CONTROL || meta.icmp_code != RPL_CODE_DIS {
            return Err(RplError::MalformedPacket);
        }
        if message.len() < 4 {
            return Err(RplError::MalformedPacket);
        }
        parse_dis(&message[4..])?;
        self.trickle.reset(now_ms);
        Ok(self.build_dio_if_attached())
    }

    fn build_dio_if_attached(&self) -> Option<Vec<u8>> {
        let version = self.table.current_version?;
        let self_rank = self.table.self_rank?;
        let info = DioInfo {
            instance_id: self.table.current_instance_id,
            version,
            rank: self_rank,
            grounded: false,
            dodag_id: self.table.current_dodag_id,
            config: Some(self.table.active_config),
        };
        let mut body = vec![ICMP_RPL_CONTROL, RPL_CODE_DIO, 0, 0];
        body.extend(build_dio(&info, &encode_configuration(&self.table.active_config)));
        Some(body)
    }

    /// Declare the preferred parent lost (spec §4.4.5): demote it,
    /// broadcast an infinite-rank poisoning DIO, and enter the quiet
    /// period during which no new parent may be selected.
    fn trigger_parent_loss(&mut self, now_ms: MonoMs) -> RplTick {
        let poison = self.table.current_version.map(|version| {
            let info = DioInfo {
                instance_id: self.table.current_instance_id,
                version,
                rank: crate::rn::INFINITE_RANK,
                grounded: false,
                dodag_id: self.table.current_dodag_id,
                config: None,
            };
            let mut body = vec![ICMP_RPL_CONTROL, RPL_CODE_DIO, 0, 0];
            body.extend(build_dio(&info, &[]));
            body
        });
        self.table.demote_preferred_parent();
        self.attach.on_parent_lost();
        self.quiet_until = Some(now_ms + self.trickle.i_min_ms());
        self.trickle.reset(now_ms);
        RplTick {
            dio_broadcast: poison,
            parent_lost: true,
            ..Default::default()
        }
    }

    /// Drive all time-based state: Trickle firing, DAO retransmission,
    /// preferred-parent silence detection, and DIS emission when idle.
    /// Must be called at least as often as the scheduler's next-deadline
    /// bookkeeping expects (spec §4.5).
    pub fn tick(&mut self, now_ms: MonoMs) -> RplTick {
        if let Some(handle) = self.table.preferred_parent {
            if let Some(rn) = self.table.get(handle) {
                let silence_limit = self.table.active_config.default_lifetime as u64
                    * self.table.active_config.lifetime_unit as u64
                    * 1_000;
                if now_ms.saturating_sub(rn.last_dio_at) >= silence_limit {
                    return self.trigger_parent_loss(now_ms);
                }
            }
        }

        match self.dao.poll(now_ms) {
            DaoOutcome::Abandoned => return self.trigger_parent_loss(now_ms),
            DaoOutcome::Send => {
                if let Some(handle) = self.table.preferred_parent {
                    if let Some(rn) = self.table.get(handle) {
                        let dodag_id = self.table.current_dodag_id;
                        let instance_id = self.table.current_instance_id;
                        let bytes = self.dao.build(
                            instance_id,
                            dodag_id,
                            rn.link_local,
                            &self.prefixes,
                            now_ms,
                        );
                        return RplTick {
                            dao_retransmit: Some(bytes),
                            ..Default::default()
                        };
                    }
                }
            }
            DaoOutcome::Wait => {}
        }

        let mut tick = RplTick::default();
        if self.trickle.is_due(now_ms) {
            let should_transmit = self.trickle.fire(now_ms);
            if should_transmit {
                tick.dio_broadcast = self.build_dio_if_attached();
            }
        }

        if self.table.preferred_parent.is_none() {
            let quiet_elapsed = self.quiet_until.map_or(true, |deadline| now_ms >= deadline);
            let cooldown_elapsed = self
                .dis_cooldown_until
                .map_or(true, |deadline| now_ms >= deadline);
            if quiet_elapsed && cooldown_elapsed {
                tick.dis_broadcast = Some(build_dis_message());
                self.dis_cooldown_until = Some(now_ms + self.trickle.i_min_ms());
            }
        }

        tick
    }
}

fn build_dis_message() -> Vec<u8> {
    let mut body = vec![ICMP_RPL_CONTROL, RPL_CODE_DIS, 0, 0];
    body.extend(build_dis());
    body
}
