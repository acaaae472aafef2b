use crate::error::RplError;
use crate::message::{parse_dio, ICMP_RPL_CONTROL, RPL_CODE_DIO};
use crate::table::{ParentSelection, RplTable};
use crate::trickle::Trickle;
use wsn_common::time::MonoMs;
use wsn_icmpv6::validate::validate_common;
use wsn_packet::PacketMeta;

/// Process an inbound DIO (spec §4.4.1): validate, update the RPL table,
/// and drive the Trickle timer's consistency/inconsistency bookkeeping
/// (RFC 6206 §4.2): a version or DODAGID change is an inconsistency
/// (timer resets to `I_min`); an otherwise-matching DIO from an already-
/// known neighbor is a consistent transmission.
pub fn handle_dio(
    message: &[u8],
    meta: &PacketMeta,
    table: &mut RplTable,
    trickle: &mut Trickle,
    now_ms: MonoMs,
) -> Result<ParentSelection, RplError> {
    if meta.icmp_type != ICMP_RPL_CONTROL || meta.icmp_code != RPL_CODE_DIO {
        return Err(RplError::MalformedPacket);
    }
    validate_common(meta, message).map_err(|_| RplError::MalformedPacket)?;
    if message.len() < 4 {
        return Err(RplError::MalformedPacket);
    }
    let (info, _opts) = parse_dio(&message[4..])?;

    let was_known_version = table.current_version == Some(info.version);
    let was_known_dodag = table.current_dodag_id == info.dodag_id;
    if table.current_version.is_some() && (!was_known_version || !was_known_dodag) {
        trickle.reset(now_ms);
    } else {
        trickle.note_consistent();
    }

    table.process_dio(meta.src_addr, &info, now_ms)
}
