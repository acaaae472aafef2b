//! RPL control message wire formats (RFC 6550 §6), carried in ICMPv6
//! Type 155 messages distinguished by Code.

use crate::error::RplError;
use crate::options::{parse_options, RplOption};
use crate::table::DioInfo;
use wsn_addr::Addr;

pub const ICMP_RPL_CONTROL: u8 = 155;

pub const RPL_CODE_DIS: u8 = 0x00;
pub const RPL_CODE_DIO: u8 = 0x01;
pub const RPL_CODE_DAO: u8 = 0x02;
pub const RPL_CODE_DAO_ACK: u8 = 0x03;

const DIO_FIXED_LEN: usize = 4 + 1 + 1 + 1 + 1 + 16;
const DAO_FIXED_LEN: usize = 4;
const DAO_ACK_FIXED_LEN: usize = 4;

const FLAG_GROUNDED: u8 = 0x80;

/// Parse a DIO's base object + options (RFC 6550 §6.3.1), after the
/// common ICMPv6 header (type/code/checksum) has already been stripped.
pub fn parse_dio(body: &[u8]) -> Result<(DioInfo, Vec<RplOption>), RplError> {
    if body.len() < DIO_FIXED_LEN {
        return Err(RplError::MalformedPacket);
    }
    let instance_id = body[0];
    let version = body[1];
    let rank = u16::from_be_bytes([body[2], body[3]]);
    let grounded = body[4] & FLAG_GROUNDED != 0;
    let mut dodag_id = [0u8; 16];
    dodag_id.copy_from_slice(&body[8..24]);

    let options = parse_options(&body[24..])?;
    let config = options.iter().find_map(|o| match o {
        RplOption::Configuration(c) => Some(*c),
        _ => None,
    });

    Ok((
        DioInfo {
            instance_id,
            version,
            rank,
            grounded,
            dodag_id: Addr(dodag_id),
            config,
        },
        options,
    ))
}

pub fn build_dio(info: &DioInfo, config_bytes: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; DIO_FIXED_LEN];
    out[0] = info.instance_id;
    out[1] = info.version;
    out[2..4].copy_from_slice(&info.rank.to_be_bytes());
    if info.grounded {
        out[4] |= FLAG_GROUNDED;
    }
    out[8..24].copy_from_slice(&info.dodag_id.0);
    out.extend_from_slice(config_bytes);
    out
}

/// DIS (RFC 6550 §6.2.1) carries no fixed fields the core needs to act
/// on; two reserved bytes only.
pub fn build_dis() -> Vec<u8> {
    vec![0u8; 2]
}

pub fn parse_dis(body: &[u8]) -> Result<(), RplError> {
    if body.len() < 2 {
        return Err(RplError::MalformedPacket);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaoInfo {
    pub instance_id: u8,
    pub sequence: u8,
    pub dodag_id: Addr,
}

pub fn parse_dao(body: &[u8]) -> Result<(DaoInfo, Vec<RplOption>), RplError> {
    if body.len() < DAO_FIXED_LEN {
        return Err(RplError::MalformedPacket);
    }
    let instance_id = body[0];
    let has_dodag_id = body[1] & 0x40 != 0;
    let sequence = body[3];
    let (dodag_id, opt_offset) = if has_dodag_id {
        if body.len() < DAO_FIXED_LEN + 16 {
            return Err(RplError::MalformedPacket);
        }
        let mut id = [0u8; 16];
        id.copy_from_slice(&body[4..20]);
        (Addr(id), 20)
    } else {
        (Addr::UNSPECIFIED, 4)
    };
    let options = parse_options(&body[opt_offset..])?;
    Ok((
        DaoInfo {
            instance_id,
            sequence,
            dodag_id,
        },
        options,
    ))
}

/// Build a DAO carrying one Target per owned prefix plus a Transit
/// Information option naming the parent (spec §4.4.3, non-storing MOP).
pub fn build_dao(
    instance_id: u8,
    sequence: u8,
    dodag_id: Addr,
    target_options: &[Vec<u8>],
    transit_option: &[u8],
) -> Vec<u8> {
    const FLAG_D: u8 = 0x40; // DODAGID present

    let mut out = vec![0u8; DAO_FIXED_LEN];
    out[0] = instance_id;
    out[1] = FLAG_D;
    out[3] = sequence;
    out.extend_from_slice(&dodag_id.0);
    for t in target_options {
        out.extend_from_slice(t);
    }
    out.extend_from_slice(transit_option);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaoAckInfo {
    pub instance_id: u8,
    pub sequence: u8,
    pub status: u8,
}

pub fn parse_dao_ack(body: &[u8]) -> Result<DaoAckInfo, RplError> {
    if body.len() < DAO_ACK_FIXED_LEN {
        return Err(RplError::MalformedPacket);
    }
    Ok(DaoAckInfo {
        instance_id: body[0],
        sequence: body[2],
        status: body[3],
    })
}

pub fn build_dao_ack(instance_id: u8, sequence: u8, status: u8) -> Vec<u8> {
    vec![instance_id, 0, sequence, status]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{encode_configuration, ConfigOption};

    #[test]
    fn dio_roundtrips_with_configuration_option() {
        let info = DioInfo {
            instance_id: 0x1e,
            version: 1,
            rank: 256,
            grounded: true,
            dodag_id: "2001:db8::1".parse().unwrap(),
            config: None,
        };
        let cfg = ConfigOption {
            dio_interval_doublings: 2,
            dio_interval_min: 15,
            dio_redundancy: 0,
            max_rank_increase: 0,
            min_hop_rank_increase: 128,
            default_lifetime: 60,
            lifetime_unit: 60,
        };
        let bytes = build_dio(&info, &encode_configuration(&cfg));
        let (parsed, _opts) = parse_dio(&bytes).unwrap();
        assert_eq!(parsed.rank, 256);
        assert_eq!(parsed.version, 1);
        assert!(parsed.grounded);
        assert_eq!(parsed.config, Some(cfg));
    }

    #[test]
    fn dao_roundtrips_with_target_and_transit() {
        use crate::options::{encode_target, encode_transit};
        let dodag_id: Addr = "2001:db8::1".parse().unwrap();
        let prefix: Addr = "2001:db8:1::".parse().unwrap();
        let parent: Addr = "fe80::a".parse().unwrap();
        let bytes = build_dao(
            0x1e,
            7,
            dodag_id,
            &[encode_target(64, prefix)],
            &encode_transit(0, 60, parent),
        );
        let (info, opts) = parse_dao(&bytes).unwrap();
        assert_eq!(info.sequence, 7);
        assert_eq!(info.dodag_id, dodag_id);
        assert!(opts
            .iter()
            .any(|o| matches!(o, RplOption::Target { prefix: p, .. } if *p == prefix)));
        assert!(opts
            .iter()
            .any(|o| matches!(o, RplOption::Transit { parent: p, .. } if *p == parent)));
    }
}
