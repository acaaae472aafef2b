use crate::error::RplError;
use wsn_addr::Addr;

const OPT_TARGET: u8 = 0x05;
const OPT_TRANSIT: u8 = 0x06;
const OPT_CONFIGURATION: u8 = 0x04;
const OPT_PREFIX_INFORMATION: u8 = 0x08;

/// RFC 6550 §6.7.6 DODAG Configuration option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOption {
    pub dio_interval_doublings: u8,
    pub dio_interval_min: u8,
    pub dio_redundancy: u8,
    pub max_rank_increase: u16,
    pub min_hop_rank_increase: u16,
    pub default_lifetime: u8,
    pub lifetime_unit: u16,
}

/// RFC 6550 §6.7.10 Prefix Information option (format shared with RFC
/// 4861 §4.6.2, reused by RPL).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixInfoOption {
    pub prefix_length: u8,
    pub on_link: bool,
    pub autonomous: bool,
    pub valid_lifetime: u32,
    pub preferred_lifetime: u32,
    pub prefix: Addr,
}

/// A parsed RPL control message option. Unlike ND options (§4.3.1 of the
/// ICMPv6 engine, 8-octet-unit lengths), RPL's Option Length field is a
/// raw byte count of everything *after* the type/length header (RFC 6550
/// §6.7.1) — a distinct TLV convention, deliberately not shared with
/// `wsn_icmpv6::options`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RplOption {
    Configuration(ConfigOption),
    PrefixInformation(PrefixInfoOption),
    /// A prefix we (or a descendant) can reach (RFC 6550 §6.7.7).
    Target { prefix_length: u8, prefix: Addr },
    /// Identifies the parent this DAO's Target(s) are reachable through
    /// (RFC 6550 §6.7.8), always carrying the Parent Address since this
    /// core only ever operates in non-storing MOP.
    Transit {
        path_sequence: u8,
        path_lifetime: u8,
        parent: Addr,
    },
    Unknown { option_type: u8, bytes: Vec<u8> },
}

pub fn parse_options(mut buf: &[u8]) -> Result<Vec<RplOption>, RplError> {
    let mut out = Vec::new();
    while !buf.is_empty() {
        if buf.len() < 2 {
            return Err(RplError::MalformedPacket);
        }
        let option_type = buf[0];
        let opt_len = buf[1] as usize;
        if 2 + opt_len > buf.len() {
            return Err(RplError::MalformedPacket);
        }
        let body = &buf[2..2 + opt_len];

        let opt = match option_type {
            OPT_CONFIGURATION if opt_len >= 15 => RplOption::Configuration(ConfigOption {
                dio_interval_doublings: body[2],
                dio_interval_min: body[3],
                dio_redundancy: body[4],
                max_rank_increase: u16::from_be_bytes([body[5], body[6]]),
                min_hop_rank_increase: u16::from_be_bytes([body[7], body[8]]),
                default_lifetime: body[12],
                lifetime_unit: u16::from_be_bytes([body[13], body[14]]),
            }),
            OPT_PREFIX_INFORMATION if opt_len >= 30 => {
                let mut prefix = [0u8; 16];
                prefix.copy_from_slice(&body[14..30]);
                RplOption::PrefixInformation(PrefixInfoOption {
                    prefix_length: body[0],
                    on_link: body[1] & 0x80 != 0,
                    autonomous: body[1] & 0x40 != 0,
                    valid_lifetime: u32::from_be_bytes([body[2], body[3], body[4], body[5]]),
                    preferred_lifetime: u32::from_be_bytes([body[6], body[7], body[8], body[9]]),
                    prefix: Addr(prefix),
                })
            }
            OPT_TARGET if opt_len >= 18 => {
                let mut prefix = [0u8; 16];
                prefix.copy_from_slice(&body[2..18]);
                RplOption::Target {
                    prefix_length: body[1],
                    prefix: Addr(prefix),
                }
            }
            OPT_TRANSIT if opt_len >= 20 => {
                let mut parent = [0u8; 16];
                parent.copy_from_slice(&body[4..20]);
                RplOption::Transit {
                    path_sequence: body[1],
                    path_lifetime: body[2],
                    parent: Addr(parent),
                }
            }
            _ => RplOption::Unknown {
                option_type,
                bytes: body.to_vec(),
            },
        };
        out.push(opt);
        buf = &buf[2 + opt_len..];
    }
    Ok(out)
}

pub fn encode_configuration(cfg: &ConfigOption) -> Vec<u8> {
    let mut out = vec![0u8; 17];
    out[0] = OPT_CONFIGURATION;
    out[1] = 15;
    out[4] = cfg.dio_interval_doublings;
    out[5] = cfg.dio_interval_min;
    out[6] = cfg.dio_redundancy;
    out[7..9].copy_from_slice(&cfg.max_rank_increase.to_be_bytes());
    out[9..11].copy_from_slice(&cfg.min_hop_rank_increase.to_be_bytes());
    out[14] = cfg.default_lifetime;
    out[15..17].copy_from_slice(&cfg.lifetime_unit.to_be_bytes());
    out
}

pub fn encode_target(prefix_length: u8, prefix: Addr) -> Vec<u8> {
    let mut out = vec![0u8; 20];
    out[0] = OPT_TARGET;
    out[1] = 18;
    out[3] = prefix_length;
    out[4..20].copy_from_slice(&prefix.0);
    out
}

pub fn encode_transit(path_sequence: u8, path_lifetime: u8, parent: Addr) -> Vec<u8> {
    let mut out = vec![0u8; 22];
    out[0] = OPT_TRANSIT;
    out[1] = 20;
    out[3] = path_sequence;
    out[4] = path_lifetime;
    out[6..22].copy_from_slice(&parent.0);
    out
}
