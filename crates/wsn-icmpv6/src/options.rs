use crate::error::Icmp6Error;
use wsn_addr::Eui64;

/// RFC 8505 §4.1 Extended Address Registration Option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Earo {
    pub status: u8,
    pub opaque: u8,
    pub flags: u8,
    pub tid: u8,
    pub lifetime: u16,
    pub eui64: Eui64,
}

/// A parsed RFC 4861 Neighbor Discovery option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NdOption {
    /// Type 1.
    Sllao(Eui64),
    /// Type 2.
    Tllao(Eui64),
    /// Type 33 (RFC 8505).
    Earo(Earo),
    Unknown { option_type: u8, bytes: Vec<u8> },
}

const OPT_SLLAO: u8 = 1;
const OPT_TLLAO: u8 = 2;
const OPT_EARO: u8 = 33;

/// Parse an option chain (spec §4.3.1: "each option length > 0, length
/// field is in units of 8 octets, chain consumes exactly the remaining
/// buffer").
pub fn parse_options(mut buf: &[u8]) -> Result<Vec<NdOption>, Icmp6Error> {
    let mut options = Vec::new();
    while !buf.is_empty() {
        if buf.len() < 2 {
            return Err(Icmp6Error::MalformedPacket);
        }
        let option_type = buf[0];
        let len_units = buf[1];
        if len_units == 0 {
            return Err(Icmp6Error::MalformedPacket);
        }
        let total_len = len_units as usize * 8;
        if total_len > buf.len() {
            return Err(Icmp6Error::MalformedPacket);
        }
        let body = &buf[2..total_len];

        let opt = match option_type {
            OPT_SLLAO if body.len() >= 8 => NdOption::Sllao(eui64_from(&body[..8])),
            OPT_TLLAO if body.len() >= 8 => NdOption::Tllao(eui64_from(&body[..8])),
            OPT_EARO if len_units == 2 && body.len() == 14 => NdOption::Earo(Earo {
                status: body[0],
                opaque: body[1],
                flags: body[2],
                tid: body[3],
                lifetime: u16::from_be_bytes([body[4], body[5]]),
                eui64: eui64_from(&body[6..14]),
            }),
            _ => NdOption::Unknown {
                option_type,
                bytes: body.to_vec(),
            },
        };
        options.push(opt);
        buf = &buf[total_len..];
    }
    Ok(options)
}

fn eui64_from(bytes: &[u8]) -> Eui64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&bytes[..8]);
    Eui64(b)
}

/// Encode a Source/Target Link-Layer Address option carrying an EUI-64,
/// padded to the minimum 8-octet unit that can hold it (16 bytes: 2-byte
/// header + 8-byte address + 6 bytes padding).
pub fn encode_llao(option_type: u8, eui64: Eui64) -> Vec<u8> {
    let mut out = vec![0u8; 16];
    out[0] = option_type;
    out[1] = 2;
    out[2..10].copy_from_slice(&eui64.0);
    out
}

pub fn encode_sllao(eui64: Eui64) -> Vec<u8> {
    encode_llao(OPT_SLLAO, eui64)
}

pub fn encode_tllao(eui64: Eui64) -> Vec<u8> {
    encode_llao(OPT_TLLAO, eui64)
}

/// Encode an EARO (Wi-SUN shorthand: Length field == 2, spec §4.3.3).
pub fn encode_earo(earo: &Earo) -> Vec<u8> {
    let mut out = vec![0u8; 16];
    out[0] = OPT_EARO;
    out[1] = 2;
    out[2] = earo.status;
    out[3] = earo.opaque;
    out[4] = earo.flags;
    out[5] = earo.tid;
    out[6..8].copy_from_slice(&earo.lifetime.to_be_bytes());
    out[8..16].copy_from_slice(&earo.eui64.0);
    out
}
