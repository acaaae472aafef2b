use thiserror::Error;

/// L3 error kinds (spec §7) that are absorbed at the ICMPv6 engine
/// boundary: the caller logs and drops, nothing propagates further.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Icmp6Error {
    #[error("malformed ICMPv6 packet")]
    MalformedPacket,
    #[error("ICMPv6 checksum mismatch")]
    ChecksumMismatch,
    #[error("dropped: rate limited")]
    RateLimited,
    #[error("no route to destination")]
    NoRoute,
    #[error("no usable source address")]
    NoSourceAddress,
    #[error("allocation failure")]
    AllocFailed,
}
