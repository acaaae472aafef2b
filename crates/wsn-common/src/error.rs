use thiserror::Error;

/// Errors that can terminate the core's dispatch loop (spec §7: fatal kinds).
///
/// Everything else in the taxonomy of spec §7 (MalformedPacket,
/// ChecksumMismatch, RateLimited, NoRoute, NoSourceAddress,
/// NeighborTableFull, ParentLost) is absorbed at its owning engine's
/// boundary and never reaches this type — it is recovered from in place,
/// per the propagation policy in spec §7.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("RCP bus disconnected")]
    RcpDisconnected,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
