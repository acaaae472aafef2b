use thiserror::Error;

/// RPL engine error kinds (spec §7) absorbed at the engine boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RplError {
    #[error("malformed RPL control message")]
    MalformedPacket,
    #[error("RPL neighbor table full")]
    TableFull,
    #[error("preferred parent lost")]
    ParentLost,
}
