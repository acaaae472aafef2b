pub mod buffer;
pub mod meta;

pub use buffer::{PacketBuffer, MIN_LINK_MTU};
pub use meta::{AckIntent, AroStatus, Direction, NceHandle, PacketMeta, RnHandle};
