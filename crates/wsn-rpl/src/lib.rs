//! RPL engine (spec §4.4): DIO/DAO/DIS/DAO-ACK wire formats, the RPL
//! neighbor table and parent-selection logic (RFC 6550 MOP 1,
//! non-storing), the RFC 6206 Trickle timer, and the attach state
//! machine that bridges parent selection to address acquisition.

pub mod attach;
pub mod dao;
pub mod dio;
pub mod engine;
pub mod error;
pub mod message;
pub mod options;
pub mod rn;
pub mod table;
pub mod trickle;

pub use attach::{AddressSource, AttachMachine, AttachState};
pub use dao::{DaoOutcome, DaoSession, OwnedPrefix};
pub use dio::handle_dio;
pub use engine::{RplEngine, RplTick};
pub use error::RplError;
pub use options::{ConfigOption, PrefixInfoOption, RplOption};
pub use rn::{rank_increase, Rn, INFINITE_RANK};
pub use table::{DioInfo, ParentSelection, PreferredParentChange, RplTable};
pub use trickle::Trickle;
