//! ICMPv6 engine (spec §4.3): Neighbor Discovery message validation,
//! Neighbor/Router Solicitation and Advertisement processing, Redirect
//! handling, and the rate-limited ICMPv6 error responder.

pub mod checksum;
pub mod engine;
pub mod error;
pub mod error_responder;
pub mod na;
pub mod ns;
pub mod options;
pub mod redirect;
pub mod rs_ra;
pub mod validate;

pub use engine::{DispatchOutcome, Icmpv6Engine};
pub use error::Icmp6Error;
pub use error_responder::{OffendingPacket, OutboundError};
pub use na::{AroFailure, NaOutcome};
pub use ns::{build_ns, EaroDecision, OutboundIcmp6, RegistrationHandler};
pub use options::{Earo, NdOption};
pub use redirect::RedirectInfo;
pub use rs_ra::{build_ra, RaParams};
