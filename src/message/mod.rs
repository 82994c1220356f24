//! Frame builders and the inbound processor.

mod builder;
mod pdu;
mod processor;

pub(crate) use builder::{build_request, build_secured, build_unsecured};
pub(crate) use processor::{process_received, ProcessOutcome};
