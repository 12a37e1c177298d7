//! Ticket visibility, search and presentation

pub mod access;
pub mod decode;
pub mod families;
pub mod filters;
pub mod serialize;

pub use access::{access_sources, AccessSource};
pub use families::organize_ticket_families;
pub use filters::{build_search_filters, AccessScope, Predicate, TicketFilter};
pub use serialize::serialize_ticket;
