//! Data models for the LMS server

pub mod author;
pub mod book;
pub mod borrower;
pub mod notification;
pub mod ticket;
pub mod user;

// Re-export commonly used types
pub use author::Author;
pub use book::{Book, BookDetails, LoanState};
pub use borrower::{Borrower, HeldBooks};
pub use ticket::{TicketAccessContext, TicketRecord, TicketRow, TicketSearchQuery};
pub use user::{Role, User, UserClaims, UserOut};
