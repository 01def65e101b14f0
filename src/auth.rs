//! Session model, token secrets, and JWT expiry decoding.

pub mod jwt;
pub mod session;
pub mod token;

pub use session::*;
pub use token::{pair::*, secret::*};
