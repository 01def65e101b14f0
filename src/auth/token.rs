//! Token secrets and the token pair payload issued by the backend.

pub mod pair;
pub mod secret;
