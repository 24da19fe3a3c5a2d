mod claims;
pub(crate) mod email;
pub mod links;

pub use links::{JwtLinkMinter, LinkMinter};
