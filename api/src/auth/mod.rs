pub mod guards;
pub mod middleware;
pub mod session;

pub use session::{AuthContext, SESSION_COOKIE};
