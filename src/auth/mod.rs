//! Authentication: registering users, logging in and out, and guarding
//! routes with a private session cookie.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod register;

pub use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::post_log_in;
pub use log_out::post_log_out;
pub use middleware::auth_guard;
pub use register::register_user;
