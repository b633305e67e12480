//! OTP login and browser session handlers.
//!
//! The proxy never sees a password or keeps a session table. Login is a
//! two-step OTP exchange negotiated with the upstream; the resulting token
//! lives only in the `HttpOnly` `smv_token` cookie, with `smv_auth=1` as a
//! marker the dashboard can check through `/api/auth/session`.

pub mod check_user;
pub mod send_otp;
pub mod session;
pub mod types;
pub mod verify_otp;

#[cfg(test)]
mod tests;
