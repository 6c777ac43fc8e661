//! Request authentication.
//!
//! Requests carry a session token in the [`SESSION_COOKIE`] cookie. The
//! [`AuthResolver`] turns that token into an [`AuthContext`], and the
//! [`gate`] middleware applies it in front of protected routes.

mod context;
mod errors;
pub mod gate;
mod resolver;

use time::OffsetDateTime;
use tower_cookies::Cookie;

pub use context::{AuthContext, IpFamily, client_ip};
pub use errors::AuthError;
pub use resolver::AuthResolver;

use crate::session::SessionToken;

/// Cookie that carries the session token.
pub const SESSION_COOKIE: &str = "session_token";

/// Build the session cookie sent on successful login.
///
/// HttpOnly and scoped to `/`; `secure` adds the Secure attribute for
/// deployments behind TLS.
pub fn session_cookie(token: SessionToken, expires: OffsetDateTime, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.into_string());
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie.set_expires(expires);
    cookie.set_secure(secure);
    cookie
}

/// Cookie that clears the session cookie on the client.
pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::from(SESSION_COOKIE);
    cookie.set_path("/");
    cookie
}
