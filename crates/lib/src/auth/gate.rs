//! Request gate for protected routes.

use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tower_cookies::Cookies;

use super::AuthResolver;

/// Middleware: resolve the session or reject with 401.
///
/// On success the [`AuthContext`](super::AuthContext) is inserted into the
/// request extensions, so handlers take it as `Extension<AuthContext>`. On
/// failure the wrapped handler is never called.
pub async fn require_session(
    State(resolver): State<AuthResolver>,
    cookies: Cookies,
    mut request: Request,
    next: Next,
) -> Response {
    match resolver.resolve(&cookies).await {
        Ok(context) => {
            tracing::trace!(user_id = %context.user_id, path = %request.uri().path(), "Session accepted");
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(path = %request.uri().path(), reason = e.classification(), "Request rejected");
            e.into_response()
        }
    }
}

/// Wrap every route in `router` with [`require_session`].
///
/// Needs a `CookieManagerLayer` outside the returned router.
pub fn protect<S>(router: Router<S>, resolver: AuthResolver) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(resolver, require_session))
}
