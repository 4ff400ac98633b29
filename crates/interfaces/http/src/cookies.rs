//! Opaque session cookie handling (§6 "Session cookie"). The cookie
//! itself just carries an opaque id; continuity state and idle expiry
//! live in the session store (`gateway_session`).

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::Cookie;
use gateway_session::IDLE_WINDOW_SECS;

const COOKIE_NAME: &str = "gateway_session";

/// Returns the request's session id (generating one if absent) and the jar
/// to send back, with a fresh cookie set when a new id was minted.
pub fn session_id(jar: CookieJar) -> (String, CookieJar) {
    if let Some(cookie) = jar.get(COOKIE_NAME) {
        let id = cookie.value().to_string();
        (id, jar)
    } else {
        let id = uuid::Uuid::new_v4().to_string();
        let cookie = Cookie::build((COOKIE_NAME, id.clone()))
            .path("/")
            .http_only(true)
            .max_age(time::Duration::seconds(IDLE_WINDOW_SECS))
            .build();
        let jar = jar.add(cookie);
        (id, jar)
    }
}
