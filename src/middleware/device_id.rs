use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::debug;
use uuid::Uuid;

use crate::state::AppState;

pub const DEVICE_COOKIE: &str = "deviceId";
pub const DEVICE_COOKIE_MAX_AGE_DAYS: i64 = 365;
pub const MAX_DEVICE_ID_LEN: usize = 128;

/// Opaque per-browser identity. Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn issue() -> Self {
        DeviceId(Uuid::new_v4().simple().to_string())
    }

    /// Accepts a cookie value unless it is empty or oversized.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.is_empty() || value.len() > MAX_DEVICE_ID_LEN {
            return None;
        }
        Some(DeviceId(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolves the caller's device from the `deviceId` cookie, issuing a fresh
/// one when it is missing or unusable, and exposes it as an extension.
pub async fn device_identity(
    State(state): State<AppState>,
    cookie_jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let existing = cookie_jar
        .get(DEVICE_COOKIE)
        .and_then(|cookie| DeviceId::parse(cookie.value()));

    match existing {
        Some(device) => {
            req.extensions_mut().insert(device);
            next.run(req).await
        }
        None => {
            let device = DeviceId::issue();
            debug!(device = %device.as_str(), "issued device id");
            let cookie = device_cookie(&device, state.config.is_production());

            req.extensions_mut().insert(device);
            let resp = next.run(req).await;
            (cookie_jar.add(cookie), resp).into_response()
        }
    }
}

pub fn device_cookie(device: &DeviceId, production: bool) -> Cookie<'static> {
    let same_site = if production {
        SameSite::None
    } else {
        SameSite::Lax
    };
    Cookie::build((DEVICE_COOKIE, device.as_str().to_string()))
        .path("/")
        .max_age(time::Duration::days(DEVICE_COOKIE_MAX_AGE_DAYS))
        .http_only(true)
        .same_site(same_site)
        .secure(production)
        .build()
}
