use crate::auth::session::{IS_ADMIN_COOKIE, SessionUser, USER_ID_COOKIE};
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
};
use serde_json::json;

pub async fn session_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let user_id = match req
        .cookie(USER_ID_COOKIE)
        .and_then(|c| c.value().parse::<u64>().ok())
    {
        Some(id) => id,
        None => {
            let resp = HttpResponse::Unauthorized().json(json!({"error": "Not authenticated"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let is_admin = req
        .cookie(IS_ADMIN_COOKIE)
        .map(|c| c.value() == "1")
        .unwrap_or(false);

    req.extensions_mut().insert(SessionUser { user_id, is_admin });

    next.call(req).await
}
