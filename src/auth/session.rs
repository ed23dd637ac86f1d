use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Session identity carried in two plain cookies.
pub const USER_ID_COOKIE: &str = "userId";
pub const IS_ADMIN_COOKIE: &str = "isAdmin";

pub struct SessionUser {
    pub user_id: u64,
    pub is_admin: bool,
}

impl FromRequest for SessionUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let user_id = match req
            .cookie(USER_ID_COOKIE)
            .and_then(|c| c.value().parse::<u64>().ok())
        {
            Some(id) => id,
            None => return ready(Err(ErrorUnauthorized("Not authenticated"))),
        };

        let is_admin = req
            .cookie(IS_ADMIN_COOKIE)
            .map(|c| c.value() == "1")
            .unwrap_or(false);

        ready(Ok(SessionUser { user_id, is_admin }))
    }
}

impl SessionUser {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Admin privileges required"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    #[actix_web::test]
    async fn extracts_user_from_cookies() {
        let req = TestRequest::default()
            .cookie(Cookie::new(USER_ID_COOKIE, "7"))
            .cookie(Cookie::new(IS_ADMIN_COOKIE, "1"))
            .to_http_request();

        let session = SessionUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert_eq!(session.user_id, 7);
        assert!(session.is_admin);
        assert!(session.require_admin().is_ok());
    }

    #[actix_web::test]
    async fn missing_user_cookie_is_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(SessionUser::from_request(&req, &mut Payload::None)
            .await
            .is_err());
    }

    #[actix_web::test]
    async fn non_numeric_user_cookie_is_unauthorized() {
        let req = TestRequest::default()
            .cookie(Cookie::new(USER_ID_COOKIE, "abc"))
            .to_http_request();
        assert!(SessionUser::from_request(&req, &mut Payload::None)
            .await
            .is_err());
    }

    #[actix_web::test]
    async fn admin_cookie_other_than_one_is_not_admin() {
        let req = TestRequest::default()
            .cookie(Cookie::new(USER_ID_COOKIE, "3"))
            .cookie(Cookie::new(IS_ADMIN_COOKIE, "true"))
            .to_http_request();

        let session = SessionUser::from_request(&req, &mut Payload::None)
            .await
            .unwrap();
        assert!(!session.is_admin);
        assert!(session.require_admin().is_err());
    }
}
