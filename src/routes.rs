use crate::{
    api::{admin, attendance, reports},
    auth::{handlers, middleware::session_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    // Public routes
    cfg.service(
        web::scope(&format!("{}/auth", config.api_prefix))
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(build_limiter(config.rate_register_per_min))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/logout")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(session_middleware)) // session identity
            .wrap(build_limiter(config.rate_protected_per_min)) // rate limiting
            .service(
                web::scope("/attendance")
                    .service(
                        web::resource("/check-in").route(web::post().to(attendance::check_in)),
                    )
                    .service(
                        web::resource("/check-out").route(web::post().to(attendance::check_out)),
                    )
                    .service(web::resource("/status").route(web::get().to(attendance::status)))
                    .service(web::resource("/history").route(web::get().to(attendance::history))),
            )
            .service(
                web::scope("/admin")
                    .service(web::resource("/users").route(web::get().to(admin::list_users)))
                    .service(web::resource("/add-user").route(web::post().to(admin::add_user)))
                    .service(
                        web::resource("/toggle-admin").route(web::post().to(admin::toggle_admin)),
                    )
                    .service(web::resource("/dashboard").route(web::get().to(admin::dashboard))),
            )
            .service(
                web::scope("/reports")
                    .service(web::resource("").route(web::get().to(reports::report_list)))
                    .service(
                        web::resource("/export-csv").route(web::get().to(reports::export_csv)),
                    )
                    .service(
                        web::resource("/export-pdf").route(web::get().to(reports::export_pdf)),
                    ),
            ),
    );
}
