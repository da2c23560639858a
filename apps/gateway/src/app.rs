//! Application assembly shared by the binary and the integration tests.

use actix_extensible_rate_limit::backend::memory::InMemoryBackend;
use actix_extensible_rate_limit::RateLimiter;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{Compress, Condition};
use actix_web::{web, App, Error};

use crate::middleware::{
    api_rate_limit_config, cors_middleware, denied_response, RequestTrace, SecurityHeaders, StructuredLogger,
    TraceSpan,
};
use crate::routes;
use crate::state::AppState;
use crate::upload::UPLOADS_URL_PREFIX;

/// Build the gateway `App` with its full middleware chain.
///
/// `limiter` must be created once per process and cloned into every worker,
/// otherwise each worker counts requests separately.
pub fn build_app(
    state: web::Data<AppState>,
    limiter: InMemoryBackend,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    let rate_limiter = RateLimiter::builder(limiter, api_rate_limit_config(&state.rate_limit).build())
        .add_headers()
        .request_denied_response(denied_response)
        .build();
    let cors = cors_middleware(&state.cors_allowed_origins);
    let upload_root = state.local_upload_root.clone();

    let mut app = App::new()
        .app_data(state.clone())
        .configure(routes::configure);

    if let Some(root) = upload_root {
        app = app.service(
            actix_files::Files::new(UPLOADS_URL_PREFIX, root)
                .default_handler(web::to(routes::not_found)),
        );
    }

    app.default_service(web::to(routes::not_found))
        .wrap(Condition::new(state.rate_limit.enabled, rate_limiter))
        .wrap(SecurityHeaders)
        .wrap(Compress::default())
        .wrap(cors)
        .wrap(StructuredLogger)
        .wrap(TraceSpan)
        .wrap(RequestTrace)
}
