use crate::{api::punch, config::Config};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::web;

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

    let punch_limiter = build_limiter(config.rate_punch_per_min);

    // The punch route is public at the routing layer; the handler checks
    // the shared device key itself so that auth failures come back as the
    // documented JSON bodies.
    cfg.service(
        web::scope(&config.api_prefix).service(
            web::resource("/punch")
                .wrap(punch_limiter)
                .route(web::post().to(punch::record_punches)),
        ),
    );
}
