//! Rate limiting middleware for Actix Web.
//!
//! Wrap a resource with [`RateLimitMiddlewareFactory`] to count every request against a [`RateLimitBucket`] for the
//! calling IP address. The shared [`RateLimiter`] and the [`ServerOptions`] (which decide whether proxy headers are
//! trusted) are read from the application data.
//!
//! Denied requests never reach the handler. They receive a 429 carrying `X-RateLimit-Remaining`,
//! `X-RateLimit-Reset` and `Retry-After` headers.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    web,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{error, trace, warn};

use crate::{
    config::ServerOptions,
    errors::ServerError,
    helpers::caller_identity,
    rate_limit::{RateLimitBucket, RateLimiter},
};

pub struct RateLimitMiddlewareFactory {
    bucket: RateLimitBucket,
}

impl RateLimitMiddlewareFactory {
    pub fn new(bucket: RateLimitBucket) -> Self {
        RateLimitMiddlewareFactory { bucket }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = RateLimitMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService { bucket: self.bucket, service: Rc::new(service) }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    bucket: RateLimitBucket,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let bucket = self.bucket;
        Box::pin(async move {
            let limiter = req.app_data::<web::Data<RateLimiter>>().cloned().ok_or_else(|| {
                error!("🚦️ No rate limiter has been registered with the application. Denying request.");
                ServerError::ConfigurationError("Rate limiter is not configured".into())
            })?;
            let options = req.app_data::<web::Data<ServerOptions>>().map(|o| o.get_ref().clone()).unwrap_or_default();
            let identity = caller_identity(req.request(), options.use_x_forwarded_for, options.use_forwarded);
            let decision = limiter.check(bucket, &identity).await;
            if !decision.allowed {
                warn!("🚦️ Too many {bucket} requests from {identity}. Denying request.");
                return Err(ServerError::RateLimited { retry_after: decision.retry_after_secs }.into());
            }
            trace!("🚦️ {bucket} request from {identity} is within limits");
            let mut res = service.call(req).await?;
            let headers = res.headers_mut();
            headers.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from(decision.remaining));
            headers.insert(HeaderName::from_static("x-ratelimit-reset"), HeaderValue::from(decision.retry_after_secs));
            Ok(res)
        })
    }
}
