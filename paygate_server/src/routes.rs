//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Any long, non-cpu-bound operation (database calls, provider
//! queries, notifications) must be expressed as futures so that the worker can handle other requests in the meantime.
//!
//! Both confirmation paths, the provider webhook and the client's verification poll, end in
//! [`ReconciliationApi::reconcile`]. The handlers here only translate HTTP into payment signals and reconcile outcomes
//! back into HTTP.
use actix_web::{get, http::header::CONTENT_TYPE, web, HttpRequest, HttpResponse, Responder};
use chrono::Utc;
use log::*;
use paygate_engine::{
    db_types::{OrderReference, PaymentStatus},
    reconciler::EffectStatus,
    signals::{authenticate, callback_auth::SECURITY_LOG_TARGET, CallbackPayload},
    traits::{Notifier, PaymentStatusProvider, ProviderStatusError},
    PaymentGatewayDatabase,
    PaymentSignal,
    ReconcileError,
    ReconcileOutcome,
    ReconciliationApi,
};

use crate::{
    config::{CallbackConfig, ServerOptions},
    data_objects::{
        CallbackReadiness,
        JsonResponse,
        NotificationRequest,
        VerificationRequest,
        VerificationResponse,
        ORDER_CREATED,
    },
    errors::ServerError,
};

/// Orders older than this cannot have their confirmation resent through the public notifications endpoint.
pub const CONFIRMATION_RESEND_WINDOW_SECS: i64 = 10 * 60;

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro.
// Every generated route is wrapped in the rate limiter for the given bucket.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ident),+ ; limit $bucket:expr) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds >],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds >] >,)+ );}
        paste::paste! { impl< $( [< T $bounds >],)+ > [<$name:camel Route>]< $( [< T $bounds >],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds >] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds>],)+>
        where
            $([<T $bounds>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds >], )+>)
                    .wrap($crate::middleware::RateLimitMiddlewareFactory::new($bucket));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Moolre webhook  ----------------------------------------------------
#[get("/payment/moolre/callback")]
pub async fn callback_readiness() -> impl Responder {
    trace!("💳️ Received callback readiness probe");
    HttpResponse::Ok().json(CallbackReadiness::now())
}

route!(moolre_callback => Post "/payment/moolre/callback" impl PaymentGatewayDatabase, Notifier; limit crate::rate_limit::RateLimitBucket::Callback);
/// Route handler for payment webhooks sent by Moolre.
///
/// The body may be JSON, form-encoded or plain text. It is normalized into a payment signal, the shared secret it
/// carries is checked, and the signal is reconciled against the order it names.
///
/// Every outcome the gateway understands is answered with a 200, so that the provider stops redelivering. Problems
/// with the request itself (malformed body, no order reference, unknown order, a mismatched amount) are 4xx.
pub async fn moolre_callback<B, N>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, N>>,
    callback: web::Data<CallbackConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    N: Notifier,
{
    let content_type = req.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    trace!("💳️ Received payment webhook ({} bytes, content type {content_type:?})", body.len());
    let payload = CallbackPayload::parse(content_type, &body).map_err(|e| {
        debug!("💳️ Could not decode webhook body. {e}");
        ServerError::InvalidRequestBody("Invalid Request Body".into())
    })?;
    let Some(trust) = authenticate(payload.presented_secret.as_deref(), callback.secret.as_ref()).trust() else {
        warn!(
            target: SECURITY_LOG_TARGET,
            "💳️ Rejected a webhook for {:?} with an invalid secret",
            payload.order_reference.as_ref().map(|r| r.as_str())
        );
        return Err(ServerError::AuthenticationError("Invalid callback signature".into()));
    };
    let signal = payload.into_signal(trust)?;
    info!("💳️ Webhook for order {} reports {:?}", signal.order_reference, signal.status);
    let outcome = api.reconcile(signal).await?;
    info!("💳️ Webhook result: {outcome}");
    let response = match outcome {
        ReconcileOutcome::Paid { .. } => JsonResponse::success("Payment verified and Order Updated"),
        ReconcileOutcome::AlreadyPaid(_) => JsonResponse::success("Order already processed"),
        ReconcileOutcome::Failed(_) => JsonResponse::failure("Payment not successful"),
        ReconcileOutcome::AlreadyFailed(_) => JsonResponse::failure("Order already processed"),
        ReconcileOutcome::NotYetConfirmed(_) => JsonResponse::failure("Payment not yet confirmed"),
        ReconcileOutcome::AmountMismatch { .. } => return Err(ServerError::AmountMismatch),
    };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Verification  ----------------------------------------------------
route!(verify_payment => Post "/payment/moolre/verify" impl PaymentGatewayDatabase, Notifier, PaymentStatusProvider; limit crate::rate_limit::RateLimitBucket::Verify);
/// Route handler for client-initiated payment verification.
///
/// The storefront calls this after the customer returns from the payment page, in case the webhook has not arrived
/// (yet). The provider's status API is queried with the server's own credentials and the answer is reconciled exactly
/// like a webhook would be.
///
/// Body: `{"orderNumber": "ORD-<digits>-<digits>"}`
///
/// Every answer about a known order carries its current `status` and `payment_status`.
pub async fn verify_payment<B, N, P>(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, N>>,
    provider: web::Data<P>,
    options: web::Data<ServerOptions>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    N: Notifier,
    P: PaymentStatusProvider,
{
    let request = serde_json::from_slice::<VerificationRequest>(&body).map_err(|e| {
        debug!("🔎️ Could not decode verification request. {e}");
        ServerError::InvalidRequestBody("Missing or invalid orderNumber".into())
    })?;
    let order_number = request
        .order_number
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::InvalidRequestBody("Missing or invalid orderNumber".into()))?;
    let reference = OrderReference::from(order_number);
    if !reference.is_storefront_format() {
        debug!("🔎️ Refusing to verify badly formatted order number {reference}");
        return Err(ServerError::InvalidRequestBody("Invalid order number format".into()));
    }
    trace!("🔎️ Verifying payment for order {reference}");
    let order = match api.fetch_order(&reference).await {
        Ok(Some(order)) => order,
        Ok(None) => return Err(ServerError::NoRecordFound("Order not found".into())),
        Err(e) => return verification_failure(&reference, e),
    };
    match order.payment_status {
        PaymentStatus::Paid => {
            debug!("🔎️ Order {reference} is already paid");
            return Ok(HttpResponse::Ok().json(VerificationResponse::for_order(true, &order, "Order already paid")));
        },
        PaymentStatus::Failed => {
            debug!("🔎️ Order {reference} has already failed");
            return Ok(HttpResponse::Ok().json(VerificationResponse::for_order(false, &order, "Payment failed")));
        },
        PaymentStatus::Unpaid => {},
    }
    if let Some(method) = order.payment_method() {
        if !method.eq_ignore_ascii_case(&options.payment_method) {
            debug!("🔎️ Order {reference} was placed with {method}, not {}", options.payment_method);
            return Err(ServerError::InvalidRequestBody("This order does not use Moolre payment".into()));
        }
    }
    let status = match provider.query_status(&reference).await {
        Ok(status) => status,
        Err(ProviderStatusError::CredentialsMissing) => {
            warn!("🔎️ Cannot verify order {reference}. Provider credentials are not configured.");
            let response = VerificationResponse::for_order(false, &order, "Payment verification unavailable");
            return Ok(HttpResponse::ServiceUnavailable().json(response));
        },
        Err(ProviderStatusError::Unavailable(e)) => {
            warn!("🔎️ Cannot verify order {reference} right now. {e}");
            let response =
                VerificationResponse::for_order(false, &order, "Payment not yet confirmed by payment provider");
            return Ok(HttpResponse::Ok().json(response));
        },
    };
    let outcome = match api.reconcile(PaymentSignal::from_provider_status(reference.clone(), status)).await {
        Ok(outcome) => outcome,
        Err(e) => return verification_failure(&reference, e),
    };
    info!("🔎️ Verification result: {outcome}");
    let (success, message) = match &outcome {
        ReconcileOutcome::Paid { .. } => (true, "Payment verified and order updated"),
        ReconcileOutcome::AlreadyPaid(_) => (true, "Order already paid"),
        ReconcileOutcome::NotYetConfirmed(_) => (false, "Payment not yet confirmed by payment provider"),
        ReconcileOutcome::AmountMismatch { .. } => (false, "Payment amount does not match order total"),
        ReconcileOutcome::Failed(_) | ReconcileOutcome::AlreadyFailed(_) => (false, "Payment failed"),
    };
    Ok(HttpResponse::Ok().json(VerificationResponse::for_order(success, outcome.order(), message)))
}

/// Store faults still answer with the order number, and an `unknown` state since the current one could not be read.
fn verification_failure(reference: &OrderReference, err: ReconcileError) -> Result<HttpResponse, ServerError> {
    match ServerError::from(err) {
        ServerError::BackendError(e) => {
            error!("🔎️ Could not verify order {reference}. {e}");
            let response = VerificationResponse::unknown(reference, "Internal server error");
            Ok(HttpResponse::InternalServerError().json(response))
        },
        other => Err(other),
    }
}

//----------------------------------------------   Notifications  ----------------------------------------------------
route!(notifications => Post "/notifications" impl PaymentGatewayDatabase, Notifier; limit crate::rate_limit::RateLimitBucket::Notification);
/// Route handler for storefront notification requests.
///
/// Only `order_created` is handled here: it (re)sends the confirmation for an order placed in the last ten minutes.
///
/// Body: `{"type": "order_created", "payload": {"order_number": "ORD-..."}}`
pub async fn notifications<B, N>(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B, N>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentGatewayDatabase,
    N: Notifier,
{
    let request = serde_json::from_slice::<NotificationRequest>(&body).map_err(|e| {
        debug!("📨️ Could not decode notification request. {e}");
        ServerError::InvalidRequestBody("Type and payload required".into())
    })?;
    let (Some(kind), Some(_)) = (request.kind.as_deref(), request.payload.as_ref()) else {
        return Err(ServerError::InvalidRequestBody("Type and payload required".into()));
    };
    if kind != ORDER_CREATED {
        debug!("📨️ Ignoring unsupported notification type {kind}");
        return Err(ServerError::InvalidRequestBody("Unsupported notification type".into()));
    }
    let identifier = request
        .order_identifier()
        .ok_or_else(|| ServerError::InvalidRequestBody("Missing order identifier".into()))?;
    let order = api
        .fetch_order_by_identifier(&identifier)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound("Order not found".into()))?;
    let reference = &order.order_number;
    let age = Utc::now().signed_duration_since(order.created_at);
    if age.num_seconds() > CONFIRMATION_RESEND_WINDOW_SECS {
        debug!("📨️ Order {reference} is {}s old. Not resending its confirmation.", age.num_seconds());
        return Err(ServerError::InvalidRequestBody("Order confirmation can only be sent for recent orders".into()));
    }
    match api.effects().resend_confirmation(&order).await {
        EffectStatus::Completed => {
            info!("📨️ Confirmation for order {reference} sent");
            Ok(HttpResponse::Ok().json(JsonResponse::success("Order confirmation sent")))
        },
        status => Err(ServerError::BackendError(format!("Confirmation for order {reference} was not sent: {status:?}"))),
    }
}
