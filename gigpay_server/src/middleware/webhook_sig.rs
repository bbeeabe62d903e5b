//! Webhook signature middleware for Actix Web.
//!
//! Every inbound webhook delivery carries `X-Gigpay-Timestamp` (unix seconds) and `X-Gigpay-Signature`
//! (hex HMAC-SHA256 over `"{timestamp}.{raw_body}"`, keyed with the provider's webhook secret). This middleware
//! wraps the webhook scope, verifies the signature before any handler runs, and restores the consumed body so the
//! handler can parse it.
//!
//! A delivery that fails verification is rejected with 403 and never reaches the settlement engine.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden, ErrorNotFound},
    web,
    Error,
};
use chrono::Utc;
use futures::future::LocalBoxFuture;
use gateway_tools::{
    webhook::{verify_signature, DEFAULT_TOLERANCE},
    GatewayFactory,
};
use log::{trace, warn};

pub const SIGNATURE_HEADER: &str = "x-gigpay-signature";
pub const TIMESTAMP_HEADER: &str = "x-gigpay-timestamp";

pub struct WebhookSignatureMiddlewareFactory {
    gateways: GatewayFactory,
    // If false, then the middleware will not check the signature and always allow the call
    enabled: bool,
}

impl WebhookSignatureMiddlewareFactory {
    pub fn new(gateways: GatewayFactory, enabled: bool) -> Self {
        WebhookSignatureMiddlewareFactory { gateways, enabled }
    }
}

impl<S, B> Transform<S, ServiceRequest> for WebhookSignatureMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = WebhookSignatureMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(WebhookSignatureMiddlewareService {
            gateways: self.gateways.clone(),
            enabled: self.enabled,
            service: Rc::new(service),
        }))
    }
}

pub struct WebhookSignatureMiddlewareService<S> {
    gateways: GatewayFactory,
    enabled: bool,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for WebhookSignatureMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let gateways = self.gateways.clone();
        let enabled = self.enabled;
        Box::pin(async move {
            trace!("🔐️ Checking webhook signature for request");
            if !enabled {
                trace!("🔐️ Webhook signature checks are disabled. Allowing request.");
                return service.call(req).await;
            }
            // Scope middleware runs before resource matching, so the provider key is read off the raw path.
            let provider = req.path().trim_end_matches('/').rsplit('/').next().unwrap_or_default().to_string();
            let secret = gateways.webhook_secret(&provider).map_err(|e| {
                warn!("🔐️ Webhook delivery for unknown provider '{provider}'. {e}");
                ErrorNotFound("Unknown webhook provider.")
            })?;
            let timestamp = header_value(&req, TIMESTAMP_HEADER)?;
            let signature = header_value(&req, SIGNATURE_HEADER)?;
            let data = req.extract::<web::Bytes>().await.map_err(|e| {
                warn!("🔐️ Failed to extract request data: {e:?}");
                ErrorBadRequest("Failed to extract request data.")
            })?;
            match verify_signature(secret.reveal(), &timestamp, data.as_ref(), &signature, DEFAULT_TOLERANCE, Utc::now())
            {
                Ok(()) => {
                    trace!("🔐️ Signature check for {provider} webhook ✅️");
                    req.set_payload(bytes_to_payload(data));
                    service.call(req).await
                },
                Err(e) => {
                    warn!("🔐️ Rejecting {provider} webhook delivery: {e}");
                    Err(ErrorForbidden("Invalid webhook signature."))
                },
            }
        })
    }
}

fn header_value(req: &ServiceRequest, name: &str) -> Result<String, Error> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .ok_or_else(|| {
            warn!("🔐️ No {name} header found in webhook request. Denying access.");
            ErrorForbidden("Missing webhook signature headers.")
        })
}

fn bytes_to_payload(buf: web::Bytes) -> Payload {
    let (_, mut pl) = h1::Payload::create(true);
    pl.unread_data(buf);
    Payload::from(pl)
}
