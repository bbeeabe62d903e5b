mod webhook_sig;

pub use webhook_sig::{WebhookSignatureMiddlewareFactory, SIGNATURE_HEADER, TIMESTAMP_HEADER};
