use thiserror::Error;

/// The single error type every adapter surfaces.
///
/// Adapters must translate provider SDK/HTTP failures into this shape at the point they occur; raw provider errors
/// never cross the crate boundary. The message is human-readable and safe to show an operator.
#[derive(Debug, Clone, Error)]
#[error("Payment gateway error ({gateway}): {message}")]
pub struct GatewayError {
    pub gateway: String,
    pub message: String,
}

impl GatewayError {
    pub fn new<G: Into<String>, M: Into<String>>(gateway: G, message: M) -> Self {
        Self { gateway: gateway.into(), message: message.into() }
    }

    pub fn unsupported(key: &str) -> Self {
        Self::new(key, format!("'{key}' is not a supported payment gateway"))
    }
}
