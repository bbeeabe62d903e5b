use std::env;

use gateway_tools::GatewayFactory;
use gigpay_common::{FeeSchedule, MoneyCents, Secret};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};

const DEFAULT_GIGPAY_HOST: &str = "127.0.0.1";
const DEFAULT_GIGPAY_PORT: u16 = 4480;

// Defaults match the published fee schedule: $5.00 fixed + 10% platform fee, 13% tax on service + fee.
const DEFAULT_FIXED_FEE_CENTS: i64 = 500;
const DEFAULT_FEE_BPS: i64 = 1000;
const DEFAULT_TAX_BPS: i64 = 1300;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// The fee schedule applied to offers accepted from now on. Already-accepted contracts keep the snapshot taken
    /// at acceptance time.
    pub fees: FeeSchedule,
    /// Credentials for the supported payment providers.
    pub gateways: GatewayFactory,
    /// If false, inbound webhook deliveries are NOT checked against their signature headers. **DANGER**: only for
    /// local testing against unsigned simulators.
    pub signature_checks: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GIGPAY_HOST.to_string(),
            port: DEFAULT_GIGPAY_PORT,
            database_url: String::default(),
            auth: AuthConfig::default(),
            fees: FeeSchedule::new(
                MoneyCents::from(DEFAULT_FIXED_FEE_CENTS),
                DEFAULT_FEE_BPS,
                DEFAULT_TAX_BPS,
            ),
            gateways: GatewayFactory::default(),
            signature_checks: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("GIGPAY_HOST").ok().unwrap_or_else(|| DEFAULT_GIGPAY_HOST.into());
        let port = env::var("GIGPAY_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for GIGPAY_PORT. {e} Using the default, {DEFAULT_GIGPAY_PORT}, \
                         instead."
                    );
                    DEFAULT_GIGPAY_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_GIGPAY_PORT);
        let database_url = env::var("GIGPAY_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ GIGPAY_DATABASE_URL is not set. Please set it to the URL for the settlement database.");
            String::default()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to \
                 the default configuration."
            );
            AuthConfig::default()
        });
        let fees = fee_schedule_from_env();
        let gateways = GatewayFactory::from_env_or_default();
        let signature_checks =
            env::var("GIGPAY_WEBHOOK_SIGNATURE_CHECKS").map(|s| &s != "0" && &s != "false").unwrap_or(true);
        if !signature_checks {
            warn!(
                "🚨️ Webhook signature checks are DISABLED. Anyone who can reach this server can settle payments. Do \
                 not run production like this."
            );
        }
        Self { host, port, database_url, auth, fees, gateways, signature_checks }
    }
}

fn fee_schedule_from_env() -> FeeSchedule {
    let fixed_fee = env_i64("GIGPAY_FIXED_FEE_CENTS", DEFAULT_FIXED_FEE_CENTS);
    let fee_bps = env_i64("GIGPAY_FEE_BPS", DEFAULT_FEE_BPS);
    let tax_bps = env_i64("GIGPAY_TAX_BPS", DEFAULT_TAX_BPS);
    info!("🪛️ Fee schedule: {fixed_fee}c fixed + {fee_bps}bps fee, {tax_bps}bps tax");
    FeeSchedule::new(MoneyCents::from(fixed_fee), fee_bps, tax_bps)
}

fn env_i64(var: &str, default: i64) -> i64 {
    env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for {var}: {s}. {e}"))
        })
        .ok()
        .unwrap_or(default)
}

//-------------------------------------------------  AuthConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The shared secret used to sign and verify access tokens (HMAC-SHA256).
    pub jwt_secret: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT signing secret has not been set. I'm using a random value for this session. All issued \
             tokens become invalid when the server restarts. Set GIGPAY_JWT_SECRET for production. 🚨️🚨️🚨️"
        );
        let secret: String = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect();
        Self { jwt_secret: Secret::new(secret) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, String> {
        let secret = env::var("GIGPAY_JWT_SECRET").map_err(|_| "GIGPAY_JWT_SECRET is not set".to_string())?;
        if secret.len() < 32 {
            return Err("GIGPAY_JWT_SECRET must be at least 32 characters".to_string());
        }
        Ok(Self { jwt_secret: Secret::new(secret) })
    }
}
