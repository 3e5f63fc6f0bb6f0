use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::models::SignedLink;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const ADMIN_MODE: &str = "admin";

/// What a caller presented alongside a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub signature: String,
    pub admin_key: String,
    pub mode: String,
}

impl Credentials {
    pub fn client(signature: &str) -> Self {
        Self {
            signature: signature.to_string(),
            ..Self::default()
        }
    }

    pub fn admin(signature: &str, admin_key: &str) -> Self {
        Self {
            signature: signature.to_string(),
            admin_key: admin_key.to_string(),
            mode: ADMIN_MODE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AccessPolicy {
    link_secret: String,
    admin_api_key: Option<String>,
    webhook_token: Option<String>,
}

impl AccessPolicy {
    pub fn new(link_secret: &str, admin_api_key: Option<&str>, webhook_token: Option<&str>) -> Self {
        let configured = |value: Option<&str>| value.map(str::trim).filter(|value| !value.is_empty()).map(String::from);
        Self {
            link_secret: link_secret.to_string(),
            admin_api_key: configured(admin_api_key),
            webhook_token: configured(webhook_token),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            &config.client_link_secret,
            config.admin_api_key.as_deref(),
            config.webhook_token.as_deref(),
        )
    }

    fn mac(&self) -> AppResult<HmacSha256> {
        HmacSha256::new_from_slice(self.link_secret.as_bytes())
            .map_err(|error| AppError::Config(format!("invalid client link secret: {error}")))
    }

    /// Lowercase hex HMAC-SHA256 of the Salesforce ID.
    pub fn sign(&self, sf_id: &str) -> AppResult<String> {
        let mut mac = self.mac()?;
        mac.update(sf_id.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    pub fn verify(&self, sf_id: &str, signature: &str) -> bool {
        let signature = signature.trim();
        if signature.is_empty() {
            return false;
        }
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(sf_id.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }

    pub fn require_signature(&self, sf_id: &str, signature: &str) -> AppResult<()> {
        if self.verify(sf_id, signature) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("invalid signature for {sf_id}")))
        }
    }

    pub fn signed_link(&self, sf_id: &str) -> AppResult<SignedLink> {
        let signature = self.sign(sf_id)?;
        Ok(SignedLink {
            sf_id: sf_id.to_string(),
            url_path: format!("/status/{sf_id}?sig={signature}"),
            signature,
        })
    }

    /// Admin pages are open when no admin key is configured.
    pub fn has_admin_access(&self, provided_key: &str) -> bool {
        match &self.admin_api_key {
            None => true,
            Some(expected) => keys_match(provided_key, expected),
        }
    }

    pub fn has_edit_access(&self, credentials: &Credentials) -> bool {
        self.has_admin_access(&credentials.admin_key) && credentials.mode == ADMIN_MODE
    }

    pub fn require_admin(&self, provided_key: &str) -> AppResult<()> {
        if self.has_admin_access(provided_key) {
            Ok(())
        } else {
            Err(AppError::Forbidden("admin key required".to_string()))
        }
    }

    pub fn require_webhook_token(&self, provided: &str) -> AppResult<()> {
        match &self.webhook_token {
            Some(expected) if !keys_match(provided, expected) => {
                Err(AppError::Forbidden("invalid webhook token".to_string()))
            }
            _ => Ok(()),
        }
    }
}

fn keys_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
