//! Token Record
//!
//! Registro de tokens guardado no servidor (nunca enviado ao browser) e o
//! verificador de validade usado por `status` e pelo gate de requisições.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::VendorFailure;

/// Validade padrão do access token quando o vendor omite `expires_in`
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Maior validade aceita do vendor (10 anos); acima disso a resposta é malformada
pub const MAX_LIFETIME_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// `now + secs`, ou `None` fora de `0..=MAX_LIFETIME_SECS` (negativo vira 0)
fn deadline(now: DateTime<Utc>, secs: i64) -> Option<DateTime<Utc>> {
    if secs > MAX_LIFETIME_SECS {
        return None;
    }
    Duration::try_seconds(secs.max(0)).and_then(|lifetime| now.checked_add_signed(lifetime))
}

/// Resposta do token endpoint (exchange e refresh)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub x_refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, VendorFailure> {
        let secs = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        deadline(now, secs)
            .ok_or_else(|| VendorFailure::Malformed(format!("expires_in fora do intervalo: {}", secs)))
    }

    pub fn refresh_token_expires_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, VendorFailure> {
        match self.x_refresh_token_expires_in {
            None => Ok(None),
            Some(secs) => deadline(now, secs).map(Some).ok_or_else(|| {
                VendorFailure::Malformed(format!(
                    "x_refresh_token_expires_in fora do intervalo: {}",
                    secs
                ))
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub realm_id: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(
        access_token: String,
        refresh_token: String,
        realm_id: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            realm_id,
            expires_at,
            refresh_token_expires_at: None,
            issued_at: Utc::now(),
        }
    }

    /// Registro de uma sessão nova a partir do primeiro par de tokens
    pub fn issued(realm_id: String, update: TokenUpdate) -> Self {
        Self {
            access_token: update.access_token,
            refresh_token: update.refresh_token.unwrap_or_default(),
            realm_id,
            expires_at: update.expires_at,
            refresh_token_expires_at: update.refresh_token_expires_at,
            issued_at: update.issued_at,
        }
    }

    /// Aplica uma atualização de refresh de uma vez só (token + expiração + refresh token)
    pub fn apply(&mut self, update: TokenUpdate) {
        self.access_token = update.access_token;
        self.expires_at = update.expires_at;
        if let Some(refresh_token) = update.refresh_token {
            self.refresh_token = refresh_token;
        }
        if update.refresh_token_expires_at.is_some() {
            self.refresh_token_expires_at = update.refresh_token_expires_at;
        }
        self.issued_at = update.issued_at;
    }
}

/// Campos substituídos por um refresh bem-sucedido
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenUpdate {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    /// A Intuit rotaciona o refresh token; `None` mantém o atual
    pub refresh_token: Option<String>,
    pub refresh_token_expires_at: Option<DateTime<Utc>>,
    pub issued_at: DateTime<Utc>,
}

impl TokenUpdate {
    /// Validades absurdas do vendor viram `VendorFailure::Malformed`
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Result<Self, VendorFailure> {
        Ok(Self {
            expires_at: response.expires_at(now)?,
            refresh_token_expires_at: response.refresh_token_expires_at(now)?,
            access_token: response.access_token,
            refresh_token: response.refresh_token.filter(|t| !t.is_empty()),
            issued_at: now,
        })
    }
}

/// `true` enquanto `now < expires_at`
pub fn is_valid(record: &TokenRecord, now: DateTime<Utc>) -> bool {
    now < record.expires_at
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_expiring_at(expires_at: DateTime<Utc>) -> TokenRecord {
        TokenRecord::new(
            "access".to_string(),
            "refresh".to_string(),
            "9130".to_string(),
            expires_at,
        )
    }

    #[test]
    fn test_is_valid_strictly_before_expiry() {
        let now = Utc::now();
        let record = record_expiring_at(now);

        assert!(is_valid(&record, now - Duration::seconds(1)));
        assert!(!is_valid(&record, now));
        assert!(!is_valid(&record, now + Duration::seconds(1)));
    }

    #[test]
    fn test_is_valid_is_monotonic() {
        let base = Utc::now();
        let record = record_expiring_at(base + Duration::seconds(3600));

        // Se é válido em t, é válido para qualquer t' < t
        let instants: Vec<_> = (-7200..=7200)
            .step_by(300)
            .map(|offset| base + Duration::seconds(offset))
            .collect();

        for (i, t) in instants.iter().enumerate() {
            if is_valid(&record, *t) {
                for earlier in &instants[..i] {
                    assert!(is_valid(&record, *earlier), "válido em {} mas não em {}", t, earlier);
                }
            }
        }
    }

    #[test]
    fn test_token_response_defaults_expiry() {
        let response: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "a",
            "refresh_token": "r"
        }))
        .unwrap();

        let now = Utc::now();
        assert_eq!(response.expires_at(now).unwrap(), now + Duration::seconds(DEFAULT_EXPIRES_IN_SECS));
        assert_eq!(response.refresh_token_expires_at(now).unwrap(), None);
    }

    #[test]
    fn test_apply_replaces_pair_and_rotates_refresh_token() {
        let now = Utc::now();
        let mut record = record_expiring_at(now);

        record.apply(TokenUpdate {
            access_token: "access-2".to_string(),
            expires_at: now + Duration::seconds(3600),
            refresh_token: Some("refresh-2".to_string()),
            refresh_token_expires_at: None,
            issued_at: now,
        });

        assert_eq!(record.access_token, "access-2");
        assert_eq!(record.refresh_token, "refresh-2");
        assert_eq!(record.expires_at, now + Duration::seconds(3600));
        assert_eq!(record.realm_id, "9130");
    }

    #[test]
    fn test_update_without_refresh_token_keeps_current() {
        let now = Utc::now();
        let mut record = record_expiring_at(now);

        let response = TokenResponse {
            access_token: "access-2".to_string(),
            refresh_token: Some(String::new()),
            expires_in: Some(60),
            x_refresh_token_expires_in: None,
            token_type: Some("bearer".to_string()),
        };
        record.apply(TokenUpdate::from_response(response, now).unwrap());

        assert_eq!(record.refresh_token, "refresh");
        assert_eq!(record.expires_at, now + Duration::seconds(60));
    }

    fn response_with(expires_in: Option<i64>, refresh_expires_in: Option<i64>) -> TokenResponse {
        TokenResponse {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in,
            x_refresh_token_expires_in: refresh_expires_in,
            token_type: None,
        }
    }

    #[test]
    fn test_huge_lifetimes_are_malformed() {
        let now = Utc::now();

        let err = TokenUpdate::from_response(response_with(Some(9_000_000_000_000_000), None), now)
            .unwrap_err();
        assert!(matches!(err, VendorFailure::Malformed(_)));

        let err = TokenUpdate::from_response(response_with(Some(3600), Some(i64::MAX)), now)
            .unwrap_err();
        assert!(matches!(err, VendorFailure::Malformed(_)));
    }

    #[test]
    fn test_lifetime_bounds() {
        let now = Utc::now();

        let at_max = response_with(Some(MAX_LIFETIME_SECS), Some(MAX_LIFETIME_SECS));
        assert_eq!(at_max.expires_at(now).unwrap(), now + Duration::seconds(MAX_LIFETIME_SECS));
        assert!(at_max.refresh_token_expires_at(now).unwrap().is_some());

        assert!(response_with(Some(MAX_LIFETIME_SECS + 1), None).expires_at(now).is_err());
        // negativo expira na hora
        assert_eq!(response_with(Some(-30), None).expires_at(now).unwrap(), now);
    }

    #[test]
    fn test_issued_record_from_update() {
        let now = Utc::now();
        let update = TokenUpdate::from_response(response_with(Some(60), Some(8_726_400)), now).unwrap();

        let record = TokenRecord::issued("9130".to_string(), update);

        assert_eq!(record.refresh_token, "refresh");
        assert_eq!(record.expires_at, now + Duration::seconds(60));
        assert_eq!(record.refresh_token_expires_at, Some(now + Duration::seconds(8_726_400)));
        assert_eq!(record.issued_at, now);
    }
}
