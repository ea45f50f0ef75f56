//! Session Cookie
//!
//! O browser só recebe `<session_id>.<hmac>`; tokens ficam no servidor.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::Duration;

use crate::config::SessionSettings;
use crate::utils::{AppError, AppResult};
use super::session_store::SessionId;

type HmacSha256 = Hmac<Sha256>;

pub struct SessionCookies {
    name: String,
    secure: bool,
    max_age: Duration,
    mac: HmacSha256,
}

impl SessionCookies {
    pub fn new(settings: &SessionSettings) -> AppResult<Self> {
        let mac = HmacSha256::new_from_slice(settings.cookie_secret.as_bytes())
            .map_err(|e| AppError::ConfigError(format!("cookie_secret inválido: {}", e)))?;

        Ok(Self {
            name: settings.cookie_name.clone(),
            secure: settings.cookie_secure,
            max_age: Duration::seconds(settings.session_ttl_secs as i64),
            mac,
        })
    }

    /// `<session_id>.<hex hmac-sha256(session_id)>`
    pub fn sign(&self, session_id: &SessionId) -> String {
        let mut mac = self.mac.clone();
        mac.update(session_id.as_str().as_bytes());
        format!("{}.{}", session_id, hex::encode(mac.finalize().into_bytes()))
    }

    /// Assinatura inválida ou id malformado → `None` (tratado como sem cookie)
    pub fn verify(&self, value: &str) -> Option<SessionId> {
        let (raw_id, signature) = value.rsplit_once('.')?;
        let signature = hex::decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(raw_id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        SessionId::parse(raw_id)
    }

    pub fn session_cookie(&self, session_id: &SessionId) -> Cookie<'static> {
        Cookie::build((self.name.clone(), self.sign(session_id)))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(self.max_age)
            .build()
    }

    pub fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.name.clone(), ""))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::ZERO)
            .build()
    }

    /// Lê e verifica o cookie de sessão da requisição
    pub fn session_id(&self, jar: &CookieJar) -> Option<SessionId> {
        jar.get(&self.name).and_then(|cookie| self.verify(cookie.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::tests::test_settings;

    fn cookies() -> SessionCookies {
        SessionCookies::new(&test_settings("http://localhost:1").session).unwrap()
    }

    #[test]
    fn test_signed_value_verifies() {
        let cookies = cookies();
        let id = SessionId::generate();

        let value = cookies.sign(&id);
        assert!(value.starts_with(id.as_str()));
        assert_eq!(cookies.verify(&value), Some(id));
    }

    #[test]
    fn test_tampered_values_are_rejected() {
        let cookies = cookies();
        let id = SessionId::generate();
        let value = cookies.sign(&id);

        let other = SessionId::generate();
        let (_, signature) = value.rsplit_once('.').unwrap();
        let swapped = format!("{}.{}", other, signature);

        assert_eq!(cookies.verify(&swapped), None);
        assert_eq!(cookies.verify(id.as_str()), None);
        assert_eq!(cookies.verify(&format!("{}.zz", id)), None);
        assert_eq!(cookies.verify(""), None);
    }

    #[test]
    fn test_other_secret_does_not_verify() {
        let mut settings = test_settings("http://localhost:1").session;
        let id = SessionId::generate();
        let value = cookies().sign(&id);

        settings.cookie_secret = "fedcba9876543210fedcba9876543210".to_string();
        let other = SessionCookies::new(&settings).unwrap();

        assert_eq!(other.verify(&value), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookies = cookies();
        let cookie = cookies.session_cookie(&SessionId::generate());

        assert_eq!(cookie.name(), "qb_session");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(3600)));
    }

    #[test]
    fn test_removal_cookie_expires_immediately() {
        let cookie = cookies().removal_cookie();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    }

    #[test]
    fn test_session_id_from_jar() {
        let cookies = cookies();
        let id = SessionId::generate();

        let jar = CookieJar::new().add(cookies.session_cookie(&id));
        assert_eq!(cookies.session_id(&jar), Some(id));

        let forged = CookieJar::new().add(Cookie::new("qb_session", "not-a-session"));
        assert_eq!(cookies.session_id(&forged), None);
        assert_eq!(cookies.session_id(&CookieJar::new()), None);
    }
}
