//! Azure AD token acquisition
//!
//! Implements the resource-owner password credential grant the samples use.
//! The resulting token is handed to the container through its token provider.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info};
use serde::Deserialize;
use url::Url;

use super::constants::{BOOKINGS_READ_ALL_SCOPE, DEFAULT_AAD_INSTANCE, RESOURCE_ID};
use super::error::{ODataError, Result};

/// Scope requested when none is configured
pub fn default_scopes() -> Vec<String> {
    vec![format!("{}/{}", RESOURCE_ID, BOOKINGS_READ_ALL_SCOPE)]
}

/// The token endpoint of one AAD tenant
#[derive(Debug, Clone)]
pub struct Authority {
    base: Url,
}

impl Authority {
    /// Authority for `tenant_id` on the default AAD instance
    pub fn for_tenant(tenant_id: &str) -> Result<Self> {
        let instance = Url::parse(DEFAULT_AAD_INSTANCE)?;
        Self::from_url(instance.join(&format!("/{}/", tenant_id.trim()))?)
    }

    pub fn from_url(base: Url) -> Result<Self> {
        if !base.as_str().ends_with('/') {
            return Err(ODataError::InvalidUrl(format!(
                "authority must end with '/': {base}"
            )));
        }
        Ok(Self { base })
    }

    pub fn token_endpoint(&self) -> Result<Url> {
        Ok(self.base.join("oauth2/v2.0/token")?)
    }
}

/// Access token returned by the token endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(skip, default = "Utc::now")]
    pub acquired_at: DateTime<Utc>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenInfo {
    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// `None` when the server's lifetime does not fit a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let lifetime = i64::try_from(self.expires_in)
            .ok()
            .and_then(TimeDelta::try_seconds)?;
        self.acquired_at.checked_add_signed(lifetime)
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|at| Utc::now() >= at)
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client for the AAD token endpoint
#[derive(Debug, Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    authority: Authority,
    client_id: String,
}

impl TokenClient {
    pub fn new(authority: Authority, client_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            authority,
            client_id: client_id.into(),
        }
    }

    /// Acquire a token with the user's name and password
    pub async fn acquire_token_by_username_password(
        &self,
        username: &str,
        password: &str,
        scopes: &[String],
    ) -> Result<TokenInfo> {
        let endpoint = self.authority.token_endpoint()?;
        let scope = scopes.join(" ");
        debug!("Requesting token for {} from {} (scope: {})", username, endpoint, scope);

        let form = [
            ("grant_type", "password"),
            ("client_id", self.client_id.as_str()),
            ("scope", scope.as_str()),
            ("username", username),
            ("password", password),
        ];
        let response = self.http.post(endpoint).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => format!("token endpoint returned {status}"),
            };
            return Err(ODataError::Authentication(message));
        }

        let token: TokenInfo = serde_json::from_str(&body)?;
        info!("Acquired token for {} (expires in {}s)", username, token.expires_in);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> TokenClient {
        let base = Url::parse(&format!("{}/tenant-1/", server.uri())).unwrap();
        TokenClient::new(Authority::from_url(base).unwrap(), "client-1")
    }

    #[test]
    fn test_authority_for_tenant() {
        let authority = Authority::for_tenant("contoso.onmicrosoft.com").unwrap();
        assert_eq!(
            authority.token_endpoint().unwrap().as_str(),
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_default_scope_is_resource_qualified() {
        assert_eq!(
            default_scopes(),
            vec!["https://microsoft.onmicrosoft.com/bookingsodataapi/Bookings.Read.All"]
        );
    }

    #[test]
    fn test_authorization_header() {
        let token: TokenInfo =
            serde_json::from_str(r#"{"access_token": "abc", "expires_in": 3600}"#).unwrap();
        assert_eq!(token.authorization_header(), "Bearer abc");
        assert!(!token.is_expired());
    }

    #[test]
    fn test_huge_lifetime_does_not_overflow() {
        let token: TokenInfo = serde_json::from_str(&format!(
            r#"{{"access_token": "abc", "expires_in": {}}}"#,
            u64::MAX
        ))
        .unwrap();
        assert_eq!(token.expires_at(), None);
        assert!(!token.is_expired());

        let expired: TokenInfo =
            serde_json::from_str(r#"{"access_token": "abc", "expires_in": 0}"#).unwrap();
        assert!(expired.is_expired());
    }

    #[tokio::test]
    async fn test_password_grant_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=password"))
            .and(body_string_contains("client_id=client-1"))
            .and(body_string_contains("username=admin%40contoso.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "access_token": "token-xyz",
                "expires_in": 3599
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server)
            .acquire_token_by_username_password("admin@contoso.com", "secret", &default_scopes())
            .await
            .unwrap();

        assert_eq!(token.authorization_header(), "Bearer token-xyz");
        assert_eq!(token.expires_in, 3599);
    }

    #[tokio::test]
    async fn test_password_grant_failure() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "AADSTS50126: Invalid username or password."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .acquire_token_by_username_password("admin@contoso.com", "wrong", &default_scopes())
            .await
            .unwrap_err();

        match err {
            ODataError::Authentication(message) => {
                assert!(message.starts_with("invalid_grant"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
