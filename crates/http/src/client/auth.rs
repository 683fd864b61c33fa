//! Session lifecycle helpers on the client store

use super::{ApiClient, ClientError};
use portal_core::CredentialPair;
use reqwest::{Method, header};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Pair issued by a login or signup exchange
#[derive(Debug, Deserialize)]
struct IssuedPair {
    access: String,
    refresh: String,
}

impl ApiClient {
    /// Exchange credentials at a login/signup endpoint and persist the issued pair.
    ///
    /// Sent without a bearer token and never refreshed.
    #[tracing::instrument(name = "client.login", skip(self, credentials))]
    pub async fn login<B: Serialize + ?Sized>(
        &self,
        path: &str,
        credentials: &B,
    ) -> Result<CredentialPair, ClientError> {
        let response = self
            .client
            .request(Method::POST, self.url(path)?)
            .header(header::CONTENT_TYPE, "application/json")
            .body(serde_json::to_vec(credentials)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            return Err(ClientError::from_status(status, message));
        }

        let issued: IssuedPair = serde_json::from_slice(&response.bytes().await?)?;
        let pair = CredentialPair::new(issued.access, issued.refresh);
        self.store_pair(&pair).await?;
        info!("Signed in; credentials stored");
        Ok(pair)
    }

    /// Forget the stored pair
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.store.clear().await?;
        info!("Signed out; credentials cleared");
        Ok(())
    }

    /// Login entry point carrying the destination to return to afterwards
    pub fn login_redirect(&self, return_to: &str) -> String {
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("next", return_to)
            .finish();
        format!("{}?{query}", self.login_route)
    }
}

/// Where to send the user after a failed call, if anywhere
pub fn reauth_target(client: &ApiClient, error: &ClientError, return_to: &str) -> Option<String> {
    error
        .is_unauthorized()
        .then(|| client.login_redirect(return_to))
}
