//! Current-user resolution from the client store

use super::ApiClient;
use reqwest::header;
use serde_json::Value as JsonValue;

impl ApiClient {
    /// Profile of the signed-in user, or `None` for an anonymous experience.
    ///
    /// Never fails and never refreshes: a missing token, transport error,
    /// non-2xx status or non-JSON body all mean "no authenticated user".
    pub async fn current_user(&self) -> Option<JsonValue> {
        let bearer = match self.store.load().await {
            Ok(pair) => pair.bearer()?,
            Err(e) => {
                warn!("Credential store unreadable: {}", e);
                return None;
            }
        };

        let response = self
            .client
            .get(self.url(&self.user_path).ok()?)
            .header(header::AUTHORIZATION, bearer)
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            debug!("Current user unavailable: status {}", response.status());
            return None;
        }
        response.json().await.ok()
    }
}
