use crate::error::ClientError;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use yol_core::{NewTrip, SeatAction, SeatNo, TripEnvelope, TripSnapshot, UserId};
use yol_store::app_config::BackendConfig;
use yol_store::trip_repo::TripQuery;
use yol_store::{Notification, Session, SessionStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    token: String,
    user_id: String,
    display_name: String,
}

/// Typed client for the trip/seat REST API.
///
/// Calls that need a session fail with [`ClientError::Unauthenticated`]
/// without touching the network. Mutations are never retried here.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
}

impl BackendClient {
    pub fn new(config: &BackendConfig, session: Arc<dyn SessionStore>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: config.base_url.clone(),
                source: e,
            })?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub async fn session(&self) -> Option<Session> {
        self.session.load().await
    }

    /// Exchange a verified phone number for a session and store it.
    pub async fn sign_in(&self, phone: &str, display_name: Option<&str>) -> Result<Session, ClientError> {
        let endpoint = "/v1/auth/session";
        let body = serde_json::json!({
            "phone": phone,
            "displayName": display_name,
        });
        let request = self.client.post(self.url(endpoint)).json(&body);
        let resp: SessionResponse = self.send(request, endpoint).await?;

        let session = Session {
            token: resp.token,
            user_id: UserId::new(resp.user_id),
            display_name: Some(resp.display_name),
        };
        self.session.save(session.clone()).await;
        tracing::info!(user_id = %session.user_id, "signed in");
        Ok(session)
    }

    pub async fn sign_out(&self) {
        self.session.clear().await;
    }

    pub async fn publish_trip(&self, trip: &NewTrip) -> Result<TripEnvelope, ClientError> {
        let endpoint = "/v1/trips";
        let request = self.authorized(Method::POST, endpoint).await?.json(trip);
        self.send(request, endpoint).await
    }

    pub async fn search_trips(&self, query: &TripQuery) -> Result<Vec<TripSnapshot>, ClientError> {
        let endpoint = "/v1/trips";
        let request = self.authorized(Method::GET, endpoint).await?.query(query);
        self.send(request, endpoint).await
    }

    pub async fn my_trips(&self) -> Result<Vec<TripSnapshot>, ClientError> {
        let endpoint = "/v1/trips/mine";
        let request = self.authorized(Method::GET, endpoint).await?;
        self.send(request, endpoint).await
    }

    pub async fn get_trip(&self, trip_id: Uuid) -> Result<TripEnvelope, ClientError> {
        let endpoint = format!("/v1/trips/{trip_id}");
        let request = self.authorized(Method::GET, &endpoint).await?;
        self.send(request, &endpoint).await
    }

    pub async fn start_trip(&self, trip_id: Uuid) -> Result<TripEnvelope, ClientError> {
        let endpoint = format!("/v1/trips/{trip_id}/start");
        let request = self.authorized(Method::POST, &endpoint).await?;
        self.send(request, &endpoint).await
    }

    pub async fn finish_trip(&self, trip_id: Uuid) -> Result<TripEnvelope, ClientError> {
        let endpoint = format!("/v1/trips/{trip_id}/finish");
        let request = self.authorized(Method::POST, &endpoint).await?;
        self.send(request, &endpoint).await
    }

    pub async fn seat_action(
        &self,
        trip_id: Uuid,
        seat_no: SeatNo,
        action: SeatAction,
    ) -> Result<TripEnvelope, ClientError> {
        let endpoint = format!("/v1/trips/{trip_id}/seats/{seat_no}/{action}");
        let request = self.authorized(Method::POST, &endpoint).await?;
        self.send(request, &endpoint).await
    }

    pub async fn notifications(&self, after: u64) -> Result<Vec<Notification>, ClientError> {
        let endpoint = "/v1/notifications";
        let request = self
            .authorized(Method::GET, endpoint)
            .await?
            .query(&[("after", after)]);
        self.send(request, endpoint).await
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn authorized(&self, method: Method, endpoint: &str) -> Result<RequestBuilder, ClientError> {
        let session = self.session.load().await.ok_or(ClientError::Unauthenticated)?;
        Ok(self
            .client
            .request(method, self.url(endpoint))
            .bearer_auth(session.token))
    }

    /// Send a request and map transport, status and body errors consistently.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T, ClientError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ClientError::Timeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                ClientError::Http {
                    endpoint: endpoint.to_string(),
                    source: e,
                }
            }
        })?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(endpoint, "session rejected by backend");
            return Err(ClientError::Unauthenticated);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::debug!(endpoint, status = status.as_u16(), "backend returned error");
            return Err(ClientError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>().await.map_err(|e| ClientError::Deserialization {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }
}
