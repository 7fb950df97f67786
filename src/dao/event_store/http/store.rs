use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    dao::{
        error::FetchResult,
        event_store::EventStore,
        models::{EventEnvelope, EventsEnvelope, MatchEnvelope, NewEvent, WinnerPatch},
    },
    state::{Event, EventId, Match, MatchId},
};

use super::{
    config::HttpConfig,
    error::{HttpDaoError, HttpResult},
};

/// [`EventStore`] backed by the REST event service.
#[derive(Clone)]
pub struct HttpEventStore {
    client: Client,
    base_url: Arc<str>,
}

impl HttpEventStore {
    /// Build a client for the given service. No request is made.
    pub fn new(config: HttpConfig) -> HttpResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| HttpDaoError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.client.request(method, url)
    }

    async fn send_json<T>(&self, builder: RequestBuilder, path: &str) -> HttpResult<T>
    where
        T: DeserializeOwned,
    {
        let response = builder
            .send()
            .await
            .map_err(|source| HttpDaoError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        match response.status() {
            status if status.is_success() => {
                response
                    .json::<T>()
                    .await
                    .map_err(|source| HttpDaoError::DecodeResponse {
                        path: path.to_string(),
                        source,
                    })
            }
            other => Err(HttpDaoError::RequestStatus {
                path: path.to_string(),
                status: other,
            }),
        }
    }

    async fn get_event(&self, id: EventId) -> HttpResult<Event> {
        let path = format!("events/{id}");
        let envelope: EventEnvelope = self
            .send_json(self.request(Method::GET, &path), &path)
            .await?;
        Event::try_from(envelope.event)
            .map_err(|source| HttpDaoError::InvalidPayload { path, source })
    }

    async fn get_events(&self) -> HttpResult<Vec<Event>> {
        const PATH: &str = "events";
        let envelope: EventsEnvelope = self
            .send_json(self.request(Method::GET, PATH), PATH)
            .await?;
        envelope
            .events
            .into_iter()
            .map(Event::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| HttpDaoError::InvalidPayload {
                path: PATH.to_string(),
                source,
            })
    }

    async fn post_event(&self, event: &NewEvent) -> HttpResult<Event> {
        const PATH: &str = "events";
        let envelope: EventEnvelope = self
            .send_json(self.request(Method::POST, PATH).json(event), PATH)
            .await?;
        Event::try_from(envelope.event).map_err(|source| HttpDaoError::InvalidPayload {
            path: PATH.to_string(),
            source,
        })
    }

    async fn patch_winner(
        &self,
        event_id: EventId,
        match_id: MatchId,
        winner: &str,
    ) -> HttpResult<Match> {
        let path = format!("events/{event_id}/matches/{match_id}");
        debug!(%event_id, %match_id, winner, "requesting winner update");
        let envelope: MatchEnvelope = self
            .send_json(
                self.request(Method::PATCH, &path).json(&WinnerPatch { winner }),
                &path,
            )
            .await?;
        Match::try_from(envelope.entry)
            .map_err(|source| HttpDaoError::InvalidPayload { path, source })
    }
}

impl EventStore for HttpEventStore {
    fn fetch_event(&self, id: EventId) -> BoxFuture<'static, FetchResult<Event>> {
        let store = self.clone();
        Box::pin(async move { store.get_event(id).await.map_err(Into::into) })
    }

    fn list_events(&self) -> BoxFuture<'static, FetchResult<Vec<Event>>> {
        let store = self.clone();
        Box::pin(async move { store.get_events().await.map_err(Into::into) })
    }

    fn create_event(&self, event: NewEvent) -> BoxFuture<'static, FetchResult<Event>> {
        let store = self.clone();
        Box::pin(async move { store.post_event(&event).await.map_err(Into::into) })
    }

    fn set_winner(
        &self,
        event_id: EventId,
        match_id: MatchId,
        winner: String,
    ) -> BoxFuture<'static, FetchResult<Match>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .patch_winner(event_id, match_id, &winner)
                .await
                .map_err(Into::into)
        })
    }
}
