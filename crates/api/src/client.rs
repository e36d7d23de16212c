//! HTTP client for the hotel service RPCs.

use std::time::Duration;

use async_trait::async_trait;
use common::rpc::{CONFIRM_AVAILABILITY_PATH, RECOMMEND_PATH, RELEASE_PATH, expand_path};
use common::{AvailabilityRequest, DateRange, ReleaseParams, RoomDto, RoomId, StayParams};
use reqwest::{Client, Response, StatusCode};
use saga::{HotelClient, HotelClientError};

/// Calls a remote hotel service over HTTP.
///
/// The client-level timeout is a backstop; the call policy applies the
/// per-attempt timeout.
#[derive(Debug, Clone)]
pub struct HttpHotelClient {
    client: Client,
    base_url: String,
}

impl HttpHotelClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn transport_error(e: reqwest::Error) -> HotelClientError {
    if e.is_timeout() {
        HotelClientError::Timeout
    } else if e.is_decode() {
        HotelClientError::Server(format!("malformed response: {e}"))
    } else {
        HotelClientError::Transport(e.to_string())
    }
}

/// Maps a non-success answer to an error, reading the body for context.
async fn status_error(room_id: Option<RoomId>, response: Response) -> HotelClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match (status, room_id) {
        (StatusCode::CONFLICT, Some(room_id)) => HotelClientError::Conflict(room_id),
        (StatusCode::NOT_FOUND, Some(room_id)) => HotelClientError::RoomNotFound(room_id),
        (StatusCode::BAD_REQUEST, _) => HotelClientError::BadRequest(body),
        (status, _) if status.is_server_error() => {
            HotelClientError::Server(format!("{status}: {body}"))
        }
        (status, _) => HotelClientError::UnexpectedStatus(status.as_u16()),
    }
}

#[async_trait]
impl HotelClient for HttpHotelClient {
    #[tracing::instrument(skip(self))]
    async fn recommend(&self, range: DateRange) -> Result<Vec<RoomDto>, HotelClientError> {
        let response = self
            .client
            .get(self.url(RECOMMEND_PATH))
            .query(&StayParams {
                start: range.start(),
                end: range.end(),
            })
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(status_error(None, response).await);
        }
        response.json().await.map_err(transport_error)
    }

    #[tracing::instrument(skip(self, request), fields(request_id = %request.request_id))]
    async fn confirm_availability(
        &self,
        room_id: RoomId,
        request: &AvailabilityRequest,
    ) -> Result<(), HotelClientError> {
        let response = self
            .client
            .post(self.url(&expand_path(CONFIRM_AVAILABILITY_PATH, room_id)))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(status_error(Some(room_id), response).await)
    }

    #[tracing::instrument(skip(self))]
    async fn release(&self, room_id: RoomId, request_id: &str) -> Result<(), HotelClientError> {
        let response = self
            .client
            .post(self.url(&expand_path(RELEASE_PATH, room_id)))
            .query(&ReleaseParams {
                request_id: request_id.to_string(),
            })
            .send()
            .await
            .map_err(transport_error)?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(status_error(Some(room_id), response).await)
    }
}
