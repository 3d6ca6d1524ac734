use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{QuickstartError, QuickstartResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ACTORS_PATH: &str = "/actor";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }
}

/// Client for the quickstart package's actor API.
#[derive(Clone)]
pub struct ActorClient {
    client: Client,
    base_url: String,
}

impl ActorClient {
    pub fn new(base_url: &str) -> QuickstartResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| QuickstartError::Api(format!("http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Insert actors. The API answers 201 on success.
    pub async fn post_actors(&self, actors: &[Actor]) -> QuickstartResult<()> {
        let resp = self
            .client
            .post(format!("{}{ACTORS_PATH}", self.base_url))
            .json(actors)
            .send()
            .await
            .map_err(|e| QuickstartError::Api(format!("post actors: {e}")))?;

        let status = resp.status();
        if status != StatusCode::CREATED {
            let body = resp.text().await.unwrap_or_default();
            return Err(QuickstartError::Api(format!(
                "post actors: expected 201, got {status}: {body}"
            )));
        }
        Ok(())
    }

    pub async fn list_actors(&self) -> QuickstartResult<Vec<Actor>> {
        let resp = self
            .client
            .get(format!("{}{ACTORS_PATH}", self.base_url))
            .send()
            .await
            .map_err(|e| QuickstartError::Api(format!("list actors: {e}")))?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(QuickstartError::Api(format!(
                "list actors: expected 200, got {status}: {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| QuickstartError::Api(format!("list actors decode: {e}")))
    }
}
