//! Spotinst REST client
//!
//! Every object the API manages lives under a fixed path and is wrapped in a
//! request body under a fixed key:
//!
//! - create: `POST {path}` with `{"<key>": object}`
//! - read: `GET {path}/{id}`
//! - update: `PUT {path}/{id}` with `{"<key>": object}`, the id removed
//! - delete: `DELETE {path}/{id}`
//!
//! Successful responses carry `{"response": {"items": [...]}}`, failed ones
//! `{"response": {"errors": [{"code", "message"}]}}`. Calls outside these
//! collections (imports, maintenance actions) go through [`SpotinstClient::get`]
//! and [`SpotinstClient::put`].

mod error;

pub use error::{ApiError, ClientError};

use std::marker::PhantomData;

use log::debug;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;

const USER_AGENT: &str = concat!("spotform/", env!("CARGO_PKG_VERSION"));

/// Object that can be managed through the generic CRUD endpoints
pub trait ApiObject: Serialize + DeserializeOwned + Send + Sync {
    /// Collection path, e.g. `/aws/ec2/group`
    const PATH: &'static str;
    /// Key wrapping the object in request bodies, e.g. `group`
    const KEY: &'static str;

    /// Identifier assigned by the API
    fn id(&self) -> Option<&str>;
}

#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    response: ResponseBody,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    items: Vec<serde_json::Value>,
    #[serde(default)]
    errors: Vec<ApiError>,
}

#[derive(Debug, Clone)]
pub struct SpotinstClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    account: Option<String>,
}

impl SpotinstClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
            account: config.account.clone(),
        })
    }

    /// CRUD operations for one object type
    pub fn service<T: ApiObject>(&self) -> Service<'_, T> {
        Service {
            client: self,
            _object: PhantomData,
        }
    }

    /// GET an arbitrary path and return the response items
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        self.send(Method::GET, path, query, None).await
    }

    /// PUT to an arbitrary path without a body
    pub async fn put(&self, path: &str) -> Result<Vec<serde_json::Value>, ClientError> {
        self.send(Method::PUT, path, &[], None).await
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> Result<Vec<serde_json::Value>, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut request = self.http.request(method, &url).bearer_auth(&self.token);
        if let Some(account) = &self.account {
            request = request.query(&[("accountId", account)]);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            debug!("request body: {}", body);
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let errors = serde_json::from_str::<Envelope>(&text)
                .map(|envelope| envelope.response.errors)
                .unwrap_or_default();
            return Err(ClientError::Api {
                status: status.as_u16(),
                errors,
            });
        }

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let envelope: Envelope = serde_json::from_str(&text)?;
        Ok(envelope.response.items)
    }
}

/// CRUD operations on the collection of `T`
pub struct Service<'a, T> {
    client: &'a SpotinstClient,
    _object: PhantomData<fn() -> T>,
}

impl<T: ApiObject> Service<'_, T> {
    pub async fn create(&self, object: &T) -> Result<T, ClientError> {
        let body = wrap::<T>(serde_json::to_value(object)?);
        let items = self.client.send(Method::POST, T::PATH, &[], Some(&body)).await?;
        first_item(items)
    }

    pub async fn read(&self, id: &str) -> Result<T, ClientError> {
        let items = self
            .client
            .send(Method::GET, &item_path::<T>(id), &[], None)
            .await?;
        first_item(items)
    }

    pub async fn update(&self, id: &str, object: &T) -> Result<(), ClientError> {
        let mut value = serde_json::to_value(object)?;
        if let Some(fields) = value.as_object_mut() {
            fields.remove("id");
        }
        let body = wrap::<T>(value);
        self.client
            .send(Method::PUT, &item_path::<T>(id), &[], Some(&body))
            .await?;
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), ClientError> {
        self.client
            .send(Method::DELETE, &item_path::<T>(id), &[], None)
            .await?;
        Ok(())
    }
}

fn item_path<T: ApiObject>(id: &str) -> String {
    format!("{}/{}", T::PATH, id)
}

fn wrap<T: ApiObject>(value: serde_json::Value) -> serde_json::Value {
    let mut body = serde_json::Map::new();
    body.insert(T::KEY.to_string(), value);
    serde_json::Value::Object(body)
}

pub(crate) fn first_item<T: DeserializeOwned>(items: Vec<serde_json::Value>) -> Result<T, ClientError> {
    let item = items
        .into_iter()
        .find(|item| !item.is_null())
        .ok_or(ClientError::EmptyResponse)?;
    Ok(serde_json::from_value(item)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        id: Option<String>,
        name: String,
    }

    impl ApiObject for Sample {
        const PATH: &'static str = "/sample";
        const KEY: &'static str = "sample";

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }
    }

    #[test]
    fn wraps_body_under_key() {
        let body = wrap::<Sample>(json!({"name": "p"}));
        assert_eq!(body, json!({"sample": {"name": "p"}}));
        assert_eq!(item_path::<Sample>("p-1"), "/sample/p-1");
    }

    #[test]
    fn first_item_skips_nulls() {
        let sample: Sample = first_item(vec![
            serde_json::Value::Null,
            json!({"id": "p-1", "name": "p"}),
        ])
        .unwrap();
        assert_eq!(sample.id(), Some("p-1"));
    }

    #[test]
    fn empty_items_is_an_error() {
        let result: Result<Sample, _> = first_item(Vec::new());
        assert!(matches!(result, Err(ClientError::EmptyResponse)));
    }

    #[test]
    fn user_agent_names_the_crate_version() {
        assert!(USER_AGENT.starts_with("spotform/"));
    }
}
