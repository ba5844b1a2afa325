use std::io::Write;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use log::{debug, trace, error};

use crate::error::Error;
use crate::http::{
  BufferSink, Encoding, HttpTransport, JsonLinesSink, Params, TransportOptions
};
use crate::request::{stream_requested, GenerateRequest, RequestOptions};

/// Default address of a local Ollama daemon
pub const DEFAULT_API_URL: &str
  = "http://127.0.0.1:11434";

/// Model used until `set_model_name` is called
pub const DEFAULT_MODEL: &str = "llama3.2:latest";

// ===== Wire Types =====

/// `/api/tags` payload. Entries stay loose so one odd entry cannot
/// spoil the whole list.
#[derive(Debug, Clone, Deserialize)]
pub struct TagsResponse
{   pub models: Vec<Value>
}

impl TagsResponse
{   /// Names of the entries that carry a string `name`, in order
    pub fn names(&self) -> Vec<String>
    {   self.models
          .iter()
          .filter_map(|m| m.get("name")?.as_str())
          .map(str::to_string)
          .collect()
    }
}

// ===== Ollama Client =====

/// Client for the Ollama HTTP API.
///
/// A fresh transport is built per call, so the client is cheap to reuse
/// and its only mutable state is the selected model name.
#[derive(Debug, Clone)]
pub struct OllamaClient
{   api_url: String
  , api_key: String
  , model_name: String
  , timeout: Option<Duration>
}

impl Default for OllamaClient
{   fn default() -> Self
    {   OllamaClient::new(DEFAULT_API_URL)
    }
}

impl OllamaClient
{   pub fn new(api_url: impl Into<String>) -> Self
    {   let api_url = api_url.into();
        debug!("Creating OllamaClient for {}", api_url);
        OllamaClient
        {   api_url
          , api_key: String::new()
          , model_name: DEFAULT_MODEL.to_string()
          , timeout: None
        }
    }

    pub fn with_model(mut self, model_name: impl Into<String>) -> Self
    {   self.model_name = model_name.into();
        self
    }

    /// Empty key means no `Authorization` header
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self
    {   self.api_key = api_key.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self
    {   self.timeout = Some(timeout);
        self
    }

    pub fn api_url(&self) -> &str
    {   &self.api_url
    }

    pub fn api_key(&self) -> &str
    {   &self.api_key
    }

    pub fn model_name(&self) -> &str
    {   &self.model_name
    }

    pub fn set_model_name(&mut self, model_name: impl Into<String>)
    {   self.model_name = model_name.into();
        debug!("Selected model: {}", self.model_name);
    }

    pub fn timeout(&self) -> Option<Duration>
    {   self.timeout
    }

    /// `<base>/<endpoint>` without doubled slashes
    pub fn endpoint_url(&self, endpoint: &str) -> String
    {   format!(
          "{}/{}",
          self.api_url.trim_end_matches('/'),
          endpoint.trim_start_matches('/')
        )
    }

    fn transport(&self, url: String) -> Result<HttpTransport, Error>
    {   let mut options = TransportOptions::new();
        if let Some(timeout) = self.timeout
        {   options = options.with_timeout(timeout);
        }
        if !self.api_key.is_empty()
        {   options = options.with_bearer_token(self.api_key.as_str());
        }
        let mut transport = HttpTransport::new(url, options)?;
        transport.set_encoding(Encoding::Json);
        Ok(transport)
    }

    /// Names of the models installed on the server, in server order.
    /// Empty when the server is unreachable or answers garbage.
    pub async fn get_models_list(&self) -> Vec<String>
    {   debug!("Handling get_models_list");
        match self.try_get_models_list().await
        {   Ok(models) => models
          , Err(e) => {
              error!("Failed to list models at {}: {}", self.api_url, e);
              Vec::new()
            }
        }
    }

    /// Like `get_models_list`, but reports why the listing failed
    pub async fn try_get_models_list(&self) -> Result<Vec<String>, Error>
    {   let mut transport
          = self.transport(self.endpoint_url("api/tags"))?;
        let mut sink = BufferSink::new();
        transport
          .get(&Params::new(), TransportOptions::new(), &mut sink)
          .await?;

        let tags: TagsResponse
          = serde_json::from_slice(sink.as_bytes()).map_err(|e| {
            error!("Parse error: {}", e);
            Error::ParseError(e.to_string())
          })?;

        let model_names = tags.names();

        debug!("Retrieved {} models", model_names.len());
        Ok(model_names)
    }

    /// Server description of `model_name` (`/api/show`), or an empty map
    /// when the request fails.
    pub async fn get_model_info(&self, model_name: &str) -> Params
    {   debug!("Handling get_model_info for: {}", model_name);
        match self.fetch_model_info(model_name).await
        {   Ok(info) => info
          , Err(e) => {
              error!("Failed to fetch info for {}: {}", model_name, e);
              Params::new()
            }
        }
    }

    async fn fetch_model_info(
      &self
    , model_name: &str
    ) -> Result<Params, Error>
    {   let mut transport
          = self.transport(self.endpoint_url("api/show"))?;
        let mut data = Params::new();
        data.insert("model".to_string(), model_name.into());

        let mut sink = BufferSink::new();
        transport
          .post(
            &data,
            TransportOptions::new()
              .with_header("Content-Type", "application/json"),
            &mut sink
          )
          .await?;

        serde_json::from_slice::<Params>(sink.as_bytes()).map_err(|e| {
          error!("Parse error: {}", e);
          Error::ParseError(e.to_string())
        })
    }

    /// POST `data` to `<base>/<endpoint>` and return the body.
    ///
    /// When `data` asks for streaming, the partial `response` fields are
    /// echoed to stdout as they arrive and the assembled text is
    /// returned instead of the raw body.
    pub async fn prompt(
      &self
    , endpoint: &str
    , data: &Params
    ) -> Result<String, Error>
    {   self.prompt_with(endpoint, data, |piece: &str| {
          let mut stdout = std::io::stdout();
          let _ = stdout.write_all(piece.as_bytes());
          let _ = stdout.flush();
        })
        .await
    }

    /// Like [`prompt`](Self::prompt) but streamed text goes to `on_text`
    pub async fn prompt_with<F>(
      &self
    , endpoint: &str
    , data: &Params
    , on_text: F
    ) -> Result<String, Error>
    where
      F: FnMut(&str)
    {   let mut transport = self.transport(self.endpoint_url(endpoint))?;
        trace!("Prompt payload: {:?}", data);

        if stream_requested(data)
        {   debug!("Streaming response from {}", endpoint);
            let mut sink = JsonLinesSink::new(on_text);
            transport
              .post(data, TransportOptions::new(), &mut sink)
              .await?;
            Ok(sink.into_text())
        } else
        {   let mut sink = BufferSink::new();
            transport
              .post(data, TransportOptions::new(), &mut sink)
              .await?;
            Ok(sink.into_string())
        }
    }

    /// Generate with the selected model.
    ///
    /// Returns the raw JSON payload; parse it with
    /// [`GenerateResponse::from_json`](crate::response::GenerateResponse::from_json).
    pub async fn generate(
      &self
    , prompt: &str
    , options: &RequestOptions
    ) -> Result<String, Error>
    {   debug!("generate with model: {}", self.model_name);
        let body = GenerateRequest::new(self.model_name.as_str(), prompt)
          .into_body(options);
        self.prompt("api/generate", &body).await
    }
}

impl super::LlmClient for OllamaClient
{   fn api_url(&self) -> &str
    {   &self.api_url
    }

    fn api_key(&self) -> &str
    {   &self.api_key
    }

    fn model_name(&self) -> &str
    {   &self.model_name
    }

    async fn generate(
      &self
    , prompt: &str
    , options: &RequestOptions
    ) -> Result<String, Error>
    {   OllamaClient::generate(self, prompt, options).await
    }
}
