//! Minimal HTTP transport bound to a single target URL
//!
//! Bodies are encoded through an [`Encoder`] and responses are pushed
//! chunk by chunk into a [`ResponseSink`], so callers decide whether a
//! body is buffered or decoded while it arrives.

use std::collections::BTreeMap;
use std::time::Duration;

use log::{debug, trace, error, warn};
use serde_json::{Map, Value};

use crate::error::Error;

/// Key/value payload for query strings and request bodies
pub type Params = Map<String, Value>;

// ===== Encoders =====

/// Turns a key/value payload into request body bytes
pub trait Encoder
{   fn encode(&self, data: &Params) -> Result<Vec<u8>, Error>;
}

/// Body encodings supported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding
{   /// `application/x-www-form-urlencoded`
    #[default]
    Form
  , /// `application/json`
    Json
}

impl Encoding
{   pub fn content_type(&self) -> &'static str
    {   match self
        {   Encoding::Form => "application/x-www-form-urlencoded"
          , Encoding::Json => "application/json"
        }
    }
}

impl Encoder for Encoding
{   fn encode(&self, data: &Params) -> Result<Vec<u8>, Error>
    {   match self
        {   Encoding::Form => Ok(form_encode(data).into_bytes())
          , Encoding::Json => serde_json::to_vec(data)
              .map_err(|e| Error::ParseError(e.to_string()))
        }
    }
}

/// Form-encode a payload the way PHP's `http_build_query` does:
/// booleans become `1`/`0`, nulls are dropped and nested values are
/// flattened into `key[sub]` pairs.
pub fn form_encode(data: &Params) -> String
{   let mut serializer
      = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in data
    {   append_form_pair(&mut serializer, key, value);
    }
    serializer.finish()
}

fn append_form_pair(
  serializer: &mut url::form_urlencoded::Serializer<'_, String>
, key: &str
, value: &Value
)
{   match value
    {   Value::Null => {}
      , Value::Bool(flag) => {
          serializer.append_pair(key, if *flag { "1" } else { "0" });
        }
      , Value::Number(number) => {
          serializer.append_pair(key, &number.to_string());
        }
      , Value::String(text) => {
          serializer.append_pair(key, text);
        }
      , Value::Array(items) => {
          for (index, item) in items.iter().enumerate()
          {   append_form_pair(
                serializer,
                &format!("{}[{}]", key, index),
                item
              );
          }
        }
      , Value::Object(map) => {
          for (sub_key, item) in map
          {   append_form_pair(
                serializer,
                &format!("{}[{}]", key, sub_key),
                item
              );
          }
        }
    }
}

/// Append form-encoded query parameters to `base`.
///
/// A `?` is only added when `base` has no query yet; an existing query
/// is continued with `&` unless it already ends in a separator.
pub fn build_url(base: &str, query: &Params) -> String
{   let encoded = form_encode(query);
    if encoded.is_empty()
    {   return base.to_string();
    }
    let separator = match base.find('?')
    {   None => "?"
      , Some(_) if base.ends_with('?') || base.ends_with('&') => ""
      , Some(_) => "&"
    };
    format!("{}{}{}", base, separator, encoded)
}

// ===== Sinks =====

/// Receives raw response body chunks as they arrive.
pub trait ResponseSink
{   /// Consume one chunk and return how many bytes were taken.
    /// Returning less than `chunk.len()` aborts the request.
    fn write(&mut self, chunk: &[u8]) -> usize;

    /// Called once after the last chunk.
    fn finish(&mut self) {}
}

/// Default sink: keeps the whole body in memory
#[derive(Debug, Clone, Default)]
pub struct BufferSink
{   buffer: Vec<u8>
}

impl BufferSink
{   pub fn new() -> Self
    {   BufferSink::default()
    }

    pub fn as_bytes(&self) -> &[u8]
    {   &self.buffer
    }

    pub fn len(&self) -> usize
    {   self.buffer.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.buffer.is_empty()
    }

    /// Body as text; invalid UTF-8 is replaced rather than rejected
    pub fn into_string(self) -> String
    {   match String::from_utf8(self.buffer)
        {   Ok(text) => text
          , Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    }
}

impl ResponseSink for BufferSink
{   fn write(&mut self, chunk: &[u8]) -> usize
    {   self.buffer.extend_from_slice(chunk);
        chunk.len()
    }
}

/// Streaming sink for newline-delimited JSON generation output.
///
/// Every decoded object's `response` field is appended to the text
/// buffer and handed to `on_text` immediately.
pub struct JsonLinesSink<F>
where
  F: FnMut(&str)
{   pending: Vec<u8>
  , text: String
  , on_text: F
}

impl<F> JsonLinesSink<F>
where
  F: FnMut(&str)
{   pub fn new(on_text: F) -> Self
    {   JsonLinesSink
        {   pending: Vec::new()
          , text: String::new()
          , on_text
        }
    }

    /// Text assembled so far
    pub fn text(&self) -> &str
    {   &self.text
    }

    pub fn into_text(self) -> String
    {   self.text
    }

    fn handle_line(&mut self, line: &[u8])
    {   if line.iter().all(u8::is_ascii_whitespace)
        {   return;
        }
        match serde_json::from_slice::<Value>(line)
        {   Ok(object) => {
              if let Some(message) = object.get("error")
                .and_then(Value::as_str)
              {   warn!("Stream reported error: {}", message);
              }
              if let Some(piece) = object.get("response")
                .and_then(Value::as_str)
              {   if !piece.is_empty()
                  {   self.text.push_str(piece);
                      (self.on_text)(piece);
                  }
              }
            }
          , Err(e) => {
              warn!("Skipping undecodable stream line: {}", e);
            }
        }
    }
}

impl<F> ResponseSink for JsonLinesSink<F>
where
  F: FnMut(&str)
{   fn write(&mut self, chunk: &[u8]) -> usize
    {   self.pending.extend_from_slice(chunk);

        while let Some(end) = self.pending.iter().position(|b| *b == b'\n')
        {   let line: Vec<u8> = self.pending.drain(..=end).collect();
            self.handle_line(&line);
        }

        // a chunk often carries exactly one object without its newline
        let complete = !self.pending.is_empty()
          && serde_json::from_slice::<Value>(&self.pending)
            .map(|v| v.is_object())
            .unwrap_or(false);
        if complete
        {   let line = std::mem::take(&mut self.pending);
            self.handle_line(&line);
        }

        chunk.len()
    }

    fn finish(&mut self)
    {   if !self.pending.is_empty()
        {   let line = std::mem::take(&mut self.pending);
            self.handle_line(&line);
        }
    }
}

// ===== Transport =====

/// Options applied to every request a transport issues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportOptions
{   /// Whole-request timeout; none by default
    pub timeout: Option<Duration>
  , /// Extra request headers
    pub headers: BTreeMap<String, String>
  , /// Sent as `Authorization: Bearer <token>`
    pub bearer_token: Option<String>
}

impl TransportOptions
{   pub fn new() -> Self
    {   TransportOptions::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self
    {   self.timeout = Some(timeout);
        self
    }

    pub fn with_header(
      mut self
    , name: impl Into<String>
    , value: impl Into<String>
    ) -> Self
    {   self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self
    {   self.bearer_token = Some(token.into());
        self
    }

    /// Merge `other` into `self`. Headers accumulate, scalar options
    /// are replaced only when `other` sets them.
    pub fn merge(&mut self, other: TransportOptions)
    {   if other.timeout.is_some()
        {   self.timeout = other.timeout;
        }
        if other.bearer_token.is_some()
        {   self.bearer_token = other.bearer_token;
        }
        self.headers.extend(other.headers);
    }
}

/// HTTP client for one target URL
pub struct HttpTransport
{   url: String
  , options: TransportOptions
  , encoding: Encoding
  , http_client: reqwest::Client
}

impl HttpTransport
{   pub fn new(
      url: impl Into<String>
    , options: TransportOptions
    ) -> Result<Self, Error>
    {   let url = url.into();
        if url.trim().is_empty()
        {   error!("Refusing to build transport without URL");
            return Err(Error::InvalidConfiguration(
              "target URL must not be empty".to_string()
            ));
        }
        debug!("Creating HttpTransport for {}", url);
        Ok(HttpTransport
        {   url
          , options
          , encoding: Encoding::default()
          , http_client: reqwest::Client::new()
        })
    }

    pub fn url(&self) -> &str
    {   &self.url
    }

    pub fn options(&self) -> &TransportOptions
    {   &self.options
    }

    pub fn encoding(&self) -> Encoding
    {   self.encoding
    }

    pub fn set_encoding(&mut self, encoding: Encoding)
    {   self.encoding = encoding;
    }

    /// Merge options into the persistent set
    pub fn set_options(&mut self, options: TransportOptions)
    {   self.options.merge(options);
    }

    /// GET `url?query`, writing the body into `sink`
    pub async fn get(
      &mut self
    , query: &Params
    , extra: TransportOptions
    , sink: &mut dyn ResponseSink
    ) -> Result<usize, Error>
    {   self.set_options(extra);
        let url = build_url(&self.url, query);
        self.execute(reqwest::Method::GET, url, None, sink).await
    }

    /// POST the encoded `data`, writing the body into `sink`
    pub async fn post(
      &mut self
    , data: &Params
    , extra: TransportOptions
    , sink: &mut dyn ResponseSink
    ) -> Result<usize, Error>
    {   self.set_options(extra);
        let body = self.encoding.encode(data)?;
        let url = self.url.clone();
        self.execute(reqwest::Method::POST, url, Some(body), sink).await
    }

    /// PUT the encoded `data`, writing the body into `sink`
    pub async fn put(
      &mut self
    , data: &Params
    , extra: TransportOptions
    , sink: &mut dyn ResponseSink
    ) -> Result<usize, Error>
    {   self.set_options(extra);
        let body = self.encoding.encode(data)?;
        let url = self.url.clone();
        self.execute(reqwest::Method::PUT, url, Some(body), sink).await
    }

    /// DELETE `url?query` with an empty body
    pub async fn delete(
      &mut self
    , query: &Params
    , extra: TransportOptions
    , sink: &mut dyn ResponseSink
    ) -> Result<usize, Error>
    {   self.set_options(extra);
        let url = build_url(&self.url, query);
        self.execute(reqwest::Method::DELETE, url, None, sink).await
    }

    async fn execute(
      &self
    , method: reqwest::Method
    , url: String
    , body: Option<Vec<u8>>
    , sink: &mut dyn ResponseSink
    ) -> Result<usize, Error>
    {   debug!("{} {}", method, url);

        let mut request = self.http_client.request(method, &url);
        if let Some(timeout) = self.options.timeout
        {   request = request.timeout(timeout);
        }
        if let Some(token) = &self.options.bearer_token
        {   request = request.bearer_auth(token);
        }
        let has_content_type = self.options.headers
          .keys()
          .any(|name| name.eq_ignore_ascii_case("content-type"));
        for (name, value) in &self.options.headers
        {   request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body
        {   if !has_content_type
            {   request = request.header(
                  reqwest::header::CONTENT_TYPE,
                  self.encoding.content_type()
                );
            }
            trace!("Request body: {} bytes", body.len());
            request = request.body(body);
        }

        let mut response = request
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            Error::from(e)
          })?;

        let status = response.status();
        trace!("Response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Server returned {}: {}", status, error_text);
            return Err(Error::ApiError(
              format!("{}: {}", status, error_text)
            ));
        }

        let mut received = 0usize;
        while let Some(chunk) = response.chunk().await
          .map_err(|e| {
            error!("Failed reading response body: {}", e);
            Error::from(e)
          })?
        {   let consumed = sink.write(&chunk);
            if consumed != chunk.len()
            {   error!(
                  "Sink consumed {} of {} bytes, aborting",
                  consumed, chunk.len()
                );
                return Err(Error::HttpError(format!(
                  "write callback consumed {} of {} bytes",
                  consumed, chunk.len()
                )));
            }
            received += chunk.len();
        }
        sink.finish();

        debug!("Received {} bytes from {}", received, url);
        Ok(received)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params
    {   match value
        {   Value::Object(map) => map
          , _ => panic!("expected object")
        }
    }

    #[test]
    fn build_url_adds_question_mark_once()
    {   let query = params(json!({"key": "value"}));
        assert_eq!(
          build_url("http://host/api", &query),
          "http://host/api?key=value"
        );
        assert_eq!(
          build_url("http://host/api?", &query),
          "http://host/api?key=value"
        );
        assert_eq!(
          build_url("http://host/api?a=1", &query),
          "http://host/api?a=1&key=value"
        );
    }

    #[test]
    fn build_url_leaves_base_alone_without_query()
    {   assert_eq!(
          build_url("http://host/api/tags", &Params::new()),
          "http://host/api/tags"
        );
    }

    #[test]
    fn form_encoding_flattens_like_http_build_query()
    {   let data = params(json!({
          "flag": true,
          "off": false,
          "skip": null,
          "n": 3,
          "opts": {"temperature": 0.5},
          "list": ["a b", "c"]
        }));
        let encoded = form_encode(&data);
        let mut pairs: Vec<&str> = encoded.split('&').collect();
        pairs.sort_unstable();
        assert_eq!(
          pairs,
          vec![
            "flag=1",
            "list%5B0%5D=a+b",
            "list%5B1%5D=c",
            "n=3",
            "off=0",
            "opts%5Btemperature%5D=0.5",
          ]
        );
    }

    #[test]
    fn json_encoder_serialises_map()
    {   let data = params(json!({"model": "m", "stream": false}));
        let bytes = Encoding::Json.encode(&data).unwrap();
        let decoded: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(decoded, json!({"model": "m", "stream": false}));
        assert_eq!(Encoding::Json.content_type(), "application/json");
    }

    #[test]
    fn buffer_sink_accumulates_chunks()
    {   let mut sink = BufferSink::new();
        assert_eq!(sink.write(b"{\"a\":"), 5);
        assert_eq!(sink.write(b"1}"), 2);
        assert_eq!(sink.len(), 7);
        assert_eq!(sink.into_string(), "{\"a\":1}");
    }

    #[test]
    fn json_lines_sink_assembles_response_text()
    {   let mut seen = Vec::new();
        let mut sink = JsonLinesSink::new(|piece: &str| {
          seen.push(piece.to_string())
        });
        sink.write(br#"{"response":"Hel"}"#);
        sink.write(br#"{"response":"lo"}"#);
        sink.finish();
        assert_eq!(sink.text(), "Hello");
        drop(sink);
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[test]
    fn json_lines_sink_handles_split_lines()
    {   let mut sink = JsonLinesSink::new(|_: &str| {});
        sink.write(b"{\"response\":\"a\",\"done\":false}\n{\"resp");
        assert_eq!(sink.text(), "a");
        sink.write(b"onse\":\"b\",\"done\":false}\n{\"response\":\"\",");
        assert_eq!(sink.text(), "ab");
        sink.write(b"\"done\":true}\n");
        sink.finish();
        assert_eq!(sink.into_text(), "ab");
    }

    #[test]
    fn json_lines_sink_skips_garbage()
    {   let mut sink = JsonLinesSink::new(|_: &str| {});
        sink.write(b"not json\n{\"response\":\"ok\"}\n");
        sink.finish();
        assert_eq!(sink.text(), "ok");
    }

    #[test]
    fn options_merge_accumulates_headers()
    {   let mut options = TransportOptions::new()
          .with_header("X-One", "1")
          .with_timeout(Duration::from_secs(5));
        options.merge(
          TransportOptions::new()
            .with_header("X-Two", "2")
            .with_bearer_token("secret")
        );
        assert_eq!(options.headers.len(), 2);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
        assert_eq!(options.bearer_token.as_deref(), Some("secret"));
    }

    #[test]
    fn empty_url_is_rejected()
    {   let result = HttpTransport::new("  ", TransportOptions::new());
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }
}
