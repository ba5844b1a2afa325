//! Request payloads for the generation endpoint

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::http::Params;

/// Caller options overlaid on a generation request
/// (e.g. `system`, `stream`, `options.temperature`)
pub type RequestOptions = Map<String, Value>;

/// Base body of a `/api/generate` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest
{   /// Model name
    pub model: String
  , /// The prompt text
    pub prompt: String
  , /// Ask the server for NDJSON partial output
    pub stream: bool
}

impl GenerateRequest
{   pub fn new(
      model: impl Into<String>
    , prompt: impl Into<String>
    ) -> Self
    {   GenerateRequest
        {   model: model.into()
          , prompt: prompt.into()
          , stream: false
        }
    }

    /// Build the request body; every option overrides the base key of
    /// the same name.
    pub fn into_body(self, options: &RequestOptions) -> Params
    {   let mut body = Params::new();
        body.insert("model".to_string(), Value::String(self.model));
        body.insert("prompt".to_string(), Value::String(self.prompt));
        body.insert("stream".to_string(), Value::Bool(self.stream));
        for (key, value) in options
        {   body.insert(key.clone(), value.clone());
        }
        body
    }
}

/// Whether a payload asks for a streamed response.
///
/// Loose truthiness: `true`, non-zero numbers and non-empty strings other
/// than `"0"` count as set.
pub fn stream_requested(data: &Params) -> bool
{   match data.get("stream")
    {   Some(Value::Bool(flag)) => *flag
      , Some(Value::Number(n)) => n.as_f64().map(|v| v != 0.0).unwrap_or(false)
      , Some(Value::String(s)) => !s.is_empty() && s != "0"
      , Some(Value::Array(items)) => !items.is_empty()
      , Some(Value::Object(map)) => !map.is_empty()
      , Some(Value::Null) | None => false
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    #[test]
    fn base_body_has_model_prompt_and_stream_off()
    {   let body = GenerateRequest::new("llama3.2:latest", "Hello")
          .into_body(&RequestOptions::new());
        assert_eq!(
          Value::Object(body),
          json!({"model": "llama3.2:latest", "prompt": "Hello", "stream": false})
        );
    }

    #[test]
    fn options_override_base_keys()
    {   let mut options = RequestOptions::new();
        options.insert("stream".into(), json!(true));
        options.insert("system".into(), json!("be brief"));
        options.insert("options".into(), json!({"temperature": 0.2}));
        let body = GenerateRequest::new("m", "p").into_body(&options);
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["system"], json!("be brief"));
        assert_eq!(body["options"]["temperature"], json!(0.2));
        assert_eq!(body["model"], json!("m"));
    }

    #[test]
    fn stream_flag_truthiness()
    {   let with = |v: Value| {
          let mut data = Params::new();
          data.insert("stream".into(), v);
          stream_requested(&data)
        };
        assert!(with(json!(true)));
        assert!(with(json!(1)));
        assert!(with(json!("yes")));
        assert!(!with(json!(false)));
        assert!(!with(json!(0)));
        assert!(!with(json!("0")));
        assert!(!with(json!(null)));
        assert!(!stream_requested(&Params::new()));
    }
}
