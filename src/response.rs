//! Typed view of a `/api/generate` response

use log::warn;
use serde::Serialize;
use serde_json::Value;

/// One generation result.
///
/// Durations are nanoseconds as reported by the server. Any field missing
/// from the payload (or of the wrong JSON type) keeps its zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateResponse
{   /// Name of the model that generated the response
    pub model: String
  , /// Creation timestamp, verbatim
    pub created_at: String
  , /// Generated text
    pub response: String
  , /// Whether generation completed
    pub done: bool
  , /// Opaque continuation state for multi-turn use
    pub context: Vec<i64>
  , pub total_duration: u64
  , pub load_duration: u64
  , /// Tokens in the prompt
    pub prompt_eval_count: u64
  , pub prompt_eval_duration: u64
  , /// Tokens generated
    pub eval_count: u64
  , pub eval_duration: u64
}

impl GenerateResponse
{   /// Parse a raw payload.
    ///
    /// Never fails: input that is not a JSON object yields the
    /// all-defaults response.
    pub fn from_json(raw: &str) -> Self
    {   match serde_json::from_str::<Value>(raw)
        {   Ok(value) => GenerateResponse::from(&value)
          , Err(e) => {
              warn!("Generation payload is not JSON ({}), using defaults", e);
              GenerateResponse::default()
            }
        }
    }
}

impl From<&Value> for GenerateResponse
{   fn from(data: &Value) -> Self
    {   let text = |key: &str| {
          data.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
        };
        let count = |key: &str| {
          data.get(key)
            .and_then(Value::as_u64)
            .unwrap_or_default()
        };

        GenerateResponse
        {   model: text("model")
          , created_at: text("created_at")
          , response: text("response")
          , done: data.get("done")
              .and_then(Value::as_bool)
              .unwrap_or_default()
          , context: data.get("context")
              .and_then(Value::as_array)
              .map(|items| items.iter().filter_map(Value::as_i64).collect())
              .unwrap_or_default()
          , total_duration: count("total_duration")
          , load_duration: count("load_duration")
          , prompt_eval_count: count("prompt_eval_count")
          , prompt_eval_duration: count("prompt_eval_duration")
          , eval_count: count("eval_count")
          , eval_duration: count("eval_duration")
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_full_payload()
    {   let raw = r#"{
          "model": "llama3.2:latest",
          "created_at": "2024-07-01T10:00:00Z",
          "response": "Score: 42",
          "done": true,
          "context": [1, 2, 3],
          "total_duration": 5000,
          "load_duration": 100,
          "prompt_eval_count": 26,
          "prompt_eval_duration": 200,
          "eval_count": 12,
          "eval_duration": 4700
        }"#;
        let parsed = GenerateResponse::from_json(raw);
        assert_eq!(parsed.model, "llama3.2:latest");
        assert_eq!(parsed.response, "Score: 42");
        assert!(parsed.done);
        assert_eq!(parsed.context, vec![1, 2, 3]);
        assert_eq!(parsed.total_duration, 5000);
        assert_eq!(parsed.prompt_eval_count, 26);
        assert_eq!(parsed.eval_duration, 4700);
    }

    #[test]
    fn missing_fields_take_zero_values()
    {   let parsed = GenerateResponse::from_json(r#"{"response":"hi"}"#);
        assert_eq!(
          parsed,
          GenerateResponse
          {   response: "hi".to_string()
            , ..GenerateResponse::default()
          }
        );
        assert_eq!(GenerateResponse::from_json("{}"), GenerateResponse::default());
    }

    #[test]
    fn mistyped_fields_take_zero_values()
    {   let parsed = GenerateResponse::from_json(
          r#"{"done":"yes","eval_count":"12","context":"abc","model":7}"#
        );
        assert_eq!(parsed, GenerateResponse::default());
    }

    #[test]
    fn malformed_input_yields_defaults()
    {   assert_eq!(
          GenerateResponse::from_json("Hello there"),
          GenerateResponse::default()
        );
        assert_eq!(
          GenerateResponse::from_json("[1,2]"),
          GenerateResponse::default()
        );
    }

    proptest! {
        #[test]
        fn any_text_parses_without_panicking(raw in ".{0,80}")
        {   let parsed = GenerateResponse::from_json(&raw);
            if !raw.trim_start().starts_with('{')
            {   prop_assert_eq!(parsed, GenerateResponse::default());
            }
        }

        #[test]
        fn present_fields_are_kept(
          response in ".{0,40}",
          done in any::<bool>(),
          eval_count in any::<u64>(),
          context in prop::collection::vec(any::<i64>(), 0..8)
        ) {
            let raw = serde_json::json!({
              "response": response,
              "done": done,
              "eval_count": eval_count,
              "context": context
            }).to_string();
            let parsed = GenerateResponse::from_json(&raw);
            prop_assert_eq!(parsed.response, response);
            prop_assert_eq!(parsed.done, done);
            prop_assert_eq!(parsed.eval_count, eval_count);
            prop_assert_eq!(parsed.context, context);
            prop_assert_eq!(parsed.load_duration, 0);
        }
    }
}
