//! Essay assessment on top of an [`LlmClient`]

use log::{debug, info};
use serde_json::Value;

use crate::error::Error;
use crate::providers::LlmClient;
use crate::request::{stream_requested, RequestOptions};
use crate::response::GenerateResponse;
use crate::task::Task;

/// System role sent with every assessment request
pub const ASSESSOR_SYSTEM_ROLE: &str = "You are an essay assessor.";

/// Drives prompt building and generation for one client.
///
/// The client is borrowed, so the caller keeps ownership and may switch
/// its model between assessors.
pub struct Assessor<'a, C>
where
  C: LlmClient
{   client: &'a C
  , template: Option<String>
  , options: RequestOptions
}

impl<'a, C> Assessor<'a, C>
where
  C: LlmClient
{   pub fn new(client: &'a C) -> Self
    {   let mut options = RequestOptions::new();
        options.insert(
          "system".to_string(),
          Value::String(ASSESSOR_SYSTEM_ROLE.to_string())
        );
        options.insert("stream".to_string(), Value::Bool(false));
        Assessor
        {   client
          , template: None
          , options
        }
    }

    /// Use `template` instead of each task's own template.
    /// An empty template is ignored.
    pub fn with_template(mut self, template: impl Into<String>) -> Self
    {   let template = template.into();
        self.template = if template.is_empty() { None } else { Some(template) };
        self
    }

    /// Set a request option; `system` cannot be replaced.
    pub fn set_option(&mut self, key: impl Into<String>, value: Value)
    {   let key = key.into();
        if key == "system"
        {   debug!("Ignoring override of assessor system role");
            return;
        }
        self.options.insert(key, value);
    }

    pub fn set_streaming(&mut self, stream: bool)
    {   self.options.insert("stream".to_string(), Value::Bool(stream));
    }

    pub fn options(&self) -> &RequestOptions
    {   &self.options
    }

    pub fn client(&self) -> &C
    {   self.client
    }

    /// Prompt that `assess_essay` would send for `submission`
    pub fn build_prompt(&self, task: &Task, submission: &str) -> String
    {   let template = self.template
          .as_deref()
          .unwrap_or_else(|| task.prompt_template());
        task.build_prompt(submission, template)
    }

    /// Assess one submission and return the generated assessment text.
    ///
    /// Non-streaming output is the generation JSON, reduced to its
    /// `response` field; streamed output already is the assembled text.
    pub async fn assess_essay(
      &self
    , task: &Task
    , submission: &str
    ) -> Result<String, Error>
    {   let prompt = self.build_prompt(task, submission);
        info!(
          "Assessing '{}' with model {}",
          task.task_name(),
          self.client.model_name()
        );

        let output = self.client.generate(&prompt, &self.options).await?;

        if stream_requested(&self.options)
        {   Ok(output)
        } else
        {   let parsed = GenerateResponse::from_json(&output);
            debug!(
              "Assessment done={} eval_count={}",
              parsed.done, parsed.eval_count
            );
            Ok(parsed.response)
        }
    }
}
