//! Assignment tasks and assessment prompt rendering

/// Built-in assessment prompt
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
# Essay Task: {{task_name}}


Please assess the student response based on the below rubric.
Provide scores for each criterion in the table format.

Table Format:

| Criterion | Score |
|-----------|-------|
{{score_formatting}}

Make sure the total score does not exceed {{max_score}} points.

## Task Description

{{task_description}}

## Rubric

{{rubric}}

## Student Response

{{student_response}}";

/// Generic four-criterion rubric
pub const DEFAULT_RUBRIC: &str = "\
| Criterion       | Max Score |
|-----------------|-----------|
| Clarity         | 5         |
| Coherence       | 5         |
| Relevance       | 5         |
| Grammar         | 5         |";

pub const DEFAULT_TASK_NAME: &str = "A task";
pub const DEFAULT_MAX_SCORE: u32 = 100;

/// Example score row shown to the model
pub const SCORE_FORMATTING: &str = "| criterion |       |";

const TASK_NAME: &str = "{{task_name}}";
const STUDENT_RESPONSE: &str = "{{student_response}}";
const RUBRIC: &str = "{{rubric}}";
const TASK_DESCRIPTION: &str = "{{task_description}}";
const MAX_SCORE: &str = "{{max_score}}";
const SCORE_FORMAT: &str = "{{score_formatting}}";

/// One assignment: metadata, rubric and the prompt template used to
/// assess submissions against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task
{   pub task_name: String
  , pub task_description: String
  , /// Markdown table
    pub rubric: String
  , pub max_score: u32
  , pub template: String
}

impl Default for Task
{   fn default() -> Self
    {   Task
        {   task_name: DEFAULT_TASK_NAME.to_string()
          , task_description: String::new()
          , rubric: DEFAULT_RUBRIC.to_string()
          , max_score: DEFAULT_MAX_SCORE
          , template: DEFAULT_PROMPT_TEMPLATE.to_string()
        }
    }
}

impl Task
{   pub fn new(task_name: impl Into<String>) -> Self
    {   Task
        {   task_name: task_name.into()
          , ..Task::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self
    {   self.task_description = description.into();
        self
    }

    pub fn with_rubric(mut self, rubric: impl Into<String>) -> Self
    {   self.rubric = rubric.into();
        self
    }

    pub fn with_max_score(mut self, max_score: u32) -> Self
    {   self.max_score = max_score;
        self
    }

    /// An empty template keeps the built-in one
    pub fn with_template(mut self, template: impl Into<String>) -> Self
    {   let template = template.into();
        if !template.is_empty()
        {   self.template = template;
        }
        self
    }

    pub fn task_name(&self) -> &str
    {   &self.task_name
    }

    pub fn task_description(&self) -> &str
    {   &self.task_description
    }

    pub fn rubric(&self) -> &str
    {   &self.rubric
    }

    pub fn max_score(&self) -> u32
    {   self.max_score
    }

    pub fn prompt_template(&self) -> &str
    {   &self.template
    }

    /// Render the task's own template for `submission`
    pub fn build(&self, submission: &str) -> String
    {   self.build_prompt(submission, &self.template)
    }

    /// Render `template` for `submission`.
    ///
    /// Replacement is a single left-to-right pass over `template`:
    /// substituted text is never scanned again, so placeholder tokens
    /// inside the submission or rubric come out verbatim.
    pub fn build_prompt(&self, submission: &str, template: &str) -> String
    {   let max_score = self.max_score.to_string();
        let replacements: [(&str, &str); 6] = [
          (TASK_NAME, self.task_name.as_str()),
          (STUDENT_RESPONSE, submission),
          (RUBRIC, self.rubric.as_str()),
          (TASK_DESCRIPTION, self.task_description.as_str()),
          (MAX_SCORE, max_score.as_str()),
          (SCORE_FORMAT, SCORE_FORMATTING),
        ];

        let mut prompt = String::with_capacity(template.len() + submission.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{")
        {   prompt.push_str(&rest[..start]);
            let candidate = &rest[start..];
            match replacements
              .iter()
              .find(|(token, _)| candidate.starts_with(token))
            {   Some((token, value)) => {
                  prompt.push_str(value);
                  rest = &candidate[token.len()..];
                }
              , None => {
                  prompt.push('{');
                  rest = &candidate[1..];
                }
            }
        }
        prompt.push_str(rest);
        prompt
    }
}
