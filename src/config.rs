//! Configuration for the essay evaluation pipeline

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::providers::ollama::DEFAULT_API_URL;
use crate::task::{Task, DEFAULT_MAX_SCORE, DEFAULT_PROMPT_TEMPLATE, DEFAULT_TASK_NAME};

pub const DEFAULT_INPUT_DIRECTORY: &str = "data/input";
pub const DEFAULT_OUTPUT_DIRECTORY: &str = "data/output";
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Evaluation settings.
///
/// Used both for the JSON config file and for command line overrides;
/// every key is optional and defaults apply after merging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub ollama_server: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub input_directory: Option<PathBuf>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>
  , /// Overrides the rubric named by the task definition
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rubric_file: Option<PathBuf>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub task_definition_file: Option<PathBuf>
  , /// Older spelling of `task_definition_file`; the newer key wins when
    /// a file has both
    #[serde(skip_serializing)]
    pub task_config: Option<PathBuf>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub template_file: Option<PathBuf>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub task_name: Option<String>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub max_score: Option<u32>
  , /// Models to assess with; all server models when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>
  , #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>
}

impl EvalConfig
{   /// Load a config file; a missing file or invalid JSON is an error
    pub fn load(path: &Path) -> Result<Self, Error>
    {   debug!("Loading config from {}", path.display());
        if !path.exists()
        {   return Err(Error::InvalidConfiguration(format!(
              "Configuration file '{}' not found",
              path.display()
            )));
        }
        let text = read_text(path)?;
        let mut config: EvalConfig
          = serde_json::from_str(&text).map_err(|e| {
            Error::InvalidConfiguration(format!(
              "Invalid JSON in configuration file '{}': {}",
              path.display(), e
            ))
          })?;
        if let Some(legacy) = config.task_config.take()
        {   config.task_definition_file.get_or_insert(legacy);
        }
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), otherwise `fallback`
    /// when present, otherwise an empty config.
    pub fn load_or_default(
      explicit: Option<&Path>
    , fallback: &Path
    ) -> Result<Self, Error>
    {   match explicit
        {   Some(path) => EvalConfig::load(path)
          , None if fallback.exists() => EvalConfig::load(fallback)
          , None => {
              debug!("No config file, using defaults");
              Ok(EvalConfig::default())
            }
        }
    }

    /// Keys set in `overrides` replace ours
    pub fn merge(&mut self, overrides: EvalConfig)
    {   fn take<T>(slot: &mut Option<T>, value: Option<T>)
        {   if value.is_some()
            {   *slot = value;
            }
        }
        take(&mut self.ollama_server, overrides.ollama_server);
        take(&mut self.input_directory, overrides.input_directory);
        take(&mut self.output_directory, overrides.output_directory);
        take(&mut self.rubric_file, overrides.rubric_file);
        take(&mut self.task_definition_file, overrides.task_definition_file);
        take(&mut self.template_file, overrides.template_file);
        take(&mut self.task_name, overrides.task_name);
        take(&mut self.max_score, overrides.max_score);
        take(&mut self.models, overrides.models);
        take(&mut self.timeout_secs, overrides.timeout_secs);
    }

    pub fn server(&self) -> &str
    {   self.ollama_server.as_deref().unwrap_or(DEFAULT_API_URL)
    }

    pub fn input_dir(&self) -> PathBuf
    {   self.input_directory
          .clone()
          .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT_DIRECTORY))
    }

    pub fn output_dir(&self) -> PathBuf
    {   self.output_directory
          .clone()
          .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIRECTORY))
    }

    pub fn timeout(&self) -> Option<Duration>
    {   self.timeout_secs.map(Duration::from_secs)
    }

    /// Requested models that the server has, in requested order;
    /// every available model when none were requested
    pub fn select_models(&self, available: &[String]) -> Vec<String>
    {   match &self.models
        {   Some(requested) => requested
              .iter()
              .filter(|name| available.contains(name))
              .cloned()
              .collect()
          , None => available.to_vec()
        }
    }

    /// Prompt template from `template_file`, or the built-in one
    pub fn load_template(&self) -> Result<String, Error>
    {   match &self.template_file
        {   Some(path) => read_text(path)
          , None => Ok(DEFAULT_PROMPT_TEMPLATE.to_string())
        }
    }

    /// Build the task from the task definition file plus overrides
    pub fn load_task(&self, template: &str) -> Result<Task, Error>
    {   let path = self.task_definition_file.as_deref().ok_or_else(|| {
          Error::InvalidConfiguration(
            "no task definition file configured".to_string()
          )
        })?;
        let definition = TaskDefinition::load(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let rubric = match &self.rubric_file
        {   Some(rubric_file) => read_text(rubric_file)?
          , None => definition.rubric_text(base_dir)?
        };
        let description = definition.description_text(base_dir)?;
        let task_name = self.task_name
          .clone()
          .or(definition.task_name)
          .unwrap_or_else(|| DEFAULT_TASK_NAME.to_string());
        let max_score = self.max_score
          .or(definition.max_score)
          .unwrap_or(DEFAULT_MAX_SCORE);

        Ok(Task::new(task_name)
          .with_description(description)
          .with_rubric(rubric)
          .with_max_score(max_score)
          .with_template(template))
    }
}

/// Task definition file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskDefinition
{   pub task_name: Option<String>
  , /// Inline description, preferred over `task_file`
    pub task_description: Option<String>
  , pub task_file: Option<PathBuf>
  , /// Inline rubric, preferred over `rubric_file`
    pub rubric: Option<String>
  , pub rubric_file: Option<PathBuf>
  , pub max_score: Option<u32>
}

impl TaskDefinition
{   pub fn load(path: &Path) -> Result<Self, Error>
    {   debug!("Loading task definition from {}", path.display());
        if !path.exists()
        {   return Err(Error::InvalidConfiguration(format!(
              "Task config file not found: {}",
              path.display()
            )));
        }
        let text = read_text(path)?;
        serde_json::from_str(&text).map_err(|e| {
          Error::InvalidConfiguration(format!(
            "Invalid JSON in task config file: {}. Error: {}",
            path.display(), e
          ))
        })
    }

    /// Description text; empty when neither key is set
    pub fn description_text(&self, base_dir: &Path) -> Result<String, Error>
    {   match (&self.task_description, &self.task_file)
        {   (Some(text), _) => Ok(text.clone())
          , (None, Some(file)) => read_text(&resolve(base_dir, file))
          , (None, None) => Ok(String::new())
        }
    }

    /// Rubric text; empty when neither key is set
    pub fn rubric_text(&self, base_dir: &Path) -> Result<String, Error>
    {   match (&self.rubric, &self.rubric_file)
        {   (Some(text), _) => Ok(text.clone())
          , (None, Some(file)) => read_text(&resolve(base_dir, file))
          , (None, None) => Ok(String::new())
        }
    }
}

/// Split a comma-separated model list, trimming blanks
pub fn parse_model_list(list: &str) -> Vec<String>
{   list.split(',')
      .map(str::trim)
      .filter(|name| !name.is_empty())
      .map(str::to_string)
      .collect()
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf
{   if path.is_absolute()
    {   path.to_path_buf()
    } else
    {   base_dir.join(path)
    }
}

fn read_text(path: &Path) -> Result<String, Error>
{   fs::read_to_string(path).map_err(|e| {
      Error::Io(format!("{}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests
{   use super::*;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf
    {   let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn defaults_apply_to_empty_config()
    {   let config = EvalConfig::default();
        assert_eq!(config.server(), "http://127.0.0.1:11434");
        assert_eq!(config.input_dir(), PathBuf::from("data/input"));
        assert_eq!(config.output_dir(), PathBuf::from("data/output"));
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn loads_file_and_accepts_task_config_alias()
    {   let dir = tempfile::tempdir().unwrap();
        let path = write(
          dir.path(),
          "config.json",
          r#"{"ollama_server":"http://gpu:11434","task_config":"task.json",
              "models":["a","b"],"timeout_secs":30}"#
        );
        let config = EvalConfig::load(&path).unwrap();
        assert_eq!(config.server(), "http://gpu:11434");
        assert_eq!(config.task_definition_file, Some(PathBuf::from("task.json")));
        assert_eq!(config.models, Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn task_definition_file_wins_over_task_config()
    {   let dir = tempfile::tempdir().unwrap();
        let path = write(
          dir.path(),
          "config.json",
          r#"{"task_config":"old.json","task_definition_file":"new.json"}"#
        );
        let config = EvalConfig::load(&path).unwrap();
        assert_eq!(config.task_definition_file, Some(PathBuf::from("new.json")));
        assert_eq!(config.task_config, None);
    }

    #[test]
    fn invalid_json_is_a_configuration_error()
    {   let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "config.json", "{not json");
        assert!(matches!(
          EvalConfig::load(&path),
          Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn explicit_missing_file_fails_but_fallback_does_not()
    {   let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(EvalConfig::load_or_default(Some(&missing), &missing).is_err());
        assert_eq!(
          EvalConfig::load_or_default(None, &missing).unwrap(),
          EvalConfig::default()
        );
    }

    #[test]
    fn overrides_replace_only_set_keys()
    {   let mut config = EvalConfig
        {   ollama_server: Some("http://file".into())
          , input_directory: Some("in".into())
          , ..EvalConfig::default()
        };
        config.merge(EvalConfig
        {   ollama_server: Some("http://cli".into())
          , models: Some(vec!["m".into()])
          , ..EvalConfig::default()
        });
        assert_eq!(config.server(), "http://cli");
        assert_eq!(config.input_dir(), PathBuf::from("in"));
        assert_eq!(config.models, Some(vec!["m".to_string()]));
    }

    #[test]
    fn selects_requested_models_present_on_server()
    {   let available = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let mut config = EvalConfig::default();
        assert_eq!(config.select_models(&available), available);

        config.models = Some(vec!["c".into(), "x".into(), "a".into()]);
        assert_eq!(
          config.select_models(&available),
          vec!["c".to_string(), "a".to_string()]
        );

        config.models = Some(vec!["x".into()]);
        assert!(config.select_models(&available).is_empty());
    }

    #[test]
    fn model_list_is_trimmed()
    {   assert_eq!(
          parse_model_list(" llama3.2:latest, mistral ,,"),
          vec!["llama3.2:latest".to_string(), "mistral".to_string()]
        );
    }

    #[test]
    fn task_is_built_from_definition_files()
    {   let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "task.md", "Write about rivers.");
        write(dir.path(), "rubric.md", "| Depth | 10 |");
        let taskdef = write(
          dir.path(),
          "task.json",
          r#"{"task_name":"Rivers","task_file":"task.md","rubric_file":"rubric.md"}"#
        );
        let config = EvalConfig
        {   task_definition_file: Some(taskdef)
          , max_score: Some(10)
          , ..EvalConfig::default()
        };

        let task = config.load_task("{{task_name}}|{{task_description}}|{{rubric}}|{{max_score}}")
          .unwrap();
        assert_eq!(task.build("x"), "Rivers|Write about rivers.|| Depth | 10 ||10");
    }

    #[test]
    fn rubric_override_and_inline_fields()
    {   let dir = tempfile::tempdir().unwrap();
        let rubric = write(dir.path(), "other.md", "OTHER");
        let taskdef = write(
          dir.path(),
          "task.json",
          r#"{"task_description":"inline","rubric":"inline rubric"}"#
        );
        let config = EvalConfig
        {   task_definition_file: Some(taskdef)
          , rubric_file: Some(rubric)
          , ..EvalConfig::default()
        };
        let task = config.load_task("").unwrap();
        assert_eq!(task.task_name(), "A task");
        assert_eq!(task.task_description(), "inline");
        assert_eq!(task.rubric(), "OTHER");
        assert_eq!(task.max_score(), 100);
        assert_eq!(task.prompt_template(), DEFAULT_PROMPT_TEMPLATE);
    }

    #[test]
    fn missing_task_definition_is_reported()
    {   assert!(matches!(
          EvalConfig::default().load_task(""),
          Err(Error::InvalidConfiguration(_))
        ));
        let config = EvalConfig
        {   task_definition_file: Some("/definitely/not/here.json".into())
          , ..EvalConfig::default()
        };
        assert!(config.load_task("").is_err());
    }
}
