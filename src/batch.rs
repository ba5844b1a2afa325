//! Essay batches on disk: `*.essay` inputs and per-model Markdown outputs

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::error::Error;

pub const ESSAY_EXTENSION: &str = "essay";
const EVAL_PREFIX: &str = "essay_eval_";
const EVAL_EXTENSION: &str = "md";

/// Read every `*.essay` file in `dir`, keyed by file stem
pub fn load_essays(dir: &Path) -> Result<BTreeMap<String, String>, Error>
{   if !dir.is_dir()
    {   return Err(Error::InvalidConfiguration(format!(
          "Input directory '{}' not found",
          dir.display()
        )));
    }

    let mut essays = BTreeMap::new();
    for entry in fs::read_dir(dir)?
    {   let path = entry?.path();
        if !path.is_file()
          || path.extension().and_then(|e| e.to_str()) != Some(ESSAY_EXTENSION)
        {   continue;
        }
        let Some(key) = path.file_stem().and_then(|s| s.to_str())
        else
        {   continue;
        };
        trace!("Loading essay {}", path.display());
        let text = fs::read_to_string(&path).map_err(|e| {
          Error::Io(format!("{}: {}", path.display(), e))
        })?;
        essays.insert(key.to_string(), text);
    }

    debug!("Loaded {} essays from {}", essays.len(), dir.display());
    Ok(essays)
}

/// Directory-safe form of a model name (`llama3.2:latest` → `llama3_2_latest`)
pub fn model_dir_name(model: &str) -> String
{   model.replace([':', '.', '/'], "_")
}

/// Next free `essay_eval_<n>.md` path for one (model, student) pair,
/// creating the directories on the way.
pub fn next_output_path(
  output_dir: &Path
, model: &str
, student: &str
) -> Result<PathBuf, Error>
{   let student_dir = output_dir
      .join(model_dir_name(model))
      .join(student);
    fs::create_dir_all(&student_dir).map_err(|e| {
      Error::Io(format!("{}: {}", student_dir.display(), e))
    })?;

    let mut existing = 0usize;
    for entry in fs::read_dir(&student_dir)?
    {   let path = entry?.path();
        let is_eval = path.extension().and_then(|e| e.to_str()) == Some(EVAL_EXTENSION)
          && path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(EVAL_PREFIX))
            .unwrap_or(false);
        if is_eval
        {   existing += 1;
        }
    }

    Ok(student_dir.join(format!(
      "{}{}.{}",
      EVAL_PREFIX,
      existing + 1,
      EVAL_EXTENSION
    )))
}

/// Write one assessment and return where it went
pub fn write_assessment(
  output_dir: &Path
, model: &str
, student: &str
, assessment: &str
) -> Result<PathBuf, Error>
{   let path = next_output_path(output_dir, model, student)?;
    fs::write(&path, assessment).map_err(|e| {
      Error::Io(format!("{}: {}", path.display(), e))
    })?;
    debug!("Wrote {}", path.display());
    Ok(path)
}
