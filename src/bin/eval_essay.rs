//! Evaluate a directory of essays with one or more Ollama models

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use alpaca::batch;
use alpaca::config::{parse_model_list, DEFAULT_CONFIG_FILE};
use alpaca::{Assessor, Error, EvalConfig, Logger, OllamaClient};

#[derive(Parser, Debug)]
#[command(
  name = "eval_essay",
  about = "Evaluate essay responses using language models via Ollama. \
           Options override config settings."
)]
struct Args
{   /// Path to config file (default: config.json)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>
  , /// Ollama server URL
    #[arg(short = 's', long = "server", value_name = "URL")]
    server: Option<String>
  , /// Path to input directory
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    input: Option<PathBuf>
  , /// Path to output directory
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    output: Option<PathBuf>
  , /// Path to rubric file
    #[arg(short = 'r', long = "rubric", value_name = "FILE")]
    rubric: Option<PathBuf>
  , /// Path to task definition file
    #[arg(short = 't', long = "taskdef", value_name = "FILE")]
    taskdef: Option<PathBuf>
  , /// Comma-separated list of models to use
    #[arg(short = 'm', long = "models", value_name = "LIST")]
    models: Option<String>
}

impl Args
{   fn overrides(&self) -> EvalConfig
    {   EvalConfig
        {   ollama_server: self.server.clone()
          , input_directory: self.input.clone()
          , output_directory: self.output.clone()
          , rubric_file: self.rubric.clone()
          , task_definition_file: self.taskdef.clone()
          , models: self.models.as_deref().map(parse_model_list)
          , ..EvalConfig::default()
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode
{   let args = match Args::try_parse()
    {   Ok(args) => args
      , Err(e) if !e.use_stderr() => e.exit()
      , Err(e) => {
          let _ = e.print();
          return ExitCode::FAILURE;
        }
    };
    let logger = Logger::from_env("eval_essay");

    match run(&args, &logger).await
    {   Ok(()) => ExitCode::SUCCESS
      , Err(e) => {
          logger.error(e);
          ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args, logger: &Logger) -> Result<(), Error>
{   let mut config = EvalConfig::load_or_default(
      args.config.as_deref(),
      Path::new(DEFAULT_CONFIG_FILE)
    )?;
    config.merge(args.overrides());

    let mut client = OllamaClient::new(config.server());
    if let Some(timeout) = config.timeout()
    {   client = client.with_timeout(timeout);
    }

    let available = client.try_get_models_list().await.map_err(|e| {
      Error::HttpError(format!(
        "Cannot list models on Ollama server at '{}': {}",
        config.server(),
        e
      ))
    })?;
    if available.is_empty()
    {   return Err(Error::ModelNotAvailable(format!(
          "no models installed on Ollama server at '{}'",
          config.server()
        )));
    }

    let models = config.select_models(&available);
    if models.is_empty()
    {   return Err(Error::ModelNotAvailable(format!(
          "no requested model is installed. Available models: {}",
          available.join(", ")
        )));
    }
    logger.info(format!("Using models: {}", models.join(", ")));

    let output_dir = config.output_dir();
    fs::create_dir_all(&output_dir)?;
    logger.info(format!("Output directory: {}", output_dir.display()));

    let template = config.load_template()?;
    let task = config.load_task(&template)?;
    logger.debug(format!("Essay task prompt:\n{}", task.build("")));

    let input_dir = config.input_dir();
    logger.info(format!("Input directory: {}", input_dir.display()));
    let essays = batch::load_essays(&input_dir)?;
    logger.info(format!("Loaded {} essay responses.", essays.len()));
    if essays.is_empty()
    {   logger.warn("No .essay files found, nothing to assess");
        return Ok(());
    }

    logger.info("Starting essay assessments...");
    for model in &models
    {   logger.info(format!("Assessing with model: {}", model));
        client.set_model_name(model.as_str());
        let assessor = Assessor::new(&client);

        for (student, essay) in &essays
        {   logger.info(format!("Student {}", student));
            let assessment = assessor.assess_essay(&task, essay).await?;
            let path = batch::write_assessment(
              &output_dir,
              model,
              student,
              &assessment
            )?;
            logger.info(format!("Saved {}", path.display()));
        }
        logger.info("======================");
    }
    logger.info("Essay assessments completed.");
    Ok(())
}
