//! List installed models or show one model's details

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use alpaca::{Logger, OllamaClient, DEFAULT_API_URL};

#[derive(Parser, Debug)]
#[command(name = "models", about = "Inspect models on an Ollama server")]
struct Cli
{   /// Ollama server URL
    #[arg(
      short = 's',
      long = "server",
      env = "ALPACA_SERVER",
      default_value = DEFAULT_API_URL,
      global = true
    )]
    server: String
  , #[command(subcommand)]
    cmd: Command
}

#[derive(Subcommand, Debug)]
enum Command
{   /// Print the names of installed models
    List
  , /// Print the server's description of one model
    Info
    {   model: String
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode
{   let cli = Cli::parse();
    let logger = Logger::from_env("models");
    let client = OllamaClient::new(cli.server.as_str());

    match cli.cmd
    {   Command::List => {
          let models = match client.try_get_models_list().await
          {   Ok(models) => models
            , Err(e) => {
                logger.error(format!("Cannot list models at {}: {}", cli.server, e));
                return ExitCode::FAILURE;
              }
          };
          if models.is_empty()
          {   logger.error(format!("No models available at {}", cli.server));
              return ExitCode::FAILURE;
          }
          logger.info(format!("Available models: {}", models.join(", ")));
          for model in models
          {   println!("{}", model);
          }
        }
      , Command::Info { model } => {
          let info = client.get_model_info(&model).await;
          if info.is_empty()
          {   logger.error(format!("No information for model '{}'", model));
              return ExitCode::FAILURE;
          }
          match serde_json::to_string_pretty(&Value::Object(info))
          {   Ok(text) => println!("{}", text)
            , Err(e) => {
                logger.error(e);
                return ExitCode::FAILURE;
              }
          }
        }
    }

    ExitCode::SUCCESS
}
