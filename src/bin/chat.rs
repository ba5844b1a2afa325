//! Interactive prompt loop against one Ollama model

use std::io::BufRead;
use std::process::ExitCode;

use clap::Parser;
use serde_json::Value;

use alpaca::{
  GenerateResponse, Logger, OllamaClient, RequestOptions, DEFAULT_API_URL,
  DEFAULT_MODEL
};

#[derive(Parser, Debug)]
#[command(name = "chat", about = "Chat with a model served by Ollama")]
struct Args
{   /// Model to chat with
    #[arg(default_value = DEFAULT_MODEL)]
    model: String
  , /// Ollama server URL
    #[arg(
      short = 's',
      long = "server",
      env = "ALPACA_SERVER",
      default_value = DEFAULT_API_URL
    )]
    server: String
  , /// Print the answer while it is generated
    #[arg(long)]
    stream: bool
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode
{   let args = Args::parse();
    let logger = Logger::from_env("chat");

    let client = OllamaClient::new(args.server.as_str())
      .with_model(args.model.as_str());
    let models = match client.try_get_models_list().await
    {   Ok(models) => models
      , Err(e) => {
          logger.error(format!("Cannot list models at {}: {}", args.server, e));
          return ExitCode::FAILURE;
        }
    };

    if !models.contains(&args.model)
    {   logger.error(format!(
          "Model {} not found. Available models: {}",
          args.model,
          models.join(", ")
        ));
        return ExitCode::FAILURE;
    }
    logger.debug(format!("Using model: {}", args.model));

    let mut options = RequestOptions::new();
    options.insert("stream".to_string(), Value::Bool(args.stream));

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop
    {   logger.info("Enter prompt (or 'exit' to quit): ");
        let prompt = match lines.next()
        {   Some(Ok(line)) => line.trim().to_string()
          , Some(Err(e)) => {
              logger.error(format!("Failed to read stdin: {}", e));
              return ExitCode::FAILURE;
            }
          , None => break
        };
        if prompt == "exit" || prompt == "bye"
        {   break;
        }
        if prompt.is_empty()
        {   continue;
        }

        match client.generate(&prompt, &options).await
        {   Ok(_) if args.stream => {
              println!();
            }
          , Ok(raw) => {
              let response = GenerateResponse::from_json(&raw);
              logger.info("======================");
              logger.info(format!("Response:\n{}", response.response));
            }
          , Err(e) => {
              logger.error(e);
            }
        }
    }

    ExitCode::SUCCESS
}
