//! alpaca: a thin client for an Ollama server, plus an essay assessment
//! pipeline built on it.
//!
//! ```text
//! alpaca/
//! ├── src/
//! │   ├── lib.rs          # Re-exports
//! │   ├── error.rs        # Error type
//! │   ├── http.rs         # Transport, encoders, response sinks
//! │   ├── request.rs      # Generation request body
//! │   ├── response.rs     # Generation response model
//! │   ├── providers/      # LlmClient trait + Ollama client
//! │   ├── task.rs         # Task + prompt rendering
//! │   ├── assessor.rs     # Essay assessment
//! │   ├── config.rs       # Config file, overrides, task definitions
//! │   ├── batch.rs        # Essay inputs and assessment outputs on disk
//! │   ├── logger.rs       # Explicit logger handle
//! │   └── bin/            # eval_essay, chat, models
//! └── tests/
//! ```
//!
//! ```no_run
//! # async fn demo() -> Result<(), alpaca::Error> {
//! use alpaca::{Assessor, OllamaClient, Task};
//!
//! let mut client = OllamaClient::new("http://127.0.0.1:11434");
//! client.set_model_name("llama3.2:latest");
//!
//! let task = Task::new("Rivers").with_description("Write about rivers.");
//! let assessor = Assessor::new(&client);
//! let assessment = assessor.assess_essay(&task, "Rivers flow.").await?;
//! println!("{}", assessment);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod request;
pub mod response;
pub mod providers;
pub mod task;
pub mod assessor;
pub mod config;
pub mod batch;
pub mod logger;

pub use error::Error;
pub use http::{
  BufferSink, Encoder, Encoding, HttpTransport, JsonLinesSink, Params,
  ResponseSink, TransportOptions
};
pub use request::{GenerateRequest, RequestOptions};
pub use response::GenerateResponse;
pub use providers::{LlmClient, OllamaClient};
pub use providers::ollama::{DEFAULT_API_URL, DEFAULT_MODEL};
pub use task::Task;
pub use assessor::Assessor;
pub use config::{EvalConfig, TaskDefinition};
pub use logger::Logger;
