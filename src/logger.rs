//! Logger handle passed explicitly to the code that reports progress
//!
//! Wraps an `env_logger` logger without installing it as the global
//! `log` backend.

use std::fmt;

use log::{Level, LevelFilter, Log, Metadata, Record};

pub struct Logger
{   inner: env_logger::Logger
  , target: String
}

impl Logger
{   /// Filter taken from `RUST_LOG`, `info` when unset
    pub fn from_env(target: impl Into<String>) -> Self
    {   let inner = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info")
          )
          .build();
        Logger
        {   inner
          , target: target.into()
        }
    }

    pub fn with_level(target: impl Into<String>, level: LevelFilter) -> Self
    {   let inner = env_logger::Builder::new()
          .filter_level(level)
          .is_test(true)
          .build();
        Logger
        {   inner
          , target: target.into()
        }
    }

    pub fn target(&self) -> &str
    {   &self.target
    }

    pub fn max_level(&self) -> LevelFilter
    {   self.inner.filter()
    }

    pub fn enabled(&self, level: Level) -> bool
    {   self.inner.enabled(
          &Metadata::builder()
            .level(level)
            .target(&self.target)
            .build()
        )
    }

    pub fn log(&self, level: Level, message: impl fmt::Display)
    {   if !self.enabled(level)
        {   return;
        }
        self.inner.log(
          &Record::builder()
            .level(level)
            .target(&self.target)
            .args(format_args!("{}", message))
            .build()
        );
        self.inner.flush();
    }

    pub fn error(&self, message: impl fmt::Display)
    {   self.log(Level::Error, message);
    }

    pub fn warn(&self, message: impl fmt::Display)
    {   self.log(Level::Warn, message);
    }

    pub fn info(&self, message: impl fmt::Display)
    {   self.log(Level::Info, message);
    }

    pub fn debug(&self, message: impl fmt::Display)
    {   self.log(Level::Debug, message);
    }
}
