//! sessionbridge CLI.
//!
//! Configuration comes from `SESSIONBRIDGE__*` environment variables; see
//! [`BridgeConfig`]. Results are printed as JSON on stdout, logs go to
//! stderr.

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use rootcause::prelude::{Report, ResultExt};
use sessionbridge_core::security;
use sessionbridge_cookie::AppKey;
use sessionbridge_phpserde::Value;
use sessionbridge_session::SessionDecoder;
use sessionbridge_validator::{BridgeConfig, Validator};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "sessionbridge")]
#[command(about = "Validate framework sessions from outside the framework")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log secrets unredacted
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a session and print the result
    Validate {
        /// Session ID, the encrypted cookie with --cookie, or a whole Cookie
        /// header with --header
        session: String,

        /// Treat the argument as the encrypted session cookie
        #[arg(long, conflicts_with = "header")]
        cookie: bool,

        /// Treat the argument as a Cookie request header
        #[arg(long)]
        header: bool,
    },

    /// Decrypt a session cookie and print the session ID
    Decrypt {
        /// Cookie value as sent by the browser
        cookie: String,

        /// Application key; defaults to SESSIONBRIDGE__APP_KEY
        #[arg(long)]
        key: Option<String>,
    },

    /// Decode a base64 session payload and print it as JSON
    Decode {
        /// Payload column value
        payload: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(report) => {
            tracing::error!(error = %report, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Report<CliError>> {
    if cli.debug {
        security::set_debug_logging(true);
    }

    match cli.command {
        Command::Validate {
            session,
            cookie,
            header,
        } => {
            let mut config = BridgeConfig::from_env().map_err(|e| CliError::Config {
                details: e.to_string(),
            })?;
            config.debug |= cli.debug;

            let validator = Validator::from_config(&config)
                .await
                .context(CliError::Connect)?;
            let outcome = if header {
                validator.validate_cookie_header(&session).await
            } else if cookie {
                validator.validate_cookie(&session).await
            } else {
                validator.validate(&session).await
            };
            validator.close().await;

            let result = outcome.context(CliError::Validation)?;
            print_json(&result)?;
            Ok(if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
        Command::Decrypt { cookie, key } => {
            let key = match key {
                Some(key) => key,
                None => std::env::var("SESSIONBRIDGE__APP_KEY").map_err(|_| CliError::MissingKey)?,
            };
            let key = AppKey::parse(&key).context(CliError::Decrypt)?;
            let session_id =
                sessionbridge_cookie::decrypt(&cookie, &key).context(CliError::Decrypt)?;
            println!("{session_id}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Decode { payload } => {
            let session = SessionDecoder::default()
                .decode(&payload)
                .context(CliError::Decode)?;
            print_json(&Value::Array(session.entries().clone()))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), Report<CliError>> {
    let json = serde_json::to_string_pretty(value).map_err(|e| CliError::Output {
        details: e.to_string(),
    })?;
    println!("{json}");
    Ok(())
}
