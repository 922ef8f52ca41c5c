//! `hookrelay` forwards event payloads to rate-limited chat webhooks.
//!
//! The hookrelay binary is a wrapper around hookrelay-lib, which provides
//! ordered, rate-limit aware delivery of webhook messages.
//!
//! List the webhooks to relay to in a `hookrelay.toml`:
//!
//! ```toml
//! [[destinations]]
//! name = "team-chat"
//! id = "1234"
//! token = "s3cr3t"
//! ```
//!
//! Then pipe an event into it:
//!
//! ```sh
//! cat push-event.json | hookrelay
//! ```
//!
//! Or read the event from a file, with an extra header for every message:
//!
//! ```sh
//! hookrelay --header 'X-GitHub-Event: push' push-event.json
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::fs;
use std::io::{self, ErrorKind};
use std::path::PathBuf;

use anyhow::{Context, Error, Result, bail};
use clap::{Parser, crate_version};
use hookrelay_lib::{MessageFormatter, PassThrough, RelaySummary, relay};
use http::HeaderMap;
use http::header::{CONTENT_TYPE, HeaderValue};
use log::error;
use logging::init_logging;

#[cfg(feature = "native-tls")]
use openssl_sys as _; // required for vendored-openssl feature

use options::{HOOKRELAY_CONFIG_FILE, HeaderMapExt, STDIN};

mod dispatcher;
mod logging;
mod options;
mod verbosity;

use crate::options::{Config, HookrelayOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator, e.g. an unreadable payload.
    #[allow(unused)]
    UnexpectedFailure = 1,
    DeliveryFailure = 2,
    ConfigFile = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    // See: https://doc.rust-lang.org/stable/std/process/fn.exit.html
    let exit_code = run_main()?;
    std::process::exit(exit_code);
}

/// Merge all provided config options into one.
/// This includes a potential config file, command-line- and environment variables
fn load_config() -> Result<HookrelayOptions> {
    let mut opts = HookrelayOptions::parse();

    init_logging(&opts.config.verbose);

    // Load a potentially existing config file and merge it into the config from
    // the CLI
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // If no config file was explicitly provided, we try to load the default
        // config file from the current directory if the file exits. This will
        // raise an error if the file is invalid, just like the explicit provided
        // config file.
        let default_config = PathBuf::from(HOOKRELAY_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    if opts.config.destinations.is_empty() {
        bail!("No destinations configured. Add a `[[destinations]]` table to `{HOOKRELAY_CONFIG_FILE}`");
    }

    Ok(opts)
}

/// Set up runtime and call hookrelay entrypoint
fn run_main() -> Result<i32> {
    use std::process::exit;

    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!(
                "Error while loading config: {e}\n\
                See: https://github.com/hookrelay/hookrelay/blob/hookrelay-v{}/hookrelay.example.toml",
                crate_version!()
            );
            exit(ExitCode::ConfigFile as i32);
        }
    };

    let runtime = tokio::runtime::Runtime::new()?;

    match runtime.block_on(run(&opts)) {
        Err(e) if Some(ErrorKind::BrokenPipe) == underlying_io_error_kind(&e) => {
            exit(ExitCode::Success as i32);
        }
        res => res,
    }
}

/// Check if the given error can be traced back to an `io::ErrorKind`
/// This is helpful for troubleshooting the root cause of an error.
/// Code is taken from the anyhow documentation.
fn underlying_io_error_kind(error: &Error) -> Option<io::ErrorKind> {
    for cause in error.chain() {
        if let Some(io_error) = cause.downcast_ref::<io::Error>() {
            return Some(io_error.kind());
        }
    }
    None
}

/// Read the raw event payload from a file or stdin
fn read_payload(source: &str) -> Result<String> {
    if source == STDIN {
        io::read_to_string(io::stdin()).context("Cannot read event payload from stdin")
    } else {
        fs::read_to_string(source).with_context(|| format!("Cannot read event payload from `{source}`"))
    }
}

/// Relay the payload to all configured destinations
async fn run(opts: &HookrelayOptions) -> Result<i32> {
    let event = read_payload(&opts.payload)?;
    let bodies = PassThrough.format(&event)?;

    let mut headers = HeaderMap::from_header_pairs(&opts.config.header)?;
    headers
        .entry(CONTENT_TYPE)
        .or_insert(HeaderValue::from_static("application/json"));

    let dispatcher = dispatcher::create(&opts.config)?;
    let summary = relay(&dispatcher, &opts.config.destinations, &bodies, &headers).await;
    print_summary(&summary);

    let exit_code = if summary.is_success() {
        ExitCode::Success
    } else {
        ExitCode::DeliveryFailure
    };
    Ok(exit_code as i32)
}

fn print_summary(summary: &RelaySummary) {
    for (name, e) in &summary.failed {
        println!("✗ {name}: {e}");
    }
    println!(
        "{} delivered, {} failed",
        summary.delivered,
        summary.failed.len()
    );
}
