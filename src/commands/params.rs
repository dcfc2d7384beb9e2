//! Shared command parameters for all CLI commands.
//!
//! Parameter names and common argument definitions live here so that the
//! command modules and the actions agree on them.

use crate::format::{FormattingError, OutputFormat, OutputFormatOptions};
use clap::{Arg, ArgAction, ArgMatches};
use std::path::PathBuf;
use tracing::trace;

// Command groups
pub const COMMAND_AUTH: &str = "auth";
pub const COMMAND_CONFIG: &str = "config";
pub const COMMAND_API: &str = "api";

// Auth commands
pub const COMMAND_LOGIN: &str = "login";
pub const COMMAND_LOGOUT: &str = "logout";
pub const COMMAND_TOKEN: &str = "token";
pub const COMMAND_EXPIRATION: &str = "expiration";
pub const COMMAND_CLEAR_TOKEN: &str = "clear-token";

// Config commands
pub const COMMAND_GET: &str = "get";
pub const COMMAND_SET: &str = "set";
pub const COMMAND_EXPORT: &str = "export";
pub const COMMAND_PATH: &str = "path";

// Api commands
pub const COMMAND_POST: &str = "post";
pub const COMMAND_PUT: &str = "put";
pub const COMMAND_DELETE: &str = "delete";

// Parameter names
pub const PARAMETER_VERBOSE: &str = "verbose";
pub const PARAMETER_FORMAT: &str = "format";
pub const PARAMETER_PRETTY: &str = "pretty";
pub const PARAMETER_HEADERS: &str = "headers";
pub const PARAMETER_OUTPUT: &str = "output";
pub const PARAMETER_PASSWORD: &str = "password";
pub const PARAMETER_DOMAIN_NAME: &str = "domain-name";
pub const PARAMETER_DOMAIN_ID: &str = "domain-id";
pub const PARAMETER_PROJECT_ID: &str = "project-id";
pub const PARAMETER_USERNAME: &str = "username";
pub const PARAMETER_REGION: &str = "region";
pub const PARAMETER_SAFETY_MARGIN: &str = "safety-margin";
pub const PARAMETER_EXPIRY_OFFSET: &str = "expiry-offset";
pub const PARAMETER_NO_SAVE: &str = "no-save";
pub const PARAMETER_RESOURCE_PATH: &str = "resource-path";
pub const PARAMETER_BODY: &str = "body";

/// Create the output format parameter.
pub fn format_parameter() -> Arg {
    Arg::new(PARAMETER_FORMAT)
        .short('f')
        .long(PARAMETER_FORMAT)
        .num_args(1)
        .required(false)
        .env("K5C_FORMAT")
        .default_value("json")
        .help("Output data format")
        .value_parser(OutputFormat::names())
}

pub fn format_pretty_parameter() -> Arg {
    Arg::new(PARAMETER_PRETTY)
        .long(PARAMETER_PRETTY)
        .action(ArgAction::SetTrue)
        .required(false)
        .help("Format the output pretty")
}

pub fn format_with_headers_parameter() -> Arg {
    Arg::new(PARAMETER_HEADERS)
        .long(PARAMETER_HEADERS)
        .action(ArgAction::SetTrue)
        .required(false)
        .env("K5C_HEADERS")
        .help("Format the output with headers")
}

pub fn output_file_parameter() -> Arg {
    Arg::new(PARAMETER_OUTPUT)
        .short('o')
        .long(PARAMETER_OUTPUT)
        .num_args(1)
        .required(true)
        .help("Output file path")
        .value_parser(clap::value_parser!(PathBuf))
}

/// The password is optional; when omitted the user is prompted for it.
pub fn password_parameter() -> Arg {
    Arg::new(PARAMETER_PASSWORD)
        .long(PARAMETER_PASSWORD)
        .num_args(1)
        .required(false)
        .help("Password of the K5 user (prompted for when omitted)")
}

pub fn no_save_parameter() -> Arg {
    Arg::new(PARAMETER_NO_SAVE)
        .long(PARAMETER_NO_SAVE)
        .action(ArgAction::SetTrue)
        .required(false)
        .help("Do not store the password in the keyring")
}

pub fn domain_name_parameter() -> Arg {
    Arg::new(PARAMETER_DOMAIN_NAME)
        .long(PARAMETER_DOMAIN_NAME)
        .num_args(1)
        .required(false)
        .help("Contract (domain) name")
}

pub fn domain_id_parameter() -> Arg {
    Arg::new(PARAMETER_DOMAIN_ID)
        .long(PARAMETER_DOMAIN_ID)
        .num_args(1)
        .required(false)
        .help("Contract (domain) ID")
}

pub fn project_id_parameter() -> Arg {
    Arg::new(PARAMETER_PROJECT_ID)
        .long(PARAMETER_PROJECT_ID)
        .num_args(1)
        .required(false)
        .help("Project ID the token is scoped to")
}

pub fn username_parameter() -> Arg {
    Arg::new(PARAMETER_USERNAME)
        .long(PARAMETER_USERNAME)
        .num_args(1)
        .required(false)
        .help("User name")
}

pub fn region_parameter() -> Arg {
    Arg::new(PARAMETER_REGION)
        .long(PARAMETER_REGION)
        .num_args(1)
        .required(false)
        .help("Region, e.g. jp-east-1")
}

pub fn safety_margin_parameter() -> Arg {
    Arg::new(PARAMETER_SAFETY_MARGIN)
        .long(PARAMETER_SAFETY_MARGIN)
        .num_args(1)
        .required(false)
        .help("Seconds before expiry at which a token stops being used")
        .value_parser(clap::value_parser!(u64))
}

pub fn expiry_offset_parameter() -> Arg {
    Arg::new(PARAMETER_EXPIRY_OFFSET)
        .long(PARAMETER_EXPIRY_OFFSET)
        .num_args(1)
        .required(false)
        .allow_negative_numbers(true)
        .help("Seconds added to the service's expiry timestamp before comparison")
        .value_parser(clap::value_parser!(i64))
}

/// Path of the networking API resource, relative to the regional endpoint.
pub fn resource_path_parameter() -> Arg {
    Arg::new(PARAMETER_RESOURCE_PATH)
        .num_args(1)
        .required(true)
        .help("Resource path, e.g. /v2.0/networks")
}

/// JSON request body: a file path, or `-` for stdin.
pub fn body_parameter() -> Arg {
    Arg::new(PARAMETER_BODY)
        .short('b')
        .long(PARAMETER_BODY)
        .num_args(1)
        .required(true)
        .help("File holding the JSON request body, or - to read it from stdin")
        .value_parser(clap::value_parser!(PathBuf))
}

/// Resolve the output format from the format, pretty and headers arguments.
///
/// Not every command defines all three; missing flags count as off.
pub fn get_format_parameter_value(
    sub_matches: &ArgMatches,
) -> Result<OutputFormat, FormattingError> {
    let format = sub_matches
        .try_get_one::<String>(PARAMETER_FORMAT)
        .ok()
        .flatten()
        .map(String::as_str)
        .unwrap_or(crate::format::JSON);
    let options = OutputFormatOptions {
        with_headers: flag(sub_matches, PARAMETER_HEADERS),
        pretty: flag(sub_matches, PARAMETER_PRETTY),
    };

    trace!("Format: {} ({:?})", format, options);
    OutputFormat::from_string_with_options(format, options)
}

fn flag(sub_matches: &ArgMatches, name: &str) -> bool {
    sub_matches
        .try_get_one::<bool>(name)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false)
}
