//! CLI command definitions and argument parsing.
//!
//! The command line interface is defined with the clap builder API, one
//! module per command group.

use clap::{Arg, ArgAction, Command};

pub mod api;
pub mod auth;
pub mod config;
pub mod params;

pub use params::{
    COMMAND_API, COMMAND_AUTH, COMMAND_CLEAR_TOKEN, COMMAND_CONFIG, COMMAND_DELETE,
    COMMAND_EXPIRATION, COMMAND_EXPORT, COMMAND_GET, COMMAND_LOGIN, COMMAND_LOGOUT, COMMAND_PATH,
    COMMAND_POST, COMMAND_PUT, COMMAND_SET, COMMAND_TOKEN, PARAMETER_VERBOSE,
};

/// Build the whole command tree.
///
/// Kept separate from parsing so the tree can be inspected in tests.
pub fn cli_command() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new(PARAMETER_VERBOSE)
                .short('v')
                .long(PARAMETER_VERBOSE)
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Enable verbose output for debugging"),
        )
        .subcommand(auth::auth_command())
        .subcommand(config::config_command())
        .subcommand(api::api_command())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tree_is_consistent() {
        cli_command().debug_assert();
    }

    #[test]
    fn test_verbose_is_global() {
        let matches = cli_command()
            .try_get_matches_from(["k5c", "auth", "expiration", "--verbose"])
            .unwrap();
        assert!(matches.get_flag(PARAMETER_VERBOSE));
    }

    #[test]
    fn test_api_requires_resource_path() {
        assert!(cli_command()
            .try_get_matches_from(["k5c", "api", "get"])
            .is_err());
    }

    #[test]
    fn test_api_post_requires_body() {
        assert!(cli_command()
            .try_get_matches_from(["k5c", "api", "post", "/v2.0/routers"])
            .is_err());
        assert!(cli_command()
            .try_get_matches_from(["k5c", "api", "put", "/v2.0/routers/r1", "--body", "-"])
            .is_ok());
    }

    #[test]
    fn test_config_set_accepts_negative_offset() {
        let matches = cli_command()
            .try_get_matches_from(["k5c", "config", "set", "--expiry-offset", "-32400"])
            .unwrap();
        let (_, config) = matches.subcommand().unwrap();
        let (_, set) = config.subcommand().unwrap();
        assert_eq!(
            set.get_one::<i64>(params::PARAMETER_EXPIRY_OFFSET),
            Some(&-32400)
        );
        assert!(cli_command()
            .try_get_matches_from(["k5c", "config", "set", "--safety-margin", "-1"])
            .is_err());
    }
}
