//! Authentication command definitions.

use crate::commands::params::{
    format_parameter, format_pretty_parameter, format_with_headers_parameter, no_save_parameter,
    password_parameter, COMMAND_AUTH, COMMAND_CLEAR_TOKEN, COMMAND_EXPIRATION, COMMAND_LOGIN, COMMAND_LOGOUT,
    COMMAND_TOKEN,
};
use clap::Command;

/// Create the authentication command with all its subcommands.
pub fn auth_command() -> Command {
    Command::new(COMMAND_AUTH)
        .about("Authentication operations")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_LOGIN)
                .about("Store the password in the keyring and obtain a fresh token")
                .arg(password_parameter())
                .arg(no_save_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_LOGOUT).about("Forget the stored password and the cached token"),
        )
        .subcommand(
            Command::new(COMMAND_TOKEN)
                .about("Print a valid token, authenticating only when the cache has none")
                .arg(format_parameter())
                .arg(format_pretty_parameter())
                .arg(format_with_headers_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_EXPIRATION)
                .about("Show the expiration time of the cached token")
                .arg(format_parameter())
                .arg(format_pretty_parameter())
                .arg(format_with_headers_parameter()),
        )
        .subcommand(Command::new(COMMAND_CLEAR_TOKEN).about("Clear the cached token"))
}
