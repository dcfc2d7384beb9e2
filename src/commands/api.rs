//! Networking API pass-through command definitions.

use crate::commands::params::{
    body_parameter, format_pretty_parameter, resource_path_parameter, COMMAND_API, COMMAND_DELETE,
    COMMAND_GET, COMMAND_POST, COMMAND_PUT,
};
use clap::Command;

pub fn api_command() -> Command {
    Command::new(COMMAND_API)
        .about("Call the networking API with the cached token")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_GET)
                .about("Send a GET request")
                .arg(resource_path_parameter())
                .arg(format_pretty_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_POST)
                .about("Send a POST request with a JSON body")
                .arg(resource_path_parameter())
                .arg(body_parameter())
                .arg(format_pretty_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_PUT)
                .about("Send a PUT request with a JSON body")
                .arg(resource_path_parameter())
                .arg(body_parameter())
                .arg(format_pretty_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_DELETE)
                .about("Send a DELETE request")
                .arg(resource_path_parameter())
                .arg(format_pretty_parameter()),
        )
}
