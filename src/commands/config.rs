//! Configuration command definitions.

use crate::commands::params::{
    domain_id_parameter, domain_name_parameter, expiry_offset_parameter, format_parameter,
    format_pretty_parameter, format_with_headers_parameter, output_file_parameter,
    project_id_parameter, region_parameter, safety_margin_parameter, username_parameter,
    COMMAND_CONFIG, COMMAND_EXPORT, COMMAND_GET, COMMAND_PATH, COMMAND_SET,
};
use clap::Command;

/// Create the config command with all its subcommands.
pub fn config_command() -> Command {
    Command::new(COMMAND_CONFIG)
        .about("Configuration management")
        .subcommand_required(true)
        .subcommand(
            Command::new(COMMAND_GET)
                .about("Get configuration details")
                .arg(format_parameter())
                .arg(format_pretty_parameter())
                .arg(format_with_headers_parameter())
                .subcommand(Command::new(COMMAND_PATH).about("Show configuration file path")),
        )
        .subcommand(
            Command::new(COMMAND_SET)
                .about("Update configuration properties")
                .arg(domain_name_parameter())
                .arg(domain_id_parameter())
                .arg(project_id_parameter())
                .arg(username_parameter())
                .arg(region_parameter())
                .arg(safety_margin_parameter())
                .arg(expiry_offset_parameter()),
        )
        .subcommand(
            Command::new(COMMAND_EXPORT)
                .about("Export configuration to file")
                .arg(output_file_parameter()),
        )
}
