use clap::ArgMatches;
use k5c::{
    actions::{api, auth, config},
    commands::{
        COMMAND_API, COMMAND_AUTH, COMMAND_CLEAR_TOKEN, COMMAND_CONFIG, COMMAND_DELETE,
        COMMAND_EXPIRATION, COMMAND_EXPORT, COMMAND_GET, COMMAND_LOGIN, COMMAND_LOGOUT,
        COMMAND_PATH, COMMAND_POST, COMMAND_PUT, COMMAND_SET, COMMAND_TOKEN,
    },
    configuration::Configuration,
    error::CliError,
};
use reqwest::Method;
use tracing::trace;

fn extract_subcommand_name(sub_matches: &ArgMatches) -> String {
    let message = match sub_matches.subcommand() {
        Some(m) => m.0,
        None => "unknown",
    };

    message.to_string()
}

pub async fn execute_command(matches: ArgMatches) -> Result<(), CliError> {
    let mut configuration = Configuration::load_default()?;
    trace!("Configuration: {:?}", configuration);

    match matches.subcommand() {
        Some((COMMAND_AUTH, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_LOGIN, sub_matches)) => {
                Ok(auth::login(&configuration, sub_matches).await?)
            }
            Some((COMMAND_LOGOUT, _)) => Ok(auth::logout(&configuration).await?),
            Some((COMMAND_TOKEN, sub_matches)) => {
                Ok(auth::print_token(&configuration, sub_matches).await?)
            }
            Some((COMMAND_EXPIRATION, sub_matches)) => {
                Ok(auth::print_expiration(&configuration, sub_matches).await?)
            }
            Some((COMMAND_CLEAR_TOKEN, _)) => Ok(auth::clear_token(&configuration).await?),
            _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                sub_matches,
            ))),
        },
        Some((COMMAND_CONFIG, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_GET, sub_matches)) => match sub_matches.subcommand() {
                Some((COMMAND_PATH, _)) => Ok(config::print_configuration_path()?),
                None => Ok(config::print_configuration(&configuration, sub_matches)?),
                _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                    sub_matches,
                ))),
            },
            Some((COMMAND_SET, sub_matches)) => {
                Ok(config::set_configuration(&mut configuration, sub_matches)?)
            }
            Some((COMMAND_EXPORT, sub_matches)) => {
                Ok(config::export_configuration(&configuration, sub_matches)?)
            }
            _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                sub_matches,
            ))),
        },
        Some((COMMAND_API, sub_matches)) => match sub_matches.subcommand() {
            Some((COMMAND_GET, sub_matches)) => {
                Ok(api::call(&configuration, Method::GET, sub_matches).await?)
            }
            Some((COMMAND_POST, sub_matches)) => {
                Ok(api::call(&configuration, Method::POST, sub_matches).await?)
            }
            Some((COMMAND_PUT, sub_matches)) => {
                Ok(api::call(&configuration, Method::PUT, sub_matches).await?)
            }
            Some((COMMAND_DELETE, sub_matches)) => {
                Ok(api::call(&configuration, Method::DELETE, sub_matches).await?)
            }
            _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
                sub_matches,
            ))),
        },
        _ => Err(CliError::UnsupportedSubcommand(extract_subcommand_name(
            &matches,
        ))),
    }
}
