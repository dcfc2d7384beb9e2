use crate::actions::CliActionError;
use crate::commands::params::{
    get_format_parameter_value, PARAMETER_DOMAIN_ID, PARAMETER_DOMAIN_NAME,
    PARAMETER_EXPIRY_OFFSET, PARAMETER_OUTPUT, PARAMETER_PROJECT_ID, PARAMETER_REGION,
    PARAMETER_SAFETY_MARGIN, PARAMETER_USERNAME,
};
use crate::configuration::Configuration;
use crate::format::Formattable;
use clap::ArgMatches;
use std::path::PathBuf;
use tracing::{debug, trace};

pub fn print_configuration(
    configuration: &Configuration,
    sub_matches: &ArgMatches,
) -> Result<(), CliActionError> {
    let format = get_format_parameter_value(sub_matches)?;
    println!("{}", configuration.format(&format)?);
    Ok(())
}

pub fn print_configuration_path() -> Result<(), CliActionError> {
    let path = Configuration::get_default_configuration_file_path()?;
    println!("{}", path.display());
    Ok(())
}

/// Apply the given properties and persist the configuration.
pub fn set_configuration(
    configuration: &mut Configuration,
    sub_matches: &ArgMatches,
) -> Result<(), CliActionError> {
    let setters: [(&str, fn(&mut Configuration, &str)); 5] = [
        (PARAMETER_DOMAIN_NAME, Configuration::set_domain_name),
        (PARAMETER_DOMAIN_ID, Configuration::set_domain_id),
        (PARAMETER_PROJECT_ID, Configuration::set_project_id),
        (PARAMETER_USERNAME, Configuration::set_username),
        (PARAMETER_REGION, Configuration::set_region),
    ];

    let mut changed = false;
    for (name, setter) in setters {
        if let Some(value) = sub_matches.get_one::<String>(name) {
            trace!("Setting {} to {}", name, value);
            setter(configuration, value);
            changed = true;
        }
    }

    if let Some(seconds) = sub_matches.get_one::<u64>(PARAMETER_SAFETY_MARGIN) {
        trace!("Setting {} to {}", PARAMETER_SAFETY_MARGIN, seconds);
        configuration.set_safety_margin_seconds(*seconds);
        changed = true;
    }
    if let Some(seconds) = sub_matches.get_one::<i64>(PARAMETER_EXPIRY_OFFSET) {
        trace!("Setting {} to {}", PARAMETER_EXPIRY_OFFSET, seconds);
        configuration.set_expiry_offset_seconds(*seconds);
        changed = true;
    }

    if !changed {
        return Err(CliActionError::MissingRequiredArgument(format!(
            "at least one of --{}, --{}, --{}, --{}, --{}, --{}, --{}",
            PARAMETER_DOMAIN_NAME,
            PARAMETER_DOMAIN_ID,
            PARAMETER_PROJECT_ID,
            PARAMETER_USERNAME,
            PARAMETER_REGION,
            PARAMETER_SAFETY_MARGIN,
            PARAMETER_EXPIRY_OFFSET
        )));
    }

    // never persist settings that the next load would reject
    configuration.expiry_policy()?;
    configuration.save_to_default()?;
    debug!("Configuration saved");
    Ok(())
}

pub fn export_configuration(
    configuration: &Configuration,
    sub_matches: &ArgMatches,
) -> Result<(), CliActionError> {
    let path = sub_matches
        .get_one::<PathBuf>(PARAMETER_OUTPUT)
        .ok_or_else(|| CliActionError::MissingRequiredArgument(PARAMETER_OUTPUT.to_string()))?;
    configuration.save(path)?;
    Ok(())
}
