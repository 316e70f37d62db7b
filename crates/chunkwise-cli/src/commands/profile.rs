//! Profile command implementation.

use crate::cli::{ProfileAction, ProfileArgs};
use crate::config::{Config, Profile};
use crate::error::{CliError, Result};
use crate::output::Formatter;

/// Execute the profile command.
pub fn execute_profile(args: ProfileArgs, config: &mut Config, formatter: &Formatter) -> Result<()> {
    match args.action {
        ProfileAction::List => list_profiles(config, formatter),
        ProfileAction::Show => show_active_profile(config, formatter),
        ProfileAction::Switch { name } => switch_profile(config, name, formatter),
        ProfileAction::Set {
            name,
            endpoint,
            model,
            max_tokens,
        } => set_profile(
            config,
            name,
            Profile {
                endpoint,
                model,
                max_tokens,
            },
            formatter,
        ),
        ProfileAction::Delete { name } => delete_profile(config, name, formatter),
    }
}

/// List all profiles.
fn list_profiles(config: &Config, formatter: &Formatter) -> Result<()> {
    if config.profiles.is_empty() {
        println!("{}", formatter.info("No profiles configured"));
        return Ok(());
    }

    println!("Available profiles:");
    for (name, profile) in &config.profiles {
        if name == &config.active_profile {
            println!("* {}", formatter.success(name));
        } else {
            println!("  {}", name);
        }
        print_profile(profile, "    ");
    }

    Ok(())
}

/// Show the active profile.
fn show_active_profile(config: &Config, formatter: &Formatter) -> Result<()> {
    let profile = config.backend_profile()?;

    println!("Active profile: {}", formatter.success(&config.active_profile));
    print_profile(&profile, "  ");

    Ok(())
}

fn print_profile(profile: &Profile, indent: &str) {
    println!("{}Endpoint: {}", indent, profile.endpoint);
    println!("{}Model: {}", indent, profile.model);
    if let Some(max_tokens) = profile.max_tokens {
        println!("{}Max tokens: {}", indent, max_tokens);
    }
}

/// Switch to a different profile.
fn switch_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    config.switch_profile(name.clone())?;
    config.save()?;
    println!("{}", formatter.success(&format!("Switched to profile '{}'", name)));
    Ok(())
}

/// Create or update a profile.
fn set_profile(config: &mut Config, name: String, profile: Profile, formatter: &Formatter) -> Result<()> {
    let action = if config.profiles.contains_key(&name) {
        "Updated"
    } else {
        "Created"
    };

    config.set_profile(name.clone(), profile);
    config.save()?;

    println!("{}", formatter.success(&format!("{} profile '{}'", action, name)));

    Ok(())
}

/// Delete a profile.
fn delete_profile(config: &mut Config, name: String, formatter: &Formatter) -> Result<()> {
    if name == config.active_profile {
        return Err(CliError::NotPermitted("Cannot delete the active profile".to_string()));
    }

    if config.profiles.remove(&name).is_some() {
        config.save()?;
        println!("{}", formatter.success(&format!("Deleted profile '{}'", name)));
    } else {
        println!("{}", formatter.warning(&format!("Profile '{}' does not exist", name)));
    }

    Ok(())
}
