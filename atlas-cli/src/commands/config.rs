use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use atlas_places::CredentialSource;

use crate::CliError;

fn mask_value(s: &str) -> String {
    let prefix: String = s.chars().take(4).collect();
    if s.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

/// Show the effective provider and sync settings and where they come from.
pub(crate) fn run_config_show() -> Result<(), CliError> {
    log::info!(
        "{}",
        "atlas-media Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    crate::log_blank();

    match atlas_places::config_path() {
        Some(p) if p.exists() => log::info!(
            "  Config file: {} {}",
            p.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        ),
        Some(p) => log::info!(
            "  Config file: {} {}",
            p.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found)".if_supports_color(Stdout, |t| t.dimmed()),
        ),
        None => log::info!(
            "  Config file: {}",
            "could not determine path".if_supports_color(Stdout, |t| t.red()),
        ),
    }
    crate::log_blank();

    let source = atlas_places::credential_source();
    match atlas_places::PlacesConfig::load() {
        Ok(config) => {
            log::info!(
                "  {:<18} {} {}",
                "api_key:",
                mask_value(&config.api_key),
                format!("({})", source).if_supports_color(Stdout, |t| t.dimmed()),
            );
            log::info!("  {:<18} {}", "base_url:", config.base_url);
            log::info!("  {:<18} {}", "max_width:", config.max_width);
            log::info!(
                "  {:<18} {}ms",
                "request_interval:",
                config.request_interval.as_millis()
            );
            log::info!("  {:<18} {}s", "timeout:", config.timeout.as_secs());
        }
        Err(e) => {
            let detail = if source == CredentialSource::Missing {
                "not set".to_string()
            } else {
                e.to_string()
            };
            log::info!(
                "  {:<18} {}",
                "api_key:",
                detail.if_supports_color(Stdout, |t| t.red()),
            );
        }
    }

    let options = atlas_sync::SyncOptions::from_config();
    crate::log_blank();
    log::info!("{}", "[sync]".if_supports_color(Stdout, |t| t.bold()));
    log::info!("  {:<18} {:?}", "order:", options.selection.order);
    if !options.selection.featured.is_empty() {
        log::info!("  {:<18} {}", "featured:", options.selection.featured.join(", "));
    }
    log::info!("  {:<18} {}", "batch_size:", options.batch_size);
    log::info!("  {:<18} {}ms", "batch_delay:", options.batch_delay.as_millis());
    log::info!("  {:<18} {}", "workers:", options.effective_workers());
    log::info!("  {:<18} {}", "max_passes:", options.max_passes);
    log::info!("  {:<18} {}", "success_threshold:", options.success_threshold);
    log::info!("  {:<18} {}", "country_qualifier:", options.country_qualifier);
    log::info!(
        "  {:<18} {}",
        "trusted_hosts:",
        options.media_check.trusted_hosts.join(", ")
    );
    Ok(())
}

/// Print the config file path.
pub(crate) fn run_config_path() -> Result<(), CliError> {
    let path = atlas_places::config_path()
        .ok_or_else(|| CliError::config("Could not determine config directory"))?;
    println!("{}", path.display());
    Ok(())
}

/// Store the API key in the config file.
pub(crate) fn run_config_set_key(key: &str) -> Result<(), CliError> {
    let key = key.trim();
    if key.is_empty() {
        return Err(CliError::config("API key must not be empty"));
    }
    let path = atlas_places::save_api_key(key)
        .map_err(|e| CliError::config(format!("Failed to save API key: {}", e)))?;
    log::info!(
        "  {} API key saved to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
