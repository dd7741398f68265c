//! Range and consistency checks for a parsed [`Config`].

use anyhow::{Context, Result, bail};
use chrono_tz::Tz;

use super::Config;
use crate::common::constants::*;
use crate::schedule::BlindMode;

pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(interval) = config.tick_interval
        && !(MINIMUM_TICK_INTERVAL..=MAXIMUM_TICK_INTERVAL).contains(&interval)
    {
        bail!(
            "tick_interval ({} s) must be between {} and {} seconds",
            interval,
            MINIMUM_TICK_INTERVAL,
            MAXIMUM_TICK_INTERVAL
        );
    }

    if let Some(name) = config.timezone.as_deref() {
        name.parse::<Tz>()
            .map_err(|_| anyhow::anyhow!("timezone '{name}' is not a known IANA zone"))?;
    }

    if let Some(lat) = config.latitude
        && !(-90.0..=90.0).contains(&lat)
    {
        bail!("latitude must be between -90 and 90 degrees (got {})", lat);
    }
    if let Some(lon) = config.longitude
        && !(-180.0..=180.0).contains(&lon)
    {
        bail!(
            "longitude must be between -180 and 180 degrees (got {})",
            lon
        );
    }
    if config.latitude.is_some() != config.longitude.is_some() {
        bail!("latitude and longitude must be configured together");
    }

    if let Some(temp) = config.desired_temp
        && !(MINIMUM_DESIRED_TEMP..=MAXIMUM_DESIRED_TEMP).contains(&temp)
    {
        bail!(
            "desired_temp ({}°C) must be between {}°C and {}°C",
            temp,
            MINIMUM_DESIRED_TEMP,
            MAXIMUM_DESIRED_TEMP
        );
    }
    for (key, value) in [
        ("internal_temp", config.internal_temp),
        ("external_temp", config.external_temp),
    ] {
        if let Some(temp) = value
            && !(MINIMUM_SENSOR_TEMP..=MAXIMUM_SENSOR_TEMP).contains(&temp)
        {
            bail!(
                "{} ({}°C) must be between {}°C and {}°C",
                key,
                temp,
                MINIMUM_SENSOR_TEMP,
                MAXIMUM_SENSOR_TEMP
            );
        }
    }
    if let Some(cover) = config.cloud_cover
        && !(0.0..=100.0).contains(&cover)
    {
        bail!("cloud_cover ({}%) must be between 0% and 100%", cover);
    }

    config.microstep().context("Invalid microstep setting")?;
    if let Some(factor) = config.backlash_correction
        && !(MINIMUM_BACKLASH_CORRECTION..=MAXIMUM_BACKLASH_CORRECTION).contains(&factor)
    {
        bail!(
            "backlash_correction ({}) must be between {} and {}",
            factor,
            MINIMUM_BACKLASH_CORRECTION,
            MAXIMUM_BACKLASH_CORRECTION
        );
    }

    BlindMode::from_parts(config.default_mode(), config.default_position)
        .context("Invalid default_mode/default_position")?;

    Ok(())
}
