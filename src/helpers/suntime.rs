use std::env;
use std::time::Duration;

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;

use crate::constants::envvars;

static LATITUDE: Lazy<Option<f64>> = Lazy::new(|| {
    env::var(envvars::LATITUDE).ok().and_then(|v| v.parse().ok())
});

static LONGITUDE: Lazy<Option<f64>> = Lazy::new(|| {
    env::var(envvars::LONGITUDE).ok().and_then(|v| v.parse().ok())
});

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SunWindow {
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

impl SunWindow {
    pub fn is_day(&self, t: DateTime<Utc>) -> bool {
        t >= self.sunrise && t < self.sunset
    }

    pub fn daylight(&self) -> Duration {
        (self.sunset - self.sunrise).to_std().unwrap_or_default()
    }
}

/// Approximate sunrise/sunset (UTC) for the given date and location, using
/// the standard sunrise equation with a fixed-axis declination model.
/// Accuracy is within a few minutes, which is plenty for day/night gating.
/// Returns `None` during polar day or polar night, or if the location is
/// not configured.
pub fn sun_window(date: NaiveDate, lat_deg: f64, lon_deg: f64) -> Option<SunWindow> {
    let n = date.ordinal() as f64;
    let declination =
        -(23.44f64.to_radians()) * ((360.0 / 365.0 * (n + 10.0)).to_radians()).cos();
    let cos_hour_angle = -(lat_deg.to_radians().tan() * declination.tan());
    if !(-1.0..=1.0).contains(&cos_hour_angle) {
        return None;
    }
    let hour_angle_deg = cos_hour_angle.acos().to_degrees();
    let solar_noon_h = 12.0 - lon_deg / 15.0;

    let midnight = Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?);
    let offset = |hours: f64| chrono::Duration::seconds((hours * 3600.0) as i64);
    Some(SunWindow {
        sunrise: midnight + offset(solar_noon_h - hour_angle_deg / 15.0),
        sunset: midnight + offset(solar_noon_h + hour_angle_deg / 15.0),
    })
}

/// Sun window for today at the location from the environment, if set.
pub fn today(now: DateTime<Utc>) -> Option<SunWindow> {
    let lat = (*LATITUDE)?;
    let lon = (*LONGITUDE)?;
    sun_window(now.date_naive(), lat, lon)
}
