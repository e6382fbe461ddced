use chrono::{DateTime, NaiveDate, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};

use crate::model::Coordinate;

/// Astronomical sunrise and sunset for a coordinate. Polar day/night and
/// invalid coordinates fall back to 06:00 and 19:00 UTC.
pub fn sunrise_sunset(at: Coordinate, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let fallback = |h: u32| date.and_hms_opt(h, 0, 0).unwrap_or_default().and_utc();

    let Some(coordinates) = Coordinates::new(at.latitude, at.longitude) else {
        return (fallback(6), fallback(19));
    };

    let solar_day = SolarDay::new(coordinates, date);
    let sunrise = solar_day
        .event_time(SolarEvent::Sunrise)
        .unwrap_or_else(|| fallback(6));
    let sunset = solar_day
        .event_time(SolarEvent::Sunset)
        .unwrap_or_else(|| fallback(19));

    (sunrise, sunset)
}
