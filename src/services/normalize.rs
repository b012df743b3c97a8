//! Assemble the canonical weather shape from resolver, fetcher and
//! aggregator output.

use chrono::{NaiveDateTime, Timelike};

use crate::db::models::{HourlyData, NewWeatherRecord};
use crate::services::aggregate::{
    at_hour_offset, mean, mean_or_none, select_temperature, TemperatureKind,
};
use crate::services::geocoding::GeoLocation;
use crate::services::open_meteo::RawForecast;

/// Normalized weather for one city/day, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    pub city: String,
    pub country: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub date: NaiveDateTime,
    pub temperature: f64,
    pub temperature_kind: TemperatureKind,
    pub precipitation: f64,
    pub wind_speed: f64,
    pub weathercode: i32,
    pub humidity: Option<f64>,
    pub sunrise: Option<NaiveDateTime>,
    pub sunset: Option<NaiveDateTime>,
    pub hourly_data: HourlyData,
    pub daily: Option<serde_json::Value>,
}

impl WeatherSnapshot {
    /// Convert into a storable record under the given country code.
    pub fn into_new_record(self, country: String) -> NewWeatherRecord {
        NewWeatherRecord {
            city: self.city,
            country,
            latitude: self.latitude,
            longitude: self.longitude,
            date: self.date,
            temperature: self.temperature,
            precipitation: self.precipitation,
            wind_speed: self.wind_speed,
            weathercode: Some(self.weathercode),
            humidity: self.humidity,
            sunrise: self.sunrise,
            sunset: self.sunset,
            hourly_data: Some(self.hourly_data),
            daily_forecast: self.daily,
        }
    }
}

/// Humidity is the mean relative humidity, `None` when the series is empty.
pub fn derive_humidity(hourly: Option<&HourlyData>) -> Option<f64> {
    hourly.and_then(|h| mean_or_none(&h.relative_humidity_2m))
}

/// Build a snapshot. `now` is the caller's local wall-clock time; its date
/// decides current-vs-average and its hour indexes the weather-code series.
pub fn normalize(
    city: &str,
    country_hint: Option<&str>,
    date: NaiveDateTime,
    location: &GeoLocation,
    raw: RawForecast,
    now: NaiveDateTime,
) -> WeatherSnapshot {
    let hourly = raw.hourly.clone();

    let selected = select_temperature(
        date.date(),
        now.date(),
        raw.live_temperature(),
        &hourly.temperature_2m,
    );

    let codes: Vec<Option<f64>> = hourly
        .weathercode
        .iter()
        .map(|code| code.map(f64::from))
        .collect();
    let weathercode = at_hour_offset(&codes, now.hour() as usize)
        .map(|code| code.round() as i32)
        .unwrap_or(0);

    let country = location
        .country_code
        .clone()
        .or_else(|| country_hint.map(|c| c.trim().to_uppercase()))
        .filter(|c| !c.is_empty());

    WeatherSnapshot {
        city: city.trim().to_string(),
        country,
        latitude: location.latitude,
        longitude: location.longitude,
        date,
        temperature: selected.value,
        temperature_kind: selected.kind,
        precipitation: mean(&hourly.precipitation),
        wind_speed: mean(&hourly.wind_speed_10m),
        weathercode,
        humidity: derive_humidity(Some(&hourly)),
        sunrise: raw.first_daily_timestamp("sunrise"),
        sunset: raw.first_daily_timestamp("sunset"),
        hourly_data: hourly,
        daily: raw.daily,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::parse_datetime;

    fn at(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    fn paris() -> GeoLocation {
        GeoLocation {
            latitude: 48.8566,
            longitude: 2.3522,
            country_code: Some("FR".to_string()),
        }
    }

    fn raw(value: serde_json::Value) -> RawForecast {
        serde_json::from_value(value).unwrap()
    }

    fn full_raw() -> RawForecast {
        raw(serde_json::json!({
            "current_weather": { "temperature": 20.0 },
            "hourly": {
                "time": ["2025-05-09T00:00", "2025-05-09T01:00", "2025-05-09T02:00"],
                "temperature_2m": [10.0, 12.0, 14.0],
                "precipitation": [0.0, 0.3, 0.6],
                "weathercode": [0, 61, 3],
                "wind_speed_10m": [4.0, 5.0, 6.0],
                "relative_humidity_2m": [70.0, 80.0, 90.0]
            },
            "daily": {
                "sunrise": ["2025-05-09T06:12", "2025-05-10T06:11"],
                "sunset": ["2025-05-09T21:17", "2025-05-10T21:18"]
            }
        }))
    }

    #[test]
    fn test_normalize_today_uses_live_reading() {
        let snapshot = normalize(
            "Paris",
            Some("FR"),
            at("2025-05-09"),
            &paris(),
            full_raw(),
            at("2025-05-09T01:30:00"),
        );

        assert_eq!(snapshot.temperature, 20.0);
        assert_eq!(snapshot.temperature_kind, TemperatureKind::Current);
        assert!((snapshot.precipitation - 0.3).abs() < 1e-10);
        assert_eq!(snapshot.wind_speed, 5.0);
        assert_eq!(snapshot.weathercode, 61);
        assert_eq!(snapshot.humidity, Some(80.0));
        assert_eq!(snapshot.sunrise, Some(at("2025-05-09T06:12")));
        assert_eq!(snapshot.sunset, Some(at("2025-05-09T21:17")));
        assert_eq!(snapshot.country.as_deref(), Some("FR"));
        assert_eq!(
            snapshot.hourly_data.temperature_2m,
            vec![Some(10.0), Some(12.0), Some(14.0)]
        );
    }

    #[test]
    fn test_normalize_future_date_uses_average() {
        let snapshot = normalize(
            "Paris",
            None,
            at("2025-05-12"),
            &paris(),
            full_raw(),
            at("2025-05-09T10:00:00"),
        );
        assert_eq!(snapshot.temperature_kind, TemperatureKind::Average);
        assert!((snapshot.temperature - 12.0).abs() < 1e-10);
        // Hour 10 is out of bounds: mean of the first day's codes.
        assert_eq!(snapshot.weathercode, 21);
    }

    #[test]
    fn test_normalize_sparse_payload_uses_defaults() {
        let sparse = raw(serde_json::json!({
            "hourly": { "time": ["2025-05-09T00:00"] }
        }));
        let snapshot = normalize(
            "Oslo",
            Some("no"),
            at("2025-05-12"),
            &GeoLocation {
                latitude: 59.9,
                longitude: 10.7,
                country_code: None,
            },
            sparse,
            at("2025-05-09T08:00:00"),
        );
        assert_eq!(snapshot.temperature, 0.0);
        assert_eq!(snapshot.precipitation, 0.0);
        assert_eq!(snapshot.wind_speed, 0.0);
        assert_eq!(snapshot.weathercode, 0);
        assert_eq!(snapshot.humidity, None);
        assert_eq!(snapshot.sunrise, None);
        assert_eq!(snapshot.daily, None);
        assert_eq!(snapshot.country.as_deref(), Some("NO"));
    }

    #[test]
    fn test_normalize_tolerates_null_hours() {
        let gappy = raw(serde_json::json!({
            "hourly": {
                "time": ["2025-05-09T00:00", "2025-05-09T01:00", "2025-05-09T02:00"],
                "temperature_2m": [10.0, null, 14.0],
                "precipitation": [null, null, null],
                "weathercode": [2, null, 4],
                "wind_speed_10m": [4.0, 6.0, null],
                "relative_humidity_2m": [80.0, null, null]
            }
        }));
        let snapshot = normalize(
            "Paris",
            Some("FR"),
            at("2025-05-12"),
            &paris(),
            gappy,
            at("2025-05-09T01:00:00"),
        );
        assert_eq!(snapshot.temperature, 12.0);
        assert_eq!(snapshot.precipitation, 0.0);
        assert_eq!(snapshot.wind_speed, 5.0);
        assert_eq!(snapshot.humidity, Some(80.0));
        // Null at hour 1: mean of the present codes.
        assert_eq!(snapshot.weathercode, 3);
        assert_eq!(snapshot.hourly_data.weathercode, vec![Some(2), None, Some(4)]);
    }

    #[test]
    fn test_derive_humidity() {
        assert_eq!(derive_humidity(None), None);
        assert_eq!(derive_humidity(Some(&HourlyData::default())), None);
        let hourly = HourlyData {
            relative_humidity_2m: vec![Some(50.0), Some(60.0)],
            ..Default::default()
        };
        assert_eq!(derive_humidity(Some(&hourly)), Some(55.0));
    }

    #[test]
    fn test_into_new_record_keeps_series() {
        let snapshot = normalize(
            "Paris",
            Some("FR"),
            at("2025-05-09"),
            &paris(),
            full_raw(),
            at("2025-05-09T00:00:00"),
        );
        let record = snapshot.into_new_record("FR".to_string());
        assert_eq!(record.weathercode, Some(0));
        assert_eq!(record.hourly_data.map(|h| h.time.len()), Some(3));
        assert!(record.daily_forecast.is_some());
    }
}
