//! Human-readable rendering.

use treasure_core::{Proximity, Sighting, WeatherResponse};

pub fn weather(reading: &WeatherResponse) -> String {
    format!(
        "{location}  ({time} UTC, via {provider})\n\
         {condition}\n\
         Temperature: {temp:.1}°C (feels like {feels:.1}°C)\n\
         Humidity:    {humidity}%\n\
         Wind:        {wind:.1} m/s",
        location = reading.location_name,
        time = reading.observation_time.format("%Y-%m-%d %H:%M"),
        provider = reading.provider,
        condition = capitalize(&reading.condition),
        temp = reading.temperature_c,
        feels = reading.feels_like_c,
        humidity = reading.humidity_pct,
        wind = reading.wind_speed_mps,
    )
}

pub fn sighting(sighting: &Sighting<'_>) -> String {
    let marker = match sighting.proximity {
        Proximity::Found => "***",
        Proximity::Hot => "!!",
        Proximity::Warm => "~",
        Proximity::Cold => ".",
    };

    format!(
        "{marker:<3} {name:<20} {distance:>10}  {proximity}",
        name = sighting.treasure.name,
        distance = distance(sighting.distance_m),
        proximity = sighting.proximity,
    )
}

/// Meters below 1 km, kilometers above.
pub fn distance(meters: f64) -> String {
    if meters < 1_000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.2} km", meters / 1_000.0)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
