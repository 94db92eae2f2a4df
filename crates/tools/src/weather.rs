//! Canned weather lookup.
//!
//! Serves a small fixed table of cities so the agent loop can be exercised
//! without a real weather backend.

use async_trait::async_trait;

use loopwright_core::{ParamSpec, Tool, ToolError};

const WEATHER_DB: &[(&str, i64, &str, &str)] = &[
    ("tokyo", 25, "sunny", "low"),
    ("paris", 18, "cloudy", "moderate"),
    ("london", 15, "rainy", "high"),
    ("new york", 22, "clear", "moderate"),
    ("toronto", 16, "partly cloudy", "moderate"),
];

/// `get_current_weather` — temperature, condition, and humidity for a city.
pub struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_current_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather conditions for a city"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::string("city", "The city name, e.g. 'Tokyo'")
                .required()
                .alias("location"),
            ParamSpec::enumerated(
                "unit",
                "Temperature unit to report in",
                ["celsius", "fahrenheit"],
            ),
        ]
    }

    async fn call(
        &self,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<serde_json::Value, ToolError> {
        let city = arguments
            .get("city")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let unit = arguments
            .get("unit")
            .and_then(|v| v.as_str())
            .unwrap_or("celsius");

        let Some(&(_, temp_c, condition, humidity)) = WEATHER_DB
            .iter()
            .find(|(name, ..)| *name == city.to_lowercase())
        else {
            return Ok(serde_json::json!({
                "error": format!("Weather data not available for {city}")
            }));
        };

        let (temperature, symbol) = if unit == "fahrenheit" {
            (temp_c * 9 / 5 + 32, "°F")
        } else {
            (temp_c, "°C")
        };

        Ok(serde_json::json!({
            "city": city,
            "temperature": format!("{temperature}{symbol}"),
            "condition": condition,
            "humidity": humidity,
            "unit": unit,
        }))
    }
}
