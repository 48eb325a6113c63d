//! Current-weather lookup backed by wttr.in.

use serde::Deserialize;

use super::errors::ExecutionError;
use super::schema::{FieldType, ParameterSchema};
use super::tool::Tool;
use super::types::ToolOutput;

pub const WTTR_URL: &str = "https://wttr.in";

/// Condition and temperature, e.g. `Sunny +21°C`.
const FORMAT_QUERY: &str = "format=%C+%t";

#[derive(Debug, Deserialize)]
pub struct WeatherArgs {
    pub location: String,
}

#[derive(Debug, Clone)]
pub struct WeatherTool {
    client: reqwest::Client,
    base_url: String,
}

impl WeatherTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: WTTR_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    fn url_for(&self, location: &str) -> Result<reqwest::Url, ExecutionError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ExecutionError::new(format!("invalid weather service url: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ExecutionError::new("weather service url cannot have a path"))?
            .pop_if_empty()
            .push(location);
        url.set_query(Some(FORMAT_QUERY));
        Ok(url)
    }
}

impl Default for WeatherTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for WeatherTool {
    type Args = WeatherArgs;

    fn name(&self) -> &str {
        "weather"
    }

    fn description(&self) -> &str {
        "Get the weather in a location"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new().required(
            "location",
            FieldType::String,
            "The location to get the weather for",
        )
    }

    async fn call(&self, args: WeatherArgs) -> Result<ToolOutput, ExecutionError> {
        let url = self.url_for(&args.location)?;
        tracing::debug!(location = %args.location, "fetching weather");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ExecutionError::new(format!("weather request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ExecutionError::new(format!("failed to read weather response: {e}")))?;

        if !status.is_success() {
            return Err(ExecutionError::upstream(status.as_u16(), body.trim()));
        }

        let location = &args.location;
        let weather = body.trim();
        Ok(ToolOutput::text(format!(
            "The weather in {location} right now is {weather}."
        )))
    }
}
