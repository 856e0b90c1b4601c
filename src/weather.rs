use crate::config::Config;
use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use log::{debug, info, warn};
use serde::Deserialize;
use std::{
    error::Error,
    thread,
    time::{Duration, Instant},
};

/// Anything that can produce a weather snapshot. The main loop only cares
/// about this, so tests can substitute a canned source.
pub trait WeatherSource {
    /// Get the latest weather. This may block for a while
    fn fetch(&mut self) -> anyhow::Result<WeatherSnapshot>;
}

/// Today's weather, as shown on screen. Replaced wholesale on every
/// successful fetch.
#[derive(Clone, Debug, PartialEq)]
pub struct WeatherSnapshot {
    pub temp_min: f64,
    pub temp_max: f64,
    /// Local time, `HH:MM`
    pub sunrise: String,
    /// Local time, `HH:MM`
    pub sunset: String,
}

impl WeatherSnapshot {
    /// Formatted temperature range
    pub fn temperature_range(&self) -> String {
        format!("{:.1}°C - {:.1}°C", self.temp_min, self.temp_max)
    }
}

/// Gotta know weather or not it's gonna rain
pub struct Weather {
    agent: ureq::Agent,
    latitude: f64,
    longitude: f64,
    cache_ttl: Duration,
    retry: RetryPolicy,
    /// Last successful response. Served instead of hitting the API again
    /// until it expires
    cache: Option<CachedSnapshot>,
}

#[derive(Debug)]
struct CachedSnapshot {
    snapshot: WeatherSnapshot,
    fetched_at: Instant,
}

impl Weather {
    const API_URL: &'static str = "https://api.open-meteo.com/v1/forecast";
    const DAILY_VARIABLES: &'static str =
        "temperature_2m_max,temperature_2m_min,sunrise,sunset";
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(config: &Config) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Self::TIMEOUT)
            .user_agent(concat!("weatherclock/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            latitude: config.latitude,
            longitude: config.longitude,
            cache_ttl: config.cache_ttl(),
            retry: RetryPolicy::default(),
            cache: None,
        }
    }

    /// Make one request to the API
    fn request(&self) -> Result<Forecast, ureq::Error> {
        let response = self
            .agent
            .get(Self::API_URL)
            .query("latitude", &self.latitude.to_string())
            .query("longitude", &self.longitude.to_string())
            .query("daily", Self::DAILY_VARIABLES)
            .query("timezone", "auto")
            .query("timeformat", "unixtime")
            .query("forecast_days", "1")
            .call()?;
        Ok(response.into_json()?)
    }
}

impl WeatherSource for Weather {
    fn fetch(&mut self) -> anyhow::Result<WeatherSnapshot> {
        if let Some(cached) = &self.cache {
            if cached.fetched_at.elapsed() < self.cache_ttl {
                debug!("Using cached forecast");
                return Ok(cached.snapshot.clone());
            }
        }

        info!("Fetching new forecast");
        let forecast = self
            .retry
            .run(|| self.request(), is_retryable)
            .with_context(|| {
                format!("Error fetching forecast from {}", Self::API_URL)
            })?;
        let snapshot = forecast.snapshot()?;
        info!("Saving forecast: {snapshot:?}");
        self.cache = Some(CachedSnapshot {
            snapshot: snapshot.clone(),
            fetched_at: Instant::now(),
        });
        Ok(snapshot)
    }
}

/// Should a failed request be tried again? Connection problems and server
/// hiccups are worth another shot, anything else won't get better
fn is_retryable(error: &ureq::Error) -> bool {
    match error {
        ureq::Error::Status(status, _) => {
            matches!(status, 429 | 500 | 502 | 503 | 504)
        }
        ureq::Error::Transport(_) => true,
    }
}

/// Retry with exponential backoff. The nth retry waits
/// `backoff_factor * 2^(n-1)`.
#[derive(Copy, Clone, Debug)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff_factor: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 5,
            backoff_factor: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// How long to wait before the given retry (1-based)
    fn delay(&self, retry: u32) -> Duration {
        self.backoff_factor * 2u32.pow(retry.saturating_sub(1))
    }

    /// Call a function until it succeeds, it fails with an error that
    /// shouldn't be retried, or we run out of retries
    fn run<T, E>(
        &self,
        mut f: impl FnMut() -> Result<T, E>,
        should_retry: impl Fn(&E) -> bool,
    ) -> anyhow::Result<T>
    where
        E: Error + Send + Sync + 'static,
    {
        let mut retry = 0;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(error) if retry < self.retries && should_retry(&error) => {
                    retry += 1;
                    let delay = self.delay(retry);
                    warn!(
                        "Request failed ({error}), retry {retry}/{} in {delay:?}",
                        self.retries
                    );
                    thread::sleep(delay);
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}

/// https://open-meteo.com/en/docs
#[derive(Clone, Debug, Deserialize)]
struct Forecast {
    utc_offset_seconds: i32,
    daily: Daily,
}

/// Each field has one entry per forecast day. We only ever ask for one.
#[derive(Clone, Debug, Deserialize)]
struct Daily {
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    /// Unix timestamps
    sunrise: Vec<i64>,
    sunset: Vec<i64>,
}

impl Forecast {
    /// Extract today's values. Sun times are shown in the forecast
    /// location's timezone.
    fn snapshot(&self) -> anyhow::Result<WeatherSnapshot> {
        let offset = FixedOffset::east_opt(self.utc_offset_seconds)
            .with_context(|| {
                format!("Invalid UTC offset {}", self.utc_offset_seconds)
            })?;
        let daily = &self.daily;
        let local_time = |field: &str, timestamps: &[i64]| {
            let timestamp = first(field, timestamps)?;
            let time = DateTime::from_timestamp(timestamp, 0)
                .with_context(|| {
                    format!("Invalid {field} timestamp {timestamp}")
                })?
                .with_timezone(&offset);
            Ok::<_, anyhow::Error>(time.format("%H:%M").to_string())
        };

        Ok(WeatherSnapshot {
            temp_min: first("temperature_2m_min", &daily.temperature_2m_min)?,
            temp_max: first("temperature_2m_max", &daily.temperature_2m_max)?,
            sunrise: local_time("sunrise", &daily.sunrise)?,
            sunset: local_time("sunset", &daily.sunset)?,
        })
    }
}

fn first<T: Copy>(field: &str, values: &[T]) -> anyhow::Result<T> {
    values
        .first()
        .copied()
        .with_context(|| format!("Forecast is missing field {field}"))
}
