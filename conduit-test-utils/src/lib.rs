//! Conduit Test Utilities
//!
//! Shared test infrastructure for the conduit workspace:
//! - Weather forecast records (a mapped domain/persistence pair)
//! - Customer records (an unmapped pair with store-assigned keys)
//! - A deterministic test data provider
//! - Proptest generators
//! - Assertions and test tracing setup

pub use conduit_storage::InMemoryStore;

use chrono::{NaiveDate, TimeDelta};
use conduit_core::{
    text_equals_ignore_case, EntityKey, EntityMap, FilterDefinition, KeyValue, PipelineResult,
    PredicateSpecification, RawKey, Record, RecordFilterHandler, RecordSortHandler, Specification,
    StoreRecord, UuidKey,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Once};
use uuid::Uuid;

// ============================================================================
// WEATHER FORECASTS
// ============================================================================

pub const FILTER_BY_SUMMARY: &str = "FilterWeatherForecastsBySummary";
pub const FILTER_BY_MINIMUM_TEMPERATURE: &str = "FilterWeatherForecastsByMinimumTemperature";

/// Identifier for a weather forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeatherForecastId(pub Uuid);

impl UuidKey for WeatherForecastId {
    const KEY_TYPE: &'static str = "WeatherForecastId";

    fn from_uuid(value: Uuid) -> Self {
        WeatherForecastId(value)
    }

    fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl EntityKey for WeatherForecastId {
    fn raw_key(&self) -> RawKey {
        RawKey::Uuid(self.0)
    }
}

impl fmt::Display for WeatherForecastId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A temperature held in Celsius with derived Fahrenheit and Kelvin views.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Temperature {
    celsius: f64,
}

impl Temperature {
    pub fn from_celsius(celsius: f64) -> Self {
        Self { celsius }
    }

    pub fn celsius(&self) -> f64 {
        self.celsius
    }

    pub fn fahrenheit(&self) -> f64 {
        32.0 + self.celsius * 9.0 / 5.0
    }

    pub fn kelvin(&self) -> f64 {
        self.celsius + 273.15
    }
}

/// Domain shape of a weather forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherForecast {
    pub id: WeatherForecastId,
    pub date: NaiveDate,
    pub temperature: Temperature,
    pub summary: Option<String>,
}

impl Record for WeatherForecast {
    const RECORD_NAME: &'static str = "WeatherForecast";
}

/// Persistence shape of a weather forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DboWeatherForecast {
    pub uid: Uuid,
    pub date: NaiveDate,
    pub temperature_c: f64,
    pub summary: Option<String>,
}

impl Record for DboWeatherForecast {
    const RECORD_NAME: &'static str = "DboWeatherForecast";
}

impl StoreRecord for DboWeatherForecast {
    fn key_value(&self) -> KeyValue {
        KeyValue::Uuid(self.uid)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeatherForecastMap;

impl EntityMap<DboWeatherForecast, WeatherForecast> for WeatherForecastMap {
    fn to_domain(&self, record: &DboWeatherForecast) -> WeatherForecast {
        WeatherForecast {
            id: WeatherForecastId(record.uid),
            date: record.date,
            temperature: Temperature::from_celsius(record.temperature_c),
            summary: record.summary.clone(),
        }
    }

    fn to_persistence(&self, record: &WeatherForecast) -> DboWeatherForecast {
        DboWeatherForecast {
            uid: record.id.as_uuid(),
            date: record.date,
            temperature_c: record.temperature.celsius(),
            summary: record.summary.clone(),
        }
    }
}

/// Filters over stored forecasts: by summary (case-insensitive) and by
/// minimum Celsius temperature.
pub fn weather_filter_handler() -> RecordFilterHandler<DboWeatherForecast> {
    RecordFilterHandler::new()
        .with_filter(FILTER_BY_SUMMARY, |filter: &FilterDefinition| {
            let wanted = filter.data_as_str()?.to_string();
            Some(Arc::new(PredicateSpecification::new(move |row: &DboWeatherForecast| {
                row.summary
                    .as_deref()
                    .map(|summary| text_equals_ignore_case(summary, &wanted))
                    .unwrap_or(false)
            })) as Arc<dyn Specification<DboWeatherForecast>>)
        })
        .with_filter(FILTER_BY_MINIMUM_TEMPERATURE, |filter: &FilterDefinition| {
            let minimum = filter.data.as_f64()?;
            Some(Arc::new(PredicateSpecification::new(move |row: &DboWeatherForecast| {
                row.temperature_c >= minimum
            })) as Arc<dyn Specification<DboWeatherForecast>>)
        })
}

/// Sorts over stored forecasts; date ascending by default.
pub fn weather_sort_handler() -> RecordSortHandler<DboWeatherForecast> {
    RecordSortHandler::new("Date", false)
        .with_field("Date", |row: &DboWeatherForecast| row.date)
        .with_field("Summary", |row: &DboWeatherForecast| row.summary.clone())
        .with_comparator("TemperatureC", |a: &DboWeatherForecast, b: &DboWeatherForecast| {
            a.temperature_c.total_cmp(&b.temperature_c)
        })
}

// ============================================================================
// CUSTOMERS
// ============================================================================

/// A record used as both domain and persistence shape, keyed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
}

impl Customer {
    /// A customer not yet stored; the store assigns its key on insert.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            customer_id: 0,
            name: name.into(),
        }
    }
}

impl Record for Customer {
    const RECORD_NAME: &'static str = "Customer";
}

impl StoreRecord for Customer {
    const STORE_ASSIGNED_KEY: bool = true;

    fn key_value(&self) -> KeyValue {
        KeyValue::Int(self.customer_id)
    }

    fn assign_key(&mut self, key: KeyValue) {
        if let Some(id) = key.as_int() {
            self.customer_id = id;
        }
    }
}

/// Sorts over customers; name ascending by default.
pub fn customer_sort_handler() -> RecordSortHandler<Customer> {
    RecordSortHandler::new("Name", false)
        .with_field("Name", |row: &Customer| row.name.clone())
        .with_field("CustomerId", |row: &Customer| row.customer_id)
}

// ============================================================================
// TEST DATA PROVIDER
// ============================================================================

pub const SUMMARIES: [&str; 10] = [
    "Freezing", "Bracing", "Chilly", "Cool", "Mild", "Warm", "Balmy", "Hot", "Sweltering",
    "Scorching",
];

const CUSTOMER_NAMES: [&str; 5] = ["Easy Meat Farm", "Old Mill", "Riverside Dairy", "Hill Top", "Crown Bakery"];

/// Deterministic fixture data. Forecast dates ascend one day at a time from
/// 2024-01-01 and summaries cycle through [`SUMMARIES`].
#[derive(Debug, Clone)]
pub struct TestDataProvider {
    forecasts: Vec<DboWeatherForecast>,
    customers: Vec<Customer>,
}

impl TestDataProvider {
    pub const DEFAULT_FORECAST_COUNT: usize = 100;

    pub fn new() -> Self {
        Self::with_forecast_count(Self::DEFAULT_FORECAST_COUNT)
    }

    pub fn with_forecast_count(count: usize) -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();
        let forecasts = (0..count)
            .map(|i| DboWeatherForecast {
                uid: Uuid::from_u128(0x0190_0000_0000_7000_8000_0000_0000_0000 + i as u128 + 1),
                date: start + TimeDelta::days(i as i64),
                temperature_c: ((i * 13) % 75) as f64 - 20.0,
                summary: Some(SUMMARIES[(i * 7) % SUMMARIES.len()].to_string()),
            })
            .collect();
        let customers = CUSTOMER_NAMES.iter().map(|name| Customer::new(*name)).collect();
        Self {
            forecasts,
            customers,
        }
    }

    pub fn dbo_weather_forecasts(&self) -> &[DboWeatherForecast] {
        &self.forecasts
    }

    pub fn weather_forecasts(&self) -> Vec<WeatherForecast> {
        self.forecasts
            .iter()
            .map(|row| WeatherForecastMap.to_domain(row))
            .collect()
    }

    /// Customers before loading; their keys are unset.
    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    /// Forecasts whose summary equals `summary`, ignoring case.
    pub fn forecasts_with_summary(&self, summary: &str) -> Vec<&DboWeatherForecast> {
        self.forecasts
            .iter()
            .filter(|row| {
                row.summary
                    .as_deref()
                    .map(|s| text_equals_ignore_case(s, summary))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Seed a store with every forecast and customer.
    pub fn load(&self, store: &InMemoryStore) -> PipelineResult<()> {
        let forecasts = store.seed(self.forecasts.iter().cloned())?;
        let customers = store.seed(self.customers.iter().cloned())?;
        tracing::debug!(forecasts, customers, "Loaded test data");
        Ok(())
    }

    /// A new store holding this provider's data.
    pub fn store(&self) -> PipelineResult<InMemoryStore> {
        let store = InMemoryStore::new();
        self.load(&store)?;
        Ok(store)
    }
}

impl Default for TestDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TRACING
// ============================================================================

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness. Filter with `RUST_LOG`.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for the fixture record types.

    use super::*;
    use proptest::prelude::*;

    /// A non-nil UUID.
    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<u128>().prop_map(|n| Uuid::from_u128(n.max(1)))
    }

    pub fn arb_weather_forecast_id() -> impl Strategy<Value = WeatherForecastId> {
        arb_uuid().prop_map(WeatherForecastId)
    }

    /// Dates between 2000-01-01 and roughly 2054.
    pub fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..20_000).prop_map(|days| {
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default() + TimeDelta::days(days)
        })
    }

    pub fn arb_summary() -> impl Strategy<Value = Option<String>> {
        prop::option::of(prop::sample::select(SUMMARIES.to_vec()).prop_map(str::to_string))
    }

    pub fn arb_dbo_weather_forecast() -> impl Strategy<Value = DboWeatherForecast> {
        (arb_uuid(), arb_date(), -80.0f64..60.0, arb_summary()).prop_map(
            |(uid, date, temperature_c, summary)| DboWeatherForecast {
                uid,
                date,
                temperature_c,
                summary,
            },
        )
    }

    /// Forecasts with distinct keys.
    pub fn arb_dbo_weather_forecasts(
        max: usize,
    ) -> impl Strategy<Value = Vec<DboWeatherForecast>> {
        prop::collection::vec(arb_dbo_weather_forecast(), 0..max).prop_map(|mut rows| {
            let mut seen = std::collections::HashSet::new();
            rows.retain(|row| seen.insert(row.uid));
            rows
        })
    }

    pub fn arb_customer() -> impl Strategy<Value = Customer> {
        "[A-Z][a-z]{2,12}( [A-Z][a-z]{2,12})?".prop_map(Customer::new)
    }

    /// A start index and page size; non-positive sizes mean unpaged.
    pub fn arb_page() -> impl Strategy<Value = (usize, i32)> {
        (0usize..120, -2i32..40)
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for pipeline outcomes.

    use conduit_core::{PipelineError, PipelineResult};
    use conduit_storage::RecordStore;

    /// Assert that a result is a configuration error.
    #[track_caller]
    pub fn assert_config_error<T: std::fmt::Debug>(result: &PipelineResult<T>) {
        match result {
            Err(PipelineError::Config(_)) => {}
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    /// Assert that a result is a cancellation.
    #[track_caller]
    pub fn assert_cancelled<T: std::fmt::Debug>(result: &PipelineResult<T>) {
        match result {
            Err(PipelineError::Cancelled) => {}
            other => panic!("Expected Cancelled, got: {:?}", other),
        }
    }

    /// Assert that no session handed out by `store` is still held.
    #[track_caller]
    pub fn assert_no_open_sessions<S: RecordStore>(store: &S) {
        match store.statistics() {
            Ok(stats) => assert_eq!(stats.open_sessions, 0, "Store sessions leaked"),
            Err(e) => panic!("Could not read store statistics: {}", e),
        }
    }
}
