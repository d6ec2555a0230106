//! Handler resolution, wiring defects and cancellation.

use async_trait::async_trait;
use conduit_broker::{
    CommandHandler, DataBroker, ItemRequestHandler, ListRequestHandler, RecordPipeline,
};
use conduit_core::{
    CancellationSource, CommandRequest, CommandResult, ConfigError, FilterDefinition,
    ItemQueryRequest, ItemQueryResult, KeyValue, ListQueryRequest, ListQueryResult,
    PipelineError, PipelineResult, RawKey, Record, StoreRecord,
};
use conduit_storage::{InMemoryStoreConfig, RecordStore};
use conduit_test_utils::assertions::{
    assert_cancelled, assert_config_error, assert_no_open_sessions,
};
use conduit_test_utils::{
    init_test_tracing, weather_filter_handler, weather_sort_handler, Customer,
    DboWeatherForecast, InMemoryStore, TestDataProvider, WeatherForecast, WeatherForecastMap,
    FILTER_BY_SUMMARY,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

type WeatherPipeline = RecordPipeline<InMemoryStore, WeatherForecast, DboWeatherForecast>;

fn loaded_store() -> InMemoryStore {
    init_test_tracing();
    TestDataProvider::new().store().unwrap()
}

// ============================================================================
// WIRING DEFECTS
// ============================================================================

#[tokio::test]
async fn test_unregistered_record_is_a_config_error() {
    let broker = DataBroker::builder().build();

    let result = broker
        .list_query::<WeatherForecast>(ListQueryRequest::new())
        .await;

    match result {
        Err(PipelineError::Config(ConfigError::UnregisteredRecord { record })) => {
            assert_eq!(record, "WeatherForecast");
        }
        other => panic!("Expected UnregisteredRecord, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_mapper_is_fatal_for_every_path() {
    let store = loaded_store();
    let broker = DataBroker::builder()
        .route::<WeatherForecast, _>(WeatherPipeline::mapped(store.clone()))
        .build();
    let forecast = TestDataProvider::new().weather_forecasts()[0].clone();

    let list = broker
        .list_query::<WeatherForecast>(ListQueryRequest::new())
        .await;
    assert!(matches!(
        list,
        Err(PipelineError::Config(ConfigError::MissingMapper {
            domain: "WeatherForecast",
            persistence: "DboWeatherForecast",
        }))
    ));

    let item = broker
        .item_query::<WeatherForecast, _>(ItemQueryRequest::new(forecast.id))
        .await;
    assert_config_error(&item);

    let command = broker.command(CommandRequest::update(forecast)).await;
    assert_config_error(&command);
    assert_no_open_sessions(&store);
}

#[tokio::test]
async fn test_filters_without_filter_handler_is_fatal() {
    let store = loaded_store();
    let broker = DataBroker::builder()
        .route::<WeatherForecast, _>(WeatherPipeline::mapped(store.clone()).with_mapper(WeatherForecastMap))
        .build();

    let result = broker
        .list_query::<WeatherForecast>(
            ListQueryRequest::new().with_filter(FilterDefinition::new(FILTER_BY_SUMMARY, "Warm")),
        )
        .await;

    assert!(matches!(
        result,
        Err(PipelineError::Config(ConfigError::MissingFilterHandler { .. }))
    ));
    assert_no_open_sessions(&store);
}

// ============================================================================
// CUSTOM HANDLERS
// ============================================================================

#[derive(Default)]
struct CannedHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl ListRequestHandler<WeatherForecast> for CannedHandler {
    async fn list_query(
        &self,
        _request: ListQueryRequest,
    ) -> PipelineResult<ListQueryResult<WeatherForecast>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ListQueryResult::failure("served by custom handler"))
    }
}

#[async_trait]
impl ItemRequestHandler<WeatherForecast> for CannedHandler {
    async fn item_query(
        &self,
        request: ItemQueryRequest<RawKey>,
    ) -> PipelineResult<ItemQueryResult<WeatherForecast>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ItemQueryResult::failure(format!("custom lookup of {}", request.key)))
    }
}

#[async_trait]
impl CommandHandler<WeatherForecast> for CannedHandler {
    async fn command(&self, request: CommandRequest<WeatherForecast>) -> PipelineResult<CommandResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(CommandResult::success(format!("custom {}", request.state)))
    }
}

#[tokio::test]
async fn test_custom_handlers_take_precedence() {
    let store = loaded_store();
    let custom = Arc::new(CannedHandler::default());
    let pipeline = WeatherPipeline::mapped(store.clone())
        .with_mapper(WeatherForecastMap)
        .with_list_handler(custom.clone())
        .with_item_handler(custom.clone())
        .with_command_handler(custom.clone());
    let broker = DataBroker::builder()
        .route::<WeatherForecast, _>(pipeline)
        .build();
    let forecast = TestDataProvider::new().weather_forecasts()[0].clone();

    let list = broker
        .list_query::<WeatherForecast>(ListQueryRequest::new())
        .await
        .unwrap();
    assert_eq!(list.message.as_deref(), Some("served by custom handler"));

    let item = broker
        .item_query::<WeatherForecast, _>(ItemQueryRequest::new(7i64))
        .await
        .unwrap();
    assert_eq!(item.message.as_deref(), Some("custom lookup of 7"));

    let command = broker.command(CommandRequest::delete(forecast)).await.unwrap();
    assert_eq!(command.message.as_deref(), Some("custom Delete"));

    assert_eq!(custom.calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.statistics().unwrap().sessions_opened, 0);
}

#[tokio::test]
async fn test_custom_handler_replaces_only_its_own_path() {
    let store = loaded_store();
    let custom = Arc::new(CannedHandler::default());
    let pipeline = WeatherPipeline::mapped(store.clone())
        .with_mapper(WeatherForecastMap)
        .with_filter_handler(weather_filter_handler())
        .with_sort_handler(weather_sort_handler())
        .with_list_handler(custom.clone());
    let broker = DataBroker::builder()
        .route::<WeatherForecast, _>(pipeline)
        .build();
    let forecast = TestDataProvider::new().weather_forecasts()[1].clone();

    let item = broker
        .item_query::<WeatherForecast, _>(ItemQueryRequest::new(forecast.id))
        .await
        .unwrap();
    assert_eq!(item.item, Some(forecast));
    assert_eq!(custom.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_broker_routes_separate_handlers() {
    let custom = Arc::new(CannedHandler::default());
    let broker = DataBroker::builder()
        .route_handlers::<WeatherForecast>(custom.clone(), custom.clone(), custom.clone())
        .build();

    assert!(broker.is_registered::<WeatherForecast>());
    assert!(!broker.is_registered::<Customer>());
    assert_eq!(broker.records(), vec!["WeatherForecast"]);

    let list = broker
        .list_query::<WeatherForecast>(ListQueryRequest::new())
        .await
        .unwrap();
    assert!(!list.successful);
}

// ============================================================================
// COMMAND SUPPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct DailyReport {
    id: i64,
    headline: String,
}

impl Record for DailyReport {
    const RECORD_NAME: &'static str = "DailyReport";
    const SUPPORTS_COMMANDS: bool = false;
}

impl StoreRecord for DailyReport {
    fn key_value(&self) -> KeyValue {
        KeyValue::Int(self.id)
    }
}

#[tokio::test]
async fn test_command_on_read_only_record_is_recoverable() {
    let store = loaded_store();
    store
        .seed(vec![DailyReport {
            id: 1,
            headline: "Sunny spells".to_string(),
        }])
        .unwrap();
    let broker = DataBroker::builder()
        .route::<DailyReport, _>(RecordPipeline::<_, DailyReport, DailyReport>::unmapped(store.clone()))
        .build();

    let result = broker
        .command(CommandRequest::add(DailyReport {
            id: 2,
            headline: "Showers".to_string(),
        }))
        .await
        .unwrap();

    assert!(!result.successful);
    assert!(result.message.unwrap_or_default().contains("DailyReport"));
    assert_eq!(store.len::<DailyReport>().unwrap(), 1);

    let item = broker
        .item_query::<DailyReport, _>(ItemQueryRequest::new(1i64))
        .await
        .unwrap();
    assert!(item.successful);
}

// ============================================================================
// CANCELLATION
// ============================================================================

#[tokio::test]
async fn test_cancelled_request_is_not_a_failure_result() {
    let store = loaded_store();
    let broker = DataBroker::builder()
        .route::<WeatherForecast, _>(
            WeatherPipeline::mapped(store.clone()).with_mapper(WeatherForecastMap),
        )
        .build();
    let source = CancellationSource::new();
    source.cancel();

    let list = broker
        .list_query::<WeatherForecast>(ListQueryRequest::new().with_cancellation(source.token()))
        .await;
    assert_cancelled(&list);

    let forecast = TestDataProvider::new().weather_forecasts()[0].clone();
    let command = broker
        .command(CommandRequest::delete(forecast).with_cancellation(source.token()))
        .await;
    assert_cancelled(&command);
    assert_eq!(store.len::<DboWeatherForecast>().unwrap(), 100);
    assert_no_open_sessions(&store);
}

#[tokio::test]
async fn test_cancellation_during_store_io_releases_session() {
    init_test_tracing();
    let store = InMemoryStore::with_config(
        InMemoryStoreConfig::default().with_latency(Duration::from_secs(30)),
    );
    TestDataProvider::new().load(&store).unwrap();
    let broker = DataBroker::builder()
        .route::<WeatherForecast, _>(
            WeatherPipeline::mapped(store.clone()).with_mapper(WeatherForecastMap),
        )
        .build();
    let source = CancellationSource::new();
    let token = source.token();

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        broker.list_query::<WeatherForecast>(ListQueryRequest::new().with_cancellation(token)),
    )
    .await
    .expect("cancellation should interrupt the store call");

    assert!(result.unwrap_err().is_cancelled());
    canceller.await.unwrap();
    assert_no_open_sessions(&store);
}

// ============================================================================
// CONCURRENCY
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_one_pipeline() {
    let store = loaded_store();
    let broker = Arc::new(
        DataBroker::builder()
            .route::<WeatherForecast, _>(
                WeatherPipeline::mapped(store.clone())
                    .with_mapper(WeatherForecastMap)
                    .with_filter_handler(weather_filter_handler())
                    .with_sort_handler(weather_sort_handler()),
            )
            .build(),
    );

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let broker = broker.clone();
            tokio::spawn(async move {
                broker
                    .list_query::<WeatherForecast>(ListQueryRequest::new().with_page(i, 10))
                    .await
            })
        })
        .collect();

    for task in tasks {
        let result = task.await.unwrap().unwrap();
        assert_eq!(result.total_count, 100);
        assert_eq!(result.items.len(), 10);
    }
    assert_no_open_sessions(&store);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unpaged_list_agrees_with_its_total_under_concurrent_adds() {
    init_test_tracing();
    let store = InMemoryStore::new();
    let broker = Arc::new(
        DataBroker::builder()
            .route::<Customer, _>(RecordPipeline::<InMemoryStore, Customer, Customer>::unmapped(
                store.clone(),
            ))
            .build(),
    );

    let writer = {
        let broker = broker.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                let added = broker
                    .command(CommandRequest::add(Customer::new(format!("Customer {}", i))))
                    .await
                    .unwrap();
                assert!(added.successful);
                tokio::task::yield_now().await;
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let broker = broker.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    let result = broker
                        .list_query::<Customer>(ListQueryRequest::new())
                        .await
                        .unwrap();
                    assert_eq!(result.items.len(), result.total_count);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(store.len::<Customer>().unwrap(), 200);
    assert_no_open_sessions(&store);
}
