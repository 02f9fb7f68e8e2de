//! End-to-end behaviour of the derived statistics engine against scripted
//! metric clients: partial failure, concurrency, idempotence and cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use obsquery::backend::MetricQueryClient;
use obsquery::errors::{BackendError, QueryError};
use obsquery::models::metrics::{Point, Series};
use obsquery::models::stats::{StatSelector, TimeRange};
use obsquery::query::stats::{StatQuery, StatsEngine};

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn last_hour() -> TimeRange {
    TimeRange::new(noon() - Duration::hours(1), noon()).unwrap()
}

fn series(values: &[f64]) -> Vec<Series> {
    let points = values
        .iter()
        .enumerate()
        .map(|(i, v)| Point::new(noon() - Duration::minutes(i as i64), *v))
        .collect();
    vec![Series::new("trace.checkout", points)]
}

enum Answer {
    Data(Vec<Series>),
    Fail,
    Hang,
}

/// Scripted client keyed by exact query string. Tracks peak concurrency.
struct Scripted {
    answers: HashMap<String, Answer>,
    delay: StdDuration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(selector: &StatSelector) -> Self {
        let tags = selector.tag_filter();
        let mut answers = HashMap::new();
        answers.insert(
            StatQuery::AvgLatency.build(&selector.service, &tags),
            Answer::Data(series(&[40_000_000.0, 60_000_000.0])),
        );
        answers.insert(
            StatQuery::P95Latency.build(&selector.service, &tags),
            Answer::Data(series(&[120_000_000.0])),
        );
        answers.insert(
            StatQuery::Errors.build(&selector.service, &tags),
            Answer::Data(series(&[5.0, 15.0])),
        );
        answers.insert(
            StatQuery::Hits.build(&selector.service, &tags),
            Answer::Data(series(&[400.0, 600.0])),
        );
        Self {
            answers,
            delay: StdDuration::from_millis(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = delay;
        self
    }

    fn answer(mut self, selector: &StatSelector, kind: StatQuery, answer: Answer) -> Self {
        self.answers
            .insert(kind.build(&selector.service, &selector.tag_filter()), answer);
        self
    }
}

#[async_trait]
impl MetricQueryClient for Scripted {
    async fn query_metrics(
        &self,
        query: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<Series>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = match self.answers.get(query) {
            Some(Answer::Data(s)) => Ok(s.clone()),
            Some(Answer::Fail) => Err(BackendError::Request(format!("{} timed out", query))),
            Some(Answer::Hang) => {
                futures::future::pending::<()>().await;
                unreachable!()
            }
            None => Ok(Vec::new()),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[tokio::test]
async fn test_full_stats() {
    let sel = StatSelector::new("checkout").with_environment("prod");
    let client = Scripted::new(&sel);
    let stats = StatsEngine::new(&client).compute(&sel, last_hour()).await.unwrap();

    let latency = stats.latency.unwrap();
    assert_eq!(latency.avg, Some(50.0));
    assert_eq!(latency.p95, Some(120.0));

    let er = stats.error_rate.unwrap();
    assert_eq!(er.error_count, Some(20.0));
    assert_eq!(er.total_count, Some(1000.0));
    assert_eq!(er.error_percent, Some(2.0));

    let tp = stats.throughput.unwrap();
    assert_eq!(tp.total_requests, 1000.0);
    let rps = tp.requests_per_second.unwrap();
    assert!((rps - 1000.0 / 3600.0).abs() < 1e-9);
    assert!(!stats.notes.is_empty());
}

#[tokio::test]
async fn test_one_failed_query_leaves_only_its_field_unset() {
    let sel = StatSelector::new("checkout");
    let client = Scripted::new(&sel).answer(&sel, StatQuery::P95Latency, Answer::Fail);
    let stats = StatsEngine::new(&client).compute(&sel, last_hour()).await.unwrap();

    let latency = stats.latency.unwrap();
    assert_eq!(latency.avg, Some(50.0));
    assert_eq!(latency.p95, None);
    assert_eq!(stats.error_rate.unwrap().error_percent, Some(2.0));
    assert!(stats.throughput.is_some());
}

#[tokio::test]
async fn test_missing_hits_leaves_error_rate_uncomputed() {
    let sel = StatSelector::new("checkout");
    let client = Scripted::new(&sel).answer(&sel, StatQuery::Hits, Answer::Data(Vec::new()));
    let stats = StatsEngine::new(&client).compute(&sel, last_hour()).await.unwrap();

    let er = stats.error_rate.unwrap();
    assert_eq!(er.error_count, Some(20.0));
    assert_eq!(er.total_count, None);
    assert_eq!(er.error_percent, None);
    assert!(stats.throughput.is_none());
}

#[tokio::test]
async fn test_all_failed_is_an_error() {
    let sel = StatSelector::new("checkout");
    let client = Scripted::new(&sel)
        .answer(&sel, StatQuery::AvgLatency, Answer::Fail)
        .answer(&sel, StatQuery::P95Latency, Answer::Fail)
        .answer(&sel, StatQuery::Errors, Answer::Fail)
        .answer(&sel, StatQuery::Hits, Answer::Fail);
    let err = StatsEngine::new(&client)
        .compute(&sel, last_hour())
        .await
        .unwrap_err();
    match err {
        QueryError::AllQueriesFailed { service, failures } => {
            assert_eq!(service, "checkout");
            assert_eq!(failures.len(), 4);
        }
        other => panic!("expected AllQueriesFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_sub_queries_run_concurrently() {
    let sel = StatSelector::new("checkout");
    let client = Scripted::new(&sel).with_delay(StdDuration::from_millis(50));
    StatsEngine::new(&client).compute(&sel, last_hour()).await.unwrap();

    assert_eq!(client.calls.load(Ordering::SeqCst), 4);
    assert_eq!(client.peak.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_repeated_computation_is_stable() {
    let sel = StatSelector::new("checkout").with_operation("GET /cart");
    let client = Scripted::new(&sel);
    let engine = StatsEngine::new(&client);

    let results = futures::future::join_all((0..3).map(|_| engine.compute(&sel, last_hour()))).await;
    let first = results[0].as_ref().unwrap();
    for r in &results[1..] {
        assert_eq!(r.as_ref().unwrap(), first);
    }
    assert_eq!(client.calls.load(Ordering::SeqCst), 12);
}

#[tokio::test]
async fn test_cancellation_abandons_in_flight_queries() {
    let sel = StatSelector::new("checkout");
    let client = Scripted::new(&sel).answer(&sel, StatQuery::Hits, Answer::Hang);
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        let _ = tx.send(());
    });
    let cancel = async {
        let _ = rx.await;
    };
    let err = StatsEngine::new(&client)
        .compute_until(&sel, last_hour(), cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Cancelled));
}

#[tokio::test]
async fn test_uncancelled_compute_until_completes() {
    let sel = StatSelector::new("checkout");
    let client = Scripted::new(&sel);
    let stats = StatsEngine::new(&client)
        .compute_until(&sel, last_hour(), futures::future::pending::<()>())
        .await
        .unwrap();
    assert!(stats.latency.is_some());
}

#[tokio::test]
async fn test_zero_length_window_has_no_rate() {
    let sel = StatSelector::new("checkout");
    let client = Scripted::new(&sel);
    let range = TimeRange::new(noon(), noon()).unwrap();
    let stats = StatsEngine::new(&client).compute(&sel, range).await.unwrap();
    let tp = stats.throughput.unwrap();
    assert_eq!(tp.total_requests, 1000.0);
    assert_eq!(tp.requests_per_second, None);
}
