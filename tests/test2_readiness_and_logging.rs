use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use surql_middleware::prelude::*;
use surql_middleware::test_utils::MockConnection;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

fn options(
    logging: bool,
    retry_count: RetryCount,
    sink: &Arc<Mutex<Vec<String>>>,
) -> EngineOptions {
    let sink = Arc::clone(sink);
    EngineOptions::builder()
        .logging(logging)
        .log_printer(LogPrinter::new(move |text, _bindings| {
            sink.lock().unwrap().push(text.to_string());
        }))
        .retry_count(retry_count)
        .retry_delay(Backoff::Fixed(Duration::from_millis(1)))
        .finish()
}

fn client(conn: MockConnection, options: EngineOptions) -> SurqlClient<MockConnection> {
    let target = ConnectionTarget::new("test", "test", "http://localhost:8000");
    SurqlClient::new(conn, EngineConfig::new(target).with_options(options))
}

#[test]
fn zero_retries_fail_immediately() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut opts = options(true, RetryCount::Limited(0), &sink);
        opts.retry_delay = Backoff::Fixed(Duration::from_secs(60));
        let client = client(MockConnection::new(ConnectionStatus::Disconnected), opts);

        let started = std::time::Instant::now();
        let err = client.run_single(count("organisation")).await.unwrap_err();
        assert!(matches!(err, SurqlMiddlewareError::ConnectionUnavailable { attempts: 1 }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(client.handle().executed().is_empty());
        assert!(sink.lock().unwrap().is_empty());
    });
    Ok(())
}

#[test]
fn unbounded_retry_succeeds_on_third_poll() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let conn = MockConnection::connected();
        conn.script_statuses([ConnectionStatus::Connecting, ConnectionStatus::Disconnected]);
        conn.push_response(vec![json!([{"count": 2}])]);
        let client = client(conn, options(true, RetryCount::from_i64(-1)?, &sink));

        let total: u64 = client.run_single_as(count("organisation")).await?;
        assert_eq!(total, 2);
        assert_eq!(client.handle().status_polls(), 3);
        assert_eq!(sink.lock().unwrap().len(), 1);
        Ok::<(), SurqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn logging_disabled_never_prints() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let conn = MockConnection::connected();
        conn.script_statuses([ConnectionStatus::Connecting, ConnectionStatus::Connecting]);
        conn.push_response(vec![json!([{"count": 0}])]);
        let client = client(conn, options(false, RetryCount::Limited(5), &sink));

        client.run_single(count("organisation")).await?;
        assert!(sink.lock().unwrap().is_empty());
        Ok::<(), SurqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn logged_text_is_the_sent_text() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let conn = MockConnection::connected();
        conn.push_response(vec![json!([])]);
        let client = client(conn, options(true, RetryCount::Limited(0), &sink));

        client.run_single(select_all().from("organisation")).await?;
        let logged = sink.lock().unwrap().clone();
        assert_eq!(logged, vec![client.handle().executed()[0].text.clone()]);
        Ok::<(), SurqlMiddlewareError>(())
    })?;
    Ok(())
}

#[test]
fn cancellation_stops_an_unbounded_wait() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let mut opts = options(true, RetryCount::Unbounded, &sink);
        opts.retry_delay = Backoff::Fixed(Duration::from_millis(20));
        let client = client(MockConnection::new(ConnectionStatus::Connecting), opts);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = client
            .run_transaction_with_cancel([count("organisation")], &token)
            .await
            .unwrap_err();
        assert!(matches!(err, SurqlMiddlewareError::Cancelled { .. }));
        assert!(client.handle().executed().is_empty());
        assert!(sink.lock().unwrap().is_empty());
    });
    Ok(())
}

#[test]
fn connection_events_are_forwarded_unchanged() -> Result<(), Box<dyn std::error::Error>> {
    let rt = Runtime::new()?;
    rt.block_on(async {
        let sink = Arc::new(Mutex::new(Vec::new()));
        let client = client(
            MockConnection::new(ConnectionStatus::Disconnected),
            options(false, RetryCount::Limited(0), &sink),
        );

        let mut events = client.subscribe();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let listener = client.on_event(move |event| record.lock().unwrap().push(event));
        tokio::task::yield_now().await;

        client.connect().await?;
        assert_eq!(client.status(), ConnectionStatus::Connected);
        client.handle().emit(ConnectionEvent::Errored("socket reset".into()));
        client.disconnect().await?;

        assert_eq!(events.recv().await.ok(), Some(ConnectionEvent::Opened));
        assert_eq!(
            events.recv().await.ok(),
            Some(ConnectionEvent::Errored("socket reset".into()))
        );
        assert_eq!(events.recv().await.ok(), Some(ConnectionEvent::Closed));

        for _ in 0..50 {
            if seen.lock().unwrap().len() == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                ConnectionEvent::Opened,
                ConnectionEvent::Errored("socket reset".into()),
                ConnectionEvent::Closed,
            ]
        );
        listener.abort();

        let target = client.handle().connected_to().unwrap();
        assert_eq!(target.endpoint, "http://localhost:8000");
        Ok::<(), SurqlMiddlewareError>(())
    })?;
    Ok(())
}
