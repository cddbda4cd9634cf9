mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use futures::{StreamExt, stream};
use untzine::{
    error::Error,
    provider::stream::{RetryPolicy, collect, resumable, skip_prefix},
};

use common::{FlakySource, ForbiddenSource, patterned_bytes};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        delay: Duration::from_millis(1),
    }
}

#[test]
fn test_default_retry_policy() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.max_attempts, 5);
    assert_eq!(policy.delay, Duration::from_secs(2));
}

#[tokio::test]
async fn test_stream_without_failures() {
    let data = patterned_bytes(10_000);
    let source = Arc::new(FlakySource::new(data.clone(), 4096, 0));

    let output = collect(resumable(source.clone(), fast_policy(5))).await.unwrap();

    assert_eq!(output, data);
    assert_eq!(source.open_offsets(), vec![0]);
}

#[tokio::test]
async fn test_stream_resumes_without_duplicates() {
    let data = patterned_bytes(20_000);
    let source = Arc::new(FlakySource::new(data.clone(), 3000, 4));

    let output = collect(resumable(source.clone(), fast_policy(5))).await.unwrap();

    assert_eq!(output.len(), data.len());
    assert_eq!(output, data);
    // Every reconnect starts where the previous connection stopped.
    assert_eq!(source.open_offsets(), vec![0, 3000, 6000, 9000, 12000]);
}

#[tokio::test]
async fn test_stream_gives_up_after_max_attempts() {
    let data = patterned_bytes(20_000);
    let source = Arc::new(FlakySource::new(data.clone(), 3000, 5));

    let items: Vec<_> = resumable(source.clone(), fast_policy(5)).collect().await;

    let (last, delivered) = items.split_last().unwrap();
    match last {
        Err(Error::Transport { attempts, .. }) => assert_eq!(*attempts, 5),
        other => panic!("expected a terminal transport error, got {other:?}"),
    }

    // What was delivered before giving up is a clean prefix.
    let prefix: Vec<u8> = delivered
        .iter()
        .flat_map(|chunk| chunk.as_ref().unwrap().to_vec())
        .collect();
    assert_eq!(&prefix[..], &data[..prefix.len()]);
    assert_eq!(source.open_offsets().len(), 5);
}

#[tokio::test]
async fn test_stream_does_not_retry_authorization_errors() {
    let source = Arc::new(ForbiddenSource {
        opens: Mutex::new(0),
    });

    let items: Vec<_> = resumable(source.clone(), fast_policy(5)).collect().await;

    assert_eq!(items.len(), 1);
    assert!(matches!(items[0], Err(Error::Authorization(_))));
    assert_eq!(*source.opens.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_dropping_stream_stops_retries() {
    let data = patterned_bytes(20_000);
    let source = Arc::new(FlakySource::new(data, 3000, 3));

    let mut stream = resumable(
        source.clone(),
        RetryPolicy {
            max_attempts: 5,
            delay: Duration::from_secs(3600),
        },
    );

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.len(), 3000);

    // The next poll hits the failure and sleeps; abandon it.
    let pending = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
    assert!(pending.is_err());
    drop(stream);

    assert_eq!(source.open_offsets(), vec![0]);
}

#[tokio::test]
async fn test_skip_prefix_across_chunks() {
    let chunks = vec![
        Ok(Bytes::from_static(b"abc")),
        Ok(Bytes::from_static(b"defg")),
        Ok(Bytes::from_static(b"hij")),
    ];

    let output = collect(skip_prefix(stream::iter(chunks).boxed(), 5))
        .await
        .unwrap();

    assert_eq!(&output[..], b"fghij");
}
