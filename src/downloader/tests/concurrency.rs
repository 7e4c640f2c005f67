use crate::downloader::test_helpers::{
    MockExtractor, create_test_downloader_with, wait_for_terminal,
};
use crate::types::{Event, FailureKind, JobOptions, Status};
use std::time::Duration;

// -----------------------------------------------------------------------
// gate_bounds_concurrent_processing
// -----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn gate_bounds_concurrent_processing() {
    const CAPACITY: usize = 2;
    const BURST: usize = 6;

    let mock = MockExtractor {
        download_delay: Duration::from_millis(100),
        ..MockExtractor::default()
    };
    let (downloader, _temp_dir) = create_test_downloader_with(mock, |config| {
        config.download.max_concurrent_jobs = CAPACITY;
    })
    .await;

    let mut ids = Vec::new();
    for i in 0..BURST {
        let id = downloader
            .submit(format!("https://youtu.be/burst{i}"), JobOptions::default())
            .await
            .unwrap();
        ids.push(id);
    }

    // Sample the processing count until every job is terminal. At no
    // sampling instant may it exceed the gate capacity.
    let mut max_processing = 0;
    let sampled = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let processing = downloader.store.count_with_status(Status::Processing).await;
            max_processing = max_processing.max(processing);

            let terminal = downloader.store.count_with_status(Status::Completed).await
                + downloader.store.count_with_status(Status::Failed).await;
            if terminal == BURST {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(sampled.is_ok(), "burst did not drain in time");
    assert!(
        max_processing <= CAPACITY,
        "observed {max_processing} jobs processing, gate capacity is {CAPACITY}"
    );
    assert!(
        max_processing > 0,
        "sampling should have observed at least one processing job"
    );

    for id in ids {
        let record = downloader.status(id).await.unwrap();
        assert_eq!(record.status, Status::Completed);
    }
}

// -----------------------------------------------------------------------
// timeout_fails_job_and_frees_its_permit
// -----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn timeout_fails_job_and_frees_its_permit() {
    let (downloader, _temp_dir) =
        create_test_downloader_with(MockExtractor::default(), |config| {
            config.download.max_concurrent_jobs = 1;
            config.download.job_timeout_secs = 1;
        })
        .await;

    let mut events = downloader.subscribe();

    // The hanging job takes the only permit; the fast job must wait for it
    let hung = downloader
        .submit("https://youtu.be/hang-here", JobOptions::default())
        .await
        .unwrap();
    let fast = downloader
        .submit("https://youtu.be/quick", JobOptions::default())
        .await
        .unwrap();

    let hung_record = wait_for_terminal(&downloader, hung, Duration::from_secs(5)).await;
    let fast_record = wait_for_terminal(&downloader, fast, Duration::from_secs(5)).await;

    assert_eq!(hung_record.status, Status::Failed);
    assert_eq!(
        hung_record.error.expect("error must be set").kind,
        FailureKind::Timeout
    );
    assert_eq!(
        fast_record.status,
        Status::Completed,
        "the waiting job must be admitted once the timed-out job releases its permit"
    );

    // With capacity 1, the second job can only start after the first fails
    let mut hung_failed_at = None;
    let mut fast_started_at = None;
    let mut position = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            Event::Failed { id, .. } if id == hung => hung_failed_at = Some(position),
            Event::Started { id } if id == fast => fast_started_at = Some(position),
            _ => {}
        }
        position += 1;
    }
    let (failed_at, started_at) = (
        hung_failed_at.expect("hung job must emit Failed"),
        fast_started_at.expect("fast job must emit Started"),
    );
    assert!(
        failed_at < started_at,
        "permit release (event {failed_at}) must precede the next admission (event {started_at})"
    );

    // Full capacity restored
    assert_eq!(
        downloader.job_state.concurrent_limit.available_permits(),
        1
    );
}

// -----------------------------------------------------------------------
// failures_restore_full_gate_capacity
// -----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failures_restore_full_gate_capacity() {
    const CAPACITY: usize = 3;

    let mock = MockExtractor {
        download_error: Some("simulated network error".to_string()),
        ..MockExtractor::default()
    };
    let (downloader, _temp_dir) = create_test_downloader_with(mock, |config| {
        config.download.max_concurrent_jobs = CAPACITY;
    })
    .await;

    let mut ids = Vec::new();
    for i in 0..CAPACITY {
        let id = downloader
            .submit(format!("https://youtu.be/fail{i}"), JobOptions::default())
            .await
            .unwrap();
        ids.push(id);
    }

    for id in ids {
        let record = wait_for_terminal(&downloader, id, Duration::from_secs(5)).await;
        assert_eq!(record.status, Status::Failed);
        assert_eq!(
            record.error.expect("error must be set").kind,
            FailureKind::ExtractionFailed
        );
    }

    assert_eq!(
        downloader.job_state.concurrent_limit.available_permits(),
        CAPACITY,
        "every failed job must release its admission permit"
    );
}

// -----------------------------------------------------------------------
// permits_are_released_even_for_instant_failures
// -----------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn oversized_preflight_jobs_never_exhaust_the_gate() {
    // More rejections than the gate has permits; each must release cleanly
    let mock = MockExtractor {
        inspect_size: Some(u64::MAX),
        ..MockExtractor::default()
    };
    let (downloader, _temp_dir) = create_test_downloader_with(mock, |config| {
        config.download.max_concurrent_jobs = 2;
    })
    .await;

    for i in 0..5 {
        let id = downloader
            .submit(format!("https://youtu.be/huge{i}"), JobOptions::default())
            .await
            .unwrap();
        let record = wait_for_terminal(&downloader, id, Duration::from_secs(5)).await;
        assert_eq!(
            record.error.expect("error must be set").kind,
            FailureKind::SizeExceeded
        );
    }

    assert_eq!(downloader.job_state.concurrent_limit.available_permits(), 2);
}
