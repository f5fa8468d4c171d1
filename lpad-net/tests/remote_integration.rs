mod support;

use std::time::Duration;

use lpad_common::{LpadError, Version};
use lpad_net::{
    build_http_client, DownloadEvent, Downloader, ReleaseApiSource, RemoteVersionSource,
    VersionFileSource,
};
use support::{serve, Reply};

#[tokio::test]
async fn version_file_is_parsed() {
    let server = serve(vec![("/Version.txt", Reply::Body(200, b"1.4.0\n".to_vec()))]).await;
    let source = VersionFileSource::new(build_http_client().unwrap(), server.url("/Version.txt"));
    assert_eq!(source.fetch().await.unwrap(), Version::new(1, 4, 0));
}

#[tokio::test]
async fn missing_and_malformed_versions_are_network_errors() {
    let server = serve(vec![
        ("/bad.txt", Reply::Body(200, b"1.4".to_vec())),
        ("/boom.txt", Reply::Body(500, b"oops".to_vec())),
    ])
    .await;
    let client = build_http_client().unwrap();
    for path in ["/bad.txt", "/boom.txt", "/absent.txt"] {
        let err = VersionFileSource::new(client.clone(), server.url(path))
            .fetch()
            .await
            .unwrap_err();
        assert!(matches!(err, LpadError::Network(_)), "{path}: {err:?}");
    }
}

#[tokio::test]
async fn release_listing_tag_is_used() {
    let body = br#"{"tag_name":"v2.0.1","name":"Spring patch","draft":false}"#.to_vec();
    let server = serve(vec![("/releases/latest", Reply::Body(200, body))]).await;
    let source =
        ReleaseApiSource::new(build_http_client().unwrap(), server.url("/releases/latest"));
    assert_eq!(source.fetch().await.unwrap(), Version::new(2, 0, 1));
}

#[tokio::test]
async fn download_reports_progress_and_returns_version() {
    let payload = vec![7u8; 64 * 1024];
    let server = serve(vec![("/Payload.zip", Reply::Body(200, payload.clone()))]).await;
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("Payload.zip");

    let downloader = Downloader::new().unwrap();
    let mut handle = downloader.start(&server.url("/Payload.zip"), &dest, Version::new(1, 1, 0));

    let mut last = 0u8;
    let mut completed = None;
    while let Some(event) = handle.next_event().await {
        match event {
            DownloadEvent::Progress(p) => {
                assert!(p <= 100);
                assert!(p >= last);
                last = p;
            }
            DownloadEvent::Completed(done) => completed = Some(done),
            DownloadEvent::Failed(e) => panic!("download failed: {e}"),
        }
    }
    let done = completed.expect("terminal completion event");
    assert_eq!(last, 100);
    assert_eq!(done.version, Version::new(1, 1, 0));
    assert_eq!(done.bytes, payload.len() as u64);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
    assert!(handle.next_event().await.is_none());
}

#[tokio::test]
async fn cancellation_fails_the_download_and_keeps_partial_file() {
    let server = serve(vec![(
        "/Payload.zip",
        Reply::Stall {
            declared: 1024 * 1024,
            body: vec![1u8; 4096],
        },
    )])
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("Payload.zip");

    let mut handle =
        Downloader::new()
            .unwrap()
            .start(&server.url("/Payload.zip"), &dest, Version::new(1, 0, 0));
    let cancel = handle.cancel_handle();

    let terminal = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match handle.next_event().await {
                Some(DownloadEvent::Progress(_)) => cancel.cancel(),
                Some(other) => return other,
                None => panic!("channel closed without terminal event"),
            }
        }
    })
    .await
    .expect("cancellation should settle promptly");

    assert!(matches!(terminal, DownloadEvent::Failed(LpadError::Cancelled)));
    cancel.cancel();
    assert!(dest.exists());
}

#[tokio::test]
async fn truncated_transfer_fails() {
    let server = serve(vec![(
        "/Payload.zip",
        Reply::Truncate {
            declared: 10_000,
            body: vec![3u8; 100],
        },
    )])
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("Payload.zip");
    let mut handle =
        Downloader::new()
            .unwrap()
            .start(&server.url("/Payload.zip"), &dest, Version::new(1, 0, 0));
    let mut failed = false;
    while let Some(event) = handle.next_event().await {
        if let DownloadEvent::Failed(e) = event {
            assert!(matches!(e, LpadError::Network(_)), "{e:?}");
            failed = true;
        }
    }
    assert!(failed);
}

#[tokio::test]
async fn cancel_after_full_progress_still_completes() {
    let body = vec![5u8; 32 * 1024];
    let server = serve(vec![(
        "/Payload.zip",
        Reply::Stall {
            declared: body.len(),
            body: body.clone(),
        },
    )])
    .await;
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("Payload.zip");

    let mut handle =
        Downloader::new()
            .unwrap()
            .start(&server.url("/Payload.zip"), &dest, Version::new(2, 0, 0));
    let cancel = handle.cancel_handle();

    let terminal = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match handle.next_event().await {
                Some(DownloadEvent::Progress(100)) => cancel.cancel(),
                Some(DownloadEvent::Progress(_)) => {}
                Some(other) => return other,
                None => panic!("channel closed without terminal event"),
            }
        }
    })
    .await
    .expect("download should settle promptly");

    match terminal {
        DownloadEvent::Completed(done) => {
            assert_eq!(done.version, Version::new(2, 0, 0));
            assert_eq!(std::fs::read(&dest).unwrap(), body);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(cancel.is_cancelled());
}
