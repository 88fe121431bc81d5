//! Retrying real exchanges against a mock peer

use mockito::Server;
use peerfetch::{ErrorKind, HttpClient, RequestConfig, RetryPolicy, execute_with_retry};
use peerfetch_testkit::{get_shared_mock_server, temp_dir_in_workspace};
use std::time::Duration;

#[test]
fn test_retry_exhausts_attempts_on_server_error() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/api/files/seg_0.dat")
        .with_status(503)
        .expect(3)
        .create();

    let config = RequestConfig::new(&format!("{}/api/files/seg_0.dat", server.url())).unwrap();
    let policy = RetryPolicy::new(3, Duration::from_millis(10));

    let err = execute_with_retry(&policy, |client| client.execute(&config)).unwrap_err();

    mock.assert();
    assert_eq!(err.kind(), ErrorKind::HttpStatusError);
}

#[test]
fn test_retry_stops_after_success() {
    let (mock, base) = {
        let mut server = get_shared_mock_server();
        let mock = server
            .mock("GET", "/retry-success/seg_0.dat")
            .with_body("ok")
            .expect(1)
            .create();
        (mock, server.url())
    };

    let config = RequestConfig::new(&format!("{}/retry-success/seg_0.dat", base)).unwrap();
    let temp = temp_dir_in_workspace();
    let target = temp.path().join("seg_0.dat");

    let mut client = HttpClient::new();
    let written = client
        .execute_with_retry(&RetryPolicy::new(4, Duration::from_millis(10)), |client| {
            client.download(&config, &target)
        })
        .unwrap();

    mock.assert();
    assert_eq!(written, 2);
    assert_eq!(client.get_http_status(), 200);
}

#[test]
fn test_retry_download_leaves_no_partial_file() {
    let (mock, base) = {
        let mut server = get_shared_mock_server();
        let mock = server
            .mock("GET", "/retry-fail/seg_0.dat")
            .with_status(500)
            .expect(2)
            .create();
        (mock, server.url())
    };

    let config = RequestConfig::new(&format!("{}/retry-fail/seg_0.dat", base)).unwrap();
    let temp = temp_dir_in_workspace();
    let target = temp.path().join("seg_0.dat");

    let err = execute_with_retry(&RetryPolicy::new(2, Duration::ZERO), |client| {
        client.download(&config, &target)
    })
    .unwrap_err();

    mock.assert();
    assert_eq!(err.kind(), ErrorKind::HttpStatusError);
    assert!(!target.exists());
}
