//! Shared mockito server for parallel test execution

use lazy_static::lazy_static;
use mockito::{Server, ServerGuard};
use std::sync::{Mutex, MutexGuard};

lazy_static! {
    /// Global mock peer shared by all tests in one binary
    ///
    /// Tests must mock distinct paths; mocks are removed when dropped.
    pub static ref SHARED_MOCK_SERVER: Mutex<ServerGuard> = Mutex::new(Server::new());
}

/// Locks the shared mock server
///
/// Hold the guard only while creating mocks, not while issuing requests.
///
/// # Examples
///
/// ```no_run
/// use peerfetch_testkit::get_shared_mock_server;
///
/// fn test_with_shared_server() {
///     let (mock, base) = {
///         let mut server = get_shared_mock_server();
///         let mock = server.mock("GET", "/unique/seg.dat").with_body("x").create();
///         (mock, server.url())
///     };
///     // issue requests against `base` here
///     mock.assert();
/// }
/// ```
pub fn get_shared_mock_server() -> MutexGuard<'static, ServerGuard> {
    // A panic in another test leaves the server usable
    SHARED_MOCK_SERVER
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
