//! Transport construction for peer requests

use reqwest::blocking::Client;

/// Builds the blocking transport used by one [`HttpClient`](crate::HttpClient)
///
/// No client-level timeout is set; every request carries its own.
///
/// # Arguments
///
/// * `user_agent` - Value of the `User-Agent` header
/// * `verify_tls` - When false, invalid server certificates are accepted
///
/// # Errors
///
/// Returns error if the TLS backend cannot be initialised
pub fn build_transport(user_agent: &str, verify_tls: bool) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(None::<std::time::Duration>)
        .danger_accept_invalid_certs(!verify_tls)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_transport() {
        assert!(build_transport("peerfetch", true).is_ok());
        assert!(build_transport("peerfetch", false).is_ok());
    }
}
