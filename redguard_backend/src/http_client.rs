use std::time::Duration;

/// Build the shared client used for Moltbook and the model server.
///
/// System proxy discovery is opt-in through `REDGUARD_ENABLE_SYSTEM_PROXY`; the
/// model server is usually on localhost and a stray proxy breaks it.
pub fn build_http_client_with_timeout(timeout: Option<Duration>) -> reqwest::Client {
    let allow_system_proxy = std::env::var("REDGUARD_ENABLE_SYSTEM_PROXY")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if allow_system_proxy {
        match attempt_build(timeout, false) {
            Ok(client) => return client,
            Err(error) => tracing::warn!(
                "HTTP client initialization with system proxy failed ({}); retrying with no_proxy",
                error
            ),
        }
    }

    match attempt_build(timeout, true) {
        Ok(client) => client,
        Err(error) => {
            tracing::warn!(
                "HTTP client builder failed ({}); falling back to default client",
                error
            );
            reqwest::Client::new()
        }
    }
}

fn attempt_build(
    timeout: Option<Duration>,
    no_proxy: bool,
) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    if no_proxy {
        builder = builder.no_proxy();
    }
    builder.build()
}
