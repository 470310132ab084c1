const fn server_host() -> &'static str {
    if let Some(host) = option_env!("LOCATION_SERVER_HOST") {
        host
    } else {
        "localhost"
    }
}

const fn server_port() -> u16 {
    if let Some(port) = option_env!("LOCATION_SERVER_PORT") {
        const_str::parse!(port, u16)
    } else {
        3537
    }
}

const fn server_secure() -> bool {
    if let Some(secure) = option_env!("LOCATION_SERVER_SECURE") {
        const_str::eq_ignore_ascii_case!(secure, "true") || const_str::equal!(secure, "1")
    } else {
        false
    }
}

const fn server_http_proto() -> &'static str {
    if server_secure() { "https" } else { "http" }
}

const SERVER_HOST: &str = server_host();
const SERVER_PORT: u16 = server_port();
const SERVER_HTTP_PROTO: &str = server_http_proto();

const SERVER_SOCKET: &str = const_str::concat!(SERVER_HOST, ":", SERVER_PORT);

/// Base URL of the location service this build talks to by default
pub const SERVER_HTTP_URL: &str = const_str::concat!(SERVER_HTTP_PROTO, "://", SERVER_SOCKET);

/// URL of the record for `id` under the service at `base`
pub fn location_url(base: &str, id: &str) -> String {
    format!("{}/api/location/{id}", base.trim_end_matches('/'))
}

pub(crate) fn initialize_url(base: &str) -> String {
    format!("{}/api/location/initialize", base.trim_end_matches('/'))
}
