pub mod nominatim;
pub mod overpass;
pub mod yandex;

use anyhow::{Context, Result};
use std::time::Duration;

use crate::domain::{Point, RawElement};

pub use nominatim::NominatimClient;
pub use overpass::{OverpassClient, OverpassResponse};
pub use yandex::YandexClient;

/// Source of raw building elements around a point.
///
/// An `Err` means the provider itself was unreachable, not that the area is empty.
pub trait GeodataSource: Send + Sync {
    fn fetch_elements(&self, point: Point) -> Result<Vec<RawElement>>;
}

/// One reverse-geocoding tier.
///
/// `Ok(None)` is "no usable address"; `Err` is a transport or decoding failure.
pub trait AddressLookup: Send + Sync {
    fn name(&self) -> &str;
    fn reverse_geocode(&self, point: Point) -> Result<Option<String>>;
}

pub(crate) fn http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::blocking::Client> {
    let builder = reqwest::blocking::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout);
    // Loopback test servers must not be routed through an ambient proxy
    #[cfg(test)]
    let builder = builder.no_proxy();
    builder.build().context("Failed to create HTTP client")
}

/// Trim and drop blank address strings
pub(crate) fn non_empty(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod test_server {
    //! One-shot HTTP responders on a loopback socket.

    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve a single response and hand back the raw request line + body.
    pub fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let body = body.to_string();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();

            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                let lower = line.to_ascii_lowercase();
                if let Some(value) = lower.strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
            }

            let mut request_body = vec![0u8; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            let mut stream = reader.into_inner();
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();

            format!(
                "{}{}",
                request_line.trim_end(),
                String::from_utf8_lossy(&request_body)
            )
        });

        (url, handle)
    }

    /// A listener that accepts connections at the kernel level but never replies.
    pub fn silent() -> (String, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        (url, listener)
    }
}
