use crate::decode::decode_image;
use crate::types::{FetchError, FetchOutcome};
use crate::LoaderConfig;
use log::debug;

/// Turns a url into a decoded image. Called on worker threads, so it is free to block.
pub trait ImageFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FetchOutcome;
}

/// Fetches over HTTP(S) with ureq and decodes the body with zune.
pub struct HttpImageFetcher {
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl HttpImageFetcher {
    pub fn new(config: &LoaderConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .build();

        Self {
            agent: ureq::Agent::new_with_config(agent_config),
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Reads the full response body. Non-2xx responses surface as `FetchError::Status`.
    pub fn read_data_from_remote(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        debug!("Start read from remote: {}", url);

        let mut response = self.agent.get(url).call()?;

        let bytes = response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_vec()?;

        debug!("Done  read from remote: {} ({} bytes)", url, bytes.len());

        Ok(bytes)
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> FetchOutcome {
        let data = self.read_data_from_remote(url)?;
        decode_image(&data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::encode_png;
    use crate::types::FailureKind;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    /// Serves exactly one request with the given status line and body, returns the base url.
    fn serve_once(status: &'static str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = Vec::new();
                let mut buf = [0u8; 512];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let header = format!(
                    "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(header.as_bytes());
                let _ = stream.write_all(&body);
                let _ = stream.flush();
            }
        });

        format!("http://{}/image.png", addr)
    }

    fn fetcher() -> HttpImageFetcher {
        HttpImageFetcher::new(&LoaderConfig {
            timeout: Duration::from_secs(5),
            ..LoaderConfig::default()
        })
    }

    #[test]
    fn test_fetch_png() {
        let url = serve_once("200 OK", encode_png(2, 2, [255, 0, 0, 255]));
        let bitmap = fetcher().fetch(&url).unwrap();

        assert_eq!((bitmap.width, bitmap.height), (2, 2));
        assert_eq!(&bitmap.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_fetch_not_found() {
        let url = serve_once("404 Not Found", Vec::new());
        let err = fetcher().fetch(&url).unwrap_err();

        assert_eq!(err, FetchError::Status(404));
        assert_eq!(err.kind(), FailureKind::Network);
    }

    #[test]
    fn test_fetch_undecodable_body() {
        let url = serve_once("200 OK", b"<html>not an image</html>".to_vec());
        let err = fetcher().fetch(&url).unwrap_err();

        assert_eq!(err.kind(), FailureKind::Decode);
    }

    #[test]
    fn test_fetch_connection_refused() {
        // Bind then drop to get a port nobody listens on
        let addr = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        let err = fetcher()
            .fetch(&format!("http://{}/missing.png", addr))
            .unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
    }
}
