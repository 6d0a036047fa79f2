use crate::http::{HttpClient, Response, HTTP_TIMEOUT_MS};
use anyhow::{bail, Result};
use embedded_svc::http::client::Client;
use embedded_svc::http::Method;
use embedded_svc::io::Read;
use esp_idf_svc::http::client::{Configuration, EspHttpConnection};
use std::time::Duration;

const MAX_BODY_BYTES: usize = 16 * 1024;
const CHUNK_BYTES: usize = 1024;

/// Blocking HTTP(S) client. A fresh connection per request; TLS is
/// verified against the bundled certificate store.
#[derive(Default)]
pub struct EspHttp;

impl EspHttp {
    pub fn new() -> Self {
        Self
    }
}

impl HttpClient for EspHttp {
    fn get(&mut self, url: &str) -> Result<Response> {
        let config = Configuration {
            timeout: Some(Duration::from_millis(HTTP_TIMEOUT_MS)),
            use_global_ca_store: true,
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let mut client = Client::wrap(EspHttpConnection::new(&config)?);

        let mut response = client.request(Method::Get, url, &[])?.submit()?;
        let status = response.status();

        let mut body = Vec::new();
        let mut buffer = [0u8; CHUNK_BYTES];
        loop {
            let read = response.read(&mut buffer)?;
            if read == 0 {
                break;
            }
            body.extend_from_slice(&buffer[..read]);
            if body.len() > MAX_BODY_BYTES {
                bail!("response larger than {MAX_BODY_BYTES} bytes");
            }
        }

        Ok(Response { status, body })
    }
}
