// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Backend transport boundary.
//!
//! [`BackendTransport`] is the seam between the adapter and the network.
//! [`HttpTransport`] is the production implementation; [`MockTransport`]
//! records requests and replays scripted responses so the pipeline can be
//! exercised without a backend.

use crate::error::ForwardError;
use crate::protocol::{BackendRequest, BackendResponse, Method};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

/// Backend host and port.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Executes backend requests against an endpoint.
pub trait BackendTransport: Send + Sync {
    fn execute(
        &self,
        endpoint: &Endpoint,
        request: &BackendRequest,
    ) -> Result<BackendResponse, ForwardError>;
}

/// Blocking HTTP transport with an explicit request timeout.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, ForwardError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForwardError::Configuration(format!("http client: {e}")))?;
        Ok(Self { client })
    }
}

impl BackendTransport for HttpTransport {
    fn execute(
        &self,
        endpoint: &Endpoint,
        request: &BackendRequest,
    ) -> Result<BackendResponse, ForwardError> {
        let url = format!("http://{}{}", endpoint, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &url).query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .map_err(|e| ForwardError::Connectivity(format!("{endpoint}: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| ForwardError::Connectivity(format!("{endpoint}: {e}")))?;

        Ok(BackendResponse { status, body })
    }
}

/// Scripted in-memory transport for tests and embedding.
///
/// Responses are consumed in push order; once the script is exhausted every
/// request succeeds with an empty `200`.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<(Endpoint, BackendRequest)>>,
    script: Mutex<VecDeque<Result<BackendResponse, ForwardError>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next request.
    pub fn push_response(&self, response: BackendResponse) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queue a transport-level failure for the next request.
    pub fn push_error(&self, error: ForwardError) {
        self.script.lock().push_back(Err(error));
    }

    /// All requests executed so far, in order.
    pub fn requests(&self) -> Vec<(Endpoint, BackendRequest)> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl BackendTransport for MockTransport {
    fn execute(
        &self,
        endpoint: &Endpoint,
        request: &BackendRequest,
    ) -> Result<BackendResponse, ForwardError> {
        self.requests.lock().push((endpoint.clone(), request.clone()));
        match self.script.lock().pop_front() {
            Some(result) => result,
            None => Ok(BackendResponse { status: 200, body: String::new() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BackendRequest {
        BackendRequest {
            method: Method::Get,
            path: "/ping".into(),
            query: Vec::new(),
            body: None,
        }
    }

    #[test]
    fn test_mock_replays_script_then_defaults_to_ok() {
        let transport = MockTransport::new();
        transport.push_response(BackendResponse { status: 409, body: "exists".into() });
        transport.push_error(ForwardError::Connectivity("refused".into()));

        let endpoint = Endpoint::new("localhost", 8086);
        assert_eq!(transport.execute(&endpoint, &request()).unwrap().status, 409);
        assert!(transport.execute(&endpoint, &request()).is_err());
        assert_eq!(transport.execute(&endpoint, &request()).unwrap().status, 200);
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn test_endpoint_display() {
        assert_eq!(Endpoint::new("influx.local", 8086).to_string(), "influx.local:8086");
    }
}
