use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use log::{error, info};
use snafu::ResultExt;

use crate::errors::{CustomResult, SerializationSnafu, TransportSnafu};
use crate::modules::models::run::Referee;
use crate::modules::models::submission::{SubmissionRecord, SubmitStatus};

pub const CHECK_LOGIN_PATH: &str = "/api/v1/login_required";

pub type TransportFuture = Pin<Box<dyn Future<Output = CustomResult<WebResponse>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebResponse {
    pub status: u16,
    pub body: String,
}

impl WebResponse {
    /// 200 and 201 are the only accepted answers to a submission
    pub fn submit_status(&self) -> SubmitStatus {
        match self.status {
            200 | 201 => SubmitStatus::Successful,
            _ => SubmitStatus::Failed,
        }
    }
}

/// The network seam of the submission flow.
///
/// Futures are `'static` so an attempt can outlive the run that started it.
pub trait Transport: Send + Sync {
    fn post_json(&self, url: &str, referee: &Referee, body: String) -> TransportFuture;

    fn get(&self, url: &str, referee: &Referee) -> TransportFuture;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// # create http transport
    ///
    /// ## Arguments
    /// * `timeout` - Applied to every request, a stuck server counts as a failed attempt
    pub fn new(timeout: Duration) -> CustomResult<HttpTransport> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context(TransportSnafu { url: "<client>" })?;
        Ok(HttpTransport { client })
    }

    async fn read_response(url: String, request: reqwest::RequestBuilder) -> CustomResult<WebResponse> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                error!(target: "submit_api:send", "Error sending request to {}: (error: {})", url, err);
                return Err(err).context(TransportSnafu { url });
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.context(TransportSnafu { url: url.clone() })?;
        info!(target: "submit_api:send", "{} answered {}", url, status);
        Ok(WebResponse { status, body })
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, url: &str, referee: &Referee, body: String) -> TransportFuture {
        let request = self
            .client
            .post(url)
            .basic_auth(&referee.name, Some(&referee.auth))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);
        Box::pin(HttpTransport::read_response(url.to_string(), request))
    }

    fn get(&self, url: &str, referee: &Referee) -> TransportFuture {
        let request = self
            .client
            .get(url)
            .basic_auth(&referee.name, Some(&referee.auth));
        Box::pin(HttpTransport::read_response(url.to_string(), request))
    }
}

/// # submit a run
/// post the record and classify the answer. transport errors are reported as
/// a failed attempt with the error text as response
///
/// ## Arguments
/// * `transport` - The transport to send with
/// * `url` - host + path of the submit endpoint
/// * `record` - The record to send
///
/// ## Returns
/// * `(SubmitStatus, String)` - The status and the response text
pub async fn submit_run(transport: &dyn Transport, url: &str, record: &SubmissionRecord) -> (SubmitStatus, String) {
    let body = match serde_json::to_string(record).context(SerializationSnafu { what: "submission" }) {
        Ok(body) => body,
        Err(error) => return (SubmitStatus::Failed, error.to_string()),
    };

    match transport.post_json(url, &record.referee, body).await {
        Ok(response) => (response.submit_status(), response.body),
        Err(error) => (SubmitStatus::Failed, error.to_string()),
    }
}

/// # check login
/// the credentials are valid when the server answers 200 with the body `"ok"`
pub async fn check_login(transport: &dyn Transport, host: &str, referee: &Referee) -> bool {
    let url = format!("{}{}", host, CHECK_LOGIN_PATH);
    match transport.get(&url, referee).await {
        Ok(response) => response.status == 200 && response.body == "ok",
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_and_201_are_successful() {
        let response = |status| WebResponse { status, body: String::new() };
        assert_eq!(response(200).submit_status(), SubmitStatus::Successful);
        assert_eq!(response(201).submit_status(), SubmitStatus::Successful);
        assert_eq!(response(204).submit_status(), SubmitStatus::Failed);
        assert_eq!(response(401).submit_status(), SubmitStatus::Failed);
        assert_eq!(response(500).submit_status(), SubmitStatus::Failed);
    }
}
