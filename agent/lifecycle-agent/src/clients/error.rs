use snafu::Snafu;

/// The error type returned by [`CallbackClient`] implementations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ClientError {
    #[snafu(display("Unable to build HTTP client: {}", source))]
    BuildHttpClient { source: reqwest::Error },

    #[snafu(display("Unable to deliver response to '{}': {}", url, source))]
    DeliverResponse { url: String, source: reqwest::Error },

    #[snafu(display("Response delivery to '{}' was rejected with status {}", url, status))]
    ResponseRejected { url: String, status: u16 },

    #[snafu(display("Unable to serialize response document: {}", source))]
    SerializeResponse { source: serde_json::Error },
}

/// The result type returned by [`CallbackClient`] implementations.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
