//! HTTP module: raw transport, response decoding and retry backoff.

mod client;
mod response;
mod retry;

pub use client::{HttpClient, Transport};
pub use response::decode_body;
pub use retry::{MAX_ATTEMPTS, Sleeper, TokioSleeper, backoff_delay, rate_limit_message};

#[cfg(test)]
pub use client::MockTransport;
#[cfg(test)]
pub use retry::MockSleeper;
