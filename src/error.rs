use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to list GameServerSets: {0}")]
    ListGameServerSetsFailed(#[source] kube::Error),
    #[error("Failed to list GameServers of {gss}: {source}")]
    ListGameServersFailed {
        gss: String,
        #[source]
        source: kube::Error,
    },
    #[error("Failed to get pod {name}: {source}")]
    GetPodFailed {
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("Failed to update GameServer {name}: {source}")]
    UpdateGameServerFailed {
        name: String,
        #[source]
        source: kube::Error,
    },
    #[error("Timed out after {}s updating GameServers, last error: {}", .timeout.as_secs(), describe(.last_error))]
    Timeout {
        timeout: Duration,
        last_error: Option<Box<Error>>,
    },
}

fn describe(last_error: &Option<Box<Error>>) -> String {
    match last_error {
        Some(error) => error.to_string(),
        None => "none, the attempt did not finish in time".to_string(),
    }
}
