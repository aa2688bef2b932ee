use thiserror::Error;

/// Errors returned by [`ClusterClient`](super::ClusterClient) calls
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("{kind} `{name}` not found")]
    NotFound { kind: &'static str, name: String },

    #[error("{kind} `{name}` already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("{operation} failed: {source}")]
    Api {
        operation: String,
        #[source]
        source: kube::Error,
    },

    #[error("unable to resolve cluster configuration: {0}")]
    Config(String),

    #[error("unable to construct cluster client: {0}")]
    Client(#[source] kube::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ClusterError {
    /// Sort a kube error into not-found, already-exists, or a generic API
    /// failure.
    pub fn classify(
        err: kube::Error,
        kind: &'static str,
        name: &str,
        operation: impl Into<String>,
    ) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => ClusterError::NotFound {
                kind,
                name: name.to_string(),
            },
            kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => {
                ClusterError::AlreadyExists {
                    kind,
                    name: name.to_string(),
                }
            }
            _ => ClusterError::Api {
                operation: operation.into(),
                source: err,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ClusterError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, ClusterError::AlreadyExists { .. })
    }
}

#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::core::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{reason} from test"),
        reason: reason.to_string(),
        code,
    })
}
