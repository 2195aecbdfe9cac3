use thiserror::Error;

/// The error taxonomy from the original spec, reproduced as typed
/// variants. `Display` renders `"{PREFIX} {detail}"` so a stored
/// `state_desc` string matches the original implementation's format
/// exactly (useful for any downstream consumer that still greps on the
/// prefix).
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Request structurally malformed, or group/spec mismatch. Raised
    /// synchronously (never persisted) when the request cannot even
    /// identify its subscribers; recorded as a FAILED launch/node batch
    /// otherwise.
    #[error("INVALID_REQUEST {0}")]
    InvalidRequest(String),

    /// DTRS said no. Always recorded, never raised.
    #[error("DTRS_LOOKUP_FAILED {0}")]
    DtrsLookupFailed(String),

    /// Cluster document failed to parse.
    #[error("CONTEXT_DOC_INVALID {0}")]
    ContextDocInvalid(String),

    /// Context broker `create()` failed.
    #[error("CONTEXT_CREATE_FAILED {0}")]
    ContextCreateFailed(String),

    /// Cluster document requests an unsupported shape (e.g. no
    /// contextualization at all).
    #[error("NOT_IMPLEMENTED {0}")]
    NotImplemented(String),

    /// IaaS launch returned a node count that doesn't match the request.
    #[error("IAAS_PROBLEM {0}")]
    IaasProblem(String),

    /// Reconciler could not find a node's `iaas_id` past the startup
    /// grace window.
    #[error("NODE_DISAPPEARED")]
    NodeDisappeared,

    /// Anything else that escaped the core's normal error paths — never
    /// propagated past `execute_provision`'s outer boundary.
    #[error("PROGRAMMER_ERROR {0}")]
    ProgrammerError(String),
}

impl ProvisioningError {
    /// The `state_desc` string to persist for this error, identical to
    /// what `Display` renders — kept as a named method since callers
    /// reach for it at every store-and-notify call site.
    pub fn state_desc(&self) -> String {
        self.to_string()
    }
}
