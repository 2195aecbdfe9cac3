/// One identity a contextualized node has published to the broker.
#[derive(Debug, Clone, Default)]
pub struct CtxIdentity {
    pub ip: Option<String>,
    pub hostname: Option<String>,
    pub pubkey: Option<String>,
}

/// One node as seen by the context broker: the set of identities it has
/// reported (usually one, but nothing here assumes exactly one), plus the
/// node-level completion signal. `ok_occurred`/`error_occurred`/
/// `error_code`/`error_message` live here, not on the identity — a ctx_node
/// can carry several identities but only one completion verdict.
#[derive(Debug, Clone, Default)]
pub struct CtxNode {
    pub identities: Vec<CtxIdentity>,
    pub ok_occurred: bool,
    pub error_occurred: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

/// Result of querying an open context.
#[derive(Debug, Clone, Default)]
pub struct ContextStatus {
    pub nodes: Vec<CtxNode>,
    pub complete: bool,
    pub expected_count: usize,
}
