use thiserror::Error;

/// Errors surfaced by the engine.
///
/// Local invariant mismatches (operating on a location a message race already
/// emptied) are deliberately not represented here; those are absorbed as
/// logged no-ops so the session stays playable under out-of-order delivery.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The server replied with `message_type: "error"` or set an `error`
    /// field on a direct reply.
    #[error("server error: {0}")]
    Protocol(String),

    /// The underlying message channel closed while a request was outstanding.
    #[error("transport channel closed")]
    ChannelClosed,

    #[error("message codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
