/// Errors that can occur in the transport layer.
///
/// Any of these ends the connection it came from. Malformed *content* is
/// not a transport error; lines are handed up as raw bytes and judged by
/// the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed locally before the operation.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Connecting to a remote server failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The peer sent more than `limit` bytes without a newline.
    #[error("line exceeds {limit} bytes")]
    FrameTooLong { limit: usize },
}
