/// Errors that can occur when constructing in-memory transports.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A replay stream needs at least one byte to serve.
    #[error("replay template is empty")]
    EmptyTemplate,

    /// A capture buffer needs room for at least one byte.
    #[error("capture buffer capacity must be greater than zero")]
    ZeroCapacity,
}

pub type Result<T> = std::result::Result<T, TransportError>;
