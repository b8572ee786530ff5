#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    InvalidConfiguration,
    ShapeMismatch,
    TooFewShards,
    SingularMatrix,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::InvalidConfiguration => write!(f, "Invalid shard configuration"),
            Error::ShapeMismatch => write!(f, "Mismatched shard sizes or counts"),
            Error::TooFewShards => write!(f, "Not enough shards to reconstruct the data"),
            Error::SingularMatrix => write!(f, "Matrix is singular and cannot be inverted"),
        }
    }
}

impl std::error::Error for Error {}
