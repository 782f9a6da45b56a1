pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] sift_config::Error),
	#[error(transparent)]
	Provider(#[from] sift_providers::Error),
	#[error("Invalid options: {message}")]
	InvalidOptions { message: String },
	#[error("Watchlist error: {message}")]
	Watchlist { message: String },
	#[error("Qdrant error: {message}")]
	Qdrant { message: String },
	#[error("Backend error: {message}")]
	Backend { message: String },
}
impl Error {
	/// Network-level failures that should be reported as an unavailable backend.
	pub fn is_unavailable(&self) -> bool {
		match self {
			Self::Provider(err) => err.is_unavailable(),
			Self::Qdrant { .. } => true,
			_ => false,
		}
	}
}

impl From<qdrant_client::QdrantError> for Error {
	fn from(err: qdrant_client::QdrantError) -> Self {
		Self::Qdrant { message: err.to_string() }
	}
}
