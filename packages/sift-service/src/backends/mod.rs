pub mod embedding;
pub mod exact;
pub mod vector;

pub use embedding::{HashingEmbedder, HttpEmbeddingProvider};
pub use exact::{HttpExactBackend, MemoryExactBackend};
pub use vector::{HttpVectorBackend, MemoryVectorBackend, QdrantVectorBackend};

use std::sync::{
	Arc,
	atomic::{AtomicBool, Ordering},
};

use crate::{
	Error, Result,
	candidate::Candidate,
	options::SearchOptions,
	ranking,
};

/// Applies the per-tier contract to raw backend output: threshold, per-entity merge, order,
/// `top_k`.
pub(crate) fn finalize(candidates: Vec<Candidate>, options: &SearchOptions) -> Vec<Candidate> {
	let kept = candidates
		.into_iter()
		.filter(|candidate| candidate.score >= options.score_threshold)
		.collect();
	let mut merged = ranking::merge(kept);

	merged.sort_by(ranking::compare);
	merged.truncate(options.top_k as usize);

	merged
}

/// Runs CPU-bound tier work on the blocking pool.
///
/// Dropping the returned future, which is what a tier timeout does, raises the flag handed to
/// `work` so long scans stop early instead of holding a blocking thread.
pub(crate) async fn run_blocking<T, F>(label: &'static str, work: F) -> Result<T>
where
	T: 'static + Send,
	F: 'static + Send + FnOnce(&AtomicBool) -> T,
{
	let cancel = Arc::new(AtomicBool::new(false));
	let guard = CancelOnDrop(cancel.clone());
	let joined = tokio::task::spawn_blocking(move || work(&cancel)).await;

	drop(guard);

	joined.map_err(|err| Error::Backend { message: format!("{label} task failed: {err}") })
}

struct CancelOnDrop(Arc<AtomicBool>);
impl Drop for CancelOnDrop {
	fn drop(&mut self) {
		self.0.store(true, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	#[tokio::test]
	async fn dropping_the_future_raises_the_cancel_flag() {
		let (seen_tx, seen_rx) = std::sync::mpsc::channel();
		let work = run_blocking("Spin", move |cancel| {
			while !cancel.load(Ordering::Relaxed) {
				std::thread::sleep(Duration::from_millis(1));
			}

			let _ = seen_tx.send(());
		});

		assert!(tokio::time::timeout(Duration::from_millis(5), work).await.is_err());
		assert!(seen_rx.recv_timeout(Duration::from_secs(5)).is_ok());
	}

	#[tokio::test]
	async fn returns_the_work_result() {
		let value = run_blocking("Sum", |_| 2 + 2).await.expect("Blocking work should finish.");

		assert_eq!(value, 4);
	}
}
