use futures_util::stream::{self, StreamExt};
use tracing::warn;

use super::model::Artifact;

/// Fan-out for local hash checks, independent of download concurrency.
pub const VALIDATION_FANOUT: usize = 10;

/// Check artifacts against the local disk with bounded concurrency and
/// return the ones that need downloading, in input order.
///
/// `on_checked` is called once per artifact with the number checked so far.
pub async fn collect_invalid<F>(artifacts: Vec<Artifact>, fanout: usize, mut on_checked: F) -> Vec<Artifact>
where
    F: FnMut(usize),
{
    let mut checked = 0usize;
    let mut verdicts: Vec<(usize, Artifact, bool)> = stream::iter(artifacts.into_iter().enumerate())
        .map(|(position, artifact)| async move {
            let probe = artifact.clone();
            let valid = match tokio::task::spawn_blocking(move || probe.validate_local()).await {
                Ok(valid) => valid,
                Err(err) => {
                    warn!("Validation task for {} failed: {}", artifact.id, err);
                    false
                }
            };
            (position, artifact, valid)
        })
        .buffer_unordered(fanout.max(1))
        .inspect(|_| {
            checked += 1;
            on_checked(checked);
        })
        .collect()
        .await;

    verdicts.sort_by_key(|(position, _, _)| *position);
    verdicts
        .into_iter()
        .filter(|(_, _, valid)| !valid)
        .map(|(_, artifact, _)| artifact)
        .collect()
}
