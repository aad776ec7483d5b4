//! Replica racer - first answer among a category's replicas wins

use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use contracts::{Query, RaceOutcome, SearchBackend, StragglerPolicy};

use crate::category::Category;
use crate::error::DispatcherError;

/// Race every replica of `category` for `query`.
///
/// Returns the first delivered result. With [`StragglerPolicy::Detach`] the
/// losers keep running and their results are discarded; with
/// [`StragglerPolicy::Cancel`] they are cancelled as soon as a winner is
/// known, or when `parent` fires.
#[instrument(
    name = "race",
    skip(category, parent),
    fields(category = %category.name(), replicas = category.len())
)]
pub async fn race_with_policy<B>(
    query: &Query,
    category: &Category<B>,
    policy: StragglerPolicy,
    parent: Option<&CancellationToken>,
) -> Result<RaceOutcome, DispatcherError>
where
    B: SearchBackend + Sync + 'static,
{
    if category.is_empty() {
        return Err(DispatcherError::empty_category(category.name()));
    }

    let started = Instant::now();
    let token = match policy {
        StragglerPolicy::Detach => None,
        StragglerPolicy::Cancel => Some(
            parent
                .map(CancellationToken::child_token)
                .unwrap_or_default(),
        ),
    };

    let mut pending = JoinSet::new();
    for (index, producer) in category.replicas().iter().enumerate() {
        let rx = match &token {
            Some(token) => producer.start_with_cancel(query.clone(), token.clone()),
            None => producer.start(query.clone()),
        };
        pending.spawn(async move { (index, rx.await) });
    }

    let outcome = loop {
        match pending.join_next().await {
            Some(Ok((index, Ok(result)))) => {
                let replica = category.replicas()[index].name().to_string();
                let latency = started.elapsed();
                debug!(
                    replica = %replica,
                    elapsed_ms = latency.as_millis() as u64,
                    "race won"
                );
                break Ok(RaceOutcome {
                    replica,
                    result,
                    latency,
                });
            }
            Some(Ok((index, Err(_)))) => {
                let replica = category.replicas()[index].name();
                debug!(replica, "replica went away without a result");
            }
            Some(Err(e)) => {
                warn!(error = %e, "race waiter failed");
            }
            None => {
                let cancelled = token.as_ref().is_some_and(CancellationToken::is_cancelled);
                break Err(if cancelled {
                    DispatcherError::cancelled(category.name())
                } else {
                    DispatcherError::all_replicas_lost(category.name())
                });
            }
        }
    };

    // Losers only; the winner has already delivered.
    if let Some(token) = token {
        token.cancel();
    }
    outcome
}

/// Race with the default policy: losers are left running
pub async fn race<B>(query: &Query, category: &Category<B>) -> Result<RaceOutcome, DispatcherError>
where
    B: SearchBackend + Sync + 'static,
{
    race_with_policy(query, category, StragglerPolicy::Detach, None).await
}
