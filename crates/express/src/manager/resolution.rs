//! Quote fan-out and fee estimation run off the actor task

use super::state::ExpressStatus;
use crate::fee::{depends_on_allowance, FeeResolver};
use express_error::{ExpressError, Result};
use express_provider::ProviderPool;
use express_resilience::with_timeout;
use express_traits::{
    Amount, ExpressApprovePolicy, ExpressAvailableProvider, ExpressManagerSwappingPair,
    ProviderQuote, QuoteProvider,
};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What to do for the current inputs
pub(crate) enum Plan {
    /// Nothing to fetch; publish this status
    Settle(ExpressStatus),
    /// Query these providers
    Resolve(Vec<Arc<dyn QuoteProvider>>),
}

/// Decides whether the inputs warrant network work
pub(crate) fn plan(
    pool: &ProviderPool,
    pair: Option<&ExpressManagerSwappingPair>,
    amount: Option<Amount>,
) -> Plan {
    let Some(pair) = pair else {
        return Plan::Settle(ExpressStatus::Idle);
    };

    let providers = pool.eligible(pair);
    if providers.is_empty() {
        return Plan::Settle(ExpressStatus::Failed(ExpressError::PairUnsupported {
            source_currency: pair.source.currency.symbol.clone(),
            destination_currency: pair.destination.currency.symbol.clone(),
        }));
    }

    match amount {
        None => Plan::Settle(ExpressStatus::Idle),
        Some(amount) if amount.is_zero() => Plan::Settle(ExpressStatus::Failed(
            ExpressError::InvalidAmount("amount must be greater than zero".into()),
        )),
        Some(_) => Plan::Resolve(providers),
    }
}

/// Returns true if `entry` has a quote whose fee follows the approve policy
pub(crate) fn needs_approval(entry: &ExpressAvailableProvider) -> bool {
    entry
        .quote()
        .map_or(false, |resolved| depends_on_allowance(&entry.provider, &resolved.quote))
}

/// Quotes every provider in parallel and resolves fees per success.
///
/// The result keeps the order of `providers`. One provider failing or
/// timing out never affects its siblings.
pub(crate) async fn quote_all(
    providers: Vec<Arc<dyn QuoteProvider>>,
    pair: ExpressManagerSwappingPair,
    amount: Amount,
    policy: ExpressApprovePolicy,
    fees: FeeResolver,
    quote_timeout: Duration,
) -> Vec<ExpressAvailableProvider> {
    let requests = providers.iter().map(|provider| {
        let pair = &pair;
        let fees = &fees;
        async move {
            let result = quote_one(provider.as_ref(), pair, amount, policy, fees, quote_timeout).await;
            if let Err(error) = &result {
                debug!(provider = %provider.id(), code = ?error.code(), error = %error, "provider failed");
            }
            ExpressAvailableProvider {
                provider: provider.provider().clone(),
                result,
                is_best: false,
            }
        }
    });

    join_all(requests).await
}

async fn quote_one(
    provider: &dyn QuoteProvider,
    pair: &ExpressManagerSwappingPair,
    amount: Amount,
    policy: ExpressApprovePolicy,
    fees: &FeeResolver,
    quote_timeout: Duration,
) -> Result<ProviderQuote> {
    let quote = with_timeout(quote_timeout, "quote", provider.quote(pair, amount, policy)).await?;
    fees.resolve(provider.provider(), quote, policy).await
}

/// Re-estimates approval fees under `policy` for entries that need one.
///
/// Quotes are reused as they are; other entries pass through untouched.
pub(crate) async fn reestimate_approvals(
    providers: Vec<ExpressAvailableProvider>,
    policy: ExpressApprovePolicy,
    fees: FeeResolver,
) -> Vec<ExpressAvailableProvider> {
    let updates = providers.into_iter().map(|mut entry| {
        let fees = &fees;
        async move {
            let target = entry
                .quote()
                .filter(|resolved| depends_on_allowance(&entry.provider, &resolved.quote))
                .and_then(|resolved| {
                    let spender = resolved.quote.allowance.as_ref()?.spender.clone();
                    Some((spender, resolved.quote.from_amount))
                });
            let Some((spender, from_amount)) = target else {
                return entry;
            };

            match fees.approve_requirement(&spender, from_amount, policy).await {
                Ok(approve) => {
                    if let Ok(resolved) = &mut entry.result {
                        resolved.fee = approve.fee;
                        resolved.approve = Some(approve);
                    }
                }
                Err(error) => {
                    warn!(provider = %entry.provider.id, error = %error, "approval fee estimate failed");
                    entry.result = Err(error);
                }
            }
            entry
        }
    });

    join_all(updates).await
}
