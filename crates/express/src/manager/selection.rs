//! Provider selection and failure aggregation
//!
//! Pure functions over a resolved provider snapshot.

use super::state::{ExpressReadyQuote, ExpressStatus};
use express_error::ExpressError;
use express_traits::{Amount, ExpressAvailableProvider, ExpressFeeOption};
use std::cmp::Ordering;

/// Index of the best-rate provider.
///
/// Highest `expect_amount` wins, then the lower `priority` value, then the
/// earlier registration.
pub fn best_provider(providers: &[ExpressAvailableProvider]) -> Option<usize> {
    providers
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| entry.quote().map(|quote| (index, entry, quote)))
        .max_by(|(a_index, a, a_quote), (b_index, b, b_quote)| {
            a_quote
                .quote
                .expect_amount
                .value
                .cmp(&b_quote.quote.expect_amount.value)
                .then_with(|| b.provider.priority.cmp(&a.provider.priority))
                .then_with(|| b_index.cmp(a_index))
        })
        .map(|(index, _, _)| index)
}

/// Marks the best provider and picks the selection.
///
/// The previous selection is kept while it still has a quote; otherwise the
/// best provider is selected. `None` means no provider succeeded.
pub fn select_provider(
    providers: &mut [ExpressAvailableProvider],
    previous: Option<&str>,
) -> Option<usize> {
    let best = best_provider(providers);
    for (index, entry) in providers.iter_mut().enumerate() {
        entry.is_best = Some(index) == best;
    }

    previous
        .and_then(|id| {
            providers
                .iter()
                .position(|entry| entry.provider.id == id && entry.is_available())
        })
        .or(best)
}

/// Failure reported when no provider succeeded.
///
/// When every failure is a provider amount limit the amount itself is the
/// problem: the result is `InvalidAmount` naming the most permissive limit
/// (smallest minimum, else largest maximum). Anything else is
/// `NoProvidersAvailable`.
pub fn aggregate_failure(providers: &[ExpressAvailableProvider], decimals: u8) -> ExpressError {
    let errors: Vec<&ExpressError> = providers.iter().filter_map(|p| p.error()).collect();
    if errors.is_empty() || !errors.iter().all(|e| e.is_amount_restriction()) {
        return ExpressError::NoProvidersAvailable;
    }

    let minimum = errors
        .iter()
        .filter_map(|e| match e {
            ExpressError::AmountTooSmall { minimum } => Some(*minimum),
            _ => None,
        })
        .min();
    let maximum = errors
        .iter()
        .filter_map(|e| match e {
            ExpressError::AmountTooBig { maximum } => Some(*maximum),
            _ => None,
        })
        .max();

    match (minimum, maximum) {
        (Some(minimum), _) => ExpressError::InvalidAmount(format!(
            "amount is below the minimum of {}",
            Amount::from_smallest_unit(minimum, decimals)
        )),
        (None, Some(maximum)) => ExpressError::InvalidAmount(format!(
            "amount exceeds the maximum of {}",
            Amount::from_smallest_unit(maximum, decimals)
        )),
        (None, None) => ExpressError::NoProvidersAvailable,
    }
}

/// Status for a selected entry: its ready quote, or its own failure
pub fn status_for(entry: &ExpressAvailableProvider, fee_option: ExpressFeeOption) -> ExpressStatus {
    match &entry.result {
        Ok(resolved) => ExpressStatus::Ready(ExpressReadyQuote {
            provider: entry.provider.clone(),
            quote: resolved.quote.clone(),
            fee: resolved.fee,
            selected_fee: *resolved.fee.fee(fee_option),
            approve: resolved.approve.clone(),
        }),
        Err(error) => ExpressStatus::Failed(error.clone()),
    }
}

/// Orders two entries by rate, for callers sorting a snapshot for display
pub fn compare_rates(a: &ExpressAvailableProvider, b: &ExpressAvailableProvider) -> Ordering {
    let rate = |entry: &ExpressAvailableProvider| entry.quote().map(|q| q.quote.expect_amount.value);
    rate(b).cmp(&rate(a))
}
