//! On-ramp payment method selection

use express_error::Result;
use express_traits::{OnrampPaymentMethod, OnrampPaymentMethodType, OnrampRepository, PaymentCapability};
use std::sync::Arc;
use tracing::debug;

/// Returns true if `method` can be offered on this platform.
///
/// Google Pay is never offered; Apple Pay only when the platform can make
/// payments with it.
pub fn is_supported(method: &OnrampPaymentMethod, capability: &dyn PaymentCapability) -> bool {
    match method.method_type {
        OnrampPaymentMethodType::GooglePay => false,
        OnrampPaymentMethodType::ApplePay => capability.can_make_payments(),
        _ => true,
    }
}

/// Picks the method to preselect: Apple Pay, then card, then the first
/// supported entry.
pub fn preferred(methods: &[OnrampPaymentMethod], capability: &dyn PaymentCapability) -> Option<OnrampPaymentMethod> {
    let supported: Vec<&OnrampPaymentMethod> = methods.iter().filter(|m| is_supported(m, capability)).collect();

    let by_type = |wanted: OnrampPaymentMethodType| supported.iter().find(|m| m.method_type == wanted).copied();
    by_type(OnrampPaymentMethodType::ApplePay)
        .or_else(|| by_type(OnrampPaymentMethodType::Card))
        .or_else(|| supported.first().copied())
        .cloned()
}

/// Filters and ranks the payment methods of an on-ramp catalog
#[derive(Clone)]
pub struct PaymentMethodDeterminer {
    repository: Arc<dyn OnrampRepository>,
    capability: Arc<dyn PaymentCapability>,
}

impl std::fmt::Debug for PaymentMethodDeterminer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentMethodDeterminer")
            .field("can_make_payments", &self.capability.can_make_payments())
            .finish()
    }
}

impl PaymentMethodDeterminer {
    /// Creates a determiner over `repository`
    pub fn new(repository: Arc<dyn OnrampRepository>, capability: Arc<dyn PaymentCapability>) -> Self {
        Self { repository, capability }
    }

    /// See [`is_supported`]
    pub fn is_supported(&self, method: &OnrampPaymentMethod) -> bool {
        is_supported(method, self.capability.as_ref())
    }

    /// Catalog methods this platform can offer, in catalog order
    pub async fn supported_payment_methods(&self) -> Result<Vec<OnrampPaymentMethod>> {
        let methods = self.repository.payment_methods().await?;
        Ok(methods.into_iter().filter(|m| self.is_supported(m)).collect())
    }

    /// The method to preselect, `None` if nothing can be offered.
    ///
    /// Repository errors are returned as they are.
    pub async fn preferred_payment_method(&self) -> Result<Option<OnrampPaymentMethod>> {
        let methods = self.repository.payment_methods().await?;
        let chosen = preferred(&methods, self.capability.as_ref());
        debug!(
            offered = methods.len(),
            chosen = chosen.as_ref().map(|m| m.id.as_str()),
            "preferred payment method"
        );
        Ok(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use express_error::ExpressError;
    use express_testing::{fixtures, strategies, StaticPaymentCapability, StubOnrampRepository};
    use proptest::prelude::*;

    fn determiner(methods: Vec<OnrampPaymentMethod>, capable: bool) -> PaymentMethodDeterminer {
        PaymentMethodDeterminer::new(
            Arc::new(StubOnrampRepository::new(methods)),
            Arc::new(StaticPaymentCapability(capable)),
        )
    }

    #[test]
    fn test_is_supported() {
        let capable = StaticPaymentCapability(true);
        let incapable = StaticPaymentCapability(false);

        assert!(!is_supported(&fixtures::google_pay(), &capable));
        assert!(is_supported(&fixtures::apple_pay(), &capable));
        assert!(!is_supported(&fixtures::apple_pay(), &incapable));
        assert!(is_supported(&fixtures::card(), &incapable));
        assert!(is_supported(&fixtures::sepa(), &incapable));
    }

    #[tokio::test]
    async fn test_prefers_apple_pay_when_capable() {
        let methods = vec![fixtures::sepa(), fixtures::card(), fixtures::apple_pay()];
        let chosen = determiner(methods, true).preferred_payment_method().await.unwrap();
        assert_eq!(chosen, Some(fixtures::apple_pay()));
    }

    #[tokio::test]
    async fn test_card_when_apple_pay_unavailable() {
        let methods = vec![fixtures::sepa(), fixtures::apple_pay(), fixtures::card()];
        let chosen = determiner(methods, false).preferred_payment_method().await.unwrap();
        assert_eq!(chosen, Some(fixtures::card()));
    }

    #[tokio::test]
    async fn test_first_supported_otherwise() {
        let methods = vec![fixtures::google_pay(), fixtures::sepa()];
        let chosen = determiner(methods, true).preferred_payment_method().await.unwrap();
        assert_eq!(chosen, Some(fixtures::sepa()));
    }

    #[tokio::test]
    async fn test_none_when_nothing_supported() {
        assert_eq!(determiner(vec![], true).preferred_payment_method().await.unwrap(), None);

        let only_wallets = vec![fixtures::google_pay(), fixtures::apple_pay()];
        assert_eq!(
            determiner(only_wallets, false).preferred_payment_method().await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_literal_catalogs() {
        let cases = [
            (vec![fixtures::apple_pay(), fixtures::card()], Some(fixtures::apple_pay())),
            (vec![fixtures::card()], Some(fixtures::card())),
            (vec![fixtures::bank_transfer()], Some(fixtures::bank_transfer())),
            (vec![], None),
        ];
        for (methods, expected) in cases {
            let chosen = determiner(methods.clone(), true).preferred_payment_method().await.unwrap();
            assert_eq!(chosen, expected, "catalog {:?}", methods);
        }
    }

    #[tokio::test]
    async fn test_supported_methods_keep_catalog_order() {
        let methods = vec![fixtures::google_pay(), fixtures::sepa(), fixtures::apple_pay(), fixtures::card()];
        let supported = determiner(methods, false).supported_payment_methods().await.unwrap();
        assert_eq!(supported, vec![fixtures::sepa(), fixtures::card()]);
    }

    #[tokio::test]
    async fn test_repository_error_propagates() {
        let repository = StubOnrampRepository::new(vec![fixtures::card()])
            .with_failure(ExpressError::NetworkError("catalog unavailable".into()));
        let determiner = PaymentMethodDeterminer::new(Arc::new(repository), Arc::new(StaticPaymentCapability(true)));

        assert_eq!(
            determiner.preferred_payment_method().await,
            Err(ExpressError::NetworkError("catalog unavailable".into()))
        );
    }

    proptest! {
        #[test]
        fn preferred_is_always_supported(methods in strategies::payment_methods(), capable in any::<bool>()) {
            let capability = StaticPaymentCapability(capable);
            match preferred(&methods, &capability) {
                Some(chosen) => {
                    prop_assert!(is_supported(&chosen, &capability));
                    prop_assert!(methods.contains(&chosen));
                    prop_assert_ne!(chosen.method_type, OnrampPaymentMethodType::GooglePay);
                }
                None => prop_assert!(methods.iter().all(|m| !is_supported(m, &capability))),
            }
        }

        #[test]
        fn card_wins_without_apple_pay(methods in strategies::payment_methods()) {
            let capability = StaticPaymentCapability(false);
            let has_card = methods.iter().any(|m| m.method_type == OnrampPaymentMethodType::Card);
            let chosen = preferred(&methods, &capability);
            if has_card {
                prop_assert_eq!(chosen.map(|m| m.method_type), Some(OnrampPaymentMethodType::Card));
            }
        }
    }
}
