use mockall::mock;
use paygate_engine::{
    db_types::{Order, OrderReference},
    traits::{Notifier, NotifierError, PaymentStatusProvider, ProviderStatus, ProviderStatusError},
};

mock! {
    pub ConfirmationNotifier {}
    impl Notifier for ConfirmationNotifier {
        async fn send_confirmation(&self, order: &Order) -> Result<(), NotifierError>;
    }
}

mock! {
    pub StatusProvider {}
    impl PaymentStatusProvider for StatusProvider {
        async fn query_status(&self, reference: &OrderReference) -> Result<ProviderStatus, ProviderStatusError>;
    }
}
