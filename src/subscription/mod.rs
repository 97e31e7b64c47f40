//! Subscription roster reconciliation

mod reconciler;

pub use self::reconciler::SubscriptionReconciler;
