pub mod convert;
pub mod error;
pub mod heat;
pub mod leaderboard;
pub mod middleware;
pub mod migrate;
pub mod notify;
pub mod payments;
pub mod rank;
pub mod subscriptions;
pub mod syndicates;
pub mod whispers;

use std::sync::Arc;

use clout_db::Database;
use clout_db::ledger::Ledger;
use clout_gateway::checkout::CheckoutClient;
use clout_gateway::classifier::SafeSearchClassifier;
use clout_gateway::push::PushProvider;

pub type AppState = Arc<AppStateInner>;

/// Everything the handlers need, injected once at startup. No globals:
/// tests swap the store for an in-memory database and the providers for
/// fakes.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub ledger: Ledger,
    pub push: Arc<dyn PushProvider>,
    pub classifier: Arc<dyn SafeSearchClassifier>,
    /// None when the payment backend is unconfigured; session creation
    /// then fails with a precondition error.
    pub checkout: Option<CheckoutClient>,
    /// None when settlement is unconfigured; the webhook then answers 500.
    pub webhook_secret: Option<String>,
    pub jwt_secret: String,
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use clout_db::Database;
    use clout_db::ledger::{Ledger, ScoreFloor};
    use clout_gateway::classifier::{ClassifierError, SafeSearchClassifier, SafeSearchVerdict};
    use clout_gateway::push::{PushError, PushPayload, PushProvider};
    use clout_types::models::PushSubscription;

    use crate::{AppState, AppStateInner};

    /// How the fake push provider answers the next send.
    #[derive(Debug, Clone, Copy)]
    pub enum PushOutcome {
        Delivered,
        Gone,
        Fail(u16),
    }

    pub struct FakePush {
        pub outcome: Mutex<PushOutcome>,
        pub sent: Mutex<Vec<(String, PushPayload)>>,
    }

    impl FakePush {
        pub fn new(outcome: PushOutcome) -> Self {
            Self {
                outcome: Mutex::new(outcome),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PushProvider for FakePush {
        async fn send(
            &self,
            subscription: &PushSubscription,
            payload: &PushPayload,
        ) -> Result<(), PushError> {
            self.sent
                .lock()
                .unwrap()
                .push((subscription.user_id.clone(), payload.clone()));
            match *self.outcome.lock().unwrap() {
                PushOutcome::Delivered => Ok(()),
                PushOutcome::Gone => Err(PushError::Gone),
                PushOutcome::Fail(code) => Err(PushError::Provider(code)),
            }
        }
    }

    pub struct FakeClassifier {
        pub verdict: Mutex<Result<SafeSearchVerdict, ()>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeClassifier {
        pub fn with_verdict(verdict: SafeSearchVerdict) -> Self {
            Self {
                verdict: Mutex::new(Ok(verdict)),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn unreachable_provider() -> Self {
            Self {
                verdict: Mutex::new(Err(())),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SafeSearchClassifier for FakeClassifier {
        async fn safe_search(
            &self,
            image_uri: &str,
        ) -> Result<SafeSearchVerdict, ClassifierError> {
            self.calls.lock().unwrap().push(image_uri.to_string());
            self.verdict
                .lock()
                .unwrap()
                .clone()
                .map_err(|_| ClassifierError::Transport("connection refused".into()))
        }
    }

    pub struct StateBuilder {
        pub push: Arc<FakePush>,
        pub classifier: Arc<FakeClassifier>,
        pub webhook_secret: Option<String>,
    }

    impl StateBuilder {
        pub fn new() -> Self {
            Self {
                push: Arc::new(FakePush::new(PushOutcome::Delivered)),
                classifier: Arc::new(FakeClassifier::with_verdict(SafeSearchVerdict::default())),
                webhook_secret: Some("whsec_test".into()),
            }
        }

        pub fn build(self) -> AppState {
            let db = Arc::new(Database::open_in_memory().unwrap());
            let ledger = Ledger::new(db.clone(), ScoreFloor::Unbounded);
            Arc::new(AppStateInner {
                db,
                ledger,
                push: self.push,
                classifier: self.classifier,
                checkout: None,
                webhook_secret: self.webhook_secret,
                jwt_secret: "test-secret".into(),
            })
        }
    }

    pub fn state() -> AppState {
        StateBuilder::new().build()
    }
}
