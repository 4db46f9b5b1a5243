use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use tenderbid_core::config::AppConfig;
use tenderbid_core::errors::ApplicationError;
use tenderbid_core::{
    Alert, AlertCenter, BidDraft, BidId, ChatMessage, MessageDraft, TenderDraft, TenderId,
    UserProfile,
};
use tenderbid_store::{DocumentId, DocumentStore, Subscription};

use crate::collections::Collections;
use crate::identity::{establish_session, AuthState, IdentityProvider};
use crate::manager::LifecycleManager;
use crate::read_model::ReadModel;

/// One connected client process: a signed-in user, a lifecycle manager, an
/// eventually-consistent read model kept fresh by subscription pumps, and
/// the alert slot every action reports through.
///
/// Every action is caught at this boundary and converted into a transient
/// alert; no error propagates past a user gesture.
pub struct ClientSession {
    manager: LifecycleManager,
    read_model: Arc<ReadModel>,
    alerts: Arc<AlertCenter>,
    collections: Collections,
    store: Arc<dyn DocumentStore>,
    auth_tx: watch::Sender<AuthState>,
    pumps: Vec<JoinHandle<()>>,
}

impl ClientSession {
    /// Signs in (bootstrap token with one anonymous fallback), subscribes to
    /// the tender and bid collections, and starts the read-model pumps.
    ///
    /// A total sign-in failure or a failed initial subscription is terminal:
    /// no session exists and the caller gets the error.
    pub async fn connect(
        config: &AppConfig,
        store: Arc<dyn DocumentStore>,
        identity: &dyn IdentityProvider,
    ) -> Result<Self, ApplicationError> {
        let auth = establish_session(identity, config.session.auth_token.as_ref())
            .await
            .map_err(|error| ApplicationError::Auth(error.to_string()))?;
        tracing::info!(
            event_name = "session.signed_in",
            user_id = %auth.user.id.0,
            anonymous = auth.anonymous,
            "session established"
        );

        let collections = Collections::new(&config.tenant);
        let read_model = Arc::new(ReadModel::default());

        let tenders_sub = store.subscribe(&collections.tenders(), None).await?;
        let bids_sub = store.subscribe(&collections.bids(), None).await?;
        let pumps = vec![
            tokio::spawn(pump_tenders(tenders_sub, Arc::clone(&read_model))),
            tokio::spawn(pump_bids(bids_sub, Arc::clone(&read_model))),
        ];

        let manager = LifecycleManager::new(
            Arc::clone(&store),
            collections.clone(),
            Arc::clone(&read_model),
            auth.user.clone(),
        );
        let (auth_tx, _) = watch::channel(AuthState::SignedIn(auth.user));

        Ok(Self {
            manager,
            read_model,
            alerts: Arc::new(AlertCenter::new()),
            collections,
            store,
            auth_tx,
            pumps,
        })
    }

    pub fn user(&self) -> &UserProfile {
        self.manager.user()
    }

    pub fn alerts(&self) -> &AlertCenter {
        &self.alerts
    }

    pub fn read_model(&self) -> &ReadModel {
        &self.read_model
    }

    pub fn auth_state(&self) -> watch::Receiver<AuthState> {
        self.auth_tx.subscribe()
    }

    pub async fn post_tender(&self, draft: TenderDraft) -> Option<DocumentId> {
        let result = self.manager.post_tender(draft).await;
        self.settle("post_tender", "Tender posted", result)
    }

    pub async fn place_bid(&self, tender_id: &TenderId, draft: BidDraft) -> Option<DocumentId> {
        let result = self.manager.place_bid(tender_id, draft).await;
        self.settle("place_bid", "Bid submitted", result)
    }

    pub async fn award(&self, tender_id: &TenderId, bid_id: &BidId, confirmation: &str) -> bool {
        let result = self.manager.award(tender_id, bid_id, confirmation).await;
        self.settle("award", "Bid awarded", result).is_some()
    }

    pub async fn pay(&self, tender_id: &TenderId) -> bool {
        let result = self.manager.pay(tender_id).await;
        self.settle("pay", "Payment recorded", result).is_some()
    }

    /// Chat sends alert only on failure; the message appearing in the feed
    /// is its own confirmation.
    pub async fn send_message(&self, tender_id: &TenderId, draft: MessageDraft) -> Option<DocumentId> {
        match self.manager.send_message(tender_id, draft).await {
            Ok(id) => Some(id),
            Err(error) => {
                self.report_failure("send_message", &error);
                None
            }
        }
    }

    /// Opens the tender's chat feed: its own subscription, pumped into a
    /// message list ordered by insertion.
    pub async fn open_chat(&self, tender_id: &TenderId) -> Result<ChatChannel, ApplicationError> {
        let subscription = self.store.subscribe(&self.collections.chat(tender_id), None).await?;
        let messages: Arc<RwLock<Vec<ChatMessage>>> = Arc::new(RwLock::new(Vec::new()));
        let pump = tokio::spawn(pump_chat(subscription, Arc::clone(&messages)));
        Ok(ChatChannel { messages, pump })
    }

    /// Ends the session: stops the pumps (dropping their subscriptions) and
    /// publishes the signed-out state. In-flight writes run to completion.
    pub fn close(&self) {
        for pump in &self.pumps {
            pump.abort();
        }
        let _ = self.auth_tx.send(AuthState::SignedOut);
    }

    fn settle<T>(
        &self,
        action: &'static str,
        success: &str,
        result: Result<T, ApplicationError>,
    ) -> Option<T> {
        match result {
            Ok(value) => {
                self.alerts.post(Alert::success(success));
                Some(value)
            }
            Err(error) => {
                self.report_failure(action, &error);
                None
            }
        }
    }

    fn report_failure(&self, action: &'static str, error: &ApplicationError) {
        tracing::warn!(
            event_name = "session.action_failed",
            action,
            user_id = %self.user().id.0,
            error = %error,
            "action failed"
        );
        self.alerts.post(error.to_alert());
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        for pump in &self.pumps {
            pump.abort();
        }
    }
}

/// A live per-tender chat feed. Closing (or dropping) stops the pump and
/// releases its subscription.
pub struct ChatChannel {
    messages: Arc<RwLock<Vec<ChatMessage>>>,
    pump: JoinHandle<()>,
}

impl ChatChannel {
    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.messages.read().await.clone()
    }

    pub fn close(self) {
        // The pump is aborted in Drop.
    }
}

impl Drop for ChatChannel {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

async fn pump_tenders(mut subscription: Subscription, read_model: Arc<ReadModel>) {
    while let Some(snapshot) = subscription.recv().await {
        read_model.replace_tenders(&snapshot).await;
    }
}

async fn pump_bids(mut subscription: Subscription, read_model: Arc<ReadModel>) {
    while let Some(snapshot) = subscription.recv().await {
        read_model.replace_bids(&snapshot).await;
    }
}

async fn pump_chat(mut subscription: Subscription, messages: Arc<RwLock<Vec<ChatMessage>>>) {
    while let Some(snapshot) = subscription.recv().await {
        let mut decoded: Vec<ChatMessage> = snapshot
            .iter()
            .filter_map(|document| {
                serde_json::from_value(document.body.clone())
                    .map_err(|error| {
                        tracing::warn!(
                            event_name = "read_model.decode_failed",
                            kind = "chat_message",
                            document_id = %document.id.0,
                            error = %error,
                            "dropping undecodable document from snapshot"
                        );
                    })
                    .ok()
            })
            .collect();
        decoded.sort_by_key(|message| message.sent_at);
        *messages.write().await = decoded;
    }
}
