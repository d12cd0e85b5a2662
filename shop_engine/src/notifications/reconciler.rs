use std::time::Duration;

use chrono::Utc;
use log::*;
use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    cache::{BusMessage, CacheBackend, Subscription},
    db_types::{Role, SessionData},
    events::{NotificationEvent, ADMIN_CHANNEL, ORDER_STATUS_CHANNEL},
    notifications::{
        low_stock_message,
        order_status_message,
        NotificationFeed,
        SessionNotification,
        Severity,
    },
};

/// Ticks are never closer together than this.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(2);
/// At most this many bus messages are handled per tick.
pub const MAX_MESSAGES_PER_TICK: usize = 32;

/// The user a session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: i64, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&SessionData> for Principal {
    fn from(session: &SessionData) -> Self {
        Self { user_id: session.user_id, role: session.role }
    }
}

/// Turns bus events into session notifications for one principal.
///
/// Every principal listens on the order status channel. Admins also listen on the admin channel.
pub struct NotificationReconciler<C: CacheBackend> {
    cache: C,
    principal: Principal,
    channels: Vec<String>,
    subscription: Option<C::Subscription>,
    feed: NotificationFeed,
}

impl<C: CacheBackend> NotificationReconciler<C> {
    /// Creates the reconciler and subscribes to the bus. A failed subscription is logged and retried on the next
    /// tick.
    pub async fn new(cache: C, principal: Principal) -> Self {
        let mut channels = vec![ORDER_STATUS_CHANNEL.to_string()];
        if principal.is_admin() {
            channels.push(ADMIN_CHANNEL.to_string());
        }
        let mut reconciler = Self { cache, principal, channels, subscription: None, feed: NotificationFeed::new() };
        reconciler.reconnect().await;
        reconciler
    }

    pub fn principal(&self) -> Principal {
        self.principal
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }

    /// A handle on the session's notification queue.
    pub fn feed(&self) -> NotificationFeed {
        self.feed.clone()
    }

    async fn reconnect(&mut self) -> bool {
        match self.cache.subscribe(&self.channels).await {
            Ok(sub) => {
                debug!("🔔 Notification listener for user {} subscribed", self.principal.user_id);
                self.subscription = Some(sub);
                true
            },
            Err(e) => {
                warn!("🔔 Notification listener for user {} could not subscribe: {e}", self.principal.user_id);
                self.subscription = None;
                false
            },
        }
    }

    /// Runs one reconciliation pass and returns the number of bus messages handled.
    ///
    /// If the subscription is gone, one reconnect attempt is made before polling. If polling hits a transport
    /// failure, one reconnect attempt is made and the pass ends.
    pub async fn tick(&mut self) -> usize {
        if self.subscription.is_none() && !self.reconnect().await {
            return 0;
        }
        let mut handled = 0;
        let mut transport_failed = false;
        if let Some(sub) = self.subscription.as_mut() {
            while handled < MAX_MESSAGES_PER_TICK {
                match sub.poll_message() {
                    Ok(Some(msg)) => {
                        handled += 1;
                        if let Some(n) = reconcile(self.principal, &msg) {
                            self.feed.push(n);
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        warn!("🔔 Notification listener for user {} lost its connection: {e}", self.principal.user_id);
                        transport_failed = true;
                        break;
                    },
                }
            }
        }
        if transport_failed {
            self.subscription = None;
            self.reconnect().await;
        }
        handled
    }
}

/// Maps a bus message to the notification `principal` should see, if any.
fn reconcile(principal: Principal, msg: &BusMessage) -> Option<SessionNotification> {
    let event = match serde_json::from_str::<NotificationEvent>(&msg.payload) {
        Ok(ev) => ev,
        Err(e) => {
            warn!("🔔 Skipping undecodable message on {}: {e}", msg.channel);
            return None;
        },
    };
    let now = Utc::now();
    match event {
        NotificationEvent::OrderStatusChanged(ev) if ev.user_id == Some(principal.user_id) => {
            trace!("🔔 Order #{} of user {} is now {}", ev.order_id, principal.user_id, ev.status);
            Some(SessionNotification::new(order_status_message(ev.order_id, ev.status), Severity::Success, now))
        },
        NotificationEvent::LowStock(ev) if principal.is_admin() => {
            Some(SessionNotification::new(low_stock_message(&ev.product_name, ev.current_stock), Severity::Warning, now))
        },
        _ => None,
    }
}

/// Stops a reconciler started with [`spawn_reconciler`]. Dropping the handle stops the task too.
pub struct ReconcilerHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    feed: NotificationFeed,
}

impl ReconcilerHandle {
    pub fn feed(&self) -> NotificationFeed {
        self.feed.clone()
    }

    /// Signals the task to stop and waits for it to finish.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!("🔔 Notification listener task ended abnormally: {e}");
        }
    }
}

/// Runs the reconciler as a background task, ticking every `period` (never faster than [`MIN_POLL_INTERVAL`]).
pub fn spawn_reconciler<C: CacheBackend>(mut reconciler: NotificationReconciler<C>, period: Duration) -> ReconcilerHandle {
    let period = period.max(MIN_POLL_INTERVAL);
    let feed = reconciler.feed();
    let user_id = reconciler.principal().user_id;
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!("🔔 Notification listener for user {user_id} started, polling every {period:?}");
        loop {
            tokio::select! {
                _ = &mut stop_rx => break,
                _ = ticker.tick() => {
                    reconciler.tick().await;
                },
            }
        }
        debug!("🔔 Notification listener for user {user_id} stopped");
    });
    ReconcilerHandle { stop: Some(stop_tx), task, feed }
}
