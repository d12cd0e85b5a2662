//! Live notification feeds, one per logged-in session.
//!
//! The first time a session asks for its notifications, a reconciler task is started for it. The task keeps running
//! until the session logs out, or until the sweeper notices the session has expired.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::*;
use shop_engine::{
    db_types::SessionData,
    notifications::{spawn_reconciler, NotificationFeed, NotificationReconciler, Principal, ReconcilerHandle},
    CacheBackend,
    ShopCache,
};
use tokio::task::JoinHandle;

pub struct SessionFeeds<C> {
    cache: C,
    period: Duration,
    feeds: Mutex<HashMap<String, ReconcilerHandle>>,
}

impl<C: CacheBackend> SessionFeeds<C> {
    pub fn new(cache: C, period: Duration) -> Self {
        Self { cache, period, feeds: Mutex::new(HashMap::new()) }
    }

    fn feeds(&self) -> MutexGuard<'_, HashMap<String, ReconcilerHandle>> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The live feed for the session behind `token`, starting a reconciler for it if there isn't one yet.
    ///
    /// Subscribing happens outside the lock. The check and the insert happen under a single lock, so concurrent
    /// callers for the same token all end up with the one feed that was registered first.
    pub async fn attach(&self, token: &str, session: &SessionData) -> NotificationFeed {
        if let Some(feed) = self.feeds().get(token).map(ReconcilerHandle::feed) {
            return feed;
        }
        let reconciler = NotificationReconciler::new(self.cache.clone(), Principal::from(session)).await;
        match self.feeds().entry(token.to_string()) {
            Entry::Occupied(existing) => {
                trace!("🔔 Live notifications for user {} were started concurrently", session.user_id);
                existing.get().feed()
            },
            Entry::Vacant(slot) => {
                let handle = spawn_reconciler(reconciler, self.period);
                let feed = handle.feed();
                slot.insert(handle);
                debug!("🔔 Live notifications started for user {}", session.user_id);
                feed
            },
        }
    }

    /// Stops the reconciler for `token`, if one is running.
    pub async fn detach(&self, token: &str) {
        let handle = self.feeds().remove(token);
        if let Some(handle) = handle {
            handle.stop().await;
            debug!("🔔 Live notifications stopped for a session");
        }
    }

    pub fn active(&self) -> usize {
        self.feeds().len()
    }

    /// Stops the reconcilers of sessions that no longer exist. Returns how many were stopped.
    pub async fn sweep(&self) -> usize {
        let tokens = self.feeds().keys().cloned().collect::<Vec<_>>();
        let cache = ShopCache::new(self.cache.clone());
        let mut stopped = 0;
        for token in tokens {
            match cache.session(&token).await {
                Ok(Some(_)) => {},
                Ok(None) => {
                    self.detach(&token).await;
                    stopped += 1;
                },
                Err(e) => warn!("🔔 Could not check a session while sweeping feeds. {e}"),
            }
        }
        stopped
    }
}

/// Starts the sweeper. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_feed_sweeper<C: CacheBackend>(feeds: actix_web::web::Data<SessionFeeds<C>>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(every);
        info!("🔔 Session feed sweeper started");
        loop {
            timer.tick().await;
            let stopped = feeds.sweep().await;
            if stopped > 0 {
                info!("🔔 {stopped} expired session feeds stopped. {} still active", feeds.active());
            }
        }
    })
}

#[cfg(test)]
mod test {
    use chrono::Utc;
    use shop_engine::{
        db_types::Role,
        notifications::{SessionNotification, Severity},
        MemoryCache,
    };

    use super::*;

    fn session(user_id: i64) -> SessionData {
        SessionData { user_id, email: format!("user{user_id}@example.com"), role: Role::Customer, created_at: Utc::now() }
    }

    #[tokio::test]
    async fn one_feed_per_session() {
        let feeds = SessionFeeds::new(MemoryCache::new(), Duration::from_secs(2));
        feeds.attach("token-a", &session(1)).await;
        feeds.attach("token-a", &session(1)).await;
        feeds.attach("token-b", &session(2)).await;
        assert_eq!(feeds.active(), 2);
        feeds.detach("token-a").await;
        feeds.detach("token-a").await;
        assert_eq!(feeds.active(), 1);
    }

    #[tokio::test]
    async fn concurrent_attaches_share_one_feed() {
        let feeds = SessionFeeds::new(MemoryCache::new(), Duration::from_secs(2));
        let alice = session(1);
        let (first, second) = futures::join!(feeds.attach("token-a", &alice), feeds.attach("token-a", &alice));
        assert_eq!(feeds.active(), 1);
        first.push(SessionNotification::new("Привет", Severity::Info, Utc::now()));
        assert_eq!(second.current().len(), 1);
        let third = feeds.attach("token-a", &alice).await;
        assert_eq!(third.current().len(), 1);
    }

    #[tokio::test]
    async fn sweep_stops_expired_sessions() {
        let cache = MemoryCache::new();
        let shop_cache = ShopCache::new(cache.clone());
        shop_cache.store_session("live", &session(1), Duration::from_secs(60)).await.unwrap();
        let feeds = SessionFeeds::new(cache, Duration::from_secs(2));
        feeds.attach("live", &session(1)).await;
        feeds.attach("gone", &session(2)).await;
        assert_eq!(feeds.sweep().await, 1);
        assert_eq!(feeds.active(), 1);
    }
}
