use std::{
    collections::{BTreeSet, HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use log::*;
use moka::{future::Cache, ops::compute::Op, Expiry};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::cache::{BusMessage, CacheBackend, CacheError, Subscription};

const BUS_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
    Set(BTreeSet<String>),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    ttl: Option<Duration>,
    /// In-place edits (set members, list items) keep whatever expiry the key already had.
    keeps_expiry: bool,
}

impl Entry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self { value, ttl, keeps_expiry: false }
    }

    fn edited(value: Value) -> Self {
        Self { value, ttl: None, keeps_expiry: true }
    }
}

struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        remaining: Option<Duration>,
    ) -> Option<Duration> {
        if entry.keeps_expiry {
            remaining
        } else {
            entry.ttl
        }
    }
}

/// An in-process cache backend. Values live in a [`moka`] cache that evicts expired keys by itself. The event bus is
/// a [`tokio::sync::broadcast`] channel shared by every clone.
#[derive(Clone)]
pub struct MemoryCache {
    store: Cache<String, Entry>,
    bus: Arc<Mutex<broadcast::Sender<BusMessage>>>,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryCache ({} keys)", self.store.entry_count())
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        Self { store: Cache::builder().expire_after(EntryExpiry).build(), bus: Arc::new(Mutex::new(sender)) }
    }

    /// Drops the current bus, so that every existing subscription reports a transport failure once its buffer is
    /// drained. New subscriptions attach to a fresh bus. This mimics a dropped server connection.
    pub fn sever_subscriptions(&self) -> Result<(), CacheError> {
        let (sender, _) = broadcast::channel(BUS_CAPACITY);
        let mut bus = self.bus.lock().map_err(|e| CacheError::TransportFailure(e.to_string()))?;
        *bus = sender;
        warn!("💾️ Event bus severed. Existing subscriptions are now closed");
        Ok(())
    }

    /// The number of keys held, after pending evictions have run.
    pub async fn held_keys(&self) -> u64 {
        self.store.run_pending_tasks().await;
        self.store.entry_count()
    }

    fn sender(&self) -> Result<broadcast::Sender<BusMessage>, CacheError> {
        let bus = self.bus.lock().map_err(|e| CacheError::TransportFailure(e.to_string()))?;
        Ok(bus.clone())
    }

    /// Atomically replaces the value at `key` with whatever `f` returns. `Ok(None)` leaves the key untouched.
    async fn update<F>(&self, key: &str, f: F) -> Result<(), CacheError>
    where F: FnOnce(Option<Value>) -> Result<Option<Entry>, CacheError> {
        let mut outcome = Ok(());
        self.store
            .entry_by_ref(key)
            .and_compute_with(|current| {
                let op = match f(current.map(|e| e.into_value().value)) {
                    Ok(Some(entry)) => Op::Put(entry),
                    Ok(None) => Op::Nop,
                    Err(e) => {
                        outcome = Err(e);
                        Op::Nop
                    },
                };
                std::future::ready(op)
            })
            .await;
        outcome
    }
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::WrongType(key.to_string())
}

impl CacheBackend for MemoryCache {
    type Subscription = MemorySubscription;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.store.get(key).await.map(|e| e.value) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s)),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.store.insert(key.to_string(), Entry::new(Value::Str(value.to_string()), ttl)).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let existed = self.store.get(key).await.is_some();
        self.store.invalidate(key).await;
        Ok(existed)
    }

    async fn hset_all(&self, key: &str, fields: &[(String, String)], ttl: Option<Duration>) -> Result<(), CacheError> {
        let hash = fields.iter().cloned().collect::<HashMap<_, _>>();
        self.store.insert(key.to_string(), Entry::new(Value::Hash(hash), ttl)).await;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        match self.store.get(key).await.map(|e| e.value) {
            None => Ok(HashMap::new()),
            Some(Value::Hash(h)) => Ok(h),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.update(key, |current| match current {
            None => Ok(Some(Entry::new(Value::Set(BTreeSet::from([member.to_string()])), None))),
            Some(Value::Set(mut set)) => {
                set.insert(member.to_string());
                Ok(Some(Entry::edited(Value::Set(set))))
            },
            Some(_) => Err(wrong_type(key)),
        })
        .await
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.update(key, |current| match current {
            None => Ok(None),
            Some(Value::Set(mut set)) => {
                set.remove(member);
                Ok(Some(Entry::edited(Value::Set(set))))
            },
            Some(_) => Err(wrong_type(key)),
        })
        .await
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        match self.store.get(key).await.map(|e| e.value) {
            None => Ok(Vec::new()),
            Some(Value::Set(s)) => Ok(s.into_iter().collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn lpush_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), CacheError> {
        self.update(key, |current| {
            let (mut list, entry): (VecDeque<String>, fn(Value) -> Entry) = match current {
                None => (VecDeque::new(), |v| Entry::new(v, None)),
                Some(Value::List(list)) => (list, Entry::edited),
                Some(_) => return Err(wrong_type(key)),
            };
            list.push_front(value.to_string());
            list.truncate(cap);
            Ok(Some(entry(Value::List(list))))
        })
        .await
    }

    async fn lrange(&self, key: &str, count: usize) -> Result<Vec<String>, CacheError> {
        match self.store.get(key).await.map(|e| e.value) {
            None => Ok(Vec::new()),
            Some(Value::List(l)) => Ok(l.into_iter().take(count).collect()),
            Some(_) => Err(wrong_type(key)),
        }
    }

    async fn lset(&self, key: &str, index: usize, value: &str) -> Result<(), CacheError> {
        self.update(key, |current| match current {
            Some(Value::List(mut list)) => match list.get_mut(index) {
                Some(item) => {
                    *item = value.to_string();
                    Ok(Some(Entry::edited(Value::List(list))))
                },
                None => Err(CacheError::WrongType(format!("{key}[{index}] is out of range"))),
            },
            None => Err(CacheError::WrongType(format!("{key} is not a list"))),
            Some(_) => Err(wrong_type(key)),
        })
        .await
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, CacheError> {
        let sender = self.sender()?;
        // A send error only means that nobody is listening
        let receivers = sender.send(BusMessage::new(channel, payload)).unwrap_or(0);
        trace!("💾️ Published to {channel} ({receivers} receivers)");
        Ok(receivers)
    }

    async fn subscribe(&self, channels: &[String]) -> Result<MemorySubscription, CacheError> {
        let receiver = self.sender()?.subscribe();
        debug!("💾️ Subscribed to {}", channels.join(", "));
        Ok(MemorySubscription { channels: channels.to_vec(), receiver })
    }
}

pub struct MemorySubscription {
    channels: Vec<String>,
    receiver: broadcast::Receiver<BusMessage>,
}

impl Subscription for MemorySubscription {
    fn poll_message(&mut self) -> Result<Option<BusMessage>, CacheError> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) if self.channels.contains(&msg.channel) => return Ok(Some(msg)),
                Ok(_) => continue,
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(n)) => {
                    warn!("💾️ Subscription lagged behind the bus. {n} messages were lost");
                    continue;
                },
                Err(TryRecvError::Closed) => {
                    return Err(CacheError::TransportFailure("The event bus has been closed".to_string()))
                },
            }
        }
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }
}
