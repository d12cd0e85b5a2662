use std::{collections::HashMap, time::Duration};

use futures_util::StreamExt;
use log::*;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tokio::{
    sync::mpsc::{
        self,
        error::{TryRecvError, TrySendError},
    },
    task::JoinHandle,
};

use crate::cache::{BusMessage, CacheBackend, CacheError, Subscription};

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::TransportFailure(e.to_string())
    }
}

/// Messages buffered per subscription. Once the buffer is full, new messages are dropped until the subscriber
/// catches up.
pub const SUBSCRIPTION_BUFFER: usize = 1024;

/// Hands a message to the subscription buffer. Returns false once the subscription has gone away.
fn forward(sender: &mpsc::Sender<BusMessage>, msg: BusMessage) -> bool {
    match sender.try_send(msg) {
        Ok(()) => true,
        Err(TrySendError::Full(msg)) => {
            warn!("💾️ Subscription buffer is full. Dropping a message on {}", msg.channel);
            true
        },
        Err(TrySendError::Closed(_)) => false,
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// A cache backend on a Redis server. Commands share a [`ConnectionManager`], which reconnects on its own. Each
/// subscription opens a dedicated pub/sub connection.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    conn_manager: ConnectionManager,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedisCache")
    }
}

impl RedisCache {
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)?;
        let conn_manager = ConnectionManager::new(client.clone()).await?;
        info!("💾️ Connected to Redis");
        Ok(Self { client, conn_manager })
    }
}

impl CacheBackend for RedisCache {
    type Subscription = RedisSubscription;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn_manager.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        match ttl {
            Some(ttl) => conn.set_ex::<_, _, ()>(key, value, ttl_secs(ttl)).await?,
            None => conn.set::<_, _, ()>(key, value).await?,
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn_manager.clone();
        let removed: i64 = conn.del(key).await?;
        Ok(removed > 0)
    }

    async fn hset_all(&self, key: &str, fields: &[(String, String)], ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        let mut pipe = redis::pipe();
        pipe.atomic().del(key).ignore();
        if !fields.is_empty() {
            pipe.hset_multiple(key, fields).ignore();
            if let Some(ttl) = ttl {
                #[allow(clippy::cast_possible_wrap)]
                pipe.expire(key, ttl_secs(ttl) as i64).ignore();
            }
        }
        let _: () = pipe.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hget_all(&self, key: &str) -> Result<HashMap<String, String>, CacheError> {
        let mut conn = self.conn_manager.clone();
        let hash: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(hash)
    }

    async fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        conn.sadd::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn srem(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        conn.srem::<_, _, ()>(key, member).await?;
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.conn_manager.clone();
        let mut members: Vec<String> = conn.smembers(key).await?;
        members.sort();
        Ok(members)
    }

    async fn lpush_capped(&self, key: &str, value: &str, cap: usize) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        #[allow(clippy::cast_possible_wrap)]
        let last = cap.saturating_sub(1) as isize;
        let _: () = redis::pipe()
            .atomic()
            .lpush(key, value)
            .ignore()
            .ltrim(key, 0, last)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn lrange(&self, key: &str, count: usize) -> Result<Vec<String>, CacheError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn_manager.clone();
        #[allow(clippy::cast_possible_wrap)]
        let items: Vec<String> = conn.lrange(key, 0, (count - 1) as isize).await?;
        Ok(items)
    }

    async fn lset(&self, key: &str, index: usize, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn_manager.clone();
        #[allow(clippy::cast_possible_wrap)]
        conn.lset::<_, _, ()>(key, index as isize, value).await?;
        Ok(())
    }

    async fn publish(&self, channel: &str, payload: &str) -> Result<usize, CacheError> {
        let mut conn = self.conn_manager.clone();
        let receivers: usize = conn.publish(channel, payload).await?;
        trace!("💾️ Published to {channel} ({receivers} receivers)");
        Ok(receivers)
    }

    async fn subscribe(&self, channels: &[String]) -> Result<RedisSubscription, CacheError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        for channel in channels {
            pubsub.subscribe(channel).await?;
        }
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let pump = tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            while let Some(msg) = stream.next().await {
                let payload = match msg.get_payload::<String>() {
                    Ok(p) => p,
                    Err(e) => {
                        warn!("💾️ Ignoring a non-text message on {}: {e}", msg.get_channel_name());
                        continue;
                    },
                };
                if !forward(&sender, BusMessage::new(msg.get_channel_name(), payload)) {
                    break;
                }
            }
            debug!("💾️ Pub/sub connection closed");
        });
        debug!("💾️ Subscribed to {}", channels.join(", "));
        Ok(RedisSubscription { channels: channels.to_vec(), receiver, pump })
    }
}

/// Buffers messages from a dedicated pub/sub connection. When the connection drops, the buffer drains and then
/// `poll_message` reports a transport failure.
pub struct RedisSubscription {
    channels: Vec<String>,
    receiver: mpsc::Receiver<BusMessage>,
    pump: JoinHandle<()>,
}

impl Subscription for RedisSubscription {
    fn poll_message(&mut self) -> Result<Option<BusMessage>, CacheError> {
        match self.receiver.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(CacheError::TransportFailure("The pub/sub connection has closed".to_string()))
            },
        }
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }
}

impl Drop for RedisSubscription {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
