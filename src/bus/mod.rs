use crate::domain::event::FlightCreatedEvent;
use crate::error::{AppError, AppResult};
use crate::generator::JourneyGenerator;
use redis::aio::ConnectionManager;
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// C7 — publishes and delivers `flight-created` records (spec.md §4.7).
///
/// Transport is Redis Streams rather than a dedicated broker, reusing the
/// `redis` crate already required by C4/C5. A topic partitioned by flight
/// id is emulated by hashing the flight id into one of `partition_count`
/// stream keys, each consumed by its own consumer group with exactly one
/// logical consumer — spec.md §4.7's "horizontal scaling is achieved by
/// partition count, not by multiple consumers per partition."
#[derive(Clone)]
pub struct EventBusAdapter {
    conn: ConnectionManager,
    partition_count: u32,
    consumer_group: String,
    consumer_name: String,
}

const STREAM_PREFIX: &str = "flight-created";

impl EventBusAdapter {
    pub fn new(conn: ConnectionManager, partition_count: u32, consumer_name: impl Into<String>) -> Self {
        EventBusAdapter {
            conn,
            partition_count: partition_count.max(1),
            consumer_group: "journey-generator".to_string(),
            consumer_name: consumer_name.into(),
        }
    }

    fn stream_key(&self, flight_id: uuid::Uuid) -> String {
        let mut hasher = DefaultHasher::new();
        flight_id.hash(&mut hasher);
        let partition = hasher.finish() % self.partition_count as u64;
        format!("{STREAM_PREFIX}:{partition}")
    }

    /// Creates every partition's consumer group if absent. Idempotent;
    /// call once at startup before consuming.
    pub async fn ensure_groups(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        for partition in 0..self.partition_count {
            let key = format!("{STREAM_PREFIX}:{partition}");
            let result: Result<(), redis::RedisError> = redis::cmd("XGROUP")
                .arg("CREATE")
                .arg(&key)
                .arg(&self.consumer_group)
                .arg("$")
                .arg("MKSTREAM")
                .query_async(&mut conn)
                .await;
            if let Err(err) = result {
                // BUSYGROUP means the group already exists; anything else
                // is a genuine bus outage worth surfacing.
                if !err.to_string().contains("BUSYGROUP") {
                    return Err(AppError::BusUnavailable(err.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Publishes after C1 commits the flight (outbox-then-publish, spec.md
    /// §9 Open Question; decision recorded in DESIGN.md). A publish failure
    /// returns `BusUnavailable` so the admin path can log and leave the
    /// flight committed for a retry sweep rather than lose it silently.
    pub async fn publish(&self, event: &FlightCreatedEvent) -> AppResult<()> {
        let key = self.stream_key(event.flight_id);
        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::Internal(format!("failed to serialise event: {e}")))?;

        let mut conn = self.conn.clone();
        let _id: String = conn
            .xadd(&key, "*", &[("payload", payload)])
            .await
            .map_err(|e| AppError::BusUnavailable(e.to_string()))?;
        Ok(())
    }

    /// Blocks (up to `block_ms`) reading the next batch of undelivered
    /// entries across every partition, invokes `generator` for each, and
    /// acks only after `process_flight_created` reports DONE (spec.md
    /// §4.7 "Acknowledgement: the consumer acks only after C3 reports
    /// DONE"). A transient processing error leaves the entry unacked, so
    /// the next poll (or another consumer after claim) redelivers it.
    pub async fn poll_once(&self, generator: &JourneyGenerator, block_ms: usize) -> AppResult<usize> {
        let mut conn = self.conn.clone();
        let mut processed = 0usize;

        let keys: Vec<String> = (0..self.partition_count)
            .map(|p| format!("{STREAM_PREFIX}:{p}"))
            .collect();
        let ids: Vec<&str> = keys.iter().map(|_| ">").collect();

        let opts = StreamReadOptions::default()
            .group(&self.consumer_group, &self.consumer_name)
            .count(16)
            .block(block_ms);

        let reply: StreamReadReply = match conn.xread_options(&keys, &ids, &opts).await {
            Ok(r) => r,
            Err(err) => return Err(AppError::BusUnavailable(err.to_string())),
        };

        for stream_key in reply.keys {
            for stream_id in stream_key.ids {
                let Some(redis::Value::Data(payload_bytes)) = stream_id.map.get("payload") else {
                    tracing::warn!(id = %stream_id.id, "flight-created entry missing payload field; acking");
                    self.ack(&stream_key.key, &stream_id.id).await;
                    continue;
                };
                let Ok(payload) = std::str::from_utf8(payload_bytes) else {
                    self.ack(&stream_key.key, &stream_id.id).await;
                    continue;
                };

                let event: FlightCreatedEvent = match serde_json::from_str(payload) {
                    Ok(e) => e,
                    Err(err) => {
                        tracing::warn!(error = %err, "malformed flight-created payload; acking without retry");
                        self.ack(&stream_key.key, &stream_id.id).await;
                        continue;
                    }
                };

                match generator.process_flight_created(event).await {
                    Ok(_journeys) => {
                        self.ack(&stream_key.key, &stream_id.id).await;
                        processed += 1;
                    }
                    Err(AppError::StoreUnavailable(msg)) => {
                        tracing::warn!(error = %msg, "transient failure processing flight-created; leaving unacked for redelivery");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "unexpected error processing flight-created; leaving unacked for redelivery");
                    }
                }
            }
        }

        Ok(processed)
    }

    async fn ack(&self, stream_key: &str, entry_id: &str) {
        let mut conn = self.conn.clone();
        let result: Result<i64, _> = conn.xack(stream_key, &self.consumer_group, &[entry_id]).await;
        if let Err(err) = result {
            tracing::warn!(error = %err, %stream_key, %entry_id, "failed to ack flight-created entry");
        }
    }
}
