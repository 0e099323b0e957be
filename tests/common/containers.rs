// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Testcontainers setup for Redis.
//!
//! Provides helpers to spin up Redis containers for store tests.

use redis::aio::ConnectionManager;
use replication_target::RedisKvStore;
use testcontainers::{clients::Cli, core::WaitFor, Container, GenericImage};

/// Create a vanilla Redis container.
///
/// Uses official redis:7 image. Waits for "Ready to accept connections".
pub fn redis_container(docker: &Cli) -> Container<'_, GenericImage> {
    let image = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(6379)
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));
    docker.run(image)
}

/// Get the Redis URL for a container.
pub fn redis_url(container: &Container<'_, GenericImage>) -> String {
    let port = container.get_host_port_ipv4(6379);
    format!("redis://127.0.0.1:{}", port)
}

/// Helper to get a ConnectionManager from a Redis URL.
pub async fn connection_manager(url: &str) -> ConnectionManager {
    let client = redis::Client::open(url).unwrap();
    client.get_connection_manager().await.unwrap()
}

/// A Redis container with a store bound to one bucket.
pub struct TestBucket<'a> {
    #[allow(dead_code)] // Kept alive for container lifetime
    container: Container<'a, GenericImage>,
    pub redis_url: String,
    pub store: RedisKvStore,
}

impl<'a> TestBucket<'a> {
    pub async fn new(docker: &'a Cli, bucket: &str) -> TestBucket<'a> {
        let container = redis_container(docker);
        let redis_url = redis_url(&container);
        let store = RedisKvStore::new(connection_manager(&redis_url).await, bucket);
        Self {
            container,
            redis_url,
            store,
        }
    }

    /// Raw hash fields for an entry, bypassing the store.
    pub async fn raw_entry(&self, key: &str) -> (Option<Vec<u8>>, Option<u64>) {
        let mut conn = connection_manager(&self.redis_url).await;
        redis::cmd("HMGET")
            .arg(format!("{}:{}", self.store.bucket(), key))
            .arg("value")
            .arg("revision")
            .query_async(&mut conn)
            .await
            .unwrap()
    }
}
