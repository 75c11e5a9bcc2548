//! freshcache demo
//!
//! Runs the typical ways of using the cache and prints what they return.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use freshcache::{AnyCache, Cache, CacheConfig, Proxy, NO_EXPIRATION};

#[derive(Debug)]
struct Site {
    id: u64,
    hostname: String,
}

#[derive(Debug)]
struct MyStruct {
    value: String,
}

/// Entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load cache configuration from environment variables
/// 3. Run the string, struct, untyped and proxy examples
/// 4. Print the statistics of the configured cache as JSON
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freshcache=info,freshcache_demo=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env().context("loading cache configuration")?;
    info!(
        "Configuration: capacity={}, default_ttl={}s, cleanup_interval={}s",
        config.capacity, config.default_ttl_secs, config.cleanup_interval_secs
    );

    // Strings with the configured default expiration
    let cache: Cache<String, String> = config.build();
    cache.set("foo".to_string(), "bar".to_string());
    cache.set_with_expire("baz".to_string(), "never".to_string(), NO_EXPIRATION);
    if let Some(foo) = cache.get("foo") {
        println!("{}", foo);
    }

    // Typed struct values
    let structs: Cache<String, Arc<MyStruct>> = Cache::new(100, NO_EXPIRATION, NO_EXPIRATION);
    structs.set(
        "cache".to_string(),
        Arc::new(MyStruct {
            value: "value".to_string(),
        }),
    );
    if let Some(value) = structs.get("cache") {
        println!("{:?} ({})", value, value.value);
    }

    // Values of any type, checked at runtime
    let any: AnyCache<String> = Cache::new(100, NO_EXPIRATION, NO_EXPIRATION);
    any.set("a".to_string(), Arc::new("value 1"));
    any.set("b".to_string(), Arc::new(42i64));
    if let (Some(a), Some(b)) = (any.get_as::<&str, _>("a"), any.get_as::<i64, _>("b")) {
        println!("{} {}", a, b);
    }

    // Sites cached by id, reachable by hostname through a proxy
    let sites: Cache<u64, Arc<Site>> = Cache::new(100, NO_EXPIRATION, NO_EXPIRATION);
    let by_host: Proxy<String, u64, Arc<Site>> = Proxy::new(sites.clone());
    by_host.set(
        42,
        "example.com".to_string(),
        Arc::new(Site {
            id: 42,
            hostname: "example.com".to_string(),
        }),
    );

    let site_by_id = sites.get(&42);
    let site_by_host = by_host.get("example.com");
    for site in [&site_by_id, &site_by_host] {
        match site {
            Some(site) => println!("true {} {}", site.id, site.hostname),
            None => println!("false"),
        }
    }
    if let (Some(by_id), Some(by_host)) = (&site_by_id, &site_by_host) {
        println!("{}", Arc::ptr_eq(by_id, by_host));
    }

    let stats = cache.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        "Hit rate {:.1}%",
        stats.hit_rate() * 100.0
    );
    let stats = serde_json::to_string_pretty(&stats).context("serializing stats")?;
    println!("{}", stats);

    Ok(())
}
