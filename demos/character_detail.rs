//! Example rendering a character detail page as its data arrives.
//!
//! The character is fetched first; its location and episodes follow once the
//! character resolves. Each intermediate view is printed, then the same
//! character is composed again to show it being served from cache.
//!
//! Run against the public API:
//!   cargo run --example character_detail -- 1
//! or against a built-in fake origin:
//!   cargo run --example character_detail -- 1 --offline
//!
//! Set `RUST_LOG=swr_query=debug` to watch fetches and settlements.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use swr_query::{
    CacheConfig, CharacterDetail, Composer, DetailState, MemoryFetcher, ReferenceRules,
    ResourceCache, ResourceKey, ViewState,
};
use tracing_subscriber::EnvFilter;

fn offline_api(base: &str) -> Arc<MemoryFetcher> {
    let base = base.trim_end_matches('/');
    let api = Arc::new(MemoryFetcher::new(Duration::from_millis(150)));
    api.insert(
        format!("{}/character/1", base),
        json!({
            "id": 1,
            "name": "Rick Sanchez",
            "status": "Alive",
            "species": "Human",
            "gender": "Male",
            "image": format!("{}/character/avatar/1.jpeg", base),
            "origin": {"name": "Earth (C-137)", "url": format!("{}/location/1", base)},
            "location": {"name": "Citadel of Ricks", "url": format!("{}/location/3", base)},
            "episode": [format!("{}/episode/1", base), format!("{}/episode/2", base)]
        }),
    );
    api.insert(
        format!("{}/location/3", base),
        json!({"id": 3, "name": "Citadel of Ricks", "dimension": "unknown", "residents": [
            format!("{}/character/1", base)
        ]}),
    );
    api.insert(format!("{}/episode/1", base), json!({"id": 1, "name": "Pilot"}));
    api.insert_with_latency(
        format!("{}/episode/2", base),
        json!({"id": 2, "name": "Lawnmower Dog"}),
        Duration::from_millis(400),
    );
    api
}

fn render(state: &DetailState) {
    match state {
        DetailState::Loading => println!("  Loading..."),
        DetailState::Error(message) => println!("  Error: {}", message),
        DetailState::Ready(detail) => {
            println!(
                "  {} ({}, {}, {})",
                detail.name, detail.status, detail.species, detail.gender
            );
            println!("  Origin: {}", detail.origin);
            match (&detail.location, &detail.location_error) {
                (Some(location), _) => println!(
                    "  Location: {} [{}], {} residents",
                    location.name, location.dimension, location.resident_count
                ),
                (None, Some(error)) => println!("  Location: {} (error: {})", detail.location_name, error),
                (None, None) => println!("  Location: {} (loading)", detail.location_name),
            }
            match &detail.episode_error {
                Some(error) => println!("  Episodes: failed to load ({})", error),
                None if detail.episode_names.is_empty() => println!("  Episodes: loading"),
                None => println!("  Episodes: {}", detail.episode_names.join(", ")),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let id: u64 = args
        .iter()
        .find_map(|arg| arg.parse().ok())
        .unwrap_or(1);
    let offline = args.iter().any(|arg| arg == "--offline");

    let config = CacheConfig::from_env()?;
    let mut builder = ResourceCache::builder().config(config.clone());
    if offline {
        builder = builder.fetcher(offline_api(&config.base_url));
    }
    let cache = builder.build()?;
    let composer = Composer::new(cache, ReferenceRules::standard());
    let key = ResourceKey::character(id);

    println!("Composing {} from {}", key, composer.cache().url_for(&key)?);
    let mut sub = composer.compose_for(key.clone());
    loop {
        let view = sub.current();
        println!("[{:?}]", view.state());
        render(&CharacterDetail::from_view(&view));

        if matches!(view.state(), ViewState::Ready | ViewState::PrimaryError) || !sub.changed().await {
            break;
        }
    }

    // A second composition within the TTL is served without new fetches
    let mut again = composer.compose_for(key);
    let view = again.current();
    println!("\nComposed again: [{:?}]", view.state());
    render(&CharacterDetail::from_view(&view));
    println!("Cached slots: {}", composer.cache().len());

    Ok(())
}
