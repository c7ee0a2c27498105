use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use swr_query::{MemoryFetcher, ResourceKey};

pub const BASE: &str = "https://bench.test";

/// Number of distinct locations and episodes characters point at.
const LOCATIONS: usize = 100;
const EPISODES: usize = 51;

/// Fake Rick and Morty API with configurable latency.
///
/// Every character references one location and three episodes, so composing a
/// character costs one primary and four secondary fetches on a cold cache.
#[derive(Clone)]
pub struct FakeApi {
    pub fetcher: Arc<MemoryFetcher>,
}

impl FakeApi {
    pub fn new(num_characters: usize, latency_ms: u64) -> Self {
        let fetcher = Arc::new(MemoryFetcher::new(Duration::from_millis(latency_ms)));

        for id in 0..num_characters {
            let episodes: Vec<String> = (0..3)
                .map(|i| format!("/episode/{}", (id + i) % EPISODES))
                .collect();
            fetcher.insert(
                format!("{}/character/{}", BASE, id),
                json!({
                    "id": id,
                    "name": format!("Character {}", id),
                    "status": "Alive",
                    "species": "Human",
                    "gender": "Male",
                    "origin": {"name": "Earth (C-137)", "url": ""},
                    "location": {"name": "Somewhere", "url": format!("/location/{}", id % LOCATIONS)},
                    "episode": episodes,
                }),
            );
        }
        for id in 0..LOCATIONS {
            fetcher.insert(
                format!("{}/location/{}", BASE, id),
                json!({"id": id, "name": format!("Location {}", id), "dimension": "C-137", "residents": []}),
            );
        }
        for id in 0..EPISODES {
            fetcher.insert(
                format!("{}/episode/{}", BASE, id),
                json!({"id": id, "name": format!("Episode {}", id), "episode": format!("S01E{:02}", id)}),
            );
        }

        Self { fetcher }
    }

    #[allow(dead_code)]
    pub fn total_calls(&self) -> usize {
        self.fetcher.total_calls()
    }
}

/// Generate character keys for different workload patterns
pub struct KeyGenerator {
    num_keys: usize,
}

impl KeyGenerator {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }

    /// Sequential keys (for cold cache tests)
    pub fn sequential(&self) -> Vec<ResourceKey> {
        (0..self.num_keys as u64).map(ResourceKey::character).collect()
    }

    /// Random keys with uniform distribution
    #[allow(dead_code)]
    pub fn uniform_random(&self, count: usize) -> Vec<ResourceKey> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| ResourceKey::character(rng.gen_range(0..self.num_keys) as u64))
            .collect()
    }

    /// Keys with a skewed distribution: 80% of requests go to 20% of keys
    pub fn zipf_random(&self, count: usize) -> Vec<ResourceKey> {
        let mut rng = rand::thread_rng();
        let hot = (self.num_keys / 5).max(1);

        (0..count)
            .map(|_| {
                let id = if rng.gen_bool(0.8) {
                    rng.gen_range(0..hot)
                } else {
                    rng.gen_range(hot.min(self.num_keys - 1)..self.num_keys)
                };
                ResourceKey::character(id as u64)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn test_fake_api() {
        use super::{BASE, FakeApi};
        use swr_query::Fetcher;

        let api = FakeApi::new(10, 0);

        let character = api.fetcher.fetch(&format!("{}/character/3", BASE)).await.unwrap();
        assert_eq!(character["location"]["url"], "/location/3");
        assert_eq!(api.total_calls(), 1);
    }

    #[test]
    fn test_key_generator() {
        use super::KeyGenerator;
        use swr_query::ResourceKey;

        let key_gen = KeyGenerator::new(100);

        let seq = key_gen.sequential();
        assert_eq!(seq.len(), 100);
        assert_eq!(seq[0], ResourceKey::character(0u64));

        assert_eq!(key_gen.uniform_random(50).len(), 50);
        assert_eq!(key_gen.zipf_random(100).len(), 100);
    }
}
