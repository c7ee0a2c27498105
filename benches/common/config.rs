use std::env;

/// Configuration for benchmarks, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Simulated origin latency in milliseconds (from ORIGIN_LATENCY_MS env var, defaults to 20)
    pub origin_latency_ms: u64,

    /// Number of characters served by the fake API (from BENCH_CHARACTERS env var, defaults to 1000)
    pub num_characters: usize,

    /// Sample size for benchmarks (from BENCH_SAMPLE_SIZE env var, defaults to 100)
    pub sample_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            origin_latency_ms: env_or("ORIGIN_LATENCY_MS", 20),
            num_characters: env_or("BENCH_CHARACTERS", 1000),
            sample_size: env_or("BENCH_SAMPLE_SIZE", 100),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        let config = Self::default();
        eprintln!("Benchmark Configuration:");
        eprintln!("  Origin Latency: {}ms", config.origin_latency_ms);
        eprintln!("  Characters: {}", config.num_characters);
        eprintln!("  Sample Size: {}", config.sample_size);
        config
    }
}

fn env_or<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
