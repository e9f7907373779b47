use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub customer_batch_size: usize,
    pub worker_core_size: usize,
    pub worker_max_size: usize,
    pub worker_queue_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| config::ConfigError::NotFound("DATABASE_URL".to_string()))?;
        let worker_core_size = env_size("WORKER_CORE_SIZE", default_core_size());
        Ok(Self {
            database_url,
            bind_address: std::env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            customer_batch_size: env_size("CUSTOMER_BATCH_SIZE", 200),
            worker_core_size,
            worker_max_size: env_size("WORKER_MAX_SIZE", worker_core_size * 2),
            worker_queue_capacity: env_size("WORKER_QUEUE_CAPACITY", 2000),
        })
    }
}

/// Positive integer from the environment, falling back when unset or invalid.
fn env_size(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .unwrap_or(default)
}

fn default_core_size() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    cpus * 2
}
