//! Startup bootstrap: build the pool and scheduler, optionally seed demo hospitals.

use std::sync::Arc;

use tracing::info;
use vaxishare_allocator::{AllocError, ConsumerId, ConsumerSpec, RequestScheduler, ResourcePool};

use crate::config::Config;

/// The demo hospital set registered when seeding is enabled.
pub fn demo_hospitals() -> Vec<ConsumerSpec> {
    [
        (1, "City General Hospital", 3, 5000),
        (2, "Community Health Center", 2, 2000),
        (3, "Metropolitan Medical", 5, 8000),
        (4, "Regional Hospital", 4, 6000),
        (5, "Rural Clinic", 1, 1000),
    ]
    .into_iter()
    .map(|(id, name, priority, high_risk)| {
        ConsumerSpec::new(ConsumerId::new(id), name, priority, high_risk)
    })
    .collect()
}

/// Construct the pool/scheduler pair described by `config`.
pub fn bootstrap(config: &Config) -> Result<Arc<RequestScheduler>, AllocError> {
    let pool = Arc::new(ResourcePool::new(config.initial_doses));

    if config.seed_demo {
        for spec in demo_hospitals() {
            pool.register(spec)?;
        }
    }

    info!(
        initial_doses = config.initial_doses,
        hospitals = pool.status().consumers,
        "Allocator ready"
    );

    Ok(Arc::new(RequestScheduler::new(pool)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_seeds_demo_set_in_order() {
        let scheduler = bootstrap(&Config::default()).unwrap();
        let pool = scheduler.pool();

        assert_eq!(pool.total_amount(), 10_000);
        assert_eq!(pool.available_amount(), 10_000);

        let ids: Vec<i64> = pool.list_consumers().iter().map(|c| c.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);

        let metropolitan = pool.consumer(ConsumerId::new(3)).unwrap();
        assert_eq!(metropolitan.name, "Metropolitan Medical");
        assert_eq!(metropolitan.priority, 5);
        assert_eq!(metropolitan.risk_weight, 8000);
    }

    #[test]
    fn test_bootstrap_without_seed() {
        let config = Config {
            initial_doses: 42,
            seed_demo: false,
            ..Config::default()
        };

        let scheduler = bootstrap(&config).unwrap();

        assert!(scheduler.pool().list_consumers().is_empty());
        assert_eq!(scheduler.pool().total_amount(), 42);
    }
}
