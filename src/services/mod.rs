//! Business logic services

pub mod cache;
pub mod email;
pub mod payments;
pub mod paypal;
pub mod providers;
pub mod quotations;
pub mod reservations;
pub mod tracking;

use std::{sync::Arc, time::Duration};

use crate::{config::AppConfig, repository::Repository};

use self::{
    cache::{Cache, CacheKeys},
    payments::PaymentGateway,
    reservations::AggregateTtl,
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Repository,
    pub reservations: reservations::ReservationsService,
    pub quotations: quotations::QuotationsService,
    pub providers: providers::ProvidersService,
    pub tracking: tracking::TrackingService,
    pub payments: payments::PaymentsService,
    pub email: email::EmailService,
}

impl Services {
    /// Create all services with the given repository and collaborators
    pub fn new(
        repository: Repository,
        config: &AppConfig,
        cache: Arc<dyn Cache>,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Self {
        let email = email::EmailService::new(config.email.clone());
        let keys = CacheKeys::new(&config.cache.prefix);
        let ttl = AggregateTtl {
            tours: Duration::from_secs(config.cache.tours_ttl_seconds),
            stats: Duration::from_secs(config.cache.stats_ttl_seconds),
        };

        let reservations = reservations::ReservationsService::new(
            repository.clone(),
            cache,
            keys,
            ttl,
            email.clone(),
        );
        let quotations = quotations::QuotationsService::new(repository.clone(), email.clone());

        Self {
            payments: payments::PaymentsService::new(gateway, reservations.clone(), quotations.clone()),
            providers: providers::ProvidersService::new(repository.clone()),
            tracking: tracking::TrackingService::new(repository.clone(), config.tracking.retention_days),
            reservations,
            quotations,
            email,
            repository,
        }
    }
}
