use std::sync::Arc;

use crate::{
    config::Config,
    db::{
        CatalogRepository, LedgerRepository, PgStore, PoolRepository, ProfileRepository,
        SessionStore,
    },
    services::{
        providers::CatalogProvider, push::PushSender, CatalogService, CatalogSync,
        InactivitySweeper, InteractionLedger, Notifier, ProfileService, RecommendationPool,
        Scheduler, SurveyService, ViewedExpiry,
    },
};

/// Storage and external seams every service is built from
#[derive(Clone)]
pub struct Backends {
    pub profiles: Arc<dyn ProfileRepository>,
    pub pool: Arc<dyn PoolRepository>,
    pub ledger: Arc<dyn LedgerRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub provider: Arc<dyn CatalogProvider>,
}

impl Backends {
    /// All repositories served by one Postgres store
    pub fn postgres(
        store: PgStore,
        sessions: Arc<dyn SessionStore>,
        provider: Arc<dyn CatalogProvider>,
    ) -> Self {
        let store = Arc::new(store);
        Self {
            profiles: store.clone(),
            pool: store.clone(),
            ledger: store.clone(),
            catalog: store,
            sessions,
            provider,
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub profiles: ProfileService,
    pub survey: SurveyService,
    pub pool: RecommendationPool,
    pub ledger: InteractionLedger,
    pub catalog: CatalogService,
}

impl AppState {
    pub fn new(backends: &Backends, config: &Config) -> Self {
        let pool = RecommendationPool::new(backends.pool.clone(), config.pool_size);

        Self {
            profiles: ProfileService::new(backends.profiles.clone()),
            survey: SurveyService::new(
                backends.sessions.clone(),
                backends.profiles.clone(),
                pool.clone(),
                config.survey_ttl(),
            ),
            ledger: InteractionLedger::new(backends.ledger.clone(), pool.clone()),
            catalog: CatalogService::new(backends.catalog.clone(), backends.provider.clone()),
            pool,
        }
    }
}

/// The four periodic jobs, ready to spawn
pub fn scheduler(backends: &Backends, push: Arc<dyn PushSender>, config: &Config) -> Scheduler {
    let pool = RecommendationPool::new(backends.pool.clone(), config.pool_size);
    let catalog = CatalogService::new(backends.catalog.clone(), backends.provider.clone());

    Scheduler::new()
        .with_job(Arc::new(Notifier::new(
            backends.profiles.clone(),
            pool.clone(),
            catalog,
            push.clone(),
            config.notify_interval(),
        )))
        .with_job(Arc::new(InactivitySweeper::new(
            backends.profiles.clone(),
            backends.sessions.clone(),
            push,
            config.inactivity_check_interval(),
            config.inactivity_timeout(),
        )))
        .with_job(Arc::new(CatalogSync::new(
            backends.catalog.clone(),
            backends.provider.clone(),
            config.catalog_sync_interval(),
        )))
        .with_job(Arc::new(ViewedExpiry::new(
            pool,
            config.viewed_expiry_interval(),
            config.viewed_retention(),
        )))
}
