pub mod catalog;
pub mod catalog_sync;
pub mod inactivity;
pub mod ledger;
pub mod notifier;
pub mod profile;
pub mod providers;
pub mod push;
pub mod recommendations;
pub mod scheduler;
pub mod survey;

pub use catalog::CatalogService;
pub use catalog_sync::{CatalogSync, SyncReport};
pub use inactivity::InactivitySweeper;
pub use ledger::{InteractionLedger, RatingChange};
pub use notifier::Notifier;
pub use profile::ProfileService;
pub use recommendations::{RecommendationPool, ViewedExpiry};
pub use scheduler::{Job, Scheduler, SchedulerHandle};
pub use survey::{SurveyPatch, SurveyService};
