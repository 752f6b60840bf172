#![forbid(unsafe_code)]

pub mod access;
pub mod account_service;
pub mod app_services;
pub mod config;
pub mod dashboard_service;
pub mod error;
pub mod focus_service;
pub mod progress_service;
pub mod study_service;
pub mod test_service;

pub use track_core::Clock;

pub use access::{AccessMode, Actor};
pub use account_service::{AccountService, AdminOverview};
pub use app_services::AppServices;
pub use config::{FocusSettings, TrackerConfig};
pub use dashboard_service::{Dashboard, DashboardService};
pub use error::{
    AccessError, AccountError, AppServicesError, DashboardError, FocusError, ProgressError,
    StudyError, TestError,
};
pub use focus_service::{FocusCompletion, FocusService};
pub use progress_service::ProgressService;
pub use study_service::StudyService;
pub use test_service::{TestService, TestTrend, TrendPoint};
