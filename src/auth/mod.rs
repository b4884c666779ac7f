//! Session coordination for one browser context.

pub mod coordinator;
pub mod error;
pub mod navigation;
pub mod notices;
pub mod preferences;

pub use coordinator::{AuthCoordinator, AuthSnapshot, Subscription, DASHBOARD_PATH, ONBOARDING_PATH};
pub use error::{AuthError, AuthErrorKind};
pub use navigation::{Navigator, PageNavigator};
pub use notices::{Notice, NoticeLevel, Notices};
pub use preferences::UserPreferences;
