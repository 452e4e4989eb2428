// File: plantgo-common/src/models/mod.rs
pub mod level;
pub mod progress;
pub mod game;
pub mod notification;

pub use level::{Level, LevelRef, LevelUpdate, NewLevel};
pub use progress::{ProgressEntry, ProgressRecord, RewardAccount};
pub use game::{
    AnswerOutcome, CompletionReceipt, GameDataView, GameLevelView, GameSnapshot,
    LevelDetailsView, LevelSnapshot, RewardSummary,
};
pub use notification::{
    FcmToken, Notification, NotificationFilter, NotificationKind, NotificationPage,
    NotificationPreferences, NotificationQuery, NotificationStatus, NotifyEvent,
    PreferencesUpdate,
};
