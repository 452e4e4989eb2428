pub mod repository_traits;
pub mod notifier_traits;
