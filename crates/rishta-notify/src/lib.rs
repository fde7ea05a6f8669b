pub mod notifier;
pub mod push;

pub use notifier::Notifier;
