pub mod afk;
pub mod cooldown;
pub mod giveaways;
pub mod levels;
pub mod snapshot;
pub mod warnings;

pub use afk::AfkStore;
pub use cooldown::CooldownStore;
pub use giveaways::GiveawayStore;
pub use levels::LevelStore;
pub use snapshot::PersistedKeyedStore;
pub use warnings::WarningStore;
