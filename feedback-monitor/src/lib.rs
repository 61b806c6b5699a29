pub mod app;
pub mod command;
pub mod config;
pub mod permission;
pub mod registry;
pub mod relay;
pub mod scheduler;
pub mod sensor;
pub mod settings;

pub use app::Monitor;
pub use command::{Command, CommandError};
pub use config::{Config, PermissionsConfig, PortConfig, SensorsConfig, SettingsConfig};
pub use permission::{PermissionChecker, PermissionStatus, Privilege, StaticPermissions};
pub use registry::ServiceRegistry;
pub use relay::FeedbackRelay;
pub use scheduler::{RandomAction, RandomActionScheduler, SchedulerConfig, Tick};
pub use sensor::{Sensor, SensorError, SensorHandle};
pub use settings::SettingsStore;
pub use settings::memory::MemorySettingsStore;
pub use settings::sqlite::SqliteSettingsStore;
