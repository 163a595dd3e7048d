pub mod alerts;
pub mod device;
pub mod logs;
pub mod settings;
pub mod system;
pub mod telemetry;
