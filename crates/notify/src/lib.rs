//! Templated multi-channel alarm dispatch.
//!
//! This crate provides:
//! - `Template` compilation against per-category placeholder vocabularies
//! - A deterministic resolver with nested conditional spans
//! - `Registry` loading and validation of the alarms file
//! - Channel payload shaping and `ChannelAdapter` implementations
//! - `Dispatcher` that delivers one event to every matching alarm
//! - `RegistryWatcher` for hot reload of the alarms file

pub mod adapters;
pub mod color;
pub mod dispatcher;
pub mod map;
pub mod payload;
pub mod registry;
pub mod render;
pub mod retry;
mod suggest;
pub mod telegram;
pub mod template;
#[cfg(test)]
mod testing;
pub mod traits;
pub mod twilio;
pub mod vocabulary;
pub mod watcher;
pub mod webhook;

pub use adapters::{adapter_for, http_adapters};
pub use dispatcher::Dispatcher;
pub use map::{GoogleStaticMap, MapImageRequest, MapOptions, MapRenderer, MapType};
pub use payload::{ChannelPayload, PayloadError, RenderedMessage};
pub use registry::{
    AlarmConfig, AlarmId, CategoryTemplate, Channel, ChannelType, LoadPolicy, Registry, SkippedAlarm,
    ValidationError,
};
pub use render::{render, RenderError};
pub use retry::RetryingAdapter;
pub use template::{CompileError, Template};
pub use traits::{ChannelAdapter, DeliveryStage, DispatchResult, NotifyError};
pub use vocabulary::{FieldFormat, PlaceholderSet, Vocabulary};
pub use watcher::{RegistryWatcher, WatchError};
