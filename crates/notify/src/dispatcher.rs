//! Routes events to every matching alarm.
//!
//! The dispatcher looks up the active alarms for an event's category,
//! renders each alarm's templates, shapes the channel payload and submits
//! it to that alarm's adapter. Alarms are processed concurrently and one
//! alarm's failure never affects another.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alarmist_core::{Coordinates, EventRecord};
use futures::future::join_all;

use crate::map::{self, MapRenderer};
use crate::payload::{self, ChannelPayload, RenderedMessage};
use crate::registry::{AlarmConfig, AlarmId, Registry};
use crate::traits::{ChannelAdapter, DeliveryStage, DispatchResult, NotifyError};

const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(30);

/// Dispatches events to the alarms of a [`Registry`].
pub struct Dispatcher {
    registry: Arc<Registry>,
    /// Alarm → adapter that delivers its payloads.
    adapters: HashMap<AlarmId, Arc<dyn ChannelAdapter>>,
    map_renderer: Option<Arc<dyn MapRenderer>>,
    delivery_timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher with no adapters attached.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            adapters: HashMap::new(),
            map_renderer: None,
            delivery_timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_adapter(mut self, alarm_id: AlarmId, adapter: Arc<dyn ChannelAdapter>) -> Self {
        self.set_adapter(alarm_id, adapter);
        self
    }

    pub fn with_adapters(mut self, adapters: HashMap<AlarmId, Arc<dyn ChannelAdapter>>) -> Self {
        self.adapters.extend(adapters);
        self
    }

    pub fn with_map_renderer(mut self, renderer: Arc<dyn MapRenderer>) -> Self {
        self.map_renderer = Some(renderer);
        self
    }

    pub fn with_delivery_timeout(mut self, timeout: Duration) -> Self {
        self.delivery_timeout = timeout;
        self
    }

    /// Attach or replace the adapter for one alarm.
    pub fn set_adapter(&mut self, alarm_id: AlarmId, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(alarm_id, adapter);
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Dispatch one event to all active alarms for its category.
    ///
    /// Returns one result per alarm, in configuration order.
    pub async fn dispatch(&self, event: &EventRecord) -> Vec<DispatchResult> {
        let alarms = self.registry.active_alarms_for(event.category);
        if alarms.is_empty() {
            tracing::debug!(category = %event.category, "No active alarms for category");
            return Vec::new();
        }

        let coordinates = match event.coordinates() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(category = %event.category, error = %e, "Ignoring event location");
                None
            }
        };

        join_all(
            alarms
                .into_iter()
                .map(|alarm| self.dispatch_alarm(alarm, event, coordinates)),
        )
        .await
    }

    async fn dispatch_alarm(
        &self,
        alarm: &AlarmConfig,
        event: &EventRecord,
        coordinates: Option<Coordinates>,
    ) -> DispatchResult {
        let start = Instant::now();
        let channel = alarm.channel_type();
        tracing::trace!(alarm_id = %alarm.id, %channel, stage = ?DeliveryStage::Pending, "alarm matched");

        let Some(template) = alarm.template_for(event.category) else {
            return failed(alarm, DeliveryStage::Pending, "no template for category".to_string(), start);
        };

        tracing::trace!(alarm_id = %alarm.id, %channel, stage = ?DeliveryStage::Rendering, "rendering");
        let mut message = template.render(channel, event);
        message.map = map::resolve(&template.map, coordinates);
        if let (Some(request), Some(renderer)) = (&message.map, &self.map_renderer) {
            match renderer.render(request).await {
                Ok(url) => message.map_url = Some(url),
                Err(e) => {
                    tracing::warn!(alarm_id = %alarm.id, %channel, error = %e, "Map rendering failed, sending without image");
                }
            }
        }

        let payload = match payload::build(&alarm.channel, &message) {
            Ok(p) => p,
            Err(e) => return failed(alarm, DeliveryStage::Rendering, e.to_string(), start),
        };

        self.submit(alarm, &payload, start).await
    }

    async fn submit(&self, alarm: &AlarmConfig, payload: &ChannelPayload, start: Instant) -> DispatchResult {
        let channel = alarm.channel_type();
        tracing::trace!(alarm_id = %alarm.id, %channel, stage = ?DeliveryStage::Delivering, "delivering");

        let Some(adapter) = self.adapters.get(&alarm.id) else {
            return failed(
                alarm,
                DeliveryStage::Delivering,
                NotifyError::Config(format!("no adapter configured for alarm {}", alarm.id)).to_string(),
                start,
            );
        };

        let outcome = match tokio::time::timeout(self.delivery_timeout, adapter.deliver(payload)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Timeout(self.delivery_timeout.as_millis() as u64)),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(()) => {
                tracing::info!(
                    alarm_id = %alarm.id,
                    %channel,
                    adapter = adapter.channel_name(),
                    duration_ms,
                    "Notification delivered"
                );
                DispatchResult::Delivered {
                    alarm_id: alarm.id,
                    channel,
                    duration_ms,
                }
            }
            Err(e) => failed(alarm, DeliveryStage::Delivering, e.to_string(), start),
        }
    }

    /// Send a timestamped "activated" message to every active alarm that
    /// has `startup_message` enabled.
    pub async fn announce_startup(&self) -> Vec<DispatchResult> {
        let text = format!("{}- Alarmist activated!", chrono::Local::now().format("%H:%M:%S"));
        let message = RenderedMessage {
            body: Some(text),
            ..RenderedMessage::default()
        };

        let targets = self
            .registry
            .alarms()
            .iter()
            .filter(|a| a.active && a.startup_message);

        join_all(targets.map(|alarm| {
            let message = &message;
            async move {
                let start = Instant::now();
                match payload::build(&alarm.channel, message) {
                    Ok(payload) => self.submit(alarm, &payload, start).await,
                    Err(e) => failed(alarm, DeliveryStage::Rendering, e.to_string(), start),
                }
            }
        }))
        .await
    }
}

fn failed(alarm: &AlarmConfig, stage: DeliveryStage, reason: String, start: Instant) -> DispatchResult {
    let duration_ms = start.elapsed().as_millis() as u64;
    tracing::warn!(
        alarm_id = %alarm.id,
        channel = %alarm.channel_type(),
        ?stage,
        error = %reason,
        duration_ms,
        "Notification delivery failed"
    );
    DispatchResult::Failed {
        alarm_id: alarm.id,
        channel: alarm.channel_type(),
        stage,
        reason,
        duration_ms,
    }
}
