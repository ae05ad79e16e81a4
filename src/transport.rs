//! Device-id keyed fan-out from incoming packets to renderers.
//!
//! Connections and wire protocols live outside this crate; this module only
//! decodes the JSON payload and routes it to whoever subscribed to the device.

use std::collections::BTreeMap;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use crate::render::{Clock, RenderError, RenderSurface, WaveRenderer};

const TOPIC_PREFIX: &str = "/device/collector/";

/// One second of samples from a collector device.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevicePacket {
    pub device_id: String,
    #[serde(default)]
    pub ecg_list: Vec<f64>,
    #[serde(default)]
    pub resp_list: Vec<f64>,
    #[serde(default)]
    pub abdominal_list: Vec<f64>,
}

impl DevicePacket {
    pub fn from_json(payload: &str) -> Result<Self, RenderError> {
        serde_json::from_str(payload).map_err(RenderError::Packet)
    }

    pub fn to_json(&self) -> Result<String, RenderError> {
        serde_json::to_string(self).map_err(RenderError::Packet)
    }

    /// One batch per channel: ECG, chest respiration, abdominal respiration.
    pub fn into_batches(self) -> Vec<Vec<f64>> {
        vec![self.ecg_list, self.resp_list, self.abdominal_list]
    }
}

/// Anything that takes one sample batch per channel.
pub trait PacketSink {
    fn ingest(&mut self, batches: Vec<Vec<f64>>) -> bool;
}

impl<S: RenderSurface, C: Clock> PacketSink for WaveRenderer<S, C> {
    fn ingest(&mut self, batches: Vec<Vec<f64>>) -> bool {
        WaveRenderer::ingest(self, batches)
    }
}

pub fn topic_for(device_id: &str) -> String {
    format!("{TOPIC_PREFIX}{device_id}")
}

/// Registry of sinks keyed by device id.
pub struct Subscriptions<T> {
    sinks: BTreeMap<String, T>,
}

impl<T> Default for Subscriptions<T> {
    fn default() -> Self {
        Self {
            sinks: BTreeMap::new(),
        }
    }
}

impl<T: PacketSink> Subscriptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink` for `device_id`, returning the sink it replaces.
    pub fn subscribe(&mut self, device_id: impl Into<String>, sink: T) -> Option<T> {
        let device_id = device_id.into();
        debug!("subscribed {}", topic_for(&device_id));
        self.sinks.insert(device_id, sink)
    }

    pub fn unsubscribe(&mut self, device_id: &str) -> Option<T> {
        let removed = self.sinks.remove(device_id);
        if removed.is_some() {
            debug!("unsubscribed {}", topic_for(device_id));
        }
        removed
    }

    pub fn topics(&self) -> impl Iterator<Item = String> + '_ {
        self.sinks.keys().map(|id| topic_for(id))
    }

    /// Routes a packet to its device's sink. Returns whether a sink took it.
    pub fn dispatch(&mut self, packet: DevicePacket) -> bool {
        match self.sinks.get_mut(&packet.device_id) {
            Some(sink) => sink.ingest(packet.into_batches()),
            None => {
                trace!("no subscriber for device {}", packet.device_id);
                false
            }
        }
    }

    pub fn dispatch_json(&mut self, payload: &str) -> Result<bool, RenderError> {
        let packet = DevicePacket::from_json(payload)?;
        Ok(self.dispatch(packet))
    }

    pub fn get_mut(&mut self, device_id: &str) -> Option<&mut T> {
        self.sinks.get_mut(device_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.sinks.iter().map(|(id, sink)| (id.as_str(), sink))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.sinks.iter_mut().map(|(id, sink)| (id.as_str(), sink))
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}
