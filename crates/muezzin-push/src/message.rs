//! Outgoing push messages

use serde_json::{Map, Value};

/// Which sound the device should play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sound {
    #[default]
    Default,
    /// The adhan asset, on its dedicated channel
    Adhan,
    /// Data-only message; nothing is shown or played
    Silent,
}

/// A message addressed to one registration token
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub sound: Sound,
    pub data: Map<String, Value>,
    /// Wake the app in the background
    pub content_available: bool,
}

impl PushMessage {
    /// A visible notification with the default sound
    pub fn notification(
        to: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            title: Some(title.into()),
            body: Some(body.into()),
            sound: Sound::Default,
            data: Map::new(),
            content_available: false,
        }
    }

    /// A silent background message carrying only data
    pub fn data_only(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            title: None,
            body: None,
            sound: Sound::Silent,
            data: Map::new(),
            content_available: true,
        }
    }

    /// Request the adhan sound instead of the default one
    pub fn with_adhan(mut self, adhan: bool) -> Self {
        if self.sound != Sound::Silent {
            self.sound = if adhan { Sound::Adhan } else { Sound::Default };
        }
        self
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn is_silent(&self) -> bool {
        self.sound == Sound::Silent
    }

    pub fn is_adhan(&self) -> bool {
        self.sound == Sound::Adhan
    }
}
