//! Push message handling.

use color_eyre::Result;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::Worker;
use crate::cache::CacheStorage;
use crate::config::NotificationDefaults;
use crate::notify::{Notification, NotificationData};

/// A push payload with every field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPayload {
  pub title: String,
  pub body: String,
  pub icon: String,
  pub badge: String,
  pub url: String,
}

impl PushPayload {
  /// Parse push data, merging it field by field onto `defaults`.
  ///
  /// Never fails. Absent data yields the defaults. Data that is not a JSON
  /// object is logged and treated as absent. Inside an object, a field that
  /// is missing, null or not a string keeps its default.
  pub fn parse(data: Option<&[u8]>, defaults: &NotificationDefaults) -> Self {
    let message = match data {
      Some(bytes) if !bytes.is_empty() => match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
          warn!("Ignoring push payload that is not an object: {}", other);
          Map::new()
        }
        Err(e) => {
          warn!("Ignoring malformed push payload: {}", e);
          Map::new()
        }
      },
      _ => Map::new(),
    };

    let field = |name: &str, default: &String| match message.get(name) {
      Some(Value::String(value)) => value.clone(),
      Some(Value::Null) | None => default.clone(),
      Some(other) => {
        warn!(field = name, "Ignoring push field that is not a string: {}", other);
        default.clone()
      }
    };

    Self {
      title: field("title", &defaults.title),
      body: field("body", &defaults.body),
      icon: field("icon", &defaults.icon),
      badge: field("badge", &defaults.badge),
      url: field("url", &defaults.url),
    }
  }

  /// Build the notification shown for this payload.
  pub fn into_notification(self, defaults: &NotificationDefaults) -> Notification {
    Notification {
      title: self.title,
      body: self.body,
      icon: self.icon,
      badge: self.badge,
      tag: defaults.tag.clone(),
      require_interaction: true,
      vibrate: defaults.vibrate.clone(),
      data: NotificationData {
        url: Some(self.url),
      },
    }
  }
}

impl<S: CacheStorage> Worker<S> {
  /// Show a notification for an inbound push message.
  pub async fn handle_push(&self, data: Option<&[u8]>) -> Result<Notification> {
    let defaults = &self.config.notifications;
    let notification = PushPayload::parse(data, defaults).into_notification(defaults);

    self.host.notifier.show(notification.clone()).await?;
    info!(title = %notification.title, tag = %notification.tag, "Notification shown");

    Ok(notification)
  }
}

#[cfg(test)]
mod tests {
  use super::super::testing::fixture;
  use super::*;

  #[test]
  fn test_partial_payload_uses_defaults() {
    let defaults = NotificationDefaults::default();
    let payload = PushPayload::parse(Some(&br#"{"title":"T","body":"B"}"#[..]), &defaults);

    assert_eq!(payload.title, "T");
    assert_eq!(payload.body, "B");
    assert_eq!(payload.icon, defaults.icon);
    assert_eq!(payload.badge, defaults.badge);
    assert_eq!(payload.url, "/");
  }

  #[test]
  fn test_absent_and_malformed_payloads() {
    let defaults = NotificationDefaults::default();
    let expected = PushPayload::parse(None, &defaults);
    assert_eq!(expected.title, defaults.title);

    let cases: [&[u8]; 5] = [b"", b"not json", b"[1,2]", b"\"text\"", b"{\"title\": 5}"];
    for data in cases {
      assert_eq!(PushPayload::parse(Some(data), &defaults), expected);
    }
  }

  #[test]
  fn test_mistyped_field_keeps_the_others() {
    let defaults = NotificationDefaults::default();
    let payload = PushPayload::parse(
      Some(
        &br#"{"title":"EMERGENCIA: Incendio","body":"Evacuar bloque B","url":"/emergencias/7","icon":5,"badge":["x"]}"#[..],
      ),
      &defaults,
    );

    assert_eq!(payload.title, "EMERGENCIA: Incendio");
    assert_eq!(payload.body, "Evacuar bloque B");
    assert_eq!(payload.url, "/emergencias/7");
    assert_eq!(payload.icon, defaults.icon);
    assert_eq!(payload.badge, defaults.badge);
  }

  #[test]
  fn test_null_fields_and_extra_fields() {
    let defaults = NotificationDefaults::default();
    let payload = PushPayload::parse(
      Some(&br#"{"title":null,"url":"/emergencias/","priority":"ALTA"}"#[..]),
      &defaults,
    );
    assert_eq!(payload.title, defaults.title);
    assert_eq!(payload.url, "/emergencias/");
  }

  #[tokio::test]
  async fn test_push_shows_tagged_notification() {
    let f = fixture();

    let shown = f
      .worker
      .handle_push(Some(&br#"{"title":"T","body":"B"}"#[..]))
      .await
      .unwrap();

    assert_eq!(shown.title, "T");
    assert_eq!(shown.body, "B");
    assert_eq!(shown.tag, "sst-emergencia");
    assert!(shown.require_interaction);
    assert_eq!(shown.vibrate, vec![200, 100, 200]);
    assert_eq!(shown.data.url.as_deref(), Some("/"));
    assert_eq!(f.tray.visible(), vec![shown]);
  }

  #[tokio::test]
  async fn test_second_push_replaces_first() {
    let f = fixture();

    f.worker
      .handle_push(Some(&br#"{"title":"EMERGENCIA: Incendio"}"#[..]))
      .await
      .unwrap();
    f.worker
      .handle_push(Some(&br#"{"title":"EMERGENCIA: Sismo"}"#[..]))
      .await
      .unwrap();

    let visible = f.tray.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "EMERGENCIA: Sismo");
  }
}
