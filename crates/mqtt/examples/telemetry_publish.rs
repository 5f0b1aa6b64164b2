//! Minimal publish example.
//!
//! Connects to a local broker and sends one JSON payload to
//! `demo/telemetry`, then a status object to `demo/status`.
//!
//! ```bash
//! docker run -p 1883:1883 eclipse-mosquitto
//! cargo run -p hivelink-mqtt --example telemetry_publish
//! ```

use hivelink_mqtt::{Config, MqttPublisher};
use serde_json::json;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let config = Config {
        broker: "localhost".into(),
        topic_prefix: "demo".into(),
        ..Default::default()
    };

    let mut publisher = MqttPublisher::new(config).expect("valid config");
    if !publisher.connect().await {
        eprintln!("No broker on localhost:1883 — start one and retry");
        return;
    }

    let message = json!({
        "device_id": "demo-device",
        "readings": [{"sensor_name": "temperature_demo", "value": 21.5, "unit": "celsius"}],
    });

    match publisher.publish(&message).await {
        Ok(()) => println!("published to demo/telemetry"),
        Err(e) => eprintln!("publish failed: {e}"),
    }

    let status = json!({"online": true});
    if let Err(e) = publisher.publish_json("status", &status, Some(0)).await {
        eprintln!("status publish failed: {e}");
    }

    publisher.disconnect().await;
}
