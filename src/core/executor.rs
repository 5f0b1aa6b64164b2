//! The polling executor.
//!
//! Drives the pipeline on a fixed interval: read every configured reader
//! sequentially, validate and batch the readings, and publish each resulting
//! message through the [`TelemetrySink`]. No step of one cycle overlaps
//! another step of the same cycle; the only concurrency is the broker
//! transport's own background activity. Publish failures are logged per
//! message and never stop the loop.

use std::{sync::Arc, time::Duration};

use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::{
    sensors::{I2cReader, ModbusReader, SensorReading},
    telemetry::{TelemetryMessage, TelemetryProcessor},
};

/// A destination for delivery-ready telemetry messages.
#[async_trait::async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn publish(
        &self,
        message: &TelemetryMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

#[async_trait::async_trait]
impl TelemetrySink for hivelink_mqtt::MqttPublisher {
    async fn publish(
        &self,
        message: &TelemetryMessage,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        hivelink_mqtt::MqttPublisher::publish(self, message)
            .await
            .map_err(|e| Box::new(e) as _)
    }
}

/// A bus reader the executor can sweep.
#[async_trait::async_trait]
pub trait SensorReader: Send + Sync {
    /// Short name for log lines ("modbus", "i2c").
    fn name(&self) -> &'static str;

    /// Opens the bus and enumerates sensors. Returns false when the bus is
    /// unavailable; the executor then skips this reader.
    async fn connect(&mut self) -> bool;

    /// Closes the bus and drops the sensors.
    async fn disconnect(&mut self);

    /// Reads all sensors sequentially; failures are already swallowed.
    async fn read_all(&self) -> Vec<SensorReading>;
}

#[async_trait::async_trait]
impl SensorReader for ModbusReader {
    fn name(&self) -> &'static str {
        "modbus"
    }

    async fn connect(&mut self) -> bool {
        ModbusReader::connect(self).await
    }

    async fn disconnect(&mut self) {
        ModbusReader::disconnect(self).await;
    }

    async fn read_all(&self) -> Vec<SensorReading> {
        ModbusReader::read_all(self).await
    }
}

#[async_trait::async_trait]
impl SensorReader for I2cReader {
    fn name(&self) -> &'static str {
        "i2c"
    }

    async fn connect(&mut self) -> bool {
        I2cReader::connect(self).await
    }

    async fn disconnect(&mut self) {
        I2cReader::disconnect(self).await;
    }

    async fn read_all(&self) -> Vec<SensorReading> {
        I2cReader::read_all(self).await
    }
}

/// Periodic poll-process-publish loop.
pub struct Executor {
    readers: Vec<Box<dyn SensorReader>>,
    processor: TelemetryProcessor,
    sink: Arc<dyn TelemetrySink>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(
        readers: Vec<Box<dyn SensorReader>>,
        processor: TelemetryProcessor,
        sink: Arc<dyn TelemetrySink>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            readers,
            processor,
            sink,
            poll_interval,
            cancel,
        }
    }

    /// Runs until the cancellation token fires, then disconnects the
    /// readers.
    pub async fn run(mut self) {
        info!(
            "Telemetry collection started (interval: {}s, readers: {})",
            self.poll_interval.as_secs(),
            self.readers.len()
        );

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Executor stopping on shutdown request");
                    break;
                }
                _ = ticker.tick() => {
                    self.poll_cycle().await;
                }
            }
        }

        for reader in &mut self.readers {
            reader.disconnect().await;
        }
        info!("Executor stopped");
    }

    /// One polling cycle: sweep readers, process, publish.
    async fn poll_cycle(&mut self) {
        let mut readings = Vec::new();
        for reader in &self.readers {
            let batch = reader.read_all().await;
            debug!("Read {} readings from {} reader", batch.len(), reader.name());
            readings.extend(batch);
        }

        if readings.is_empty() {
            debug!("No readings to publish");
            return;
        }

        let messages = self.processor.process_readings(readings);

        for message in messages {
            match self.sink.publish(&message).await {
                Ok(()) => info!(
                    "Published telemetry with {} readings",
                    message.readings.len()
                ),
                Err(e) => error!("Failed to publish telemetry: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::sleep;
    use tracing_test::traced_test;

    use super::*;
    use crate::config::telemetry::{TelemetryConfig, ValidationRules};

    #[derive(Default)]
    struct MockSink {
        published: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl TelemetrySink for MockSink {
        async fn publish(
            &self,
            message: &TelemetryMessage,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            if self.fail {
                return Err("broker unavailable".into());
            }
            let json = serde_json::to_string(message).unwrap();
            self.published.lock().unwrap().push(json);
            Ok(())
        }
    }

    impl MockSink {
        fn published_count(&self) -> usize {
            self.published.lock().unwrap().len()
        }

        fn last(&self) -> String {
            self.published.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    struct FixedReader {
        values: Vec<(&'static str, f64)>,
    }

    #[async_trait::async_trait]
    impl SensorReader for FixedReader {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn connect(&mut self) -> bool {
            true
        }

        async fn disconnect(&mut self) {}

        async fn read_all(&self) -> Vec<SensorReading> {
            self.values
                .iter()
                .map(|(name, value)| SensorReading::new(*name, *value, "unit"))
                .collect()
        }
    }

    fn processor() -> TelemetryProcessor {
        TelemetryProcessor::new(ValidationRules::default(), TelemetryConfig::default())
    }

    #[tokio::test]
    async fn publishes_each_cycle() {
        let sink = Arc::new(MockSink::default());
        let cancel = CancellationToken::new();
        let reader = FixedReader {
            values: vec![("temperature_intake", 21.5)],
        };

        let executor = Executor::new(
            vec![Box::new(reader)],
            processor(),
            sink.clone(),
            Duration::from_millis(50),
            cancel.clone(),
        );
        let handle = tokio::spawn(executor.run());

        sleep(Duration::from_millis(180)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(sink.published_count() >= 2);
        assert!(sink.last().contains("temperature_intake"));
    }

    #[tokio::test]
    async fn empty_cycles_publish_nothing() {
        let sink = Arc::new(MockSink::default());
        let cancel = CancellationToken::new();
        let reader = FixedReader { values: vec![] };

        let executor = Executor::new(
            vec![Box::new(reader)],
            processor(),
            sink.clone(),
            Duration::from_millis(30),
            cancel.clone(),
        );
        let handle = tokio::spawn(executor.run());

        sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(sink.published_count(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn publish_failure_is_logged_and_loop_continues() {
        let sink = Arc::new(MockSink {
            fail: true,
            ..Default::default()
        });
        let cancel = CancellationToken::new();
        let reader = FixedReader {
            values: vec![("temperature_intake", 21.5)],
        };

        let executor = Executor::new(
            vec![Box::new(reader)],
            processor(),
            sink.clone(),
            Duration::from_millis(40),
            cancel.clone(),
        );
        let handle = tokio::spawn(executor.run());

        sleep(Duration::from_millis(140)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(sink.published_count(), 0);
        assert!(logs_contain("Failed to publish telemetry"));
    }

    #[tokio::test]
    async fn readers_are_swept_in_order() {
        let sink = Arc::new(MockSink::default());
        let cancel = CancellationToken::new();
        let first = FixedReader {
            values: vec![("a", 1.0)],
        };
        let second = FixedReader {
            values: vec![("b", 2.0)],
        };

        // Batched so one cycle's readings land in one message, in order.
        let config = TelemetryConfig {
            batch_enabled: true,
            batch_size: 10,
            ..Default::default()
        };
        let executor = Executor::new(
            vec![Box::new(first), Box::new(second)],
            TelemetryProcessor::new(ValidationRules::default(), config),
            sink.clone(),
            Duration::from_millis(50),
            cancel.clone(),
        );
        let handle = tokio::spawn(executor.run());

        sleep(Duration::from_millis(80)).await;
        cancel.cancel();
        handle.await.unwrap();

        let last = sink.last();
        let a = last.find("\"a\"").unwrap();
        let b = last.find("\"b\"").unwrap();
        assert!(a < b);
    }
}
