//! Publish loop: the periodic worker of one device.
//!
//! Every iteration waits for the device's next period with no lock held,
//! then ticks the device under its state lock and publishes exactly one
//! status message through the gate before releasing that lock.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use homesim_domain::device::Tick;
use homesim_domain::message::StatusMessage;

use crate::ports::Transport;
use crate::publish_gate::PublishGate;
use crate::registry::DeviceHandle;
use crate::simulator::stopped;

/// Periodic status publisher for a single device.
pub struct PublishLoop<T> {
    device: Arc<DeviceHandle>,
    gate: PublishGate<T>,
    stop: watch::Receiver<bool>,
}

impl<T: Transport + 'static> PublishLoop<T> {
    pub fn new(device: Arc<DeviceHandle>, gate: PublishGate<T>, stop: watch::Receiver<bool>) -> Self {
        Self { device, gate, stop }
    }

    /// Run the loop on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Tick until the stop flag is raised; returns the number of ticks.
    ///
    /// A raised flag interrupts the current wait immediately and never
    /// produces an extra publish. It also abandons a publish still waiting
    /// on the transport. Devices without a cadence return at once.
    pub async fn run(mut self) -> u64 {
        let mut ticks = 0;
        loop {
            let Some(wait) = self.device.lock().await.next_wait() else {
                tracing::debug!(device = %self.device.name(), "command-only device, no publish loop");
                break;
            };
            tokio::select! {
                biased;
                () = stopped(&mut self.stop) => break,
                () = tokio::time::sleep(wait) => {}
            }
            if !self.tick().await {
                break;
            }
            ticks += 1;
        }
        tracing::debug!(device = %self.device.name(), ticks, "publish loop stopped");
        ticks
    }

    /// Tick the device and publish its status; returns `false` when the stop
    /// flag cut the publish short.
    ///
    /// Text payloads are published under the state lock. Images are read from
    /// disk once the lock is released.
    async fn tick(&mut self) -> bool {
        let device = Arc::clone(&self.device);
        let name = device.name();

        let mut state = device.lock().await;
        let payload = match state.tick() {
            Tick::State { value, changed } => StatusMessage::tick(name, &value, changed)
                .to_string()
                .into_bytes(),
            Tick::Event(text) => format!("{name}: {text}").into_bytes(),
            Tick::Image(path) => {
                drop(state);
                let payload = read_image(name, &path).await;
                return self.publish(payload).await;
            }
        };
        let published = self.publish(payload).await;
        drop(state);
        published
    }

    async fn publish(&mut self, payload: Vec<u8>) -> bool {
        let name = self.device.name();
        let topic = self.device.publish_topic();
        let size = payload.len();
        tokio::select! {
            biased;
            () = stopped(&mut self.stop) => {
                tracing::debug!(device = %name, %topic, "publish abandoned on stop");
                false
            }
            result = self.gate.publish(topic, payload) => {
                match result {
                    Ok(()) => tracing::info!(device = %name, %topic, bytes = size, "status published"),
                    Err(err) => tracing::warn!(device = %name, %topic, error = %err, "publish failed"),
                }
                true
            }
        }
    }
}

async fn read_image(name: &str, path: &Path) -> Vec<u8> {
    match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(device = %name, path = %path.display(), error = %err, "image unreadable");
            format!("{name}: image unavailable: {}", path.display()).into_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use homesim_domain::device::{Camera, Device, DeviceModel, MoveSensor, Switchable, Wattmeter};

    use super::*;
    use crate::registry::DeviceRegistry;
    use crate::testing::RecordingTransport;

    fn handle(device: Device) -> Arc<DeviceHandle> {
        let registry = DeviceRegistry::from_devices([device]).unwrap();
        Arc::clone(registry.iter().next().unwrap())
    }

    fn wattmeter(name: &str, period: u64) -> Device {
        Device::builder(DeviceModel::Wattmeter(Wattmeter::new(0, 500, 5, 10, 100, "W")))
            .name(name)
            .publish_topic(format!("home/{name}/power"))
            .period(Duration::from_secs(period))
            .seed(Some(11))
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_once_per_period() {
        let transport = RecordingTransport::default();
        let gate = PublishGate::new(transport.clone());
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = PublishLoop::new(handle(wattmeter("oven", 1)), gate, stop_rx).spawn();
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        stop_tx.send_replace(true);
        worker.await.unwrap();

        let texts = transport.texts_on("home/oven/power");
        assert_eq!(texts.len(), 5);
        assert!(texts.iter().all(|t| t.starts_with("oven: state ")));
        assert!(texts.iter().all(|t| t.ends_with(" W")));
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_within_one_wait_interruption() {
        let transport = RecordingTransport::default();
        let gate = PublishGate::new(transport.clone());
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = PublishLoop::new(handle(wattmeter("heater", 3_600)), gate, stop_rx).spawn();
        tokio::time::sleep(Duration::from_secs(1)).await;

        let started = tokio::time::Instant::now();
        stop_tx.send_replace(true);
        worker.await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(transport.published().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_running_when_publish_fails() {
        let transport = RecordingTransport::failing();
        let gate = PublishGate::new(transport);
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = PublishLoop::new(handle(wattmeter("fridge", 1)), gate, stop_rx);
        let run = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        stop_tx.send_replace(true);

        assert_eq!(run.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_while_publish_is_stuck_in_transport() {
        let transport = RecordingTransport::stalled();
        let gate = PublishGate::with_timeout(transport, Duration::from_secs(3_600));
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = PublishLoop::new(handle(wattmeter("dryer", 1)), gate, stop_rx);
        let run = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        stop_tx.send_replace(true);

        let ticks = tokio::time::timeout(Duration::from_millis(100), run)
            .await
            .expect("publish loop ignored the stop flag")
            .unwrap();
        assert_eq!(ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_move_on_when_publish_times_out() {
        let transport = RecordingTransport::stalled();
        let gate = PublishGate::with_timeout(transport, Duration::from_secs(2));
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = PublishLoop::new(handle(wattmeter("boiler", 1)), gate, stop_rx);
        let run = tokio::spawn(worker.run());
        // ticks at 1s and 4s time out at 3s and 6s; the one at 7s is cut short
        tokio::time::sleep(Duration::from_millis(7_500)).await;
        stop_tx.send_replace(true);

        assert_eq!(run.await.unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_return_immediately_for_command_only_device() {
        let relay = Device::builder(DeviceModel::Relay(Switchable::new(["open", "closed"])))
            .name("relay")
            .publish_topic("home/relay")
            .receiver("home/relays", "R1")
            .build()
            .unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);
        let gate = PublishGate::new(RecordingTransport::default());

        assert_eq!(PublishLoop::new(handle(relay), gate, stop_rx).run().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_movement_event() {
        let transport = RecordingTransport::default();
        let gate = PublishGate::new(transport.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let sensor = Device::builder(DeviceModel::MoveSensor(MoveSensor::new(90, 60, "PIR")))
            .name("Hall")
            .publish_topic("home/hall/motion")
            .period_range(Duration::from_secs(1), Duration::from_secs(2))
            .seed(Some(2))
            .build()
            .unwrap();

        let worker = PublishLoop::new(handle(sensor), gate, stop_rx).spawn();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        stop_tx.send_replace(true);
        worker.await.unwrap();

        let texts = transport.texts_on("home/hall/motion");
        assert!(!texts.is_empty());
        assert_eq!(
            texts[0],
            "Hall: movement detected, PIR sensor, field of view 90x60"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_publish_image_bytes() {
        let path = std::env::temp_dir().join(format!("homesim-{}-porch.jpg", std::process::id()));
        std::fs::write(&path, [0xff, 0xd8, 0xff, 0xe0]).unwrap();
        let transport = RecordingTransport::default();
        let gate = PublishGate::new(transport.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let camera = Device::builder(DeviceModel::Camera(Camera::new([path.clone()])))
            .name("Porch")
            .publish_topic("home/porch/camera")
            .period_range(Duration::from_secs(1), Duration::from_secs(1))
            .build()
            .unwrap();

        let worker = PublishLoop::new(handle(camera), gate, stop_rx).spawn();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        stop_tx.send_replace(true);
        worker.await.unwrap();
        std::fs::remove_file(&path).unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].payload, [0xff, 0xd8, 0xff, 0xe0]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_fall_back_to_text_when_image_is_missing() {
        let transport = RecordingTransport::default();
        let gate = PublishGate::new(transport.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let camera = Device::builder(DeviceModel::Camera(Camera::new(["/nonexistent/front.jpg"])))
            .name("Door")
            .publish_topic("home/door/camera")
            .period_range(Duration::from_secs(1), Duration::from_secs(1))
            .build()
            .unwrap();

        let worker = PublishLoop::new(handle(camera), gate, stop_rx).spawn();
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        stop_tx.send_replace(true);
        worker.await.unwrap();

        assert_eq!(
            transport.texts_on("home/door/camera"),
            ["Door: image unavailable: /nonexistent/front.jpg"]
        );
    }
}
