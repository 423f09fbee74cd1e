//! Command handler: applies inbound state requests to a device.
//!
//! A request for an unknown state is answered on the device's own topic and
//! leaves the device untouched. A known state is applied under the device's
//! state lock, and the status reply is published before that lock is
//! released, so commands and ticks of one device never interleave.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use homesim_domain::message::StatusMessage;

use crate::ports::Transport;
use crate::publish_gate::PublishGate;
use crate::registry::DeviceHandle;
use crate::simulator::stopped;

/// What a command did to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The device switched to the requested state.
    Changed,
    /// The device was already in the requested state.
    Unchanged,
    /// The requested state is not allowed; nothing was mutated.
    Rejected,
}

/// Applies commands and publishes the matching status reply.
pub struct CommandHandler<T> {
    gate: PublishGate<T>,
}

impl<T> Clone for CommandHandler<T> {
    fn clone(&self) -> Self {
        Self {
            gate: self.gate.clone(),
        }
    }
}

impl<T: Transport + 'static> CommandHandler<T> {
    pub fn new(gate: PublishGate<T>) -> Self {
        Self { gate }
    }

    /// Apply `requested` to `device` and publish exactly one reply.
    pub async fn handle(&self, device: &DeviceHandle, requested: &str) -> CommandOutcome {
        if device.accepts(requested) {
            let mut state = device.lock().await;
            if let Ok(changed) = state.apply_state(requested) {
                let message = StatusMessage::command(device.name(), requested, changed);
                tracing::info!(device = %device.name(), state = %requested, changed, "command applied");
                self.publish(device, &message).await;
                drop(state);
                return if changed {
                    CommandOutcome::Changed
                } else {
                    CommandOutcome::Unchanged
                };
            }
        }

        tracing::info!(device = %device.name(), state = %requested, "unknown state requested");
        let message = StatusMessage::UnknownState {
            name: device.name(),
            state: requested,
        };
        self.publish(device, &message).await;
        CommandOutcome::Rejected
    }

    async fn publish(&self, device: &DeviceHandle, message: &StatusMessage<'_>) {
        let topic = device.publish_topic();
        match self.gate.publish(topic, message.to_string()).await {
            Ok(()) => tracing::info!(device = %device.name(), %topic, %message, "status published"),
            Err(err) => tracing::warn!(device = %device.name(), %topic, error = %err, "publish failed"),
        }
    }

    /// Serve the commands queued in `inbox` until the stop flag is raised or
    /// every sender is gone; returns the number of commands handled.
    ///
    /// A command whose reply is still waiting on the transport when the flag
    /// is raised is abandoned.
    pub async fn serve(
        self,
        device: Arc<DeviceHandle>,
        mut inbox: mpsc::Receiver<String>,
        mut stop: watch::Receiver<bool>,
    ) -> u64 {
        let mut handled = 0;
        loop {
            tokio::select! {
                biased;
                () = stopped(&mut stop) => break,
                next = inbox.recv() => {
                    let Some(requested) = next else { break };
                    tokio::select! {
                        biased;
                        () = stopped(&mut stop) => {
                            tracing::debug!(device = %device.name(), state = %requested, "command abandoned on stop");
                            break;
                        }
                        _ = self.handle(&device, &requested) => handled += 1,
                    }
                }
            }
        }
        tracing::debug!(device = %device.name(), handled, "command worker stopped");
        handled
    }

    /// Run [`serve`](Self::serve) on the tokio runtime.
    pub fn spawn(
        self,
        device: Arc<DeviceHandle>,
        inbox: mpsc::Receiver<String>,
        stop: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.serve(device, inbox, stop).await;
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use homesim_domain::device::{Device, DeviceModel, Switchable, Tick};

    use super::*;
    use crate::registry::DeviceRegistry;
    use crate::testing::RecordingTransport;

    fn light() -> Arc<DeviceHandle> {
        let device = Device::builder(DeviceModel::Light(Switchable::new(["on", "off"])))
            .name("Lamp")
            .publish_topic("home/lamp")
            .receiver("home/lights", "L1")
            .period(Duration::from_secs(5))
            .seed(Some(1))
            .build()
            .unwrap();
        let registry = DeviceRegistry::from_devices([device]).unwrap();
        Arc::clone(registry.lookup("home/lights", "L1").unwrap())
    }

    #[tokio::test]
    async fn should_change_then_keep_state_for_repeated_command() {
        let transport = RecordingTransport::default();
        let handler = CommandHandler::new(PublishGate::new(transport.clone()));
        let device = light();

        assert_eq!(handler.handle(&device, "on").await, CommandOutcome::Changed);
        assert_eq!(handler.handle(&device, "on").await, CommandOutcome::Unchanged);

        assert_eq!(
            transport.texts_on("home/lamp"),
            [
                "Lamp: state changed via message: on",
                "Lamp: message received, state remains unchanged: on",
            ]
        );
        assert_eq!(device.lock().await.current_state(), Some("on"));
    }

    #[tokio::test]
    async fn should_reply_and_keep_state_for_unknown_state() {
        let transport = RecordingTransport::default();
        let handler = CommandHandler::new(PublishGate::new(transport.clone()));
        let device = light();

        handler.handle(&device, "on").await;
        assert_eq!(handler.handle(&device, "blink").await, CommandOutcome::Rejected);

        assert_eq!(
            transport.texts_on("home/lamp").last().map(String::as_str),
            Some("Lamp: change unsuccessful, unknown state: blink")
        );
        assert_eq!(device.lock().await.current_state(), Some("on"));
    }

    #[tokio::test]
    async fn should_report_commanded_state_in_next_status() {
        let transport = RecordingTransport::default();
        let gate = PublishGate::new(transport.clone());
        let handler = CommandHandler::new(gate.clone());
        let device = light();

        // a periodic tick publishes some state first
        let Tick::State { value, changed } = device.lock().await.tick() else {
            panic!("a light ticks a state");
        };
        gate.publish("home/lamp", StatusMessage::tick("Lamp", &value, changed).to_string())
            .await
            .unwrap();
        let before = transport.published().len();

        handler.handle(&device, "off").await;

        let texts = transport.texts_on("home/lamp");
        assert_eq!(texts.len(), before + 1);
        assert!(texts[before].ends_with(": off"), "{}", texts[before]);
        assert_eq!(device.lock().await.current_state(), Some("off"));
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_while_reply_is_stuck_in_transport() {
        let handler = CommandHandler::new(PublishGate::with_timeout(
            RecordingTransport::stalled(),
            Duration::from_secs(3_600),
        ));
        let (inbox_tx, inbox_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = tokio::spawn(handler.serve(light(), inbox_rx, stop_rx));
        inbox_tx.send("on".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        stop_tx.send_replace(true);

        let handled = tokio::time::timeout(Duration::from_millis(100), worker)
            .await
            .expect("command worker ignored the stop flag")
            .unwrap();
        assert_eq!(handled, 0);
    }

    #[tokio::test]
    async fn should_apply_even_when_publish_fails() {
        let handler = CommandHandler::new(PublishGate::new(RecordingTransport::failing()));
        let device = light();

        assert_eq!(handler.handle(&device, "off").await, CommandOutcome::Changed);
        assert_eq!(device.lock().await.current_state(), Some("off"));
    }

    #[tokio::test]
    async fn should_serve_inbox_in_order_until_stopped() {
        let transport = RecordingTransport::default();
        let handler = CommandHandler::new(PublishGate::new(transport.clone()));
        let (inbox_tx, inbox_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        for state in ["on", "off", "off"] {
            inbox_tx.send(state.to_string()).await.unwrap();
        }
        drop(inbox_tx);
        let handled = handler.serve(light(), inbox_rx, stop_rx).await;
        stop_tx.send_replace(true);

        assert_eq!(handled, 3);
        assert_eq!(
            transport.texts_on("home/lamp"),
            [
                "Lamp: state changed via message: on",
                "Lamp: state changed via message: off",
                "Lamp: message received, state remains unchanged: off",
            ]
        );
    }

    #[tokio::test]
    async fn should_stop_serving_when_flag_is_raised() {
        let handler = CommandHandler::new(PublishGate::new(RecordingTransport::default()));
        let (_inbox_tx, inbox_rx) = mpsc::channel::<String>(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker = handler.spawn(light(), inbox_rx, stop_rx);
        stop_tx.send_replace(true);
        worker.await.unwrap();
    }
}
