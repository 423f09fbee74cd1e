//! [`Transport`] implementation over a rumqttc [`AsyncClient`].

use std::future::Future;

use rumqttc::{AsyncClient, MqttOptions, QoS};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use homesim_app::ports::{Transport, TransportEvent};
use homesim_domain::error::TransportError;
use homesim_domain::message::Qos;

use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::pump::{EventPump, SubscriptionTracker};

/// Handle on an MQTT connection.
///
/// Requests are queued to the rumqttc event loop driven by the pump task
/// spawned in [`connect`]; their outcome arrives as [`TransportEvent`]s.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    tracker: SubscriptionTracker,
}

fn to_mqtt(qos: Qos) -> QoS {
    match qos {
        Qos::AtMostOnce => QoS::AtMostOnce,
        Qos::AtLeastOnce => QoS::AtLeastOnce,
        Qos::ExactlyOnce => QoS::ExactlyOnce,
    }
}

fn options(config: &MqttConfig) -> MqttOptions {
    let mut options = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
    options.set_keep_alive(config.keep_alive());
    options.set_clean_session(true);
    if let Some((user, pass)) = config.credentials() {
        options.set_credentials(user, pass);
    }
    options
}

/// Open a connection to the broker described by `config`.
///
/// Returns the transport handle, the channel of transport events and the
/// pump task. The connection is established in the background: the first
/// event is either [`TransportEvent::Connected`] or
/// [`TransportEvent::ConnectFailure`], and the pump keeps retrying every
/// `reconnect_delay_secs` until [`Transport::disconnect`] is called.
pub fn connect(
    config: &MqttConfig,
) -> (MqttTransport, mpsc::Receiver<TransportEvent>, JoinHandle<()>) {
    let capacity = config.channel_capacity.max(1);
    let (client, eventloop) = AsyncClient::new(options(config), capacity);
    let (events_tx, events_rx) = mpsc::channel(capacity);
    let tracker = SubscriptionTracker::default();

    tracing::info!(
        host = %config.broker_host,
        port = config.broker_port,
        client_id = %config.client_id,
        "connecting to mqtt broker"
    );
    let pump = EventPump::new(tracker.clone(), config.reconnect_delay());
    let handle = tokio::spawn(pump.run(eventloop, events_tx));

    (MqttTransport { client, tracker }, events_rx, handle)
}

impl Transport for MqttTransport {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        qos: Qos,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let topic = topic.to_string();
        async move {
            self.client
                .publish(topic, to_mqtt(qos), false, payload)
                .await
                .map_err(|err| MqttError::Client(err).into_transport("publish"))
        }
    }

    fn subscribe(
        &self,
        topic: &str,
        qos: Qos,
    ) -> impl Future<Output = Result<(), TransportError>> + Send {
        let topic = topic.to_string();
        async move {
            self.tracker.requested(topic.clone());
            let result = self.client.subscribe(topic, to_mqtt(qos)).await;
            if result.is_err() {
                self.tracker.cancel_last();
            }
            result.map_err(|err| MqttError::Client(err).into_transport("subscribe"))
        }
    }

    fn unsubscribe(&self, topic: &str) -> impl Future<Output = Result<(), TransportError>> + Send {
        let topic = topic.to_string();
        async move {
            self.client
                .unsubscribe(topic)
                .await
                .map_err(|err| MqttError::Client(err).into_transport("unsubscribe"))
        }
    }

    fn disconnect(&self) -> impl Future<Output = Result<(), TransportError>> + Send {
        async move {
            self.client
                .disconnect()
                .await
                .map_err(|err| MqttError::Client(err).into_transport("disconnect"))
        }
    }
}
