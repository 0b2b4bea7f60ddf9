//! Exercises [`SocketClient`] against an in-process fake of the socket service.

use saleae_socket_client::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Accepts a single connection and answers each NUL terminated command with `reply(command)`.
struct FakeService {
    port: u16,
    received: Arc<Mutex<Vec<String>>>,
}

impl FakeService {
    async fn start(reply: fn(&str) -> String) -> FakeService {
        let _ = pretty_env_logger::try_init();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = received.clone();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut pending = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let count = match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(count) => count,
                };
                pending.extend_from_slice(&buf[..count]);
                while let Some(end) = pending.iter().position(|b| *b == 0) {
                    let command = String::from_utf8(pending[..end].to_vec()).unwrap();
                    pending.drain(..=end);
                    let answer = reply(&command);
                    log.lock().unwrap().push(command);
                    if answer.is_empty() {
                        // Hang up without replying.
                        return;
                    }
                    // Split the reply to make the client reassemble it.
                    let (head, tail) = answer.split_at(answer.len() / 2);
                    socket.write_all(head.as_bytes()).await.unwrap();
                    socket.flush().await.unwrap();
                    socket.write_all(tail.as_bytes()).await.unwrap();
                }
            }
        });

        FakeService { port, received }
    }

    fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

fn logic_pro_16(command: &str) -> String {
    match command {
        "GET_CONNECTED_DEVICES" => concat!(
            "1, Logic 8, LOGIC_8_DEVICE, 0xdf03c43d8a7c2b8e\n",
            "2, Logic Pro 16, LOGIC_PRO_16_DEVICE, 0x2f2dc3a4f6d8c1e7, ACTIVE\n",
            "ACK"
        )
        .to_string(),
        "GET_ANALYZERS" => "Async Serial, 1\nSPI, 2\nACK".to_string(),
        "GET_SAMPLE_RATE" => "10000000\n1250000\nACK".to_string(),
        "GET_ALL_SAMPLE_RATES" => "500000000, 0\n10000000, 1250000\nACK".to_string(),
        "GET_PERFORMANCE" => "60\nACK".to_string(),
        "GET_ACTIVE_CHANNELS" => "digital_channels, 0, 1, analog_channels, 0\nACK".to_string(),
        "GET_DIGITAL_VOLTAGE_OPTIONS" => {
            "0, 1.2 Volts\n1, 1.8 Volts, SELECTED\n2, 3.3+ Volts\nACK".to_string()
        }
        command if command.starts_with("SET_TRIGGER") && command.contains("posedge") => {
            "NAK".to_string()
        }
        _ => "ACK".to_string(),
    }
}

#[tokio::test]
async fn queries_are_parsed() {
    let service = FakeService::start(logic_pro_16).await;
    let mut client = SocketClient::connect("127.0.0.1", service.port).await.unwrap();

    let devices = client.connected_devices().await.unwrap();
    assert_eq!(devices.len(), 2);
    assert!(!devices[0].is_active);
    assert!(devices[1].is_active);
    assert_eq!(devices[1].device_type, DeviceType::LogicPro16);

    let analyzers = client.analyzers().await.unwrap();
    assert_eq!(analyzers[1].analyzer_type, "SPI");
    assert_eq!(analyzers[1].index, 2);

    let rate = client.sample_rate().await.unwrap();
    assert_eq!(
        rate,
        SampleRate {
            digital: 10_000_000,
            analog: 1_250_000
        }
    );
    assert_eq!(client.available_sample_rates().await.unwrap().len(), 2);
    assert_eq!(
        client.performance_option().await.unwrap(),
        PerformanceOption::SixtyPercent
    );

    let channels = client.active_channels().await.unwrap();
    assert_eq!(channels.digital, vec![0, 1]);
    assert_eq!(channels.analog, vec![0]);

    let options = client.digital_voltage_options().await.unwrap();
    let selected: Vec<_> = options.iter().filter(|o| o.is_selected).collect();
    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].description, "1.8 Volts");
}

#[tokio::test]
async fn configuration_commands_are_encoded() {
    let service = FakeService::start(logic_pro_16).await;
    let mut client = SocketClient::connect("127.0.0.1", service.port).await.unwrap();

    client
        .set_active_channels(&ActiveChannels {
            digital: vec![0, 1, 2],
            analog: vec![],
        })
        .await
        .unwrap();
    client
        .set_trigger(&[Trigger::FallingEdge, Trigger::None, Trigger::None])
        .await
        .unwrap();
    client.set_capture_seconds(3.0).await.unwrap();
    client.capture().await.unwrap();
    client
        .export_analyzer(1, &PathBuf::from("/data/CH0_output.csv"), false)
        .await
        .unwrap();

    assert_eq!(
        service.received(),
        vec![
            "SET_ACTIVE_CHANNELS, digital_channels, 0, 1, 2",
            "SET_TRIGGER, negedge, , ",
            "SET_CAPTURE_SECONDS, 3",
            "CAPTURE",
            "EXPORT_ANALYZER, 1, /data/CH0_output.csv",
        ]
    );
}

fn many_analyzers(_: &str) -> String {
    let mut reply = String::new();
    for index in 0..2000 {
        reply.push_str(&format!("Async Serial, {}\n", index));
    }
    reply.push_str("ACK");
    reply
}

#[tokio::test]
async fn long_replies_are_reassembled() {
    let service = FakeService::start(many_analyzers).await;
    let mut client = SocketClient::connect("127.0.0.1", service.port).await.unwrap();

    let analyzers = client.analyzers().await.unwrap();
    assert_eq!(analyzers.len(), 2000);
    assert_eq!(analyzers[1999].index, 1999);
}

#[tokio::test]
async fn malformed_sample_rate_is_a_protocol_error() {
    let service = FakeService::start(|_| "10000000\nACK".to_string()).await;
    let mut client = SocketClient::connect("127.0.0.1", service.port).await.unwrap();

    let err = client.sample_rate().await.unwrap_err();
    assert!(matches!(err, ClientError::Protocol { ref command, .. } if command == "GET_SAMPLE_RATE"));
}

#[tokio::test]
async fn nak_is_an_error() {
    let service = FakeService::start(logic_pro_16).await;
    let mut client = SocketClient::connect("127.0.0.1", service.port).await.unwrap();

    let err = client
        .set_trigger(&[Trigger::RisingEdge])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Nak { ref command, .. } if command == "SET_TRIGGER, posedge"));

    // The session stays usable after a rejected command.
    assert_eq!(client.analyzers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn hang_up_is_reported() {
    let service = FakeService::start(|_| String::new()).await;
    let mut client = SocketClient::connect("127.0.0.1", service.port).await.unwrap();

    let err = client.capture().await.unwrap_err();
    assert!(matches!(err, ClientError::Disconnected { ref command } if command == "CAPTURE"));
    assert_eq!(service.received(), vec!["CAPTURE"]);
}

#[tokio::test]
async fn unreachable_service() {
    // Grab a free port and release it again so nothing listens there.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let err = SocketClient::connect("127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, ClientError::Connect { .. }));
}
