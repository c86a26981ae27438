use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use command_codec::{crc16, CodecError, LegacyCommand, ModbusCommand};
use inverter_client::{
    ClientConfig, ClientError, Connection, InverterClient, DEVICE_INFO_OFFSET,
    DEVICE_INFO_REGISTERS, RUNTIME_DATA_OFFSET, RUNTIME_DATA_REGISTERS,
};
use tracing_test::traced_test;

enum Step {
    Reply(Vec<u8>),
    Fail(io::ErrorKind),
    ShortWrite,
    Hang,
}

struct ScriptedConnection {
    steps: VecDeque<Step>,
    sends: Arc<AtomicUsize>,
}

impl ScriptedConnection {
    fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
        let sends = Arc::new(AtomicUsize::new(0));
        let conn = Self {
            steps: steps.into(),
            sends: Arc::clone(&sends),
        };
        (conn, sends)
    }
}

impl Connection for ScriptedConnection {
    fn send(&mut self, buf: &[u8]) -> impl Future<Output = io::Result<usize>> + Send {
        self.sends.fetch_add(1, Ordering::SeqCst);
        let written = if matches!(self.steps.front(), Some(Step::ShortWrite)) {
            self.steps.pop_front();
            buf.len() - 1
        } else {
            buf.len()
        };
        std::future::ready(Ok(written))
    }

    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send {
        let result = match self.steps.pop_front() {
            Some(Step::Reply(bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                Some(Ok(n))
            }
            Some(Step::Fail(kind)) => Some(Err(io::Error::from(kind))),
            Some(Step::ShortWrite) | Some(Step::Hang) | None => None,
        };
        async move {
            match result {
                Some(result) => result,
                None => std::future::pending().await,
            }
        }
    }
}

fn read_reply(data: &[u8]) -> Vec<u8> {
    let mut p = vec![0xAA, 0x55, 0xF7, 0x03, data.len() as u8];
    p.extend_from_slice(data);
    let crc = crc16(&p[2..]);
    p.extend_from_slice(&crc.to_le_bytes());
    p
}

fn corrupt(mut frame: Vec<u8>) -> Vec<u8> {
    let last = frame.len() - 1;
    frame[last] ^= 0xFF;
    frame
}

fn config() -> ClientConfig {
    ClientConfig {
        timeout_ms: 3_000,
        max_attempts: 3,
        ..ClientConfig::default()
    }
}

fn failed_attempts<'a>(lines: &[&'a str]) -> Vec<&'a str> {
    lines
        .iter()
        .copied()
        .filter(|line| line.contains("inverter request failed"))
        .collect()
}

#[tokio::test]
#[traced_test]
async fn third_attempt_success_is_returned() {
    let reply = read_reply(&[0x12, 0x34]);
    let (conn, sends) = ScriptedConnection::new(vec![
        Step::Fail(io::ErrorKind::ConnectionRefused),
        Step::Reply(corrupt(reply.clone())),
        Step::Reply(reply),
    ]);
    let mut client = InverterClient::with_connection(config(), conn);

    let payload = client
        .send(&ModbusCommand::read(0x891C, 0x0001))
        .await
        .expect("third attempt succeeds");

    assert_eq!(payload, vec![0x12, 0x34]);
    assert_eq!(sends.load(Ordering::SeqCst), 3);
    logs_assert(|lines: &[&str]| {
        let failed = failed_attempts(lines);
        match failed.as_slice() {
            [first, second] if first.contains("attempt=1") && second.contains("attempt=2") => {
                Ok(())
            }
            other => Err(format!("expected two failed attempts, got {other:?}")),
        }
    });
}

#[tokio::test]
#[traced_test]
async fn gives_up_after_max_attempts() {
    let reply = corrupt(read_reply(&[0x12, 0x34]));
    let (conn, sends) = ScriptedConnection::new(vec![
        Step::Reply(reply.clone()),
        Step::Reply(reply.clone()),
        Step::Reply(reply.clone()),
        Step::Reply(reply),
    ]);
    let mut client = InverterClient::with_connection(config(), conn);

    let err = client
        .send(&ModbusCommand::read(0x891C, 0x0001))
        .await
        .expect_err("all attempts fail");

    match err {
        ClientError::Exhausted { attempts, source } => {
            assert_eq!(attempts, 3);
            assert!(matches!(
                *source,
                ClientError::Codec(CodecError::ChecksumMismatch { .. })
            ));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(sends.load(Ordering::SeqCst), 3);
    logs_assert(|lines: &[&str]| {
        let failed = failed_attempts(lines);
        let numbered = (1..=3).all(|n| {
            failed
                .get(n - 1)
                .is_some_and(|line| line.contains(&format!("attempt={n}")))
        });
        if failed.len() == 3 && numbered {
            Ok(())
        } else {
            Err(format!("expected three failed attempts, got {failed:?}"))
        }
    });
}

#[tokio::test]
async fn io_failures_are_retried_for_legacy_commands() {
    let command = LegacyCommand::identify();
    let (conn, _) = ScriptedConnection::new(vec![
        Step::Fail(io::ErrorKind::TimedOut),
        Step::Fail(io::ErrorKind::TimedOut),
        Step::Fail(io::ErrorKind::TimedOut),
    ]);
    let mut client = InverterClient::with_connection(config(), conn);

    let err = client.send(&command).await.expect_err("io failures");
    assert!(matches!(
        err,
        ClientError::Exhausted { attempts: 3, ref source } if matches!(**source, ClientError::Io(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn deadline_bounds_each_attempt() {
    let (conn, sends) = ScriptedConnection::new(vec![Step::Hang, Step::Hang, Step::Hang]);
    let mut client = InverterClient::with_connection(config(), conn);
    let started = tokio::time::Instant::now();

    let err = client
        .send(&ModbusCommand::read(0x891C, 0x0001))
        .await
        .expect_err("every attempt times out");

    assert!(matches!(
        err,
        ClientError::Exhausted { attempts: 3, ref source }
            if matches!(**source, ClientError::Timeout { timeout_ms: 3_000 })
    ));
    assert_eq!(sends.load(Ordering::SeqCst), 3);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(9_000), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(9_100), "{elapsed:?}");
}

#[tokio::test]
async fn short_write_counts_as_failed_attempt() {
    let reply = read_reply(&[0xAB, 0xCD]);
    let (conn, sends) = ScriptedConnection::new(vec![Step::ShortWrite, Step::Reply(reply)]);
    let mut client = InverterClient::with_connection(config(), conn);

    let payload = client
        .send(&ModbusCommand::read(0x891C, 0x0001))
        .await
        .expect("second attempt succeeds");
    assert_eq!(payload, vec![0xAB, 0xCD]);
    assert_eq!(sends.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn write_class_reply_is_not_retried() {
    let mut reply = read_reply(&[0x00, 0x00]);
    reply[3] = 0x06;
    let (conn, sends) = ScriptedConnection::new(vec![Step::Reply(reply.clone()), Step::Reply(reply)]);
    let mut client = InverterClient::with_connection(config(), conn);

    let err = client
        .send(&ModbusCommand::read(0x891C, 0x0001))
        .await
        .expect_err("unimplemented");
    assert!(matches!(err, ClientError::Codec(CodecError::Unimplemented(_))));
    assert_eq!(sends.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn single_attempt_config_does_not_retry() {
    let (conn, sends) = ScriptedConnection::new(vec![Step::Fail(io::ErrorKind::Other)]);
    let cfg = ClientConfig {
        max_attempts: 1,
        ..config()
    };
    let mut client = InverterClient::with_connection(cfg, conn);

    let err = client
        .send(&ModbusCommand::read(0x891C, 0x0001))
        .await
        .expect_err("single failure");
    assert!(matches!(err, ClientError::Exhausted { attempts: 1, .. }));
    assert_eq!(sends.load(Ordering::SeqCst), 1);
}

fn device_info_payload(serial: &[u8; 16]) -> Vec<u8> {
    let mut p = vec![0u8; usize::from(DEVICE_INFO_REGISTERS) * 2];
    p[6..22].copy_from_slice(serial);
    p[22..30].copy_from_slice(b"GW10K-ET");
    p
}

fn runtime_payload() -> Vec<u8> {
    let mut p = vec![0u8; usize::from(RUNTIME_DATA_REGISTERS) * 2];
    p[0..6].copy_from_slice(&[24, 6, 1, 13, 45, 10]);
    p[42..44].copy_from_slice(&2301i16.to_be_bytes());
    p[52..54].copy_from_slice(&2302i16.to_be_bytes());
    p
}

#[tokio::test]
async fn runtime_query_reads_device_info_then_runtime_block() {
    let (conn, sends) = ScriptedConnection::new(vec![
        Step::Reply(read_reply(&device_info_payload(b"9010KETU00000001"))),
        Step::Reply(read_reply(&runtime_payload())),
    ]);
    let mut client = InverterClient::with_connection(config(), conn);

    let data = client.runtime_data("Europe/Madrid").await.expect("runtime data");

    assert_eq!(sends.load(Ordering::SeqCst), 2);
    assert_eq!(data.timestamp.to_rfc3339(), "2024-06-01T13:45:10+02:00");
    assert_eq!(data.on_grid_l1_voltage.value(), 230.1);
    assert_eq!(data.on_grid_l2_voltage.value(), 230.2);
}

#[tokio::test]
async fn single_phase_device_masks_runtime_block() {
    let (conn, _) = ScriptedConnection::new(vec![
        Step::Reply(read_reply(&device_info_payload(b"9010KEHU00000001"))),
        Step::Reply(read_reply(&runtime_payload())),
    ]);
    let mut client = InverterClient::with_connection(config(), conn);

    let data = client.runtime_data("Europe/Madrid").await.expect("runtime data");
    assert_eq!(data.on_grid_l1_voltage.value(), 230.1);
    assert_eq!(data.on_grid_l2_voltage.value(), 0.0);
}

#[tokio::test]
async fn unknown_timezone_fails_before_any_request() {
    let (conn, sends) = ScriptedConnection::new(Vec::new());
    let mut client = InverterClient::with_connection(config(), conn);

    let err = client.runtime_data("Nowhere/Land").await.expect_err("bad zone");
    assert!(matches!(err, ClientError::Parse(_)));
    assert_eq!(sends.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn requests_target_et_register_blocks() {
    let (conn, _) = ScriptedConnection::new(vec![Step::Reply(read_reply(
        &device_info_payload(b"9010KETU00000001"),
    ))]);
    let mut client = InverterClient::with_connection(config(), conn);
    let info = client.device_info().await.expect("device info");
    assert_eq!(info.model_name, "GW10K-ET");

    let expected = ModbusCommand::read(DEVICE_INFO_OFFSET, DEVICE_INFO_REGISTERS);
    assert_eq!(
        command_codec::Request::encode(&expected),
        &[0xF7, 0x03, 0x88, 0xB8, 0x00, 0x21, 0x3A, 0xC1]
    );
    let runtime = ModbusCommand::read(RUNTIME_DATA_OFFSET, RUNTIME_DATA_REGISTERS);
    assert_eq!(
        command_codec::Request::encode(&runtime),
        &[0xF7, 0x03, 0x89, 0x1C, 0x00, 0x7D, 0x7A, 0xE7]
    );
}
