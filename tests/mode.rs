mod common;

use common::{fast_timing, radio, EdgePin, MockPin, MockUart};

use embassy_time::{Duration, Instant, Timer};
use e32_uart::{E32, E32Error, OperatingMode, UartParity};

#[tokio::test]
async fn enter_and_exit_config() {
    let mut uart = MockUart::module();
    let (mut radio, pins) = radio(&mut uart, true);

    assert_eq!(radio.init().await, Ok(()));
    assert!(radio.state().initialized());

    assert_eq!(radio.enter_config().await, Ok(()));
    assert_eq!(radio.mode(), OperatingMode::Config);
    assert!(pins.m0.level() && pins.m1.level());

    assert_eq!(radio.exit_config().await, Ok(()));
    assert_eq!(radio.mode(), OperatingMode::Normal);
    assert!(!pins.m0.level() && !pins.m1.level());
    drop(radio);

    assert_eq!(uart.speeds, vec![
        (9600, UartParity::N8_1),
        (9600, UartParity::N8_1),
        (9600, UartParity::N8_1),
    ]);
}

#[tokio::test]
async fn enter_timeout_keeps_mode() {
    let mut uart = MockUart::module();
    let (mut radio, _pins) = radio(&mut uart, false);

    assert_eq!(radio.enter_config().await, Err(E32Error::EnterModeTimeout));
    assert_eq!(radio.mode(), OperatingMode::Normal);
    assert_eq!(radio.last_error(), "Timeout entering config mode");
    drop(radio);
    // UART never switched to config speed
    assert!(uart.speeds.is_empty());
}

#[tokio::test]
async fn exit_timeout_is_not_fatal() {
    let mut uart = MockUart::module();
    let (mut radio, pins) = radio(&mut uart, true);
    assert_eq!(radio.enter_config().await, Ok(()));

    pins.aux.0.set(false);
    assert_eq!(radio.exit_config().await, Ok(()));
    assert_eq!(radio.mode(), OperatingMode::Normal);
}

#[tokio::test]
async fn exit_uart_failure_back_to_normal() {
    let mut uart = MockUart::module();
    let (mut radio, pins) = radio(&mut uart, true);
    assert_eq!(radio.enter_config().await, Ok(()));

    radio.transport_mut().fail_speed = true;
    assert_eq!(radio.exit_config().await, Err(E32Error::Transport));
    assert_eq!(radio.mode(), OperatingMode::Normal);
    assert!(!pins.m0.level() && !pins.m1.level());
    // Messaging still allowed
    assert_eq!(radio.send_str("up").await, Ok(()));
}

#[tokio::test]
async fn enter_uart_failure_in_config() {
    let mut uart = MockUart::module();
    let (mut radio, pins) = radio(&mut uart, true);
    assert_eq!(radio.init().await, Ok(()));

    radio.transport_mut().fail_speed = true;
    assert_eq!(radio.enter_config().await, Err(E32Error::Transport));
    assert_eq!(radio.mode(), OperatingMode::Config);
    assert!(pins.m0.level() && pins.m1.level());
}

#[tokio::test]
async fn wait_ready_bounded() {
    let mut uart = MockUart::module();
    let (mut radio, _pins) = radio(&mut uart, false);
    assert!(!radio.aux_is_high());

    let start = Instant::now();
    assert_eq!(radio.wait_ready(Duration::from_millis(20)).await, Err(E32Error::AuxTimeout));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(20));
    assert!(elapsed < Duration::from_millis(200));
}

#[tokio::test]
async fn wait_ready_immediate() {
    let mut uart = MockUart::module();
    let (mut radio, _pins) = radio(&mut uart, true);
    assert!(radio.aux_is_high());
    assert_eq!(radio.wait_ready(Duration::from_millis(20)).await, Ok(()));
}

#[tokio::test]
async fn bounded_read_accumulates() {
    let mut uart = MockUart::silent();
    uart.receive(&[1, 2, 3]);
    let (mut radio, _pins) = radio(&mut uart, true);

    let mut buf = [0u8; 6];
    let n = radio.read_exact_timeout(&mut buf, Duration::from_millis(10)).await;
    assert_eq!(n, Ok(3));
    assert_eq!(&buf[..3], &[1, 2, 3]);

    radio.transport_mut().receive(&[4, 5, 6, 7, 8, 9, 10]);
    let n = radio.read_exact_timeout(&mut buf, Duration::from_millis(10)).await;
    assert_eq!(n, Ok(6));
    assert_eq!(buf, [4, 5, 6, 7, 8, 9]);
}

#[tokio::test]
async fn async_aux_waits_for_high() {
    let mut uart = MockUart::module();
    let aux = MockPin::new(false);
    let mut radio = E32::new(MockPin::new(false), MockPin::new(false), EdgePin(aux.clone()), &mut uart)
        .with_timing(fast_timing());

    let release = async {
        Timer::after(Duration::from_millis(5)).await;
        aux.0.set(true);
    };
    let (res, _) = tokio::join!(radio.wait_ready(Duration::from_millis(200)), release);
    assert_eq!(res, Ok(()));
    assert!(radio.aux_is_high());

    assert_eq!(radio.enter_config().await, Ok(()));
    assert_eq!(radio.mode(), OperatingMode::Config);

    aux.0.set(false);
    assert_eq!(radio.wait_ready(Duration::from_millis(10)).await, Err(E32Error::AuxTimeout));
}
