use std::sync::Arc;
use std::time::Duration;

use smartcrop::backend::GpioOp;
use smartcrop::{
    AppError, GpioBackend, Level, MockGpioBackend, Polarity, Relay, RelaySequencer, SequenceConfig,
    StopSignal,
};

fn sequence(lines: Vec<u32>, polarity: Polarity) -> SequenceConfig {
    SequenceConfig {
        lines,
        delay: Duration::ZERO,
        polarity,
        once: true,
    }
}

#[test]
fn on_off_sequences_follow_polarity_table() {
    for polarity in [Polarity::ActiveHigh, Polarity::ActiveLow] {
        let (active, inactive) = polarity.levels();
        let backend = Arc::new(MockGpioBackend::default());
        let mut relay = Relay::new(backend.clone(), 17, polarity).unwrap();
        assert_eq!(backend.level(17), Some(inactive));

        let calls: [(bool, Level); 5] = [
            (true, active),
            (true, active),
            (false, inactive),
            (false, inactive),
            (true, active),
        ];
        for (on, expected) in calls {
            if on {
                relay.on().unwrap();
            } else {
                relay.off().unwrap();
            }
            assert_eq!(backend.level(17), Some(expected), "{polarity:?}");
        }
    }
}

#[test]
fn cleanup_without_switching() {
    let backend = Arc::new(MockGpioBackend::default());
    let mut relay = Relay::new(backend.clone(), 22, Polarity::ActiveLow).unwrap();

    for _ in 0..3 {
        relay.cleanup().unwrap();
    }
    drop(relay);

    assert_eq!(
        backend.journal(),
        vec![GpioOp::Setup(22, Level::High), GpioOp::Release(22)]
    );
}

#[test]
fn relays_share_one_backend() {
    let backend = Arc::new(MockGpioBackend::default());
    let mut a = Relay::new(backend.clone(), 17, Polarity::ActiveHigh).unwrap();
    let b = Relay::new(backend.clone(), 27, Polarity::ActiveHigh).unwrap();
    assert!(Relay::new(backend.clone(), 17, Polarity::ActiveHigh).is_err());

    a.on().unwrap();
    assert_eq!(backend.level(17), Some(Level::High));
    assert_eq!(backend.level(27), Some(Level::Low));
    assert_eq!(b.line(), 27);
}

#[test]
fn single_pass_energizes_each_pin_in_order() {
    let backend = Arc::new(MockGpioBackend::default());
    let stop = StopSignal::new();
    let config = sequence(vec![17, 27, 22], Polarity::ActiveHigh);

    RelaySequencer::new(backend.clone(), &config)
        .unwrap()
        .run(&stop)
        .unwrap();

    assert_eq!(
        backend.journal(),
        vec![
            GpioOp::Setup(17, Level::Low),
            GpioOp::Setup(27, Level::Low),
            GpioOp::Setup(22, Level::Low),
            GpioOp::Write(17, Level::High),
            GpioOp::Write(17, Level::Low),
            GpioOp::Write(27, Level::High),
            GpioOp::Write(27, Level::Low),
            GpioOp::Write(22, Level::High),
            GpioOp::Write(22, Level::Low),
            GpioOp::Release(17),
            GpioOp::Release(27),
            GpioOp::Release(22),
        ]
    );
}

#[test]
fn active_low_bank_idles_high() {
    let backend = Arc::new(MockGpioBackend::default());
    let stop = StopSignal::new();
    let config = sequence(vec![5, 6], Polarity::ActiveLow);

    RelaySequencer::new(backend.clone(), &config)
        .unwrap()
        .run(&stop)
        .unwrap();

    let journal = backend.journal();
    assert_eq!(journal[0], GpioOp::Setup(5, Level::High));
    assert_eq!(journal[2], GpioOp::Write(5, Level::Low));
    assert_eq!(journal[3], GpioOp::Write(5, Level::High));
}

#[test]
fn stop_requested_before_start() {
    let backend = Arc::new(MockGpioBackend::default());
    let stop = StopSignal::new();
    stop.stop();
    let mut config = sequence(vec![17, 27], Polarity::ActiveHigh);
    config.once = false;

    RelaySequencer::new(backend.clone(), &config)
        .unwrap()
        .run(&stop)
        .unwrap();

    assert!(
        backend
            .journal()
            .iter()
            .all(|op| !matches!(op, GpioOp::Write(..)))
    );
    assert!(!backend.is_claimed(17));
    assert!(!backend.is_claimed(27));
}

#[test]
fn stop_during_delay_ends_continuous_sequence() {
    let backend = Arc::new(MockGpioBackend::default());
    let stop = StopSignal::new();
    let mut config = sequence(vec![17, 27], Polarity::ActiveHigh);
    config.once = false;
    config.delay = Duration::from_secs(60);

    let remote = Arc::clone(&stop);
    let stopper = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        remote.stop();
    });

    RelaySequencer::new(backend.clone(), &config)
        .unwrap()
        .run(&stop)
        .unwrap();
    stopper.join().unwrap();

    let journal = backend.journal();
    assert_eq!(
        &journal[2..],
        &[
            GpioOp::Write(17, Level::High),
            GpioOp::Write(17, Level::Low),
            GpioOp::Release(17),
            GpioOp::Release(27),
        ]
    );
}

#[test]
fn busy_line_releases_partial_bank() {
    let backend = Arc::new(MockGpioBackend::default());
    backend.setup_output(27, Level::Low).unwrap();
    let config = sequence(vec![17, 27], Polarity::ActiveHigh);

    assert!(RelaySequencer::new(backend.clone(), &config).is_err());
    assert!(!backend.is_claimed(17));
    assert!(backend.is_claimed(27));
}

#[test]
fn repeated_pin_is_a_config_error() {
    let backend = Arc::new(MockGpioBackend::default());
    let config = sequence(vec![17, 17], Polarity::ActiveHigh);

    let result = RelaySequencer::new(backend.clone(), &config);

    assert!(matches!(result, Err(AppError::Config(_))));
    assert!(backend.journal().is_empty());
}

#[test]
fn off_header_pin_is_rejected_before_claiming() {
    let backend = Arc::new(MockGpioBackend::default());
    let config = sequence(vec![17, 40], Polarity::ActiveHigh);

    assert!(matches!(
        RelaySequencer::new(backend.clone(), &config),
        Err(AppError::Config(_))
    ));
    assert!(!backend.is_claimed(17));
}
