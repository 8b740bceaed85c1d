use log::{error, info, warn};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use smartcrop::calibration::DEFAULT_CALIBRATION_FILE;
use smartcrop::config::{self, DEFAULT_GPIO_CHIP, DEFAULT_IIO_ROOT};
use smartcrop::readout::{self, ANALOG_INTERVAL};
use smartcrop::{
    AppError, BoardPin, Calibration, DhtModel, DhtSensor, Mcp3008, Polarity, Relay,
    RelaySequencer, SequenceConfig, StopSignal, ThresholdConfig, ThresholdMonitor,
};

#[cfg(feature = "hardware-gpio")]
use smartcrop::LibgpiodBackend;
#[cfg(not(feature = "hardware-gpio"))]
use smartcrop::MockGpioBackend;

#[derive(Parser)]
#[command(version, about = "Sensor and relay tools for the Raspberry Pi")]
struct Cli {
    /// GPIO character device the relay lines belong to
    #[arg(long, global = true, default_value = DEFAULT_GPIO_CHIP)]
    gpio_chip: String,
    /// sysfs directory holding IIO devices
    #[arg(long, global = true, default_value = DEFAULT_IIO_ROOT)]
    iio_root: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Switch a relay on while the temperature is above a threshold
    Monitor(MonitorArgs),
    /// Energize relays one at a time to check wiring
    RelayTest(RelayTestArgs),
    /// Print DHT temperature and humidity
    Dht(DhtArgs),
    /// Calibrate or read a pH probe on the MCP3008
    Ph(PhArgs),
    /// Print the MQ135 reading from the MCP3008
    AirQuality {
        #[arg(long, default_value_t = 1)]
        channel: u8,
    },
}

#[derive(Args)]
struct SensorArgs {
    /// Board pin name of the sensor data line, e.g. D4
    #[arg(long, default_value = "D4")]
    sensor_pin: BoardPin,
    /// DHT11 or DHT22
    #[arg(long, default_value = "DHT11")]
    sensor_type: DhtModel,
    /// Seconds between readings
    #[arg(long, default_value_t = 2.0)]
    interval: f64,
}

#[derive(Args)]
struct MonitorArgs {
    #[command(flatten)]
    sensor: SensorArgs,
    /// BCM pin of the relay
    #[arg(long, default_value_t = 17)]
    relay_pin: u32,
    /// Temperature in °C above which the relay is energized
    #[arg(long, default_value_t = 30.0)]
    threshold: f64,
    /// The relay is energized by a low level
    #[arg(long)]
    active_low: bool,
}

#[derive(Args)]
struct RelayTestArgs {
    /// Comma separated BCM pins
    #[arg(long, default_value = "17,27,22")]
    pins: String,
    /// Seconds each relay stays energized
    #[arg(long, default_value_t = 5.0)]
    delay: f64,
    /// The relays are energized by a low level
    #[arg(long)]
    active_low: bool,
    /// Run a single pass and exit
    #[arg(long)]
    once: bool,
}

#[derive(Args)]
struct DhtArgs {
    #[command(flatten)]
    sensor: SensorArgs,
}

#[derive(Args)]
struct PhArgs {
    #[command(subcommand)]
    mode: PhMode,
    #[arg(long, default_value = DEFAULT_CALIBRATION_FILE)]
    calibration: PathBuf,
    #[arg(long, default_value_t = 0)]
    channel: u8,
}

#[derive(Subcommand)]
enum PhMode {
    /// Record the probe voltage in pH 4, 7 and 10 buffers
    Calibrate,
    /// Print the estimated pH every second
    Read,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    match cli.command {
        Command::Monitor(args) => monitor(&cli.gpio_chip, &cli.iio_root, args),
        Command::RelayTest(args) => relay_test(&cli.gpio_chip, args),
        Command::Dht(args) => dht(&cli.iio_root, args),
        Command::Ph(args) => ph(&cli.iio_root, args),
        Command::AirQuality { channel } => {
            let stop = installed_stop_signal()?;
            let mut adc = Mcp3008::open(&cli.iio_root)?;
            println!("=== MQ135 reading (MCP3008) ===");
            readout::air_quality(&mut adc, channel, ANALOG_INTERVAL, &stop, &mut io::stdout())
        }
    }
}

#[cfg(feature = "hardware-gpio")]
fn gpio_backend(chip: &str) -> Result<Arc<LibgpiodBackend>, AppError> {
    Ok(Arc::new(LibgpiodBackend::new(chip)?))
}

#[cfg(not(feature = "hardware-gpio"))]
fn gpio_backend(chip: &str) -> Result<Arc<MockGpioBackend>, AppError> {
    warn!("built without hardware-gpio, lines on {chip} are simulated");
    Ok(Arc::new(MockGpioBackend::default()))
}

fn installed_stop_signal() -> Result<Arc<StopSignal>, AppError> {
    let stop = StopSignal::new();
    stop.install()?;
    Ok(stop)
}

fn open_sensor(iio_root: &Path, args: &SensorArgs) -> Result<DhtSensor, AppError> {
    let interval = config::seconds(args.interval)?;
    if interval < args.sensor_type.min_sampling_period() {
        warn!(
            "{} cannot sample faster than every {:?}, readings will repeat",
            args.sensor_type,
            args.sensor_type.min_sampling_period()
        );
    }
    DhtSensor::open(iio_root, args.sensor_pin, args.sensor_type)
}

fn monitor(gpio_chip: &str, iio_root: &Path, args: MonitorArgs) -> Result<(), AppError> {
    let config = ThresholdConfig {
        sensor_pin: args.sensor.sensor_pin,
        sensor_model: args.sensor.sensor_type,
        relay_line: args.relay_pin,
        threshold_celsius: args.threshold,
        poll_interval: config::seconds(args.sensor.interval)?,
        polarity: Polarity::from_active_low(args.active_low),
    };
    config.validate()?;

    let stop = installed_stop_signal()?;
    let sensor = open_sensor(iio_root, &args.sensor)?;
    let relay = Relay::new(gpio_backend(gpio_chip)?, config.relay_line, config.polarity)?;

    ThresholdMonitor::new(
        sensor,
        relay,
        config.threshold_celsius,
        config.poll_interval,
    )
    .run(&stop)
}

fn relay_test(gpio_chip: &str, args: RelayTestArgs) -> Result<(), AppError> {
    let config = SequenceConfig {
        lines: config::parse_pin_list(&args.pins)?,
        delay: config::seconds(args.delay)?,
        polarity: Polarity::from_active_low(args.active_low),
        once: args.once,
    };

    let stop = installed_stop_signal()?;
    RelaySequencer::new(gpio_backend(gpio_chip)?, &config)?.run(&stop)
}

fn dht(iio_root: &Path, args: DhtArgs) -> Result<(), AppError> {
    let interval = config::seconds(args.sensor.interval)?;
    let stop = installed_stop_signal()?;
    let mut sensor = open_sensor(iio_root, &args.sensor)?;

    let result = readout::dht(&mut sensor, interval, &stop, &mut io::stdout());
    if stop.is_stopped() {
        info!("interrupted, sensor closed");
    }
    result
}

fn ph(iio_root: &Path, args: PhArgs) -> Result<(), AppError> {
    let mut adc = Mcp3008::open(iio_root)?;
    let calibration = Calibration::load(&args.calibration)?;

    match args.mode {
        PhMode::Calibrate => {
            let calibration = readout::calibrate(
                &mut adc,
                args.channel,
                calibration,
                &mut io::stdin().lock(),
                &mut io::stdout(),
            )?;
            calibration.save(&args.calibration)
        }
        PhMode::Read => {
            let stop = installed_stop_signal()?;
            println!("=== CONTINUOUS READING ===");
            println!("Press Ctrl+C to exit.");
            readout::ph(
                &mut adc,
                args.channel,
                &calibration,
                ANALOG_INTERVAL,
                &stop,
                &mut io::stdout(),
            )
        }
    }
}
