//! Console readouts for the diagnostic tools.

use std::io::{BufRead, Write};
use std::time::Duration;

use log::{error, warn};

use crate::adc::AnalogSource;
use crate::calibration::{Buffer, Calibration};
use crate::error::{AppError, SensorError};
use crate::sensor::Sensor;
use crate::signal::StopSignal;

pub const ANALOG_INTERVAL: Duration = Duration::from_secs(1);

/// Prints temperature and humidity until stopped. Transient failures are
/// reported and retried; anything else releases the sensor and propagates.
pub fn dht<S: Sensor, W: Write>(
    sensor: &mut S,
    interval: Duration,
    stop: &StopSignal,
    out: &mut W,
) -> Result<(), AppError> {
    let result = dht_loop(sensor, interval, stop, out);
    if let Err(e) = &result {
        error!("unexpected sensor error, closing device: {e}");
    }
    sensor.release();
    result
}

fn dht_loop<S: Sensor, W: Write>(
    sensor: &mut S,
    interval: Duration,
    stop: &StopSignal,
    out: &mut W,
) -> Result<(), AppError> {
    while !stop.is_stopped() {
        match sensor.read() {
            Ok(reading) => {
                let temperature = reading
                    .temperature
                    .map_or_else(|| "?".to_string(), |t| format!("{t:.1}"));
                let humidity = reading
                    .humidity
                    .map_or_else(|| "?".to_string(), |h| format!("{h:.1}"));
                writeln!(out, "Temperature: {temperature}°C - Humidity: {humidity}%")?;
            }
            Err(SensorError::Transient(msg)) => {
                writeln!(
                    out,
                    "Could not read sensor, retrying in {}s ({msg})",
                    interval.as_secs_f64()
                )?;
            }
            Err(e) => return Err(e.into()),
        }
        if stop.wait(interval) {
            break;
        }
    }
    Ok(())
}

/// Prints probe voltage and estimated pH once per `interval` until stopped.
pub fn ph<A: AnalogSource, W: Write>(
    adc: &mut A,
    channel: u8,
    calibration: &Calibration,
    interval: Duration,
    stop: &StopSignal,
    out: &mut W,
) -> Result<(), AppError> {
    analog_loop(adc, channel, interval, stop, |reading| {
        match calibration.ph(reading.voltage) {
            Some(value) => writeln!(out, "Voltage: {:.3} V | pH: {value:.2}", reading.voltage),
            None => writeln!(out, "Voltage: {:.3} V | pH: (uncalibrated)", reading.voltage),
        }
    })
}

/// Prints the raw conversion and voltage of an MQ135 channel until stopped.
pub fn air_quality<A: AnalogSource, W: Write>(
    adc: &mut A,
    channel: u8,
    interval: Duration,
    stop: &StopSignal,
    out: &mut W,
) -> Result<(), AppError> {
    analog_loop(adc, channel, interval, stop, |reading| {
        writeln!(
            out,
            "Raw: {} | Voltage: {:.3} V",
            reading.value16(),
            reading.voltage
        )
    })
}

fn analog_loop<A, F>(
    adc: &mut A,
    channel: u8,
    interval: Duration,
    stop: &StopSignal,
    mut print: F,
) -> Result<(), AppError>
where
    A: AnalogSource,
    F: FnMut(&crate::adc::AnalogReading) -> std::io::Result<()>,
{
    while !stop.is_stopped() {
        match adc.read(channel) {
            Ok(reading) => print(&reading)?,
            Err(AppError::Sensor(SensorError::Transient(msg))) => {
                warn!("ADC read failed: {msg}")
            }
            Err(e) => return Err(e),
        }
        if stop.wait(interval) {
            break;
        }
    }
    Ok(())
}

/// Walks the operator through the three buffer solutions, recording the
/// probe voltage for each after Enter is pressed.
pub fn calibrate<A: AnalogSource, R: BufRead, W: Write>(
    adc: &mut A,
    channel: u8,
    mut calibration: Calibration,
    input: &mut R,
    out: &mut W,
) -> Result<Calibration, AppError> {
    writeln!(out, "=== CALIBRATION MODE ===")?;
    for buffer in Buffer::ALL {
        writeln!(
            out,
            "Place the electrode in pH {} solution and press Enter.",
            buffer.nominal_ph()
        )?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(AppError::Calibration("input closed before calibration finished".into()));
        }

        let reading = adc.read(channel)?;
        calibration.set(buffer, reading.voltage);
        writeln!(out, "Recorded pH{} = {:.3} V", buffer.nominal_ph(), reading.voltage)?;
    }
    writeln!(out, "Calibration complete.")?;
    Ok(calibration)
}
