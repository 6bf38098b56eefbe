//! Basic lux reading example
//!
//! This example demonstrates how to:
//! - Power up and configure the APDS-9301 sensor
//! - Read raw channel counts and lux
//! - Tell transient measurement errors from link failures
//! - Power the sensor down on exit

use apds9301::{Apds9301, Gain, IntegrationTime, SensorConfig, ADDRESS_FLOAT};

// This example uses linux-embedded-hal for demonstration
// Replace with your platform's I2C implementation
#[cfg(target_os = "linux")]
use linux_embedded_hal::{Delay, I2cdev};

#[cfg(target_os = "linux")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let i2c = I2cdev::new("/dev/i2c-1")?;
    let mut sensor = Apds9301::new(i2c, Delay);

    let config = SensorConfig::new(ADDRESS_FLOAT, Gain::High, IntegrationTime::Ms402);
    let period = std::time::Duration::from_micros(config.integration_time.period_us().into());

    println!("Initializing APDS-9301 at 0x{:02X}...", config.address);
    sensor
        .initialize(config)
        .map_err(|e| format!("initialization failed: {}", e))?;
    println!("Sensor ready ({:?}, {:?})", config.gain, config.integration_time);

    for _ in 0..20 {
        std::thread::sleep(period);

        let reading = match sensor.read_channels() {
            Ok(reading) => reading,
            Err(e) => {
                println!("Bus failure: {}", e);
                break;
            }
        };

        match reading.lux(config.gain, config.integration_time) {
            Ok(lux) => println!(
                "CH0: {:5} CH1: {:5} ratio: {:.3} | {:8.2} lx",
                reading.ch0,
                reading.ch1,
                reading.ratio(),
                lux
            ),
            Err(e) => println!(
                "CH0: {:5} CH1: {:5} | no reading: {:?}",
                reading.ch0, reading.ch1, e
            ),
        }
    }

    // Lux through the driver, with errors unified
    match sensor.acquire() {
        Ok(lux) => println!("Final reading: {:.2} lx", lux),
        Err(e) if e.is_transient() => println!("Final reading unavailable: {}", e),
        Err(e) => println!("Sensor failure: {}", e),
    }

    if let Err(e) = sensor.disable() {
        println!("Power-down failed: {}", e);
    }

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn main() {
    println!("This example requires Linux with I2C support.");
    println!("Please adapt the I2C initialization for your platform.");
}
