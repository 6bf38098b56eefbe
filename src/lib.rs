//! # APDS-9301 Ambient Light Sensor Driver
//!
//! This is a platform-agnostic Rust driver for the APDS-9301 digital ambient light sensor,
//! built using the [`embedded-hal`] traits for I2C communication.
//!
//! The APDS-9301 is a light-to-digital converter that provides:
//! - Two photodiode channels: broadband (visible + IR) and IR only
//! - Two gain settings (1x and 16x)
//! - Three integration times (13.7ms, 101ms, 402ms)
//! - I2C interface (address 0x29, 0x39 or 0x49 depending on ADDR SEL)
//!
//! ## Features
//!
//! - **Power-up handshake** with a bounded poll and timeout
//! - **Gain and integration time** configuration
//! - **Lux calculation** using the datasheet's piecewise approximation
//! - **Range checks** reporting saturation, darkness and unsupported spectra
//! - **Async/await support** with feature gating (optional)
//! - **defmt logging** with the `defmt-03` feature (optional)
//!
//! Interrupts and manual integration are not supported.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apds9301::{Apds9301, Gain, IntegrationTime, SensorConfig, ADDRESS_FLOAT};
//!
//! # struct Delay;
//! # impl embedded_hal::delay::DelayNs for Delay { fn delay_ns(&mut self, _ns: u32) {} }
//! # fn main() {
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let mut sensor = Apds9301::new(i2c, Delay);
//!
//! // Power up and configure, waiting at most 2s for the sensor
//! let config = SensorConfig::new(ADDRESS_FLOAT, Gain::High, IntegrationTime::Ms402);
//! sensor.initialize(config).unwrap();
//!
//! // Read illuminance
//! match sensor.acquire() {
//!     Ok(lux) => { /* use lux */ }
//!     Err(e) if e.is_transient() => { /* too bright, too dark: try later */ }
//!     Err(e) => { /* link problem */ }
//! }
//!
//! // Power down
//! sensor.disable().ok();
//! # }
//! ```
//!
//! ## Async Usage
//!
//! Enable the `async` feature to use async/await patterns:
//!
//! ```toml
//! [dependencies]
//! apds9301 = { version = "0.1", features = ["async"] }
//! ```
//!
//! ```rust,ignore
//! use apds9301::{Apds9301, SensorConfig};
//!
//! let i2c = /* your async I2C implementation */;
//! let delay = /* your async delay implementation */;
//! let mut sensor = Apds9301::new(i2c, delay);
//!
//! sensor.initialize_async(SensorConfig::default()).await.unwrap();
//! let lux = sensor.acquire_async().await.unwrap();
//! ```
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![no_std]
#![deny(missing_docs)]

#[macro_use]
mod fmt;

pub mod config;
pub mod conversion;
pub mod poll;
pub mod register;

use embedded_hal::i2c::I2c;

#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c as AsyncI2c;

pub use config::{
    Gain, IntegrationTime, SensorConfig, TimingProfile, ADDRESS_FLOAT, ADDRESS_GND, ADDRESS_VDD,
};
pub use conversion::{ChannelReading, ConversionError};
pub use poll::{poll_until, PollPolicy};

use register::{
    ControlRegister, DeviceInterface, TimingRegister, CONTROL, DATA0LOW, DATA1LOW, TIMING,
};

/// All possible errors in this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// Sensor did not report power-up before the deadline
    Timeout,
    /// A channel is at or above the saturation limit of the integration window
    LightSaturation,
    /// A channel read zero
    TooDark,
    /// IR to broadband ratio above 1.30
    OutOfRange,
    /// Measurement requested before a successful `initialize`
    NotReady,
}

impl<E> Error<E> {
    /// True for conditions that a later reading may not hit
    ///
    /// Saturation, darkness and an out-of-range ratio depend on the light at
    /// the time of the reading. Bus errors, timeouts and calls in the wrong
    /// state need the caller to re-initialize or fix the wiring.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::LightSaturation | Error::TooDark | Error::OutOfRange
        )
    }
}

impl<E> From<ConversionError> for Error<E> {
    fn from(error: ConversionError) -> Self {
        match error {
            ConversionError::LightSaturation => Error::LightSaturation,
            ConversionError::TooDark => Error::TooDark,
            ConversionError::OutOfRange => Error::OutOfRange,
        }
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "I2C error: {:?}", e),
            Error::Timeout => f.write_str("sensor did not power up in time"),
            Error::LightSaturation => f.write_str("light saturation"),
            Error::TooDark => f.write_str("too dark"),
            Error::OutOfRange => f.write_str("channel ratio out of range"),
            Error::NotReady => f.write_str("sensor not initialized"),
        }
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Ready(SensorConfig),
}

/// High-level APDS-9301 driver
pub struct Apds9301<I2C, D> {
    interface: DeviceInterface<I2C>,
    delay: D,
    power_up: PollPolicy,
    state: State,
}

impl<I2C, D> Apds9301<I2C, D> {
    /// Create a new driver instance
    ///
    /// No bus traffic happens until [`Apds9301::initialize`].
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            interface: DeviceInterface::new(i2c, ADDRESS_FLOAT),
            delay,
            power_up: PollPolicy::POWER_UP,
            state: State::Uninitialized,
        }
    }

    /// Replace the power-up poll interval and deadline (10ms / 2s by default)
    pub fn with_power_up_policy(mut self, policy: PollPolicy) -> Self {
        self.power_up = policy;
        self
    }

    /// Configuration in use, if the sensor is initialized
    pub fn config(&self) -> Option<SensorConfig> {
        match self.state {
            State::Ready(config) => Some(config),
            State::Uninitialized => None,
        }
    }

    /// True between a successful `initialize` and `disable`
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Destroy the driver and return the I2C interface and delay
    pub fn destroy(self) -> (I2C, D) {
        (self.interface.i2c, self.delay)
    }

    fn ready_config<E>(&self) -> Result<SensorConfig, Error<E>> {
        self.config().ok_or(Error::NotReady)
    }

    // Marks the controller unusable until the new configuration is applied
    fn begin_initialize(&mut self, config: &SensorConfig) {
        self.state = State::Uninitialized;
        self.interface.address = config.address;
        debug!(
            "APDS-9301 at {=u8:#x}: powering up ({}, {})",
            config.address,
            config.gain,
            config.integration_time
        );
    }
}

impl<I2C, E, D> Apds9301<I2C, D>
where
    I2C: I2c<Error = E>,
{
    /// Power the sensor up and apply `config`
    ///
    /// Writes the power-on command, then polls until the sensor reports
    /// power and a non-zero IR count, for at most the power-up deadline.
    /// Finally programs gain and integration time, clearing manual
    /// integration.
    ///
    /// On any error the driver stays uninitialized and `acquire` returns
    /// [`Error::NotReady`].
    pub fn initialize(&mut self, config: SensorConfig) -> Result<(), Error<E>>
    where
        D: embedded_hal::delay::DelayNs,
    {
        self.begin_initialize(&config);

        self.interface
            .write_byte(CONTROL, ControlRegister::POWER_ON.bits())?;

        let policy = self.power_up;
        let powered = poll_until(&mut self.delay, policy, || {
            self.interface.power_up_complete()
        });
        if let Err(Error::Timeout) = powered {
            warn!("APDS-9301 not powered after {=u32} ms", policy.deadline_ms());
        }
        powered?;

        let timing = TimingRegister::from_bits(self.interface.read_byte(TIMING)?)
            .configured(config.gain, config.integration_time);
        debug!("APDS-9301 timing register {=u8:#x}", timing.bits());
        self.interface.write_byte(TIMING, timing.bits())?;

        self.state = State::Ready(config);
        Ok(())
    }

    /// Power the sensor down
    ///
    /// The write goes to the address of the most recent `initialize` call,
    /// even a failed one, or to [`ADDRESS_FLOAT`] if there was none.
    ///
    /// The driver is uninitialized afterwards even if the write failed; the
    /// bus error is returned so the caller can decide whether it matters.
    pub fn disable(&mut self) -> Result<(), Error<E>> {
        self.state = State::Uninitialized;
        debug!("APDS-9301 at {=u8:#x}: powering down", self.interface.address);
        self.interface
            .write_byte(CONTROL, ControlRegister::POWER_OFF.bits())
    }

    /// Read raw counts from both channels
    pub fn read_channels(&mut self) -> Result<ChannelReading, Error<E>> {
        self.ready_config::<E>()?;
        self.read_raw()
    }

    /// Read both channels and convert them to lux
    pub fn acquire(&mut self) -> Result<f64, Error<E>> {
        let config = self.ready_config::<E>()?;
        let reading = self.read_raw()?;
        Ok(reading.lux(config.gain, config.integration_time)?)
    }

    fn read_raw(&mut self) -> Result<ChannelReading, Error<E>> {
        let ch0 = self.interface.read_word(DATA0LOW)?;
        let ch1 = self.interface.read_word(DATA1LOW)?;
        Ok(ChannelReading::new(ch0, ch1))
    }
}

#[cfg(feature = "async")]
impl<I2C, E, D> Apds9301<I2C, D>
where
    I2C: AsyncI2c<Error = E>,
{
    /// Power the sensor up and apply `config` (async version)
    pub async fn initialize_async(&mut self, config: SensorConfig) -> Result<(), Error<E>>
    where
        D: embedded_hal_async::delay::DelayNs,
    {
        self.begin_initialize(&config);

        self.interface
            .write_byte_async(CONTROL, ControlRegister::POWER_ON.bits())
            .await?;

        let mut budget = self.power_up.budget();
        while !self.interface.power_up_complete_async().await? {
            if let Err(e) = budget.wait_async(&mut self.delay).await {
                warn!(
                    "APDS-9301 not powered after {=u32} ms",
                    self.power_up.deadline_ms()
                );
                return Err(e);
            }
        }

        let timing = TimingRegister::from_bits(self.interface.read_byte_async(TIMING).await?)
            .configured(config.gain, config.integration_time);
        debug!("APDS-9301 timing register {=u8:#x}", timing.bits());
        self.interface.write_byte_async(TIMING, timing.bits()).await?;

        self.state = State::Ready(config);
        Ok(())
    }

    /// Power the sensor down (async version)
    ///
    /// Addressing and state handling match [`Apds9301::disable`].
    pub async fn disable_async(&mut self) -> Result<(), Error<E>> {
        self.state = State::Uninitialized;
        debug!("APDS-9301 at {=u8:#x}: powering down", self.interface.address);
        self.interface
            .write_byte_async(CONTROL, ControlRegister::POWER_OFF.bits())
            .await
    }

    /// Read raw counts from both channels (async version)
    pub async fn read_channels_async(&mut self) -> Result<ChannelReading, Error<E>> {
        self.ready_config::<E>()?;
        self.read_raw_async().await
    }

    /// Read both channels and convert them to lux (async version)
    pub async fn acquire_async(&mut self) -> Result<f64, Error<E>> {
        let config = self.ready_config::<E>()?;
        let reading = self.read_raw_async().await?;
        Ok(reading.lux(config.gain, config.integration_time)?)
    }

    async fn read_raw_async(&mut self) -> Result<ChannelReading, Error<E>> {
        let ch0 = self.interface.read_word_async(DATA0LOW).await?;
        let ch1 = self.interface.read_word_async(DATA1LOW).await?;
        Ok(ChannelReading::new(ch0, ch1))
    }
}
