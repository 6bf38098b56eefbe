//! Low-level register and interface definitions for APDS-9301

use embedded_hal::i2c::I2c;

use crate::config::{Gain, IntegrationTime};
use crate::Error;

// Register addresses, command bit (0x80) included

/// Control register (power state)
pub const CONTROL: u8 = 0x80;
/// Timing register (integration time, manual integration, gain)
pub const TIMING: u8 = 0x81;
/// Channel 0 (visible + IR) data, low byte of a 16-bit word
pub const DATA0LOW: u8 = 0x8C;
/// Channel 1 (IR only) data, low byte of a 16-bit word
pub const DATA1LOW: u8 = 0x8E;

/// Contents of the control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ControlRegister(u8);

impl ControlRegister {
    const POWER_MASK: u8 = 0x03;

    /// Power-up command
    pub const POWER_ON: Self = Self(0x03);
    /// Power-down command
    pub const POWER_OFF: Self = Self(0x00);

    /// Wrap a raw register value
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw register value
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if the device reports either power bit set
    pub const fn is_powered(self) -> bool {
        self.0 & Self::POWER_MASK != 0
    }
}

/// Contents of the timing register.
///
/// ```text
///  7   6   5   4     3      2   1   0
/// [ reserved ][GAIN][MANUAL][ - ][INTEG]
/// ```
///
/// Reserved bits are preserved by every mutator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct TimingRegister(u8);

impl TimingRegister {
    const INTEG_MASK: u8 = 0x03;
    const MANUAL_BIT: u8 = 0x08;
    const GAIN_BIT: u8 = 0x10;

    /// Wrap a raw register value
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw register value
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Integration time code in bits 0-1
    pub const fn integration_code(self) -> u8 {
        self.0 & Self::INTEG_MASK
    }

    /// Manual integration flag
    pub const fn is_manual(self) -> bool {
        self.0 & Self::MANUAL_BIT != 0
    }

    /// Gain bit decoded as a [`Gain`]
    pub const fn gain(self) -> Gain {
        if self.0 & Self::GAIN_BIT != 0 {
            Gain::High
        } else {
            Gain::Low
        }
    }

    /// Clear the manual integration flag
    pub const fn without_manual(self) -> Self {
        Self(self.0 & !Self::MANUAL_BIT)
    }

    /// Replace the gain bit
    pub const fn with_gain(self, gain: Gain) -> Self {
        match gain {
            Gain::Low => Self(self.0 & !Self::GAIN_BIT),
            Gain::High => Self(self.0 | Self::GAIN_BIT),
        }
    }

    /// Replace the integration time code
    pub const fn with_integration_time(self, integration_time: IntegrationTime) -> Self {
        Self((self.0 & !Self::INTEG_MASK) | integration_time.code())
    }

    /// Apply a full measurement configuration on top of the current value
    pub const fn configured(self, gain: Gain, integration_time: IntegrationTime) -> Self {
        self.without_manual()
            .with_gain(gain)
            .with_integration_time(integration_time)
    }
}

/// Register access to one device at a fixed bus address
#[derive(Debug)]
pub struct DeviceInterface<I2C> {
    /// The I2C bus
    pub i2c: I2C,
    /// 7-bit device address
    pub address: u8,
}

impl<I2C> DeviceInterface<I2C> {
    /// Create an interface for the device at `address`
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }
}

impl<I2C, E> DeviceInterface<I2C>
where
    I2C: I2c<Error = E>,
{
    /// Read one byte register
    pub fn read_byte(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    /// Read a little-endian word starting at `register`
    pub fn read_word(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(u16::from_le_bytes(buffer))
    }

    /// Write one byte register
    pub fn write_byte(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(Error::I2c)
    }

    /// Powered and producing a non-zero IR count
    pub(crate) fn power_up_complete(&mut self) -> Result<bool, Error<E>> {
        let control = ControlRegister::from_bits(self.read_byte(CONTROL)?);
        if !control.is_powered() {
            return Ok(false);
        }
        Ok(self.read_word(DATA1LOW)? != 0)
    }
}

#[cfg(feature = "async")]
impl<I2C, E> DeviceInterface<I2C>
where
    I2C: embedded_hal_async::i2c::I2c<Error = E>,
{
    /// Read one byte register (async version)
    pub async fn read_byte_async(&mut self, register: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    /// Read a little-endian word starting at `register` (async version)
    pub async fn read_word_async(&mut self, register: u8) -> Result<u16, Error<E>> {
        let mut buffer = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(u16::from_le_bytes(buffer))
    }

    /// Write one byte register (async version)
    pub async fn write_byte_async(&mut self, register: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(Error::I2c)
    }

    pub(crate) async fn power_up_complete_async(&mut self) -> Result<bool, Error<E>> {
        let control = ControlRegister::from_bits(self.read_byte_async(CONTROL).await?);
        if !control.is_powered() {
            return Ok(false);
        }
        Ok(self.read_word_async(DATA1LOW).await? != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    extern crate std;
    use std::vec;

    const ADDR: u8 = 0x39;

    #[test]
    fn control_power_bits() {
        assert!(!ControlRegister::from_bits(0x00).is_powered());
        assert!(ControlRegister::from_bits(0x01).is_powered());
        assert!(ControlRegister::from_bits(0x02).is_powered());
        assert!(ControlRegister::from_bits(0x03).is_powered());
        assert!(!ControlRegister::from_bits(0xFC).is_powered());
        assert_eq!(ControlRegister::POWER_ON.bits(), 3);
        assert_eq!(ControlRegister::POWER_OFF.bits(), 0);
    }

    #[test]
    fn timing_clears_manual_and_integration_bits() {
        let reg = TimingRegister::from_bits(0xFF).configured(Gain::High, IntegrationTime::Ms13_7);
        assert_eq!(reg.bits(), 0xF4);
        assert!(!reg.is_manual());
        assert_eq!(reg.integration_code(), 0);
    }

    #[test]
    fn timing_low_gain_clears_gain_bit() {
        let reg = TimingRegister::from_bits(0xFF).configured(Gain::Low, IntegrationTime::Ms402);
        assert_eq!(reg.bits(), 0xE6);
        assert_eq!(reg.gain(), Gain::Low);
    }

    #[test]
    fn timing_high_gain_sets_gain_bit() {
        let reg = TimingRegister::from_bits(0x00).configured(Gain::High, IntegrationTime::Ms101);
        assert_eq!(reg.bits(), 0x11);
        assert_eq!(reg.gain(), Gain::High);
        assert_eq!(reg.integration_code(), 1);
    }

    #[test]
    fn timing_preserves_reserved_bits() {
        let reg = TimingRegister::from_bits(0xE0).configured(Gain::Low, IntegrationTime::Ms13_7);
        assert_eq!(reg.bits(), 0xE0);
    }

    #[test]
    fn word_read_is_little_endian() {
        let expectations = [I2cTransaction::write_read(
            ADDR,
            vec![DATA0LOW],
            vec![0x34, 0x12],
        )];
        let mut iface = DeviceInterface::new(I2cMock::new(&expectations), ADDR);

        assert_eq!(iface.read_word(DATA0LOW).unwrap(), 0x1234);
        iface.i2c.done();
    }

    #[test]
    fn power_up_skips_data_read_while_unpowered() {
        let expectations = [I2cTransaction::write_read(ADDR, vec![CONTROL], vec![0x00])];
        let mut iface = DeviceInterface::new(I2cMock::new(&expectations), ADDR);

        assert!(!iface.power_up_complete().unwrap());
        iface.i2c.done();
    }

    #[test]
    fn power_up_requires_nonzero_ir_count() {
        let expectations = [
            I2cTransaction::write_read(ADDR, vec![CONTROL], vec![0x03]),
            I2cTransaction::write_read(ADDR, vec![DATA1LOW], vec![0x00, 0x00]),
            I2cTransaction::write_read(ADDR, vec![CONTROL], vec![0x03]),
            I2cTransaction::write_read(ADDR, vec![DATA1LOW], vec![0x01, 0x00]),
        ];
        let mut iface = DeviceInterface::new(I2cMock::new(&expectations), ADDR);

        assert!(!iface.power_up_complete().unwrap());
        assert!(iface.power_up_complete().unwrap());
        iface.i2c.done();
    }

    #[test]
    fn bus_failure_is_reported() {
        let expectations =
            [I2cTransaction::write(ADDR, vec![CONTROL, 0x03]).with_error(ErrorKind::Other)];
        let mut iface = DeviceInterface::new(I2cMock::new(&expectations), ADDR);

        let result = iface.write_byte(CONTROL, ControlRegister::POWER_ON.bits());
        assert!(matches!(result, Err(Error::I2c(ErrorKind::Other))));
        iface.i2c.done();
    }
}
