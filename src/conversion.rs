//! Conversion of raw channel counts to lux

use crate::config::{Gain, IntegrationTime};

/// Why a pair of channel counts could not be turned into lux
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ConversionError {
    /// A channel is at or above the saturation limit of the integration window
    LightSaturation,
    /// A channel read zero
    TooDark,
    /// IR to broadband ratio above 1.30, no formula applies
    OutOfRange,
}

/// Raw counts of both photodiodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChannelReading {
    /// Channel 0, visible + IR
    pub ch0: u16,
    /// Channel 1, IR only
    pub ch1: u16,
}

impl ChannelReading {
    /// Bundle two raw counts
    pub const fn new(ch0: u16, ch1: u16) -> Self {
        Self { ch0, ch1 }
    }

    /// IR to broadband ratio, `ch1 / ch0`
    pub fn ratio(&self) -> f64 {
        f64::from(self.ch1) / f64::from(self.ch0)
    }

    /// Illuminance in lux for a reading taken with the given settings
    ///
    /// Saturation is checked before darkness, so a reading with one channel
    /// saturated and the other at zero reports [`ConversionError::LightSaturation`].
    pub fn lux(
        &self,
        gain: Gain,
        integration_time: IntegrationTime,
    ) -> Result<f64, ConversionError> {
        let profile = integration_time.profile();

        if self.ch0 >= profile.saturation_limit || self.ch1 >= profile.saturation_limit {
            return Err(ConversionError::LightSaturation);
        }

        if self.ch0 == 0 || self.ch1 == 0 {
            return Err(ConversionError::TooDark);
        }

        let raw = self.raw_lux()?;

        Ok(raw * gain.scale() * profile.count_scale_factor)
    }

    // Piecewise fit from the datasheet, valid for the 402ms window at high gain
    fn raw_lux(&self) -> Result<f64, ConversionError> {
        let ch0 = f64::from(self.ch0);
        let ch1 = f64::from(self.ch1);
        let ratio = ch1 / ch0;

        let lux = if ratio <= 0.50 {
            0.0304 * ch0 - 0.062 * ch0 * libm::pow(ratio, 1.4)
        } else if ratio <= 0.61 {
            0.0224 * ch0 - 0.031 * ch1
        } else if ratio <= 0.80 {
            0.0128 * ch0 - 0.0153 * ch1
        } else if ratio <= 1.30 {
            0.00146 * ch0 - 0.00112 * ch1
        } else {
            return Err(ConversionError::OutOfRange);
        };

        Ok(lux)
    }
}
