//! Measurement configuration: gain, integration time and bus address

/// Device address with ADDR SEL tied to ground
pub const ADDRESS_GND: u8 = 0x29;
/// Device address with ADDR SEL left floating
pub const ADDRESS_FLOAT: u8 = 0x39;
/// Device address with ADDR SEL tied to VDD
pub const ADDRESS_VDD: u8 = 0x49;

/// Analog gain setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Gain {
    /// 1x gain, 16 times less sensitive than [`Gain::High`]
    Low,
    /// 16x gain
    High,
}

impl Gain {
    /// Factor that brings a reading taken at this gain to the high-gain scale
    pub const fn scale(self) -> f64 {
        match self {
            Gain::Low => 16.0,
            Gain::High => 1.0,
        }
    }
}

/// ADC integration window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum IntegrationTime {
    /// 13.7ms
    Ms13_7,
    /// 101ms
    Ms101,
    /// 402ms
    Ms402,
}

const SCALE_13_7MS: f64 = 1.0 / 0.034;
const SCALE_101MS: f64 = 1.0 / 0.252;

/// Datasheet constants that depend on the integration window
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct TimingProfile {
    /// Channel count at or above which the reading is considered saturated
    pub saturation_limit: u16,
    /// Multiplier normalizing counts to the 402ms window
    pub count_scale_factor: f64,
}

impl IntegrationTime {
    /// Value of the integration bits in the timing register
    pub const fn code(self) -> u8 {
        match self {
            IntegrationTime::Ms13_7 => 0x00,
            IntegrationTime::Ms101 => 0x01,
            IntegrationTime::Ms402 => 0x02,
        }
    }

    /// Saturation limit and count scale for this window
    pub const fn profile(self) -> TimingProfile {
        match self {
            IntegrationTime::Ms13_7 => TimingProfile {
                saturation_limit: 0x13B7,
                count_scale_factor: SCALE_13_7MS,
            },
            IntegrationTime::Ms101 => TimingProfile {
                saturation_limit: 0x9139,
                count_scale_factor: SCALE_101MS,
            },
            IntegrationTime::Ms402 => TimingProfile {
                saturation_limit: 0xFFFF,
                count_scale_factor: 1.0,
            },
        }
    }

    /// Nominal window length in microseconds
    ///
    /// Useful for spacing calls to [`crate::Apds9301::acquire`] so that each
    /// one sees a fresh conversion.
    pub const fn period_us(self) -> u32 {
        match self {
            IntegrationTime::Ms13_7 => 13_700,
            IntegrationTime::Ms101 => 101_000,
            IntegrationTime::Ms402 => 402_000,
        }
    }
}

/// Everything [`crate::Apds9301::initialize`] needs to bring the sensor up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct SensorConfig {
    /// 7-bit bus address
    pub address: u8,
    /// Analog gain
    pub gain: Gain,
    /// Integration window
    pub integration_time: IntegrationTime,
}

impl SensorConfig {
    /// Create a configuration from its parts
    pub const fn new(address: u8, gain: Gain, integration_time: IntegrationTime) -> Self {
        Self {
            address,
            gain,
            integration_time,
        }
    }

    /// Replace the bus address
    pub const fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Replace the gain
    pub const fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    /// Replace the integration time
    pub const fn with_integration_time(mut self, integration_time: IntegrationTime) -> Self {
        self.integration_time = integration_time;
        self
    }

    /// Timing profile of the configured integration time
    pub const fn profile(&self) -> TimingProfile {
        self.integration_time.profile()
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self::new(ADDRESS_FLOAT, Gain::Low, IntegrationTime::Ms402)
    }
}
