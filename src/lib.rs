//! # TCS3430 XYZ Tristimulus Color and ALS Sensor Driver
//!
//! This is a platform-agnostic Rust driver for the ams TCS3430 color and ambient light sensor,
//! built using the [`embedded-hal`] traits for I2C communication.
//!
//! The TCS3430 provides:
//! - X, Y, Z tristimulus channels plus two IR channels (IR2 multiplexed onto the X slot)
//! - Programmable integration and wait time
//! - Four ALS gain steps plus a 128x high gain mode
//! - ALS and saturation interrupts with 16-bit thresholds
//! - I2C interface (address 0x39)
//!
//! ## Features
//!
//! - **Register-level API** mirroring the device configuration registers
//! - **Async/await support** with feature gating (optional)
//! - **IR2 channel access** with automatic ADC remapping and settle timing
//! - **`defmt` logging** with the `defmt-03` feature (optional)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tcs3430::{AlsGain, Tcs3430};
//!
//! # fn main() {
//! # let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! # let delay = embedded_hal_mock::eh1::delay::NoopDelay::new();
//! let mut sensor = Tcs3430::new_with_delay(i2c, delay);
//!
//! // Reset the configuration, power on and verify the device
//! sensor.init().unwrap();
//!
//! // Configure measurement settings
//! sensor.set_als_gain(AlsGain::Gain16x).unwrap();
//! sensor.set_integration_time(0x40).unwrap();
//!
//! // Read the tristimulus channels
//! let xyz = sensor.read_channels().unwrap();
//! // println!("X: {}, Y: {}, Z: {}, IR1: {}", xyz.x, xyz.y, xyz.z, xyz.ir1);
//!
//! // IR2 shares the X channel ADC and needs a delay provider
//! let ir2 = sensor.get_ir2_data().unwrap();
//! # let _ = (xyz, ir2);
//! # }
//! ```
//!
//! ## Async Usage
//!
//! Enable the `async` feature to use async/await patterns:
//!
//! ```toml
//! [dependencies]
//! tcs3430 = { version = "0.1", features = ["async"] }
//! ```
//!
//! ```rust,ignore
//! # #[cfg(feature = "async")]
//! # async fn example() {
//! use tcs3430::Tcs3430;
//!
//! let i2c = /* your async I2C implementation */;
//! let delay = /* your async delay implementation */;
//! let mut sensor = Tcs3430::new_async_with_delay(i2c, delay);
//!
//! sensor.init_async().await.unwrap();
//!
//! // The IR2 settle delay only suspends the calling task
//! let ir2 = sensor.get_ir2_data_async().await.unwrap();
//! println!("IR2: {}", ir2);
//! # }
//! ```
//!
//! ## Concurrency
//!
//! The driver owns its bus exclusively. Bit-field setters are read-modify-write
//! sequences and are not atomic, so sharing one sensor between threads or tasks
//! needs external serialization (for example a mutex around the driver).
//!
//! [`embedded-hal`]: https://crates.io/crates/embedded-hal

#![no_std]
#![deny(missing_docs)]

use embedded_hal::i2c::I2c;

#[cfg(feature = "async")]
use embedded_hal_async::i2c::I2c as AsyncI2c;

/// I2C address of the TCS3430 sensor
pub const I2C_ADDRESS: u8 = 0x39;

/// Expected content of the device ID register
pub const DEVICE_ID: u8 = 0xDC;

/// Expected content of the revision ID register
pub const REVISION_ID: u8 = 0x41;

/// Integration time code written by [`Tcs3430::init`]
pub const DEFAULT_INTEGRATION_TIME: u8 = 0x23;

/// Auto-zero iteration code that runs auto-zero only on the first ALS cycle
pub const AUTO_ZERO_FIRST_CYCLE_ONLY: u8 = 0x7F;

/// ALS gain settings (CFG1 register)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum AlsGain {
    /// 1x gain
    Gain1x = 0b00,
    /// 4x gain
    Gain4x = 0b01,
    /// 16x gain
    Gain16x = 0b10,
    /// 64x gain
    Gain64x = 0b11,
}

/// Auto-zero starting point (AZ_CONFIG register)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum AutoZeroMode {
    /// Always start at zero when searching the best offset value
    StartAtZero = 0,
    /// Always start at the previous offset found by the auto-zero mechanism
    StartAtPrevious = 1,
}

/// Tristimulus and IR1 measurement data
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct ChannelData {
    /// X channel (channel 3)
    pub x: u16,
    /// Y channel (channel 1)
    pub y: u16,
    /// Z channel (channel 0)
    pub z: u16,
    /// IR1 channel (channel 2)
    pub ir1: u16,
}

/// Device status information
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct StatusInfo {
    /// Raw STATUS register content
    pub raw: u8,
    /// True if the ALS measurement saturated
    pub als_saturated: bool,
    /// True if an ALS interrupt is asserted
    pub als_interrupt: bool,
}

impl StatusInfo {
    fn from_register(raw: u8) -> Self {
        Self {
            raw,
            als_saturated: raw & STATUS_ASAT != 0,
            als_interrupt: raw & STATUS_AINT != 0,
        }
    }
}

/// All possible errors in this crate
#[derive(Debug)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C communication error
    I2c(E),
    /// Neither the device ID nor the revision ID matched a TCS3430
    InvalidDevice {
        /// Device ID read back
        device_id: u8,
        /// Revision ID read back
        revision_id: u8,
        /// Whether the ADC and oscillator were switched off afterwards
        powered_off: bool,
    },
}

// Register addresses
const ENABLE: u8 = 0x80;
const ATIME: u8 = 0x81;
const WTIME: u8 = 0x83;
const AILTL: u8 = 0x84;
const AILTH: u8 = 0x85;
const AIHTL: u8 = 0x86;
const AIHTH: u8 = 0x87;
const PERS: u8 = 0x8C;
const CFG0: u8 = 0x8D;
const CFG1: u8 = 0x90;
const REVID: u8 = 0x91;
const ID: u8 = 0x92;
const STATUS: u8 = 0x93;
const CH0DATAL: u8 = 0x94;
const CH0DATAH: u8 = 0x95;
const CH1DATAL: u8 = 0x96;
const CH1DATAH: u8 = 0x97;
const CH2DATAL: u8 = 0x98;
const CH2DATAH: u8 = 0x99;
const CH3DATAL: u8 = 0x9A;
const CH3DATAH: u8 = 0x9B;
const CFG2: u8 = 0x9F;
const CFG3: u8 = 0xAB;
const AZ_CONFIG: u8 = 0xD6;
const INTENAB: u8 = 0xDD;

// ENABLE bits
const ENABLE_PON: u8 = 0x01;
const ENABLE_AEN: u8 = 0x02;
const ENABLE_WEN: u8 = 0x08;

// CFG0 is written whole; bit 7 is reserved and must read back as 1
const CFG0_WLONG: u8 = 0x84;
const CFG0_NO_WLONG: u8 = 0x80;

// CFG1 AMUX maps IR2 onto channel 3
const CFG1_AMUX: u8 = 0x08;

const CFG2_HGAIN_ON: u8 = 0x14;
const CFG2_HGAIN_OFF: u8 = 0x04;

// CFG3 patterns. The disable patterns are OR-ed in, never cleared.
const CFG3_INT_READ_CLEAR_ON: u8 = 0x80;
const CFG3_INT_READ_CLEAR_OFF: u8 = 0x10;
const CFG3_SAI_ON: u8 = 0x10;
const CFG3_SAI_OFF: u8 = 0x80;

const AZ_MODE: u8 = 0x80;
const AZ_NTH_ITERATION_MASK: u8 = 0x7F;

// INTENAB enable bits and the AND masks applied when disabling
const INTENAB_AIEN: u8 = 0x10;
const INTENAB_AIEN_OFF_MASK: u8 = 0x80;
const INTENAB_ASIEN: u8 = 0x80;
const INTENAB_ASIEN_OFF_MASK: u8 = 0x10;

const PERS_MASK: u8 = 0x0F;

const STATUS_ASAT: u8 = 0x80;
const STATUS_AINT: u8 = 0x10;

// One integration or short wait step is 2.78ms, a long wait step is 33.4ms
const STEP_US: u32 = 2_780;
const WLONG_STEP_US: u32 = 33_400;

/// Timing configuration last written to the device
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct TimingState {
    atime: u8,
    wtime: u8,
    wlong: bool,
}

impl TimingState {
    fn settle_time_us(&self) -> u32 {
        let wait_step = if self.wlong { WLONG_STEP_US } else { STEP_US };
        (self.atime as u32 + 1) * STEP_US + (self.wtime as u32 + 1) * wait_step
    }
}

fn combine_channel(low: u8, high: u8) -> u16 {
    u16::from_le_bytes([low, high])
}

/// High-level TCS3430 driver
pub struct Tcs3430<I2C, Delay = ()> {
    i2c: I2C,
    delay: Delay,
    // Mirrors ATIME, WTIME and CFG0 for the IR2 settle delay
    timing: TimingState,
}

impl<I2C, E> Tcs3430<I2C, ()>
where
    I2C: I2c<Error = E>,
{
    /// Create a new TCS3430 driver instance without delay support
    ///
    /// Every operation except [`Tcs3430::get_ir2_data`] is available.
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            delay: (),
            timing: TimingState::default(),
        }
    }
}

impl<I2C, E, Delay> Tcs3430<I2C, Delay>
where
    I2C: I2c<Error = E>,
    Delay: embedded_hal::delay::DelayNs,
{
    /// Create a new TCS3430 driver instance with delay support
    pub fn new_with_delay(i2c: I2C, delay: Delay) -> Self {
        Self {
            i2c,
            delay,
            timing: TimingState::default(),
        }
    }
}

impl<I2C, Delay> Tcs3430<I2C, Delay> {
    /// Integration time code last written to ATIME
    pub fn integration_time(&self) -> u8 {
        self.timing.atime
    }

    /// Wait time code last written to WTIME
    pub fn wait_time(&self) -> u8 {
        self.timing.wtime
    }

    /// Whether wait-long was last enabled in CFG0
    pub fn wait_long_enabled(&self) -> bool {
        self.timing.wlong
    }

    /// Time the ADC needs to settle after switching channel 3 between X and IR2,
    /// in microseconds.
    ///
    /// Computed from the cached integration time, wait time and wait-long flag:
    /// `(atime + 1) * 2.78ms + (wtime + 1) * step`, where `step` is 33.4ms with
    /// wait-long enabled and 2.78ms otherwise.
    pub fn ir2_settle_time_us(&self) -> u32 {
        self.timing.settle_time_us()
    }

    /// Destroy the driver and return the I2C interface
    pub fn destroy(self) -> I2C {
        self.i2c
    }

    /// Destroy the driver and return the I2C interface and delay provider
    pub fn destroy_with_delay(self) -> (I2C, Delay) {
        (self.i2c, self.delay)
    }
}

impl<I2C, E, Delay> Tcs3430<I2C, Delay>
where
    I2C: I2c<Error = E>,
{
    /// Reset the configuration registers, power on the sensor and verify its identity
    ///
    /// Fails with [`Error::InvalidDevice`] only when both the device ID and the
    /// revision ID mismatch; the ADC and oscillator are switched off first.
    /// A bus error during that power off does not replace the identification
    /// error: it is logged and reported as `powered_off: false`.
    pub fn init(&mut self) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt-03")]
        defmt::debug!("TCS3430: resetting configuration");

        self.soft_reset()?;
        // Fresh after reset, so no read-modify-write
        self.write_register(ENABLE, ENABLE_AEN | ENABLE_PON)?;

        let (device_id, revision_id) = self.get_device_id()?;
        if device_id != DEVICE_ID && revision_id != REVISION_ID {
            #[cfg(feature = "defmt-03")]
            defmt::warn!(
                "TCS3430: unexpected ID {:#x} revision {:#x}",
                device_id,
                revision_id
            );
            let powered_off = self.shutdown().is_ok();
            if !powered_off {
                #[cfg(feature = "defmt-03")]
                defmt::error!("TCS3430: power off after failed identification did not complete");
            }
            return Err(Error::InvalidDevice {
                device_id,
                revision_id,
                powered_off,
            });
        }

        Ok(())
    }

    /// Enable or disable the wait timer
    pub fn set_wait_timer(&mut self, enable: bool) -> Result<(), Error<E>> {
        if enable {
            self.update_register(ENABLE, |v| v | ENABLE_WEN)
        } else {
            self.update_register(ENABLE, |v| v & !ENABLE_WEN)
        }
    }

    /// Set the integration time code (ATIME), in 2.78ms steps
    pub fn set_integration_time(&mut self, atime: u8) -> Result<(), Error<E>> {
        self.write_register(ATIME, atime)?;
        self.timing.atime = atime;
        Ok(())
    }

    /// Set the wait time code (WTIME)
    pub fn set_wait_time(&mut self, wtime: u8) -> Result<(), Error<E>> {
        self.write_register(WTIME, wtime)?;
        self.timing.wtime = wtime;
        Ok(())
    }

    /// Set the channel 0 interrupt thresholds
    pub fn set_interrupt_threshold(&mut self, low: u16, high: u16) -> Result<(), Error<E>> {
        let [low_l, low_h] = low.to_le_bytes();
        let [high_l, high_h] = high.to_le_bytes();
        self.write_register(AILTL, low_l)?;
        self.write_register(AILTH, low_h)?;
        self.write_register(AIHTL, high_l)?;
        self.write_register(AIHTH, high_h)
    }

    /// Set the interrupt persistence filter (0x0 to 0xF)
    pub fn set_interrupt_persistence(&mut self, apers: u8) -> Result<(), Error<E>> {
        self.write_register(PERS, apers & PERS_MASK)
    }

    /// Enable or disable wait-long, which multiplies the wait step by 12
    pub fn set_wait_long_time(&mut self, enable: bool) -> Result<(), Error<E>> {
        let cfg0 = if enable { CFG0_WLONG } else { CFG0_NO_WLONG };
        self.write_register(CFG0, cfg0)?;
        self.timing.wlong = enable;
        Ok(())
    }

    /// Set the ALS gain
    ///
    /// The gain bits are OR-ed into CFG1, so lowering the gain requires the
    /// bits to have been cleared first (for example by a power cycle).
    pub fn set_als_gain(&mut self, gain: AlsGain) -> Result<(), Error<E>> {
        self.update_register(CFG1, |v| v | gain as u8)
    }

    /// Enable or disable the 128x high gain mode
    pub fn set_als_high_gain(&mut self, enable: bool) -> Result<(), Error<E>> {
        let cfg2 = if enable { CFG2_HGAIN_ON } else { CFG2_HGAIN_OFF };
        self.write_register(CFG2, cfg2)
    }

    /// Configure clearing of the STATUS flags whenever STATUS is read
    pub fn set_int_read_clear(&mut self, enable: bool) -> Result<(), Error<E>> {
        let pattern = if enable {
            CFG3_INT_READ_CLEAR_ON
        } else {
            CFG3_INT_READ_CLEAR_OFF
        };
        self.update_register(CFG3, |v| v | pattern)
    }

    /// Configure entering sleep after an interrupt is asserted
    pub fn set_sleep_after_interrupt(&mut self, enable: bool) -> Result<(), Error<E>> {
        let pattern = if enable { CFG3_SAI_ON } else { CFG3_SAI_OFF };
        self.update_register(CFG3, |v| v | pattern)
    }

    /// Select where the auto-zero offset search starts
    pub fn set_auto_zero_mode(&mut self, mode: AutoZeroMode) -> Result<(), Error<E>> {
        match mode {
            AutoZeroMode::StartAtPrevious => self.update_register(AZ_CONFIG, |v| v | AZ_MODE),
            AutoZeroMode::StartAtZero => self.update_register(AZ_CONFIG, |v| v & !AZ_MODE),
        }
    }

    /// Run auto-zero every nth ALS iteration
    ///
    /// 0 never runs it, 0x7F runs it only on the first cycle.
    pub fn set_auto_zero_nth_iteration(&mut self, iteration: u8) -> Result<(), Error<E>> {
        let iteration = iteration & AZ_NTH_ITERATION_MASK;
        self.update_register(AZ_CONFIG, |v| v | iteration)
    }

    /// Enable or disable the ALS interrupt
    ///
    /// Interrupt read-clear is switched on first.
    pub fn set_als_interrupt(&mut self, enable: bool) -> Result<(), Error<E>> {
        self.set_int_read_clear(true)?;
        if enable {
            self.update_register(INTENAB, |v| v | INTENAB_AIEN)
        } else {
            // Disabling masks the ENABLE register content into INTENAB
            let value = self.read_register(ENABLE)? & INTENAB_AIEN_OFF_MASK;
            self.write_register(INTENAB, value)
        }
    }

    /// Enable or disable the ALS saturation interrupt
    ///
    /// Interrupt read-clear is switched on first.
    pub fn set_als_saturation_interrupt(&mut self, enable: bool) -> Result<(), Error<E>> {
        self.set_int_read_clear(true)?;
        if enable {
            self.update_register(INTENAB, |v| v | INTENAB_ASIEN)
        } else {
            self.update_register(INTENAB, |v| v & INTENAB_ASIEN_OFF_MASK)
        }
    }

    /// Read the Z channel (channel 0)
    pub fn get_z_data(&mut self) -> Result<u16, Error<E>> {
        self.read_channel(CH0DATAL, CH0DATAH)
    }

    /// Read the Y channel (channel 1)
    pub fn get_y_data(&mut self) -> Result<u16, Error<E>> {
        self.read_channel(CH1DATAL, CH1DATAH)
    }

    /// Read the IR1 channel (channel 2)
    pub fn get_ir1_data(&mut self) -> Result<u16, Error<E>> {
        self.read_channel(CH2DATAL, CH2DATAH)
    }

    /// Read the X channel (channel 3)
    pub fn get_x_data(&mut self) -> Result<u16, Error<E>> {
        self.read_channel(CH3DATAL, CH3DATAH)
    }

    /// Read Z, Y, IR1 and X in channel order
    pub fn read_channels(&mut self) -> Result<ChannelData, Error<E>> {
        let z = self.get_z_data()?;
        let y = self.get_y_data()?;
        let ir1 = self.get_ir1_data()?;
        let x = self.get_x_data()?;
        Ok(ChannelData { x, y, z, ir1 })
    }

    /// Read the IR2 channel
    ///
    /// IR2 is mapped onto channel 3 for the duration of the read, and the call
    /// blocks for [`Tcs3430::ir2_settle_time_us`] after switching to IR2 and
    /// again after switching back to X.
    ///
    /// A bus error after the switch to IR2 leaves IR2 mapped, so channel 3
    /// reads keep returning IR2 until a later call completes.
    pub fn get_ir2_data(&mut self) -> Result<u16, Error<E>>
    where
        Delay: embedded_hal::delay::DelayNs,
    {
        let settle_us = self.timing.settle_time_us();

        #[cfg(feature = "defmt-03")]
        defmt::debug!("TCS3430: IR2 settle time {} us", settle_us);

        self.set_ir2_channel(true)?;
        self.delay.delay_us(settle_us);
        let value = self.read_channel(CH3DATAL, CH3DATAH)?;
        self.set_ir2_channel(false)?;
        self.delay.delay_us(settle_us);
        Ok(value)
    }

    /// Read the device status
    pub fn get_device_status(&mut self) -> Result<StatusInfo, Error<E>> {
        let status = self.read_register(STATUS)?;
        Ok(StatusInfo::from_register(status))
    }

    /// Get the device ID and revision ID
    pub fn get_device_id(&mut self) -> Result<(u8, u8), Error<E>> {
        let device_id = self.read_register(ID)?;
        let revision_id = self.read_register(REVID)?;
        Ok((device_id, revision_id))
    }

    fn soft_reset(&mut self) -> Result<(), Error<E>> {
        self.set_wait_timer(false)?;
        self.set_integration_time(DEFAULT_INTEGRATION_TIME)?;
        self.set_wait_time(0)?;
        self.set_wait_long_time(false)?;
        self.set_als_gain(AlsGain::Gain64x)?;
        self.set_als_high_gain(false)?;
        self.set_int_read_clear(false)?;
        self.set_sleep_after_interrupt(false)?;
        self.set_auto_zero_mode(AutoZeroMode::StartAtZero)?;
        self.set_auto_zero_nth_iteration(AUTO_ZERO_FIRST_CYCLE_ONLY)?;
        self.set_als_saturation_interrupt(false)?;
        self.set_als_interrupt(false)
    }

    /// Disable the ADC, then the oscillator
    fn shutdown(&mut self) -> Result<(), Error<E>> {
        self.update_register(ENABLE, |v| v & !ENABLE_AEN)?;
        self.update_register(ENABLE, |v| v & !ENABLE_PON)
    }

    fn set_ir2_channel(&mut self, enable: bool) -> Result<(), Error<E>> {
        if enable {
            self.update_register(CFG1, |v| v | CFG1_AMUX)
        } else {
            self.update_register(CFG1, |v| v & !CFG1_AMUX)
        }
    }

    // Helper methods for register access
    fn read_channel(&mut self, low: u8, high: u8) -> Result<u16, Error<E>> {
        let low = self.read_register(low)?;
        let high = self.read_register(high)?;
        Ok(combine_channel(low, high))
    }

    fn update_register(&mut self, address: u8, f: impl FnOnce(u8) -> u8) -> Result<(), Error<E>> {
        let value = self.read_register(address)?;
        self.write_register(address, f(value))
    }

    fn read_register(&mut self, address: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDRESS, &[address], &mut buffer)
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    fn write_register(&mut self, address: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(I2C_ADDRESS, &[address, value])
            .map_err(Error::I2c)
    }
}

#[cfg(feature = "async")]
impl<I2C, E> Tcs3430<I2C, ()>
where
    I2C: AsyncI2c<Error = E>,
{
    /// Create a new TCS3430 driver instance without delay support (async version)
    pub fn new_async(i2c: I2C) -> Self {
        Self {
            i2c,
            delay: (),
            timing: TimingState::default(),
        }
    }
}

#[cfg(feature = "async")]
impl<I2C, E, Delay> Tcs3430<I2C, Delay>
where
    I2C: AsyncI2c<Error = E>,
    Delay: embedded_hal_async::delay::DelayNs,
{
    /// Create a new TCS3430 driver instance with delay support (async version)
    pub fn new_async_with_delay(i2c: I2C, delay: Delay) -> Self {
        Self {
            i2c,
            delay,
            timing: TimingState::default(),
        }
    }
}

#[cfg(feature = "async")]
impl<I2C, E, Delay> Tcs3430<I2C, Delay>
where
    I2C: AsyncI2c<Error = E>,
{
    /// Reset the configuration registers, power on the sensor and verify its identity (async version)
    pub async fn init_async(&mut self) -> Result<(), Error<E>> {
        #[cfg(feature = "defmt-03")]
        defmt::debug!("TCS3430: resetting configuration");

        self.soft_reset_async().await?;
        self.write_register_async(ENABLE, ENABLE_AEN | ENABLE_PON)
            .await?;

        let (device_id, revision_id) = self.get_device_id_async().await?;
        if device_id != DEVICE_ID && revision_id != REVISION_ID {
            #[cfg(feature = "defmt-03")]
            defmt::warn!(
                "TCS3430: unexpected ID {:#x} revision {:#x}",
                device_id,
                revision_id
            );
            let powered_off = self.shutdown_async().await.is_ok();
            if !powered_off {
                #[cfg(feature = "defmt-03")]
                defmt::error!("TCS3430: power off after failed identification did not complete");
            }
            return Err(Error::InvalidDevice {
                device_id,
                revision_id,
                powered_off,
            });
        }

        Ok(())
    }

    /// Enable or disable the wait timer (async version)
    pub async fn set_wait_timer_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        if enable {
            self.update_register_async(ENABLE, |v| v | ENABLE_WEN).await
        } else {
            self.update_register_async(ENABLE, |v| v & !ENABLE_WEN).await
        }
    }

    /// Set the integration time code (async version)
    pub async fn set_integration_time_async(&mut self, atime: u8) -> Result<(), Error<E>> {
        self.write_register_async(ATIME, atime).await?;
        self.timing.atime = atime;
        Ok(())
    }

    /// Set the wait time code (async version)
    pub async fn set_wait_time_async(&mut self, wtime: u8) -> Result<(), Error<E>> {
        self.write_register_async(WTIME, wtime).await?;
        self.timing.wtime = wtime;
        Ok(())
    }

    /// Set the channel 0 interrupt thresholds (async version)
    pub async fn set_interrupt_threshold_async(
        &mut self,
        low: u16,
        high: u16,
    ) -> Result<(), Error<E>> {
        let [low_l, low_h] = low.to_le_bytes();
        let [high_l, high_h] = high.to_le_bytes();
        self.write_register_async(AILTL, low_l).await?;
        self.write_register_async(AILTH, low_h).await?;
        self.write_register_async(AIHTL, high_l).await?;
        self.write_register_async(AIHTH, high_h).await
    }

    /// Set the interrupt persistence filter (async version)
    pub async fn set_interrupt_persistence_async(&mut self, apers: u8) -> Result<(), Error<E>> {
        self.write_register_async(PERS, apers & PERS_MASK).await
    }

    /// Enable or disable wait-long (async version)
    pub async fn set_wait_long_time_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        let cfg0 = if enable { CFG0_WLONG } else { CFG0_NO_WLONG };
        self.write_register_async(CFG0, cfg0).await?;
        self.timing.wlong = enable;
        Ok(())
    }

    /// Set the ALS gain (async version)
    pub async fn set_als_gain_async(&mut self, gain: AlsGain) -> Result<(), Error<E>> {
        self.update_register_async(CFG1, |v| v | gain as u8).await
    }

    /// Enable or disable the 128x high gain mode (async version)
    pub async fn set_als_high_gain_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        let cfg2 = if enable { CFG2_HGAIN_ON } else { CFG2_HGAIN_OFF };
        self.write_register_async(CFG2, cfg2).await
    }

    /// Configure clearing of the STATUS flags on read (async version)
    pub async fn set_int_read_clear_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        let pattern = if enable {
            CFG3_INT_READ_CLEAR_ON
        } else {
            CFG3_INT_READ_CLEAR_OFF
        };
        self.update_register_async(CFG3, |v| v | pattern).await
    }

    /// Configure entering sleep after an interrupt (async version)
    pub async fn set_sleep_after_interrupt_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        let pattern = if enable { CFG3_SAI_ON } else { CFG3_SAI_OFF };
        self.update_register_async(CFG3, |v| v | pattern).await
    }

    /// Select where the auto-zero offset search starts (async version)
    pub async fn set_auto_zero_mode_async(&mut self, mode: AutoZeroMode) -> Result<(), Error<E>> {
        match mode {
            AutoZeroMode::StartAtPrevious => {
                self.update_register_async(AZ_CONFIG, |v| v | AZ_MODE).await
            }
            AutoZeroMode::StartAtZero => {
                self.update_register_async(AZ_CONFIG, |v| v & !AZ_MODE).await
            }
        }
    }

    /// Run auto-zero every nth ALS iteration (async version)
    pub async fn set_auto_zero_nth_iteration_async(
        &mut self,
        iteration: u8,
    ) -> Result<(), Error<E>> {
        let iteration = iteration & AZ_NTH_ITERATION_MASK;
        self.update_register_async(AZ_CONFIG, |v| v | iteration)
            .await
    }

    /// Enable or disable the ALS interrupt (async version)
    pub async fn set_als_interrupt_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        self.set_int_read_clear_async(true).await?;
        if enable {
            self.update_register_async(INTENAB, |v| v | INTENAB_AIEN)
                .await
        } else {
            let value = self.read_register_async(ENABLE).await? & INTENAB_AIEN_OFF_MASK;
            self.write_register_async(INTENAB, value).await
        }
    }

    /// Enable or disable the ALS saturation interrupt (async version)
    pub async fn set_als_saturation_interrupt_async(
        &mut self,
        enable: bool,
    ) -> Result<(), Error<E>> {
        self.set_int_read_clear_async(true).await?;
        if enable {
            self.update_register_async(INTENAB, |v| v | INTENAB_ASIEN)
                .await
        } else {
            self.update_register_async(INTENAB, |v| v & INTENAB_ASIEN_OFF_MASK)
                .await
        }
    }

    /// Read the Z channel (async version)
    pub async fn get_z_data_async(&mut self) -> Result<u16, Error<E>> {
        self.read_channel_async(CH0DATAL, CH0DATAH).await
    }

    /// Read the Y channel (async version)
    pub async fn get_y_data_async(&mut self) -> Result<u16, Error<E>> {
        self.read_channel_async(CH1DATAL, CH1DATAH).await
    }

    /// Read the IR1 channel (async version)
    pub async fn get_ir1_data_async(&mut self) -> Result<u16, Error<E>> {
        self.read_channel_async(CH2DATAL, CH2DATAH).await
    }

    /// Read the X channel (async version)
    pub async fn get_x_data_async(&mut self) -> Result<u16, Error<E>> {
        self.read_channel_async(CH3DATAL, CH3DATAH).await
    }

    /// Read Z, Y, IR1 and X in channel order (async version)
    pub async fn read_channels_async(&mut self) -> Result<ChannelData, Error<E>> {
        let z = self.get_z_data_async().await?;
        let y = self.get_y_data_async().await?;
        let ir1 = self.get_ir1_data_async().await?;
        let x = self.get_x_data_async().await?;
        Ok(ChannelData { x, y, z, ir1 })
    }

    /// Read the IR2 channel (async version)
    ///
    /// The settle delays only suspend the calling task. A bus error after the
    /// switch to IR2 leaves IR2 mapped on channel 3.
    pub async fn get_ir2_data_async(&mut self) -> Result<u16, Error<E>>
    where
        Delay: embedded_hal_async::delay::DelayNs,
    {
        let settle_us = self.timing.settle_time_us();

        #[cfg(feature = "defmt-03")]
        defmt::debug!("TCS3430: IR2 settle time {} us", settle_us);

        self.set_ir2_channel_async(true).await?;
        self.delay.delay_us(settle_us).await;
        let value = self.read_channel_async(CH3DATAL, CH3DATAH).await?;
        self.set_ir2_channel_async(false).await?;
        self.delay.delay_us(settle_us).await;
        Ok(value)
    }

    /// Read the device status (async version)
    pub async fn get_device_status_async(&mut self) -> Result<StatusInfo, Error<E>> {
        let status = self.read_register_async(STATUS).await?;
        Ok(StatusInfo::from_register(status))
    }

    /// Get the device ID and revision ID (async version)
    pub async fn get_device_id_async(&mut self) -> Result<(u8, u8), Error<E>> {
        let device_id = self.read_register_async(ID).await?;
        let revision_id = self.read_register_async(REVID).await?;
        Ok((device_id, revision_id))
    }

    async fn soft_reset_async(&mut self) -> Result<(), Error<E>> {
        self.set_wait_timer_async(false).await?;
        self.set_integration_time_async(DEFAULT_INTEGRATION_TIME)
            .await?;
        self.set_wait_time_async(0).await?;
        self.set_wait_long_time_async(false).await?;
        self.set_als_gain_async(AlsGain::Gain64x).await?;
        self.set_als_high_gain_async(false).await?;
        self.set_int_read_clear_async(false).await?;
        self.set_sleep_after_interrupt_async(false).await?;
        self.set_auto_zero_mode_async(AutoZeroMode::StartAtZero)
            .await?;
        self.set_auto_zero_nth_iteration_async(AUTO_ZERO_FIRST_CYCLE_ONLY)
            .await?;
        self.set_als_saturation_interrupt_async(false).await?;
        self.set_als_interrupt_async(false).await
    }

    async fn shutdown_async(&mut self) -> Result<(), Error<E>> {
        self.update_register_async(ENABLE, |v| v & !ENABLE_AEN)
            .await?;
        self.update_register_async(ENABLE, |v| v & !ENABLE_PON)
            .await
    }

    async fn set_ir2_channel_async(&mut self, enable: bool) -> Result<(), Error<E>> {
        if enable {
            self.update_register_async(CFG1, |v| v | CFG1_AMUX).await
        } else {
            self.update_register_async(CFG1, |v| v & !CFG1_AMUX).await
        }
    }

    // Helper methods for async register access
    async fn read_channel_async(&mut self, low: u8, high: u8) -> Result<u16, Error<E>> {
        let low = self.read_register_async(low).await?;
        let high = self.read_register_async(high).await?;
        Ok(combine_channel(low, high))
    }

    async fn update_register_async(
        &mut self,
        address: u8,
        f: impl FnOnce(u8) -> u8,
    ) -> Result<(), Error<E>> {
        let value = self.read_register_async(address).await?;
        self.write_register_async(address, f(value)).await
    }

    async fn read_register_async(&mut self, address: u8) -> Result<u8, Error<E>> {
        let mut buffer = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDRESS, &[address], &mut buffer)
            .await
            .map_err(Error::I2c)?;
        Ok(buffer[0])
    }

    async fn write_register_async(&mut self, address: u8, value: u8) -> Result<(), Error<E>> {
        self.i2c
            .write(I2C_ADDRESS, &[address, value])
            .await
            .map_err(Error::I2c)
    }
}
