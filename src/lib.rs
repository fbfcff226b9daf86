//! A platform-agnostic driver for the DS1307 / DS13072 real-time clock.
//!
//! The driver translates date-time, battery-backed RAM and SQW/OUT pin
//! operations into register transfers over a caller-supplied [`Transport`].
//! It holds no state between calls besides the transport and its [`Config`].
//!
//! Two register maps are supported through [`Variant`]:
//! - [`Variant::Ds1307`]: 24-hour clock only.
//! - [`Variant::Ds13072`]: 12/24-hour clock with an AM/PM flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use ds1307::{DS1307, DS1307DateTime, HourMode, I2cTransport, OutWave, Variant};
//!
//! let mut rtc = DS1307::new(I2cTransport::new(i2c), Variant::Ds13072);
//! rtc.init()?;
//! rtc.set_datetime(&DS1307DateTime {
//!     second: 0,
//!     minute: 52,
//!     hour: 20,
//!     weekday: 1,
//!     day: 6,
//!     month: 10,
//!     year: 25,
//!     hour_mode: HourMode::TwentyFourHour,
//! })?;
//! rtc.set_out_wave(OutWave::Hz1)?;
//!
//! let now = rtc.datetime()?;
//! ```
//!
//! # Errors
//!
//! Every operation returns [`DS1307Error`]. Arguments are validated before
//! the bus is touched, so an [`DS1307Error::InvalidParam`] never leaves a
//! partial transfer behind. A [`DS1307Error::Fail`] ends the operation at the
//! first failing transfer; nothing is retried or rolled back.

#![no_std]

#[macro_use]
mod fmt;

#[cfg(feature = "async")]
pub mod asynch;
pub mod datetime;
pub mod registers;
pub mod transport;

use chrono::NaiveDateTime;

pub use crate::datetime::{DS1307DateTime, HourMode};
pub use crate::registers::{
    Control, OutWave, RegAddr, TimeRepresentation, DEFAULT_SEND_BUFFER_SIZE, DEVICE_ADDRESS,
    RAM_SIZE, RAM_START,
};
pub use crate::transport::{Handler, I2cTransport, Transport};

use crate::datetime::RawDateTime;
use crate::registers::ram_address;

/// Register map selected at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Variant {
    /// Seven-field clock, always 24-hour
    Ds1307,
    /// Adds the 12/24-hour flag and AM/PM bit in the hours register
    Ds13072,
}

/// Configuration for the DS1307 driver.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Register map of the attached chip
    pub variant: Variant,
    /// 7-bit bus address
    pub address: u8,
    /// Hour format used by [`DS1307::set_naive_datetime`]
    pub time_representation: TimeRepresentation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            variant: Variant::Ds1307,
            address: DEVICE_ADDRESS,
            time_representation: TimeRepresentation::TwentyFourHour,
        }
    }
}

/// Argument that failed validation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParamError {
    /// Seconds outside 0-59
    Second,
    /// Minutes outside 0-59
    Minute,
    /// Hour outside 0-23, or 1-12 in 12-hour mode
    Hour,
    /// Day of week outside 1-7
    WeekDay,
    /// Day of month outside 1-31, or not a calendar date
    Day,
    /// Month outside 1-12
    Month,
    /// Year outside 0-99 (2000-2099)
    Year,
    /// 12-hour mode requested on a chip without it
    HourMode,
    /// RAM window extends past register 0x3F
    MemoryRange,
    /// Unknown SQW/OUT mode code
    OutWave,
}

/// Errors returned by the driver.
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DS1307Error<E> {
    /// The transport or platform layer reported a failure
    Fail(E),
    /// An argument was rejected before any bus access
    InvalidParam(ParamError),
}

impl<E> From<E> for DS1307Error<E> {
    fn from(e: E) -> Self {
        DS1307Error::Fail(e)
    }
}

/// DS1307 / DS13072 Real-Time Clock driver.
///
/// `SEND_BUFFER_SIZE` bounds a single write frame, register address byte
/// included. Longer writes are split into consecutive frames.
pub struct DS1307<T: Transport, const SEND_BUFFER_SIZE: usize = { DEFAULT_SEND_BUFFER_SIZE }> {
    transport: T,
    config: Config,
}

impl<T: Transport> DS1307<T> {
    /// Creates a driver with the default address and send buffer.
    ///
    /// # Arguments
    /// * `transport` - The bus transport, owned or borrowed (`&mut T`)
    /// * `variant` - The register map of the attached chip
    pub fn new(transport: T, variant: Variant) -> Self {
        Self::with_config(
            transport,
            Config {
                variant,
                ..Config::default()
            },
        )
    }

    /// Creates a driver from an explicit configuration.
    ///
    /// Use [`Self::with_send_buffer`] to pick a send buffer size other
    /// than [`DEFAULT_SEND_BUFFER_SIZE`].
    pub fn with_config(transport: T, config: Config) -> Self {
        Self::with_send_buffer(transport, config)
    }
}

impl<T: Transport, const SEND_BUFFER_SIZE: usize> DS1307<T, SEND_BUFFER_SIZE> {
    const PAYLOAD_CAPACITY: usize = {
        assert!(
            SEND_BUFFER_SIZE > 1,
            "send buffer must hold the register address and one data byte"
        );
        SEND_BUFFER_SIZE - 1
    };

    /// Creates a driver with a custom send buffer size.
    ///
    /// ```rust,ignore
    /// let rtc = DS1307::<_, 4>::with_send_buffer(transport, Config::default());
    /// ```
    pub fn with_send_buffer(transport: T, config: Config) -> Self {
        Self { transport, config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consumes the driver and returns the transport.
    pub fn release(self) -> T {
        self.transport
    }

    /// Runs the platform init hook. No bus traffic is generated.
    pub fn init(&mut self) -> Result<(), DS1307Error<T::Error>> {
        debug!("DS1307: platform init");
        self.transport
            .platform_init()
            .inspect_err(|_| error!("DS1307: platform init failed"))?;
        Ok(())
    }

    /// Runs the platform deinit hook.
    pub fn deinit(&mut self) -> Result<(), DS1307Error<T::Error>> {
        debug!("DS1307: platform deinit");
        self.transport
            .platform_deinit()
            .inspect_err(|_| error!("DS1307: platform deinit failed"))?;
        Ok(())
    }

    /// Writes `data` to consecutive registers starting at `start`.
    ///
    /// Frames already sent stay written when a later frame fails.
    fn write_registers(&mut self, start: u8, data: &[u8]) -> Result<(), DS1307Error<T::Error>> {
        let mut frame = [0u8; SEND_BUFFER_SIZE];
        let mut register = start;
        for chunk in data.chunks(Self::PAYLOAD_CAPACITY) {
            frame[0] = register;
            frame[1..=chunk.len()].copy_from_slice(chunk);
            debug!("DS1307: write {:?}", &frame[..=chunk.len()]);
            self.transport
                .send(self.config.address, &frame[..=chunk.len()])
                .inspect_err(|_| error!("DS1307: write at register {:#x} failed", register))?;
            register = register.wrapping_add(chunk.len() as u8);
        }
        Ok(())
    }

    /// Fills `buffer` from consecutive registers starting at `start`.
    ///
    /// The chip auto-increments its register pointer, so a single burst
    /// covers the whole buffer.
    fn read_registers(
        &mut self,
        start: u8,
        buffer: &mut [u8],
    ) -> Result<(), DS1307Error<T::Error>> {
        let address = self.config.address;
        self.transport
            .send(address, &[start])
            .inspect_err(|_| error!("DS1307: setting register pointer to {:#x} failed", start))?;
        self.transport
            .receive(address, buffer)
            .inspect_err(|_| error!("DS1307: read at register {:#x} failed", start))?;
        debug!("DS1307: read {:#x} -> {:?}", start, buffer);
        Ok(())
    }

    /// Gets the current date and time from the device.
    ///
    /// The record is decoded only after all seven registers were read.
    ///
    /// # Returns
    /// * `Ok(DS1307DateTime)` - The current date and time
    /// * `Err(DS1307Error::Fail)` on a transfer error
    pub fn datetime(&mut self) -> Result<DS1307DateTime, DS1307Error<T::Error>> {
        let mut data = [0; 7];
        self.read_registers(RegAddr::Seconds as u8, &mut data)?;
        Ok(RawDateTime::from(data).into_datetime(self.config.variant))
    }

    /// Sets the current date and time on the device.
    ///
    /// The oscillator is always left running.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(DS1307Error::InvalidParam)` when a field is out of range; the
    ///   bus is not touched
    /// * `Err(DS1307Error::Fail)` on a transfer error
    pub fn set_datetime(&mut self, datetime: &DS1307DateTime) -> Result<(), DS1307Error<T::Error>> {
        let raw = RawDateTime::from_datetime(datetime, self.config.variant)
            .map_err(DS1307Error::InvalidParam)?;
        let data: [u8; 7] = (&raw).into();
        self.write_registers(RegAddr::Seconds as u8, &data)
    }

    /// Gets the current date and time as a chrono `NaiveDateTime`.
    ///
    /// Register contents that do not form a calendar date are reported as
    /// [`DS1307Error::InvalidParam`] naming the offending field.
    pub fn naive_datetime(&mut self) -> Result<NaiveDateTime, DS1307Error<T::Error>> {
        let datetime = self.datetime()?;
        NaiveDateTime::try_from(&datetime).map_err(DS1307Error::InvalidParam)
    }

    /// Sets the date and time from a chrono `NaiveDateTime`, using
    /// [`Config::time_representation`] as the hour format.
    pub fn set_naive_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), DS1307Error<T::Error>> {
        let datetime = DS1307DateTime::from_naive(datetime, self.config.time_representation)
            .map_err(DS1307Error::InvalidParam)?;
        self.set_datetime(&datetime)
    }

    /// Writes `data` to the battery-backed RAM.
    ///
    /// # Arguments
    /// * `offset` - Start position inside the RAM (0-55)
    /// * `data` - Bytes to write; `offset + data.len()` must not exceed 56
    ///
    /// An empty `data` performs no transfer.
    pub fn write_ram(&mut self, offset: u8, data: &[u8]) -> Result<(), DS1307Error<T::Error>> {
        let start = ram_address(offset, data.len()).map_err(DS1307Error::InvalidParam)?;
        self.write_registers(start, data)
    }

    /// Reads the battery-backed RAM into `buffer`.
    ///
    /// # Arguments
    /// * `offset` - Start position inside the RAM (0-55)
    /// * `buffer` - Destination; `offset + buffer.len()` must not exceed 56
    ///
    /// An empty `buffer` performs no transfer.
    pub fn read_ram(&mut self, offset: u8, buffer: &mut [u8]) -> Result<(), DS1307Error<T::Error>> {
        let start = ram_address(offset, buffer.len()).map_err(DS1307Error::InvalidParam)?;
        if buffer.is_empty() {
            return Ok(());
        }
        self.read_registers(start, buffer)
    }

    /// Configures the SQW/OUT pin.
    pub fn set_out_wave(&mut self, wave: OutWave) -> Result<(), DS1307Error<T::Error>> {
        let control = Control::from(wave);
        debug!("DS1307: writing control: {:?}", control);
        self.write_registers(RegAddr::Control as u8, &[control.into()])
    }

    /// Configures the SQW/OUT pin from a numeric mode code (see [`OutWave`]).
    ///
    /// Unknown codes fail with [`ParamError::OutWave`] before any bus access.
    pub fn set_out_wave_code(&mut self, code: u8) -> Result<(), DS1307Error<T::Error>> {
        let wave = OutWave::try_from(code).map_err(DS1307Error::InvalidParam)?;
        self.set_out_wave(wave)
    }

    /// Reads the current SQW/OUT pin configuration.
    pub fn out_wave(&mut self) -> Result<OutWave, DS1307Error<T::Error>> {
        Ok(OutWave::from(self.control()?))
    }

    /// Gets the raw value of the control register.
    pub fn control(&mut self) -> Result<Control, DS1307Error<T::Error>> {
        let mut data = [0];
        self.read_registers(RegAddr::Control as u8, &mut data)?;
        Ok(Control(data[0]))
    }
}
