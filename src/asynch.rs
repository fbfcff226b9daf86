//! Async implementation of the DS1307 driver.
//!
//! This module provides an async interface to the DS1307 / DS13072 RTC with
//! the same operations, validation and frame layout as the blocking
//! [`crate::DS1307`]. It is only available when the `async` feature is
//! enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use ds1307::asynch::{I2cTransport, DS1307};
//! use ds1307::Variant;
//!
//! let mut rtc = DS1307::new(I2cTransport::new(i2c), Variant::Ds1307);
//! rtc.init().await?;
//!
//! let datetime = rtc.datetime().await?;
//! ```

use chrono::NaiveDateTime;
use embedded_hal_async::i2c::I2c;

use crate::datetime::RawDateTime;
use crate::registers::{ram_address, DEFAULT_SEND_BUFFER_SIZE};
use crate::{Config, Control, DS1307DateTime, DS1307Error, OutWave, RegAddr, Variant};

/// Async bus access the driver depends on.
///
/// See [`crate::Transport`] for the contract; only the calling convention
/// differs.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Error reported by the underlying bus or platform layer.
    type Error;

    /// Prepares the bus and pins.
    async fn platform_init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Releases the bus and pins.
    async fn platform_deinit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Writes `bytes` to the device at `address`.
    async fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fills `buffer` with bytes read from the device at `address`.
    async fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    async fn platform_init(&mut self) -> Result<(), Self::Error> {
        T::platform_init(self).await
    }

    async fn platform_deinit(&mut self) -> Result<(), Self::Error> {
        T::platform_deinit(self).await
    }

    async fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        T::send(self, address, bytes).await
    }

    async fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        T::receive(self, address, buffer).await
    }
}

/// [`Transport`] over an `embedded-hal-async` I2C bus.
#[derive(Debug)]
pub struct I2cTransport<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> I2cTransport<I2C> {
    /// Wraps an async I2C bus.
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Returns the wrapped bus.
    pub fn into_inner(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Transport for I2cTransport<I2C> {
    type Error = I2C::Error;

    async fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes).await
    }

    async fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, buffer).await
    }
}

/// DS1307 / DS13072 Real-Time Clock async driver.
pub struct DS1307<T: Transport, const SEND_BUFFER_SIZE: usize = { DEFAULT_SEND_BUFFER_SIZE }> {
    transport: T,
    config: Config,
}

impl<T: Transport> DS1307<T> {
    /// Creates a new async driver with the default address and send buffer.
    ///
    /// # Arguments
    /// * `transport` - The async bus transport
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

    /// Creates an async driver from an explicit configuration.
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

    /// Creates an async driver with a custom send buffer size.
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
    pub async fn init(&mut self) -> Result<(), DS1307Error<T::Error>> {
        debug!("DS1307: platform init");
        self.transport
            .platform_init()
            .await
            .inspect_err(|_| error!("DS1307: platform init failed"))?;
        Ok(())
    }

    /// Runs the platform deinit hook.
    pub async fn deinit(&mut self) -> Result<(), DS1307Error<T::Error>> {
        debug!("DS1307: platform deinit");
        self.transport
            .platform_deinit()
            .await
            .inspect_err(|_| error!("DS1307: platform deinit failed"))?;
        Ok(())
    }

    async fn write_registers(
        &mut self,
        start: u8,
        data: &[u8],
    ) -> Result<(), DS1307Error<T::Error>> {
        let mut frame = [0u8; SEND_BUFFER_SIZE];
        let mut register = start;
        for chunk in data.chunks(Self::PAYLOAD_CAPACITY) {
            frame[0] = register;
            frame[1..=chunk.len()].copy_from_slice(chunk);
            debug!("DS1307: write {:?}", &frame[..=chunk.len()]);
            self.transport
                .send(self.config.address, &frame[..=chunk.len()])
                .await
                .inspect_err(|_| error!("DS1307: write at register {:#x} failed", register))?;
            register = register.wrapping_add(chunk.len() as u8);
        }
        Ok(())
    }

    async fn read_registers(
        &mut self,
        start: u8,
        buffer: &mut [u8],
    ) -> Result<(), DS1307Error<T::Error>> {
        let address = self.config.address;
        self.transport
            .send(address, &[start])
            .await
            .inspect_err(|_| error!("DS1307: setting register pointer to {:#x} failed", start))?;
        self.transport
            .receive(address, buffer)
            .await
            .inspect_err(|_| error!("DS1307: read at register {:#x} failed", start))?;
        debug!("DS1307: read {:#x} -> {:?}", start, buffer);
        Ok(())
    }

    /// Gets the current date and time from the device.
    ///
    /// # Returns
    /// * `Ok(DS1307DateTime)` - The current date and time
    /// * `Err(DS1307Error::Fail)` on a transfer error
    pub async fn datetime(&mut self) -> Result<DS1307DateTime, DS1307Error<T::Error>> {
        let mut data = [0; 7];
        self.read_registers(RegAddr::Seconds as u8, &mut data)
            .await?;
        Ok(RawDateTime::from(data).into_datetime(self.config.variant))
    }

    /// Sets the current date and time on the device.
    ///
    /// # Returns
    /// * `Ok(())` on success
    /// * `Err(DS1307Error::InvalidParam)` when a field is out of range
    /// * `Err(DS1307Error::Fail)` on a transfer error
    pub async fn set_datetime(
        &mut self,
        datetime: &DS1307DateTime,
    ) -> Result<(), DS1307Error<T::Error>> {
        let raw = RawDateTime::from_datetime(datetime, self.config.variant)
            .map_err(DS1307Error::InvalidParam)?;
        let data: [u8; 7] = (&raw).into();
        self.write_registers(RegAddr::Seconds as u8, &data).await
    }

    /// Gets the current date and time as a chrono `NaiveDateTime`.
    pub async fn naive_datetime(&mut self) -> Result<NaiveDateTime, DS1307Error<T::Error>> {
        let datetime = self.datetime().await?;
        NaiveDateTime::try_from(&datetime).map_err(DS1307Error::InvalidParam)
    }

    /// Sets the date and time from a chrono `NaiveDateTime`.
    pub async fn set_naive_datetime(
        &mut self,
        datetime: &NaiveDateTime,
    ) -> Result<(), DS1307Error<T::Error>> {
        let datetime = DS1307DateTime::from_naive(datetime, self.config.time_representation)
            .map_err(DS1307Error::InvalidParam)?;
        self.set_datetime(&datetime).await
    }

    /// Writes `data` to the battery-backed RAM at `offset` (0-55).
    pub async fn write_ram(&mut self, offset: u8, data: &[u8]) -> Result<(), DS1307Error<T::Error>> {
        let start = ram_address(offset, data.len()).map_err(DS1307Error::InvalidParam)?;
        self.write_registers(start, data).await
    }

    /// Reads the battery-backed RAM at `offset` (0-55) into `buffer`.
    pub async fn read_ram(
        &mut self,
        offset: u8,
        buffer: &mut [u8],
    ) -> Result<(), DS1307Error<T::Error>> {
        let start = ram_address(offset, buffer.len()).map_err(DS1307Error::InvalidParam)?;
        if buffer.is_empty() {
            return Ok(());
        }
        self.read_registers(start, buffer).await
    }

    /// Configures the SQW/OUT pin.
    pub async fn set_out_wave(&mut self, wave: OutWave) -> Result<(), DS1307Error<T::Error>> {
        let control = Control::from(wave);
        debug!("DS1307: writing control: {:?}", control);
        self.write_registers(RegAddr::Control as u8, &[control.into()])
            .await
    }

    /// Configures the SQW/OUT pin from a numeric mode code.
    pub async fn set_out_wave_code(&mut self, code: u8) -> Result<(), DS1307Error<T::Error>> {
        let wave = OutWave::try_from(code).map_err(DS1307Error::InvalidParam)?;
        self.set_out_wave(wave).await
    }

    /// Reads the current SQW/OUT pin configuration.
    pub async fn out_wave(&mut self) -> Result<OutWave, DS1307Error<T::Error>> {
        Ok(OutWave::from(self.control().await?))
    }

    /// Gets the raw value of the control register.
    pub async fn control(&mut self) -> Result<Control, DS1307Error<T::Error>> {
        let mut data = [0];
        self.read_registers(RegAddr::Control as u8, &mut data)
            .await?;
        Ok(Control(data[0]))
    }
}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use super::*;
    use crate::{HourMode, ParamError};
    use alloc::vec;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTrans};

    const DEVICE_ADDRESS: u8 = 0x68;

    async fn setup_mock(expectations: &[I2cTrans]) -> I2cMock {
        I2cMock::new(expectations)
    }

    #[tokio::test]
    async fn test_async_init_without_bus_traffic() {
        let mut mock = setup_mock(&[]).await;
        let mut dev = DS1307::new(I2cTransport::new(mock.clone()), Variant::Ds1307);
        dev.init().await.unwrap();
        dev.deinit().await.unwrap();
        mock.done();
    }

    #[tokio::test]
    async fn test_async_read_datetime() {
        let mut mock = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Seconds as u8]),
            I2cTrans::read(
                DEVICE_ADDRESS,
                vec![0x30, 0x45, 0b1110_0101, 0x04, 0x14, 0x03, 0x24],
            ),
        ])
        .await;
        let mut dev = DS1307::new(I2cTransport::new(mock.clone()), Variant::Ds13072);

        let datetime = dev.datetime().await.unwrap();
        assert_eq!(datetime.second, 30);
        assert_eq!(datetime.minute, 45);
        assert_eq!(datetime.hour, 5);
        assert_eq!(datetime.hour_mode, HourMode::TwelveHour { pm: true });
        assert_eq!(datetime.weekday, 4);
        assert_eq!(datetime.day, 14);
        assert_eq!(datetime.month, 3);
        assert_eq!(datetime.year, 24);
        mock.done();
    }

    #[tokio::test]
    async fn test_async_set_datetime() {
        let mut mock = setup_mock(&[I2cTrans::write(
            DEVICE_ADDRESS,
            vec![
                RegAddr::Seconds as u8,
                0x00, // seconds
                0x30, // minutes
                0x15, // hours (24-hour mode)
                0x05, // weekday
                0x14, // date
                0x03, // month
                0x24, // year
            ],
        )])
        .await;
        let mut dev = DS1307::new(I2cTransport::new(mock.clone()), Variant::Ds1307);

        dev.set_datetime(&DS1307DateTime {
            second: 0,
            minute: 30,
            hour: 15,
            weekday: 5,
            day: 14,
            month: 3,
            year: 24,
            hour_mode: HourMode::TwentyFourHour,
        })
        .await
        .unwrap();
        mock.done();
    }

    #[tokio::test]
    async fn test_async_set_datetime_invalid() {
        let mut mock = setup_mock(&[]).await;
        let mut dev = DS1307::new(I2cTransport::new(mock.clone()), Variant::Ds1307);

        let result = dev
            .set_datetime(&DS1307DateTime {
                second: 60,
                ..DS1307DateTime::default()
            })
            .await;
        assert_eq!(result, Err(DS1307Error::InvalidParam(ParamError::Second)));
        mock.done();
    }

    #[tokio::test]
    async fn test_async_ram_access() {
        let mut mock = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![0x3F, 0x5A]),
            I2cTrans::write(DEVICE_ADDRESS, vec![0x08]),
            I2cTrans::read(DEVICE_ADDRESS, vec![0x01, 0x02]),
        ])
        .await;
        let mut dev = DS1307::new(I2cTransport::new(mock.clone()), Variant::Ds1307);

        dev.write_ram(55, &[0x5A]).await.unwrap();
        let mut buffer = [0; 2];
        dev.read_ram(0, &mut buffer).await.unwrap();
        assert_eq!(buffer, [0x01, 0x02]);
        assert_eq!(
            dev.write_ram(56, &[0x00]).await,
            Err(DS1307Error::InvalidParam(ParamError::MemoryRange))
        );
        mock.done();
    }

    #[tokio::test]
    async fn test_async_chunk_failure_stops_write() {
        let mut mock = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![0x08, 1, 2]),
            I2cTrans::write(DEVICE_ADDRESS, vec![0x0A, 3, 4]).with_error(ErrorKind::Other),
        ])
        .await;
        let mut dev = DS1307::<_, 3>::with_send_buffer(
            I2cTransport::new(mock.clone()),
            Config::default(),
        );

        assert_eq!(
            dev.write_ram(0, &[1, 2, 3, 4, 5, 6]).await,
            Err(DS1307Error::Fail(ErrorKind::Other))
        );
        mock.done();
    }

    #[tokio::test]
    async fn test_async_out_wave() {
        let mut mock = setup_mock(&[
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control as u8, 0b0001_0011]),
            I2cTrans::write(DEVICE_ADDRESS, vec![RegAddr::Control as u8]),
            I2cTrans::read(DEVICE_ADDRESS, vec![0b0001_0011]),
        ])
        .await;
        let mut dev = DS1307::new(I2cTransport::new(mock.clone()), Variant::Ds1307);

        dev.set_out_wave(OutWave::Hz32768).await.unwrap();
        assert_eq!(dev.out_wave().await.unwrap(), OutWave::Hz32768);
        assert_eq!(
            dev.set_out_wave_code(9).await,
            Err(DS1307Error::InvalidParam(ParamError::OutWave))
        );
        mock.done();
    }
}
