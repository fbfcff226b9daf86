//! Bus transport used by the driver.
//!
//! The driver never talks to a bus peripheral directly. It goes through a
//! [`Transport`], which the caller supplies at construction time. Two
//! ready-made transports are provided:
//!
//! - [`I2cTransport`] wraps any `embedded-hal` I2C bus.
//! - [`Handler`] is built from plain functions, for platforms without an
//!   `embedded-hal` implementation.

use embedded_hal::i2c::I2c;

/// Bus access the driver depends on.
///
/// `send` and `receive` move raw bytes to and from the device at a 7-bit bus
/// address. The driver only distinguishes success from failure; the error
/// value is handed back to the caller untouched.
///
/// `platform_init` and `platform_deinit` prepare and release the bus. The
/// default bodies do nothing.
pub trait Transport {
    /// Error reported by the underlying bus or platform layer.
    type Error;

    /// Prepares the bus and pins.
    fn platform_init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Releases the bus and pins.
    fn platform_deinit(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Writes `bytes` to the device at `address`.
    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Fills `buffer` with bytes read from the device at `address`.
    fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn platform_init(&mut self) -> Result<(), Self::Error> {
        T::platform_init(self)
    }

    fn platform_deinit(&mut self) -> Result<(), Self::Error> {
        T::platform_deinit(self)
    }

    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        T::send(self, address, bytes)
    }

    fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        T::receive(self, address, buffer)
    }
}

/// [`Transport`] over a blocking `embedded-hal` I2C bus.
#[derive(Debug)]
pub struct I2cTransport<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> I2cTransport<I2C> {
    /// Wraps an I2C bus.
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

    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), Self::Error> {
        self.i2c.write(address, bytes)
    }

    fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Self::Error> {
        self.i2c.read(address, buffer)
    }
}

/// Platform init/deinit hook.
pub type PlatformFn<E> = fn() -> Result<(), E>;
/// Send hook: device address and bytes to write.
pub type SendFn<E> = fn(u8, &[u8]) -> Result<(), E>;
/// Receive hook: device address and buffer to fill.
pub type ReceiveFn<E> = fn(u8, &mut [u8]) -> Result<(), E>;

/// [`Transport`] assembled from caller-supplied functions.
///
/// The init and deinit slots are optional; an empty slot succeeds without
/// doing anything.
///
/// ```rust,ignore
/// let handler = Handler::new(board::i2c_send, board::i2c_receive)
///     .with_platform_init(board::i2c_init);
/// let mut rtc = DS1307::new(handler, Variant::Ds13072);
/// rtc.init()?;
/// ```
#[derive(Clone, Copy)]
pub struct Handler<E> {
    platform_init: Option<PlatformFn<E>>,
    platform_deinit: Option<PlatformFn<E>>,
    send: SendFn<E>,
    receive: ReceiveFn<E>,
}

impl<E> Handler<E> {
    /// Creates a handler with empty init and deinit slots.
    pub fn new(send: SendFn<E>, receive: ReceiveFn<E>) -> Self {
        Self {
            platform_init: None,
            platform_deinit: None,
            send,
            receive,
        }
    }

    /// Fills the platform init slot.
    #[must_use]
    pub fn with_platform_init(mut self, init: PlatformFn<E>) -> Self {
        self.platform_init = Some(init);
        self
    }

    /// Fills the platform deinit slot.
    #[must_use]
    pub fn with_platform_deinit(mut self, deinit: PlatformFn<E>) -> Self {
        self.platform_deinit = Some(deinit);
        self
    }
}

impl<E> Transport for Handler<E> {
    type Error = E;

    fn platform_init(&mut self) -> Result<(), E> {
        self.platform_init.map_or(Ok(()), |init| init())
    }

    fn platform_deinit(&mut self) -> Result<(), E> {
        self.platform_deinit.map_or(Ok(()), |deinit| deinit())
    }

    fn send(&mut self, address: u8, bytes: &[u8]) -> Result<(), E> {
        (self.send)(address, bytes)
    }

    fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), E> {
        (self.receive)(address, buffer)
    }
}
