//! Register definitions and bitfield structures for the DS1307 / DS13072 RTC.
//!
//! This module contains the register map, the bus address, the battery-backed
//! RAM window and the bitfield types for the time and control registers.

use bitfield::bitfield;

use crate::ParamError;

/// 7-bit bus address of the chip.
pub const DEVICE_ADDRESS: u8 = 0x68;

/// First register of the battery-backed RAM.
pub const RAM_START: u8 = RegAddr::Ram as u8;

/// Size of the battery-backed RAM in bytes. The RAM ends the register map.
pub const RAM_SIZE: u8 = 56;

/// Default size of the send buffer, including the register address byte.
pub const DEFAULT_SEND_BUFFER_SIZE: usize = 9;

/// Register addresses for the DS1307 RTC.
#[allow(unused)]
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegAddr {
    /// Seconds register (0-59) and clock halt bit
    Seconds = 0x00,
    /// Minutes register (0-59)
    Minutes = 0x01,
    /// Hours register (1-12 + AM/PM or 0-23)
    Hours = 0x02,
    /// Day of week register (1-7)
    Day = 0x03,
    /// Date register (1-31)
    Date = 0x04,
    /// Month register (1-12)
    Month = 0x05,
    /// Year register (0-99)
    Year = 0x06,
    /// Control register (SQW/OUT pin)
    Control = 0x07,
    /// First byte of the battery-backed RAM
    Ram = 0x08,
}

/// Checks a RAM window and returns its absolute start register.
///
/// `offset` is relative to [`RAM_START`]. The window must fit in the
/// [`RAM_SIZE`] bytes of RAM. An empty window is accepted.
pub fn ram_address(offset: u8, len: usize) -> Result<u8, ParamError> {
    match usize::from(offset).checked_add(len) {
        Some(end) if end <= usize::from(RAM_SIZE) => Ok(RAM_START + offset),
        _ => Err(ParamError::MemoryRange),
    }
}

/// Hour format bit of the hours register.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeRepresentation {
    /// 24-hour format (0-23)
    TwentyFourHour = 0,
    /// 12-hour format (1-12 + AM/PM)
    TwelveHour = 1,
}
impl From<u8> for TimeRepresentation {
    /// Creates a `TimeRepresentation` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is not 0 or 1.
    fn from(v: u8) -> Self {
        match v {
            0 => TimeRepresentation::TwentyFourHour,
            1 => TimeRepresentation::TwelveHour,
            _ => panic!("Invalid value for TimeRepresentation: {}", v),
        }
    }
}
impl From<TimeRepresentation> for u8 {
    /// Converts a `TimeRepresentation` to its raw register value.
    fn from(v: TimeRepresentation) -> Self {
        v as u8
    }
}

/// Square wave rate select bits (RS1:RS0) of the control register.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RateSelect {
    /// 1 Hz
    Hz1 = 0b00,
    /// 4.096 kHz
    Hz4096 = 0b01,
    /// 8.192 kHz
    Hz8192 = 0b10,
    /// 32.768 kHz
    Hz32768 = 0b11,
}
impl From<u8> for RateSelect {
    /// Creates a `RateSelect` from a raw register value.
    ///
    /// # Panics
    /// Panics if the value is wider than two bits.
    fn from(v: u8) -> Self {
        match v {
            0b00 => RateSelect::Hz1,
            0b01 => RateSelect::Hz4096,
            0b10 => RateSelect::Hz8192,
            0b11 => RateSelect::Hz32768,
            _ => panic!("Invalid value for RateSelect: {}", v),
        }
    }
}
impl From<RateSelect> for u8 {
    /// Converts a `RateSelect` to its raw register value.
    fn from(v: RateSelect) -> Self {
        v as u8
    }
}

/// State of the SQW/OUT pin.
///
/// The numeric codes (`0..=5`) follow the order the modes are listed in and
/// are accepted by [`OutWave::try_from`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutWave {
    /// Logic level 0 on the pin
    Low = 0,
    /// Logic level 1 on the pin
    High = 1,
    /// 1 Hz square wave
    Hz1 = 2,
    /// 4.096 kHz square wave
    Hz4096 = 3,
    /// 8.192 kHz square wave
    Hz8192 = 4,
    /// 32.768 kHz square wave
    Hz32768 = 5,
}

impl TryFrom<u8> for OutWave {
    type Error = ParamError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(OutWave::Low),
            1 => Ok(OutWave::High),
            2 => Ok(OutWave::Hz1),
            3 => Ok(OutWave::Hz4096),
            4 => Ok(OutWave::Hz8192),
            5 => Ok(OutWave::Hz32768),
            _ => Err(ParamError::OutWave),
        }
    }
}

impl From<OutWave> for Control {
    fn from(wave: OutWave) -> Self {
        let mut control = Control::default();
        let rate = match wave {
            OutWave::Low => return control,
            OutWave::High => {
                control.set_out(true);
                return control;
            }
            OutWave::Hz1 => RateSelect::Hz1,
            OutWave::Hz4096 => RateSelect::Hz4096,
            OutWave::Hz8192 => RateSelect::Hz8192,
            OutWave::Hz32768 => RateSelect::Hz32768,
        };
        control.set_square_wave_enable(true);
        control.set_rate_select(rate);
        control
    }
}

impl From<Control> for OutWave {
    /// Decodes the pin state. Rate bits are ignored while SQWE is clear.
    fn from(control: Control) -> Self {
        if !control.square_wave_enable() {
            return if control.out() {
                OutWave::High
            } else {
                OutWave::Low
            };
        }
        match control.rate_select() {
            RateSelect::Hz1 => OutWave::Hz1,
            RateSelect::Hz4096 => OutWave::Hz4096,
            RateSelect::Hz8192 => OutWave::Hz8192,
            RateSelect::Hz32768 => OutWave::Hz32768,
        }
    }
}

// This macro generates the From<u8> and Into<u8> implementations for the
// register type
macro_rules! from_register_u8 {
    ($typ:ty) => {
        impl From<u8> for $typ {
            fn from(v: u8) -> Self {
                paste::paste!([< $typ >](v))
            }
        }
        impl From<$typ> for u8 {
            fn from(v: $typ) -> Self {
                v.0
            }
        }
    };
}

bitfield! {
    /// Seconds register (0-59) with BCD encoding and the clock halt bit.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Seconds(u8);
    impl Debug;
    /// Clock halt; the oscillator stops while set
    pub clock_halt, set_clock_halt: 7;
    /// Tens place of seconds (0-5)
    pub ten_seconds, set_ten_seconds: 6, 4;
    /// Ones place of seconds (0-9)
    pub seconds, set_seconds: 3, 0;
}
from_register_u8!(Seconds);

#[cfg(feature = "defmt")]
impl defmt::Format for Seconds {
    fn format(&self, f: defmt::Formatter) {
        let seconds = 10 * self.ten_seconds() + self.seconds();
        defmt::write!(f, "Seconds({}s", seconds);
        if self.clock_halt() {
            defmt::write!(f, ", halted");
        }
        defmt::write!(f, ")");
    }
}

bitfield! {
    /// Minutes register (0-59) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Minutes(u8);
    impl Debug;
    /// Tens place of minutes (0-5)
    pub ten_minutes, set_ten_minutes: 6, 4;
    /// Ones place of minutes (0-9)
    pub minutes, set_minutes: 3, 0;
}
from_register_u8!(Minutes);

#[cfg(feature = "defmt")]
impl defmt::Format for Minutes {
    fn format(&self, f: defmt::Formatter) {
        let minutes = 10 * self.ten_minutes() + self.minutes();
        defmt::write!(f, "Minutes({}m)", minutes);
    }
}

bitfield! {
    /// Hours register with format selection and BCD encoding.
    ///
    /// In 12-hour format the hour lives in bits 4..0; in 24-hour format it
    /// spans bits 5..0.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Hours(u8);
    impl Debug;
    /// Time representation format (12/24 hour)
    pub from into TimeRepresentation, time_representation, set_time_representation: 7, 7;
    /// PM flag, meaningful in 12-hour format only
    pub pm, set_pm: 6;
    /// BCD hour in 24-hour format
    pub hours_24, set_hours_24: 5, 0;
    /// BCD hour in 12-hour format
    pub hours_12, set_hours_12: 4, 0;
}
from_register_u8!(Hours);

#[cfg(feature = "defmt")]
impl defmt::Format for Hours {
    fn format(&self, f: defmt::Formatter) {
        match self.time_representation() {
            TimeRepresentation::TwentyFourHour => {
                defmt::write!(f, "Hours({=u8:x}h 24h)", self.hours_24());
            }
            TimeRepresentation::TwelveHour => {
                let meridiem = if self.pm() { "PM" } else { "AM" };
                defmt::write!(f, "Hours({=u8:x}h {})", self.hours_12(), meridiem);
            }
        }
    }
}

bitfield! {
    /// Day of week register (1-7).
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Day(u8);
    impl Debug;
    /// Day of week (1-7)
    pub day, set_day: 2, 0;
}
from_register_u8!(Day);

#[cfg(feature = "defmt")]
impl defmt::Format for Day {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Day({})", self.day());
    }
}

bitfield! {
    /// Date register (1-31) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Date(u8);
    impl Debug;
    /// Tens place of date (0-3)
    pub ten_date, set_ten_date: 5, 4;
    /// Ones place of date (0-9)
    pub date, set_date: 3, 0;
}
from_register_u8!(Date);

#[cfg(feature = "defmt")]
impl defmt::Format for Date {
    fn format(&self, f: defmt::Formatter) {
        let date = 10 * self.ten_date() + self.date();
        defmt::write!(f, "Date({})", date);
    }
}

bitfield! {
    /// Month register (1-12) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Month(u8);
    impl Debug;
    /// Tens place of month (0-1)
    pub ten_month, set_ten_month: 4, 4;
    /// Ones place of month (0-9)
    pub month, set_month: 3, 0;
}
from_register_u8!(Month);

#[cfg(feature = "defmt")]
impl defmt::Format for Month {
    fn format(&self, f: defmt::Formatter) {
        let month = 10 * self.ten_month() + self.month();
        defmt::write!(f, "Month({})", month);
    }
}

bitfield! {
    /// Year register (0-99) with BCD encoding.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Year(u8);
    impl Debug;
    /// Tens place of year (0-9)
    pub ten_year, set_ten_year: 7, 4;
    /// Ones place of year (0-9)
    pub year, set_year: 3, 0;
}
from_register_u8!(Year);

#[cfg(feature = "defmt")]
impl defmt::Format for Year {
    fn format(&self, f: defmt::Formatter) {
        let year = 10 * self.ten_year() + self.year();
        defmt::write!(f, "Year({})", year);
    }
}

bitfield! {
    /// Control register for the SQW/OUT pin.
    #[derive(Clone, Copy, Default, PartialEq)]
    pub struct Control(u8);
    impl Debug;
    /// Static pin level while the square wave is disabled
    pub out, set_out: 7;
    /// Square wave enable
    pub square_wave_enable, set_square_wave_enable: 4;
    /// Square wave frequency selection
    pub from into RateSelect, rate_select, set_rate_select: 1, 0;
}
from_register_u8!(Control);

#[cfg(feature = "defmt")]
impl defmt::Format for Control {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Control({})", OutWave::from(*self));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_representation_conversions() {
        assert_eq!(
            TimeRepresentation::from(0),
            TimeRepresentation::TwentyFourHour
        );
        assert_eq!(TimeRepresentation::from(1), TimeRepresentation::TwelveHour);
        assert_eq!(u8::from(TimeRepresentation::TwentyFourHour), 0);
        assert_eq!(u8::from(TimeRepresentation::TwelveHour), 1);
    }

    #[test]
    #[should_panic(expected = "Invalid value for TimeRepresentation: 2")]
    fn test_invalid_time_representation_conversion() {
        let _ = TimeRepresentation::from(2);
    }

    #[test]
    #[should_panic(expected = "Invalid value for RateSelect: 4")]
    fn test_invalid_rate_select_conversion() {
        let _ = RateSelect::from(4);
    }

    #[test]
    fn test_seconds_register_conversions() {
        let seconds = Seconds::from(0x59);
        assert!(!seconds.clock_halt());
        assert_eq!(seconds.ten_seconds(), 5);
        assert_eq!(seconds.seconds(), 9);
        assert_eq!(u8::from(seconds), 0x59);

        // Clock halt bit does not leak into the tens digit
        let halted = Seconds::from(0xB0);
        assert!(halted.clock_halt());
        assert_eq!(halted.ten_seconds(), 3);
        assert_eq!(halted.seconds(), 0);
    }

    #[test]
    fn test_hours_register_conversions() {
        // 24-hour mode, 23h
        let hours = Hours::from(0x23);
        assert_eq!(
            hours.time_representation(),
            TimeRepresentation::TwentyFourHour
        );
        assert!(!hours.pm());
        assert_eq!(hours.hours_24(), 0x23);

        // 12-hour mode, 5 PM
        let hours = Hours::from(0b1110_0101);
        assert_eq!(hours.time_representation(), TimeRepresentation::TwelveHour);
        assert!(hours.pm());
        assert_eq!(hours.hours_12(), 0x05);

        let mut hours = Hours::default();
        hours.set_time_representation(TimeRepresentation::TwelveHour);
        hours.set_pm(true);
        hours.set_hours_12(0x12);
        assert_eq!(u8::from(hours), 0b1101_0010);
    }

    #[test]
    fn test_date_month_year_register_conversions() {
        let date = Date::from(0x31);
        assert_eq!(date.ten_date(), 3);
        assert_eq!(date.date(), 1);

        let month = Month::from(0x12);
        assert_eq!(month.ten_month(), 1);
        assert_eq!(month.month(), 2);

        let year = Year::from(0x99);
        assert_eq!(year.ten_year(), 9);
        assert_eq!(year.year(), 9);

        let day = Day::from(0x07);
        assert_eq!(day.day(), 7);
    }

    #[test]
    fn test_out_wave_control_bits() {
        assert_eq!(u8::from(Control::from(OutWave::Low)), 0b0000_0000);
        assert_eq!(u8::from(Control::from(OutWave::High)), 0b1000_0000);
        assert_eq!(u8::from(Control::from(OutWave::Hz1)), 0b0001_0000);
        assert_eq!(u8::from(Control::from(OutWave::Hz4096)), 0b0001_0001);
        assert_eq!(u8::from(Control::from(OutWave::Hz8192)), 0b0001_0010);
        assert_eq!(u8::from(Control::from(OutWave::Hz32768)), 0b0001_0011);
    }

    #[test]
    fn test_out_wave_decode_from_control() {
        for wave in [
            OutWave::Low,
            OutWave::High,
            OutWave::Hz1,
            OutWave::Hz4096,
            OutWave::Hz8192,
            OutWave::Hz32768,
        ] {
            assert_eq!(OutWave::from(Control::from(wave)), wave);
        }
        // Rate bits without SQWE leave the pin static
        assert_eq!(OutWave::from(Control::from(0b1000_0011)), OutWave::High);
        assert_eq!(OutWave::from(Control::from(0b0000_0010)), OutWave::Low);
    }

    #[test]
    fn test_out_wave_codes() {
        assert_eq!(OutWave::try_from(0), Ok(OutWave::Low));
        assert_eq!(OutWave::try_from(5), Ok(OutWave::Hz32768));
        assert_eq!(OutWave::try_from(6), Err(ParamError::OutWave));
        assert_eq!(OutWave::try_from(0xFF), Err(ParamError::OutWave));
    }

    #[test]
    fn test_ram_window() {
        assert_eq!(RAM_START, 0x08);
        assert_eq!(RAM_START + RAM_SIZE, 0x40);
        assert_eq!(ram_address(0, usize::from(RAM_SIZE)), Ok(RAM_START));
        assert_eq!(ram_address(0, 56), Ok(0x08));
        assert_eq!(ram_address(55, 1), Ok(0x3F));
        assert_eq!(ram_address(55, 2), Err(ParamError::MemoryRange));
        assert_eq!(ram_address(56, 1), Err(ParamError::MemoryRange));
        assert_eq!(ram_address(0, 57), Err(ParamError::MemoryRange));
        assert_eq!(ram_address(0xFF, 0), Err(ParamError::MemoryRange));
        // Empty window at the very end is still inside the register map
        assert_eq!(ram_address(56, 0), Ok(0x40));
        assert_eq!(ram_address(0, usize::MAX), Err(ParamError::MemoryRange));
    }
}
