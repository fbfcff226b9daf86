//! `DateTime` conversion and register utilities for the DS1307 RTC.
//!
//! This module provides the caller-facing [`DS1307DateTime`] record and the
//! conversion logic between it and the chip's seven BCD-encoded time
//! registers.
//!
//! # Register Model
//!
//! The chip stores date and time in 7 consecutive registers starting at 0x00:
//! - Seconds, Minutes, Hours, Day, Date, Month, Year
//!
//! The DS13072 variant additionally keeps a 12/24-hour flag (bit 7) and an
//! AM/PM flag (bit 6) in the hours register. The plain DS1307 variant always
//! runs in 24-hour mode.
//!
//! # Validation
//!
//! Every field is range checked before anything is encoded. Violations are
//! reported as the [`ParamError`] naming the offending field.

use core::ops::RangeInclusive;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

use crate::registers::{Date, Day, Hours, Minutes, Month, Seconds, TimeRepresentation, Year};
use crate::{ParamError, Variant};

/// Hour format of a [`DS1307DateTime`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HourMode {
    /// `hour` is in 0-23
    #[default]
    TwentyFourHour,
    /// `hour` is in 1-12
    TwelveHour {
        /// Afternoon flag
        pm: bool,
    },
}

/// Wall-clock date and time as stored by the chip.
///
/// `year` is two digits (0-99) with an implicit 2000 epoch. `weekday` (1-7)
/// is a free-running counter; its mapping to named days is up to the caller.
/// The `chrono` conversions use 1 = Sunday.
///
/// The plain DS1307 only accepts and reports [`HourMode::TwentyFourHour`].
/// The default record is 2000-01-01 00:00:00, a Saturday.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DS1307DateTime {
    /// Seconds (0-59)
    pub second: u8,
    /// Minutes (0-59)
    pub minute: u8,
    /// Hours, 0-23 or 1-12 depending on `hour_mode`
    pub hour: u8,
    /// Day of week (1-7)
    pub weekday: u8,
    /// Day of month (1-31)
    pub day: u8,
    /// Month (1-12)
    pub month: u8,
    /// Year within the century (0-99)
    pub year: u8,
    /// Hour format
    pub hour_mode: HourMode,
}

impl Default for DS1307DateTime {
    fn default() -> Self {
        DS1307DateTime {
            second: 0,
            minute: 0,
            hour: 0,
            weekday: 7,
            day: 1,
            month: 1,
            year: 0,
            hour_mode: HourMode::TwentyFourHour,
        }
    }
}

impl DS1307DateTime {
    /// Converts a chrono date-time using the requested hour format.
    ///
    /// # Errors
    /// Returns [`ParamError::Year`] for years outside 2000-2099.
    pub fn from_naive(
        datetime: &NaiveDateTime,
        time_representation: TimeRepresentation,
    ) -> Result<Self, ParamError> {
        let year = datetime
            .year()
            .checked_sub(2000)
            .and_then(|offset| u8::try_from(offset).ok())
            .filter(|offset| *offset <= 99)
            .ok_or(ParamError::Year)?;
        let hour = narrow(datetime.hour(), ParamError::Hour)?;
        let (hour, hour_mode) = match time_representation {
            TimeRepresentation::TwentyFourHour => (hour, HourMode::TwentyFourHour),
            TimeRepresentation::TwelveHour => {
                let (hour12, pm) = match hour {
                    0 => (12, false),
                    1..=11 => (hour, false),
                    12 => (12, true),
                    _ => (hour - 12, true),
                };
                (hour12, HourMode::TwelveHour { pm })
            }
        };
        Ok(DS1307DateTime {
            second: narrow(datetime.second(), ParamError::Second)?,
            minute: narrow(datetime.minute(), ParamError::Minute)?,
            hour,
            weekday: narrow(datetime.weekday().number_from_sunday(), ParamError::WeekDay)?,
            day: narrow(datetime.day(), ParamError::Day)?,
            month: narrow(datetime.month(), ParamError::Month)?,
            year,
            hour_mode,
        })
    }

    /// Hour in 24-hour format.
    ///
    /// # Errors
    /// Returns [`ParamError::Hour`] when `hour` is outside the range of its
    /// format.
    pub fn hour_24(&self) -> Result<u8, ParamError> {
        match self.hour_mode {
            HourMode::TwentyFourHour => {
                check(self.hour, 0..=23, ParamError::Hour)?;
                Ok(self.hour)
            }
            HourMode::TwelveHour { pm } => {
                check(self.hour, 1..=12, ParamError::Hour)?;
                Ok(match (self.hour, pm) {
                    (12, false) => 0,
                    (12, true) => 12,
                    (h, false) => h,
                    (h, true) => h + 12,
                })
            }
        }
    }
}

impl TryFrom<&NaiveDateTime> for DS1307DateTime {
    type Error = ParamError;

    fn try_from(datetime: &NaiveDateTime) -> Result<Self, Self::Error> {
        DS1307DateTime::from_naive(datetime, TimeRepresentation::TwentyFourHour)
    }
}

impl TryFrom<&DS1307DateTime> for NaiveDateTime {
    type Error = ParamError;

    /// The weekday field is not checked against the calendar.
    fn try_from(datetime: &DS1307DateTime) -> Result<Self, Self::Error> {
        check(datetime.second, 0..=59, ParamError::Second)?;
        check(datetime.minute, 0..=59, ParamError::Minute)?;
        let hour = datetime.hour_24()?;
        check(datetime.month, 1..=12, ParamError::Month)?;
        check(datetime.year, 0..=99, ParamError::Year)?;
        NaiveDate::from_ymd_opt(
            2000 + i32::from(datetime.year),
            u32::from(datetime.month),
            u32::from(datetime.day),
        )
        .and_then(|date| {
            date.and_hms_opt(
                u32::from(hour),
                u32::from(datetime.minute),
                u32::from(datetime.second),
            )
        })
        .ok_or(ParamError::Day)
    }
}

/// Packs a decimal value (0-99) into binary-coded decimal.
pub(crate) fn dec_to_bcd(value: u8) -> u8 {
    (((value / 10) % 10) << 4) | (value % 10)
}

/// Unpacks a binary-coded decimal byte. Nibbles above 9 are not rejected.
pub(crate) fn bcd_to_dec(bcd: u8) -> u8 {
    (bcd >> 4) * 10 + (bcd & 0x0F)
}

fn check(value: u8, range: RangeInclusive<u8>, field: ParamError) -> Result<(), ParamError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(field)
    }
}

fn narrow(value: u32, field: ParamError) -> Result<u8, ParamError> {
    u8::try_from(value).map_err(|_| field)
}

/// The seven time registers as read from or written to the chip.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) struct RawDateTime {
    seconds: Seconds,
    minutes: Minutes,
    hours: Hours,
    day: Day,
    date: Date,
    month: Month,
    year: Year,
}

impl RawDateTime {
    /// Helper function to convert a number to BCD format with validation
    fn make_bcd(value: u8, range: RangeInclusive<u8>, field: ParamError) -> Result<u8, ParamError> {
        check(value, range, field)?;
        Ok(dec_to_bcd(value))
    }

    fn convert_seconds(second: u8) -> Result<Seconds, ParamError> {
        let mut value = Seconds(Self::make_bcd(second, 0..=59, ParamError::Second)?);
        // keep the oscillator running
        value.set_clock_halt(false);
        Ok(value)
    }

    fn convert_hours(hour: u8, mode: HourMode) -> Result<Hours, ParamError> {
        let mut value = Hours::default();
        match mode {
            HourMode::TwentyFourHour => {
                value.set_hours_24(Self::make_bcd(hour, 0..=23, ParamError::Hour)?);
            }
            HourMode::TwelveHour { pm } => {
                value.set_hours_12(Self::make_bcd(hour, 1..=12, ParamError::Hour)?);
                value.set_time_representation(TimeRepresentation::TwelveHour);
                value.set_pm(pm);
            }
        }
        Ok(value)
    }

    /// Validates and encodes a record for the given chip variant.
    pub(crate) fn from_datetime(
        datetime: &DS1307DateTime,
        variant: Variant,
    ) -> Result<Self, ParamError> {
        if variant == Variant::Ds1307 && datetime.hour_mode != HourMode::TwentyFourHour {
            return Err(ParamError::HourMode);
        }

        let seconds = Self::convert_seconds(datetime.second)?;
        let minutes = Minutes(Self::make_bcd(datetime.minute, 0..=59, ParamError::Minute)?);
        let hours = Self::convert_hours(datetime.hour, datetime.hour_mode)?;
        let day = Day(Self::make_bcd(datetime.weekday, 1..=7, ParamError::WeekDay)?);
        let date = Date(Self::make_bcd(datetime.day, 1..=31, ParamError::Day)?);
        let month = Month(Self::make_bcd(datetime.month, 1..=12, ParamError::Month)?);
        let year = Year(Self::make_bcd(datetime.year, 0..=99, ParamError::Year)?);

        let raw = RawDateTime {
            seconds,
            minutes,
            hours,
            day,
            date,
            month,
            year,
        };

        debug!("raw={:?}", raw);

        Ok(raw)
    }

    /// Decodes the registers. Values are taken as-is, without range checks.
    pub(crate) fn into_datetime(self, variant: Variant) -> DS1307DateTime {
        let second = bcd_to_dec(u8::from(self.seconds) & 0x7F);
        let (hour, hour_mode) = match variant {
            Variant::Ds1307 => (bcd_to_dec(self.hours.hours_24()), HourMode::TwentyFourHour),
            Variant::Ds13072 => match self.hours.time_representation() {
                TimeRepresentation::TwelveHour => (
                    bcd_to_dec(self.hours.hours_12()),
                    HourMode::TwelveHour {
                        pm: self.hours.pm(),
                    },
                ),
                TimeRepresentation::TwentyFourHour => (
                    bcd_to_dec(self.hours.hours_24()),
                    HourMode::TwentyFourHour,
                ),
            },
        };
        debug!("raw_hour={:?} h={} s={}", self.hours, hour, second);

        DS1307DateTime {
            second,
            minute: bcd_to_dec(self.minutes.into()),
            hour,
            weekday: bcd_to_dec(self.day.into()),
            day: bcd_to_dec(self.date.into()),
            month: bcd_to_dec(self.month.into()),
            year: bcd_to_dec(self.year.into()),
            hour_mode,
        }
    }
}

impl From<[u8; 7]> for RawDateTime {
    fn from(data: [u8; 7]) -> Self {
        RawDateTime {
            seconds: Seconds(data[0]),
            minutes: Minutes(data[1]),
            hours: Hours(data[2]),
            day: Day(data[3]),
            date: Date(data[4]),
            month: Month(data[5]),
            year: Year(data[6]),
        }
    }
}

impl From<&RawDateTime> for [u8; 7] {
    fn from(dt: &RawDateTime) -> [u8; 7] {
        [
            dt.seconds.0,
            dt.minutes.0,
            dt.hours.0,
            dt.day.0,
            dt.date.0,
            dt.month.0,
            dt.year.0,
        ]
    }
}
