//! Decoding of one activity out of the memory image.
//!
//! An activity starts on a page boundary with a summary record, followed at
//! +0x40 by one record per lap. Its samples start one page later. Samples
//! come in four shapes: full and empty samples carry an absolute
//! timestamp, short and no-data samples only minute and second, and short
//! samples store position as a delta to the previous one.

use bilge::prelude::*;
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use log::trace;

use crate::activity::{ActivityRecord, ActivitySummary, GpsPoint, Lap};
use crate::error::DecodeError;
use crate::layout::{Field, Layout};

/// Lap records follow the summary at this distance.
pub const LAPS_OFFSET: usize = 0x40;
/// Samples start one page after the summary.
pub const SAMPLES_OFFSET: usize = 0x1000;

pub const TAG_FULL: u8 = 0x00;
pub const TAG_FULL_ALT: u8 = 0x80;
pub const TAG_SHORT: u8 = 0x01;
pub const TAG_NO_DATA: u8 = 0x02;
pub const TAG_EMPTY: u8 = 0x03;
pub const TAG_END: u8 = 0xFF;

/// Positions are stored in 1e-7 degrees.
const DEGREE_SCALE: f64 = 10_000_000.0;

mod summary {
    use super::{Field, Layout};

    pub const LAYOUT: Layout = Layout::new("summary", 47);
    pub const SAMPLE_COUNT: Field = Field::le("sample_count", 0, 2);
    pub const LAP_COUNT: Field = Field::le("lap_count", 2, 1);
    pub const START: Field = Field::bytes("start", 3, 6);
    pub const ELAPSED: Field = Field::bytes("elapsed", 9, 3);
    pub const DISTANCE: Field = Field::le("distance", 16, 4);
    pub const AVERAGE_SPEED: Field = Field::le("average_speed", 20, 2);
    pub const MAX_SPEED: Field = Field::le("max_speed", 22, 2);
    pub const AVERAGE_HEART_RATE: Field = Field::le("average_heart_rate", 28, 1);
    pub const MAX_HEART_RATE: Field = Field::le("max_heart_rate", 29, 1);
    pub const MIN_HEART_RATE: Field = Field::le("min_heart_rate", 30, 1);
    pub const CALORIES: Field = Field::le("calories", 32, 4);
    pub const BELOW_ZONE: Field = Field::bytes("time_below_zone", 36, 3);
    pub const IN_ZONE: Field = Field::bytes("time_in_zone", 40, 3);
    pub const ABOVE_ZONE: Field = Field::bytes("time_above_zone", 44, 3);
}

mod lap {
    use super::{Field, Layout};

    pub const LAYOUT: Layout = Layout::new("lap", 16);
    pub const SPLIT: Field = Field::bytes("split", 0, 4);
    pub const AVERAGE_HEART_RATE: Field = Field::le("average_heart_rate", 4, 1);
    pub const DISTANCE: Field = Field::le("distance", 8, 4);
}

mod tag {
    use super::{Field, Layout};

    pub const LAYOUT: Layout = Layout::new("sample tag", 1);
    pub const TAG: Field = Field::le("tag", 0, 1);
}

mod full {
    use super::{Field, Layout};

    pub const LAYOUT: Layout = Layout::new("full sample", 25);
    pub const STATUS: Field = Field::le("status", 1, 1);
    pub const TIME: Field = Field::bytes("time", 2, 6);
    pub const LONGITUDE: Field = Field::le("longitude", 8, 4);
    pub const LATITUDE: Field = Field::le("latitude", 12, 4);
    pub const ALTITUDE: Field = Field::le("altitude", 16, 2);
    pub const HEADING: Field = Field::le("heading", 18, 2);
    pub const DISTANCE: Field = Field::le("distance", 20, 2);
    pub const SPEED: Field = Field::le("speed", 22, 2);
    pub const HEART_RATE: Field = Field::le("heart_rate", 24, 1);
}

mod short {
    use super::{Field, Layout};

    pub const LAYOUT: Layout = Layout::new("short sample", 21);
    pub const STATUS: Field = Field::le("status", 1, 1);
    pub const TIME: Field = Field::bytes("time", 2, 2);
    pub const LONGITUDE: Field = Field::le("d_longitude", 4, 4);
    pub const LATITUDE: Field = Field::le("d_latitude", 8, 4);
    pub const ALTITUDE: Field = Field::le("d_altitude", 12, 2);
    pub const HEADING: Field = Field::le("heading", 14, 2);
    pub const DISTANCE: Field = Field::le("d_distance", 16, 2);
    pub const SPEED: Field = Field::le("speed", 18, 2);
    pub const HEART_RATE: Field = Field::le("heart_rate", 20, 1);
}

mod empty {
    use super::{Field, Layout};

    pub const LAYOUT: Layout = Layout::new("empty sample", 8);
    pub const TIME: Field = Field::bytes("time", 1, 6);
    pub const HEART_RATE: Field = Field::le("heart_rate", 7, 1);
}

mod no_data {
    use super::{Field, Layout};

    pub const LAYOUT: Layout = Layout::new("no-data sample", 3);
    pub const TIME: Field = Field::bytes("time", 1, 2);
}

/// Satellite/status byte of a GPS sample.
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct SatStatus {
    pub satellites: u4,
    pub flags: u4,
}

impl SatStatus {
    pub fn has_fix(&self) -> bool {
        self.satellites().value() != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Full {
        status: SatStatus,
        time: NaiveDateTime,
        longitude: i32,
        latitude: i32,
        altitude: i16,
        heading: u16,
        distance: u16,
        speed: u16,
        heart_rate: u8,
    },
    Short {
        status: SatStatus,
        minute: u8,
        second: u8,
        d_longitude: i32,
        d_latitude: i32,
        d_altitude: i16,
        heading: u16,
        d_distance: u16,
        speed: u16,
        heart_rate: u8,
    },
    Empty {
        time: NaiveDateTime,
        heart_rate: u8,
    },
    NoData {
        minute: u8,
        second: u8,
    },
}

impl Sample {
    /// Bytes this sample occupies, tag included.
    pub fn size(&self) -> usize {
        match self {
            Sample::Full { .. } => full::LAYOUT.size,
            Sample::Short { .. } => short::LAYOUT.size,
            Sample::Empty { .. } => empty::LAYOUT.size,
            Sample::NoData { .. } => no_data::LAYOUT.size,
        }
    }
}

/// Running absolute time and position that delta samples apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeCursor {
    pub time: NaiveDateTime,
    pub longitude: i32,
    pub latitude: i32,
    pub altitude: i16,
}

impl DecodeCursor {
    pub fn new(start: NaiveDateTime) -> DecodeCursor {
        DecodeCursor {
            time: start,
            longitude: 0,
            latitude: 0,
            altitude: 0,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint {
            latitude: f64::from(self.latitude) / DEGREE_SCALE,
            longitude: f64::from(self.longitude) / DEGREE_SCALE,
            altitude: f32::from(self.altitude),
        }
    }
}

/// What one sample adds to the activity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutput {
    pub time: NaiveDateTime,
    pub heart_rate: Option<u8>,
    pub position: Option<GpsPoint>,
}

pub fn bcd_to_binary(bcd: u8) -> u8 {
    10 * (bcd >> 4) + (bcd & 0x0F)
}

fn timestamp(
    field: &'static str,
    year_offset: u8,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
) -> Result<NaiveDateTime, DecodeError> {
    let year = 2000 + u16::from(year_offset);
    NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .and_then(|d| d.and_hms_opt(u32::from(hour), u32::from(minute), u32::from(second)))
        .ok_or(DecodeError::InvalidTimestamp {
            field,
            year,
            month,
            day,
            hour,
            minute,
            second,
        })
}

fn hms([hour, minute, second]: [u8; 3]) -> TimeDelta {
    TimeDelta::seconds(i64::from(hour) * 3600 + i64::from(minute) * 60 + i64::from(second))
}

/// Summary durations are stored seconds first, like the start time.
fn hms_le([second, minute, hour]: [u8; 3]) -> TimeDelta {
    hms([hour, minute, second])
}

/// Lap split time: whole hours, minutes, seconds and BCD hundredths.
pub fn split_time([hour, minute, second, hundredths]: [u8; 4]) -> TimeDelta {
    hms([hour, minute, second]) + TimeDelta::milliseconds(10 * i64::from(bcd_to_binary(hundredths)))
}

/// Apply a `{minute, second}` update to the previous timestamp.
///
/// Same minute: only the second changes. Any other minute: the second is
/// replaced and exactly one minute is added, carrying into hour and day.
pub fn advance_time(
    prev: NaiveDateTime,
    minute: u8,
    second: u8,
) -> Result<NaiveDateTime, DecodeError> {
    let invalid = || DecodeError::InvalidTimestamp {
        field: "sample",
        year: prev.year() as u16,
        month: prev.month() as u8,
        day: prev.day() as u8,
        hour: prev.hour() as u8,
        minute,
        second,
    };
    let replaced = prev.with_second(u32::from(second)).ok_or_else(invalid)?;
    // TODO: gaps over a minute between compact samples drift; needs firmware docs
    if u32::from(minute) == prev.minute() {
        Ok(replaced)
    } else {
        replaced
            .checked_add_signed(TimeDelta::minutes(1))
            .ok_or_else(invalid)
    }
}

pub fn decode_summary(image: &[u8], offset: usize) -> Result<ActivitySummary, DecodeError> {
    use summary::*;

    let r = LAYOUT.record(image, offset)?;
    let [sec, min, hour, day, month, year] = r.array(START)?;
    Ok(ActivitySummary {
        sample_count: r.u16(SAMPLE_COUNT)?,
        lap_count: r.u8(LAP_COUNT)?,
        start: timestamp("start", year, month, day, hour, min, sec)?,
        elapsed: hms_le(r.array(ELAPSED)?),
        distance: r.u32(DISTANCE)? as f32 / 10.0,
        calories: r.u32(CALORIES)? as f32 / 100.0,
        average_speed: r.u16(AVERAGE_SPEED)?,
        max_speed: r.u16(MAX_SPEED)?,
        average_heart_rate: r.u8(AVERAGE_HEART_RATE)?,
        max_heart_rate: r.u8(MAX_HEART_RATE)?,
        min_heart_rate: r.u8(MIN_HEART_RATE)?,
        time_below_zone: hms_le(r.array(BELOW_ZONE)?),
        time_in_zone: hms_le(r.array(IN_ZONE)?),
        time_above_zone: hms_le(r.array(ABOVE_ZONE)?),
    })
}

/// Laps as consecutive intervals; each lap ends at start + split.
pub fn decode_laps(
    image: &[u8],
    offset: usize,
    summary: &ActivitySummary,
) -> Result<Vec<Lap>, DecodeError> {
    let base = offset.saturating_add(LAPS_OFFSET);
    let mut laps = Vec::with_capacity(usize::from(summary.lap_count));
    let mut lap_start = summary.start;
    for i in 0..usize::from(summary.lap_count) {
        let r = lap::LAYOUT.record(image, base.saturating_add(i * lap::LAYOUT.size))?;
        let split = split_time(r.array(lap::SPLIT)?);
        let end = summary.start + split;
        laps.push(Lap {
            start: lap_start,
            duration: end.signed_duration_since(lap_start),
            distance: r.u32(lap::DISTANCE)? as f32 / 10.0,
            average_heart_rate: r.u8(lap::AVERAGE_HEART_RATE)?,
        });
        lap_start = end;
    }
    Ok(laps)
}

/// Decode the sample at `offset`. `None` for the end marker or a tag this
/// decoder does not know.
pub fn decode_sample(image: &[u8], offset: usize) -> Result<Option<Sample>, DecodeError> {
    let tag = tag::LAYOUT.record(image, offset)?.u8(tag::TAG)?;
    let sample = match tag {
        TAG_FULL | TAG_FULL_ALT => {
            use full::*;
            let r = LAYOUT.record(image, offset)?;
            let [year, month, day, hour, min, sec] = r.array(TIME)?;
            Sample::Full {
                status: SatStatus::from(r.u8(STATUS)?),
                time: timestamp("sample", year, month, day, hour, min, sec)?,
                longitude: r.i32(LONGITUDE)?,
                latitude: r.i32(LATITUDE)?,
                altitude: r.i16(ALTITUDE)?,
                heading: r.u16(HEADING)?,
                distance: r.u16(DISTANCE)?,
                speed: r.u16(SPEED)?,
                heart_rate: r.u8(HEART_RATE)?,
            }
        }
        TAG_SHORT => {
            use short::*;
            let r = LAYOUT.record(image, offset)?;
            let [minute, second] = r.array(TIME)?;
            Sample::Short {
                status: SatStatus::from(r.u8(STATUS)?),
                minute,
                second,
                d_longitude: r.i32(LONGITUDE)?,
                d_latitude: r.i32(LATITUDE)?,
                d_altitude: r.i16(ALTITUDE)?,
                heading: r.u16(HEADING)?,
                d_distance: r.u16(DISTANCE)?,
                speed: r.u16(SPEED)?,
                heart_rate: r.u8(HEART_RATE)?,
            }
        }
        TAG_EMPTY => {
            use empty::*;
            let r = LAYOUT.record(image, offset)?;
            let [year, month, day, hour, min, sec] = r.array(TIME)?;
            Sample::Empty {
                time: timestamp("sample", year, month, day, hour, min, sec)?,
                heart_rate: r.u8(HEART_RATE)?,
            }
        }
        TAG_NO_DATA => {
            let r = no_data::LAYOUT.record(image, offset)?;
            let [minute, second] = r.array(no_data::TIME)?;
            Sample::NoData { minute, second }
        }
        _ => return Ok(None),
    };
    Ok(Some(sample))
}

/// One step of the sample fold: the cursor before, the cursor after and
/// what the sample contributes.
pub fn step(
    cursor: DecodeCursor,
    sample: &Sample,
) -> Result<(DecodeCursor, SampleOutput), DecodeError> {
    let heart = |bpm: u8| (bpm > 0).then_some(bpm);
    let (next, heart_rate, fix) = match *sample {
        Sample::Full {
            status,
            time,
            longitude,
            latitude,
            altitude,
            heart_rate,
            ..
        } => {
            let next = DecodeCursor {
                time,
                longitude,
                latitude,
                altitude,
            };
            (next, heart(heart_rate), status.has_fix())
        }
        Sample::Short {
            status,
            minute,
            second,
            d_longitude,
            d_latitude,
            d_altitude,
            heart_rate,
            ..
        } => {
            let next = DecodeCursor {
                time: advance_time(cursor.time, minute, second)?,
                longitude: cursor.longitude.wrapping_add(d_longitude),
                latitude: cursor.latitude.wrapping_add(d_latitude),
                altitude: cursor.altitude.wrapping_add(d_altitude),
            };
            (next, heart(heart_rate), status.has_fix())
        }
        Sample::Empty { time, heart_rate } => {
            (DecodeCursor { time, ..cursor }, heart(heart_rate), false)
        }
        Sample::NoData { minute, second } => {
            let time = advance_time(cursor.time, minute, second)?;
            (DecodeCursor { time, ..cursor }, None, false)
        }
    };
    let output = SampleOutput {
        time: next.time,
        heart_rate,
        position: fix.then(|| next.point()),
    };
    Ok((next, output))
}

/// Decode the activity whose summary starts at `offset`.
///
/// Any record reaching past the image fails the whole activity. The sample
/// loop ends early, without error, at the end marker or an unknown tag.
pub fn decode(image: &[u8], offset: usize) -> Result<ActivityRecord, DecodeError> {
    let summary = decode_summary(image, offset)?;
    let laps = decode_laps(image, offset, &summary)?;
    let mut cursor = DecodeCursor::new(summary.start);
    let mut record = ActivityRecord {
        summary,
        laps,
        heart_rate: None,
        route: None,
    };

    let mut at = offset.saturating_add(SAMPLES_OFFSET);
    for i in 0..record.summary.sample_count {
        let Some(sample) = decode_sample(image, at)? else {
            trace!(
                "activity at {offset:#x}: samples end at {i} of {} (tag {:#04x})",
                record.summary.sample_count,
                image[at]
            );
            break;
        };
        at += sample.size();

        let (next, output) = step(cursor, &sample)?;
        cursor = next;
        if let Some(bpm) = output.heart_rate {
            record
                .heart_rate
                .get_or_insert_with(Vec::new)
                .push((output.time, bpm));
        }
        if let Some(point) = output.position {
            record
                .route
                .get_or_insert_with(Vec::new)
                .push((output.time, point));
        }
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LayoutError;
    use crate::testing::{
        ImageBuilder, SummaryBytes, empty_sample, full_sample, lap_bytes, no_data_sample,
        short_sample,
    };

    const T0: [u8; 6] = [11, 7, 3, 12, 15, 30];

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2011, 7, 3)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn activity(summary: SummaryBytes, laps: &[Vec<u8>], samples: &[Vec<u8>]) -> Vec<u8> {
        ImageBuilder::new(3)
            .index(&[0x01, 0xFF, 0xFF])
            .put(0x1000, &summary.bytes())
            .put(0x1040, &laps.concat())
            .put(0x2000, &samples.concat())
            .build()
    }

    #[test]
    fn bcd() {
        assert_eq!(bcd_to_binary(0x19), 19);
        assert_eq!(bcd_to_binary(0x00), 0);
        assert_eq!(bcd_to_binary(0x59), 59);
    }

    #[test]
    fn rollover_within_minute() {
        assert_eq!(advance_time(at(12, 5, 58), 5, 59).unwrap(), at(12, 5, 59));
    }

    #[test]
    fn rollover_carries_minute() {
        assert_eq!(advance_time(at(12, 5, 58), 6, 1).unwrap(), at(12, 6, 1));
        assert_eq!(advance_time(at(12, 59, 58), 0, 2).unwrap(), at(13, 0, 2));
        let midnight = NaiveDate::from_ymd_opt(2011, 7, 4)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(advance_time(at(23, 59, 59), 0, 0).unwrap(), midnight);
    }

    #[test]
    fn rollover_rejects_bad_second() {
        assert!(matches!(
            advance_time(at(12, 5, 58), 5, 60),
            Err(DecodeError::InvalidTimestamp { second: 60, .. })
        ));
    }

    #[test]
    fn satellite_status() {
        assert!(!SatStatus::from(0xF0).has_fix());
        assert!(SatStatus::from(0x07).has_fix());
        assert_eq!(SatStatus::from(0x37).satellites().value(), 7);
    }

    #[test]
    fn summary_fields() {
        let image = activity(SummaryBytes::new(0, 0), &[], &[]);
        let s = decode_summary(&image, 0x1000).unwrap();
        assert_eq!(s.start, at(12, 15, 30));
        assert_eq!(s.elapsed, TimeDelta::seconds(45 * 60 + 10));
        assert_eq!(s.distance, 10_025.5);
        assert_eq!(s.calories, 612.5);
        assert_eq!(
            (s.average_heart_rate, s.max_heart_rate, s.min_heart_rate),
            (142, 171, 95)
        );
        assert_eq!((s.average_speed, s.max_speed), (1050, 1620));
        assert_eq!(s.time_below_zone, TimeDelta::seconds(5 * 60 + 20));
        assert_eq!(s.time_in_zone, TimeDelta::seconds(3600 + 30 * 60 + 10));
        assert_eq!(s.time_above_zone, TimeDelta::minutes(10));
    }

    #[test]
    fn summary_durations_are_seconds_first() {
        let mut summary = SummaryBytes::new(0, 0);
        summary.elapsed = [5, 4, 2];
        let image = activity(summary, &[], &[]);
        let s = decode_summary(&image, 0x1000).unwrap();
        assert_eq!(s.elapsed, TimeDelta::seconds(2 * 3600 + 4 * 60 + 5));
    }

    #[test]
    fn laps_are_consecutive() {
        let laps = [
            lap_bytes([0, 5, 30, 0x25], 150, 10_000),
            lap_bytes([0, 11, 2, 0x50], 155, 20_250),
        ];
        let image = activity(SummaryBytes::new(0, 2), &laps, &[]);
        let r = decode(&image, 0x1000).unwrap();
        assert_eq!(r.laps.len(), 2);

        let first = &r.laps[0];
        assert_eq!(first.start, at(12, 15, 30));
        assert_eq!(first.duration, TimeDelta::milliseconds(330_250));
        assert_eq!(first.distance, 1000.0);
        assert_eq!(first.average_heart_rate, 150);

        let second = &r.laps[1];
        assert_eq!(
            second.start,
            at(12, 15, 30) + TimeDelta::milliseconds(330_250)
        );
        assert_eq!(second.duration, TimeDelta::milliseconds(332_250));
        assert_eq!(second.distance, 2025.0);
    }

    #[test]
    fn heart_rate_only_from_valid_samples() {
        let samples = [
            full_sample(0x00, T0, 80_000_000, 500_000_000, 120, 0),
            full_sample(0x10, [11, 7, 3, 12, 15, 31], 80_000_000, 500_000_000, 120, 120),
        ];
        let image = activity(SummaryBytes::new(2, 0), &[], &samples);
        let r = decode(&image, 0x1000).unwrap();
        assert_eq!(r.heart_rate, Some(vec![(at(12, 15, 31), 120)]));
        assert_eq!(r.route, None);
    }

    #[test]
    fn short_samples_apply_deltas_from_last_full_sample() {
        let samples = [
            full_sample(0x05, T0, 100, 200, 10, 130),
            short_sample(0x05, 15, 31, 5, -3, 2, 131),
            full_sample(0x05, [11, 7, 3, 12, 15, 40], 1_000, 2_000, 50, 0),
            short_sample(0x05, 16, 2, 1, 1, -1, 0),
        ];
        let image = activity(SummaryBytes::new(4, 0), &[], &samples);
        let r = decode(&image, 0x1000).unwrap();
        let route = r.route.unwrap();
        assert_eq!(route.len(), 4);

        assert_eq!(route[1].0, at(12, 15, 31));
        assert_eq!(route[1].1.longitude, 105.0 / 1e7);
        assert_eq!(route[1].1.latitude, 197.0 / 1e7);
        assert_eq!(route[1].1.altitude, 12.0);

        assert_eq!(route[3].0, at(12, 16, 2));
        assert_eq!(route[3].1.longitude, 1_001.0 / 1e7);
        assert_eq!(route[3].1.latitude, 2_001.0 / 1e7);
        assert_eq!(route[3].1.altitude, 49.0);

        assert_eq!(
            r.heart_rate,
            Some(vec![(at(12, 15, 30), 130), (at(12, 15, 31), 131)])
        );
    }

    #[test]
    fn route_uses_scaled_degrees() {
        let samples = [full_sample(0x08, T0, 135_123_456, 523_456_789, -12, 0)];
        let image = activity(SummaryBytes::new(1, 0), &[], &samples);
        let route = decode(&image, 0x1000).unwrap().route.unwrap();
        assert_eq!(
            route[0].1,
            GpsPoint {
                latitude: 523_456_789.0 / 1e7,
                longitude: 135_123_456.0 / 1e7,
                altitude: -12.0
            }
        );
    }

    #[test]
    fn empty_and_no_data_samples_keep_position() {
        let samples = [
            full_sample(0x05, T0, 100, 200, 10, 0),
            empty_sample([11, 7, 3, 12, 20, 0], 99),
            no_data_sample(20, 5),
            short_sample(0x05, 21, 0, 1, 1, 1, 0),
        ];
        let image = activity(SummaryBytes::new(4, 0), &[], &samples);
        let r = decode(&image, 0x1000).unwrap();
        assert_eq!(r.heart_rate, Some(vec![(at(12, 20, 0), 99)]));
        let route = r.route.unwrap();
        assert_eq!(route.len(), 2);
        assert_eq!(route[1].0, at(12, 21, 0));
        assert_eq!(route[1].1.longitude, 101.0 / 1e7);
    }

    #[test]
    fn compact_time_rolls_over_from_cursor() {
        let samples = [
            full_sample(0x00, [11, 7, 3, 12, 5, 58], 0, 0, 0, 0),
            no_data_sample(5, 59),
            short_sample(0x00, 6, 1, 0, 0, 0, 88),
        ];
        let image = activity(SummaryBytes::new(3, 0), &[], &samples);
        let r = decode(&image, 0x1000).unwrap();
        assert_eq!(r.heart_rate, Some(vec![(at(12, 6, 1), 88)]));
    }

    #[test]
    fn unknown_tag_ends_samples() {
        let samples = [
            full_sample(0x00, T0, 0, 0, 0, 70),
            vec![0x42, 0, 0, 0],
            full_sample(0x00, T0, 0, 0, 0, 71),
        ];
        let image = activity(SummaryBytes::new(3, 0), &[], &samples);
        let r = decode(&image, 0x1000).unwrap();
        assert_eq!(r.heart_rate, Some(vec![(at(12, 15, 30), 70)]));
    }

    #[test]
    fn end_marker_ends_samples() {
        let samples = [full_sample(0x00, T0, 0, 0, 0, 70)];
        let image = activity(SummaryBytes::new(500, 0), &[], &samples);
        let r = decode(&image, 0x1000).unwrap();
        assert_eq!(r.heart_rate.map(|h| h.len()), Some(1));
    }

    #[test]
    fn sample_count_limits_decoding() {
        let samples = [
            full_sample(0x00, T0, 0, 0, 0, 70),
            full_sample(0x00, T0, 0, 0, 0, 71),
        ];
        let image = activity(SummaryBytes::new(1, 0), &[], &samples);
        let r = decode(&image, 0x1000).unwrap();
        assert_eq!(r.heart_rate.map(|h| h.len()), Some(1));
    }

    #[test]
    fn summary_past_image_fails() {
        let image = activity(SummaryBytes::new(0, 0), &[], &[]);
        assert_eq!(
            decode(&image, 0x3000).unwrap_err(),
            DecodeError::Layout(LayoutError::OutOfBounds {
                record: "summary",
                offset: 0x3000,
                size: 47,
                available: 0x3000
            })
        );
    }

    #[test]
    fn sample_past_image_fails() {
        let mut image = activity(SummaryBytes::new(1, 0), &[], &[]);
        image.truncate(0x2000 + 10);
        image[0x2000] = TAG_FULL;
        assert!(matches!(
            decode(&image, 0x1000),
            Err(DecodeError::Layout(LayoutError::OutOfBounds {
                record: "full sample",
                ..
            }))
        ));
    }

    #[test]
    fn impossible_date_fails() {
        let samples = [full_sample(0x00, [11, 13, 3, 12, 15, 30], 0, 0, 0, 70)];
        let image = activity(SummaryBytes::new(1, 0), &[], &samples);
        assert!(matches!(
            decode(&image, 0x1000),
            Err(DecodeError::InvalidTimestamp { month: 13, .. })
        ));
    }
}
