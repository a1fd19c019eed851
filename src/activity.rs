//! Decoded workouts and the sink they are handed to.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Serialize, Serializer};

fn seconds<S: Serializer>(d: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.num_milliseconds() as f64 / 1000.0)
}

/// Fixed record at the start of every activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub sample_count: u16,
    pub lap_count: u8,
    pub start: NaiveDateTime,
    #[serde(serialize_with = "seconds")]
    pub elapsed: TimeDelta,
    /// Metres
    pub distance: f32,
    /// Kilocalories
    pub calories: f32,
    /// Raw device units
    pub average_speed: u16,
    pub max_speed: u16,
    pub average_heart_rate: u8,
    pub max_heart_rate: u8,
    pub min_heart_rate: u8,
    #[serde(serialize_with = "seconds")]
    pub time_below_zone: TimeDelta,
    #[serde(serialize_with = "seconds")]
    pub time_in_zone: TimeDelta,
    #[serde(serialize_with = "seconds")]
    pub time_above_zone: TimeDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lap {
    pub start: NaiveDateTime,
    #[serde(serialize_with = "seconds")]
    pub duration: TimeDelta,
    /// Metres
    pub distance: f32,
    pub average_heart_rate: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres
    pub altitude: f32,
}

/// Everything decoded for one activity.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub summary: ActivitySummary,
    pub laps: Vec<Lap>,
    /// `None` until the first sample with a heart rate.
    pub heart_rate: Option<Vec<(NaiveDateTime, u8)>>,
    /// `None` until the first sample with a GPS fix.
    pub route: Option<Vec<(NaiveDateTime, GpsPoint)>>,
}

impl ActivityRecord {
    /// Hand the activity to a result sink.
    pub fn export<R: ImportResults>(&self, results: &mut R) {
        let activity = results.add_activity(self.summary.start);
        activity.set_average_heart_rate(self.summary.average_heart_rate);
        activity.set_total_calories(self.summary.calories);
        activity.set_total_distance(self.summary.distance);
        activity.set_total_time(self.summary.elapsed);
        for lap in &self.laps {
            activity.add_lap(lap);
        }
        for (at, bpm) in self.heart_rate.iter().flatten() {
            activity.push_heart_rate(*at, *bpm);
        }
        for (at, point) in self.route.iter().flatten() {
            activity.push_gps_point(*at, *point);
        }
    }
}

/// Handle to one activity inside a result sink.
pub trait ActivityBuilder {
    fn set_average_heart_rate(&mut self, bpm: u8);
    fn set_total_calories(&mut self, kcal: f32);
    fn set_total_distance(&mut self, metres: f32);
    fn set_total_time(&mut self, elapsed: TimeDelta);
    fn add_lap(&mut self, lap: &Lap);
    fn push_heart_rate(&mut self, at: NaiveDateTime, bpm: u8);
    fn push_gps_point(&mut self, at: NaiveDateTime, point: GpsPoint);
}

/// Receives the imported activities.
pub trait ImportResults {
    type Activity: ActivityBuilder;

    fn add_activity(&mut self, start: NaiveDateTime) -> &mut Self::Activity;
}

/// An activity as a result sink sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedActivity {
    pub start: NaiveDateTime,
    pub average_heart_rate: Option<u8>,
    pub total_calories: Option<f32>,
    pub total_distance: Option<f32>,
    #[serde(serialize_with = "optional_seconds")]
    pub total_time: Option<TimeDelta>,
    pub laps: Vec<Lap>,
    pub heart_rate: Option<Vec<(NaiveDateTime, u8)>>,
    pub route: Option<Vec<(NaiveDateTime, GpsPoint)>>,
}

fn optional_seconds<S: Serializer>(d: &Option<TimeDelta>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => seconds(d, s),
        None => s.serialize_none(),
    }
}

impl ImportedActivity {
    pub fn new(start: NaiveDateTime) -> ImportedActivity {
        ImportedActivity {
            start,
            average_heart_rate: None,
            total_calories: None,
            total_distance: None,
            total_time: None,
            laps: Vec::new(),
            heart_rate: None,
            route: None,
        }
    }
}

impl ActivityBuilder for ImportedActivity {
    fn set_average_heart_rate(&mut self, bpm: u8) {
        self.average_heart_rate = Some(bpm);
    }

    fn set_total_calories(&mut self, kcal: f32) {
        self.total_calories = Some(kcal);
    }

    fn set_total_distance(&mut self, metres: f32) {
        self.total_distance = Some(metres);
    }

    fn set_total_time(&mut self, elapsed: TimeDelta) {
        self.total_time = Some(elapsed);
    }

    fn add_lap(&mut self, lap: &Lap) {
        self.laps.push(lap.clone());
    }

    fn push_heart_rate(&mut self, at: NaiveDateTime, bpm: u8) {
        self.heart_rate.get_or_insert_with(Vec::new).push((at, bpm));
    }

    fn push_gps_point(&mut self, at: NaiveDateTime, point: GpsPoint) {
        self.route.get_or_insert_with(Vec::new).push((at, point));
    }
}

impl ImportResults for Vec<ImportedActivity> {
    type Activity = ImportedActivity;

    fn add_activity(&mut self, start: NaiveDateTime) -> &mut Self::Activity {
        let index = self.len();
        self.push(ImportedActivity::new(start));
        &mut self[index]
    }
}
