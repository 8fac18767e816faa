//! Trains and on-duty drivers at the moment of planning.

use serde::{Deserialize, Serialize};

use super::{CutSet, EdgeKey, FgcTime, LineCode, StationCode, TrackId};

/// Where a unit is right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainPosition {
    AtStation {
        station: StationCode,
    },
    InTransit {
        from: StationCode,
        to: StationCode,
        track: TrackId,
    },
}

impl TrainPosition {
    /// The station the unit is standing at, or heading towards.
    pub fn station(&self) -> StationCode {
        match self {
            TrainPosition::AtStation { station } => *station,
            TrainPosition::InTransit { to, .. } => *to,
        }
    }

    /// A unit is affected by an incident when it stands at a blocked
    /// station or runs on a cut track.
    pub fn is_affected_by(&self, cuts: &CutSet) -> bool {
        match self {
            TrainPosition::AtStation { station } => cuts.is_station_blocked(station),
            TrainPosition::InTransit { from, to, track } => {
                cuts.is_track_cut(&EdgeKey::new(*from, *to), *track)
            }
        }
    }
}

/// A train unit available to the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: String,
    /// Line the unit was working when the incident started.
    #[serde(default)]
    pub line: Option<LineCode>,
    pub position: TrainPosition,
}

/// A driver on duty, as reported by the personnel snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnDutyDriver {
    pub id: String,
    pub current_station: StationCode,
    /// Earliest time the driver can take a new task.
    #[serde(default, with = "super::time::lenient")]
    pub available_from: Option<FgcTime>,
    #[serde(default, with = "super::time::lenient")]
    pub shift_start: Option<FgcTime>,
    #[serde(default, with = "super::time::lenient")]
    pub shift_end: Option<FgcTime>,
    pub home_depot: StationCode,
    /// Unit the driver is currently in the cab of.
    #[serde(default)]
    pub bound_unit: Option<String>,
}

/// The parsed times of a driver's duty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyTimes {
    pub available_from: FgcTime,
    pub shift_start: FgcTime,
    pub shift_end: FgcTime,
}

impl OnDutyDriver {
    /// All three duty times, if they parsed and the shift is correctly
    /// ordered. Drivers without them take no part in planning.
    pub fn duty_times(&self) -> Option<DutyTimes> {
        let (available_from, shift_start, shift_end) =
            (self.available_from?, self.shift_start?, self.shift_end?);
        (shift_start <= shift_end).then_some(DutyTimes {
            available_from,
            shift_start,
            shift_end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> StationCode {
        StationCode::parse(s).unwrap()
    }

    #[test]
    fn unit_at_blocked_station_is_affected() {
        let cuts = CutSet::new().block_station(code("SR"));
        let at_sr = TrainPosition::AtStation { station: code("SR") };
        let at_tt = TrainPosition::AtStation { station: code("TT") };
        assert!(at_sr.is_affected_by(&cuts));
        assert!(!at_tt.is_affected_by(&cuts));
    }

    #[test]
    fn only_the_cut_track_is_affected() {
        let cuts = CutSet::new().cut_track(code("SR"), code("TT"), TrackId::One);
        let on_cut = TrainPosition::InTransit {
            from: code("TT"),
            to: code("SR"),
            track: TrackId::One,
        };
        let on_open = TrainPosition::InTransit {
            from: code("TT"),
            to: code("SR"),
            track: TrackId::Two,
        };
        assert!(on_cut.is_affected_by(&cuts));
        assert!(!on_open.is_affected_by(&cuts));
        assert_eq!(on_open.station(), code("SR"));
    }

    #[test]
    fn position_json_shape() {
        let p: TrainPosition =
            serde_json::from_str(r#"{"kind":"in_transit","from":"SR","to":"TT","track":"2"}"#)
                .unwrap();
        assert_eq!(
            p,
            TrainPosition::InTransit {
                from: code("SR"),
                to: code("TT"),
                track: TrackId::Two
            }
        );
    }

    #[test]
    fn malformed_duty_time_does_not_reject_driver() {
        let json = r#"{
            "id": "D7",
            "current_station": "NA",
            "available_from": "8:00",
            "shift_start": "06:00",
            "shift_end": "14:00",
            "home_depot": "NA"
        }"#;
        let driver: OnDutyDriver = serde_json::from_str(json).unwrap();
        assert!(driver.available_from.is_none());
        assert_eq!(driver.shift_start, FgcTime::parse_hhmm("06:00").ok());
        assert!(driver.duty_times().is_none());
    }

    #[test]
    fn duty_times_need_an_ordered_shift() {
        let t = |s: &str| FgcTime::parse_hhmm(s).ok();
        let mut driver = OnDutyDriver {
            id: "D1".into(),
            current_station: code("NA"),
            available_from: t("07:00"),
            shift_start: t("06:00"),
            shift_end: t("14:00"),
            home_depot: code("NA"),
            bound_unit: None,
        };
        let times = driver.duty_times().unwrap();
        assert_eq!(times.available_from, FgcTime::from_minutes(420));

        driver.shift_end = Some(FgcTime::from_minutes(300));
        assert!(driver.duty_times().is_none());
    }
}
