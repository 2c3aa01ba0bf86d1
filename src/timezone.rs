use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Converts between UTC instants and wall-clock time in a fixed-offset region.
///
/// The offset never changes (no daylight saving), so both directions are exact inverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneConverter {
    offset: FixedOffset,
}

impl Default for TimeZoneConverter {
    fn default() -> Self {
        Self::bogota()
    }
}

impl TimeZoneConverter {
    const BOGOTA: FixedOffset = match FixedOffset::west_opt(5 * 3600) {
        Some(offset) => offset,
        None => panic!("UTC-05:00 is a valid offset"),
    };

    /// America/Bogota: UTC-05:00 all year round.
    pub fn bogota() -> Self {
        Self {
            offset: Self::BOGOTA,
        }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn to_local(&self, utc: DateTime<Utc>) -> NaiveDateTime {
        utc.with_timezone(&self.offset).naive_local()
    }

    pub fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        // Fixed offsets never produce gaps or folds.
        let Some(zoned) = self.offset.from_local_datetime(&local).single() else {
            unreachable!("fixed offset {} mapped {local} ambiguously", self.offset);
        };
        zoned.with_timezone(&Utc)
    }

    /// Current wall-clock time in the region.
    pub fn now_local(&self) -> NaiveDateTime {
        self.to_local(Utc::now())
    }
}
