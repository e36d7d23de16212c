use std::cmp::Ordering;
use std::str::FromStr;

use common::{DateRange, HotelId};

use crate::Room;

/// Sort key for room listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomSort {
    #[default]
    Id,
    TimesBooked,
    /// Room number, rooms without a number last.
    Number,
}

impl FromStr for RoomSort {
    type Err = std::convert::Infallible;

    /// Unknown keys fall back to sorting by id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "timesbooked" | "times_booked" => RoomSort::TimesBooked,
            "number" => RoomSort::Number,
            _ => RoomSort::Id,
        })
    }
}

/// Sort direction for room listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("desc") {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        })
    }
}

/// Builder for room availability listings.
///
/// Only rooms with no hold overlapping `range` are ever returned; the
/// remaining fields narrow and order that set.
#[derive(Debug, Clone)]
pub struct RoomQuery {
    /// Stay the rooms must be free for.
    pub range: DateRange,

    /// Restrict to one hotel.
    pub hotel_id: Option<HotelId>,

    /// Required value of the administrative `available` flag.
    pub available: bool,

    pub sort: RoomSort,

    pub direction: SortDirection,
}

impl RoomQuery {
    /// Creates a query for rooms free during `range`, sorted by id.
    pub fn for_stay(range: DateRange) -> Self {
        Self {
            range,
            hotel_id: None,
            available: true,
            sort: RoomSort::default(),
            direction: SortDirection::default(),
        }
    }

    /// Filters by hotel.
    pub fn hotel(mut self, hotel_id: HotelId) -> Self {
        self.hotel_id = Some(hotel_id);
        self
    }

    /// Filters by the administrative flag.
    pub fn available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn sort_by(mut self, sort: RoomSort, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    /// Returns true if the room passes the hotel and flag filters.
    pub fn matches(&self, room: &Room) -> bool {
        room.available == self.available
            && self.hotel_id.is_none_or(|hotel_id| room.hotel_id == hotel_id)
    }

    /// Orders two rooms by the requested key and direction.
    pub fn compare(&self, a: &Room, b: &Room) -> Ordering {
        let ordering = match self.sort {
            RoomSort::Id => a.id.cmp(&b.id),
            RoomSort::TimesBooked => a.times_booked.cmp(&b.times_booked),
            RoomSort::Number => match (&a.number, &b.number) {
                (Some(x), Some(y)) => x.cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }

    /// Filters and sorts `rooms` in place. The sort is stable, so ties keep
    /// their id order as long as the input is id-ordered.
    pub fn apply(&self, rooms: &mut Vec<Room>) {
        rooms.retain(|room| self.matches(room));
        rooms.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use common::RoomId;

    use super::*;

    fn room(id: i64, hotel: i64, number: Option<&str>, times_booked: u64) -> Room {
        Room {
            id: RoomId::new(id),
            hotel_id: HotelId::new(hotel),
            number: number.map(str::to_string),
            available: true,
            times_booked,
        }
    }

    fn stay() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 10, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 10, 3).unwrap(),
        )
        .unwrap()
    }

    fn ids(rooms: &[Room]) -> Vec<i64> {
        rooms.iter().map(|r| r.id.as_i64()).collect()
    }

    #[test]
    fn parses_sort_keys_case_insensitively() {
        assert_eq!("timesBooked".parse::<RoomSort>().unwrap(), RoomSort::TimesBooked);
        assert_eq!("NUMBER".parse::<RoomSort>().unwrap(), RoomSort::Number);
        assert_eq!("whatever".parse::<RoomSort>().unwrap(), RoomSort::Id);
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("up".parse::<SortDirection>().unwrap(), SortDirection::Asc);
    }

    #[test]
    fn number_sort_puts_missing_numbers_last() {
        let mut rooms = vec![
            room(1, 1, None, 0),
            room(2, 1, Some("202"), 0),
            room(3, 1, Some("101"), 0),
        ];
        RoomQuery::for_stay(stay())
            .sort_by(RoomSort::Number, SortDirection::Asc)
            .apply(&mut rooms);
        assert_eq!(ids(&rooms), vec![3, 2, 1]);
    }

    #[test]
    fn descending_keeps_id_order_for_ties() {
        let mut rooms = vec![room(1, 1, None, 2), room(2, 1, None, 5), room(3, 1, None, 2)];
        RoomQuery::for_stay(stay())
            .sort_by(RoomSort::TimesBooked, SortDirection::Desc)
            .apply(&mut rooms);
        assert_eq!(ids(&rooms), vec![2, 1, 3]);
    }

    #[test]
    fn filters_by_hotel_and_flag() {
        let mut disabled = room(4, 1, None, 0);
        disabled.available = false;
        let mut rooms = vec![room(1, 1, None, 0), room(2, 2, None, 0), disabled];

        let query = RoomQuery::for_stay(stay()).hotel(HotelId::new(1));
        let mut hotel_one = rooms.clone();
        query.apply(&mut hotel_one);
        assert_eq!(ids(&hotel_one), vec![1]);

        RoomQuery::for_stay(stay()).available(false).apply(&mut rooms);
        assert_eq!(ids(&rooms), vec![4]);
    }
}
