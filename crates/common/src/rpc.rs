//! Wire contract between the booking service and the hotel service.
//!
//! Field names are camelCase on the wire and must stay stable: both sides
//! deploy independently.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::wire_date;
use crate::{HotelId, RoomId};

/// Path of the internal recommend endpoint.
pub const RECOMMEND_PATH: &str = "/api/rooms/internal/recommend";

/// Path template of the confirm-availability endpoint.
pub const CONFIRM_AVAILABILITY_PATH: &str = "/api/rooms/{id}/confirm-availability";

/// Path template of the release endpoint.
pub const RELEASE_PATH: &str = "/internal/rooms/{id}/release";

/// Room as returned by the recommend and listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDto {
    #[serde(alias = "id")]
    pub room_id: RoomId,
    pub hotel_id: HotelId,
    pub number: Option<String>,
    pub available: bool,
    pub times_booked: u64,
}

/// Body of the confirm-availability call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    #[serde(with = "wire_date")]
    pub start_date: NaiveDate,
    #[serde(with = "wire_date")]
    pub end_date: NaiveDate,
    /// Idempotency key of the hold.
    pub request_id: String,
    /// Correlation back to the booking; opaque to the hotel side.
    pub booking_id: String,
}

/// Query string of the release call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseParams {
    pub request_id: String,
}

/// Query string carrying a stay, used by the recommend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayParams {
    #[serde(with = "wire_date")]
    pub start: NaiveDate,
    #[serde(with = "wire_date")]
    pub end: NaiveDate,
}

/// Expands a path template by substituting the `{id}` segment.
pub fn expand_path(template: &str, id: RoomId) -> String {
    template.replace("{id}", &id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_dto_uses_camel_case() {
        let dto = RoomDto {
            room_id: RoomId::new(1),
            hotel_id: HotelId::new(2),
            number: Some("101".to_string()),
            available: true,
            times_booked: 3,
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "roomId": 1,
                "hotelId": 2,
                "number": "101",
                "available": true,
                "timesBooked": 3
            })
        );
    }

    #[test]
    fn room_dto_accepts_plain_id() {
        let dto: RoomDto = serde_json::from_str(
            r#"{"id":9,"hotelId":1,"number":null,"available":false,"timesBooked":0}"#,
        )
        .unwrap();
        assert_eq!(dto.room_id, RoomId::new(9));
        assert_eq!(dto.number, None);
    }

    #[test]
    fn availability_request_tolerates_dotted_dates() {
        let req: AvailabilityRequest = serde_json::from_str(
            r#"{"startDate":"28.10.25","endDate":"2025-10-30","requestId":"r-1","bookingId":"7"}"#,
        )
        .unwrap();
        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2025, 10, 28).unwrap());

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["startDate"], "2025-10-28");
        assert_eq!(json["requestId"], "r-1");
    }

    #[test]
    fn expands_room_paths() {
        assert_eq!(
            expand_path(CONFIRM_AVAILABILITY_PATH, RoomId::new(5)),
            "/api/rooms/5/confirm-availability"
        );
        assert_eq!(expand_path(RELEASE_PATH, RoomId::new(5)), "/internal/rooms/5/release");
    }
}
