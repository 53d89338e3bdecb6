use chrono::{DateTime, Utc};
use rusqlite::types::ToSql;
use rusqlite::{params, Connection};
use serde_json::{Map, Value};

use crate::models::car::AVAILABLE;
use crate::models::{Booking, BookingStatus, Car};

/// Outcome of a single-record update, in the shape the controller reasons
/// about: a zero `matched` means the id does not exist, a zero `modified`
/// means the record already held the requested value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched: usize,
    pub modified: usize,
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, car_id, owner_email, customer_email, start_date, end_date, \
     price, total_price, status, booking_date, session_id, extra";

#[derive(Debug, Clone, Default)]
pub struct BookingFilter<'a> {
    pub owner_email: Option<&'a str>,
    pub customer_email: Option<&'a str>,
    pub status: Option<BookingStatus>,
    pub newest_first: bool,
}

impl<'a> BookingFilter<'a> {
    pub fn owner(email: &'a str) -> Self {
        Self {
            owner_email: Some(email),
            ..Default::default()
        }
    }

    pub fn customer(email: &'a str) -> Self {
        Self {
            customer_email: Some(email),
            ..Default::default()
        }
    }

    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut clauses = vec![];
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![];

        if let Some(owner) = self.owner_email {
            params_vec.push(Box::new(owner.to_string()));
            clauses.push(format!("owner_email = ?{}", params_vec.len()));
        }
        if let Some(customer) = self.customer_email {
            params_vec.push(Box::new(customer.to_string()));
            clauses.push(format!("customer_email = ?{}", params_vec.len()));
        }
        if let Some(status) = self.status {
            params_vec.push(Box::new(status.as_str()));
            clauses.push(format!("status = ?{}", params_vec.len()));
        }

        if clauses.is_empty() {
            (String::new(), params_vec)
        } else {
            (format!(" WHERE {}", clauses.join(" AND ")), params_vec)
        }
    }
}

/// Inserts a booking. Returns `false` without writing when another booking
/// already carries the same checkout session id.
pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<bool> {
    let extra = serde_json::to_string(&booking.extra)?;

    let inserted = conn.execute(
        "INSERT INTO bookings (id, car_id, owner_email, customer_email, start_date, end_date, price, total_price, status, booking_date, session_id, extra)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(session_id) DO NOTHING",
        params![
            booking.id,
            booking.car_id,
            booking.owner_email,
            booking.customer_email,
            booking.start_date,
            booking.end_date,
            booking.price,
            booking.total_price,
            booking.status.map(|s| s.as_str()),
            booking.booking_date.to_rfc3339(),
            booking.session_id,
            extra,
        ],
    )?;
    Ok(inserted > 0)
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_session(conn: &Connection, session_id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE session_id = ?1"),
        params![session_id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<UpdateResult> {
    let matched: i64 = conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    let modified = conn.execute(
        "UPDATE bookings SET status = ?1 WHERE id = ?2 AND status IS NOT ?1",
        params![status.as_str(), id],
    )?;

    Ok(UpdateResult {
        matched: matched as usize,
        modified,
    })
}

/// Overwrites the rental window and stamps a new booking date. Returns the
/// record as it reads after the write, or `None` if the id is unknown.
pub fn update_booking_dates(
    conn: &Connection,
    id: &str,
    start_date: &str,
    end_date: &str,
    booking_date: DateTime<Utc>,
) -> anyhow::Result<Option<Booking>> {
    let count = conn.execute(
        "UPDATE bookings SET start_date = ?1, end_date = ?2, booking_date = ?3 WHERE id = ?4",
        params![start_date, end_date, booking_date.to_rfc3339(), id],
    )?;

    if count == 0 {
        return Ok(None);
    }
    get_booking(conn, id)
}

pub fn list_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<Vec<Booking>> {
    let (where_sql, params_vec) = filter.where_clause();
    let order = if filter.newest_first {
        "booking_date DESC"
    } else {
        "rowid ASC"
    };
    let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings{where_sql} ORDER BY {order}");

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn count_bookings(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<i64> {
    let (where_sql, params_vec) = filter.where_clause();
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM bookings{where_sql}"),
        params_refs.as_slice(),
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Sums `price` over the matching bookings; records without a price add 0.
pub fn sum_booking_prices(conn: &Connection, filter: &BookingFilter) -> anyhow::Result<f64> {
    let (where_sql, params_vec) = filter.where_clause();
    let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();

    let total = conn.query_row(
        &format!("SELECT COALESCE(SUM(COALESCE(price, 0.0)), 0.0) FROM bookings{where_sql}"),
        params_refs.as_slice(),
        |row| row.get(0),
    )?;
    Ok(total)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let status_str: Option<String> = row.get(8)?;
    let booking_date_str: String = row.get(9)?;
    let extra_json: String = row.get(11)?;

    let booking_date = DateTime::parse_from_rfc3339(&booking_date_str)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());
    let extra: Map<String, Value> = serde_json::from_str(&extra_json).unwrap_or_default();

    Ok(Booking {
        id: row.get(0)?,
        car_id: row.get(1)?,
        owner_email: row.get(2)?,
        customer_email: row.get(3)?,
        start_date: row.get(4)?,
        end_date: row.get(5)?,
        price: row.get(6)?,
        total_price: row.get(7)?,
        status: status_str.as_deref().and_then(BookingStatus::parse),
        booking_date,
        session_id: row.get(10)?,
        extra,
    })
}

// ── Cars ──

pub fn insert_car(conn: &Connection, car: &Car) -> anyhow::Result<()> {
    let extra = serde_json::to_string(&car.extra)?;
    conn.execute(
        "INSERT INTO cars (id, owner_email, availability, extra) VALUES (?1, ?2, ?3, ?4)",
        params![car.id, car.owner_email, car.availability, extra],
    )?;
    Ok(())
}

pub fn get_car(conn: &Connection, id: &str) -> anyhow::Result<Option<Car>> {
    let result = conn.query_row(
        "SELECT id, owner_email, availability, extra FROM cars WHERE id = ?1",
        params![id],
        |row| Ok(parse_car_row(row)),
    );

    match result {
        Ok(car) => Ok(Some(car?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_cars(
    conn: &Connection,
    owner_email: Option<&str>,
    available_only: bool,
) -> anyhow::Result<Vec<Car>> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_email, availability, extra FROM cars
         WHERE (?1 IS NULL OR owner_email = ?1) AND (?2 = 0 OR availability = ?3)
         ORDER BY rowid ASC",
    )?;

    let rows = stmt.query_map(params![owner_email, available_only, AVAILABLE], |row| {
        Ok(parse_car_row(row))
    })?;

    let mut cars = vec![];
    for row in rows {
        cars.push(row??);
    }
    Ok(cars)
}

pub fn count_cars(conn: &Connection, owner_email: &str) -> anyhow::Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM cars WHERE owner_email = ?1",
        params![owner_email],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn update_car(
    conn: &Connection,
    id: &str,
    fields: &Map<String, Value>,
) -> anyhow::Result<UpdateResult> {
    let Some(mut car) = get_car(conn, id)? else {
        return Ok(UpdateResult {
            matched: 0,
            modified: 0,
        });
    };

    if !car.merge(fields) {
        return Ok(UpdateResult {
            matched: 1,
            modified: 0,
        });
    }

    let extra = serde_json::to_string(&car.extra)?;
    let modified = conn.execute(
        "UPDATE cars SET owner_email = ?1, availability = ?2, extra = ?3 WHERE id = ?4",
        params![car.owner_email, car.availability, extra, id],
    )?;

    Ok(UpdateResult {
        matched: 1,
        modified,
    })
}

pub fn delete_car(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM cars WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_car_row(row: &rusqlite::Row) -> anyhow::Result<Car> {
    let extra_json: String = row.get(3)?;

    Ok(Car {
        id: row.get(0)?,
        owner_email: row.get(1)?,
        availability: row.get(2)?,
        extra: serde_json::from_str(&extra_json).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingInput, CarInput};
    use serde_json::json;

    fn booking(id: &str, owner: &str, customer: &str, price: Option<f64>) -> Booking {
        let input = BookingInput {
            car_id: Some("c1".into()),
            owner_email: Some(owner.into()),
            customer_email: Some(customer.into()),
            start_date: Some("2024-01-01".into()),
            end_date: Some("2024-01-05".into()),
            price,
            status: Some(BookingStatus::Pending),
            ..Default::default()
        };
        Booking::from_input(id.into(), input, Utc::now())
    }

    #[test]
    fn test_insert_and_get_booking() {
        let conn = db::init_db(":memory:").unwrap();
        let mut b = booking("b1", "a@x.com", "r@x.com", Some(100.0));
        b.extra.insert("carModel".into(), json!("Civic"));
        assert!(insert_booking(&conn, &b).unwrap());

        let stored = get_booking(&conn, "b1").unwrap().unwrap();
        assert_eq!(stored.owner_email.as_deref(), Some("a@x.com"));
        assert_eq!(stored.price, Some(100.0));
        assert_eq!(stored.status, Some(BookingStatus::Pending));
        assert_eq!(stored.extra.get("carModel"), Some(&json!("Civic")));
        assert!(get_booking(&conn, "missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_session_is_not_inserted() {
        let conn = db::init_db(":memory:").unwrap();
        let mut first = booking("b1", "a@x.com", "r@x.com", None);
        first.session_id = Some("cs_1".into());
        let mut second = booking("b2", "a@x.com", "r@x.com", None);
        second.session_id = Some("cs_1".into());

        assert!(insert_booking(&conn, &first).unwrap());
        assert!(!insert_booking(&conn, &second).unwrap());
        assert_eq!(count_bookings(&conn, &BookingFilter::default()).unwrap(), 1);
        assert_eq!(
            get_booking_by_session(&conn, "cs_1").unwrap().unwrap().id,
            "b1"
        );
    }

    #[test]
    fn test_bookings_without_session_never_conflict() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(insert_booking(&conn, &booking("b1", "a@x.com", "r@x.com", None)).unwrap());
        assert!(insert_booking(&conn, &booking("b2", "a@x.com", "r@x.com", None)).unwrap());
        assert_eq!(count_bookings(&conn, &BookingFilter::default()).unwrap(), 2);
    }

    #[test]
    fn test_update_status_counts() {
        let conn = db::init_db(":memory:").unwrap();
        insert_booking(&conn, &booking("b1", "a@x.com", "r@x.com", None)).unwrap();

        let first = update_booking_status(&conn, "b1", BookingStatus::Cancelled).unwrap();
        assert_eq!(first, UpdateResult { matched: 1, modified: 1 });

        let second = update_booking_status(&conn, "b1", BookingStatus::Cancelled).unwrap();
        assert_eq!(second, UpdateResult { matched: 1, modified: 0 });

        let missing = update_booking_status(&conn, "nope", BookingStatus::Cancelled).unwrap();
        assert_eq!(missing, UpdateResult { matched: 0, modified: 0 });
    }

    #[test]
    fn test_update_dates_returns_updated_record() {
        let conn = db::init_db(":memory:").unwrap();
        insert_booking(&conn, &booking("b1", "a@x.com", "r@x.com", None)).unwrap();

        let stamp = Utc::now();
        let updated = update_booking_dates(&conn, "b1", "2024-02-01", "2024-02-03", stamp)
            .unwrap()
            .unwrap();
        assert_eq!(updated.start_date.as_deref(), Some("2024-02-01"));
        assert_eq!(updated.end_date.as_deref(), Some("2024-02-03"));
        assert_eq!(updated.booking_date.timestamp(), stamp.timestamp());

        assert!(update_booking_dates(&conn, "nope", "2024-02-01", "2024-02-03", stamp)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_filters_count_and_sum() {
        let conn = db::init_db(":memory:").unwrap();
        insert_booking(&conn, &booking("b1", "a@x.com", "r@x.com", Some(100.0))).unwrap();
        insert_booking(&conn, &booking("b2", "a@x.com", "s@x.com", None)).unwrap();
        insert_booking(&conn, &booking("b3", "z@x.com", "r@x.com", Some(50.5))).unwrap();

        let owned = list_bookings(&conn, &BookingFilter::owner("a@x.com")).unwrap();
        assert_eq!(owned.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), ["b1", "b2"]);

        assert_eq!(count_bookings(&conn, &BookingFilter::customer("r@x.com")).unwrap(), 2);
        assert_eq!(sum_booking_prices(&conn, &BookingFilter::owner("a@x.com")).unwrap(), 100.0);
        assert_eq!(sum_booking_prices(&conn, &BookingFilter::owner("nobody@x.com")).unwrap(), 0.0);
    }

    #[test]
    fn test_paid_filter_newest_first() {
        let conn = db::init_db(":memory:").unwrap();
        let mut older = booking("old", "a@x.com", "r@x.com", None);
        older.status = Some(BookingStatus::Paid);
        older.booking_date = Utc::now() - chrono::Duration::days(2);
        let mut newer = booking("new", "a@x.com", "r@x.com", None);
        newer.status = Some(BookingStatus::Paid);
        let pending = booking("pending", "a@x.com", "r@x.com", None);

        for b in [&older, &newer, &pending] {
            insert_booking(&conn, b).unwrap();
        }

        let filter = BookingFilter {
            customer_email: Some("r@x.com"),
            status: Some(BookingStatus::Paid),
            newest_first: true,
            ..Default::default()
        };
        let paid = list_bookings(&conn, &filter).unwrap();
        assert_eq!(paid.iter().map(|b| b.id.as_str()).collect::<Vec<_>>(), ["new", "old"]);
    }

    #[test]
    fn test_car_crud() {
        let conn = db::init_db(":memory:").unwrap();
        let car = CarInput {
            owner_email: Some("o@x.com".into()),
            availability: Some("Available".into()),
            ..Default::default()
        }
        .into_car("car-1".into());
        insert_car(&conn, &car).unwrap();

        assert_eq!(list_cars(&conn, None, true).unwrap().len(), 1);
        assert_eq!(count_cars(&conn, "o@x.com").unwrap(), 1);

        let fields = json!({"availability": "Unavailable"});
        let result = update_car(&conn, "car-1", fields.as_object().unwrap()).unwrap();
        assert_eq!(result, UpdateResult { matched: 1, modified: 1 });
        assert!(list_cars(&conn, None, true).unwrap().is_empty());
        assert_eq!(list_cars(&conn, Some("o@x.com"), false).unwrap().len(), 1);

        let missing = update_car(&conn, "nope", fields.as_object().unwrap()).unwrap();
        assert_eq!(missing.matched, 0);

        assert!(delete_car(&conn, "car-1").unwrap());
        assert!(!delete_car(&conn, "car-1").unwrap());
        assert!(get_car(&conn, "car-1").unwrap().is_none());
    }
}
