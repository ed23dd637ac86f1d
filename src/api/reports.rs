use crate::auth::session::SessionUser;
use crate::model::attendance::{Location, duration_hours};
use actix_web::http::header;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

/// Default report window when no dates are given
const REPORT_DEFAULT_DAYS: i64 = 7;
/// Exports default to a wider window
const EXPORT_DEFAULT_DAYS: i64 = 30;

#[derive(Deserialize, IntoParams)]
pub struct ReportQuery {
    /// First check-in day included, `YYYY-MM-DD`
    #[param(example = "2024-01-01", value_type = String)]
    pub start_date: Option<NaiveDate>,
    /// Last check-in day included, `YYYY-MM-DD`
    #[param(example = "2024-01-31", value_type = String)]
    pub end_date: Option<NaiveDate>,
    /// Restrict the report to a single user
    #[param(example = 2)]
    pub user_id: Option<u64>,
}

#[derive(sqlx::FromRow)]
struct ReportRowSql {
    id: u64,
    user_id: u64,
    username: String,
    check_in_time: DateTime<Utc>,
    check_out_time: Option<DateTime<Utc>>,
    location_data: String,
    location_address: Option<String>,
    notes: Option<String>,
}

/// One report line: attendance joined with its user plus the derived duration.
#[derive(Serialize, ToSchema)]
pub struct ReportRow {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 2)]
    pub user_id: u64,
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "2024-01-01T09:00:00Z", format = "date-time", value_type = String)]
    pub check_in_time: DateTime<Utc>,
    #[schema(example = "2024-01-01T17:30:00Z", format = "date-time", value_type = String, nullable = true)]
    pub check_out_time: Option<DateTime<Utc>>,
    #[schema(example = r#"{"latitude":37.7749,"longitude":-122.4194}"#)]
    pub location_data: String,
    #[schema(nullable = true)]
    pub location_address: Option<String>,
    #[schema(nullable = true)]
    pub notes: Option<String>,
    #[schema(example = 8.5, nullable = true)]
    pub duration: Option<f64>,
}

impl From<ReportRowSql> for ReportRow {
    fn from(row: ReportRowSql) -> Self {
        let duration = duration_hours(row.check_in_time, row.check_out_time);
        Self {
            id: row.id,
            user_id: row.user_id,
            username: row.username,
            check_in_time: row.check_in_time,
            check_out_time: row.check_out_time,
            location_data: row.location_data,
            location_address: row.location_address,
            notes: row.notes,
            duration,
        }
    }
}

// Helper enum for typed SQLx binding
enum BindValue {
    U64(u64),
    DateTime(DateTime<Utc>),
}

/// Resolve the requested window, falling back to the last `default_days` days.
fn window_dates(query: &ReportQuery, default_days: i64) -> (NaiveDate, NaiveDate) {
    let today = Utc::now().date_naive();
    let start = query
        .start_date
        .unwrap_or_else(|| today - Duration::days(default_days));
    let end = query.end_date.unwrap_or(today);
    (start, end)
}

/// Expand calendar days to an inclusive datetime range.
fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let to = end.and_hms_opt(23, 59, 59).unwrap().and_utc();
    (from, to)
}

async fn fetch_report_rows(
    pool: &MySqlPool,
    user_id: Option<u64>,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<ReportRow>, sqlx::Error> {
    let mut sql = String::from(
        "SELECT a.id, a.user_id, u.username, a.check_in_time, a.check_out_time, \
         a.location_data, a.location_address, a.notes \
         FROM attendance a \
         JOIN users u ON a.user_id = u.id \
         WHERE a.check_in_time >= ? AND a.check_in_time <= ?",
    );
    let mut binds = vec![BindValue::DateTime(from), BindValue::DateTime(to)];

    if let Some(user_id) = user_id {
        sql.push_str(" AND a.user_id = ?");
        binds.push(BindValue::U64(user_id));
    }

    sql.push_str(" ORDER BY a.check_in_time DESC");

    let mut query = sqlx::query_as::<_, ReportRowSql>(&sql);
    for bind in binds {
        query = match bind {
            BindValue::U64(v) => query.bind(v),
            BindValue::DateTime(v) => query.bind(v),
        };
    }

    Ok(query
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(ReportRow::from)
        .collect())
}

fn lat_long_label(location_data: &str) -> String {
    Location::from_json(location_data)
        .map(|l| format!("{}, {}", l.latitude, l.longitude))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Filtered attendance report
#[utoipa::path(
    get,
    path = "/api/reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Report rows, newest check-in first", body = Object, example = json!({
            "start_date": "2024-01-01",
            "end_date": "2024-01-07",
            "records": []
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("session_cookie" = [])
    ),
    tag = "Reports"
)]
pub async fn report_list(
    session: SessionUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    session.require_admin()?;

    let (start, end) = window_dates(&query, REPORT_DEFAULT_DAYS);
    let (from, to) = day_bounds(start, end);

    let records = fetch_report_rows(pool.get_ref(), query.user_id, from, to)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch report rows");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "start_date": start.format("%Y-%m-%d").to_string(),
        "end_date": end.format("%Y-%m-%d").to_string(),
        "records": records
    })))
}

fn esc(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn build_csv(rows: &[ReportRow]) -> String {
    let mut csv = String::from(
        "ID,Username,Check-in Time,Check-out Time,Duration (hours),\"Location (Lat, Long)\",Address,Notes\n",
    );

    for row in rows {
        let check_in = row.check_in_time.format("%Y-%m-%d %H:%M:%S").to_string();
        let check_out = row
            .check_out_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let duration = row
            .duration
            .map(|d| d.to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let line = format!(
            "{},{},{},{},{},{},{},{}\n",
            row.id,
            esc(&row.username),
            check_in,
            check_out,
            duration,
            esc(&lat_long_label(&row.location_data)),
            esc(row.location_address.as_deref().unwrap_or("N/A")),
            esc(row.notes.as_deref().unwrap_or(""))
        );
        csv.push_str(&line);
    }

    csv
}

fn export_filename(start: NaiveDate, end: NaiveDate, extension: &str) -> String {
    format!(
        "attendance_report_{}_to_{}.{}",
        start.format("%Y%m%d"),
        end.format("%Y%m%d"),
        extension
    )
}

/// CSV export of the filtered report
#[utoipa::path(
    get,
    path = "/api/reports/export-csv",
    params(ReportQuery),
    responses(
        (status = 200, description = "CSV attachment"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("session_cookie" = [])
    ),
    tag = "Reports"
)]
pub async fn export_csv(
    session: SessionUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    session.require_admin()?;

    let (start, end) = window_dates(&query, EXPORT_DEFAULT_DAYS);
    let (from, to) = day_bounds(start, end);

    let records = fetch_report_rows(pool.get_ref(), query.user_id, from, to)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch rows for CSV export");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let csv = build_csv(&records);
    let filename = export_filename(start, end, "csv");

    Ok(HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(csv))
}

fn pdf_line(row: &ReportRow) -> String {
    let check_in = row.check_in_time.format("%Y-%m-%d %H:%M:%S").to_string();
    let check_out = row
        .check_out_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let duration = row
        .duration
        .map(|d| format!("{} h", d))
        .unwrap_or_else(|| "open".to_string());
    let place = row
        .location_address
        .clone()
        .unwrap_or_else(|| lat_long_label(&row.location_data));

    format!(
        "#{}  {}  |  {} -> {}  |  {}  |  {}",
        row.id, row.username, check_in, check_out, duration, place
    )
}

fn render_pdf(
    title: &str,
    period: &str,
    lines: &[String],
    total_records: usize,
    total_hours: f64,
) -> anyhow::Result<Vec<u8>> {
    // US letter, drawn top to bottom
    let (doc, first_page, first_layer) =
        PdfDocument::new("Attendance Report", Mm(215.9), Mm(279.4), "report");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = 260.0;

    layer.use_text(title, 16.0, Mm(15.0), Mm(y), &bold);
    y -= 8.0;
    layer.use_text(period, 11.0, Mm(15.0), Mm(y), &regular);
    y -= 12.0;

    for line in lines {
        if y < 18.0 {
            let (page, page_layer) = doc.add_page(Mm(215.9), Mm(279.4), "report");
            layer = doc.get_page(page).get_layer(page_layer);
            y = 260.0;
        }
        layer.use_text(line.as_str(), 9.0, Mm(15.0), Mm(y), &regular);
        y -= 6.0;
    }

    if y < 30.0 {
        let (page, page_layer) = doc.add_page(Mm(215.9), Mm(279.4), "report");
        layer = doc.get_page(page).get_layer(page_layer);
        y = 260.0;
    }
    y -= 6.0;
    layer.use_text(
        format!("Total Records: {}", total_records),
        11.0,
        Mm(15.0),
        Mm(y),
        &regular,
    );
    y -= 6.0;
    layer.use_text(
        format!("Total Hours: {:.2}", total_hours),
        11.0,
        Mm(15.0),
        Mm(y),
        &regular,
    );

    Ok(doc.save_to_bytes()?)
}

/// PDF export of the filtered report
#[utoipa::path(
    get,
    path = "/api/reports/export-pdf",
    params(ReportQuery),
    responses(
        (status = 200, description = "PDF attachment"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("session_cookie" = [])
    ),
    tag = "Reports"
)]
pub async fn export_pdf(
    session: SessionUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ReportQuery>,
) -> actix_web::Result<impl Responder> {
    session.require_admin()?;

    let (start, end) = window_dates(&query, EXPORT_DEFAULT_DAYS);
    let (from, to) = day_bounds(start, end);

    let records = fetch_report_rows(pool.get_ref(), query.user_id, from, to)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch rows for PDF export");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let title = match query.user_id {
        Some(user_id) => {
            let username =
                sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_optional(pool.get_ref())
                    .await
                    .map_err(|e| {
                        error!(error = %e, user_id, "Failed to resolve report user");
                        actix_web::error::ErrorInternalServerError("Internal Server Error")
                    })?;
            match username {
                Some(name) => format!("Attendance Report for {}", name),
                None => "Attendance Report".to_string(),
            }
        }
        None => "Attendance Report for All Users".to_string(),
    };
    let period = format!(
        "Period: {} to {}",
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d")
    );

    let lines: Vec<String> = records.iter().map(pdf_line).collect();
    let total_hours: f64 = records.iter().filter_map(|r| r.duration).sum();

    let pdf = render_pdf(&title, &period, &lines, records.len(), total_hours).map_err(|e| {
        error!(error = %e, "PDF rendering failed");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    let filename = export_filename(start, end, "pdf");

    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(pdf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_row(
        id: u64,
        username: &str,
        check_out: Option<DateTime<Utc>>,
        notes: Option<&str>,
    ) -> ReportRow {
        ReportRow::from(ReportRowSql {
            id,
            user_id: 2,
            username: username.to_string(),
            check_in_time: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            check_out_time: check_out,
            location_data: r#"{"latitude":37.7749,"longitude":-122.4194}"#.to_string(),
            location_address: None,
            notes: notes.map(|s| s.to_string()),
        })
    }

    #[test]
    fn esc_leaves_plain_fields_alone() {
        assert_eq!(esc("plain"), "plain");
    }

    #[test]
    fn esc_quotes_commas_quotes_and_newlines() {
        assert_eq!(esc("a,b"), "\"a,b\"");
        assert_eq!(esc("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(esc("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn day_bounds_cover_the_whole_days_inclusively() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let (from, to) = day_bounds(start, end);

        assert_eq!(from.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2024-01-07T23:59:59+00:00");
    }

    #[test]
    fn explicit_window_dates_pass_through() {
        let query = ReportQuery {
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 2),
            user_id: None,
        };
        let (start, end) = window_dates(&query, REPORT_DEFAULT_DAYS);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 2).unwrap());
    }

    #[test]
    fn report_row_derives_duration_from_the_join() {
        let closed = sample_row(
            1,
            "jdoe",
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 17, 30, 0).unwrap()),
            None,
        );
        assert_eq!(closed.duration, Some(8.5));

        let open = sample_row(2, "jdoe", None, None);
        assert_eq!(open.duration, None);
    }

    #[test]
    fn csv_has_header_and_escaped_fields() {
        let rows = vec![sample_row(
            1,
            "doe, jane",
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 17, 30, 0).unwrap()),
            Some("met \"the\" client"),
        )];

        let csv = build_csv(&rows);
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "ID,Username,Check-in Time,Check-out Time,Duration (hours),\"Location (Lat, Long)\",Address,Notes"
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("1,\"doe, jane\",2024-01-01 09:00:00,2024-01-01 17:30:00,8.5,"));
        assert!(row.contains("\"37.7749, -122.4194\""));
        assert!(row.contains("\"met \"\"the\"\" client\""));
        assert!(lines.next().is_none());
    }

    #[test]
    fn open_record_exports_na_fields() {
        let rows = vec![sample_row(3, "jdoe", None, None)];
        let csv = build_csv(&rows);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.contains(",N/A,N/A,"));
    }

    #[test]
    fn export_filename_encodes_the_window() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            export_filename(start, end, "csv"),
            "attendance_report_20240101_to_20240131.csv"
        );
    }

    #[test]
    fn rendered_pdf_has_the_magic_header() {
        let rows = vec![sample_row(
            1,
            "jdoe",
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 17, 30, 0).unwrap()),
            None,
        )];
        let lines: Vec<String> = rows.iter().map(pdf_line).collect();

        let pdf = render_pdf(
            "Attendance Report for All Users",
            "Period: 2024-01-01 to 2024-01-31",
            &lines,
            rows.len(),
            8.5,
        )
        .unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn pdf_pagination_survives_many_rows() {
        let lines: Vec<String> = (0..200).map(|i| format!("row {}", i)).collect();
        let pdf = render_pdf("Title", "Period", &lines, 200, 0.0).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }
}
