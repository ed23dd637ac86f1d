use crate::api::admin::{AddUserForm, ToggleAdminForm};
use crate::api::attendance::{AttendanceEntry, CheckInForm};
use crate::api::reports::ReportRow;
use crate::model::attendance::{AttendanceRecord, Location};
use crate::models::PublicUser;
use utoipa::Modify;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{OpenApi, openapi};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new("userId"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Team Attendance API",
        version = "1.0.0",
        description = r#"
## Team Attendance Tracker

This API powers a **team attendance tracker**: members check in and out with
their location, administrators manage accounts and pull reports.

### 🔹 Key Features
- **Attendance**
  - Check-in/check-out with geolocation, status and personal history
- **Reports**
  - Date- and user-filtered reports with per-record durations
  - CSV and PDF exports
- **User Management**
  - Create users, toggle admin privileges, dashboard overview

### 🔐 Security
Session identity is carried in the `userId`/`isAdmin` cookies issued at login.
Report and admin endpoints require an admin session.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::status,
        crate::api::attendance::history,

        crate::api::reports::report_list,
        crate::api::reports::export_csv,
        crate::api::reports::export_pdf,

        crate::api::admin::list_users,
        crate::api::admin::add_user,
        crate::api::admin::toggle_admin,
        crate::api::admin::dashboard
    ),
    components(
        schemas(
            CheckInForm,
            AttendanceEntry,
            AttendanceRecord,
            Location,
            ReportRow,
            PublicUser,
            AddUserForm,
            ToggleAdminForm
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in/check-out APIs"),
        (name = "Reports", description = "Attendance report and export APIs"),
        (name = "Admin", description = "User management APIs"),
    )
)]
pub struct ApiDoc;
