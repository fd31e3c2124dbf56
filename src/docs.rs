use crate::api::attendance::{
    DayPeriodsResponse, DayQuery, ForcedShiftEnd, MonthQuery, MonthlyHoursResponse, ShiftAction,
    ShiftStateResponse,
};
use crate::api::payslip::{PayslipQuery, UploadPayslip};
use crate::api::profile::ProfileResponse;
use crate::api::vacation::CreateVacation;
use crate::model::attendance::{ActiveShift, GeoPoint, Period};
use crate::model::notification::Notification;
use crate::model::payslip::PayslipMeta;
use crate::model::vacation_request::{VacationRequest, VacationStatus};
use crate::workflow::payslip::PayslipOutcome;
use crate::workflow::shift::ShiftOutcome;
use crate::workflow::vacation::DecisionOutcome;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shiftdesk API",
        version = "1.0.0",
        description = r#"
## Workforce attendance & vacation backend

Attendance shift tracking, monthly hour aggregation, vacation balances and
payslip delivery for one company, exposed as a JSON API.

### Key features
- **Attendance**
  - Start/end shift transitions with a one-open-period ledger invariant
  - Automatic force-end of shifts open longer than 13 hours
  - Monthly worked-hours summary (13h cap per period)
- **Vacation**
  - Requests with inclusive day counts and daily prorated accrual
  - Atomic approve/deduct with an authoritative balance check
- **Notifications**
  - Per-user side-channel records, dismissed on read
- **Payslips**
  - One document per month, duplicate-safe upload

### Security
All endpoints expect a **JWT Bearer token** minted by the identity
provider; manager-only operations are enforced per route.
"#,
    ),
    paths(
        crate::api::attendance::start_shift,
        crate::api::attendance::end_shift,
        crate::api::attendance::end_shift_at,
        crate::api::attendance::shift_state,
        crate::api::attendance::day_periods,
        crate::api::attendance::monthly_hours,

        crate::api::vacation::create_request,
        crate::api::vacation::my_requests,
        crate::api::vacation::pending_requests,
        crate::api::vacation::approve_request,
        crate::api::vacation::reject_request,

        crate::api::notifications::list_notifications,
        crate::api::notifications::read_notification,

        crate::api::payslip::upload_payslip,
        crate::api::payslip::list_payslips,
        crate::api::payslip::get_payslip,
        crate::api::payslip::delete_payslip,

        crate::api::profile::me
    ),
    components(
        schemas(
            GeoPoint,
            Period,
            ActiveShift,
            ShiftAction,
            ForcedShiftEnd,
            ShiftStateResponse,
            DayQuery,
            DayPeriodsResponse,
            MonthQuery,
            MonthlyHoursResponse,
            ShiftOutcome,
            CreateVacation,
            VacationRequest,
            VacationStatus,
            DecisionOutcome,
            Notification,
            UploadPayslip,
            PayslipQuery,
            PayslipMeta,
            PayslipOutcome,
            ProfileResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Shift tracking APIs"),
        (name = "Vacation", description = "Vacation request and balance APIs"),
        (name = "Notifications", description = "Per-user notification APIs"),
        (name = "Payslips", description = "Payslip upload and delivery APIs"),
        (name = "Profile", description = "Profile and balance summary APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
