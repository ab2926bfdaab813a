//! Voice-AI server webhook
//!
//! The voice platform posts every server event to one URL. Only
//! `function-call` events carry work: the assistant invoking one of the
//! booking tools. Everything else is acknowledged and logged.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::backend::BookingBackend;
use crate::error::{BookingError, BookingResult};
use crate::types::{AvailabilityRequest, BookingAppointment};

pub const FUNCTION_CALL: &str = "function-call";
pub const CHECK_AVAILABILITY: &str = "check_availability";
pub const CREATE_BOOKING: &str = "create_booking";

/// Envelope of a webhook post
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub function_call: Option<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub parameters: Value,
}

/// Parameters of the `create_booking` tool
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingParams {
    #[serde(default)]
    customer_name: String,
    #[serde(default)]
    customer_email: String,
    #[serde(default)]
    customer_phone: String,
    #[serde(default)]
    date_time: String,
    #[serde(default)]
    service_type: String,
    #[serde(default)]
    notes: Option<String>,
}

impl From<CreateBookingParams> for BookingAppointment {
    fn from(params: CreateBookingParams) -> Self {
        BookingAppointment {
            customer_name: params.customer_name,
            customer_email: params.customer_email,
            customer_phone: params.customer_phone,
            service_id: params.service_type,
            start_date_time: params.date_time,
            end_date_time: String::new(),
            notes: params.notes,
        }
    }
}

fn parameters<T>(call: &FunctionCall) -> BookingResult<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if call.parameters.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(call.parameters.clone())
        .map_err(|e| BookingError::validation(format!("Invalid parameters for {}: {}", call.name, e)))
}

/// Handle one webhook post and produce the JSON body to return
pub async fn handle_event(backend: &dyn BookingBackend, event: WebhookEvent) -> BookingResult<Value> {
    if event.kind != FUNCTION_CALL {
        debug!("Acknowledging webhook event '{}'", event.kind);
        return Ok(json!({ "success": true }));
    }

    let call = event
        .function_call
        .ok_or_else(|| BookingError::validation("No function call data"))?;
    debug!("Dispatching tool call {}", call.name);

    match call.name.as_str() {
        CHECK_AVAILABILITY => {
            let request: AvailabilityRequest = parameters(&call)?;
            request.validate()?;
            let slots: Vec<_> = backend
                .check_availability(&request)
                .await?
                .into_iter()
                .filter(|slot| slot.available)
                .collect();

            Ok(json!({
                "result": {
                    "date": request.date,
                    "serviceType": request.service_type,
                    "slots": slots,
                }
            }))
        }
        CREATE_BOOKING => {
            let appointment: BookingAppointment = parameters::<CreateBookingParams>(&call)?.into();
            appointment.validate()?;
            let confirmation = backend.create_appointment(&appointment).await?;

            Ok(json!({
                "result": {
                    "success": true,
                    "bookingId": confirmation.booking_id,
                    "message": format!(
                        "Appointment scheduled for {} on {}",
                        appointment.customer_name, appointment.start_date_time
                    ),
                }
            }))
        }
        _ => Err(BookingError::UnknownFunction(call.name)),
    }
}
