//! Payment gateway adapter.
//!
//! The lifecycle engine asks a `PaymentGateway` for a checkout session and
//! hands the redirect target back to the patient. The gateway later calls the
//! success URL, which lands in `LifecycleEngine::confirm_payment`.

use crate::config::PaymentConfig;
use crate::error::GatewayError;
use crate::log::PAYMENT;
use crate::models::Appointment;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

/// A single-line checkout for one appointment's bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub appointment_id: Uuid,
    pub description: String,
    /// Bill amount in minor currency units.
    pub unit_amount: i64,
    pub currency: String,
    pub quantity: u32,
    pub success_url: String,
}

impl CheckoutRequest {
    pub fn for_appointment(
        appointment: &Appointment,
        payment: &PaymentConfig,
    ) -> Result<Self, GatewayError> {
        let unit_amount = minor_units(appointment.bill_amount)?;

        Ok(CheckoutRequest {
            appointment_id: appointment.id,
            description: format!("Hospital Appointment - {}", appointment.doctor_type),
            unit_amount,
            currency: payment.currency.to_lowercase(),
            quantity: 1,
            success_url: payment.success_url_for(&appointment.id),
        })
    }

    /// The amount charged, back in major units.
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.unit_amount * i64::from(self.quantity), 2)
    }
}

/// Opaque result of starting a checkout: where to send the patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub session_id: String,
    pub redirect_url: String,
    pub amount: Decimal,
    pub currency: String,
}

pub trait PaymentGateway {
    fn create_checkout(&self, request: &CheckoutRequest) -> Result<PaymentIntent, GatewayError>;
}

impl<G: PaymentGateway + ?Sized> PaymentGateway for &G {
    fn create_checkout(&self, request: &CheckoutRequest) -> Result<PaymentIntent, GatewayError> {
        (**self).create_checkout(request)
    }
}

/// Offline gateway that mints checkout sessions without calling out.
#[derive(Debug, Clone)]
pub struct SandboxGateway {
    checkout_base_url: String,
}

impl SandboxGateway {
    pub fn new(checkout_base_url: &str) -> Self {
        SandboxGateway {
            checkout_base_url: checkout_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(payment: &PaymentConfig) -> Self {
        SandboxGateway::new(&payment.checkout_base_url)
    }
}

impl Default for SandboxGateway {
    fn default() -> Self {
        SandboxGateway::from_config(&PaymentConfig::default())
    }
}

impl PaymentGateway for SandboxGateway {
    fn create_checkout(&self, request: &CheckoutRequest) -> Result<PaymentIntent, GatewayError> {
        if request.unit_amount <= 0 {
            return Err(GatewayError::InvalidAmount {
                unit_amount: request.unit_amount,
            });
        }
        if request.currency.len() != 3 {
            return Err(GatewayError::UnsupportedCurrency {
                currency: request.currency.to_owned(),
            });
        }

        let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
        let redirect_url = format!("{}/{}", self.checkout_base_url, session_id);

        debug!(
            target: PAYMENT,
            msg = "Created sandbox checkout",
            appointment_id = %request.appointment_id,
            session_id = %session_id,
            unit_amount = request.unit_amount,
            currency = %request.currency,
            success_url = %request.success_url
        );

        Ok(PaymentIntent {
            session_id,
            redirect_url,
            amount: request.amount(),
            currency: request.currency.to_owned(),
        })
    }
}

/// Convert a bill to minor units, truncating anything below one cent.
pub fn minor_units(amount: Decimal) -> Result<i64, GatewayError> {
    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|minor| minor.trunc().to_i64())
        .ok_or(GatewayError::AmountOutOfRange { amount })
}
