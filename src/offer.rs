//! Delivery of a finished quote: the offer e-mail and the printable offer
//! document.

use chrono::Utc;
use serde_json::json;
use thiserror::Error;

use crate::api::{ApiError, EmailRequest, OfferDocumentRequest, QuoteBackend};
use crate::render::format_pln;
use crate::state::{QuoteState, StateError, StateStore};
use crate::validation::patterns::is_email;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

pub const DEFAULT_SUBJECT: &str = "Oferta TOP-INSTAL";
pub const DEFAULT_CUSTOMER_NAME: &str = "Klient";
pub const EMAIL_SENT_MESSAGE: &str = "Email został wysłany pomyślnie";

#[derive(Debug, Error)]
pub enum OfferError {
    #[error("Podaj prawidłowy adres email")]
    InvalidEmail,
    #[error("Najpierw zakończ kalkulację")]
    CalculationIncomplete,
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    State(#[from] StateError),
}

fn offer_message(state: &QuoteState) -> String {
    let summary = state.pdf_summary();
    let power = summary
        .moc
        .map_or_else(|| "Nie obliczono".to_string(), |moc| format!("{moc} kW"));
    let price = summary
        .price
        .map_or_else(|| "Do wyceny".to_string(), format_pln);

    format!(
        "<p>Dziękujemy za skorzystanie z kalkulatora pomp ciepła.</p>\
         <ul>\
         <li>Moc pompy ciepła: {power}</li>\
         <li>Zestaw: {}</li>\
         <li>Bufor: {}</li>\
         <li>Zasobnik CWU: {}</li>\
         <li>Cena: {price}</li>\
         </ul>",
        summary.kit.as_deref().unwrap_or("Do ustalenia"),
        summary.buffer.as_deref().unwrap_or("Standardowy"),
        summary.cwu.as_deref().unwrap_or("Standardowe"),
    )
}

/// Sends the current quote to `to`. On success the state records
/// `emailSent` and `emailSentAt`.
pub async fn send_offer_email<B: QuoteBackend>(
    backend: &B,
    state: &StateStore,
    to: &str,
    pdf_data: Option<String>,
) -> Result<String, OfferError> {
    let to = to.trim();
    if !is_email(to) {
        return Err(OfferError::InvalidEmail);
    }

    let snapshot = state.get_all();
    let request = EmailRequest {
        to: to.to_string(),
        email: to.to_string(),
        subject: DEFAULT_SUBJECT.into(),
        message: offer_message(&snapshot),
        customer_name: snapshot
            .name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.into()),
        pdf_data: pdf_data.unwrap_or_default(),
        language: "pl".into(),
    };

    let response = backend.send_email(&request).await?;
    if !response.success {
        let message = response
            .error
            .or(response.message)
            .unwrap_or_else(|| "Nie udało się wysłać emaila".into());
        log_warn!("Email proxy refused the offer: {message}");
        return Err(OfferError::Rejected(message));
    }

    state
        .update(json!({
            "emailSent": true,
            "emailSentAt": Utc::now().to_rfc3339(),
        }))
        .await?;
    log_info!("Offer sent to {to}");
    Ok(EMAIL_SENT_MESSAGE.to_string())
}

/// Asks the backend to lay out the offer and returns its HTML. Marks the
/// state `pdfReady` once the document exists.
pub async fn generate_offer_document<B: QuoteBackend>(
    backend: &B,
    state: &StateStore,
) -> Result<String, OfferError> {
    let snapshot = state.get_all();
    if !snapshot.is_calculation_complete() {
        return Err(OfferError::CalculationIncomplete);
    }

    let request = OfferDocumentRequest {
        building_data: json!({
            "powierzchnia": snapshot.heated_area,
            "mocObliczona": snapshot.power(),
            "kondygnacje": snapshot.floors,
        }),
        pump_data: json!({
            "kit": snapshot.kit,
            "buffer": snapshot.buffer,
            "cwu": snapshot.cwu,
        }),
        pricing: json!({
            "total": snapshot.price,
            "net": snapshot.price_net,
            "gross": snapshot.price_gross,
        }),
    };

    let response = backend.generate_offer_document(&request).await?;
    let html = match (response.success, response.html_content) {
        (true, Some(html)) if !html.is_empty() => html,
        _ => {
            let message = response
                .error
                .or(response.message)
                .unwrap_or_else(|| "Nie udało się wygenerować oferty".into());
            return Err(OfferError::Rejected(message));
        }
    };

    state.set("pdfReady", true).await?;
    log_info!("Offer document generated ({} bytes)", html.len());
    Ok(html)
}
