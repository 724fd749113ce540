//! Payment receipts rendered as single-page PDF documents.
//!
//! The verification QR code is optional: when it cannot be encoded the
//! receipt carries a short placeholder line instead.

use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfLayerReference, Rect, Rgb};
use qrcode::QrCode;
use thiserror::Error;

use crate::core::metrics;
use crate::repositories::students::StudentProfile;
use crate::services::currency::format_cedis;

const SCHOOL_NAME: &str = "Learn Language Education Academy";
const SCHOOL_CONTACT: &str = "https://www.learngermanghana.com | 0205706589 | Accra, Ghana";
const BUSINESS_REG: &str = "Business Reg No: BN173410224";
pub(crate) const QR_PLACEHOLDER: &str = "[QR code unavailable]";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const QR_SIZE: f32 = 30.0;

#[derive(Debug, Error)]
pub(crate) enum ReceiptError {
    #[error("failed to render receipt PDF: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// "Full payment" once nothing is owed, otherwise the outstanding balance.
pub(crate) fn payment_status(balance: f64) -> String {
    if balance <= 0.0 {
        "Full payment".to_string()
    } else {
        format!("Installment - Balance remaining {}", format_cedis(balance))
    }
}

pub(crate) fn header_lines() -> [&'static str; 4] {
    ["Payment Receipt", SCHOOL_NAME, SCHOOL_CONTACT, BUSINESS_REG]
}

pub(crate) fn receipt_lines(profile: &StudentProfile, receipt_date: &str) -> Vec<String> {
    vec![
        format!("Status: {}", payment_status(profile.balance)),
        format!("Student: {} ({})", profile.name, profile.level),
        format!("Student Code: {}", profile.student_code),
        format!("Contract Start: {}", profile.contract_start.as_deref().unwrap_or("-")),
        format!("Amount Paid: {}", format_cedis(profile.paid)),
        format!("Balance: {}", format_cedis(profile.balance)),
        format!("Date: {receipt_date}"),
    ]
}

/// Plain-text receipt, sent when the PDF cannot be produced.
pub(crate) fn receipt_text(profile: &StudentProfile, receipt_date: &str) -> String {
    let mut lines: Vec<String> = header_lines().iter().map(|line| line.to_string()).collect();
    lines.push(String::new());
    lines.extend(receipt_lines(profile, receipt_date));
    lines.join("\n")
}

fn qr_payload(profile: &StudentProfile, receipt_date: &str) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        profile.student_code,
        profile.name,
        profile.level,
        format_cedis(profile.paid),
        format_cedis(profile.balance),
        receipt_date
    )
}

/// Dark modules of the QR code for `payload`, row-major, with its width.
pub(crate) fn qr_modules(payload: &str) -> Result<(usize, Vec<bool>), qrcode::types::QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    let dark = code
        .to_colors()
        .into_iter()
        .map(|color| matches!(color, qrcode::Color::Dark))
        .collect();
    Ok((code.width(), dark))
}

fn draw_qr(layer: &PdfLayerReference, font: &IndirectFontRef, payload: &str) {
    let left = PAGE_WIDTH - MARGIN - QR_SIZE;
    let (width, dark) = match qr_modules(payload) {
        Ok(modules) => modules,
        Err(err) => {
            tracing::warn!(error = %err, "Receipt QR code unavailable, using placeholder");
            metrics::record_external_fallback("receipt_qr");
            layer.use_text(QR_PLACEHOLDER, 8.0, Mm(left), Mm(MARGIN), font);
            return;
        }
    };

    let module = QR_SIZE / width as f32;
    layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    for (index, _) in dark.iter().enumerate().filter(|(_, is_dark)| **is_dark) {
        let (row, col) = (index / width, index % width);
        let x = left + col as f32 * module;
        let y = MARGIN + QR_SIZE - (row + 1) as f32 * module;
        layer.add_rect(Rect::new(Mm(x), Mm(y), Mm(x + module), Mm(y + module)));
    }
}

pub(crate) fn render_receipt_pdf(
    profile: &StudentProfile,
    receipt_date: &str,
) -> Result<Vec<u8>, ReceiptError> {
    let (doc, page, layer) =
        PdfDocument::new("Payment Receipt", Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Receipt");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut y = PAGE_HEIGHT - 30.0;
    let [title, school @ ..] = header_lines();
    layer.use_text(title, 16.0, Mm(MARGIN), Mm(y), &bold);
    for line in school {
        y -= 7.0;
        layer.use_text(line, 10.0, Mm(MARGIN), Mm(y), &regular);
    }

    y -= 8.0;
    for line in receipt_lines(profile, receipt_date) {
        y -= 10.0;
        layer.use_text(line, 12.0, Mm(MARGIN), Mm(y), &regular);
    }

    draw_qr(&layer, &regular, &qr_payload(profile, receipt_date));

    Ok(doc.save_to_bytes()?)
}
