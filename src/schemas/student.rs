use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct PaymentSummaryResponse {
    pub(crate) student_code: String,
    pub(crate) name: String,
    pub(crate) level: String,
    pub(crate) contract_start: Option<String>,
    pub(crate) status: String,
    pub(crate) amount_paid: String,
    pub(crate) balance: String,
    pub(crate) fully_paid: bool,
}
