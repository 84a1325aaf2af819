//! Submit-transaction request and the row field table
//!
//! Rows arrive as a validated field map keyed by schema field name
//! (`DEBIT.ACCT.NO`, `CREDIT.AMOUNT`, ...). [`TransactionRequest::from_fields`]
//! maps them through a fixed, explicit table:
//! - unknown fields are dropped
//! - values are trimmed and blank values omitted
//! - amount fields are parsed as decimals after stripping `,` thousands
//!   separators; an unparseable amount is omitted
//!
//! All functions are pure (no I/O) for easy testing.

use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::types::FieldMap;

/// Request sent to the gateway's submit endpoint: `{"body": {...}}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionRequest {
    pub body: RequestBody,
}

/// Transfer body; absent fields are not serialized
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exposure_date: Option<String>,

    // Debit leg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit_acct_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit_value_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debit_their_ref: Option<String>,

    // Credit leg
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_acct_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_value_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_their_ref: Option<String>,

    // Ordering party
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering_cust: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering_bank: Option<String>,

    // Commissions and charges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_amt: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_amt: Option<Decimal>,

    // Accounting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_centre_cust: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_centre_dept: Option<String>,
}

impl TransactionRequest {
    /// Build a request from a row's field map
    pub fn from_fields(fields: &FieldMap) -> Self {
        let mut request = TransactionRequest::default();
        for (name, value) in fields {
            if let Some(text) = field_text(value) {
                request.body.populate(name, text.trim());
            }
        }
        request
    }
}

impl RequestBody {
    fn populate(&mut self, name: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        let text = Some(value.to_string());
        match name {
            "TRANSACTION.TYPE" => self.transaction_type = text,
            "DEBIT.ACCT.NO" => self.debit_acct_no = text,
            "DEBIT.CURRENCY" => self.debit_currency = text,
            "DEBIT.AMOUNT" => self.debit_amount = parse_amount(value),
            "DEBIT.VALUE.DATE" => self.debit_value_date = text,
            "DEBIT.THEIR.REF" => self.debit_their_ref = text,
            "CREDIT.ACCT.NO" => self.credit_acct_no = text,
            "CREDIT.CURRENCY" => self.credit_currency = text,
            "CREDIT.AMOUNT" => self.credit_amount = parse_amount(value),
            "CREDIT.VALUE.DATE" => self.credit_value_date = text,
            "CREDIT.THEIR.REF" => self.credit_their_ref = text,
            "PROCESSING.DATE" => self.processing_date = text,
            "EXPOSURE.DATE" => self.exposure_date = text,
            "PAYMENT.DETAILS" => self.payment_details = text,
            "ORDERING.CUST" => self.ordering_cust = text,
            "ORDERING.BANK" => self.ordering_bank = text,
            "COMMISSION.CODE" => self.commission_code = text,
            "COMMISSION.TYPE" => self.commission_type = text,
            "COMMISSION.AMT" => self.commission_amt = parse_amount(value),
            "CHARGE.CODE" => self.charge_code = text,
            "CHARGE.TYPE" => self.charge_type = text,
            "CHARGE.AMT" => self.charge_amt = parse_amount(value),
            "PROFIT.CENTRE.CUST" => self.profit_centre_cust = text,
            "PROFIT.CENTRE.DEPT" => self.profit_centre_dept = text,
            _ => {}
        }
    }
}

/// Text form of a field value; `null` yields nothing
pub(crate) fn field_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn parse_amount(value: &str) -> Option<Decimal> {
    Decimal::from_str(&value.replace(',', "")).ok()
}
