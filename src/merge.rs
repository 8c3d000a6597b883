//! Assembly of the ad creation payload.
//!
//! The payload is a shallow merge of three json objects, applied in order:
//! the fixed ad defaults, the advanced filters, then the payment-method block.
//! A key appearing in a later object replaces the earlier value.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{AdPayload, AdvancedFilters, Error, FixedAdDefaults, PaymentMethod, Result, TradeMethod};

/// Identifier that the bank-transfer tagging puts on every trade method
pub const BANK_TRANSFER_IDENTIFIER: &str = "BankTransfer";
/// Pay type that the bank-transfer tagging puts on every trade method
pub const BANK_TRANSFER_PAY_TYPE: &str = "BANK_TRANSFER";

/// How the selected payment method is described in `tradeMethods`
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TradeMethodTagging {
    /// Always tag as "BankTransfer" / "BANK_TRANSFER", whatever was selected
    #[default]
    BankTransfer,
    /// Use the selected method's own identifier and pay type
    Selected,
}

/// Build the payload for a selected pay id, tagging it as a bank transfer.
pub fn build_ad_payload(defaults: &FixedAdDefaults, filters: &AdvancedFilters, pay_id: &str) -> Result<AdPayload> {
    let method = TradeMethod {
        identifier: BANK_TRANSFER_IDENTIFIER.to_string(),
        pay_id: pay_id.to_string(),
        pay_type: BANK_TRANSFER_PAY_TYPE.to_string(),
    };
    merge(defaults, filters, method)
}

/// Build the payload for a selected payment method, carrying through its real
/// identifier and pay type.
pub fn build_ad_payload_for_method(
    defaults: &FixedAdDefaults,
    filters: &AdvancedFilters,
    method: &PaymentMethod,
) -> Result<AdPayload> {
    let method = TradeMethod {
        identifier: method.identifier.clone(),
        pay_id: method.pay_id.clone(),
        pay_type: method.pay_type.clone(),
    };
    merge(defaults, filters, method)
}

/// Build the payload according to a tagging policy
pub fn build_ad_payload_tagged(
    defaults: &FixedAdDefaults,
    filters: &AdvancedFilters,
    method: &PaymentMethod,
    tagging: TradeMethodTagging,
) -> Result<AdPayload> {
    match tagging {
        TradeMethodTagging::BankTransfer => build_ad_payload(defaults, filters, &method.pay_id),
        TradeMethodTagging::Selected => build_ad_payload_for_method(defaults, filters, method),
    }
}

fn merge(defaults: &FixedAdDefaults, filters: &AdvancedFilters, method: TradeMethod) -> Result<AdPayload> {
    let mut payload = Map::new();
    payload.extend(to_object(defaults)?);
    payload.extend(to_object(filters)?);
    payload.insert("payId".to_string(), Value::String(method.pay_id.clone()));
    payload.insert(
        "tradeMethods".to_string(),
        Value::Array(vec![serde_json::to_value(method).map_err(Error::SerializingPayload)?]),
    );
    Ok(AdPayload(payload))
}

fn to_object<T: Serialize>(src: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(src).map_err(Error::SerializingPayload)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::SerializingPayload(serde::ser::Error::custom(format!(
            "expected a json object, found: {}",
            other
        )))),
    }
}
