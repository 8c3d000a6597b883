//! Structures representing json schema sent to and from Binance C2C, and
//! between the form and the proxy.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::{fmt, str::FromStr};

/// Api key and secret for one user session.
///
/// These are never persisted and never serialized; `Debug` redacts them.
#[derive(Clone, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// The api key, sent in the `X-MBX-APIKEY` header
    pub api_key: String,
    /// The secret key, used only as the hmac key
    pub secret_key: String,
}

impl Credentials {
    /// Make credentials from a key and secret
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// True if either the key or the secret is empty
    pub fn is_incomplete(&self) -> bool {
        self.api_key.is_empty() || self.secret_key.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key_prefix: String = self.api_key.chars().take(4).collect();
        f.debug_struct("Credentials")
            .field("api_key", &format_args!("{}***", key_prefix))
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// A payment method attached to one of the user's existing ads
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    /// Id of the user's configured payment method
    #[serde(with = "crate::serde_helpers::string_or_number")]
    pub pay_id: String,
    /// Payment type, e.g. "BANK_TRANSFER"
    #[serde(default)]
    pub pay_type: String,
    /// Payment method identifier, e.g. "BankTransfer"
    #[serde(default)]
    pub identifier: String,
    /// Human readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trade_method_name: Option<String>,
    /// Color hint for the method's icon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url_color: Option<String>,
    /// Extra method-specific fields, passed through untouched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Value>,
}

impl PaymentMethod {
    /// Name to show a user: trade method name, else identifier, else pay type
    pub fn display_name(&self) -> &str {
        match self.trade_method_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.identifier.is_empty() => &self.identifier,
            _ => &self.pay_type,
        }
    }
}

/// The payment-method descriptor embedded in an ad's `tradeMethods` list
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeMethod {
    /// Payment method identifier
    pub identifier: String,
    /// Id of the user's configured payment method
    #[serde(with = "crate::serde_helpers::string_or_number")]
    pub pay_id: String,
    /// Payment type
    pub pay_type: String,
}

/// Sentinel meaning "no restriction" for an eligibility filter
pub const UNRESTRICTED: i64 = -1;

/// Filter-time value meaning "all time history"
pub const ALL_TIME_HISTORY: i64 = 2;

/// Buyer-eligibility filters that the Binance UI does not expose.
///
/// Each bound is inclusive, and every bound that is set must hold for a buyer
/// to see the ad. [UNRESTRICTED] disables a bound.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedFilters {
    /// Maximum total trade count
    pub user_all_trade_count_max: i64,
    /// Minimum total trade count
    pub user_all_trade_count_min: i64,
    /// Maximum buy trade count
    pub user_buy_trade_count_max: i64,
    /// Minimum buy trade count
    pub user_buy_trade_count_min: i64,
    /// Maximum sell trade count
    pub user_sell_trade_count_max: i64,
    /// Minimum sell trade count
    pub user_sell_trade_count_min: i64,
    /// Minimum number of completed trades
    pub user_trade_complete_count_min: i64,
    /// Minimum completion rate, in percent
    pub user_trade_complete_rate_min: i64,
    /// Period for the completion rate: 0 or 2 = all time, 1 = last 30 days
    pub user_trade_complete_rate_filter_time: i64,
    /// Period for the trade counts: 0 or 2 = all time, 1 = last 30 days
    pub user_trade_count_filter_time: i64,
}

impl Default for AdvancedFilters {
    fn default() -> Self {
        Self {
            user_all_trade_count_max: UNRESTRICTED,
            user_all_trade_count_min: UNRESTRICTED,
            user_buy_trade_count_max: UNRESTRICTED,
            user_buy_trade_count_min: UNRESTRICTED,
            user_sell_trade_count_max: UNRESTRICTED,
            user_sell_trade_count_min: UNRESTRICTED,
            user_trade_complete_count_min: UNRESTRICTED,
            user_trade_complete_rate_min: UNRESTRICTED,
            user_trade_complete_rate_filter_time: ALL_TIME_HISTORY,
            user_trade_count_filter_time: ALL_TIME_HISTORY,
        }
    }
}

/// Names of the editable filter fields
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FilterField {
    /// userAllTradeCountMin
    AllTradeCountMin,
    /// userAllTradeCountMax
    AllTradeCountMax,
    /// userBuyTradeCountMin
    BuyTradeCountMin,
    /// userBuyTradeCountMax
    BuyTradeCountMax,
    /// userSellTradeCountMin
    SellTradeCountMin,
    /// userSellTradeCountMax
    SellTradeCountMax,
    /// userTradeCompleteCountMin
    TradeCompleteCountMin,
    /// userTradeCompleteRateMin
    TradeCompleteRateMin,
    /// userTradeCompleteRateFilterTime
    TradeCompleteRateFilterTime,
    /// userTradeCountFilterTime
    TradeCountFilterTime,
}

impl FilterField {
    /// Every field, in the order the form presents them
    pub const ALL: [FilterField; 10] = [
        FilterField::AllTradeCountMin,
        FilterField::AllTradeCountMax,
        FilterField::BuyTradeCountMin,
        FilterField::BuyTradeCountMax,
        FilterField::SellTradeCountMin,
        FilterField::SellTradeCountMax,
        FilterField::TradeCompleteCountMin,
        FilterField::TradeCompleteRateMin,
        FilterField::TradeCompleteRateFilterTime,
        FilterField::TradeCountFilterTime,
    ];

    /// The json key of this field
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterField::AllTradeCountMin => "userAllTradeCountMin",
            FilterField::AllTradeCountMax => "userAllTradeCountMax",
            FilterField::BuyTradeCountMin => "userBuyTradeCountMin",
            FilterField::BuyTradeCountMax => "userBuyTradeCountMax",
            FilterField::SellTradeCountMin => "userSellTradeCountMin",
            FilterField::SellTradeCountMax => "userSellTradeCountMax",
            FilterField::TradeCompleteCountMin => "userTradeCompleteCountMin",
            FilterField::TradeCompleteRateMin => "userTradeCompleteRateMin",
            FilterField::TradeCompleteRateFilterTime => "userTradeCompleteRateFilterTime",
            FilterField::TradeCountFilterTime => "userTradeCountFilterTime",
        }
    }

    /// True for the two period selectors, which are not bounds
    pub fn is_period(&self) -> bool {
        matches!(self, FilterField::TradeCompleteRateFilterTime | FilterField::TradeCountFilterTime)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterField {
    type Err = String;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        FilterField::ALL
            .into_iter()
            .find(|field| field.as_str() == src)
            .ok_or_else(|| format!("unknown filter field: {}", src))
    }
}

impl AdvancedFilters {
    /// Read a field
    pub fn get(&self, field: FilterField) -> i64 {
        match field {
            FilterField::AllTradeCountMin => self.user_all_trade_count_min,
            FilterField::AllTradeCountMax => self.user_all_trade_count_max,
            FilterField::BuyTradeCountMin => self.user_buy_trade_count_min,
            FilterField::BuyTradeCountMax => self.user_buy_trade_count_max,
            FilterField::SellTradeCountMin => self.user_sell_trade_count_min,
            FilterField::SellTradeCountMax => self.user_sell_trade_count_max,
            FilterField::TradeCompleteCountMin => self.user_trade_complete_count_min,
            FilterField::TradeCompleteRateMin => self.user_trade_complete_rate_min,
            FilterField::TradeCompleteRateFilterTime => self.user_trade_complete_rate_filter_time,
            FilterField::TradeCountFilterTime => self.user_trade_count_filter_time,
        }
    }

    /// Set a field. Values below [UNRESTRICTED] are clamped to it.
    pub fn set(&mut self, field: FilterField, value: i64) {
        let value = value.max(UNRESTRICTED);
        let slot = match field {
            FilterField::AllTradeCountMin => &mut self.user_all_trade_count_min,
            FilterField::AllTradeCountMax => &mut self.user_all_trade_count_max,
            FilterField::BuyTradeCountMin => &mut self.user_buy_trade_count_min,
            FilterField::BuyTradeCountMax => &mut self.user_buy_trade_count_max,
            FilterField::SellTradeCountMin => &mut self.user_sell_trade_count_min,
            FilterField::SellTradeCountMax => &mut self.user_sell_trade_count_max,
            FilterField::TradeCompleteCountMin => &mut self.user_trade_complete_count_min,
            FilterField::TradeCompleteRateMin => &mut self.user_trade_complete_rate_min,
            FilterField::TradeCompleteRateFilterTime => &mut self.user_trade_complete_rate_filter_time,
            FilterField::TradeCountFilterTime => &mut self.user_trade_count_filter_time,
        };
        *slot = value;
    }

    /// Set a field from user text input. Anything that is not an integer means "unrestricted".
    pub fn set_from_input(&mut self, field: FilterField, input: &str) {
        self.set(field, parse_filter_input(input));
    }

    /// Human readable description of every bound that is currently set
    pub fn active_restrictions(&self) -> Vec<String> {
        let bounds = [
            (self.user_all_trade_count_min, "Total trades", ">="),
            (self.user_all_trade_count_max, "Total trades", "<="),
            (self.user_buy_trade_count_min, "Buy trades", ">="),
            (self.user_buy_trade_count_max, "Buy trades", "<="),
            (self.user_sell_trade_count_min, "Sell trades", ">="),
            (self.user_sell_trade_count_max, "Sell trades", "<="),
            (self.user_trade_complete_count_min, "Completed trades", ">="),
        ];
        let mut lines: Vec<String> = bounds
            .into_iter()
            .filter(|(value, _, _)| *value != UNRESTRICTED)
            .map(|(value, label, op)| format!("{} {} {}", label, op, value))
            .collect();
        if self.user_trade_complete_rate_min != UNRESTRICTED {
            lines.push(format!("Completion rate >= {}%", self.user_trade_complete_rate_min));
        }
        lines
    }
}

/// Parse a filter value typed by a user. Empty or non-integer input is
/// [UNRESTRICTED], as is anything below it.
pub fn parse_filter_input(input: &str) -> i64 {
    input.trim().parse::<i64>().map(|v| v.max(UNRESTRICTED)).unwrap_or(UNRESTRICTED)
}

/// Ad settings that are fixed for a session and not user-editable.
///
/// The ad is created offline with a high price so nobody trades against it
/// before the user edits it on Binance. The hidden filters survive that edit.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedAdDefaults {
    /// Crypto asset being sold
    pub asset: String,
    /// Buyer KYC requirement flag
    pub buyer_kyc_limit: u8,
    /// Fiat currency
    pub fiat_unit: String,
    /// Amount of asset made available
    pub init_amount: u64,
    /// Minimum fiat amount per order
    pub min_single_trans_amount: u64,
    /// Maximum fiat amount per order
    pub max_single_trans_amount: u64,
    /// Unit price in fiat
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    /// 1 = fixed price, 2 = floating
    pub price_type: u8,
    /// "SELL" or "BUY"
    pub trade_type: String,
    /// Ad classification
    pub classify: String,
    /// Whether the ad goes online immediately
    pub online_now: bool,
    /// Whether takers must complete additional KYC
    pub taker_additional_kyc_required: u8,
}

impl Default for FixedAdDefaults {
    fn default() -> Self {
        Self {
            asset: "USDT".to_string(),
            buyer_kyc_limit: 1,
            fiat_unit: "ZAR".to_string(),
            init_amount: 100,
            min_single_trans_amount: 1000,
            max_single_trans_amount: 20000,
            price: Decimal::new(2500, 2),
            price_type: 1,
            trade_type: "SELL".to_string(),
            classify: "profession".to_string(),
            online_now: false,
            taker_additional_kyc_required: 0,
        }
    }
}

/// The json body sent to the ad creation endpoint
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdPayload(pub Map<String, Value>);

impl AdPayload {
    /// Look up a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `tradeMethods` list, if present and well-formed
    pub fn trade_methods(&self) -> Vec<TradeMethod> {
        self.get("tradeMethods")
            .cloned()
            .and_then(|methods| serde_json::from_value(methods).ok())
            .unwrap_or_default()
    }

    /// Consume into a json value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Binance wraps successful C2C responses as `{code, message, data}`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeResponse<T> {
    /// Binance status code, "000000" on success
    #[serde(default)]
    pub code: Option<Value>,
    /// Status message
    #[serde(default)]
    pub message: Option<String>,
    /// Payload
    #[serde(default)]
    pub data: Option<T>,
}

/// The part of an ad-detail response that we care about
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdDetail {
    /// Payment methods attached to the ad
    #[serde(default)]
    pub trade_methods: Option<Vec<PaymentMethod>>,
}
