//! Payment method data models and API request/response types.
//!
//! This module defines:
//! - `PaymentMethod`: a linked payment instrument and its nested records
//! - `PaymentMethodType`, `PaymentProvider`, `PaymentMethodStatus`, `SecurityLevel`
//! - the create and lifecycle request bodies
//! - `PaymentMethodResponse` (public) and `PaymentMethodDetails` (privileged)
//!
//! Validation and lifecycle operations live in
//! [`services::payment_method_validator`](crate::services::payment_method_validator).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::currency::Currency;

/// What each payment method type needs in order to be structurally valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Requires last four digits
    pub needs_card_data: bool,
    /// Requires bank details
    pub needs_bank_data: bool,
    /// Phone number or wallet address checks apply, per type
    pub needs_digital_data: bool,
    /// Carries an expiry month and year
    pub is_expirable: bool,
}

const CARD: Capabilities = Capabilities {
    needs_card_data: true,
    needs_bank_data: false,
    needs_digital_data: false,
    is_expirable: true,
};

const BANK: Capabilities = Capabilities {
    needs_card_data: false,
    needs_bank_data: true,
    needs_digital_data: false,
    is_expirable: false,
};

const DIGITAL: Capabilities = Capabilities {
    needs_card_data: false,
    needs_bank_data: false,
    needs_digital_data: true,
    is_expirable: false,
};

const PLAIN: Capabilities = Capabilities {
    needs_card_data: false,
    needs_bank_data: false,
    needs_digital_data: false,
    is_expirable: false,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentMethodType {
    CreditCard,
    DebitCard,
    PrepaidCard,
    GiftCard,
    BankAccount,
    EWallet,
    MobileWallet,
    DigitalPayment,
    Crypto,
    BuyNowPayLater,
}

impl PaymentMethodType {
    pub const ALL: [PaymentMethodType; 10] = [
        PaymentMethodType::CreditCard,
        PaymentMethodType::DebitCard,
        PaymentMethodType::PrepaidCard,
        PaymentMethodType::GiftCard,
        PaymentMethodType::BankAccount,
        PaymentMethodType::EWallet,
        PaymentMethodType::MobileWallet,
        PaymentMethodType::DigitalPayment,
        PaymentMethodType::Crypto,
        PaymentMethodType::BuyNowPayLater,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethodType::CreditCard => "credit_card",
            PaymentMethodType::DebitCard => "debit_card",
            PaymentMethodType::PrepaidCard => "prepaid_card",
            PaymentMethodType::GiftCard => "gift_card",
            PaymentMethodType::BankAccount => "bank_account",
            PaymentMethodType::EWallet => "e_wallet",
            PaymentMethodType::MobileWallet => "mobile_wallet",
            PaymentMethodType::DigitalPayment => "digital_payment",
            PaymentMethodType::Crypto => "crypto",
            PaymentMethodType::BuyNowPayLater => "buy_now_pay_later",
        }
    }

    /// Human label used in generated display names.
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethodType::CreditCard => "credit card",
            PaymentMethodType::DebitCard => "debit card",
            PaymentMethodType::PrepaidCard => "prepaid card",
            PaymentMethodType::GiftCard => "gift card",
            PaymentMethodType::BankAccount => "bank account",
            PaymentMethodType::EWallet => "e-wallet",
            PaymentMethodType::MobileWallet => "mobile wallet",
            PaymentMethodType::DigitalPayment => "digital payment",
            PaymentMethodType::Crypto => "crypto wallet",
            PaymentMethodType::BuyNowPayLater => "pay later",
        }
    }

    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            PaymentMethodType::CreditCard
            | PaymentMethodType::DebitCard
            | PaymentMethodType::PrepaidCard
            | PaymentMethodType::GiftCard => &CARD,
            PaymentMethodType::BankAccount => &BANK,
            PaymentMethodType::EWallet
            | PaymentMethodType::MobileWallet
            | PaymentMethodType::DigitalPayment
            | PaymentMethodType::Crypto => &DIGITAL,
            PaymentMethodType::BuyNowPayLater => &PLAIN,
        }
    }
}

impl fmt::Display for PaymentMethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethodType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethodType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown payment method type: {}", s))
    }
}

impl TryFrom<String> for PaymentMethodType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentMethodType> for String {
    fn from(value: PaymentMethodType) -> Self {
        value.as_str().to_string()
    }
}

/// Provider catalogue: card networks, global wallets, regional e-wallets,
/// banks, crypto venues and pay-later providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaymentProvider {
    Visa,
    Mastercard,
    AmericanExpress,
    Jcb,
    UnionPay,
    Discover,
    PayPal,
    Stripe,
    ApplePay,
    GooglePay,
    AlipayPlus,
    WeChatPay,
    GoPay,
    Ovo,
    Dana,
    ShopeePay,
    LinkAja,
    GrabPay,
    TouchNGo,
    Boost,
    GCash,
    Maya,
    TrueMoney,
    MoMo,
    ZaloPay,
    LocalBank,
    Coinbase,
    Binance,
    MetaMask,
    Kredivo,
    Akulaku,
    Atome,
    Afterpay,
    Klarna,
    Other,
}

impl PaymentProvider {
    pub const ALL: [PaymentProvider; 35] = [
        PaymentProvider::Visa,
        PaymentProvider::Mastercard,
        PaymentProvider::AmericanExpress,
        PaymentProvider::Jcb,
        PaymentProvider::UnionPay,
        PaymentProvider::Discover,
        PaymentProvider::PayPal,
        PaymentProvider::Stripe,
        PaymentProvider::ApplePay,
        PaymentProvider::GooglePay,
        PaymentProvider::AlipayPlus,
        PaymentProvider::WeChatPay,
        PaymentProvider::GoPay,
        PaymentProvider::Ovo,
        PaymentProvider::Dana,
        PaymentProvider::ShopeePay,
        PaymentProvider::LinkAja,
        PaymentProvider::GrabPay,
        PaymentProvider::TouchNGo,
        PaymentProvider::Boost,
        PaymentProvider::GCash,
        PaymentProvider::Maya,
        PaymentProvider::TrueMoney,
        PaymentProvider::MoMo,
        PaymentProvider::ZaloPay,
        PaymentProvider::LocalBank,
        PaymentProvider::Coinbase,
        PaymentProvider::Binance,
        PaymentProvider::MetaMask,
        PaymentProvider::Kredivo,
        PaymentProvider::Akulaku,
        PaymentProvider::Atome,
        PaymentProvider::Afterpay,
        PaymentProvider::Klarna,
        PaymentProvider::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentProvider::Visa => "visa",
            PaymentProvider::Mastercard => "mastercard",
            PaymentProvider::AmericanExpress => "american_express",
            PaymentProvider::Jcb => "jcb",
            PaymentProvider::UnionPay => "unionpay",
            PaymentProvider::Discover => "discover",
            PaymentProvider::PayPal => "paypal",
            PaymentProvider::Stripe => "stripe",
            PaymentProvider::ApplePay => "apple_pay",
            PaymentProvider::GooglePay => "google_pay",
            PaymentProvider::AlipayPlus => "alipay_plus",
            PaymentProvider::WeChatPay => "wechat_pay",
            PaymentProvider::GoPay => "gopay",
            PaymentProvider::Ovo => "ovo",
            PaymentProvider::Dana => "dana",
            PaymentProvider::ShopeePay => "shopeepay",
            PaymentProvider::LinkAja => "linkaja",
            PaymentProvider::GrabPay => "grabpay",
            PaymentProvider::TouchNGo => "touch_n_go",
            PaymentProvider::Boost => "boost",
            PaymentProvider::GCash => "gcash",
            PaymentProvider::Maya => "maya",
            PaymentProvider::TrueMoney => "truemoney",
            PaymentProvider::MoMo => "momo",
            PaymentProvider::ZaloPay => "zalopay",
            PaymentProvider::LocalBank => "local_bank",
            PaymentProvider::Coinbase => "coinbase",
            PaymentProvider::Binance => "binance",
            PaymentProvider::MetaMask => "metamask",
            PaymentProvider::Kredivo => "kredivo",
            PaymentProvider::Akulaku => "akulaku",
            PaymentProvider::Atome => "atome",
            PaymentProvider::Afterpay => "afterpay",
            PaymentProvider::Klarna => "klarna",
            PaymentProvider::Other => "other",
        }
    }

    /// Brand name as shown to users.
    pub fn display_name(self) -> &'static str {
        match self {
            PaymentProvider::Visa => "Visa",
            PaymentProvider::Mastercard => "Mastercard",
            PaymentProvider::AmericanExpress => "American Express",
            PaymentProvider::Jcb => "JCB",
            PaymentProvider::UnionPay => "UnionPay",
            PaymentProvider::Discover => "Discover",
            PaymentProvider::PayPal => "PayPal",
            PaymentProvider::Stripe => "Stripe",
            PaymentProvider::ApplePay => "Apple Pay",
            PaymentProvider::GooglePay => "Google Pay",
            PaymentProvider::AlipayPlus => "Alipay+",
            PaymentProvider::WeChatPay => "WeChat Pay",
            PaymentProvider::GoPay => "GoPay",
            PaymentProvider::Ovo => "OVO",
            PaymentProvider::Dana => "DANA",
            PaymentProvider::ShopeePay => "ShopeePay",
            PaymentProvider::LinkAja => "LinkAja",
            PaymentProvider::GrabPay => "GrabPay",
            PaymentProvider::TouchNGo => "Touch 'n Go",
            PaymentProvider::Boost => "Boost",
            PaymentProvider::GCash => "GCash",
            PaymentProvider::Maya => "Maya",
            PaymentProvider::TrueMoney => "TrueMoney",
            PaymentProvider::MoMo => "MoMo",
            PaymentProvider::ZaloPay => "ZaloPay",
            PaymentProvider::LocalBank => "Bank",
            PaymentProvider::Coinbase => "Coinbase",
            PaymentProvider::Binance => "Binance",
            PaymentProvider::MetaMask => "MetaMask",
            PaymentProvider::Kredivo => "Kredivo",
            PaymentProvider::Akulaku => "Akulaku",
            PaymentProvider::Atome => "Atome",
            PaymentProvider::Afterpay => "Afterpay",
            PaymentProvider::Klarna => "Klarna",
            PaymentProvider::Other => "Other",
        }
    }
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentProvider::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("Unknown payment provider: {}", s))
    }
}

impl TryFrom<String> for PaymentProvider {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PaymentProvider> for String {
    fn from(value: PaymentProvider) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethodStatus {
    Pending,
    Active,
    Inactive,
    Expired,
    Blocked,
    Failed,
}

impl PaymentMethodStatus {
    /// Statuses in which the instrument may still be used or reactivated.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            PaymentMethodStatus::Pending
                | PaymentMethodStatus::Active
                | PaymentMethodStatus::Inactive
        )
    }
}

impl fmt::Display for PaymentMethodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethodStatus::Pending => "pending",
            PaymentMethodStatus::Active => "active",
            PaymentMethodStatus::Inactive => "inactive",
            PaymentMethodStatus::Expired => "expired",
            PaymentMethodStatus::Blocked => "blocked",
            PaymentMethodStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl SecurityLevel {
    /// <= 30 low, <= 70 medium, otherwise high.
    pub fn from_risk_score(risk_score: u8) -> Self {
        match risk_score {
            0..=30 => SecurityLevel::Low,
            31..=70 => SecurityLevel::Medium,
            _ => SecurityLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BillingAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BankDetails {
    #[serde(default)]
    pub bank_name: String,
    /// One of checking, savings, current, business
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_holder_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swift_code: Option<String>,
}

/// Pay-later account terms, in minor units of the method's currency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BnplDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credit_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_credit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_plan: Option<String>,
}

/// Type-specific details of the instrument.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaymentMethodMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<BillingAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_details: Option<BankDetails>,
    /// E.164, e.g. `+6281234567890`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bnpl: Option<BnplDetails>,
}

/// Opaque references into the provider's systems.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProviderData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityInfo {
    #[serde(default)]
    pub cvv_verified: bool,
    #[serde(default)]
    pub address_verified: bool,
    #[serde(default)]
    pub three_ds_enrolled: bool,
    /// 0..=100, higher is riskier
    pub risk_score: u8,
    #[serde(default)]
    pub fraud_flags: Vec<String>,
    #[serde(default)]
    pub security_level: SecurityLevel,
    #[serde(default)]
    pub last_assessed_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_RISK_SCORE: u8 = 50;

impl Default for SecurityInfo {
    fn default() -> Self {
        Self {
            cvv_verified: false,
            address_verified: false,
            three_ds_enrolled: false,
            risk_score: DEFAULT_RISK_SCORE,
            fraud_flags: Vec::new(),
            security_level: SecurityLevel::Medium,
            last_assessed_at: None,
        }
    }
}

/// Running usage counters. Amounts are minor units.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_transactions: u64,
    pub successful_transactions: u64,
    pub failed_transactions: u64,
    /// Sum of successful uses
    pub total_amount: i64,
    /// Mean of successful uses
    pub average_amount: i64,
    pub monthly_usage: i64,
    pub monthly_transactions: u64,
    #[serde(default)]
    pub last_transaction_at: Option<DateTime<Utc>>,
}

impl UsageStats {
    /// Percentage of recorded uses that succeeded, 0 when never used.
    pub fn success_rate(&self) -> f64 {
        if self.total_transactions == 0 {
            return 0.0;
        }
        self.successful_transactions as f64 / self.total_transactions as f64 * 100.0
    }
}

/// A payment instrument linked to a user.
///
/// Descriptive fields are public: callers may edit them directly and must
/// then run `PaymentMethodValidator::before_update`. Identity, status,
/// flags, security and usage data are crate-private and only change
/// through the validator's lifecycle operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub(crate) id: Uuid,
    pub(crate) user_id: Uuid,
    pub wallet_id: Option<Uuid>,
    pub(crate) method_type: PaymentMethodType,
    pub(crate) provider: PaymentProvider,
    pub(crate) status: PaymentMethodStatus,
    pub(crate) is_default: bool,
    pub(crate) is_verified: bool,
    pub display_name: String,
    pub last_four: Option<String>,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<i32>,
    pub brand: Option<String>,
    /// ISO 3166-1 alpha-2
    pub country: String,
    pub(crate) currency: Currency,
    pub metadata: PaymentMethodMetadata,
    pub provider_data: ProviderData,
    pub(crate) security_info: SecurityInfo,
    pub(crate) usage_stats: UsageStats,
    pub external_id: Option<String>,
    pub(crate) last_used_at: Option<DateTime<Utc>>,
    pub(crate) verified_at: Option<DateTime<Utc>>,
    pub(crate) expires_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl PaymentMethod {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn method_type(&self) -> PaymentMethodType {
        self.method_type
    }

    pub fn provider(&self) -> PaymentProvider {
        self.provider
    }

    pub fn status(&self) -> PaymentMethodStatus {
        self.status
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn is_verified(&self) -> bool {
        self.is_verified
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn security_info(&self) -> &SecurityInfo {
        &self.security_info
    }

    pub fn usage_stats(&self) -> &UsageStats {
        &self.usage_stats
    }

    pub fn last_used_at(&self) -> Option<DateTime<Utc>> {
        self.last_used_at
    }

    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    /// Last second of the expiry month, for expirable types.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Request to link a new payment method.
///
/// Type, provider and currency arrive as strings so that unknown values
/// are reported together with every other problem in the request.
///
/// # JSON Example
///
/// ```json
/// {
///   "user_id": "550e8400-e29b-41d4-a716-446655440000",
///   "method_type": "credit_card",
///   "provider": "visa",
///   "currency": "SGD",
///   "country": "SG",
///   "last_four": "4242",
///   "expiry_month": 12,
///   "expiry_year": 2028
/// }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePaymentMethodRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub wallet_id: Option<Uuid>,
    pub method_type: String,
    pub provider: String,
    pub currency: String,
    pub country: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub last_four: Option<String>,
    #[serde(default)]
    pub expiry_month: Option<u32>,
    #[serde(default)]
    pub expiry_year: Option<i32>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub metadata: Option<PaymentMethodMetadata>,
    #[serde(default)]
    pub provider_data: Option<ProviderData>,
    #[serde(default)]
    pub external_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetDefaultRequest {
    pub is_default: bool,
}

/// A recorded use of the instrument.
#[derive(Debug, Clone, Deserialize)]
pub struct UsageRequest {
    pub amount: i64,
    pub currency: String,
    pub success: bool,
}

/// New risk assessment. Verification flags left out keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityUpdateRequest {
    pub risk_score: u8,
    #[serde(default)]
    pub cvv_verified: Option<bool>,
    #[serde(default)]
    pub address_verified: Option<bool>,
    #[serde(default)]
    pub three_ds_enrolled: Option<bool>,
}

/// Public projection. No security info, provider data, metadata or
/// external id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub wallet_id: Option<Uuid>,
    pub method_type: PaymentMethodType,
    pub provider: PaymentProvider,
    pub status: PaymentMethodStatus,
    pub is_default: bool,
    pub is_verified: bool,
    pub display_name: String,
    pub last_four: Option<String>,
    pub expiry_month: Option<u32>,
    pub expiry_year: Option<i32>,
    pub brand: Option<String>,
    pub country: String,
    pub currency: Currency,
    pub last_used_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&PaymentMethod> for PaymentMethodResponse {
    fn from(pm: &PaymentMethod) -> Self {
        Self {
            id: pm.id,
            user_id: pm.user_id,
            wallet_id: pm.wallet_id,
            method_type: pm.method_type,
            provider: pm.provider,
            status: pm.status,
            is_default: pm.is_default,
            is_verified: pm.is_verified,
            display_name: pm.display_name.clone(),
            last_four: pm.last_four.clone(),
            expiry_month: pm.expiry_month,
            expiry_year: pm.expiry_year,
            brand: pm.brand.clone(),
            country: pm.country.clone(),
            currency: pm.currency,
            last_used_at: pm.last_used_at,
            verified_at: pm.verified_at,
            expires_at: pm.expires_at,
            created_at: pm.created_at,
            updated_at: pm.updated_at,
        }
    }
}

/// Privileged projection for internal and audit callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodDetails {
    #[serde(flatten)]
    pub summary: PaymentMethodResponse,
    pub metadata: PaymentMethodMetadata,
    pub provider_data: ProviderData,
    pub security_info: SecurityInfo,
    pub usage_stats: UsageStats,
    pub success_rate: f64,
    pub external_id: Option<String>,
}

impl From<&PaymentMethod> for PaymentMethodDetails {
    fn from(pm: &PaymentMethod) -> Self {
        Self {
            summary: PaymentMethodResponse::from(pm),
            metadata: pm.metadata.clone(),
            provider_data: pm.provider_data.clone(),
            security_info: pm.security_info.clone(),
            usage_stats: pm.usage_stats.clone(),
            success_rate: pm.usage_stats.success_rate(),
            external_id: pm.external_id.clone(),
        }
    }
}
