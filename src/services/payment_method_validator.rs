//! Payment method validation and lifecycle.
//!
//! The validator owns the structural rules for a linked instrument and the
//! operations that move it between statuses. It is built from injected
//! tables (currency registry, provider compatibility matrix, policy for
//! providers missing from the matrix) so tests can substitute their own.
//!
//! Every mutating operation works on a copy and only writes it back once
//! the copy passes validation.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::{
    error::LedgerError,
    models::{
        currency::Currency,
        payment_method::{
            CreatePaymentMethodRequest, PaymentMethod, PaymentMethodStatus, PaymentMethodType,
            PaymentProvider, SecurityInfo, SecurityLevel, SecurityUpdateRequest, UsageStats,
        },
    },
    services::currency_registry::CurrencyRegistry,
};

static LAST_FOUR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}$").expect("valid last four pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[1-9]\d{6,14}$").expect("valid phone pattern"));
static COUNTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}$").expect("valid country pattern"));

pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;
pub const MAX_EXPIRY_YEARS_AHEAD: i32 = 20;
pub const BANK_ACCOUNT_TYPES: [&str; 4] = ["checking", "savings", "current", "business"];

/// What to do with a provider that has no row in the compatibility matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownProviderPolicy {
    #[default]
    Allow,
    Deny,
}

/// Provider to supported types.
pub type CompatibilityMatrix = HashMap<PaymentProvider, Vec<PaymentMethodType>>;

/// The production compatibility matrix. `Other` is deliberately absent.
pub fn default_compatibility() -> CompatibilityMatrix {
    use PaymentMethodType::*;
    use PaymentProvider::*;

    let cards = vec![CreditCard, DebitCard, PrepaidCard, GiftCard];
    let wallets = vec![EWallet, MobileWallet];

    let mut matrix = HashMap::new();
    for network in [Visa, Mastercard, AmericanExpress, Jcb, UnionPay, Discover] {
        matrix.insert(network, cards.clone());
    }
    matrix.insert(PayPal, vec![DigitalPayment, EWallet]);
    matrix.insert(
        Stripe,
        vec![DigitalPayment, CreditCard, DebitCard, PrepaidCard],
    );
    for pay in [ApplePay, GooglePay] {
        matrix.insert(pay, vec![MobileWallet, DigitalPayment]);
    }
    for wallet in [
        AlipayPlus, WeChatPay, GoPay, Ovo, Dana, ShopeePay, LinkAja, GrabPay, TouchNGo, Boost,
        GCash, Maya, TrueMoney, MoMo, ZaloPay,
    ] {
        matrix.insert(wallet, wallets.clone());
    }
    matrix.insert(LocalBank, vec![BankAccount]);
    for venue in [Coinbase, Binance, MetaMask] {
        matrix.insert(venue, vec![Crypto]);
    }
    for bnpl in [Kredivo, Akulaku, Atome, Afterpay, Klarna] {
        matrix.insert(bnpl, vec![BuyNowPayLater]);
    }
    matrix
}

/// Last second of the given month, or `None` for an invalid month.
pub fn end_of_month(year: i32, month: u32) -> Option<DateTime<Utc>> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month.checked_add(1)?)
    };
    if !(1..=12).contains(&month) {
        return None;
    }
    let start_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?.and_hms_opt(0, 0, 0)?;
    Some(start_of_next.and_utc() - Duration::seconds(1))
}

#[derive(Debug, Clone)]
pub struct PaymentMethodValidator {
    registry: Arc<CurrencyRegistry>,
    compatibility: CompatibilityMatrix,
    unknown_providers: UnknownProviderPolicy,
}

impl PaymentMethodValidator {
    pub fn new(
        registry: Arc<CurrencyRegistry>,
        compatibility: CompatibilityMatrix,
        unknown_providers: UnknownProviderPolicy,
    ) -> Self {
        Self {
            registry,
            compatibility,
            unknown_providers,
        }
    }

    /// Validator with the production matrix and the given policy.
    pub fn with_default_matrix(
        registry: Arc<CurrencyRegistry>,
        unknown_providers: UnknownProviderPolicy,
    ) -> Self {
        Self::new(registry, default_compatibility(), unknown_providers)
    }

    /// Whether the matrix (and policy) lets `provider` issue `method_type`.
    pub fn is_compatible(&self, provider: PaymentProvider, method_type: PaymentMethodType) -> bool {
        match self.compatibility.get(&provider) {
            Some(types) => types.contains(&method_type),
            None => self.unknown_providers == UnknownProviderPolicy::Allow,
        }
    }

    /// Every rule `pm` breaks, judged at `now`.
    pub fn violations_at(&self, pm: &PaymentMethod, now: DateTime<Utc>) -> Vec<String> {
        let mut errors = Vec::new();
        base_violations(&mut errors, pm.user_id, &pm.country);

        let name = pm.display_name.trim();
        if name.is_empty() {
            errors.push("display_name is required".to_string());
        } else if pm.display_name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
            errors.push(format!(
                "display_name cannot exceed {} characters",
                MAX_DISPLAY_NAME_LENGTH
            ));
        }

        if pm.is_default && pm.status != PaymentMethodStatus::Active {
            errors.push("only an active payment method can be the default".to_string());
        }

        if !self.registry.is_supported(pm.currency) {
            errors.push(format!("unsupported currency: {}", pm.currency));
        }

        let caps = pm.method_type.capabilities();

        if caps.needs_card_data {
            match pm.last_four.as_deref() {
                None => errors.push("last_four is required for cards".to_string()),
                Some(digits) if !LAST_FOUR.is_match(digits) => {
                    errors.push("last_four must be exactly 4 digits".to_string());
                }
                Some(_) => {}
            }
        }

        if caps.needs_bank_data {
            match &pm.metadata.bank_details {
                Some(bank) if !bank.bank_name.trim().is_empty() => {
                    if let Some(kind) = bank.account_type.as_deref() {
                        if !BANK_ACCOUNT_TYPES.contains(&kind) {
                            errors.push(format!(
                                "account_type must be one of {}",
                                BANK_ACCOUNT_TYPES.join(", ")
                            ));
                        }
                    }
                }
                _ => errors.push("bank_name is required for bank accounts".to_string()),
            }
        }

        if caps.needs_digital_data {
            let phone = pm.metadata.phone_number.as_deref();
            match pm.method_type {
                PaymentMethodType::MobileWallet => match phone {
                    None => errors.push("phone_number is required for mobile wallets".to_string()),
                    Some(p) if !PHONE.is_match(p) => errors.push(phone_format_error()),
                    Some(_) => {}
                },
                PaymentMethodType::EWallet => {
                    if phone.is_some_and(|p| !PHONE.is_match(p)) {
                        errors.push(phone_format_error());
                    }
                }
                PaymentMethodType::Crypto => {
                    if is_blank(pm.metadata.wallet_address.as_deref()) {
                        errors.push("wallet_address is required for crypto".to_string());
                    }
                    if is_blank(pm.metadata.crypto_network.as_deref()) {
                        errors.push("crypto_network is required for crypto".to_string());
                    }
                }
                _ => {}
            }
        }

        if caps.is_expirable {
            expiry_violations(&mut errors, pm, now);
        }

        if pm.security_info.risk_score > 100 {
            errors.push("risk_score must be between 0 and 100".to_string());
        }

        if !self.is_compatible(pm.provider, pm.method_type) {
            errors.push(format!(
                "provider {} does not support {}",
                pm.provider, pm.method_type
            ));
        }

        errors
    }

    pub fn validate_at(&self, pm: &PaymentMethod, now: DateTime<Utc>) -> Result<(), LedgerError> {
        LedgerError::check(self.violations_at(pm, now))
    }

    /// Build a Pending payment method from a request.
    ///
    /// Unknown type, provider or currency strings are reported together with
    /// the request's other problems.
    pub fn before_create(
        &self,
        request: CreatePaymentMethodRequest,
        now: DateTime<Utc>,
    ) -> Result<PaymentMethod, LedgerError> {
        let mut errors = Vec::new();
        let method_type = request
            .method_type
            .parse::<PaymentMethodType>()
            .map_err(|e| errors.push(e))
            .ok();
        let provider = request
            .provider
            .parse::<PaymentProvider>()
            .map_err(|e| errors.push(e))
            .ok();
        let currency = self
            .registry
            .parse(&request.currency)
            .map_err(|e| errors.push(e.to_string()))
            .ok();

        let (Some(method_type), Some(provider), Some(currency)) = (method_type, provider, currency)
        else {
            base_violations(&mut errors, request.user_id, &request.country);
            return Err(LedgerError::Validation(errors));
        };

        let mut pm = PaymentMethod {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            wallet_id: request.wallet_id,
            method_type,
            provider,
            status: PaymentMethodStatus::Pending,
            is_default: false,
            is_verified: false,
            display_name: String::new(),
            last_four: request.last_four,
            expiry_month: request.expiry_month,
            expiry_year: request.expiry_year,
            brand: request.brand,
            country: request.country,
            currency,
            metadata: request.metadata.unwrap_or_default(),
            provider_data: request.provider_data.unwrap_or_default(),
            security_info: SecurityInfo::default(),
            usage_stats: UsageStats::default(),
            external_id: request.external_id,
            last_used_at: None,
            verified_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        };

        pm.display_name = match request.display_name {
            Some(name) if !name.trim().is_empty() => name,
            _ => generate_display_name(&pm),
        };
        pm.expires_at = compute_expiry(&pm);

        self.validate_at(&pm, now)?;
        Ok(pm)
    }

    /// Prepare a caller-edited payment method for persistence: recompute
    /// the expiry instant, touch `updated_at` and validate.
    pub fn before_update(
        &self,
        pm: &mut PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.commit(pm, now, |_| Ok(()))
    }

    /// Pending -> Active, marking the method verified.
    pub fn verify(&self, pm: &mut PaymentMethod, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.commit(pm, now, |next| {
            require_transition(next, PaymentMethodStatus::Active, |from| {
                from == PaymentMethodStatus::Pending
            })?;
            next.status = PaymentMethodStatus::Active;
            next.is_verified = true;
            next.verified_at = Some(now);
            Ok(())
        })
    }

    /// Block for fraud. The reason is appended to the fraud flags.
    pub fn block(
        &self,
        pm: &mut PaymentMethod,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.commit(pm, now, |next| {
            let reason = reason.trim();
            if reason.is_empty() {
                return Err(LedgerError::Validation(vec![
                    "block reason is required".to_string(),
                ]));
            }
            next.status = PaymentMethodStatus::Blocked;
            next.is_default = false;
            next.security_info.fraud_flags.push(reason.to_string());
            Ok(())
        })
    }

    /// Back to Active. Expired, failed and blocked methods stay where they are.
    pub fn activate(&self, pm: &mut PaymentMethod, now: DateTime<Utc>) -> Result<(), LedgerError> {
        self.commit(pm, now, |next| {
            require_transition(next, PaymentMethodStatus::Active, |from| {
                !matches!(
                    from,
                    PaymentMethodStatus::Expired
                        | PaymentMethodStatus::Failed
                        | PaymentMethodStatus::Blocked
                )
            })?;
            next.status = PaymentMethodStatus::Active;
            Ok(())
        })
    }

    /// To Inactive, dropping the default flag.
    pub fn deactivate(
        &self,
        pm: &mut PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.commit(pm, now, |next| {
            require_transition(next, PaymentMethodStatus::Inactive, |from| {
                from != PaymentMethodStatus::Blocked
            })?;
            next.status = PaymentMethodStatus::Inactive;
            next.is_default = false;
            Ok(())
        })
    }

    /// Flip the default flag. Only active methods can become the default;
    /// uniqueness per user is the store's job.
    pub fn set_default(
        &self,
        pm: &mut PaymentMethod,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.commit(pm, now, |next| {
            if is_default && next.status != PaymentMethodStatus::Active {
                return Err(LedgerError::PaymentMethodNotActive(next.status));
            }
            next.is_default = is_default;
            Ok(())
        })
    }

    /// Record a new risk assessment and derive the security level from it.
    pub fn update_security_info(
        &self,
        pm: &mut PaymentMethod,
        update: &SecurityUpdateRequest,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.commit(pm, now, |next| {
            let info = &mut next.security_info;
            info.risk_score = update.risk_score;
            info.security_level = SecurityLevel::from_risk_score(update.risk_score);
            info.last_assessed_at = Some(now);
            if let Some(flag) = update.cvv_verified {
                info.cvv_verified = flag;
            }
            if let Some(flag) = update.address_verified {
                info.address_verified = flag;
            }
            if let Some(flag) = update.three_ds_enrolled {
                info.three_ds_enrolled = flag;
            }
            Ok(())
        })
    }

    /// Record one use of the instrument.
    ///
    /// The monthly counters restart when `now` falls in a different
    /// calendar month from the previous recorded use. Only successful uses
    /// count towards amounts and the running average.
    pub fn mark_as_used(
        &self,
        pm: &mut PaymentMethod,
        amount: i64,
        currency: Currency,
        success: bool,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.commit(pm, now, |next| {
            if next.status != PaymentMethodStatus::Active {
                return Err(LedgerError::PaymentMethodNotActive(next.status));
            }
            if currency != next.currency {
                return Err(LedgerError::CurrencyMismatch {
                    expected: next.currency,
                    found: currency,
                });
            }
            if amount <= 0 {
                return Err(LedgerError::InvalidAmount(amount));
            }

            let stats = &mut next.usage_stats;
            let same_month = stats
                .last_transaction_at
                .is_some_and(|last| (last.year(), last.month()) == (now.year(), now.month()));
            if !same_month {
                stats.monthly_usage = 0;
                stats.monthly_transactions = 0;
            }

            stats.total_transactions += 1;
            stats.monthly_transactions += 1;
            if success {
                stats.successful_transactions += 1;
                stats.total_amount = stats
                    .total_amount
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow)?;
                stats.monthly_usage = stats
                    .monthly_usage
                    .checked_add(amount)
                    .ok_or(LedgerError::Overflow)?;
                stats.average_amount = stats.total_amount / stats.successful_transactions as i64;
            } else {
                stats.failed_transactions += 1;
            }
            stats.last_transaction_at = Some(now);
            next.last_used_at = Some(now);
            Ok(())
        })
    }

    /// Move a live method whose expiry has passed to Expired. Returns
    /// whether the status changed.
    pub fn refresh_expiry(
        &self,
        pm: &mut PaymentMethod,
        now: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        if !is_due_for_expiry(pm, now) {
            return Ok(false);
        }
        self.commit(pm, now, |_| Ok(()))?;
        Ok(true)
    }

    /// Percentage of recorded uses that succeeded.
    pub fn success_rate(&self, pm: &PaymentMethod) -> f64 {
        pm.usage_stats.success_rate()
    }

    /// Apply `change` to a copy and write it back once it validates.
    ///
    /// The copy is moved to Expired first if its expiry has passed, so
    /// every operation sees the status the instrument really has at `now`.
    fn commit<F>(
        &self,
        pm: &mut PaymentMethod,
        now: DateTime<Utc>,
        change: F,
    ) -> Result<(), LedgerError>
    where
        F: FnOnce(&mut PaymentMethod) -> Result<(), LedgerError>,
    {
        let mut next = pm.clone();
        next.expires_at = compute_expiry(&next);
        if is_due_for_expiry(&next, now) {
            next.status = PaymentMethodStatus::Expired;
            next.is_default = false;
        }

        change(&mut next)?;
        next.updated_at = now;
        self.validate_at(&next, now)?;

        if next.status != pm.status {
            tracing::debug!(
                payment_method_id = %pm.id,
                from = %pm.status,
                to = %next.status,
                "payment method status change"
            );
        }
        *pm = next;
        Ok(())
    }
}

fn base_violations(errors: &mut Vec<String>, user_id: Uuid, country: &str) {
    if user_id.is_nil() {
        errors.push("user_id is required".to_string());
    }
    if !COUNTRY.is_match(country) {
        errors.push("country must be a 2-letter uppercase code".to_string());
    }
}

fn expiry_violations(errors: &mut Vec<String>, pm: &PaymentMethod, now: DateTime<Utc>) {
    let (Some(month), Some(year)) = (pm.expiry_month, pm.expiry_year) else {
        errors.push("expiry_month and expiry_year are required for cards".to_string());
        return;
    };

    if !(1..=12).contains(&month) {
        errors.push("expiry_month must be between 1 and 12".to_string());
    }
    if year > now.year() + MAX_EXPIRY_YEARS_AHEAD {
        errors.push(format!(
            "expiry_year cannot be more than {} years ahead",
            MAX_EXPIRY_YEARS_AHEAD
        ));
    }

    // Only a live instrument has to hold a current expiry.
    if pm.status.is_live() {
        if year < now.year() {
            errors.push("expiry_year cannot be in the past".to_string());
        } else if end_of_month(year, month).is_some_and(|end| end < now) {
            errors.push("payment method has expired".to_string());
        }
    }
}

fn is_due_for_expiry(pm: &PaymentMethod, now: DateTime<Utc>) -> bool {
    pm.status.is_live() && pm.expires_at.is_some_and(|expires_at| expires_at < now)
}

fn compute_expiry(pm: &PaymentMethod) -> Option<DateTime<Utc>> {
    if !pm.method_type.capabilities().is_expirable {
        return None;
    }
    end_of_month(pm.expiry_year?, pm.expiry_month?)
}

fn require_transition<F>(
    pm: &PaymentMethod,
    to: PaymentMethodStatus,
    allowed: F,
) -> Result<(), LedgerError>
where
    F: FnOnce(PaymentMethodStatus) -> bool,
{
    if allowed(pm.status) {
        Ok(())
    } else {
        Err(LedgerError::InvalidPaymentMethodTransition { from: pm.status, to })
    }
}

fn generate_display_name(pm: &PaymentMethod) -> String {
    let provider = pm.provider.display_name();
    let caps = pm.method_type.capabilities();
    let last_four = pm.last_four.as_deref();

    if caps.needs_card_data {
        if let Some(digits) = last_four {
            return format!("{} ending in {}", provider, digits);
        }
    }

    match pm.method_type {
        PaymentMethodType::BankAccount => {
            if let Some(bank) = pm
                .metadata
                .bank_details
                .as_ref()
                .filter(|b| !b.bank_name.trim().is_empty())
            {
                let mut name = format!("{} account", bank.bank_name.trim());
                if let Some(digits) = last_four {
                    name.push_str(&format!(" ending in {}", digits));
                }
                return name;
            }
        }
        PaymentMethodType::Crypto => {
            if let Some(token) = non_blank(pm.metadata.token_symbol.as_deref()) {
                return format!("{} wallet", token.to_uppercase());
            }
            if let Some(network) = non_blank(pm.metadata.crypto_network.as_deref()) {
                return format!("{} wallet", network);
            }
        }
        _ => {}
    }

    format!("{} {}", provider, pm.method_type.label())
}

fn phone_format_error() -> String {
    "phone_number must be in international format, e.g. +6281234567890".to_string()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_blank(value: Option<&str>) -> bool {
    non_blank(value).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment_method::{BankDetails, PaymentMethodMetadata};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
    }

    fn validator() -> PaymentMethodValidator {
        PaymentMethodValidator::with_default_matrix(
            Arc::new(CurrencyRegistry::default()),
            UnknownProviderPolicy::Allow,
        )
    }

    fn card_request() -> CreatePaymentMethodRequest {
        CreatePaymentMethodRequest {
            user_id: Uuid::new_v4(),
            method_type: "credit_card".to_string(),
            provider: "visa".to_string(),
            currency: "SGD".to_string(),
            country: "SG".to_string(),
            last_four: Some("4242".to_string()),
            expiry_month: Some(12),
            expiry_year: Some(2028),
            ..Default::default()
        }
    }

    fn active_card() -> PaymentMethod {
        let v = validator();
        let mut pm = v.before_create(card_request(), now()).unwrap();
        v.verify(&mut pm, now()).unwrap();
        pm
    }

    fn violations_of<T: std::fmt::Debug>(result: Result<T, LedgerError>) -> Vec<String> {
        match result {
            Err(LedgerError::Validation(v)) => v,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_before_create_defaults() {
        let pm = validator().before_create(card_request(), now()).unwrap();

        assert_eq!(PaymentMethodStatus::Pending, pm.status);
        assert_eq!("Visa ending in 4242", pm.display_name);
        assert_eq!(50, pm.security_info.risk_score);
        assert_eq!(SecurityLevel::Medium, pm.security_info.security_level);
        assert_eq!(UsageStats::default(), pm.usage_stats);
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2028, 12, 31, 23, 59, 59).unwrap()),
            pm.expires_at
        );
    }

    #[test]
    fn test_last_four_must_be_digits() {
        let mut request = card_request();
        request.last_four = Some("12a4".to_string());
        let violations = violations_of(validator().before_create(request, now()));
        assert_eq!(vec!["last_four must be exactly 4 digits".to_string()], violations);

        let mut request = card_request();
        request.last_four = Some("1234".to_string());
        assert!(validator().before_create(request, now()).is_ok());
    }

    #[test]
    fn test_unknown_strings_are_aggregated() {
        let mut request = card_request();
        request.method_type = "cheque".to_string();
        request.provider = "venmo".to_string();
        request.country = "sg".to_string();

        let violations = violations_of(validator().before_create(request, now()));
        assert_eq!(3, violations.len(), "{:?}", violations);
        assert!(violations[0].contains("cheque"));
        assert!(violations[1].contains("venmo"));
        assert!(violations[2].contains("country"));
    }

    #[test]
    fn test_expiry_rules() {
        let mut request = card_request();
        request.expiry_month = Some(9);
        request.expiry_year = Some(2026);
        let violations = violations_of(validator().before_create(request, now()));
        assert_eq!(vec!["payment method has expired".to_string()], violations);

        // The current month is still valid.
        let mut request = card_request();
        request.expiry_month = Some(10);
        request.expiry_year = Some(2026);
        assert!(validator().before_create(request, now()).is_ok());

        let mut request = card_request();
        request.expiry_month = Some(13);
        request.expiry_year = Some(2050);
        let violations = violations_of(validator().before_create(request, now()));
        assert_eq!(2, violations.len(), "{:?}", violations);
    }

    #[test]
    fn test_bank_account_rules_and_name() {
        let mut request = card_request();
        request.method_type = "bank_account".to_string();
        request.provider = "local_bank".to_string();
        request.expiry_month = None;
        request.expiry_year = None;
        request.last_four = Some("7788".to_string());
        request.metadata = Some(PaymentMethodMetadata {
            bank_details: Some(BankDetails {
                bank_name: "DBS".to_string(),
                account_type: Some("savings".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });

        let pm = validator().before_create(request.clone(), now()).unwrap();
        assert_eq!("DBS account ending in 7788", pm.display_name);
        assert_eq!(None, pm.expires_at);

        request.metadata = Some(PaymentMethodMetadata {
            bank_details: Some(BankDetails {
                bank_name: " ".to_string(),
                account_type: Some("brokerage".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        let violations = violations_of(validator().before_create(request, now()));
        assert_eq!(vec!["bank_name is required for bank accounts".to_string()], violations);
    }

    #[test]
    fn test_mobile_wallet_phone() {
        let mut request = card_request();
        request.method_type = "mobile_wallet".to_string();
        request.provider = "gopay".to_string();
        request.currency = "IDR".to_string();
        request.country = "ID".to_string();
        request.last_four = None;
        request.metadata = Some(PaymentMethodMetadata {
            phone_number: Some("081234567890".to_string()),
            ..Default::default()
        });

        let violations = violations_of(validator().before_create(request.clone(), now()));
        assert_eq!(1, violations.len());
        assert!(violations[0].contains("international format"));

        request.metadata = Some(PaymentMethodMetadata {
            phone_number: Some("+6281234567890".to_string()),
            ..Default::default()
        });
        let pm = validator().before_create(request, now()).unwrap();
        assert_eq!("GoPay mobile wallet", pm.display_name);
    }

    #[test]
    fn test_contact_checks_follow_capabilities() {
        let mut request = card_request();
        request.currency = "IDR".to_string();
        request.country = "ID".to_string();
        request.last_four = None;
        request.metadata = Some(PaymentMethodMetadata {
            phone_number: Some("0812".to_string()),
            ..Default::default()
        });

        request.method_type = "e_wallet".to_string();
        request.provider = "gopay".to_string();
        assert!(PaymentMethodType::EWallet.capabilities().needs_digital_data);
        let violations = violations_of(validator().before_create(request.clone(), now()));
        assert_eq!(vec![phone_format_error()], violations);

        request.method_type = "buy_now_pay_later".to_string();
        request.provider = "atome".to_string();
        assert!(!PaymentMethodType::BuyNowPayLater.capabilities().needs_digital_data);
        assert!(validator().before_create(request, now()).is_ok());
    }

    #[test]
    fn test_crypto_requires_address_and_network() {
        let mut request = card_request();
        request.method_type = "crypto".to_string();
        request.provider = "metamask".to_string();
        request.currency = "USD".to_string();
        request.country = "US".to_string();

        let violations = violations_of(validator().before_create(request.clone(), now()));
        assert_eq!(2, violations.len(), "{:?}", violations);

        request.metadata = Some(PaymentMethodMetadata {
            wallet_address: Some("0xabc".to_string()),
            crypto_network: Some("ethereum".to_string()),
            token_symbol: Some("usdc".to_string()),
            ..Default::default()
        });
        let pm = validator().before_create(request, now()).unwrap();
        assert_eq!("USDC wallet", pm.display_name);
    }

    #[test]
    fn test_provider_compatibility() {
        let mut request = card_request();
        request.provider = "gopay".to_string();
        let violations = violations_of(validator().before_create(request, now()));
        assert_eq!(
            vec!["provider gopay does not support credit_card".to_string()],
            violations
        );

        // `other` has no row in the matrix.
        let mut request = card_request();
        request.provider = "other".to_string();
        assert!(validator().before_create(request.clone(), now()).is_ok());

        let strict = PaymentMethodValidator::with_default_matrix(
            Arc::new(CurrencyRegistry::default()),
            UnknownProviderPolicy::Deny,
        );
        assert!(strict.before_create(request, now()).is_err());
    }

    #[test]
    fn test_verify_only_from_pending() {
        let v = validator();
        let mut pm = active_card();
        assert!(pm.is_verified);
        assert_eq!(Some(now()), pm.verified_at);

        let before = pm.clone();
        assert_eq!(
            Err(LedgerError::InvalidPaymentMethodTransition {
                from: PaymentMethodStatus::Active,
                to: PaymentMethodStatus::Active,
            }),
            v.verify(&mut pm, now())
        );
        assert_eq!(before, pm);
    }

    #[test]
    fn test_block_and_reactivation_guard() {
        let v = validator();
        let mut pm = active_card();
        pm.is_default = true;

        assert!(v.block(&mut pm, "  ", now()).is_err());
        v.block(&mut pm, "chargeback ring", now()).unwrap();
        assert_eq!(PaymentMethodStatus::Blocked, pm.status);
        assert!(!pm.is_default);
        assert_eq!(vec!["chargeback ring".to_string()], pm.security_info.fraud_flags);

        assert!(matches!(
            v.activate(&mut pm, now()),
            Err(LedgerError::InvalidPaymentMethodTransition { .. })
        ));
        assert!(v.deactivate(&mut pm, now()).is_err());
    }

    #[test]
    fn test_deactivate_clears_default() {
        let v = validator();
        let mut pm = active_card();
        v.set_default(&mut pm, true, now()).unwrap();

        v.deactivate(&mut pm, now()).unwrap();
        assert_eq!(PaymentMethodStatus::Inactive, pm.status);
        assert!(!pm.is_default);

        assert_eq!(
            Err(LedgerError::PaymentMethodNotActive(PaymentMethodStatus::Inactive)),
            v.set_default(&mut pm, true, now())
        );
        v.activate(&mut pm, now()).unwrap();
        assert_eq!(PaymentMethodStatus::Active, pm.status);
    }

    #[test]
    fn test_only_active_methods_can_be_default() {
        let v = validator();
        let mut pm = v.before_create(card_request(), now()).unwrap();
        assert!(!pm.is_default());

        pm.is_default = true;
        let before = pm.clone();
        let violations = violations_of(v.before_update(&mut pm, now()));
        assert_eq!(
            vec!["only an active payment method can be the default".to_string()],
            violations
        );
        assert_eq!(before, pm);

        pm.is_default = false;
        v.verify(&mut pm, now()).unwrap();
        v.set_default(&mut pm, true, now()).unwrap();
        assert!(pm.is_default() && pm.is_verified());
    }

    #[test]
    fn test_update_security_info() {
        let v = validator();
        let mut pm = active_card();

        let update = SecurityUpdateRequest {
            risk_score: 85,
            cvv_verified: Some(true),
            ..Default::default()
        };
        v.update_security_info(&mut pm, &update, now()).unwrap();
        assert_eq!(SecurityLevel::High, pm.security_info.security_level);
        assert!(pm.security_info.cvv_verified);
        assert_eq!(Some(now()), pm.security_info.last_assessed_at);

        let before = pm.clone();
        let update = SecurityUpdateRequest {
            risk_score: 101,
            ..Default::default()
        };
        assert!(v.update_security_info(&mut pm, &update, now()).is_err());
        assert_eq!(before, pm);
    }

    #[test]
    fn test_mark_as_used() {
        let v = validator();
        let mut pm = active_card();

        v.mark_as_used(&mut pm, 1_000, Currency::Sgd, true, now()).unwrap();
        v.mark_as_used(&mut pm, 3_000, Currency::Sgd, true, now()).unwrap();
        v.mark_as_used(&mut pm, 9_999, Currency::Sgd, false, now()).unwrap();

        let stats = &pm.usage_stats;
        assert_eq!(3, stats.total_transactions);
        assert_eq!(2, stats.successful_transactions);
        assert_eq!(1, stats.failed_transactions);
        assert_eq!(4_000, stats.total_amount);
        assert_eq!(2_000, stats.average_amount);
        assert_eq!(4_000, stats.monthly_usage);
        assert_eq!(Some(now()), pm.last_used_at);
        assert!((v.success_rate(&pm) - 66.666).abs() < 0.01);

        let next_month = Utc.with_ymd_and_hms(2026, 11, 2, 8, 0, 0).unwrap();
        v.mark_as_used(&mut pm, 500, Currency::Sgd, true, next_month).unwrap();
        assert_eq!(500, pm.usage_stats.monthly_usage);
        assert_eq!(1, pm.usage_stats.monthly_transactions);
        assert_eq!(4_500, pm.usage_stats.total_amount);
    }

    #[test]
    fn test_mark_as_used_guards() {
        let v = validator();
        let mut pm = v.before_create(card_request(), now()).unwrap();
        assert_eq!(
            Err(LedgerError::PaymentMethodNotActive(PaymentMethodStatus::Pending)),
            v.mark_as_used(&mut pm, 100, Currency::Sgd, true, now())
        );

        v.verify(&mut pm, now()).unwrap();
        assert!(matches!(
            v.mark_as_used(&mut pm, 100, Currency::Usd, true, now()),
            Err(LedgerError::CurrencyMismatch { .. })
        ));
        assert_eq!(
            Err(LedgerError::InvalidAmount(0)),
            v.mark_as_used(&mut pm, 0, Currency::Sgd, true, now())
        );
    }

    #[test]
    fn test_refresh_expiry() {
        let v = validator();
        let mut pm = active_card();

        assert_eq!(Ok(false), v.refresh_expiry(&mut pm, now()));

        let after_expiry = Utc.with_ymd_and_hms(2029, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(Ok(true), v.refresh_expiry(&mut pm, after_expiry));
        assert_eq!(PaymentMethodStatus::Expired, pm.status);
        assert!(v.activate(&mut pm, after_expiry).is_err());
    }

    #[test]
    fn test_before_update_recomputes_expiry() {
        let v = validator();
        let mut pm = active_card();
        pm.expiry_month = Some(2);
        pm.expiry_year = Some(2028);

        let later = now() + Duration::minutes(5);
        v.before_update(&mut pm, later).unwrap();
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2028, 2, 29, 23, 59, 59).unwrap()),
            pm.expires_at
        );
        assert_eq!(later, pm.updated_at);
    }

    #[test]
    fn test_end_of_month() {
        assert_eq!(
            Some(Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap()),
            end_of_month(2026, 12)
        );
        assert_eq!(None, end_of_month(2026, 0));
    }

    #[test]
    fn test_round_trips_through_json() {
        let pm = active_card();
        let json = serde_json::to_string(&pm).unwrap();
        let back: PaymentMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(pm, back);
    }
}
