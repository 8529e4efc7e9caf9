use serde::{Deserialize, Serialize};

pub const ARRANGEMENT_FEE_RATE: f64 = 0.04;
pub const PROCESSING_FEE_RATE: f64 = 0.025;
pub const INSURANCE_FEE_RATE: f64 = 0.045;
pub const INTEREST_RATE: f64 = 0.32;

/// Fixed commercial rates applied to every loan request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanRates {
    pub arrangement_fee: f64,
    pub processing_fee: f64,
    pub insurance_fee: f64,
    pub interest: f64,
}

impl LoanRates {
    pub const fn standard() -> Self {
        Self {
            arrangement_fee: ARRANGEMENT_FEE_RATE,
            processing_fee: PROCESSING_FEE_RATE,
            insurance_fee: INSURANCE_FEE_RATE,
            interest: INTEREST_RATE,
        }
    }
}

impl Default for LoanRates {
    fn default() -> Self {
        Self::standard()
    }
}

/// Derived loan figures, kept at full precision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanQuote {
    pub amount: f64,
    pub tenure_months: u32,
    pub interest_rate: f64,
    pub arrangement_fee: f64,
    pub processing_fee: f64,
    pub insurance_fee: f64,
    pub total_fees: f64,
    pub disbursable: f64,
    pub total_interest: f64,
    pub monthly_repayment: f64,
}

/// Compute the fee breakdown and repayment for a request.
///
/// Interest is simple, `amount * rate * tenure`, spread evenly across the tenure together
/// with the principal. A zero tenure yields a zero repayment instead of dividing by zero.
pub fn calculate_summary(amount: f64, tenure_months: u32, rates: &LoanRates) -> LoanQuote {
    let amount = sanitize_amount(amount);
    let tenure = f64::from(tenure_months);

    let arrangement_fee = amount * rates.arrangement_fee;
    let processing_fee = amount * rates.processing_fee;
    let insurance_fee = amount * rates.insurance_fee;
    let total_fees = arrangement_fee + processing_fee + insurance_fee;
    let total_interest = amount * rates.interest * tenure;

    let monthly_repayment = if tenure_months > 0 {
        amount / tenure + total_interest / tenure
    } else {
        0.0
    };

    LoanQuote {
        amount,
        tenure_months,
        interest_rate: rates.interest,
        arrangement_fee,
        processing_fee,
        insurance_fee,
        total_fees,
        disbursable: amount - total_fees,
        total_interest,
        monthly_repayment,
    }
}

impl LoanQuote {
    /// Quote straight from form input, coercing anything unusable to zero.
    pub fn from_inputs(amount: &str, tenure: &str, rates: &LoanRates) -> Self {
        calculate_summary(coerce_amount(amount), coerce_tenure(tenure), rates)
    }

    /// Rounded copy for display and hand-off.
    ///
    /// Fees are rounded individually, then the totals are derived from the rounded parts so
    /// the presented figures always add up to the cent.
    pub fn view(&self) -> LoanQuoteView {
        let amount = to_cents(self.amount);
        let arrangement_fee = to_cents(self.arrangement_fee);
        let processing_fee = to_cents(self.processing_fee);
        let insurance_fee = to_cents(self.insurance_fee);
        let total_fees = arrangement_fee + processing_fee + insurance_fee;

        LoanQuoteView {
            amount: format_cents(amount),
            tenure_months: self.tenure_months,
            interest_rate: self.interest_rate,
            arrangement_fee: format_cents(arrangement_fee),
            processing_fee: format_cents(processing_fee),
            insurance_fee: format_cents(insurance_fee),
            total_fees: format_cents(total_fees),
            disbursable: format_cents(amount - total_fees),
            total_interest: format_currency(self.total_interest),
            monthly_repayment: format_currency(self.monthly_repayment),
        }
    }
}

/// Presentation copy of a quote with currency rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanQuoteView {
    pub amount: String,
    pub tenure_months: u32,
    pub interest_rate: f64,
    pub arrangement_fee: String,
    pub processing_fee: String,
    pub insurance_fee: String,
    pub total_fees: String,
    pub disbursable: String,
    pub total_interest: String,
    pub monthly_repayment: String,
}

pub fn format_currency(value: f64) -> String {
    format_cents(to_cents(value))
}

fn to_cents(value: f64) -> i64 {
    if value.is_finite() {
        (value * 100.0).round() as i64
    } else {
        0
    }
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}{}.{:02}", cents / 100, cents % 100)
}

fn sanitize_amount(amount: f64) -> f64 {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

pub fn coerce_amount(raw: &str) -> f64 {
    raw.trim().parse::<f64>().map(sanitize_amount).unwrap_or(0.0)
}

pub fn coerce_tenure(raw: &str) -> u32 {
    raw.trim().parse::<u32>().unwrap_or(0)
}
