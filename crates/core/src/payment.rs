//! Card payment simulation.
//!
//! The storefront does not talk to a card processor. A card payment is
//! "approved" when the submitted details are well-formed: the holder is
//! present, the number passes the Luhn check, the expiry is not in the past
//! and the CVV has the right length. Only the brand and last four digits
//! survive validation.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Card details submitted at checkout.
#[derive(Clone, Deserialize)]
pub struct CardDetails {
    /// Name printed on the card.
    pub holder: String,
    /// Card number; spaces and dashes are ignored.
    pub number: String,
    /// Expiry as `MM/YY`.
    pub expiry: String,
    /// Security code.
    pub cvv: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("holder", &self.holder)
            .field("number", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

/// Why a card was declined.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CardError {
    #[error("el nombre del titular es obligatorio")]
    MissingHolder,
    #[error("el número de tarjeta debe tener entre 13 y 19 dígitos")]
    InvalidNumberLength,
    #[error("el número de tarjeta no es válido")]
    InvalidChecksum,
    #[error("la fecha de vencimiento debe tener el formato MM/AA")]
    InvalidExpiryFormat,
    #[error("la tarjeta está vencida")]
    Expired,
    #[error("el código de seguridad debe tener 3 o 4 dígitos")]
    InvalidCvv,
}

/// Card network, derived from the number prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Other,
}

impl CardBrand {
    /// Display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Other => "other",
        }
    }

    fn from_digits(digits: &str) -> Self {
        let two: u32 = digits.get(..2).and_then(|p| p.parse().ok()).unwrap_or(0);
        match two {
            _ if digits.starts_with('4') => Self::Visa,
            51..=55 | 22..=27 => Self::Mastercard,
            34 | 37 => Self::Amex,
            _ => Self::Other,
        }
    }
}

/// Result of an approved simulated card payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardAuthorization {
    /// Card network.
    pub brand: CardBrand,
    /// Last four digits of the number.
    pub last4: String,
}

/// Validate card details as of `today`.
///
/// # Errors
///
/// Returns the first `CardError` found, checking holder, number, expiry and
/// CVV in that order.
pub fn validate_card(card: &CardDetails, today: NaiveDate) -> Result<CardAuthorization, CardError> {
    if card.holder.trim().is_empty() {
        return Err(CardError::MissingHolder);
    }

    let digits: String = card
        .number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    if !(13..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CardError::InvalidNumberLength);
    }
    if !luhn_valid(&digits) {
        return Err(CardError::InvalidChecksum);
    }

    let (month, year) = parse_expiry(&card.expiry)?;
    // A card is valid through the last day of its expiry month.
    if (year, month) < (today.year(), today.month()) {
        return Err(CardError::Expired);
    }

    let cvv = card.cvv.trim();
    if !(3..=4).contains(&cvv.len()) || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(CardError::InvalidCvv);
    }

    let last4 = digits.get(digits.len() - 4..).unwrap_or_default().to_owned();
    Ok(CardAuthorization {
        brand: CardBrand::from_digits(&digits),
        last4,
    })
}

/// Luhn (mod 10) checksum over an all-digit string.
#[must_use]
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    !digits.is_empty() && sum % 10 == 0
}

fn parse_expiry(expiry: &str) -> Result<(u32, i32), CardError> {
    let (mm, yy) = expiry
        .trim()
        .split_once('/')
        .ok_or(CardError::InvalidExpiryFormat)?;
    if mm.len() != 2 || yy.len() != 2 {
        return Err(CardError::InvalidExpiryFormat);
    }
    let month: u32 = mm.parse().map_err(|_| CardError::InvalidExpiryFormat)?;
    let year: i32 = yy.parse().map_err(|_| CardError::InvalidExpiryFormat)?;
    if !(1..=12).contains(&month) {
        return Err(CardError::InvalidExpiryFormat);
    }
    Ok((month, 2000 + year))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn card(number: &str, expiry: &str, cvv: &str) -> CardDetails {
        CardDetails {
            holder: "María González".to_string(),
            number: number.to_string(),
            expiry: expiry.to_string(),
            cvv: cvv.to_string(),
        }
    }

    #[test]
    fn test_valid_visa() {
        let auth = validate_card(&card("4111 1111 1111 1111", "12/27", "123"), today()).unwrap();
        assert_eq!(auth.brand, CardBrand::Visa);
        assert_eq!(auth.last4, "1111");
    }

    #[test]
    fn test_valid_mastercard_and_amex() {
        let mc = validate_card(&card("5555-5555-5555-4444", "01/30", "321"), today()).unwrap();
        assert_eq!(mc.brand, CardBrand::Mastercard);
        assert_eq!(mc.last4, "4444");

        let amex = validate_card(&card("378282246310005", "06/25", "1234"), today()).unwrap();
        assert_eq!(amex.brand, CardBrand::Amex);
    }

    #[test]
    fn test_missing_holder() {
        let mut c = card("4111111111111111", "12/27", "123");
        c.holder = "   ".to_string();
        assert_eq!(validate_card(&c, today()), Err(CardError::MissingHolder));
    }

    #[test]
    fn test_bad_number() {
        assert_eq!(
            validate_card(&card("4111", "12/27", "123"), today()),
            Err(CardError::InvalidNumberLength)
        );
        assert_eq!(
            validate_card(&card("4111 1111 1111 111a", "12/27", "123"), today()),
            Err(CardError::InvalidNumberLength)
        );
        assert_eq!(
            validate_card(&card("4111 1111 1111 1112", "12/27", "123"), today()),
            Err(CardError::InvalidChecksum)
        );
    }

    #[test]
    fn test_expiry() {
        assert_eq!(
            validate_card(&card("4111111111111111", "05/25", "123"), today()),
            Err(CardError::Expired)
        );
        // Current month is still valid.
        assert!(validate_card(&card("4111111111111111", "06/25", "123"), today()).is_ok());
        assert_eq!(
            validate_card(&card("4111111111111111", "13/27", "123"), today()),
            Err(CardError::InvalidExpiryFormat)
        );
        assert_eq!(
            validate_card(&card("4111111111111111", "1227", "123"), today()),
            Err(CardError::InvalidExpiryFormat)
        );
    }

    #[test]
    fn test_cvv() {
        assert_eq!(
            validate_card(&card("4111111111111111", "12/27", "12"), today()),
            Err(CardError::InvalidCvv)
        );
        assert_eq!(
            validate_card(&card("4111111111111111", "12/27", "12a"), today()),
            Err(CardError::InvalidCvv)
        );
    }

    #[test]
    fn test_debug_redacts_number_and_cvv() {
        let debug = format!("{:?}", card("4111111111111111", "12/27", "987"));
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("987"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("79927398713"));
        assert!(!luhn_valid("79927398710"));
        assert!(!luhn_valid(""));
    }
}
