use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// What a client fills in to post a tender. Validated before any persistence
/// call; a rejected draft leaves no trace.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenderDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub regulatory_id: String,
    /// The platform is a connector only; posting requires explicitly
    /// acknowledging that it is not responsible for work quality, tax
    /// compliance, or post-handover disputes.
    pub disclaimer_acknowledged: bool,
}

impl TenderDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        require_text("location", &self.location)?;
        require_text("regulatory id", &self.regulatory_id)?;

        if !self.disclaimer_acknowledged {
            return Err(DomainError::Validation(
                "the liability disclaimer must be acknowledged before posting".to_string(),
            ));
        }

        Ok(())
    }
}

/// A contractor's offer as it leaves the bid form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidDraft {
    pub amount: Decimal,
    pub duration_days: u32,
}

impl BidDraft {
    /// Parses the raw form inputs. Both fields must parse as numbers and be
    /// positive; anything else is a validation error.
    pub fn parse(amount_input: &str, duration_input: &str) -> Result<Self, DomainError> {
        let amount = amount_input.trim().parse::<Decimal>().map_err(|_| {
            DomainError::Validation(format!("bid amount `{}` is not a number", amount_input.trim()))
        })?;
        let duration_days = duration_input.trim().parse::<u32>().map_err(|_| {
            DomainError::Validation(format!(
                "duration `{}` is not a whole number of days",
                duration_input.trim()
            ))
        })?;

        let draft = Self { amount, duration_days };
        draft.validate()?;
        Ok(draft)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.amount <= Decimal::ZERO {
            return Err(DomainError::Validation("bid amount must be greater than zero".to_string()));
        }
        if self.duration_days == 0 {
            return Err(DomainError::Validation("duration must be at least one day".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub text: String,
}

impl MessageDraft {
    pub fn validate(&self) -> Result<(), DomainError> {
        require_text("message", &self.text)
    }
}

fn require_text(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::Validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::errors::DomainError;

    use super::{BidDraft, MessageDraft, TenderDraft};

    fn draft() -> TenderDraft {
        TenderDraft {
            title: "Roof repair".to_string(),
            description: "Replace broken tiles".to_string(),
            location: "Pune".to_string(),
            regulatory_id: "R1".to_string(),
            disclaimer_acknowledged: true,
        }
    }

    #[test]
    fn complete_tender_draft_passes() {
        draft().validate().expect("complete draft should validate");
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let mut incomplete = draft();
        incomplete.location = "   ".to_string();

        let error = incomplete.validate().expect_err("blank location should fail");
        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("location")));
    }

    #[test]
    fn missing_disclaimer_acknowledgement_is_rejected() {
        let mut unacknowledged = draft();
        unacknowledged.disclaimer_acknowledged = false;

        let error = unacknowledged.validate().expect_err("unacknowledged draft should fail");
        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("disclaimer")));
    }

    #[test]
    fn bid_inputs_parse_and_validate() {
        let draft = BidDraft::parse(" 10000.00 ", "5").expect("valid inputs");
        assert_eq!(draft.amount, Decimal::new(1_000_000, 2));
        assert_eq!(draft.duration_days, 5);
    }

    #[test]
    fn non_numeric_bid_amount_is_rejected() {
        let error = BidDraft::parse("ten thousand", "5").expect_err("words are not numbers");
        assert!(matches!(error, DomainError::Validation(ref message) if message.contains("not a number")));
    }

    #[test]
    fn fractional_duration_is_rejected() {
        let error = BidDraft::parse("10000", "4.5").expect_err("days must be whole");
        assert!(matches!(error, DomainError::Validation(_)));
    }

    #[test]
    fn non_positive_values_are_rejected() {
        assert!(BidDraft::parse("0", "5").is_err());
        assert!(BidDraft::parse("-100", "5").is_err());
        assert!(BidDraft::parse("100", "0").is_err());
    }

    #[test]
    fn empty_chat_message_is_rejected() {
        let error = MessageDraft { text: " ".to_string() }
            .validate()
            .expect_err("blank message should fail");
        assert!(matches!(error, DomainError::Validation(_)));
    }
}
