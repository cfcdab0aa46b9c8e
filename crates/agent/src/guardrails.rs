use rust_decimal::Decimal;

/// Numbers a model proposed for the market adjustment stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustmentProposal {
    pub percent: Decimal,
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GuardrailDecision {
    Allow,
    Clamp { reason_code: &'static str, adjusted: AdjustmentProposal, note: String },
    Deny { reason_code: &'static str, note: String },
}

/// Bounds on model-supplied pricing numbers. The adjustment range is the one
/// advertised in the prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingGuardrail {
    pub min_adjustment_pct: Decimal,
    pub max_adjustment_pct: Decimal,
    /// When false, an out-of-range adjustment is rejected instead of clamped.
    pub clamp_out_of_range: bool,
}

impl Default for PricingGuardrail {
    fn default() -> Self {
        Self {
            min_adjustment_pct: Decimal::from(-20),
            max_adjustment_pct: Decimal::from(30),
            clamp_out_of_range: true,
        }
    }
}

impl PricingGuardrail {
    pub fn bounds(&self) -> (Decimal, Decimal) {
        (self.min_adjustment_pct, self.max_adjustment_pct)
    }

    pub fn evaluate(&self, proposal: AdjustmentProposal) -> GuardrailDecision {
        if !proposal.confidence.is_finite() {
            return GuardrailDecision::Deny {
                reason_code: "confidence_not_finite",
                note: "confidence score is not a finite number".to_string(),
            };
        }

        let percent_in_range = (self.min_adjustment_pct..=self.max_adjustment_pct)
            .contains(&proposal.percent);
        let confidence_in_range = (0.0..=1.0).contains(&proposal.confidence);

        if percent_in_range && confidence_in_range {
            return GuardrailDecision::Allow;
        }

        if !percent_in_range && !self.clamp_out_of_range {
            return GuardrailDecision::Deny {
                reason_code: "adjustment_out_of_range",
                note: format!(
                    "adjustment {}% outside {}%..{}%",
                    proposal.percent, self.min_adjustment_pct, self.max_adjustment_pct
                ),
            };
        }

        let adjusted = AdjustmentProposal {
            percent: proposal.percent.clamp(self.min_adjustment_pct, self.max_adjustment_pct),
            confidence: proposal.confidence.clamp(0.0, 1.0),
        };
        let reason_code = if percent_in_range {
            "confidence_clamped"
        } else {
            "adjustment_clamped"
        };

        GuardrailDecision::Clamp {
            reason_code,
            adjusted,
            note: format!(
                "AI proposal clamped from {}% / {} to {}% / {}",
                proposal.percent, proposal.confidence, adjusted.percent, adjusted.confidence
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{AdjustmentProposal, GuardrailDecision, PricingGuardrail};

    fn proposal(percent: i64, confidence: f64) -> AdjustmentProposal {
        AdjustmentProposal { percent: Decimal::from(percent), confidence }
    }

    #[test]
    fn in_range_proposal_is_allowed() {
        let guardrail = PricingGuardrail::default();
        assert_eq!(guardrail.evaluate(proposal(30, 1.0)), GuardrailDecision::Allow);
        assert_eq!(guardrail.evaluate(proposal(-20, 0.0)), GuardrailDecision::Allow);
    }

    #[test]
    fn out_of_range_adjustment_is_clamped() {
        let decision = PricingGuardrail::default().evaluate(proposal(45, 0.9));

        let (reason_code, adjusted) = match decision {
            GuardrailDecision::Clamp { reason_code, adjusted, .. } => (reason_code, adjusted),
            _ => ("", proposal(0, 0.0)),
        };
        assert_eq!(reason_code, "adjustment_clamped");
        assert_eq!(adjusted.percent, Decimal::from(30));
        assert_eq!(adjusted.confidence, 0.9);
    }

    #[test]
    fn confidence_above_one_is_clamped() {
        let decision = PricingGuardrail::default().evaluate(proposal(5, 1.4));
        assert!(matches!(
            decision,
            GuardrailDecision::Clamp { reason_code: "confidence_clamped", adjusted, .. }
                if adjusted.confidence == 1.0 && adjusted.percent == Decimal::from(5)
        ));
    }

    #[test]
    fn strict_policy_denies_out_of_range_adjustment() {
        let guardrail = PricingGuardrail { clamp_out_of_range: false, ..Default::default() };
        assert!(matches!(
            guardrail.evaluate(proposal(-35, 0.7)),
            GuardrailDecision::Deny { reason_code: "adjustment_out_of_range", .. }
        ));
    }

    #[test]
    fn non_finite_confidence_is_denied() {
        assert!(matches!(
            PricingGuardrail::default().evaluate(proposal(0, f64::NAN)),
            GuardrailDecision::Deny { reason_code: "confidence_not_finite", .. }
        ));
    }
}
