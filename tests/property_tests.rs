/// Property-based tests using proptest
/// Tests invariants that should hold for all leads and scores
use lead_qualifier::core::intent::{fallback_assessment, parse_response, FallbackReason};
use lead_qualifier::core::models::{AiAssessment, Intent, Lead, LeadScore, RuleScores};
use lead_qualifier::core::rules::{completeness_score, industry_score, role_score};
use proptest::prelude::*;

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[ a-zA-Z]{0,12}")
}

fn intent() -> impl Strategy<Value = Intent> {
    prop_oneof![Just(Intent::High), Just(Intent::Medium), Just(Intent::Low)]
}

fn rule_scores() -> impl Strategy<Value = RuleScores> {
    (
        prop_oneof![Just(0), Just(10), Just(20)],
        prop_oneof![Just(0), Just(10), Just(20)],
        prop_oneof![Just(0), Just(5), Just(10)],
    )
        .prop_map(|(role, industry, completeness)| RuleScores {
            role,
            industry,
            completeness,
        })
}

// Property: rule functions only ever produce their documented point values
proptest! {
    #[test]
    fn role_score_is_bucketed(role in "\\PC*") {
        prop_assert!([0, 10, 20].contains(&role_score(&role)));
    }

    #[test]
    fn role_score_ignores_case(role in "[a-zA-Z ]{0,20}") {
        prop_assert_eq!(role_score(&role), role_score(&role.to_uppercase()));
    }

    #[test]
    fn industry_score_is_bucketed(
        industry in "\\PC{0,20}",
        use_cases in prop::collection::vec("\\PC{0,20}", 0..4)
    ) {
        prop_assert!([0, 10, 20].contains(&industry_score(&industry, &use_cases)));
    }

    #[test]
    fn completeness_is_bucketed(
        name in optional_text(),
        role in optional_text(),
        company in optional_text(),
        industry in optional_text(),
        location in optional_text(),
        linkedin_bio in optional_text()
    ) {
        let lead = Lead { name, role, company, industry, location, linkedin_bio, ..Default::default() };
        let filled = lead.profile_fields().iter().filter(|f| f.is_some()).count();
        let expected = match filled {
            6 => 10,
            4 | 5 => 5,
            _ => 0,
        };
        prop_assert_eq!(completeness_score(&lead), expected);
    }
}

// Property: totals and labels are always derived from the parts
proptest! {
    #[test]
    fn total_is_sum_of_parts(rules in rule_scores(), ai in 0..=50i32, ai_intent in intent()) {
        let score = LeadScore::new(
            1,
            1,
            rules,
            AiAssessment { score: ai, intent: ai_intent, reasoning: String::new() },
        );
        prop_assert_eq!(score.total_score(), rules.subtotal() + ai);
        prop_assert!((0..=100).contains(&score.total_score()));
        prop_assert_eq!(score.rule_score(), rules.subtotal());

        let expected = if score.total_score() >= 70 {
            Intent::High
        } else if score.total_score() >= 40 {
            Intent::Medium
        } else {
            Intent::Low
        };
        prop_assert_eq!(score.intent_label(), expected);
    }

    #[test]
    fn fallback_stays_in_range(rules in rule_scores()) {
        for reason in [FallbackReason::Unconfigured, FallbackReason::BackendError] {
            let assessment = fallback_assessment(&rules, reason);
            prop_assert!([15, 25, 30, 40, 45].contains(&assessment.score));
            prop_assert!(!assessment.reasoning.is_empty());
        }
    }

    #[test]
    fn parsing_never_panics_and_stays_in_range(reply in "\\PC*") {
        let assessment = parse_response(&reply);
        prop_assert!([10, 25, 30, 50].contains(&assessment.score));
        prop_assert!(assessment.reasoning.chars().count() <= 200);
    }
}
