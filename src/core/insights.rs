use crate::models::{CompatibilityResult, Confidence, Criterion};
use serde::Serialize;

/// Quality label of an overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchQuality {
    Low,
    Fair,
    Good,
    Excellent,
    Perfect,
}

impl MatchQuality {
    pub fn from_score(score: u8) -> Self {
        match score {
            85.. => MatchQuality::Perfect,
            70..=84 => MatchQuality::Excellent,
            55..=69 => MatchQuality::Good,
            40..=54 => MatchQuality::Fair,
            _ => MatchQuality::Low,
        }
    }
}

/// Presentation summary derived from a stored breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchInsights {
    pub quality: MatchQuality,
    pub strengths: Vec<Criterion>,
    pub considerations: Vec<Criterion>,
    pub dealbreakers: Vec<Criterion>,
    /// Fewer than half the criteria were scored from real input
    #[serde(rename = "limitedData")]
    pub limited_data: bool,
}

impl MatchInsights {
    pub fn from_result(result: &CompatibilityResult) -> Self {
        let mut strengths = Vec::new();
        let mut considerations = Vec::new();
        let mut dealbreakers = Vec::new();

        // Neutral defaults say nothing about the listing
        for score in result
            .criterion_scores
            .iter()
            .filter(|s| s.confidence == Confidence::Exact)
        {
            if score.score >= 100.0 {
                strengths.push(score.criterion);
            } else if score.score <= 0.0 {
                dealbreakers.push(score.criterion);
            } else {
                considerations.push(score.criterion);
            }
        }

        let limited_data = result.exact_count() * 2 < result.criterion_scores.len();

        Self {
            quality: MatchQuality::from_score(result.overall_score),
            strengths,
            considerations,
            dealbreakers,
            limited_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CriterionScore;

    fn score(criterion: Criterion, value: f64, confidence: Confidence) -> CriterionScore {
        CriterionScore {
            criterion,
            score: value,
            weight: 0.1,
            confidence,
        }
    }

    #[test]
    fn test_quality_thresholds() {
        assert_eq!(MatchQuality::from_score(100), MatchQuality::Perfect);
        assert_eq!(MatchQuality::from_score(85), MatchQuality::Perfect);
        assert_eq!(MatchQuality::from_score(84), MatchQuality::Excellent);
        assert_eq!(MatchQuality::from_score(55), MatchQuality::Good);
        assert_eq!(MatchQuality::from_score(40), MatchQuality::Fair);
        assert_eq!(MatchQuality::from_score(39), MatchQuality::Low);
    }

    #[test]
    fn test_insights_split_exact_criteria() {
        let result = CompatibilityResult {
            overall_score: 72,
            criterion_scores: vec![
                score(Criterion::Budget, 100.0, Confidence::Exact),
                score(Criterion::City, 0.0, Confidence::Exact),
                score(Criterion::Bedrooms, 75.0, Confidence::Exact),
                score(Criterion::Smoking, 60.0, Confidence::Default),
                score(Criterion::Pets, 60.0, Confidence::Default),
                score(Criterion::MoveIn, 60.0, Confidence::Default),
            ],
        };

        let insights = MatchInsights::from_result(&result);

        assert_eq!(insights.quality, MatchQuality::Excellent);
        assert_eq!(insights.strengths, vec![Criterion::Budget]);
        assert_eq!(insights.dealbreakers, vec![Criterion::City]);
        assert_eq!(insights.considerations, vec![Criterion::Bedrooms]);
        assert!(!insights.limited_data);
    }

    #[test]
    fn test_sparse_breakdown_is_limited() {
        let result = CompatibilityResult {
            overall_score: 64,
            criterion_scores: vec![
                score(Criterion::Budget, 100.0, Confidence::Exact),
                score(Criterion::City, 70.0, Confidence::Default),
                score(Criterion::Bedrooms, 70.0, Confidence::Default),
            ],
        };

        assert!(MatchInsights::from_result(&result).limited_data);
    }
}
