//! Grade text parsing and the letter-grade scale.

use std::sync::OnceLock;

use num_rational::BigRational;
use num_traits::{One, Zero};
use regex::Regex;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::number::{hundred, parse_decimal, parse_ratio};

/// Letter grades from lowest to highest.
pub const LETTERS: [&str; 11] = ["F", "D", "D+", "C-", "C", "C+", "B-", "B", "B+", "A-", "A"];

/// Sentinel text for an ungraded leaf.
pub const UNGRADED: &str = "None";

/// Upper-bound fraction of each letter, in [`LETTERS`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterScale {
    bounds: Vec<BigRational>,
}

impl Default for LetterScale {
    fn default() -> Self {
        let bounds = [180, 195, 210, 220, 230, 240, 250, 260, 270, 285, 300]
            .into_iter()
            .map(|n| BigRational::new(n.into(), 300.into()))
            .collect();
        Self { bounds }
    }
}

impl LetterScale {
    /// Build a scale from 11 non-decreasing bounds within [0, 1].
    pub fn new(bounds: Vec<BigRational>) -> DomainResult<Self> {
        if bounds.len() != LETTERS.len() {
            return Err(DomainError::InvalidScale(format!(
                "expected {} bounds, got {}",
                LETTERS.len(),
                bounds.len()
            )));
        }
        if bounds.iter().any(|b| *b < BigRational::zero() || *b > BigRational::one()) {
            return Err(DomainError::InvalidScale("bounds must lie in [0, 1]".into()));
        }
        if bounds.windows(2).any(|w| w[0] > w[1]) {
            return Err(DomainError::InvalidScale("bounds must not decrease".into()));
        }
        Ok(Self { bounds })
    }

    /// Parse bounds written as `60%`, `180/300` or `0.6`.
    pub fn from_texts<S: AsRef<str>>(texts: &[S]) -> DomainResult<Self> {
        let bounds = texts
            .iter()
            .map(|t| {
                let t = t.as_ref().trim();
                let parsed = match t.strip_suffix('%') {
                    Some(number) => parse_decimal(number).map(|v| v / hundred()),
                    None if t.contains('/') => parse_ratio(t),
                    None => parse_decimal(t),
                };
                parsed.ok_or_else(|| DomainError::InvalidScale(format!("bad bound {t:?}")))
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Self::new(bounds)
    }

    pub fn bounds(&self) -> &[BigRational] {
        &self.bounds
    }

    pub fn fraction(&self, letter: &str) -> DomainResult<BigRational> {
        LETTERS
            .iter()
            .position(|&l| l == letter)
            .map(|i| self.bounds[i].clone())
            .ok_or_else(|| DomainError::UnknownLetter(letter.to_string()))
    }

    /// First letter whose bound exceeds `fraction`, `A` otherwise.
    pub fn letter_for(&self, fraction: &BigRational) -> &'static str {
        LETTERS
            .iter()
            .zip(&self.bounds)
            .find(|(_, bound)| fraction < *bound)
            .map(|(letter, _)| *letter)
            .unwrap_or("A")
    }
}

/// A recognized grade notation with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Percent(BigRational),
    Ratio(BigRational),
    Points {
        earned: BigRational,
        possible: BigRational,
    },
    Letter(BigRational),
}

impl Mark {
    pub fn fraction(&self) -> BigRational {
        match self {
            Mark::Percent(v) | Mark::Ratio(v) | Mark::Letter(v) => v.clone(),
            Mark::Points { earned, possible } => earned / possible,
        }
    }
}

/// Parsed grade of a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Score {
    Ungraded,
    Graded { mark: Mark, negated: bool },
}

fn letter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-F][+-]?(?:/[A-F][+-]?)?$").expect("letter regex"))
}

fn is_numeric(text: &str) -> bool {
    text.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

impl Score {
    /// Parse grade text.
    ///
    /// Leading `+` is ignored and a leading `-` marks penalty notation, in
    /// which the final value is one minus the parsed value. Plain numbers are
    /// points out of `full_points` and fail without it.
    pub fn parse(
        text: &str,
        full_points: Option<&BigRational>,
        scale: &LetterScale,
    ) -> DomainResult<Self> {
        let body = text.trim_start_matches('+');
        let (negated, body) = match body.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, body),
        };

        if body.eq_ignore_ascii_case("none") {
            return Ok(Score::Ungraded);
        }

        let mark = if let Some(number) = body.strip_suffix('%') {
            let value = parse_decimal(number)
                .ok_or_else(|| DomainError::grade(text, "malformed percentage"))?;
            Mark::Percent(value / hundred())
        } else if body.contains('/') && is_numeric(&body.replace('/', "")) {
            let value = parse_ratio(body)
                .ok_or_else(|| DomainError::grade(text, "malformed or zero-denominator fraction"))?;
            Mark::Ratio(value)
        } else if !body.is_empty() && is_numeric(body) {
            let earned = parse_decimal(body)
                .ok_or_else(|| DomainError::grade(text, "malformed number"))?;
            let possible = full_points
                .filter(|p| !p.is_zero())
                .ok_or_else(|| DomainError::grade(text, "points need a non-zero points weight"))?;
            Mark::Points {
                earned,
                possible: possible.clone(),
            }
        } else if letter_regex().is_match(body) {
            let fractions = body
                .split('/')
                .map(|letter| scale.fraction(letter))
                .collect::<DomainResult<Vec<_>>>()?;
            let count = BigRational::from_integer(fractions.len().into());
            Mark::Letter(fractions.into_iter().sum::<BigRational>() / count)
        } else {
            return Err(DomainError::grade(text, "unrecognized grade"));
        };
        Ok(Score::Graded { mark, negated })
    }

    /// Fraction earned, with penalty notation applied; None when ungraded.
    pub fn value(&self) -> Option<BigRational> {
        match self {
            Score::Ungraded => None,
            Score::Graded { mark, negated } => {
                let fraction = mark.fraction();
                Some(if *negated {
                    BigRational::one() - fraction
                } else {
                    fraction
                })
            }
        }
    }

    pub fn is_graded(&self) -> bool {
        !matches!(self, Score::Ungraded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    fn parse(text: &str, points: Option<i64>) -> DomainResult<Score> {
        let points = points.map(|p| ratio(p, 1));
        Score::parse(text, points.as_ref(), &LetterScale::default())
    }

    #[rstest]
    #[case("85%", Some(10), ratio(17, 20))]
    #[case("92.5%", None, ratio(37, 40))]
    #[case("18/20", Some(10), ratio(9, 10))]
    #[case("/20", Some(10), ratio(0, 1))]
    #[case("7/", None, ratio(7, 1))]
    #[case("8", Some(10), ratio(4, 5))]
    #[case("2.5", Some(10), ratio(1, 4))]
    #[case("+8", Some(10), ratio(4, 5))]
    #[case("-20%", None, ratio(4, 5))]
    #[case("-2", Some(10), ratio(4, 5))]
    #[case("B", None, ratio(260, 300))]
    #[case("A/A-", None, ratio(585, 600))]
    fn test_parse_value(#[case] text: &str, #[case] points: Option<i64>, #[case] value: BigRational) {
        assert_eq!(parse(text, points).unwrap().value(), Some(value));
    }

    #[rstest]
    #[case("None")]
    #[case("none")]
    #[case("NONE")]
    #[case("-none")]
    fn test_parse_ungraded(#[case] text: &str) {
        let score = parse(text, Some(10)).unwrap();
        assert_eq!(score, Score::Ungraded);
        assert_eq!(score.value(), None);
    }

    #[test]
    fn test_fraction_ignores_assignment_points() {
        let score = parse("18/20", Some(10)).unwrap();
        assert!(matches!(
            score,
            Score::Graded {
                mark: Mark::Ratio(_),
                negated: false
            }
        ));
        assert_eq!(score.value(), Some(ratio(9, 10)));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("%")]
    #[case("1/0")]
    #[case("8 pts")]
    #[case("1.2.3")]
    fn test_parse_rejects(#[case] text: &str) {
        let err = parse(text, Some(10)).unwrap_err();
        assert!(err.is_parse(), "{err}");
    }

    #[test]
    fn test_points_require_points_weight() {
        assert!(matches!(
            parse("8", None),
            Err(DomainError::InvalidGrade { .. })
        ));
        assert!(parse("8", Some(0)).is_err());
    }

    #[rstest]
    #[case("E")]
    #[case("A+")]
    #[case("B/F-")]
    fn test_unknown_letter(#[case] text: &str) {
        assert!(matches!(parse(text, None), Err(DomainError::UnknownLetter(_))));
    }

    #[rstest]
    #[case(ratio(0, 1), "F")]
    #[case(ratio(59, 100), "F")]
    #[case(ratio(60, 100), "D")]
    #[case(ratio(85, 100), "B")]
    #[case(ratio(92, 100), "A-")]
    #[case(ratio(96, 100), "A")]
    #[case(ratio(1, 1), "A")]
    #[case(ratio(11, 10), "A")]
    fn test_letter_for(#[case] fraction: BigRational, #[case] letter: &str) {
        assert_eq!(LetterScale::default().letter_for(&fraction), letter);
    }

    #[test]
    fn test_scale_from_texts() {
        let texts = [
            "60%", "65%", "70%", "220/300", "0.7667", "80%", "250/300", "260/300", "90%",
            "95%", "100%",
        ];
        let scale = LetterScale::from_texts(&texts).unwrap();
        assert_eq!(scale.fraction("D").unwrap(), ratio(13, 20));
        assert!(LetterScale::from_texts(&texts[..10]).is_err());
        let mut reversed = texts;
        reversed.reverse();
        assert!(LetterScale::from_texts(&reversed).is_err());
    }
}
