//! Parser for the `chr:start-stop` location shorthand.
//!
//! Accepted forms:
//!
//! ```text
//! chr1:100-200     1:100-200     chrX:1500     MT:1-16569
//! ```

use nom::{
    bytes::complete::tag_no_case,
    character::complete::{alphanumeric1, char, digit1, space0},
    combinator::{all_consuming, map_res, opt},
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};

use crate::ast::{Interval, Location};
use crate::error::{QueryError, QueryResult};
use crate::vocabulary;

/// Parses a location shorthand into a [`Location`] node payload.
///
/// # Examples
///
/// ```rust
/// use variant_query::location::parse_location;
///
/// let loc = parse_location("chr17:7668402-7687550").unwrap();
/// assert_eq!(loc.chromosome.as_deref(), Some("17"));
/// assert!(loc.position.contains(7670000.0));
/// ```
pub fn parse_location(input: &str) -> QueryResult<Location> {
    let input = input.trim();
    if input.is_empty() {
        return Err(QueryError::Location {
            position: 0,
            message: "empty location".to_string(),
        });
    }

    match all_consuming(location)(input) {
        Ok((_, (chromosome, (start, stop)))) => {
            let position = match stop {
                Some(stop) => Interval::closed(start as f64, stop as f64),
                None => Interval::exactly(start as f64),
            };
            Ok(Location {
                chromosome: Some(vocabulary::normalize_chromosome(chromosome)),
                position,
            })
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(QueryError::Location {
            position: input.len() - e.input.len(),
            message: format!("unexpected input at: '{}'", e.input),
        }),
        Err(nom::Err::Incomplete(_)) => Err(QueryError::Location {
            position: input.len(),
            message: "incomplete location".to_string(),
        }),
    }
}

type Span = (u64, Option<u64>);

fn location(input: &str) -> IResult<&str, (&str, Span)> {
    separated_pair(chromosome, delimited(space0, char(':'), space0), span)(input)
}

fn chromosome(input: &str) -> IResult<&str, &str> {
    preceded(opt(tag_no_case("chr")), alphanumeric1)(input)
}

fn span(input: &str) -> IResult<&str, Span> {
    tuple((
        position,
        opt(preceded(delimited(space0, char('-'), space0), position)),
    ))(input)
}

fn position(input: &str) -> IResult<&str, u64> {
    map_res(digit1, str::parse::<u64>)(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        let loc = parse_location("chr1:100-200").unwrap();
        assert_eq!(loc.chromosome.as_deref(), Some("1"));
        assert_eq!(loc.position, Interval::closed(100.0, 200.0));
    }

    #[test]
    fn test_parse_single_position() {
        let loc = parse_location("X:1500").unwrap();
        assert_eq!(loc.chromosome.as_deref(), Some("X"));
        assert_eq!(loc.position, Interval::exactly(1500.0));
    }

    #[test]
    fn test_parse_without_prefix_and_with_spaces() {
        let loc = parse_location(" 22 : 10 - 20 ").unwrap();
        assert_eq!(loc.chromosome.as_deref(), Some("22"));
        assert_eq!(loc.position, Interval::closed(10.0, 20.0));
    }

    #[test]
    fn test_parse_mitochondrial_alias() {
        let loc = parse_location("chrM:1-16569").unwrap();
        assert_eq!(loc.chromosome.as_deref(), Some("MT"));
    }

    #[test]
    fn test_missing_colon_reports_position() {
        let err = parse_location("chr1 100").unwrap_err();
        match err {
            QueryError::Location { position, .. } => assert_eq!(position, 5),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        assert!(parse_location("chr1:100-200x").is_err());
        assert!(parse_location("chr1:-200").is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            parse_location("   "),
            Err(QueryError::Location { position: 0, .. })
        ));
    }
}
