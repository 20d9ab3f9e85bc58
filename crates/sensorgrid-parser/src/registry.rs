use crate::errors::{ParserError, Rejection, Rejections};
use crate::formats::{ColumnNames, DelimitedParser};
use crate::model::Dataset;

pub trait DatasetParser {
    fn name(&self) -> &'static str;
    fn parse(&self, content: &str, columns: &ColumnNames) -> Result<Dataset, ParserError>;
}

/// Parses `content` as comma, semicolon, then tab separated text.
pub fn parse_sensor_file(content: &str, columns: &ColumnNames) -> Result<Dataset, ParserError> {
    parse_with_parsers(content, columns, &DelimitedParser::BUILT_IN)
}

/// Returns the first dataset a parser produces. Only an unrecognised header lets the next
/// parser try; every other error is final.
pub fn parse_with_parsers<P: DatasetParser>(
    content: &str,
    columns: &ColumnNames,
    parsers: &[P],
) -> Result<Dataset, ParserError> {
    let mut rejections = Vec::with_capacity(parsers.len());

    for candidate in parsers {
        match candidate.parse(content, columns) {
            Err(ParserError::UnrecognisedHeader { parser, reason }) => {
                rejections.push(Rejection { parser, reason });
            }
            outcome => return outcome,
        }
    }

    Err(ParserError::NoMatchingLayout {
        rejections: Rejections(rejections),
    })
}
