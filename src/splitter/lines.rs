//! Line-level predicates used by the splitter.

use nom::{
    bytes::complete::tag_no_case,
    character::complete::{multispace0, space1},
    sequence::{preceded, terminated},
    IResult,
};

/// Block comment opener.
pub const BLOCK_OPEN: &str = "/*";
/// Block comment closer.
pub const BLOCK_CLOSE: &str = "*/";

/// True for lines that never contribute to a statement: blank lines and
/// `#` / `--` comment lines. The comment check does not trim leading
/// whitespace, so an indented `-- x` is still treated as SQL.
pub fn is_ignorable_line(line: &str) -> bool {
    line.trim().is_empty() || line.starts_with('#') || line.starts_with("--")
}

/// Parse `DELIMITER <token>`, returning the raw remainder after the keyword.
fn delimiter_directive(input: &str) -> IResult<&str, &str> {
    let (token, _) = preceded(multispace0, terminated(tag_no_case("DELIMITER"), space1))(input)?;
    Ok(("", token))
}

/// True if the line is a `DELIMITER` directive (keyword, case-insensitive,
/// followed by at least one space).
pub fn is_delimiter_directive(line: &str) -> bool {
    delimiter_directive(line).is_ok()
}

/// The new delimiter named by a `DELIMITER` directive, whitespace-trimmed.
///
/// Returns `None` when the line is not a directive or names no token.
pub fn extract_delimiter(line: &str) -> Option<&str> {
    delimiter_directive(line)
        .ok()
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

/// Remove every `/* ... */` comment that opens and closes on this line.
/// An opener without a closer is left in place.
pub fn strip_inline_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find(BLOCK_OPEN) {
        let body = &rest[start + BLOCK_OPEN.len()..];
        let Some(end) = body.find(BLOCK_CLOSE) else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &body[end + BLOCK_CLOSE.len()..];
    }

    out.push_str(rest);
    out
}
