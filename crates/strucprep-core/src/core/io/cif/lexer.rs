use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag_no_case, take_while, take_while1},
    character::complete::{char, multispace1, not_line_ending},
    combinator::value,
    multi::many0,
    sequence::preceded,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    DataBlock(&'a str),
    Loop,
    DataName(&'a str),
    Value(&'a str),
    Quoted(&'a str),
    TextField(&'a str),
    /// `.` or `?`
    Placeholder,
    Eof,
}

impl<'a> Token<'a> {
    /// The textual value of a value-bearing token; placeholders read as empty.
    pub fn value(&self) -> Option<&'a str> {
        match self {
            Token::Value(s) | Token::Quoted(s) | Token::TextField(s) => Some(s),
            Token::Placeholder => Some(""),
            _ => None,
        }
    }
}

fn skip_ws_comments(input: &str) -> IResult<&str, ()> {
    let (input, _) = many0(alt((
        value((), multispace1),
        value((), preceded(char('#'), not_line_ending)),
    )))(input)?;
    Ok((input, ()))
}

fn parse_data_block(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = tag_no_case("data_")(input)?;
    let (input, name) = take_while(|c: char| !c.is_whitespace())(input)?;
    Ok((input, Token::DataBlock(name)))
}

fn parse_loop(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = tag_no_case("loop_")(input)?;
    Ok((input, Token::Loop))
}

fn parse_data_name(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('_')(input)?;
    let (input, name) = take_while1(|c: char| !c.is_whitespace())(input)?;
    Ok((input, Token::DataName(name)))
}

/// A quoted value closes only on a quote followed by whitespace or end of input,
/// so `'N1'A'` style names survive intact.
fn parse_quoted(input: &str, delimiter: char) -> IResult<&str, Token<'_>> {
    let (body, _) = char(delimiter)(input)?;
    let mut chars = body.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != delimiter {
            continue;
        }
        let closes = match chars.peek() {
            None => true,
            Some((_, next)) => next.is_whitespace(),
        };
        if closes {
            return Ok((&body[i + c.len_utf8()..], Token::Quoted(&body[..i])));
        }
    }
    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Char,
    )))
}

fn parse_single_quoted(input: &str) -> IResult<&str, Token<'_>> {
    parse_quoted(input, '\'')
}

fn parse_double_quoted(input: &str) -> IResult<&str, Token<'_>> {
    parse_quoted(input, '"')
}

fn parse_text_field(input: &str) -> IResult<&str, Token<'_>> {
    let (body, _) = char(';')(input)?;
    match body.find("\n;") {
        Some(end) => {
            let content = body[..end].trim_start_matches(['\r', '\n']);
            Ok((&body[end + 2..], Token::TextField(content.trim_end())))
        }
        None => Ok(("", Token::TextField(body.trim()))),
    }
}

fn parse_unquoted(input: &str) -> IResult<&str, Token<'_>> {
    let (input, raw) = take_while1(|c: char| !c.is_whitespace())(input)?;
    let token = match raw {
        "." | "?" => Token::Placeholder,
        other => Token::Value(other),
    };
    Ok((input, token))
}

pub fn parse_token(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = skip_ws_comments(input)?;
    if input.is_empty() {
        return Ok((input, Token::Eof));
    }
    alt((
        parse_data_block,
        parse_loop,
        parse_data_name,
        parse_single_quoted,
        parse_double_quoted,
        parse_text_field,
        parse_unquoted,
    ))(input)
}

/// Splits CIF text into tokens. Unparseable characters are skipped.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut remaining = input;
    loop {
        match parse_token(remaining) {
            Ok((_, Token::Eof)) => {
                tokens.push(Token::Eof);
                break;
            }
            Ok((rest, token)) => {
                tokens.push(token);
                remaining = rest;
            }
            Err(_) => {
                let mut chars = remaining.chars();
                if chars.next().is_none() {
                    tokens.push(Token::Eof);
                    break;
                }
                remaining = chars.as_str();
            }
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_loop_header_and_values() {
        let tokens = tokenize("data_1ABC\nloop_\n_atom_site.id\n_atom_site.label_atom_id\n1 N\n2 CA\n");
        assert_eq!(
            tokens,
            vec![
                Token::DataBlock("1ABC"),
                Token::Loop,
                Token::DataName("atom_site.id"),
                Token::DataName("atom_site.label_atom_id"),
                Token::Value("1"),
                Token::Value("N"),
                Token::Value("2"),
                Token::Value("CA"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn quoted_values_may_contain_inner_quotes() {
        let tokens = tokenize("\"O5'\" 'N1'A' 'two words'");
        assert_eq!(tokens[0], Token::Quoted("O5'"));
        assert_eq!(tokens[1], Token::Quoted("N1'A"));
        assert_eq!(tokens[2], Token::Quoted("two words"));
    }

    #[test]
    fn placeholders_and_comments() {
        let tokens = tokenize("# comment\n. ? value # trailing\n");
        assert_eq!(tokens, vec![Token::Placeholder, Token::Placeholder, Token::Value("value"), Token::Eof]);
        assert_eq!(Token::Placeholder.value(), Some(""));
    }

    #[test]
    fn text_fields_span_lines() {
        let tokens = tokenize("_struct.title\n;A long\ntitle\n;\n_next.item 1");
        assert_eq!(tokens[1], Token::TextField("A long\ntitle"));
        assert_eq!(tokens[2], Token::DataName("next.item"));
    }
}
