use super::residue::ResidueKey;
use crate::core::topology::residues::three_letter_code;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShortcodeError {
    #[error("Malformed {kind} shortcode '{code}' (expected {expected})")]
    Malformed {
        kind: &'static str,
        code: String,
        expected: &'static str,
    },
    #[error("Invalid residue number '{0}'")]
    InvalidResid(String),
    #[error("Unknown one-letter residue code '{0}'")]
    UnknownResidueCode(char),
}

/// Splits `"25"`, `"-3"` or `"100A"` into sequence number and insertion code.
pub fn parse_resid(text: &str) -> Result<(isize, String), ShortcodeError> {
    let text = text.trim();
    let split = text
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (number, insertion) = text.split_at(split);
    if insertion.chars().count() > 1 || !insertion.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ShortcodeError::InvalidResid(text.to_string()));
    }
    let resseqnum = number
        .parse()
        .map_err(|_| ShortcodeError::InvalidResid(text.to_string()))?;
    Ok((resseqnum, insertion.to_string()))
}

fn resname_of(code: char) -> Result<String, ShortcodeError> {
    three_letter_code(code.to_ascii_uppercase())
        .map(String::from)
        .ok_or(ShortcodeError::UnknownResidueCode(code))
}

fn split_chain<'a>(
    code: &'a str,
    kind: &'static str,
    expected: &'static str,
) -> Result<(&'a str, &'a str), ShortcodeError> {
    match code.trim().split_once(':') {
        Some((chain, rest)) if !chain.is_empty() && !rest.is_empty() => Ok((chain, rest)),
        _ => Err(ShortcodeError::Malformed {
            kind,
            code: code.to_string(),
            expected,
        }),
    }
}

/// A point mutation, written `C:NnnnM` (chain, original residue, number, new residue).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub chain_id: String,
    pub resseqnum: isize,
    pub insertion: String,
    pub orig_resname: String,
    pub new_resname: String,
}

impl Mutation {
    const EXPECTED: &'static str = "C:NnnnM, e.g. A:N25Q";

    pub fn from_shortcode(code: &str) -> Result<Self, ShortcodeError> {
        let (chain, rest) = split_chain(code, "mutation", Self::EXPECTED)?;
        let malformed = || ShortcodeError::Malformed {
            kind: "mutation",
            code: code.to_string(),
            expected: Self::EXPECTED,
        };
        let mut chars = rest.chars();
        let orig = chars.next().ok_or_else(malformed)?;
        let new = chars.next_back().ok_or_else(malformed)?;
        let middle = chars.as_str();
        if middle.is_empty() || !orig.is_ascii_alphabetic() || !new.is_ascii_alphabetic() {
            return Err(malformed());
        }
        let (resseqnum, insertion) = parse_resid(middle)?;
        Ok(Self {
            chain_id: chain.to_string(),
            resseqnum,
            insertion,
            orig_resname: resname_of(orig)?,
            new_resname: resname_of(new)?,
        })
    }

    pub fn key(&self) -> ResidueKey {
        ResidueKey::new(&self.chain_id, self.resseqnum, &self.insertion)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}{}{}{}",
            self.chain_id, self.orig_resname, self.resseqnum, self.insertion, self.new_resname
        )
    }
}

/// An inclusive residue range of one chain, written `C:first-last` or `C:resid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deletion {
    pub chain_id: String,
    pub first: ResidueKey,
    pub last: ResidueKey,
}

impl Deletion {
    const EXPECTED: &'static str = "C:first-last or C:resid, e.g. A:25-30";

    pub fn from_shortcode(code: &str) -> Result<Self, ShortcodeError> {
        let (chain, rest) = split_chain(code, "deletion", Self::EXPECTED)?;
        let (first, last) = split_range(rest);
        let (first_seq, first_ins) = parse_resid(first)?;
        let (last_seq, last_ins) = parse_resid(last)?;
        Ok(Self {
            chain_id: chain.to_string(),
            first: ResidueKey::new(chain, first_seq, &first_ins),
            last: ResidueKey::new(chain, last_seq, &last_ins),
        })
    }
}

/// Splits `first-last` on the range dash, leaving a leading minus sign alone.
fn split_range(text: &str) -> (&str, &str) {
    match text.get(1..).and_then(|t| t.find('-')) {
        Some(i) => (&text[..i + 1], &text[i + 2..]),
        None => (text, text),
    }
}

/// Replaces a residue range with a new sequence, written `C:first,last,SEQ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub chain_id: String,
    pub first: ResidueKey,
    pub last: ResidueKey,
    pub sequence: Vec<String>,
}

impl Substitution {
    const EXPECTED: &'static str = "C:first,last,SEQ, e.g. A:25,30,GGS";

    pub fn from_shortcode(code: &str) -> Result<Self, ShortcodeError> {
        let (chain, rest) = split_chain(code, "substitution", Self::EXPECTED)?;
        let parts: Vec<&str> = rest.split(',').map(str::trim).collect();
        let [first, last, sequence] = parts.as_slice() else {
            return Err(ShortcodeError::Malformed {
                kind: "substitution",
                code: code.to_string(),
                expected: Self::EXPECTED,
            });
        };
        if sequence.is_empty() {
            return Err(ShortcodeError::Malformed {
                kind: "substitution",
                code: code.to_string(),
                expected: Self::EXPECTED,
            });
        }
        let (first_seq, first_ins) = parse_resid(first)?;
        let (last_seq, last_ins) = parse_resid(last)?;
        Ok(Self {
            chain_id: chain.to_string(),
            first: ResidueKey::new(chain, first_seq, &first_ins),
            last: ResidueKey::new(chain, last_seq, &last_ins),
            sequence: sequence.chars().map(resname_of).collect::<Result<_, _>>()?,
        })
    }
}

/// Splits a chain after the named residue, written `C:resid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cleavage {
    pub chain_id: String,
    pub after: ResidueKey,
}

impl Cleavage {
    const EXPECTED: &'static str = "C:resid, e.g. A:25";

    pub fn from_shortcode(code: &str) -> Result<Self, ShortcodeError> {
        let (chain, rest) = split_chain(code, "cleavage", Self::EXPECTED)?;
        let (resseqnum, insertion) = parse_resid(rest)?;
        Ok(Self {
            chain_id: chain.to_string(),
            after: ResidueKey::new(chain, resseqnum, &insertion),
        })
    }
}

/// Modifications applied to an asymmetric unit, in application order per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedMods {
    pub mutations: Vec<Mutation>,
    pub deletions: Vec<Deletion>,
    pub substitutions: Vec<Substitution>,
    pub cleavages: Vec<Cleavage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resids_with_insertion_and_sign() {
        assert_eq!(parse_resid("25").unwrap(), (25, String::new()));
        assert_eq!(parse_resid("100A").unwrap(), (100, "A".to_string()));
        assert_eq!(parse_resid("-3").unwrap(), (-3, String::new()));
        assert!(parse_resid("A").is_err());
        assert!(parse_resid("25AB").is_err());
    }

    #[test]
    fn mutation_shortcode() {
        let m = Mutation::from_shortcode("A:N25Q").unwrap();
        assert_eq!(m.chain_id, "A");
        assert_eq!(m.resseqnum, 25);
        assert_eq!(m.orig_resname, "ASN");
        assert_eq!(m.new_resname, "GLN");
        assert_eq!(m.key(), ResidueKey::new("A", 25, ""));

        let with_insertion = Mutation::from_shortcode("B:G100AW").unwrap();
        assert_eq!(with_insertion.insertion, "A");
        assert_eq!(with_insertion.new_resname, "TRP");
    }

    #[test]
    fn mutation_shortcode_errors() {
        assert!(matches!(
            Mutation::from_shortcode("N25Q"),
            Err(ShortcodeError::Malformed { .. })
        ));
        assert!(matches!(
            Mutation::from_shortcode("A:NQ"),
            Err(ShortcodeError::Malformed { .. })
        ));
        assert_eq!(
            Mutation::from_shortcode("A:N25J"),
            Err(ShortcodeError::UnknownResidueCode('J'))
        );
    }

    #[test]
    fn deletion_shortcodes() {
        let range = Deletion::from_shortcode("A:25-30").unwrap();
        assert_eq!(range.first, ResidueKey::new("A", 25, ""));
        assert_eq!(range.last, ResidueKey::new("A", 30, ""));

        let single = Deletion::from_shortcode("C:-2").unwrap();
        assert_eq!(single.first, single.last);
        assert_eq!(single.first.resseqnum, -2);

        let negative_range = Deletion::from_shortcode("C:-2-4").unwrap();
        assert_eq!(negative_range.first.resseqnum, -2);
        assert_eq!(negative_range.last.resseqnum, 4);
    }

    #[test]
    fn substitution_shortcode() {
        let s = Substitution::from_shortcode("A:25,30,GGS").unwrap();
        assert_eq!(s.first.resseqnum, 25);
        assert_eq!(s.last.resseqnum, 30);
        assert_eq!(s.sequence, vec!["GLY", "GLY", "SER"]);
        assert!(Substitution::from_shortcode("A:25,30").is_err());
        assert!(Substitution::from_shortcode("A:25,30,").is_err());
    }

    #[test]
    fn cleavage_shortcode() {
        let c = Cleavage::from_shortcode("A:120B").unwrap();
        assert_eq!(c.after, ResidueKey::new("A", 120, "B"));
        assert!(Cleavage::from_shortcode("A:").is_err());
    }
}
