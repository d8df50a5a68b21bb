use super::ids::ResidueId;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum SegType {
    Protein,
    Glycan,
    Ion,
    Water,
    Ligand,
    NucleicAcid,
    Other,
    #[default]
    Unset,
}

impl fmt::Display for SegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SegType::Protein => "protein",
            SegType::Glycan => "glycan",
            SegType::Ion => "ion",
            SegType::Water => "water",
            SegType::Ligand => "ligand",
            SegType::NucleicAcid => "nucleicacid",
            SegType::Other => "other",
            SegType::Unset => "UNSET",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSegTypeError(pub String);

impl fmt::Display for ParseSegTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown segment type '{}'", self.0)
    }
}

impl std::error::Error for ParseSegTypeError {}

impl FromStr for SegType {
    type Err = ParseSegTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "protein" => Ok(SegType::Protein),
            "glycan" => Ok(SegType::Glycan),
            "ion" => Ok(SegType::Ion),
            "water" => Ok(SegType::Water),
            "ligand" => Ok(SegType::Ligand),
            "nucleicacid" | "nucleic_acid" => Ok(SegType::NucleicAcid),
            "other" => Ok(SegType::Other),
            "unset" => Ok(SegType::Unset),
            _ => Err(ParseSegTypeError(s.to_string())),
        }
    }
}

/// Whether a run of residues carries coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResidueState {
    Resolved,
    Missing,
}

impl fmt::Display for ResidueState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResidueState::Resolved => write!(f, "RESOLVED"),
            ResidueState::Missing => write!(f, "MISSING"),
        }
    }
}

/// A maximal run of equal state over an ordered list; `bounds` is inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInterval<S> {
    pub state: S,
    pub bounds: [usize; 2],
}

impl<S: fmt::Display> StateInterval<S> {
    pub fn len(&self) -> usize {
        self.bounds[1] - self.bounds[0] + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.bounds[0] <= index && index <= self.bounds[1]
    }

    pub fn pstr(&self) -> String {
        format!("{}({})-({})", self.state, self.bounds[0], self.bounds[1])
    }
}

/// Run-length encodes `items` by `state_fn`.
///
/// Adjacent items with equal state share one interval; the intervals cover
/// `0..items.len()` without gaps or overlaps.
pub fn state_bounds<T, S, F>(items: &[T], mut state_fn: F) -> Vec<StateInterval<S>>
where
    S: PartialEq,
    F: FnMut(&T) -> S,
{
    let mut intervals: Vec<StateInterval<S>> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let state = state_fn(item);
        match intervals.last_mut() {
            Some(last) if last.state == state => last.bounds[1] = index,
            _ => intervals.push(StateInterval {
                state,
                bounds: [index, index],
            }),
        }
    }
    intervals
}

/// Residues of one chain and one segtype, in chain order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub segname: String,
    pub segtype: SegType,
    pub(crate) residues: Vec<ResidueId>,
    pub(crate) subsegments: Vec<StateInterval<ResidueState>>,
    pub parent_chain_id: Option<String>,
}

impl Segment {
    pub(crate) fn new(
        segname: &str,
        segtype: SegType,
        residues: Vec<ResidueId>,
        subsegments: Vec<StateInterval<ResidueState>>,
    ) -> Self {
        Self {
            segname: segname.to_string(),
            segtype,
            residues,
            subsegments,
            parent_chain_id: None,
        }
    }

    pub fn residues(&self) -> &[ResidueId] {
        &self.residues
    }

    pub fn subsegments(&self) -> &[StateInterval<ResidueState>] {
        &self.subsegments
    }

    /// Missing runs that have resolved residues on both sides.
    pub fn internal_loops(&self) -> impl Iterator<Item = &StateInterval<ResidueState>> {
        let last = self.subsegments.len().saturating_sub(1);
        self.subsegments
            .iter()
            .enumerate()
            .filter(move |(i, s)| s.state == ResidueState::Missing && *i != 0 && *i != last)
            .map(|(_, s)| s)
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.subsegments
            .iter()
            .all(|s| s.state == ResidueState::Resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ResidueState::{Missing as M, Resolved as R};

    #[test]
    fn state_bounds_matches_reference_example() {
        let states = [M, M, R, R, R, M, R, R];
        let intervals = state_bounds(&states, |s| *s);
        let flat: Vec<(ResidueState, usize, usize)> = intervals
            .iter()
            .map(|i| (i.state, i.bounds[0], i.bounds[1]))
            .collect();
        assert_eq!(flat, vec![(M, 0, 1), (R, 2, 4), (M, 5, 5), (R, 6, 7)]);
    }

    #[test]
    fn state_bounds_partitions_any_input() {
        let inputs: [&[bool]; 5] = [
            &[],
            &[true],
            &[true, true, true],
            &[false, true, false, true],
            &[true, true, false, false, false, true],
        ];
        for items in inputs {
            let intervals = state_bounds(items, |b| *b);
            if items.is_empty() {
                assert!(intervals.is_empty());
                continue;
            }
            assert_eq!(intervals[0].bounds[0], 0);
            assert_eq!(intervals.last().unwrap().bounds[1], items.len() - 1);
            for pair in intervals.windows(2) {
                assert_eq!(pair[0].bounds[1] + 1, pair[1].bounds[0]);
                assert_ne!(pair[0].state, pair[1].state);
            }
            for interval in &intervals {
                for index in interval.bounds[0]..=interval.bounds[1] {
                    assert_eq!(items[index], interval.state);
                }
            }
        }
    }

    #[test]
    fn pstr_renders_state_and_bounds() {
        let interval = StateInterval {
            state: M,
            bounds: [5, 9],
        };
        assert_eq!(interval.pstr(), "MISSING(5)-(9)");
        assert_eq!(interval.len(), 5);
        assert!(interval.contains(7));
        assert!(!interval.contains(10));
    }

    #[test]
    fn segtype_parses_case_insensitively() {
        assert_eq!("Glycan".parse::<SegType>(), Ok(SegType::Glycan));
        assert_eq!("NUCLEICACID".parse::<SegType>(), Ok(SegType::NucleicAcid));
        assert!("lipid".parse::<SegType>().is_err());
        assert_eq!(SegType::Unset.to_string(), "UNSET");
    }

    #[test]
    fn internal_loops_skip_terminal_runs() {
        let subsegments = state_bounds(&[M, R, R, M, M, R, M], |s| *s);
        let segment = Segment::new("A", SegType::Protein, Vec::new(), subsegments);
        let loops: Vec<[usize; 2]> = segment.internal_loops().map(|s| s.bounds).collect();
        assert_eq!(loops, vec![[3, 4]]);
        assert!(!segment.is_fully_resolved());
    }
}
