use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

/// The identifier alphabet a structure format can address.
///
/// PDB files carry a single chain character, so the pool is `A-Z`, `a-z`, `0-9`.
/// mmCIF files allow longer identifiers; the pool is `A-Z` followed by every
/// two-letter combination `AA..ZZ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChainIdFormat {
    #[default]
    Pdb,
    Mmcif,
}

impl ChainIdFormat {
    /// Enumerates the full identifier alphabet in allocation order.
    pub fn alphabet(&self) -> Vec<String> {
        let upper: Vec<char> = ('A'..='Z').collect();
        match self {
            ChainIdFormat::Pdb => upper
                .iter()
                .copied()
                .chain('a'..='z')
                .chain('0'..='9')
                .map(String::from)
                .collect(),
            ChainIdFormat::Mmcif => {
                let mut ids: Vec<String> = upper.iter().map(|c| c.to_string()).collect();
                for prefix in &upper {
                    for suffix in &upper {
                        ids.push(format!("{prefix}{suffix}"));
                    }
                }
                ids
            }
        }
    }
}

impl fmt::Display for ChainIdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainIdFormat::Pdb => write!(f, "PDB"),
            ChainIdFormat::Mmcif => write!(f, "mmCIF"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainIdError {
    #[error("{format} chain identifier pool is exhausted ({requested} requested, {available} available)")]
    Exhausted {
        format: ChainIdFormat,
        requested: usize,
        available: usize,
    },
    #[error("Chain '{0}' has no reserved image identifiers")]
    UnknownReserveKey(String),
    #[error("All reserved image identifiers for chain '{0}' are in use")]
    ReservesExhausted(String),
    #[error("Reserved identifier '{id}' is not part of the {format} alphabet")]
    InvalidReservation { id: String, format: ChainIdFormat },
}

/// Hands out chain-ID substitutions for both the deposited chains and their symmetry images.
///
/// Both `generate_next_map` and `thru_map` are exposed through this trait so that the
/// transform layer can be driven by something other than a live [`ChainIdManager`].
pub trait ChainIdAllocator {
    fn thru_map(
        &mut self,
        chain_ids: &[String],
        active_chains: Option<&[String]>,
    ) -> BTreeMap<String, String>;

    fn generate_next_map(
        &mut self,
        chain_ids: &[String],
        active_chains: Option<&[String]>,
    ) -> Result<BTreeMap<String, String>, ChainIdError>;
}

/// Allocator for collision-free chain identifiers within a single build.
///
/// Allocation is strictly FIFO over the format alphabet so two runs over the same
/// input always produce the same identifiers. Identifiers listed in
/// `transform_reserves` are withheld from general circulation and only handed out
/// through [`ChainIdManager::next_reserved_chain_id`].
#[derive(Debug, Clone)]
pub struct ChainIdManager {
    format: ChainIdFormat,
    alphabet_rank: HashMap<String, usize>,
    unused: VecDeque<String>,
    reserved_unused: Vec<String>,
    used: HashSet<String>,
    transform_reserves: BTreeMap<String, Vec<String>>,
    remap: BTreeMap<String, String>,
}

impl ChainIdManager {
    pub fn new(format: ChainIdFormat) -> Self {
        let alphabet = format.alphabet();
        Self {
            format,
            alphabet_rank: alphabet
                .iter()
                .enumerate()
                .map(|(rank, id)| (id.clone(), rank))
                .collect(),
            unused: alphabet.into(),
            reserved_unused: Vec::new(),
            used: HashSet::new(),
            transform_reserves: BTreeMap::new(),
            remap: BTreeMap::new(),
        }
    }

    /// Creates a manager with image-chain reservations and user chain renames.
    ///
    /// # Errors
    ///
    /// Returns [`ChainIdError::InvalidReservation`] if a reserved identifier is not
    /// part of the alphabet for `format`.
    pub fn with_reserves(
        format: ChainIdFormat,
        transform_reserves: BTreeMap<String, Vec<String>>,
        remap: BTreeMap<String, String>,
    ) -> Result<Self, ChainIdError> {
        let mut manager = Self::new(format);
        for reserved in transform_reserves.values().flatten() {
            if !manager.alphabet_rank.contains_key(reserved) {
                return Err(ChainIdError::InvalidReservation {
                    id: reserved.clone(),
                    format,
                });
            }
            manager.unused.retain(|id| id != reserved);
            if !manager.reserved_unused.contains(reserved) {
                manager.reserved_unused.push(reserved.clone());
            }
        }
        manager.transform_reserves = transform_reserves;
        manager.remap = remap;
        Ok(manager)
    }

    pub fn format(&self) -> ChainIdFormat {
        self.format
    }

    pub fn unused(&self) -> impl Iterator<Item = &str> {
        self.unused.iter().map(String::as_str)
    }

    pub fn reserved_unused(&self) -> &[String] {
        &self.reserved_unused
    }

    pub fn is_used(&self, chain_id: &str) -> bool {
        self.used.contains(chain_id)
    }

    pub fn available(&self) -> usize {
        self.unused.len()
    }

    fn is_reserved(&self, chain_id: &str) -> bool {
        self.transform_reserves
            .values()
            .any(|ids| ids.iter().any(|id| id == chain_id))
    }

    fn is_remap_target(&self, chain_id: &str) -> bool {
        self.remap.values().any(|target| target == chain_id)
    }

    /// Grants a chain identifier for `proposed`, claiming it in the process.
    ///
    /// A user remap entry for `proposed` takes precedence. A proposal that is not
    /// itself remapped but collides with some other chain's remap target, is
    /// reserved for symmetry images, or is already claimed is silently replaced
    /// by the next unused identifier.
    ///
    /// # Errors
    ///
    /// Returns [`ChainIdError::Exhausted`] when a substitute is needed but none is left.
    pub fn check(&mut self, proposed: &str) -> Result<String, ChainIdError> {
        let (candidate, remapped) = match self.remap.get(proposed) {
            Some(target) => (target.clone(), true),
            None => (proposed.to_string(), false),
        };

        let collides_with_remap = !remapped && self.is_remap_target(&candidate);
        if collides_with_remap
            || self.reserved_unused.contains(&candidate)
            || self.used.contains(&candidate)
        {
            let substitute = self.next_unused_chain_id()?;
            debug!(
                "Chain '{}' cannot keep identifier '{}'; substituted '{}'.",
                proposed, candidate, substitute
            );
            return Ok(substitute);
        }

        self.unused.retain(|id| id != &candidate);
        self.used.insert(candidate.clone());
        trace!("Chain '{}' granted identifier '{}'.", proposed, candidate);
        Ok(candidate)
    }

    pub fn next_unused_chain_id(&mut self) -> Result<String, ChainIdError> {
        let id = self.unused.pop_front().ok_or(ChainIdError::Exhausted {
            format: self.format,
            requested: 1,
            available: 0,
        })?;
        self.used.insert(id.clone());
        Ok(id)
    }

    pub fn next_reserved_chain_id(&mut self, key: &str) -> Result<String, ChainIdError> {
        let reserves = self
            .transform_reserves
            .get(key)
            .ok_or_else(|| ChainIdError::UnknownReserveKey(key.to_string()))?;
        let id = reserves
            .iter()
            .find(|id| self.reserved_unused.contains(id))
            .cloned()
            .ok_or_else(|| ChainIdError::ReservesExhausted(key.to_string()))?;
        self.reserved_unused.retain(|r| r != &id);
        self.used.insert(id.clone());
        Ok(id)
    }

    /// Returns a chain identifier to the pool it was drawn from.
    pub fn unregister_chain(&mut self, chain_id: &str) {
        if !self.used.remove(chain_id) {
            return;
        }
        if self.is_reserved(chain_id) {
            if !self.reserved_unused.iter().any(|id| id == chain_id) {
                self.reserved_unused.push(chain_id.to_string());
            }
            return;
        }
        let rank = self.alphabet_rank.get(chain_id).copied().unwrap_or(usize::MAX);
        let position = self
            .unused
            .iter()
            .position(|id| self.alphabet_rank.get(id).copied().unwrap_or(usize::MAX) > rank)
            .unwrap_or(self.unused.len());
        self.unused.insert(position, chain_id.to_string());
    }

    /// Moves identifiers already present in the input to the back of the pool.
    pub fn sandbag(&mut self, initial_chain_ids: &[String]) {
        for chain_id in initial_chain_ids {
            if self.is_reserved(chain_id) {
                continue;
            }
            if let Some(position) = self.unused.iter().position(|id| id == chain_id) {
                if let Some(id) = self.unused.remove(position) {
                    self.unused.push_back(id);
                }
            }
        }
    }

    fn active_list<'a>(chain_ids: &'a [String], active_chains: Option<&'a [String]>) -> &'a [String] {
        active_chains.unwrap_or(chain_ids)
    }
}

impl ChainIdAllocator for ChainIdManager {
    fn thru_map(
        &mut self,
        chain_ids: &[String],
        active_chains: Option<&[String]>,
    ) -> BTreeMap<String, String> {
        Self::active_list(chain_ids, active_chains)
            .iter()
            .map(|id| (id.clone(), id.clone()))
            .collect()
    }

    fn generate_next_map(
        &mut self,
        chain_ids: &[String],
        active_chains: Option<&[String]>,
    ) -> Result<BTreeMap<String, String>, ChainIdError> {
        let active = Self::active_list(chain_ids, active_chains);
        let general_needed = active
            .iter()
            .filter(|id| !self.transform_reserves.contains_key(*id))
            .count();
        if general_needed > self.unused.len() {
            return Err(ChainIdError::Exhausted {
                format: self.format,
                requested: general_needed,
                available: self.unused.len(),
            });
        }

        let mut map = BTreeMap::new();
        for chain_id in active {
            let target = if self.transform_reserves.contains_key(chain_id) {
                self.next_reserved_chain_id(chain_id)?
            } else {
                self.next_unused_chain_id()?
            };
            map.insert(chain_id.clone(), target);
        }
        debug!("Generated chain map {:?}", map);
        Ok(map)
    }
}
