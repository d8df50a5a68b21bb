use super::chainid::{ChainIdAllocator, ChainIdError};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::collections::BTreeMap;
use tracing::debug;

/// One symmetry operator as read from a header: a 3x4 `[R | t]` matrix and the
/// chains it acts on.
#[derive(Debug, Clone, PartialEq)]
pub struct OperatorRecord {
    pub id: String,
    pub chain_ids: Vec<String>,
    pub matrix: [[f64; 4]; 3],
}

impl OperatorRecord {
    pub fn rotation(&self) -> Matrix3<f64> {
        let m = &self.matrix;
        Matrix3::new(
            m[0][0], m[0][1], m[0][2], //
            m[1][0], m[1][1], m[1][2], //
            m[2][0], m[2][1], m[2][2],
        )
    }

    pub fn translation(&self) -> Vector3<f64> {
        Vector3::new(self.matrix[0][3], self.matrix[1][3], self.matrix[2][3])
    }
}

/// A biological assembly as read from a header, before any chain allocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssemblyRecord {
    pub name: String,
    pub operators: Vec<OperatorRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub index: usize,
    pub tmat: Matrix4<f64>,
    pub applies_chain_ids: Vec<String>,
    chain_id_map: BTreeMap<String, String>,
}

impl Transform {
    /// The as-deposited operator; applies to every chain.
    pub fn identity() -> Self {
        Self {
            index: 0,
            tmat: Matrix4::identity(),
            applies_chain_ids: Vec::new(),
            chain_id_map: BTreeMap::new(),
        }
    }

    pub fn from_parts(
        rotation: &Matrix3<f64>,
        translation: &Vector3<f64>,
        applies_chain_ids: Vec<String>,
        index: usize,
    ) -> Self {
        let mut tmat = Matrix4::identity();
        tmat.fixed_view_mut::<3, 3>(0, 0).copy_from(rotation);
        tmat.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Self {
            index,
            tmat,
            applies_chain_ids,
            chain_id_map: BTreeMap::new(),
        }
    }

    pub fn from_operator(record: &OperatorRecord, index: usize) -> Self {
        Self::from_parts(
            &record.rotation(),
            &record.translation(),
            record.chain_ids.clone(),
            index,
        )
    }

    /// Exact comparison with the 4x4 identity.
    pub fn is_identity(&self) -> bool {
        self.tmat == Matrix4::identity()
    }

    pub fn chain_id_map(&self) -> &BTreeMap<String, String> {
        &self.chain_id_map
    }

    pub fn is_activated(&self) -> bool {
        !self.chain_id_map.is_empty()
    }

    pub fn apply(&self, point: &Point3<f64>) -> Point3<f64> {
        self.tmat.transform_point(point)
    }

    /// Chains of the asymmetric unit this operator acts on, daughters included.
    pub fn active_chains(&self, au_chain_ids: &[String], daughters: &BTreeMap<String, Vec<String>>) -> Vec<String> {
        if self.applies_chain_ids.is_empty() {
            return au_chain_ids.to_vec();
        }
        let mut wanted: Vec<&String> = self.applies_chain_ids.iter().collect();
        for parent in &self.applies_chain_ids {
            if let Some(children) = daughters.get(parent) {
                wanted.extend(children.iter());
            }
        }
        au_chain_ids
            .iter()
            .filter(|id| wanted.contains(id))
            .cloned()
            .collect()
    }

    /// Populates the old-to-new chain map through `allocator`. The identity
    /// keeps deposited identifiers; any other operator gets fresh ones.
    pub fn generate_chain_id_map(
        &mut self,
        au_chain_ids: &[String],
        daughters: &BTreeMap<String, Vec<String>>,
        allocator: &mut dyn ChainIdAllocator,
    ) -> Result<(), ChainIdError> {
        let active = self.active_chains(au_chain_ids, daughters);
        let active = if self.applies_chain_ids.is_empty() {
            None
        } else {
            Some(active.as_slice())
        };
        self.chain_id_map = if self.is_identity() {
            allocator.thru_map(au_chain_ids, active)
        } else {
            allocator.generate_next_map(au_chain_ids, active)?
        };
        debug!("Transform {} chain map: {:?}", self.index, self.chain_id_map);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BioAssemb {
    pub name: String,
    pub index: usize,
    pub transforms: Vec<Transform>,
    activated: bool,
}

impl BioAssemb {
    /// The deposited asymmetric unit as a one-operator assembly.
    pub fn asymmetric_unit(index: usize) -> Self {
        Self {
            name: "A.U.".to_string(),
            index,
            transforms: vec![Transform::identity()],
            activated: false,
        }
    }

    pub fn from_record(record: &AssemblyRecord, index: usize) -> Self {
        Self {
            name: record.name.clone(),
            index,
            transforms: record
                .operators
                .iter()
                .enumerate()
                .map(|(i, op)| Transform::from_operator(op, i))
                .collect(),
            activated: false,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    /// Allocates chain maps for every transform, in stored order. Calling this
    /// on an already activated assembly does nothing.
    pub fn activate(
        &mut self,
        au_chain_ids: &[String],
        daughters: &BTreeMap<String, Vec<String>>,
        allocator: &mut dyn ChainIdAllocator,
    ) -> Result<(), ChainIdError> {
        if self.activated {
            return Ok(());
        }
        for transform in &mut self.transforms {
            transform.generate_chain_id_map(au_chain_ids, daughters, allocator)?;
        }
        self.activated = true;
        Ok(())
    }
}
