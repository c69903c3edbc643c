//! Dimensional model of Dimensions 1.0: dimensions, hypercubes and the
//! dimension/domain-member coordinates of a fact.

use crate::taxonomy::ConceptId;
use compact_str::CompactString;
use indexmap::IndexMap;
use std::hash::{Hash, Hasher};

/// The value a dimension takes: a domain-member concept for explicit
/// dimensions, or the verbatim first child element for typed dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberValue {
    Explicit(ConceptId),
    Typed(String),
}

/// One dimension with one specific member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SingleDimensionType {
    pub dimension: ConceptId,
    pub member: MemberValue,
}

impl SingleDimensionType {
    pub fn new(dimension: ConceptId, member: MemberValue) -> Self {
        Self { dimension, member }
    }

    pub fn explicit(dimension: ConceptId, member: ConceptId) -> Self {
        Self::new(dimension, MemberValue::Explicit(member))
    }
}

/// One or more dimension/member combinations: a current pair plus an
/// unordered set of previous pairs.
#[derive(Debug, Clone)]
pub struct MultipleDimensionType {
    current: SingleDimensionType,
    previous: Vec<SingleDimensionType>,
}

impl MultipleDimensionType {
    pub fn new(current: SingleDimensionType) -> Self {
        Self {
            current,
            previous: Vec::new(),
        }
    }

    pub fn explicit(dimension: ConceptId, member: ConceptId) -> Self {
        Self::new(SingleDimensionType::explicit(dimension, member))
    }

    pub fn current(&self) -> &SingleDimensionType {
        &self.current
    }

    pub fn previous(&self) -> &[SingleDimensionType] {
        &self.previous
    }

    /// Number of dimension/member combinations carried.
    pub fn len(&self) -> usize {
        1 + self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Adds one combination to the previous set.
    pub fn add_predecessor(&mut self, sdt: SingleDimensionType) {
        if !self.previous.contains(&sdt) {
            self.previous.push(sdt);
        }
    }

    /// Adds every combination of another coordinate set (current and
    /// previous) to the previous set of this one.
    pub fn add_predecessors_of(&mut self, other: &MultipleDimensionType) {
        self.add_predecessor(other.current.clone());
        for sdt in &other.previous {
            self.add_predecessor(sdt.clone());
        }
    }

    /// Pushes the current combination into the previous set and makes the
    /// given one current.
    pub fn shuffle(&mut self, sdt: SingleDimensionType) {
        let old = std::mem::replace(&mut self.current, sdt);
        self.add_predecessor(old);
    }

    /// Makes the combination of the given dimension current, pushing the
    /// old current into the previous set. Returns whether the dimension was
    /// found.
    pub fn activate(&mut self, dimension: ConceptId) -> bool {
        if self.current.dimension == dimension {
            return true;
        }
        match self.previous.iter().position(|s| s.dimension == dimension) {
            Some(idx) => {
                let activated = self.previous.remove(idx);
                let old = std::mem::replace(&mut self.current, activated);
                self.add_predecessor(old);
                true
            }
            None => false,
        }
    }

    /// Replaces the member of an already present dimension, leaving its
    /// position (current or previous) unchanged. Unknown dimensions are
    /// ignored.
    pub fn override_member(&mut self, sdt: SingleDimensionType) {
        if self.current.dimension == sdt.dimension {
            self.current = sdt;
            return;
        }
        if let Some(slot) = self
            .previous
            .iter_mut()
            .find(|s| s.dimension == sdt.dimension)
        {
            *slot = sdt;
        }
    }

    pub fn contains_dimension(&self, dimension: ConceptId) -> bool {
        self.single_dimension_type(dimension).is_some()
    }

    pub fn single_dimension_type(&self, dimension: ConceptId) -> Option<&SingleDimensionType> {
        if self.current.dimension == dimension {
            return Some(&self.current);
        }
        self.previous.iter().find(|s| s.dimension == dimension)
    }

    pub fn domain_member(&self, dimension: ConceptId) -> Option<&MemberValue> {
        self.single_dimension_type(dimension).map(|s| &s.member)
    }

    /// Every dimension, current first.
    pub fn dimensions(&self) -> Vec<ConceptId> {
        let mut out = vec![self.current.dimension];
        out.extend(self.previous.iter().map(|s| s.dimension));
        out
    }

    /// Every dimension/member combination, current first.
    pub fn all_dimension_domain_map(&self) -> IndexMap<ConceptId, &MemberValue> {
        let mut map = IndexMap::new();
        map.insert(self.current.dimension, &self.current.member);
        for sdt in &self.previous {
            map.insert(sdt.dimension, &sdt.member);
        }
        map
    }
}

impl PartialEq for MultipleDimensionType {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
            && self.previous.len() == other.previous.len()
            && self.previous.iter().all(|s| other.previous.contains(s))
    }
}

impl Eq for MultipleDimensionType {}

impl Hash for MultipleDimensionType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.current.hash(state);
        // Previous-set equality ignores order, so combine element hashes
        // with a commutative operation.
        let mut combined: u64 = 0;
        for sdt in &self.previous {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            sdt.hash(&mut hasher);
            combined = combined.wrapping_add(hasher.finish());
        }
        combined.hash(state);
    }
}

/// An axis of a hypercube: explicit dimensions carry their domain-member
/// network, typed dimensions match any value.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub concept: ConceptId,
    pub typed: bool,
    /// Domain member concept -> usable flag of the carrying locator.
    pub members: IndexMap<ConceptId, bool>,
}

impl Dimension {
    pub fn new(concept: ConceptId) -> Self {
        Self {
            concept,
            typed: false,
            members: IndexMap::new(),
        }
    }

    pub fn contains_member(&self, member: ConceptId, require_usable: bool) -> bool {
        match self.members.get(&member) {
            Some(usable) => !require_usable || *usable,
            None => false,
        }
    }

    fn merge(&mut self, other: &Dimension) {
        self.typed |= other.typed;
        for (member, usable) in &other.members {
            let slot = self.members.entry(*member).or_insert(false);
            *slot |= *usable;
        }
    }
}

/// A hypercube: the dimensions (with allowed members) a primary item may
/// be reported against.
#[derive(Debug, Clone, Default)]
pub struct Hypercube {
    pub concept: Option<ConceptId>,
    pub extended_link_role: Option<CompactString>,
    dimensions: Vec<Dimension>,
}

impl Hypercube {
    pub fn new(concept: Option<ConceptId>) -> Self {
        Self {
            concept,
            extended_link_role: None,
            dimensions: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Attaches a dimension, merging members when the dimension is already
    /// part of the cube.
    pub fn add_dimension(&mut self, dimension: Dimension) {
        match self
            .dimensions
            .iter_mut()
            .find(|d| d.concept == dimension.concept)
        {
            Some(existing) => existing.merge(&dimension),
            None => self.dimensions.push(dimension),
        }
    }

    pub fn dimension(&self, concept: ConceptId) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.concept == concept)
    }

    pub fn contains_dimension(&self, concept: ConceptId) -> bool {
        self.dimension(concept).is_some()
    }

    /// Domain members of one dimension of the cube.
    pub fn dimension_domain(&self, concept: ConceptId) -> Option<&IndexMap<ConceptId, bool>> {
        self.dimension(concept).map(|d| &d.members)
    }

    /// Whether a dimension/member combination is part of the cube. Typed
    /// dimensions accept any value; the schema-type check of the typed
    /// payload is not performed here.
    pub fn contains_dimension_domain(
        &self,
        dimension: ConceptId,
        member: &MemberValue,
        require_usable: bool,
    ) -> bool {
        let Some(dim) = self.dimension(dimension) else {
            return false;
        };
        if dim.typed {
            return true;
        }
        match member {
            MemberValue::Explicit(concept) => dim.contains_member(*concept, require_usable),
            MemberValue::Typed(_) => false,
        }
    }

    /// Whether this cube matches the coordinate set exactly: same number
    /// of dimensions, and every combination present as a usable member.
    pub fn has_dimension_combination(&self, mdt: &MultipleDimensionType) -> bool {
        let map = mdt.all_dimension_domain_map();
        if map.len() != self.dimensions.len() {
            return false;
        }
        map.iter()
            .all(|(dimension, member)| self.contains_dimension_domain(*dimension, member, true))
    }

    /// Unions another cube into this one: new dimensions are cloned in,
    /// shared dimensions merge their domain-member sets.
    pub fn absorb(&mut self, other: &Hypercube) {
        for dimension in &other.dimensions {
            self.add_dimension(dimension.clone());
        }
    }
}

impl PartialEq for Hypercube {
    fn eq(&self, other: &Self) -> bool {
        self.concept == other.concept
            && self.extended_link_role == other.extended_link_role
            && self.dimensions.len() == other.dimensions.len()
            && self
                .dimensions
                .iter()
                .all(|d| other.dimension(d.concept).map(|o| o == d).unwrap_or(false))
    }
}

impl Eq for Hypercube {}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> ConceptId {
        ConceptId(n)
    }

    #[test]
    fn equality_ignores_previous_order() {
        let mut left = MultipleDimensionType::explicit(id(1), id(10));
        left.add_predecessor(SingleDimensionType::explicit(id(2), id(20)));
        left.add_predecessor(SingleDimensionType::explicit(id(3), id(30)));

        let mut right = MultipleDimensionType::explicit(id(1), id(10));
        right.add_predecessor(SingleDimensionType::explicit(id(3), id(30)));
        right.add_predecessor(SingleDimensionType::explicit(id(2), id(20)));

        assert_eq!(left, right);

        let mut hasher_l = std::collections::hash_map::DefaultHasher::new();
        let mut hasher_r = std::collections::hash_map::DefaultHasher::new();
        left.hash(&mut hasher_l);
        right.hash(&mut hasher_r);
        assert_eq!(hasher_l.finish(), hasher_r.finish());
    }

    #[test]
    fn differing_current_breaks_equality() {
        let left = MultipleDimensionType::explicit(id(1), id(10));
        let right = MultipleDimensionType::explicit(id(1), id(11));
        assert_ne!(left, right);
    }

    #[test]
    fn shuffle_moves_current_to_previous() {
        let mut mdt = MultipleDimensionType::explicit(id(1), id(10));
        mdt.shuffle(SingleDimensionType::explicit(id(2), id(20)));

        assert_eq!(mdt.current().dimension, id(2));
        assert_eq!(mdt.previous().len(), 1);
        assert_eq!(mdt.previous()[0].dimension, id(1));
    }

    #[test]
    fn activate_swaps_with_previous() {
        let mut mdt = MultipleDimensionType::explicit(id(1), id(10));
        mdt.add_predecessor(SingleDimensionType::explicit(id(2), id(20)));

        assert!(mdt.activate(id(2)));
        assert_eq!(mdt.current().dimension, id(2));
        assert!(mdt.previous().iter().any(|s| s.dimension == id(1)));
        assert!(!mdt.activate(id(9)));
    }

    #[test]
    fn override_member_keeps_position() {
        let mut mdt = MultipleDimensionType::explicit(id(1), id(10));
        mdt.add_predecessor(SingleDimensionType::explicit(id(2), id(20)));

        mdt.override_member(SingleDimensionType::explicit(id(2), id(21)));
        assert_eq!(
            mdt.domain_member(id(2)),
            Some(&MemberValue::Explicit(id(21)))
        );
        assert_eq!(mdt.current().dimension, id(1));
    }

    #[test]
    fn cube_union_merges_members() {
        let mut left = Hypercube::new(Some(id(100)));
        let mut dim = Dimension::new(id(1));
        dim.members.insert(id(10), true);
        left.add_dimension(dim);

        let mut right = Hypercube::new(Some(id(101)));
        let mut dim = Dimension::new(id(1));
        dim.members.insert(id(11), true);
        right.add_dimension(dim);
        let mut other_dim = Dimension::new(id(2));
        other_dim.members.insert(id(20), false);
        right.add_dimension(other_dim);

        left.absorb(&right);
        assert!(left.contains_dimension_domain(id(1), &MemberValue::Explicit(id(10)), true));
        assert!(left.contains_dimension_domain(id(1), &MemberValue::Explicit(id(11)), true));
        assert!(left.contains_dimension_domain(id(2), &MemberValue::Explicit(id(20)), false));
        // non-usable member is rejected when usability is required
        assert!(!left.contains_dimension_domain(id(2), &MemberValue::Explicit(id(20)), true));
    }

    #[test]
    fn dimension_combination_requires_exact_dimension_count() {
        let mut cube = Hypercube::new(Some(id(100)));
        let mut dim = Dimension::new(id(1));
        dim.members.insert(id(10), true);
        cube.add_dimension(dim);

        let matching = MultipleDimensionType::explicit(id(1), id(10));
        assert!(cube.has_dimension_combination(&matching));

        let mut excess = MultipleDimensionType::explicit(id(1), id(10));
        excess.add_predecessor(SingleDimensionType::explicit(id(2), id(20)));
        assert!(!cube.has_dimension_combination(&excess));
    }

    #[test]
    fn typed_dimension_accepts_any_member() {
        let mut cube = Hypercube::new(Some(id(100)));
        let mut dim = Dimension::new(id(1));
        dim.typed = true;
        cube.add_dimension(dim);

        let typed = MultipleDimensionType::new(SingleDimensionType::new(
            id(1),
            MemberValue::Typed("<t:zip>55</t:zip>".into()),
        ));
        assert!(cube.has_dimension_combination(&typed));
    }
}
