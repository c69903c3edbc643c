//! Definition linkbase: hypercube and dimension wiring, and the check
//! whether a dimensional coordinate set is allowed for a primary item.

use crate::constants::{
    ARCROLE_ALL, ARCROLE_DOMAIN_MEMBER, ARCROLE_HYPERCUBE_DIMENSION, ARCROLE_NOT_ALL,
    SUBST_GROUP_DIMENSION_ITEM, SUBST_GROUP_HYPERCUBE_ITEM,
};
use crate::dimensions::{Dimension, Hypercube, MultipleDimensionType};
use crate::linkbase::Linkbase;
use crate::taxonomy::{ConceptId, Dts};
use crate::xlink::ContextElementKind;
use crate::{Error, Result};
use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

#[derive(Debug, Default)]
pub struct DefinitionLinkbase {
    base: Linkbase,
    hypercubes: Vec<Hypercube>,
    dimension_concepts: IndexSet<ConceptId>,
}

impl DefinitionLinkbase {
    /// Builds the dimensional structures: one hypercube per hypercube-item
    /// concept, one dimension per `hypercube-dimension` arc, with the
    /// domain-member network resolved for explicit dimensions.
    pub fn build(base: Linkbase, dts: &Dts) -> Result<Self> {
        let mut dimension_concepts: IndexSet<ConceptId> = dts
            .concepts_by_substitution_group(SUBST_GROUP_DIMENSION_ITEM)
            .into_iter()
            .collect();
        let mut hypercubes: Vec<Hypercube> = dts
            .concepts_by_substitution_group(SUBST_GROUP_HYPERCUBE_ITEM)
            .into_iter()
            .map(|c| Hypercube::new(Some(c)))
            .collect();

        let roles: Vec<CompactString> = base.extended_link_roles().map(CompactString::from).collect();
        for role in &roles {
            for arc in base.arc_base_set(ARCROLE_HYPERCUBE_DIMENSION, role) {
                let cube_concept = base.element(arc.from).concept().ok_or_else(|| {
                    Error::TaxonomyCreation(
                        "hypercube-dimension arc source is not a concept locator".into(),
                    )
                })?;
                if !dts.concept(cube_concept).is_hypercube_item() {
                    return Err(Error::TaxonomyCreation(format!(
                        "wrong substitution group on hypercube item {}",
                        dts.concept(cube_concept).id
                    )));
                }
                let dimension_concept = base.element(arc.to).concept().ok_or_else(|| {
                    Error::TaxonomyCreation(
                        "hypercube-dimension arc target is not a concept locator".into(),
                    )
                })?;
                if !dts.concept(dimension_concept).is_dimension_item() {
                    return Err(Error::TaxonomyCreation(format!(
                        "wrong substitution group on dimension item {}",
                        dts.concept(dimension_concept).id
                    )));
                }
                dimension_concepts.insert(dimension_concept);

                let mut dimension = Dimension::new(dimension_concept);
                if dts.concept(dimension_concept).is_typed_dimension() {
                    dimension.typed = true;
                } else {
                    // The member network may live in another link role when
                    // the arc carries xbrldt:targetRole. All arc roles take
                    // part (dimension-domain as well as domain-member).
                    let network_role = arc.target_role.as_deref().unwrap_or(role);
                    let network =
                        base.build_target_network(dimension_concept, None, network_role);
                    if network.is_empty() {
                        return Err(Error::TaxonomyCreation(format!(
                            "no domain member network for explicit dimension {}",
                            dts.concept(dimension_concept).id
                        )));
                    }
                    for element_id in network {
                        let element = base.element(element_id);
                        if let (Some(member), Some(locator)) =
                            (element.concept(), element.as_locator())
                        {
                            let slot = dimension.members.entry(member).or_insert(false);
                            *slot |= locator.usable;
                        }
                    }
                }

                match hypercubes
                    .iter_mut()
                    .find(|h| h.concept == Some(cube_concept))
                {
                    Some(cube) => cube.add_dimension(dimension),
                    None => {
                        let mut cube = Hypercube::new(Some(cube_concept));
                        cube.add_dimension(dimension);
                        hypercubes.push(cube);
                    }
                }
            }
        }

        debug!(
            hypercubes = hypercubes.len(),
            dimensions = dimension_concepts.len(),
            "definition linkbase built"
        );
        Ok(Self {
            base,
            hypercubes,
            dimension_concepts,
        })
    }

    pub fn base(&self) -> &Linkbase {
        &self.base
    }

    pub fn hypercubes(&self) -> &[Hypercube] {
        &self.hypercubes
    }

    pub fn hypercube(&self, concept: ConceptId) -> Option<&Hypercube> {
        self.hypercubes.iter().find(|h| h.concept == Some(concept))
    }

    /// All dimension concepts of this linkbase.
    pub fn dimension_concepts(&self) -> &IndexSet<ConceptId> {
        &self.dimension_concepts
    }

    /// Whether a primary item may be reported for the given dimensional
    /// coordinates in the given context slot.
    ///
    /// Link roles are checked one by one: within a role, every effective
    /// `all`/`notAll` arc whose context element matches and whose source
    /// domain-member network contains the primary item contributes its
    /// hypercube. A matching `notAll` cube rejects the role outright; the
    /// union of the `all` cubes must then contain the coordinates exactly.
    pub fn dimension_allowed(
        &self,
        dts: &Dts,
        primary: ConceptId,
        mdt: &MultipleDimensionType,
        context_element: ContextElementKind,
    ) -> bool {
        let roles: Vec<CompactString> = self
            .base
            .extended_link_roles()
            .map(CompactString::from)
            .collect();

        'roles: for role in &roles {
            let arcs = self
                .base
                .arc_base_set_multi(&[ARCROLE_ALL, ARCROLE_NOT_ALL], role);

            let mut cube_arcroles: IndexMap<ConceptId, CompactString> = IndexMap::new();
            for arc in arcs {
                if arc.context_element != context_element {
                    continue;
                }
                let Some(source_concept) = self.base.element(arc.from).concept() else {
                    continue;
                };
                let in_network = source_concept == primary
                    || self
                        .base
                        .build_target_network(source_concept, Some(ARCROLE_DOMAIN_MEMBER), role)
                        .into_iter()
                        .any(|id| self.base.element(id).concept() == Some(primary));
                if !in_network {
                    continue;
                }
                if let Some(cube_concept) = self.base.element(arc.to).concept() {
                    cube_arcroles.insert(cube_concept, arc.arcrole.clone());
                }
            }

            let mut relevant = Hypercube::new(None);
            for (cube_concept, arcrole) in &cube_arcroles {
                let Some(cube) = self.hypercube(*cube_concept) else {
                    continue;
                };
                if arcrole == ARCROLE_ALL {
                    relevant.absorb(cube);
                } else if arcrole == ARCROLE_NOT_ALL && cube.has_dimension_combination(mdt) {
                    continue 'roles;
                }
            }

            if relevant.has_dimension_combination(mdt) {
                return true;
            }
        }
        false
    }

    /// The explicit dimension a domain member belongs to, found by
    /// scanning the hypercubes.
    pub fn dimension_for_domain_member(&self, member: ConceptId) -> Option<ConceptId> {
        for cube in &self.hypercubes {
            for dimension in cube.dimensions() {
                if !dimension.typed && dimension.contains_member(member, false) {
                    return Some(dimension.concept);
                }
            }
        }
        None
    }

    /// Whether a concept is a usable domain member of a dimension inside
    /// any hypercube bound by an `all` arc in any link role.
    pub fn is_usable_domain_member(&self, dimension: ConceptId, member: ConceptId) -> bool {
        let roles: Vec<CompactString> = self
            .base
            .extended_link_roles()
            .map(CompactString::from)
            .collect();
        for cube in &self.hypercubes {
            let usable = cube
                .dimension(dimension)
                .is_some_and(|d| d.typed || d.contains_member(member, true));
            if !usable {
                continue;
            }
            for role in &roles {
                for arc in self.base.arc_base_set(ARCROLE_ALL, role) {
                    if self.base.element(arc.to).concept() == cube.concept {
                        return true;
                    }
                }
            }
        }
        false
    }
}
