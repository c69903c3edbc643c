//! Presentation linkbase: hierarchical ordering of concepts with depth and
//! leaf metadata per extended link role.

use crate::constants::DEFAULT_LINK_ROLE;
use crate::linkbase::Linkbase;
use crate::taxonomy::{ConceptId, Dts};
use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};

/// One concept's place in the presentation hierarchy of a link role.
#[derive(Debug, Clone)]
pub struct PresentationElement {
    pub concept: ConceptId,
    pub extended_link_role: CompactString,
    /// Direct successors, ordered by arc `order`.
    pub successors: Vec<ConceptId>,
    /// At most one parent per link role; with several sources the first
    /// one in base-set order wins.
    pub parent: Option<ConceptId>,
    /// Roots sit at level 1.
    pub level: u32,
    /// Number of leaves beneath this element.
    pub num_successors_at_deepest_level: usize,
    /// Left-to-right index over non-abstract and leaf elements, assigned
    /// during the depth-first traversal of the role.
    pub position_deepest_level: Option<usize>,
}

/// Presentation linkbase: the generic store plus the derived per-role
/// element lists, computed once after all arcs are loaded.
#[derive(Debug, Default)]
pub struct PresentationLinkbase {
    base: Linkbase,
    by_role: IndexMap<CompactString, Vec<PresentationElement>>,
}

impl PresentationLinkbase {
    /// Builds the derived hierarchy for every extended link role.
    pub fn build(base: Linkbase, dts: &Dts) -> Self {
        let roles: Vec<CompactString> = base.extended_link_roles().map(CompactString::from).collect();
        let mut by_role = IndexMap::new();

        for role in roles {
            let mut elements = Vec::new();
            for element_id in base.elements_in_base_set(&role) {
                let Some(concept) = base.element(element_id).concept() else {
                    continue;
                };
                let successors: Vec<ConceptId> = base
                    .target_elements(concept, &role)
                    .into_iter()
                    .filter_map(|id| base.element(id).concept())
                    .collect();
                let parent = base
                    .source_elements(concept, &role)
                    .into_iter()
                    .find_map(|id| base.element(id).concept());
                let num_successors_at_deepest_level = if successors.is_empty() {
                    0
                } else {
                    count_leaves(&base, concept, &role, &mut IndexSet::new())
                };
                elements.push(PresentationElement {
                    concept,
                    extended_link_role: role.clone(),
                    successors,
                    parent,
                    level: determine_level(&base, concept, &role),
                    num_successors_at_deepest_level,
                    position_deepest_level: None,
                });
            }
            assign_positions(dts, &mut elements);
            by_role.insert(role, elements);
        }

        Self { base, by_role }
    }

    pub fn base(&self) -> &Linkbase {
        &self.base
    }

    /// The element of a concept within a link role (default role when
    /// none is given).
    pub fn element(&self, concept: ConceptId, role: Option<&str>) -> Option<&PresentationElement> {
        let role = role.unwrap_or(DEFAULT_LINK_ROLE);
        self.by_role
            .get(role)?
            .iter()
            .find(|e| e.concept == concept)
    }

    /// Elements with no parent in a link role.
    pub fn roots(&self, role: Option<&str>) -> Vec<&PresentationElement> {
        let role = role.unwrap_or(DEFAULT_LINK_ROLE);
        self.by_role
            .get(role)
            .map(|elements| elements.iter().filter(|e| e.parent.is_none()).collect())
            .unwrap_or_default()
    }

    /// Depth-first, order-respecting traversal of a link role, optionally
    /// filtered to the concepts of one taxonomy schema.
    pub fn elements_for(
        &self,
        dts: &Dts,
        taxonomy_name: Option<&str>,
        role: Option<&str>,
    ) -> Vec<&PresentationElement> {
        let role = role.unwrap_or(DEFAULT_LINK_ROLE);
        let mut result = Vec::new();
        let mut visited = IndexSet::new();
        for root in self.roots(Some(role)) {
            self.collect(root, Some(role), &mut result, &mut visited);
        }
        match taxonomy_name {
            Some(name) => result
                .into_iter()
                .filter(|e| dts.schema(dts.concept(e.concept).schema).name == name)
                .collect(),
            None => result,
        }
    }

    /// The presentation subtree rooted at a concept, in traversal order.
    pub fn subtree_for(&self, concept: ConceptId, role: Option<&str>) -> Vec<&PresentationElement> {
        let mut result = Vec::new();
        let mut visited = IndexSet::new();
        if let Some(root) = self.element(concept, role) {
            self.collect(root, role, &mut result, &mut visited);
        }
        result
    }

    fn collect<'a>(
        &'a self,
        element: &'a PresentationElement,
        role: Option<&str>,
        result: &mut Vec<&'a PresentationElement>,
        visited: &mut IndexSet<ConceptId>,
    ) {
        if !visited.insert(element.concept) {
            return;
        }
        result.push(element);
        for successor in &element.successors {
            if let Some(next) = self.element(*successor, role) {
                self.collect(next, role, result, visited);
            }
        }
    }
}

/// Depth of a concept: one more than its parent chain length.
fn determine_level(base: &Linkbase, concept: ConceptId, role: &str) -> u32 {
    let mut level = 1;
    let mut visited = IndexSet::new();
    let mut current = concept;
    while visited.insert(current) {
        let parent = base
            .source_elements(current, role)
            .into_iter()
            .find_map(|id| base.element(id).concept());
        match parent {
            Some(parent) => {
                level += 1;
                current = parent;
            }
            None => break,
        }
    }
    level
}

/// Number of leaves reachable beneath a concept.
fn count_leaves(
    base: &Linkbase,
    concept: ConceptId,
    role: &str,
    visited: &mut IndexSet<ConceptId>,
) -> usize {
    if !visited.insert(concept) {
        return 0;
    }
    let successors: Vec<ConceptId> = base
        .target_elements(concept, role)
        .into_iter()
        .filter_map(|id| base.element(id).concept())
        .collect();
    if successors.is_empty() {
        return 1;
    }
    successors
        .iter()
        .map(|s| count_leaves(base, *s, role, visited))
        .sum()
}

/// Assigns the left-to-right deepest-level positions by walking the role
/// from its roots in document order.
fn assign_positions(dts: &Dts, elements: &mut [PresentationElement]) {
    let order: Vec<ConceptId> = {
        let roots: Vec<ConceptId> = elements
            .iter()
            .filter(|e| e.parent.is_none())
            .map(|e| e.concept)
            .collect();
        let mut order = Vec::new();
        let mut visited = IndexSet::new();
        for root in roots {
            walk(elements, root, &mut order, &mut visited);
        }
        order
    };

    let mut position = 0;
    for concept in order {
        let Some(element) = elements.iter_mut().find(|e| e.concept == concept) else {
            continue;
        };
        if element.successors.is_empty() || !dts.concept(element.concept).is_abstract {
            element.position_deepest_level = Some(position);
            position += 1;
        }
    }
}

fn walk(
    elements: &[PresentationElement],
    concept: ConceptId,
    order: &mut Vec<ConceptId>,
    visited: &mut IndexSet<ConceptId>,
) {
    if !visited.insert(concept) {
        return;
    }
    order.push(concept);
    if let Some(element) = elements.iter().find(|e| e.concept == concept) {
        for successor in element.successors.clone() {
            walk(elements, successor, order, visited);
        }
    }
}
