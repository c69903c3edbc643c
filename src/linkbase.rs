//! Generic extended-link store with base-set resolution and network
//! traversal, plus the label and calculation linkbase specializations.

use crate::constants::{ARCROLE_CONCEPT_LABEL, ARCROLE_SUMMATION_ITEM};
use crate::taxonomy::ConceptId;
use crate::xlink::{Arc, ArcUse, ElementId, ExtendedLinkElement};
use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};

/// Ordered store of extended-link elements and arcs, indexed by extended
/// link role. Mutable while a DTS is under construction, read-only after.
#[derive(Debug, Default)]
pub struct Linkbase {
    elements: Vec<ExtendedLinkElement>,
    arcs: Vec<Arc>,
    roles: IndexSet<CompactString>,
}

impl Linkbase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_element(&mut self, element: ExtendedLinkElement) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    pub fn add_arc(&mut self, arc: Arc) {
        self.roles.insert(arc.extended_link_role.clone());
        self.arcs.push(arc);
    }

    pub fn element(&self, id: ElementId) -> &ExtendedLinkElement {
        &self.elements[id.0 as usize]
    }

    pub fn element_mut(&mut self, id: ElementId) -> &mut ExtendedLinkElement {
        &mut self.elements[id.0 as usize]
    }

    pub fn elements(&self) -> impl Iterator<Item = (ElementId, &ExtendedLinkElement)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementId(i as u32), e))
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty() && self.elements.is_empty()
    }

    /// Every extended link role that appears on at least one arc, in
    /// source-file order.
    pub fn extended_link_roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(|r| r.as_str())
    }

    /// Elements carrying a given `xlink:label` within one extended link
    /// role and source file. Arcs may fan out one-to-many, so this returns
    /// every match.
    pub fn elements_with_label(&self, label: &str, role: &str, source: &str) -> Vec<ElementId> {
        self.elements()
            .filter(|(_, e)| {
                e.label() == label && e.extended_link_role() == role && e.source() == source
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// A resource looked up by its `id` attribute.
    pub fn resource_by_id(&self, id: &str) -> Option<ElementId> {
        self.elements()
            .find(|(_, e)| {
                e.as_resource()
                    .is_some_and(|r| r.id.as_deref() == Some(id))
            })
            .map(|(id, _)| id)
    }

    /// Effective arcs of one extended link role, optionally filtered by arc
    /// role, with equivalent arcs collapsed by `(priority, use)`.
    ///
    /// Equivalent means same source, target, arc role and link role. The
    /// highest priority wins; a prohibiting winner removes the relationship
    /// entirely. Survivors keep insertion order.
    fn effective_arcs(&self, arcroles: Option<&[&str]>, role: &str) -> Vec<&Arc> {
        let mut best: IndexMap<(ElementId, ElementId, &str), (usize, &Arc)> = IndexMap::new();
        for (idx, arc) in self.arcs.iter().enumerate() {
            if arc.extended_link_role != role {
                continue;
            }
            if let Some(wanted) = arcroles {
                if !wanted.iter().any(|w| arc.arcrole == *w) {
                    continue;
                }
            }
            let key = (arc.from, arc.to, arc.arcrole.as_str());
            match best.get_mut(&key) {
                None => {
                    best.insert(key, (idx, arc));
                }
                Some(entry) => {
                    let (_, current) = *entry;
                    let wins = arc.priority > current.priority
                        || (arc.priority == current.priority
                            && arc.arc_use == ArcUse::Prohibited
                            && current.arc_use == ArcUse::Optional);
                    if wins {
                        *entry = (idx, arc);
                    }
                }
            }
        }
        let mut survivors: Vec<(usize, &Arc)> = best
            .into_values()
            .filter(|(_, arc)| arc.arc_use == ArcUse::Optional)
            .collect();
        survivors.sort_by_key(|(idx, _)| *idx);
        survivors.into_iter().map(|(_, arc)| arc).collect()
    }

    /// The base set for one arc role within an extended link role.
    pub fn arc_base_set(&self, arcrole: &str, role: &str) -> Vec<&Arc> {
        self.effective_arcs(Some(&[arcrole]), role)
    }

    /// Union base set over several arc roles.
    pub fn arc_base_set_multi(&self, arcroles: &[&str], role: &str) -> Vec<&Arc> {
        self.effective_arcs(Some(arcroles), role)
    }

    /// Elements participating in any effective arc of the role, sources
    /// before targets, deduplicated in arc order.
    pub fn elements_in_base_set(&self, role: &str) -> Vec<ElementId> {
        let mut seen = IndexSet::new();
        for arc in self.effective_arcs(None, role) {
            seen.insert(arc.from);
            seen.insert(arc.to);
        }
        seen.into_iter().collect()
    }

    /// Source elements of effective arcs whose target locator points at the
    /// given concept.
    pub fn source_elements(&self, concept: ConceptId, role: &str) -> Vec<ElementId> {
        self.effective_arcs(None, role)
            .into_iter()
            .filter(|arc| self.element(arc.to).concept() == Some(concept))
            .map(|arc| arc.from)
            .collect()
    }

    /// Target elements of effective arcs sourced at the given concept,
    /// ordered by arc `order`, then insertion order.
    pub fn target_elements(&self, concept: ConceptId, role: &str) -> Vec<ElementId> {
        let mut hits: Vec<&Arc> = self
            .effective_arcs(None, role)
            .into_iter()
            .filter(|arc| self.element(arc.from).concept() == Some(concept))
            .collect();
        hits.sort_by(|a, b| {
            a.order
                .partial_cmp(&b.order)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.into_iter().map(|arc| arc.to).collect()
    }

    /// Transitive closure of elements reachable from a concept inside one
    /// extended link role, optionally restricted to a single arc role.
    ///
    /// An arc carrying `xbrldt:targetRole` continues the traversal in that
    /// role. The start concept's own locators are not part of the result.
    /// Linkbases may be accidentally cyclic, so every (concept, role) pair
    /// is visited at most once.
    pub fn build_target_network(
        &self,
        concept: ConceptId,
        arcrole: Option<&str>,
        role: &str,
    ) -> IndexSet<ElementId> {
        let mut network = IndexSet::new();
        let mut visited: IndexSet<(ConceptId, CompactString)> = IndexSet::new();
        let mut frontier: Vec<(ConceptId, CompactString)> = vec![(concept, role.into())];

        while let Some((current, current_role)) = frontier.pop() {
            if !visited.insert((current, current_role.clone())) {
                continue;
            }
            let arcroles = arcrole.map(|a| vec![a]);
            for arc in self.effective_arcs(arcroles.as_deref(), &current_role) {
                if self.element(arc.from).concept() != Some(current) {
                    continue;
                }
                network.insert(arc.to);
                if let Some(next) = self.element(arc.to).concept() {
                    let next_role = arc
                        .target_role
                        .clone()
                        .unwrap_or_else(|| current_role.clone());
                    frontier.push((next, next_role));
                }
            }
        }
        network
    }
}

/// Label linkbase: resources indexed through `concept-label` arcs.
#[derive(Debug, Default)]
pub struct LabelLinkbase {
    base: Linkbase,
}

impl LabelLinkbase {
    pub fn new(base: Linkbase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Linkbase {
        &self.base
    }

    /// All label resources attached to a concept, across every link role.
    pub fn resources_for_concept(&self, concept: ConceptId) -> Vec<&crate::xlink::Resource> {
        let roles: Vec<CompactString> = self
            .base
            .extended_link_roles()
            .map(CompactString::from)
            .collect();
        let mut resources = Vec::new();
        for role in &roles {
            for arc in self.base.arc_base_set(ARCROLE_CONCEPT_LABEL, role) {
                if self.base.element(arc.from).concept() != Some(concept) {
                    continue;
                }
                if let Some(resource) = self.base.element(arc.to).as_resource() {
                    resources.push(resource);
                }
            }
        }
        resources
    }

    /// The label of a concept for a resource role and language, falling
    /// back to a language-only match and then to any label at all.
    pub fn label(&self, concept: ConceptId, role: &str, lang: &str) -> Option<&str> {
        let labels = self.resources_for_concept(concept);
        labels
            .iter()
            .find(|r| r.role.as_deref() == Some(role) && r.lang.as_deref() == Some(lang))
            .or_else(|| labels.iter().find(|r| r.lang.as_deref() == Some(lang)))
            .or_else(|| labels.first())
            .map(|r| r.value.as_str())
    }
}

/// Calculation linkbase: weighted summation rules over `summation-item`
/// arcs.
#[derive(Debug, Default)]
pub struct CalculationLinkbase {
    base: Linkbase,
}

impl CalculationLinkbase {
    pub fn new(base: Linkbase) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Linkbase {
        &self.base
    }

    /// The summand concepts and weights contributing to a concept within
    /// one extended link role.
    pub fn calculations(&self, concept: ConceptId, role: &str) -> IndexMap<ConceptId, f64> {
        let mut rules = IndexMap::new();
        for arc in self.base.arc_base_set(ARCROLE_SUMMATION_ITEM, role) {
            if self.base.element(arc.from).concept() != Some(concept) {
                continue;
            }
            if let Some(summand) = self.base.element(arc.to).concept() {
                rules.insert(summand, arc.weight);
            }
        }
        rules
    }
}
