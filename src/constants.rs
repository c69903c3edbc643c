//! Namespace URIs, arc roles and other wire-format constants of XBRL 2.1
//! and Dimensions 1.0.

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
pub const LINK_NS: &str = "http://www.xbrl.org/2003/linkbase";
pub const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";
pub const XBRLDT_NS: &str = "http://xbrl.org/2005/xbrldt";
pub const XBRLDI_NS: &str = "http://xbrl.org/2006/xbrldi";
pub const ISO4217_NS: &str = "http://www.xbrl.org/2003/iso4217";

/// Roles a `link:linkbaseRef` carries to announce the linkbase kind.
pub const ROLE_PRESENTATION_LINKBASE_REF: &str =
    "http://www.xbrl.org/2003/role/presentationLinkbaseRef";
pub const ROLE_LABEL_LINKBASE_REF: &str = "http://www.xbrl.org/2003/role/labelLinkbaseRef";
pub const ROLE_DEFINITION_LINKBASE_REF: &str =
    "http://www.xbrl.org/2003/role/definitionLinkbaseRef";
pub const ROLE_CALCULATION_LINKBASE_REF: &str =
    "http://www.xbrl.org/2003/role/calculationLinkbaseRef";

/// Extended link role used when none is given explicitly.
pub const DEFAULT_LINK_ROLE: &str = "http://www.xbrl.org/2003/role/link";

/// Standard label resource role.
pub const ROLE_LABEL: &str = "http://www.xbrl.org/2003/role/label";
pub const ROLE_DOCUMENTATION: &str = "http://www.xbrl.org/2003/role/documentation";

pub const ARCROLE_HYPERCUBE_DIMENSION: &str =
    "http://xbrl.org/int/dim/arcrole/hypercube-dimension";
pub const ARCROLE_DIMENSION_DOMAIN: &str = "http://xbrl.org/int/dim/arcrole/dimension-domain";
pub const ARCROLE_DOMAIN_MEMBER: &str = "http://xbrl.org/int/dim/arcrole/domain-member";
pub const ARCROLE_ALL: &str = "http://xbrl.org/int/dim/arcrole/all";
pub const ARCROLE_NOT_ALL: &str = "http://xbrl.org/int/dim/arcrole/notAll";
pub const ARCROLE_SUMMATION_ITEM: &str = "http://www.xbrl.org/2003/arcrole/summation-item";
pub const ARCROLE_PARENT_CHILD: &str = "http://www.xbrl.org/2003/arcrole/parent-child";
pub const ARCROLE_CONCEPT_LABEL: &str = "http://www.xbrl.org/2003/arcrole/concept-label";

/// Substitution group local names (matched on the part after the prefix,
/// so taxonomies are free to bind `xbrli`/`xbrldt` to other prefixes).
pub const SUBST_GROUP_ITEM: &str = "item";
pub const SUBST_GROUP_DIMENSION_ITEM: &str = "dimensionItem";
pub const SUBST_GROUP_HYPERCUBE_ITEM: &str = "hypercubeItem";
