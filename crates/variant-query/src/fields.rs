//! Known-field table for generic `range` and `terms` leaves.
//!
//! Every field a client may name maps to a document path, a value kind and,
//! for fields stored inside nested objects, the nested path that scopes it.

use crate::vocabulary;

/// Value kind of an indexed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Exact-match string field.
    Keyword,
    /// Integer field.
    Integer,
    /// Floating point field.
    Float,
}

impl FieldKind {
    /// Returns true for kinds that support range queries.
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Float)
    }
}

/// Description of one queryable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Name clients use in `range`/`terms` leaves.
    pub name: &'static str,
    /// Path of the field in the indexed document.
    pub path: &'static str,
    /// Value kind.
    pub kind: FieldKind,
    /// Nested object path, if the field lives inside one.
    pub nested: Option<&'static str>,
    /// Allowed values for strict term matching, if the field is enumerated.
    pub vocabulary: Option<&'static [&'static str]>,
}

/// Nested object holding VEP annotations.
pub const NESTED_VEP: &str = "vep";
/// Nested object holding ClinVar conditions.
pub const NESTED_CLINVAR: &str = "clinvar";
/// Nested object holding one record per frequency dataset.
pub const NESTED_FREQUENCY: &str = "frequency";

const fn field(name: &'static str, path: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec {
        name,
        path,
        kind,
        nested: None,
        vocabulary: None,
    }
}

const fn nested(
    name: &'static str,
    path: &'static str,
    kind: FieldKind,
    scope: &'static str,
) -> FieldSpec {
    FieldSpec {
        name,
        path,
        kind,
        nested: Some(scope),
        vocabulary: None,
    }
}

const fn enumerated(spec: FieldSpec, vocabulary: &'static [&'static str]) -> FieldSpec {
    FieldSpec {
        vocabulary: Some(vocabulary),
        ..spec
    }
}

/// Variant identifier (`tgv…`).
pub const ID: FieldSpec = field("id", "id", FieldKind::Keyword);
/// dbSNP identifiers.
pub const RS: FieldSpec = field("rs", "rs", FieldKind::Keyword);
/// Chromosome label.
pub const CHROMOSOME: FieldSpec = enumerated(
    field("chromosome", "chromosome", FieldKind::Keyword),
    vocabulary::CHROMOSOMES,
);
/// Sort key for chromosomes (1..=25).
pub const CHROMOSOME_INDEX: FieldSpec = field("chromosome_index", "chromosome_index", FieldKind::Integer);
/// First position covered by the variant.
pub const START: FieldSpec = field("start", "start", FieldKind::Integer);
/// Last position covered by the variant.
pub const STOP: FieldSpec = field("stop", "stop", FieldKind::Integer);
/// Reference allele.
pub const REFERENCE: FieldSpec = field("ref", "reference", FieldKind::Keyword);
/// Alternate allele.
pub const ALTERNATE: FieldSpec = field("alt", "alternate", FieldKind::Keyword);
/// Variation type.
pub const TYPE: FieldSpec = enumerated(field("type", "type", FieldKind::Keyword), vocabulary::VARIATION_TYPES);
/// Gene symbol.
pub const SYMBOL: FieldSpec = nested("symbol", "vep.symbol", FieldKind::Keyword, NESTED_VEP);
/// Gene symbol aliases and previous symbols.
pub const SYMBOL_ALIAS: FieldSpec =
    nested("symbol_alias", "vep.symbol_aliases", FieldKind::Keyword, NESTED_VEP);
/// HGNC identifier.
pub const HGNC_ID: FieldSpec = nested("hgnc_id", "vep.hgnc_id", FieldKind::Integer, NESTED_VEP);
/// VEP consequence.
pub const CONSEQUENCE: FieldSpec = enumerated(
    nested("consequence", "vep.consequence", FieldKind::Keyword, NESTED_VEP),
    vocabulary::CONSEQUENCES,
);
/// SIFT score.
pub const SIFT: FieldSpec = nested("sift", "vep.sift", FieldKind::Float, NESTED_VEP);
/// PolyPhen score.
pub const POLYPHEN: FieldSpec = nested("polyphen", "vep.polyphen", FieldKind::Float, NESTED_VEP);
/// AlphaMissense score.
pub const ALPHAMISSENSE: FieldSpec =
    nested("alphamissense", "vep.alphamissense", FieldKind::Float, NESTED_VEP);
/// ClinVar interpretation.
pub const SIGNIFICANCE: FieldSpec = enumerated(
    nested("significance", "clinvar.interpretation", FieldKind::Keyword, NESTED_CLINVAR),
    vocabulary::significance::ALL,
);
/// MedGen concept identifier of a ClinVar condition.
pub const MEDGEN: FieldSpec = nested("medgen", "clinvar.medgen", FieldKind::Keyword, NESTED_CLINVAR);
/// Disease ontology identifier of a ClinVar condition.
pub const DISEASE: FieldSpec = nested("disease", "clinvar.disease", FieldKind::Keyword, NESTED_CLINVAR);
/// Frequency dataset name.
pub const FREQUENCY_SOURCE: FieldSpec = enumerated(
    nested("frequency.source", "frequency.source", FieldKind::Keyword, NESTED_FREQUENCY),
    vocabulary::datasets::ALL,
);
/// Allele frequency.
pub const FREQUENCY_AF: FieldSpec =
    nested("frequency.af", "frequency.af", FieldKind::Float, NESTED_FREQUENCY);
/// Allele count.
pub const FREQUENCY_AC: FieldSpec =
    nested("frequency.ac", "frequency.ac", FieldKind::Integer, NESTED_FREQUENCY);
/// Quality filter status of a frequency record.
pub const FREQUENCY_FILTER: FieldSpec =
    nested("frequency.filter", "frequency.filter", FieldKind::Keyword, NESTED_FREQUENCY);

/// Filter status of records that passed quality control.
pub const FILTER_PASS: &str = "PASS";

/// Every field clients may reference by name.
pub const KNOWN_FIELDS: &[FieldSpec] = &[
    ID,
    RS,
    CHROMOSOME,
    START,
    STOP,
    REFERENCE,
    ALTERNATE,
    TYPE,
    SYMBOL,
    SYMBOL_ALIAS,
    HGNC_ID,
    CONSEQUENCE,
    SIFT,
    POLYPHEN,
    ALPHAMISSENSE,
    SIGNIFICANCE,
    MEDGEN,
    DISEASE,
    FREQUENCY_SOURCE,
    FREQUENCY_AF,
    FREQUENCY_AC,
    FREQUENCY_FILTER,
];

/// Looks up a field by the name clients use.
pub fn lookup(name: &str) -> Option<&'static FieldSpec> {
    KNOWN_FIELDS.iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_field() {
        let spec = lookup("consequence").unwrap();
        assert_eq!(spec.path, "vep.consequence");
        assert_eq!(spec.nested, Some(NESTED_VEP));
        assert!(spec.vocabulary.is_some());
    }

    #[test]
    fn test_lookup_unknown_field() {
        assert!(lookup("not_a_field").is_none());
    }

    #[test]
    fn test_field_names_are_unique() {
        for (i, a) in KNOWN_FIELDS.iter().enumerate() {
            for b in &KNOWN_FIELDS[i + 1..] {
                assert_ne!(a.name, b.name);
            }
        }
    }

    #[test]
    fn test_nested_paths_are_prefixes() {
        for spec in KNOWN_FIELDS {
            if let Some(scope) = spec.nested {
                assert!(spec.path.starts_with(&format!("{}.", scope)), "{}", spec.name);
            }
        }
    }

    #[test]
    fn test_numeric_kinds() {
        assert!(START.kind.is_numeric());
        assert!(FREQUENCY_AF.kind.is_numeric());
        assert!(!CHROMOSOME.kind.is_numeric());
    }
}
