//! Fixed vocabularies accepted by the enumerated query nodes.

/// Frequency datasets known to the index.
pub mod datasets {
    /// GEM Japan Whole Genome Aggregation panel.
    pub const GEM_J_WGA: &str = "gem_j_wga";
    /// JGA whole exome sequencing.
    pub const JGA_WES: &str = "jga_wes";
    /// JGA whole genome sequencing.
    pub const JGA_WGS: &str = "jga_wgs";
    /// JGA SNP arrays.
    pub const JGA_SNP: &str = "jga_snp";
    /// ToMMo allele frequency panel.
    pub const TOMMO: &str = "tommo";
    /// Human Genetic Variation Database.
    pub const HGVD: &str = "hgvd";
    /// National Center Biobank Network.
    pub const NCBN: &str = "ncbn";
    /// gnomAD genomes.
    pub const GNOMAD_GENOMES: &str = "gnomad_genomes";
    /// gnomAD exomes.
    pub const GNOMAD_EXOMES: &str = "gnomad_exomes";

    /// All recognised dataset names.
    pub const ALL: &[&str] = &[
        GEM_J_WGA,
        JGA_WES,
        JGA_WGS,
        JGA_SNP,
        TOMMO,
        HGVD,
        NCBN,
        GNOMAD_GENOMES,
        GNOMAD_EXOMES,
    ];
}

/// Clinical significance labels (ClinVar interpretations).
pub mod significance {
    /// Variant has no ClinVar record at all. Compiles to an absence check.
    pub const NOT_IN_CLINVAR: &str = "not_in_clinvar";

    /// All recognised labels.
    pub const ALL: &[&str] = &[
        "pathogenic",
        "likely_pathogenic",
        "pathogenic_low_penetrance",
        "likely_pathogenic_low_penetrance",
        "uncertain_significance",
        "likely_benign",
        "benign",
        "conflicting_interpretations_of_pathogenicity",
        "drug_response",
        "association",
        "association_not_found",
        "risk_factor",
        "protective",
        "affects",
        "established_risk_allele",
        "likely_risk_allele",
        "uncertain_risk_allele",
        "other",
        "not_provided",
        NOT_IN_CLINVAR,
    ];
}

/// Sequence Ontology consequence terms reported by VEP.
pub const CONSEQUENCES: &[&str] = &[
    "transcript_ablation",
    "splice_acceptor_variant",
    "splice_donor_variant",
    "stop_gained",
    "frameshift_variant",
    "stop_lost",
    "start_lost",
    "transcript_amplification",
    "feature_elongation",
    "feature_truncation",
    "inframe_insertion",
    "inframe_deletion",
    "missense_variant",
    "protein_altering_variant",
    "splice_donor_5th_base_variant",
    "splice_region_variant",
    "splice_donor_region_variant",
    "splice_polypyrimidine_tract_variant",
    "incomplete_terminal_codon_variant",
    "start_retained_variant",
    "stop_retained_variant",
    "synonymous_variant",
    "coding_sequence_variant",
    "mature_miRNA_variant",
    "5_prime_UTR_variant",
    "3_prime_UTR_variant",
    "non_coding_transcript_exon_variant",
    "intron_variant",
    "NMD_transcript_variant",
    "non_coding_transcript_variant",
    "coding_transcript_variant",
    "upstream_gene_variant",
    "downstream_gene_variant",
    "TFBS_ablation",
    "TFBS_amplification",
    "TF_binding_site_variant",
    "regulatory_region_ablation",
    "regulatory_region_amplification",
    "regulatory_region_variant",
    "intergenic_variant",
    "sequence_variant",
];

/// Variation type labels.
pub const VARIATION_TYPES: &[&str] = &["SNV", "MNV", "insertion", "deletion", "indel", "substitution"];

/// Chromosome labels as stored in the index.
pub const CHROMOSOMES: &[&str] = &[
    "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12", "13", "14", "15", "16", "17",
    "18", "19", "20", "21", "22", "X", "Y", "MT",
];

/// Returns true if `value` is a member of `vocabulary`.
pub fn contains(vocabulary: &[&str], value: &str) -> bool {
    vocabulary.iter().any(|v| *v == value)
}

/// Normalises a chromosome label: strips a `chr` prefix, upper-cases the
/// sex chromosomes and maps `M` to `MT`.
pub fn normalize_chromosome(label: &str) -> String {
    let trimmed = label.trim();
    let bare = match trimmed.get(..3) {
        Some(prefix) if prefix.eq_ignore_ascii_case("chr") => &trimmed[3..],
        _ => trimmed,
    };
    match bare.to_ascii_uppercase().as_str() {
        "M" | "MT" => "MT".to_string(),
        "X" => "X".to_string(),
        "Y" => "Y".to_string(),
        _ => bare.to_string(),
    }
}
