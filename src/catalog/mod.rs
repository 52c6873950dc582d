// leima: Semantic typing and format validation for bioinformatics artifacts.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! The concrete catalog: every semantic type, format, view and transformer
//! this crate ships, registered into a [Registry] in one pass.
//!
//! Hosts call [register_all] once during start-up; every error it returns is
//! fatal. [register_all_with] exposes the one catalog knob,
//! [CatalogOptions::bind_normalized].

use std::path::Path;
use std::path::PathBuf;

use regex::Regex;

use crate::format::any_body;
use crate::format::walk_files;
use crate::format::BodyKind;
use crate::format::DirectoryFormatDef;
use crate::format::FileFormatDef;
use crate::registry::Registry;
use crate::semantic::TypeExpr;
use crate::validate;
use crate::view;
use crate::view::distance_matrix::DistanceMatrix;
use crate::view::hmm::HmmFile;
use crate::view::mag_map::MagToContigs;
use crate::view::metadata::Metadata;
use crate::view::ordination::OrdinationResults;
use crate::view::ordination::ProcrustesStatistics;
use crate::view::table::BiomTable;
use crate::view::tree::parse_newick;
use crate::view::FormatValue;
use crate::view::Value;
use crate::view::ViewId;
use crate::Error;
use crate::ValidationLevel;

/// Catalog knobs, resolved at registration time.
#[derive(Debug, Clone, Copy)]
pub struct CatalogOptions {
    /// Whether `FeatureTable[Normalized]` is bound to the feature-table
    /// layout. The variant stays in the lattice either way; hosts that do
    /// not produce normalized tables can opt out of the binding.
    pub bind_normalized: bool,
}

impl Default for CatalogOptions {
    fn default() -> Self {
        CatalogOptions { bind_normalized: true }
    }
}

// File-format leaves

pub const LSMAT: FileFormatDef =
    FileFormatDef::new("LSMatFormat", BodyKind::Text, validate::lsmat::validate);
pub const NEWICK: FileFormatDef =
    FileFormatDef::new("NewickFormat", BodyKind::Text, validate::newick::validate);
pub const ORDINATION: FileFormatDef =
    FileFormatDef::new("OrdinationFormat", BodyKind::Text, validate::ordination::validate);
pub const PROCRUSTES: FileFormatDef = FileFormatDef::new(
    "ProcrustesStatisticsFormat",
    BodyKind::Text,
    validate::ordination::validate_procrustes,
);
pub const BIOM_V100: FileFormatDef =
    FileFormatDef::new("BIOMV100Format", BodyKind::Text, validate::biom::validate_v100);
pub const BIOM_V210: FileFormatDef =
    FileFormatDef::new("BIOMV210Format", BodyKind::Binary, validate::biom::validate_v210);
pub const METADATA: FileFormatDef = FileFormatDef::new(
    "ImmutableMetadataFormat",
    BodyKind::Text,
    validate::metadata::validate,
);
pub const MAG_TO_CONTIGS: FileFormatDef = FileFormatDef::new(
    "MAGtoContigsFormat",
    BodyKind::Text,
    validate::mag_to_contigs::validate,
);

pub const SINGLE_AMINO_HMM: FileFormatDef = FileFormatDef::new(
    "SingleAminoHmmFormat",
    BodyKind::Text,
    validate::hmm::validate_single_amino,
);
pub const SINGLE_DNA_HMM: FileFormatDef =
    FileFormatDef::new("SingleDnaHmmFormat", BodyKind::Text, validate::hmm::validate_single_dna);
pub const SINGLE_RNA_HMM: FileFormatDef =
    FileFormatDef::new("SingleRnaHmmFormat", BodyKind::Text, validate::hmm::validate_single_rna);
pub const MULTIPLE_AMINO_HMM: FileFormatDef = FileFormatDef::new(
    "MultipleAminoHmmFormat",
    BodyKind::Text,
    validate::hmm::validate_multiple_amino,
);
pub const MULTIPLE_DNA_HMM: FileFormatDef = FileFormatDef::new(
    "MultipleDnaHmmFormat",
    BodyKind::Text,
    validate::hmm::validate_multiple_dna,
);
pub const MULTIPLE_RNA_HMM: FileFormatDef = FileFormatDef::new(
    "MultipleRnaHmmFormat",
    BodyKind::Text,
    validate::hmm::validate_multiple_rna,
);

/// The pressed siblings are opaque HMMER binary blobs, recognised by name.
pub const PRESSED_HMM: FileFormatDef =
    FileFormatDef::new("PressedHmmFormat", BodyKind::Binary, any_body);
pub const HMM_IDMAP: FileFormatDef =
    FileFormatDef::new("HmmIdmapFormat", BodyKind::Text, validate::hmm::validate_idmap);

pub const KRAKEN2_REPORT: FileFormatDef = FileFormatDef::new(
    "Kraken2ReportFormat",
    BodyKind::Text,
    validate::kraken2::validate_report,
);
pub const KRAKEN2_DB_REPORT: FileFormatDef = FileFormatDef::new(
    "Kraken2DBReportFormat",
    BodyKind::Text,
    validate::kraken2::validate_db_report,
);
pub const KRAKEN2_OUTPUT: FileFormatDef = FileFormatDef::new(
    "Kraken2OutputFormat",
    BodyKind::Text,
    validate::kraken2::validate_output,
);
/// The `.k2d` databases are opaque, recognised by name.
pub const K2D: FileFormatDef =
    FileFormatDef::new("Kraken2DatabaseFormat", BodyKind::Binary, any_body);
/// Bracken distributions are recognised by name only.
pub const BRACKEN_DB: FileFormatDef =
    FileFormatDef::new("BrackenDatabaseFormat", BodyKind::Text, any_body);

const BRACKEN_DB_PATTERN: &str = r"database(\d{2,})mers\.kmer_distrib";

// Path-makers for the per-sample Kraken2 collections

fn kraken2_report_path(sample_id: &str, mag_id: Option<&str>) -> PathBuf {
    match mag_id {
        Some(mag) => PathBuf::from(format!("{}/{}_report.txt", sample_id, mag)),
        None => PathBuf::from(format!("{}/report.txt", sample_id)),
    }
}

fn kraken2_output_path(sample_id: &str, mag_id: Option<&str>) -> PathBuf {
    match mag_id {
        Some(mag) => PathBuf::from(format!("{}/{}_output.txt", sample_id, mag)),
        None => PathBuf::from(format!("{}/output.txt", sample_id)),
    }
}

/// A Bracken payload must hold at least one k-mer distribution.
fn bracken_db_hook(root: &Path, _level: ValidationLevel) -> Result<(), Error> {
    let pattern = Regex::new(&format!("^(?:{})$", BRACKEN_DB_PATTERN)).unwrap();
    if walk_files(root)?.iter().any(|p| pattern.is_match(p)) {
        Ok(())
    } else {
        Err(Error::validation(
            "BrackenDBDirectoryFormat",
            format!("Missing one or more files: {}", BRACKEN_DB_PATTERN),
        ))
    }
}

fn directory_formats() -> Result<Vec<DirectoryFormatDef>, Error> {
    let mut defs = vec![
        DirectoryFormatDef::single_file(
            "DistanceMatrixDirectoryFormat",
            "distance-matrix.tsv",
            LSMAT,
        )?,
        DirectoryFormatDef::single_file("PhylogenyDirectoryFormat", "tree.nwk", NEWICK)?,
        DirectoryFormatDef::single_file(
            "FeatureTableDirectoryFormat",
            "feature-table.biom",
            BIOM_V210,
        )?,
        DirectoryFormatDef::single_file(
            "ImmutableMetadataDirectoryFormat",
            "metadata.tsv",
            METADATA,
        )?,
        DirectoryFormatDef::single_file("OrdinationDirectoryFormat", "ordination.txt", ORDINATION)?,
        DirectoryFormatDef::single_file(
            "ProcrustesStatisticsDirectoryFormat",
            "ProcrustesStatistics.tsv",
            PROCRUSTES,
        )?,
        DirectoryFormatDef::single_file(
            "MAGtoContigsDirectoryFormat",
            "mag-to-contigs.json",
            MAG_TO_CONTIGS,
        )?,
    ];

    for (name, format) in [
        ("SingleAminoHmmDirectoryFormat", SINGLE_AMINO_HMM),
        ("SingleDnaHmmDirectoryFormat", SINGLE_DNA_HMM),
        ("SingleRnaHmmDirectoryFormat", SINGLE_RNA_HMM),
        ("MultipleAminoHmmDirectoryFormat", MULTIPLE_AMINO_HMM),
        ("MultipleDnaHmmDirectoryFormat", MULTIPLE_DNA_HMM),
        ("MultipleRnaHmmDirectoryFormat", MULTIPLE_RNA_HMM),
    ] {
        defs.push(DirectoryFormatDef::single_file(name, "profile.hmm", format)?);
    }

    let mut pressed = DirectoryFormatDef::new("PressedHmmDirectoryFormat");
    for extension in ["h3m", "h3i", "h3f", "h3p"] {
        pressed =
            pressed.named_file(&format!(r"[^/]+\.hmm\.{}", extension), PRESSED_HMM, false)?;
    }
    defs.push(pressed.named_file(r"[^/]+\.hmm\.idmap", HMM_IDMAP, true)?);

    defs.push(DirectoryFormatDef::new("Kraken2ReportsDirectoryFormat").collection(
        r"[^/]+/([^/]+_)?report\.txt",
        KRAKEN2_REPORT,
        kraken2_report_path,
    )?);
    defs.push(DirectoryFormatDef::new("Kraken2OutputsDirectoryFormat").collection(
        r"[^/]+/([^/]+_)?output\.txt",
        KRAKEN2_OUTPUT,
        kraken2_output_path,
    )?);

    let mut kraken2_db = DirectoryFormatDef::new("Kraken2DBDirectoryFormat");
    for name in ["hash.k2d", "opts.k2d", "taxo.k2d"] {
        kraken2_db = kraken2_db.named_file(&regex::escape(name), K2D, false)?;
    }
    // Databases built with --report-minimizer-data carry a self-report
    defs.push(kraken2_db.named_file(r"report\.txt", KRAKEN2_DB_REPORT, true)?);

    defs.push(
        DirectoryFormatDef::new("BrackenDBDirectoryFormat")
            .collection(BRACKEN_DB_PATTERN, BRACKEN_DB, bracken_db_path)?
            .validate_hook(bracken_db_hook),
    );
    Ok(defs)
}

fn bracken_db_path(read_length: &str, _unused: Option<&str>) -> PathBuf {
    PathBuf::from(format!("database{}mers.kmer_distrib", read_length))
}

// Transformer edge functions. Each is a plain fn so the graph can store it
// as a pointer; scratch outputs own their temporary directory.

fn lsmat_to_distance_matrix(value: Value) -> Result<Value, Error> {
    let input = value.into_format("LSMatFormat")?;
    Ok(Value::DistanceMatrix(DistanceMatrix::read_lsmat(input.path())?))
}

fn distance_matrix_to_lsmat(value: Value) -> Result<Value, Error> {
    let matrix = value.into_distance_matrix()?;
    let output = FormatValue::scratch("LSMatFormat", "distance-matrix.tsv")?;
    matrix.write_lsmat(output.path())?;
    Ok(Value::Format(output))
}

fn biom_v100_to_table(value: Value) -> Result<Value, Error> {
    let input = value.into_format("BIOMV100Format")?;
    Ok(Value::Table(BiomTable::read_json_v1(input.path())?))
}

fn table_to_biom_v100(value: Value) -> Result<Value, Error> {
    let table = value.into_table()?;
    let output = FormatValue::scratch("BIOMV100Format", "feature-table.biom")?;
    table.write_json_v1(output.path())?;
    Ok(Value::Format(output))
}

fn biom_v210_to_table(value: Value) -> Result<Value, Error> {
    let input = value.into_format("BIOMV210Format")?;
    Ok(Value::Table(BiomTable::read_hdf5(input.path())?))
}

fn table_to_biom_v210(value: Value) -> Result<Value, Error> {
    let table = value.into_table()?;
    let output = FormatValue::scratch("BIOMV210Format", "feature-table.biom")?;
    table.write_hdf5(output.path())?;
    Ok(Value::Format(output))
}

fn biom_v100_to_v210(value: Value) -> Result<Value, Error> {
    let input = value.into_format("BIOMV100Format")?;
    let table = BiomTable::read_json_v1(input.path())?;
    let output = FormatValue::scratch("BIOMV210Format", "feature-table.biom")?;
    table.write_hdf5(output.path())?;
    Ok(Value::Format(output))
}

fn biom_v100_to_data_frame(value: Value) -> Result<Value, Error> {
    let input = value.into_format("BIOMV100Format")?;
    Ok(Value::DataFrame(BiomTable::read_json_v1(input.path())?.to_data_frame()))
}

fn biom_v210_to_data_frame(value: Value) -> Result<Value, Error> {
    let input = value.into_format("BIOMV210Format")?;
    Ok(Value::DataFrame(BiomTable::read_hdf5(input.path())?.to_data_frame()))
}

fn table_to_metadata(value: Value) -> Result<Value, Error> {
    Ok(Value::Metadata(value.into_table()?.to_metadata()))
}

fn data_frame_to_table(value: Value) -> Result<Value, Error> {
    let frame = value.into_data_frame()?;
    Ok(Value::Table(BiomTable::from_data_frame(&frame)?))
}

fn data_frame_to_biom_v210(value: Value) -> Result<Value, Error> {
    let frame = value.into_data_frame()?;
    let table = BiomTable::from_data_frame(&frame)?;
    let output = FormatValue::scratch("BIOMV210Format", "feature-table.biom")?;
    table.write_hdf5(output.path())?;
    Ok(Value::Format(output))
}

fn newick_to_tree(value: Value) -> Result<Value, Error> {
    let input = value.into_format("NewickFormat")?;
    let text = std::fs::read_to_string(input.path())?;
    Ok(Value::Tree(parse_newick(text.trim())?))
}

fn tree_to_newick(value: Value) -> Result<Value, Error> {
    let tree = value.into_tree()?;
    let output = FormatValue::scratch("NewickFormat", "tree.nwk")?;
    std::fs::write(output.path(), format!("{}\n", tree.to_newick()))?;
    Ok(Value::Format(output))
}

fn mag_to_contigs_to_map(value: Value) -> Result<Value, Error> {
    let input = value.into_format("MAGtoContigsFormat")?;
    Ok(Value::MagMap(MagToContigs::read_json(input.path())?))
}

fn map_to_mag_to_contigs(value: Value) -> Result<Value, Error> {
    let map = value.into_mag_map()?;
    let output = FormatValue::scratch("MAGtoContigsFormat", "mag-to-contigs.json")?;
    map.write_json(output.path())?;
    Ok(Value::Format(output))
}

fn metadata_file_to_view(value: Value) -> Result<Value, Error> {
    let input = value.into_format("ImmutableMetadataFormat")?;
    Ok(Value::Metadata(Metadata::read_tsv(input.path())?))
}

fn metadata_view_to_file(value: Value) -> Result<Value, Error> {
    let metadata = value.into_metadata()?;
    let output = FormatValue::scratch("ImmutableMetadataFormat", "metadata.tsv")?;
    metadata.write_tsv(output.path())?;
    Ok(Value::Format(output))
}

fn ordination_file_to_view(value: Value) -> Result<Value, Error> {
    let input = value.into_format("OrdinationFormat")?;
    Ok(Value::Ordination(OrdinationResults::read_text(input.path())?))
}

fn ordination_view_to_file(value: Value) -> Result<Value, Error> {
    let ordination = value.into_ordination()?;
    let output = FormatValue::scratch("OrdinationFormat", "ordination.txt")?;
    ordination.write_text(output.path())?;
    Ok(Value::Format(output))
}

fn procrustes_file_to_view(value: Value) -> Result<Value, Error> {
    let input = value.into_format("ProcrustesStatisticsFormat")?;
    Ok(Value::Procrustes(ProcrustesStatistics::read_tsv(input.path())?))
}

fn procrustes_view_to_file(value: Value) -> Result<Value, Error> {
    let stats = value.into_procrustes()?;
    let output = FormatValue::scratch("ProcrustesStatisticsFormat", "ProcrustesStatistics.tsv")?;
    stats.write_tsv(output.path())?;
    Ok(Value::Format(output))
}

fn hmm_read(value: Value, format: &'static str) -> Result<Value, Error> {
    let input = value.into_format(format)?;
    Ok(Value::Hmm(HmmFile::read_text(format, input.path())?))
}

fn hmm_write(value: Value, format: &'static str) -> Result<Value, Error> {
    let hmm = value.into_hmm()?;
    let output = FormatValue::scratch(format, "profile.hmm")?;
    hmm.write_text(output.path())?;
    Ok(Value::Format(output))
}

fn single_amino_hmm_to_view(value: Value) -> Result<Value, Error> {
    hmm_read(value, "SingleAminoHmmFormat")
}
fn single_dna_hmm_to_view(value: Value) -> Result<Value, Error> {
    hmm_read(value, "SingleDnaHmmFormat")
}
fn single_rna_hmm_to_view(value: Value) -> Result<Value, Error> {
    hmm_read(value, "SingleRnaHmmFormat")
}
fn multiple_amino_hmm_to_view(value: Value) -> Result<Value, Error> {
    hmm_read(value, "MultipleAminoHmmFormat")
}
fn multiple_dna_hmm_to_view(value: Value) -> Result<Value, Error> {
    hmm_read(value, "MultipleDnaHmmFormat")
}
fn multiple_rna_hmm_to_view(value: Value) -> Result<Value, Error> {
    hmm_read(value, "MultipleRnaHmmFormat")
}
fn view_to_single_amino_hmm(value: Value) -> Result<Value, Error> {
    hmm_write(value, "SingleAminoHmmFormat")
}
fn view_to_single_dna_hmm(value: Value) -> Result<Value, Error> {
    hmm_write(value, "SingleDnaHmmFormat")
}
fn view_to_single_rna_hmm(value: Value) -> Result<Value, Error> {
    hmm_write(value, "SingleRnaHmmFormat")
}
fn view_to_multiple_amino_hmm(value: Value) -> Result<Value, Error> {
    hmm_write(value, "MultipleAminoHmmFormat")
}
fn view_to_multiple_dna_hmm(value: Value) -> Result<Value, Error> {
    hmm_write(value, "MultipleDnaHmmFormat")
}
fn view_to_multiple_rna_hmm(value: Value) -> Result<Value, Error> {
    hmm_write(value, "MultipleRnaHmmFormat")
}

/// Registers the whole catalog with the default options.
pub fn register_all(registry: &mut Registry) -> Result<(), Error> {
    register_all_with(registry, CatalogOptions::default())
}

/// Registers the whole catalog: types, formats, views, bindings and
/// transformer edges.
///
/// ## Errors
///
/// Any registration failure, eg. calling this twice on the same registry.
pub fn register_all_with(registry: &mut Registry, options: CatalogOptions) -> Result<(), Error> {
    log::debug!("registering the catalog (options {:?})", options);
    register_types(registry, options)?;
    register_formats(registry)?;
    register_views(registry)?;
    register_bindings(registry, options)?;
    register_transformers(registry)?;
    Ok(())
}

const FEATURE_TABLE_VARIANTS: [&str; 8] = [
    "Frequency",
    "RelativeFrequency",
    "PresenceAbsence",
    "Composition",
    "Balance",
    "PercentileNormalized",
    "Design",
    "Normalized",
];

const PROFILE_HMM_VARIANTS: [&str; 9] = [
    "SingleAmino",
    "SingleDNA",
    "SingleRNA",
    "MultipleAmino",
    "MultipleDNA",
    "MultipleRNA",
    "MultipleAminoPressed",
    "MultipleDNAPressed",
    "MultipleRNAPressed",
];

fn register_types(registry: &mut Registry, options: CatalogOptions) -> Result<(), Error> {
    let lattice = registry.lattice_mut();
    for name in [
        "DistanceMatrix",
        "Hierarchy",
        "Ordination",
        "ProcrustesStatistics",
        "ImmutableMetadata",
        "MAGtoContigs",
        "Kraken2DB",
        "BrackenDB",
    ] {
        lattice.declare(name, &[])?;
    }

    lattice.declare("FeatureTable", &["content"])?;
    for variant in FEATURE_TABLE_VARIANTS {
        lattice.variant(variant, "FeatureTable", "content")?;
    }
    lattice.declare("Phylogeny", &["kind"])?;
    lattice.variant("Rooted", "Phylogeny", "kind")?;
    lattice.variant("Unrooted", "Phylogeny", "kind")?;
    lattice.declare("ProfileHMM", &["type"])?;
    for variant in PROFILE_HMM_VARIANTS {
        lattice.variant(variant, "ProfileHMM", "type")?;
    }
    lattice.declare("SampleData", &["content"])?;
    lattice.variant("Kraken2Report", "SampleData", "content")?;
    lattice.variant("Kraken2Output", "SampleData", "content")?;

    let mut specified: Vec<(&str, Vec<&str>)> = vec![
        ("DistanceMatrix", vec![]),
        ("Hierarchy", vec![]),
        ("Ordination", vec![]),
        ("ProcrustesStatistics", vec![]),
        ("ImmutableMetadata", vec![]),
        ("MAGtoContigs", vec![]),
        ("Kraken2DB", vec![]),
        ("BrackenDB", vec![]),
        ("Phylogeny", vec!["Rooted"]),
        ("Phylogeny", vec!["Unrooted"]),
        ("SampleData", vec!["Kraken2Report"]),
        ("SampleData", vec!["Kraken2Output"]),
    ];
    for variant in FEATURE_TABLE_VARIANTS {
        if variant == "Normalized" && !options.bind_normalized {
            // Stays in the lattice but out of the catalog
            continue;
        }
        specified.push(("FeatureTable", vec![variant]));
    }
    for variant in PROFILE_HMM_VARIANTS {
        specified.push(("ProfileHMM", vec![variant]));
    }
    for (constructor, args) in specified {
        let t = registry.lattice().apply(constructor, &args)?;
        registry.register_semantic_type(t)?;
    }
    Ok(())
}

fn register_formats(registry: &mut Registry) -> Result<(), Error> {
    for format in [
        LSMAT,
        NEWICK,
        ORDINATION,
        PROCRUSTES,
        BIOM_V100,
        BIOM_V210,
        METADATA,
        MAG_TO_CONTIGS,
        SINGLE_AMINO_HMM,
        SINGLE_DNA_HMM,
        SINGLE_RNA_HMM,
        MULTIPLE_AMINO_HMM,
        MULTIPLE_DNA_HMM,
        MULTIPLE_RNA_HMM,
        PRESSED_HMM,
        HMM_IDMAP,
        KRAKEN2_REPORT,
        KRAKEN2_DB_REPORT,
        KRAKEN2_OUTPUT,
        K2D,
        BRACKEN_DB,
    ] {
        registry.register_file_format(format)?;
    }
    for def in directory_formats()? {
        registry.register_directory_format(def)?;
    }
    Ok(())
}

fn register_views(registry: &mut Registry) -> Result<(), Error> {
    for (id, citation) in [
        (view::DISTANCE_MATRIX, Some("scikit-bio")),
        (view::ORDINATION, Some("scikit-bio")),
        (view::PROCRUSTES, Some("scikit-bio")),
        (view::TREE, None),
        (view::TABLE, Some("biom-format")),
        (view::DATA_FRAME, None),
        (view::METADATA, None),
        (view::HMM_FILE, Some("hmmer3")),
        (view::MAG_TO_CONTIGS, None),
    ] {
        registry.register_view(id, citation)?;
    }
    Ok(())
}

fn register_bindings(registry: &mut Registry, options: CatalogOptions) -> Result<(), Error> {
    let single = |registry: &Registry, constructor: &str, args: &[&str]| {
        registry.lattice().apply(constructor, args).map(TypeExpr::from)
    };

    let expr = single(registry, "DistanceMatrix", &[])?;
    registry.register_artifact_class(expr, "DistanceMatrixDirectoryFormat", "Pairwise distances")?;

    let rooted = registry.lattice().apply("Phylogeny", &["Rooted"])?;
    let unrooted = registry.lattice().apply("Phylogeny", &["Unrooted"])?;
    registry.register_artifact_class(
        TypeExpr::union([rooted, unrooted])?,
        "PhylogenyDirectoryFormat",
        "Phylogenetic trees",
    )?;
    let expr = single(registry, "Hierarchy", &[])?;
    registry.register_artifact_class(expr, "PhylogenyDirectoryFormat", "Hierarchical clusterings")?;

    let members = FEATURE_TABLE_VARIANTS
        .iter()
        .filter(|v| options.bind_normalized || **v != "Normalized")
        .map(|v| registry.lattice().apply("FeatureTable", &[v]))
        .collect::<Result<Vec<_>, Error>>()?;
    registry.register_artifact_class(
        TypeExpr::union(members)?,
        "FeatureTableDirectoryFormat",
        "Observation by sample feature tables",
    )?;

    for (constructor, name, description) in [
        ("Ordination", "OrdinationDirectoryFormat", "Ordination results"),
        (
            "ProcrustesStatistics",
            "ProcrustesStatisticsDirectoryFormat",
            "Procrustes analysis statistics",
        ),
        ("ImmutableMetadata", "ImmutableMetadataDirectoryFormat", "Immutable metadata"),
        ("MAGtoContigs", "MAGtoContigsDirectoryFormat", "MAG to contig mappings"),
        ("Kraken2DB", "Kraken2DBDirectoryFormat", "Kraken2 databases"),
        ("BrackenDB", "BrackenDBDirectoryFormat", "Bracken k-mer distribution databases"),
    ] {
        let expr = single(registry, constructor, &[])?;
        registry.register_artifact_class(expr, name, description)?;
    }

    for (variant, name) in [
        ("SingleAmino", "SingleAminoHmmDirectoryFormat"),
        ("SingleDNA", "SingleDnaHmmDirectoryFormat"),
        ("SingleRNA", "SingleRnaHmmDirectoryFormat"),
        ("MultipleAmino", "MultipleAminoHmmDirectoryFormat"),
        ("MultipleDNA", "MultipleDnaHmmDirectoryFormat"),
        ("MultipleRNA", "MultipleRnaHmmDirectoryFormat"),
    ] {
        let expr = single(registry, "ProfileHMM", &[variant])?;
        registry.register_artifact_class(expr, name, "Profile hidden Markov models")?;
    }
    let pressed = ["MultipleAminoPressed", "MultipleDNAPressed", "MultipleRNAPressed"]
        .into_iter()
        .map(|v| registry.lattice().apply("ProfileHMM", &[v]))
        .collect::<Result<Vec<_>, Error>>()?;
    registry.register_artifact_class(
        TypeExpr::union(pressed)?,
        "PressedHmmDirectoryFormat",
        "Pressed profile HMM databases",
    )?;

    let expr = single(registry, "SampleData", &["Kraken2Report"])?;
    registry.register_artifact_class(expr, "Kraken2ReportsDirectoryFormat", "Per-sample Kraken2 reports")?;
    let expr = single(registry, "SampleData", &["Kraken2Output"])?;
    registry.register_artifact_class(expr, "Kraken2OutputsDirectoryFormat", "Per-sample Kraken2 outputs")?;
    Ok(())
}

fn register_transformers(registry: &mut Registry) -> Result<(), Error> {
    type Edge = (ViewId, ViewId, crate::graph::TransformFn, Option<&'static str>);
    const SKBIO: Option<&str> = Some("scikit-bio");
    const BIOM: Option<&str> = Some("biom-format");
    let edges: Vec<Edge> = vec![
        (ViewId("LSMatFormat"), view::DISTANCE_MATRIX, lsmat_to_distance_matrix, SKBIO),
        (view::DISTANCE_MATRIX, ViewId("LSMatFormat"), distance_matrix_to_lsmat, SKBIO),
        (ViewId("BIOMV100Format"), view::TABLE, biom_v100_to_table, BIOM),
        (view::TABLE, ViewId("BIOMV100Format"), table_to_biom_v100, BIOM),
        (ViewId("BIOMV210Format"), view::TABLE, biom_v210_to_table, BIOM),
        (view::TABLE, ViewId("BIOMV210Format"), table_to_biom_v210, BIOM),
        (ViewId("BIOMV100Format"), ViewId("BIOMV210Format"), biom_v100_to_v210, BIOM),
        (ViewId("BIOMV100Format"), view::DATA_FRAME, biom_v100_to_data_frame, BIOM),
        (ViewId("BIOMV210Format"), view::DATA_FRAME, biom_v210_to_data_frame, BIOM),
        (view::TABLE, view::METADATA, table_to_metadata, None),
        (view::DATA_FRAME, view::TABLE, data_frame_to_table, None),
        (view::DATA_FRAME, ViewId("BIOMV210Format"), data_frame_to_biom_v210, BIOM),
        (ViewId("NewickFormat"), view::TREE, newick_to_tree, None),
        (view::TREE, ViewId("NewickFormat"), tree_to_newick, None),
        (ViewId("MAGtoContigsFormat"), view::MAG_TO_CONTIGS, mag_to_contigs_to_map, None),
        (view::MAG_TO_CONTIGS, ViewId("MAGtoContigsFormat"), map_to_mag_to_contigs, None),
        (ViewId("ImmutableMetadataFormat"), view::METADATA, metadata_file_to_view, None),
        (view::METADATA, ViewId("ImmutableMetadataFormat"), metadata_view_to_file, None),
        (ViewId("OrdinationFormat"), view::ORDINATION, ordination_file_to_view, SKBIO),
        (view::ORDINATION, ViewId("OrdinationFormat"), ordination_view_to_file, SKBIO),
        (ViewId("ProcrustesStatisticsFormat"), view::PROCRUSTES, procrustes_file_to_view, SKBIO),
        (view::PROCRUSTES, ViewId("ProcrustesStatisticsFormat"), procrustes_view_to_file, SKBIO),
        (ViewId("SingleAminoHmmFormat"), view::HMM_FILE, single_amino_hmm_to_view, None),
        (ViewId("SingleDnaHmmFormat"), view::HMM_FILE, single_dna_hmm_to_view, None),
        (ViewId("SingleRnaHmmFormat"), view::HMM_FILE, single_rna_hmm_to_view, None),
        (ViewId("MultipleAminoHmmFormat"), view::HMM_FILE, multiple_amino_hmm_to_view, None),
        (ViewId("MultipleDnaHmmFormat"), view::HMM_FILE, multiple_dna_hmm_to_view, None),
        (ViewId("MultipleRnaHmmFormat"), view::HMM_FILE, multiple_rna_hmm_to_view, None),
        (view::HMM_FILE, ViewId("SingleAminoHmmFormat"), view_to_single_amino_hmm, None),
        (view::HMM_FILE, ViewId("SingleDnaHmmFormat"), view_to_single_dna_hmm, None),
        (view::HMM_FILE, ViewId("SingleRnaHmmFormat"), view_to_single_rna_hmm, None),
        (view::HMM_FILE, ViewId("MultipleAminoHmmFormat"), view_to_multiple_amino_hmm, None),
        (view::HMM_FILE, ViewId("MultipleDnaHmmFormat"), view_to_multiple_dna_hmm, None),
        (view::HMM_FILE, ViewId("MultipleRnaHmmFormat"), view_to_multiple_rna_hmm, None),
    ];
    for (src, dst, func, citation) in edges {
        registry.register_transformer(src, dst, func, citation)?;
    }
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {
    use crate::format::BoundDirectory;
    use crate::registry::Registry;
    use crate::semantic::TypeExpr;
    use crate::view;
    use crate::view::FormatValue;
    use crate::view::Value;
    use crate::view::ViewId;
    use crate::ValidationLevel;

    fn catalog() -> Registry {
        let mut registry = Registry::new();
        super::register_all(&mut registry).unwrap();
        registry
    }

    #[test]
    fn every_binding_resolves_exactly() {
        let registry = catalog();
        for (constructor, args, format) in [
            ("DistanceMatrix", vec![], "DistanceMatrixDirectoryFormat"),
            ("Hierarchy", vec![], "PhylogenyDirectoryFormat"),
            ("Phylogeny", vec!["Rooted"], "PhylogenyDirectoryFormat"),
            ("FeatureTable", vec!["Frequency"], "FeatureTableDirectoryFormat"),
            ("FeatureTable", vec!["Normalized"], "FeatureTableDirectoryFormat"),
            ("ProfileHMM", vec!["SingleDNA"], "SingleDnaHmmDirectoryFormat"),
            ("ProfileHMM", vec!["MultipleRNAPressed"], "PressedHmmDirectoryFormat"),
            ("SampleData", vec!["Kraken2Report"], "Kraken2ReportsDirectoryFormat"),
            ("Kraken2DB", vec![], "Kraken2DBDirectoryFormat"),
            ("BrackenDB", vec![], "BrackenDBDirectoryFormat"),
        ] {
            let t = registry.lattice().apply(constructor, &args).unwrap();
            let def = registry.directory_format_for(&t.into()).unwrap();
            assert_eq!(def.name, format);
        }
    }

    #[test]
    fn union_resolution_follows_the_bindings() {
        let registry = catalog();
        let rooted = registry.lattice().apply("Phylogeny", &["Rooted"]).unwrap();
        let unrooted = registry.lattice().apply("Phylogeny", &["Unrooted"]).unwrap();
        let union = TypeExpr::union([rooted, unrooted]).unwrap();
        assert_eq!(
            registry.directory_format_for(&union).unwrap().name,
            "PhylogenyDirectoryFormat"
        );

        let frequency = registry.lattice().apply("FeatureTable", &["Frequency"]).unwrap();
        let design = registry.lattice().apply("FeatureTable", &["Design"]).unwrap();
        let union = TypeExpr::union([frequency, design]).unwrap();
        assert_eq!(
            registry.directory_format_for(&union).unwrap().name,
            "FeatureTableDirectoryFormat"
        );
    }

    #[test]
    fn views_carry_their_citations() {
        let registry = catalog();
        assert_eq!(registry.view(view::TABLE).unwrap().citation, Some("biom-format"));
        assert!(registry.view(ViewId("NewickFormat")).unwrap().citation.is_none());
        assert_eq!(
            registry.transformer_citation(ViewId("LSMatFormat"), view::DISTANCE_MATRIX),
            Some("scikit-bio")
        );
        assert!(registry
            .transformer_citation(view::TREE, ViewId("NewickFormat"))
            .is_none());
    }

    #[test]
    fn re_registration_is_an_error() {
        let mut registry = Registry::new();
        super::register_all(&mut registry).unwrap();
        assert!(super::register_all(&mut registry).is_err());
    }

    #[test]
    fn normalized_binding_can_be_opted_out() {
        let mut registry = Registry::new();
        super::register_all_with(
            &mut registry,
            super::CatalogOptions { bind_normalized: false },
        )
        .unwrap();

        // The variant stays in the lattice
        let t = registry.lattice().apply("FeatureTable", &["Normalized"]).unwrap();
        assert!(!registry.is_registered(&t));
        assert!(registry.directory_format_for(&t.into()).is_err());
    }

    #[test]
    fn lsmat_transformer_round_trips() {
        let registry = catalog();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distance-matrix.tsv");
        std::fs::write(&path, "\ta\tb\na\t0\t0.5\nb\t0.5\t0\n").unwrap();

        let to_view = registry
            .transformer(ViewId("LSMatFormat"), view::DISTANCE_MATRIX)
            .unwrap();
        let value = to_view
            .apply(Value::Format(FormatValue::existing("LSMatFormat", &path)))
            .unwrap();
        let matrix = value.into_distance_matrix().unwrap();
        assert_eq!(matrix.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(matrix.get(0, 1), 0.5);

        let to_file = registry
            .transformer(view::DISTANCE_MATRIX, ViewId("LSMatFormat"))
            .unwrap();
        let back = to_file.apply(Value::DistanceMatrix(matrix.clone())).unwrap();
        let output = back.into_format("LSMatFormat").unwrap();
        let reread = crate::view::distance_matrix::DistanceMatrix::read_lsmat(output.path())
            .unwrap();
        assert_eq!(reread, matrix);
    }

    #[test]
    fn biom_version_upgrade_preserves_ids() {
        let registry = catalog();
        let table = crate::view::table::BiomTable::new(
            vec!["o1".to_string(), "o2".to_string()],
            vec!["s1".to_string()],
            vec![(0, 0, 1.0), (1, 0, 2.0)],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let v1 = dir.path().join("feature-table_v100.biom");
        table.write_json_v1(&v1).unwrap();

        let upgrade = registry
            .transformer(ViewId("BIOMV100Format"), ViewId("BIOMV210Format"))
            .unwrap();
        let value = upgrade
            .apply(Value::Format(FormatValue::existing("BIOMV100Format", &v1)))
            .unwrap();
        let output = value.into_format("BIOMV210Format").unwrap();

        let upgraded = crate::view::table::BiomTable::read_hdf5(output.path()).unwrap();
        assert_eq!(upgraded.observation_ids, table.observation_ids);
        assert_eq!(upgraded.sample_ids, table.sample_ids);
    }

    #[test]
    fn positional_data_frames_cannot_become_biom() {
        use crate::view::data_frame::DataFrame;
        use crate::view::data_frame::Index;

        let registry = catalog();
        let frame = DataFrame::new(
            Index::Range(2),
            vec!["ATG".to_string(), "ACG".to_string()],
            vec![1.0, 2.0, 2.0, 3.0],
        )
        .unwrap();

        let transformer = registry
            .transformer(view::DATA_FRAME, ViewId("BIOMV210Format"))
            .unwrap();
        let err = transformer.apply(Value::DataFrame(frame)).unwrap_err();
        assert!(err.to_string().contains("string-based"));
    }

    #[test]
    fn multi_step_paths_visit_registered_views_only() {
        let registry = catalog();
        let transformer = registry
            .transformer(ViewId("BIOMV100Format"), view::METADATA)
            .unwrap();
        assert!(transformer.n_steps() > 1);
        for step in transformer.path() {
            assert!(registry.is_view_registered(*step));
        }
    }

    #[test]
    fn kraken2_reports_payload_validates() {
        let registry = catalog();
        let def = registry.directory_format("Kraken2ReportsDirectoryFormat").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let report = "100.0\t10\t10\tR\t1\troot\n";
        for rel in ["sample-1/report.txt", "sample-2/mag-a_report.txt"] {
            let path = dir.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, report).unwrap();
        }

        let bound = BoundDirectory::new(def, dir.path());
        bound.validate(ValidationLevel::Max).unwrap();
        assert_eq!(
            bound.collection_members(0).unwrap(),
            vec!["sample-1/report.txt", "sample-2/mag-a_report.txt"],
        );
    }

    #[test]
    fn pressed_hmm_payload_needs_all_four_siblings() {
        let registry = catalog();
        let def = registry.directory_format("PressedHmmDirectoryFormat").unwrap();

        let dir = tempfile::tempdir().unwrap();
        for extension in ["h3m", "h3i", "h3f"] {
            std::fs::write(dir.path().join(format!("profiles.hmm.{}", extension)), b"\x00")
                .unwrap();
        }
        let bound = BoundDirectory::new(def, dir.path());
        let err = bound.validate(ValidationLevel::Min).unwrap_err();
        assert!(err.to_string().contains("Missing one or more files"));

        std::fs::write(dir.path().join("profiles.hmm.h3p"), b"\x00").unwrap();
        bound.validate(ValidationLevel::Min).unwrap();

        // A bad idmap fails the whole directory
        std::fs::write(dir.path().join("profiles.hmm.idmap"), "2 ABC123\n").unwrap();
        let err = bound.validate(ValidationLevel::Max).unwrap_err();
        assert!(err.to_string().contains("Expected index 1 but got 2 instead."));
    }

    #[test]
    fn bracken_db_needs_at_least_one_distribution() {
        let registry = catalog();
        let def = registry.directory_format("BrackenDBDirectoryFormat").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let bound = BoundDirectory::new(def, dir.path());
        assert!(bound.validate(ValidationLevel::Min).is_err());

        std::fs::write(dir.path().join("database150mers.kmer_distrib"), b"...").unwrap();
        bound.validate(ValidationLevel::Min).unwrap();
    }
}
