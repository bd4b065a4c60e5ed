use neurodecode::dataset::{load_annotations, load_coordinates};
use neurodecode::stats::Correction;
use neurodecode::{
    BrainMapOptions, DecodeError, DecoderConfig, NeurosynthOptions, NeurosynthPrior, Selection,
    brainmap_decode, neurosynth_decode,
};
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FEATURES: [&str; 3] = ["pain", "memory", "vision"];

/// Writes a 40-study database: studies 0-9 are selected. `pain` is common in the
/// selected studies, `memory` in the rest, `vision` is spread evenly. Study `i`
/// reports `1 + i % 3` foci.
fn write_database(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let mut annotations = String::from("id\tstudy_id\tpain\tmemory\tvision\n");
    let mut coordinates = String::from("id\tx\ty\tz\n");
    for i in 0..40 {
        let id = format!("study-{i:02}");
        let pain = if (i < 10 && i % 5 != 4) || i % 8 == 0 { 0.02 } else { 0.0 };
        let memory = if i >= 10 && i % 2 == 0 { 0.01 } else { 0.0 };
        let vision = if i % 4 == 1 { 0.5 } else { 0.0 };
        writeln!(annotations, "{id}\t{i}\t{pain}\t{memory}\t{vision}").unwrap();
        for focus in 0..(1 + i % 3) {
            writeln!(coordinates, "{id}\t{}\t{}\t12", focus * 2, i as i64 - 40).unwrap();
        }
    }
    let annotations_path = dir.join("annotations.tsv");
    let coordinates_path = dir.join("coordinates.tsv");
    fs::write(&annotations_path, annotations).unwrap();
    fs::write(&coordinates_path, coordinates).unwrap();
    (annotations_path, coordinates_path)
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn selected() -> Vec<String> {
    (0..10).map(|i| format!("study-{i:02}")).collect()
}

#[test]
fn tsv_database_decodes_with_both_methods() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let (annotations_path, coordinates_path) = write_database(dir.path());
    let annotations = load_annotations(&annotations_path).unwrap();
    let coordinates = load_coordinates(&coordinates_path).unwrap();
    assert_eq!(annotations.features(), FEATURES);
    assert!(coordinates.positions().is_some());

    let ids = selected();
    let selection = Selection::new(&ids);

    let neurosynth =
        neurosynth_decode(&coordinates, &annotations, &selection, &NeurosynthOptions::default())
            .unwrap();
    let order: Vec<&str> = neurosynth.iter().map(|r| r.term.as_str()).collect();
    assert_eq!(order, FEATURES);
    let pain = neurosynth.get("pain").unwrap();
    // selected 0-3 and 5-8, unselected 16, 24 and 32
    assert_eq!(pain.n_selected_term, 8);
    assert_eq!(pain.n_unselected_term, 3);
    assert!(pain.z_forward > 0.0);
    assert!(pain.z_reverse > 0.0);
    assert!(neurosynth.get("memory").unwrap().z_reverse < 0.0);

    let brainmap =
        brainmap_decode(&coordinates, &annotations, &selection, &BrainMapOptions::default())
            .unwrap();
    assert_eq!(brainmap.len(), FEATURES.len());
    let vision = brainmap.get("vision").unwrap();
    // selected studies 1, 5 and 9 fall below the rare-feature threshold
    assert_eq!(vision.n_selected_term, 3);
    assert_eq!(vision.p_forward, 1.0);
    assert_eq!(vision.p_reverse, 1.0);
    let reverse_sum: f64 = brainmap
        .iter()
        .map(|r| r.effect_reverse)
        .filter(|v| v.is_finite())
        .sum();
    assert!((reverse_sum - 1.0).abs() < 1e-9);
}

#[test]
fn results_are_written_as_tsv() {
    let dir = TempDir::new().unwrap();
    let (annotations_path, coordinates_path) = write_database(dir.path());
    let annotations = load_annotations(&annotations_path).unwrap();
    let coordinates = load_coordinates(&coordinates_path).unwrap();
    let ids = selected();

    let result = brainmap_decode(
        &coordinates,
        &annotations,
        &Selection::new(&ids),
        &BrainMapOptions::default(),
    )
    .unwrap();
    let out_path = dir.path().join("brainmap.tsv");
    result.save_tsv(&out_path).unwrap();

    let text = fs::read_to_string(&out_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Term\tpForward\tzForward\tlikelihoodForward\tpReverse\tzReverse\tprobReverse")
    );
    let terms: Vec<&str> = lines.map(|l| l.split('\t').next().unwrap()).collect();
    assert_eq!(terms, FEATURES);
}

#[test]
fn configuration_file_drives_both_decoders() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let (annotations_path, coordinates_path) = write_database(dir.path());
    let annotations = load_annotations(&annotations_path).unwrap();
    let coordinates = load_coordinates(&coordinates_path).unwrap();
    let ids = selected();
    let selection = Selection::new(&ids);

    let config_path = dir.path().join("decoder.toml");
    fs::write(
        &config_path,
        "[brainmap]\ncorrection = \"none\"\nrare_feature_threshold = 0\n\n\
         [neurosynth]\ncorrection = \"bonferroni\"\nprior = { fixed = 0.5 }\n",
    )
    .unwrap();
    let config = DecoderConfig::load(&config_path).unwrap();
    assert_eq!(config.brainmap.settings.correction, Correction::None);
    assert_eq!(config.neurosynth.prior, NeurosynthPrior::Fixed(0.5));

    let strict = brainmap_decode(
        &coordinates,
        &annotations,
        &selection,
        &BrainMapOptions::default(),
    )
    .unwrap();
    let lenient = brainmap_decode(&coordinates, &annotations, &selection, &config.brainmap).unwrap();
    assert!(lenient.get("vision").unwrap().p_forward < strict.get("vision").unwrap().p_forward);

    let bonferroni =
        neurosynth_decode(&coordinates, &annotations, &selection, &config.neurosynth).unwrap();
    let mut raw_options = config.neurosynth.clone();
    raw_options.settings.correction = Correction::None;
    let raw = neurosynth_decode(&coordinates, &annotations, &selection, &raw_options).unwrap();
    for (corrected, uncorrected) in bonferroni.iter().zip(raw.iter()) {
        let expected = (uncorrected.p_forward * FEATURES.len() as f64).min(1.0);
        assert!((corrected.p_forward - expected).abs() < 1e-12);
        assert_eq!(corrected.effect_forward, uncorrected.effect_forward);
    }
}

#[test]
fn explicit_comparison_set_and_missing_data() {
    let dir = TempDir::new().unwrap();
    let (annotations_path, coordinates_path) = write_database(dir.path());
    let annotations = load_annotations(&annotations_path).unwrap();
    let coordinates = load_coordinates(&coordinates_path).unwrap();
    let ids = selected();

    let comparison: Vec<String> = (30..40).map(|i| format!("study-{i:02}")).collect();
    let result = neurosynth_decode(
        &coordinates,
        &annotations,
        &Selection::new(&ids).with_unselected(&comparison),
        &NeurosynthOptions::default(),
    )
    .unwrap();
    // unselected pain studies among 30-39: only 32
    assert_eq!(result.get("pain").unwrap().n_unselected_term, 1);

    let unknown = vec!["study-99".to_string()];
    let err = neurosynth_decode(
        &coordinates,
        &annotations,
        &Selection::new(&unknown),
        &NeurosynthOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, DecodeError::MissingStudy(id) if id == "study-99"));

    let missing_feature = vec!["audition".to_string()];
    let err = brainmap_decode(
        &coordinates,
        &annotations,
        &Selection::new(&ids).with_features(&missing_feature),
        &BrainMapOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, DecodeError::MissingFeature(name) if name == "audition"));

    let empty: Vec<String> = Vec::new();
    assert!(matches!(
        brainmap_decode(
            &coordinates,
            &annotations,
            &Selection::new(&empty),
            &BrainMapOptions::default(),
        ),
        Err(DecodeError::EmptySelection)
    ));
}
