use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{mpsc, Mutex};

use image::{Rgb, RgbImage};
use rand::Rng as _;
use surveydoc::{
    processing::ImagePreparer, worker, Block, Classifier, ContextError, CropMode, GenerationRun,
    ReportConfiguration, RunConfiguration,
};

/// A screenshot with a dark rectangle inside a white frame.
fn screenshot(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (10..width - 10).contains(&x) && (8..height - 8).contains(&y) {
            Rgb([40, 90, 160])
        } else {
            Rgb([255, 255, 255])
        }
    })
}

/// Writes the three screenshots of the survey scenario and returns their paths.
fn survey_images(folder: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let a = folder.join("A_TIM_LTE800_RSRP.jpg");
    let b = folder.join("B_VF_GSM900_RXLEV.png");
    let c = folder.join("C_TIM_UMTS900_RSCP.jpg");
    for path in [&a, &b, &c] {
        screenshot(120, 80).save(path).unwrap();
    }
    (a, b, c)
}

fn survey_run(output_directory: PathBuf, images: Vec<PathBuf>) -> RunConfiguration {
    let mut run = RunConfiguration::new("Survey", output_directory);
    run.blocks.insert(Block::new("Block1", images));
    run
}

fn page_count(path: &Path) -> usize {
    lopdf::Document::load(path).unwrap().get_pages().len()
}

/// The section headings of a report, in page order.
fn headings(path: &Path) -> Vec<String> {
    let document = lopdf::Document::load(path).unwrap();
    let mut headings = Vec::new();
    for page_id in document.get_pages().into_values() {
        let content = document.get_page_content(page_id).unwrap();
        let operations = lopdf::content::Content::decode(&content).unwrap().operations;
        headings.extend(
            operations
                .iter()
                .filter(|operation| operation.operator == "Tj")
                .filter_map(|operation| operation.operands.first())
                .map(|operand| String::from_utf8_lossy(operand.as_str().unwrap()).into_owned()),
        );
    }
    headings
}

/// Records the order in which the screenshots are prepared.
struct RecordingPreparer {
    prepared: Mutex<Vec<PathBuf>>,
}

impl ImagePreparer for RecordingPreparer {
    fn prepare(&self, path: &Path) -> Result<RgbImage, ContextError> {
        self.prepared.lock().unwrap().push(path.to_path_buf());
        Ok(screenshot(40, 30))
    }
}

#[test]
fn one_document_per_operator_with_images() {
    let folder = tempfile::tempdir().unwrap();
    let (a, b, c) = survey_images(folder.path());
    let output_directory = folder.path().join("reports");
    let run = survey_run(output_directory.clone(), vec![a, b, c]);

    let summary = GenerationRun::new(run, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();

    let operators: Vec<&str> = summary
        .documents
        .iter()
        .map(|document| document.operator.code.as_str())
        .collect();
    assert_eq!(operators, vec!["TIM", "VF"]);
    let tim = &summary.documents[0];
    assert_eq!(tim.sections, vec!["Block1".to_string()]);
    assert_eq!(tim.pictures, 2);
    assert_eq!(tim.skipped, 0);
    assert_eq!(tim.path, output_directory.join("Survey_TIM.pdf"));
    assert_eq!(summary.documents[1].pictures, 1);

    assert!(page_count(&output_directory.join("Survey_TIM.pdf")) >= 1);
    assert!(page_count(&output_directory.join("Survey_VF.pdf")) >= 1);
    assert!(!output_directory.join("Survey_W3.pdf").exists());
    assert!(!output_directory.join("Survey_Iliad.pdf").exists());
}

#[test]
fn sections_follow_the_priority_order() {
    let folder = tempfile::tempdir().unwrap();
    let a = PathBuf::from("A_TIM_LTE800_RSRP.jpg");
    let b = PathBuf::from("B_VF_GSM900_RXLEV.png");
    let c = PathBuf::from("C_TIM_UMTS900_RSCP.jpg");
    let run = survey_run(folder.path().to_path_buf(), vec![c.clone(), b.clone(), a.clone()]);
    let preparer = RecordingPreparer {
        prepared: Mutex::new(Vec::new()),
    };

    let summary = GenerationRun::new(run, ReportConfiguration::default())
        .execute_with(&preparer, &AtomicBool::new(false))
        .unwrap();

    assert_eq!(summary.documents.len(), 2);
    assert_eq!(*preparer.prepared.lock().unwrap(), vec![a, c, b]);
}

#[test]
fn blocks_become_sections_only_where_they_have_images() {
    let folder = tempfile::tempdir().unwrap();
    let (a, b, c) = survey_images(folder.path());
    let mut run = survey_run(folder.path().to_path_buf(), vec![a]);
    run.blocks.insert(Block::new("Block2", vec![b, c]));

    let summary = GenerationRun::new(run, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();

    assert_eq!(
        summary.documents[0].sections,
        vec!["Block1".to_string(), "Block2".to_string()]
    );
    assert_eq!(summary.documents[1].sections, vec!["Block2".to_string()]);
}

#[test]
fn white_screenshots_survive_cropping_and_labels() {
    let folder = tempfile::tempdir().unwrap();
    let white = folder.path().join("A_TIM_LTE800_RSRP.png");
    RgbImage::from_pixel(64, 48, Rgb([255, 255, 255]))
        .save(&white)
        .unwrap();
    let mut run = survey_run(folder.path().to_path_buf(), vec![white]);
    run.crop_mode = CropMode::Both;
    run.add_label = true;
    run.mode_suffix = true;

    let summary = GenerationRun::new(run, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();

    assert_eq!(summary.documents.len(), 1);
    assert_eq!(summary.documents[0].pictures, 1);
    assert!(folder.path().join("Survey_TIM_cut_labeled.pdf").exists());
}

#[test]
fn unreadable_screenshots_are_skipped() {
    let folder = tempfile::tempdir().unwrap();
    let (a, _, _) = survey_images(folder.path());
    let broken = folder.path().join("D_TIM_LTE1800_RSRP.png");
    std::fs::write(&broken, b"not an image").unwrap();
    let missing = folder.path().join("E_TIM_LTE2600_RSRP.png");
    let run = survey_run(folder.path().to_path_buf(), vec![broken, a, missing]);

    let summary = GenerationRun::new(run, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();

    assert_eq!(summary.documents[0].pictures, 1);
    assert_eq!(summary.documents[0].skipped, 2);
}

#[test]
fn invalid_runs_write_nothing() {
    let folder = tempfile::tempdir().unwrap();
    let output_directory = folder.path().join("reports");

    let mut untitled = survey_run(output_directory.clone(), vec![PathBuf::from("A_TIM.png")]);
    untitled.title = "  ".into();
    let empty = RunConfiguration::new("Survey", output_directory.clone());

    for run in [untitled, empty] {
        let generation = GenerationRun::new(run, ReportConfiguration::default());
        assert!(generation.execute(&AtomicBool::new(false)).is_err());
    }
    assert!(!output_directory.exists());
}

#[test]
fn existing_reports_are_replaced() {
    let folder = tempfile::tempdir().unwrap();
    let (a, _, _) = survey_images(folder.path());
    let report = folder.path().join("Survey_TIM.pdf");
    std::fs::write(&report, b"stale").unwrap();
    let run = survey_run(folder.path().to_path_buf(), vec![a]);

    GenerationRun::new(run, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();

    assert!(page_count(&report) >= 1);
}

#[test]
fn appending_runs_keep_the_earlier_sections() {
    let folder = tempfile::tempdir().unwrap();
    let (a, _, c) = survey_images(folder.path());
    let report = folder.path().join("Survey_TIM.pdf");

    let mut first = survey_run(folder.path().to_path_buf(), vec![a]);
    first.append = true;
    let summary = GenerationRun::new(first, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();
    assert!(!summary.documents[0].appended);
    let first_pages = page_count(&report);

    let mut second = RunConfiguration::new("Survey", folder.path().to_path_buf());
    second.append = true;
    second.blocks.insert(Block::new("Block2", vec![c]));
    let summary = GenerationRun::new(second, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();

    assert!(summary.documents[0].appended);
    assert_eq!(summary.documents[0].sections, vec!["Block2".to_string()]);
    assert_eq!(headings(&report), vec!["Block1", "Block2"]);
    assert!(page_count(&report) > first_pages);
}

#[test]
fn reports_are_replaced_unless_appending() {
    let folder = tempfile::tempdir().unwrap();
    let (a, _, c) = survey_images(folder.path());
    let report = folder.path().join("Survey_TIM.pdf");

    for (block, image) in [("Block1", a), ("Block2", c)] {
        let mut run = RunConfiguration::new("Survey", folder.path().to_path_buf());
        run.blocks.insert(Block::new(block, vec![image]));
        GenerationRun::new(run, ReportConfiguration::default())
            .execute(&AtomicBool::new(false))
            .unwrap();
    }

    assert_eq!(headings(&report), vec!["Block2"]);
}

#[test]
fn path_separators_in_titles_stay_in_the_output_directory() {
    let folder = tempfile::tempdir().unwrap();
    let (a, _, _) = survey_images(folder.path());
    let output_directory = folder.path().join("reports");
    let mut run = survey_run(output_directory.clone(), vec![a]);
    run.title = "North/South".into();

    let summary = GenerationRun::new(run, ReportConfiguration::default())
        .execute(&AtomicBool::new(false))
        .unwrap();

    assert_eq!(
        summary.documents[0].path,
        output_directory.join("North_South_TIM.pdf")
    );
    assert!(output_directory.join("North_South_TIM.pdf").is_file());
}

#[test]
fn cancelled_runs_report_the_cancellation() {
    let folder = tempfile::tempdir().unwrap();
    let (a, b, c) = survey_images(folder.path());
    let generation = GenerationRun::new(
        survey_run(folder.path().to_path_buf(), vec![a, b, c]),
        ReportConfiguration::default(),
    );
    let (start_sender, start_receiver) = mpsc::channel::<()>();

    let handle = worker::spawn(move |cancel| {
        start_receiver.recv().unwrap();
        generation.execute(cancel)
    })
    .unwrap();
    handle.cancel();
    start_sender.send(()).unwrap();

    let error = handle.wait().unwrap_err();
    assert!(error.to_string().contains("cancelled"));
    assert!(!folder.path().join("Survey_TIM.pdf").exists());
}

#[test]
fn background_generation_delivers_the_summary() {
    let folder = tempfile::tempdir().unwrap();
    let (a, b, c) = survey_images(folder.path());
    let run = survey_run(folder.path().join("out"), vec![a, b, c]);

    let summary = worker::spawn_generation(run, ReportConfiguration::default())
        .unwrap()
        .wait()
        .unwrap();

    assert_eq!(summary.output_directory, folder.path().join("out"));
    assert_eq!(summary.documents.len(), 2);
}

#[test]
fn order_key_ignores_filename_noise() {
    let classifier = Classifier::default();
    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let label = surveydoc::classifier::DEFAULT_PRIORITIES
            [rng.gen_range(0..surveydoc::classifier::DEFAULT_PRIORITIES.len())];
        let expected = classifier.order_key(Path::new(&format!("{}.png", label)));
        let prefix = filename_noise(&mut rng);
        let suffix = filename_noise(&mut rng);
        let noisy = format!("{}_{}_{}.png", prefix, label.replace(' ', "_"), suffix);
        assert_eq!(classifier.order_key(Path::new(&noisy)), expected, "{:?}", noisy);
    }
}

fn filename_noise(rng: &mut rand::rngs::ThreadRng) -> String {
    let length = rng.gen_range(1..=12);
    rand_utf8::rand_utf8(rng, length)
        .chars()
        .filter(|character| !matches!(character, '/' | '\\' | '.' | '\0'))
        .collect()
}
