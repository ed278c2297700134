mod settings;

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;

use moodlens_core::aggregation::face_result::FaceResult;
use moodlens_core::classification::infrastructure::onnx_emotion_classifier::OnnxEmotionClassifier;
use moodlens_core::detection::infrastructure::onnx_blazeface_locator::OnnxBlazefaceLocator;
use moodlens_core::ingestion::infrastructure::image_crate_decoder::ImageCrateDecoder;
use moodlens_core::pipeline::analyze_emotions_use_case::AnalyzeEmotionsUseCase;
use moodlens_core::pipeline::batch_executor::{BatchConfig, BatchExecutor};
use moodlens_core::pipeline::infrastructure::sequential_batch_executor::SequentialBatchExecutor;
use moodlens_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use moodlens_core::pipeline::pipeline_logger::StatsPipelineLogger;
use moodlens_core::session::domain::detection_session::{DetectionSession, DetectionType};
use moodlens_core::session::domain::session_store::{SessionError, SessionStore};
use moodlens_core::session::infrastructure::json_file_session_store::JsonFileSessionStore;
use moodlens_core::shared::constants::{DETECTOR_MODEL, EMOTION_MODEL, IMAGE_EXTENSIONS};
use moodlens_core::shared::model_resolver::ModelResolver;

use settings::Settings;

/// Face emotion detection for images and captured frames.
#[derive(Parser)]
#[command(name = "moodlens", version)]
struct Cli {
    /// BlazeFace ONNX model (default: model cache).
    #[arg(long, global = true)]
    detector_model: Option<PathBuf>,

    /// Emotion classifier ONNX model (default: model cache, downloaded if missing).
    #[arg(long, global = true)]
    classifier_model: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true)]
    confidence: Option<f64>,

    /// Session store file (default: user data directory).
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect faces and their emotions in image files or directories.
    Analyze {
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Save an upload session per image.
        #[arg(long)]
        store: bool,

        /// Worker threads for the batch.
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Analyse one data-URL frame read from a file, or stdin with "-".
    Frame {
        input: String,

        /// Save a webcam session when faces are found.
        #[arg(long)]
        store: bool,
    },
    /// List recent sessions, newest first.
    History {
        #[arg(long)]
        limit: Option<usize>,

        /// List every session.
        #[arg(long, conflicts_with = "limit")]
        all: bool,
    },
    /// Print one session and its results.
    Show { session_id: String },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = Settings::load();
    validate(&cli, &settings)?;

    match &cli.command {
        Command::Analyze {
            images,
            store,
            jobs,
        } => {
            let images = collect_images(images)?;
            let use_case = build_use_case(&cli, &settings)?;
            let store = store
                .then(|| open_store(&cli, &settings))
                .transpose()?;
            let jobs = jobs.unwrap_or(settings.jobs);
            run_analyze(&use_case, &images, jobs, store.as_ref(), cli.pretty)?;
            use_case.logger().summary();
        }
        Command::Frame { input, store } => {
            let data_url = read_frame_input(input)?;
            let use_case = build_use_case(&cli, &settings)?;
            let report = use_case.run_on_frame(&data_url);
            if *store && !report.faces.is_empty() {
                let store = open_store(&cli, &settings)?;
                let session = save_faces(&store, DetectionType::Webcam, None, &report.faces)?;
                log::info!("Saved {} face(s) to session {}", report.count, session.session_id);
            }
            print_json(&report, cli.pretty)?;
        }
        Command::History { limit, all } => {
            let store = open_store(&cli, &settings)?;
            let limit = if *all {
                None
            } else {
                Some(limit.unwrap_or(settings.history_limit))
            };
            print_json(&store.list_sessions(limit)?, cli.pretty)?;
        }
        Command::Show { session_id } => {
            let store = open_store(&cli, &settings)?;
            print_json(&store.get_session(session_id)?, cli.pretty)?;
        }
    }

    Ok(())
}

fn run_analyze(
    use_case: &AnalyzeEmotionsUseCase,
    images: &[PathBuf],
    jobs: usize,
    store: Option<&JsonFileSessionStore>,
    pretty: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let executor: Box<dyn BatchExecutor> = if jobs > 1 {
        Box::new(ThreadedBatchExecutor::new(jobs))
    } else {
        Box::new(SequentialBatchExecutor)
    };

    let total = images.len();
    let config = BatchConfig {
        on_progress: (total > 1).then(|| -> Box<dyn Fn(usize, usize) -> bool + Send> {
            Box::new(|current, total| {
                eprint!("\rAnalysed image {current}/{total}");
                true
            })
        }),
        ..Default::default()
    };

    let results = executor.execute(use_case, images, &config);
    if total > 1 {
        eprintln!();
    }

    for analysis in &results {
        if let Some(store) = store {
            let session = save_faces(
                store,
                DetectionType::Upload,
                Some(&analysis.image),
                &analysis.faces,
            )?;
            log::info!(
                "Saved {} face(s) from {} to session {}",
                analysis.faces.len(),
                analysis.image.display(),
                session.session_id
            );
        }
        print_json(analysis, pretty)?;
    }
    Ok(())
}

fn build_use_case(
    cli: &Cli,
    settings: &Settings,
) -> Result<AnalyzeEmotionsUseCase, Box<dyn std::error::Error>> {
    let confidence = cli.confidence.unwrap_or(settings.confidence);

    let resolver = ModelResolver::user_cache()?;

    log::info!("Resolving model: {}", DETECTOR_MODEL.file_name);
    let detector_path = resolver.resolve(
        &DETECTOR_MODEL,
        cli.detector_model
            .as_deref()
            .or(settings.detector_model.as_deref()),
        None,
    )?;

    log::info!("Resolving model: {}", EMOTION_MODEL.file_name);
    let classifier_path = resolver.resolve(
        &EMOTION_MODEL,
        cli.classifier_model
            .as_deref()
            .or(settings.classifier_model.as_deref()),
        Some(Box::new(download_progress)),
    )?;

    let locator = OnnxBlazefaceLocator::new(&detector_path, confidence, settings.intra_threads)?;
    let classifier = OnnxEmotionClassifier::new(&classifier_path, settings.intra_threads)?;

    Ok(AnalyzeEmotionsUseCase::new(
        Box::new(ImageCrateDecoder::new()),
        Arc::new(locator),
        Arc::new(classifier),
    )
    .with_logger(Box::new(StatsPipelineLogger::new())))
}

fn open_store(cli: &Cli, settings: &Settings) -> Result<JsonFileSessionStore, Box<dyn std::error::Error>> {
    let path = cli
        .store_path
        .clone()
        .or_else(|| settings.store_path.clone())
        .or_else(JsonFileSessionStore::default_path)
        .ok_or("could not determine session store location; pass --store-path")?;
    Ok(JsonFileSessionStore::open(path)?)
}

/// Creates a session and saves every face under it.
fn save_faces(
    store: &dyn SessionStore,
    detection_type: DetectionType,
    image: Option<&Path>,
    faces: &[FaceResult],
) -> Result<DetectionSession, SessionError> {
    let session = store.create_session(detection_type)?;
    for face in faces {
        store.save_result(&session.session_id, image, face)?;
    }
    Ok(session)
}

/// Checks the effective values, after flags override the settings file.
fn validate(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let confidence = cli.confidence.unwrap_or(settings.confidence);
    if !(0.0..=1.0).contains(&confidence) {
        return Err(format!("Confidence must be between 0.0 and 1.0, got {confidence}").into());
    }
    if let Command::Analyze { jobs, .. } = &cli.command {
        if jobs.unwrap_or(settings.jobs) == 0 {
            return Err("Jobs must be at least 1".into());
        }
    }
    if settings.intra_threads == 0 {
        return Err("intra_threads must be at least 1".into());
    }
    Ok(())
}

/// Expands directories to the images directly inside them, sorted by name.
fn collect_images(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut images = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut entries: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|path| is_image(path))
                .collect();
            entries.sort();
            images.extend(entries);
        } else if input.exists() {
            images.push(input.clone());
        } else {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
    }
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn read_frame_input(input: &str) -> Result<String, Box<dyn std::error::Error>> {
    if input == "-" {
        let mut data = String::new();
        std::io::stdin().read_to_string(&mut data)?;
        Ok(data)
    } else {
        fs::read_to_string(input)
            .map_err(|e| format!("Could not read frame from {input}: {e}").into())
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<(), serde_json::Error> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading emotion model... {pct}%");
    } else {
        eprint!("\rDownloading emotion model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodlens_core::aggregation::face_result::aggregate;
    use moodlens_core::classification::domain::emotion::{Emotion, EmotionScores};
    use moodlens_core::session::infrastructure::in_memory_session_store::InMemorySessionStore;
    use moodlens_core::shared::region::FaceRegion;
    use rstest::rstest;

    fn face(emotion: Emotion) -> FaceResult {
        aggregate(
            FaceRegion {
                x: 0,
                y: 0,
                width: 10,
                height: 10,
            },
            EmotionScores::from_pairs([(emotion, 80.0)]),
        )
    }

    #[test]
    fn test_parse_analyze_with_globals() {
        let cli = Cli::try_parse_from([
            "moodlens",
            "analyze",
            "a.jpg",
            "b.png",
            "--jobs",
            "4",
            "--store",
            "--confidence",
            "0.6",
            "--pretty",
        ])
        .unwrap();

        assert_eq!(cli.confidence, Some(0.6));
        assert!(cli.pretty);
        match cli.command {
            Command::Analyze {
                images,
                store,
                jobs,
            } => {
                assert_eq!(images, vec![PathBuf::from("a.jpg"), PathBuf::from("b.png")]);
                assert!(store);
                assert_eq!(jobs, Some(4));
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_analyze_requires_an_image() {
        assert!(Cli::try_parse_from(["moodlens", "analyze"]).is_err());
    }

    #[test]
    fn test_history_all_conflicts_with_limit() {
        assert!(Cli::try_parse_from(["moodlens", "history", "--all", "--limit", "3"]).is_err());
        assert!(Cli::try_parse_from(["moodlens", "history", "--all"]).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_confidence_and_jobs() {
        let defaults = Settings::default();
        let cli = Cli::try_parse_from(["moodlens", "--confidence", "1.5", "show", "x"]).unwrap();
        assert!(validate(&cli, &defaults).is_err());

        let cli = Cli::try_parse_from(["moodlens", "analyze", "a.jpg", "--jobs", "0"]).unwrap();
        assert!(validate(&cli, &defaults).is_err());

        let cli = Cli::try_parse_from(["moodlens", "frame", "-"]).unwrap();
        assert!(validate(&cli, &defaults).is_ok());
    }

    #[rstest]
    #[case(Settings { confidence: 1.5, ..Settings::default() })]
    #[case(Settings { confidence: -0.1, ..Settings::default() })]
    #[case(Settings { jobs: 0, ..Settings::default() })]
    #[case(Settings { intra_threads: 0, ..Settings::default() })]
    fn test_validate_rejects_bad_settings_file_values(#[case] settings: Settings) {
        let cli = Cli::try_parse_from(["moodlens", "analyze", "a.jpg"]).unwrap();
        assert!(validate(&cli, &settings).is_err());
    }

    #[test]
    fn test_confidence_flag_overrides_bad_settings_value() {
        let settings = Settings {
            confidence: 7.0,
            ..Settings::default()
        };
        let cli = Cli::try_parse_from(["moodlens", "--confidence", "0.4", "frame", "-"]).unwrap();
        assert!(validate(&cli, &settings).is_ok());
    }

    #[test]
    fn test_collect_images_expands_directories() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let single = dir.path().join("b.png");

        let images = collect_images(&[dir.path().to_path_buf(), single.clone()]).unwrap();

        assert_eq!(
            images,
            vec![dir.path().join("a.JPG"), dir.path().join("b.png"), single]
        );
    }

    #[test]
    fn test_collect_images_missing_input_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_images(&[dir.path().join("ghost.jpg")]).unwrap_err();
        assert!(err.to_string().starts_with("Input file not found"));
    }

    #[test]
    fn test_read_frame_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.txt");
        fs::write(&path, "data:image/png;base64,AAAA").unwrap();

        let data = read_frame_input(path.to_str().unwrap()).unwrap();

        assert_eq!(data, "data:image/png;base64,AAAA");
        assert!(read_frame_input("/no/such/frame.txt").is_err());
    }

    #[test]
    fn test_save_faces_creates_one_session_with_every_face() {
        let store = InMemorySessionStore::new();
        let faces = vec![face(Emotion::Happy), face(Emotion::Angry)];

        let session = save_faces(
            &store,
            DetectionType::Upload,
            Some(Path::new("group.jpg")),
            &faces,
        )
        .unwrap();

        let record = store.get_session(&session.session_id).unwrap();
        assert_eq!(record.session.detection_type, DetectionType::Upload);
        assert_eq!(record.results.len(), 2);
        assert_eq!(record.results[1].dominant_emotion, Emotion::Angry);
        assert_eq!(
            record.results[0].image_path.as_deref(),
            Some(Path::new("group.jpg"))
        );
    }

    #[test]
    fn test_unknown_session_message() {
        let store = InMemorySessionStore::new();
        let err = store.get_session("abc").unwrap_err();
        assert_eq!(err.to_string(), "Session not found: abc");
    }
}
